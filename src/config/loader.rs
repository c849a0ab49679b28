//! Configuration loader with XDG-compliant path resolution
//!
//! Loads configuration from multiple locations with layered priority:
//! 1. `/etc/procrun/config.toml` (lowest priority)
//! 2. `~/.config/procrun/config.toml`
//! 3. `~/.procrun.toml`
//! 4. `./.procrun.toml` (highest priority)

use std::path::PathBuf;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use super::interpolate::interpolate_config;
use super::model::Config;

/// Application name used for XDG directories
const APP_NAME: &str = "procrun";

/// Get XDG config search paths in priority order (lowest to highest)
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. System-wide config (lowest priority)
    paths.push(PathBuf::from(format!("/etc/{}/config.toml", APP_NAME)));

    // 2. XDG config home
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_NAME).join("config.toml"));
    }

    // 3. Home directory (legacy/convenience)
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(format!(".{}.toml", APP_NAME)));
    }

    // 4. Current directory / project root (highest priority)
    paths.push(PathBuf::from(format!(".{}.toml", APP_NAME)));

    paths
}

/// Load configuration with XDG layering
///
/// Configurations are merged in priority order, with later files
/// overriding earlier ones. Preset values are interpolated afterwards. Environment variables with prefix
/// `PROCRUN_` override all file-based configuration.
///
/// # Arguments
/// * `override_path` - Optional path to a config file that takes highest priority
///
/// # Returns
/// * `Result<Config>` - The merged configuration
pub fn load_config(override_path: Option<&str>) -> Result<Config> {
    let mut figment = Figment::new();

    // Start with defaults
    figment = figment.merge(Serialized::defaults(Config::default()));

    // Layer configs from lowest to highest priority
    for path in config_paths() {
        if path.exists() {
            tracing::debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        }
    }

    // Override path takes highest priority (if provided)
    if let Some(path) = override_path {
        let path = PathBuf::from(path);
        if path.exists() {
            tracing::debug!("Loading override config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        } else {
            tracing::warn!("Override config not found: {}", path.display());
        }
    }

    // Environment variables override everything
    // Format: PROCRUN_DEFAULTS__TIMEOUT_MS=600
    // Maps to: defaults.timeout_ms = 600
    figment = figment.merge(Env::prefixed("PROCRUN_").split("__"));

    let mut config: Config = figment.extract().context("Failed to load configuration")?;
    interpolate_config(&mut config);

    Ok(config)
}

/// Find all existing config files (for debugging/introspection)
pub fn find_config_files() -> Vec<PathBuf> {
    config_paths().into_iter().filter(|p| p.exists()).collect()
}

/// Where a new user config belongs (`~/.config/procrun/config.toml` on Linux)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME).join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths_returns_expected_paths() {
        let paths = config_paths();

        assert!(paths.len() >= 2);

        // First should be system-wide
        assert!(paths[0].to_string_lossy().contains("/etc/"));

        // Last should be current directory
        assert!(paths
            .last()
            .unwrap()
            .to_string_lossy()
            .contains(".procrun.toml"));
    }

    #[test]
    fn test_load_config_from_override() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("test-config.toml");

        fs::write(
            &config_path,
            r#"
            [defaults]
            timeout_ms = 600
            "#,
        )
        .unwrap();

        let config = load_config(Some(config_path.to_str().unwrap())).unwrap();

        assert_eq!(config.defaults.timeout_ms, 600);
    }

    #[test]
    fn test_load_config_with_presets() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("test-config.toml");

        fs::write(
            &config_path,
            r#"
            [presets.greet]
            program = "echo"
            args = ["hello", "${LOADER_TEST_GREETING}"]
            working_dir = "/tmp"
            "#,
        )
        .unwrap();

        std::env::set_var("LOADER_TEST_GREETING", "world");
        let config = load_config(Some(config_path.to_str().unwrap()));
        std::env::remove_var("LOADER_TEST_GREETING");
        let config = config.unwrap();

        assert!(config.has_preset("greet"));
        let preset = config.get_preset("greet").unwrap();
        assert_eq!(preset.descriptor.command_line(), "echo hello world");
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("bad.toml");

        fs::write(&config_path, "[defaults]\ntimeout_ms = \"soon\"\n").unwrap();

        let err = load_config(Some(config_path.to_str().unwrap())).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }

    #[test]
    fn test_find_config_files_does_not_panic() {
        let _files = find_config_files();
    }

    #[test]
    fn test_default_config_file_is_a_search_path() {
        if let Some(file) = default_config_file() {
            assert!(file.ends_with("procrun/config.toml"));
            assert!(config_paths().contains(&file));
        }
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("PROCRUN_DEFAULTS__SHELL", "zsh");

        let config = load_config(None).unwrap();

        // Clean up BEFORE assertion to ensure cleanup happens
        std::env::remove_var("PROCRUN_DEFAULTS__SHELL");

        assert_eq!(config.defaults.shell, "zsh");
    }

    #[test]
    fn test_missing_override_file_uses_defaults() {
        let config = load_config(Some("/nonexistent/config.toml")).unwrap();

        assert_eq!(config.defaults.timeout_ms, 30_000);
    }
}
