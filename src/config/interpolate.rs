//! Configuration value interpolation
//!
//! Supports environment variable interpolation in preset values:
//! - `$VAR` or `${VAR}` - Environment variable substitution
//! - A leading `~` in `working_dir` expands to the home directory

use once_cell::sync::Lazy;
use regex::Regex;

/// `${VAR}` with explicit boundaries
static BRACKETED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// `$VAR`; names never start with a digit
static SIMPLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Interpolate a string with environment variables
///
/// Unset variables expand to the empty string.
///
/// # Examples
///
/// ```
/// use procrun::config::interpolate::interpolate_string;
///
/// std::env::set_var("MY_VAR", "hello");
/// let result = interpolate_string("Value: $MY_VAR");
/// assert_eq!(result, "Value: hello");
/// std::env::remove_var("MY_VAR");
/// ```
pub fn interpolate_string(s: &str) -> String {
    let result = BRACKETED_RE.replace_all(s, |caps: &regex::Captures| lookup(&caps[1]));
    SIMPLE_RE
        .replace_all(&result, |caps: &regex::Captures| lookup(&caps[1]))
        .to_string()
}

fn lookup(var: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| {
        tracing::debug!("Environment variable '{}' not set", var);
        String::new()
    })
}

/// Interpolate a path value, expanding `~` after variables
pub fn interpolate_path(s: &str) -> String {
    shellexpand::tilde(&interpolate_string(s)).into_owned()
}

/// Interpolate all string values in a Config
///
/// Applies to preset programs, arguments, env values, and working dirs.
pub fn interpolate_config(config: &mut super::model::Config) {
    for preset in config.presets.values_mut() {
        preset.program = interpolate_string(&preset.program);
        for arg in &mut preset.args {
            *arg = interpolate_string(arg);
        }
        for value in preset.env.values_mut() {
            *value = interpolate_string(value);
        }
        if let Some(ref mut dir) = preset.working_dir {
            *dir = interpolate_path(dir);
        }
    }
}
