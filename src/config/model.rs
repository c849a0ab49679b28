//! Configuration model for procrun
//!
//! Defines the structure for XDG-compliant layered configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::executor::timeout_from_millis;
use crate::process::ProcessDescriptor;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Default settings applied to every run
    #[serde(default)]
    pub defaults: Defaults,

    /// Named command presets
    #[serde(default)]
    pub presets: HashMap<String, PresetConfig>,
}

/// Default settings applied to every run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Default timeout in milliseconds (negative disables it)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,

    /// Shell used by `procrun shell`
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_timeout_ms() -> i64 {
    30_000
}

fn default_shell() -> String {
    if cfg!(windows) {
        "cmd".to_string()
    } else {
        "sh".to_string()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            shell: default_shell(),
        }
    }
}

/// A named command preset
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PresetConfig {
    /// Program to execute
    pub program: String,

    /// Arguments passed before any extra CLI arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables for this preset
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory
    pub working_dir: Option<String>,

    /// Timeout override in milliseconds
    pub timeout_ms: Option<i64>,

    /// Human-readable description
    pub description: Option<String>,
}

/// Fully resolved preset (after applying defaults)
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPreset {
    pub name: String,
    pub descriptor: ProcessDescriptor,
    pub timeout_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResolvedPreset {
    /// Timeout budget for this preset
    pub fn timeout(&self) -> Option<Duration> {
        timeout_from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Get resolved configuration for a preset
    pub fn get_preset(&self, name: &str) -> Option<ResolvedPreset> {
        let preset = self.presets.get(name)?;

        let mut descriptor = ProcessDescriptor::new(&preset.program).args(preset.args.iter().cloned());
        descriptor.env = preset.env.clone();
        descriptor.working_dir = preset.working_dir.as_ref().map(PathBuf::from);

        Some(ResolvedPreset {
            name: name.to_string(),
            descriptor,
            timeout_ms: preset.timeout_ms.unwrap_or(self.defaults.timeout_ms),
            description: preset.description.clone(),
        })
    }

    /// Default timeout budget
    pub fn default_timeout(&self) -> Option<Duration> {
        timeout_from_millis(self.defaults.timeout_ms)
    }

    /// List all configured preset names, sorted
    pub fn list_presets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.presets.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a preset is configured
    pub fn has_preset(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }
}
