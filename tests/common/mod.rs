//! Common test utilities for procrun tests
#![allow(dead_code)]

use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temporary directory with an executable script
pub fn create_script(script_name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let script_path = dir.path().join(script_name);
    std::fs::write(&script_path, content).expect("Failed to write script");

    // Make script executable on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&script_path)
            .expect("Failed to get metadata")
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script_path, perms).expect("Failed to set permissions");
    }

    (dir, script_path)
}

/// Creates a temporary directory with a config file
pub fn create_config(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (dir, config_path)
}

/// Deterministic multi-line text of at least `min_len` bytes
pub fn large_text(min_len: usize) -> String {
    let mut text = String::with_capacity(min_len + 64);
    let mut i = 0;
    while text.len() < min_len {
        text.push_str(&format!("line {:05} of generated output\n", i));
        i += 1;
    }
    text
}

/// Split text into chunks of at most `size` bytes (ASCII input)
pub fn chunked(text: &str, size: usize) -> Vec<String> {
    text.as_bytes()
        .chunks(size)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect()
}

/// Sample config with presets for testing
pub const SAMPLE_CONFIG: &str = r#"
[defaults]
timeout_ms = 10000

[presets.greet]
program = "echo"
args = ["hello"]
description = "Say hello"

[presets.slow]
program = "sleep"
args = ["10"]
timeout_ms = 100

[presets.warn]
program = "sh"
args = ["-c", "echo partial; echo 'Test error' 1>&2"]
"#;

/// Sample script writing to both streams
pub const SAMPLE_SCRIPT: &str = r#"#!/bin/sh
echo "out: $1"
if [ "$1" = "fail" ]; then
    echo "something went wrong" 1>&2
fi
"#;
