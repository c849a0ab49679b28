//! CLI command definitions using clap
//!
//! Defines all CLI subcommands and their arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

/// Bounded, cancelable process runner.
///
/// Runs a command, captures its stdout, and fails when the command writes to
/// stderr, exceeds its timeout, or is interrupted.
#[derive(Parser, Debug)]
#[command(name = "procrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (overrides default XDG paths)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a program with arguments
    Run(RunArgs),

    /// Run a command string through the configured shell
    Shell(ShellArgs),

    /// Run a configured preset
    Preset(PresetArgs),

    /// Show resolved configuration
    Config(ConfigArgs),
}

/// Options shared by every command that starts a process
#[derive(Args, Debug, Clone)]
pub struct ExecArgs {
    /// Timeout in milliseconds (negative disables, 0 expires immediately)
    #[arg(short, long = "timeout-ms", allow_negative_numbers = true)]
    pub timeout_ms: Option<i64>,

    /// Working directory for the process
    #[arg(short = 'C', long)]
    pub cwd: Option<PathBuf>,

    /// Environment variables in KEY=VALUE format
    #[arg(short, long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

impl ExecArgs {
    /// Convert env pairs to a HashMap
    pub fn env_as_map(&self) -> HashMap<String, String> {
        self.env.iter().cloned().collect()
    }
}

/// Arguments for the `run` subcommand
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub exec: ExecArgs,

    /// Program to run (bare names are looked up on PATH)
    #[arg(required = true)]
    pub program: String,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the `shell` subcommand
#[derive(Args, Debug)]
pub struct ShellArgs {
    #[command(flatten)]
    pub exec: ExecArgs,

    /// Command string passed to the shell
    #[arg(required = true)]
    pub command: String,
}

/// Arguments for the `preset` subcommand
#[derive(Args, Debug)]
pub struct PresetArgs {
    /// Preset name from the configuration
    #[arg(required = true)]
    pub name: String,

    /// Timeout in milliseconds (overrides the preset)
    #[arg(short, long = "timeout-ms", allow_negative_numbers = true)]
    pub timeout_ms: Option<i64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// Extra arguments appended to the preset's arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Parse KEY=VALUE argument
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid argument '{}': expected KEY=VALUE format", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Output format for run results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Captured stdout, verbatim
    Plain,
    /// JSON output
    Json,
}

/// Output format for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// Human-readable table format
    Table,
    /// JSON output
    Json,
    /// TOML output
    Toml,
}

/// Arguments for the `config` subcommand
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: ConfigFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_run_simple() {
        let cli = Cli::parse_from(["procrun", "run", "echo", "hello"]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.program, "echo");
            assert_eq!(args.args, vec!["hello"]);
            assert!(args.exec.timeout_ms.is_none());
            assert!(args.exec.cwd.is_none());
            assert_eq!(args.exec.format, OutputFormat::Plain);
        } else {
            panic!("Expected Run command");
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_run_with_options() {
        let cli = Cli::parse_from([
            "procrun", "run", "-t", "1500", "-C", "/tmp", "-e", "KEY=value", "-f", "json", "ls",
            "-la",
        ]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.exec.timeout_ms, Some(1500));
            assert_eq!(args.exec.cwd, Some(PathBuf::from("/tmp")));
            assert_eq!(args.exec.env_as_map().get("KEY"), Some(&"value".to_string()));
            assert_eq!(args.exec.format, OutputFormat::Json);
            assert_eq!(args.program, "ls");
            assert_eq!(args.args, vec!["-la"]);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_negative_timeout() {
        let cli = Cli::parse_from(["procrun", "run", "--timeout-ms", "-1", "sleep", "1"]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.exec.timeout_ms, Some(-1));
            assert_eq!(args.program, "sleep");
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_shell() {
        let cli = Cli::parse_from(["procrun", "shell", "-t", "0", "echo hi; echo there"]);
        if let Commands::Shell(args) = cli.command {
            assert_eq!(args.command, "echo hi; echo there");
            assert_eq!(args.exec.timeout_ms, Some(0));
        } else {
            panic!("Expected Shell command");
        }
    }

    #[test]
    fn test_cli_parse_preset() {
        let cli = Cli::parse_from(["procrun", "preset", "-t", "2000", "token", "--", "--tenant", "x"]);
        if let Commands::Preset(args) = cli.command {
            assert_eq!(args.name, "token");
            assert_eq!(args.timeout_ms, Some(2000));
            assert_eq!(args.args, vec!["--tenant", "x"]);
        } else {
            panic!("Expected Preset command");
        }
    }

    #[test]
    fn test_cli_parse_config() {
        let cli = Cli::parse_from(["procrun", "config", "-f", "toml"]);
        if let Commands::Config(args) = cli.command {
            assert_eq!(args.format, ConfigFormat::Toml);
        } else {
            panic!("Expected Config command");
        }
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["procrun", "-v", "config"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_log_json_flag() {
        let cli = Cli::parse_from(["procrun", "run", "--log-json", "true"]);
        assert!(cli.log_json);
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::parse_from(["procrun", "-c", "/path/to/config.toml", "config"]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
    }

    #[test]
    fn test_parse_key_value_valid() {
        let result = parse_key_value("FOO=bar");
        assert_eq!(result, Ok(("FOO".to_string(), "bar".to_string())));
    }

    #[test]
    fn test_parse_key_value_empty_value() {
        let result = parse_key_value("FOO=");
        assert_eq!(result, Ok(("FOO".to_string(), "".to_string())));
    }

    #[test]
    fn test_parse_key_value_with_equals() {
        let result = parse_key_value("FOO=bar=baz");
        assert_eq!(result, Ok(("FOO".to_string(), "bar=baz".to_string())));
    }

    #[test]
    fn test_parse_key_value_invalid() {
        let result = parse_key_value("INVALID");
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verify() {
        // Verify CLI structure is valid
        Cli::command().debug_assert();
    }
}
