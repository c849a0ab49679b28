//! procrun CLI entry point
//!
//! Usage:
//!   procrun run <program> [args...]   Run a program and print its stdout
//!   procrun shell <command>           Run a command string through the shell
//!   procrun preset <name> [args...]   Run a configured preset
//!   procrun config                    Show configuration

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use procrun::cli::{
    commands::{ConfigArgs, ConfigFormat, ExecArgs, OutputFormat, PresetArgs, RunArgs, ShellArgs},
    Cli, Commands,
};
use procrun::config::{default_config_file, find_config_files, load_config, Config};
use procrun::error::{ErrorInfo, RunError};
use procrun::executor::{exec_command, timeout_from_millis, ExecOptions};
use procrun::process::ProcessDescriptor;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Install the log subscriber; logs go to stderr so stdout stays clean
fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("procrun=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => run_program(args, &config, cli.verbose).await,
        Commands::Shell(args) => run_shell(args, &config, cli.verbose).await,
        Commands::Preset(args) => run_preset(args, &config, cli.verbose).await,
        Commands::Config(args) => {
            show_config(args, &config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run a program with arguments
async fn run_program(args: RunArgs, config: &Config, verbose: bool) -> Result<ExitCode> {
    let descriptor = apply_exec_args(ProcessDescriptor::new(args.program).args(args.args), &args.exec);
    let timeout = resolve_timeout(args.exec.timeout_ms, config.default_timeout());

    execute(descriptor, timeout, args.exec.format, verbose).await
}

/// Run a command string through the configured shell
async fn run_shell(args: ShellArgs, config: &Config, verbose: bool) -> Result<ExitCode> {
    let descriptor = apply_exec_args(
        ProcessDescriptor::shell(&config.defaults.shell, args.command),
        &args.exec,
    );
    let timeout = resolve_timeout(args.exec.timeout_ms, config.default_timeout());

    execute(descriptor, timeout, args.exec.format, verbose).await
}

/// Run a configured preset, appending extra arguments
async fn run_preset(args: PresetArgs, config: &Config, verbose: bool) -> Result<ExitCode> {
    let preset = config.get_preset(&args.name).with_context(|| {
        let available = config.list_presets();
        if available.is_empty() {
            format!("Preset '{}' not found. No presets are configured.", args.name)
        } else {
            format!(
                "Preset '{}' not found. Available: {}",
                args.name,
                available.join(", ")
            )
        }
    })?;

    if verbose {
        eprintln!("{}: {}", "preset".cyan(), preset.name);
    }

    let timeout = resolve_timeout(args.timeout_ms, preset.timeout());
    let descriptor = preset.descriptor.args(args.args);

    execute(descriptor, timeout, args.format, verbose).await
}

fn apply_exec_args(mut descriptor: ProcessDescriptor, exec: &ExecArgs) -> ProcessDescriptor {
    if let Some(ref cwd) = exec.cwd {
        descriptor = descriptor.in_dir(cwd);
    }
    for (key, value) in exec.env_as_map() {
        descriptor = descriptor.with_env(key, value);
    }
    descriptor
}

/// An explicit flag wins over the configured timeout
fn resolve_timeout(flag_ms: Option<i64>, configured: Option<Duration>) -> Option<Duration> {
    match flag_ms {
        Some(ms) => timeout_from_millis(ms),
        None => configured,
    }
}

/// Run the descriptor, cancelling on Ctrl-C, and report the outcome
async fn execute(
    descriptor: ProcessDescriptor,
    timeout: Option<Duration>,
    format: OutputFormat,
    verbose: bool,
) -> Result<ExitCode> {
    let command = descriptor.command_line();
    if verbose {
        eprintln!("{}: {} (timeout: {:?})", "run".cyan(), command, timeout);
    }

    let token = CancellationToken::new();
    let interrupt = token.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received, canceling run");
            interrupt.cancel();
        }
    });

    let options = ExecOptions {
        timeout,
        cancellation: token,
    };
    let start = Instant::now();
    let outcome = exec_command(descriptor, &options).await;
    ctrl_c.abort();

    if verbose && outcome.is_ok() {
        eprintln!(
            "{}: {} completed in {}ms",
            "success".green(),
            command,
            start.elapsed().as_millis()
        );
    }

    report(outcome, format)
}

fn report(outcome: Result<String, RunError>, format: OutputFormat) -> Result<ExitCode> {
    let mut out = io::stdout().lock();

    match outcome {
        Ok(stdout) => {
            match format {
                OutputFormat::Plain => write!(out, "{}", stdout)?,
                OutputFormat::Json => writeln!(
                    out,
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({ "stdout": stdout }))?
                )?,
            }
            out.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let info = ErrorInfo::from(&err);
            match format {
                OutputFormat::Json => {
                    writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?;
                    out.flush()?;
                }
                OutputFormat::Plain => {
                    eprintln!("{}: {}", "error".red().bold(), err);
                    if let Some(ref suggestion) = info.suggestion {
                        eprintln!("{}: {}", "hint".yellow(), suggestion);
                    }
                }
            }
            Ok(ExitCode::from(err.exit_code()))
        }
    }
}

/// Show resolved configuration
fn show_config(args: ConfigArgs, config: &Config) -> Result<()> {
    match args.format {
        ConfigFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigFormat::Toml => {
            print!(
                "{}",
                toml::to_string_pretty(config).context("Failed to serialize configuration")?
            );
        }
        ConfigFormat::Table => {
            let files = find_config_files();
            println!("{}:", "Config Files".cyan());
            if files.is_empty() {
                println!("  None (using defaults)");
            } else {
                for file in &files {
                    println!("  - {}", file.display());
                }
            }
            if let Some(path) = default_config_file() {
                println!("  User config: {}", path.display());
            }

            println!();
            println!("{}:", "Defaults".cyan());
            let timeout = match timeout_from_millis(config.defaults.timeout_ms) {
                Some(_) => format!("{}ms", config.defaults.timeout_ms),
                None => "disabled".to_string(),
            };
            println!("  timeout: {}", timeout);
            println!("  shell: {}", config.defaults.shell);

            println!();
            println!("{}:", "Presets".cyan());
            let names = config.list_presets();
            if names.is_empty() {
                println!("  None");
            } else {
                let max_name_width = names.iter().map(|n| n.len()).max().unwrap_or(10);
                for name in &names {
                    if let Some(preset) = config.get_preset(name) {
                        let desc = preset
                            .description
                            .as_ref()
                            .map(|d| format!("- {}", d))
                            .unwrap_or_else(|| preset.descriptor.command_line());
                        println!(
                            "  {:width$}  {}",
                            name.green(),
                            desc,
                            width = max_name_width
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
