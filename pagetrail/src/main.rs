//! pagetrail - replay scripted browsing sessions through the navigation tracker
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/pagetrail/pagetrail.log (~/.local/state/pagetrail/pagetrail.log)
//! - Config: $XDG_CONFIG_HOME/pagetrail/config.toml (~/.config/pagetrail/config.toml)

mod replay;
mod script;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pagetrail_core::Config;

use script::Script;

#[derive(Parser)]
#[command(name = "pagetrail")]
#[command(about = "Replay scripted browsing sessions through the pagetrail navigation tracker")]
#[command(version)]
struct Args {
    /// Config file to use instead of the XDG default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a navigation script and print the analytics calls it produces
    Replay {
        /// Path to a JSON navigation script
        script: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the config path and the effective tracking settings
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard =
        pagetrail_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("pagetrail starting");

    match args.command {
        Command::Replay { script, format } => replay(&script, format, &config),
        Command::Config => {
            show_config(args.config.unwrap_or_else(Config::config_path), &config);
            Ok(())
        }
    }
}

fn replay(path: &std::path::Path, format: OutputFormat, config: &Config) -> Result<()> {
    let script = Script::load(path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let report = runtime.block_on(replay::run(&script, config))?;

    tracing::info!(
        calls = report.calls.len(),
        pending = report.pending_calls,
        "Replay finished"
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", replay::render_text(&report)),
    }
    Ok(())
}

fn show_config(path: PathBuf, config: &Config) {
    let tracking = &config.tracking;
    let names: Vec<&str> = config.integrations.keys().map(String::as_str).collect();

    println!("Config: {}", path.display());
    println!("Logs: {}", pagetrail_core::logging::log_file_path().display());
    println!();
    println!("autorun = {}", tracking.autorun);
    println!("virtual_delay_ms = {}", tracking.virtual_delay_ms);
    println!("popstate_delay_ms = {}", tracking.popstate_delay_ms);
    println!("first_load_delay_ms = {}", tracking.first_load_delay_ms);
    if names.is_empty() {
        println!("integrations = (none)");
    } else {
        println!("integrations = {}", names.join(", "));
    }
}
