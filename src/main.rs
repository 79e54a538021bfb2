// src/main.rs

use anyhow::Context as _;
use clap::Parser;
use conduit::commands::{self, Command, Context};
use conduit::config::{CommandLineInput, ConduitConfig};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use tokio_util::sync::CancellationToken;

/// Sets up logging. The console appender writes to stderr so stdout carries
/// only command output.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("conduit.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Loads the configuration. Allocating a content path works without a
/// config file; everything else needs one.
fn load_config(cli: &CommandLineInput) -> anyhow::Result<ConduitConfig> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => ConduitConfig::default_path()?,
    };
    let config = match cli.command {
        Command::GetContentPath { .. } => ConduitConfig::load_or_default(&path),
        _ => ConduitConfig::load(&path),
    };
    config.with_context(|| format!("loading configuration from {}", path.display()))
}

#[tokio::main]
async fn main() {
    let cli = CommandLineInput::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: CommandLineInput) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let cancel = CancellationToken::new();
    let ctx = Context::new(config, cancel.clone());

    let command = commands::dispatch(&ctx, cli.command);
    tokio::pin!(command);

    // Ctrl-C stops traversals at the next batch boundary; the command still
    // finishes and reports what it gathered.
    let result = tokio::select! {
        result = &mut command => result,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted; stopping after the current batch");
            cancel.cancel();
            command.await
        }
    };

    Ok(result?)
}
