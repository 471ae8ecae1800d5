mod config_commands;
mod extract_command;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    pinsaver_config::{PinsaverConfig, Requirements, Severity},
    pinsaver_media::Pipeline,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "pinsaver", about = "Pinsaver: send Pinterest media back into Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "PINSAVER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot (default when no subcommand is provided).
    Run,
    /// Run the pipeline on a text locally and save the media into a directory.
    Extract {
        /// Message text containing one or more pin links.
        text: String,
        /// Directory that receives the extracted files.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config and refuse to continue on validation errors.
fn load_config(cli: &Cli, requires: Requirements) -> anyhow::Result<PinsaverConfig> {
    let config = pinsaver_config::discover_and_load(cli.config.as_deref())?;
    let result = pinsaver_config::validate(&config, requires);
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
        }
    }
    if result.has_errors() {
        anyhow::bail!("invalid configuration (run `pinsaver config check` for details)");
    }
    Ok(config)
}

fn build_pipeline(config: &PinsaverConfig) -> anyhow::Result<Pipeline> {
    let client = pinsaver_media::build_client(&config.http)?;
    let pipeline = Pipeline::from_config(config, client)?;
    info!(strategies = ?pipeline.strategy_names(), "pipeline ready");
    Ok(pipeline)
}

async fn run_bot(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli, Requirements { telegram: true })?;
    let pipeline = Arc::new(build_pipeline(&config)?);

    let bot = pinsaver_telegram::build_bot(&config.telegram)?;
    let cancel = CancellationToken::new();
    let handle =
        pinsaver_telegram::start_polling(bot, &config.telegram, pipeline, cancel.clone())
            .await
            .context("failed to start telegram bot")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            info!("shutdown requested");
            cancel.cancel();
        },
        () = cancel.cancelled() => {},
    }
    handle.await?;
    info!("pinsaver stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "pinsaver starting");

    match cli.command.take() {
        None | Some(Commands::Run) => run_bot(&cli).await,
        Some(Commands::Extract { text, out }) => {
            let config = load_config(&cli, Requirements::default())?;
            let pipeline = build_pipeline(&config)?;
            extract_command::run_extract(&pipeline, &text, &out).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
