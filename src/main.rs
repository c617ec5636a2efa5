//! FTP Gateway - HTTP API in front of FTP servers
//!
//! Run with `ftp-gateway` or `ftp-gateway --help` for usage.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ftp_gateway::{
    config::{Backend, Config},
    ftp::connector_for,
    http,
    session::SessionManager,
    APP_NAME, VERSION,
};

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "HTTP gateway exposing FTP server sessions to web clients")]
#[command(long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway (default)
    Serve {
        /// Address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Serve sessions from the built-in in-memory server
        #[arg(long)]
        memory: bool,
    },

    /// Show configuration
    Config {
        /// Initialize config file with defaults
        #[arg(long)]
        init: bool,
    },
}

fn setup_logging(debug: bool, log_file: Option<&PathBuf>) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        // Use info level for our crate, warn for dependencies
        EnvFilter::new("info")
            .add_directive("suppaftp=warn".parse()?)
            .add_directive("hyper=warn".parse()?)
            .add_directive("tokio=warn".parse()?)
    };

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(file).with_ansi(false))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn run_server(config: Config) -> Result<()> {
    let connector = connector_for(&config);
    let manager = Arc::new(SessionManager::new(&config, connector));

    let listener = TcpListener::bind(config.bind_addr()?).await?;
    info!(
        "Starting FTP gateway v{} ({:?} backend, {} workers, contention: {})",
        VERSION, config.backend, config.worker_threads, config.session_contention
    );

    let served = http::serve(listener, &config, manager.clone(), shutdown_signal()).await;

    // Best-effort: close whatever is still open, even if serving failed
    manager.close_all().await;

    served?;
    info!("FTP gateway stopped");
    Ok(())
}

/// Apply the CLI debug flag, validate, set up logging and run
async fn serve(mut config: Config, debug: bool) -> Result<()> {
    config.debug |= debug;
    config.validate()?;

    setup_logging(config.debug, config.log_file.as_ref())?;
    run_server(config).await
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks
    color_eyre::install()?;

    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => Config::config_file_path()?,
    };

    match cli.command {
        None => {
            let config = Config::load_from(&config_path)?;
            serve(config, cli.debug).await?;
        }

        Some(Commands::Serve { host, port, memory }) => {
            let mut config = Config::load_from(&config_path)?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if memory {
                config.backend = Backend::Memory;
            }
            serve(config, cli.debug).await?;
        }

        Some(Commands::Config { init }) => {
            let config = Config::load_from(&config_path).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config, using defaults: {}", e);
                Config::default()
            });

            if init {
                Config::default().save_to(&config_path)?;
                println!("Configuration initialized at {:?}", config_path);
            } else {
                println!("Configuration:");
                println!("{}", toml::to_string_pretty(&config)?);
                println!("\nConfig file: {:?}", config_path);
            }
        }
    }

    Ok(())
}
