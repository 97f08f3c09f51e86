//! lorawan-lns: LoRaWAN network server.
//!
//! Terminates Basics Station gateway connections over WebSocket and
//! computes legal downstream transmissions from the configured region's
//! parameter tables.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use lorawan_protocol::{LoRaRegionType, MAX_MESSAGE_SIZE};

mod handler;
mod logging;
mod server;

use server::{Server, ServerConfig};

/// lorawan-lns - LoRaWAN network server for Basics Station gateways
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:5000")]
    listen: SocketAddr,

    /// Regulatory region (EU868, US915, CN470, AU915, AS923)
    #[arg(short, long, default_value = "EU868")]
    region: String,

    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Seconds to wait for a close frame to flush
    #[arg(long, default_value = "5")]
    close_timeout: u64,

    /// Directory where log files are stored
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Number of days to keep log files
    #[arg(long, default_value = "7")]
    log_retention_days: u64,
}

/// Configuration file format.
#[derive(Debug, serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, serde::Deserialize, Default)]
struct ServerSection {
    listen: Option<String>,
    region: Option<String>,
    close_timeout_secs: Option<u64>,
    max_message_size: Option<usize>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct LoggingSection {
    log_dir: Option<String>,
    retention_days: Option<u64>,
    level: Option<String>,
}

fn load_config(path: &PathBuf) -> Result<ConfigFile, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from("lorawan-lns.toml");
        if default_path.exists() {
            Some(default_path)
        } else {
            None
        }
    });
    let file_config = if let Some(config_path) = &config_path {
        match load_config(config_path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", config_path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e);
            }
        }
    } else {
        ConfigFile::default()
    };

    // Merge logging configs (command line takes precedence)
    let log_dir = if args.log_dir.to_string_lossy() != "logs" {
        args.log_dir.clone()
    } else {
        PathBuf::from(file_config.logging.log_dir.as_deref().unwrap_or("logs"))
    };
    let log_retention_days = if args.log_retention_days != 7 {
        args.log_retention_days
    } else {
        file_config.logging.retention_days.unwrap_or(7)
    };

    logging::init_logging(
        &log_dir,
        log_retention_days,
        args.verbose,
        file_config.logging.level.as_deref(),
    )
    .expect("Failed to initialize logging");

    let default_listen: SocketAddr = "0.0.0.0:5000".parse()?;
    let listen_addr = if args.listen != default_listen {
        args.listen
    } else {
        match &file_config.server.listen {
            Some(listen) => listen.parse::<SocketAddr>()?,
            None => args.listen,
        }
    };
    let region_name = if args.region != "EU868" {
        args.region
    } else {
        file_config.server.region.unwrap_or(args.region)
    };
    let region = LoRaRegionType::from_name(&region_name)
        .ok_or_else(|| format!("Unknown region: {}", region_name))?;
    let close_timeout_secs = file_config
        .server
        .close_timeout_secs
        .unwrap_or(args.close_timeout);
    let max_message_size = file_config
        .server
        .max_message_size
        .unwrap_or(MAX_MESSAGE_SIZE);

    let config = ServerConfig {
        listen_addr,
        region,
        close_timeout_secs,
        max_message_size,
    };

    info!("lorawan-lns starting...");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Region: {}", config.region);
    info!("  Close timeout: {}s", config.close_timeout_secs);

    let server = Server::new(config);

    // Ctrl-C cancels every live session and stops the accept loop.
    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    server.run().await?;

    Ok(())
}
