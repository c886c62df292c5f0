//! Yamaha Server - headless bridge for Yamaha receivers and MusicCast devices.
//!
//! Loads a YAML device list, starts the push listeners, monitors every
//! configured device and logs what it would report to a host platform.

mod config;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use yamaha_core::{bootstrap_services, BootstrappedServices, LoggingPlatform, Protocol};

use crate::config::ServerConfig;

/// Yamaha Server - headless receiver and MusicCast bridge.
#[derive(Parser, Debug)]
#[command(name = "yamaha-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "YAMAHA_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// UDP port for MusicCast unicast events (overrides config file).
    #[arg(short = 'u', long, env = "YAMAHA_UNICAST_PORT")]
    unicast_port: Option<u16>,

    /// TCP port for UPnP event callbacks (overrides config file).
    #[arg(short = 'e', long, env = "YAMAHA_EVENT_PORT")]
    event_port: Option<u16>,

    /// Advertise IP address (overrides config file).
    #[arg(short = 'a', long, env = "YAMAHA_ADVERTISE_IP")]
    advertise_ip: Option<IpAddr>,

    /// Run one SSDP scan at startup and log the devices that can be paired.
    #[arg(long)]
    discover: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Yamaha Server v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(port) = args.unicast_port {
        config.unicast_port = port;
    }
    if let Some(port) = args.event_port {
        config.event_port = port;
    }
    if let Some(ip) = args.advertise_ip {
        config.advertise_ip = Some(ip);
    }

    log::info!(
        "Configuration: unicast_port={}, event_port={}, advertise_ip={}, devices={}",
        config.unicast_port,
        config.event_port,
        config
            .advertise_ip
            .map_or_else(|| "auto".to_string(), |ip| ip.to_string()),
        config.devices.len()
    );

    let platform = Arc::new(LoggingPlatform::new());
    for device in &config.devices {
        platform.seed(&device.id, device.settings.clone());
    }

    let services = bootstrap_services(&config.to_core_config(), platform).await.context(
        "Failed to bootstrap services. \
         If local IP detection failed, specify --advertise-ip or set YAMAHA_ADVERTISE_IP.",
    )?;

    log::info!("Services bootstrapped successfully");

    for device in &config.devices {
        if let Err(e) = services.manager.add_device(&device.id, device.protocol) {
            log::error!("Failed to add device {}: {}", device.id, e);
        }
    }

    if args.discover {
        run_discovery(&services).await;
    }

    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");
    services.shutdown().await;

    log::info!("Shutdown complete");
    Ok(())
}

/// Logs every pairable device found by one scan.
async fn run_discovery(services: &BootstrappedServices) {
    match services.discover(None).await {
        Ok(candidates) => {
            for candidate in candidates {
                let paired = services.manager.device(&candidate.id).is_some();
                log::info!(
                    "Found {} {} at {} ({}){}",
                    match candidate.protocol {
                        Protocol::Legacy => "receiver",
                        Protocol::Extended => "MusicCast device",
                    },
                    candidate.name,
                    candidate.address,
                    candidate.id,
                    if paired { " - already monitored" } else { "" }
                );
            }
        }
        Err(e) => log::warn!("Discovery failed: {}", e),
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
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
}
