use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use linkmon::{MonitorOptions, NetworkMonitor};

/// linkmon - background WAN/LAN connectivity monitor
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
struct Args {
    /// Path to configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Connect timeout in milliseconds
    #[clap(short = 't', long)]
    timeout_ms: Option<u64>,

    /// Check interval in seconds
    #[clap(short = 'n', long)]
    interval: Option<u64>,

    /// Primary WAN test host (IPv4 literal, e.g. 8.8.8.8)
    #[clap(long)]
    wan_host: Option<String>,

    /// Primary WAN test port (e.g. 53)
    #[clap(long)]
    wan_port: Option<u16>,

    /// LAN interface to watch (auto-detected when omitted)
    #[clap(short = 'i', long)]
    iface: Option<String>,

    /// HTTP proxy URL (stored for future HTTP checks; probes ignore it)
    #[clap(long)]
    proxy: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct Config {
    wan: Option<WanConfig>,
    lan: Option<LanConfig>,
    monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Deserialize, Clone)]
struct WanConfig {
    host: Option<String>,
    port: Option<u16>,
    proxy: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct LanConfig {
    interface: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct MonitoringConfig {
    timeout_ms: Option<u64>,
    interval: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("/etc/linkmon/config.toml"));

    let config_file: Option<Config> = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config file {:?}", config_path))?;
        Some(toml::from_str(&content).context("Failed to parse TOML")?)
    } else {
        None
    };

    // Precedence: Args -> Config File -> library defaults
    let options = MonitorOptions {
        timeout_ms: args.timeout_ms.or_else(|| {
            config_file
                .as_ref()
                .and_then(|c| c.monitoring.as_ref())
                .and_then(|m| m.timeout_ms)
        }),
        check_interval_sec: args.interval.or_else(|| {
            config_file
                .as_ref()
                .and_then(|c| c.monitoring.as_ref())
                .and_then(|m| m.interval)
        }),
        proxy_url: args.proxy.clone().or_else(|| {
            config_file
                .as_ref()
                .and_then(|c| c.wan.as_ref())
                .and_then(|w| w.proxy.clone())
        }),
        wan_servers: None,
        wan_test_host: args.wan_host.clone().or_else(|| {
            config_file
                .as_ref()
                .and_then(|c| c.wan.as_ref())
                .and_then(|w| w.host.clone())
        }),
        wan_test_port: args.wan_port.or_else(|| {
            config_file
                .as_ref()
                .and_then(|c| c.wan.as_ref())
                .and_then(|w| w.port)
        }),
        lan_interface: args.iface.clone().or_else(|| {
            config_file
                .as_ref()
                .and_then(|c| c.lan.as_ref())
                .and_then(|l| l.interface.clone())
        }),
    };

    let monitor = NetworkMonitor::new(options).context("Failed to start network monitor")?;
    info!("Monitor started; press Ctrl-C to stop");

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    // Print a snapshot once per interval, polling the stop flag often enough
    // that Ctrl-C stays responsive under long intervals.
    let mut last_print = Instant::now();
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
        let interval = monitor.config().check_interval;
        if last_print.elapsed() >= interval {
            println!("{}", monitor.status_line());
            last_print = Instant::now();
        }
    }

    info!("Shutting down");
    monitor.shutdown();
    Ok(())
}
