//! The background connectivity monitor.
//!
//! A [`NetworkMonitor`] owns one scheduler thread that periodically runs the
//! WAN and LAN probes and publishes the result into a shared snapshot. All
//! configuration and state live behind a single mutex; probes always run
//! with the lock released, so status reads and config writes never wait on
//! network I/O.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};

use crate::errors::{MonitorError, MonitorResult, ProbeError};
use crate::probe::{self, WanServer};
use crate::route;

pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_CHECK_INTERVAL_SEC: u64 = 5;
pub const DEFAULT_WAN_HOST: &str = "8.8.8.8";
pub const DEFAULT_WAN_PORT: u16 = 53;
pub const DEFAULT_LAN_INTERFACE: &str = "eth0";

/// Cap on the WAN candidate list; balances redundancy against worst-case
/// probe latency (servers x attempts x timeout).
pub const MAX_WAN_SERVERS: usize = 4;

/// Construction-time overrides. Every field is optional and defaulted
/// independently; zero or empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct MonitorOptions {
    pub timeout_ms: Option<u64>,
    pub check_interval_sec: Option<u64>,
    pub proxy_url: Option<String>,
    /// Replaces the whole candidate list. Truncated to [`MAX_WAN_SERVERS`]
    /// entries; an empty list counts as unset.
    pub wan_servers: Option<Vec<WanServer>>,
    /// Replaces the host of the first (primary) WAN candidate.
    pub wan_test_host: Option<String>,
    /// Replaces the port of the first (primary) WAN candidate.
    pub wan_test_port: Option<u16>,
    /// Interface to watch; auto-detected from the routing table when unset.
    pub lan_interface: Option<String>,
}

/// Live tunables read by the scheduler on every iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub timeout: Duration,
    pub check_interval: Duration,
    /// Stored for future HTTP-based checks; never used to route a probe.
    pub proxy_url: String,
    /// Ordered candidates, probed first to last. Never empty, at most
    /// [`MAX_WAN_SERVERS`] entries.
    pub wan_servers: Vec<WanServer>,
    pub lan_interface: String,
}

impl MonitorConfig {
    fn from_options(opts: &MonitorOptions, lan_interface: String) -> Self {
        let mut wan_servers = match opts.wan_servers.as_deref().filter(|s| !s.is_empty()) {
            Some(servers) => servers[..servers.len().min(MAX_WAN_SERVERS)].to_vec(),
            None => default_wan_servers(),
        };
        if let Some(host) = opts.wan_test_host.as_deref().filter(|h| !h.is_empty()) {
            wan_servers[0].host = host.to_string();
        }
        if let Some(port) = opts.wan_test_port.filter(|p| *p > 0) {
            wan_servers[0].port = port;
        }

        Self {
            timeout: clamp_timeout_ms(opts.timeout_ms.unwrap_or(0)),
            check_interval: clamp_interval_sec(opts.check_interval_sec.unwrap_or(0)),
            proxy_url: opts.proxy_url.clone().unwrap_or_default(),
            wan_servers,
            lan_interface,
        }
    }
}

/// Most recent probe results, written only by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub wan_up: bool,
    pub lan_up: bool,
    /// `None` until the first scheduler iteration completes.
    pub last_check: Option<DateTime<Utc>>,
    /// Outcome of the most recent failed sub-check. Overwritten on every
    /// probe, so it can be stale relative to the up/down flags; it is a
    /// debugging aid, not an audit trail.
    pub last_error: Option<ProbeError>,
}

struct Shared {
    config: MonitorConfig,
    state: MonitorState,
    running: bool,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn default_wan_servers() -> Vec<WanServer> {
    vec![
        WanServer::new("8.8.8.8", 53),        // Google
        WanServer::new("1.1.1.1", 53),        // Cloudflare
        WanServer::new("9.9.9.9", 53),        // Quad9
        WanServer::new("208.67.222.222", 53), // OpenDNS
    ]
}

fn clamp_timeout_ms(ms: u64) -> Duration {
    Duration::from_millis(if ms > 0 { ms } else { DEFAULT_TIMEOUT_MS })
}

fn clamp_interval_sec(sec: u64) -> Duration {
    Duration::from_secs(if sec > 0 { sec } else { DEFAULT_CHECK_INTERVAL_SEC })
}

fn clamp_port(port: u16) -> u16 {
    if port > 0 {
        port
    } else {
        DEFAULT_WAN_PORT
    }
}

/// Strip NUL bytes and truncate to the kernel interface-name limit.
fn sanitize_interface_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| *c != '\0').collect();
    let mut end = cleaned.len().min(libc::IFNAMSIZ - 1);
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    cleaned[..end].to_string()
}

fn resolve_lan_interface(opts: &MonitorOptions) -> String {
    if let Some(name) = opts.lan_interface.as_deref().filter(|n| !n.is_empty()) {
        return sanitize_interface_name(name);
    }
    match route::detect_default_interface() {
        Ok(Some(iface)) => {
            info!("auto-detected LAN interface {:?} from routing table", iface);
            sanitize_interface_name(&iface)
        }
        Ok(None) => {
            debug!("no default route found, watching \"lo\"");
            "lo".to_string()
        }
        Err(e) => {
            warn!("routing table unreadable ({}), watching \"lo\"", e);
            "lo".to_string()
        }
    }
}

/// Thread-safe WAN/LAN connectivity monitor.
///
/// Construction starts the scheduler; from then on any thread may read the
/// status snapshot or adjust the configuration. Config changes take effect
/// on the scheduler's next iteration, never retroactively. Dropping the
/// monitor (or calling [`shutdown`](Self::shutdown)) signals the scheduler
/// and joins it before releasing shared state.
pub struct NetworkMonitor {
    shared: Arc<Mutex<Shared>>,
    worker: Option<JoinHandle<()>>,
}

impl NetworkMonitor {
    /// Build a monitor from `options` and start its scheduler.
    ///
    /// The chosen LAN interface is validated with one synchronous flags
    /// query; construction fails only if the query itself fails (an
    /// interface that is down but queryable is accepted). On any failure no
    /// monitor is returned and nothing keeps running.
    pub fn new(options: MonitorOptions) -> MonitorResult<Self> {
        let lan_interface = resolve_lan_interface(&options);
        let config = MonitorConfig::from_options(&options, lan_interface);

        if let Err(source) = probe::probe_lan(&config.lan_interface) {
            return Err(MonitorError::InterfaceUnavailable {
                iface: config.lan_interface,
                source,
            });
        }

        info!(
            "starting monitor: {} WAN candidate(s), LAN interface {:?}, interval {:?}",
            config.wan_servers.len(),
            config.lan_interface,
            config.check_interval
        );

        let shared = Arc::new(Mutex::new(Shared {
            config,
            state: MonitorState::default(),
            running: true,
        }));

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("linkmon-scheduler".to_string())
            .spawn(move || run_scheduler(worker_shared))?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Build a monitor with all defaults.
    pub fn with_defaults() -> MonitorResult<Self> {
        Self::new(MonitorOptions::default())
    }

    /// True if the most recent check reached at least one WAN server.
    pub fn wan_status(&self) -> bool {
        lock(&self.shared).state.wan_up
    }

    /// True if the watched interface was up with link detected at the most
    /// recent check.
    pub fn lan_status(&self) -> bool {
        lock(&self.shared).state.lan_up
    }

    /// When the scheduler last completed a check; `None` before the first
    /// iteration. Useful for spotting stale data.
    pub fn last_check_time(&self) -> Option<DateTime<Utc>> {
        lock(&self.shared).state.last_check
    }

    /// The most recent failed sub-check, or `None` if the last sub-check
    /// that touched the slot succeeded.
    pub fn last_error(&self) -> Option<ProbeError> {
        lock(&self.shared).state.last_error.clone()
    }

    /// Consistent snapshot of the whole state under one lock acquisition.
    pub fn state(&self) -> MonitorState {
        lock(&self.shared).state.clone()
    }

    /// Consistent snapshot of the current configuration.
    pub fn config(&self) -> MonitorConfig {
        lock(&self.shared).config.clone()
    }

    /// Set the per-attempt connect deadline. Zero falls back to 1000 ms.
    pub fn set_timeout_ms(&self, ms: u64) {
        lock(&self.shared).config.timeout = clamp_timeout_ms(ms);
    }

    /// Set the pause between check cycles. Zero falls back to 5 s.
    pub fn set_check_interval_sec(&self, sec: u64) {
        lock(&self.shared).config.check_interval = clamp_interval_sec(sec);
    }

    /// Store a proxy URL. Accepted for future HTTP-based checks; probes do
    /// not use it.
    pub fn set_proxy(&self, proxy_url: &str) {
        lock(&self.shared).config.proxy_url = proxy_url.to_string();
    }

    /// Replace the primary WAN candidate's host. Empty falls back to
    /// `8.8.8.8`.
    pub fn set_wan_test_host(&self, host: &str) {
        let mut s = lock(&self.shared);
        if let Some(primary) = s.config.wan_servers.first_mut() {
            primary.host = if host.is_empty() {
                DEFAULT_WAN_HOST.to_string()
            } else {
                host.to_string()
            };
        }
    }

    /// Replace the primary WAN candidate's port. Zero falls back to 53.
    pub fn set_wan_test_port(&self, port: u16) {
        let mut s = lock(&self.shared);
        if let Some(primary) = s.config.wan_servers.first_mut() {
            primary.port = clamp_port(port);
        }
    }

    /// Switch the watched interface. Empty falls back to `eth0`. Existence
    /// is not validated; a bad name shows up as a LAN query error on the
    /// next iteration.
    pub fn set_lan_interface(&self, iface: &str) {
        lock(&self.shared).config.lan_interface = if iface.is_empty() {
            DEFAULT_LAN_INTERFACE.to_string()
        } else {
            sanitize_interface_name(iface)
        };
    }

    /// One-line snapshot of state and config, read under a single lock
    /// acquisition so the fields are mutually consistent.
    pub fn status_line(&self) -> String {
        let s = lock(&self.shared);
        let last_check = s
            .state
            .last_check
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "never".to_string());
        let (host, port) = s
            .config
            .wan_servers
            .first()
            .map(|w| (w.host.as_str(), w.port))
            .unwrap_or((DEFAULT_WAN_HOST, DEFAULT_WAN_PORT));
        format!(
            "NetworkMonitor: WAN={}, LAN={}, LastCheck={}, Timeout={}ms, Proxy={}, WANHost={}:{}, LANIface={}",
            if s.state.wan_up { "up" } else { "down" },
            if s.state.lan_up { "up" } else { "down" },
            last_check,
            s.config.timeout.as_millis(),
            s.config.proxy_url,
            host,
            port,
            s.config.lan_interface
        )
    }

    /// Stop the scheduler and wait for it to exit.
    ///
    /// The stop flag is observed at the next iteration boundary, so this
    /// blocks for at most one interval plus one probe cycle. Dropping the
    /// monitor does the same.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        lock(&self.shared).running = false;
        debug!("waiting for scheduler thread to exit");
        if worker.join().is_err() {
            warn!("scheduler thread panicked during shutdown");
        }
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn run_scheduler(shared: Arc<Mutex<Shared>>) {
    debug!("scheduler started");
    loop {
        let interval = {
            let s = lock(&shared);
            if !s.running {
                break;
            }
            s.config.check_interval
        };

        // Fresh snapshot under its own lock acquisition; the config may
        // have changed since the interval was read.
        let (servers, timeout, iface) = {
            let s = lock(&shared);
            (
                s.config.wan_servers.clone(),
                s.config.timeout,
                s.config.lan_interface.clone(),
            )
        };

        // Probes run with the lock released.
        let (wan_up, wan_err) = probe::probe_wan(&servers, timeout);
        let lan_result = probe::probe_lan(&iface);

        {
            let mut s = lock(&shared);
            if wan_up != s.state.wan_up {
                if wan_up {
                    info!("WAN is reachable");
                } else {
                    warn!("WAN is unreachable: {:?}", wan_err);
                }
            }
            s.state.wan_up = wan_up;
            s.state.last_error = if wan_up { None } else { wan_err };

            match lan_result {
                Ok(up) => {
                    if up != s.state.lan_up {
                        if up {
                            info!("LAN interface {:?} is up", iface);
                        } else {
                            warn!("LAN interface {:?} is down", iface);
                        }
                    }
                    // A clean flags read never touches the error slot, so a
                    // WAN failure's code survives the LAN sub-check.
                    s.state.lan_up = up;
                }
                Err(e) => {
                    warn!("LAN probe failed: {}", e);
                    s.state.lan_up = false;
                    s.state.last_error = Some(e);
                }
            }
            s.state.last_check = Some(Utc::now());
        }

        thread::sleep(interval);
    }
    debug!("scheduler stopped");
}
