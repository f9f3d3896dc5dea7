//! # linkmon
//!
//! A background WAN/LAN connectivity monitor. One scheduler thread
//! periodically verifies internet reachability (TCP handshakes against a
//! short list of well-known hosts) and local-link health (interface flags),
//! and publishes the latest result so callers can query status without ever
//! blocking on network I/O.
//!
//! WAN checks need no privileges: a completed TCP handshake to any one of
//! the configured hosts (defaults: Google, Cloudflare, Quad9 and OpenDNS
//! DNS servers on port 53) counts as internet-up, and no payload is sent.
//! The LAN interface is auto-detected from `/proc/net/route` when not
//! configured, falling back to `lo`.
//!
//! ```no_run
//! use linkmon::{MonitorOptions, NetworkMonitor};
//!
//! let monitor = NetworkMonitor::new(MonitorOptions {
//!     check_interval_sec: Some(2),
//!     ..Default::default()
//! })?;
//! std::thread::sleep(std::time::Duration::from_secs(3));
//! println!("{}", monitor.status_line());
//! monitor.shutdown();
//! # Ok::<(), linkmon::MonitorError>(())
//! ```

pub mod errors;
pub mod monitor;
pub mod probe;
pub mod route;

// Re-export commonly used types and functions
pub use errors::{MonitorError, MonitorResult, ProbeError};
pub use monitor::{
    MonitorConfig, MonitorOptions, MonitorState, NetworkMonitor, DEFAULT_CHECK_INTERVAL_SEC,
    DEFAULT_TIMEOUT_MS, DEFAULT_WAN_HOST, DEFAULT_WAN_PORT, MAX_WAN_SERVERS,
};
pub use probe::{probe_lan, probe_wan, WanServer};
pub use route::detect_default_interface;
