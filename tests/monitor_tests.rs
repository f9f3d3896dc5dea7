//! End-to-end tests against the real loopback interface and local sockets.
//!
//! WAN candidates use RFC 5737 TEST-NET addresses (never routable) or
//! listeners bound on 127.0.0.1, so no test depends on actual internet
//! access. The watched interface is always `lo`, which is up on any sane
//! test host.

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use linkmon::{MonitorError, MonitorOptions, NetworkMonitor, ProbeError, WanServer};

const DEAD_SERVER: (&str, u16) = ("203.0.113.1", 9);

fn dead_server() -> WanServer {
    WanServer::new(DEAD_SERVER.0, DEAD_SERVER.1)
}

/// Options pinned to loopback with a fast cycle and no routable traffic.
fn base_options() -> MonitorOptions {
    MonitorOptions {
        timeout_ms: Some(100),
        check_interval_sec: Some(1),
        wan_servers: Some(vec![dead_server()]),
        lan_interface: Some("lo".to_string()),
        ..Default::default()
    }
}

#[test]
fn state_is_unset_until_first_iteration() {
    // A single dead candidate at 1s timeout keeps the first probe cycle
    // busy for several seconds, so reads right after construction see the
    // pre-check snapshot.
    let monitor = NetworkMonitor::new(MonitorOptions {
        timeout_ms: Some(1000),
        ..base_options()
    })
    .unwrap();

    assert!(!monitor.wan_status());
    assert!(!monitor.lan_status());
    assert_eq!(monitor.last_check_time(), None);
    assert_eq!(monitor.last_error(), None);
}

#[test]
fn unreachable_wan_reads_down_with_error() {
    let monitor = NetworkMonitor::new(base_options()).unwrap();

    // First cycle: 3 attempts x 100ms plus 700ms of backoff.
    thread::sleep(Duration::from_millis(2500));

    assert!(!monitor.wan_status());
    assert!(matches!(
        monitor.last_error(),
        Some(ProbeError::WanConnect { .. })
    ));
    // Loopback is up and running, and a LAN reading never masks the WAN
    // failure's error code.
    assert!(monitor.lan_status());
    assert!(monitor.last_check_time().is_some());
}

#[test]
fn second_server_brings_wan_up() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let monitor = NetworkMonitor::new(MonitorOptions {
        wan_servers: Some(vec![dead_server(), WanServer::new("127.0.0.1", port)]),
        ..base_options()
    })
    .unwrap();

    thread::sleep(Duration::from_millis(2500));

    assert!(monitor.wan_status());
    assert_eq!(monitor.last_error(), None);
    assert!(monitor.last_check_time().is_some());
}

#[test]
fn construction_fails_for_unqueryable_interface() {
    let result = NetworkMonitor::new(MonitorOptions {
        lan_interface: Some("nonexistent12345".to_string()),
        ..base_options()
    });
    assert!(matches!(
        result,
        Err(MonitorError::InterfaceUnavailable { ref iface, .. }) if iface == "nonexistent12345"
    ));
}

#[test]
fn status_line_is_deterministic_before_first_check() {
    let monitor = NetworkMonitor::new(MonitorOptions {
        timeout_ms: Some(250),
        proxy_url: Some("http://proxy.example:8080".to_string()),
        wan_servers: Some(vec![WanServer::new("192.0.2.7", 9)]),
        ..base_options()
    })
    .unwrap();

    assert_eq!(
        monitor.status_line(),
        "NetworkMonitor: WAN=down, LAN=down, LastCheck=never, Timeout=250ms, \
         Proxy=http://proxy.example:8080, WANHost=192.0.2.7:9, LANIface=lo"
    );
}

#[test]
fn status_line_reflects_config_changes() {
    let monitor = NetworkMonitor::new(base_options()).unwrap();

    monitor.set_timeout_ms(2000);
    monitor.set_proxy("http://example-proxy:8080");
    monitor.set_wan_test_host("1.1.1.1");
    monitor.set_wan_test_port(443);
    monitor.set_lan_interface("lo");

    let line = monitor.status_line();
    assert!(line.contains("Timeout=2000ms"));
    assert!(line.contains("Proxy=http://example-proxy:8080"));
    assert!(line.contains("WANHost=1.1.1.1:443"));
    assert!(line.contains("LANIface=lo"));
}

#[test]
fn setters_clamp_invalid_values() {
    let monitor = NetworkMonitor::new(base_options()).unwrap();

    monitor.set_timeout_ms(0);
    monitor.set_check_interval_sec(0);
    monitor.set_wan_test_host("");
    monitor.set_wan_test_port(0);
    monitor.set_lan_interface("");

    let config = monitor.config();
    assert_eq!(config.timeout, Duration::from_millis(1000));
    assert_eq!(config.check_interval, Duration::from_secs(5));
    assert_eq!(config.wan_servers[0], WanServer::new("8.8.8.8", 53));
    assert_eq!(config.lan_interface, "eth0");
}

#[test]
fn setters_keep_valid_values() {
    let monitor = NetworkMonitor::new(base_options()).unwrap();

    monitor.set_timeout_ms(2500);
    monitor.set_check_interval_sec(30);
    monitor.set_wan_test_host("192.0.2.44");
    monitor.set_wan_test_port(443);

    let config = monitor.config();
    assert_eq!(config.timeout, Duration::from_millis(2500));
    assert_eq!(config.check_interval, Duration::from_secs(30));
    assert_eq!(config.wan_servers[0], WanServer::new("192.0.2.44", 443));
    // Only the primary candidate is touched by the per-field setters.
    assert_eq!(config.wan_servers.len(), 1);
}

#[test]
fn shutdown_joins_the_scheduler() {
    let monitor = NetworkMonitor::new(base_options()).unwrap();
    thread::sleep(Duration::from_millis(1500));
    // Blocks until the scheduler observes the stop flag and exits; must not
    // hang past one interval plus one probe cycle.
    monitor.shutdown();
}
