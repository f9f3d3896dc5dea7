//! Connectivity probes.
//!
//! WAN reachability is tested with bare TCP handshakes against a short list
//! of well-known hosts; no payload is sent, so the check needs no privileges
//! and costs one round trip. LAN status is read straight from the interface
//! flags via ioctl and generates no traffic at all.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::thread;
use std::time::Duration;

use log::debug;

use crate::errors::ProbeError;

/// One WAN reachability candidate: an IPv4 literal and a TCP port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WanServer {
    pub host: String,
    pub port: u16,
}

impl WanServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Connect attempts per server before moving to the next one.
const CONNECT_ATTEMPTS: u32 = 3;

/// Base backoff after a failed attempt; doubles each retry (100/200/400 ms).
const BACKOFF_BASE_MS: u64 = 100;

/// Try to reach the internet by completing a TCP handshake with any one of
/// `servers`, in order.
///
/// Each host is parsed strictly as an IPv4 literal; a host that fails to
/// parse counts as that server failing and the next one is tried. Each
/// server gets up to three connect attempts with an explicit per-attempt
/// deadline and exponential backoff between attempts. The first successful
/// handshake anywhere short-circuits the probe; the socket is dropped
/// immediately, the handshake alone is the liveness signal.
///
/// Returns `(reachable, last_error)` where `last_error` is the most recent
/// failure across all servers, or `None` on success.
pub fn probe_wan(servers: &[WanServer], timeout: Duration) -> (bool, Option<ProbeError>) {
    let mut last_error = None;

    for server in servers {
        let ip: Ipv4Addr = match server.host.parse() {
            Ok(ip) => ip,
            Err(_) => {
                debug!("WAN host {:?} is not an IPv4 literal, skipping", server.host);
                last_error = Some(ProbeError::WanHostNotIpv4(server.host.clone()));
                continue;
            }
        };
        let addr = SocketAddr::V4(SocketAddrV4::new(ip, server.port));

        for attempt in 0..CONNECT_ATTEMPTS {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    debug!("WAN probe succeeded against {}", addr);
                    drop(stream);
                    return (true, None);
                }
                Err(e) => {
                    debug!(
                        "WAN connect to {} failed (attempt {}/{}): {}",
                        addr,
                        attempt + 1,
                        CONNECT_ATTEMPTS,
                        e
                    );
                    last_error = Some(ProbeError::WanConnect {
                        addr: SocketAddrV4::new(ip, server.port),
                        kind: e.kind(),
                    });
                    thread::sleep(Duration::from_millis(BACKOFF_BASE_MS << attempt));
                }
            }
        }
    }

    (false, last_error)
}

/// Read the administrative and link state of a named interface.
///
/// Issues a SIOCGIFFLAGS query through a throwaway datagram socket.
/// `Ok(true)` means both IFF_UP and IFF_RUNNING are set; either missing
/// reads as down. A failed query (e.g. unknown interface) is an error,
/// distinct from "administratively down".
pub fn probe_lan(iface: &str) -> Result<bool, ProbeError> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(lan_query_error(iface));
    }

    let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
    let name = iface.as_bytes();
    let len = name.len().min(libc::IFNAMSIZ - 1);
    unsafe {
        std::ptr::copy_nonoverlapping(name.as_ptr(), ifr.ifr_name.as_mut_ptr() as *mut u8, len);
    }

    let rc = unsafe { libc::ioctl(fd, libc::SIOCGIFFLAGS as _, &mut ifr) };
    let query_err = if rc < 0 {
        Some(lan_query_error(iface))
    } else {
        None
    };
    unsafe {
        libc::close(fd);
    }
    if let Some(e) = query_err {
        return Err(e);
    }

    let flags = unsafe { ifr.ifr_ifru.ifru_flags };
    let up = flags & libc::IFF_UP as libc::c_short != 0
        && flags & libc::IFF_RUNNING as libc::c_short != 0;
    debug!("interface {:?} flags {:#x}, up={}", iface, flags, up);
    Ok(up)
}

fn lan_query_error(iface: &str) -> ProbeError {
    ProbeError::LanQuery {
        iface: iface.to_string(),
        errno: io::Error::last_os_error().raw_os_error().unwrap_or(0),
    }
}
