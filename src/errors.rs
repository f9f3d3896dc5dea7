use std::io;
use std::net::SocketAddrV4;

use thiserror::Error;

/// Failure recorded by a single connectivity sub-check.
///
/// This is the structured replacement for a raw `errno` slot: each variant
/// names which sub-check produced it, so a reader of the last-error slot can
/// tell a WAN connect failure from a LAN flags-query failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// A configured WAN host is not a dotted-decimal IPv4 literal.
    /// Hostnames are never resolved; a bad literal counts as a connection
    /// failure for that server.
    #[error("WAN host {0:?} is not an IPv4 literal")]
    WanHostNotIpv4(String),

    /// A TCP connect attempt to a WAN server failed or timed out.
    #[error("WAN connect to {addr} failed: {kind:?}")]
    WanConnect {
        addr: SocketAddrV4,
        kind: io::ErrorKind,
    },

    /// The interface flags query (SIOCGIFFLAGS) failed, e.g. the interface
    /// does not exist. Distinct from an interface that is merely down.
    #[error("flags query for interface {iface:?} failed (errno {errno})")]
    LanQuery { iface: String, errno: i32 },
}

/// Errors that can abort monitor construction
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The chosen LAN interface could not be queried at all. Construction
    /// validates queryability, not link state; a down interface is fine.
    #[error("LAN interface {iface:?} cannot be queried")]
    InterfaceUnavailable {
        iface: String,
        #[source]
        source: ProbeError,
    },

    /// The background scheduler thread could not be started.
    #[error("failed to start monitor thread: {0}")]
    ThreadSpawn(#[from] io::Error),
}

/// Shorthand result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;
