//! Default-route detection via the kernel routing table.
//!
//! `/proc/net/route` is a root-free way to find which interface carries the
//! default route. Each data line is whitespace-separated:
//! `Iface  Destination  Gateway  Flags ...` with the numeric fields in hex.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::debug;

const PROC_NET_ROUTE: &str = "/proc/net/route";

// Route flag bits from <linux/route.h>
const RTF_UP: u64 = 0x0001;
const RTF_GATEWAY: u64 = 0x0002;

/// Find the interface carrying an active default route.
///
/// `Ok(None)` means the table was readable but no record qualified, which is
/// an ordinary outcome (e.g. an isolated host), not an error. `Err` means the
/// table could not be read at all.
pub fn detect_default_interface() -> io::Result<Option<String>> {
    detect_default_interface_at(Path::new(PROC_NET_ROUTE))
}

/// Same as [`detect_default_interface`] but reading an arbitrary path, so
/// fixtures can stand in for `/proc/net/route`.
pub fn detect_default_interface_at(path: &Path) -> io::Result<Option<String>> {
    let file = File::open(path)?;
    find_default_route(BufReader::new(file))
}

/// Scan routing-table records for the first active default route.
///
/// A record qualifies iff destination is 0, both RTF_UP and RTF_GATEWAY are
/// set, and the gateway is non-zero. The header line and malformed lines are
/// skipped because their numeric fields fail to parse as hex.
pub fn find_default_route<R: BufRead>(reader: R) -> io::Result<Option<String>> {
    for line in reader.lines() {
        let line = line?;
        let mut fields = line.split_whitespace();

        let iface = match fields.next() {
            Some(f) => f,
            None => continue,
        };
        let parsed = (
            fields.next().and_then(|f| u64::from_str_radix(f, 16).ok()),
            fields.next().and_then(|f| u64::from_str_radix(f, 16).ok()),
            fields.next().and_then(|f| u64::from_str_radix(f, 16).ok()),
        );
        let (dest, gateway, flags) = match parsed {
            (Some(d), Some(g), Some(f)) => (d, g, f),
            _ => continue,
        };

        if dest == 0 && flags & RTF_UP != 0 && flags & RTF_GATEWAY != 0 && gateway != 0 {
            debug!("default route found on interface {}", iface);
            return Ok(Some(iface.to_string()));
        }
    }

    debug!("no default route in routing table");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    const HEADER: &str =
        "Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT";

    #[test]
    fn selects_interface_with_default_gateway() {
        let table = format!(
            "{}\n\
             eth0\t00000000\t0101A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0\n\
             eth0\t0001A8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0\n",
            HEADER
        );
        let found = find_default_route(Cursor::new(table)).unwrap();
        assert_eq!(found.as_deref(), Some("eth0"));
    }

    #[test]
    fn first_qualifying_record_wins() {
        let table = "wlan0\t00000000\t0101A8C0\t0003\t0\t0\t600\t00000000\t0\t0\t0\n\
                     eth0\t00000000\t0102A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0\n";
        let found = find_default_route(Cursor::new(table)).unwrap();
        assert_eq!(found.as_deref(), Some("wlan0"));
    }

    #[test]
    fn ignores_routes_without_gateway_flag() {
        // Destination 0 but only RTF_UP set: a gatewayless default (e.g. a
        // point-to-point link record) does not qualify.
        let table = "tun0\t00000000\t00000000\t0001\t0\t0\t0\t00000000\t0\t0\t0\n";
        let found = find_default_route(Cursor::new(table)).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn ignores_zero_gateway() {
        let table = "eth0\t00000000\t00000000\t0003\t0\t0\t0\t00000000\t0\t0\t0\n";
        let found = find_default_route(Cursor::new(table)).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn ignores_non_default_destinations() {
        let table = "eth0\t0001A8C0\t0101A8C0\t0003\t0\t0\t0\t00FFFFFF\t0\t0\t0\n";
        let found = find_default_route(Cursor::new(table)).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn header_only_table_finds_nothing() {
        let found = find_default_route(Cursor::new(format!("{}\n", HEADER))).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn reads_fixture_file() {
        let mut fixture = tempfile::NamedTempFile::new().unwrap();
        writeln!(fixture, "{}", HEADER).unwrap();
        writeln!(
            fixture,
            "enp3s0\t00000000\t0101A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0"
        )
        .unwrap();

        let found = detect_default_interface_at(fixture.path()).unwrap();
        assert_eq!(found.as_deref(), Some("enp3s0"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = detect_default_interface_at(Path::new("/nonexistent/route"));
        assert!(result.is_err());
    }
}
