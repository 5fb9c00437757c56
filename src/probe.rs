use log::debug;
use serde::Serialize;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

pub use crate::wol::DEFAULT_PORT;

/// Timeout used for interactive status checks.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
/// Timeout used by scheduled sweeps.
pub const SWEEP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Online,
    Offline,
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        *self == Self::Online
    }
}

/// Tries a TCP connect to `(address, port)`. Any failure, including name
/// resolution, is reported as `Offline`.
///
/// Resolved addresses are tried in order until one connects or `timeout` has
/// elapsed overall. Name resolution itself is not bounded by `timeout`.
pub fn check_reachable(address: &str, port: u16, timeout: Duration) -> Reachability {
    let addrs = match (address, port).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(err) => {
            debug!("could not resolve {}:{}: {}", address, port, err);
            return Reachability::Offline;
        }
    };
    let deadline = Instant::now() + timeout;
    for addr in addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match TcpStream::connect_timeout(&addr, remaining) {
            Ok(_) => return Reachability::Online,
            Err(err) => debug!("connect to {} failed: {}", addr, err),
        }
    }
    Reachability::Offline
}

#[cfg(test)]
mod tests {
    use crate::probe::*;
    use std::net::TcpListener;

    #[test]
    fn test_listening_port_is_online() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert_eq!(
            check_reachable("127.0.0.1", port, DEFAULT_TIMEOUT),
            Reachability::Online
        );
    }

    #[test]
    fn test_closed_port_is_offline() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let timeout = Duration::from_secs(1);
        let start = Instant::now();
        assert_eq!(
            check_reachable("127.0.0.1", port, timeout),
            Reachability::Offline
        );
        assert!(start.elapsed() < timeout + Duration::from_millis(500));
    }

    #[test]
    fn test_unresolvable_is_offline() {
        assert_eq!(
            check_reachable("", DEFAULT_PORT, DEFAULT_TIMEOUT),
            Reachability::Offline
        );
    }

    #[test]
    fn test_zero_timeout_is_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert_eq!(
            check_reachable("127.0.0.1", port, Duration::ZERO),
            Reachability::Offline
        );
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Reachability::Online).unwrap(),
            "\"online\""
        );
        assert_eq!(
            serde_json::to_string(&Reachability::Offline).unwrap(),
            "\"offline\""
        );
    }
}
