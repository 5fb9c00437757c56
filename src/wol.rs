use crate::mac::{self, HardwareAddress};
use log::{debug, info, warn};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

const SYNCHRONIZATION_SCHEME: [u8; 6] = [0xff; 6];
const REPETITIONS: usize = 16;

pub const PACKET_LEN: usize = SYNCHRONIZATION_SCHEME.len() + 6 * REPETITIONS;
pub const DEFAULT_PORT: u16 = 9;
pub const BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidAddress(#[from] mac::Error),
    #[error("Failed to send magic packet: {0}")]
    DispatchFailure(#[from] io::Error),
}

pub type DispatchResult = Result<(), Error>;

/// The 102-byte Wake-on-LAN payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MagicPacket([u8; PACKET_LEN]);

impl MagicPacket {
    pub fn new(mac_address: HardwareAddress) -> Self {
        let mut data = [0u8; PACKET_LEN];
        data[..SYNCHRONIZATION_SCHEME.len()].copy_from_slice(&SYNCHRONIZATION_SCHEME);
        for block in data[SYNCHRONIZATION_SCHEME.len()..].chunks_exact_mut(6) {
            block.copy_from_slice(&mac_address.octets());
        }
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.0
    }

    /// Sends the packet as one UDP datagram. The socket lives only for this
    /// call.
    pub fn send_to(&self, destination: impl ToSocketAddrs) -> io::Result<SocketAddr> {
        let addr = destination
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address resolved"))?;
        let bind_addr: SocketAddr = match addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_broadcast(true)?;
        socket.send_to(&self.0, addr)?;
        Ok(addr)
    }
}

pub fn build_magic_packet(address: &str) -> Result<MagicPacket, mac::Error> {
    Ok(MagicPacket::new(address.parse()?))
}

/// Builds a magic packet for `hardware_address` and hands it to the local
/// network stack. Success says nothing about whether the target woke up.
pub fn send_magic_packet(
    hardware_address: &str,
    destination_address: &str,
    destination_port: u16,
) -> DispatchResult {
    let packet = build_magic_packet(hardware_address)?;
    debug!(
        "sending magic packet for {} to {}:{}",
        hardware_address, destination_address, destination_port
    );
    match packet.send_to((destination_address, destination_port)) {
        Ok(addr) => {
            info!("magic packet for {} sent to {}", hardware_address, addr);
            Ok(())
        }
        Err(err) => {
            warn!(
                "magic packet for {} to {}:{} failed: {}",
                hardware_address, destination_address, destination_port, err
            );
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::wol::*;
    use std::time::Duration;

    const MAC: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];

    #[test]
    fn test_packet_layout() {
        let packet = build_magic_packet("AA:BB:CC:DD:EE:FF").unwrap();
        let bytes = packet.as_bytes();
        assert_eq!(bytes.len(), 102);
        assert_eq!(&bytes[..6], &SYNCHRONIZATION_SCHEME);
        for i in 0..16 {
            assert_eq!(&bytes[6 + 6 * i..12 + 6 * i], &MAC, "block {}", i);
        }
    }

    #[test]
    fn test_packet_exact_bytes() {
        let packet = MagicPacket::new(HardwareAddress::new([1, 2, 3, 4, 5, 6]));
        let mut expected: Vec<u8> = vec![0xff; 6];
        for _ in 0..16 {
            expected.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        }
        assert_eq!(packet.as_bytes().to_vec(), expected);
    }

    #[test]
    fn test_normalization_equivalence() {
        let a = build_magic_packet("AA:BB:CC:DD:EE:FF").unwrap();
        let b = build_magic_packet("aa-bb-cc-dd-ee-ff").unwrap();
        let c = build_magic_packet("AABBCCDDEEFF").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_idempotent() {
        let first = build_magic_packet("00:11:22:33:44:55").unwrap();
        for _ in 0..10 {
            assert_eq!(build_magic_packet("00:11:22:33:44:55").unwrap(), first);
        }
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(build_magic_packet("AA:BB:CC").is_err());
        assert!(build_magic_packet("GG:HH:II:JJ:KK:LL").is_err());
    }

    #[test]
    fn test_send_invalid_address_skips_network() {
        match send_magic_packet("AA:BB:CC", "127.0.0.1", DEFAULT_PORT) {
            Err(Error::InvalidAddress(_)) => {}
            other => panic!("expected InvalidAddress, got {:?}", other),
        }
    }

    #[test]
    fn test_send_delivers_one_datagram() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = listener.local_addr().unwrap().port();

        send_magic_packet("aa-bb-cc-dd-ee-ff", "127.0.0.1", port).unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(len, PACKET_LEN);
        assert_eq!(
            &buf[..len],
            build_magic_packet("AA:BB:CC:DD:EE:FF").unwrap().as_bytes()
        );

        listener
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        assert!(listener.recv_from(&mut buf).is_err());
    }

    #[test]
    fn test_send_unresolvable_destination() {
        match send_magic_packet("AA:BB:CC:DD:EE:FF", "", DEFAULT_PORT) {
            Err(Error::DispatchFailure(_)) => {}
            other => panic!("expected DispatchFailure, got {:?}", other),
        }
    }
}
