//! Wire formats for the netdiag probe engine.
//!
//! This crate builds and parses the packets the probe engine puts on (and
//! reads off) the wire:
//!
//! - `ICMPv4` / `ICMPv6` echo messages
//! - `IPv4` / `IPv6` headers
//!
//! Only the fields the probe engine consumes are modelled: the 8-byte ICMP
//! header (type, code, checksum, identifier, sequence) plus payload, and the
//! IP header fields needed to locate the ICMP message in a raw datagram and
//! report the responder (header length, TTL/hop limit, source, destination).
//! ICMP extensions and IPv4 options are out of scope.
//!
//! # Endianness
//!
//! The internal representation is held in network byte order (big-endian)
//! and all accessor methods take and return data in host byte order,
//! converting as necessary for the given architecture.
//!
//! # Example
//!
//! Build an `ICMPv4` echo request:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use netdiag_packet::checksum::icmp_checksum;
//! use netdiag_packet::icmpv4::echo_request::EchoRequestPacket;
//! use netdiag_packet::icmpv4::{IcmpCode, IcmpType};
//!
//! let mut buf = [0; EchoRequestPacket::minimum_packet_size()];
//! let mut echo = EchoRequestPacket::new(&mut buf)?;
//! echo.set_icmp_type(IcmpType::EchoRequest);
//! echo.set_icmp_code(IcmpCode(0));
//! echo.set_identifier(0x1a2b);
//! echo.set_sequence(1);
//! echo.set_checksum(icmp_checksum(echo.packet()));
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// The internet checksum.
pub mod checksum;

/// `ICMPv4` packets.
pub mod icmpv4;

/// `ICMPv6` packets.
pub mod icmpv6;

/// `IPv4` packets.
pub mod ipv4;

/// `IPv6` packets.
pub mod ipv6;

/// The IP packet next layer protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IpProtocol {
    Icmp,
    IcmpV6,
    Other(u8),
}

impl IpProtocol {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Icmp => 1,
            Self::IcmpV6 => 58,
            Self::Other(id) => id,
        }
    }
}

impl From<u8> for IpProtocol {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Icmp,
            58 => Self::IcmpV6,
            p => Self::Other(p),
        }
    }
}

/// Format a payload as a hexadecimal string.
#[must_use]
pub fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}
