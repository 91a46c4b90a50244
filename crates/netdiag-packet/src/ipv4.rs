use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::IpProtocol;
use std::fmt::{Debug, Formatter};
use std::net::Ipv4Addr;

const VERSION_OFFSET: usize = 0;
const IHL_OFFSET: usize = 0;
const TIME_TO_LIVE_OFFSET: usize = 8;
const PROTOCOL_OFFSET: usize = 9;
const SOURCE_OFFSET: usize = 12;
const DESTINATION_OFFSET: usize = 16;

/// Represents an `IPv4` packet.
///
/// The header is variable length: the low nibble of the first byte holds the
/// header length in 32-bit words (minimum 5, i.e. 20 bytes). Only the fields
/// the probe engine consumes are exposed.
pub struct Ipv4Packet<'a> {
    buf: Buffer<'a>,
}

impl<'a> Ipv4Packet<'a> {
    pub fn new(packet: &'a mut [u8]) -> Result<Self> {
        if packet.len() >= Self::minimum_packet_size() {
            Ok(Self {
                buf: Buffer::Mutable(packet),
            })
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("Ipv4Packet"),
                Self::minimum_packet_size(),
                packet.len(),
            ))
        }
    }

    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        if packet.len() >= Self::minimum_packet_size() {
            Ok(Self {
                buf: Buffer::Immutable(packet),
            })
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("Ipv4Packet"),
                Self::minimum_packet_size(),
                packet.len(),
            ))
        }
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        20
    }

    #[must_use]
    pub fn get_version(&self) -> u8 {
        (self.buf.read(VERSION_OFFSET) & 0xf0) >> 4
    }

    /// The header length in 32-bit words.
    #[must_use]
    pub fn get_header_length(&self) -> u8 {
        self.buf.read(IHL_OFFSET) & 0xf
    }

    #[must_use]
    pub fn get_ttl(&self) -> u8 {
        self.buf.read(TIME_TO_LIVE_OFFSET)
    }

    #[must_use]
    pub fn get_protocol(&self) -> IpProtocol {
        IpProtocol::from(self.buf.read(PROTOCOL_OFFSET))
    }

    #[must_use]
    pub fn get_source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.get_bytes(SOURCE_OFFSET))
    }

    #[must_use]
    pub fn get_destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.buf.get_bytes(DESTINATION_OFFSET))
    }

    pub fn set_version(&mut self, val: u8) {
        *self.buf.write(VERSION_OFFSET) =
            (self.buf.read(VERSION_OFFSET) & 0xf) | ((val & 0xf) << 4);
    }

    pub fn set_header_length(&mut self, val: u8) {
        *self.buf.write(IHL_OFFSET) = (self.buf.read(IHL_OFFSET) & 0xf0) | (val & 0xf);
    }

    pub fn set_ttl(&mut self, val: u8) {
        *self.buf.write(TIME_TO_LIVE_OFFSET) = val;
    }

    pub fn set_protocol(&mut self, val: IpProtocol) {
        *self.buf.write(PROTOCOL_OFFSET) = val.id();
    }

    pub fn set_source(&mut self, val: Ipv4Addr) {
        self.buf.set_bytes(SOURCE_OFFSET, val.octets());
    }

    pub fn set_destination(&mut self, val: Ipv4Addr) {
        self.buf.set_bytes(DESTINATION_OFFSET, val.octets());
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// The bytes beyond the header, as given by the header length field.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        let start = std::cmp::min(self.header_length_bytes(), self.buf.as_slice().len());
        &self.buf.as_slice()[start..]
    }

    /// The header length in bytes.
    #[must_use]
    pub fn header_length_bytes(&self) -> usize {
        usize::from(self.get_header_length()) * 4
    }
}

impl Debug for Ipv4Packet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ipv4Packet")
            .field("version", &self.get_version())
            .field("header_length", &self.get_header_length())
            .field("ttl", &self.get_ttl())
            .field("protocol", &self.get_protocol())
            .field("source", &self.get_source())
            .field("destination", &self.get_destination())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::str::FromStr;

    #[test]
    fn test_decode_synthetic_header() {
        let mut buf = [0_u8; 28];
        {
            let mut packet = Ipv4Packet::new(&mut buf).unwrap();
            packet.set_version(4);
            packet.set_header_length(5);
            packet.set_ttl(57);
            packet.set_protocol(IpProtocol::Icmp);
            packet.set_source(Ipv4Addr::from_str("10.1.2.3").unwrap());
            packet.set_destination(Ipv4Addr::from_str("192.168.1.200").unwrap());
        }
        let view = Ipv4Packet::new_view(&buf).unwrap();
        assert_eq!(4, view.get_version());
        assert_eq!(5, view.get_header_length());
        assert_eq!(20, view.header_length_bytes());
        assert_eq!(57, view.get_ttl());
        assert_eq!(IpProtocol::Icmp, view.get_protocol());
        assert_eq!(Ipv4Addr::from_str("10.1.2.3").unwrap(), view.get_source());
        assert_eq!(
            Ipv4Addr::from_str("192.168.1.200").unwrap(),
            view.get_destination()
        );
        assert_eq!(8, view.payload().len());
    }

    #[test]
    fn test_decode_captured_header() {
        let buf = hex!("45 00 0f fc 38 c0 00 00 40 01 2e 3b 0a 00 00 02 0a 00 00 01");
        let packet = Ipv4Packet::new_view(&buf).unwrap();
        assert_eq!(4, packet.get_version());
        assert_eq!(5, packet.get_header_length());
        assert_eq!(64, packet.get_ttl());
        assert_eq!(IpProtocol::Icmp, packet.get_protocol());
        assert_eq!(Ipv4Addr::from_str("10.0.0.2").unwrap(), packet.get_source());
        assert_eq!(
            Ipv4Addr::from_str("10.0.0.1").unwrap(),
            packet.get_destination()
        );
    }

    #[test]
    fn test_options_extend_header() {
        let mut buf = [0_u8; 32];
        let mut packet = Ipv4Packet::new(&mut buf).unwrap();
        packet.set_header_length(6);
        assert_eq!(24, packet.header_length_bytes());
        assert_eq!(8, packet.payload().len());
    }

    #[test]
    fn test_insufficient_buffer() {
        let buf = [0_u8; 19];
        let err = Ipv4Packet::new_view(&buf).unwrap_err();
        assert_eq!(
            Error::InsufficientPacketBuffer(String::from("Ipv4Packet"), 20, 19),
            err
        );
    }
}
