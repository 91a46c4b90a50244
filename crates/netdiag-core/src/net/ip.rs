use crate::config::HeaderMode;
use crate::error::Result;
use crate::net::Family;
use netdiag_packet::ipv4::Ipv4Packet;
use netdiag_packet::ipv6::Ipv6Packet;
use std::net::IpAddr;

/// The fields consumed from the IP header of a received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpHeader {
    /// The header length in bytes; the ICMP message starts at this offset.
    pub len: usize,
    /// The remaining time-to-live / hop limit of the reply.
    pub ttl: u8,
    /// The address the datagram came from.
    pub source: IpAddr,
    /// The address the datagram was sent to.
    pub destination: IpAddr,
}

impl IpHeader {
    /// Parse the minimal IP header fields out of a raw received datagram.
    ///
    /// Raw IPv4 sockets return the packet including its IP header; IPv6 raw
    /// sockets and some platforms do not. `HeaderMode::Absent` reports no
    /// header, so the ICMP message is taken to start at offset zero.
    pub fn parse(packet: &[u8], family: Family, mode: HeaderMode) -> Result<Option<Self>> {
        match (mode, family) {
            (HeaderMode::Absent, _) => Ok(None),
            (HeaderMode::Present, Family::V4) => {
                let ip = Ipv4Packet::new_view(packet)?;
                Ok(Some(Self {
                    len: ip.header_length_bytes(),
                    ttl: ip.get_ttl(),
                    source: IpAddr::V4(ip.get_source()),
                    destination: IpAddr::V4(ip.get_destination()),
                }))
            }
            (HeaderMode::Present, Family::V6) => {
                let ip = Ipv6Packet::new_view(packet)?;
                Ok(Some(Self {
                    len: Ipv6Packet::minimum_packet_size(),
                    ttl: ip.get_hop_limit(),
                    source: IpAddr::V6(ip.get_source_address()),
                    destination: IpAddr::V6(ip.get_destination_address()),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdiag_packet::IpProtocol;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::str::FromStr;

    #[test]
    fn test_parse_ipv4() {
        let mut buf = [0_u8; 28];
        {
            let mut packet = Ipv4Packet::new(&mut buf).unwrap();
            packet.set_version(4);
            packet.set_header_length(5);
            packet.set_ttl(249);
            packet.set_protocol(IpProtocol::Icmp);
            packet.set_source(Ipv4Addr::from_str("203.0.113.7").unwrap());
            packet.set_destination(Ipv4Addr::from_str("192.0.2.1").unwrap());
        }
        let header = IpHeader::parse(&buf, Family::V4, HeaderMode::Present)
            .unwrap()
            .unwrap();
        assert_eq!(20, header.len);
        assert_eq!(249, header.ttl);
        assert_eq!(IpAddr::from_str("203.0.113.7").unwrap(), header.source);
        assert_eq!(IpAddr::from_str("192.0.2.1").unwrap(), header.destination);
    }

    #[test]
    fn test_parse_ipv4_with_options() {
        let mut buf = [0_u8; 32];
        {
            let mut packet = Ipv4Packet::new(&mut buf).unwrap();
            packet.set_header_length(7);
            packet.set_ttl(1);
        }
        let header = IpHeader::parse(&buf, Family::V4, HeaderMode::Present)
            .unwrap()
            .unwrap();
        assert_eq!(28, header.len);
    }

    #[test]
    fn test_parse_ipv6() {
        let mut buf = [0_u8; 48];
        {
            let mut packet = Ipv6Packet::new(&mut buf).unwrap();
            packet.set_version(6);
            packet.set_hop_limit(61);
            packet.set_source_address(Ipv6Addr::from_str("2001:db8::7").unwrap());
            packet.set_destination_address(Ipv6Addr::from_str("2001:db8::1").unwrap());
        }
        let header = IpHeader::parse(&buf, Family::V6, HeaderMode::Present)
            .unwrap()
            .unwrap();
        assert_eq!(40, header.len);
        assert_eq!(61, header.ttl);
        assert_eq!(IpAddr::from_str("2001:db8::7").unwrap(), header.source);
    }

    #[test]
    fn test_absent_mode_skips_parsing() {
        // too short to be any IP header, irrelevant in absent mode
        let buf = [0_u8; 8];
        assert_eq!(
            None,
            IpHeader::parse(&buf, Family::V4, HeaderMode::Absent).unwrap()
        );
        assert_eq!(
            None,
            IpHeader::parse(&buf, Family::V6, HeaderMode::Absent).unwrap()
        );
    }

    #[test]
    fn test_truncated_header_is_an_error() {
        let buf = [0_u8; 10];
        assert!(IpHeader::parse(&buf, Family::V4, HeaderMode::Present).is_err());
    }
}
