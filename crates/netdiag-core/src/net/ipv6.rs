use crate::error::{Error, Result};
use crate::net::MAX_PACKET_SIZE;
use crate::probe::IpStatus;
use crate::types::{ProbeId, Sequence};
use netdiag_packet::checksum::icmp_checksum;
use netdiag_packet::icmpv6::echo_request::EchoRequestPacket;
use netdiag_packet::icmpv6::{IcmpCode, IcmpType};

/// Build an `ICMPv6` echo request into `buf` and return a view over it.
///
/// The kernel recomputes the checksum with the pseudo-header when the packet
/// leaves a raw `ICMPv6` socket; the plain message checksum is written all
/// the same.
pub fn make_echo_request<'a>(
    buf: &'a mut [u8],
    identifier: ProbeId,
    sequence: Sequence,
    payload: &[u8],
) -> Result<EchoRequestPacket<'a>> {
    let packet_size = EchoRequestPacket::minimum_packet_size() + payload.len();
    if packet_size > MAX_PACKET_SIZE {
        return Err(Error::InvalidPacketSize(packet_size));
    }
    let mut echo = EchoRequestPacket::new(&mut buf[..packet_size])?;
    echo.set_icmp_type(IcmpType::EchoRequest);
    echo.set_icmp_code(IcmpCode(0));
    echo.set_identifier(identifier.0);
    echo.set_sequence(sequence.0);
    echo.set_payload(payload);
    echo.set_checksum(icmp_checksum(echo.packet()));
    Ok(echo)
}

/// Map a received `ICMPv6` type onto the protocol-level status.
#[must_use]
pub fn classify(icmp_type: IcmpType) -> IpStatus {
    match icmp_type {
        IcmpType::EchoReply => IpStatus::Success,
        IcmpType::TimeExceeded => IpStatus::TtlExpired,
        IcmpType::DestinationUnreachable => IpStatus::DestinationUnreachable,
        IcmpType::EchoRequest | IcmpType::Other(_) => IpStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_make_echo_request() {
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        let payload = [0xbb_u8; 2];
        let echo = make_echo_request(&mut buf, ProbeId(0x1a2b), Sequence(3), &payload).unwrap();
        assert_eq!(IcmpType::EchoRequest, echo.get_icmp_type());
        assert_eq!(0x1a2b, echo.get_identifier());
        assert_eq!(3, echo.get_sequence());
        assert_eq!(&payload, echo.payload());
    }

    #[test_case(IcmpType::EchoReply, IpStatus::Success)]
    #[test_case(IcmpType::TimeExceeded, IpStatus::TtlExpired)]
    #[test_case(IcmpType::DestinationUnreachable, IpStatus::DestinationUnreachable)]
    #[test_case(IcmpType::EchoRequest, IpStatus::Unknown)]
    fn test_classify(icmp_type: IcmpType, expected: IpStatus) {
        assert_eq!(expected, classify(icmp_type));
    }
}
