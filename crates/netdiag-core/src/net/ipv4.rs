use crate::error::{Error, Result};
use crate::net::MAX_PACKET_SIZE;
use crate::probe::IpStatus;
use crate::types::{ProbeId, Sequence};
use netdiag_packet::checksum::icmp_checksum;
use netdiag_packet::icmpv4::echo_request::EchoRequestPacket;
use netdiag_packet::icmpv4::{IcmpCode, IcmpType};

/// Build an `ICMPv4` echo request into `buf` and return a view over it.
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

/// Map a received `ICMPv4` type onto the protocol-level status.
#[must_use]
pub fn classify(icmp_type: IcmpType) -> IpStatus {
    match icmp_type {
        IcmpType::EchoReply => IpStatus::Success,
        IcmpType::TimeExceeded => IpStatus::TtlExpired,
        IcmpType::DestinationUnreachable => IpStatus::DestinationUnreachable,
        IcmpType::EchoRequest | IcmpType::Other(_) => IpStatus::Unknown,
    }
}
