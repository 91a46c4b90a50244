use crate::config::HeaderMode;
use crate::error::Result;
use crate::net::ip::IpHeader;
use crate::net::socket::{Family, ProbeSocket};
use crate::net::MAX_PACKET_SIZE;
use crate::types::ProbeId;
use netdiag_packet::{icmpv4, icmpv6};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// A reply accepted by the receive adapter.
#[derive(Debug, Clone, Copy)]
pub struct WireReply {
    /// The size of the received datagram in bytes.
    pub bytes_read: usize,
    /// The sender address reported by the socket, if any.
    pub addr: Option<IpAddr>,
    /// The decoded IP header, when present in the datagram.
    pub header: Option<IpHeader>,
    /// The raw ICMP type of the reply.
    pub icmp_type: u8,
    /// The raw ICMP code of the reply.
    pub icmp_code: u8,
}

/// The outcome of one receive: exactly one per invocation.
#[derive(Debug)]
pub enum Received {
    /// A packet belonging to this probe arrived.
    Reply(WireReply),
    /// Nothing belonging to this probe arrived within the window.
    TimedOut,
    /// The cancellation signal fired first.
    Cancelled,
}

/// Await the reply matching a pending probe.
///
/// Loops, discarding datagrams that do not belong to this probe, until a
/// matching packet arrives, `timeout` elapses, or `cancel` fires. The
/// deadline is fixed on entry: discarded packets do not extend it. On
/// timeout or cancellation the in-flight receive is dropped; the socket is
/// released when the caller drops it.
#[instrument(skip(socket, cancel), level = "trace")]
pub async fn recv_reply<S: ProbeSocket>(
    socket: &S,
    family: Family,
    header_mode: HeaderMode,
    identifier: ProbeId,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Received> {
    let deadline = Instant::now() + timeout;
    let mut buf = [0_u8; MAX_PACKET_SIZE];
    loop {
        let (bytes_read, addr) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(Received::Cancelled),
            () = sleep_until(deadline) => return Ok(Received::TimedOut),
            res = socket.recv_from(&mut buf) => res?,
        };
        match filter(&buf[..bytes_read], addr, family, header_mode, identifier)? {
            Some(reply) => return Ok(Received::Reply(reply)),
            // not ours, keep waiting against the same deadline
            None => continue,
        }
    }
}

/// Decode a received datagram and decide whether it belongs to this probe.
///
/// A datagram is discarded when its ICMP type equals the local echo-request
/// type (a looped-back copy of our own send) or when it is an echo reply
/// whose identifier is not the dispatcher's.
fn filter(
    packet: &[u8],
    addr: Option<SocketAddr>,
    family: Family,
    header_mode: HeaderMode,
    identifier: ProbeId,
) -> Result<Option<WireReply>> {
    let header = IpHeader::parse(packet, family, header_mode)?;
    let offset = header.map_or(0, |h| h.len);
    let icmp_bytes = packet.get(offset..).unwrap_or_default();
    let (icmp_type, icmp_code) = match family {
        Family::V4 => {
            let icmp = icmpv4::IcmpPacket::new_view(icmp_bytes)?;
            let icmp_type = icmp.get_icmp_type();
            if icmp_type == icmpv4::IcmpType::EchoRequest {
                tracing::trace!("discarding looped-back echo request");
                return Ok(None);
            }
            if icmp_type == icmpv4::IcmpType::EchoReply {
                let echo = icmpv4::echo_reply::EchoReplyPacket::new_view(icmp_bytes)?;
                if echo.get_identifier() != identifier.0 {
                    tracing::trace!(
                        identifier = echo.get_identifier(),
                        "discarding echo reply for another sender"
                    );
                    return Ok(None);
                }
            }
            (icmp_type.id(), icmp.get_icmp_code().0)
        }
        Family::V6 => {
            let icmp = icmpv6::IcmpPacket::new_view(icmp_bytes)?;
            let icmp_type = icmp.get_icmp_type();
            if icmp_type == icmpv6::IcmpType::EchoRequest {
                tracing::trace!("discarding looped-back echo request");
                return Ok(None);
            }
            if icmp_type == icmpv6::IcmpType::EchoReply {
                let echo = icmpv6::echo_reply::EchoReplyPacket::new_view(icmp_bytes)?;
                if echo.get_identifier() != identifier.0 {
                    tracing::trace!(
                        identifier = echo.get_identifier(),
                        "discarding echo reply for another sender"
                    );
                    return Ok(None);
                }
            }
            (icmp_type.id(), icmp.get_icmp_code().0)
        }
    };
    Ok(Some(WireReply {
        bytes_read: packet.len(),
        addr: addr.map(|a| a.ip()),
        header,
        icmp_type,
        icmp_code,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoResult;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const IDENTIFIER: ProbeId = ProbeId(0x1a2b);
    const TIMEOUT: Duration = Duration::from_millis(1000);

    fn echo_reply(identifier: u16) -> Vec<u8> {
        let id = identifier.to_be_bytes();
        vec![0x00, 0x00, 0x00, 0x00, id[0], id[1], 0x00, 0x01]
    }

    fn echo_request(identifier: u16) -> Vec<u8> {
        let id = identifier.to_be_bytes();
        vec![0x08, 0x00, 0x00, 0x00, id[0], id[1], 0x00, 0x01]
    }

    fn time_exceeded() -> Vec<u8> {
        vec![0x0b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    }

    fn responder() -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 0))
    }

    /// A socket which replays scripted datagrams in order, then receives
    /// nothing.
    struct ScriptedSocket {
        datagrams: Mutex<VecDeque<Vec<u8>>>,
        recvs: AtomicUsize,
    }

    impl ScriptedSocket {
        fn new(datagrams: Vec<Vec<u8>>) -> Self {
            Self {
                datagrams: Mutex::new(datagrams.into()),
                recvs: AtomicUsize::new(0),
            }
        }

        fn recvs(&self) -> usize {
            self.recvs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProbeSocket for ScriptedSocket {
        fn open(_family: Family, _strategy: crate::config::ProbeStrategy) -> IoResult<Self> {
            Ok(Self::new(vec![]))
        }
        fn set_ttl(&self, _ttl: u8) -> IoResult<()> {
            Ok(())
        }
        fn set_dont_fragment(&self, _dont_fragment: bool) -> IoResult<()> {
            Ok(())
        }
        async fn send_to(&self, buf: &[u8], _addr: SocketAddr) -> IoResult<usize> {
            Ok(buf.len())
        }
        async fn recv_from(&self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>)> {
            self.recvs.fetch_add(1, Ordering::SeqCst);
            let next = self.datagrams.lock().unwrap().pop_front();
            match next {
                Some(datagram) => {
                    buf[..datagram.len()].copy_from_slice(&datagram);
                    Ok((datagram.len(), Some(responder())))
                }
                None => std::future::pending().await,
            }
        }
    }

    #[tokio::test]
    async fn test_accepts_matching_echo_reply() {
        let socket = ScriptedSocket::new(vec![echo_reply(IDENTIFIER.0)]);
        let cancel = CancellationToken::new();
        let received = recv_reply(
            &socket,
            Family::V4,
            HeaderMode::Absent,
            IDENTIFIER,
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
        let reply = match received {
            Received::Reply(reply) => reply,
            other => panic!("expected reply, got {other:?}"),
        };
        assert_eq!(0, reply.icmp_type);
        assert_eq!(8, reply.bytes_read);
        assert_eq!(Some(responder().ip()), reply.addr);
        assert!(reply.header.is_none());
        assert_eq!(1, socket.recvs());
    }

    #[tokio::test]
    async fn test_discards_foreign_identifier() {
        let socket = ScriptedSocket::new(vec![echo_reply(0x9999), echo_reply(IDENTIFIER.0)]);
        let cancel = CancellationToken::new();
        let received = recv_reply(
            &socket,
            Family::V4,
            HeaderMode::Absent,
            IDENTIFIER,
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
        assert!(matches!(received, Received::Reply(_)));
        assert_eq!(2, socket.recvs());
    }

    #[tokio::test]
    async fn test_discards_own_echo_request() {
        // first a looped-back copy of our own send, identifier matching and
        // all, then a time exceeded which settles the probe
        let socket =
            ScriptedSocket::new(vec![echo_request(IDENTIFIER.0), time_exceeded()]);
        let cancel = CancellationToken::new();
        let received = recv_reply(
            &socket,
            Family::V4,
            HeaderMode::Absent,
            IDENTIFIER,
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
        let reply = match received {
            Received::Reply(reply) => reply,
            other => panic!("expected reply, got {other:?}"),
        };
        assert_eq!(11, reply.icmp_type);
        assert_eq!(2, socket.recvs());
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_nothing_arrives() {
        let socket = ScriptedSocket::new(vec![]);
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let received = recv_reply(
            &socket,
            Family::V4,
            HeaderMode::Absent,
            IDENTIFIER,
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
        assert!(matches!(received, Received::TimedOut));
        assert_eq!(TIMEOUT, started.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discarded_packets_do_not_reset_deadline() {
        let socket = ScriptedSocket::new(vec![
            echo_reply(0x1111).to_vec(),
            echo_reply(0x2222).to_vec(),
            echo_reply(0x3333).to_vec(),
        ]);
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let received = recv_reply(
            &socket,
            Family::V4,
            HeaderMode::Absent,
            IDENTIFIER,
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
        assert!(matches!(received, Received::TimedOut));
        assert_eq!(TIMEOUT, started.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_wins() {
        let socket = ScriptedSocket::new(vec![]);
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            child.cancel();
        });
        let received = recv_reply(
            &socket,
            Family::V4,
            HeaderMode::Absent,
            IDENTIFIER,
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
        assert!(matches!(received, Received::Cancelled));
    }

    #[tokio::test]
    async fn test_header_present_locates_icmp_message() {
        // 20 byte IPv4 header followed by a matching echo reply
        let mut datagram = vec![0_u8; 28];
        datagram[0] = 0x45;
        datagram[8] = 63;
        datagram[12..16].copy_from_slice(&[10, 0, 0, 1]);
        datagram[16..20].copy_from_slice(&[192, 168, 0, 2]);
        datagram[20..28].copy_from_slice(&echo_reply(IDENTIFIER.0));
        let socket = ScriptedSocket::new(vec![datagram]);
        let cancel = CancellationToken::new();
        let received = recv_reply(
            &socket,
            Family::V4,
            HeaderMode::Present,
            IDENTIFIER,
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
        let reply = match received {
            Received::Reply(reply) => reply,
            other => panic!("expected reply, got {other:?}"),
        };
        let header = reply.header.unwrap();
        assert_eq!(20, header.len);
        assert_eq!(63, header.ttl);
        assert_eq!(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), header.source);
        assert_eq!(0, reply.icmp_type);
        assert_eq!(28, reply.bytes_read);
    }
}
