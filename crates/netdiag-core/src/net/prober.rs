use crate::config::{defaults, HeaderMode, ProbeConfig, ProbeStrategy};
use crate::error::{Error, Result};
use crate::net::recv::{recv_reply, Received, WireReply};
use crate::net::socket::{Family, ProbeSocket};
use crate::net::MAX_PACKET_SIZE;
use crate::probe::{IpStatus, ProbeReply, ProbeRequest, ProbeStatus};
use crate::types::ProbeId;
use crate::net::{ipv4, ipv6};
use netdiag_packet::{icmpv4, icmpv6};
use std::marker::PhantomData;
use std::net::SocketAddr;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Sends one echo request over a fresh socket and drives receipt of its
/// matching reply.
///
/// The socket strategy is fixed at construction; the same send, receive and
/// interpret pipeline serves both the raw-ICMP and the datagram strategies.
/// Transport failures settle into the reply value; only cancellation
/// escapes as an error.
#[derive(Debug)]
pub struct SocketProber<S> {
    strategy: ProbeStrategy,
    header_mode: HeaderMode,
    identifier: ProbeId,
    _socket: PhantomData<S>,
}

impl<S: ProbeSocket> SocketProber<S> {
    #[must_use]
    pub const fn new(strategy: ProbeStrategy, config: ProbeConfig) -> Self {
        Self {
            strategy,
            header_mode: config.header_mode,
            identifier: config.identifier,
            _socket: PhantomData,
        }
    }

    /// The dispatcher-instance echo identifier.
    #[must_use]
    pub const fn identifier(&self) -> ProbeId {
        self.identifier
    }

    /// Send one probe and await its settled reply.
    #[instrument(skip(self, cancel), level = "debug")]
    pub async fn probe(
        &self,
        request: &ProbeRequest,
        cancel: &CancellationToken,
    ) -> Result<ProbeReply> {
        let started = Instant::now();
        match self.probe_inner(request, cancel, started).await {
            Ok(reply) => {
                tracing::debug!(%reply);
                Ok(reply)
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(err) => {
                tracing::debug!(%err, "probe failed in transport");
                Ok(ProbeReply::transport_error(
                    request.target,
                    started.elapsed(),
                    err,
                ))
            }
        }
    }

    async fn probe_inner(
        &self,
        request: &ProbeRequest,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<ProbeReply> {
        let family = Family::from(request.target);
        let socket = S::open(family, self.strategy)?;
        socket.set_ttl(request.ttl.0)?;
        socket.set_dont_fragment(!request.allow_fragment)?;
        let payload = request.payload.to_bytes();
        let mut icmp_buf = [0_u8; MAX_PACKET_SIZE];
        let packet_len = match family {
            Family::V4 => ipv4::make_echo_request(
                &mut icmp_buf,
                self.identifier,
                request.sequence,
                &payload,
            )?
            .packet()
            .len(),
            Family::V6 => ipv6::make_echo_request(
                &mut icmp_buf,
                self.identifier,
                request.sequence,
                &payload,
            )?
            .packet()
            .len(),
        };
        let remote = SocketAddr::new(request.target, self.remote_port());
        socket.send_to(&icmp_buf[..packet_len], remote).await?;
        // IPv6 raw sockets hand us the ICMPv6 message without its IP header
        let header_mode = match family {
            Family::V4 => self.header_mode,
            Family::V6 => HeaderMode::Absent,
        };
        let received = recv_reply(
            &socket,
            family,
            header_mode,
            self.identifier,
            request.timeout,
            cancel,
        )
        .await?;
        match received {
            Received::Cancelled => Err(Error::Cancelled),
            Received::TimedOut => Ok(ProbeReply::timed_out(request.target, started.elapsed())),
            Received::Reply(wire) => Ok(Self::interpret(request, &wire, started.elapsed())),
        }
    }

    /// Map an accepted wire reply onto the settled probe reply.
    fn interpret(
        request: &ProbeRequest,
        wire: &WireReply,
        elapsed: std::time::Duration,
    ) -> ProbeReply {
        let family = Family::from(request.target);
        let ip_status = match family {
            Family::V4 => ipv4::classify(icmpv4::IcmpType::from(wire.icmp_type)),
            Family::V6 => ipv6::classify(icmpv6::IcmpType::from(wire.icmp_type)),
        };
        let (status, error) = match ip_status {
            IpStatus::Success => (ProbeStatus::Success, None),
            IpStatus::Unknown => (
                ProbeStatus::ProtocolFailure,
                Some(Error::UnexpectedIcmp {
                    icmp_type: wire.icmp_type,
                    icmp_code: wire.icmp_code,
                }),
            ),
            _ => (ProbeStatus::ProtocolFailure, None),
        };
        ProbeReply {
            target: request.target,
            status,
            responder: wire.header.map(|h| h.source).or(wire.addr),
            packet_size: wire.bytes_read,
            ip_status,
            rtt: elapsed,
            reply_ttl: wire.header.map(|h| h.ttl),
            error,
        }
    }

    const fn remote_port(&self) -> u16 {
        match self.strategy {
            ProbeStrategy::RawIcmp => 0,
            ProbeStrategy::UdpDatagram => defaults::UDP_PROBE_PORT,
        }
    }
}
