use crate::config::defaults;
use crate::error::Error;
use crate::types::{PacketSize, PayloadPattern, Sequence, TimeToLive};
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::time::Duration;

/// The payload of an echo request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Explicit payload bytes.
    Bytes(Vec<u8>),
    /// A payload of the given size filled with a repeating pattern.
    Pattern(PacketSize, PayloadPattern),
}

impl Payload {
    /// The payload as bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes.clone(),
            Self::Pattern(size, pattern) => vec![pattern.0; usize::from(size.0)],
        }
    }

    /// The payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Pattern(size, _) => usize::from(size.0),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single echo probe to be sent.
///
/// Created per call and discarded when the reply settles; the echo
/// identifier is not part of the request, it is fixed per dispatcher
/// instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// The target address.
    pub target: IpAddr,
    /// The outgoing time-to-live / hop limit.
    pub ttl: TimeToLive,
    /// How long to wait for the reply.
    pub timeout: Duration,
    /// The echo payload.
    pub payload: Payload,
    /// Whether routers may fragment the probe.
    pub allow_fragment: bool,
    /// The echo sequence number.
    pub sequence: Sequence,
}

impl ProbeRequest {
    #[must_use]
    pub fn new(target: IpAddr, ttl: TimeToLive, timeout: Duration, payload: Payload) -> Self {
        Self {
            target,
            ttl,
            timeout,
            payload,
            allow_fragment: false,
            sequence: Sequence(0),
        }
    }

    /// A single-ping request with the stock defaults.
    #[must_use]
    pub fn ping(target: IpAddr) -> Self {
        Self::new(
            target,
            TimeToLive(defaults::DEFAULT_PING_TTL),
            defaults::DEFAULT_PING_TIMEOUT,
            Payload::Pattern(
                PacketSize(defaults::DEFAULT_PACKET_SIZE),
                PayloadPattern(defaults::DEFAULT_PAYLOAD_PATTERN),
            ),
        )
    }
}

/// The outcome class of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// An echo reply for this address family was received.
    Success,
    /// A reply was received but signals a routing or protocol condition,
    /// or no reply arrived within the timeout window.
    ProtocolFailure,
    /// A socket, address or packet-parse failure; the diagnostic is
    /// attached to the reply.
    TransportException,
}

/// The protocol-level status of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpStatus {
    Success,
    TtlExpired,
    DestinationUnreachable,
    TimedOut,
    Unknown,
}

impl Display for IpStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::TtlExpired => write!(f, "ttl expired"),
            Self::DestinationUnreachable => write!(f, "destination unreachable"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The settled result of a single probe.
///
/// Created per call; failures at the transport layer surface here as values
/// rather than as errors crossing the dispatcher boundary.
#[derive(Debug)]
pub struct ProbeReply {
    /// The probed target.
    pub target: IpAddr,
    /// The outcome class.
    pub status: ProbeStatus,
    /// The address that responded, absent on a pure timeout.
    pub responder: Option<IpAddr>,
    /// The size of the received packet in bytes.
    pub packet_size: usize,
    /// The protocol-level status.
    pub ip_status: IpStatus,
    /// Round-trip time from send to accepted reply.
    pub rtt: Duration,
    /// The time-to-live observed in the reply's IP header, when present.
    pub reply_ttl: Option<u8>,
    /// The diagnostic for a `TransportException` reply.
    pub error: Option<Error>,
}

impl ProbeReply {
    /// A reply for a probe which received nothing within its window.
    #[must_use]
    pub fn timed_out(target: IpAddr, elapsed: Duration) -> Self {
        Self {
            target,
            status: ProbeStatus::ProtocolFailure,
            responder: None,
            packet_size: 0,
            ip_status: IpStatus::TimedOut,
            rtt: elapsed,
            reply_ttl: None,
            error: None,
        }
    }

    /// A reply for a probe which failed below the protocol level.
    #[must_use]
    pub fn transport_error(target: IpAddr, elapsed: Duration, error: Error) -> Self {
        Self {
            target,
            status: ProbeStatus::TransportException,
            responder: None,
            packet_size: 0,
            ip_status: IpStatus::Unknown,
            rtt: elapsed,
            reply_ttl: None,
            error: Some(error),
        }
    }

    /// Round-trip time in whole milliseconds.
    #[must_use]
    pub fn rtt_millis(&self) -> u64 {
        u64::try_from(self.rtt.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Display for ProbeReply {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.responder {
            Some(addr) => write!(
                f,
                "ping {} [{}] with {} bytes data, status: {:?},{}, time: {}ms, ttl: {}",
                self.target,
                addr,
                self.packet_size,
                self.status,
                self.ip_status,
                self.rtt_millis(),
                self.reply_ttl.map_or_else(|| String::from("?"), |ttl| ttl.to_string()),
            ),
            None => write!(
                f,
                "ping {} with status: {:?},{}, time: {}ms",
                self.target,
                self.status,
                self.ip_status,
                self.rtt_millis(),
            ),
        }
    }
}
