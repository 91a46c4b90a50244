use crate::types::{MaxHops, PacketSize, PayloadPattern, ProbeId, RetryTimes};
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default time-to-live for a single ping probe.
    pub const DEFAULT_PING_TTL: u8 = 64;

    /// The default timeout for a single ping probe.
    pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(5000);

    /// The default probe payload size in bytes.
    pub const DEFAULT_PACKET_SIZE: u16 = 32;

    /// The default probe payload fill pattern.
    pub const DEFAULT_PAYLOAD_PATTERN: u8 = 0xbb;

    /// The default echo identifier tag.
    pub const DEFAULT_PROBE_IDENTIFIER: u16 = 0x1a2b;

    /// The default value for `max-hops`.
    pub const DEFAULT_TRACE_MAX_HOPS: u8 = 30;

    /// The default per-hop probe timeout.
    pub const DEFAULT_TRACE_TIMEOUT: Duration = Duration::from_millis(4000);

    /// The default number of retries after a timed out hop probe.
    pub const DEFAULT_TRACE_RETRY_TIMES: u8 = 3;

    /// Whether hop responder addresses are reverse-resolved by default.
    pub const DEFAULT_TRACE_RESOLVE_HOSTNAMES: bool = true;

    /// The destination port for datagram-strategy probes (the echo service).
    pub const UDP_PROBE_PORT: u16 = 7;
}

/// The wire strategy used to elicit ICMP replies.
///
/// Chosen explicitly at construction time, never discovered by a runtime
/// capability probe.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProbeStrategy {
    /// A raw socket bound to the ICMP protocol.
    ///
    /// Requires elevated privileges on most platforms.
    RawIcmp,
    /// A datagram socket addressed with the ICMP protocol number.
    ///
    /// The OS still surfaces ICMP control messages to such a socket, which
    /// makes it the unprivileged fallback.
    UdpDatagram,
}

impl Display for ProbeStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RawIcmp => write!(f, "raw-icmp"),
            Self::UdpDatagram => write!(f, "udp-datagram"),
        }
    }
}

/// Whether received datagrams include the IP header.
///
/// Raw IPv4 sockets return the packet including its IP header; some
/// platforms strip it. `Absent` sets the header length to zero and skips
/// header parsing entirely.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HeaderMode {
    Present,
    Absent,
}

impl Display for HeaderMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Probe dispatcher configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProbeConfig {
    /// The echo identifier tag, fixed per dispatcher instance.
    pub identifier: ProbeId,
    /// Whether received IPv4 datagrams carry their IP header.
    pub header_mode: HeaderMode,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            identifier: ProbeId(defaults::DEFAULT_PROBE_IDENTIFIER),
            header_mode: HeaderMode::Present,
        }
    }
}

/// Traceroute configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TraceConfig {
    /// The largest time-to-live to sweep up to.
    pub max_hops: MaxHops,
    /// The per-probe timeout.
    pub probe_timeout: Duration,
    /// Retries after a timed out probe, per hop.
    pub retry_times: RetryTimes,
    /// The probe payload size.
    pub packet_size: PacketSize,
    /// The probe payload fill pattern.
    pub payload_pattern: PayloadPattern,
    /// Whether to reverse-resolve hop responder addresses.
    pub resolve_hostnames: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_hops: MaxHops(defaults::DEFAULT_TRACE_MAX_HOPS),
            probe_timeout: defaults::DEFAULT_TRACE_TIMEOUT,
            retry_times: RetryTimes(defaults::DEFAULT_TRACE_RETRY_TIMES),
            packet_size: PacketSize(defaults::DEFAULT_PACKET_SIZE),
            payload_pattern: PayloadPattern(defaults::DEFAULT_PAYLOAD_PATTERN),
            resolve_hostnames: defaults::DEFAULT_TRACE_RESOLVE_HOSTNAMES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_defaults() {
        let config = TraceConfig::default();
        assert_eq!(MaxHops(30), config.max_hops);
        assert_eq!(Duration::from_millis(4000), config.probe_timeout);
        assert_eq!(RetryTimes(3), config.retry_times);
        assert!(config.resolve_hostnames);
    }

    #[test]
    fn test_probe_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(ProbeId(0x1a2b), config.identifier);
        assert_eq!(HeaderMode::Present, config.header_mode);
    }

    #[test]
    fn test_display() {
        assert_eq!("raw-icmp", ProbeStrategy::RawIcmp.to_string());
        assert_eq!("udp-datagram", ProbeStrategy::UdpDatagram.to_string());
        assert_eq!("present", HeaderMode::Present.to_string());
        assert_eq!("absent", HeaderMode::Absent.to_string());
    }
}
