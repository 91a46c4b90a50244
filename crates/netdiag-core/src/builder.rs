use crate::config::TraceConfig;
use crate::delegate::ProbeDelegate;
use crate::error::{Error, Result};
use crate::net::MAX_PACKET_SIZE;
use crate::resolve::ResolveHost;
use crate::trace::Tracer;
use crate::types::{MaxHops, PacketSize, PayloadPattern, RetryTimes};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Build a [`Tracer`].
///
/// # Example
///
/// Trace over raw ICMP with a 1 second per-hop timeout and no retries:
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// # use std::net::IpAddr;
/// # use std::str::FromStr;
/// # use std::time::Duration;
/// use netdiag_core::{Builder, IcmpProbe, RetryTimes};
///
/// let target = IpAddr::from_str("192.0.2.1")?;
/// let tracer = Builder::new(target, IcmpProbe::default())
///     .probe_timeout(Duration::from_millis(1000))
///     .retry_times(RetryTimes(0))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct Builder<D> {
    target: IpAddr,
    delegate: D,
    config: TraceConfig,
    resolver: Option<Arc<dyn ResolveHost + Send + Sync>>,
    cancel: CancellationToken,
}

impl<D: ProbeDelegate + Sync> Builder<D> {
    /// Start building a trace of the route to `target` probed via `delegate`.
    #[must_use]
    pub fn new(target: IpAddr, delegate: D) -> Self {
        Self {
            target,
            delegate,
            config: TraceConfig::default(),
            resolver: None,
            cancel: CancellationToken::new(),
        }
    }

    /// The largest time-to-live to sweep up to.
    #[must_use]
    pub fn max_hops(mut self, max_hops: MaxHops) -> Self {
        self.config.max_hops = max_hops;
        self
    }

    /// The per-probe timeout.
    #[must_use]
    pub fn probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.config.probe_timeout = probe_timeout;
        self
    }

    /// Retries after a timed out probe, per hop.
    #[must_use]
    pub fn retry_times(mut self, retry_times: RetryTimes) -> Self {
        self.config.retry_times = retry_times;
        self
    }

    /// The probe payload size.
    #[must_use]
    pub fn packet_size(mut self, packet_size: PacketSize) -> Self {
        self.config.packet_size = packet_size;
        self
    }

    /// The probe payload fill pattern.
    #[must_use]
    pub fn payload_pattern(mut self, payload_pattern: PayloadPattern) -> Self {
        self.config.payload_pattern = payload_pattern;
        self
    }

    /// Whether to reverse-resolve hop responder addresses.
    #[must_use]
    pub fn resolve_hostnames(mut self, resolve_hostnames: bool) -> Self {
        self.config.resolve_hostnames = resolve_hostnames;
        self
    }

    /// The resolver collaborator invoked per hop.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn ResolveHost + Send + Sync>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// An externally owned cancellation token for this trace.
    #[must_use]
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build the tracer, validating the configuration.
    pub fn build(self) -> Result<Tracer<D>> {
        if self.config.max_hops.0 == 0 {
            return Err(Error::BadConfig(String::from("max_hops must be at least 1")));
        }
        let packet_size = usize::from(self.config.packet_size.0);
        if packet_size + 8 > MAX_PACKET_SIZE {
            return Err(Error::InvalidPacketSize(packet_size));
        }
        Ok(Tracer::new(
            self.target,
            self.config,
            self.delegate,
            self.resolver,
            self.cancel,
        ))
    }
}
