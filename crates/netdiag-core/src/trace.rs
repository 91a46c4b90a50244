use crate::config::TraceConfig;
use crate::delegate::ProbeDelegate;
use crate::error::{Error, Result};
use crate::probe::{IpStatus, Payload, ProbeRequest};
use crate::resolve::ResolveHost;
use crate::retry::Retrier;
use crate::types::{Sequence, TimeToLive};
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// A single hop discovered by a trace.
///
/// Built exactly once per hop after the retried probe settles, emitted to
/// the observer and appended to the report; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopRecord {
    /// The 1-based hop index.
    pub hop: u8,
    /// The protocol-level status of the settled probe.
    pub ip_status: IpStatus,
    /// The round-trip time of the settled probe.
    pub rtt: Duration,
    /// The router (or target) which answered, absent on timeout.
    pub responder: Option<IpAddr>,
    /// The responder host name, when resolution is on and succeeded.
    pub hostname: Option<String>,
}

impl Display for HopRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.ip_status == IpStatus::TimedOut {
            return write!(f, "*\trequest timed out");
        }
        let addr = self
            .responder
            .map_or_else(|| String::from("?"), |addr| addr.to_string());
        match &self.hostname {
            Some(hostname) => {
                write!(f, "{} ms\t{hostname} [{addr}]", self.rtt.as_millis())
            }
            None => write!(f, "{} ms\t{addr}", self.rtt.as_millis()),
        }
    }
}

/// Why a trace ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    /// A hop answered with an echo reply.
    ReachedTarget,
    /// The hop budget ran out without reaching the target.
    ExhaustedHops,
    /// The cancellation signal fired.
    Cancelled,
}

/// The result of one traceroute invocation.
#[derive(Debug)]
pub struct TraceReport {
    /// The traced target.
    pub target: IpAddr,
    /// Why the trace ended.
    pub outcome: TraceOutcome,
    /// The discovered hops, in strictly increasing hop order.
    pub hops: Vec<HopRecord>,
}

/// Trace the route to a target by sweeping the time-to-live upwards.
///
/// Hops are probed strictly sequentially: each hop's probe is retried per
/// the configuration, its responder optionally reverse-resolved, and its
/// record emitted before the next hop is attempted. Built via
/// [`Builder`](crate::Builder).
pub struct Tracer<D> {
    target: IpAddr,
    config: TraceConfig,
    delegate: D,
    resolver: Option<Arc<dyn ResolveHost + Send + Sync>>,
    cancel: CancellationToken,
}

impl<D> std::fmt::Debug for Tracer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("target", &self.target)
            .field("config", &self.config)
            .field("has_resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl<D: ProbeDelegate + Sync> Tracer<D> {
    pub(crate) fn new(
        target: IpAddr,
        config: TraceConfig,
        delegate: D,
        resolver: Option<Arc<dyn ResolveHost + Send + Sync>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            config,
            delegate,
            resolver,
            cancel,
        }
    }

    /// The token which cancels this trace cooperatively.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the trace, discarding hop notifications.
    pub async fn run(&self) -> Result<TraceReport> {
        self.run_with(|_| ()).await
    }

    /// Run the trace, emitting each hop record to `observer` as it settles.
    ///
    /// The observer is invoked synchronously, in hop order, before the next
    /// hop is probed.
    #[instrument(skip(self, observer), fields(target = %self.target), level = "debug")]
    pub async fn run_with<F>(&self, mut observer: F) -> Result<TraceReport>
    where
        F: FnMut(&HopRecord),
    {
        let retrier = Retrier::new(self.config.retry_times);
        let mut hops = Vec::new();
        let mut outcome = TraceOutcome::ExhaustedHops;
        tracing::debug!(max_hops = self.config.max_hops.0, "tracing route");
        for hop in 1..=self.config.max_hops.0 {
            if self.cancel.is_cancelled() {
                outcome = TraceOutcome::Cancelled;
                break;
            }
            let request = self.hop_request(hop);
            let reply = match retrier.probe(&self.delegate, &request, &self.cancel).await {
                Ok(reply) => reply,
                Err(Error::Cancelled) => {
                    outcome = TraceOutcome::Cancelled;
                    break;
                }
                // an unexpected fault ends the whole trace, reported
                Err(err) => return Err(err),
            };
            if self.cancel.is_cancelled() {
                outcome = TraceOutcome::Cancelled;
                break;
            }
            let hostname = self.resolve_hop(reply.ip_status, reply.responder).await;
            if self.cancel.is_cancelled() {
                outcome = TraceOutcome::Cancelled;
                break;
            }
            let record = HopRecord {
                hop,
                ip_status: reply.ip_status,
                rtt: reply.rtt,
                responder: reply.responder,
                hostname,
            };
            tracing::debug!(hop, %record);
            observer(&record);
            hops.push(record);
            if reply.ip_status == IpStatus::Success {
                outcome = TraceOutcome::ReachedTarget;
                break;
            }
        }
        Ok(TraceReport {
            target: self.target,
            outcome,
            hops,
        })
    }

    fn hop_request(&self, hop: u8) -> ProbeRequest {
        let mut request = ProbeRequest::new(
            self.target,
            TimeToLive(hop),
            self.config.probe_timeout,
            Payload::Pattern(self.config.packet_size, self.config.payload_pattern),
        );
        request.sequence = Sequence(u16::from(hop));
        request
    }

    /// Resolve the responder of a settled hop, or `None`.
    ///
    /// Timed out hops have nothing to resolve; resolver failures only ever
    /// cost the host name, never the hop.
    async fn resolve_hop(&self, ip_status: IpStatus, responder: Option<IpAddr>) -> Option<String> {
        if !self.config.resolve_hostnames || ip_status == IpStatus::TimedOut {
            return None;
        }
        match (&self.resolver, responder) {
            (Some(resolver), Some(addr)) => resolver.resolve_name(addr).await,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::probe::{ProbeReply, ProbeStatus};
    use crate::resolve::MockResolveHost;
    use crate::types::{MaxHops, RetryTimes};
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));

    fn hop_addr(hop: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, hop, 1))
    }

    /// A dispatcher simulating a route which answers `TtlExpired` below the
    /// target hop and `Success` at it.
    struct RouteDelegate {
        target_hop: u8,
        calls: AtomicUsize,
    }

    impl RouteDelegate {
        fn new(target_hop: u8) -> Self {
            Self {
                target_hop,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProbeDelegate for RouteDelegate {
        async fn probe(
            &self,
            request: &ProbeRequest,
            _cancel: &CancellationToken,
        ) -> Result<ProbeReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let hop = request.ttl.0;
            let (status, ip_status) = if hop >= self.target_hop {
                (ProbeStatus::Success, IpStatus::Success)
            } else {
                (ProbeStatus::ProtocolFailure, IpStatus::TtlExpired)
            };
            Ok(ProbeReply {
                target: request.target,
                status,
                responder: Some(hop_addr(hop)),
                packet_size: 8,
                ip_status,
                rtt: Duration::from_millis(u64::from(hop)),
                reply_ttl: Some(64 - hop),
                error: None,
            })
        }
    }

    /// A dispatcher which never elicits any reply.
    struct SilentDelegate;

    #[async_trait]
    impl ProbeDelegate for SilentDelegate {
        async fn probe(
            &self,
            request: &ProbeRequest,
            _cancel: &CancellationToken,
        ) -> Result<ProbeReply> {
            Ok(ProbeReply::timed_out(request.target, request.timeout))
        }
    }

    #[tokio::test]
    async fn test_hop_ordering_and_reached_target() {
        let tracer = Builder::new(TARGET, RouteDelegate::new(5))
            .max_hops(MaxHops(10))
            .build()
            .unwrap();
        let report = tracer.run().await.unwrap();
        assert_eq!(TraceOutcome::ReachedTarget, report.outcome);
        assert_eq!(5, report.hops.len());
        for (i, hop) in report.hops.iter().enumerate() {
            assert_eq!(i as u8 + 1, hop.hop);
        }
        assert_eq!(IpStatus::Success, report.hops[4].ip_status);
        assert!(report.hops[..4]
            .iter()
            .all(|hop| hop.ip_status == IpStatus::TtlExpired));
    }

    #[tokio::test]
    async fn test_exhausted_hops() {
        let tracer = Builder::new(TARGET, SilentDelegate)
            .max_hops(MaxHops(4))
            .retry_times(RetryTimes(0))
            .build()
            .unwrap();
        let report = tracer.run().await.unwrap();
        assert_eq!(TraceOutcome::ExhaustedHops, report.outcome);
        assert_eq!(4, report.hops.len());
        assert!(report
            .hops
            .iter()
            .all(|hop| hop.ip_status == IpStatus::TimedOut && hop.responder.is_none()));
    }

    #[tokio::test]
    async fn test_observer_sees_hops_in_order_before_completion() {
        let tracer = Builder::new(TARGET, RouteDelegate::new(3))
            .max_hops(MaxHops(10))
            .build()
            .unwrap();
        let mut seen = Vec::new();
        let report = tracer.run_with(|hop| seen.push(hop.hop)).await.unwrap();
        assert_eq!(vec![1, 2, 3], seen);
        assert_eq!(3, report.hops.len());
    }

    #[tokio::test]
    async fn test_cancellation_before_first_hop() {
        let tracer = Builder::new(TARGET, RouteDelegate::new(5))
            .max_hops(MaxHops(10))
            .build()
            .unwrap();
        tracer.cancellation_token().cancel();
        let report = tracer.run().await.unwrap();
        assert_eq!(TraceOutcome::Cancelled, report.outcome);
        assert!(report.hops.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_mid_run_keeps_completed_hops() {
        let tracer = Builder::new(TARGET, RouteDelegate::new(8))
            .max_hops(MaxHops(10))
            .build()
            .unwrap();
        let cancel = tracer.cancellation_token();
        let report = tracer
            .run_with(|hop| {
                // fires after hop 3's record is appended; hops 4+ never run
                if hop.hop == 3 {
                    cancel.cancel();
                }
            })
            .await
            .unwrap();
        assert_eq!(TraceOutcome::Cancelled, report.outcome);
        assert_eq!(3, report.hops.len());
        assert_eq!(vec![1, 2, 3], report.hops.iter().map(|h| h.hop).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_resolver_names_hops() {
        let mut resolver = MockResolveHost::new();
        resolver
            .expect_resolve_name()
            .returning(|addr| Some(format!("router-{addr}")));
        let tracer = Builder::new(TARGET, RouteDelegate::new(2))
            .max_hops(MaxHops(10))
            .resolver(Arc::new(resolver))
            .build()
            .unwrap();
        let report = tracer.run().await.unwrap();
        assert_eq!(
            Some(format!("router-{}", hop_addr(1))),
            report.hops[0].hostname
        );
        assert_eq!(
            Some(format!("router-{}", hop_addr(2))),
            report.hops[1].hostname
        );
    }

    #[tokio::test]
    async fn test_resolution_failure_never_aborts_the_hop() {
        let mut resolver = MockResolveHost::new();
        resolver.expect_resolve_name().returning(|_| None);
        let tracer = Builder::new(TARGET, RouteDelegate::new(2))
            .max_hops(MaxHops(10))
            .resolver(Arc::new(resolver))
            .build()
            .unwrap();
        let report = tracer.run().await.unwrap();
        assert_eq!(TraceOutcome::ReachedTarget, report.outcome);
        assert!(report.hops.iter().all(|hop| hop.hostname.is_none()));
    }

    #[tokio::test]
    async fn test_timed_out_hops_are_not_resolved() {
        let mut resolver = MockResolveHost::new();
        resolver.expect_resolve_name().never();
        let tracer = Builder::new(TARGET, SilentDelegate)
            .max_hops(MaxHops(2))
            .retry_times(RetryTimes(0))
            .resolver(Arc::new(resolver))
            .build()
            .unwrap();
        let report = tracer.run().await.unwrap();
        assert!(report.hops.iter().all(|hop| hop.hostname.is_none()));
    }

    #[test]
    fn test_hop_record_display() {
        let record = HopRecord {
            hop: 2,
            ip_status: IpStatus::TtlExpired,
            rtt: Duration::from_millis(23),
            responder: Some(hop_addr(2)),
            hostname: Some(String::from("core.example.net")),
        };
        assert_eq!("23 ms\tcore.example.net [10.0.2.1]", record.to_string());
        let timed_out = HopRecord {
            hop: 3,
            ip_status: IpStatus::TimedOut,
            rtt: Duration::from_millis(4000),
            responder: None,
            hostname: None,
        };
        assert_eq!("*\trequest timed out", timed_out.to_string());
    }
}
