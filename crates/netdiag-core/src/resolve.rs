use async_trait::async_trait;
use std::net::IpAddr;

/// A reverse host-name resolver collaborator.
///
/// The orchestrator invokes this per hop; implementations are expected to
/// bound their own lookups and must never fail past this boundary — a
/// failed or timed out lookup yields `None`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResolveHost {
    /// Resolve `addr` to a host name, or `None`.
    async fn resolve_name(&self, addr: IpAddr) -> Option<String>;
}
