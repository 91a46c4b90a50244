use crate::config::Config;
use async_trait::async_trait;
use netdiag_core::ResolveHost;
use std::net::IpAddr;
use thiserror::Error;
use tokio::time::timeout;
use tracing::instrument;

/// A resolver failure; never crosses the public boundary.
#[derive(Error, Debug)]
enum Error {
    #[error("lookup failed: {0}")]
    LookupFailed(#[from] std::io::Error),
    #[error("lookup timed out")]
    Timeout,
    #[error("lookup task failed: {0}")]
    JoinFailed(#[from] tokio::task::JoinError),
}

/// A forward and reverse resolver backed by the system resolver.
///
/// Lookups run on the blocking pool, bounded by the configured timeout.
/// Failures and timeouts both yield `None`; nothing escapes this boundary
/// as an error.
#[derive(Debug, Clone, Default)]
pub struct DnsResolver {
    config: Config,
}

impl DnsResolver {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Reverse-resolve an address to a host name, or `None`.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve_name(&self, addr: IpAddr) -> Option<String> {
        match self.reverse_lookup(addr).await {
            Ok(name) => Some(name),
            Err(err) => {
                tracing::debug!(%addr, %err, "reverse lookup yielded nothing");
                None
            }
        }
    }

    /// Forward-resolve a host name to its first address, or `None`.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve_address(&self, hostname: &str) -> Option<IpAddr> {
        match self.forward_lookup(hostname).await {
            Ok(addrs) => addrs.into_iter().next(),
            Err(err) => {
                tracing::debug!(hostname, %err, "forward lookup yielded nothing");
                None
            }
        }
    }

    async fn reverse_lookup(&self, addr: IpAddr) -> Result<String, Error> {
        let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr));
        match timeout(self.config.timeout, lookup).await {
            Ok(joined) => Ok(joined??),
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn forward_lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, Error> {
        let hostname = hostname.to_owned();
        let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_host(&hostname));
        match timeout(self.config.timeout, lookup).await {
            Ok(joined) => Ok(joined??),
            Err(_) => Err(Error::Timeout),
        }
    }
}

#[async_trait]
impl ResolveHost for DnsResolver {
    async fn resolve_name(&self, addr: IpAddr) -> Option<String> {
        DnsResolver::resolve_name(self, addr).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_timeout_yields_none() {
        let resolver = DnsResolver::new(Config::new(Duration::ZERO));
        let name = resolver
            .resolve_name(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)))
            .await;
        assert_eq!(None, name);
        let addr = resolver.resolve_address("example.invalid").await;
        assert_eq!(None, addr);
    }

    #[tokio::test]
    async fn test_invalid_hostname_yields_none() {
        let resolver = DnsResolver::default();
        // rfc 2606 reserves .invalid: guaranteed to never resolve
        assert_eq!(None, resolver.resolve_address("host.invalid").await);
    }
}
