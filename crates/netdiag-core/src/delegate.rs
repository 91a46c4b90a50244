use crate::error::Result;
use crate::probe::{ProbeReply, ProbeRequest};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// The probe capability: run one echo probe against a target and return the
/// settled reply.
///
/// Call sites depend only on this contract; the raw-ICMP and datagram
/// transports (and any host-facility delegate) are interchangeable at
/// configuration time. Failures at the transport layer settle into the
/// reply value; an `Err` is reserved for cancellation and truly unexpected
/// faults.
#[async_trait]
pub trait ProbeDelegate {
    async fn probe(&self, request: &ProbeRequest, cancel: &CancellationToken)
        -> Result<ProbeReply>;
}

#[async_trait]
impl<T: ProbeDelegate + Send + Sync> ProbeDelegate for std::sync::Arc<T> {
    async fn probe(
        &self,
        request: &ProbeRequest,
        cancel: &CancellationToken,
    ) -> Result<ProbeReply> {
        (**self).probe(request, cancel).await
    }
}

#[cfg(unix)]
pub use sockets::{IcmpProbe, UdpProbe};

#[cfg(unix)]
mod sockets {
    use super::ProbeDelegate;
    use crate::config::{ProbeConfig, ProbeStrategy};
    use crate::error::Result;
    use crate::net::{SocketImpl, SocketProber};
    use crate::probe::{ProbeReply, ProbeRequest};
    use crate::types::ProbeId;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    /// Echo probes over a raw ICMP socket.
    ///
    /// Requires elevated privileges on most platforms; see [`UdpProbe`] for
    /// the unprivileged fallback.
    pub struct IcmpProbe {
        prober: SocketProber<SocketImpl>,
    }

    impl IcmpProbe {
        #[must_use]
        pub fn new(config: ProbeConfig) -> Self {
            Self {
                prober: SocketProber::new(ProbeStrategy::RawIcmp, config),
            }
        }

        /// The dispatcher-instance echo identifier.
        #[must_use]
        pub const fn identifier(&self) -> ProbeId {
            self.prober.identifier()
        }
    }

    impl Default for IcmpProbe {
        fn default() -> Self {
            Self::new(ProbeConfig::default())
        }
    }

    #[async_trait]
    impl ProbeDelegate for IcmpProbe {
        async fn probe(
            &self,
            request: &ProbeRequest,
            cancel: &CancellationToken,
        ) -> Result<ProbeReply> {
            self.prober.probe(request, cancel).await
        }
    }

    /// Echo probes over a datagram socket addressed with the ICMP protocol
    /// number, sent to the echo port.
    ///
    /// The OS surfaces ICMP control messages back to such a socket, which
    /// makes this the unprivileged fallback; the pipeline is otherwise the
    /// raw-ICMP one.
    pub struct UdpProbe {
        prober: SocketProber<SocketImpl>,
    }

    impl UdpProbe {
        #[must_use]
        pub fn new(config: ProbeConfig) -> Self {
            Self {
                prober: SocketProber::new(ProbeStrategy::UdpDatagram, config),
            }
        }

        /// The dispatcher-instance echo identifier.
        #[must_use]
        pub const fn identifier(&self) -> ProbeId {
            self.prober.identifier()
        }
    }

    impl Default for UdpProbe {
        fn default() -> Self {
            Self::new(ProbeConfig::default())
        }
    }

    #[async_trait]
    impl ProbeDelegate for UdpProbe {
        async fn probe(
            &self,
            request: &ProbeRequest,
            cancel: &CancellationToken,
        ) -> Result<ProbeReply> {
            self.prober.probe(request, cancel).await
        }
    }
}
