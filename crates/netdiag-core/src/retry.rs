use crate::delegate::ProbeDelegate;
use crate::error::Result;
use crate::probe::{IpStatus, ProbeReply, ProbeRequest};
use crate::types::RetryTimes;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Bounded retry over a probe dispatcher.
///
/// Only a settled `TimedOut` consumes retry budget: protocol failures and
/// transport exceptions are returned as obtained, and with `retry_times = N`
/// at most `N + 1` attempts are made. The last reply wins; attempts are
/// never merged.
#[derive(Debug, Clone, Copy)]
pub struct Retrier {
    retry_times: RetryTimes,
}

impl Retrier {
    #[must_use]
    pub const fn new(retry_times: RetryTimes) -> Self {
        Self { retry_times }
    }

    /// Run one probe, retrying timed out attempts.
    #[instrument(skip(self, delegate, cancel), level = "debug")]
    pub async fn probe<D>(
        &self,
        delegate: &D,
        request: &ProbeRequest,
        cancel: &CancellationToken,
    ) -> Result<ProbeReply>
    where
        D: ProbeDelegate + Sync + ?Sized,
    {
        let mut attempt = 0_u8;
        loop {
            let reply = delegate.probe(request, cancel).await?;
            if reply.ip_status == IpStatus::TimedOut && attempt < self.retry_times.0 {
                attempt += 1;
                tracing::debug!(attempt, "probe timed out, retrying");
                continue;
            }
            return Ok(reply);
        }
    }
}
