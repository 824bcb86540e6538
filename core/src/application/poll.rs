//! Bounded verification polling.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::kubeconfig::KubeCredentialSnapshot;
use crate::ports::{ConnectivityVerifier, Reachability};

/// Fixed-interval retry policy with an overall deadline. No backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between two attempts.
    pub interval: Duration,
    /// Overall deadline, measured from the first attempt.
    pub timeout: Duration,
    /// Deadline handed to each single verification.
    pub request_timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            request_timeout,
        }
    }
}

/// Verifies `server` immediately, then once per interval, until it is
/// reachable or the deadline passes.
///
/// Returns [`Error::Timeout`] carrying the last verification failure once
/// the next attempt would start after the deadline. Fatal verifier errors
/// end the loop at once.
pub async fn poll_until_reachable<V: ConnectivityVerifier>(
    verifier: &V,
    credential: &KubeCredentialSnapshot,
    server: &str,
    policy: PollPolicy,
) -> Result<()> {
    info!(server = %server, "Testing connection");

    // None when the deadline is beyond what the clock can represent
    let deadline = Instant::now().checked_add(policy.timeout);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let last_error = match verifier
            .verify(credential, server, policy.request_timeout)
            .await?
        {
            Reachability::Reachable => {
                debug!(server = %server, attempt, "Connection established");
                return Ok(());
            }
            Reachability::Unreachable { reason } => reason,
        };

        debug!(server = %server, attempt, reason = %last_error, "Not reachable yet");

        if past_deadline(deadline, policy.interval) {
            return Err(Error::Timeout {
                server: server.to_string(),
                timeout: policy.timeout,
                last_error,
            });
        }
        sleep(policy.interval).await;
    }
}

/// Whether an attempt started one `interval` from now would begin after `deadline`.
fn past_deadline(deadline: Option<Instant>, interval: Duration) -> bool {
    match deadline {
        Some(deadline) => Instant::now()
            .checked_add(interval)
            .map_or(true, |next| next > deadline),
        None => false,
    }
}
