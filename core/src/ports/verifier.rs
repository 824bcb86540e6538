//! Connectivity verifier port (interface).

use std::fmt;
use std::time::Duration;

use crate::error::Result;
use crate::kubeconfig::KubeCredentialSnapshot;

/// Outcome of a single connectivity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// The server answered an authenticated request.
    Reachable,
    /// The server did not answer (yet). Worth retrying.
    Unreachable { reason: String },
}

impl Reachability {
    pub fn unreachable(reason: impl fmt::Display) -> Self {
        Self::Unreachable {
            reason: reason.to_string(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

/// Port for proving that a server URL is a live, authenticating API server.
///
/// Implementations must not mutate `credential`; they rewrite the server of
/// every cluster entry on a copy. No retries happen here.
pub trait ConnectivityVerifier: Send + Sync {
    /// Perform one bounded request against `server`.
    ///
    /// `Ok(Reachability::Unreachable)` when the request failed or timed out.
    /// `Err(_)` only for misconfiguration that retrying cannot fix, such as a
    /// malformed server URL or an unusable credential.
    fn verify(
        &self,
        credential: &KubeCredentialSnapshot,
        server: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<Reachability>> + Send;
}
