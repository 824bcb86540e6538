//! Error types for the vcexpose-core library.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for exposure operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exposing or tearing down a local API endpoint.
///
/// An endpoint that is merely not reachable yet is *not* an error, see
/// [`Reachability`](crate::ports::Reachability). Neither is an unsupported
/// configuration, see [`Exposure::Unsupported`](crate::application::Exposure).
#[derive(Error, Debug)]
pub enum Error {
    /// The container runtime CLI exited with a non-zero status.
    #[error("Command `{command}` failed: {output}")]
    CommandFailed { command: String, output: String },

    /// The container runtime CLI could not be located.
    #[error("Container runtime not found: {0}")]
    RuntimeNotFound(String),

    /// Failed to parse runtime output.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// A verification poll ran past its deadline.
    #[error("Timed out after {timeout:?} waiting for {server}: {last_error}")]
    Timeout {
        server: String,
        timeout: Duration,
        last_error: String,
    },

    /// The candidate server is not a `scheme://host:port` URL.
    #[error("Invalid server address {server:?}: {reason}")]
    InvalidServer { server: String, reason: String },

    /// The credential snapshot cannot be turned into a client configuration.
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(String),

    /// The host kubeconfig has no current context to derive names from.
    #[error("Kubeconfig has no current context")]
    MissingCurrentContext,

    /// A distribution name that is not one of the known local distributions.
    #[error("Unknown distribution: {0}")]
    UnknownDistribution(String),

    /// Settings error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Kubernetes API error.
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

impl Error {
    /// Builds a [`Error::CommandFailed`] from the program, its arguments and
    /// whatever it wrote to stdout and stderr.
    pub fn command_failed(program: &str, args: &[String], stdout: &[u8], stderr: &[u8]) -> Self {
        let mut output = String::from_utf8_lossy(stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(stdout);
        let stdout = stdout.trim();
        if !stdout.is_empty() {
            if !output.is_empty() {
                output.push(' ');
            }
            output.push_str(stdout);
        }

        Self::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            output,
        }
    }

    /// Returns true if this is a poll deadline error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_captures_both_streams() {
        let err = Error::command_failed(
            "docker",
            &["stop".to_string(), "proxy".to_string()],
            b"partial\n",
            b"Error response from daemon: boom\n",
        );

        let message = err.to_string();
        assert!(message.contains("`docker stop proxy`"));
        assert!(message.contains("Error response from daemon: boom"));
        assert!(message.contains("partial"));
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout {
            server: "https://127.0.0.1:8443".to_string(),
            timeout: Duration::from_secs(20),
            last_error: "connection refused".to_string(),
        };

        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Timed out after 20s waiting for https://127.0.0.1:8443: connection refused"
        );
    }
}
