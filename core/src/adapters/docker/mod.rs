//! Container runtime adapter backed by the `docker` CLI.
//!
//! Any CLI that accepts the same `run`, `inspect`, `stop` and `rm` syntax
//! (for example podman) works when configured as the runtime binary.

mod models;

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::config::ExposeSettings;
use crate::error::{Error, Result};
use crate::ports::{ContainerDetails, ContainerSpec, ProcessRuntime};

use models::InspectResponse;

/// Default paths to search for docker.
const DOCKER_PATHS: &[&str] = &[
    "/opt/homebrew/bin/docker", // Apple Silicon
    "/usr/local/bin/docker",    // Intel Mac / Docker Desktop
    "/usr/bin/docker",          // System
];

/// Timeout for `run`, which may have to pull the image first.
const RUN_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for every other command.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Docker CLI runtime.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    /// Creates a runtime using the first docker binary found, or `docker` from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: find_executable(DOCKER_PATHS).unwrap_or_else(|| PathBuf::from("docker")),
        }
    }

    /// Creates a runtime with a custom binary path.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Uses the configured runtime binary, falling back to discovery.
    pub fn from_settings(settings: &ExposeSettings) -> Self {
        match &settings.runtime_binary {
            Some(binary) => Self::with_binary(binary.clone()),
            None => Self::new(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Executes a runtime command and returns its raw output, whatever the exit status.
    async fn execute(&self, args: &[String], limit: Duration) -> Result<Output> {
        debug!(binary = %self.binary.display(), args = ?args, "Running container runtime");

        let result = timeout(
            limit,
            Command::new(&self.binary)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::RuntimeNotFound(self.binary.display().to_string()))
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Err(Error::CommandFailed {
                command: self.render(args),
                output: format!("timed out after {:?}", limit),
            }),
        }
    }

    /// Executes a command that is allowed to target a missing container.
    async fn execute_ignoring_missing(&self, args: Vec<String>) -> Result<()> {
        let output = self.execute(&args, COMMAND_TIMEOUT).await?;
        if output.status.success() || is_missing_container(&output.stderr) {
            return Ok(());
        }
        Err(self.failure(&args, &output))
    }

    fn failure(&self, args: &[String], output: &Output) -> Error {
        Error::command_failed(
            &self.binary.display().to_string(),
            args,
            &output.stdout,
            &output.stderr,
        )
    }

    fn render(&self, args: &[String]) -> String {
        format!("{} {}", self.binary.display(), args.join(" "))
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRuntime for DockerCli {
    async fn run(&self, spec: &ContainerSpec) -> Result<String> {
        let args = spec.run_args();
        let output = self.execute(&args, RUN_TIMEOUT).await?;
        if !output.status.success() {
            return Err(self.failure(&args, &output));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerDetails>> {
        let args = vec![
            "inspect".to_string(),
            "--type=container".to_string(),
            name.to_string(),
        ];
        let output = self.execute(&args, COMMAND_TIMEOUT).await?;
        if !output.status.success() {
            if is_missing_container(&output.stderr) {
                return Ok(None);
            }
            return Err(self.failure(&args, &output));
        }

        let responses: Vec<InspectResponse> = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::ParseError(format!("docker inspect {}: {}", name, e)))?;

        Ok(responses.into_iter().next().map(InspectResponse::into_details))
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.execute_ignoring_missing(vec!["stop".to_string(), name.to_string()])
            .await
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.execute_ignoring_missing(vec!["rm".to_string(), "-f".to_string(), name.to_string()])
            .await
    }

    async fn exists(&self, name: &str) -> bool {
        let args = vec![
            "inspect".to_string(),
            "--type=container".to_string(),
            name.to_string(),
        ];
        matches!(self.execute(&args, COMMAND_TIMEOUT).await, Ok(output) if output.status.success())
    }

    async fn is_available(&self) -> bool {
        matches!(
            self.execute(&["ps".to_string()], COMMAND_TIMEOUT).await,
            Ok(output) if output.status.success()
        )
    }
}

/// Finds an executable in the given paths.
fn find_executable(paths: &[&str]) -> Option<PathBuf> {
    paths.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Checks if runtime stderr says the container does not exist.
pub fn is_missing_container(stderr: &[u8]) -> bool {
    let stderr = String::from_utf8_lossy(stderr).to_lowercase();
    stderr.contains("no such container") || stderr.contains("no such object")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_cli_creation() {
        let docker = DockerCli::new();
        assert!(docker.binary().to_string_lossy().contains("docker"));
    }

    #[test]
    fn test_from_settings_prefers_configured_binary() {
        let settings = ExposeSettings {
            runtime_binary: Some(PathBuf::from("/opt/bin/podman")),
            ..Default::default()
        };
        assert_eq!(
            DockerCli::from_settings(&settings).binary(),
            Path::new("/opt/bin/podman")
        );
    }

    #[test]
    fn test_find_executable() {
        let result = find_executable(&["/bin/sh", "/usr/bin/sh"]);
        assert!(result.is_some());

        let result = find_executable(&["/nonexistent/path"]);
        assert!(result.is_none());
    }

    #[test]
    fn test_missing_container_detection() {
        assert!(is_missing_container(b"Error: No such object: vcluster_vc_ns_kind-kind"));
        assert!(is_missing_container(
            b"Error response from daemon: No such container: vcluster_vc_ns_kind-kind"
        ));
        assert!(is_missing_container(b"Error: no such container proxy"));
        assert!(!is_missing_container(
            b"Error response from daemon: cannot stop container: permission denied"
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let docker = DockerCli::with_binary("/nonexistent/docker");
        let err = docker.inspect("anything").await.unwrap_err();
        assert!(matches!(err, Error::RuntimeNotFound(_)));
        assert!(!docker.exists("anything").await);
        assert!(!docker.is_available().await);
    }
}
