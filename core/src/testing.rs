//! In-memory runtime and verifier doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::kubeconfig::KubeCredentialSnapshot;
use crate::ports::{
    ConnectivityVerifier, ContainerDetails, ContainerSpec, ProcessRuntime, Reachability,
};

type Script = Box<dyn Fn(usize, &KubeCredentialSnapshot, &str) -> Result<Reachability> + Send + Sync>;

/// Verifier whose answers come from a closure of `(attempt, credential, server)`.
/// Attempts are counted from 1.
pub(crate) struct FakeVerifier {
    script: Script,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, KubeCredentialSnapshot)>>,
}

impl FakeVerifier {
    pub(crate) fn new(
        script: impl Fn(usize, &KubeCredentialSnapshot, &str) -> Result<Reachability>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always_reachable() -> Self {
        Self::new(|_, _, _| Ok(Reachability::Reachable))
    }

    pub(crate) fn never_reachable(reason: &'static str) -> Self {
        Self::new(move |_, _, _| Ok(Reachability::unreachable(reason)))
    }

    pub(crate) fn reachable_on(attempt: usize) -> Self {
        Self::new(move |n, _, _| {
            if n >= attempt {
                Ok(Reachability::Reachable)
            } else {
                Ok(Reachability::unreachable(format!("attempt {} refused", n)))
            }
        })
    }

    /// Only the listed server URLs answer.
    pub(crate) fn reachable_servers(servers: &[&str]) -> Self {
        let servers: Vec<String> = servers.iter().map(|s| s.to_string()).collect();
        Self::new(move |_, _, server| {
            if servers.iter().any(|s| s == server) {
                Ok(Reachability::Reachable)
            } else {
                Ok(Reachability::unreachable(format!("dial {}: connection refused", server)))
            }
        })
    }

    pub(crate) fn failing_with(error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        Self::new(move |_, _, _| Err(error()))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn servers(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    pub(crate) fn credentials(&self) -> Vec<KubeCredentialSnapshot> {
        self.seen.lock().iter().map(|(_, c)| c.clone()).collect()
    }
}

impl ConnectivityVerifier for FakeVerifier {
    async fn verify(
        &self,
        credential: &KubeCredentialSnapshot,
        server: &str,
        _timeout: Duration,
    ) -> Result<Reachability> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen
            .lock()
            .push((server.to_string(), credential.clone()));
        (self.script)(attempt, credential, server)
    }
}

/// Runtime that keeps containers in a map and logs every call as `op:name`.
#[derive(Default)]
pub(crate) struct FakeRuntime {
    containers: Mutex<HashMap<String, ContainerDetails>>,
    started: Mutex<Vec<ContainerSpec>>,
    calls: Mutex<Vec<String>>,
    fail_run: bool,
    fail_stop: bool,
    keep_stopped: bool,
}

impl FakeRuntime {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_container(self, name: &str, details: ContainerDetails) -> Self {
        self.containers.lock().insert(name.to_string(), details);
        self
    }

    /// A running container publishing `host_port` for `container_port`.
    pub(crate) fn with_proxy(self, name: &str, host_port: u16, container_port: u16) -> Self {
        let mut details = ContainerDetails {
            name: name.to_string(),
            running: true,
            ..Default::default()
        };
        details.port_bindings.insert(container_port, vec![host_port]);
        self.with_container(name, details)
    }

    pub(crate) fn failing_run(mut self) -> Self {
        self.fail_run = true;
        self
    }

    pub(crate) fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// `stop` leaves an exited container behind, like one started without `--rm`.
    pub(crate) fn keeping_stopped(mut self) -> Self {
        self.keep_stopped = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls whose operation is one of `ops`, e.g. `&["run", "stop"]`.
    pub(crate) fn calls_of(&self, ops: &[&str]) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| ops.iter().any(|op| c.starts_with(&format!("{}:", op))))
            .cloned()
            .collect()
    }

    pub(crate) fn started(&self) -> Vec<ContainerSpec> {
        self.started.lock().clone()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.containers.lock().contains_key(name)
    }

    pub(crate) fn container_count(&self) -> usize {
        self.containers.lock().len()
    }

    fn record(&self, op: &str, name: &str) {
        self.calls.lock().push(format!("{}:{}", op, name));
    }

    fn failure(op: &str, name: &str, message: &str) -> Error {
        Error::CommandFailed {
            command: format!("docker {} {}", op, name),
            output: message.to_string(),
        }
    }
}

impl ProcessRuntime for FakeRuntime {
    async fn run(&self, spec: &ContainerSpec) -> Result<String> {
        self.record("run", &spec.name);
        if self.fail_run {
            return Err(Self::failure("run", &spec.name, "image pull failed"));
        }

        let mut containers = self.containers.lock();
        if containers.contains_key(&spec.name) {
            return Err(Self::failure(
                "run",
                &spec.name,
                "Conflict. The container name is already in use",
            ));
        }

        let mut details = ContainerDetails {
            name: spec.name.clone(),
            running: true,
            network_mode: spec.network.clone(),
            env: spec.env.iter().cloned().collect(),
            ..Default::default()
        };
        for (host, container) in &spec.published_ports {
            details.port_bindings.entry(*container).or_default().push(*host);
        }
        containers.insert(spec.name.clone(), details);
        self.started.lock().push(spec.clone());

        Ok(format!("id-{}", spec.name))
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerDetails>> {
        self.record("inspect", name);
        Ok(self.containers.lock().get(name).cloned())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.record("stop", name);
        if self.fail_stop && self.contains(name) {
            return Err(Self::failure("stop", name, "permission denied"));
        }
        let mut containers = self.containers.lock();
        if self.keep_stopped {
            if let Some(details) = containers.get_mut(name) {
                details.running = false;
            }
        } else {
            containers.remove(name);
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.record("remove", name);
        self.containers.lock().remove(name);
        Ok(())
    }

    async fn exists(&self, name: &str) -> bool {
        self.record("exists", name);
        self.contains(name)
    }

    async fn is_available(&self) -> bool {
        true
    }
}
