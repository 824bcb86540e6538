//! Subcommand implementations and the helpers they share.

pub mod background;
pub mod cleanup;
pub mod expose;
pub mod name;
pub mod status;

use std::net::TcpListener;
use std::path::PathBuf;

use anyhow::{Context, Result};
use vcexpose_core::{
    DistributionType, DockerCli, ExposeSettings, Exposer, KubeCredentialSnapshot, KubeVerifier,
    SettingsStore, VClusterIdentity,
};

/// Flags shared by every subcommand.
pub struct Globals {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub config: Option<PathBuf>,
    pub json: bool,
}

impl Globals {
    pub async fn settings(&self) -> Result<ExposeSettings> {
        let store = match &self.config {
            Some(path) => SettingsStore::with_path(path.clone()),
            None => SettingsStore::new()?,
        };
        let settings = store
            .load()
            .await
            .with_context(|| format!("loading settings from {}", store.path().display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Host kubeconfig with `--context` applied.
    pub fn host(&self) -> Result<KubeCredentialSnapshot> {
        let mut host = match &self.kubeconfig {
            Some(path) => KubeCredentialSnapshot::read_from(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => KubeCredentialSnapshot::read()?,
        };
        if let Some(context) = &self.context {
            host.set_current_context(context)?;
        }
        Ok(host)
    }

    pub fn host_context(&self, host: &KubeCredentialSnapshot) -> Result<String> {
        host.current_context()
            .map(str::to_string)
            .context("host kubeconfig has no current context, pass --context")
    }

    pub fn identity(
        &self,
        host: &KubeCredentialSnapshot,
        name: &str,
        namespace: &str,
    ) -> Result<VClusterIdentity> {
        Ok(VClusterIdentity::new(name, namespace, self.host_context(host)?))
    }

    pub async fn exposer(&self) -> Result<Exposer<DockerCli, KubeVerifier>> {
        let settings = self.settings().await?;
        Ok(Exposer::new(
            DockerCli::from_settings(&settings),
            KubeVerifier::new(),
            settings,
        ))
    }
}

pub fn distribution_for(identity: &VClusterIdentity, flag: Option<DistributionType>) -> DistributionType {
    flag.unwrap_or_else(|| DistributionType::detect(&identity.host_context))
}

/// Asks the OS for an unused loopback port.
pub fn free_local_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("finding a free local port")?;
    Ok(listener.local_addr()?.port())
}
