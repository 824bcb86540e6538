//! vcexpose CLI - Expose virtual cluster API servers on local distributions
//!
//! A command-line tool for making a vcluster reachable from the host when
//! it runs on docker-desktop, rancher-desktop, kind, k3d or minikube, and
//! for cleaning up the forwarding containers afterwards.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vcexpose_core::DistributionType;

use commands::Globals;

#[derive(Parser)]
#[command(name = "vcexpose")]
#[command(author, version, about = "Expose virtual cluster API servers on local distributions")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Host kubeconfig (defaults to KUBECONFIG or ~/.kube/config)
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Host kubeconfig context (defaults to the current context)
    #[arg(long, global = true)]
    context: Option<String>,

    /// Settings file (defaults to <config dir>/vcexpose/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Identifies a virtual cluster in the host cluster.
#[derive(Args, Clone)]
struct VClusterArgs {
    /// Virtual cluster name
    name: String,

    /// Namespace the virtual cluster runs in
    #[arg(short, long, default_value = "default")]
    namespace: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Make a virtual cluster's API server reachable from this machine
    Expose {
        #[command(flatten)]
        vcluster: VClusterArgs,

        /// Kubeconfig of the virtual cluster
        #[arg(long)]
        vcluster_kubeconfig: PathBuf,

        /// Service fronting the virtual cluster (defaults to its name)
        #[arg(long)]
        service: Option<String>,

        /// Loopback port for forwarding containers (defaults to a free port)
        #[arg(long)]
        local_port: Option<u16>,

        /// Override the detected distribution
        #[arg(long)]
        distribution: Option<DistributionType>,

        /// Write the exposed server back into the virtual cluster kubeconfig
        #[arg(long)]
        write: bool,
    },

    /// Stop forwarding containers started for a virtual cluster
    #[command(alias = "rm")]
    Cleanup {
        #[command(flatten)]
        vcluster: VClusterArgs,

        /// Override the detected distribution
        #[arg(long)]
        distribution: Option<DistributionType>,
    },

    /// Manage the kubectl port-forward background container
    #[command(alias = "bg")]
    BackgroundProxy {
        #[command(subcommand)]
        action: BackgroundAction,
    },

    /// Print the context name used for a virtual cluster
    Name {
        #[command(flatten)]
        vcluster: VClusterArgs,
    },

    /// Split a context name back into its parts
    Parse {
        /// Context name to parse
        context: String,
    },

    /// Show the runtime and proxy state for a virtual cluster
    Status {
        #[command(flatten)]
        vcluster: VClusterArgs,
    },
}

#[derive(Subcommand)]
enum BackgroundAction {
    /// Start (or replace) the background proxy
    Start {
        #[command(flatten)]
        vcluster: VClusterArgs,

        /// Kubeconfig of the virtual cluster, used to verify the proxy
        #[arg(long)]
        vcluster_kubeconfig: PathBuf,

        /// Loopback port to forward (defaults to a free port)
        #[arg(long)]
        local_port: Option<u16>,
    },
    /// Remove the background proxy
    #[command(alias = "rm")]
    Stop {
        #[command(flatten)]
        vcluster: VClusterArgs,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "vcexpose=debug,vcexpose_core=debug"
    } else {
        "vcexpose=info,vcexpose_core=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let globals = Globals {
        kubeconfig: cli.kubeconfig,
        context: cli.context,
        config: cli.config,
        json: cli.json,
    };

    match cli.command {
        Commands::Expose {
            vcluster,
            vcluster_kubeconfig,
            service,
            local_port,
            distribution,
            write,
        } => {
            commands::expose::run(
                &globals,
                commands::expose::ExposeArgs {
                    name: vcluster.name,
                    namespace: vcluster.namespace,
                    vcluster_kubeconfig,
                    service,
                    local_port,
                    distribution,
                    write,
                },
            )
            .await?;
        }
        Commands::Cleanup {
            vcluster,
            distribution,
        } => {
            commands::cleanup::run(&globals, &vcluster.name, &vcluster.namespace, distribution)
                .await?;
        }
        Commands::BackgroundProxy { action } => match action {
            BackgroundAction::Start {
                vcluster,
                vcluster_kubeconfig,
                local_port,
            } => {
                commands::background::start(
                    &globals,
                    &vcluster.name,
                    &vcluster.namespace,
                    &vcluster_kubeconfig,
                    local_port,
                )
                .await?
            }
            BackgroundAction::Stop { vcluster } => {
                commands::background::stop(&globals, &vcluster.name, &vcluster.namespace).await?
            }
        },
        Commands::Name { vcluster } => {
            commands::name::show(&globals, &vcluster.name, &vcluster.namespace)?;
        }
        Commands::Parse { context } => {
            commands::name::parse(&context, globals.json)?;
        }
        Commands::Status { vcluster } => {
            commands::status::show(&globals, &vcluster.name, &vcluster.namespace).await?;
        }
    }

    Ok(())
}
