use crate::manifest;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use linkerd_policy_analyzer_k8s_index::{ClusterInfo, MemorySource, Resolver, ServerMatch};
use linkerd_policy_analyzer_k8s_validation::Validator;
use serde::Serialize;
use std::{io::Write, path::PathBuf};

#[derive(Debug, Parser)]
#[clap(
    name = "linkerd-policy-analyzer",
    about = "Explains and validates Linkerd authorization policy"
)]
pub struct Args {
    #[clap(
        long,
        global = true,
        default_value = "linkerd=info,warn",
        env = "LINKERD_POLICY_ANALYZER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, global = true, default_value = "plain")]
    log_format: kubert::LogFormat,

    /// Manifest files or directories holding the objects to analyze.
    #[clap(long = "manifests", global = true, num_args = 1..)]
    manifests: Vec<PathBuf>,

    #[clap(long, global = true, default_value = "linkerd")]
    control_plane_namespace: String,

    #[clap(long, global = true, default_value = "cluster.local")]
    identity_domain: String,

    /// How a workload's Servers are found: `app-label` or `pods`.
    #[clap(long, global = true, default_value = "app-label")]
    server_match: ServerMatch,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists the Servers a workload is authorized to reach.
    AllowedTargets {
        #[clap(long, short = 'n')]
        namespace: String,

        /// The workload, matched by its `app` label.
        workload: String,
    },

    /// Lists the clients that are authorized to reach a workload.
    AllowedSources {
        #[clap(long, short = 'n')]
        namespace: String,

        /// The workload, matched by its `app` label.
        workload: String,
    },

    /// Explains whether one workload may reach another.
    AnalyzeConnectivity {
        #[clap(long)]
        source_namespace: String,

        #[clap(long)]
        source: String,

        /// Defaults to the source namespace.
        #[clap(long)]
        target_namespace: Option<String>,

        #[clap(long)]
        target: String,
    },

    /// Lists workloads running the Linkerd proxy.
    ListMeshedServices {
        /// Limits the listing to a namespace.
        #[clap(long, short = 'n')]
        namespace: Option<String>,
    },

    /// Validates policy resources and proxy configuration.
    Validate {
        /// Limits validation to a namespace.
        #[clap(long, short = 'n')]
        namespace: Option<String>,

        /// One of server, authpolicy, meshtls, networkauth, proxy or all.
        #[clap(long, default_value = "all")]
        resource_type: String,

        /// Only reports resources with this name.
        #[clap(long)]
        resource_name: Option<String>,

        /// Reports only errors.
        #[clap(long)]
        errors_only: bool,
    },
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            manifests,
            control_plane_namespace,
            identity_domain,
            server_match,
            command,
        } = self;

        log_format.try_init(log_level)?;

        let cluster = ClusterInfo {
            control_plane_ns: control_plane_namespace,
            identity_domain,
        };

        let source = load(&manifests)?;
        command.run(source, cluster, server_match).await
    }
}

impl Command {
    async fn run(
        self,
        source: MemorySource,
        cluster: ClusterInfo,
        server_match: ServerMatch,
    ) -> Result<()> {
        let resolver =
            Resolver::new(source.clone(), cluster.clone()).with_server_match(server_match);

        match self {
            Self::AllowedTargets {
                namespace,
                workload,
            } => print(&resolver.allowed_targets(&namespace, &workload).await?),

            Self::AllowedSources {
                namespace,
                workload,
            } => print(&resolver.allowed_sources(&namespace, &workload).await?),

            Self::AnalyzeConnectivity {
                source_namespace,
                source,
                target_namespace,
                target,
            } => print(
                &resolver
                    .analyze_connectivity(
                        &source_namespace,
                        &source,
                        target_namespace.as_deref(),
                        &target,
                    )
                    .await?,
            ),

            Self::ListMeshedServices { namespace } => {
                print(&resolver.list_meshed_services(namespace.as_deref()).await?)
            }

            Self::Validate {
                namespace,
                resource_type,
                resource_name,
                errors_only,
            } => {
                let report = Validator::new(source, cluster)
                    .validate_config(
                        namespace.as_deref(),
                        &resource_type,
                        resource_name.as_deref(),
                        !errors_only,
                    )
                    .await?;
                print(&report)
            }
        }
    }
}

/// Loads the objects to analyze. Clap can't require a global flag, so its
/// presence is checked here.
fn load(manifests: &[PathBuf]) -> Result<MemorySource> {
    if manifests.is_empty() {
        bail!("--manifests must name at least one file or directory");
    }
    manifest::load(manifests)
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
