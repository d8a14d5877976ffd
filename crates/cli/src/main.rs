//! `esprovctl`: operational utilities for the Elasticstack provider.

#![forbid(unsafe_code)]

use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use tracing::{debug, info};

use esprov_apis::{cluster, namespaced, ProviderConfigReference};
use esprov_clients::{
    KubeConfigStore, KubeCredentialsExtractor, Managed, ProviderSetup, ScopeFamily, SetupBuilder,
    UsageTracker, CONFIG_BLOCK,
};

#[derive(Parser, Debug)]
#[command(name = "esprovctl", version, about = "Elasticstack provider utilities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the provider's CustomResourceDefinitions as YAML
    Crdgen,
    /// Resolve a provider config reference against the live cluster and
    /// print the assembled setup (password redacted)
    Check {
        /// Referenced kind: "ProviderConfig" or "ClusterProviderConfig"
        #[arg(long = "kind", default_value = "ProviderConfig")]
        kind: String,
        /// Referenced config name
        #[arg(long = "name")]
        name: String,
        /// Namespace to resolve from, as a namespaced consumer would
        #[arg(long = "ns")]
        namespace: Option<String>,
        /// Upstream provider source requirement
        #[arg(long = "provider-source", default_value = "elastic/elasticstack")]
        provider_source: String,
        /// Upstream provider version requirement
        #[arg(long = "provider-version", default_value = "0.11.7")]
        provider_version: String,
    },
}

fn init_tracing() {
    let env = std::env::var("ESPROV_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Synthetic consumer used to drive resolution from the command line.
struct CheckTarget {
    namespace: Option<String>,
    config_ref: ProviderConfigReference,
}

impl Managed for CheckTarget {
    fn api_version(&self) -> &str {
        "elasticstack.m.crossplane.io/v1beta1"
    }
    fn kind(&self) -> &str {
        "ElasticsearchUser"
    }
    fn name(&self) -> &str {
        "esprovctl-check"
    }
    fn uid(&self) -> Option<&str> {
        None
    }
    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
    fn provider_config_ref(&self) -> Option<&ProviderConfigReference> {
        Some(&self.config_ref)
    }
}

/// A debug command must never write usage records.
struct NoopTracker;

#[async_trait::async_trait]
impl UsageTracker for NoopTracker {
    async fn track(&self, family: ScopeFamily, _mg: &dyn Managed) -> Result<()> {
        debug!(family = ?family, "usage tracking skipped (check mode)");
        Ok(())
    }
}

fn crdgen() -> Result<()> {
    let crds = [
        cluster::ProviderConfig::crd(),
        cluster::ClusterProviderConfig::crd(),
        cluster::ProviderConfigUsage::crd(),
        namespaced::ProviderConfig::crd(),
        namespaced::ClusterProviderConfig::crd(),
        namespaced::ProviderConfigUsage::crd(),
    ];
    for crd in crds {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}

fn redact_password(setup: &mut ProviderSetup) {
    if let Some(block) = setup
        .configuration
        .get_mut(CONFIG_BLOCK)
        .and_then(|v| v.as_array_mut())
    {
        for entry in block.iter_mut() {
            if let Some(password) = entry.get_mut("password") {
                *password = serde_json::Value::String("<redacted>".to_string());
            }
        }
    }
}

async fn check(
    kind: String,
    name: String,
    namespace: Option<String>,
    provider_source: String,
    provider_version: String,
) -> Result<()> {
    let client = kube::Client::try_default().await?;
    let builder = SetupBuilder::new(
        env!("CARGO_PKG_VERSION"),
        provider_source,
        provider_version,
        KubeConfigStore::new(client.clone()),
        NoopTracker,
        KubeCredentialsExtractor::new(client),
    );
    let target = CheckTarget {
        namespace,
        config_ref: ProviderConfigReference { kind, name },
    };

    let mut setup = builder.setup(&target).await?;
    info!(
        name = %target.config_ref.name,
        kind = %target.config_ref.kind,
        "provider config resolved"
    );
    redact_password(&mut setup);
    println!("{}", serde_json::to_string_pretty(&setup)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Crdgen => crdgen(),
        Commands::Check {
            kind,
            name,
            namespace,
            provider_source,
            provider_version,
        } => check(kind, name, namespace, provider_source, provider_version).await,
    }
}
