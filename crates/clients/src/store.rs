//! Kubernetes-backed implementations of the resolver's collaborator seams.

use anyhow::Context as _;
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use tracing::debug;

use esprov_apis::{cluster, namespaced, TypedReference, UsageConfigReference};

use crate::resolver::{
    ConfigStore, ConfigTarget, Managed, ProviderConfigObject, ScopeFamily, StoreError, UsageTracker,
};

/// Field manager for server-side-applied usage records.
const FIELD_MANAGER: &str = "provider-elasticstack";

fn map_get_err(e: kube::Error) -> StoreError {
    match e {
        kube::Error::Api(ref resp) if resp.code == 404 => StoreError::NotFound,
        other => StoreError::Api(other),
    }
}

// A per-namespace config can never live outside a namespace. An empty lookup
// namespace must miss, never fall back to the client's default namespace.
fn require_namespace(namespace: Option<&str>) -> Result<&str, StoreError> {
    namespace.ok_or(StoreError::NotFound)
}

/// Fetches provider configs with typed `Api` handles per target.
#[derive(Clone)]
pub struct KubeConfigStore {
    client: Client,
}

impl KubeConfigStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigStore for KubeConfigStore {
    async fn get(
        &self,
        target: ConfigTarget,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<ProviderConfigObject, StoreError> {
        let client = self.client.clone();
        match (target.family, target.cluster_wide) {
            (ScopeFamily::Namespaced, false) => {
                let ns = require_namespace(namespace)?;
                let api: Api<namespaced::ProviderConfig> = Api::namespaced(client, ns);
                Ok(ProviderConfigObject::Namespaced(
                    api.get(name).await.map_err(map_get_err)?,
                ))
            }
            (ScopeFamily::Namespaced, true) => {
                let api: Api<namespaced::ClusterProviderConfig> = Api::all(client);
                Ok(ProviderConfigObject::NamespacedClusterWide(
                    api.get(name).await.map_err(map_get_err)?,
                ))
            }
            (ScopeFamily::Cluster, false) => {
                let api: Api<cluster::ProviderConfig> = Api::all(client);
                Ok(ProviderConfigObject::Cluster(
                    api.get(name).await.map_err(map_get_err)?,
                ))
            }
            (ScopeFamily::Cluster, true) => {
                let api: Api<cluster::ClusterProviderConfig> = Api::all(client);
                Ok(ProviderConfigObject::ClusterWide(
                    api.get(name).await.map_err(map_get_err)?,
                ))
            }
        }
    }
}

/// Tracks usage by server-side-applying a `ProviderConfigUsage` under a
/// deterministic name, which makes repeated tracking idempotent.
#[derive(Clone)]
pub struct KubeUsageTracker {
    client: Client,
}

impl KubeUsageTracker {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn usage_name(mg: &dyn Managed) -> String {
    match mg.uid() {
        Some(uid) if !uid.is_empty() => uid.to_ascii_lowercase(),
        _ => format!("{}-{}", mg.kind().to_ascii_lowercase(), mg.name()),
    }
}

fn resource_ref(mg: &dyn Managed, namespace: Option<&str>) -> TypedReference {
    TypedReference {
        api_version: mg.api_version().to_string(),
        kind: mg.kind().to_string(),
        name: mg.name().to_string(),
        namespace: namespace.map(str::to_owned),
    }
}

#[async_trait]
impl UsageTracker for KubeUsageTracker {
    async fn track(&self, family: ScopeFamily, mg: &dyn Managed) -> anyhow::Result<()> {
        let config_ref = mg
            .provider_config_ref()
            .context("managed resource has no providerConfigRef")?;
        let provider_config_ref = UsageConfigReference {
            name: config_ref.name.clone(),
        };
        let name = usage_name(mg);
        let params = PatchParams::apply(FIELD_MANAGER).force();

        match family {
            ScopeFamily::Namespaced => {
                let ns = mg
                    .namespace()
                    .filter(|ns| !ns.is_empty())
                    .context("namespaced config usage requires a namespaced resource")?;
                let usage = namespaced::ProviderConfigUsage::new(
                    &name,
                    namespaced::ProviderConfigUsageSpec {
                        provider_config_ref,
                        resource_ref: resource_ref(mg, Some(ns)),
                    },
                );
                let api: Api<namespaced::ProviderConfigUsage> =
                    Api::namespaced(self.client.clone(), ns);
                api.patch(&name, &params, &Patch::Apply(&usage))
                    .await
                    .context("applying namespaced ProviderConfigUsage")?;
            }
            ScopeFamily::Cluster => {
                let usage = cluster::ProviderConfigUsage::new(
                    &name,
                    cluster::ProviderConfigUsageSpec {
                        provider_config_ref,
                        resource_ref: resource_ref(mg, None),
                    },
                );
                let api: Api<cluster::ProviderConfigUsage> = Api::all(self.client.clone());
                api.patch(&name, &params, &Patch::Apply(&usage))
                    .await
                    .context("applying cluster ProviderConfigUsage")?;
            }
        }
        debug!(usage = %name, family = ?family, "provider config usage recorded");
        Ok(())
    }
}
