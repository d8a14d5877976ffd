//! Elasticstack provider API types.
//!
//! Provider configuration objects come in two scope families that share one
//! spec shape: the cluster-scoped legacy family (`elasticstack.crossplane.io`)
//! and the namespaced family (`elasticstack.m.crossplane.io`). The namespaced
//! family's `ProviderConfigSpec` is the canonical shape every resolution path
//! converges to.

#![forbid(unsafe_code)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod cluster;
mod convert;
pub mod namespaced;

pub use convert::convert_cluster_spec;

/// Kind of the per-namespace provider config in either family.
pub const PROVIDER_CONFIG_KIND: &str = "ProviderConfig";
/// Kind of the designated cluster-wide config in either family; always looked
/// up without a namespace.
pub const CLUSTER_PROVIDER_CONFIG_KIND: &str = "ClusterProviderConfig";

/// Where provider credentials are loaded from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CredentialsSource {
    #[default]
    None,
    Secret,
    Environment,
    Filesystem,
    InjectedIdentity,
}

/// Reference to a key of a Kubernetes secret. `key` defaults to
/// `"credentials"` when unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Selects an environment variable of the provider process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvSelector {
    pub name: String,
}

/// Selects a file on the provider's filesystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FsSelector {
    pub path: String,
}

/// Credential source descriptor shared by both spec families.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub source: CredentialsSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsSelector>,
}

/// Names the provider config a managed resource wants to use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigReference {
    pub kind: String,
    pub name: String,
}

/// Reference from a usage record to its provider config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageConfigReference {
    pub name: String,
}

/// Reference from a usage record to the consuming managed resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}
