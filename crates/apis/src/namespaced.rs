//! Namespaced family: configs default to living beside their consumers,
//! except the cluster-wide `ClusterProviderConfig`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ProviderCredentials, TypedReference, UsageConfigReference};

/// The canonical provider config spec. Resolution normalizes every fetched
/// config, from either family, into this shape.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "elasticstack.m.crossplane.io",
    version = "v1beta1",
    kind = "ProviderConfig",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    pub credentials: ProviderCredentials,
}

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "elasticstack.m.crossplane.io",
    version = "v1beta1",
    kind = "ClusterProviderConfig"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProviderConfigSpec {
    pub credentials: ProviderCredentials,
}

// Same shape by construction, so taking the spec "as-is" is a field move.
impl From<ClusterProviderConfigSpec> for ProviderConfigSpec {
    fn from(spec: ClusterProviderConfigSpec) -> Self {
        Self {
            credentials: spec.credentials,
        }
    }
}

/// Usage record marking a provider config as in use by a managed resource.
/// Lives in the consuming resource's namespace.
#[derive(CustomResource, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "elasticstack.m.crossplane.io",
    version = "v1beta1",
    kind = "ProviderConfigUsage",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigUsageSpec {
    pub provider_config_ref: UsageConfigReference,
    pub resource_ref: TypedReference,
}
