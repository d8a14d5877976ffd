//! Legacy cluster-scoped family: every kind here lives outside any namespace.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ProviderCredentials, TypedReference, UsageConfigReference};

/// Spec of the cluster family's provider configs. Field-compatible with
/// [`crate::namespaced::ProviderConfigSpec`] by construction; conversion
/// between the two goes through [`crate::convert_cluster_spec`].
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "elasticstack.crossplane.io",
    version = "v1beta1",
    kind = "ProviderConfig"
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    pub credentials: ProviderCredentials,
}

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "elasticstack.crossplane.io",
    version = "v1beta1",
    kind = "ClusterProviderConfig"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProviderConfigSpec {
    pub credentials: ProviderCredentials,
}

/// Usage record marking a provider config as in use by a managed resource.
#[derive(CustomResource, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "elasticstack.crossplane.io",
    version = "v1beta1",
    kind = "ProviderConfigUsage"
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigUsageSpec {
    pub provider_config_ref: UsageConfigReference,
    pub resource_ref: TypedReference,
}
