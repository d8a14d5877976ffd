//! Cross-family spec conversion.

use serde::Serialize;

use crate::namespaced;

/// Re-encode a cluster-family spec into the canonical namespaced shape.
///
/// The two families are field-compatible by construction, so a roundtrip
/// through a self-describing `serde_json::Value` preserves every field; any
/// drift between the shapes surfaces as an error here instead of silently
/// dropping data. Accepts either of the cluster family's spec types.
pub fn convert_cluster_spec<S>(spec: &S) -> Result<namespaced::ProviderConfigSpec, serde_json::Error>
where
    S: Serialize,
{
    let value = serde_json::to_value(spec)?;
    serde_json::from_value(value)
}
