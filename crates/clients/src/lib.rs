//! Elasticstack provider client setup.
//!
//! Resolves the provider config a managed resource references (across both
//! scope families) and assembles the Terraform-style connection payload —
//! credentials plus endpoint list — from the secret material it points to.

#![forbid(unsafe_code)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod credentials;
mod error;
mod resolver;
mod store;

pub use credentials::{CredentialsExtractor, ExtractError, KubeCredentialsExtractor, DEFAULT_SECRET_KEY};
pub use error::Error;
pub use resolver::{
    resolve, ConfigStore, ConfigTarget, Managed, ProviderConfigObject, ScopeFamily, StoreError,
    UsageTracker,
};
pub use store::{KubeConfigStore, KubeUsageTracker};

const KEY_USERNAME: &str = "username";
const KEY_PASSWORD: &str = "password";
const KEY_ENDPOINTS: &str = "endpoints";
/// Top-level configuration key for the backend service block.
pub const CONFIG_BLOCK: &str = "elasticsearch";

/// Which upstream provider release the setup targets.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRequirement {
    pub source: String,
    pub version: String,
}

/// Runtime connection payload handed to the client construction layer.
/// Built fresh per invocation, never persisted here.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSetup {
    pub version: String,
    pub requirement: ProviderRequirement,
    pub configuration: Map<String, Value>,
}

/// Builds [`ProviderSetup`]s: one resolve + extract + assemble pass per call.
pub struct SetupBuilder<S, T, X> {
    version: String,
    requirement: ProviderRequirement,
    store: S,
    tracker: T,
    extractor: X,
}

impl<S, T, X> SetupBuilder<S, T, X>
where
    S: ConfigStore,
    T: UsageTracker,
    X: CredentialsExtractor,
{
    pub fn new(
        version: impl Into<String>,
        provider_source: impl Into<String>,
        provider_version: impl Into<String>,
        store: S,
        tracker: T,
        extractor: X,
    ) -> Self {
        Self {
            version: version.into(),
            requirement: ProviderRequirement {
                source: provider_source.into(),
                version: provider_version.into(),
            },
            store,
            tracker,
            extractor,
        }
    }

    /// Resolve `mg`'s provider config and assemble its connection payload.
    ///
    /// An empty configuration (no credential fields present) is not an
    /// error; judging whether that is acceptable is the caller's business.
    pub async fn setup(&self, mg: &dyn Managed) -> Result<ProviderSetup, Error> {
        let spec = resolver::resolve(&self.store, &self.tracker, mg).await?;

        let data = self
            .extractor
            .extract(&spec.credentials)
            .await
            .map_err(Error::ExtractCredentials)?;
        let creds: HashMap<String, String> =
            serde_json::from_slice(&data).map_err(Error::UnmarshalCredentials)?;

        let mut configuration = Map::new();
        let block = elasticsearch_block(&creds);
        if !block.is_empty() {
            // One-element array of maps: the Terraform block encoding.
            configuration.insert(
                CONFIG_BLOCK.to_string(),
                Value::Array(vec![Value::Object(block)]),
            );
        }

        Ok(ProviderSetup {
            version: self.version.clone(),
            requirement: self.requirement.clone(),
            configuration,
        })
    }
}

fn elasticsearch_block(creds: &HashMap<String, String>) -> Map<String, Value> {
    let mut block = Map::new();
    for key in [KEY_USERNAME, KEY_PASSWORD] {
        if let Some(v) = creds.get(key).filter(|v| !v.is_empty()) {
            block.insert(key.to_string(), Value::String(v.clone()));
        }
    }
    if let Some(v) = creds.get(KEY_ENDPOINTS).filter(|v| !v.is_empty()) {
        let endpoints: Vec<Value> = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect();
        if !endpoints.is_empty() {
            block.insert(KEY_ENDPOINTS.to_string(), Value::Array(endpoints));
        }
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn endpoints_are_split_trimmed_and_pruned() {
        let block = elasticsearch_block(&creds(&[
            ("username", "u"),
            ("password", "p"),
            ("endpoints", " a:1 , , b:2 "),
        ]));
        assert_eq!(block["username"], "u");
        assert_eq!(block["password"], "p");
        assert_eq!(block["endpoints"], serde_json::json!(["a:1", "b:2"]));
    }

    #[test]
    fn empty_values_leave_no_block_behind() {
        let block = elasticsearch_block(&creds(&[("username", ""), ("password", "")]));
        assert!(block.is_empty());
    }

    #[test]
    fn all_blank_endpoints_are_dropped_entirely() {
        let block = elasticsearch_block(&creds(&[("endpoints", " , ,, ")]));
        assert!(block.is_empty());
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let block = elasticsearch_block(&creds(&[("api_key", "zzz"), ("username", "u")]));
        assert_eq!(block.len(), 1);
        assert_eq!(block["username"], "u");
    }
}
