use thiserror::Error;

use crate::credentials::ExtractError;
use crate::resolver::StoreError;

/// Terminal failures of a single resolve-and-assemble attempt. Nothing here
/// is retried internally; retry policy belongs to the reconciliation loop.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no providerConfigRef provided")]
    NoConfigReference,

    /// Fetch failed hard, or every candidate scope came up empty (in which
    /// case there is no underlying cause).
    #[error("cannot get referenced ProviderConfig")]
    GetProviderConfig(#[source] Option<StoreError>),

    #[error("cannot convert cluster ProviderConfig spec")]
    ConvertSpec(#[source] serde_json::Error),

    #[error("cannot track ProviderConfig usage")]
    TrackUsage(anyhow::Error),

    #[error("cannot extract credentials")]
    ExtractCredentials(#[source] ExtractError),

    #[error("cannot unmarshal elasticstack credentials as JSON")]
    UnmarshalCredentials(#[source] serde_json::Error),

    /// The store handed back an object that does not match the probed
    /// target. Indicates a store/type-registry mismatch, never user input.
    #[error("unknown provider config type")]
    UnknownConfigType,
}
