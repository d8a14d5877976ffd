//! Credential extraction from the sources a provider config may name.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use thiserror::Error as ThisError;

use esprov_apis::{CredentialsSource, ProviderCredentials, SecretReference};

/// Secret key read when the reference does not name one.
pub const DEFAULT_SECRET_KEY: &str = "credentials";

#[derive(Debug, ThisError)]
pub enum ExtractError {
    #[error("credentials source {0:?} is not supported")]
    UnsupportedSource(CredentialsSource),

    #[error("no {0} selector configured for credentials source")]
    MissingSelector(&'static str),

    #[error("cannot get credentials secret")]
    GetSecret(#[source] kube::Error),

    #[error("secret {name} has no key {key}")]
    MissingSecretKey { name: String, key: String },

    #[error("cannot read environment variable {name}")]
    Environment {
        name: String,
        #[source]
        source: std::env::VarError,
    },

    #[error("cannot read credentials file {path}")]
    Filesystem {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// Secrets are always read from an explicit namespace; guessing the client's
// default namespace could hand back an unrelated secret.
fn secret_namespace(secret_ref: &SecretReference) -> Result<&str, ExtractError> {
    secret_ref
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .ok_or(ExtractError::MissingSelector("secretRef.namespace"))
}

/// Turns a credential source descriptor into raw secret bytes.
#[async_trait]
pub trait CredentialsExtractor: Send + Sync {
    async fn extract(&self, credentials: &ProviderCredentials) -> Result<Vec<u8>, ExtractError>;
}

/// Extractor backed by the live cluster (secrets), the process environment
/// and the local filesystem.
#[derive(Clone)]
pub struct KubeCredentialsExtractor {
    client: Client,
}

impl KubeCredentialsExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialsExtractor for KubeCredentialsExtractor {
    async fn extract(&self, credentials: &ProviderCredentials) -> Result<Vec<u8>, ExtractError> {
        match credentials.source {
            CredentialsSource::Secret => {
                let secret_ref = credentials
                    .secret_ref
                    .as_ref()
                    .ok_or(ExtractError::MissingSelector("secretRef"))?;
                let ns = secret_namespace(secret_ref)?;
                let api: Api<Secret> = Api::namespaced(self.client.clone(), ns);
                let secret = api
                    .get(&secret_ref.name)
                    .await
                    .map_err(ExtractError::GetSecret)?;
                let key = secret_ref.key.as_deref().unwrap_or(DEFAULT_SECRET_KEY);
                secret
                    .data
                    .unwrap_or_default()
                    .get(key)
                    .map(|v| v.0.clone())
                    .ok_or_else(|| ExtractError::MissingSecretKey {
                        name: secret_ref.name.clone(),
                        key: key.to_string(),
                    })
            }
            CredentialsSource::Environment => {
                let env = credentials
                    .env
                    .as_ref()
                    .ok_or(ExtractError::MissingSelector("env"))?;
                std::env::var(&env.name)
                    .map(String::into_bytes)
                    .map_err(|source| ExtractError::Environment {
                        name: env.name.clone(),
                        source,
                    })
            }
            CredentialsSource::Filesystem => {
                let fs = credentials
                    .fs
                    .as_ref()
                    .ok_or(ExtractError::MissingSelector("fs"))?;
                tokio::fs::read(&fs.path)
                    .await
                    .map_err(|source| ExtractError::Filesystem {
                        path: fs.path.clone(),
                        source,
                    })
            }
            source @ (CredentialsSource::None | CredentialsSource::InjectedIdentity) => {
                Err(ExtractError::UnsupportedSource(source))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret_ref(namespace: Option<&str>) -> SecretReference {
        SecretReference {
            name: "es-creds".to_string(),
            namespace: namespace.map(str::to_owned),
            key: None,
        }
    }

    #[test]
    fn secret_reads_need_an_explicit_namespace() {
        for ns in [None, Some("")] {
            let err = secret_namespace(&secret_ref(ns)).unwrap_err();
            assert!(matches!(
                err,
                ExtractError::MissingSelector("secretRef.namespace")
            ));
        }
    }

    #[test]
    fn secret_namespace_passes_through_when_set() {
        assert_eq!(secret_namespace(&secret_ref(Some("prod"))).unwrap(), "prod");
    }
}
