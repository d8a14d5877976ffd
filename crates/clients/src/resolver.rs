//! Provider config resolution: ordered candidate search across the two scope
//! families, variant dispatch, and usage tracking.

use async_trait::async_trait;
use thiserror::Error as ThisError;
use tracing::debug;

use esprov_apis::{
    cluster, convert_cluster_spec, namespaced, ProviderConfigReference,
    CLUSTER_PROVIDER_CONFIG_KIND, PROVIDER_CONFIG_KIND,
};

use crate::error::Error;

/// Read-only view of the managed resource asking for a connection. The
/// reconciliation loop owns the resource; this core only reads it.
pub trait Managed: Send + Sync {
    fn api_version(&self) -> &str;
    fn kind(&self) -> &str;
    fn name(&self) -> &str;
    fn uid(&self) -> Option<&str>;
    /// `None` (or empty) means the resource is cluster-scoped.
    fn namespace(&self) -> Option<&str>;
    fn provider_config_ref(&self) -> Option<&ProviderConfigReference>;
}

/// The two scope families a config reference may have been authored against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeFamily {
    /// Legacy family; never namespaced.
    Cluster,
    /// Family whose configs default to the consumer's namespace.
    Namespaced,
}

/// A concrete object the store can fetch: one family plus whether the
/// referenced kind is the family's designated cluster-wide config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConfigTarget {
    pub family: ScopeFamily,
    pub cluster_wide: bool,
}

impl ConfigTarget {
    /// Scheme lookup: resolve a referenced kind within one family, or `None`
    /// when the kind is not registered there (the caller moves on to the
    /// next candidate; this is not an error).
    pub fn for_reference(family: ScopeFamily, kind: &str) -> Option<Self> {
        match kind {
            PROVIDER_CONFIG_KIND => Some(Self {
                family,
                cluster_wide: false,
            }),
            CLUSTER_PROVIDER_CONFIG_KIND => Some(Self {
                family,
                cluster_wide: true,
            }),
            _ => None,
        }
    }
}

/// A fetched provider config, tagged by its concrete variant.
#[derive(Clone, Debug)]
pub enum ProviderConfigObject {
    Namespaced(namespaced::ProviderConfig),
    NamespacedClusterWide(namespaced::ClusterProviderConfig),
    Cluster(cluster::ProviderConfig),
    ClusterWide(cluster::ClusterProviderConfig),
}

#[derive(Debug, ThisError)]
pub enum StoreError {
    /// Normal branch of the candidate search, never fatal on its own.
    #[error("provider config not found")]
    NotFound,
    #[error(transparent)]
    Api(#[from] kube::Error),
}

/// Fetches provider config objects by target, name and namespace.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(
        &self,
        target: ConfigTarget,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<ProviderConfigObject, StoreError>;
}

/// Records that a managed resource uses a config of the given family, for
/// safe-deletion bookkeeping. Must be idempotent for the same pairing.
#[async_trait]
pub trait UsageTracker: Send + Sync {
    async fn track(&self, family: ScopeFamily, mg: &dyn Managed) -> anyhow::Result<()>;
}

#[derive(Clone, Copy)]
struct Candidate<'a> {
    family: ScopeFamily,
    default_namespace: Option<&'a str>,
}

/// Resolve the provider config referenced by `mg` into the canonical spec.
///
/// Probes the scope family matching the resource's own locality first, falls
/// back to the other, and records usage before handing the spec back. Usage
/// is tracked exactly once on success and never on failure.
pub async fn resolve<S, T>(
    store: &S,
    tracker: &T,
    mg: &dyn Managed,
) -> Result<namespaced::ProviderConfigSpec, Error>
where
    S: ConfigStore + ?Sized,
    T: UsageTracker + ?Sized,
{
    let config_ref = mg.provider_config_ref().ok_or(Error::NoConfigReference)?;
    let mg_namespace = mg.namespace().filter(|ns| !ns.is_empty());

    let mut candidates = [
        Candidate {
            family: ScopeFamily::Cluster,
            default_namespace: None,
        },
        Candidate {
            family: ScopeFamily::Namespaced,
            default_namespace: mg_namespace,
        },
    ];
    if mg_namespace.is_some() {
        candidates.swap(0, 1);
    }

    for candidate in candidates {
        let Some(target) = ConfigTarget::for_reference(candidate.family, &config_ref.kind) else {
            debug!(family = ?candidate.family, kind = %config_ref.kind, "kind not registered in family");
            continue;
        };

        // The designated cluster-wide kind is always looked up bare.
        let lookup_namespace = if target.cluster_wide {
            None
        } else {
            candidate.default_namespace
        };

        let obj = match store.get(target, &config_ref.name, lookup_namespace).await {
            Ok(obj) => obj,
            Err(StoreError::NotFound) => {
                debug!(family = ?candidate.family, name = %config_ref.name, "provider config not in this family");
                continue;
            }
            Err(e) => return Err(Error::GetProviderConfig(Some(e))),
        };

        let spec = match (obj, target.family, target.cluster_wide) {
            (ProviderConfigObject::Namespaced(pc), ScopeFamily::Namespaced, false) => {
                let mut spec = pc.spec;
                // Credentials live beside their consumer, never in a
                // namespace named by the config object itself.
                if let Some(secret_ref) = spec.credentials.secret_ref.as_mut() {
                    secret_ref.namespace = mg_namespace.map(str::to_owned);
                }
                spec
            }
            (ProviderConfigObject::NamespacedClusterWide(pc), ScopeFamily::Namespaced, true) => {
                pc.spec.into()
            }
            (ProviderConfigObject::Cluster(pc), ScopeFamily::Cluster, false) => {
                convert_cluster_spec(&pc.spec).map_err(Error::ConvertSpec)?
            }
            (ProviderConfigObject::ClusterWide(pc), ScopeFamily::Cluster, true) => {
                convert_cluster_spec(&pc.spec).map_err(Error::ConvertSpec)?
            }
            _ => return Err(Error::UnknownConfigType),
        };

        tracker
            .track(candidate.family, mg)
            .await
            .map_err(Error::TrackUsage)?;
        debug!(family = ?candidate.family, name = %config_ref.name, "provider config resolved");
        return Ok(spec);
    }

    Err(Error::GetProviderConfig(None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use esprov_apis::{CredentialsSource, ProviderCredentials, SecretReference};

    struct TestManaged {
        namespace: Option<String>,
        config_ref: Option<ProviderConfigReference>,
    }

    impl TestManaged {
        fn new(namespace: Option<&str>, kind: &str, name: &str) -> Self {
            Self {
                namespace: namespace.map(str::to_owned),
                config_ref: Some(ProviderConfigReference {
                    kind: kind.to_string(),
                    name: name.to_string(),
                }),
            }
        }
    }

    impl Managed for TestManaged {
        fn api_version(&self) -> &str {
            "elasticstack.m.crossplane.io/v1beta1"
        }
        fn kind(&self) -> &str {
            "ElasticsearchUser"
        }
        fn name(&self) -> &str {
            "test-user"
        }
        fn uid(&self) -> Option<&str> {
            Some("b1a9c5de-0000-4000-8000-000000000001")
        }
        fn namespace(&self) -> Option<&str> {
            self.namespace.as_deref()
        }
        fn provider_config_ref(&self) -> Option<&ProviderConfigReference> {
            self.config_ref.as_ref()
        }
    }

    type Lookup = (ConfigTarget, String, Option<String>);

    #[derive(Default)]
    struct FakeStore {
        objects: Vec<(Lookup, ProviderConfigObject)>,
        hard_fail: Option<ConfigTarget>,
        calls: Mutex<Vec<Lookup>>,
    }

    impl FakeStore {
        fn with(mut self, target: ConfigTarget, name: &str, ns: Option<&str>, obj: ProviderConfigObject) -> Self {
            self.objects
                .push(((target, name.to_string(), ns.map(str::to_owned)), obj));
            self
        }

        fn calls(&self) -> Vec<Lookup> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConfigStore for FakeStore {
        async fn get(
            &self,
            target: ConfigTarget,
            name: &str,
            namespace: Option<&str>,
        ) -> Result<ProviderConfigObject, StoreError> {
            let key = (target, name.to_string(), namespace.map(str::to_owned));
            self.calls.lock().unwrap().push(key.clone());
            if self.hard_fail == Some(target) {
                return Err(StoreError::Api(kube::Error::Api(
                    kube::core::ErrorResponse {
                        status: "Failure".to_string(),
                        message: "etcd is on fire".to_string(),
                        reason: "InternalError".to_string(),
                        code: 500,
                    },
                )));
            }
            self.objects
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, obj)| obj.clone())
                .ok_or(StoreError::NotFound)
        }
    }

    #[derive(Default)]
    struct FakeTracker {
        fail: bool,
        calls: Mutex<Vec<ScopeFamily>>,
    }

    impl FakeTracker {
        fn calls(&self) -> Vec<ScopeFamily> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UsageTracker for FakeTracker {
        async fn track(&self, family: ScopeFamily, _mg: &dyn Managed) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(family);
            if self.fail {
                anyhow::bail!("usage write rejected");
            }
            Ok(())
        }
    }

    fn secret_credentials(ns: Option<&str>) -> ProviderCredentials {
        ProviderCredentials {
            source: CredentialsSource::Secret,
            secret_ref: Some(SecretReference {
                name: "es-creds".to_string(),
                namespace: ns.map(str::to_owned),
                key: None,
            }),
            ..Default::default()
        }
    }

    fn namespaced_pc(name: &str, secret_ns: Option<&str>) -> ProviderConfigObject {
        ProviderConfigObject::Namespaced(namespaced::ProviderConfig::new(
            name,
            namespaced::ProviderConfigSpec {
                credentials: secret_credentials(secret_ns),
            },
        ))
    }

    fn cluster_pc(name: &str, secret_ns: Option<&str>) -> ProviderConfigObject {
        ProviderConfigObject::Cluster(cluster::ProviderConfig::new(
            name,
            cluster::ProviderConfigSpec {
                credentials: secret_credentials(secret_ns),
            },
        ))
    }

    const NS_PC: ConfigTarget = ConfigTarget {
        family: ScopeFamily::Namespaced,
        cluster_wide: false,
    };
    const NS_CLUSTER_PC: ConfigTarget = ConfigTarget {
        family: ScopeFamily::Namespaced,
        cluster_wide: true,
    };
    const CLUSTER_PC: ConfigTarget = ConfigTarget {
        family: ScopeFamily::Cluster,
        cluster_wide: false,
    };

    #[tokio::test]
    async fn missing_reference_fails_up_front() {
        let mg = TestManaged {
            namespace: Some("ns-a".to_string()),
            config_ref: None,
        };
        let store = FakeStore::default();
        let tracker = FakeTracker::default();

        let err = resolve(&store, &tracker, &mg).await.unwrap_err();
        assert!(matches!(err, Error::NoConfigReference));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn namespaced_resource_probes_its_own_family_first() {
        // Config exists only in the cluster family: the namespaced probe
        // misses, the fallback converts and succeeds.
        let mg = TestManaged::new(Some("ns-b"), "ProviderConfig", "shared");
        let store =
            FakeStore::default().with(CLUSTER_PC, "shared", None, cluster_pc("shared", Some("ns-a")));
        let tracker = FakeTracker::default();

        let spec = resolve(&store, &tracker, &mg).await.unwrap();

        let calls = store.calls();
        assert_eq!(
            calls,
            vec![
                (NS_PC, "shared".to_string(), Some("ns-b".to_string())),
                (CLUSTER_PC, "shared".to_string(), None),
            ]
        );
        assert_eq!(tracker.calls(), vec![ScopeFamily::Cluster]);
        // Converted, not rewritten: the cluster family keeps its namespace.
        let secret_ref = spec.credentials.secret_ref.unwrap();
        assert_eq!(secret_ref.namespace.as_deref(), Some("ns-a"));
    }

    #[tokio::test]
    async fn cluster_scoped_resource_probes_cluster_family_first() {
        let mg = TestManaged::new(None, "ProviderConfig", "shared");
        let store =
            FakeStore::default().with(NS_PC, "shared", None, namespaced_pc("shared", None));
        let tracker = FakeTracker::default();

        resolve(&store, &tracker, &mg).await.unwrap();

        let calls = store.calls();
        assert_eq!(calls[0].0, CLUSTER_PC);
        assert_eq!(calls[1].0, NS_PC);
        assert_eq!(tracker.calls(), vec![ScopeFamily::Namespaced]);
    }

    #[tokio::test]
    async fn secret_ref_namespace_is_rewritten_to_the_consumer() {
        let mg = TestManaged::new(Some("ns-b"), "ProviderConfig", "pc");
        let store = FakeStore::default().with(
            NS_PC,
            "pc",
            Some("ns-b"),
            namespaced_pc("pc", Some("ns-a")),
        );
        let tracker = FakeTracker::default();

        let spec = resolve(&store, &tracker, &mg).await.unwrap();
        let secret_ref = spec.credentials.secret_ref.unwrap();
        assert_eq!(secret_ref.namespace.as_deref(), Some("ns-b"));
    }

    #[tokio::test]
    async fn cluster_wide_kind_is_looked_up_without_namespace() {
        let mg = TestManaged::new(Some("ns-b"), "ClusterProviderConfig", "global");
        let store = FakeStore::default().with(
            NS_CLUSTER_PC,
            "global",
            None,
            ProviderConfigObject::NamespacedClusterWide(namespaced::ClusterProviderConfig::new(
                "global",
                namespaced::ClusterProviderConfigSpec {
                    credentials: secret_credentials(Some("infra")),
                },
            )),
        );
        let tracker = FakeTracker::default();

        let spec = resolve(&store, &tracker, &mg).await.unwrap();

        assert_eq!(store.calls()[0], (NS_CLUSTER_PC, "global".to_string(), None));
        // Taken as-is: no rewrite for the cluster-wide kind.
        let secret_ref = spec.credentials.secret_ref.unwrap();
        assert_eq!(secret_ref.namespace.as_deref(), Some("infra"));
    }

    #[tokio::test]
    async fn exhausted_candidates_fail_without_tracking() {
        let mg = TestManaged::new(Some("ns-b"), "ProviderConfig", "missing");
        let store = FakeStore::default();
        let tracker = FakeTracker::default();

        let err = resolve(&store, &tracker, &mg).await.unwrap_err();
        assert!(matches!(err, Error::GetProviderConfig(None)));
        assert_eq!(store.calls().len(), 2);
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn hard_fetch_error_aborts_before_second_candidate() {
        let mg = TestManaged::new(Some("ns-b"), "ProviderConfig", "pc");
        let store = FakeStore {
            hard_fail: Some(NS_PC),
            ..Default::default()
        };
        let tracker = FakeTracker::default();

        let err = resolve(&store, &tracker, &mg).await.unwrap_err();
        assert!(matches!(err, Error::GetProviderConfig(Some(_))));
        assert_eq!(store.calls().len(), 1);
        assert!(tracker.calls().is_empty());
    }

    #[tokio::test]
    async fn tracker_failure_withholds_the_spec() {
        let mg = TestManaged::new(Some("ns-b"), "ProviderConfig", "pc");
        let store = FakeStore::default().with(
            NS_PC,
            "pc",
            Some("ns-b"),
            namespaced_pc("pc", None),
        );
        let tracker = FakeTracker {
            fail: true,
            ..Default::default()
        };

        let err = resolve(&store, &tracker, &mg).await.unwrap_err();
        assert!(matches!(err, Error::TrackUsage(_)));
    }

    #[tokio::test]
    async fn foreign_kind_is_unknown_to_both_families() {
        let mg = TestManaged::new(Some("ns-b"), "SomeOtherConfig", "pc");
        let store = FakeStore::default();
        let tracker = FakeTracker::default();

        let err = resolve(&store, &tracker, &mg).await.unwrap_err();
        assert!(matches!(err, Error::GetProviderConfig(None)));
        // The scheme rejects the kind before any fetch happens.
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn mismatched_store_variant_is_rejected() {
        // Store claims a namespaced target but hands back a cluster object.
        let mg = TestManaged::new(Some("ns-b"), "ProviderConfig", "pc");
        let store = FakeStore::default().with(
            NS_PC,
            "pc",
            Some("ns-b"),
            cluster_pc("pc", None),
        );
        let tracker = FakeTracker::default();

        let err = resolve(&store, &tracker, &mg).await.unwrap_err();
        assert!(matches!(err, Error::UnknownConfigType));
        assert!(tracker.calls().is_empty());
    }
}
