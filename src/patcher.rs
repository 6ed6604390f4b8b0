//! StatefulSet resource reconciliation.
//!
//! The reconciliation workflow is intentionally minimal: fetch the live StatefulSet, overwrite
//! the resource state of any managed container which has drifted from its desired spec, and
//! issue a single merge-patch with the mutated object only when drift was found. The merge-patch
//! carries last-writer-wins semantics; conflict retry is delegated entirely to the caller's
//! triggering event, never performed here.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::{Api, Patch, PatchParams};
use kube::client::Client;

use crate::config::Config;
use crate::error::{is_not_found, Error};
use crate::resources::DesiredResources;

/// The operations this component consumes against the StatefulSet resource kind.
///
/// Modeled as a capability so the reconciliation logic is unit-testable without a live cluster.
#[async_trait]
pub trait StatefulSetApi: Send + Sync {
    /// Fetch the named StatefulSet.
    async fn get(&self, name: &str, namespace: &str) -> Result<StatefulSet, kube::Error>;
    /// Merge-patch the named StatefulSet with the given object.
    async fn patch(&self, name: &str, namespace: &str, sts: &StatefulSet) -> Result<StatefulSet, kube::Error>;
    /// Delete the named StatefulSet.
    async fn delete(&self, name: &str, namespace: &str) -> Result<(), kube::Error>;
}

/// A StatefulSet API backed by a live Kubernetes client.
#[derive(Clone)]
pub struct KubeApi {
    client: Client,
}

impl KubeApi {
    /// Create a new instance from the given client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a new instance using inferred in-cluster or kubeconfig credentials.
    pub async fn try_default() -> Result<Self, Error> {
        let client = Client::try_default().await.map_err(Error::ClientConfig)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatefulSetApi for KubeApi {
    async fn get(&self, name: &str, namespace: &str) -> Result<StatefulSet, kube::Error> {
        let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await
    }

    async fn patch(&self, name: &str, namespace: &str, sts: &StatefulSet) -> Result<StatefulSet, kube::Error> {
        let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        api.patch(name, &PatchParams::default(), &Patch::Merge(sts)).await
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<(), kube::Error> {
        let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &Default::default()).await.map(|_| ())
    }
}

/// A utility for patching the resource requests/limits of the StatefulSet backing an application.
///
/// All inputs are captured at construction and immutable thereafter. Each invocation resolves
/// the operating namespace anew from the configured namespace file.
pub struct StatefulSetPatcher<A> {
    /// The StatefulSet API capability.
    api: A,
    /// Target identity & namespace source.
    config: Config,
    /// The desired resource specs, keyed by container name.
    desired: DesiredResources,
}

impl<A: StatefulSetApi> StatefulSetPatcher<A> {
    /// Create a new instance.
    pub fn new(api: A, config: Config, desired: DesiredResources) -> Self {
        Self { api, config, desired }
    }

    /// Reconcile the target StatefulSet's container resources with the desired specs.
    ///
    /// Idempotent: when every managed container already matches its spec, no write takes place.
    /// Any error — object not found, API error, namespace read failure — propagates to the
    /// caller after being logged.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn reconcile(&self) -> Result<(), Error> {
        let name = self.config.statefulset.as_str();
        let namespace = self.config.namespace()?;
        let mut sts = match self.api.get(name, &namespace).await {
            Ok(sts) => sts,
            Err(err) => {
                tracing::error!(error = ?err, %name, "error fetching StatefulSet");
                return Err(Error::Api(err));
            }
        };

        // Visit the live object's containers in order, overwriting the resource state of any
        // managed container which has drifted. Container names without a desired spec, and
        // desired names without a live container, are both ignored.
        let mut needs_patching = false;
        if let Some(pod) = sts.spec.as_mut().and_then(|spec| spec.template.spec.as_mut()) {
            for container in pod.containers.iter_mut() {
                let spec = match self.desired.get(&container.name) {
                    Some(spec) => spec,
                    None => continue,
                };
                if spec.is_satisfied_by(container) {
                    continue;
                }
                container.resources = Some(spec.to_requirements());
                needs_patching = true;
            }
        }

        if !needs_patching {
            tracing::debug!(%name, "no resource updates needed for StatefulSet");
            return Ok(());
        }
        if let Err(err) = self.api.patch(name, &namespace, &sts).await {
            tracing::error!(error = ?err, %name, "error patching StatefulSet");
            return Err(Error::Api(err));
        }
        tracing::info!(%name, "successfully patched StatefulSet with new resource requests");
        Ok(())
    }

    /// Delete the target StatefulSet.
    ///
    /// The orchestrator can fail to clean up a manually edited StatefulSet, so it is deleted
    /// here on removal. A not-found response is treated as success; any other API error is
    /// logged and propagated.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn teardown(&self) -> Result<(), Error> {
        let name = self.config.statefulset.as_str();
        let namespace = self.config.namespace()?;
        match self.api.delete(name, &namespace).await {
            Ok(()) => {
                tracing::info!(%name, "the patched StatefulSet was deleted");
                Ok(())
            }
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => {
                tracing::error!(error = ?err, %name, "error deleting StatefulSet");
                Err(Error::Api(err))
            }
        }
    }
}
