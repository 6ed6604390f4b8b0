//! Patching of the Kubernetes StatefulSet backing a charm-managed application.
//!
//! When a charm is deployed, the cluster orchestrator creates a StatefulSet named after the
//! application in the namespace of the hosting model. Constraints declared on the application
//! apply uniformly to every container of that StatefulSet, however resources often need to be
//! allocated differently across containers. This crate reconciles the resource requests/limits
//! of individual containers against caller-supplied values, and deletes the StatefulSet when the
//! application is removed.
//!
//! The core of the crate is [`StatefulSetPatcher`], which owns the reconciliation routine: fetch
//! the live object, detect drift on the containers it was told to manage, and issue a single
//! merge-patch only when drift exists. [`PatchRunner`] binds that routine to the host framework's
//! lifecycle events — `install` and `update-status` trigger reconciliation, `remove` triggers
//! teardown, and any caller-registered custom events trigger reconciliation as well.
//!
//! ## Getting started
//!
//! ```no_run
//! use statefulset_resource_patch::{
//!     Config, CpuValue, KubeApi, ResourceSpec, StatefulSetPatcher, CHARM_CONTAINER,
//! };
//! use std::collections::HashMap;
//!
//! # async fn run() -> Result<(), statefulset_resource_patch::Error> {
//! let mut desired = HashMap::new();
//! desired.insert(
//!     CHARM_CONTAINER.to_string(),
//!     ResourceSpec { memory: Some("1Gi".into()), cpu: Some(CpuValue::Cores(1)) },
//! );
//! desired.insert(
//!     "my-app".to_string(),
//!     ResourceSpec { memory: Some("2Gi".into()), cpu: Some(CpuValue::Quantity("500m".into())) },
//! );
//!
//! let api = KubeApi::try_default().await?;
//! let patcher = StatefulSetPatcher::new(api, Config::new("my-app"), desired);
//! patcher.reconcile().await?;
//! # Ok(())
//! # }
//! ```
//!
//! To drive the patcher from lifecycle events instead of calling it directly, feed a channel of
//! [`LifecycleEvent`]s to a [`PatchRunner`] and spawn it.

mod config;
mod error;
mod events;
#[cfg(test)]
mod events_test;
mod patcher;
mod resources;

pub use config::Config;
pub use error::Error;
pub use events::{LifecycleEvent, PatchRunner};
pub use patcher::{KubeApi, StatefulSetApi, StatefulSetPatcher};
pub use resources::{CpuValue, DesiredResources, ResourceSpec};

/// The reserved name of the sidecar container running the charm itself.
///
/// NOTE WELL: this name is assigned by the orchestrator and must not be changed.
pub const CHARM_CONTAINER: &str = "charm";
