//! Desired container resource specs and drift detection.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use k8s_openapi::api::core::v1::{Container, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};

/// Desired resource specs keyed by container name.
///
/// Containers of the target StatefulSet which are absent from this mapping are left untouched.
pub type DesiredResources = HashMap<String, ResourceSpec>;

/// A CPU quantity, supplied either as a whole number of cores or as a quantity string.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CpuValue {
    /// A whole number of cores, e.g. `2`.
    Cores(u64),
    /// A Kubernetes quantity string, e.g. `"500m"`.
    Quantity(String),
}

impl fmt::Display for CpuValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuValue::Cores(cores) => write!(f, "{}", cores),
            CpuValue::Quantity(quantity) => write!(f, "{}", quantity),
        }
    }
}

impl From<u64> for CpuValue {
    fn from(cores: u64) -> Self {
        CpuValue::Cores(cores)
    }
}

impl From<&str> for CpuValue {
    fn from(quantity: &str) -> Self {
        CpuValue::Quantity(quantity.to_string())
    }
}

/// The desired memory/cpu values for a single container.
///
/// Whenever this spec is written to a container, limits and requests are set to the identical
/// value for each present key. Keys which are absent are neither written nor checked for drift.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ResourceSpec {
    /// The desired memory quantity, e.g. `"1Gi"`.
    #[serde(default)]
    pub memory: Option<String>,
    /// The desired cpu quantity.
    #[serde(default)]
    pub cpu: Option<CpuValue>,
}

impl ResourceSpec {
    /// Build the resource requirements to be written for a container under this spec.
    ///
    /// Limits and requests are identical maps. A spec with neither key present yields empty
    /// limits/requests, which is a caller error risk; see [`Self::is_satisfied_by`].
    pub fn to_requirements(&self) -> ResourceRequirements {
        let mut resources = BTreeMap::new();
        if let Some(memory) = self.memory.as_ref() {
            resources.insert("memory".to_string(), Quantity(memory.clone()));
        }
        if let Some(cpu) = self.cpu.as_ref() {
            resources.insert("cpu".to_string(), Quantity(cpu.to_string()));
        }
        ResourceRequirements {
            limits: Some(resources.clone()),
            requests: Some(resources),
        }
    }

    /// Check if the given container's current resource state already matches this spec.
    ///
    /// For each key present in the spec, the container's current limit AND request must both
    /// equal the desired value. Keys absent from the spec are not checked, so drift on
    /// unspecified keys is ignored. An empty spec is never considered satisfied, which preserves
    /// the behavior of always rewriting empty limits/requests for such a container.
    pub fn is_satisfied_by(&self, container: &Container) -> bool {
        if self.memory.is_none() && self.cpu.is_none() {
            return false;
        }
        let limits = container.resources.as_ref().and_then(|res| res.limits.as_ref());
        let requests = container.resources.as_ref().and_then(|res| res.requests.as_ref());
        if let Some(memory) = self.memory.as_deref() {
            if !has_quantity(limits, "memory", memory) || !has_quantity(requests, "memory", memory) {
                return false;
            }
        }
        if let Some(cpu) = self.cpu.as_ref() {
            let cpu = cpu.to_string();
            if !has_quantity(limits, "cpu", &cpu) || !has_quantity(requests, "cpu", &cpu) {
                return false;
            }
        }
        true
    }
}

/// Check if the given resource map holds the expected quantity under the given key.
fn has_quantity(map: Option<&BTreeMap<String, Quantity>>, key: &str, expected: &str) -> bool {
    map.and_then(|map| map.get(key))
        .map(|quantity| quantity.0 == expected)
        .unwrap_or(false)
}
