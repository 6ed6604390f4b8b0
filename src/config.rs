//! Runtime configuration.

use std::path::PathBuf;

use crate::error::Error;

/// The standard in-cluster mount location of the service account's namespace file.
const DEFAULT_NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Identity of the target StatefulSet along with the source of its namespace.
///
/// Captured once at construction and immutable thereafter. The namespace itself is deliberately
/// not part of this struct: it is resolved from the namespace file on every call.
#[derive(Clone, Debug)]
pub struct Config {
    /// The name of the target StatefulSet.
    ///
    /// The orchestrator names the StatefulSet after the owning application, so this is typically
    /// the application name.
    pub statefulset: String,
    /// The path of the file exposing the operating namespace as UTF-8 text.
    pub namespace_file: PathBuf,
}

impl Config {
    /// Create a new config targeting the StatefulSet of the named application.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            statefulset: app_name.into(),
            namespace_file: PathBuf::from(DEFAULT_NAMESPACE_FILE),
        }
    }

    /// Override the path of the namespace file.
    pub fn with_namespace_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.namespace_file = path.into();
        self
    }

    /// Resolve the operating namespace.
    ///
    /// The namespace file is read on every call, never cached. A read failure is fatal to the
    /// current invocation as there is no fallback namespace.
    pub fn namespace(&self) -> Result<String, Error> {
        std::fs::read_to_string(&self.namespace_file)
            .map(|raw| raw.trim().to_string())
            .map_err(|err| Error::Namespace { path: self.namespace_file.clone(), source: err })
    }
}
