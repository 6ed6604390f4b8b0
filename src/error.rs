//! Error abstractions.

use std::path::PathBuf;

use thiserror::Error;

/// Errors which may surface while reconciling or tearing down the target StatefulSet.
#[derive(Debug, Error)]
pub enum Error {
    /// The Kubernetes API client could not be configured from the runtime environment.
    #[error("error configuring Kubernetes API client: {0}")]
    ClientConfig(#[source] kube::Error),
    /// The namespace file could not be read.
    #[error("error reading namespace from {}: {source}", .path.display())]
    Namespace {
        /// The path of the namespace file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// An error returned by the Kubernetes API.
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),
}

/// Check if the given API error is a not-found response.
pub(crate) fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == http::StatusCode::NOT_FOUND)
}
