//! Error kinds returned by this crate.
//!
//! Mirrors the split `kube` itself uses: one `Error` enum, one `Result`
//! alias, every variant carries a human-readable message and never a raw
//! token, header, or password.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the adapter, independent of the underlying cluster
/// protocol library's own [`kube::Error`].
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration rejected at client construction time.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// In-cluster service-account validation failed, or a bearer token was empty.
    #[error("authentication unavailable: {0}")]
    AuthUnavailable(String),

    /// The Safety Gate rejected the operation.
    #[error("operation forbidden: {0}")]
    OperationForbidden(String),

    /// The Safety Gate rejected the target namespace.
    #[error("namespace restricted: {0}")]
    NamespaceRestricted(String),

    /// The Resource-Type Resolver could not match the requested resource type.
    #[error("unknown resource type: {0}")]
    UnknownResource(String),

    /// Discovery did not complete within its bounded timeout.
    #[error("discovery timed out after {0:?}")]
    DiscoveryTimeout(std::time::Duration),

    /// `scale` was invoked against a resource type that has no scale subresource.
    #[error("resource type is not scalable: {0}")]
    NotScalable(String),

    /// The cluster API returned an error for an otherwise well-formed request.
    #[error("{context}: {source}")]
    UpstreamError {
        /// Human description naming the operation, resource type, and name.
        context: String,
        #[source]
        source: kube::Error,
    },

    /// An exec or port-forward session was cancelled or broke mid-stream.
    #[error("session terminated: {0}")]
    SessionTerminated(String),
}

impl Error {
    pub(crate) fn upstream(context: impl Into<String>, source: kube::Error) -> Self {
        Error::UpstreamError {
            context: context.into(),
            source,
        }
    }
}
