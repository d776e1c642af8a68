//! Client Variants (`spec.md` §4.H): kubeconfig multi-context, in-cluster,
//! bearer-token, and federated, each built by composing the Safety Gate,
//! Resolver, and Kernel with a different [`provider::ConnectionProvider`]
//! (REDESIGN FLAG "Variant polymorphism").

mod client;
mod connection;
mod context;
mod provider;

pub mod bearer;
pub mod federated;
pub mod in_cluster;
pub mod kubeconfig;

pub use bearer::{BearerTokenClient, BearerTokenClientFactory, CachedBearerTokenClientFactory};
pub use client::ClusterClient;
pub use context::ContextInfo;
pub use federated::FederatedClient;
pub use in_cluster::InClusterClient;
pub use kubeconfig::KubeconfigClient;

/// Builds `kube::Client`s against a never-dialled local address, for tests
/// that need a real client handle but must never make a network call.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Once;

    static INSTALL_CRYPTO_PROVIDER: Once = Once::new();

    pub(crate) fn test_client() -> kube::Client {
        INSTALL_CRYPTO_PROVIDER.call_once(|| {
            let _ = rustls::crypto::ring::default_provider().install_default();
        });
        let config = kube::Config::new(http::Uri::from_static("http://localhost:0"));
        kube::Client::try_from(config).unwrap()
    }
}
