//! Per-context connection objects (`spec.md` §4.H, §5 "Shared mutable
//! state"): `(restConfig, typedClient, dynamicClient, discoveryClient)`,
//! each a [`LazyCell`] populated on first use and never invalidated except
//! by process exit. In this crate `typedClient`/`dynamicClient` collapse
//! into a single `kube::Client` (the underlying library's `Api<K>` already
//! serves both typed and dynamic callers), and `discoveryClient` is the
//! [`CachedResolver`].

use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::lazy::LazyCell;
use crate::resolver::CachedResolver;
use kube::Client;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type ConfigFuture = Pin<Box<dyn Future<Output = Result<kube::Config>> + Send>>;

/// One context's lazily-populated connection objects.
pub struct Connection {
    config: LazyCell<kube::Config>,
    client: LazyCell<Client>,
    resolver: LazyCell<Arc<CachedResolver>>,
    kernel: LazyCell<Kernel>,
    build_config: Box<dyn Fn() -> ConfigFuture + Send + Sync>,
}

fn no_config_source() -> ConfigFuture {
    Box::pin(async { Err(Error::ConfigInvalid("connection has no config source".into())) })
}

impl Connection {
    /// A connection whose `restConfig` is built lazily by `build_config` on
    /// first use (the kubeconfig, in-cluster, and bearer-token variants).
    pub(crate) fn new(build_config: impl Fn() -> ConfigFuture + Send + Sync + 'static) -> Self {
        Self {
            config: LazyCell::new(),
            client: LazyCell::new(),
            resolver: LazyCell::new(),
            kernel: LazyCell::new(),
            build_config: Box::new(build_config),
        }
    }

    /// A connection already bound to a live `Client` (the federated
    /// variant's pre-built clients skip the config/client step entirely).
    pub(crate) fn from_client(client: Client) -> Self {
        Self {
            config: LazyCell::new(),
            client: LazyCell::new_set(client),
            resolver: LazyCell::new(),
            kernel: LazyCell::new(),
            build_config: Box::new(no_config_source),
        }
    }

    pub(crate) async fn client(&self) -> Result<Client> {
        if let Some(client) = self.client.peek().await {
            return Ok(client);
        }
        let config = self.config.get_or_try_init(|| (self.build_config)()).await?;
        self.client
            .get_or_try_init(|| async { Client::try_from(config).map_err(|e| Error::ConfigInvalid(e.to_string())) })
            .await
    }

    pub(crate) async fn resolver(&self) -> Result<Arc<CachedResolver>> {
        let client = self.client().await?;
        self.resolver
            .get_or_try_init(|| async move { Ok(Arc::new(CachedResolver::new(client))) })
            .await
    }

    pub(crate) async fn kernel(&self) -> Result<Kernel> {
        let client = self.client().await?;
        self.kernel.get_or_try_init(|| async move { Ok(Kernel::new(client)) }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn from_client_skips_config_construction_entirely() {
        let connection = Connection::from_client(crate::clients::test_support::test_client());
        // build_config is `no_config_source`, which always errors; a client
        // pre-seeded via from_client must never fall back to it.
        assert!(connection.client().await.is_ok());
    }

    #[tokio::test]
    async fn build_config_runs_at_most_once_across_repeated_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let connection = Connection::new(move || {
            let calls = calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(kube::Config::new(http::Uri::from_static("http://localhost:0")))
            })
        });
        connection.client().await.unwrap();
        connection.client().await.unwrap();
        connection.kernel().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_connection_with_no_config_source_fails_to_build_a_client() {
        let connection = Connection::from_client(crate::clients::test_support::test_client());
        // Force a fresh connection whose client LazyCell was never pre-seeded.
        let bare = Connection::new(no_config_source);
        assert!(bare.client().await.is_err());
        // Sanity: the pre-seeded one above is unaffected.
        assert!(connection.client().await.is_ok());
    }
}
