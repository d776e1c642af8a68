//! Bearer-token client variant and factory (`spec.md` §4.H, §2 supplemented
//! feature C.4 "`CreateBearerTokenClient` wiring to the `ClientCache`").

use super::client::ClusterClient;
use super::connection::Connection;
use super::context::ContextInfo;
use super::provider::ConnectionProvider;
use crate::cache::ClientCache;
use crate::error::{Error, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

const IN_CLUSTER_CONTEXT: &str = "in-cluster";

pub struct BearerProvider {
    connection: Arc<Connection>,
}

#[async_trait]
impl ConnectionProvider for BearerProvider {
    async fn connection(&self, _kube_context: &str) -> Result<Arc<Connection>> {
        Ok(self.connection.clone())
    }

    fn list_contexts(&self) -> Vec<ContextInfo> {
        vec![ContextInfo {
            name: IN_CLUSTER_CONTEXT.to_string(),
            cluster: IN_CLUSTER_CONTEXT.to_string(),
            user: "oauth-user".to_string(),
            namespace: "default".to_string(),
            current: true,
        }]
    }

    fn current_context(&self) -> String {
        IN_CLUSTER_CONTEXT.to_string()
    }

    fn switch_context(&self, kube_context: &str) -> Result<()> {
        if kube_context.is_empty() || kube_context == IN_CLUSTER_CONTEXT {
            Ok(())
        } else {
            Err(Error::ConfigInvalid(format!(
                "bearer-token client only has the '{IN_CLUSTER_CONTEXT}' context"
            )))
        }
    }
}

/// `spec.md` §4.H "bearer-token client".
pub type BearerTokenClient = ClusterClient<BearerProvider>;

/// Captures cluster host and CA cert once at construction; every call to
/// [`create_bearer_token_client`](Self::create_bearer_token_client) returns
/// a fresh client bound to the given token, whose four connection objects
/// are populated lazily on first use.
pub struct BearerTokenClientFactory {
    cluster_url: http::Uri,
    root_cert: Option<Vec<Vec<u8>>>,
    base: crate::Config,
}

impl BearerTokenClientFactory {
    pub fn new(base: &crate::Config) -> Result<Self> {
        let incluster = kube::Config::incluster().map_err(|e| Error::AuthUnavailable(e.to_string()))?;
        Ok(Self {
            cluster_url: incluster.cluster_url,
            root_cert: incluster.root_cert,
            base: base.clone(),
        })
    }

    pub fn create_bearer_token_client(&self, token: &str) -> Result<Arc<BearerTokenClient>> {
        if token.is_empty() {
            return Err(Error::AuthUnavailable("bearer token is required".into()));
        }
        let cluster_url = self.cluster_url.clone();
        let root_cert = self.root_cert.clone();
        let timeout = self.base.timeout;
        let token = SecretString::from(token.to_string());
        let connection = Arc::new(Connection::new(move || {
            let cluster_url = cluster_url.clone();
            let root_cert = root_cert.clone();
            let token = token.clone();
            Box::pin(async move {
                let mut config = kube::Config::new(cluster_url);
                config.root_cert = root_cert;
                config.auth_info.token = Some(token);
                config.connect_timeout = Some(timeout);
                config.read_timeout = Some(timeout);
                config.write_timeout = Some(timeout);
                Ok(config)
            })
        }));
        Ok(Arc::new(ClusterClient::new(BearerProvider { connection }, self.base.safety_gate())))
    }
}

/// Wraps a [`BearerTokenClientFactory`] with the [`ClientCache`] (`spec.md`
/// §2 control-flow line: "Bearer-Token variant first consults the Client
/// Cache keyed by Token Hasher").
pub struct CachedBearerTokenClientFactory {
    factory: BearerTokenClientFactory,
    cache: ClientCache<Arc<BearerTokenClient>>,
}

impl CachedBearerTokenClientFactory {
    pub fn new(factory: BearerTokenClientFactory) -> Self {
        Self {
            factory,
            cache: ClientCache::new(),
        }
    }

    pub async fn get_or_create(&self, token: &str) -> Result<Arc<BearerTokenClient>> {
        if let Some(client) = self.cache.get(token).await {
            return Ok(client);
        }
        let client = self.factory.create_bearer_token_client(token)?;
        self.cache.set(token, client.clone()).await;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> BearerTokenClientFactory {
        BearerTokenClientFactory {
            cluster_url: http::Uri::from_static("http://cluster.example.internal:6443"),
            root_cert: None,
            base: crate::Config::default(),
        }
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(factory().create_bearer_token_client(""), Err(Error::AuthUnavailable(_))));
    }

    #[tokio::test]
    async fn non_empty_token_builds_a_client() {
        assert!(factory().create_bearer_token_client("tok-123").is_ok());
    }

    #[tokio::test]
    async fn cache_returns_the_same_client_for_the_same_token() {
        let cached = CachedBearerTokenClientFactory::new(factory());
        let a = cached.get_or_create("tok-abc").await.unwrap();
        let b = cached.get_or_create("tok-abc").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn cache_builds_distinct_clients_for_distinct_tokens() {
        let cached = CachedBearerTokenClientFactory::new(factory());
        let a = cached.get_or_create("tok-one").await.unwrap();
        let b = cached.get_or_create("tok-two").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn switch_context_only_accepts_empty_or_in_cluster() {
        let provider = BearerProvider {
            connection: Arc::new(Connection::from_client(crate::clients::test_support::test_client())),
        };
        assert!(provider.switch_context("").is_ok());
        assert!(provider.switch_context(IN_CLUSTER_CONTEXT).is_ok());
        assert!(provider.switch_context("other").is_err());
    }
}
