//! In-cluster service-account client variant (`spec.md` §4.H).

use super::client::ClusterClient;
use super::connection::Connection;
use super::context::ContextInfo;
use super::provider::ConnectionProvider;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

const IN_CLUSTER_CONTEXT: &str = "in-cluster";

pub struct InClusterProvider {
    connection: Arc<Connection>,
    namespace: String,
}

impl InClusterProvider {
    fn new(timeout: std::time::Duration) -> Result<Self> {
        let mut config = kube::Config::incluster().map_err(|e| Error::AuthUnavailable(e.to_string()))?;
        config.connect_timeout = Some(timeout);
        config.read_timeout = Some(timeout);
        config.write_timeout = Some(timeout);
        let namespace = config.default_namespace.clone();
        let connection = Arc::new(Connection::new(move || {
            let config = config.clone();
            Box::pin(async move { Ok(config) })
        }));
        Ok(Self { connection, namespace })
    }
}

#[async_trait]
impl ConnectionProvider for InClusterProvider {
    async fn connection(&self, _kube_context: &str) -> Result<Arc<Connection>> {
        Ok(self.connection.clone())
    }

    fn list_contexts(&self) -> Vec<ContextInfo> {
        vec![ContextInfo {
            name: IN_CLUSTER_CONTEXT.to_string(),
            cluster: IN_CLUSTER_CONTEXT.to_string(),
            user: "system:serviceaccount".to_string(),
            namespace: self.namespace.clone(),
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
                "in-cluster client only has the '{IN_CLUSTER_CONTEXT}' context"
            )))
        }
    }
}

/// `spec.md` §4.H "in-cluster client".
pub type InClusterClient = ClusterClient<InClusterProvider>;

impl InClusterClient {
    /// Validates presence of the service-account token, CA cert, and
    /// namespace files before returning; see `spec.md` §6 "Environment".
    pub fn load(config: &crate::Config) -> Result<Self> {
        let provider = InClusterProvider::new(config.timeout)?;
        Ok(ClusterClient::new(provider, config.safety_gate()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::connection::Connection;

    fn provider(namespace: &str) -> InClusterProvider {
        InClusterProvider {
            connection: Arc::new(Connection::new(|| Box::pin(async { unreachable!("not exercised by these tests") }))),
            namespace: namespace.to_string(),
        }
    }

    #[tokio::test]
    async fn list_contexts_reports_the_single_synthetic_context() {
        let infos = provider("staging").list_contexts();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, IN_CLUSTER_CONTEXT);
        assert_eq!(infos[0].namespace, "staging");
        assert!(infos[0].current);
    }

    #[test]
    fn switch_context_accepts_empty_and_its_own_name_only() {
        let provider = provider("default");
        assert!(provider.switch_context("").is_ok());
        assert!(provider.switch_context(IN_CLUSTER_CONTEXT).is_ok());
        assert!(provider.switch_context("some-other-context").is_err());
    }
}
