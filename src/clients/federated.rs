//! Federated single-cluster client variant (`spec.md` §4.H): wraps
//! pre-built clients rather than constructing its own.

use super::client::ClusterClient;
use super::connection::Connection;
use super::context::ContextInfo;
use super::provider::ConnectionProvider;
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::Client;
use std::sync::Arc;

pub struct FederatedProvider {
    connection: Arc<Connection>,
    cluster_name: String,
}

#[async_trait]
impl ConnectionProvider for FederatedProvider {
    async fn connection(&self, _kube_context: &str) -> Result<Arc<Connection>> {
        Ok(self.connection.clone())
    }

    fn list_contexts(&self) -> Vec<ContextInfo> {
        vec![ContextInfo {
            name: self.cluster_name.clone(),
            cluster: self.cluster_name.clone(),
            user: String::new(),
            namespace: "default".to_string(),
            current: true,
        }]
    }

    fn current_context(&self) -> String {
        self.cluster_name.clone()
    }

    fn switch_context(&self, _kube_context: &str) -> Result<()> {
        Err(Error::ConfigInvalid(format!(
            "federated client is permanently bound to cluster '{}'",
            self.cluster_name
        )))
    }
}

/// `spec.md` §4.H "federated client".
pub type FederatedClient = ClusterClient<FederatedProvider>;

impl FederatedClient {
    /// Wraps an already-constructed `Client` bound to `cluster_name`.
    pub fn from_client(client: Client, cluster_name: impl Into<String>, config: &crate::Config) -> Self {
        let provider = FederatedProvider {
            connection: Arc::new(Connection::from_client(client)),
            cluster_name: cluster_name.into(),
        };
        ClusterClient::new(provider, config.safety_gate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> FederatedProvider {
        FederatedProvider {
            connection: Arc::new(Connection::from_client(crate::clients::test_support::test_client())),
            cluster_name: "eu-west".to_string(),
        }
    }

    #[tokio::test]
    async fn list_contexts_reports_the_bound_cluster_as_current() {
        let provider = provider();
        let infos = provider.list_contexts();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "eu-west");
        assert!(infos[0].current);
    }

    #[tokio::test]
    async fn current_context_is_the_cluster_name() {
        assert_eq!(provider().current_context(), "eu-west");
    }

    #[tokio::test]
    async fn switch_context_always_fails() {
        assert!(provider().switch_context("anything").is_err());
    }
}
