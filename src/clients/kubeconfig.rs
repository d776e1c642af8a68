//! Kubeconfig multi-context client variant (`spec.md` §4.H).

use super::client::ClusterClient;
use super::connection::Connection;
use super::context::ContextInfo;
use super::provider::ConnectionProvider;
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub struct KubeconfigProvider {
    contexts: HashMap<String, Arc<Connection>>,
    infos: HashMap<String, ContextInfo>,
    current: RwLock<String>,
}

impl KubeconfigProvider {
    fn new(raw: Kubeconfig, preselected: Option<&str>, timeout: std::time::Duration) -> Result<Self> {
        let current_context = preselected
            .map(str::to_string)
            .or_else(|| raw.current_context.clone())
            .ok_or_else(|| Error::ConfigInvalid("kubeconfig has no current-context and none was selected".into()))?;

        let mut infos = HashMap::new();
        let mut contexts = HashMap::new();
        for named in &raw.contexts {
            let Some(ctx) = &named.context else { continue };
            let cluster = ctx.cluster.clone();
            let user = ctx.user.clone().unwrap_or_default();
            let namespace = ctx.namespace.clone().unwrap_or_else(|| "default".to_string());
            infos.insert(
                named.name.clone(),
                ContextInfo {
                    name: named.name.clone(),
                    cluster,
                    user,
                    namespace,
                    current: named.name == current_context,
                },
            );

            let raw_for_context = raw.clone();
            let context_name = named.name.clone();
            contexts.insert(
                named.name.clone(),
                Arc::new(Connection::new(move || {
                    let raw = raw_for_context.clone();
                    let options = KubeConfigOptions {
                        context: Some(context_name.clone()),
                        cluster: None,
                        user: None,
                    };
                    Box::pin(async move {
                        let mut config = kube::Config::from_custom_kubeconfig(raw, &options)
                            .await
                            .map_err(|e| Error::ConfigInvalid(e.to_string()))?;
                        config.connect_timeout = Some(timeout);
                        config.read_timeout = Some(timeout);
                        config.write_timeout = Some(timeout);
                        Ok(config)
                    })
                })),
            );
        }

        if !infos.contains_key(&current_context) {
            return Err(Error::ConfigInvalid(format!(
                "context '{current_context}' not found in kubeconfig"
            )));
        }

        Ok(Self {
            contexts,
            infos,
            current: RwLock::new(current_context),
        })
    }
}

#[async_trait]
impl ConnectionProvider for KubeconfigProvider {
    async fn connection(&self, kube_context: &str) -> Result<Arc<Connection>> {
        let name = if kube_context.is_empty() {
            self.current.read().unwrap().clone()
        } else {
            kube_context.to_string()
        };
        self.contexts
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::ConfigInvalid(format!("unknown kubeContext '{name}'")))
    }

    fn list_contexts(&self) -> Vec<ContextInfo> {
        let current = self.current.read().unwrap().clone();
        let mut infos: Vec<ContextInfo> = self
            .infos
            .values()
            .cloned()
            .map(|mut info| {
                info.current = info.name == current;
                info
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    fn current_context(&self) -> String {
        self.current.read().unwrap().clone()
    }

    fn switch_context(&self, kube_context: &str) -> Result<()> {
        if !self.infos.contains_key(kube_context) {
            return Err(Error::ConfigInvalid(format!("unknown kubeContext '{kube_context}'")));
        }
        *self.current.write().unwrap() = kube_context.to_string();
        Ok(())
    }
}

/// `spec.md` §4.H "kubeconfig multi-context client".
pub type KubeconfigClient = ClusterClient<KubeconfigProvider>;

impl KubeconfigClient {
    /// Loads a kubeconfig from `config.kubeconfig_path` (tilde-expanded), or
    /// `KUBECONFIG`, or the default search locations, in that order.
    pub fn load(config: &crate::Config) -> Result<Self> {
        let raw = match &config.kubeconfig_path {
            Some(path) => Kubeconfig::read_from(expand_tilde(path)).map_err(|e| Error::ConfigInvalid(e.to_string()))?,
            None => Kubeconfig::read().map_err(|e| Error::ConfigInvalid(e.to_string()))?,
        };
        let provider = KubeconfigProvider::new(raw, config.context.as_deref(), config.timeout)?;
        Ok(ClusterClient::new(provider, config.safety_gate()))
    }
}

fn expand_tilde(path: &str) -> std::path::PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or_else(|| path.into()),
        None => path.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::config::{Context, NamedContext};
    use std::time::Duration;

    fn two_context_kubeconfig() -> Kubeconfig {
        Kubeconfig {
            current_context: Some("dev".to_string()),
            contexts: vec![
                NamedContext {
                    name: "dev".to_string(),
                    context: Some(Context {
                        cluster: "dev-cluster".to_string(),
                        user: Some("dev-user".to_string()),
                        namespace: Some("staging".to_string()),
                        extensions: None,
                    }),
                },
                NamedContext {
                    name: "prod".to_string(),
                    context: Some(Context {
                        cluster: "prod-cluster".to_string(),
                        user: Some("prod-user".to_string()),
                        namespace: None,
                        extensions: None,
                    }),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn preselected_context_overrides_current_context() {
        let provider = KubeconfigProvider::new(two_context_kubeconfig(), Some("prod"), Duration::from_secs(30)).unwrap();
        assert_eq!(provider.current_context(), "prod");
    }

    #[test]
    fn missing_namespace_defaults_to_default() {
        let provider = KubeconfigProvider::new(two_context_kubeconfig(), None, Duration::from_secs(30)).unwrap();
        let prod = provider.list_contexts().into_iter().find(|c| c.name == "prod").unwrap();
        assert_eq!(prod.namespace, "default");
    }

    #[test]
    fn list_contexts_marks_exactly_one_current() {
        let provider = KubeconfigProvider::new(two_context_kubeconfig(), None, Duration::from_secs(30)).unwrap();
        let infos = provider.list_contexts();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos.iter().filter(|c| c.current).count(), 1);
        assert!(infos.iter().find(|c| c.name == "dev").unwrap().current);
    }

    #[test]
    fn switch_context_moves_current_and_rejects_unknown() {
        let provider = KubeconfigProvider::new(two_context_kubeconfig(), None, Duration::from_secs(30)).unwrap();
        provider.switch_context("prod").unwrap();
        assert_eq!(provider.current_context(), "prod");
        assert!(provider.switch_context("nope").is_err());
        assert_eq!(provider.current_context(), "prod");
    }

    #[test]
    fn unknown_preselected_context_is_rejected() {
        assert!(matches!(
            KubeconfigProvider::new(two_context_kubeconfig(), Some("nope"), Duration::from_secs(30)),
            Err(Error::ConfigInvalid(_))
        ));
    }

    #[test]
    fn kubeconfig_with_no_current_context_and_no_preselection_is_rejected() {
        let mut raw = two_context_kubeconfig();
        raw.current_context = None;
        assert!(KubeconfigProvider::new(raw, None, Duration::from_secs(30)).is_err());
    }
}
