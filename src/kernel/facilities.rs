//! Cluster Facilities (`spec.md` §4.I): API-resource enumeration with
//! filter+paginate, and the cluster health aggregator.

use crate::error::Result;
use k8s_openapi::api::core::v1::{ComponentStatus, Node};
use kube::api::{Api, ListParams};

use super::Kernel;

#[derive(Debug, Clone)]
pub struct ApiResourceInfo {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
    pub namespaced: bool,
    pub verbs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GetApiResourcesResponse {
    pub items: Vec<ApiResourceInfo>,
    pub total_items: usize,
    pub total_count: usize,
    pub has_more: bool,
    pub next_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
            HealthStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct NodeHealth {
    pub name: String,
    pub ready: bool,
    pub conditions: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ClusterHealth {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
    pub nodes: Vec<NodeHealth>,
}

const CRITICAL_COMPONENTS: &[&str] = &["etcd", "kube-apiserver", "kube-controller-manager", "kube-scheduler"];

impl Kernel {
    /// `spec.md` §4.F "getAPIResources": tolerant enumeration + filter + paginate.
    pub async fn get_api_resources(
        &self,
        api_group: Option<&str>,
        namespaced_only: bool,
        required_verbs: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<GetApiResourcesResponse> {
        let mut all = Vec::new();

        if api_group.is_none_or(|g| g.is_empty()) {
            match self.client().list_core_api_versions().await {
                Ok(versions) => {
                    for version in versions.versions {
                        match self.client().list_core_api_resources(&version).await {
                            Ok(list) => all.extend(list.resources.into_iter().filter(|r| !r.name.contains('/')).map(
                                |r| ApiResourceInfo {
                                    group: String::new(),
                                    version: version.clone(),
                                    kind: r.kind,
                                    name: r.name,
                                    namespaced: r.namespaced,
                                    verbs: r.verbs,
                                },
                            )),
                            Err(error) => tracing::warn!(%version, %error, "getAPIResources: core version skipped"),
                        }
                    }
                }
                Err(error) => tracing::warn!(%error, "getAPIResources: failed to list core api versions"),
            }
        }

        match self.client().list_api_groups().await {
            Ok(groups) => {
                for group in groups.groups {
                    if let Some(filter) = api_group {
                        if !filter.is_empty() && !group.name.eq_ignore_ascii_case(filter) {
                            continue;
                        }
                    }
                    for gv in &group.versions {
                        match self.client().list_api_group_resources(&gv.group_version).await {
                            Ok(list) => all.extend(list.resources.into_iter().filter(|r| !r.name.contains('/')).map(
                                |r| ApiResourceInfo {
                                    group: group.name.clone(),
                                    version: gv.version.clone(),
                                    kind: r.kind,
                                    name: r.name,
                                    namespaced: r.namespaced,
                                    verbs: r.verbs,
                                },
                            )),
                            Err(error) => {
                                tracing::warn!(group = %group.name, version = %gv.version, %error, "getAPIResources: group version skipped")
                            }
                        }
                    }
                }
            }
            Err(error) => tracing::warn!(%error, "getAPIResources: failed to list api groups"),
        }

        let matching: Vec<ApiResourceInfo> = all
            .into_iter()
            .filter(|r| !namespaced_only || r.namespaced)
            .filter(|r| required_verbs.iter().all(|v| r.verbs.iter().any(|rv| rv == v)))
            .collect();

        let total_count = matching.len();
        let page: Vec<ApiResourceInfo> = matching.into_iter().skip(offset).take(limit.max(1)).collect();
        let total_items = page.len();
        let next_offset = offset + total_items;
        let has_more = next_offset < total_count;

        Ok(GetApiResourcesResponse {
            items: page,
            total_items,
            total_count,
            has_more,
            next_offset,
        })
    }

    /// `spec.md` §4.F "getClusterHealth".
    pub async fn get_cluster_health(&self) -> Result<ClusterHealth> {
        if let Err(error) = self.client().apiserver_version().await {
            return Ok(ClusterHealth {
                status: HealthStatus::Unhealthy,
                components: vec![ComponentHealth {
                    name: "kube-apiserver".to_string(),
                    status: HealthStatus::Unhealthy,
                    message: error.to_string(),
                }],
                nodes: Vec::new(),
            });
        }

        let components = match Api::<ComponentStatus>::all(self.client().clone()).list(&ListParams::default()).await {
            Ok(list) => list
                .items
                .into_iter()
                .map(|cs| {
                    let name = cs.metadata.name.clone().unwrap_or_default();
                    let healthy = cs
                        .conditions
                        .as_ref()
                        .map(|conds| conds.iter().any(|c| c.type_ == "Healthy" && c.status == "True"))
                        .unwrap_or(true);
                    let message = cs
                        .conditions
                        .as_ref()
                        .and_then(|conds| conds.first())
                        .and_then(|c| c.message.clone())
                        .unwrap_or_default();
                    ComponentHealth {
                        name,
                        status: if healthy { HealthStatus::Healthy } else { HealthStatus::Unhealthy },
                        message,
                    }
                })
                .collect(),
            Err(error) => {
                tracing::warn!(%error, "getClusterHealth: component statuses unavailable, continuing");
                Vec::new()
            }
        };

        let node_list = Api::<Node>::all(self.client().clone())
            .list(&ListParams::default())
            .await
            .map_err(|e| crate::error::Error::upstream("getClusterHealth nodes", e))?;
        let nodes: Vec<NodeHealth> = node_list
            .items
            .into_iter()
            .map(|n| {
                let name = n.metadata.name.clone().unwrap_or_default();
                let conditions: Vec<(String, String)> = n
                    .status
                    .as_ref()
                    .and_then(|s| s.conditions.clone())
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| (c.type_, c.status))
                    .collect();
                let ready = conditions.iter().any(|(t, s)| t == "Ready" && s == "True");
                NodeHealth { name, ready, conditions }
            })
            .collect();

        let any_critical_unhealthy = components
            .iter()
            .any(|c| CRITICAL_COMPONENTS.contains(&c.name.as_str()) && c.status != HealthStatus::Healthy);
        let any_noncritical_unhealthy = components
            .iter()
            .any(|c| !CRITICAL_COMPONENTS.contains(&c.name.as_str()) && c.status != HealthStatus::Healthy);
        let ready_nodes = nodes.iter().filter(|n| n.ready).count();
        let fewer_than_half_ready = !nodes.is_empty() && ready_nodes * 2 < nodes.len();

        let status = if any_critical_unhealthy {
            HealthStatus::Unhealthy
        } else if fewer_than_half_ready || any_noncritical_unhealthy {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Ok(ClusterHealth { status, components, nodes })
    }
}
