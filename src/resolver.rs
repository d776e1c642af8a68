//! Resource-Type Resolver (`spec.md` §4.C): built-in fast path plus a
//! tolerant, bounded-timeout discovery fallback.

use crate::error::{Error, Result};
use crate::gvr::Gvr;
use crate::resource_table;
use kube::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Parsed form of the `apiGroupHint` string (`spec.md` §4.C step 1):
/// `""`, `"group"`, or `"group/version"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupHint {
    Any,
    Group(String),
    GroupVersion(String, String),
}

impl GroupHint {
    pub fn parse(hint: &str) -> Self {
        if hint.is_empty() {
            return GroupHint::Any;
        }
        match hint.split_once('/') {
            Some((group, version)) => GroupHint::GroupVersion(group.to_string(), version.to_string()),
            None => GroupHint::Group(hint.to_string()),
        }
    }

    fn allows_group(&self, group: &str) -> bool {
        let hinted = match self {
            GroupHint::Any => return true,
            GroupHint::Group(g) | GroupHint::GroupVersion(g, _) => g,
        };
        (Gvr::is_core_group(hinted) && Gvr::is_core_group(group)) || hinted.eq_ignore_ascii_case(group)
    }

    fn allows_version(&self, version: &str) -> bool {
        match self {
            GroupHint::GroupVersion(_, v) => v == version,
            _ => true,
        }
    }

    fn matches_gvr(&self, gvr: &Gvr) -> bool {
        match self {
            GroupHint::Any => true,
            GroupHint::Group(g) => gvr.group_matches(g),
            GroupHint::GroupVersion(g, v) => gvr.group_matches(g) && gvr.version == *v,
        }
    }
}

/// Resolves `(resourceType, apiGroupHint)` to `(GVR, namespaced)`: a static
/// fast path, falling back to cluster discovery bounded by a hard 30s
/// timeout. A single discovery API-group failure does not abort the
/// resolution; it is logged and the remaining groups are still tried.
pub struct Resolver {
    client: Client,
}

impl Resolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn resolve(&self, resource_type: &str, api_group_hint: &str) -> Result<(Gvr, bool)> {
        let lname = resource_type.to_lowercase();
        let hint = GroupHint::parse(api_group_hint);

        if let Some((gvr, namespaced)) = resource_table::lookup(&lname) {
            if hint.matches_gvr(&gvr) {
                return Ok((gvr, namespaced));
            }
        }

        match tokio::time::timeout(DISCOVERY_TIMEOUT, self.discover(&lname, &hint)).await {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(Error::UnknownResource(resource_type.to_string())),
            Err(_) => Err(Error::DiscoveryTimeout(DISCOVERY_TIMEOUT)),
        }
    }

    async fn discover(&self, lname: &str, hint: &GroupHint) -> Option<(Gvr, bool)> {
        if hint.allows_group("") {
            match self.client.list_core_api_versions().await {
                Ok(versions) => {
                    for version in versions.versions {
                        if !hint.allows_version(&version) {
                            continue;
                        }
                        match self.client.list_core_api_resources(&version).await {
                            Ok(list) => {
                                if let Some(found) = match_resource(&list.resources, lname, "", &version) {
                                    return Some(found);
                                }
                            }
                            Err(error) => {
                                tracing::warn!(%version, %error, "core discovery failed for version, skipping")
                            }
                        }
                    }
                }
                Err(error) => tracing::warn!(%error, "failed to list core api versions, skipping core group"),
            }
        }

        match self.client.list_api_groups().await {
            Ok(groups) => {
                for group in groups.groups {
                    if !hint.allows_group(&group.name) {
                        continue;
                    }
                    let mut versions: Vec<String> = group.versions.iter().map(|v| v.version.clone()).collect();
                    if let Some(preferred) = &group.preferred_version {
                        versions.retain(|v| v != &preferred.version);
                        versions.insert(0, preferred.version.clone());
                    }
                    for version in versions {
                        if !hint.allows_version(&version) {
                            continue;
                        }
                        let group_version = format!("{}/{}", group.name, version);
                        match self.client.list_api_group_resources(&group_version).await {
                            Ok(list) => {
                                if let Some(found) = match_resource(&list.resources, lname, &group.name, &version) {
                                    return Some(found);
                                }
                            }
                            Err(error) => {
                                tracing::warn!(group = %group.name, %version, %error, "group discovery failed, skipping")
                            }
                        }
                    }
                }
                None
            }
            Err(error) => {
                tracing::warn!(%error, "failed to list api groups");
                None
            }
        }
    }
}

fn match_resource(
    resources: &[k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource],
    lname: &str,
    group: &str,
    version: &str,
) -> Option<(Gvr, bool)> {
    for res in resources {
        if res.name.contains('/') {
            continue; // subresource, e.g. "pods/log"
        }
        let matches = res.name.eq_ignore_ascii_case(lname)
            || res.singular_name.eq_ignore_ascii_case(lname)
            || res
                .short_names
                .as_ref()
                .is_some_and(|names| names.iter().any(|n| n.eq_ignore_ascii_case(lname)));
        if matches {
            let resource_group = res.group.as_deref().unwrap_or(group);
            let resource_version = res.version.as_deref().unwrap_or(version);
            return Some((Gvr::new(resource_group, resource_version, res.name.clone()), res.namespaced));
        }
    }
    None
}

/// Thin per-variant cache wrapper around a [`Resolver`] (`spec.md` §9,
/// supplemented feature C.3). Each per-context [`Connection`](crate::clients)
/// owns its own `CachedResolver`, so a kubeconfig `SwitchContext` already
/// lands on a distinct, never-populated cache without any explicit
/// invalidation; [`invalidate`](Self::invalidate) exists for embedders that
/// need to force a refresh of a still-current context (e.g. after external
/// reconfiguration).
pub struct CachedResolver {
    resolver: Resolver,
    cache: RwLock<HashMap<(String, String), (Gvr, bool)>>,
}

impl CachedResolver {
    pub fn new(client: Client) -> Self {
        Self {
            resolver: Resolver::new(client),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, resource_type: &str, api_group_hint: &str) -> Result<(Gvr, bool)> {
        let key = (resource_type.to_lowercase(), api_group_hint.to_string());
        if let Some(found) = self.cache.read().await.get(&key) {
            return Ok(found.clone());
        }
        let found = self.resolver.resolve(resource_type, api_group_hint).await?;
        self.cache.write().await.insert(key, found.clone());
        Ok(found)
    }

    pub async fn invalidate(&self) {
        self.cache.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_hint_parses_grammar() {
        assert_eq!(GroupHint::parse(""), GroupHint::Any);
        assert_eq!(GroupHint::parse("apps"), GroupHint::Group("apps".to_string()));
        assert_eq!(
            GroupHint::parse("apps/v1"),
            GroupHint::GroupVersion("apps".to_string(), "v1".to_string())
        );
    }

    #[test]
    fn hint_allows_core_group_equivalence() {
        let hint = GroupHint::parse("core");
        assert!(hint.allows_group(""));
        assert!(hint.allows_group("core"));
        assert!(!hint.allows_group("apps"));
    }

    #[test]
    fn builtin_cluster_scoped_resolution_has_false_namespaced_bit() {
        let gvr = Gvr::new("", "v1", "namespaces");
        assert!(resource_table::is_builtin_cluster_scoped("namespaces"));
        let (resolved, namespaced) = resource_table::lookup("namespaces").unwrap();
        assert_eq!(resolved, gvr);
        assert!(!namespaced);
    }
}
