//! Static resource-type table (`spec.md` §4.B) and cluster-scope registry
//! (`spec.md` §4.K).
//!
//! The table enumerates the Kubernetes-standard resources across the
//! `core`, `apps`, `batch`, `networking.k8s.io` and `rbac.authorization.k8s.io`
//! groups, plus their common aliases. It is built once and never mutated;
//! lookups are case-insensitive.

use crate::gvr::Gvr;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

struct Entry {
    group: &'static str,
    version: &'static str,
    resource: &'static str,
    namespaced: bool,
}

/// `(names, group, version, resource, namespaced)` — `names` is every
/// plural/singular/short-alias string that should resolve to this entry.
const BUILTINS: &[(&[&str], &str, &str, &str, bool)] = &[
    (&["pods", "pod", "po"], "", "v1", "pods", true),
    (&["services", "service", "svc"], "", "v1", "services", true),
    (&["configmaps", "configmap", "cm"], "", "v1", "configmaps", true),
    (&["secrets", "secret"], "", "v1", "secrets", true),
    (
        &["persistentvolumeclaims", "persistentvolumeclaim", "pvc"],
        "",
        "v1",
        "persistentvolumeclaims",
        true,
    ),
    (&["serviceaccounts", "serviceaccount", "sa"], "", "v1", "serviceaccounts", true),
    (&["endpoints", "endpoint", "ep"], "", "v1", "endpoints", true),
    (&["events", "event", "ev"], "", "v1", "events", true),
    (
        &["replicationcontrollers", "replicationcontroller", "rc"],
        "",
        "v1",
        "replicationcontrollers",
        true,
    ),
    (&["namespaces", "namespace", "ns"], "", "v1", "namespaces", false),
    (&["nodes", "node", "no"], "", "v1", "nodes", false),
    (
        &["persistentvolumes", "persistentvolume", "pv"],
        "",
        "v1",
        "persistentvolumes",
        false,
    ),
    (
        &["componentstatuses", "componentstatus", "cs"],
        "",
        "v1",
        "componentstatuses",
        false,
    ),
    (&["deployments", "deployment", "deploy"], "apps", "v1", "deployments", true),
    (&["replicasets", "replicaset", "rs"], "apps", "v1", "replicasets", true),
    (&["daemonsets", "daemonset", "ds"], "apps", "v1", "daemonsets", true),
    (&["statefulsets", "statefulset", "sts"], "apps", "v1", "statefulsets", true),
    (&["jobs", "job"], "batch", "v1", "jobs", true),
    (&["cronjobs", "cronjob", "cj"], "batch", "v1", "cronjobs", true),
    (&["ingresses", "ingress", "ing"], "networking.k8s.io", "v1", "ingresses", true),
    (
        &["networkpolicies", "networkpolicy", "netpol"],
        "networking.k8s.io",
        "v1",
        "networkpolicies",
        true,
    ),
    (&["roles", "role"], "rbac.authorization.k8s.io", "v1", "roles", true),
    (
        &["rolebindings", "rolebinding"],
        "rbac.authorization.k8s.io",
        "v1",
        "rolebindings",
        true,
    ),
    (
        &["clusterroles", "clusterrole"],
        "rbac.authorization.k8s.io",
        "v1",
        "clusterroles",
        false,
    ),
    (
        &["clusterrolebindings", "clusterrolebinding"],
        "rbac.authorization.k8s.io",
        "v1",
        "clusterrolebindings",
        false,
    ),
    (
        &["podsecuritypolicies", "podsecuritypolicy", "psp"],
        "policy",
        "v1beta1",
        "podsecuritypolicies",
        false,
    ),
    (
        &["priorityclasses", "priorityclass", "pc"],
        "scheduling.k8s.io",
        "v1",
        "priorityclasses",
        false,
    ),
    (&["storageclasses", "storageclass", "sc"], "storage.k8s.io", "v1", "storageclasses", false),
    (
        &["customresourcedefinitions", "customresourcedefinition", "crd", "crds"],
        "apiextensions.k8s.io",
        "v1",
        "customresourcedefinitions",
        false,
    ),
    (
        &["certificatesigningrequests", "certificatesigningrequest", "csr"],
        "certificates.k8s.io",
        "v1",
        "certificatesigningrequests",
        false,
    ),
];

struct Table {
    by_name: HashMap<&'static str, Entry>,
    cluster_scoped: HashSet<&'static str>,
    known: HashSet<&'static str>,
}

fn build() -> Table {
    let mut by_name = HashMap::new();
    let mut cluster_scoped = HashSet::new();
    let mut known = HashSet::new();
    for (names, group, version, resource, namespaced) in BUILTINS {
        for name in *names {
            by_name.insert(
                *name,
                Entry {
                    group,
                    version,
                    resource,
                    namespaced: *namespaced,
                },
            );
            known.insert(*name);
            if !namespaced {
                cluster_scoped.insert(*name);
            }
        }
    }
    Table {
        by_name,
        cluster_scoped,
        known,
    }
}

fn table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(build)
}

/// Looks up a lowercased built-in alias, returning its GVR and namespaced bit.
pub fn lookup(lowercased_name: &str) -> Option<(Gvr, bool)> {
    table().by_name.get(lowercased_name).map(|e| {
        (Gvr::new(e.group, e.version, e.resource), e.namespaced)
    })
}

/// The authoritative predicate for built-in cluster-scoped resource names.
/// Unknown (e.g. CRD) names return `false`.
pub fn is_builtin_cluster_scoped(lowercased_name: &str) -> bool {
    table().cluster_scoped.contains(lowercased_name)
}

/// Reports whether `lowercased_name` appears in the built-in table at all
/// (cluster-scoped or namespaced), for callers that want to defer to
/// server-side validation only for genuinely unknown (e.g. CRD) names.
pub fn is_known_resource(lowercased_name: &str) -> bool {
    table().known.contains(lowercased_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_short_aliases() {
        let (gvr, namespaced) = lookup("sts").expect("sts is builtin");
        assert_eq!(gvr, Gvr::new("apps", "v1", "statefulsets"));
        assert!(namespaced);
    }

    #[test]
    fn cluster_scoped_set_is_authoritative() {
        assert!(is_builtin_cluster_scoped("clusterroles"));
        assert!(is_builtin_cluster_scoped("ns"));
        assert!(!is_builtin_cluster_scoped("pods"));
        // case sensitivity is the caller's job (lowercase before calling)
        assert!(!is_builtin_cluster_scoped("NS"));
    }

    #[test]
    fn unknown_resource_is_not_cluster_scoped_but_is_unknown() {
        assert!(!is_builtin_cluster_scoped("widgets"));
        assert!(!is_known_resource("widgets"));
        assert!(is_known_resource("pods"));
    }

    #[test]
    fn lookup_is_case_sensitive_caller_must_lowercase() {
        assert!(lookup("PODS").is_none());
        assert!(lookup("pods").is_some());
    }
}
