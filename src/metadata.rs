//! Response Metadata Builder (`spec.md` §4.J): a pure function describing
//! resource scope so callers can tell when a supplied namespace was ignored.

/// `{resourceScope, requestedNamespace, effectiveNamespace, hint}`, embedded
/// in every list/get/delete/patch/scale response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeMetadata {
    pub resource_scope: ResourceScope,
    pub requested_namespace: String,
    pub effective_namespace: String,
    pub hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Cluster,
    Namespaced,
}

/// Builds scope metadata for a single operation (`spec.md` §4.J).
///
/// `requested_ns` is whatever the caller passed in (may be empty);
/// `effective_ns` is what was actually sent to the cluster API.
pub fn build(
    namespaced: bool,
    requested_ns: &str,
    effective_ns: &str,
    resource_type: &str,
    all_namespaces: bool,
) -> ScopeMetadata {
    if !namespaced {
        let hint = if !requested_ns.is_empty() {
            format!("{resource_type} is cluster-scoped; namespace parameter was ignored")
        } else {
            String::new()
        };
        return ScopeMetadata {
            resource_scope: ResourceScope::Cluster,
            requested_namespace: requested_ns.to_string(),
            effective_namespace: String::new(),
            hint,
        };
    }

    if all_namespaces {
        return ScopeMetadata {
            resource_scope: ResourceScope::Namespaced,
            requested_namespace: requested_ns.to_string(),
            effective_namespace: String::new(),
            hint: "Listing across all namespaces".to_string(),
        };
    }

    ScopeMetadata {
        resource_scope: ResourceScope::Namespaced,
        requested_namespace: requested_ns.to_string(),
        effective_namespace: effective_ns.to_string(),
        hint: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_scoped_with_requested_namespace_gets_ignored_hint() {
        let meta = build(false, "team-a", "", "namespaces", false);
        assert_eq!(meta.resource_scope, ResourceScope::Cluster);
        assert_eq!(meta.effective_namespace, "");
        assert!(meta.hint.contains("cluster-scoped"));
    }

    #[test]
    fn cluster_scoped_without_requested_namespace_has_empty_hint() {
        let meta = build(false, "", "", "nodes", false);
        assert_eq!(meta.hint, "");
    }

    #[test]
    fn namespaced_all_namespaces_reports_listing_hint() {
        let meta = build(true, "", "", "pods", true);
        assert_eq!(meta.resource_scope, ResourceScope::Namespaced);
        assert_eq!(meta.effective_namespace, "");
        assert_eq!(meta.hint, "Listing across all namespaces");
    }

    #[test]
    fn namespaced_with_requested_namespace_is_silent() {
        let meta = build(true, "team-a", "team-a", "pods", false);
        assert_eq!(meta.effective_namespace, "team-a");
        assert_eq!(meta.hint, "");
    }

    #[test]
    fn invariant_nonempty_effective_implies_namespaced_and_not_all() {
        let meta = build(true, "team-a", "team-a", "pods", false);
        if !meta.effective_namespace.is_empty() {
            assert_eq!(meta.resource_scope, ResourceScope::Namespaced);
            assert_ne!(meta.hint, "Listing across all namespaces");
        }
    }
}
