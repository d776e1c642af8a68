//! `spec.md` §3 "Context info".

/// One context as surfaced by `ListContexts`. The bearer-token and
/// in-cluster variants expose exactly one synthetic context named
/// `"in-cluster"`; the kubeconfig variant exposes one per configured
/// context with `current` true for exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    pub name: String,
    pub cluster: String,
    pub user: String,
    pub namespace: String,
    pub current: bool,
}
