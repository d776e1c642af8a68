//! Adapter configuration (`spec.md` §6 "Configuration object fields").
//!
//! Every client variant is constructed from one of these; fields not
//! relevant to a given variant are simply ignored by it (e.g. `context` is
//! meaningless to the in-cluster variant).

use std::time::Duration;

const DEFAULT_QPS: f32 = 20.0;
const DEFAULT_BURST: u32 = 30;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration consumed at client construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Kubeconfig variant: explicit path, overrides env `KUBECONFIG`, which
    /// overrides the default search locations.
    pub kubeconfig_path: Option<String>,
    /// Kubeconfig variant: preselected context name.
    pub context: Option<String>,
    /// Force in-cluster service-account validation.
    pub in_cluster: bool,
    pub non_destructive_mode: bool,
    pub dry_run: bool,
    /// Closed allow-list of operation names; empty means "all".
    pub allowed_operations: Vec<String>,
    /// Namespace block-list.
    pub restricted_namespaces: Vec<String>,
    pub qps_limit: f32,
    pub burst_limit: u32,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kubeconfig_path: None,
            context: None,
            in_cluster: false,
            non_destructive_mode: false,
            dry_run: false,
            allowed_operations: Vec::new(),
            restricted_namespaces: Vec::new(),
            qps_limit: DEFAULT_QPS,
            burst_limit: DEFAULT_BURST,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn safety_gate(&self) -> crate::safety::SafetyGate {
        crate::safety::SafetyGate::new(
            self.allowed_operations.clone(),
            self.non_destructive_mode,
            self.dry_run,
            self.restricted_namespaces.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.qps_limit, 20.0);
        assert_eq!(cfg.burst_limit, 30);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert!(!cfg.non_destructive_mode);
        assert!(cfg.allowed_operations.is_empty());
    }
}
