//! Safety Gate (`spec.md` §4.G): per-operation allow-list, non-destructive
//! mode with a dry-run escape, and a namespace block-list. Pure logic, no I/O.

use crate::error::{Error, Result};

/// Operations the gate reasons about. Mirrors the Resource Operation Kernel's
/// surface (`spec.md` §4.F); `Scale` counts as destructive alongside the
/// other mutating verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    List,
    Describe,
    Create,
    Apply,
    Delete,
    Patch,
    Scale,
    GetLogs,
    Exec,
    PortForward,
    GetAPIResources,
    GetClusterHealth,
}

impl Operation {
    fn is_destructive(self) -> bool {
        matches!(
            self,
            Operation::Delete | Operation::Patch | Operation::Scale | Operation::Create | Operation::Apply
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Describe => "describe",
            Operation::Create => "create",
            Operation::Apply => "apply",
            Operation::Delete => "delete",
            Operation::Patch => "patch",
            Operation::Scale => "scale",
            Operation::GetLogs => "getLogs",
            Operation::Exec => "exec",
            Operation::PortForward => "portForward",
            Operation::GetAPIResources => "getAPIResources",
            Operation::GetClusterHealth => "getClusterHealth",
        }
    }
}

/// Evaluates the two Safety Gate predicates against a configuration.
///
/// Constructed from the adapter `Config`'s `allowed_operations`,
/// `non_destructive_mode`, `dry_run`, and `restricted_namespaces` fields and
/// held by each client variant alongside the resolver and kernel.
#[derive(Debug, Clone, Default)]
pub struct SafetyGate {
    allowed_operations: Vec<String>,
    non_destructive_mode: bool,
    dry_run: bool,
    restricted_namespaces: Vec<String>,
}

impl SafetyGate {
    pub fn new(
        allowed_operations: Vec<String>,
        non_destructive_mode: bool,
        dry_run: bool,
        restricted_namespaces: Vec<String>,
    ) -> Self {
        Self {
            allowed_operations,
            non_destructive_mode,
            dry_run,
            restricted_namespaces,
        }
    }

    /// `isOperationAllowed` (`spec.md` §4.G).
    pub fn check_operation(&self, op: Operation) -> Result<()> {
        if !self.allowed_operations.is_empty() && !self.allowed_operations.iter().any(|a| a == op.name()) {
            return Err(Error::OperationForbidden(format!(
                "operation '{}' is not in the configured allow-list",
                op.name()
            )));
        }
        if self.non_destructive_mode && op.is_destructive() && !self.dry_run {
            return Err(Error::OperationForbidden(format!(
                "operation '{}' is destructive and the client is in non-destructive mode (enable dry-run to permit it)",
                op.name()
            )));
        }
        Ok(())
    }

    /// `isNamespaceRestricted` (`spec.md` §4.G).
    pub fn check_namespace(&self, namespace: &str) -> Result<()> {
        if self.restricted_namespaces.iter().any(|ns| ns == namespace) {
            return Err(Error::NamespaceRestricted(format!(
                "namespace '{namespace}' is on the restricted list"
            )));
        }
        Ok(())
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_permits_everything() {
        let gate = SafetyGate::new(vec![], false, false, vec![]);
        assert!(gate.check_operation(Operation::Delete).is_ok());
    }

    #[test]
    fn allow_list_rejects_unlisted_operation() {
        let gate = SafetyGate::new(vec!["get".into(), "list".into()], false, false, vec![]);
        assert!(gate.check_operation(Operation::Get).is_ok());
        assert!(gate.check_operation(Operation::Delete).is_err());
    }

    #[test]
    fn non_destructive_mode_blocks_destructive_ops_without_dry_run() {
        let gate = SafetyGate::new(vec![], true, false, vec![]);
        assert!(gate.check_operation(Operation::Delete).is_err());
        assert!(gate.check_operation(Operation::Get).is_ok());
    }

    #[test]
    fn non_destructive_mode_with_dry_run_escapes() {
        let gate = SafetyGate::new(vec![], true, true, vec![]);
        assert!(gate.check_operation(Operation::Delete).is_ok());
        assert!(gate.check_operation(Operation::Scale).is_ok());
    }

    #[test]
    fn namespace_block_list_rejects_exact_match_only() {
        let gate = SafetyGate::new(vec![], false, false, vec!["kube-system".into()]);
        assert!(gate.check_namespace("kube-system").is_err());
        assert!(gate.check_namespace("default").is_ok());
    }
}
