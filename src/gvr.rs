//! The resource identifier triple (`spec.md` §3 "Resource identifier").

use std::fmt;

/// Group/Version/Resource triple identifying a Kubernetes-style resource type.
///
/// Group `""` denotes the core group; the alias `"core"` is treated as
/// equivalent everywhere a group is compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gvr {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl Gvr {
    pub fn new(group: impl Into<String>, version: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// `true` if `group` is the core group, accepting `""` and `"core"` as equivalent.
    pub fn is_core_group(group: &str) -> bool {
        group.is_empty() || group.eq_ignore_ascii_case("core")
    }

    /// Compares this GVR's group against a caller-supplied group string under
    /// the core-equivalence rule (`spec.md` §4.C step 2).
    pub fn group_matches(&self, other: &str) -> bool {
        if Self::is_core_group(&self.group) && Self::is_core_group(other) {
            return true;
        }
        self.group.eq_ignore_ascii_case(other)
    }

    pub fn api_version(&self) -> String {
        if Self::is_core_group(&self.group) {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for Gvr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if Self::is_core_group(&self.group) {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_and_empty_group_are_equivalent() {
        let gvr = Gvr::new("", "v1", "pods");
        assert!(gvr.group_matches(""));
        assert!(gvr.group_matches("core"));
        assert!(gvr.group_matches("CORE"));
        assert!(!gvr.group_matches("apps"));
    }
}
