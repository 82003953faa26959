//! Device name to nvcc architecture resolution.
//!
//! The rule table is an ordered slice: the first rule with any pattern
//! contained in the upper-cased device name wins. A name carrying tokens of
//! two generations therefore resolves to whichever rule is listed first.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compiler-facing architecture token such as `sm_80`.
///
/// Values produced by [`resolve`] come from [`ARCH_RULES`]; manual overrides
/// are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchitectureId(String);

impl ArchitectureId {
    /// Wrap an operator-supplied token. Surrounding whitespace is dropped.
    pub fn manual(token: &str) -> Self {
        ArchitectureId(token.trim().to_string())
    }

    /// The raw token, e.g. `sm_90`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `-arch=<token>` flag handed to nvcc.
    pub fn nvcc_flag(&self) -> String {
        format!("-arch={}", self.0)
    }
}

impl fmt::Display for ArchitectureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the resolution table.
#[derive(Debug, Clone, Copy)]
pub struct ArchRule {
    /// Upper-case substrings, any of which selects this rule.
    pub patterns: &'static [&'static str],
    /// Architecture token bound to the rule.
    pub architecture: &'static str,
}

impl ArchRule {
    fn matches(&self, upper_name: &str) -> bool {
        self.patterns.iter().any(|p| upper_name.contains(p))
    }
}

/// Resolution rules, newest generation first.
pub const ARCH_RULES: &[ArchRule] = &[
    ArchRule {
        patterns: &["H100", "HOPPER"],
        architecture: "sm_90",
    },
    ArchRule {
        patterns: &["L40", "4090", "4080", "ADA"],
        architecture: "sm_89",
    },
    ArchRule {
        patterns: &["A100"],
        architecture: "sm_80",
    },
    ArchRule {
        patterns: &["3090", "3080", "A10", "A30"],
        architecture: "sm_86",
    },
    ArchRule {
        patterns: &["T4", "2080", "TITAN RTX"],
        architecture: "sm_75",
    },
    ArchRule {
        patterns: &["V100", "TITAN V"],
        architecture: "sm_70",
    },
    ArchRule {
        patterns: &["P100"],
        architecture: "sm_60",
    },
];

/// Resolve a raw device name against [`ARCH_RULES`].
///
/// Returns `None` when no rule matches.
pub fn resolve(device_name: &str) -> Option<ArchitectureId> {
    resolve_with(ARCH_RULES, device_name)
}

/// Resolve against an explicit rule table.
pub fn resolve_with(rules: &[ArchRule], device_name: &str) -> Option<ArchitectureId> {
    let upper = device_name.to_uppercase();
    rules
        .iter()
        .find(|rule| rule.matches(&upper))
        .map(|rule| ArchitectureId(rule.architecture.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arch(name: &str) -> Option<String> {
        resolve(name).map(|a| a.as_str().to_string())
    }

    #[test]
    fn test_resolve_known_devices() {
        assert_eq!(arch("NVIDIA H100 80GB HBM3").as_deref(), Some("sm_90"));
        assert_eq!(arch("NVIDIA GeForce RTX 4090").as_deref(), Some("sm_89"));
        assert_eq!(arch("NVIDIA L40S").as_deref(), Some("sm_89"));
        assert_eq!(arch("NVIDIA A100-SXM4-80GB").as_deref(), Some("sm_80"));
        assert_eq!(arch("NVIDIA GeForce RTX 3080 Ti").as_deref(), Some("sm_86"));
        assert_eq!(arch("NVIDIA A30").as_deref(), Some("sm_86"));
        assert_eq!(arch("Tesla T4").as_deref(), Some("sm_75"));
        assert_eq!(arch("NVIDIA TITAN RTX").as_deref(), Some("sm_75"));
        assert_eq!(arch("Tesla V100-SXM2-16GB").as_deref(), Some("sm_70"));
        assert_eq!(arch("Tesla P100-PCIE-16GB").as_deref(), Some("sm_60"));
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(arch("nvidia a100-pcie-40gb").as_deref(), Some("sm_80"));
        assert_eq!(arch("hopper engineering sample").as_deref(), Some("sm_90"));
    }

    #[test]
    fn test_first_rule_wins() {
        // "A100" (rule 3) also contains "A10" (rule 4).
        assert_eq!(arch("A100").as_deref(), Some("sm_80"));
        // Both an H100 token and a V100 token: rule 1 precedes rule 6.
        assert_eq!(arch("H100 next to V100").as_deref(), Some("sm_90"));
        // 4090 (rule 2) and 3090 (rule 4) in one name.
        assert_eq!(arch("RTX 3090 / RTX 4090 pair").as_deref(), Some("sm_89"));
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        assert!(resolve("GPU-X").is_none());
        assert!(resolve("AMD Radeon RX 7900 XTX").is_none());
        assert!(resolve("").is_none());
    }

    #[test]
    fn test_resolve_with_custom_table_order() {
        let rules = [
            ArchRule {
                patterns: &["X"],
                architecture: "sm_1",
            },
            ArchRule {
                patterns: &["GPU"],
                architecture: "sm_2",
            },
        ];
        assert_eq!(
            resolve_with(&rules, "gpu-x").map(|a| a.to_string()).as_deref(),
            Some("sm_1")
        );
        assert_eq!(
            resolve_with(&rules, "gpu-y").map(|a| a.to_string()).as_deref(),
            Some("sm_2")
        );
    }

    #[test]
    fn test_manual_architecture_is_trimmed() {
        let a = ArchitectureId::manual("  sm_90\n");
        assert_eq!(a.as_str(), "sm_90");
        assert_eq!(a.nvcc_flag(), "-arch=sm_90");
    }
}
