//! Recognized configuration options (spec.md §6)
//!
//! The crate has no persisted state and reads no config files itself — this
//! is a plain value the host compiler constructs (typically as part of its
//! own `serde`-derived build configuration) and passes to `Verifier`.

use serde::{Deserialize, Serialize};

/// Governs whether runtime contract checks are emitted at all. Orthogonal to
/// static verification, but recognized by the same front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractMode {
    Off,
    Release,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master switch; when false, the verifier is not invoked at all.
    pub verify: bool,
    /// Per-obligation solver timeout.
    pub timeout_ms: u32,
    pub contract_mode: ContractMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verify: true,
            timeout_ms: 5000,
            contract_mode: ContractMode::Debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec() {
        let cfg = Config::default();
        assert!(cfg.verify);
        assert_eq!(cfg.timeout_ms, 5000);
        assert_eq!(cfg.contract_mode, ContractMode::Debug);
    }

    #[test]
    fn deserializes_from_json_with_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"timeout_ms": 1000}"#).unwrap();
        assert_eq!(cfg.timeout_ms, 1000);
        assert!(cfg.verify);
    }
}
