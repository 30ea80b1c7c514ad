//! Queue mode and secondary sink settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which destinations a publish is forwarded to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QueueMode {
    pub use_in_memory: bool,
    pub use_secondary: bool,
    pub enable_hybrid: bool,
}

impl Default for QueueMode {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl QueueMode {
    pub fn in_memory() -> Self {
        Self {
            use_in_memory: true,
            use_secondary: false,
            enable_hybrid: false,
        }
    }

    pub fn secondary_only() -> Self {
        Self {
            use_in_memory: false,
            use_secondary: true,
            enable_hybrid: false,
        }
    }

    pub fn hybrid() -> Self {
        Self {
            use_in_memory: true,
            use_secondary: true,
            enable_hybrid: true,
        }
    }

    pub fn is_hybrid(&self) -> bool {
        self.enable_hybrid && self.use_in_memory && self.use_secondary
    }

    /// Human-readable mode name
    pub fn describe(&self) -> &'static str {
        if self.is_hybrid() {
            "Hybrid (In-Memory + Secondary)"
        } else if self.use_secondary {
            "Secondary Only"
        } else if self.use_in_memory {
            "In-Memory Only"
        } else {
            "Disabled"
        }
    }
}

/// Where the JSON-lines secondary sink writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SecondarySinkSettings {
    pub enabled: bool,
    pub path: Option<PathBuf>,
}

impl SecondarySinkSettings {
    /// An enabled sink needs a non-empty path
    pub fn is_valid(&self) -> bool {
        !self.enabled
            || self
                .path
                .as_ref()
                .is_some_and(|path| !path.as_os_str().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_descriptions() {
        assert_eq!(QueueMode::default().describe(), "In-Memory Only");
        assert_eq!(QueueMode::secondary_only().describe(), "Secondary Only");
        assert_eq!(QueueMode::hybrid().describe(), "Hybrid (In-Memory + Secondary)");

        let off = QueueMode {
            use_in_memory: false,
            use_secondary: false,
            enable_hybrid: true,
        };
        assert_eq!(off.describe(), "Disabled");
    }

    #[test]
    fn test_both_destinations_without_hybrid_flag_reads_as_secondary() {
        let mode = QueueMode {
            use_in_memory: true,
            use_secondary: true,
            enable_hybrid: false,
        };
        assert!(!mode.is_hybrid());
        assert_eq!(mode.describe(), "Secondary Only");
    }

    #[test]
    fn test_mode_deserializes_with_defaults() {
        let mode: QueueMode = toml::from_str("use-secondary = true").unwrap();
        assert!(mode.use_in_memory);
        assert!(mode.use_secondary);
        assert!(!mode.enable_hybrid);
    }

    #[test]
    fn test_sink_settings_validity() {
        assert!(SecondarySinkSettings::default().is_valid());

        let missing_path = SecondarySinkSettings {
            enabled: true,
            path: None,
        };
        assert!(!missing_path.is_valid());

        let empty_path = SecondarySinkSettings {
            enabled: true,
            path: Some(PathBuf::new()),
        };
        assert!(!empty_path.is_valid());

        let ok = SecondarySinkSettings {
            enabled: true,
            path: Some(PathBuf::from("/tmp/messages.jsonl")),
        };
        assert!(ok.is_valid());
    }
}
