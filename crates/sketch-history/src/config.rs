#![forbid(unsafe_code)]

//! Tunables for the history subsystem.
//!
//! [`HistoryConfig`] can be built in code or loaded from TOML / JSON:
//!
//! ```toml
//! # sketch-history.toml
//! max_depth = 200
//! invariants = "log"
//! group_visibility = "precise"
//! ```
//!
//! ```rust,ignore
//! let config = HistoryConfig::from_toml_file("sketch-history.toml")?;
//! ```
//!
//! Every field has a default, so partial files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// How element-set invariant violations are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantMode {
    /// Panic on the first violation.
    Fatal,
    /// Log the violation at error level and keep going.
    Log,
}

impl Default for InvariantMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Fatal
        } else {
            Self::Log
        }
    }
}

/// How group-id selection changes are judged visible.
///
/// There is no reverse index from group to elements, so `Always` treats any
/// group selection change as visible. `Precise` scans the element map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupVisibility {
    #[default]
    Always,
    Precise,
}

/// Configuration for [`HistoryStack`](crate::history::HistoryStack) and
/// [`Store`](crate::store::Store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of entries kept on the undo stack (oldest evicted).
    pub max_depth: usize,
    /// Handling of invariant violations while building element-set changes.
    pub invariants: InvariantMode,
    /// Visibility heuristic for group selection changes.
    pub group_visibility: GroupVisibility,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: 100,
            invariants: InvariantMode::default(),
            group_visibility: GroupVisibility::default(),
        }
    }
}

impl HistoryConfig {
    /// Create a configuration with a custom depth limit.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Create unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    #[must_use]
    pub fn with_invariants(mut self, mode: InvariantMode) -> Self {
        self.invariants = mode;
        self
    }

    #[must_use]
    pub fn with_group_visibility(mut self, visibility: GroupVisibility) -> Self {
        self.group_visibility = visibility;
        self
    }

    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, HistoryConfigError> {
        let config: Self = toml::from_str(s).map_err(HistoryConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, HistoryConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(HistoryConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, HistoryConfigError> {
        let config: Self = serde_json::from_str(s).map_err(HistoryConfigError::Json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, HistoryConfigError> {
        toml::to_string_pretty(self).map_err(HistoryConfigError::TomlSerialize)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), HistoryConfigError> {
        let mut errors = Vec::new();
        if self.max_depth == 0 {
            errors.push("max_depth must be at least 1".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(HistoryConfigError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a history configuration.
#[derive(Debug)]
pub enum HistoryConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    Toml(toml::de::Error),
    /// TOML serialization error.
    TomlSerialize(toml::ser::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for HistoryConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::TomlSerialize(e) => write!(f, "TOML serialize error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for HistoryConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::TomlSerialize(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
