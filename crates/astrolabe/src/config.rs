//! Configuration types for Astrolabe editing sessions.
//!
//! This module provides configuration structures that control how an
//! [`EditingSession`](crate::EditingSession) keeps its history and how it
//! treats loaded diagrams. All types implement [`serde::Deserialize`] for
//! flexible loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining history and validation settings.
//! - [`HistoryConfig`] - Controls the undo history capacity.
//! - [`ValidationConfig`] - Controls validation of loaded diagrams.
//!
//! # Example
//!
//! ```
//! # use astrolabe::config::AppConfig;
//! // Use default configuration
//! let config = AppConfig::default();
//! assert_eq!(config.history().capacity(), None);
//! assert!(config.validation().reject_invalid_on_load());
//! ```

use serde::Deserialize;

/// Top-level configuration combining history and validation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// History configuration section.
    #[serde(default)]
    history: HistoryConfig,

    /// Validation configuration section.
    #[serde(default)]
    validation: ValidationConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the specified sections.
    ///
    /// # Arguments
    ///
    /// * `history` - Undo history settings.
    /// * `validation` - Load-time validation settings.
    pub fn new(history: HistoryConfig, validation: ValidationConfig) -> Self {
        Self {
            history,
            validation,
        }
    }

    /// Returns the history configuration.
    pub fn history(&self) -> &HistoryConfig {
        &self.history
    }

    /// Returns the validation configuration.
    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }
}

/// Undo history configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undoable operations; unbounded when absent.
    #[serde(default)]
    capacity: Option<usize>,
}

impl HistoryConfig {
    /// Creates a history configuration with the given capacity.
    pub fn new(capacity: Option<usize>) -> Self {
        Self { capacity }
    }

    /// Returns the maximum number of undoable operations, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

/// Validation configuration for loaded diagrams.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationConfig {
    /// Reject diagrams with structural violations when loading them.
    #[serde(default = "default_reject_invalid_on_load")]
    reject_invalid_on_load: bool,
}

fn default_reject_invalid_on_load() -> bool {
    true
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            reject_invalid_on_load: default_reject_invalid_on_load(),
        }
    }
}

impl ValidationConfig {
    /// Creates a validation configuration.
    pub fn new(reject_invalid_on_load: bool) -> Self {
        Self {
            reject_invalid_on_load,
        }
    }

    /// Returns whether loading fails on a structurally invalid diagram.
    pub fn reject_invalid_on_load(&self) -> bool {
        self.reject_invalid_on_load
    }
}
