//! Error types for Astrolabe operations.
//!
//! This module provides the main error type [`AstrolabeError`] which wraps
//! the error conditions of every layer, and [`DeserializationError`] for
//! structurally inconsistent serialized diagrams.

use std::io;

use thiserror::Error;

use astrolabe_core::{DiagramType, GraphError};

use crate::validation::Violation;

/// Errors raised while decoding a serialized diagram.
///
/// Local ids are the dense node numbers of the serialized form, not runtime
/// identities.
#[derive(Debug, Error)]
pub enum DeserializationError {
    /// Malformed JSON, or JSON without the shape of an encoded diagram.
    #[error("malformed diagram: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node id {0} is defined twice")]
    DuplicateId(u64),

    #[error("reference to undefined node id {0}")]
    DanglingReference(u64),

    #[error("node id {0} is listed as the child of more than one node")]
    MultipleParents(u64),

    #[error("node id {0} is part of a parent cycle")]
    Cycle(u64),

    #[error("invalid property `{name}`: {reason}")]
    Property { name: String, reason: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("diagram has {} structural violation(s)", .0.len())]
    Invalid(Vec<Violation>),
}

/// The main error type for Astrolabe operations.
#[derive(Debug, Error)]
pub enum AstrolabeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] DeserializationError),

    #[error("{kind} elements are not supported in a {diagram_type}")]
    UnsupportedKind {
        diagram_type: DiagramType,
        kind: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AstrolabeError {
    /// Create a new `UnsupportedKind` error.
    pub fn unsupported_kind(diagram_type: DiagramType, kind: impl ToString) -> Self {
        Self::UnsupportedKind {
            diagram_type,
            kind: kind.to_string(),
        }
    }
}
