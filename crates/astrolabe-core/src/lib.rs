//! Astrolabe Core Types and Definitions
//!
//! This crate provides the foundational types of the Astrolabe diagram
//! editing engine. It includes:
//!
//! - **Geometry**: Integer points, dimensions and rectangles ([`geometry`] module)
//! - **Identifiers**: Stable node and edge identities ([`identifier::NodeId`], [`identifier::EdgeId`])
//! - **Properties**: Typed property bags with a per-kind schema ([`property::Properties`])
//! - **Elements**: Node and edge kinds and values ([`element`] module)
//! - **Graph**: The diagram element graph ([`graph::Diagram`])

pub mod element;
pub mod geometry;
pub mod graph;
pub mod identifier;
pub mod property;

pub use graph::{Diagram, DiagramType, GraphError};
