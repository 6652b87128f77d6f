//! Structural inference over diagrams.
//!
//! Some structure of a diagram is never stored but derived from its edges:
//! in sequence diagrams, which activation called which, how deeply a call is
//! nested on its own lifeline, and whether a call exists only to carry one
//! message. This module defines the [`StructureInference`] view that answers
//! those questions, and its implementations:
//!
//! - [`SequenceInference`] for sequence diagrams;
//! - [`NoInference`] for every other diagram type, which has no derived
//!   structure.
//!
//! Inference views borrow the diagram and never mutate it; create a fresh
//! view after every change.

mod sequence;

pub use sequence::SequenceInference;

use astrolabe_core::{
    Diagram,
    identifier::{EdgeId, NodeId},
};

/// Derived structural queries over a diagram.
pub trait StructureInference {
    /// Returns the call node that activated `call`, if any.
    fn caller(&self, call: NodeId) -> Option<NodeId>;

    /// Returns how many consecutive callers of `call` sit on its own lifeline.
    fn nesting_depth(&self, call: NodeId) -> usize;

    /// Returns the start node of `edge` when that node exists only to emit
    /// the flow along `edge`, and should be deleted with it.
    fn start_node_if_exclusive(&self, edge: EdgeId) -> Option<NodeId>;
}

/// The inference view of diagram types without derived structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInference;

impl StructureInference for NoInference {
    fn caller(&self, _call: NodeId) -> Option<NodeId> {
        None
    }

    fn nesting_depth(&self, _call: NodeId) -> usize {
        0
    }

    fn start_node_if_exclusive(&self, _edge: EdgeId) -> Option<NodeId> {
        None
    }
}

pub(crate) fn no_inference(_diagram: &Diagram) -> Box<dyn StructureInference + '_> {
    Box::new(NoInference)
}

pub(crate) fn sequence_inference(diagram: &Diagram) -> Box<dyn StructureInference + '_> {
    Box::new(SequenceInference::new(diagram))
}
