//! Per-diagram-type policy table.
//!
//! Each [`DiagramType`] maps to one static [`DiagramPolicy`] naming the node
//! and edge kinds the type admits, its [`Validator`] and the factory of its
//! [`StructureInference`] view. Behavior that varies by diagram type is
//! dispatched through this table rather than through the diagram itself.
//!
//! # Example
//!
//! ```
//! use astrolabe::policy::DiagramTypeExt;
//! use astrolabe_core::{DiagramType, element::{EdgeKind, NodeKind}};
//!
//! let policy = DiagramType::Sequence.policy();
//! assert!(policy.allows_node(NodeKind::Call));
//! assert!(policy.allows_edge(EdgeKind::Note));
//! assert!(!policy.allows_edge(EdgeKind::Generalization));
//! ```

use std::fmt;

use astrolabe_core::{
    Diagram, DiagramType,
    element::{EdgeKind, NodeKind},
};

use crate::{
    inference::{self, StructureInference},
    validation::{
        ClassValidator, ObjectValidator, SequenceValidator, StateValidator, UseCaseValidator,
        Validator,
    },
};

type InferenceFactory = for<'a> fn(&'a Diagram) -> Box<dyn StructureInference + 'a>;

/// The fixed rules of one diagram type.
pub struct DiagramPolicy {
    diagram_type: DiagramType,
    node_kinds: &'static [NodeKind],
    edge_kinds: &'static [EdgeKind],
    validator: &'static (dyn Validator + Sync),
    inference: InferenceFactory,
}

impl DiagramPolicy {
    pub fn diagram_type(&self) -> DiagramType {
        self.diagram_type
    }

    /// Returns the node kinds admitted by the diagram type.
    pub fn node_kinds(&self) -> &'static [NodeKind] {
        self.node_kinds
    }

    /// Returns the edge kinds admitted by the diagram type.
    pub fn edge_kinds(&self) -> &'static [EdgeKind] {
        self.edge_kinds
    }

    pub fn allows_node(&self, kind: NodeKind) -> bool {
        self.node_kinds.contains(&kind)
    }

    pub fn allows_edge(&self, kind: EdgeKind) -> bool {
        self.edge_kinds.contains(&kind)
    }

    /// Returns the validator of the diagram type.
    pub fn validator(&self) -> &'static dyn Validator {
        self.validator
    }

    /// Creates the inference view of the diagram type over `diagram`.
    pub fn inference<'a>(&self, diagram: &'a Diagram) -> Box<dyn StructureInference + 'a> {
        (self.inference)(diagram)
    }
}

impl fmt::Debug for DiagramPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramPolicy")
            .field("diagram_type", &self.diagram_type)
            .field("node_kinds", &self.node_kinds)
            .field("edge_kinds", &self.edge_kinds)
            .finish_non_exhaustive()
    }
}

static CLASS: DiagramPolicy = DiagramPolicy {
    diagram_type: DiagramType::Class,
    node_kinds: &[
        NodeKind::Class,
        NodeKind::Interface,
        NodeKind::Package,
        NodeKind::PackageDescription,
        NodeKind::Note,
        NodeKind::Point,
    ],
    edge_kinds: &[
        EdgeKind::Dependency,
        EdgeKind::Generalization,
        EdgeKind::Aggregation,
        EdgeKind::Association,
        EdgeKind::Note,
    ],
    validator: &ClassValidator,
    inference: inference::no_inference,
};

static SEQUENCE: DiagramPolicy = DiagramPolicy {
    diagram_type: DiagramType::Sequence,
    node_kinds: &[
        NodeKind::ImplicitParameter,
        NodeKind::Call,
        NodeKind::Note,
        NodeKind::Point,
    ],
    edge_kinds: &[
        EdgeKind::Call,
        EdgeKind::Return,
        EdgeKind::Constructor,
        EdgeKind::Note,
    ],
    validator: &SequenceValidator,
    inference: inference::sequence_inference,
};

static STATE: DiagramPolicy = DiagramPolicy {
    diagram_type: DiagramType::State,
    node_kinds: &[
        NodeKind::State,
        NodeKind::InitialState,
        NodeKind::FinalState,
        NodeKind::Note,
        NodeKind::Point,
    ],
    edge_kinds: &[EdgeKind::StateTransition, EdgeKind::Note],
    validator: &StateValidator,
    inference: inference::no_inference,
};

static OBJECT: DiagramPolicy = DiagramPolicy {
    diagram_type: DiagramType::Object,
    node_kinds: &[
        NodeKind::Object,
        NodeKind::Field,
        NodeKind::Note,
        NodeKind::Point,
    ],
    edge_kinds: &[
        EdgeKind::ObjectReference,
        EdgeKind::ObjectCollaboration,
        EdgeKind::Note,
    ],
    validator: &ObjectValidator,
    inference: inference::no_inference,
};

static USE_CASE: DiagramPolicy = DiagramPolicy {
    diagram_type: DiagramType::UseCase,
    node_kinds: &[
        NodeKind::Actor,
        NodeKind::UseCase,
        NodeKind::Note,
        NodeKind::Point,
    ],
    edge_kinds: &[
        EdgeKind::UseCaseAssociation,
        EdgeKind::UseCaseGeneralization,
        EdgeKind::UseCaseDependency,
        EdgeKind::Note,
    ],
    validator: &UseCaseValidator,
    inference: inference::no_inference,
};

/// Access to the policy of a diagram type.
pub trait DiagramTypeExt {
    /// Returns the policy table entry of the diagram type.
    fn policy(self) -> &'static DiagramPolicy;
}

impl DiagramTypeExt for DiagramType {
    fn policy(self) -> &'static DiagramPolicy {
        match self {
            DiagramType::Class => &CLASS,
            DiagramType::Sequence => &SEQUENCE,
            DiagramType::State => &STATE,
            DiagramType::Object => &OBJECT,
            DiagramType::UseCase => &USE_CASE,
        }
    }
}
