//! Structural validation of diagrams.
//!
//! Validators check the diagram-type rules the graph itself does not enforce:
//! which element kinds a diagram type admits, how note edges attach, and the
//! semantic rules of each diagram type. Validation is advisory: a diagram
//! with violations stays editable, and validators are pure and can be re-run
//! at any time.
//!
//! # Overview
//!
//! - [`Validator`] - The validation trait, one implementation per diagram type.
//! - [`Violation`] - One broken rule, with a stable [`ViolationCode`] and the
//!   offending element.
//!
//! Every validator applies the general rules (codes `V0xx`) and then its own
//! diagram-type rules.

mod class;
mod object;
mod sequence;
mod state;
mod use_case;

pub use class::ClassValidator;
pub use object::ObjectValidator;
pub use sequence::SequenceValidator;
pub use state::StateValidator;
pub use use_case::UseCaseValidator;

use std::fmt;

use astrolabe_core::{
    Diagram,
    element::{EdgeKind, NodeKind},
    identifier::{ElementId, NodeId},
};

use crate::policy::DiagramPolicy;

/// Stable identifiers of validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViolationCode {
    /// V001: node kind not legal for the diagram type.
    IllegalNodeKind,
    /// V002: edge kind not legal for the diagram type.
    IllegalEdgeKind,
    /// V003: note edge must start at a note node.
    NoteEdgeStart,
    /// V004: non-note edge touches a note node.
    NoteTouchedByEdge,
    /// V005: point node used other than as the end of a note edge.
    MisplacedPoint,
    /// V006: child-only node kind found as a root.
    OrphanChild,
    /// V101: return edge does not close an open call.
    UnmatchedReturn,
    /// V102: more than one return for the same call.
    DuplicateReturn,
    /// V103: constructor edge does not end on the first call of its lifeline.
    MisplacedConstructor,
    /// V104: message endpoint is not a call node.
    MessageEndpoint,
    /// V105: call node with more than one caller.
    MultipleCallers,
    /// V201: generalization from a node to itself.
    SelfGeneralization,
    /// V202: generalization or aggregation touching a package description.
    PackageDescriptionRelation,
    /// V301: transition into an initial state.
    TransitionIntoInitial,
    /// V302: transition out of a final state.
    TransitionOutOfFinal,
    /// V401: reference edge must go from a field to an object.
    ReferenceEndpoints,
    /// V402: collaboration edge must connect two objects.
    CollaborationEndpoints,
    /// V501: use-case edge from a node to itself.
    SelfUseCaseEdge,
    /// V502: include or extend dependency between non-use-case nodes.
    DependencyEndpoints,
}

impl ViolationCode {
    /// Returns the stable code string, such as `V101`.
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationCode::IllegalNodeKind => "V001",
            ViolationCode::IllegalEdgeKind => "V002",
            ViolationCode::NoteEdgeStart => "V003",
            ViolationCode::NoteTouchedByEdge => "V004",
            ViolationCode::MisplacedPoint => "V005",
            ViolationCode::OrphanChild => "V006",
            ViolationCode::UnmatchedReturn => "V101",
            ViolationCode::DuplicateReturn => "V102",
            ViolationCode::MisplacedConstructor => "V103",
            ViolationCode::MessageEndpoint => "V104",
            ViolationCode::MultipleCallers => "V105",
            ViolationCode::SelfGeneralization => "V201",
            ViolationCode::PackageDescriptionRelation => "V202",
            ViolationCode::TransitionIntoInitial => "V301",
            ViolationCode::TransitionOutOfFinal => "V302",
            ViolationCode::ReferenceEndpoints => "V401",
            ViolationCode::CollaborationEndpoints => "V402",
            ViolationCode::SelfUseCaseEdge => "V501",
            ViolationCode::DependencyEndpoints => "V502",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broken structural rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    code: ViolationCode,
    message: String,
    element: ElementId,
}

impl Violation {
    /// Creates a violation of `code` located at `element`.
    pub fn new(code: ViolationCode, element: impl Into<ElementId>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            element: element.into(),
        }
    }

    pub fn code(&self) -> ViolationCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending element.
    pub fn element(&self) -> ElementId {
        self.element
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.code, self.element, self.message)
    }
}

/// A structural validator for one diagram type.
pub trait Validator {
    /// Returns every violation found in `diagram`, general rules first.
    fn violations(&self, diagram: &Diagram) -> Vec<Violation>;

    /// Checks whether `diagram` has no violation.
    fn is_valid(&self, diagram: &Diagram) -> bool {
        self.violations(diagram).is_empty()
    }
}

fn kind_of(diagram: &Diagram, node: NodeId) -> Option<NodeKind> {
    diagram.node(node).map(|node| node.kind())
}

/// Applies the rules shared by every diagram type.
pub(crate) fn general_violations(diagram: &Diagram, policy: &DiagramPolicy) -> Vec<Violation> {
    let mut violations = Vec::new();

    for node in diagram.all_nodes() {
        if !policy.allows_node(node.kind()) {
            violations.push(Violation::new(
                ViolationCode::IllegalNodeKind,
                node.id(),
                format!("{} nodes are not allowed in a {}", node.kind(), policy.diagram_type()),
            ));
        }
    }
    for root in diagram.root_nodes() {
        if let Some(kind) = kind_of(diagram, *root).filter(|kind| kind.is_child_only()) {
            violations.push(Violation::new(
                ViolationCode::OrphanChild,
                *root,
                format!("{kind} nodes must have a parent"),
            ));
        }
    }

    for edge in diagram.all_edges() {
        if !policy.allows_edge(edge.kind()) {
            violations.push(Violation::new(
                ViolationCode::IllegalEdgeKind,
                edge.id(),
                format!("{} edges are not allowed in a {}", edge.kind(), policy.diagram_type()),
            ));
        }

        let start = kind_of(diagram, edge.start());
        let end = kind_of(diagram, edge.end());
        if edge.kind() == EdgeKind::Note {
            if start != Some(NodeKind::Note) {
                violations.push(Violation::new(
                    ViolationCode::NoteEdgeStart,
                    edge.id(),
                    "note edges must start at a note",
                ));
            }
        } else {
            if start == Some(NodeKind::Note) || end == Some(NodeKind::Note) {
                violations.push(Violation::new(
                    ViolationCode::NoteTouchedByEdge,
                    edge.id(),
                    format!("{} edges cannot connect notes", edge.kind()),
                ));
            }
            if start == Some(NodeKind::Point) || end == Some(NodeKind::Point) {
                violations.push(Violation::new(
                    ViolationCode::MisplacedPoint,
                    edge.id(),
                    "point nodes may only anchor the end of a note edge",
                ));
            }
        }
        if edge.kind() == EdgeKind::Note && start == Some(NodeKind::Point) {
            violations.push(Violation::new(
                ViolationCode::MisplacedPoint,
                edge.id(),
                "point nodes may only anchor the end of a note edge",
            ));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use astrolabe_core::{
        DiagramType,
        element::{Edge, Node},
    };

    use super::*;
    use crate::policy::DiagramTypeExt;

    fn codes(violations: &[Violation]) -> Vec<&'static str> {
        violations.iter().map(|v| v.code().as_str()).collect()
    }

    #[test]
    fn test_illegal_kinds() {
        let mut diagram = Diagram::new(DiagramType::State);
        let state = diagram.add_root_node(Node::new(NodeKind::State)).unwrap();
        let class = diagram.add_root_node(Node::new(NodeKind::Class)).unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Dependency, state, class))
            .unwrap();

        let violations = general_violations(&diagram, DiagramType::State.policy());

        assert_eq!(codes(&violations), vec!["V001", "V002"]);
        assert_eq!(violations[0].element(), ElementId::Node(class));
    }

    #[test]
    fn test_note_edge_rules() {
        let mut diagram = Diagram::new(DiagramType::Class);
        let note = diagram.add_root_node(Node::new(NodeKind::Note)).unwrap();
        let class = diagram.add_root_node(Node::new(NodeKind::Class)).unwrap();
        let point = diagram.add_root_node(Node::new(NodeKind::Point)).unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Note, note, point))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Note, note, class))
            .unwrap();
        assert!(general_violations(&diagram, DiagramType::Class.policy()).is_empty());

        let backwards = diagram
            .add_edge(Edge::new(EdgeKind::Note, class, note))
            .unwrap();
        let dependency = diagram
            .add_edge(Edge::new(EdgeKind::Dependency, class, note))
            .unwrap();
        let to_point = diagram
            .add_edge(Edge::new(EdgeKind::Association, class, point))
            .unwrap();

        let violations = general_violations(&diagram, DiagramType::Class.policy());

        assert_eq!(codes(&violations), vec!["V003", "V004", "V005"]);
        assert_eq!(violations[0].element(), ElementId::Edge(backwards));
        assert_eq!(violations[1].element(), ElementId::Edge(dependency));
        assert_eq!(violations[2].element(), ElementId::Edge(to_point));
    }

    #[test]
    fn test_child_only_root() {
        let mut diagram = Diagram::new(DiagramType::Sequence);
        let call = diagram.add_root_node(Node::new(NodeKind::Call)).unwrap();

        let violations = general_violations(&diagram, DiagramType::Sequence.policy());

        assert_eq!(codes(&violations), vec!["V006"]);
        assert_eq!(violations[0].element(), ElementId::Node(call));
        assert_eq!(
            violations[0].to_string(),
            format!("V006 [{call}] Call nodes must have a parent")
        );
    }
}
