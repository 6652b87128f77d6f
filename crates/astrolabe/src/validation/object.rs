//! Object diagram rules (codes `V4xx`).

use astrolabe_core::{
    Diagram, DiagramType,
    element::{EdgeKind, NodeKind},
};

use super::{Validator, Violation, ViolationCode, general_violations};
use crate::policy::DiagramTypeExt;

/// Validator for object diagrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectValidator;

impl Validator for ObjectValidator {
    fn violations(&self, diagram: &Diagram) -> Vec<Violation> {
        let mut violations = general_violations(diagram, DiagramType::Object.policy());
        let kind = |node| diagram.node(node).map(|node| node.kind());

        for edge in diagram.all_edges() {
            match edge.kind() {
                EdgeKind::ObjectReference
                    if kind(edge.start()) != Some(NodeKind::Field)
                        || kind(edge.end()) != Some(NodeKind::Object) =>
                {
                    violations.push(Violation::new(
                        ViolationCode::ReferenceEndpoints,
                        edge.id(),
                        "reference edges go from a field to an object",
                    ));
                }
                EdgeKind::ObjectCollaboration
                    if kind(edge.start()) != Some(NodeKind::Object)
                        || kind(edge.end()) != Some(NodeKind::Object) =>
                {
                    violations.push(Violation::new(
                        ViolationCode::CollaborationEndpoints,
                        edge.id(),
                        "collaboration edges connect two objects",
                    ));
                }
                _ => {}
            }
        }

        violations
    }
}
