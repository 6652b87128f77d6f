//! Class diagram rules (codes `V2xx`).

use astrolabe_core::{
    Diagram, DiagramType,
    element::{EdgeKind, NodeKind},
};

use super::{Validator, Violation, ViolationCode, general_violations};
use crate::policy::DiagramTypeExt;

/// Validator for class diagrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassValidator;

impl Validator for ClassValidator {
    fn violations(&self, diagram: &Diagram) -> Vec<Violation> {
        let mut violations = general_violations(diagram, DiagramType::Class.policy());
        let is_description = |node| {
            diagram
                .node(node)
                .is_some_and(|node| node.kind() == NodeKind::PackageDescription)
        };

        for edge in diagram.all_edges() {
            if edge.kind() == EdgeKind::Generalization && edge.start() == edge.end() {
                violations.push(Violation::new(
                    ViolationCode::SelfGeneralization,
                    edge.id(),
                    "a type cannot generalize itself",
                ));
            }
            if matches!(edge.kind(), EdgeKind::Generalization | EdgeKind::Aggregation)
                && (is_description(edge.start()) || is_description(edge.end()))
            {
                violations.push(Violation::new(
                    ViolationCode::PackageDescriptionRelation,
                    edge.id(),
                    format!("{} edges cannot connect package descriptions", edge.kind()),
                ));
            }
        }

        violations
    }
}
