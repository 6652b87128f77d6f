//! Use case diagram rules (codes `V5xx`).

use astrolabe_core::{
    Diagram, DiagramType,
    element::{EdgeKind, NodeKind},
    property::{PropertyName, PropertyValue, UseCaseDependencyType},
};

use super::{Validator, Violation, ViolationCode, general_violations};
use crate::policy::DiagramTypeExt;

/// Validator for use case diagrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseCaseValidator;

impl Validator for UseCaseValidator {
    fn violations(&self, diagram: &Diagram) -> Vec<Violation> {
        let mut violations = general_violations(diagram, DiagramType::UseCase.policy());
        let is_use_case = |node| {
            diagram
                .node(node)
                .is_some_and(|node| node.kind() == NodeKind::UseCase)
        };

        for edge in diagram.all_edges() {
            let use_case_edge = matches!(
                edge.kind(),
                EdgeKind::UseCaseAssociation
                    | EdgeKind::UseCaseGeneralization
                    | EdgeKind::UseCaseDependency
            );
            if use_case_edge && edge.start() == edge.end() {
                violations.push(Violation::new(
                    ViolationCode::SelfUseCaseEdge,
                    edge.id(),
                    format!("{} edges cannot connect a node to itself", edge.kind()),
                ));
            }

            let stereotyped = matches!(
                edge.properties().get(PropertyName::UseCaseDependencyType),
                Some(PropertyValue::UseCaseDependency(
                    UseCaseDependencyType::Include | UseCaseDependencyType::Extend
                ))
            );
            if edge.kind() == EdgeKind::UseCaseDependency
                && stereotyped
                && !(is_use_case(edge.start()) && is_use_case(edge.end()))
            {
                violations.push(Violation::new(
                    ViolationCode::DependencyEndpoints,
                    edge.id(),
                    "include and extend dependencies connect two use cases",
                ));
            }
        }

        violations
    }
}
