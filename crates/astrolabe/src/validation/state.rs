//! State diagram rules (codes `V3xx`).

use astrolabe_core::{
    Diagram, DiagramType,
    element::{EdgeKind, NodeKind},
};

use super::{Validator, Violation, ViolationCode, general_violations};
use crate::policy::DiagramTypeExt;

/// Validator for state diagrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateValidator;

impl Validator for StateValidator {
    fn violations(&self, diagram: &Diagram) -> Vec<Violation> {
        let mut violations = general_violations(diagram, DiagramType::State.policy());
        let kind = |node| diagram.node(node).map(|node| node.kind());

        for edge in diagram
            .all_edges()
            .filter(|edge| edge.kind() == EdgeKind::StateTransition)
        {
            if kind(edge.end()) == Some(NodeKind::InitialState) {
                violations.push(Violation::new(
                    ViolationCode::TransitionIntoInitial,
                    edge.id(),
                    "no transition may enter an initial state",
                ));
            }
            if kind(edge.start()) == Some(NodeKind::FinalState) {
                violations.push(Violation::new(
                    ViolationCode::TransitionOutOfFinal,
                    edge.id(),
                    "no transition may leave a final state",
                ));
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use astrolabe_core::element::{Edge, Node};

    use super::*;

    #[test]
    fn test_pseudo_state_transitions() {
        let mut diagram = Diagram::new(DiagramType::State);
        let initial = diagram
            .add_root_node(Node::new(NodeKind::InitialState))
            .unwrap();
        let running = diagram
            .add_root_node(Node::new(NodeKind::State).with_name("running"))
            .unwrap();
        let done = diagram
            .add_root_node(Node::new(NodeKind::FinalState))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::StateTransition, initial, running))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::StateTransition, running, done))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::StateTransition, running, running))
            .unwrap();
        assert!(StateValidator.is_valid(&diagram));

        diagram
            .add_edge(Edge::new(EdgeKind::StateTransition, done, initial))
            .unwrap();

        let codes: Vec<ViolationCode> = StateValidator
            .violations(&diagram)
            .iter()
            .map(Violation::code)
            .collect();
        assert_eq!(
            codes,
            vec![
                ViolationCode::TransitionIntoInitial,
                ViolationCode::TransitionOutOfFinal
            ]
        );
    }
}
