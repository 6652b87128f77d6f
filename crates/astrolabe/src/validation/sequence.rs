//! Sequence diagram rules (codes `V1xx`).
//!
//! Messages connect activations, never lifelines; a return answers the call
//! that activated its start node; a constructor creates its lifeline, so it
//! must reach the first activation on it.

use std::collections::HashSet;

use astrolabe_core::{
    Diagram, DiagramType,
    element::{EdgeKind, NodeKind},
    identifier::NodeId,
};

use super::{Validator, Violation, ViolationCode, general_violations};
use crate::{inference::SequenceInference, policy::DiagramTypeExt};

/// Validator for sequence diagrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceValidator;

impl Validator for SequenceValidator {
    fn violations(&self, diagram: &Diagram) -> Vec<Violation> {
        let mut violations = general_violations(diagram, DiagramType::Sequence.policy());
        let inference = SequenceInference::new(diagram);
        let is_call = |node: NodeId| {
            diagram
                .node(node)
                .is_some_and(|node| node.kind() == NodeKind::Call)
        };

        let mut answered = HashSet::new();
        for edge in diagram.all_edges().filter(|edge| edge.kind().is_message()) {
            if !is_call(edge.start()) || !is_call(edge.end()) {
                violations.push(Violation::new(
                    ViolationCode::MessageEndpoint,
                    edge.id(),
                    format!("{} edges must connect two call nodes", edge.kind()),
                ));
                continue;
            }

            match edge.kind() {
                EdgeKind::Return => {
                    let closes_call = inference.lifeline(edge.start())
                        != inference.lifeline(edge.end())
                        && inference.caller(edge.start()) == Some(edge.end());
                    if !closes_call {
                        violations.push(Violation::new(
                            ViolationCode::UnmatchedReturn,
                            edge.id(),
                            "return edge does not answer the call that activated its start",
                        ));
                    } else if !answered.insert(edge.start()) {
                        violations.push(Violation::new(
                            ViolationCode::DuplicateReturn,
                            edge.id(),
                            "call already has a return edge",
                        ));
                    }
                }
                EdgeKind::Constructor => {
                    let first_on_lifeline = inference
                        .lifeline(edge.end())
                        .and_then(|lifeline| diagram.children(lifeline).first().copied());
                    if first_on_lifeline != Some(edge.end()) {
                        violations.push(Violation::new(
                            ViolationCode::MisplacedConstructor,
                            edge.id(),
                            "constructor edge must end on the first call of its lifeline",
                        ));
                    }
                }
                _ => {}
            }
        }

        for call in diagram.all_nodes().filter(|node| node.kind() == NodeKind::Call) {
            let callers = diagram
                .incoming_edges(call.id())
                .filter(|edge| edge.kind().is_call_flow() && is_call(edge.start()))
                .count();
            if callers > 1 {
                violations.push(Violation::new(
                    ViolationCode::MultipleCallers,
                    call.id(),
                    format!("call node has {callers} callers"),
                ));
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use astrolabe_core::{
        element::{Edge, Node},
        identifier::{EdgeId, ElementId},
    };

    use super::*;

    fn codes(diagram: &Diagram) -> Vec<&'static str> {
        SequenceValidator
            .violations(diagram)
            .iter()
            .map(|v| v.code().as_str())
            .collect()
    }

    fn two_lifelines() -> (Diagram, NodeId, NodeId) {
        let mut diagram = Diagram::new(DiagramType::Sequence);
        let client = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter).with_name("client"))
            .unwrap();
        let platform = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter).with_name("platform"))
            .unwrap();
        (diagram, client, platform)
    }

    #[test]
    fn test_isolated_return_edge_is_invalid() {
        let (mut diagram, client, platform) = two_lifelines();
        assert!(SequenceValidator.is_valid(&diagram));

        diagram
            .add_edge(Edge::new(EdgeKind::Return, client, platform))
            .unwrap();

        assert!(!SequenceValidator.is_valid(&diagram));
        assert_eq!(codes(&diagram), vec!["V104"]);
    }

    #[test]
    fn test_return_must_close_open_call() {
        let (mut diagram, client, platform) = two_lifelines();
        let caller = diagram.add_child(client, Node::new(NodeKind::Call)).unwrap();
        let callee = diagram.add_child(platform, Node::new(NodeKind::Call)).unwrap();
        let stray = diagram.add_child(platform, Node::new(NodeKind::Call)).unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Call, caller, callee))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Return, callee, caller))
            .unwrap();
        assert!(SequenceValidator.is_valid(&diagram));

        let unmatched = diagram
            .add_edge(Edge::new(EdgeKind::Return, stray, caller))
            .unwrap();
        let duplicate = diagram
            .add_edge(Edge::new(EdgeKind::Return, callee, caller))
            .unwrap();

        let violations = SequenceValidator.violations(&diagram);
        let located: Vec<(&str, ElementId)> = violations
            .iter()
            .map(|v| (v.code().as_str(), v.element()))
            .collect();
        assert_eq!(
            located,
            vec![
                ("V101", ElementId::Edge(unmatched)),
                ("V102", ElementId::Edge(duplicate)),
            ]
        );
    }

    #[test]
    fn test_self_return_is_unmatched() {
        let (mut diagram, client, _) = two_lifelines();
        let outer = diagram.add_child(client, Node::new(NodeKind::Call)).unwrap();
        let inner = diagram.add_child(client, Node::new(NodeKind::Call)).unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Call, outer, inner))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Return, inner, outer))
            .unwrap();

        assert_eq!(codes(&diagram), vec!["V101"]);
    }

    #[test]
    fn test_constructor_must_reach_first_call() {
        let (mut diagram, client, platform) = two_lifelines();
        let creator = diagram.add_child(client, Node::new(NodeKind::Call)).unwrap();
        let first = diagram.add_child(platform, Node::new(NodeKind::Call)).unwrap();
        let second = diagram.add_child(platform, Node::new(NodeKind::Call)).unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Constructor, creator, first))
            .unwrap();
        assert!(SequenceValidator.is_valid(&diagram));

        let late: EdgeId = diagram
            .add_edge(Edge::new(EdgeKind::Constructor, creator, second))
            .unwrap();

        let violations = SequenceValidator.violations(&diagram);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code(), ViolationCode::MisplacedConstructor);
        assert_eq!(violations[0].element(), ElementId::Edge(late));
    }

    #[test]
    fn test_multiple_callers() {
        let (mut diagram, client, platform) = two_lifelines();
        let a = diagram.add_child(client, Node::new(NodeKind::Call)).unwrap();
        let b = diagram.add_child(client, Node::new(NodeKind::Call)).unwrap();
        let target = diagram.add_child(platform, Node::new(NodeKind::Call)).unwrap();
        diagram.add_edge(Edge::new(EdgeKind::Call, a, target)).unwrap();
        diagram.add_edge(Edge::new(EdgeKind::Call, b, target)).unwrap();

        assert_eq!(codes(&diagram), vec!["V105"]);
    }
}
