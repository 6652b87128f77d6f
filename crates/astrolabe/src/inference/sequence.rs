//! Structural inference for sequence diagrams.
//!
//! A sequence diagram stores lifelines ([`NodeKind::ImplicitParameter`]),
//! their activations ([`NodeKind::Call`] children) and the messages between
//! activations. Which activation called which is not stored: it is read off
//! the call and constructor edges every time it is needed.
//!
//! All walks along caller chains keep a visited set, so a malformed diagram
//! with a calling cycle yields a finite answer instead of looping.

use std::collections::HashSet;

use log::trace;

use astrolabe_core::{
    Diagram,
    element::{Edge, EdgeKind, NodeKind},
    identifier::{EdgeId, NodeId},
};

use super::StructureInference;

/// Derived call structure of a sequence diagram.
///
/// # Examples
///
/// ```
/// use astrolabe::inference::SequenceInference;
/// use astrolabe_core::{
///     Diagram, DiagramType,
///     element::{Edge, EdgeKind, Node, NodeKind},
/// };
///
/// let mut diagram = Diagram::new(DiagramType::Sequence);
/// let client = diagram.add_root_node(Node::new(NodeKind::ImplicitParameter)).unwrap();
/// let server = diagram.add_root_node(Node::new(NodeKind::ImplicitParameter)).unwrap();
/// let entry = diagram.add_child(client, Node::new(NodeKind::Call)).unwrap();
/// let handler = diagram.add_child(server, Node::new(NodeKind::Call)).unwrap();
/// diagram.add_edge(Edge::new(EdgeKind::Call, entry, handler)).unwrap();
///
/// let inference = SequenceInference::new(&diagram);
/// assert_eq!(inference.caller(handler), Some(entry));
/// assert!(inference.has_entry_point());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SequenceInference<'a> {
    diagram: &'a Diagram,
}

impl<'a> SequenceInference<'a> {
    /// Creates an inference view over `diagram`.
    pub fn new(diagram: &'a Diagram) -> Self {
        Self { diagram }
    }

    fn is_call(&self, node: NodeId) -> bool {
        self.diagram
            .node(node)
            .is_some_and(|node| node.kind() == NodeKind::Call)
    }

    /// Returns the lifeline owning a call node.
    pub fn lifeline(&self, call: NodeId) -> Option<NodeId> {
        let parent = self.diagram.parent(call)?;
        let kind = self.diagram.node(parent)?.kind();
        (kind == NodeKind::ImplicitParameter).then_some(parent)
    }

    /// Returns the lifeline a message ends on: the owner of the end call node,
    /// or the end node itself when the message targets a lifeline directly.
    fn target_lifeline(&self, node: NodeId) -> Option<NodeId> {
        match self.diagram.node(node)?.kind() {
            NodeKind::Call => self.lifeline(node),
            NodeKind::ImplicitParameter => Some(node),
            _ => None,
        }
    }

    /// Returns the first call or constructor edge ending at `call` and
    /// starting at a call node.
    fn activating_edge(&self, call: NodeId) -> Option<&'a Edge> {
        self.diagram
            .incoming_edges(call)
            .find(|edge| edge.kind().is_call_flow() && self.is_call(edge.start()))
    }

    /// Returns the call node that activated `call`: the start of the first
    /// call or constructor edge into it.
    pub fn caller(&self, call: NodeId) -> Option<NodeId> {
        self.activating_edge(call).map(Edge::start)
    }

    /// Returns the call nodes activated by `call`, in edge order.
    pub fn callees(&self, call: NodeId) -> Vec<NodeId> {
        self.diagram
            .outgoing_edges(call)
            .filter(|edge| edge.kind().is_call_flow() && self.is_call(edge.end()))
            .map(Edge::end)
            .collect()
    }

    /// Returns the number of consecutive callers of `call` that sit on the
    /// same lifeline as `call`.
    ///
    /// A call from another lifeline has depth 0; a self-call has depth 1; a
    /// self-call made from a self-call has depth 2, and so on.
    pub fn nesting_depth(&self, call: NodeId) -> usize {
        let Some(lifeline) = self.lifeline(call) else {
            return 0;
        };

        let mut depth = 0;
        let mut visited = HashSet::from([call]);
        let mut current = call;
        while let Some(caller) = self.caller(current) {
            if self.lifeline(caller) != Some(lifeline) || !visited.insert(caller) {
                break;
            }
            depth += 1;
            current = caller;
        }

        trace!(call:% = call, depth = depth; "Computed nesting depth");
        depth
    }

    /// Returns the call nodes that have no caller, in diagram order.
    pub fn entry_points(&self) -> Vec<NodeId> {
        self.diagram
            .all_nodes()
            .filter(|node| node.kind() == NodeKind::Call)
            .map(|node| node.id())
            .filter(|call| self.caller(*call).is_none())
            .collect()
    }

    /// Checks whether exactly one call node has no caller.
    pub fn has_entry_point(&self) -> bool {
        self.entry_points().len() == 1
    }

    /// Returns the start node of a call or constructor edge when that node
    /// exists only to emit flows towards the edge's target lifeline.
    ///
    /// The start call node `S` of `edge` is exclusive when every other call
    /// or constructor edge leaving `S` ends on the same lifeline as `edge`,
    /// and no constructor edge along the caller chain of `S` is itself
    /// exclusive. Note edges and edges not starting at a call node never
    /// have an exclusive start.
    pub fn start_node_if_exclusive(&self, edge: EdgeId) -> Option<NodeId> {
        let mut visited = HashSet::new();
        self.exclusive_start(edge, &mut visited)
    }

    /// `visited` holds the constructor edges already under examination, so
    /// a constructor cycle counts as not exclusive.
    fn exclusive_start(&self, edge: EdgeId, visited: &mut HashSet<EdgeId>) -> Option<NodeId> {
        if !visited.insert(edge) {
            return None;
        }
        let edge = self.diagram.edge(edge)?;
        if !edge.kind().is_call_flow() || !self.is_call(edge.start()) {
            return None;
        }
        let start = edge.start();

        let target = self.target_lifeline(edge.end());
        let other_targets_elsewhere = self
            .diagram
            .outgoing_edges(start)
            .filter(|other| other.id() != edge.id() && other.kind().is_call_flow())
            .any(|other| self.target_lifeline(other.end()) != target);
        if other_targets_elsewhere {
            return None;
        }

        let mut chain = HashSet::from([start]);
        let mut current = start;
        while let Some(activating) = self.activating_edge(current) {
            if activating.kind() == EdgeKind::Constructor
                && self.exclusive_start(activating.id(), visited).is_some()
            {
                return None;
            }
            current = activating.start();
            if !chain.insert(current) {
                break;
            }
        }

        trace!(edge:% = edge.id(), start:% = start; "Found exclusive start node");
        Some(start)
    }
}

impl StructureInference for SequenceInference<'_> {
    fn caller(&self, call: NodeId) -> Option<NodeId> {
        SequenceInference::caller(self, call)
    }

    fn nesting_depth(&self, call: NodeId) -> usize {
        SequenceInference::nesting_depth(self, call)
    }

    fn start_node_if_exclusive(&self, edge: EdgeId) -> Option<NodeId> {
        SequenceInference::start_node_if_exclusive(self, edge)
    }
}

#[cfg(test)]
mod tests {
    use astrolabe_core::{DiagramType, element::Node};

    use super::*;

    struct Sample {
        diagram: Diagram,
        p2: NodeId,
        p3: NodeId,
        calls: [NodeId; 5],
        constructor: EdgeId,
    }

    /// Three lifelines: p1 {call1}, p2 {call2, call3}, p3 {call4, call5}.
    /// call1 constructs call2, call2 returns to call1, call2 calls call3
    /// (a self-call) and call5, call3 calls call4.
    fn sample() -> Sample {
        let mut diagram = Diagram::new(DiagramType::Sequence);
        let p1 = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter))
            .unwrap();
        let p2 = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter))
            .unwrap();
        let p3 = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter))
            .unwrap();
        let call1 = diagram.add_child(p1, Node::new(NodeKind::Call)).unwrap();
        let call2 = diagram.add_child(p2, Node::new(NodeKind::Call)).unwrap();
        let call3 = diagram.add_child(p2, Node::new(NodeKind::Call)).unwrap();
        let call4 = diagram.add_child(p3, Node::new(NodeKind::Call)).unwrap();
        let call5 = diagram.add_child(p3, Node::new(NodeKind::Call)).unwrap();
        let constructor = diagram
            .add_edge(Edge::new(EdgeKind::Constructor, call1, call2))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Return, call2, call1))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Call, call2, call3))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Call, call3, call4))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Call, call2, call5))
            .unwrap();
        Sample {
            diagram,
            p2,
            p3,
            calls: [call1, call2, call3, call4, call5],
            constructor,
        }
    }

    #[test]
    fn test_nesting_depth() {
        let sample = sample();
        let inference = SequenceInference::new(&sample.diagram);

        let depths: Vec<usize> = sample
            .calls
            .iter()
            .map(|call| inference.nesting_depth(*call))
            .collect();

        assert_eq!(depths, vec![0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_nesting_depth_of_chained_self_calls() {
        let mut diagram = Diagram::new(DiagramType::Sequence);
        let lifeline = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter))
            .unwrap();
        let outer = diagram.add_child(lifeline, Node::new(NodeKind::Call)).unwrap();
        let middle = diagram.add_child(lifeline, Node::new(NodeKind::Call)).unwrap();
        let inner = diagram.add_child(lifeline, Node::new(NodeKind::Call)).unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Call, outer, middle))
            .unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Call, middle, inner))
            .unwrap();

        let inference = SequenceInference::new(&diagram);

        assert_eq!(inference.nesting_depth(outer), 0);
        assert_eq!(inference.nesting_depth(middle), 1);
        assert_eq!(inference.nesting_depth(inner), 2);
    }

    #[test]
    fn test_nesting_depth_terminates_on_cycle() {
        let mut diagram = Diagram::new(DiagramType::Sequence);
        let lifeline = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter))
            .unwrap();
        let a = diagram.add_child(lifeline, Node::new(NodeKind::Call)).unwrap();
        let b = diagram.add_child(lifeline, Node::new(NodeKind::Call)).unwrap();
        diagram.add_edge(Edge::new(EdgeKind::Call, a, b)).unwrap();
        diagram.add_edge(Edge::new(EdgeKind::Call, b, a)).unwrap();

        let inference = SequenceInference::new(&diagram);

        assert_eq!(inference.nesting_depth(a), 1);
        assert_eq!(inference.nesting_depth(b), 1);
        assert!(inference.entry_points().is_empty());
    }

    #[test]
    fn test_caller_resolution() {
        let sample = sample();
        let [call1, call2, call3, call4, call5] = sample.calls;
        let inference = SequenceInference::new(&sample.diagram);

        assert_eq!(inference.caller(call1), None);
        assert_eq!(inference.caller(call2), Some(call1));
        assert_eq!(inference.caller(call3), Some(call2));
        assert_eq!(inference.caller(call4), Some(call3));
        assert_eq!(inference.caller(call5), Some(call2));
        assert_eq!(inference.callees(call2), vec![call3, call5]);
        assert_eq!(inference.lifeline(call4), Some(sample.p3));
    }

    #[test]
    fn test_has_entry_point() {
        let empty = Diagram::new(DiagramType::Sequence);
        assert!(!SequenceInference::new(&empty).has_entry_point());

        let sample = sample();
        let inference = SequenceInference::new(&sample.diagram);
        assert!(inference.has_entry_point());
        assert_eq!(inference.entry_points(), vec![sample.calls[0]]);
    }

    #[test]
    fn test_exclusive_start_without_other_flows() {
        let sample = sample();
        let inference = SequenceInference::new(&sample.diagram);

        assert_eq!(
            inference.start_node_if_exclusive(sample.constructor),
            Some(sample.calls[0])
        );
    }

    #[test]
    fn test_exclusive_start_with_other_flow_to_same_lifeline() {
        let mut sample = sample();
        let extra = sample
            .diagram
            .add_child(sample.p2, Node::new(NodeKind::Call))
            .unwrap();
        sample
            .diagram
            .add_edge(Edge::new(EdgeKind::Call, sample.calls[0], extra))
            .unwrap();

        let inference = SequenceInference::new(&sample.diagram);

        assert_eq!(
            inference.start_node_if_exclusive(sample.constructor),
            Some(sample.calls[0])
        );
    }

    #[test]
    fn test_no_exclusive_start_with_flow_to_other_lifeline() {
        let mut sample = sample();
        let extra = sample
            .diagram
            .add_child(sample.p3, Node::new(NodeKind::Call))
            .unwrap();
        sample
            .diagram
            .add_edge(Edge::new(EdgeKind::Call, sample.calls[0], extra))
            .unwrap();

        let inference = SequenceInference::new(&sample.diagram);

        assert_eq!(inference.start_node_if_exclusive(sample.constructor), None);
    }

    #[test]
    fn test_no_exclusive_start_for_nested_constructor() {
        let mut sample = sample();
        let parameter = sample
            .diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter))
            .unwrap();
        let created = sample
            .diagram
            .add_child(parameter, Node::new(NodeKind::Call))
            .unwrap();
        let nested = sample
            .diagram
            .add_edge(Edge::new(EdgeKind::Constructor, sample.calls[1], created))
            .unwrap();

        let inference = SequenceInference::new(&sample.diagram);

        assert_eq!(inference.start_node_if_exclusive(nested), None);
    }

    #[test]
    fn test_no_exclusive_start_under_exclusive_constructor() {
        let mut diagram = Diagram::new(DiagramType::Sequence);
        let p1 = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter))
            .unwrap();
        let p2 = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter))
            .unwrap();
        let p3 = diagram
            .add_root_node(Node::new(NodeKind::ImplicitParameter))
            .unwrap();
        let creator = diagram.add_child(p1, Node::new(NodeKind::Call)).unwrap();
        let constructed = diagram.add_child(p2, Node::new(NodeKind::Call)).unwrap();
        let target = diagram.add_child(p3, Node::new(NodeKind::Call)).unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Constructor, creator, constructed))
            .unwrap();
        let call = diagram
            .add_edge(Edge::new(EdgeKind::Call, constructed, target))
            .unwrap();

        let inference = SequenceInference::new(&diagram);

        assert_eq!(inference.start_node_if_exclusive(call), None);
    }

    #[test]
    fn test_no_exclusive_start_for_note_edge() {
        let mut sample = sample();
        let note = sample
            .diagram
            .add_root_node(Node::new(NodeKind::Note))
            .unwrap();
        let note_edge = sample
            .diagram
            .add_edge(Edge::new(EdgeKind::Note, sample.calls[0], note))
            .unwrap();

        let inference = SequenceInference::new(&sample.diagram);

        assert_eq!(inference.start_node_if_exclusive(note_edge), None);
    }

    #[test]
    fn test_trait_object_answers_like_view() {
        let sample = sample();
        let view: Box<dyn StructureInference + '_> =
            Box::new(SequenceInference::new(&sample.diagram));

        assert_eq!(view.caller(sample.calls[2]), Some(sample.calls[1]));
        assert_eq!(view.nesting_depth(sample.calls[2]), 1);
    }
}
