//! Reversible diagram operations.
//!
//! Every change to a diagram is expressed as an [`Operation`]. An operation
//! knows how to apply itself and how to revert itself; whatever it needs to
//! revert (a removed subtree, the index an edge sat at, a previous property
//! value) is captured while it executes. Operations are recorded by the
//! [`OperationProcessor`] for undo and redo.
//!
//! A [`Operation::Composite`] groups operations into a single history entry.
//! Its execution is all-or-nothing: when a child fails, the children already
//! applied are reverted before the error is returned.

mod processor;

pub use processor::OperationProcessor;

use std::fmt;

use log::warn;

use astrolabe_core::{
    Diagram, GraphError,
    element::{Edge, Node},
    geometry::Point,
    graph::{NodeRemoval, NodeTree, Placement},
    identifier::{EdgeId, ElementId, NodeId},
    property::{PropertyName, PropertyValue},
};

/// A reversible change to a diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Attach a node (with any detached descendants) at `placement`.
    AddNode {
        node: NodeId,
        placement: Placement,
        detached: Option<NodeTree>,
    },
    /// Remove a node with its descendants and touching edges.
    RemoveNode {
        node: NodeId,
        removal: Option<NodeRemoval>,
    },
    /// Insert an edge, at `index` when known, else at the end.
    AddEdge {
        edge: EdgeId,
        index: Option<usize>,
        detached: Option<Edge>,
    },
    /// Remove an edge.
    RemoveEdge {
        edge: EdgeId,
        removed: Option<(usize, Edge)>,
    },
    /// Translate a node by `dx` and `dy`. Undo puts it back at `previous`.
    Move {
        node: NodeId,
        dx: i32,
        dy: i32,
        previous: Option<Point>,
    },
    /// Set a property of an element.
    ChangeProperty {
        element: ElementId,
        name: PropertyName,
        value: PropertyValue,
        previous: Option<PropertyValue>,
    },
    /// Several operations applied and reverted as one.
    Composite(Vec<Operation>),
}

fn not_executed(label: &str) -> GraphError {
    GraphError::IllegalState(format!("{label} operation has no captured state to revert"))
}

impl Operation {
    /// Creates an operation attaching a detached node at `placement`.
    pub fn add_node(node: Node, placement: Placement) -> Self {
        Operation::AddNode {
            node: node.id(),
            placement,
            detached: Some(NodeTree::leaf(node)),
        }
    }

    /// Creates an operation removing a node, its descendants and touching edges.
    pub fn remove_node(node: NodeId) -> Self {
        Operation::RemoveNode {
            node,
            removal: None,
        }
    }

    /// Creates an operation appending a detached edge.
    pub fn add_edge(edge: Edge) -> Self {
        Operation::AddEdge {
            edge: edge.id(),
            index: None,
            detached: Some(edge),
        }
    }

    /// Creates an operation removing an edge.
    pub fn remove_edge(edge: EdgeId) -> Self {
        Operation::RemoveEdge {
            edge,
            removed: None,
        }
    }

    /// Creates an operation translating a node.
    pub fn move_node(node: NodeId, dx: i32, dy: i32) -> Self {
        Operation::Move {
            node,
            dx,
            dy,
            previous: None,
        }
    }

    /// Creates an operation setting a property of a node or edge.
    pub fn change_property(
        element: impl Into<ElementId>,
        name: PropertyName,
        value: PropertyValue,
    ) -> Self {
        Operation::ChangeProperty {
            element: element.into(),
            name,
            value,
            previous: None,
        }
    }

    /// Groups operations into a single one.
    pub fn composite(operations: Vec<Operation>) -> Self {
        Operation::Composite(operations)
    }

    /// Checks whether applying the operation would change nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Operation::Composite(operations) => operations.iter().all(Operation::is_empty),
            _ => false,
        }
    }

    /// Returns the last edge the operation adds, looking into composites.
    pub fn added_edge(&self) -> Option<EdgeId> {
        match self {
            Operation::AddEdge { edge, .. } => Some(*edge),
            Operation::Composite(operations) => {
                operations.iter().rev().find_map(Operation::added_edge)
            }
            _ => None,
        }
    }

    /// Returns a short description of the operation kind.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::AddNode { .. } => "add node",
            Operation::RemoveNode { .. } => "remove node",
            Operation::AddEdge { .. } => "add edge",
            Operation::RemoveEdge { .. } => "remove edge",
            Operation::Move { .. } => "move",
            Operation::ChangeProperty { .. } => "change property",
            Operation::Composite(_) => "composite",
        }
    }

    /// Applies the operation to `diagram` and captures what undoing needs.
    ///
    /// # Errors
    ///
    /// Returns the [`GraphError`] of the failing mutation. The diagram is left
    /// as it was before the call.
    pub fn execute(&mut self, diagram: &mut Diagram) -> Result<(), GraphError> {
        match self {
            Operation::AddNode {
                placement,
                detached,
                ..
            } => {
                let tree = detached.take().ok_or_else(|| {
                    GraphError::IllegalState("add node has no detached node".to_string())
                })?;
                if let Err(err) = diagram.insert_tree(*placement, tree.clone()) {
                    *detached = Some(tree);
                    return Err(err);
                }
                Ok(())
            }
            Operation::RemoveNode { node, removal } => {
                *removal = Some(diagram.remove_node(*node)?);
                Ok(())
            }
            Operation::AddEdge {
                index, detached, ..
            } => {
                let edge = detached.take().ok_or_else(|| {
                    GraphError::IllegalState("add edge has no detached edge".to_string())
                })?;
                let position = index.unwrap_or(diagram.edge_count());
                if let Err(err) = diagram.insert_edge(position, edge.clone()) {
                    *detached = Some(edge);
                    return Err(err);
                }
                *index = Some(position);
                Ok(())
            }
            Operation::RemoveEdge { edge, removed } => {
                *removed = Some(diagram.remove_edge(*edge)?);
                Ok(())
            }
            Operation::Move {
                node,
                dx,
                dy,
                previous,
            } => {
                *previous = Some(diagram.translate(*node, *dx, *dy)?);
                Ok(())
            }
            Operation::ChangeProperty {
                element,
                name,
                value,
                previous,
            } => {
                *previous = Some(diagram.set_property(*element, *name, value.clone())?);
                Ok(())
            }
            Operation::Composite(operations) => {
                for position in 0..operations.len() {
                    if let Err(err) = operations[position].execute(diagram) {
                        for applied in operations[..position].iter_mut().rev() {
                            if let Err(rollback) = applied.undo(diagram) {
                                warn!(err:% = rollback; "Rollback of composite operation failed");
                            }
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }

    /// Reverts the operation, restoring `diagram` to its state before
    /// [`Operation::execute`].
    ///
    /// # Errors
    ///
    /// Fails when the diagram no longer matches the state the operation left
    /// it in, or when the operation was never executed. The diagram is left
    /// unchanged.
    pub fn undo(&mut self, diagram: &mut Diagram) -> Result<(), GraphError> {
        let label = self.label();
        match self {
            Operation::AddNode { node, detached, .. } => {
                if detached.is_some() {
                    return Err(not_executed(label));
                }
                if let Some(edge) = diagram
                    .subtree(*node)
                    .into_iter()
                    .find_map(|id| diagram.edges_connected_to(id).next().map(Edge::id))
                {
                    return Err(GraphError::IllegalState(format!(
                        "node {node} still has edge {edge} attached"
                    )));
                }
                let removal = diagram.remove_node(*node)?;
                *detached = Some(removal.tree);
                Ok(())
            }
            Operation::RemoveNode { removal, .. } => {
                let Some(captured) = removal.clone() else {
                    return Err(not_executed(label));
                };
                diagram.restore(captured)?;
                *removal = None;
                Ok(())
            }
            Operation::AddEdge {
                edge,
                index,
                detached,
            } => {
                if detached.is_some() {
                    return Err(not_executed(label));
                }
                let (position, removed) = diagram.remove_edge(*edge)?;
                *index = Some(position);
                *detached = Some(removed);
                Ok(())
            }
            Operation::RemoveEdge { removed, .. } => {
                let Some((index, edge)) = removed.clone() else {
                    return Err(not_executed(label));
                };
                diagram.insert_edge(index, edge)?;
                *removed = None;
                Ok(())
            }
            Operation::Move { node, previous, .. } => {
                let Some(position) = *previous else {
                    return Err(not_executed(label));
                };
                diagram.set_position(*node, position)?;
                *previous = None;
                Ok(())
            }
            Operation::ChangeProperty {
                element,
                name,
                previous,
                ..
            } => {
                let Some(old) = previous.clone() else {
                    return Err(not_executed(label));
                };
                diagram.set_property(*element, *name, old)?;
                *previous = None;
                Ok(())
            }
            Operation::Composite(operations) => {
                let count = operations.len();
                for position in (0..count).rev() {
                    if let Err(err) = operations[position].undo(diagram) {
                        for reverted in operations[position + 1..].iter_mut() {
                            if let Err(replay) = reverted.execute(diagram) {
                                warn!(err:% = replay; "Replay of composite operation failed");
                            }
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddNode { node, .. } | Operation::RemoveNode { node, .. } => {
                write!(f, "{} {}", self.label(), node)
            }
            Operation::AddEdge { edge, .. } | Operation::RemoveEdge { edge, .. } => {
                write!(f, "{} {}", self.label(), edge)
            }
            Operation::Move { node, dx, dy, .. } => write!(f, "move {node} by ({dx}, {dy})"),
            Operation::ChangeProperty { element, name, .. } => {
                write!(f, "change {name} of {element}")
            }
            Operation::Composite(operations) => write!(f, "composite of {}", operations.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use astrolabe_core::{
        DiagramType,
        element::{EdgeKind, NodeKind},
        geometry::Point,
    };

    use super::*;

    fn two_classes() -> (Diagram, NodeId, NodeId) {
        let mut diagram = Diagram::new(DiagramType::Class);
        let a = diagram.add_root_node(Node::new(NodeKind::Class)).unwrap();
        let b = diagram.add_root_node(Node::new(NodeKind::Class)).unwrap();
        (diagram, a, b)
    }

    #[test]
    fn test_add_node_round_trip() {
        let (mut diagram, _, _) = two_classes();
        let before = diagram.clone();
        let node = Node::new(NodeKind::Interface);
        let id = node.id();
        let mut operation = Operation::add_node(node, Placement::root(1));

        operation.execute(&mut diagram).unwrap();
        assert_eq!(diagram.placement(id), Some(Placement::root(1)));

        operation.undo(&mut diagram).unwrap();
        assert_eq!(diagram, before);

        operation.execute(&mut diagram).unwrap();
        assert!(diagram.contains_node(id));
    }

    #[test]
    fn test_undo_before_execute_fails() {
        let (mut diagram, a, _) = two_classes();
        let mut operation = Operation::remove_node(a);

        let result = operation.undo(&mut diagram);

        assert!(matches!(result, Err(GraphError::IllegalState(_))));
        assert!(diagram.contains_node(a));
    }

    #[test]
    fn test_add_edge_records_index() {
        let (mut diagram, a, b) = two_classes();
        let first = diagram
            .add_edge(Edge::new(EdgeKind::Dependency, a, b))
            .unwrap();
        let edge = Edge::new(EdgeKind::Association, b, a);
        let id = edge.id();
        let mut operation = Operation::add_edge(edge);

        operation.execute(&mut diagram).unwrap();
        diagram.remove_edge(first).unwrap();
        operation.undo(&mut diagram).unwrap();

        assert!(matches!(
            operation,
            Operation::AddEdge {
                index: Some(0),
                ..
            }
        ));
        assert!(!diagram.contains_edge(id));
    }

    #[test]
    fn test_change_property_restores_previous() {
        let (mut diagram, a, _) = two_classes();
        let mut operation =
            Operation::change_property(a, PropertyName::Name, PropertyValue::text("Shape"));

        operation.execute(&mut diagram).unwrap();
        assert_eq!(diagram.node(a).and_then(Node::name), Some("Shape"));

        operation.undo(&mut diagram).unwrap();
        assert_eq!(diagram.node(a).and_then(Node::name), Some(""));
    }

    #[test]
    fn test_move_is_reverted() {
        let (mut diagram, a, _) = two_classes();
        let mut operation = Operation::move_node(a, 15, -5);

        operation.execute(&mut diagram).unwrap();
        assert_eq!(diagram.node(a).map(Node::position), Some(Point::new(15, -5)));

        operation.undo(&mut diagram).unwrap();
        assert_eq!(diagram.node(a).map(Node::position), Some(Point::new(0, 0)));
    }

    #[test]
    fn test_move_by_extreme_offset_is_reverted() {
        let (mut diagram, a, _) = two_classes();
        let before = diagram.clone();
        let mut operation = Operation::move_node(a, i32::MIN, i32::MIN);

        operation.execute(&mut diagram).unwrap();
        assert_eq!(
            diagram.node(a).map(Node::position),
            Some(Point::new(i32::MIN, i32::MIN))
        );

        operation.undo(&mut diagram).unwrap();
        assert_eq!(diagram, before);
    }

    #[test]
    fn test_overflowing_move_is_rejected() {
        let (mut diagram, a, _) = two_classes();
        diagram.translate(a, 0, i32::MAX).unwrap();
        let mut operation = Operation::move_node(a, 0, 1);

        let result = operation.execute(&mut diagram);

        assert_eq!(result, Err(GraphError::CoordinateOverflow(a)));
        assert_eq!(diagram.node(a).map(Node::position), Some(Point::new(0, i32::MAX)));
        assert!(matches!(operation, Operation::Move { previous: None, .. }));
    }

    #[test]
    fn test_failed_composite_rolls_back() {
        let (mut diagram, a, b) = two_classes();
        let before = diagram.clone();
        let mut operation = Operation::composite(vec![
            Operation::add_edge(Edge::new(EdgeKind::Dependency, a, b)),
            Operation::move_node(a, 10, 10),
            Operation::remove_node(NodeId::next()),
        ]);

        let result = operation.execute(&mut diagram);

        assert!(matches!(result, Err(GraphError::UnknownNode(_))));
        assert_eq!(diagram, before);
    }

    #[test]
    fn test_add_node_undo_refuses_attached_edges() {
        let (mut diagram, a, _) = two_classes();
        let node = Node::new(NodeKind::Class);
        let id = node.id();
        let mut operation = Operation::add_node(node, Placement::root(2));
        operation.execute(&mut diagram).unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Dependency, a, id))
            .unwrap();

        let result = operation.undo(&mut diagram);

        assert!(matches!(result, Err(GraphError::IllegalState(_))));
        assert!(diagram.contains_node(id));
    }

    #[test]
    fn test_added_edge_looks_into_composites() {
        let (_, a, b) = two_classes();
        let edge = Edge::new(EdgeKind::Dependency, a, b);
        let id = edge.id();
        let operation = Operation::composite(vec![
            Operation::move_node(a, 1, 1),
            Operation::composite(vec![Operation::add_edge(edge)]),
        ]);

        assert_eq!(operation.added_edge(), Some(id));
        assert_eq!(Operation::remove_node(a).added_edge(), None);
    }

    #[test]
    fn test_empty_composite() {
        assert!(Operation::composite(vec![]).is_empty());
        assert!(Operation::composite(vec![Operation::composite(vec![])]).is_empty());
        assert!(!Operation::move_node(NodeId::next(), 0, 0).is_empty());
    }
}
