//! Translation of editing intents into operations.
//!
//! A [`DiagramBuilder`] looks at the current state of a diagram and turns a
//! user intent (add a node, connect two nodes, delete a selection) into the
//! [`Operation`] that carries it out. Builders never mutate the diagram: the
//! operation is handed to an
//! [`OperationProcessor`](crate::operation::OperationProcessor), which
//! executes and records it.
//!
//! Intents are checked against the diagram type's
//! [`DiagramPolicy`](crate::policy::DiagramPolicy) before any operation is
//! produced. Sequence diagrams add their own rules for activations and
//! cascading deletion (see the `sequence` submodule).

mod sequence;

use std::collections::HashSet;

use log::{debug, warn};

use astrolabe_core::{
    Diagram, DiagramType, GraphError,
    element::{Edge, Node, NodeKind},
    geometry::Point,
    graph::Placement,
    identifier::{EdgeId, ElementId, NodeId},
    property::{PropertyName, PropertyValue},
};

use crate::{
    AstrolabeError,
    inference::SequenceInference,
    operation::Operation,
    policy::{DiagramPolicy, DiagramTypeExt},
};

/// Creates operations for one diagram.
///
/// # Examples
///
/// ```
/// use astrolabe::{builder::DiagramBuilder, operation::OperationProcessor};
/// use astrolabe_core::{Diagram, DiagramType, element::{Node, NodeKind}, geometry::Point};
///
/// let mut diagram = Diagram::new(DiagramType::Class);
/// let mut processor = OperationProcessor::new();
///
/// let operation = DiagramBuilder::new(&diagram)
///     .create_add_node_operation(Node::new(NodeKind::Class), Point::new(10, 10))
///     .unwrap();
/// processor.execute_new_operation(operation, &mut diagram).unwrap();
///
/// assert_eq!(diagram.root_nodes().len(), 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiagramBuilder<'a> {
    diagram: &'a Diagram,
    policy: &'static DiagramPolicy,
}

impl<'a> DiagramBuilder<'a> {
    /// Creates a builder for `diagram`.
    pub fn new(diagram: &'a Diagram) -> Self {
        Self {
            diagram,
            policy: diagram.diagram_type().policy(),
        }
    }

    fn is_sequence(&self) -> bool {
        self.diagram.diagram_type() == DiagramType::Sequence
    }

    fn check_node_kind(&self, kind: NodeKind) -> Result<(), AstrolabeError> {
        if self.policy.allows_node(kind) {
            Ok(())
        } else {
            warn!(kind:% = kind, diagram_type:% = self.policy.diagram_type(); "Rejected node kind");
            Err(AstrolabeError::unsupported_kind(
                self.policy.diagram_type(),
                kind,
            ))
        }
    }

    fn require_node(&self, id: NodeId) -> Result<&'a Node, AstrolabeError> {
        self.diagram
            .node(id)
            .ok_or_else(|| GraphError::UnknownNode(id).into())
    }

    /// Creates an operation adding `node` as a new root at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`AstrolabeError::UnsupportedKind`] when the diagram type does not
    /// admit the node kind, and [`GraphError::IllegalState`] for kinds that
    /// only exist as children.
    pub fn create_add_node_operation(
        &self,
        node: Node,
        position: Point,
    ) -> Result<Operation, AstrolabeError> {
        self.check_node_kind(node.kind())?;
        if node.kind().is_child_only() {
            return Err(GraphError::IllegalState(format!(
                "{} nodes must be added to a parent",
                node.kind()
            ))
            .into());
        }

        let placement = Placement::root(self.diagram.root_nodes().len());
        Ok(Operation::add_node(node.with_position(position), placement))
    }

    /// Creates an operation adding `node` as a child of `parent`, at
    /// `position` relative to the parent.
    ///
    /// Call nodes are inserted among their siblings by vertical order; other
    /// children are appended.
    ///
    /// # Errors
    ///
    /// Fails for kinds the diagram type does not admit, an unknown parent, or a
    /// parent that does not accept the child kind.
    pub fn create_add_child_operation(
        &self,
        parent: NodeId,
        node: Node,
        position: Point,
    ) -> Result<Operation, AstrolabeError> {
        self.check_node_kind(node.kind())?;
        let parent_kind = self.require_node(parent)?.kind();
        if !parent_kind.accepts_child(node.kind()) {
            return Err(GraphError::IllegalChild {
                parent: parent_kind,
                child: node.kind(),
            }
            .into());
        }

        let index = if node.kind() == NodeKind::Call {
            sequence::vertical_index(self.diagram, parent, position.y())
        } else {
            self.diagram.children(parent).len()
        };
        Ok(Operation::add_node(
            node.with_position(position),
            Placement::child(parent, index),
        ))
    }

    /// Creates an operation adding `edge`.
    ///
    /// In sequence diagrams, a call or constructor edge aimed at a lifeline
    /// also creates the activation it targets, and an entry activation when
    /// it starts on a lifeline that has none; the result is then a composite
    /// and the edge added is a redirected copy of `edge`.
    ///
    /// # Errors
    ///
    /// Fails for edge kinds the diagram type does not admit, for endpoints
    /// not in the diagram, and with [`GraphError::CoordinateOverflow`] when a
    /// new activation would be placed out of range.
    pub fn create_add_edge_operation(&self, edge: Edge) -> Result<Operation, AstrolabeError> {
        if !self.policy.allows_edge(edge.kind()) {
            warn!(kind:% = edge.kind(), diagram_type:% = self.policy.diagram_type(); "Rejected edge kind");
            return Err(AstrolabeError::unsupported_kind(
                self.policy.diagram_type(),
                edge.kind(),
            ));
        }
        for endpoint in [edge.start(), edge.end()] {
            if !self.diagram.contains_node(endpoint) {
                return Err(GraphError::Connection {
                    edge: edge.id(),
                    endpoint,
                }
                .into());
            }
        }

        if self.is_sequence() && edge.kind().is_call_flow() {
            return sequence::message_operation(self.diagram, edge).map_err(AstrolabeError::from);
        }
        Ok(Operation::add_edge(edge))
    }

    /// Creates an operation moving the selected nodes by `dx` and `dy`.
    ///
    /// Nodes whose ancestor is also selected are skipped, since they move
    /// with it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] for a selected node not in the diagram.
    pub fn create_move_operation(
        &self,
        selection: &[NodeId],
        dx: i32,
        dy: i32,
    ) -> Result<Operation, AstrolabeError> {
        let mut moves = Vec::new();
        for node in selection {
            self.require_node(*node)?;
            let covered = selection
                .iter()
                .any(|other| self.diagram.is_ancestor(*other, *node));
            let repeated = moves
                .iter()
                .any(|op| matches!(op, Operation::Move { node: moved, .. } if moved == node));
            if !covered && !repeated {
                moves.push(Operation::move_node(*node, dx, dy));
            }
        }
        Ok(Operation::composite(moves))
    }

    /// Creates an operation setting a property of an element.
    ///
    /// # Errors
    ///
    /// Fails for unknown elements and values that do not fit the element's
    /// property schema.
    pub fn create_property_change_operation(
        &self,
        element: ElementId,
        name: PropertyName,
        value: PropertyValue,
    ) -> Result<Operation, AstrolabeError> {
        let properties = match element {
            ElementId::Node(id) => self.require_node(id)?.properties(),
            ElementId::Edge(id) => self
                .diagram
                .edge(id)
                .ok_or(GraphError::UnknownEdge(id))?
                .properties(),
        };
        properties.check(name, &value).map_err(GraphError::from)?;
        Ok(Operation::change_property(element, name, value))
    }

    /// Creates an operation deleting the selected elements and everything
    /// their removal implies.
    ///
    /// A deleted node takes its descendants and every edge touching them. In
    /// sequence diagrams the deletion also follows the call structure (see
    /// [`SequenceInference`]): deleting an activation deletes its callees and
    /// its activating message, and deleting a call or constructor message
    /// deletes the activation it created, its exclusive start and, for
    /// constructors, the constructed lifeline.
    ///
    /// The result is one composite: edge removals first, in edge order, then
    /// the removal of the top-most deleted nodes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] or [`GraphError::UnknownEdge`] for a
    /// selected element not in the diagram.
    pub fn create_remove_elements_operation(
        &self,
        selection: &[ElementId],
    ) -> Result<Operation, AstrolabeError> {
        for element in selection {
            match element {
                ElementId::Node(id) => {
                    self.require_node(*id)?;
                }
                ElementId::Edge(id) => {
                    if !self.diagram.contains_edge(*id) {
                        return Err(GraphError::UnknownEdge(*id).into());
                    }
                }
            }
        }

        let (nodes, edges) = self.collect_deletion(selection);

        let mut operations: Vec<Operation> = self
            .diagram
            .all_edges()
            .filter(|edge| {
                edges.contains(&edge.id())
                    || nodes.contains(&edge.start())
                    || nodes.contains(&edge.end())
            })
            .map(|edge| Operation::remove_edge(edge.id()))
            .collect();
        operations.extend(
            self.diagram
                .all_node_ids()
                .into_iter()
                .filter(|id| nodes.contains(id))
                .filter(|id| {
                    self.diagram
                        .parent(*id)
                        .is_none_or(|parent| !nodes.contains(&parent))
                })
                .map(Operation::remove_node),
        );

        debug!(
            selected = selection.len(),
            nodes = nodes.len(),
            edges = operations.iter().filter(|op| matches!(op, Operation::RemoveEdge { .. })).count();
            "Computed deletion cascade"
        );
        Ok(Operation::composite(operations))
    }

    /// Returns the closure of the selection under the deletion rules.
    fn collect_deletion(&self, selection: &[ElementId]) -> (HashSet<NodeId>, HashSet<EdgeId>) {
        let inference = self.is_sequence().then(|| SequenceInference::new(self.diagram));
        let mut nodes = HashSet::new();
        let mut edges = HashSet::new();
        let mut pending: Vec<ElementId> = selection.iter().rev().copied().collect();

        while let Some(element) = pending.pop() {
            match element {
                ElementId::Node(id) => {
                    if !nodes.insert(id) {
                        continue;
                    }
                    pending.extend(self.diagram.children(id).iter().map(|c| ElementId::Node(*c)));
                    if let Some(inference) = &inference {
                        sequence::cascade_from_node(self.diagram, inference, id, &mut pending);
                    }
                }
                ElementId::Edge(id) => {
                    if !edges.insert(id) {
                        continue;
                    }
                    if let Some(inference) = &inference {
                        sequence::cascade_from_edge(self.diagram, inference, id, &mut pending);
                    }
                }
            }
        }
        (nodes, edges)
    }
}
