//! Sequence diagram editing rules.
//!
//! Messages connect activations, not lifelines. Connecting a call or
//! constructor message to a lifeline creates the activations it needs, and
//! deleting any part of a call chain deletes what only existed because of it.

use log::debug;

use astrolabe_core::{
    Diagram, GraphError,
    element::{Edge, EdgeKind, Node, NodeKind},
    geometry::Point,
    graph::Placement,
    identifier::{EdgeId, ElementId, NodeId},
};

use crate::{inference::SequenceInference, operation::Operation};

/// Vertical distance between a calling activation and its callee.
const CALLEE_OFFSET: i32 = 10;

/// Returns the index before the first child of `parent` lying below `y`.
pub(super) fn vertical_index(diagram: &Diagram, parent: NodeId, y: i32) -> usize {
    let children = diagram.children(parent);
    children
        .iter()
        .position(|child| {
            diagram
                .node(*child)
                .is_some_and(|node| node.position().y() > y)
        })
        .unwrap_or(children.len())
}

fn kind_of(diagram: &Diagram, node: NodeId) -> Option<NodeKind> {
    diagram.node(node).map(Node::kind)
}

/// Builds the operation adding a call or constructor message.
///
/// The endpoints of `edge` must exist in `diagram`. Fails with
/// [`GraphError::CoordinateOverflow`] when the callee activation cannot be
/// placed below its caller.
pub(super) fn message_operation(diagram: &Diagram, edge: Edge) -> Result<Operation, GraphError> {
    let mut operations = Vec::new();

    let mut start = edge.start();
    let mut start_y = diagram.absolute_position(start)?.y();
    let mut entry_lifeline = None;
    if kind_of(diagram, start) == Some(NodeKind::ImplicitParameter) {
        let last_call = diagram
            .children(start)
            .iter()
            .rev()
            .find(|child| kind_of(diagram, **child) == Some(NodeKind::Call));
        match last_call {
            Some(call) => {
                start = *call;
                start_y = diagram.absolute_position(start)?.y();
            }
            None => {
                let entry = Node::new(NodeKind::Call);
                debug!(lifeline:% = start, call:% = entry.id(); "Creating entry activation");
                entry_lifeline = Some(start);
                start = entry.id();
                operations.push(Operation::add_node(
                    entry.with_position(Point::default()),
                    Placement::child(edge.start(), 0),
                ));
            }
        }
    }

    let mut end = edge.end();
    if kind_of(diagram, end) == Some(NodeKind::ImplicitParameter) {
        let lifeline = end;
        let lifeline_y = diagram.absolute_position(lifeline)?.y();
        let callee = Node::new(NodeKind::Call);
        let y = start_y
            .checked_sub(lifeline_y)
            .and_then(|y| y.checked_add(CALLEE_OFFSET))
            .ok_or(GraphError::CoordinateOverflow(callee.id()))?;
        let position = Point::new(0, y);
        let mut index = if edge.kind() == EdgeKind::Constructor {
            0
        } else {
            vertical_index(diagram, lifeline, position.y())
        };
        if entry_lifeline == Some(lifeline) {
            index += 1;
        }

        debug!(lifeline:% = lifeline, call:% = callee.id(), index = index; "Creating callee activation");
        end = callee.id();
        operations.push(Operation::add_node(
            callee.with_position(position),
            Placement::child(lifeline, index),
        ));
    }

    if start == edge.start() && end == edge.end() {
        return Ok(Operation::add_edge(edge));
    }
    let message = Operation::add_edge(edge.redirected(start, end));
    if operations.is_empty() {
        return Ok(message);
    }
    operations.push(message);
    Ok(Operation::composite(operations))
}

/// Queues what deleting `node` implies beyond its children: the callees of
/// an activation and the messages that activated it.
pub(super) fn cascade_from_node(
    diagram: &Diagram,
    inference: &SequenceInference<'_>,
    node: NodeId,
    pending: &mut Vec<ElementId>,
) {
    if kind_of(diagram, node) != Some(NodeKind::Call) {
        return;
    }
    pending.extend(inference.callees(node).into_iter().map(ElementId::Node));
    pending.extend(
        diagram
            .incoming_edges(node)
            .filter(|edge| edge.kind().is_call_flow())
            .map(|edge| ElementId::Edge(edge.id())),
    );
}

/// Queues what deleting a message implies: the activation it created, its
/// exclusive start and, for a constructor, the constructed lifeline.
pub(super) fn cascade_from_edge(
    diagram: &Diagram,
    inference: &SequenceInference<'_>,
    edge: EdgeId,
    pending: &mut Vec<ElementId>,
) {
    let Some(edge) = diagram.edge(edge) else {
        return;
    };
    if !edge.kind().is_call_flow() {
        return;
    }

    let end = edge.end();
    let end_kind = kind_of(diagram, end);
    if end_kind == Some(NodeKind::Call) {
        pending.push(ElementId::Node(end));
    }
    if let Some(start) = inference.start_node_if_exclusive(edge.id()) {
        pending.push(ElementId::Node(start));
    }
    if edge.kind() == EdgeKind::Constructor {
        let constructed = match end_kind {
            Some(NodeKind::Call) => inference.lifeline(end),
            Some(NodeKind::ImplicitParameter) => Some(end),
            _ => None,
        };
        pending.extend(constructed.map(ElementId::Node));
    }
}
