//! Undo/redo history.

use std::collections::VecDeque;

use log::debug;

use astrolabe_core::Diagram;

use super::Operation;
use crate::AstrolabeError;

/// Executes operations and records them for undo and redo.
///
/// The processor holds two LIFO stacks. Executing a new operation pushes it
/// on the undo stack and clears the redo stack; undo moves the most recent
/// entry to the redo stack and redo moves it back. A
/// [`Operation::Composite`] is a single entry.
///
/// # Examples
///
/// ```
/// use astrolabe::operation::{Operation, OperationProcessor};
/// use astrolabe_core::{Diagram, DiagramType, element::{Node, NodeKind}, graph::Placement};
///
/// let mut diagram = Diagram::new(DiagramType::State);
/// let mut processor = OperationProcessor::new();
/// let state = Node::new(NodeKind::State);
///
/// processor
///     .execute_new_operation(Operation::add_node(state, Placement::root(0)), &mut diagram)
///     .unwrap();
/// assert_eq!(diagram.node_count(), 1);
///
/// assert!(processor.undo(&mut diagram).unwrap());
/// assert_eq!(diagram.node_count(), 0);
/// assert!(!processor.undo(&mut diagram).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperationProcessor {
    undo_stack: VecDeque<Operation>,
    redo_stack: Vec<Operation>,
    capacity: Option<usize>,
}

impl OperationProcessor {
    /// Creates a processor with unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a processor keeping at most `capacity` undoable operations,
    /// or an unbounded history for `None`.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Executes `operation` on `diagram` and records it.
    ///
    /// Empty composites are executed but not recorded.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing mutation. A failed operation leaves
    /// the diagram and the history unchanged.
    pub fn execute_new_operation(
        &mut self,
        mut operation: Operation,
        diagram: &mut Diagram,
    ) -> Result<(), AstrolabeError> {
        operation.execute(diagram)?;
        debug!(operation:% = operation; "Executed operation");

        if operation.is_empty() {
            return Ok(());
        }
        self.redo_stack.clear();
        self.undo_stack.push_back(operation);
        if let Some(capacity) = self.capacity {
            while self.undo_stack.len() > capacity {
                if let Some(dropped) = self.undo_stack.pop_front() {
                    debug!(operation:% = dropped; "Dropped operation beyond history capacity");
                }
            }
        }
        Ok(())
    }

    /// Reverts the most recent operation.
    ///
    /// Returns `Ok(false)` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing inverse when the diagram diverged from
    /// the recorded history; the operation stays on the undo stack.
    pub fn undo(&mut self, diagram: &mut Diagram) -> Result<bool, AstrolabeError> {
        let Some(mut operation) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        if let Err(err) = operation.undo(diagram) {
            self.undo_stack.push_back(operation);
            return Err(err.into());
        }
        debug!(operation:% = operation; "Undid operation");
        self.redo_stack.push(operation);
        Ok(true)
    }

    /// Re-applies the most recently undone operation.
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing mutation; the operation stays on the
    /// redo stack.
    pub fn redo(&mut self, diagram: &mut Diagram) -> Result<bool, AstrolabeError> {
        let Some(mut operation) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = operation.execute(diagram) {
            self.redo_stack.push(operation);
            return Err(err.into());
        }
        debug!(operation:% = operation; "Redid operation");
        self.undo_stack.push_back(operation);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forgets the whole history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use astrolabe_core::{
        DiagramType,
        element::{Edge, EdgeKind, Node, NodeKind},
        graph::Placement,
        identifier::NodeId,
    };

    use super::*;

    fn add_root(processor: &mut OperationProcessor, diagram: &mut Diagram) -> NodeId {
        let node = Node::new(NodeKind::State);
        let id = node.id();
        let placement = Placement::root(diagram.root_nodes().len());
        processor
            .execute_new_operation(Operation::add_node(node, placement), diagram)
            .unwrap();
        id
    }

    #[test]
    fn test_undo_redo_on_empty_stacks() {
        let mut diagram = Diagram::new(DiagramType::State);
        let mut processor = OperationProcessor::new();

        assert!(!processor.undo(&mut diagram).unwrap());
        assert!(!processor.redo(&mut diagram).unwrap());
        assert!(diagram.is_empty());
    }

    #[test]
    fn test_new_operation_clears_redo() {
        let mut diagram = Diagram::new(DiagramType::State);
        let mut processor = OperationProcessor::new();
        add_root(&mut processor, &mut diagram);
        add_root(&mut processor, &mut diagram);

        processor.undo(&mut diagram).unwrap();
        assert!(processor.can_redo());

        add_root(&mut processor, &mut diagram);
        assert!(!processor.can_redo());
        assert_eq!(processor.undo_len(), 2);
        assert!(!processor.redo(&mut diagram).unwrap());
    }

    #[test]
    fn test_failed_operation_is_not_recorded() {
        let mut diagram = Diagram::new(DiagramType::State);
        let mut processor = OperationProcessor::new();
        let state = add_root(&mut processor, &mut diagram);

        let result = processor.execute_new_operation(
            Operation::add_edge(Edge::new(EdgeKind::StateTransition, state, NodeId::next())),
            &mut diagram,
        );

        assert!(matches!(result, Err(AstrolabeError::Graph(_))));
        assert_eq!(processor.undo_len(), 1);
        assert_eq!(diagram.edge_count(), 0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut diagram = Diagram::new(DiagramType::State);
        let mut processor = OperationProcessor::with_capacity(Some(2));
        let first = add_root(&mut processor, &mut diagram);
        add_root(&mut processor, &mut diagram);
        add_root(&mut processor, &mut diagram);

        assert_eq!(processor.undo_len(), 2);
        assert!(processor.undo(&mut diagram).unwrap());
        assert!(processor.undo(&mut diagram).unwrap());
        assert!(!processor.undo(&mut diagram).unwrap());
        assert_eq!(diagram.root_nodes(), &[first]);
    }

    #[test]
    fn test_diverged_undo_keeps_operation() {
        let mut diagram = Diagram::new(DiagramType::State);
        let mut processor = OperationProcessor::new();
        let state = add_root(&mut processor, &mut diagram);
        processor
            .execute_new_operation(Operation::move_node(state, 5, 5), &mut diagram)
            .unwrap();
        diagram.remove_node(state).unwrap();

        let result = processor.undo(&mut diagram);

        assert!(result.is_err());
        assert_eq!(processor.undo_len(), 2);
        assert_eq!(processor.redo_len(), 0);
    }

    #[test]
    fn test_empty_composite_is_not_recorded() {
        let mut diagram = Diagram::new(DiagramType::State);
        let mut processor = OperationProcessor::new();

        processor
            .execute_new_operation(Operation::composite(vec![]), &mut diagram)
            .unwrap();

        assert!(!processor.can_undo());
    }

    #[test]
    fn test_clear() {
        let mut diagram = Diagram::new(DiagramType::State);
        let mut processor = OperationProcessor::new();
        add_root(&mut processor, &mut diagram);
        add_root(&mut processor, &mut diagram);
        processor.undo(&mut diagram).unwrap();

        processor.clear();

        assert!(!processor.can_undo());
        assert!(!processor.can_redo());
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use astrolabe_core::{
        DiagramType,
        element::{Edge, EdgeKind, Node, NodeKind},
        geometry::Point,
        graph::Placement,
        identifier::ElementId,
        property::{PropertyName, PropertyValue},
    };

    use super::*;
    use crate::builder::DiagramBuilder;

    /// One step of a random editing script. Indices select among the nodes
    /// present at the time the step runs.
    #[derive(Debug, Clone)]
    enum Step {
        AddRoot(NodeKind),
        AddChild(usize, NodeKind),
        Connect(usize, usize, EdgeKind),
        Remove(usize),
        RemoveEdge(usize),
        Move(usize, i32, i32),
        Rename(usize, String),
        Batch(Vec<(usize, i32)>),
        /// Add a lifeline at the given x.
        Lifeline(i32),
        /// Connect two nodes the way an editor does, creating activations.
        Message(usize, usize, EdgeKind),
        /// Delete a node or an edge with its cascade. Indices past the node
        /// count select edges.
        Delete(usize),
        Undo,
        Redo,
    }

    fn node_kind_strategy() -> impl Strategy<Value = NodeKind> {
        prop_oneof![
            Just(NodeKind::Class),
            Just(NodeKind::Interface),
            Just(NodeKind::Package),
            Just(NodeKind::Note),
        ]
    }

    fn edge_kind_strategy() -> impl Strategy<Value = EdgeKind> {
        prop_oneof![
            Just(EdgeKind::Dependency),
            Just(EdgeKind::Association),
            Just(EdgeKind::Generalization),
        ]
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            node_kind_strategy().prop_map(Step::AddRoot),
            (any::<usize>(), node_kind_strategy()).prop_map(|(i, k)| Step::AddChild(i, k)),
            (any::<usize>(), any::<usize>(), edge_kind_strategy())
                .prop_map(|(i, j, k)| Step::Connect(i, j, k)),
            any::<usize>().prop_map(Step::Remove),
            any::<usize>().prop_map(Step::RemoveEdge),
            (any::<usize>(), -50i32..50, -50i32..50).prop_map(|(i, dx, dy)| Step::Move(i, dx, dy)),
            (any::<usize>(), "[a-z]{0,6}").prop_map(|(i, name)| Step::Rename(i, name)),
            prop::collection::vec((any::<usize>(), -20i32..20), 0..4).prop_map(Step::Batch),
            Just(Step::Undo),
            Just(Step::Redo),
        ]
    }

    fn sequence_step_strategy() -> impl Strategy<Value = Step> {
        let message_kind = prop_oneof![
            3 => Just(EdgeKind::Call),
            1 => Just(EdgeKind::Constructor),
            2 => Just(EdgeKind::Return),
        ];
        prop_oneof![
            2 => (0i32..400).prop_map(Step::Lifeline),
            4 => (any::<usize>(), any::<usize>(), message_kind)
                .prop_map(|(i, j, k)| Step::Message(i, j, k)),
            2 => any::<usize>().prop_map(Step::Delete),
            1 => (any::<usize>(), -50i32..50, -50i32..50).prop_map(|(i, dx, dy)| Step::Move(i, dx, dy)),
            1 => Just(Step::Undo),
            1 => Just(Step::Redo),
        ]
    }

    fn pick<T: Copy>(items: &[T], index: usize) -> Option<T> {
        (!items.is_empty()).then(|| items[index % items.len()])
    }

    fn operation_for(step: &Step, diagram: &Diagram) -> Option<Operation> {
        let nodes = diagram.all_node_ids();
        let edges: Vec<_> = diagram.all_edges().map(Edge::id).collect();
        match step {
            Step::AddRoot(kind) => Some(Operation::add_node(
                Node::new(*kind),
                Placement::root(diagram.root_nodes().len()),
            )),
            Step::AddChild(index, kind) => {
                let parent = pick(&nodes, *index)?;
                let placement = Placement::child(parent, diagram.children(parent).len());
                Some(Operation::add_node(Node::new(*kind), placement))
            }
            Step::Connect(i, j, kind) => Some(Operation::add_edge(Edge::new(
                *kind,
                pick(&nodes, *i)?,
                pick(&nodes, *j)?,
            ))),
            Step::Remove(index) => Some(Operation::remove_node(pick(&nodes, *index)?)),
            Step::RemoveEdge(index) => Some(Operation::remove_edge(pick(&edges, *index)?)),
            Step::Move(index, dx, dy) => Some(Operation::move_node(pick(&nodes, *index)?, *dx, *dy)),
            Step::Rename(index, name) => {
                let node = pick(&nodes, *index)?;
                let kind = diagram.node(node)?.kind();
                let property = if kind == NodeKind::Note {
                    PropertyName::Contents
                } else {
                    PropertyName::Name
                };
                Some(Operation::change_property(
                    ElementId::Node(node),
                    property,
                    PropertyValue::text(name.clone()),
                ))
            }
            Step::Batch(moves) => Some(Operation::composite(
                moves
                    .iter()
                    .filter_map(|(index, delta)| {
                        pick(&nodes, *index).map(|node| Operation::move_node(node, *delta, 0))
                    })
                    .collect(),
            )),
            Step::Lifeline(x) => DiagramBuilder::new(diagram)
                .create_add_node_operation(Node::new(NodeKind::ImplicitParameter), Point::new(*x, 0))
                .ok(),
            Step::Message(i, j, kind) => DiagramBuilder::new(diagram)
                .create_add_edge_operation(Edge::new(*kind, pick(&nodes, *i)?, pick(&nodes, *j)?))
                .ok(),
            Step::Delete(index) => {
                let elements: Vec<ElementId> = nodes
                    .iter()
                    .map(|id| ElementId::Node(*id))
                    .chain(edges.iter().map(|id| ElementId::Edge(*id)))
                    .collect();
                DiagramBuilder::new(diagram)
                    .create_remove_elements_operation(&[pick(&elements, *index)?])
                    .ok()
            }
            Step::Undo | Step::Redo => None,
        }
    }

    /// Runs a script and checks that undoing the whole history restores the
    /// empty diagram, and redoing it restores the final state.
    fn check_undo_inverse_law(
        diagram_type: DiagramType,
        steps: Vec<Step>,
    ) -> Result<(), TestCaseError> {
        let mut diagram = Diagram::new(diagram_type);
        let mut processor = OperationProcessor::new();
        let empty = diagram.clone();

        for step in &steps {
            match step {
                Step::Undo => {
                    processor.undo(&mut diagram).map_err(|e| TestCaseError::fail(e.to_string()))?;
                }
                Step::Redo => {
                    processor.redo(&mut diagram).map_err(|e| TestCaseError::fail(e.to_string()))?;
                }
                _ => {
                    if let Some(operation) = operation_for(step, &diagram) {
                        let before = diagram.clone();
                        if processor.execute_new_operation(operation, &mut diagram).is_err() {
                            prop_assert_eq!(&diagram, &before);
                        }
                    }
                }
            }
        }

        let end = diagram.clone();
        let mut undone = 0;
        while processor
            .undo(&mut diagram)
            .map_err(|e| TestCaseError::fail(e.to_string()))?
        {
            undone += 1;
        }
        prop_assert_eq!(&diagram, &empty);

        while processor
            .redo(&mut diagram)
            .map_err(|e| TestCaseError::fail(e.to_string()))?
        {
            undone -= 1;
        }
        prop_assert_eq!(undone, 0);
        prop_assert_eq!(&diagram, &end);
        Ok(())
    }

    proptest! {
        #[test]
        fn undo_inverse_law(steps in prop::collection::vec(step_strategy(), 0..40)) {
            check_undo_inverse_law(DiagramType::Class, steps)?;
        }

        #[test]
        fn sequence_undo_inverse_law(steps in prop::collection::vec(sequence_step_strategy(), 0..40)) {
            check_undo_inverse_law(DiagramType::Sequence, steps)?;
        }
    }
}
