//! Astrolabe - An undoable editing engine for UML diagrams.
//!
//! Diagram-type policies, structural validation, sequence-diagram inference,
//! reversible operations and a JSON codec on top of the
//! [`astrolabe_core`] diagram graph. Class, sequence, state, object and
//! use-case diagrams are supported.

pub mod builder;
pub mod config;
pub mod inference;
pub mod operation;
pub mod persistence;
pub mod policy;
pub mod validation;

mod error;

pub use astrolabe_core::{element, geometry, graph, identifier, property};

pub use error::{AstrolabeError, DeserializationError};

use log::{debug, info};

use astrolabe_core::{
    Diagram, DiagramType,
    element::{Edge, Node},
    geometry::Point,
    identifier::{EdgeId, ElementId, NodeId},
    property::{PropertyName, PropertyValue},
};

use builder::DiagramBuilder;
use config::AppConfig;
use inference::SequenceInference;
use operation::{Operation, OperationProcessor};
use policy::DiagramTypeExt;
use validation::Violation;

/// One diagram being edited, with its undo history.
///
/// Every change goes through a [`DiagramBuilder`] and is recorded by an
/// [`OperationProcessor`], so it can be undone and redone.
///
/// # Examples
///
/// ```
/// use astrolabe::EditingSession;
/// use astrolabe_core::{
///     DiagramType,
///     element::{Edge, EdgeKind, Node, NodeKind},
///     geometry::Point,
/// };
///
/// let mut session = EditingSession::new(DiagramType::Sequence);
/// let client = session
///     .add_node(Node::new(NodeKind::ImplicitParameter), Point::new(0, 0))
///     .unwrap();
/// let server = session
///     .add_node(Node::new(NodeKind::ImplicitParameter), Point::new(120, 0))
///     .unwrap();
///
/// // Connecting two lifelines creates their activations.
/// session.connect(Edge::new(EdgeKind::Call, client, server)).unwrap();
/// assert_eq!(session.diagram().node_count(), 4);
/// assert!(session.is_valid());
///
/// session.undo().unwrap();
/// assert_eq!(session.diagram().node_count(), 2);
/// ```
#[derive(Debug)]
pub struct EditingSession {
    diagram: Diagram,
    processor: OperationProcessor,
    config: AppConfig,
}

impl EditingSession {
    /// Create a session on an empty diagram with the default configuration.
    pub fn new(diagram_type: DiagramType) -> Self {
        Self::with_config(diagram_type, AppConfig::default())
    }

    /// Create a session on an empty diagram.
    pub fn with_config(diagram_type: DiagramType, config: AppConfig) -> Self {
        Self::from_diagram(Diagram::new(diagram_type), config)
    }

    /// Create a session editing an existing diagram, with an empty history.
    pub fn from_diagram(diagram: Diagram, config: AppConfig) -> Self {
        info!(
            diagram_type:% = diagram.diagram_type(),
            nodes = diagram.node_count(),
            edges = diagram.edge_count();
            "Opening editing session"
        );
        let processor = OperationProcessor::with_capacity(config.history().capacity());
        Self {
            diagram,
            processor,
            config,
        }
    }

    /// Create a session on a diagram decoded from JSON text.
    ///
    /// When [`ValidationConfig::reject_invalid_on_load`](config::ValidationConfig::reject_invalid_on_load)
    /// is set, a diagram with violations is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializationError`] for text that does not decode to a
    /// diagram, and [`DeserializationError::Invalid`] for a rejected diagram.
    pub fn load_json(text: &str, config: AppConfig) -> Result<Self, AstrolabeError> {
        let diagram = persistence::from_str(text)?;
        if config.validation().reject_invalid_on_load() {
            let violations = diagram
                .diagram_type()
                .policy()
                .validator()
                .violations(&diagram);
            if !violations.is_empty() {
                info!(violations = violations.len(); "Rejecting invalid diagram");
                return Err(DeserializationError::Invalid(violations).into());
            }
        }
        Ok(Self::from_diagram(diagram, config))
    }

    /// Encode the diagram as JSON text.
    pub fn to_json(&self) -> String {
        info!(nodes = self.diagram.node_count(), edges = self.diagram.edge_count(); "Saving diagram");
        persistence::to_string(&self.diagram)
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the undo history.
    pub fn history(&self) -> &OperationProcessor {
        &self.processor
    }

    fn apply(&mut self, operation: Operation) -> Result<(), AstrolabeError> {
        debug!(operation:% = operation; "Applying operation");
        self.processor
            .execute_new_operation(operation, &mut self.diagram)
    }

    /// Add `node` as a new root at `position`.
    ///
    /// # Errors
    ///
    /// See [`DiagramBuilder::create_add_node_operation`].
    pub fn add_node(&mut self, node: Node, position: Point) -> Result<NodeId, AstrolabeError> {
        let id = node.id();
        let operation = DiagramBuilder::new(&self.diagram).create_add_node_operation(node, position)?;
        self.apply(operation)?;
        Ok(id)
    }

    /// Add `node` as a child of `parent`, at `position` relative to it.
    ///
    /// # Errors
    ///
    /// See [`DiagramBuilder::create_add_child_operation`].
    pub fn add_child_node(
        &mut self,
        parent: NodeId,
        node: Node,
        position: Point,
    ) -> Result<NodeId, AstrolabeError> {
        let id = node.id();
        let operation =
            DiagramBuilder::new(&self.diagram).create_add_child_operation(parent, node, position)?;
        self.apply(operation)?;
        Ok(id)
    }

    /// Add an edge and return the id of the edge actually added.
    ///
    /// In sequence diagrams this may differ from the id of `edge`, when the
    /// message is redirected to a new activation.
    ///
    /// # Errors
    ///
    /// See [`DiagramBuilder::create_add_edge_operation`].
    pub fn connect(&mut self, edge: Edge) -> Result<EdgeId, AstrolabeError> {
        let fallback = edge.id();
        let operation = DiagramBuilder::new(&self.diagram).create_add_edge_operation(edge)?;
        let id = operation.added_edge().unwrap_or(fallback);
        self.apply(operation)?;
        Ok(id)
    }

    /// Move the selected nodes by `dx` and `dy`, as one undoable step.
    ///
    /// # Errors
    ///
    /// See [`DiagramBuilder::create_move_operation`].
    pub fn move_nodes(&mut self, selection: &[NodeId], dx: i32, dy: i32) -> Result<(), AstrolabeError> {
        let operation = DiagramBuilder::new(&self.diagram).create_move_operation(selection, dx, dy)?;
        self.apply(operation)
    }

    /// Set a property of a node or an edge.
    ///
    /// # Errors
    ///
    /// See [`DiagramBuilder::create_property_change_operation`].
    pub fn set_property(
        &mut self,
        element: impl Into<ElementId>,
        name: PropertyName,
        value: PropertyValue,
    ) -> Result<(), AstrolabeError> {
        let operation = DiagramBuilder::new(&self.diagram).create_property_change_operation(
            element.into(),
            name,
            value,
        )?;
        self.apply(operation)
    }

    /// Delete the selected elements and everything their removal implies.
    ///
    /// # Errors
    ///
    /// See [`DiagramBuilder::create_remove_elements_operation`].
    pub fn delete(&mut self, selection: &[ElementId]) -> Result<(), AstrolabeError> {
        let operation =
            DiagramBuilder::new(&self.diagram).create_remove_elements_operation(selection)?;
        self.apply(operation)
    }

    /// Revert the most recent operation. Returns `false` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// See [`OperationProcessor::undo`].
    pub fn undo(&mut self) -> Result<bool, AstrolabeError> {
        self.processor.undo(&mut self.diagram)
    }

    /// Reapply the most recently undone operation. Returns `false` when there
    /// is nothing to redo.
    ///
    /// # Errors
    ///
    /// See [`OperationProcessor::redo`].
    pub fn redo(&mut self) -> Result<bool, AstrolabeError> {
        self.processor.redo(&mut self.diagram)
    }

    /// Checks the diagram against the rules of its type.
    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }

    /// Returns every rule the diagram breaks.
    pub fn violations(&self) -> Vec<Violation> {
        self.diagram
            .diagram_type()
            .policy()
            .validator()
            .violations(&self.diagram)
    }

    /// Returns the call structure of a sequence diagram, `None` for other types.
    pub fn sequence(&self) -> Option<SequenceInference<'_>> {
        (self.diagram.diagram_type() == DiagramType::Sequence)
            .then(|| SequenceInference::new(&self.diagram))
    }
}
