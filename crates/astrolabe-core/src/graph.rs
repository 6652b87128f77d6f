//! The diagram element graph.
//!
//! A [`Diagram`] owns every node and edge of one diagram. Nodes form a forest:
//! an ordered list of root nodes, each owning an ordered list of children.
//! Edges connect any two nodes present in the diagram and are kept in
//! insertion order.
//!
//! # Architecture
//!
//! The diagram is an arena keyed by identity:
//! - nodes live in an [`IndexMap`] from [`NodeId`] to an entry holding the
//!   node value, its parent id and its ordered child ids;
//! - roots are an ordered list of node ids;
//! - edges live in an [`IndexMap`] from [`EdgeId`] to [`Edge`], whose
//!   positional order is the edge order of the diagram.
//!
//! Removal hands back everything that was detached ([`NodeRemoval`]) so the
//! caller can put it back at the exact same positions. This is what makes
//! undo an exact inverse.
//!
//! The graph enforces structural integrity only: identities are unique, edge
//! endpoints are present, children are accepted by their parent's kind.
//! Diagram-type rules are checked by validators, outside this crate.

use std::fmt;

use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    element::{Edge, EdgeKind, Node, NodeKind},
    geometry::{Point, Rectangle},
    identifier::{EdgeId, ElementId, NodeId},
    property::{PropertyError, PropertyName, PropertyValue},
};

/// The five supported diagram types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagramType {
    #[serde(rename = "ClassDiagram")]
    Class,
    #[serde(rename = "SequenceDiagram")]
    Sequence,
    #[serde(rename = "StateDiagram")]
    State,
    #[serde(rename = "ObjectDiagram")]
    Object,
    #[serde(rename = "UseCaseDiagram")]
    UseCase,
}

impl DiagramType {
    /// Every diagram type.
    pub const ALL: [DiagramType; 5] = [
        DiagramType::Class,
        DiagramType::Sequence,
        DiagramType::State,
        DiagramType::Object,
        DiagramType::UseCase,
    ];

    /// Returns the external name of the diagram type.
    pub fn name(self) -> &'static str {
        match self {
            DiagramType::Class => "ClassDiagram",
            DiagramType::Sequence => "SequenceDiagram",
            DiagramType::State => "StateDiagram",
            DiagramType::Object => "ObjectDiagram",
            DiagramType::UseCase => "UseCaseDiagram",
        }
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by structural graph mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An edge endpoint is not part of the diagram.
    #[error("edge {edge} cannot connect: endpoint {endpoint} is not in the diagram")]
    Connection { edge: EdgeId, endpoint: NodeId },

    /// The mutation would break an identity or ordering invariant.
    #[error("illegal graph state: {0}")]
    IllegalState(String),

    #[error("node {0} is not in the diagram")]
    UnknownNode(NodeId),

    #[error("edge {0} is not in the diagram")]
    UnknownEdge(EdgeId),

    /// A position, or the sum of a node's position with its ancestors',
    /// leaves the `i32` range.
    #[error("coordinates of node {0} overflow the diagram plane")]
    CoordinateOverflow(NodeId),

    #[error("a {parent} node cannot contain a {child} node")]
    IllegalChild { parent: NodeKind, child: NodeKind },

    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Where a node sits in the forest: its parent (none for roots) and its index
/// among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub parent: Option<NodeId>,
    pub index: usize,
}

impl Placement {
    /// A root placement at `index`.
    pub fn root(index: usize) -> Self {
        Self {
            parent: None,
            index,
        }
    }

    /// A child placement under `parent` at `index`.
    pub fn child(parent: NodeId, index: usize) -> Self {
        Self {
            parent: Some(parent),
            index,
        }
    }
}

/// A detached node together with its detached descendants, in child order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTree {
    pub node: Node,
    pub children: Vec<NodeTree>,
}

impl NodeTree {
    /// A tree made of a single node.
    pub fn leaf(node: Node) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Returns the ids of every node in the tree, in pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<NodeId>) {
        ids.push(self.node.id());
        for child in &self.children {
            child.collect_ids(ids);
        }
    }
}

/// Everything detached by [`Diagram::remove_node`].
///
/// `edges` lists the cascaded edges with their index in the edge order at the
/// time of removal, ascending. Re-inserting them in that order restores the
/// original edge order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRemoval {
    pub placement: Placement,
    pub tree: NodeTree,
    pub edges: Vec<(usize, Edge)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeEntry {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A diagram: a forest of nodes plus the edges between them.
///
/// # Examples
///
/// ```
/// use astrolabe_core::{
///     element::{Edge, EdgeKind, Node, NodeKind},
///     graph::{Diagram, DiagramType},
/// };
///
/// let mut diagram = Diagram::new(DiagramType::Class);
/// let a = diagram.add_root_node(Node::new(NodeKind::Class)).unwrap();
/// let b = diagram.add_root_node(Node::new(NodeKind::Class)).unwrap();
/// diagram.add_edge(Edge::new(EdgeKind::Dependency, a, b)).unwrap();
///
/// assert_eq!(diagram.node_count(), 2);
/// assert_eq!(diagram.edge_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Diagram {
    diagram_type: DiagramType,
    nodes: IndexMap<NodeId, NodeEntry>,
    roots: Vec<NodeId>,
    edges: IndexMap<EdgeId, Edge>,
}

impl Diagram {
    /// Creates an empty diagram of the given type.
    pub fn new(diagram_type: DiagramType) -> Self {
        Self {
            diagram_type,
            nodes: IndexMap::new(),
            roots: Vec::new(),
            edges: IndexMap::new(),
        }
    }

    pub fn diagram_type(&self) -> DiagramType {
        self.diagram_type
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id).map(|entry| &entry.node)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Checks whether the element, node or edge, is in the diagram.
    pub fn contains(&self, id: ElementId) -> bool {
        match id {
            ElementId::Node(id) => self.contains_node(id),
            ElementId::Edge(id) => self.contains_edge(id),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Returns the parent of a node, or `None` for roots and unknown nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|entry| entry.parent)
    }

    /// Returns the ordered children of a node (empty for unknown nodes).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|entry| entry.children.as_slice())
            .unwrap_or_default()
    }

    /// Returns the ordered root nodes.
    pub fn root_nodes(&self) -> &[NodeId] {
        &self.roots
    }

    /// Returns where a node sits in the forest.
    pub fn placement(&self, id: NodeId) -> Option<Placement> {
        let entry = self.nodes.get(&id)?;
        let siblings = match entry.parent {
            Some(parent) => &self.nodes.get(&parent)?.children,
            None => &self.roots,
        };
        let index = siblings.iter().position(|sibling| *sibling == id)?;
        Some(Placement {
            parent: entry.parent,
            index,
        })
    }

    /// Checks whether `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Returns the ids of a node and all its descendants, in pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        if self.contains_node(id) {
            self.collect_subtree(id, &mut ids);
        }
        ids
    }

    fn collect_subtree(&self, id: NodeId, ids: &mut Vec<NodeId>) {
        ids.push(id);
        for child in self.children(id) {
            self.collect_subtree(*child, ids);
        }
    }

    /// Returns the ids of all nodes in tree pre-order: roots in order, each
    /// followed by its descendants in child order.
    pub fn all_node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.collect_subtree(*root, &mut ids);
        }
        ids
    }

    /// Returns all nodes, transitively, in the order of [`Diagram::all_node_ids`].
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.all_node_ids()
            .into_iter()
            .filter_map(|id| self.node(id))
    }

    /// Returns all edges in edge order.
    pub fn all_edges(&self) -> impl ExactSizeIterator<Item = &Edge> {
        self.edges.values()
    }

    /// Returns the position of an edge in the edge order.
    pub fn edge_index(&self, id: EdgeId) -> Option<usize> {
        self.edges.get_index_of(&id)
    }

    /// Returns the edges with `node` as either endpoint, in edge order.
    pub fn edges_connected_to(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |edge| edge.touches(node))
    }

    /// Returns the edges starting at `node`, in edge order.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |edge| edge.start() == node)
    }

    /// Returns the edges ending at `node`, in edge order.
    pub fn incoming_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |edge| edge.end() == node)
    }

    /// Returns the first edge of `kind` from `start` to `end`, if any.
    pub fn find_edge(&self, kind: EdgeKind, start: NodeId, end: NodeId) -> Option<&Edge> {
        self.edges
            .values()
            .find(|edge| edge.kind() == kind && edge.start() == start && edge.end() == end)
    }

    /// Returns the position of a node in diagram coordinates, summing the
    /// parent-relative positions of its ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] for an absent node and
    /// [`GraphError::CoordinateOverflow`] when the sum leaves the `i32` range.
    pub fn absolute_position(&self, id: NodeId) -> Result<Point, GraphError> {
        let mut position = self.node(id).ok_or(GraphError::UnknownNode(id))?.position();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            let offset = self
                .node(parent)
                .ok_or(GraphError::UnknownNode(parent))?
                .position();
            position = position
                .checked_translate(offset.x(), offset.y())
                .ok_or(GraphError::CoordinateOverflow(id))?;
            current = self.parent(parent);
        }
        Ok(position)
    }

    /// Returns the smallest rectangle holding every node position, or `None`
    /// for a diagram without nodes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CoordinateOverflow`] for the first node, in
    /// pre-order, whose absolute position is not representable.
    pub fn extent(&self) -> Result<Option<Rectangle>, GraphError> {
        let mut extent: Option<Rectangle> = None;
        for id in self.all_node_ids() {
            let point = self.absolute_position(id)?;
            extent = Some(match extent {
                Some(rect) => rect.include_point(point),
                None => Rectangle::spanning(point, point),
            });
        }
        Ok(extent)
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Appends a node to the root sequence.
    ///
    /// Identity is checked against this diagram only. A [`Node`] is owned by
    /// value, so a clone attached to another diagram is a separate copy.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IllegalState`] if a node with the same identity is
    /// already in the diagram.
    pub fn add_root_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let index = self.roots.len();
        self.insert_tree(Placement::root(index), NodeTree::leaf(node))
    }

    /// Appends a node to the children of `parent`.
    ///
    /// # Errors
    ///
    /// See [`Diagram::insert_tree`].
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId, GraphError> {
        let index = self.children(parent).len();
        self.insert_tree(Placement::child(parent, index), NodeTree::leaf(node))
    }

    /// Inserts a node among the children of `parent` at `index`.
    ///
    /// # Errors
    ///
    /// See [`Diagram::insert_tree`].
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        node: Node,
    ) -> Result<NodeId, GraphError> {
        self.insert_tree(Placement::child(parent, index), NodeTree::leaf(node))
    }

    /// Attaches a detached tree at `placement`, preserving every identity.
    ///
    /// Nothing is mutated when an error is returned.
    ///
    /// # Errors
    ///
    /// - [`GraphError::IllegalState`] if any node of the tree is already in the
    ///   diagram, appears twice in the tree, or the index is out of range.
    /// - [`GraphError::UnknownNode`] if the parent is not in the diagram.
    /// - [`GraphError::IllegalChild`] if some node of the tree is not accepted by
    ///   the node it is attached to.
    pub fn insert_tree(
        &mut self,
        placement: Placement,
        tree: NodeTree,
    ) -> Result<NodeId, GraphError> {
        self.check_tree(placement, &tree)?;

        let root_id = tree.node.id();
        match placement.parent {
            Some(parent) => {
                if let Some(entry) = self.nodes.get_mut(&parent) {
                    entry.children.insert(placement.index, root_id);
                }
            }
            None => self.roots.insert(placement.index, root_id),
        }
        self.attach(placement.parent, tree);

        trace!(
            node_id:% = root_id,
            parent:? = placement.parent,
            index = placement.index;
            "Inserted node tree"
        );
        Ok(root_id)
    }

    fn check_tree(&self, placement: Placement, tree: &NodeTree) -> Result<(), GraphError> {
        let sibling_count = match placement.parent {
            Some(parent) => {
                let entry = self
                    .nodes
                    .get(&parent)
                    .ok_or(GraphError::UnknownNode(parent))?;
                check_child(entry.node.kind(), tree.node.kind())?;
                entry.children.len()
            }
            None => self.roots.len(),
        };
        if placement.index > sibling_count {
            return Err(GraphError::IllegalState(format!(
                "insertion index {} exceeds {} siblings",
                placement.index, sibling_count
            )));
        }

        let ids = tree.ids();
        for (position, id) in ids.iter().enumerate() {
            if self.nodes.contains_key(id) || ids[..position].contains(id) {
                return Err(GraphError::IllegalState(format!(
                    "node {id} is already in the diagram"
                )));
            }
        }
        check_tree_children(tree)
    }

    fn attach(&mut self, parent: Option<NodeId>, tree: NodeTree) {
        let NodeTree { node, children } = tree;
        let id = node.id();
        let child_ids = children.iter().map(|child| child.node.id()).collect();
        self.nodes.insert(
            id,
            NodeEntry {
                node,
                parent,
                children: child_ids,
            },
        );
        for child in children {
            self.attach(Some(id), child);
        }
    }

    /// Removes a node, its descendants and every edge touching any of them.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if the node is not in the diagram.
    pub fn remove_node(&mut self, id: NodeId) -> Result<NodeRemoval, GraphError> {
        let placement = self.placement(id).ok_or(GraphError::UnknownNode(id))?;
        let removed = self.subtree(id);

        let mut indices: Vec<usize> = self
            .edges
            .values()
            .enumerate()
            .filter(|(_, edge)| removed.contains(&edge.start()) || removed.contains(&edge.end()))
            .map(|(index, _)| index)
            .collect();
        let mut edges = Vec::with_capacity(indices.len());
        while let Some(index) = indices.pop() {
            if let Some((_, edge)) = self.edges.shift_remove_index(index) {
                edges.push((index, edge));
            }
        }
        edges.reverse();

        match placement.parent {
            Some(parent) => {
                if let Some(entry) = self.nodes.get_mut(&parent) {
                    entry.children.remove(placement.index);
                }
            }
            None => {
                self.roots.remove(placement.index);
            }
        }
        let tree = self.detach(id).ok_or(GraphError::UnknownNode(id))?;

        trace!(
            node_id:% = id,
            removed_nodes = removed.len(),
            removed_edges = edges.len();
            "Removed node"
        );
        Ok(NodeRemoval {
            placement,
            tree,
            edges,
        })
    }

    fn detach(&mut self, id: NodeId) -> Option<NodeTree> {
        let entry = self.nodes.shift_remove(&id)?;
        let children = entry
            .children
            .iter()
            .filter_map(|child| self.detach(*child))
            .collect();
        Some(NodeTree {
            node: entry.node,
            children,
        })
    }

    /// Puts back everything detached by [`Diagram::remove_node`].
    ///
    /// # Errors
    ///
    /// Fails like [`Diagram::insert_tree`] and [`Diagram::insert_edge`] when the
    /// diagram no longer matches the state the removal was taken from. The
    /// tree is detached again if an edge cannot be restored.
    pub fn restore(&mut self, removal: NodeRemoval) -> Result<(), GraphError> {
        let NodeRemoval {
            placement,
            tree,
            edges,
        } = removal;
        let root_id = self.insert_tree(placement, tree)?;
        for (position, (index, edge)) in edges.iter().enumerate() {
            if let Err(err) = self.insert_edge(*index, edge.clone()) {
                for (_, inserted) in edges[..position].iter().rev() {
                    let _ = self.remove_edge(inserted.id());
                }
                let _ = self.remove_node(root_id);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Appends an edge to the edge order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Connection`] if either endpoint is not in the
    /// diagram and [`GraphError::IllegalState`] if the edge is already present.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let index = self.edges.len();
        self.insert_edge(index, edge)
    }

    /// Inserts an edge at `index` in the edge order.
    ///
    /// # Errors
    ///
    /// See [`Diagram::add_edge`]; an index past the end is an
    /// [`GraphError::IllegalState`].
    pub fn insert_edge(&mut self, index: usize, edge: Edge) -> Result<EdgeId, GraphError> {
        let id = edge.id();
        for endpoint in [edge.start(), edge.end()] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(GraphError::Connection { edge: id, endpoint });
            }
        }
        if self.edges.contains_key(&id) {
            return Err(GraphError::IllegalState(format!(
                "edge {id} is already in the diagram"
            )));
        }
        if index > self.edges.len() {
            return Err(GraphError::IllegalState(format!(
                "edge index {} exceeds {} edges",
                index,
                self.edges.len()
            )));
        }

        trace!(edge_id:% = id, kind:% = edge.kind(), index = index; "Inserted edge");
        self.edges.shift_insert(index, id, edge);
        Ok(id)
    }

    /// Removes an edge and returns it with its former index.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownEdge`] if the edge is not in the diagram.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<(usize, Edge), GraphError> {
        let (index, _, edge) = self
            .edges
            .shift_remove_full(&id)
            .ok_or(GraphError::UnknownEdge(id))?;
        trace!(edge_id:% = id, index = index; "Removed edge");
        Ok((index, edge))
    }

    /// Moves a node by `dx` and `dy` and returns its previous position.
    /// Children move with it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if the node is not in the diagram
    /// and [`GraphError::CoordinateOverflow`] if its new position is not
    /// representable. The node is left in place on error.
    pub fn translate(&mut self, id: NodeId, dx: i32, dy: i32) -> Result<Point, GraphError> {
        let current = self.node(id).ok_or(GraphError::UnknownNode(id))?.position();
        let position = current
            .checked_translate(dx, dy)
            .ok_or(GraphError::CoordinateOverflow(id))?;
        trace!(node_id:% = id, dx = dx, dy = dy; "Translated node");
        self.set_position(id, position)
    }

    /// Places a node at `position`, relative to its parent, and returns its
    /// previous position.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if the node is not in the diagram.
    pub fn set_position(&mut self, id: NodeId, position: Point) -> Result<Point, GraphError> {
        let entry = self
            .nodes
            .get_mut(&id)
            .ok_or(GraphError::UnknownNode(id))?;
        Ok(entry.node.set_position(position))
    }

    /// Updates a property of a node or edge and returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] / [`GraphError::UnknownEdge`] for
    /// absent elements and [`GraphError::Property`] on a schema mismatch.
    pub fn set_property(
        &mut self,
        element: ElementId,
        name: PropertyName,
        value: PropertyValue,
    ) -> Result<PropertyValue, GraphError> {
        let previous = match element {
            ElementId::Node(id) => self
                .nodes
                .get_mut(&id)
                .ok_or(GraphError::UnknownNode(id))?
                .node
                .set_property(name, value)?,
            ElementId::Edge(id) => self
                .edges
                .get_mut(&id)
                .ok_or(GraphError::UnknownEdge(id))?
                .set_property(name, value)?,
        };
        trace!(element:% = element, property:% = name; "Changed property");
        Ok(previous)
    }
}

fn check_child(parent: NodeKind, child: NodeKind) -> Result<(), GraphError> {
    if parent.accepts_child(child) {
        Ok(())
    } else {
        Err(GraphError::IllegalChild { parent, child })
    }
}

fn check_tree_children(tree: &NodeTree) -> Result<(), GraphError> {
    for child in &tree.children {
        check_child(tree.node.kind(), child.node.kind())?;
        check_tree_children(child)?;
    }
    Ok(())
}

impl PartialEq for Diagram {
    /// Structural equality: same type, same root order, same node values with
    /// the same parents and child order, and the same edge sequence.
    fn eq(&self, other: &Self) -> bool {
        self.diagram_type == other.diagram_type
            && self.roots == other.roots
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .all(|(id, entry)| other.nodes.get(id) == Some(entry))
            && self.edges.len() == other.edges.len()
            && self.edges.values().eq(other.edges.values())
    }
}

impl Eq for Diagram {}
