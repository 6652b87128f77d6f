//! Diagram elements: nodes, edges and their kinds.
//!
//! Nodes and edges are plain values carrying a stable identity, a closed kind
//! tag and a typed [`Properties`] bag whose schema is fixed by the kind.
//! Elements are built detached and then handed to a
//! [`Diagram`](crate::graph::Diagram), which owns them from then on. Once
//! owned, they are mutated only through the diagram.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::Point,
    identifier::{EdgeId, NodeId},
    property::{
        AggregationType, Directionality, GeneralizationType, Properties, PropertyError,
        PropertyName, PropertyValue, UseCaseDependencyType,
    },
};

/// The closed set of node kinds across all diagram types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Class,
    Interface,
    Package,
    PackageDescription,
    State,
    InitialState,
    FinalState,
    Object,
    Field,
    Actor,
    UseCase,
    /// A sequence-diagram lifeline.
    ImplicitParameter,
    /// A sequence-diagram activation box, always owned by a lifeline.
    Call,
    Note,
    /// A dimensionless anchor used as the free end of note edges.
    Point,
}

impl NodeKind {
    /// Every node kind, in declaration order.
    pub const ALL: [NodeKind; 15] = [
        NodeKind::Class,
        NodeKind::Interface,
        NodeKind::Package,
        NodeKind::PackageDescription,
        NodeKind::State,
        NodeKind::InitialState,
        NodeKind::FinalState,
        NodeKind::Object,
        NodeKind::Field,
        NodeKind::Actor,
        NodeKind::UseCase,
        NodeKind::ImplicitParameter,
        NodeKind::Call,
        NodeKind::Note,
        NodeKind::Point,
    ];

    /// Returns the external name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Class => "Class",
            NodeKind::Interface => "Interface",
            NodeKind::Package => "Package",
            NodeKind::PackageDescription => "PackageDescription",
            NodeKind::State => "State",
            NodeKind::InitialState => "InitialState",
            NodeKind::FinalState => "FinalState",
            NodeKind::Object => "Object",
            NodeKind::Field => "Field",
            NodeKind::Actor => "Actor",
            NodeKind::UseCase => "UseCase",
            NodeKind::ImplicitParameter => "ImplicitParameter",
            NodeKind::Call => "Call",
            NodeKind::Note => "Note",
            NodeKind::Point => "Point",
        }
    }

    /// Returns the property schema, with default values, for this kind.
    pub fn default_properties(self) -> Properties {
        let text = |name| (name, PropertyValue::text(""));
        match self {
            NodeKind::Class => Properties::from_schema([
                text(PropertyName::Name),
                text(PropertyName::Attributes),
                text(PropertyName::Methods),
            ]),
            NodeKind::Interface => {
                Properties::from_schema([text(PropertyName::Name), text(PropertyName::Methods)])
            }
            NodeKind::PackageDescription => {
                Properties::from_schema([text(PropertyName::Name), text(PropertyName::Contents)])
            }
            NodeKind::Field => {
                Properties::from_schema([text(PropertyName::Name), text(PropertyName::Value)])
            }
            NodeKind::Package
            | NodeKind::State
            | NodeKind::Object
            | NodeKind::Actor
            | NodeKind::UseCase
            | NodeKind::ImplicitParameter => Properties::from_schema([text(PropertyName::Name)]),
            NodeKind::Call => {
                Properties::from_schema([(PropertyName::OpenBottom, PropertyValue::Flag(false))])
            }
            NodeKind::Note => Properties::from_schema([text(PropertyName::Contents)]),
            NodeKind::InitialState | NodeKind::FinalState | NodeKind::Point => {
                Properties::default()
            }
        }
    }

    /// Checks whether a node of this kind can own a child of `child` kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use astrolabe_core::element::NodeKind;
    ///
    /// assert!(NodeKind::ImplicitParameter.accepts_child(NodeKind::Call));
    /// assert!(NodeKind::Package.accepts_child(NodeKind::Package));
    /// assert!(!NodeKind::Class.accepts_child(NodeKind::Class));
    /// ```
    pub fn accepts_child(self, child: NodeKind) -> bool {
        match self {
            NodeKind::Package => matches!(
                child,
                NodeKind::Class
                    | NodeKind::Interface
                    | NodeKind::Package
                    | NodeKind::PackageDescription
            ),
            NodeKind::ImplicitParameter => child == NodeKind::Call,
            NodeKind::Object => child == NodeKind::Field,
            _ => false,
        }
    }

    /// Checks whether nodes of this kind may only exist as children.
    pub fn is_child_only(self) -> bool {
        matches!(self, NodeKind::Call | NodeKind::Field)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The closed set of edge kinds across all diagram types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Dependency,
    Generalization,
    Aggregation,
    Association,
    StateTransition,
    ObjectReference,
    ObjectCollaboration,
    UseCaseAssociation,
    UseCaseGeneralization,
    UseCaseDependency,
    Call,
    Return,
    Constructor,
    Note,
}

impl EdgeKind {
    /// Every edge kind, in declaration order.
    pub const ALL: [EdgeKind; 14] = [
        EdgeKind::Dependency,
        EdgeKind::Generalization,
        EdgeKind::Aggregation,
        EdgeKind::Association,
        EdgeKind::StateTransition,
        EdgeKind::ObjectReference,
        EdgeKind::ObjectCollaboration,
        EdgeKind::UseCaseAssociation,
        EdgeKind::UseCaseGeneralization,
        EdgeKind::UseCaseDependency,
        EdgeKind::Call,
        EdgeKind::Return,
        EdgeKind::Constructor,
        EdgeKind::Note,
    ];

    /// Returns the external name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            EdgeKind::Dependency => "Dependency",
            EdgeKind::Generalization => "Generalization",
            EdgeKind::Aggregation => "Aggregation",
            EdgeKind::Association => "Association",
            EdgeKind::StateTransition => "StateTransition",
            EdgeKind::ObjectReference => "ObjectReference",
            EdgeKind::ObjectCollaboration => "ObjectCollaboration",
            EdgeKind::UseCaseAssociation => "UseCaseAssociation",
            EdgeKind::UseCaseGeneralization => "UseCaseGeneralization",
            EdgeKind::UseCaseDependency => "UseCaseDependency",
            EdgeKind::Call => "Call",
            EdgeKind::Return => "Return",
            EdgeKind::Constructor => "Constructor",
            EdgeKind::Note => "Note",
        }
    }

    /// Returns the property schema, with default values, for this kind.
    pub fn default_properties(self) -> Properties {
        let text = |name| (name, PropertyValue::text(""));
        match self {
            EdgeKind::Dependency => Properties::from_schema([
                text(PropertyName::MiddleLabel),
                (
                    PropertyName::Directionality,
                    PropertyValue::Directionality(Directionality::End),
                ),
            ]),
            EdgeKind::Generalization => Properties::from_schema([(
                PropertyName::GeneralizationType,
                PropertyValue::Generalization(GeneralizationType::Inheritance),
            )]),
            EdgeKind::Aggregation => Properties::from_schema([
                (
                    PropertyName::AggregationType,
                    PropertyValue::Aggregation(AggregationType::Aggregation),
                ),
                text(PropertyName::StartLabel),
                text(PropertyName::MiddleLabel),
                text(PropertyName::EndLabel),
            ]),
            EdgeKind::Association => Properties::from_schema([
                (
                    PropertyName::Directionality,
                    PropertyValue::Directionality(Directionality::None),
                ),
                text(PropertyName::StartLabel),
                text(PropertyName::MiddleLabel),
                text(PropertyName::EndLabel),
            ]),
            EdgeKind::StateTransition
            | EdgeKind::ObjectCollaboration
            | EdgeKind::Return
            | EdgeKind::Constructor => Properties::from_schema([text(PropertyName::MiddleLabel)]),
            EdgeKind::UseCaseDependency => Properties::from_schema([(
                PropertyName::UseCaseDependencyType,
                PropertyValue::UseCaseDependency(UseCaseDependencyType::None),
            )]),
            EdgeKind::Call => Properties::from_schema([
                text(PropertyName::MiddleLabel),
                (PropertyName::Signal, PropertyValue::Flag(false)),
            ]),
            EdgeKind::ObjectReference
            | EdgeKind::UseCaseAssociation
            | EdgeKind::UseCaseGeneralization
            | EdgeKind::Note => Properties::default(),
        }
    }

    /// Checks whether the edge activates its end node: a call or a constructor.
    pub fn is_call_flow(self) -> bool {
        matches!(self, EdgeKind::Call | EdgeKind::Constructor)
    }

    /// Checks whether the edge belongs to the sequence-diagram message family.
    pub fn is_message(self) -> bool {
        matches!(self, EdgeKind::Call | EdgeKind::Constructor | EdgeKind::Return)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A diagram node.
///
/// # Examples
///
/// ```
/// use astrolabe_core::{element::{Node, NodeKind}, geometry::Point};
///
/// let node = Node::at(NodeKind::ImplicitParameter, Point::new(10, 0)).with_name("client");
///
/// assert_eq!(node.kind(), NodeKind::ImplicitParameter);
/// assert_eq!(node.name(), Some("client"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    position: Point,
    properties: Properties,
}

impl Node {
    /// Creates a detached node of the given kind at the origin.
    pub fn new(kind: NodeKind) -> Self {
        Self::at(kind, Point::default())
    }

    /// Creates a detached node of the given kind at `position`.
    pub fn at(kind: NodeKind, position: Point) -> Self {
        Self {
            id: NodeId::next(),
            kind,
            position,
            properties: kind.default_properties(),
        }
    }

    /// Sets the name of a detached node, if its kind has one.
    ///
    /// Kinds without a name property are returned unchanged.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        if self.properties.contains(PropertyName::Name) {
            let _ = self
                .properties
                .set(PropertyName::Name, PropertyValue::text(name));
        }
        self
    }

    /// Places a detached node at `position`.
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the position, relative to the parent node for children.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Returns the value of the `name` property, if the kind has one.
    pub fn name(&self) -> Option<&str> {
        self.properties.text(PropertyName::Name)
    }

    /// Updates a property and returns its previous value.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError`] when the update does not fit the kind's schema.
    pub fn set_property(
        &mut self,
        name: PropertyName,
        value: PropertyValue,
    ) -> Result<PropertyValue, PropertyError> {
        self.properties.set(name, value)
    }

    pub(crate) fn set_position(&mut self, position: Point) -> Point {
        std::mem::replace(&mut self.position, position)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) if !name.is_empty() => write!(f, "{} {} '{}'", self.kind, self.id, name),
            _ => write!(f, "{} {}", self.kind, self.id),
        }
    }
}

/// A directed diagram edge.
///
/// The endpoints are fixed at construction; reconnecting an edge means
/// removing it and adding a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    id: EdgeId,
    kind: EdgeKind,
    start: NodeId,
    end: NodeId,
    properties: Properties,
}

impl Edge {
    /// Creates a detached edge from `start` to `end`.
    pub fn new(kind: EdgeKind, start: NodeId, end: NodeId) -> Self {
        Self {
            id: EdgeId::next(),
            kind,
            start,
            end,
            properties: kind.default_properties(),
        }
    }

    /// Creates a new edge with the kind and properties of this one between
    /// other endpoints.
    pub fn redirected(&self, start: NodeId, end: NodeId) -> Self {
        Self {
            id: EdgeId::next(),
            kind: self.kind,
            start,
            end,
            properties: self.properties.clone(),
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn end(&self) -> NodeId {
        self.end
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Checks whether `node` is one of the endpoints.
    pub fn touches(&self, node: NodeId) -> bool {
        self.start == node || self.end == node
    }

    /// Updates a property and returns its previous value.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError`] when the update does not fit the kind's schema.
    pub fn set_property(
        &mut self,
        name: PropertyName,
        value: PropertyValue,
    ) -> Result<PropertyValue, PropertyError> {
        self.properties.set(name, value)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({} -> {})", self.kind, self.id, self.start, self.end)
    }
}
