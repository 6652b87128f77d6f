//! JSON encoding of diagrams.
//!
//! The encoded form numbers nodes densely in pre-order and refers to them by
//! those local ids, so it does not depend on runtime identities:
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "diagram": "SequenceDiagram",
//!   "nodes": [
//!     { "id": 0, "type": "ImplicitParameter", "x": 10, "y": 0,
//!       "properties": { "name": "client" }, "children": [1] },
//!     { "id": 1, "type": "Call", "x": 0, "y": 60,
//!       "properties": { "openBottom": false }, "children": [] }
//!   ],
//!   "edges": []
//! }
//! ```
//!
//! Both directions go through the same serde structs. Decoding then only
//! builds the diagram through [`Diagram::add_root_node`],
//! [`Diagram::add_child`] and [`Diagram::add_edge`], so a decoded diagram
//! satisfies every structural invariant of the graph. Diagram-type rules are
//! not checked here; see [`EditingSession::load_json`](crate::EditingSession::load_json).

use std::collections::{HashMap, HashSet};

use log::{debug, trace};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use astrolabe_core::{
    Diagram, DiagramType,
    element::{Edge, EdgeKind, Node, NodeKind},
    geometry::Point,
    identifier::NodeId,
    property::{Properties, PropertyName, PropertyValue},
};

use crate::error::DeserializationError;

/// Version written into encoded diagrams. Informational only.
pub const FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");

fn format_version() -> String {
    FORMAT_VERSION.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct EncodedDiagram {
    #[serde(default = "format_version")]
    version: String,
    diagram: DiagramType,
    nodes: Vec<EncodedNode>,
    edges: Vec<EncodedEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncodedNode {
    id: u64,
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    children: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncodedEdge {
    #[serde(rename = "type")]
    kind: EdgeKind,
    start: u64,
    end: u64,
    #[serde(default)]
    properties: Map<String, Value>,
}

fn encode_properties(properties: &Properties) -> Map<String, Value> {
    properties
        .iter()
        .map(|(name, value)| {
            // Property values are plain strings, booleans and unit variants.
            let value = serde_json::to_value(value).unwrap_or(Value::Null);
            (name.as_str().to_string(), value)
        })
        .collect()
}

/// Encodes `diagram` as a JSON value.
pub fn encode(diagram: &Diagram) -> Value {
    let order = diagram.all_node_ids();
    let local: HashMap<NodeId, u64> = order
        .iter()
        .zip(0..)
        .map(|(id, local)| (*id, local))
        .collect();
    let local_id = |id: &NodeId| local.get(id).copied().unwrap_or_default();

    let nodes = order
        .iter()
        .filter_map(|id| diagram.node(*id))
        .map(|node| EncodedNode {
            id: local_id(&node.id()),
            kind: node.kind(),
            x: node.position().x(),
            y: node.position().y(),
            properties: encode_properties(node.properties()),
            children: diagram.children(node.id()).iter().map(local_id).collect(),
        })
        .collect();
    let edges = diagram
        .all_edges()
        .map(|edge| EncodedEdge {
            kind: edge.kind(),
            start: local_id(&edge.start()),
            end: local_id(&edge.end()),
            properties: encode_properties(edge.properties()),
        })
        .collect();

    let encoded = EncodedDiagram {
        version: format_version(),
        diagram: diagram.diagram_type(),
        nodes,
        edges,
    };
    debug!(nodes = diagram.node_count(), edges = diagram.edge_count(); "Encoded diagram");
    // Every field serializes to a JSON-compatible value with string keys.
    serde_json::to_value(encoded).unwrap_or(Value::Null)
}

/// Encodes `diagram` as pretty-printed JSON text.
pub fn to_string(diagram: &Diagram) -> String {
    let value = encode(diagram);
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// Parses JSON text and decodes the diagram it holds.
///
/// # Errors
///
/// See [`decode`].
pub fn from_str(text: &str) -> Result<Diagram, DeserializationError> {
    let encoded: EncodedDiagram = serde_json::from_str(text)?;
    build(encoded)
}

fn property_error(name: &str, reason: impl ToString) -> DeserializationError {
    DeserializationError::Property {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn enumerated<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, DeserializationError> {
    T::deserialize(value).map_err(|err| property_error(key, err))
}

/// Decodes one property value using the variant the schema holds for it.
fn property_value(
    key: &str,
    schema: &PropertyValue,
    value: &Value,
) -> Result<PropertyValue, DeserializationError> {
    let decoded = match schema {
        PropertyValue::Text(_) => value.as_str().map(PropertyValue::text),
        PropertyValue::Flag(_) => value.as_bool().map(PropertyValue::Flag),
        PropertyValue::Directionality(_) => {
            Some(PropertyValue::Directionality(enumerated(key, value)?))
        }
        PropertyValue::Generalization(_) => {
            Some(PropertyValue::Generalization(enumerated(key, value)?))
        }
        PropertyValue::Aggregation(_) => Some(PropertyValue::Aggregation(enumerated(key, value)?)),
        PropertyValue::UseCaseDependency(_) => {
            Some(PropertyValue::UseCaseDependency(enumerated(key, value)?))
        }
    };
    decoded.ok_or_else(|| property_error(key, format!("expected a {} value", schema.variant_name())))
}

/// Decodes the `properties` object of an element against the element's
/// schema. Properties absent from the object keep their default.
fn decode_properties(
    encoded: &Map<String, Value>,
    schema: &Properties,
) -> Result<Vec<(PropertyName, PropertyValue)>, DeserializationError> {
    let mut decoded = Vec::with_capacity(encoded.len());
    for (key, raw) in encoded {
        let name = PropertyName::deserialize(Value::String(key.clone()))
            .map_err(|_| property_error(key, "unknown property"))?;
        let current = schema
            .get(name)
            .ok_or_else(|| property_error(key, "not defined for this element"))?;
        decoded.push((name, property_value(key, current, raw)?));
    }
    Ok(decoded)
}

fn decode_node(encoded: &EncodedNode) -> Result<Node, DeserializationError> {
    let mut node = Node::at(encoded.kind, Point::new(encoded.x, encoded.y));
    for (name, value) in decode_properties(&encoded.properties, &encoded.kind.default_properties())? {
        node.set_property(name, value)
            .map_err(|err| property_error(name.as_str(), err))?;
    }
    Ok(node)
}

/// Checks the parent relation of the encoded nodes and returns the root ids
/// in the order they were listed.
fn resolve_roots(
    order: &[u64],
    children: &HashMap<u64, &[u64]>,
) -> Result<Vec<u64>, DeserializationError> {
    let mut parented = HashSet::new();
    for id in order {
        for child in children[id] {
            if !children.contains_key(child) {
                return Err(DeserializationError::DanglingReference(*child));
            }
            if !parented.insert(*child) {
                return Err(DeserializationError::MultipleParents(*child));
            }
        }
    }

    let roots: Vec<u64> = order
        .iter()
        .copied()
        .filter(|id| !parented.contains(id))
        .collect();

    let mut reached = HashSet::new();
    let mut pending = roots.clone();
    while let Some(id) = pending.pop() {
        if reached.insert(id) {
            pending.extend(children[&id].iter().copied());
        }
    }
    // With one parent per node, anything unreachable from a root sits on a cycle.
    if let Some(id) = order.iter().find(|id| !reached.contains(id)) {
        return Err(DeserializationError::Cycle(*id));
    }
    Ok(roots)
}

/// Decodes a diagram from a JSON value.
///
/// # Errors
///
/// Fails with [`DeserializationError::Json`] when the value does not have
/// the shape of an encoded diagram: a missing field, a wrongly typed field,
/// or an unknown diagram, node or edge type. Fails with the other variants
/// on a property that does not fit its element, a duplicate node id, a
/// reference to an undefined node, a node listed as the child of two nodes,
/// a parent cycle, a child its parent's kind does not accept, or a node
/// whose absolute position leaves the `i32` range.
pub fn decode(value: &Value) -> Result<Diagram, DeserializationError> {
    build(EncodedDiagram::deserialize(value)?)
}

fn build(encoded: EncodedDiagram) -> Result<Diagram, DeserializationError> {
    let mut order = Vec::with_capacity(encoded.nodes.len());
    let mut by_id = HashMap::with_capacity(encoded.nodes.len());
    for node in &encoded.nodes {
        if by_id.insert(node.id, node).is_some() {
            return Err(DeserializationError::DuplicateId(node.id));
        }
        order.push(node.id);
    }
    let children: HashMap<u64, &[u64]> = by_id
        .iter()
        .map(|(id, node)| (*id, node.children.as_slice()))
        .collect();
    let roots = resolve_roots(&order, &children)?;

    let mut diagram = Diagram::new(encoded.diagram);
    let mut runtime = HashMap::with_capacity(by_id.len());
    let mut pending: Vec<(Option<NodeId>, u64)> =
        roots.into_iter().rev().map(|id| (None, id)).collect();
    while let Some((parent, id)) = pending.pop() {
        let Some(encoded_node) = by_id.get(&id) else {
            continue;
        };
        let node = decode_node(encoded_node)?;
        let node_id = match parent {
            Some(parent) => diagram.add_child(parent, node)?,
            None => diagram.add_root_node(node)?,
        };
        trace!(local_id = id, node_id:% = node_id; "Decoded node");
        runtime.insert(id, node_id);
        pending.extend(encoded_node.children.iter().rev().map(|child| (Some(node_id), *child)));
    }

    for encoded_edge in &encoded.edges {
        let endpoint = |local: u64| {
            runtime
                .get(&local)
                .copied()
                .ok_or(DeserializationError::DanglingReference(local))
        };
        let mut edge = Edge::new(
            encoded_edge.kind,
            endpoint(encoded_edge.start)?,
            endpoint(encoded_edge.end)?,
        );
        for (name, value) in
            decode_properties(&encoded_edge.properties, &encoded_edge.kind.default_properties())?
        {
            edge.set_property(name, value)
                .map_err(|err| property_error(name.as_str(), err))?;
        }
        diagram.add_edge(edge)?;
    }

    // Every absolute position must be representable.
    diagram.extent()?;

    debug!(
        diagram_type:% = encoded.diagram,
        version = encoded.version.as_str(),
        nodes = diagram.node_count(),
        edges = diagram.edge_count();
        "Decoded diagram"
    );
    Ok(diagram)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use astrolabe_core::{GraphError, property::Directionality};

    use super::*;

    fn sample() -> Diagram {
        let mut diagram = Diagram::new(DiagramType::Class);
        let package = diagram
            .add_root_node(Node::at(NodeKind::Package, Point::new(10, 10)).with_name("shapes"))
            .unwrap();
        let circle = diagram
            .add_child(package, Node::at(NodeKind::Class, Point::new(5, 20)).with_name("Circle"))
            .unwrap();
        let shape = diagram
            .add_root_node(Node::at(NodeKind::Interface, Point::new(200, 10)).with_name("Shape"))
            .unwrap();
        let mut association = Edge::new(EdgeKind::Association, circle, shape);
        association
            .set_property(
                PropertyName::Directionality,
                PropertyValue::Directionality(Directionality::End),
            )
            .unwrap();
        diagram.add_edge(association).unwrap();
        diagram
            .add_edge(Edge::new(EdgeKind::Generalization, circle, shape))
            .unwrap();
        diagram
    }

    #[test]
    fn test_encode_uses_dense_preorder_ids() {
        let value = encode(&sample());

        assert_eq!(value["diagram"], "ClassDiagram");
        assert_eq!(value["nodes"][0]["type"], "Package");
        assert_eq!(value["nodes"][0]["children"], json!([1]));
        assert_eq!(value["nodes"][1]["properties"]["name"], "Circle");
        assert_eq!(value["nodes"][2]["id"], 2);
        assert_eq!(value["edges"][0]["start"], 1);
        assert_eq!(value["edges"][0]["end"], 2);
        assert_eq!(value["edges"][0]["properties"]["directionality"], "End");
    }

    #[test]
    fn test_decode_preserves_structure() {
        let original = sample();

        let decoded = from_str(&to_string(&original)).unwrap();

        assert_eq!(encode(&decoded), encode(&original));
        assert_eq!(decoded.node_count(), 3);
        assert_eq!(decoded.edge_count(), 2);
    }

    fn json_error(result: Result<Diagram, DeserializationError>) -> String {
        match result {
            Err(DeserializationError::Json(err)) => err.to_string(),
            other => panic!("expected a JSON shape error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_empty_object_fails() {
        let message = json_error(decode(&json!({})));

        assert!(message.contains("missing field `diagram`"), "{message}");
    }

    #[test]
    fn test_decode_incomplete_object_fails() {
        let message = json_error(decode(&json!({ "diagram": "StateDiagram", "nodes": [] })));

        assert!(message.contains("missing field `edges`"), "{message}");
    }

    #[test]
    fn test_decode_empty_diagram() {
        let diagram =
            decode(&json!({ "diagram": "UseCaseDiagram", "nodes": [], "edges": [] })).unwrap();

        assert_eq!(diagram.diagram_type(), DiagramType::UseCase);
        assert!(diagram.is_empty());
    }

    #[test]
    fn test_decode_unknown_types() {
        let diagram = json_error(decode(&json!({
            "diagram": "FlowChart",
            "nodes": [],
            "edges": []
        })));
        assert!(diagram.contains("unknown variant `FlowChart`"), "{diagram}");

        let node = json_error(decode(&json!({
            "diagram": "ClassDiagram",
            "nodes": [{ "id": 0, "type": "Table" }],
            "edges": []
        })));
        assert!(node.contains("unknown variant `Table`"), "{node}");
    }

    #[test]
    fn test_decode_rejects_wrongly_typed_field() {
        let message = json_error(decode(&json!({
            "diagram": "ClassDiagram",
            "nodes": [{ "id": 0, "type": "Class", "x": "left" }],
            "edges": []
        })));

        assert!(message.contains("invalid type"), "{message}");
    }

    #[test]
    fn test_decode_rejects_overflowing_position() {
        let result = from_str(
            r#"{
                "diagram": "ClassDiagram",
                "nodes": [
                    { "id": 0, "type": "Package", "x": 2147483647, "y": 0, "children": [1] },
                    { "id": 1, "type": "Class", "x": 1, "y": 0 }
                ],
                "edges": []
            }"#,
        );

        assert!(matches!(
            result,
            Err(DeserializationError::Graph(GraphError::CoordinateOverflow(_)))
        ));
    }

    #[test]
    fn test_decode_accepts_extreme_siblings() {
        let diagram = decode(&json!({
            "diagram": "ClassDiagram",
            "nodes": [
                { "id": 0, "type": "Class", "x": -2000000000 },
                { "id": 1, "type": "Class", "x": 2000000000 }
            ],
            "edges": []
        }))
        .unwrap();

        let extent = diagram.extent().unwrap().unwrap();
        assert_eq!(extent.dimension().width(), 4_000_000_000);
    }

    #[test]
    fn test_decode_rejects_bad_references() {
        let dangling = decode(&json!({
            "diagram": "ClassDiagram",
            "nodes": [{ "id": 0, "type": "Class" }],
            "edges": [{ "type": "Dependency", "start": 0, "end": 7 }]
        }));
        assert!(matches!(dangling, Err(DeserializationError::DanglingReference(7))));

        let duplicate = decode(&json!({
            "diagram": "ClassDiagram",
            "nodes": [{ "id": 0, "type": "Class" }, { "id": 0, "type": "Class" }],
            "edges": []
        }));
        assert!(matches!(duplicate, Err(DeserializationError::DuplicateId(0))));
    }

    #[test]
    fn test_decode_rejects_bad_parents() {
        let shared = decode(&json!({
            "diagram": "ClassDiagram",
            "nodes": [
                { "id": 0, "type": "Package", "children": [2] },
                { "id": 1, "type": "Package", "children": [2] },
                { "id": 2, "type": "Class" }
            ],
            "edges": []
        }));
        assert!(matches!(shared, Err(DeserializationError::MultipleParents(2))));

        let cycle = decode(&json!({
            "diagram": "ClassDiagram",
            "nodes": [
                { "id": 0, "type": "Package", "children": [1] },
                { "id": 1, "type": "Package", "children": [0] }
            ],
            "edges": []
        }));
        assert!(matches!(cycle, Err(DeserializationError::Cycle(0))));
    }

    #[test]
    fn test_decode_rejects_property_mismatch() {
        let wrong_type = decode(&json!({
            "diagram": "ClassDiagram",
            "nodes": [{ "id": 0, "type": "Class", "properties": { "name": true } }],
            "edges": []
        }));
        assert!(matches!(wrong_type, Err(DeserializationError::Property { .. })));

        let undefined = decode(&json!({
            "diagram": "StateDiagram",
            "nodes": [{ "id": 0, "type": "InitialState", "properties": { "name": "start" } }],
            "edges": []
        }));
        assert!(matches!(undefined, Err(DeserializationError::Property { .. })));
    }

    #[test]
    fn test_decode_rejects_illegal_child() {
        let result = decode(&json!({
            "diagram": "ClassDiagram",
            "nodes": [
                { "id": 0, "type": "Class", "children": [1] },
                { "id": 1, "type": "Class" }
            ],
            "edges": []
        }));

        assert!(matches!(result, Err(DeserializationError::Graph(_))));
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(matches!(from_str("{ nodes"), Err(DeserializationError::Json(_))));
    }
}
