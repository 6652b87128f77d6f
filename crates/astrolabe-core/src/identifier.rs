//! Stable element identities.
//!
//! Every node and edge receives a process-unique identifier when it is
//! constructed. Identity is carried by the identifier rather than by the
//! element value, so two nodes with equal properties remain distinct and a
//! node restored by undo is the *same* node it was before removal.
//!
//! Identifiers are allocated from a single global counter, which keeps
//! allocation free of any diagram borrow and makes ids unique across all
//! diagrams of the process.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// Global allocation counter shared by node and edge identifiers.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn allocate() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identity of a [`Node`](crate::element::Node).
///
/// # Examples
///
/// ```
/// use astrolabe_core::identifier::NodeId;
///
/// let a = NodeId::next();
/// let b = NodeId::next();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocates a fresh node identifier.
    pub fn next() -> Self {
        Self(allocate())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identity of an [`Edge`](crate::element::Edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    /// Allocates a fresh edge identifier.
    pub fn next() -> Self {
        Self(allocate())
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Identity of any diagram element, node or edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    Node(NodeId),
    Edge(EdgeId),
}

impl From<NodeId> for ElementId {
    fn from(id: NodeId) -> Self {
        ElementId::Node(id)
    }
}

impl From<EdgeId> for ElementId {
    fn from(id: EdgeId) -> Self {
        ElementId::Edge(id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Node(id) => fmt::Display::fmt(id, f),
            ElementId::Edge(id) => fmt::Display::fmt(id, f),
        }
    }
}
