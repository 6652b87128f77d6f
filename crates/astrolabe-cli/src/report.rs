//! Plain-text structural report of a diagram.
//!
//! Nodes are labelled by their pre-order position (`#0`, `#1`, ...) so a
//! report is stable across runs; edges by their index in the diagram.

use std::{collections::HashMap, fmt};

use astrolabe::{EditingSession, validation::Violation};
use astrolabe_core::{
    Diagram,
    element::NodeKind,
    identifier::{ElementId, NodeId},
};

/// Report over the diagram of a session.
pub struct Report<'a> {
    session: &'a EditingSession,
    violations: Vec<Violation>,
    labels: HashMap<NodeId, usize>,
}

impl<'a> Report<'a> {
    /// Validates the diagram of `session` and prepares its report.
    pub fn new(session: &'a EditingSession) -> Self {
        let labels = session
            .diagram()
            .all_node_ids()
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();
        Self {
            session,
            violations: session.violations(),
            labels,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    fn diagram(&self) -> &'a Diagram {
        self.session.diagram()
    }

    fn node_label(&self, id: NodeId) -> String {
        let index = self.labels.get(&id).copied().unwrap_or_default();
        match self.diagram().node(id) {
            Some(node) => match node.name() {
                Some(name) if !name.is_empty() => format!("#{index} {} '{name}'", node.kind()),
                _ => format!("#{index} {}", node.kind()),
            },
            None => format!("#{index}"),
        }
    }

    fn element_label(&self, element: ElementId) -> String {
        match element {
            ElementId::Node(id) => self.node_label(id),
            ElementId::Edge(id) => match self.diagram().edge_index(id) {
                Some(index) => format!("edge {index}"),
                None => "edge ?".to_string(),
            },
        }
    }

    fn write_sequence(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(sequence) = self.session.sequence() else {
            return Ok(());
        };

        match sequence.entry_points().as_slice() {
            [] => writeln!(f, "entry point: none")?,
            [entry] => writeln!(f, "entry point: {}", self.node_label(*entry))?,
            entries => writeln!(f, "entry point: ambiguous ({} candidates)", entries.len())?,
        }

        writeln!(f, "calls:")?;
        for call in self
            .diagram()
            .all_nodes()
            .filter(|node| node.kind() == NodeKind::Call)
        {
            let caller = sequence
                .caller(call.id())
                .map_or_else(|| "-".to_string(), |caller| self.node_label(caller));
            writeln!(
                f,
                "  {} caller={} depth={}",
                self.node_label(call.id()),
                caller,
                sequence.nesting_depth(call.id())
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diagram = self.diagram();
        writeln!(f, "diagram: {}", diagram.diagram_type())?;
        writeln!(f, "nodes: {}", diagram.node_count())?;
        writeln!(f, "edges: {}", diagram.edge_count())?;
        match diagram.extent() {
            Ok(Some(extent)) => {
                let (min, max) = (extent.origin(), extent.max_point());
                writeln!(
                    f,
                    "extent: ({}, {}) to ({}, {})",
                    min.x(),
                    min.y(),
                    max.x(),
                    max.y()
                )?;
            }
            Ok(None) => writeln!(f, "extent: empty")?,
            Err(err) => writeln!(f, "extent: unavailable ({err})")?,
        }

        if self.violations.is_empty() {
            writeln!(f, "violations: none")?;
        } else {
            writeln!(f, "violations: {}", self.violations.len())?;
            for violation in &self.violations {
                writeln!(
                    f,
                    "  {} {}: {}",
                    violation.code(),
                    self.element_label(violation.element()),
                    violation.message()
                )?;
            }
        }

        self.write_sequence(f)
    }
}
