//! Running view of the swarm as seen by the analyzer
//!
//! Keeps the latest position per node and the latest edge list per graph
//! sender, plus counters for every dissection outcome.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{DiagnosticReason, Dissection};
use crate::protocol::{GraphEdge, PositionPacket, ValidationError};

/// Packet counters by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub positions: u64,
    pub graphs: u64,
    /// Parsed but carrying a flag (including advisory self loops)
    pub flagged: u64,
    /// Parsed but failing semantic validation
    pub invalid: u64,
    pub unknown: u64,
    pub too_short: u64,
    pub rejected: u64,
}

/// Latest known state of each node
#[derive(Debug, Default)]
pub struct NetworkSummary {
    positions: BTreeMap<u16, PositionPacket>,
    graphs: BTreeMap<u16, Vec<GraphEdge>>,
    counters: Counters,
}

impl NetworkSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one dissection into the summary
    pub fn record(&mut self, dissection: &Dissection) {
        match dissection {
            Dissection::Position { packet, error } => {
                self.counters.positions += 1;
                match error {
                    None => {
                        self.positions.insert(packet.node_id, *packet);
                    }
                    Some(_) => self.counters.invalid += 1,
                }
            }
            Dissection::Graph {
                packet,
                flags,
                error,
            } => {
                self.counters.graphs += 1;
                if !flags.is_empty() {
                    self.counters.flagged += 1;
                }
                if error.is_some() {
                    self.counters.invalid += 1;
                }
                // Whatever edges were parsed are still worth showing, unless
                // there is no meaningful sender to file them under
                if !matches!(error, Some(ValidationError::InvalidSenderId { .. })) {
                    self.graphs.insert(packet.sender_id, packet.edges.clone());
                }
            }
            Dissection::Diagnostic(diagnostic) => match diagnostic.reason {
                DiagnosticReason::Unknown => self.counters.unknown += 1,
                DiagnosticReason::TooShort { .. } => self.counters.too_short += 1,
                DiagnosticReason::Rejected { .. } => self.counters.rejected += 1,
            },
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    #[cfg(test)]
    pub fn position(&self, node_id: u16) -> Option<&PositionPacket> {
        self.positions.get(&node_id)
    }

    pub fn edges(&self, sender_id: u16) -> Option<&[GraphEdge]> {
        self.graphs.get(&sender_id).map(Vec::as_slice)
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    /// One line per positioned node, in id order
    pub fn lines(&self) -> Vec<String> {
        self.positions
            .values()
            .map(|p| {
                let edges = self.edges(p.node_id);
                format!(
                    "Node {}: ({:.1}, {:.1}) graph: {} edges: {}",
                    p.node_id,
                    p.x,
                    p.y,
                    if edges.is_some() { "yes" } else { "no" },
                    edges.map_or(0, <[GraphEdge]>::len)
                )
            })
            .collect()
    }
}
