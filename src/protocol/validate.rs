//! Packet validation
//!
//! Structural reconciliation of a graph header against its buffer, and
//! semantic bounds checks on decoded packets. Reconciliation outcomes and
//! self loops are [`Flag`]s: recorded, never fatal. Semantic failures are
//! [`ValidationError`]s: reported, never corrected.

use serde::Serialize;
use thiserror::Error;

use super::{
    GraphEdge, GraphPacket, PositionPacket, COORDINATE_MAX, COORDINATE_MIN, GRAPH_EDGE_SIZE,
    GRAPH_HEADER_SIZE, MAX_EDGES,
};

/// Recoverable or advisory conditions attached to a parsed packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "flag", rename_all = "snake_case")]
pub enum Flag {
    /// Declared edge count was above the ceiling and was clamped
    EdgeCountExceeded { declared: u16 },
    /// Buffer held fewer complete edges than expected
    Truncated { expected: u16, available: u16 },
    /// Edge at `index` has identical source and target
    SelfLoop { index: usize, node_id: u16 },
}

impl Flag {
    /// Advisory flags never cause rejection
    pub fn is_advisory(&self) -> bool {
        matches!(self, Flag::SelfLoop { .. })
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flag::EdgeCountExceeded { declared } => {
                write!(f, "edge count {} exceeds ceiling {}", declared, MAX_EDGES)
            }
            Flag::Truncated { expected, available } => {
                write!(f, "truncated: {} edges expected, {} present", expected, available)
            }
            Flag::SelfLoop { index, node_id } => {
                write!(f, "self loop at edge {} (node {})", index, node_id)
            }
        }
    }
}

/// Semantic validation failures
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Invalid node id: {node_id}")]
    InvalidNodeId { node_id: u16 },

    #[error("Coordinate {axis} out of range: {value}")]
    OutOfRange { axis: Axis, value: f32 },

    #[error("Invalid sender id: {sender_id}")]
    InvalidSenderId { sender_id: u16 },

    #[error("Invalid edge count: {edge_count} (max: {max})", max = MAX_EDGES)]
    InvalidEdgeCount { edge_count: u16 },

    #[error("Edge count mismatch: declared {declared}, decoded {actual}")]
    EdgeCountMismatch { declared: u16, actual: usize },
}

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// Result of reconciling a declared edge count with the buffer it came in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Number of edges that are safe to read
    pub effective_count: usize,
    pub flags: Vec<Flag>,
}

/// Derive how many edges can be read from a buffer of `buffer_len` bytes
/// whose header claims `declared_count`.
///
/// First clamp to the ceiling, then to the number of complete edges present.
pub fn reconcile_edge_count(declared_count: u16, buffer_len: usize) -> Reconciliation {
    let mut flags = Vec::new();
    let mut effective_count = declared_count as usize;

    if effective_count > MAX_EDGES {
        effective_count = MAX_EDGES;
        flags.push(Flag::EdgeCountExceeded {
            declared: declared_count,
        });
    }

    let available = buffer_len.saturating_sub(GRAPH_HEADER_SIZE) / GRAPH_EDGE_SIZE;
    if available < effective_count {
        flags.push(Flag::Truncated {
            expected: effective_count as u16,
            available: available as u16,
        });
        effective_count = available;
    }

    Reconciliation {
        effective_count,
        flags,
    }
}

fn check_coordinate(axis: Axis, value: f32) -> Result<(), ValidationError> {
    // NaN fails the range test as well
    if (COORDINATE_MIN..=COORDINATE_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { axis, value })
    }
}

/// Check a position packet's id and coordinates
pub fn validate_position(packet: &PositionPacket) -> Result<(), ValidationError> {
    if packet.node_id == 0 {
        return Err(ValidationError::InvalidNodeId {
            node_id: packet.node_id,
        });
    }
    check_coordinate(Axis::X, packet.x)?;
    check_coordinate(Axis::Y, packet.y)?;
    Ok(())
}

/// Flag every self loop in `edges`
pub fn find_self_loops(edges: &[GraphEdge]) -> Vec<Flag> {
    edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| edge.is_self_loop())
        .map(|(index, edge)| Flag::SelfLoop {
            index,
            node_id: edge.source_id,
        })
        .collect()
}

/// Check a graph packet's header against its decoded edges.
///
/// On success returns the advisory self-loop flags; self loops alone never
/// fail validation.
pub fn validate_graph(packet: &GraphPacket) -> Result<Vec<Flag>, ValidationError> {
    if packet.sender_id == 0 {
        return Err(ValidationError::InvalidSenderId {
            sender_id: packet.sender_id,
        });
    }
    if packet.edge_count as usize > MAX_EDGES {
        return Err(ValidationError::InvalidEdgeCount {
            edge_count: packet.edge_count,
        });
    }
    if packet.edges.len() != packet.edge_count as usize {
        return Err(ValidationError::EdgeCountMismatch {
            declared: packet.edge_count,
            actual: packet.edges.len(),
        });
    }
    Ok(find_self_loops(&packet.edges))
}
