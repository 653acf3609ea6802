//! Protocol module - Defines the swarm wire protocol
//!
//! Two fixed-layout UDP payloads, little-endian throughout:
//! - Position: `node_id:u16, x:f32, y:f32` (10 bytes)
//! - Graph: `sender_id:u16, edge_count:u16, [source:u16, target:u16, strength:u16]*`
//!
//! Fields are read and written at literal byte offsets; there is no padding.

mod message;
mod codec;
mod validate;

pub use message::*;
pub use codec::*;
pub use validate::*;

/// Default port for position packets
pub const POSITION_PORT: u16 = 12345;

/// Default port for graph packets
pub const GRAPH_PORT: u16 = 12346;

/// Wire size of a position packet
pub const POSITION_PACKET_SIZE: usize = 10;

/// Wire size of the graph header: sender_id(2) + edge_count(2)
pub const GRAPH_HEADER_SIZE: usize = 4;

/// Wire size of one graph edge
pub const GRAPH_EDGE_SIZE: usize = 6;

/// Hard ceiling on edges per graph packet
pub const MAX_EDGES: usize = 50;

/// Largest well-formed graph packet (50 edges)
pub const MAX_GRAPH_PACKET_SIZE: usize = GRAPH_HEADER_SIZE + GRAPH_EDGE_SIZE * MAX_EDGES;

/// Lower bound of the coordinate domain
pub const COORDINATE_MIN: f32 = 0.0;

/// Upper bound of the coordinate domain
pub const COORDINATE_MAX: f32 = 1000.0;

/// Wire size of a graph packet carrying `edge_count` edges
pub fn graph_packet_size(edge_count: usize) -> usize {
    GRAPH_HEADER_SIZE + GRAPH_EDGE_SIZE * edge_count
}
