//! Protocol codec for encoding/decoding packets
//!
//! Pure byte-buffer encoding; every field is placed at its literal offset
//! in little-endian order.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::{
    graph_packet_size, reconcile_edge_count, Flag, GraphEdge, GraphHeader, GraphPacket,
    PacketKind, PositionPacket, GRAPH_HEADER_SIZE, POSITION_PACKET_SIZE,
};

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Buffer too short for {kind} packet: {actual} bytes (need {needed})")]
    TooShort {
        kind: PacketKind,
        needed: usize,
        actual: usize,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// A graph packet as read from the wire, plus reconciliation flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedGraph {
    /// `edge_count` is the declared header value; `edges` is what was read
    pub packet: GraphPacket,
    /// `EdgeCountExceeded` / `Truncated` raised while reconciling
    pub flags: Vec<Flag>,
}

/// Encode a position packet
pub fn encode_position(node_id: u16, x: f32, y: f32) -> [u8; POSITION_PACKET_SIZE] {
    let mut out = [0u8; POSITION_PACKET_SIZE];
    let mut buf = &mut out[..];
    buf.put_u16_le(node_id);
    buf.put_f32_le(x);
    buf.put_f32_le(y);
    out
}

/// Decode a position packet from the first 10 bytes of `buf`
pub fn decode_position(buf: &[u8]) -> CodecResult<PositionPacket> {
    if buf.len() < POSITION_PACKET_SIZE {
        return Err(CodecError::TooShort {
            kind: PacketKind::Position,
            needed: POSITION_PACKET_SIZE,
            actual: buf.len(),
        });
    }

    let mut buf = &buf[..POSITION_PACKET_SIZE];
    let node_id = buf.get_u16_le();
    let x = buf.get_f32_le();
    let y = buf.get_f32_le();

    Ok(PositionPacket { node_id, x, y })
}

/// Encode a graph packet header followed by its edges in order.
///
/// The declared count is `edges.len()`; callers keep it within `MAX_EDGES`.
pub fn encode_graph(sender_id: u16, edges: &[GraphEdge]) -> Bytes {
    let header = GraphHeader {
        sender_id,
        edge_count: edges.len() as u16,
    };
    write_graph(header, edges)
}

/// Encode an already-built graph packet, writing its declared count as-is
/// even when it disagrees with the edges present
#[cfg(test)]
pub(crate) fn encode_graph_packet(packet: &GraphPacket) -> Bytes {
    let header = GraphHeader {
        sender_id: packet.sender_id,
        edge_count: packet.edge_count,
    };
    write_graph(header, &packet.edges)
}

fn write_graph(header: GraphHeader, edges: &[GraphEdge]) -> Bytes {
    let mut buf = BytesMut::with_capacity(graph_packet_size(edges.len()));
    buf.put_u16_le(header.sender_id);
    buf.put_u16_le(header.edge_count);
    for edge in edges {
        buf.put_u16_le(edge.source_id);
        buf.put_u16_le(edge.target_id);
        buf.put_u16_le(edge.strength);
    }
    buf.freeze()
}

/// Read only the 4-byte graph header
pub fn decode_graph_header(buf: &[u8]) -> CodecResult<GraphHeader> {
    if buf.len() < GRAPH_HEADER_SIZE {
        return Err(CodecError::TooShort {
            kind: PacketKind::Graph,
            needed: GRAPH_HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let mut buf = &buf[..GRAPH_HEADER_SIZE];
    Ok(GraphHeader {
        sender_id: buf.get_u16_le(),
        edge_count: buf.get_u16_le(),
    })
}

/// Decode a graph packet.
///
/// The number of edges read comes from [`reconcile_edge_count`], never
/// directly from the header, so a lying header cannot push reads past the
/// end of `buf`.
pub fn decode_graph(buf: &[u8]) -> CodecResult<DecodedGraph> {
    let header = decode_graph_header(buf)?;
    let reconciled = reconcile_edge_count(header.edge_count, buf.len());

    let mut body = &buf[GRAPH_HEADER_SIZE..];
    let mut edges = Vec::with_capacity(reconciled.effective_count);
    for _ in 0..reconciled.effective_count {
        let source_id = body.get_u16_le();
        let target_id = body.get_u16_le();
        let strength = body.get_u16_le();
        edges.push(GraphEdge::new(source_id, target_id, strength));
    }

    Ok(DecodedGraph {
        packet: GraphPacket {
            sender_id: header.sender_id,
            edge_count: header.edge_count,
            edges,
        },
        flags: reconciled.flags,
    })
}
