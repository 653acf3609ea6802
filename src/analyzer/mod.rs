//! Analyzer module - Dissects packets as they appear on the wire
//!
//! Routing is port-first with length as a secondary gate; buffers that
//! match no rule are reported, never decoded speculatively.

mod summary;

pub use summary::*;

use serde::{Deserialize, Serialize};

use crate::protocol::{
    decode_graph, decode_position, find_self_loops, validate_graph, validate_position,
    CodecError, CodecResult, Flag, GraphPacket, PacketKind, PositionPacket, ValidationError, GRAPH_HEADER_SIZE,
    GRAPH_PORT, POSITION_PACKET_SIZE, POSITION_PORT,
};

/// How defective packets are surfaced
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Show everything, annotated with the defects found
    #[default]
    BestEffort,
    /// Turn any validation failure or reconciliation flag into a rejection
    Strict,
}

/// The designated ports for each packet kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMap {
    pub position_port: u16,
    pub graph_port: u16,
}

impl Default for PortMap {
    fn default() -> Self {
        Self {
            position_port: POSITION_PORT,
            graph_port: GRAPH_PORT,
        }
    }
}

/// Why a buffer produced no usable packet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiagnosticReason {
    /// No routing rule matched
    Unknown,
    /// Buffer shorter than the minimum for its kind
    TooShort { packet_kind: PacketKind },
    /// Parsed, but refused in strict mode
    Rejected {
        packet_kind: PacketKind,
        error: Option<ValidationError>,
        flags: Vec<Flag>,
    },
}

/// A diagnostic record for a buffer that was not accepted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(flatten)]
    pub reason: DiagnosticReason,
    pub observed_length: usize,
    pub source_port: u16,
    pub destination_port: u16,
}

/// Outcome of dispatching one buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dissection {
    Position {
        packet: PositionPacket,
        error: Option<ValidationError>,
    },
    Graph {
        packet: GraphPacket,
        flags: Vec<Flag>,
        error: Option<ValidationError>,
    },
    Diagnostic(Diagnostic),
}

impl Dissection {
    /// Parsed with no validation error and no reconciliation flag
    pub fn is_clean(&self) -> bool {
        match self {
            Dissection::Position { error, .. } => error.is_none(),
            Dissection::Graph { flags, error, .. } => {
                error.is_none() && flags.iter().all(Flag::is_advisory)
            }
            Dissection::Diagnostic(_) => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Selects the codec/validator path for each buffer
#[derive(Debug, Clone)]
pub struct Dispatcher {
    ports: PortMap,
    mode: Mode,
}

impl Dispatcher {
    pub fn new(ports: PortMap, mode: Mode) -> Self {
        Self { ports, mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Pick a packet kind from transport hints.
    ///
    /// The position rule is checked first, so a 10-byte buffer travelling
    /// between the two designated ports routes as a position.
    pub fn classify(&self, len: usize, source_port: u16, destination_port: u16) -> Option<PacketKind> {
        let on = |port: u16| source_port == port || destination_port == port;

        if on(self.ports.position_port) && len == POSITION_PACKET_SIZE {
            Some(PacketKind::Position)
        } else if on(self.ports.graph_port) && len >= GRAPH_HEADER_SIZE {
            Some(PacketKind::Graph)
        } else {
            None
        }
    }

    /// Decode, validate and annotate one buffer
    pub fn dispatch(&self, buf: &[u8], source_port: u16, destination_port: u16) -> Dissection {
        let diagnostic = |reason| {
            Dissection::Diagnostic(Diagnostic {
                reason,
                observed_length: buf.len(),
                source_port,
                destination_port,
            })
        };

        let Some(kind) = self.classify(buf.len(), source_port, destination_port) else {
            return diagnostic(DiagnosticReason::Unknown);
        };

        // classify already gates lengths; the codec check only fires if the two drift apart
        let dissection = match Self::decode_routed(kind, buf) {
            Ok(dissection) => dissection,
            Err(CodecError::TooShort { kind, .. }) => {
                return diagnostic(DiagnosticReason::TooShort { packet_kind: kind })
            }
        };

        if self.mode == Mode::Strict && !dissection.is_clean() {
            let reason = match dissection {
                Dissection::Position { error, .. } => DiagnosticReason::Rejected {
                    packet_kind: PacketKind::Position,
                    error,
                    flags: Vec::new(),
                },
                Dissection::Graph { flags, error, .. } => DiagnosticReason::Rejected {
                    packet_kind: PacketKind::Graph,
                    error,
                    flags,
                },
                Dissection::Diagnostic(d) => return Dissection::Diagnostic(d),
            };
            return diagnostic(reason);
        }

        dissection
    }

    /// Decode and validate a buffer already routed to `kind`
    fn decode_routed(kind: PacketKind, buf: &[u8]) -> CodecResult<Dissection> {
        match kind {
            PacketKind::Position => {
                let packet = decode_position(buf)?;
                Ok(Dissection::Position {
                    error: validate_position(&packet).err(),
                    packet,
                })
            }
            PacketKind::Graph => {
                let decoded = decode_graph(buf)?;
                let mut flags = decoded.flags;
                let error = match validate_graph(&decoded.packet) {
                    Ok(self_loops) => {
                        flags.extend(self_loops);
                        None
                    }
                    Err(e) => {
                        flags.extend(find_self_loops(&decoded.packet.edges));
                        Some(e)
                    }
                };
                Ok(Dissection::Graph {
                    packet: decoded.packet,
                    flags,
                    error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        encode_graph, encode_graph_packet, encode_position, graph_packet_size, GraphEdge,
    };

    fn best_effort() -> Dispatcher {
        Dispatcher::new(PortMap::default(), Mode::BestEffort)
    }

    fn strict() -> Dispatcher {
        Dispatcher::new(PortMap::default(), Mode::Strict)
    }

    #[test]
    fn test_position_routing() {
        let bytes = encode_position(4, 10.0, 20.0);

        let on_dst = best_effort().dispatch(&bytes, 50000, POSITION_PORT);
        assert_eq!(
            on_dst,
            Dissection::Position {
                packet: PositionPacket::new(4, 10.0, 20.0),
                error: None
            }
        );

        // Either port may carry the designated value
        let on_src = best_effort().dispatch(&bytes, POSITION_PORT, 50000);
        assert!(matches!(on_src, Dissection::Position { .. }));
    }

    #[test]
    fn test_same_buffer_on_unrelated_port_is_unknown() {
        let bytes = encode_position(4, 10.0, 20.0);
        let result = best_effort().dispatch(&bytes, 50000, 50001);
        assert_eq!(
            result,
            Dissection::Diagnostic(Diagnostic {
                reason: DiagnosticReason::Unknown,
                observed_length: 10,
                source_port: 50000,
                destination_port: 50001,
            })
        );
    }

    #[test]
    fn test_position_port_wrong_length_is_unknown() {
        let bytes = encode_position(4, 10.0, 20.0);
        let short = best_effort().dispatch(&bytes[..9], 50000, POSITION_PORT);
        assert!(matches!(
            short,
            Dissection::Diagnostic(Diagnostic {
                reason: DiagnosticReason::Unknown,
                observed_length: 9,
                ..
            })
        ));

        let mut long = bytes.to_vec();
        long.push(0);
        assert!(matches!(
            best_effort().dispatch(&long, 50000, POSITION_PORT),
            Dissection::Diagnostic(_)
        ));
    }

    #[test]
    fn test_graph_routing() {
        let edges = vec![GraphEdge::new(1, 2, 100), GraphEdge::new(3, 1, 200)];
        let bytes = encode_graph(1, &edges);

        match best_effort().dispatch(&bytes, 40000, GRAPH_PORT) {
            Dissection::Graph { packet, flags, error } => {
                assert_eq!(packet, GraphPacket::new(1, edges));
                assert!(flags.is_empty());
                assert!(error.is_none());
            }
            other => panic!("Expected graph, got {:?}", other),
        }

        let header_only = encode_graph(2, &[]);
        assert!(matches!(
            best_effort().dispatch(&header_only, 40000, GRAPH_PORT),
            Dissection::Graph { .. }
        ));
        assert!(matches!(
            best_effort().dispatch(&header_only[..3], 40000, GRAPH_PORT),
            Dissection::Diagnostic(Diagnostic {
                reason: DiagnosticReason::Unknown,
                ..
            })
        ));
    }

    #[test]
    fn test_position_rule_wins_between_designated_ports() {
        let bytes = encode_position(4, 10.0, 20.0);
        let dispatcher = best_effort();
        assert_eq!(
            dispatcher.classify(bytes.len(), POSITION_PORT, GRAPH_PORT),
            Some(PacketKind::Position)
        );
        // 10 bytes on the graph port alone is a graph header plus one edge
        assert_eq!(
            dispatcher.classify(bytes.len(), 40000, GRAPH_PORT),
            Some(PacketKind::Graph)
        );
    }

    #[test]
    fn test_best_effort_truncated_graph() {
        let edges: Vec<GraphEdge> = (1..=10).map(|i| GraphEdge::new(i, i + 1, 9)).collect();
        let full = encode_graph(5, &edges);
        let cut = &full[..graph_packet_size(3)];

        match best_effort().dispatch(cut, 40000, GRAPH_PORT) {
            Dissection::Graph { packet, flags, error } => {
                assert_eq!(packet.edges.len(), 3);
                assert_eq!(
                    flags,
                    vec![Flag::Truncated {
                        expected: 10,
                        available: 3
                    }]
                );
                assert_eq!(
                    error,
                    Some(ValidationError::EdgeCountMismatch {
                        declared: 10,
                        actual: 3
                    })
                );
            }
            other => panic!("Expected graph, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_rejects_truncated_graph() {
        let edges: Vec<GraphEdge> = (1..=10).map(|i| GraphEdge::new(i, i + 1, 9)).collect();
        let full = encode_graph(5, &edges);
        let cut = &full[..graph_packet_size(3)];

        match strict().dispatch(cut, 40000, GRAPH_PORT) {
            Dissection::Diagnostic(Diagnostic {
                reason: DiagnosticReason::Rejected { packet_kind, flags, error },
                observed_length,
                ..
            }) => {
                assert_eq!(packet_kind, PacketKind::Graph);
                assert_eq!(observed_length, cut.len());
                assert!(flags.contains(&Flag::Truncated {
                    expected: 10,
                    available: 3
                }));
                assert!(error.is_some());
            }
            other => panic!("Expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_accepted_in_strict_mode() {
        let edges = vec![GraphEdge::new(7, 7, 50), GraphEdge::new(1, 2, 3)];
        let bytes = encode_graph(7, &edges);

        for dispatcher in [best_effort(), strict()] {
            match dispatcher.dispatch(&bytes, 40000, GRAPH_PORT) {
                Dissection::Graph { packet, flags, error } => {
                    assert_eq!(packet.edges.len(), 2);
                    assert_eq!(packet.edges[0], GraphEdge::new(7, 7, 50));
                    assert_eq!(flags, vec![Flag::SelfLoop { index: 0, node_id: 7 }]);
                    assert!(error.is_none());
                }
                other => panic!("Expected graph, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_self_loop_still_flagged_on_invalid_graph() {
        let packet = GraphPacket {
            sender_id: 0,
            edge_count: 1,
            edges: vec![GraphEdge::new(7, 7, 50)],
        };
        let bytes = encode_graph_packet(&packet);

        match best_effort().dispatch(&bytes, 40000, GRAPH_PORT) {
            Dissection::Graph { flags, error, .. } => {
                assert_eq!(flags, vec![Flag::SelfLoop { index: 0, node_id: 7 }]);
                assert_eq!(error, Some(ValidationError::InvalidSenderId { sender_id: 0 }));
            }
            other => panic!("Expected graph, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_position() {
        let bytes = encode_position(3, 1500.0, 2.0);

        match best_effort().dispatch(&bytes, 40000, POSITION_PORT) {
            Dissection::Position { packet, error } => {
                assert_eq!(packet.x, 1500.0);
                assert!(matches!(error, Some(ValidationError::OutOfRange { .. })));
            }
            other => panic!("Expected position, got {:?}", other),
        }

        assert!(matches!(
            strict().dispatch(&bytes, 40000, POSITION_PORT),
            Dissection::Diagnostic(Diagnostic {
                reason: DiagnosticReason::Rejected {
                    packet_kind: PacketKind::Position,
                    ..
                },
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_declared_count() {
        let packet = GraphPacket {
            sender_id: 1,
            edge_count: 200,
            edges: (1..=60).map(|i| GraphEdge::new(i, i + 1, 1)).collect(),
        };
        let bytes = encode_graph_packet(&packet);

        match best_effort().dispatch(&bytes, 40000, GRAPH_PORT) {
            Dissection::Graph { packet, flags, error } => {
                assert_eq!(packet.edges.len(), 50);
                assert_eq!(flags, vec![Flag::EdgeCountExceeded { declared: 200 }]);
                assert_eq!(
                    error,
                    Some(ValidationError::InvalidEdgeCount { edge_count: 200 })
                );
            }
            other => panic!("Expected graph, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_routed_reports_short_buffers() {
        let short = Dispatcher::decode_routed(PacketKind::Position, &[1, 0, 0]);
        assert!(matches!(
            short,
            Err(CodecError::TooShort {
                kind: PacketKind::Position,
                needed: POSITION_PACKET_SIZE,
                actual: 3
            })
        ));

        let short = Dispatcher::decode_routed(PacketKind::Graph, &[1, 0]);
        assert!(matches!(
            short,
            Err(CodecError::TooShort {
                kind: PacketKind::Graph,
                ..
            })
        ));
    }

    #[test]
    fn test_diagnostic_json() {
        let json = best_effort().dispatch(&[1, 2, 3], 1, 2).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "diagnostic");
        assert_eq!(value["reason"], "unknown");
        assert_eq!(value["observed_length"], 3);
    }

    #[test]
    fn test_position_json() {
        let bytes = encode_position(2, 5.0, 6.0);
        let json = best_effort().dispatch(&bytes, 1, POSITION_PORT).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "position");
        assert_eq!(value["packet"]["node_id"], 2);
        assert!(value["error"].is_null());
    }
}
