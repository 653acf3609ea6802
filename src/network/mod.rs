//! Network module - UDP transport for swarm packets
//!
//! Provides:
//! - A `PacketSink` seam the broadcast loops write encoded payloads into
//! - A UDP sender implementing it
//! - A UDP receiver forwarding datagrams to the analyzer

mod sender;
mod receiver;

pub use sender::*;
pub use receiver::*;

use async_trait::async_trait;
use std::net::IpAddr;
use thiserror::Error;

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bind failed: {0}")]
    BindFailed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Channel closed")]
    ChannelClosed,
}

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Destination for encoded payloads.
///
/// The broadcast loops only produce `(payload, destination_port)`; how the
/// bytes leave the process is up to the implementation.
#[async_trait]
pub trait PacketSink: Send + Sync {
    async fn send(&self, payload: &[u8], port: u16) -> NetworkResult<()>;
}

/// Receive buffer large enough for any UDP payload
pub const MAX_DATAGRAM_SIZE: usize = 65536;

/// Configuration for the UDP transport
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Address packets are sent to
    pub destination: IpAddr,
    /// Address receivers bind to
    pub bind_address: IpAddr,
    /// Enable SO_BROADCAST on sending sockets
    pub broadcast: bool,
    /// Receive buffer size per datagram
    pub recv_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            destination: IpAddr::from([127, 0, 0, 1]),
            bind_address: IpAddr::from([0, 0, 0, 0]),
            broadcast: true,
            recv_buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

/// Parse an IP address from configuration or the command line
pub fn parse_ip(addr: &str) -> NetworkResult<IpAddr> {
    addr.parse()
        .map_err(|_| NetworkError::InvalidAddress(addr.to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory sink for exercising the broadcast loops

    use super::*;
    use bytes::Bytes;
    use tokio::sync::mpsc;

    /// A payload captured by [`ChannelSink`]
    #[derive(Debug, Clone)]
    pub struct SentPacket {
        pub payload: Bytes,
        pub port: u16,
    }

    pub struct ChannelSink {
        tx: mpsc::UnboundedSender<SentPacket>,
    }

    impl ChannelSink {
        pub fn new() -> (Self, mpsc::UnboundedReceiver<SentPacket>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { tx }, rx)
        }
    }

    #[async_trait]
    impl PacketSink for ChannelSink {
        async fn send(&self, payload: &[u8], port: u16) -> NetworkResult<()> {
            self.tx
                .send(SentPacket {
                    payload: Bytes::copy_from_slice(payload),
                    port,
                })
                .map_err(|_| NetworkError::ChannelClosed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ip() {
        assert_eq!(parse_ip("127.0.0.1").unwrap(), IpAddr::from([127, 0, 0, 1]));
        assert!(matches!(
            parse_ip("not-an-ip"),
            Err(NetworkError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_channel_sink_captures_payload() {
        let (sink, mut rx) = testing::ChannelSink::new();
        tokio_test::assert_ok!(sink.send(&[1, 2, 3], 12345).await);

        let sent = rx.recv().await.unwrap();
        assert_eq!(&sent.payload[..], &[1, 2, 3]);
        assert_eq!(sent.port, 12345);
    }
}
