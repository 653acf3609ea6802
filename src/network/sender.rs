//! UDP sender
//!
//! Sends encoded payloads as single datagrams to a fixed destination address.

use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use tokio::net::UdpSocket;

use super::{NetworkError, NetworkResult, PacketSink, TransportConfig};

/// Datagram sender bound to an ephemeral local port
pub struct UdpSender {
    socket: UdpSocket,
    destination: IpAddr,
}

impl UdpSender {
    /// Open a sending socket for `config.destination`
    pub async fn bind(config: &TransportConfig) -> NetworkResult<Self> {
        let local: SocketAddr = if config.destination.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(local).await.map_err(|e| {
            NetworkError::BindFailed(format!("Failed to bind sender on {}: {}", local, e))
        })?;
        if config.broadcast {
            socket.set_broadcast(true)?;
        }

        tracing::debug!(
            "UDP sender bound to {} -> {}",
            socket.local_addr()?,
            config.destination
        );

        Ok(Self {
            socket,
            destination: config.destination,
        })
    }

    pub fn destination(&self) -> IpAddr {
        self.destination
    }
}

#[async_trait]
impl PacketSink for UdpSender {
    async fn send(&self, payload: &[u8], port: u16) -> NetworkResult<()> {
        self.socket
            .send_to(payload, SocketAddr::new(self.destination, port))
            .await?;
        Ok(())
    }
}
