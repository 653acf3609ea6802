//! UDP receiver
//!
//! Listens on one designated port and forwards every datagram, together
//! with its transport hints, to the analyzer task.

use bytes::Bytes;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use super::{NetworkError, NetworkResult};

/// How often a blocked receive wakes up to check the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A received payload plus the hints the dispatcher routes on
#[derive(Debug, Clone)]
pub struct Datagram {
    pub payload: Bytes,
    pub source: SocketAddr,
    pub destination_port: u16,
    /// The read filled the whole buffer, so the datagram may have been cut
    pub clipped: bool,
}

impl Datagram {
    pub fn source_port(&self) -> u16 {
        self.source.port()
    }
}

/// Datagram receiver bound to one port
pub struct UdpReceiver {
    socket: UdpSocket,
    local_port: u16,
    buffer_size: usize,
}

impl UdpReceiver {
    /// Bind to `addr:port`; port 0 picks an ephemeral port
    pub async fn bind(addr: IpAddr, port: u16, buffer_size: usize) -> NetworkResult<Self> {
        let bind_addr = SocketAddr::new(addr, port);
        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| {
            NetworkError::BindFailed(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;
        let local_port = socket.local_addr()?.port();

        Ok(Self {
            socket,
            local_port,
            buffer_size,
        })
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Forward datagrams to `tx` until `stop` is set or the channel closes
    pub async fn run(self, tx: mpsc::Sender<Datagram>, stop: Arc<AtomicBool>) -> NetworkResult<()> {
        let mut buf = vec![0u8; self.buffer_size];

        while !stop.load(Ordering::Relaxed) {
            let received = match tokio::time::timeout(POLL_INTERVAL, self.socket.recv_from(&mut buf)).await {
                Ok(result) => result,
                Err(_) => continue,
            };

            match received {
                Ok((len, source)) => {
                    let clipped = len == buf.len();
                    if clipped {
                        tracing::warn!(
                            "Datagram from {} filled the {} byte receive buffer; wire length unknown",
                            source,
                            buf.len()
                        );
                    }
                    let datagram = Datagram {
                        payload: Bytes::copy_from_slice(&buf[..len]),
                        source,
                        destination_port: self.local_port,
                        clipped,
                    };
                    if tx.send(datagram).await.is_err() {
                        return Err(NetworkError::ChannelClosed);
                    }
                }
                Err(e) => {
                    tracing::error!("Receive error on port {}: {}", self.local_port, e);
                }
            }
        }

        tracing::debug!("Receiver on port {} stopped", self.local_port);
        Ok(())
    }
}
