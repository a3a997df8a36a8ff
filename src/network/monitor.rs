use crate::network::{ConnectionContext, ConnectionHandler};
use log::info;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default port for the bare traffic monitor
pub const DEFAULT_MONITOR_PORT: u16 = 8080;

/// Handler that only logs traffic
///
/// Useful for checking connectivity without touching any accounts. Nothing is
/// ever written back to the client.
#[derive(Default)]
pub struct TrafficLogger {
    connections: AtomicU64,
    bytes_received: AtomicU64,
}

impl TrafficLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }
}

impl ConnectionHandler for TrafficLogger {
    fn on_connect(&self, peer: SocketAddr) {
        self.connections.fetch_add(1, Ordering::Relaxed);
        info!("New connection from {peer}");
    }

    fn on_disconnect(&self, peer: SocketAddr) {
        info!("Peer disconnected: {peer}");
    }

    fn on_receive(&self, ctx: &mut ConnectionContext<'_>, data: &[u8]) {
        self.bytes_received
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        info!(
            "Received {} bytes from {}: {}",
            data.len(),
            ctx.peer(),
            String::from_utf8_lossy(data).trim_end()
        );
    }
}
