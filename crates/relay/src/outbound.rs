//! The transport seam.

use crate::events::ServerEvent;

/// Delivery handle for one client connection.
///
/// The gateway implements this over the write half of a WebSocket (an
/// unbounded channel drained by a writer task); tests implement it with a
/// capturing buffer. Delivery is fire-and-forget: implementations must not
/// block, and failures (closed connection) are swallowed — the disconnect
/// path is responsible for cleanup, not the senders.
pub trait Outbound: Send + Sync + 'static {
    /// Push one event to the client.
    fn deliver(&self, event: &ServerEvent);
}
