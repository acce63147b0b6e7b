//! Room membership.
//!
//! Rooms are opaque string channels reconstructed purely from join events;
//! nothing about them is persisted and no membership list is exposed to
//! clients. The `user:` namespace is reserved for private per-user rooms,
//! entered only through presence announcement.

use tracing::debug;

use crate::error::{RelayError, Result};
use crate::outbound::Outbound;
use crate::{Relay, RoomId};

/// Namespace prefix for private per-user rooms.
pub const PRIVATE_ROOM_PREFIX: &str = "user:";

/// The private room for a user id.
pub fn private_room(user_id: &str) -> RoomId {
    format!("{PRIVATE_ROOM_PREFIX}{user_id}")
}

impl<O: Outbound> Relay<O> {
    /// Join a room. Idempotent; refuses the reserved private namespace.
    pub fn join_room(&self, conn_id: &str, room_id: &str) -> Result<()> {
        if room_id.starts_with(PRIVATE_ROOM_PREFIX) {
            return Err(RelayError::ReservedRoom(room_id.to_string()));
        }

        let mut state = self.state();
        if !state.connections.contains_key(conn_id) {
            return Err(RelayError::UnknownConnection);
        }
        state.join_room(conn_id, room_id);

        debug!(conn_id = %conn_id, room_id = %room_id, "joined room");
        Ok(())
    }

    /// Leave a room without disconnecting. Unknown rooms are a no-op.
    pub fn leave_room(&self, conn_id: &str, room_id: &str) -> Result<()> {
        if room_id.starts_with(PRIVATE_ROOM_PREFIX) {
            return Err(RelayError::ReservedRoom(room_id.to_string()));
        }

        let mut state = self.state();
        if !state.connections.contains_key(conn_id) {
            return Err(RelayError::UnknownConnection);
        }
        state.leave_room(conn_id, room_id);

        debug!(conn_id = %conn_id, room_id = %room_id, "left room");
        Ok(())
    }
}
