//! Presence tracking.
//!
//! One entry per online user, last writer wins when a user opens a second
//! connection (no multi-device fan-out). Every change re-broadcasts the
//! full online list to all connected clients.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{RelayError, Result};
use crate::events::ServerEvent;
use crate::outbound::Outbound;
use crate::rooms::private_room;
use crate::state::PresenceEntry;
use crate::{Relay, UserId};

impl<O: Outbound> Relay<O> {
    /// Bind an identity to a connection and mark the user online.
    ///
    /// The first announce wins for the lifetime of the connection:
    /// re-announcing the same identity refreshes `last_seen`, announcing a
    /// different one is refused. The connection also enters the user's
    /// private room so other clients can address it by user id alone.
    pub fn announce(&self, conn_id: &str, user_id: UserId) -> Result<()> {
        let mut state = self.state();

        let conn = state
            .connections
            .get_mut(conn_id)
            .ok_or(RelayError::UnknownConnection)?;

        if let Some(bound) = &conn.user_id {
            if *bound != user_id {
                return Err(RelayError::IdentityMismatch {
                    bound: bound.clone(),
                });
            }
        }
        conn.user_id = Some(user_id.clone());

        state.presence.insert(
            user_id.clone(),
            PresenceEntry {
                conn_id: conn_id.to_string(),
                last_seen: Utc::now(),
            },
        );
        state.join_room(conn_id, &private_room(&user_id));

        let event = ServerEvent::UpdateOnlineStatus {
            users: state.online_users(),
        };
        state.broadcast_all(&event);

        info!(conn_id = %conn_id, user_id = %user_id, "user online");
        Ok(())
    }

    /// Sorted ids of currently-online users.
    pub fn online_users(&self) -> Vec<UserId> {
        self.state().online_users()
    }

    /// When the user last announced presence, if currently online.
    pub fn last_seen(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.state().presence.get(user_id).map(|e| e.last_seen)
    }
}
