//! Internal relay state.
//!
//! One mutex-guarded [`RelayState`] owns every map: connections, presence,
//! room membership (kept in both directions so disconnect is a direct walk
//! rather than a scan of all rooms), and live call sessions. All mutation
//! happens under the lock; outbound delivery is a synchronous channel send,
//! so the lock is never held across an await point.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::events::ServerEvent;
use crate::outbound::Outbound;
use crate::{ConnId, RoomId, UserId};

/// One live client connection.
pub(crate) struct ConnectionState<O> {
    /// Handle used to push events to this client.
    pub outbound: O,
    /// Identity bound at announce time; None until `user_online`.
    pub user_id: Option<UserId>,
    /// Rooms this connection has joined (including its private room).
    pub rooms: HashSet<RoomId>,
}

/// Presence entry: which connection currently represents a user.
pub(crate) struct PresenceEntry {
    pub conn_id: ConnId,
    pub last_seen: DateTime<Utc>,
}

/// How far a call has progressed. Participant-local refinements (media
/// state etc.) stay client-side; the relay only needs enough to validate
/// signal forwarding and to know whether the ring timer still applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallStage {
    Ringing,
    Connected,
}

/// Who a call session connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CallScope {
    Direct { caller: UserId, callee: UserId },
    Group { room_id: RoomId, caller: UserId },
}

/// A live call session, keyed by [`crate::calls::direct_call_key`] for
/// direct calls or the call room id for group calls.
pub(crate) struct CallSession {
    pub scope: CallScope,
    pub stage: CallStage,
    /// Ring timer; aborted when the call is answered, declined, or ended.
    pub ring_timer: Option<JoinHandle<()>>,
}

impl CallSession {
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.ring_timer.take() {
            timer.abort();
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        match &self.scope {
            CallScope::Direct { caller, callee } => caller == user_id || callee == user_id,
            CallScope::Group { caller, .. } => caller == user_id,
        }
    }
}

/// The relay's entire mutable state.
pub(crate) struct RelayState<O> {
    pub connections: HashMap<ConnId, ConnectionState<O>>,
    pub presence: HashMap<UserId, PresenceEntry>,
    pub rooms: HashMap<RoomId, HashSet<ConnId>>,
    pub calls: HashMap<String, CallSession>,
}

impl<O> Default for RelayState<O> {
    fn default() -> Self {
        Self {
            connections: HashMap::new(),
            presence: HashMap::new(),
            rooms: HashMap::new(),
            calls: HashMap::new(),
        }
    }
}

impl<O: Outbound> RelayState<O> {
    /// Push an event to one connection. Delivery to a closed connection is
    /// a silent drop; the disconnect pass will clean the entry up.
    pub fn deliver_to_conn(&self, conn_id: &str, event: &ServerEvent) {
        if let Some(conn) = self.connections.get(conn_id) {
            conn.outbound.deliver(event);
        }
    }

    /// Broadcast to every member of a room, optionally excluding one
    /// connection (the sender).
    pub fn broadcast_room(&self, room_id: &str, except: Option<&str>, event: &ServerEvent) {
        let Some(members) = self.rooms.get(room_id) else {
            return;
        };
        for conn_id in members {
            if except == Some(conn_id.as_str()) {
                continue;
            }
            self.deliver_to_conn(conn_id, event);
        }
    }

    /// Broadcast to every live connection.
    pub fn broadcast_all(&self, event: &ServerEvent) {
        for conn in self.connections.values() {
            conn.outbound.deliver(event);
        }
    }

    /// Sorted list of online user ids.
    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.presence.keys().cloned().collect();
        users.sort();
        users
    }

    /// Add a connection to a room, maintaining both membership directions.
    pub fn join_room(&mut self, conn_id: &str, room_id: &str) {
        if let Some(conn) = self.connections.get_mut(conn_id) {
            conn.rooms.insert(room_id.to_string());
            self.rooms
                .entry(room_id.to_string())
                .or_default()
                .insert(conn_id.to_string());
        }
    }

    /// Remove a connection from a room, dropping the room when empty.
    pub fn leave_room(&mut self, conn_id: &str, room_id: &str) {
        if let Some(conn) = self.connections.get_mut(conn_id) {
            conn.rooms.remove(room_id);
        }
        let now_empty = match self.rooms.get_mut(room_id) {
            Some(members) => {
                members.remove(conn_id);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.rooms.remove(room_id);
        }
    }

    /// Whether a connection is a member of a room.
    pub fn is_member(&self, conn_id: &str, room_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(conn_id))
    }

    /// The identity bound to a connection, or the reason there is none.
    pub fn require_identity(&self, conn_id: &str) -> crate::Result<UserId> {
        let conn = self
            .connections
            .get(conn_id)
            .ok_or(crate::RelayError::UnknownConnection)?;
        conn.user_id.clone().ok_or(crate::RelayError::NotAnnounced)
    }

    /// Fail unless the connection joined the room it is addressing.
    pub fn require_member(&self, conn_id: &str, room_id: &str) -> crate::Result<()> {
        if self.is_member(conn_id, room_id) {
            Ok(())
        } else {
            Err(crate::RelayError::NotInRoom(room_id.to_string()))
        }
    }
}
