//! Realtime presence, messaging, and call-signaling relay for Shiftline.
//!
//! The relay is a forwarding service: it tracks which users are online and
//! which rooms each connection has joined, fans chat events out to the
//! right audiences, and ferries opaque WebRTC negotiation payloads between
//! call participants. It holds no durable state — chat history lives in the
//! persistence layer, written by the REST surface.
//!
//! Identity is bound to a connection by the first `user_online` event and
//! verified on every subsequent event; room-addressed events additionally
//! require the sender to be a member of the room they reference.
//!
//! # Example
//!
//! ```no_run
//! use relay::{ClientEvent, Outbound, Relay, RelayConfig, ServerEvent};
//!
//! #[derive(Clone)]
//! struct Printer;
//!
//! impl Outbound for Printer {
//!     fn deliver(&self, event: &ServerEvent) {
//!         println!("{event:?}");
//!     }
//! }
//!
//! # async fn example() {
//! let relay = Relay::new(RelayConfig::default());
//! relay.connect("conn-1".to_string(), Printer);
//! relay.handle(
//!     "conn-1",
//!     ClientEvent::UserOnline { user_id: "u1".to_string() },
//! );
//! # }
//! ```

pub mod calls;
pub mod error;
pub mod events;
pub mod messaging;
pub mod outbound;
pub mod presence;
pub mod rooms;

mod state;

pub use error::{RelayError, Result};
pub use events::{reject_reason, ChatMessage, ClientEvent, ServerEvent};
pub use outbound::Outbound;
pub use rooms::{private_room, PRIVATE_ROOM_PREFIX};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

use state::{ConnectionState, RelayState};

/// User identity, as issued by the platform's auth layer.
pub type UserId = String;
/// Opaque room identifier.
pub type RoomId = String;
/// Per-connection identifier, assigned by the gateway.
pub type ConnId = String;

/// Relay tuning knobs.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long a direct or group call may ring unanswered before the
    /// relay rejects it on the caller's behalf.
    pub ring_timeout: Duration,
}

impl RelayConfig {
    /// Set the ring timeout.
    pub fn with_ring_timeout(mut self, ring_timeout: Duration) -> Self {
        self.ring_timeout = ring_timeout;
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ring_timeout: Duration::from_secs(45),
        }
    }
}

/// The relay service. Cheap to clone; all clones share one state.
pub struct Relay<O: Outbound> {
    state: Arc<Mutex<RelayState<O>>>,
    config: RelayConfig,
}

impl<O: Outbound> Clone for Relay<O> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: self.config.clone(),
        }
    }
}

impl<O: Outbound> Relay<O> {
    /// Create an empty relay.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState::default())),
            config,
        }
    }

    /// Register a new connection with its delivery handle.
    pub fn connect(&self, conn_id: ConnId, outbound: O) {
        debug!(conn_id = %conn_id, "connection registered");
        self.state().connections.insert(
            conn_id,
            ConnectionState {
                outbound,
                user_id: None,
                rooms: Default::default(),
            },
        );
    }

    /// Tear down a connection: drop room memberships, presence, and any
    /// call sessions the user was part of, then re-broadcast the online
    /// list if presence changed.
    pub fn disconnect(&self, conn_id: &str) {
        let mut state = self.state();

        let Some(conn) = state.connections.remove(conn_id) else {
            return;
        };

        for room_id in &conn.rooms {
            let now_empty = match state.rooms.get_mut(room_id) {
                Some(members) => {
                    members.remove(conn_id);
                    members.is_empty()
                }
                None => false,
            };
            if now_empty {
                state.rooms.remove(room_id);
            }
        }

        let Some(user_id) = conn.user_id else {
            return;
        };

        // Another connection may have overwritten the presence entry
        // (last-writer-wins); only remove it if it is still ours.
        let owns_presence = state
            .presence
            .get(&user_id)
            .is_some_and(|entry| entry.conn_id == conn_id);

        if owns_presence {
            state.presence.remove(&user_id);
            calls::end_calls_for_user(&mut state, &user_id);

            let event = ServerEvent::UpdateOnlineStatus {
                users: state.online_users(),
            };
            state.broadcast_all(&event);
            debug!(conn_id = %conn_id, user_id = %user_id, "presence removed");
        }
    }

    /// Dispatch one inbound event.
    ///
    /// Refusals are answered with an `error` event on the offending
    /// connection and logged; they never propagate to other clients.
    pub fn handle(&self, conn_id: &str, event: ClientEvent) {
        let result = match event {
            ClientEvent::UserOnline { user_id } => self.announce(conn_id, user_id),
            ClientEvent::JoinRoom { room_id } => self.join_room(conn_id, &room_id),
            ClientEvent::LeaveRoom { room_id } => self.leave_room(conn_id, &room_id),
            ClientEvent::Typing { room_id, user_name } => {
                self.typing(conn_id, &room_id, &user_name)
            }
            ClientEvent::StopTyping { room_id } => self.stop_typing(conn_id, &room_id),
            ClientEvent::SendMessage { message } => self.send_message(conn_id, message),
            ClientEvent::DeleteMessage {
                room_id,
                message_id,
                mode,
            } => self.delete_message(conn_id, &room_id, message_id, mode),
            ClientEvent::MessageRead {
                room_id,
                message_ids,
            } => self.mark_read(conn_id, &room_id, message_ids),
            ClientEvent::CallUser {
                to,
                signal,
                name,
                room_id,
                is_group,
            } => self.call_user(conn_id, to, signal, name, room_id, is_group),
            ClientEvent::AcceptCall {
                to,
                signal,
                room_id,
                is_group,
            } => self.accept_call(conn_id, to, signal, room_id, is_group),
            ClientEvent::WebrtcSignal {
                to,
                signal,
                room_id,
                is_group,
            } => self.webrtc_signal(conn_id, to, signal, room_id, is_group),
            ClientEvent::EndCall {
                to,
                room_id,
                is_group,
            } => self.end_call(conn_id, to, room_id, is_group),
            ClientEvent::RejectCall {
                to,
                room_id,
                is_group,
            } => self.reject_call(conn_id, to, room_id, is_group),
        };

        if let Err(e) = result {
            warn!(conn_id = %conn_id, error = %e, "event refused");
            self.state().deliver_to_conn(
                conn_id,
                &ServerEvent::Error {
                    message: e.to_string(),
                },
            );
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, RelayState<O>> {
        // A poisoned lock only means another handler panicked mid-update;
        // the maps themselves are still structurally sound.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
