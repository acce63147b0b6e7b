//! Wire-format events exchanged over the WebSocket.
//!
//! Both directions use internally-tagged JSON (`"type"` discriminator,
//! snake_case event names). WebRTC `signal` payloads are opaque
//! [`serde_json::Value`]s: the relay ferries them without interpretation.
//!
//! Identity fields inside client payloads are informational only — the
//! relay trusts the identity bound to the connection at announce time, not
//! whatever a payload claims (see [`crate::Relay`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{RoomId, UserId};

/// A chat message as it travels through the relay.
///
/// The `id` is assigned by the sending client and persisted unchanged, so
/// receivers can deduplicate dual-delivered copies (room broadcast plus
/// private-room delivery).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Client-assigned message UUID.
    pub id: String,
    /// Room the message is addressed to.
    pub room: RoomId,
    /// Sender user ID; must match the sender's bound identity.
    pub sender_id: UserId,
    /// Sender display name.
    pub sender_name: String,
    /// Direct-message recipient; triggers private-room delivery when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    /// Message body.
    pub body: String,
    /// Send timestamp (RFC 3339).
    pub sent_at: String,
}

/// Events a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Announce presence and enter the private room for `user_id`.
    UserOnline { user_id: UserId },
    /// Join a named room. Idempotent.
    JoinRoom { room_id: RoomId },
    /// Leave a previously joined room.
    LeaveRoom { room_id: RoomId },
    /// Started typing in a room.
    Typing { room_id: RoomId, user_name: String },
    /// Stopped typing in a room.
    StopTyping { room_id: RoomId },
    /// Send a chat message to a room (and optionally a direct recipient).
    SendMessage { message: ChatMessage },
    /// Notify a room that a message was deleted elsewhere.
    DeleteMessage {
        room_id: RoomId,
        message_id: String,
        mode: String,
    },
    /// Notify a room that messages were marked read elsewhere.
    MessageRead {
        room_id: RoomId,
        message_ids: Vec<String>,
    },
    /// Start a call: direct (`to`) or group (`room_id` + `is_group`).
    CallUser {
        #[serde(default)]
        to: Option<UserId>,
        signal: Value,
        name: String,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
    /// Accept a ringing call, carrying the SDP answer.
    AcceptCall {
        #[serde(default)]
        to: Option<UserId>,
        signal: Value,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
    /// Mid-call negotiation payload (ICE candidates etc.).
    WebrtcSignal {
        #[serde(default)]
        to: Option<UserId>,
        signal: Value,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
    /// Hang up an established or ringing call.
    EndCall {
        #[serde(default)]
        to: Option<UserId>,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
    /// Decline a ringing call.
    RejectCall {
        #[serde(default)]
        to: Option<UserId>,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
}

/// Why a `call_rejected` event was emitted.
pub mod reject_reason {
    /// The callee declined.
    pub const DECLINED: &str = "declined";
    /// Nobody answered before the ring timer fired.
    pub const TIMEOUT: &str = "timeout";
}

/// Events the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full list of currently-online user ids; re-broadcast on every
    /// presence change.
    UpdateOnlineStatus { users: Vec<UserId> },
    /// Someone started typing in a room you are in.
    Typing {
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
    },
    /// Someone stopped typing.
    StopTyping { room_id: RoomId, user_id: UserId },
    /// A chat message addressed to a room you are in (or to you directly).
    NewMessage { message: ChatMessage },
    /// A message in the room was deleted.
    MessageDeleted {
        room_id: RoomId,
        message_id: String,
        mode: String,
    },
    /// Messages in the room were marked read by `user_id`.
    MessagesMarkedRead {
        room_id: RoomId,
        user_id: UserId,
        message_ids: Vec<String>,
    },
    /// You are being called.
    IncomingCall {
        from: UserId,
        name: String,
        signal: Value,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
    /// Your call was answered.
    CallAccepted {
        from: UserId,
        signal: Value,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
    /// Mid-call negotiation payload from the other side.
    WebrtcSignal {
        from: UserId,
        signal: Value,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
    /// The call was hung up.
    CallEnded {
        from: UserId,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
    /// The call was declined or rang out (see [`reject_reason`]).
    CallRejected {
        from: UserId,
        reason: String,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        is_group: bool,
    },
    /// The relay refused or failed to process an event.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_snake_case_tags() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"user_online","user_id":"u1"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::UserOnline {
                user_id: "u1".to_string()
            }
        );

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"join_room","room_id":"team-1"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_id: "team-1".to_string()
            }
        );
    }

    #[test]
    fn call_user_defaults_optional_fields() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"call_user","to":"u2","signal":{"sdp":"offer"},"name":"Alice"}"#,
        )
        .unwrap();
        match event {
            ClientEvent::CallUser {
                to,
                room_id,
                is_group,
                ..
            } => {
                assert_eq!(to.as_deref(), Some("u2"));
                assert!(room_id.is_none());
                assert!(!is_group);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn server_events_round_trip() {
        let event = ServerEvent::UpdateOnlineStatus {
            users: vec!["a".to_string(), "b".to_string()],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"update_online_status""#));
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn signal_payloads_stay_opaque() {
        let json = r#"{"type":"webrtc_signal","to":"u2","signal":{"candidate":{"sdpMid":"0"}}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::WebrtcSignal { signal, .. } => {
                assert_eq!(signal["candidate"]["sdpMid"], "0");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
