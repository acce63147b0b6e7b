//! Relay error types.

use thiserror::Error;

use crate::{RoomId, UserId};

/// Errors returned when an inbound event is refused.
///
/// These are surfaced back to the offending client as an `error` event;
/// they never interrupt other connections.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The connection id is not registered with the relay.
    #[error("unknown connection")]
    UnknownConnection,

    /// The connection has not announced an identity yet.
    #[error("presence not announced on this connection")]
    NotAnnounced,

    /// The connection tried to act as a different identity than the one
    /// bound to it.
    #[error("identity mismatch: connection is bound to {bound}")]
    IdentityMismatch { bound: UserId },

    /// The sender is not a member of the room it addressed.
    #[error("not a member of room {0}")]
    NotInRoom(RoomId),

    /// The room id uses the reserved private-room namespace.
    #[error("room id {0} is reserved")]
    ReservedRoom(RoomId),

    /// The call target is not currently online.
    #[error("user {0} is not online")]
    UserOffline(UserId),

    /// A call event referenced a session the relay has no record of.
    #[error("no active call session with {0}")]
    NoSuchCall(String),

    /// A direct call is already in progress between the two parties.
    #[error("call already in progress with {0}")]
    CallInProgress(UserId),

    /// The event did not name a callee or call room.
    #[error("call event is missing a target")]
    MissingCallTarget,
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
