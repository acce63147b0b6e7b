//! Chat event fan-out.
//!
//! The relay forwards chat events and nothing else: persistence happens in
//! the REST layer, and there is no acknowledgment, retry, or buffering —
//! offline targets simply miss the event and catch up from stored history.

use tracing::debug;

use crate::error::{RelayError, Result};
use crate::events::{ChatMessage, ServerEvent};
use crate::outbound::Outbound;
use crate::rooms::private_room;
use crate::Relay;

impl<O: Outbound> Relay<O> {
    /// Broadcast a typing indicator to the room, excluding the sender.
    pub fn typing(&self, conn_id: &str, room_id: &str, user_name: &str) -> Result<()> {
        let state = self.state();
        let user_id = state.require_identity(conn_id)?;
        state.require_member(conn_id, room_id)?;

        state.broadcast_room(
            room_id,
            Some(conn_id),
            &ServerEvent::Typing {
                room_id: room_id.to_string(),
                user_id,
                user_name: user_name.to_string(),
            },
        );
        Ok(())
    }

    /// Broadcast the end of a typing indicator, excluding the sender.
    pub fn stop_typing(&self, conn_id: &str, room_id: &str) -> Result<()> {
        let state = self.state();
        let user_id = state.require_identity(conn_id)?;
        state.require_member(conn_id, room_id)?;

        state.broadcast_room(
            room_id,
            Some(conn_id),
            &ServerEvent::StopTyping {
                room_id: room_id.to_string(),
                user_id,
            },
        );
        Ok(())
    }

    /// Fan a chat message out to its room and, when addressed, to the
    /// recipient's private room.
    ///
    /// Dual delivery means a recipient who is also a room member can see
    /// the message twice; clients deduplicate by `message.id`. The sender
    /// receives the room copy as its delivery echo.
    pub fn send_message(&self, conn_id: &str, message: ChatMessage) -> Result<()> {
        let state = self.state();
        let user_id = state.require_identity(conn_id)?;
        if message.sender_id != user_id {
            return Err(RelayError::IdentityMismatch { bound: user_id });
        }
        state.require_member(conn_id, &message.room)?;

        let event = ServerEvent::NewMessage {
            message: message.clone(),
        };
        state.broadcast_room(&message.room, None, &event);

        if let Some(receiver_id) = &message.receiver_id {
            state.broadcast_room(&private_room(receiver_id), None, &event);
        }

        debug!(
            room_id = %message.room,
            message_id = %message.id,
            direct = message.receiver_id.is_some(),
            "message relayed"
        );
        Ok(())
    }

    /// Notify a room that a message was deleted in the store.
    ///
    /// The relay does not touch the stored message; it only tells current
    /// listeners that the mutation happened elsewhere.
    pub fn delete_message(
        &self,
        conn_id: &str,
        room_id: &str,
        message_id: String,
        mode: String,
    ) -> Result<()> {
        let state = self.state();
        state.require_identity(conn_id)?;
        state.require_member(conn_id, room_id)?;

        state.broadcast_room(
            room_id,
            Some(conn_id),
            &ServerEvent::MessageDeleted {
                room_id: room_id.to_string(),
                message_id,
                mode,
            },
        );
        Ok(())
    }

    /// Notify a room that the sender marked messages as read.
    pub fn mark_read(&self, conn_id: &str, room_id: &str, message_ids: Vec<String>) -> Result<()> {
        let state = self.state();
        let user_id = state.require_identity(conn_id)?;
        state.require_member(conn_id, room_id)?;

        state.broadcast_room(
            room_id,
            Some(conn_id),
            &ServerEvent::MessagesMarkedRead {
                room_id: room_id.to_string(),
                user_id,
                message_ids,
            },
        );
        Ok(())
    }
}
