//! Call signaling.
//!
//! The relay ferries opaque WebRTC negotiation payloads (SDP offers and
//! answers, ICE candidates) between call participants. It tracks just
//! enough per-call state to refuse signals for calls that were never
//! established and to reject a call on the caller's behalf when nobody
//! answers before the ring timer fires; media never touches the server.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{RelayError, Result};
use crate::events::{reject_reason, ServerEvent};
use crate::outbound::Outbound;
use crate::rooms::private_room;
use crate::state::{CallScope, CallSession, CallStage, RelayState};
use crate::{Relay, RoomId, UserId};

/// Deterministic session key for a direct call between two users.
pub fn direct_call_key(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("call:{first}:{second}")
}

impl<O: Outbound> Relay<O> {
    /// Start a call: ring the callee's private room (direct) or the call
    /// room (group), and arm the ring timer.
    pub fn call_user(
        &self,
        conn_id: &str,
        to: Option<UserId>,
        signal: Value,
        name: String,
        room_id: Option<RoomId>,
        is_group: bool,
    ) -> Result<()> {
        let mut state = self.state();
        let caller = state.require_identity(conn_id)?;

        if is_group {
            let room_id = room_id.ok_or(RelayError::MissingCallTarget)?;
            state.require_member(conn_id, &room_id)?;
            if state.calls.contains_key(&room_id) {
                return Err(RelayError::CallInProgress(room_id));
            }

            let timer = self.arm_ring_timer(room_id.clone());
            state.calls.insert(
                room_id.clone(),
                CallSession {
                    scope: CallScope::Group {
                        room_id: room_id.clone(),
                        caller: caller.clone(),
                    },
                    stage: CallStage::Ringing,
                    ring_timer: Some(timer),
                },
            );

            let event = ServerEvent::IncomingCall {
                from: caller.clone(),
                name,
                signal,
                room_id: Some(room_id.clone()),
                is_group: true,
            };
            state.broadcast_room(&room_id, Some(conn_id), &event);
            info!(caller = %caller, room_id = %room_id, "group call started");
            return Ok(());
        }

        let callee = to.ok_or(RelayError::MissingCallTarget)?;
        if !state.presence.contains_key(&callee) {
            return Err(RelayError::UserOffline(callee));
        }

        let key = direct_call_key(&caller, &callee);
        // The same caller may retry an unanswered call (re-ring, fresh
        // timer); anything else while a session exists is refused.
        if let Some(existing) = state.calls.get_mut(&key) {
            let is_retry = existing.stage == CallStage::Ringing
                && matches!(&existing.scope, CallScope::Direct { caller: c, .. } if *c == caller);
            if !is_retry {
                return Err(RelayError::CallInProgress(callee));
            }
            existing.cancel_timer();
            state.calls.remove(&key);
        }

        let timer = self.arm_ring_timer(key.clone());
        state.calls.insert(
            key,
            CallSession {
                scope: CallScope::Direct {
                    caller: caller.clone(),
                    callee: callee.clone(),
                },
                stage: CallStage::Ringing,
                ring_timer: Some(timer),
            },
        );

        let event = ServerEvent::IncomingCall {
            from: caller.clone(),
            name,
            signal,
            room_id: None,
            is_group: false,
        };
        state.broadcast_room(&private_room(&callee), None, &event);
        info!(caller = %caller, callee = %callee, "call started");
        Ok(())
    }

    /// Answer a ringing call with an SDP answer.
    pub fn accept_call(
        &self,
        conn_id: &str,
        to: Option<UserId>,
        signal: Value,
        room_id: Option<RoomId>,
        is_group: bool,
    ) -> Result<()> {
        let mut state = self.state();
        let callee = state.require_identity(conn_id)?;

        if is_group {
            let room_id = room_id.ok_or(RelayError::MissingCallTarget)?;
            state.require_member(conn_id, &room_id)?;
            {
                let session = state
                    .calls
                    .get_mut(&room_id)
                    .ok_or_else(|| RelayError::NoSuchCall(room_id.clone()))?;
                session.cancel_timer();
                session.stage = CallStage::Connected;
            }

            let event = ServerEvent::CallAccepted {
                from: callee.clone(),
                signal,
                room_id: Some(room_id.clone()),
                is_group: true,
            };
            state.broadcast_room(&room_id, Some(conn_id), &event);
            info!(user_id = %callee, room_id = %room_id, "group call accepted");
            return Ok(());
        }

        let caller = to.ok_or(RelayError::MissingCallTarget)?;
        let key = direct_call_key(&caller, &callee);
        {
            let session = state
                .calls
                .get_mut(&key)
                .ok_or_else(|| RelayError::NoSuchCall(caller.clone()))?;
            match &session.scope {
                CallScope::Direct {
                    caller: c,
                    callee: e,
                } if *c == caller && *e == callee => {}
                _ => return Err(RelayError::NoSuchCall(caller.clone())),
            }
            session.cancel_timer();
            session.stage = CallStage::Connected;
        }

        let event = ServerEvent::CallAccepted {
            from: callee.clone(),
            signal,
            room_id: None,
            is_group: false,
        };
        state.broadcast_room(&private_room(&caller), None, &event);
        info!(caller = %caller, callee = %callee, "call accepted");
        Ok(())
    }

    /// Forward a mid-call negotiation payload to the other side.
    pub fn webrtc_signal(
        &self,
        conn_id: &str,
        to: Option<UserId>,
        signal: Value,
        room_id: Option<RoomId>,
        is_group: bool,
    ) -> Result<()> {
        let state = self.state();
        let sender = state.require_identity(conn_id)?;

        if is_group {
            let room_id = room_id.ok_or(RelayError::MissingCallTarget)?;
            state.require_member(conn_id, &room_id)?;
            if !state.calls.contains_key(&room_id) {
                return Err(RelayError::NoSuchCall(room_id));
            }

            let event = ServerEvent::WebrtcSignal {
                from: sender,
                signal,
                room_id: Some(room_id.clone()),
                is_group: true,
            };
            state.broadcast_room(&room_id, Some(conn_id), &event);
            return Ok(());
        }

        let peer = to.ok_or(RelayError::MissingCallTarget)?;
        let key = direct_call_key(&sender, &peer);
        if !state.calls.contains_key(&key) {
            return Err(RelayError::NoSuchCall(peer));
        }

        let event = ServerEvent::WebrtcSignal {
            from: sender,
            signal,
            room_id: None,
            is_group: false,
        };
        state.broadcast_room(&private_room(&peer), None, &event);
        Ok(())
    }

    /// Hang up. Ending a call the relay no longer knows about is a no-op
    /// (both sides typically send it).
    pub fn end_call(
        &self,
        conn_id: &str,
        to: Option<UserId>,
        room_id: Option<RoomId>,
        is_group: bool,
    ) -> Result<()> {
        let mut state = self.state();
        let sender = state.require_identity(conn_id)?;

        if is_group {
            let room_id = room_id.ok_or(RelayError::MissingCallTarget)?;
            state.require_member(conn_id, &room_id)?;
            match state.calls.remove(&room_id) {
                Some(mut session) => {
                    session.cancel_timer();
                    let event = ServerEvent::CallEnded {
                        from: sender.clone(),
                        room_id: Some(room_id.clone()),
                        is_group: true,
                    };
                    state.broadcast_room(&room_id, Some(conn_id), &event);
                    info!(user_id = %sender, room_id = %room_id, "group call ended");
                }
                None => debug!(room_id = %room_id, "end_call for unknown session"),
            }
            return Ok(());
        }

        let peer = to.ok_or(RelayError::MissingCallTarget)?;
        let key = direct_call_key(&sender, &peer);
        match state.calls.remove(&key) {
            Some(mut session) => {
                session.cancel_timer();
                let event = ServerEvent::CallEnded {
                    from: sender.clone(),
                    room_id: None,
                    is_group: false,
                };
                state.broadcast_room(&private_room(&peer), None, &event);
                info!(user_id = %sender, peer = %peer, "call ended");
            }
            None => debug!(peer = %peer, "end_call for unknown session"),
        }
        Ok(())
    }

    /// Decline a ringing call.
    pub fn reject_call(
        &self,
        conn_id: &str,
        to: Option<UserId>,
        room_id: Option<RoomId>,
        is_group: bool,
    ) -> Result<()> {
        let mut state = self.state();
        let sender = state.require_identity(conn_id)?;

        if is_group {
            let room_id = room_id.ok_or(RelayError::MissingCallTarget)?;
            state.require_member(conn_id, &room_id)?;
            // One member declining does not end the call for the rest;
            // only the caller hears about it.
            let caller = match state.calls.get(&room_id).map(|s| &s.scope) {
                Some(CallScope::Group { caller, .. }) => caller.clone(),
                _ => {
                    debug!(room_id = %room_id, "reject_call for unknown session");
                    return Ok(());
                }
            };

            let event = ServerEvent::CallRejected {
                from: sender,
                reason: reject_reason::DECLINED.to_string(),
                room_id: Some(room_id.clone()),
                is_group: true,
            };
            state.broadcast_room(&private_room(&caller), None, &event);
            return Ok(());
        }

        let peer = to.ok_or(RelayError::MissingCallTarget)?;
        let key = direct_call_key(&sender, &peer);
        let ringing = state
            .calls
            .get(&key)
            .is_some_and(|s| s.stage == CallStage::Ringing);
        if !ringing {
            debug!(peer = %peer, "reject_call for unknown or answered session");
            return Ok(());
        }
        if let Some(mut session) = state.calls.remove(&key) {
            session.cancel_timer();
        }

        let event = ServerEvent::CallRejected {
            from: sender.clone(),
            reason: reject_reason::DECLINED.to_string(),
            room_id: None,
            is_group: false,
        };
        state.broadcast_room(&private_room(&peer), None, &event);
        info!(user_id = %sender, peer = %peer, "call declined");
        Ok(())
    }

    fn arm_ring_timer(&self, key: String) -> tokio::task::JoinHandle<()> {
        let relay = self.clone();
        let timeout = self.config().ring_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            relay.ring_timeout(&key);
        })
    }

    /// Reject a call that rang out. Invoked only by the ring timer.
    fn ring_timeout(&self, key: &str) {
        let mut state = self.state();
        let still_ringing = state
            .calls
            .get(key)
            .is_some_and(|s| s.stage == CallStage::Ringing);
        if !still_ringing {
            return;
        }
        let Some(session) = state.calls.remove(key) else {
            return;
        };

        match &session.scope {
            CallScope::Direct { caller, callee } => {
                let event = ServerEvent::CallRejected {
                    from: callee.clone(),
                    reason: reject_reason::TIMEOUT.to_string(),
                    room_id: None,
                    is_group: false,
                };
                state.broadcast_room(&private_room(caller), None, &event);
                info!(caller = %caller, callee = %callee, "call rang out");
            }
            CallScope::Group { room_id, caller } => {
                let event = ServerEvent::CallRejected {
                    from: caller.clone(),
                    reason: reject_reason::TIMEOUT.to_string(),
                    room_id: Some(room_id.clone()),
                    is_group: true,
                };
                state.broadcast_room(room_id, None, &event);
                info!(caller = %caller, room_id = %room_id, "group call rang out");
            }
        }
    }
}

/// Tear down every call session a disconnecting user was part of and tell
/// the counterpart. Invoked from the disconnect pass with the state lock
/// already held.
pub(crate) fn end_calls_for_user<O: Outbound>(state: &mut RelayState<O>, user_id: &str) {
    let keys: Vec<String> = state
        .calls
        .iter()
        .filter(|(_, session)| session.involves(user_id))
        .map(|(key, _)| key.clone())
        .collect();

    for key in keys {
        let Some(mut session) = state.calls.remove(&key) else {
            continue;
        };
        session.cancel_timer();

        match &session.scope {
            CallScope::Direct { caller, callee } => {
                let other = if caller == user_id { callee } else { caller };
                let event = ServerEvent::CallEnded {
                    from: user_id.to_string(),
                    room_id: None,
                    is_group: false,
                };
                state.broadcast_room(&private_room(other), None, &event);
            }
            CallScope::Group { room_id, .. } => {
                let event = ServerEvent::CallEnded {
                    from: user_id.to_string(),
                    room_id: Some(room_id.clone()),
                    is_group: true,
                };
                state.broadcast_room(room_id, None, &event);
            }
        }
        debug!(user_id = %user_id, key = %key, "call ended by disconnect");
    }
}
