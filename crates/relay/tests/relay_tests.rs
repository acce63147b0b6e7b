//! End-to-end relay tests over the public API.
//!
//! Each "client" is a recording [`Outbound`] handle; tests drive the relay
//! the way the gateway does and assert on what each client observed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use relay::{
    reject_reason, ChatMessage, ClientEvent, Outbound, Relay, RelayConfig, RelayError, ServerEvent,
};

#[derive(Clone, Default)]
struct Client {
    events: Arc<Mutex<Vec<ServerEvent>>>,
}

impl Client {
    fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> Vec<ServerEvent> {
        self.events.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Outbound for Client {
    fn deliver(&self, event: &ServerEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Connect and announce two users, returning their recording handles.
fn two_users(relay: &Relay<Client>) -> (Client, Client) {
    let alice = Client::new();
    let bob = Client::new();
    relay.connect("ca".to_string(), alice.clone());
    relay.connect("cb".to_string(), bob.clone());
    relay.announce("ca", "alice".to_string()).unwrap();
    relay.announce("cb", "bob".to_string()).unwrap();
    alice.clear();
    bob.clear();
    (alice, bob)
}

fn rejected_with(events: &[ServerEvent], reason: &str) -> bool {
    events
        .iter()
        .any(|e| matches!(e, ServerEvent::CallRejected { reason: r, .. } if r == reason))
}

#[tokio::test]
async fn direct_call_flow_reaches_only_the_counterpart() {
    let relay: Relay<Client> = Relay::new(RelayConfig::default());
    let (alice, bob) = two_users(&relay);

    relay
        .call_user(
            "ca",
            Some("bob".to_string()),
            json!({"sdp": "offer"}),
            "Alice".to_string(),
            None,
            false,
        )
        .unwrap();

    // Offer rings bob, not alice.
    assert!(alice.events().is_empty());
    assert!(matches!(
        &bob.events()[0],
        ServerEvent::IncomingCall { from, .. } if from == "alice"
    ));

    relay
        .accept_call(
            "cb",
            Some("alice".to_string()),
            json!({"sdp": "answer"}),
            None,
            false,
        )
        .unwrap();
    assert!(matches!(
        alice.events().last().unwrap(),
        ServerEvent::CallAccepted { from, .. } if from == "bob"
    ));

    alice.clear();
    bob.clear();

    relay
        .webrtc_signal(
            "ca",
            Some("bob".to_string()),
            json!({"candidate": "a"}),
            None,
            false,
        )
        .unwrap();
    relay
        .webrtc_signal(
            "cb",
            Some("alice".to_string()),
            json!({"candidate": "b"}),
            None,
            false,
        )
        .unwrap();

    // Each candidate went only to the other side.
    assert_eq!(alice.events().len(), 1);
    assert_eq!(bob.events().len(), 1);
    assert!(matches!(
        &alice.events()[0],
        ServerEvent::WebrtcSignal { from, .. } if from == "bob"
    ));
    assert!(matches!(
        &bob.events()[0],
        ServerEvent::WebrtcSignal { from, .. } if from == "alice"
    ));

    alice.clear();
    bob.clear();

    relay
        .end_call("ca", Some("bob".to_string()), None, false)
        .unwrap();
    assert!(alice.events().is_empty());
    assert!(matches!(
        &bob.events()[0],
        ServerEvent::CallEnded { from, .. } if from == "alice"
    ));
}

#[tokio::test]
async fn signal_without_established_call_is_refused() {
    let relay: Relay<Client> = Relay::new(RelayConfig::default());
    let (_alice, bob) = two_users(&relay);

    let result = relay.webrtc_signal(
        "ca",
        Some("bob".to_string()),
        json!({"candidate": "x"}),
        None,
        false,
    );
    assert!(matches!(result, Err(RelayError::NoSuchCall(_))));
    assert!(bob.events().is_empty());
}

#[tokio::test]
async fn calling_an_offline_user_fails_fast() {
    let relay: Relay<Client> = Relay::new(RelayConfig::default());
    let (_alice, _bob) = two_users(&relay);

    let result = relay.call_user(
        "ca",
        Some("carol".to_string()),
        json!({"sdp": "offer"}),
        "Alice".to_string(),
        None,
        false,
    );
    assert!(matches!(result, Err(RelayError::UserOffline(u)) if u == "carol"));
}

#[tokio::test(start_paused = true)]
async fn unanswered_call_rings_out() {
    let relay: Relay<Client> =
        Relay::new(RelayConfig::default().with_ring_timeout(Duration::from_secs(45)));
    let (alice, bob) = two_users(&relay);

    relay
        .call_user(
            "ca",
            Some("bob".to_string()),
            json!({"sdp": "offer"}),
            "Alice".to_string(),
            None,
            false,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_secs(46)).await;

    assert!(rejected_with(&alice.events(), reject_reason::TIMEOUT));
    // The callee is not notified twice; only the original ring.
    assert_eq!(bob.events().len(), 1);

    // The session is gone: further signals are refused.
    let result = relay.webrtc_signal(
        "ca",
        Some("bob".to_string()),
        json!({"candidate": "x"}),
        None,
        false,
    );
    assert!(matches!(result, Err(RelayError::NoSuchCall(_))));
}

#[tokio::test(start_paused = true)]
async fn accepting_cancels_the_ring_timer() {
    let relay: Relay<Client> =
        Relay::new(RelayConfig::default().with_ring_timeout(Duration::from_secs(45)));
    let (alice, _bob) = two_users(&relay);

    relay
        .call_user(
            "ca",
            Some("bob".to_string()),
            json!({"sdp": "offer"}),
            "Alice".to_string(),
            None,
            false,
        )
        .unwrap();
    relay
        .accept_call(
            "cb",
            Some("alice".to_string()),
            json!({"sdp": "answer"}),
            None,
            false,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(!rejected_with(&alice.events(), reject_reason::TIMEOUT));
}

#[tokio::test]
async fn declined_call_notifies_the_caller() {
    let relay: Relay<Client> = Relay::new(RelayConfig::default());
    let (alice, bob) = two_users(&relay);

    relay
        .call_user(
            "ca",
            Some("bob".to_string()),
            json!({"sdp": "offer"}),
            "Alice".to_string(),
            None,
            false,
        )
        .unwrap();
    relay
        .reject_call("cb", Some("alice".to_string()), None, false)
        .unwrap();

    assert!(rejected_with(&alice.events(), reject_reason::DECLINED));
    // Declining tears the session down; a new call can start.
    bob.clear();
    relay
        .call_user(
            "ca",
            Some("bob".to_string()),
            json!({"sdp": "offer2"}),
            "Alice".to_string(),
            None,
            false,
        )
        .unwrap();
    assert!(matches!(&bob.events()[0], ServerEvent::IncomingCall { .. }));
}

#[tokio::test]
async fn disconnect_ends_calls_for_the_counterpart() {
    let relay: Relay<Client> = Relay::new(RelayConfig::default());
    let (alice, bob) = two_users(&relay);

    relay
        .call_user(
            "ca",
            Some("bob".to_string()),
            json!({"sdp": "offer"}),
            "Alice".to_string(),
            None,
            false,
        )
        .unwrap();
    relay
        .accept_call(
            "cb",
            Some("alice".to_string()),
            json!({"sdp": "answer"}),
            None,
            false,
        )
        .unwrap();
    alice.clear();
    bob.clear();

    relay.disconnect("cb");

    assert!(alice
        .events()
        .iter()
        .any(|e| matches!(e, ServerEvent::CallEnded { from, .. } if from == "bob")));
}

#[tokio::test]
async fn group_call_flow() {
    let relay: Relay<Client> = Relay::new(RelayConfig::default());
    let caller = Client::new();
    let member1 = Client::new();
    let member2 = Client::new();
    relay.connect("c0".to_string(), caller.clone());
    relay.connect("c1".to_string(), member1.clone());
    relay.connect("c2".to_string(), member2.clone());
    relay.announce("c0", "caller".to_string()).unwrap();
    relay.announce("c1", "m1".to_string()).unwrap();
    relay.announce("c2", "m2".to_string()).unwrap();
    for conn in ["c0", "c1", "c2"] {
        relay.join_room(conn, "standup").unwrap();
    }
    caller.clear();
    member1.clear();
    member2.clear();

    relay
        .call_user(
            "c0",
            None,
            json!({"sdp": "offer"}),
            "Caller".to_string(),
            Some("standup".to_string()),
            true,
        )
        .unwrap();

    // Ring reaches the room, not the caller.
    assert!(caller.events().is_empty());
    assert!(matches!(&member1.events()[0], ServerEvent::IncomingCall { is_group: true, .. }));
    assert!(matches!(&member2.events()[0], ServerEvent::IncomingCall { is_group: true, .. }));

    relay
        .accept_call(
            "c1",
            None,
            json!({"sdp": "answer"}),
            Some("standup".to_string()),
            true,
        )
        .unwrap();
    assert!(matches!(
        caller.events().last().unwrap(),
        ServerEvent::CallAccepted { from, .. } if from == "m1"
    ));

    relay
        .end_call("c0", None, Some("standup".to_string()), true)
        .unwrap();
    assert!(member1
        .events()
        .iter()
        .any(|e| matches!(e, ServerEvent::CallEnded { from, .. } if from == "caller")));
}

#[tokio::test]
async fn group_call_requires_membership() {
    let relay: Relay<Client> = Relay::new(RelayConfig::default());
    let (_alice, _bob) = two_users(&relay);

    let result = relay.call_user(
        "ca",
        None,
        json!({"sdp": "offer"}),
        "Alice".to_string(),
        Some("standup".to_string()),
        true,
    );
    assert!(matches!(result, Err(RelayError::NotInRoom(_))));
}

#[tokio::test]
async fn handle_replies_with_error_event_on_refusal() {
    let relay: Relay<Client> = Relay::new(RelayConfig::default());
    let client = Client::new();
    relay.connect("c1".to_string(), client.clone());

    // Typing before announcing presence is refused.
    relay.handle(
        "c1",
        ClientEvent::Typing {
            room_id: "team-1".to_string(),
            user_name: "Nobody".to_string(),
        },
    );

    assert!(matches!(&client.events()[0], ServerEvent::Error { .. }));
}

#[tokio::test]
async fn handle_dispatches_full_message_flow() {
    let relay: Relay<Client> = Relay::new(RelayConfig::default());
    let (alice, bob) = two_users(&relay);
    relay.handle(
        "ca",
        ClientEvent::JoinRoom {
            room_id: "team-1".to_string(),
        },
    );
    relay.handle(
        "cb",
        ClientEvent::JoinRoom {
            room_id: "team-1".to_string(),
        },
    );
    alice.clear();
    bob.clear();

    relay.handle(
        "ca",
        ClientEvent::SendMessage {
            message: ChatMessage {
                id: "m1".to_string(),
                room: "team-1".to_string(),
                sender_id: "alice".to_string(),
                sender_name: "Alice".to_string(),
                receiver_id: None,
                body: "standup in 5".to_string(),
                sent_at: "2025-03-10T09:00:00+00:00".to_string(),
            },
        },
    );

    assert!(matches!(
        &bob.events()[0],
        ServerEvent::NewMessage { message } if message.id == "m1"
    ));
    // The sender gets the room echo.
    assert!(matches!(
        &alice.events()[0],
        ServerEvent::NewMessage { message } if message.id == "m1"
    ));
}
