use huddle_core::{ParticipantId, Presence, RoomKey, Signal};

use crate::integration::{init_tracing, spawn_relay};
use crate::utils::{WsClient, eventually};

#[tokio::test]
async fn test_disconnect_announces_leave() {
    init_tracing();

    let (addr, service) = spawn_relay().await;
    let main = RoomKey::from("main");

    let mut alice = WsClient::connect(addr, "alice").await;
    alice.join("main").await;
    assert!(eventually(2000, || service.room_size(&main) == 1).await);

    let mut bob = WsClient::connect(addr, "bob").await;
    bob.join("main").await;
    alice.recv().await;

    // Bob vanishes without sending leaveRoom
    bob.close().await;

    assert_eq!(
        alice.recv().await,
        Signal::Leave(Presence {
            self_id: ParticipantId::from("bob"),
            room_id: main.clone(),
        })
    );
    assert!(eventually(2000, || service.room_size(&main) == 1).await);

    alice.close().await;
    assert!(eventually(2000, || service.room_count() == 0).await);
}

#[tokio::test]
async fn test_explicit_leave() {
    init_tracing();

    let (addr, service) = spawn_relay().await;
    let main = RoomKey::from("main");

    let mut alice = WsClient::connect(addr, "alice").await;
    alice.join("main").await;
    assert!(eventually(2000, || service.room_size(&main) == 1).await);
    let mut bob = WsClient::connect(addr, "bob").await;
    bob.join("main").await;
    assert!(eventually(2000, || service.room_size(&main) == 2).await);
    alice.recv().await;

    bob.send_raw(r#"{"event":"leaveRoom","data":{"self_id":"bob","room_id":"main"}}"#)
        .await;

    let Signal::Leave(presence) = alice.recv().await else {
        panic!("expected a leave");
    };
    assert_eq!(presence.self_id, ParticipantId::from("bob"));
    assert!(eventually(2000, || service.room_size(&main) == 1).await);
}
