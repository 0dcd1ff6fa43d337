//! End-to-end tests: a real server on loopback sockets and real clients.

use std::time::Duration;

use homestead::prelude::*;
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_secs(5);

// =========================================================================
// Helpers
// =========================================================================

struct RunningServer {
    tcp: String,
    udp: String,
    handle: ShutdownHandle,
    task: JoinHandle<HomesteadServer>,
}

impl RunningServer {
    async fn stop(self) -> HomesteadServer {
        self.handle.shutdown();
        tokio::time::timeout(TIMEOUT, self.task)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
    }
}

fn start_server() -> RunningServer {
    let mut server = HomesteadServer::builder()
        .bind("127.0.0.1:0", "127.0.0.1:0")
        .start()
        .expect("server starts");
    let tcp = server.tcp_addr().to_string();
    let udp = server.udp_addr().to_string();
    let handle = server.shutdown_handle();
    let task = tokio::spawn(async move {
        server.run().await.expect("run succeeds");
        server
    });
    RunningServer {
        tcp,
        udp,
        handle,
        task,
    }
}

fn client_config(server: &RunningServer) -> ClientConfig {
    ClientConfig {
        server_tcp_addr: server.tcp.clone(),
        server_udp_addr: server.udp.clone(),
        client_udp_addr: "127.0.0.1:0".into(),
        ..ClientConfig::default()
    }
}

fn login(server: &RunningServer, username: &str, password: &str) -> ClientSession {
    let client = NetworkClient::connect(&client_config(server)).expect("client connects");
    ClientSession::start(client, username, password).expect("login starts")
}

/// Updates every session until `done` holds or the timeout passes.
async fn pump_until(
    sessions: &mut [&mut ClientSession],
    mut done: impl FnMut(&[&mut ClientSession]) -> bool,
) -> bool {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        for session in sessions.iter_mut() {
            session.update().expect("session update");
        }
        if done(sessions) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn enter_world(session: &mut ClientSession) {
    let entered = pump_until(&mut [session], |s| {
        s[0].state() == SessionState::InWorld && s[0].local_entity().is_some()
    })
    .await;
    assert!(entered, "client never reached its character");
}

// =========================================================================
// Login and world entry
// =========================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_login_new_user_enters_starting_world() {
    let server = start_server();
    let mut alice = login(&server, "alice", "hunter2");
    assert_eq!(alice.state(), SessionState::RequestingHash);

    enter_world(&mut alice).await;

    assert!(alice.player_id().is_player());
    let world = alice.world().expect("world loaded");
    assert_eq!(world.name(), "farm");
    let me = world.local_character().expect("own character");
    assert_eq!(me.player_id, alice.player_id());

    let stopped = server.stop().await;
    assert!(stopped.tick_metrics().total_ticks > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_second_client_sees_first() {
    let server = start_server();
    let mut alice = login(&server, "alice", "hunter2");
    enter_world(&mut alice).await;
    let mut bob = login(&server, "bob", "carrots");
    enter_world(&mut bob).await;

    let alice_entity = alice.local_entity().expect("alice has a character");
    let bob_entity = bob.local_entity().expect("bob has a character");
    assert_ne!(alice_entity, bob_entity);
    assert_ne!(alice.player_id(), bob.player_id());

    let both_visible = pump_until(&mut [&mut alice, &mut bob], |s| {
        let sees = |session: &ClientSession, id| {
            session.world().is_some_and(|w| w.character(id).is_some())
        };
        sees(&*s[0], bob_entity) && sees(&*s[1], alice_entity)
    })
    .await;
    assert!(both_visible);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_wrong_password_rejected() {
    let server = start_server();
    let mut alice = login(&server, "alice", "hunter2");
    enter_world(&mut alice).await;

    let mut impostor = login(&server, "alice", "letmein");
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    let mut error = None;
    while tokio::time::Instant::now() < deadline {
        if let Err(e) = impostor.update() {
            error = Some(e);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(matches!(
        error,
        Some(HomesteadError::Session(
            homestead::session_layer::SessionError::AuthFailed(_)
        ))
    ));
    assert_eq!(impostor.state(), SessionState::Rejected);
    assert!(impostor.world().is_none());

    server.stop().await;
}

// =========================================================================
// In-world traffic
// =========================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_move_character_reaches_other_client() {
    let server = start_server();
    let mut alice = login(&server, "alice", "hunter2");
    enter_world(&mut alice).await;
    let mut bob = login(&server, "bob", "carrots");
    enter_world(&mut bob).await;
    let alice_entity = alice.local_entity().expect("alice has a character");

    assert!(alice.move_character(12.0, 34.0).expect("move sent"));

    let arrived = pump_until(&mut [&mut alice, &mut bob], |s| {
        s[1].world()
            .and_then(|w| w.character(alice_entity))
            .is_some_and(|c| {
                let (x, y) = c.target();
                (x - 12.0).abs() < 0.5 && (y - 34.0).abs() < 0.5
            })
    })
    .await;
    assert!(arrived, "bob never saw alice move");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_delivered_to_others_with_username() {
    let server = start_server();
    let mut alice = login(&server, "alice", "hunter2");
    enter_world(&mut alice).await;
    let mut bob = login(&server, "bob", "carrots");
    enter_world(&mut bob).await;

    alice.chat("the turnips are ready").expect("chat sent");

    let delivered = pump_until(&mut [&mut alice, &mut bob], |s| {
        s[1].world().is_some_and(|w| {
            w.chat()
                .iter()
                .any(|m| m.username == "alice" && m.message == "the turnips are ready")
        })
    })
    .await;
    assert!(delivered);
    let echoed = alice
        .world()
        .is_some_and(|w| w.chat().iter().any(|m| m.message == "the turnips are ready"));
    assert!(!echoed, "sender should not receive its own line");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disconnect_removes_character_for_others() {
    let server = start_server();
    let mut alice = login(&server, "alice", "hunter2");
    enter_world(&mut alice).await;
    let mut bob = login(&server, "bob", "carrots");
    enter_world(&mut bob).await;
    let bob_entity = bob.local_entity().expect("bob has a character");

    let seen = pump_until(&mut [&mut alice], |s| {
        s[0].world().is_some_and(|w| w.character(bob_entity).is_some())
    })
    .await;
    assert!(seen);

    bob.shutdown();
    drop(bob);

    let gone = pump_until(&mut [&mut alice], |s| {
        s[0].world().is_some_and(|w| w.character(bob_entity).is_none())
    })
    .await;
    assert!(gone, "bob's character was never removed");

    let stopped = server.stop().await;
    assert_eq!(stopped.handler().players().authenticated_count(), 1);
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_disconnects_clients() {
    let server = start_server();
    let mut alice = login(&server, "alice", "hunter2");
    enter_world(&mut alice).await;

    server.stop().await;

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while alice.client().is_connected() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!alice.client().is_connected());
    assert!(matches!(
        alice.chat("anyone there?"),
        Err(HomesteadError::Disconnected)
    ));
}

#[tokio::test]
async fn test_run_stops_on_current_thread_runtime() {
    let server = start_server();
    let mut alice = login(&server, "alice", "hunter2");
    enter_world(&mut alice).await;

    let stopped = server.stop().await;

    assert!(stopped.tick_metrics().total_ticks > 0);
}
