//! Integration tests: grant XP over REST, observe envelopes on the push
//! channel.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use questline_server::{app, AppState, ServerConfig};
use questline_shared::PushEvent;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_server(config: ServerConfig) -> SocketAddr {
    let state = AppState::new(config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}

/// Read push events until one that is not a heartbeat arrives.
async fn next_notification<S>(socket: &mut S) -> PushEvent
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let read = async {
        loop {
            match socket.next().await.expect("channel ended").unwrap() {
                Message::Text(text) => {
                    let event: PushEvent = serde_json::from_str(&text).unwrap();
                    if !event.is_heartbeat() {
                        return event;
                    }
                }
                _ => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("timed out waiting for a notification")
}

/// The first heartbeat is sent right after the server registers the
/// subscription, so waiting for it removes the race between connecting and
/// granting.
async fn wait_for_first_heartbeat<S>(socket: &mut S)
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let read = async {
        loop {
            if let Message::Text(text) = socket.next().await.expect("channel ended").unwrap() {
                let event: PushEvent = serde_json::from_str(&text).unwrap();
                if event.is_heartbeat() {
                    return;
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("no heartbeat after connect");
}

#[tokio::test]
async fn grant_pushes_reward_and_level_up_envelopes() {
    let addr = spawn_server(ServerConfig::default()).await;

    let (mut socket, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws?user_id=7"))
            .await
            .unwrap();
    wait_for_first_heartbeat(&mut socket).await;

    // 150 XP is exactly the level 2 threshold, so one grant produces both an
    // xp_reward and a level_up envelope.
    let client = reqwest::Client::new();
    let stats: questline_shared::UserStats = client
        .post(format!("http://{addr}/api/rewards"))
        .json(&serde_json::json!({
            "user_id": 7,
            "xp_earned": 150,
            "title": "Quest complete",
            "quest_title": "Intro to Rust",
            "source_type": "quest",
            "quest_completed": true
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats.total_xp, 150);
    assert_eq!(stats.level_info.level, 2);
    assert_eq!(stats.quests_completed, 1);

    match next_notification(&mut socket).await {
        PushEvent::XpReward {
            meta,
            xp_earned,
            total_xp,
            quest_data,
        } => {
            assert!(!meta.id.is_empty());
            assert_eq!(meta.user_id, 7);
            assert_eq!(xp_earned, 150);
            assert_eq!(total_xp, 150);
            assert_eq!(quest_data.unwrap().quest_title.as_deref(), Some("Intro to Rust"));
        }
        other => panic!("expected xp_reward, got {other:?}"),
    }

    match next_notification(&mut socket).await {
        PushEvent::LevelUp {
            previous_level,
            new_level,
            ..
        } => {
            assert_eq!(previous_level, 1);
            assert_eq!(new_level, 2);
        }
        other => panic!("expected level_up, got {other:?}"),
    }
}

#[tokio::test]
async fn envelopes_are_scoped_to_the_subscribed_user() {
    let addr = spawn_server(ServerConfig::default()).await;

    let (mut socket, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws?user_id=7"))
            .await
            .unwrap();
    wait_for_first_heartbeat(&mut socket).await;

    let client = reqwest::Client::new();
    for (user_id, title) in [(99, "someone else"), (7, "mine")] {
        client
            .post(format!("http://{addr}/api/rewards"))
            .json(&serde_json::json!({
                "user_id": user_id,
                "xp_earned": 10,
                "title": title
            }))
            .send()
            .await
            .unwrap();
    }

    // Only user 7's envelope arrives.
    match next_notification(&mut socket).await {
        PushEvent::XpReward { meta, .. } => {
            assert_eq!(meta.user_id, 7);
            assert_eq!(meta.title, "mine");
        }
        other => panic!("expected xp_reward, got {other:?}"),
    }
}

#[tokio::test]
async fn first_heartbeat_arrives_immediately() {
    let addr = spawn_server(ServerConfig::default()).await;

    let (mut socket, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws?user_id=7"))
            .await
            .unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .expect("no frame after connect")
        .unwrap()
        .unwrap();
    match first {
        Message::Text(text) => {
            let event: PushEvent = serde_json::from_str(&text).unwrap();
            assert!(event.is_heartbeat());
        }
        other => panic!("expected heartbeat frame, got {other:?}"),
    }
}

#[tokio::test]
async fn rejects_connections_with_a_bad_token() {
    let config = ServerConfig {
        push_token: Some("hunter2".to_string()),
        ..ServerConfig::default()
    };
    let addr = spawn_server(config).await;

    let denied =
        tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws?user_id=7&token=wrong"))
            .await;
    assert!(denied.is_err());

    let allowed =
        tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws?user_id=7&token=hunter2"))
            .await;
    assert!(allowed.is_ok());
}

#[tokio::test]
async fn stats_endpoint_reports_zero_for_unknown_users() {
    let addr = spawn_server(ServerConfig::default()).await;

    let stats: questline_shared::UserStats = reqwest::get(format!("http://{addr}/api/users/42/stats"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats.user_id, 42);
    assert_eq!(stats.total_xp, 0);
    assert_eq!(stats.level_info.level, 1);
}
