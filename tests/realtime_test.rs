mod common;

use std::time::Duration;

use match_sync::dao::match_store::MatchStore;
use match_sync::dao::models::ScoreEntity;
use match_sync::state::match_status::MatchStatus;
use serde_json::json;
use tokio_tungstenite::tungstenite;

use common::{
    connect, eventually, expect_event, expect_silence, send, spawn_server, subscribe, token,
    try_connect,
};

#[tokio::test]
async fn coach_subscribes_and_outsider_is_refused() {
    let server = spawn_server().await;
    let mut coach = connect(&server, "coach1").await;
    let mut outsider = connect(&server, "outsider").await;

    let snapshot = subscribe(&mut coach, "m1").await;
    assert_eq!(snapshot["id"], "m1");
    assert_eq!(snapshot["status"], "upcoming");
    assert_eq!(snapshot["homeTeamName"], "Home FC");
    assert_eq!(snapshot["awayTeamName"], "Away FC");

    send(&mut outsider, "subscribe-match", json!({ "matchId": "m1" })).await;
    let error = expect_event(&mut outsider, "error").await;
    assert_eq!(error["kind"], "permission_denied");

    assert_eq!(server.state.topics().member_count("m1"), 1);
    expect_silence(&mut coach).await;
}

#[tokio::test]
async fn score_update_reaches_every_subscriber_and_persists() {
    let server = spawn_server().await;
    let mut home = connect(&server, "coach1").await;
    let mut away = connect(&server, "coach2").await;
    subscribe(&mut home, "m1").await;
    subscribe(&mut away, "m1").await;

    send(
        &mut home,
        "match-update",
        json!({ "matchId": "m1", "updateType": "score", "updateData": { "home": 2, "away": 1 } }),
    )
    .await;

    for client in [&mut home, &mut away] {
        let update = expect_event(client, "match-updated").await;
        assert_eq!(update["matchId"], "m1");
        assert_eq!(update["updateType"], "score");
        assert_eq!(update["updatedBy"], "Coach One");
        assert_eq!(update["updateData"], json!({ "home": 2, "away": 1 }));
    }

    let stored = server
        .store
        .find_match("m1".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.score, ScoreEntity { home: 2, away: 1 });
    assert_eq!(server.store.mutation_log("m1").await.len(), 1);
}

#[tokio::test]
async fn disconnected_member_leaves_the_topic() {
    let server = spawn_server().await;
    let mut home = connect(&server, "coach1").await;
    let mut away = connect(&server, "coach2").await;
    subscribe(&mut home, "m1").await;
    subscribe(&mut away, "m1").await;

    home.close(None).await.unwrap();
    let state = server.state.clone();
    eventually(|| state.topics().member_count("m1") == 1).await;

    send(
        &mut away,
        "match-update",
        json!({ "matchId": "m1", "updateType": "score", "updateData": { "home": 0, "away": 1 } }),
    )
    .await;
    let update = expect_event(&mut away, "match-updated").await;
    assert_eq!(update["updatedBy"], "Coach Two");
    assert_eq!(server.state.topics().member_count("m1"), 1);
    assert_eq!(server.state.registry().connection_count(), 1);
}

#[tokio::test]
async fn chat_message_is_identical_for_every_member() {
    let server = spawn_server().await;
    let mut home = connect(&server, "coach1").await;
    let mut away = connect(&server, "coach2").await;
    subscribe(&mut home, "m1").await;
    subscribe(&mut away, "m1").await;

    send(
        &mut home,
        "chat-message",
        json!({ "matchId": "m1", "message": "nice save" }),
    )
    .await;

    let sent = expect_event(&mut home, "new-message").await;
    let received = expect_event(&mut away, "new-message").await;
    assert_eq!(sent, received);
    assert_eq!(sent["content"], "nice save");
    assert_eq!(sent["userName"], "Coach One");
    assert_eq!(server.store.chat_messages("m1").await.len(), 1);
}

#[tokio::test]
async fn completed_match_cannot_be_reopened() {
    let server = spawn_server().await;
    let mut home = connect(&server, "coach1").await;
    let mut away = connect(&server, "coach2").await;
    subscribe(&mut home, "m2").await;
    subscribe(&mut away, "m2").await;

    send(
        &mut home,
        "match-update",
        json!({ "matchId": "m2", "updateType": "status", "updateData": { "status": "ongoing" } }),
    )
    .await;

    let error = expect_event(&mut home, "error").await;
    assert_eq!(error["kind"], "invalid_mutation");
    expect_silence(&mut away).await;

    let stored = server
        .store
        .find_match("m2".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MatchStatus::Completed);
}

#[tokio::test]
async fn rejected_handshake_never_registers() {
    let server = spawn_server().await;

    for credential in [None, Some("garbage".to_owned()), Some(token("ghost"))] {
        let err = try_connect(server.addr, credential.as_deref())
            .await
            .err()
            .expect("handshake should fail");
        let tungstenite::Error::Http(response) = err else {
            panic!("expected http rejection, got {err:?}");
        };
        assert_eq!(response.status(), 401);
    }
    assert_eq!(server.state.registry().connection_count(), 0);
}

#[tokio::test]
async fn query_token_is_accepted() {
    let server = spawn_server().await;
    let url = format!("ws://{}/ws?token={}", server.addr, token("coach2"));
    let (mut client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let greeting = expect_event(&mut client, "connected").await;
    assert_eq!(greeting["userName"], "Coach Two");
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let server = spawn_server().await;
    let mut home = connect(&server, "coach1").await;
    let mut away = connect(&server, "coach2").await;
    subscribe(&mut home, "m1").await;
    subscribe(&mut away, "m1").await;

    for _ in 0..2 {
        send(&mut home, "unsubscribe-match", json!({ "matchId": "m1" })).await;
    }
    send(&mut home, "unsubscribe-match", json!({ "matchId": "m2" })).await;
    expect_silence(&mut home).await;

    send(
        &mut away,
        "match-update",
        json!({ "matchId": "m1", "updateType": "score", "updateData": { "home": 1, "away": 1 } }),
    )
    .await;
    expect_event(&mut away, "match-updated").await;
    expect_silence(&mut home).await;
    assert_eq!(server.state.topics().member_count("m1"), 1);
}

#[tokio::test]
async fn typing_indicator_skips_the_sender() {
    let server = spawn_server().await;
    let mut home = connect(&server, "coach1").await;
    let mut away = connect(&server, "coach2").await;
    subscribe(&mut home, "m1").await;
    subscribe(&mut away, "m1").await;

    send(&mut home, "typing-start", json!({ "matchId": "m1" })).await;
    let typing = expect_event(&mut away, "user-typing").await;
    assert_eq!(typing["userId"], "coach1");

    send(&mut home, "typing-stop", json!({ "matchId": "m1" })).await;
    expect_event(&mut away, "user-stopped-typing").await;
    expect_silence(&mut home).await;
}

#[tokio::test]
async fn failed_persistence_is_never_broadcast() {
    let server = spawn_server().await;
    let mut home = connect(&server, "coach1").await;
    let mut away = connect(&server, "coach2").await;
    subscribe(&mut home, "m1").await;
    subscribe(&mut away, "m1").await;

    server.store.set_reject_writes(true);
    send(
        &mut home,
        "match-update",
        json!({ "matchId": "m1", "updateType": "score", "updateData": { "home": 5, "away": 0 } }),
    )
    .await;

    let error = expect_event(&mut home, "error").await;
    assert_eq!(error["kind"], "unavailable");
    assert_eq!(error["message"], "service temporarily unavailable");
    expect_silence(&mut away).await;
}

#[tokio::test]
async fn malformed_frames_keep_the_connection_open() {
    let server = spawn_server().await;
    let mut client = connect(&server, "coach1").await;

    send(&mut client, "dance", json!({})).await;
    let error = expect_event(&mut client, "error").await;
    assert_eq!(error["kind"], "invalid_request");

    send(&mut client, "match-update", json!({ "matchId": "m1", "updateType": "weather", "updateData": {} })).await;
    let error = expect_event(&mut client, "error").await;
    assert_eq!(error["kind"], "invalid_mutation");

    let snapshot = subscribe(&mut client, "m1").await;
    assert_eq!(snapshot["id"], "m1");
}

#[tokio::test]
async fn slow_store_fails_with_unavailable() {
    let server = spawn_server().await;
    let mut client = connect(&server, "coach1").await;
    server.store.set_latency(Duration::from_secs(2));

    send(&mut client, "subscribe-match", json!({ "matchId": "m1" })).await;
    let error = expect_event(&mut client, "error").await;
    assert_eq!(error["kind"], "unavailable");
    assert_eq!(server.state.topics().member_count("m1"), 0);
}
