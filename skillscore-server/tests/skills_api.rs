use std::time::Duration;

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::ALLOW},
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use skillscore_core::{
    BatchPolicy, MAX_SCORE, ScoreDispatcher, SkillScore,
    dispatch::worker::ScoringOutcome,
};
use skillscore_server::{create_app, routes::SKILLS};
use tower::ServiceExt;

mod common;
use common::{broker_app, saturated_app, worker_app};

const SLOW: Duration = Duration::from_secs(30);

#[tokio::test]
async fn get_returns_stored_score() {
    let app = worker_app(SLOW);
    let last_scored = Utc::now();
    app.store.write("u1", SkillScore::new("Go", 42, last_scored));

    let response = app
        .server
        .get(SKILLS)
        .add_query_param("userID", "u1")
        .add_query_param("skill", "Go")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["skillName"], "Go");
    assert_eq!(body["score"], 42);
    let parsed: DateTime<Utc> =
        body["lastScored"].as_str().unwrap().parse().unwrap();
    assert_eq!(parsed, last_scored);
}

#[tokio::test]
async fn get_miss_is_404_with_empty_body() {
    let app = worker_app(SLOW);

    let response = app
        .server
        .get(SKILLS)
        .add_query_param("userID", "u1")
        .add_query_param("skill", "Go")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.as_bytes().is_empty());
}

#[tokio::test]
async fn get_without_both_params_is_400_and_skips_the_store() {
    let app = worker_app(SLOW);

    for request in [
        app.server.get(SKILLS).add_query_param("userID", "u1"),
        app.server.get(SKILLS).add_query_param("skill", "Go"),
        app.server
            .get(SKILLS)
            .add_query_param("userID", "")
            .add_query_param("skill", "Go"),
    ] {
        let response = request.await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["error"]["status"], 400);
    }

    assert_eq!(app.store.stats().reads, 0);
}

#[tokio::test]
async fn post_with_empty_skills_dispatches_nothing() {
    let app = worker_app(SLOW);

    for body in [json!({"id": "u1", "skills": []}), json!({"id": "u1"})] {
        let response = app.server.post(SKILLS).json(&body).await;
        response.assert_status_ok();
        assert!(response.as_bytes().is_empty());
    }

    assert_eq!(app.pool.stats().enqueued, 0);
}

#[tokio::test]
async fn post_malformed_body_is_400_and_dispatches_nothing() {
    let app = worker_app(SLOW);

    for raw in [r#"{"id": "u1", "skills": ["Go""#, "not json", r#"{"skills": ["Go"]}"#] {
        app.server
            .post(SKILLS)
            .text(raw)
            .await
            .assert_status_bad_request();
    }

    assert_eq!(app.pool.stats().enqueued, 0);
}

#[tokio::test]
async fn post_with_blank_names_is_rejected_before_dispatch() {
    let app = worker_app(SLOW);

    app.server
        .post(SKILLS)
        .json(&json!({"id": "  ", "skills": ["Go"]}))
        .await
        .assert_status_bad_request();
    app.server
        .post(SKILLS)
        .json(&json!({"id": "u1", "skills": ["Go", ""]}))
        .await
        .assert_status_bad_request();

    assert_eq!(app.pool.stats().enqueued, 0);
}

#[tokio::test]
async fn post_accepts_a_body_without_content_type() {
    let app = worker_app(SLOW);
    let router = create_app(app.state.clone());

    let response = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(SKILLS)
                .body(Body::from(r#"{"id":"u1","skills":["Go","Rust"]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.pool.stats().enqueued, 2);
}

#[tokio::test]
async fn other_methods_are_405() {
    let app = worker_app(SLOW);
    let router = create_app(app.state.clone());

    for method in [Method::PUT, Method::DELETE, Method::PATCH, Method::HEAD] {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(SKILLS)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let allow = response.headers()[ALLOW].to_str().unwrap().to_string();
        assert!(allow.contains("GET") && allow.contains("POST"));
    }
}

#[tokio::test]
async fn head_does_not_read_the_store() {
    let app = worker_app(SLOW);
    app.store.write("u1", SkillScore::new("Go", 42, Utc::now()));
    let router = create_app(app.state.clone());

    let response = router
        .oneshot(
            Request::builder()
                .method(Method::HEAD)
                .uri(format!("{SKILLS}?userID=u1&skill=Go"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(app.store.stats().reads, 0);
}

#[tokio::test]
async fn unparseable_query_gets_the_error_envelope() {
    let app = worker_app(SLOW);
    let router = create_app(app.state.clone());

    let response = router
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri(format!("{SKILLS}?userID=a&userID=b&skill=Go"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["status"], 400);
    assert!(body["error"]["message"].as_str().unwrap().contains("userID"));
    assert_eq!(app.store.stats().reads, 0);
}

#[tokio::test]
async fn score_becomes_visible_after_the_worker_completes() {
    let app = worker_app(Duration::from_millis(300));
    let mut outcomes = app.pool.subscribe();
    let posted_at = Utc::now();

    app.server
        .post(SKILLS)
        .json(&json!({"id": "u1", "skills": ["Go"]}))
        .await
        .assert_status_ok();

    app.server
        .get(SKILLS)
        .add_query_param("userID", "u1")
        .add_query_param("skill", "Go")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let outcome = tokio::time::timeout(Duration::from_secs(10), outcomes.recv())
        .await
        .expect("worker finished in time")
        .expect("outcome channel open");
    assert!(matches!(outcome, ScoringOutcome::Completed { ref user_id, .. } if user_id == "u1"));

    let response = app
        .server
        .get(SKILLS)
        .add_query_param("userID", "u1")
        .add_query_param("skill", "Go")
        .await;
    response.assert_status_ok();

    let score: SkillScore = response.json();
    assert_eq!(score.skill_name, "Go");
    assert!(score.score < MAX_SCORE);
    assert!(score.last_scored > posted_at);
}

#[tokio::test]
async fn broker_strategy_publishes_one_keyed_message_per_skill() {
    let app = broker_app();

    app.server
        .post(SKILLS)
        .json(&json!({"id": "u1", "skills": ["Go", "Kafka"]}))
        .await
        .assert_status_ok();
    app.emitter.shutdown().await;

    let messages = app.transport.messages();
    assert_eq!(messages.len(), 2);
    for (message, skill) in messages.iter().zip(["Go", "Kafka"]) {
        assert_eq!(message.topic, "skill-score-requests");
        assert_eq!(message.key, "u1");
        let payload: Value = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(payload, json!({"skillName": skill, "profileID": "u1"}));
    }

    // Scoring happens elsewhere; nothing lands in the local store.
    assert_eq!(app.store.stats().writes, 0);
}

#[tokio::test]
async fn best_effort_batch_is_accepted_despite_failures() {
    let (server, dispatcher) = saturated_app(1, BatchPolicy::BestEffort);

    server
        .post(SKILLS)
        .json(&json!({"id": "u1", "skills": ["Go", "Rust", "Kafka"]}))
        .await
        .assert_status_ok();

    let stats = dispatcher.stats();
    assert_eq!(stats.enqueued, 1);
    assert_eq!(stats.failed, 2);
}

#[tokio::test]
async fn all_or_nothing_batch_fails_with_503_at_first_failure() {
    let (server, dispatcher) = saturated_app(1, BatchPolicy::AllOrNothing);

    let response = server
        .post(SKILLS)
        .json(&json!({"id": "u1", "skills": ["Go", "Rust", "Kafka"]}))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["error"]["status"], 503);
    assert!(body["error"]["message"].as_str().unwrap().contains("Rust"));

    let stats = dispatcher.stats();
    assert_eq!(stats.enqueued, 1);
    assert_eq!(stats.failed, 1);
}
