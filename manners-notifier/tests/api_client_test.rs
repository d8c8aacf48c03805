mod common;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::{init_tracing, spawn_server};
use manners_notifier::traits::TriviaSource;
use manners_notifier::{ApiClient, ApiConfig, Credentials, ErrorKind, NotifierError, PlaceCategory, VotePayload};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Backend {
    votes: Arc<Mutex<Vec<(i64, i64, bool)>>>,
}

#[derive(Deserialize)]
struct VoteCheck {
    user_id: i64,
    common_sense_id: i64,
}

fn item_json(id: i64) -> Value {
    json!({
        "id": id,
        "title": "Let passengers off first",
        "content": "Wait beside the doors until everyone has stepped off.",
        "genres": ["駅"],
        "level": 3
    })
}

async fn list_items() -> Json<Value> {
    Json(json!([
        item_json(1),
        {"id": 2, "title": "Untagged", "content": "No genres yet", "genres": null, "level": 1}
    ]))
}

async fn get_item(Path(id): Path<i64>) -> (StatusCode, Json<Value>) {
    if id == 1 {
        (StatusCode::OK, Json(item_json(1)))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"detail": "Not Found"})))
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["user_name"] == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "username already taken"})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({"user_id": 42, "user_name": body["user_name"]})),
    )
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "secret" {
        (StatusCode::OK, Json(json!({"user_id": 42, "user_name": body["user_name"]})))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid credentials"})))
    }
}

async fn vote(State(backend): State<Backend>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let user_id = body["user_id"].as_i64().unwrap_or_default();
    let item_id = body["common_sense_id"].as_i64().unwrap_or_default();
    let recognized = body["recognized"].as_bool().unwrap_or_default();
    let mut votes = backend.votes.lock().unwrap();
    votes.retain(|(u, c, _)| !(*u == user_id && *c == item_id));
    votes.push((user_id, item_id, recognized));
    (
        StatusCode::CREATED,
        Json(json!({"id": votes.len(), "user_id": user_id, "common_sense_id": item_id, "recognized": recognized})),
    )
}

async fn check_vote(State(backend): State<Backend>, Query(query): Query<VoteCheck>) -> (StatusCode, Json<Value>) {
    let votes = backend.votes.lock().unwrap();
    match votes
        .iter()
        .find(|(u, c, _)| *u == query.user_id && *c == query.common_sense_id)
    {
        Some((u, c, recognized)) => (
            StatusCode::OK,
            Json(json!({"id": 1, "user_id": u, "common_sense_id": c, "recognized": recognized})),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "no vote"}))),
    }
}

async fn stats(Path(id): Path<i64>) -> Response {
    if id == 500 {
        return (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response();
    }
    Json(json!({"common_sense_id": id, "known": 2, "unknown": 1})).into_response()
}

async fn user_votes(Path(user_id): Path<i64>) -> Json<Value> {
    Json(json!([{
        "common_sense_id": user_id + 1,
        "title": "Let passengers off first",
        "content": "Wait beside the doors.",
        "recognized": true
    }]))
}

async fn level(Path(_user_id): Path<i64>) -> Json<Value> {
    Json(json!({"level_sum": 23, "user_level": 2}))
}

async fn start_backend() -> ApiClient {
    init_tracing();
    let app = Router::new()
        .route("/common_sense/", get(list_items))
        .route("/common_sense/{id}", get(get_item))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/level/{user_id}", get(level))
        .route("/vote/", post(vote))
        .route("/vote/check", get(check_vote))
        .route("/vote/stats/{id}", get(stats))
        .route("/vote/user/details/{user_id}", get(user_votes))
        .with_state(Backend::default());
    let base = spawn_server(app).await;
    ApiClient::new(ApiConfig::with_base_url(&base).unwrap()).unwrap()
}

#[tokio::test]
async fn test_list_and_detail() {
    let api = start_backend().await;

    let items = api.list_trivia().await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items[0].is_tagged(PlaceCategory::Station));
    assert_eq!(items[0].difficulty_level, 3);
    assert!(items[1].categories.is_empty());

    let item = api.get_trivia(1).await.unwrap();
    assert_eq!(item.id, 1);

    let catalog = api.catalog().await.unwrap();
    assert_eq!(catalog, items);
}

#[tokio::test]
async fn test_missing_detail_is_an_api_error() {
    let api = start_backend().await;
    match api.get_trivia(77).await {
        Err(NotifierError::Api { status, detail }) => {
            assert_eq!(status, 404);
            assert_eq!(detail, "Not Found");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register_and_login() {
    let api = start_backend().await;

    let user = api
        .register(&Credentials::for_registration("hanako", "secret", "secret").unwrap())
        .await
        .unwrap();
    assert_eq!(user.user_id, 42);
    assert_eq!(user.user_name, "hanako");

    let err = api
        .register(&Credentials::for_registration("taken", "secret", "secret").unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "username already taken");

    let user = api.login(&Credentials::for_login("hanako", "secret").unwrap()).await.unwrap();
    assert_eq!(user.user_name, "hanako");

    let err = api.login(&Credentials::for_login("hanako", "wrong").unwrap()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.user_message(), "Invalid credentials");
}

#[tokio::test]
async fn test_check_vote_before_and_after_voting() {
    let api = start_backend().await;

    assert_eq!(api.check_vote(42, 1).await.unwrap(), None);

    api.vote(&VotePayload {
        user_id: 42,
        trivia_item_id: 1,
        recognized: true,
    })
    .await
    .unwrap();

    let vote = api.check_vote(42, 1).await.unwrap().expect("vote recorded");
    assert!(vote.recognized);
    assert_eq!(vote.trivia_item_id, 1);

    // Voting again replaces the answer
    api.vote(&VotePayload {
        user_id: 42,
        trivia_item_id: 1,
        recognized: false,
    })
    .await
    .unwrap();
    let vote = api.check_vote(42, 1).await.unwrap().expect("vote recorded");
    assert!(!vote.recognized);
}

#[tokio::test]
async fn test_stats_votes_and_level() {
    let api = start_backend().await;

    let stats = api.vote_stats(1).await.unwrap();
    assert_eq!((stats.known, stats.unknown), (2, 1));
    assert_eq!(stats.trivia_item_id, Some(1));

    let votes = api.user_votes(42).await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].common_sense_id, 43);

    let level = api.user_level(42).await.unwrap();
    assert_eq!((level.level_sum, level.user_level), (23, 2));
}

#[tokio::test]
async fn test_error_without_detail_gets_generic_message() {
    let api = start_backend().await;
    match api.vote_stats(500).await {
        Err(NotifierError::Api { status, detail }) => {
            assert_eq!(status, 500);
            assert_eq!(detail, "fetch vote stats failed: 500");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_a_network_error() {
    init_tracing();
    let mut config = ApiConfig::with_base_url("http://127.0.0.1:9/").unwrap();
    config.timeout_seconds = 2;
    let api = ApiClient::new(config).unwrap();
    let err = api.list_trivia().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}
