use axum::http::StatusCode;
use referro::api;
use referro::config::Config;
use referro::db::init_db;
use referro::domain::{MemberCode, MemberId, TimeMs};
use referro::engine::{
    PlacementAlgorithm, PlacementEngine, StatsCache, TreeStatsEngine, TtlStatsCache,
};
use referro::orchestration::{Distributor, Registrar};
use referro::CommissionStructure;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    repo: Arc<referro::Repository>,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(referro::Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        root_member_id: MemberId::new(1),
        placement_algorithm: PlacementAlgorithm::Balanced,
        max_search_depth: 10,
        stats_cache_ttl_ms: 60_000,
    };

    let cache: Arc<dyn StatsCache> = Arc::new(TtlStatsCache::new(config.stats_cache_ttl_ms));
    let stats = TreeStatsEngine::new(cache.clone());
    let placement = PlacementEngine::new(stats.clone(), config.root_member_id);
    let registrar = Arc::new(Registrar::new(
        repo.clone(),
        placement,
        cache,
        config.clone(),
    ));
    let distributor = Arc::new(Distributor::new(
        repo.clone(),
        stats,
        CommissionStructure::default(),
        config.root_member_id,
    ));

    let state = api::AppState::new(repo.clone(), config, registrar, distributor);
    let app = api::create_router(state);

    TestApp {
        app,
        repo,
        _temp: temp_dir,
    }
}

async fn seed_root(repo: &referro::Repository) -> MemberId {
    repo.insert_member(&MemberCode::from_sequence(1), None, TimeMs::new(0))
        .await
        .unwrap()
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_ready_reports_member_count() {
    let test_app = setup_test_app().await;
    seed_root(&test_app.repo).await;
    post_json(test_app.app.clone(), "/v1/members", serde_json::json!({})).await;

    let (status, json) = get_json(test_app.app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ready");
    assert_eq!(json["members"], 2);
}

#[tokio::test]
async fn test_register_without_sponsor_lands_under_root() {
    let test_app = setup_test_app().await;
    seed_root(&test_app.repo).await;

    let (status, json) = post_json(test_app.app, "/v1/members", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);

    assert!(json["memberId"].is_i64());
    assert_eq!(json["code"], "RF100002");
    assert_eq!(json["parentId"], 1);
    assert_eq!(json["side"], "left");
    assert_eq!(json["depth"], 1);
}

#[tokio::test]
async fn test_register_with_sponsor_code() {
    let test_app = setup_test_app().await;
    let root = seed_root(&test_app.repo).await;

    let (status, json) = post_json(
        test_app.app,
        "/v1/members",
        serde_json::json!({"sponsorCode": "RF100001", "preferredSide": "right"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["parentId"], root.as_i64());
    assert_eq!(json["side"], "right");
}

#[tokio::test]
async fn test_register_unknown_sponsor_code_is_400() {
    let test_app = setup_test_app().await;
    seed_root(&test_app.repo).await;

    let (status, json) = post_json(
        test_app.app,
        "/v1/members",
        serde_json::json!({"sponsorCode": "RF999999"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_register_invalid_preferred_side_is_400() {
    let test_app = setup_test_app().await;
    seed_root(&test_app.repo).await;

    let (status, _) = post_json(
        test_app.app,
        "/v1/members",
        serde_json::json!({"preferredSide": "up"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registration_persists_linkage() {
    let test_app = setup_test_app().await;
    let root = seed_root(&test_app.repo).await;

    let (status, json) =
        post_json(test_app.app.clone(), "/v1/members", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let member = test_app
        .repo
        .get_member(MemberId::new(json["memberId"].as_i64().unwrap()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(member.sponsor_id, Some(root));

    let parent = test_app.repo.get_member(root).await.unwrap().unwrap();
    assert_eq!(parent.left_child, Some(member.id));
}
