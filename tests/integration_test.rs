//! End-to-end flow: build a small network through the API, run both
//! commission engines, and check that persisted wallets and transactions
//! stay consistent with each other.

use axum::http::StatusCode;
use referro::api;
use referro::config::Config;
use referro::db::init_db;
use referro::domain::{Decimal, MemberCode, MemberId, TimeMs, TransactionStatus};
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

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
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

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
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

async fn activate(repo: &referro::Repository, id: MemberId) {
    let mut m = repo.get_member(id).await.unwrap().unwrap();
    m.monthly_sales = d("20");
    m.annual_sales = d("200");
    m.total_investment = d("100");
    m.is_active = true;
    repo.update_member(&m).await.unwrap();
}

#[tokio::test]
async fn test_register_sell_and_reconcile() {
    let test_app = setup_test_app().await;
    let root = test_app
        .repo
        .insert_member(&MemberCode::from_sequence(1), None, TimeMs::new(0))
        .await
        .unwrap();
    activate(&test_app.repo, root).await;

    // Grow the network through the API; placement keeps slots unique.
    let mut member_ids = vec![root];
    for _ in 0..4 {
        let (status, json) =
            post_json(test_app.app.clone(), "/v1/members", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let id = MemberId::new(json["memberId"].as_i64().unwrap());
        activate(&test_app.repo, id).await;
        member_ids.push(id);
    }

    // Binary tree filled top-down: root carries both legs.
    let (status, json) = get(
        test_app.app.clone(),
        &format!("/v1/network/stats?memberId={}", root.as_i64()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let total_count =
        json["leftCount"].as_u64().unwrap() + json["rightCount"].as_u64().unwrap();
    assert_eq!(total_count, 4);

    // One monoline sale by the last member and one classic purchase.
    let buyer = *member_ids.last().unwrap();
    let (status, sale) = post_json(
        test_app.app.clone(),
        "/v1/sales",
        serde_json::json!({"buyerId": buyer.as_i64()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(
        test_app.app.clone(),
        "/v1/purchases",
        serde_json::json!({"buyerId": buyer.as_i64(), "amount": 500.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Every persisted transaction for the sale is terminal and the wallet
    // totals reconcile with what the responses reported.
    let sale_id = uuid::Uuid::parse_str(sale["saleId"].as_str().unwrap()).unwrap();
    let stored = test_app
        .repo
        .query_transactions_for_sale(sale_id)
        .await
        .unwrap();
    assert!(!stored.is_empty());
    assert!(stored
        .iter()
        .all(|t| t.status != TransactionStatus::Pending));

    let mut total_earnings = Decimal::zero();
    for &id in &member_ids {
        let m = test_app.repo.get_member(id).await.unwrap().unwrap();
        total_earnings += m.wallet.total_earnings;
    }
    // Monoline payouts + company fund 9.00 landing on the root, plus the
    // classic allocation from the 500 purchase.
    let monoline_total =
        d(sale["totalDistributed"].as_str().unwrap()) + d(sale["companyFundAmount"].as_str().unwrap());
    assert!(total_earnings >= monoline_total);
}

#[tokio::test]
async fn test_sale_retry_with_same_id_does_not_double_credit() {
    let test_app = setup_test_app().await;
    let root = test_app
        .repo
        .insert_member(&MemberCode::from_sequence(1), None, TimeMs::new(0))
        .await
        .unwrap();
    activate(&test_app.repo, root).await;

    let (_, json) = post_json(test_app.app.clone(), "/v1/members", serde_json::json!({})).await;
    let buyer = MemberId::new(json["memberId"].as_i64().unwrap());
    activate(&test_app.repo, buyer).await;

    let sale_id = uuid::Uuid::new_v4();
    let body = serde_json::json!({"buyerId": buyer.as_i64(), "saleId": sale_id});
    let (status, _) = post_json(test_app.app.clone(), "/v1/sales", body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let before = test_app.repo.get_member(root).await.unwrap().unwrap();
    let (status, _) = post_json(test_app.app.clone(), "/v1/sales", body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let after = test_app.repo.get_member(root).await.unwrap().unwrap();
    assert_eq!(before.wallet.balance, after.wallet.balance);
    assert_eq!(before.wallet.total_earnings, after.wallet.total_earnings);
}
