pub mod health;
pub mod members;
pub mod network;
pub mod passive;
pub mod sales;

use crate::config::Config;
use crate::db::Repository;
use crate::orchestration::{Distributor, Registrar};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub registrar: Arc<Registrar>,
    pub distributor: Arc<Distributor>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        registrar: Arc<Registrar>,
        distributor: Arc<Distributor>,
    ) -> Self {
        Self {
            repo,
            config,
            registrar,
            distributor,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/members", post(members::register_member))
        .route(
            "/v1/members/:id/transactions",
            get(sales::list_member_transactions),
        )
        .route("/v1/sales", post(sales::record_sale))
        .route("/v1/purchases", post(sales::record_purchase))
        .route("/v1/passive/distribute", post(passive::distribute_pool))
        .route("/v1/network/stats", get(network::get_network_stats))
        .layer(cors)
        .with_state(state)
}
