use referro::domain::CommissionStructure;
use referro::engine::{PlacementEngine, StatsCache, TreeStatsEngine, TtlStatsCache};
use referro::orchestration::{Distributor, Registrar};
use referro::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Validate the commission structure up front; a broken split must never
    // reach a sale.
    let structure = CommissionStructure::default();
    if let Err(e) = structure.validate() {
        eprintln!("Commission structure error: {}", e);
        std::process::exit(1);
    }

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
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
        structure,
        config.root_member_id,
    ));

    // Create router
    let app = api::create_router(api::AppState::new(repo, config, registrar, distributor));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
