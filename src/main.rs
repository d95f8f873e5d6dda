use inventory_service::{
    cache, config::Config, database, error::Result, middleware::build_limiter,
    observability::init_tracing, seed, server::Server, state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config)?;

    let db = database::create_pool(&config.database).await?;
    database::ensure_schema(&db).await?;
    seed::seed_items(&db).await?;

    let redis = if config.rate_limit.strategy == "redis" {
        Some(cache::create_pool(&config.redis).await?)
    } else {
        None
    };
    let limiter = build_limiter(&config.rate_limit, redis)?;

    let state = AppState::new(config, db, limiter);

    Server::new(state).serve().await
}
