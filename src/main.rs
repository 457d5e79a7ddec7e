use coffee_discovery::{
    config::{database, env::load_backend_env, settings::load_default_settings},
    core::{
        best_effort::{BestEffort, Observer},
        preference::PreferenceExtractor,
        product::seed_products,
        search::SearchOrchestrator,
        session::Session,
    },
    errors::Result,
    services::{GoTrueClient, OpenAiClient},
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Settings file and backend credentials (missing credentials are logged, not fatal)
    let settings = load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {e}"))?;
    let backends = load_backend_env();

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    // 5. Seed an empty catalog
    let seeded = seed_products(&db, &settings.seed_products)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {e}"))?;
    if seeded > 0 {
        info!(seeded, "Catalog seeded");
    }

    // 6. Restore any session held by the identity backend
    let identity = GoTrueClient::new(backends.identity, &settings.identity)?;
    let session = Session::start(Arc::new(identity), db.clone()).await;
    info!(state = ?session.state(), "Session started");

    // 7. Run one search per argument
    let step_timeout = settings.search.step_timeout();
    let backend = Arc::new(OpenAiClient::new(
        backends.language_model,
        &settings.language_model,
    )?);
    let observer = Observer::new();
    let orchestrator = SearchOrchestrator::new(
        db,
        PreferenceExtractor::new(
            backend,
            &settings.language_model,
            step_timeout,
            observer.clone(),
        ),
        BestEffort::new(observer),
        step_timeout,
    );

    for query in std::env::args().skip(1) {
        match orchestrator.perform_search(&query).await {
            Ok(outcome) => {
                println!("{query}: {} result(s)", outcome.result_count);
                for product in &outcome.results {
                    println!(
                        "  {} ({}) ${:.2}",
                        product.name,
                        product.origin.as_deref().unwrap_or("unknown origin"),
                        product.price
                    );
                }
                outcome.query_log.settled().await;
            }
            Err(e) => {
                error!("Search failed: {e}");
                println!("{query}: {}", e.user_message());
            }
        }
    }

    session.shutdown();
    Ok(())
}
