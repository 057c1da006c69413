use clap::Parser;
use pantry_search::{
    api::{handlers::AppState, routes},
    catalog::scheduler::CatalogScheduler,
    cli::{commands, split_list, Cli, Commands},
    config::Settings,
    db,
    engine::RecipeEngine,
    ingredients::{MatchOptions, StaplePolicy},
    search::{build_embedder, SearchFilters, SearchQuery},
    Error, Result,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pantry_search=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    settings.validate()?;

    match cli.command {
        Commands::Serve { port, host } => {
            serve(settings, port, host).await?;
        }
        Commands::Migrate => {
            migrate(settings).await?;
        }
        Commands::Search {
            query,
            mode,
            cuisine,
            difficulty,
            min_similarity,
            limit,
        } => {
            let engine = load_engine(&settings).await?;
            let query = SearchQuery {
                text: query,
                mode: mode.into(),
                filters: SearchFilters {
                    cuisine,
                    difficulty,
                    min_similarity,
                },
                limit,
            };
            commands::search(&engine, &query).await?;
        }
        Commands::Cook {
            ingredients,
            sort,
            min_match,
            cuisine,
            limit,
            no_staples,
            substitutions,
        } => {
            let engine = load_engine(&settings).await?;
            let options = MatchOptions {
                sort: sort.into(),
                min_match_percentage: min_match,
                limit,
                cuisine,
                staples: if no_staples {
                    StaplePolicy::None
                } else {
                    StaplePolicy::Default
                },
                with_substitutions: substitutions,
            };
            commands::cook(&engine, &split_list(&ingredients), &options)?;
        }
        Commands::Substitute {
            ingredient,
            on_hand,
        } => {
            let engine = load_engine(&settings).await?;
            let on_hand = on_hand.as_deref().map(split_list).unwrap_or_default();
            commands::substitute(&engine, &ingredient, &on_hand)?;
        }
        Commands::Backfill { concurrency, force } => {
            backfill(settings, concurrency, force).await?;
        }
    }

    Ok(())
}

async fn load_engine(settings: &Settings) -> Result<RecipeEngine> {
    let pool = db::init_pool_with_config(&settings.database).await?;
    db::run_migrations(&pool).await?;
    RecipeEngine::load(settings, &pool).await
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!("Starting pantry search server");
    info!("Server: {}:{}", settings.server.host, settings.server.port);

    let pool = db::init_pool_with_config(&settings.database).await?;
    info!(
        "Database connection established (max_connections: {}, min_connections: {})",
        settings.database.max_connections, settings.database.min_connections
    );

    db::run_migrations(&pool).await?;
    info!("Database migrations completed");

    let engine = Arc::new(RecipeEngine::load(&settings, &pool).await?);
    info!(
        "Engine ready: {} recipes, embeddings by {}",
        engine.catalog().snapshot().len(),
        engine.embedder().model_name()
    );

    if settings.catalog.refresh_interval_seconds > 0 {
        let scheduler = Arc::new(CatalogScheduler::new(
            pool.clone(),
            engine.catalog().clone(),
            settings.catalog.refresh_interval_seconds,
            settings.search.fuzzy_threshold,
        ));
        let _scheduler_handle = scheduler.start();
        info!(
            "Catalog scheduler started (interval: {}s)",
            settings.catalog.refresh_interval_seconds
        );
    }

    let state = AppState {
        pool,
        engine,
        settings: settings.clone(),
    };

    let app = routes::create_router(state, &settings)?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("\n========================================");
    println!("Pantry Search Server");
    println!("========================================");
    println!("Address: http://{addr}");
    println!("\nAPI Endpoints:");
    println!("  GET  /api/search");
    println!("  GET  /api/suggest");
    println!("  POST /api/match");
    println!("  GET  /api/substitutions");
    println!("  GET  /api/recipes/:id");
    println!("\nPress Ctrl+C to stop");
    println!("========================================\n");

    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}

async fn migrate(settings: Settings) -> Result<()> {
    info!("Running database migrations");

    let pool = db::init_pool(&settings.database.url).await?;
    db::run_migrations(&pool).await?;

    println!("\u{2713} Database migrations completed successfully");
    Ok(())
}

async fn backfill(settings: Settings, concurrency: usize, force: bool) -> Result<()> {
    let pool = db::init_pool_with_config(&settings.database).await?;
    db::run_migrations(&pool).await?;

    let embedder = build_embedder(&settings.embedding)?;
    let report = commands::backfill(&pool, embedder, concurrency, force).await?;

    println!(
        "\u{2713} Backfill complete: {} of {} recipes embedded ({} failed)",
        report.embedded, report.considered, report.failed
    );
    Ok(())
}
