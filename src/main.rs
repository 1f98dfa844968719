//! orderflow - Event-Sourced Order Management Service
//!
//! Commands append events to the log; two projector worker pools fold
//! the global feed into a document store and a search index; queries
//! read from the projections with a rehydration fallback.

use std::future::IntoFuture;
use std::net::SocketAddr;

use axum::{middleware, routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orderflow::api::{self, AppState};
use orderflow::config::{Config, LoggerConfig};
use orderflow::error::set_debug_errors;
use orderflow::event_store::{AggregateStore, SubscriptionClient};
use orderflow::projection::{
    DocStoreProjection, OrderDocumentRepository, OrderSearchRepository, Projector,
    SearchProjection,
};
use orderflow::{db, AppResult};

/// Initialize tracing/logging per the logger configuration
fn init_tracing(logger: &LoggerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "orderflow={},tower_http=info",
            logger.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logger.encoder == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Build the application router
fn build_router(config: &Config, state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest(&config.base_path, api::create_router())
        .layer(middleware::from_fn(
            api::middleware::request_context_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.logger);
    set_debug_errors(config.logger.debug);

    tracing::info!(service = %config.service_name, "starting");

    let event_pool = connect_pool(&config.event_store.url, config.event_store.max_connections).await?;
    let doc_pool = connect_pool(&config.doc_store.url, config.event_store.max_connections).await?;
    let search_pool = connect_pool(&config.search.url, config.event_store.max_connections).await?;

    if !db::check_tables(&event_pool, &["events", "subscription_groups"]).await?
        || !db::check_tables(&doc_pool, &[config.doc_store.orders_table.as_str()]).await?
        || !db::check_tables(&search_pool, &[config.search.orders_index.as_str()]).await?
    {
        anyhow::bail!("database schema incomplete, run migrations first");
    }

    let store = AggregateStore::new(event_pool.clone());
    let doc_repo = OrderDocumentRepository::new(doc_pool, config.doc_store.orders_table.clone());
    let search_repo = OrderSearchRepository::new(search_pool, config.search.orders_index.clone());
    let subscription_client = SubscriptionClient::new(event_pool.clone());

    // Root cancellation token, cancelled on SIGINT/SIGTERM
    let cancel = CancellationToken::new();

    // Two projectors, each with its own subscription group and cursor
    let doc_projector = Projector::new(
        subscription_client.clone(),
        DocStoreProjection::new(
            doc_repo.clone(),
            config.subscriptions.doc_projection_group_name.clone(),
        ),
        config.subscriptions.order_prefix.clone(),
        config.subscriptions.pool_size,
    );
    let search_projector = Projector::new(
        subscription_client,
        SearchProjection::new(
            search_repo.clone(),
            config.subscriptions.search_projection_group_name.clone(),
        ),
        config.subscriptions.order_prefix.clone(),
        config.subscriptions.pool_size,
    );

    let doc_cancel = cancel.child_token();
    let mut doc_handle =
        tokio::spawn(async move { doc_projector.subscribe(doc_cancel).await });
    let search_cancel = cancel.child_token();
    let mut search_handle =
        tokio::spawn(async move { search_projector.subscribe(search_cancel).await });

    let state = AppState {
        store,
        doc_repo,
        search_repo,
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", addr);

    let app = build_router(&config, state);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cancel.clone()))
    .into_future();

    // A projector failure terminates the service; the supervisor
    // restarts it and the subscriptions resume from their checkpoints
    let result: AppResult<()> = tokio::select! {
        served = server => {
            served.map_err(|err| orderflow::AppError::Internal(err.to_string()))
        }
        joined = &mut doc_handle => {
            match joined {
                Ok(result) => result.map_err(|err| {
                    orderflow::AppError::Internal(format!("doc projector: {err}"))
                }),
                Err(err) => Err(orderflow::AppError::Internal(err.to_string())),
            }
        }
        joined = &mut search_handle => {
            match joined {
                Ok(result) => result.map_err(|err| {
                    orderflow::AppError::Internal(format!("search projector: {err}"))
                }),
                Err(err) => Err(orderflow::AppError::Internal(err.to_string())),
            }
        }
    };

    tracing::info!("shutting down");
    cancel.cancel();
    if !doc_handle.is_finished() {
        let _ = doc_handle.await;
    }
    if !search_handle.is_finished() {
        let _ = search_handle.await;
    }
    event_pool.close().await;

    result?;
    tracing::info!("goodbye");
    Ok(())
}

/// Cancel the root token on SIGINT/SIGTERM for a graceful shutdown
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating graceful shutdown");
        },
    }

    cancel.cancel();
}
