use std::sync::Arc;

use axum::{Json, Router, routing::get};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::deadpool::Pool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod addons;
mod config;
mod curseforge;
mod error;
mod harvest;
mod models;
mod response;
mod retention;
mod scheduler;
mod schema;
mod trending;

use config::ServerConfig;
use curseforge::CurseforgeClient;
use scheduler::SyncState;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone)]
pub struct App {
    pub diesel: Pool<AsyncPgConnection>,
    pub curseforge: Arc<CurseforgeClient>,
    pub config: Arc<ServerConfig>,
    pub sync: Arc<SyncState>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,api=debug"));
    let json_logs = std::env::var("ENVIRONMENT").is_ok_and(|env| env == "production");
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = ServerConfig::new_from_env();
    let listen_port = config.listen_port;
    tracing::info!(environment = ?config.env, "Configuration loaded");

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let pool = Pool::builder(manager)
        .max_size(10)
        .build()
        .expect("couldn't build the database pool");

    let http = reqwest::Client::builder()
        .user_agent("addon-radar/0.1")
        .build()
        .expect("couldn't build the http client");

    let ctx = App {
        diesel: pool,
        curseforge: Arc::new(CurseforgeClient::new(
            http,
            config.curseforge_api_key.clone(),
        )),
        config: Arc::new(config),
        sync: Arc::new(SyncState::new()),
    };

    if ctx.config.sync_enabled {
        scheduler::start_background_sync(ctx.clone());
    } else {
        tracing::info!("Hourly sync disabled, serving reads only");
    }

    let app = Router::new()
        .route("/api/v1/health", get(health))
        .nest("/api/v1/addons", addons::route())
        .nest("/api/v1/trending", trending::route())
        .route("/api/v1/categories", get(addons::list_categories))
        .layer(TraceLayer::new_for_http())
        // read-only public data, so any origin may consume it
        .layer(CorsLayer::permissive())
        .with_state(ctx);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], listen_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("couldn't bind the listen address");
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await.expect("server error");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
