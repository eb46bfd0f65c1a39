use brain_server::{api, auth, settings::Settings, AppState, SharedState, Store};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Settings + store ───────────────────────────────────────
    let settings = Settings::load()?;
    let store = Store::open(&settings.db_path)?;

    if store.ensure_default_user(&settings)? {
        tracing::info!(user = %settings.default_user_name, "created default user");
    }

    // ── Shared state ───────────────────────────────────────────
    let state: SharedState = Arc::new(AppState { store });

    // ── Router ─────────────────────────────────────────────────
    // One session guard on the whole data route table. Login is the only
    // route outside it.
    let guarded = Router::new()
        .route("/api/notes", post(api::create_note).get(api::list_notes))
        .route("/api/tasks", post(api::create_task).get(api::list_tasks))
        .route("/api/dashboard", get(api::dashboard))
        .route("/api/auth/logout", post(auth::logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_guard,
        ));

    let app = Router::new()
        .route("/api/auth/login", post(auth::login))
        .merge(guarded)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // ── Start ──────────────────────────────────────────────────
    let addr: SocketAddr = settings.bind_addr.parse()?;
    tracing::info!(%addr, "second brain server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
