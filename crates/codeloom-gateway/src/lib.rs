//! HTTP gateway: the REST + SSE surface over the agent runtime.

pub mod api;
pub mod state;

pub use state::AppState;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let origin: HeaderValue = state
        .config
        .cors_origin
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid CORS_ORIGIN: {}", state.config.cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    let router = Router::new()
        .route("/api/chat", post(api::chat::chat))
        .route("/api/chat/:id", post(api::chat::chat_continue))
        .route("/api/stream/:id", get(api::chat::stream))
        .route("/api/stop/:id", post(api::chat::stop))
        .route(
            "/api/session/:id",
            get(api::sessions::get_session)
                .patch(api::sessions::patch_session)
                .delete(api::sessions::delete_session),
        )
        .route("/api/session/:id/messages", get(api::sessions::get_messages))
        .route("/api/session/:id/cwd", patch(api::sessions::patch_cwd))
        .route("/api/session/:id/plan", patch(api::sessions::patch_plan))
        .route("/api/sessions", get(api::sessions::list_sessions))
        .route("/api/tools", get(api::meta::get_tools))
        .route("/api/models", get(api::meta::get_models))
        .route("/api/commands", get(api::meta::get_commands))
        .layer(cors)
        .with_state(state);

    Ok(router)
}

pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let port = state.config.port;
    let project_root = state.config.project_root.clone();
    let app = build_router(state)?;

    let bind_addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    info!("Codeloom gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  Project root: {}", project_root.display());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
