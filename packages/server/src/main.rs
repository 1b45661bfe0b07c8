use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use server::{
    app,
    models::config::{GameConfig, ServerConfig},
    state::AppState,
};

// logging
fn init_logger(config: &ServerConfig) {
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(true)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // load .env if present
    if let Err(e) = dotenv() {
        eprintln!("Warning: failed to load .env: {}", e);
    }

    let server_config = ServerConfig::from_env();
    init_logger(&server_config);
    let game_config = GameConfig::from_env();
    tracing::info!(?game_config, "game configuration loaded");

    let origin = server_config.allowed_origin.parse::<HeaderValue>()?;
    let cors = CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);

    let state = AppState::new(game_config);
    let registry = state.registry.clone();

    let app = app::create_app(state).layer(cors).layer(
        TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
            tracing::info_span!(
                "HTTP request",
                method = %request.method(),
                uri = %request.uri(),
            )
        }),
    );

    let listener = tokio::net::TcpListener::bind(&server_config.addr).await?;
    tracing::info!("server listening on http://{}", server_config.addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.shutdown().await;
    tracing::info!("all sessions aborted, bye");
    Ok(())
}
