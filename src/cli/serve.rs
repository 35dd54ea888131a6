use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use graphinator::engine::Engine;
use graphinator::error::{GraphinatorError, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Run the serve command to start the GraphQL server
pub async fn run(config_path: String, port: Option<u16>) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let config = graphinator::config::load_config(&config_path)?;
    let base_dir = Path::new(&config_path).parent().unwrap_or_else(|| Path::new(""));
    let store = graphinator::config::connect_store(&config, base_dir)?;

    // Command-line port wins over the config file
    let server_port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.bind, server_port)
        .parse()
        .map_err(|e| GraphinatorError::Config(format!("Invalid bind address '{}': {}", config.server.bind, e)))?;

    tracing::info!("Scanning graph and building GraphQL schema...");
    let engine = Arc::new(Engine::new(store, config.scan));
    let snapshot = engine.refresh().await?;

    tracing::info!("Schema built with {} types", snapshot.registry.len());
    tracing::info!("GraphQL server running on http://{}", addr);
    tracing::info!("Playground: http://{}/graphql", addr);

    start_http_server(engine, addr).await
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/graphql", post(graphql_handler).get(graphql_playground))
        .route("/schema/refresh", post(refresh_handler))
        .route("/health", get(health_check))
        .with_state(engine)
        .layer(CorsLayer::permissive())
}

async fn start_http_server(engine: Arc<Engine>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GraphinatorError::Config(format!("Failed to bind to {}: {}. Port may be in use.", addr, e)))?;

    axum::serve(listener, router(engine))
        .await
        .map_err(|e| GraphinatorError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

async fn graphql_handler(State(engine): State<Arc<Engine>>, request: GraphQLRequest) -> GraphQLResponse {
    let response: async_graphql::Response = engine.execute(request.into_inner()).await.into();
    response.into()
}

async fn refresh_handler(
    State(engine): State<Arc<Engine>>,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, String)> {
    match engine.refresh().await {
        Ok(snapshot) => Ok(Json(serde_json::json!({
            "version": snapshot.registry.version(),
            "types": snapshot.registry.len(),
        }))),
        Err(e) => {
            tracing::warn!("Schema refresh failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn graphql_playground() -> axum::response::Html<String> {
    axum::response::Html(async_graphql::http::playground_source(
        async_graphql::http::GraphQLPlaygroundConfig::new("/graphql"),
    ))
}

async fn health_check() -> &'static str {
    "OK"
}
