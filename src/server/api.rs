use std::error::Error;
use std::net::SocketAddr;
use axum::{
    routing::get,
    Router,
    extract::State,
    response::{ Html, IntoResponse },
    Json,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use log::{info, error};

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
}

#[derive(Clone)]
pub struct AppState {
    ws_port: u16,
    model: String,
}

impl AppState {
    pub fn new(ws_port: u16, model: String) -> Self {
        Self { ws_port, model }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: SocketAddr,
    ws_port: u16,
    model: String,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("Starting HTTP UI server on: http://{}", addr);

    let app = router(AppState::new(ws_port, model));

    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    error!("HTTP server error: {}", e);
                }
            },
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            }
        }
    });

    info!("HTTP server started");
    Ok(())
}

async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(INDEX_HTML.replace("{{WS_PORT}}", &state.ws_port.to_string()))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        model: state.model,
    })
}
