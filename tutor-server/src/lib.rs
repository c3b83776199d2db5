mod auth;
mod chat;
mod classrooms;
mod context;
mod docs;
mod documents;
mod errors;
mod notes;
mod profile;
mod schemas;
mod serialized;

use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::{routing::get, Json};
use log::info;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tutor_classroom::Tutor;

pub use context::ServerContext;
pub use errors::{ServerError, ServerResult};

use serialized::Health;

pub type Router = axum::Router<ServerContext>;

/// Builds the full application, everything but the docs lives under `/v1`
pub fn router(tutor: Arc<Tutor>) -> axum::Router {
    let context = ServerContext { tutor };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .on_request(DefaultOnRequest::new().level(tracing::Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(tracing::Level::INFO));

    let version_one_router = Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(profile::router())
        .merge(classrooms::router())
        .merge(notes::router())
        .merge(documents::router())
        .merge(chat::router());

    Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .layer(trace)
        .with_state(context)
}

/// Starts the tutor server on the configured port
pub async fn run_server(tutor: Tutor) -> std::io::Result<()> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, tutor.config.port).into();
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on {}", addr);

    axum::serve(listener, router(Arc::new(tutor))).await
}

#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "health",
    responses(
        (status = 200, body = Health)
    )
)]
async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
