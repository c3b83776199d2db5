use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
    routing::{get, post},
    Json,
};
use log::{info, warn};
use tutor_classroom::{ImportProgress, ImportRequest};
use validator::Validate;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{ImportSchema, SearchParams, ValidatedJson},
    serialized::{Candidate, ImportResult, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/documents/search",
    tag = "documents",
    params(SearchParams),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Candidate>)
    )
)]
async fn search(
    _session: Session,
    State(context): State<ServerContext>,
    Query(params): Query<SearchParams>,
) -> ServerResult<Json<Vec<Candidate>>> {
    params
        .validate()
        .map_err(|e| ServerError::BadRequest(format!("Query is invalid: {}", e)))?;

    let candidates = context.tutor.documents.search(params.q.trim()).await?;

    Ok(Json(candidates.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/documents/import",
    tag = "documents",
    request_body = ImportSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = ImportResult),
        (status = 403, description = "The catalogue does not allow downloading this document")
    )
)]
async fn import(
    _session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ImportSchema>,
) -> ServerResult<Json<ImportResult>> {
    let response = context
        .tutor
        .documents
        .import(&ImportRequest::from(body))
        .await?;

    Ok(Json(response.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/documents/{id}/progress",
    tag = "documents",
    params(
        ("id" = String, Path, description = "The id returned by the import"),
        ("token" = Option<String>, Query, description = "Session token, for clients that can't set headers")
    ),
    responses(
        (status = 101, description = "Sends one import status message, then closes")
    )
)]
async fn progress(
    _session: Session,
    State(context): State<ServerContext>,
    Path(document_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| relay_progress(socket, context, document_id))
}

/// Waits for the upstream import status and hands it to the browser.
/// Gives up on the upstream socket if the browser leaves first.
async fn relay_progress(mut socket: WebSocket, context: ServerContext, document_id: String) {
    let progress = tokio::select! {
        progress = context.tutor.documents.await_import(&document_id) => {
            progress.unwrap_or_else(|e| {
                warn!("Import progress for {} failed: {}", document_id, e);
                ImportProgress::Error
            })
        }
        _ = wait_for_close(&mut socket) => {
            info!("Client stopped waiting for import {}", document_id);
            return;
        }
    };

    let text = match serde_json::to_string(&progress) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize import progress: {}", e);
            return;
        }
    };

    if socket.send(Message::Text(text)).await.is_ok() {
        let _ = socket.send(Message::Close(None)).await;
    }
}

async fn wait_for_close(socket: &mut WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Close(_) = message {
            break;
        }
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/documents/search", get(search))
        .route("/documents/import", post(import))
        .route("/documents/:id/progress", get(progress))
}
