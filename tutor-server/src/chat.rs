use std::convert::Infallible;

use axum::{
    extract::{Multipart, State},
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::post,
    Json,
};
use futures_util::{Stream, StreamExt};
use log::warn;
use tutor_classroom::{ChatFile, ChatMessage};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{ChatForm, RagQuerySchema, ValidatedJson},
    serialized::ChatAnswer,
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/chat",
    tag = "chat",
    request_body(content = ChatForm, content_type = "multipart/form-data"),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = ChatAnswer),
        (status = 502, description = "The tutoring service failed")
    )
)]
async fn chat(
    _session: Session,
    State(context): State<ServerContext>,
    mut multipart: Multipart,
) -> ServerResult<Json<ChatAnswer>> {
    let mut message = ChatMessage::default();
    let mut query = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "query" => query = Some(field.text().await?),
            "subject" => message.subject = Some(field.text().await?),
            "level" => message.level = Some(field.text().await?),
            "lang" => message.lang = Some(field.text().await?).filter(|l| !l.is_empty()),
            "file" => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(|c| c.to_string());
                let bytes = field.bytes().await?;

                if !bytes.is_empty() {
                    message.file = Some(ChatFile {
                        name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => continue,
        }
    }

    message.query = query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("A query is required".to_string()))?;

    let response = context.tutor.tutorbot.chat(message).await?;

    Ok(Json(ChatAnswer { response }))
}

#[utoipa::path(
    post,
    path = "/v1/rag/query",
    tag = "chat",
    request_body = RagQuerySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The answer, one event per upstream data payload", content_type = "text/event-stream"),
        (status = 502, description = "The answering service failed")
    )
)]
async fn rag_query(
    _session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RagQuerySchema>,
) -> ServerResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let answer = context
        .tutor
        .rag
        .query(&body.question, &body.chapter_id)
        .await?;

    let events = answer.map(|payload| match payload {
        Ok(data) => Ok(Event::default().data(data)),
        Err(e) => {
            warn!("Answer stream broke off: {}", e);
            Ok(Event::default().event("error").data(e.to_string()))
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

pub fn router() -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/rag/query", post(rag_query))
}
