use axum::{extract::State, routing::get, Json};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    serialized::{ClassroomNotes, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/notes",
    tag = "notes",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Every classroom with notes, by classroom name", body = Vec<ClassroomNotes>)
    )
)]
async fn all_notes(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<ClassroomNotes>>> {
    let notes = context.tutor.notes.all(session.user().id).await?;

    Ok(Json(notes.to_serialized()))
}

pub fn router() -> Router {
    Router::new().route("/notes", get(all_notes))
}
