use axum::{extract::State, http::StatusCode, routing::get, Json};
use log::info;
use tutor_classroom::UpdatedUser;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{ProfileSchema, ValidatedJson},
    serialized::{ToSerialized, User},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/profile",
    tag = "profile",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn profile(session: Session) -> Json<User> {
    Json(session.user().to_serialized())
}

#[utoipa::path(
    put,
    path = "/v1/profile",
    tag = "profile",
    request_body = ProfileSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn update_profile(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ProfileSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .tutor
        .auth
        .update_profile(UpdatedUser {
            id: session.user().id,
            name: body.name,
            image: body.image,
            grade_level: body.grade_level,
            learning_style: body.learning_style.map(|s| s.to_string()),
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/profile",
    tag = "profile",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 204, description = "The account and everything it owns is gone")
    )
)]
async fn delete_profile(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<StatusCode> {
    let user_id = session.user().id;
    context.tutor.auth.delete_user(user_id).await?;

    info!("Deleted user {}", user_id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router {
    Router::new().route(
        "/profile",
        get(profile).put(update_profile).delete(delete_profile),
    )
}
