use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json,
};
use log::info;
use serde::Deserialize;
use tutor_classroom::{SessionData, UserData};
use utoipa::IntoParams;

use crate::{
    errors::{ServerError, ServerResult},
    serialized::{LoginResult, ToSerialized},
    Router, ServerContext,
};

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> &UserData {
        &self.0.user
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }
}

/// Browsers can't set headers on EventSource and WebSocket requests,
/// so the token may also be passed as a query parameter.
#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    ServerContext: FromRef<S>,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let token = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| ServerError::Unauthorized("Malformed authorization"))?;

                let parts: Vec<_> = value.split_ascii_whitespace().collect();

                if parts.first() != Some(&"Bearer") {
                    return Err(ServerError::Unauthorized("Authorization must be Bearer"));
                }

                parts.last().map(|t| t.to_string()).unwrap_or_default()
            }
            None => Query::<TokenQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|q| q.0.token)
                .ok_or(ServerError::Unauthorized("Missing authorization"))?,
        };

        let session = context.tutor.auth.session(&token).await?;

        Ok(Self(session))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    code: String,
    state: String,
}

#[utoipa::path(
    get,
    path = "/v1/auth/google",
    tag = "auth",
    responses(
        (status = 303, description = "Redirects to the consent screen of the provider")
    )
)]
async fn sign_in(State(context): State<ServerContext>) -> impl IntoResponse {
    Redirect::to(&context.tutor.auth.authorize_url())
}

#[utoipa::path(
    get,
    path = "/v1/auth/google/callback",
    tag = "auth",
    params(CallbackParams),
    responses(
        (status = 200, body = LoginResult),
        (status = 400, description = "The state is unknown or expired"),
        (status = 502, description = "The provider refused the code")
    )
)]
async fn callback(
    State(context): State<ServerContext>,
    Query(params): Query<CallbackParams>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .tutor
        .auth
        .complete_oauth(&params.code, &params.state)
        .await?;

    info!("User {} signed in", session.user.id);

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 204, description = "The session is gone")
    )
)]
async fn logout(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<StatusCode> {
    context.tutor.auth.logout(session.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router {
    Router::new()
        .route("/auth/google", get(sign_in))
        .route("/auth/google/callback", get(callback))
        .route("/auth/logout", post(logout))
}
