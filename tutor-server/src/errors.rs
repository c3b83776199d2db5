use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;
use tutor_classroom::{AuthError, ClassroomError, DatabaseError, ServiceError};

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("Download not permitted")]
    DownloadNotPermitted,
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("External service failed: {0}")]
    Upstream(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::DownloadNotPermitted => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        if status.is_server_error() {
            error!("{}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidSession => Self::Unauthorized("Session does not exist"),
            e @ AuthError::InvalidState => Self::BadRequest(e.to_string()),
            AuthError::Provider(e) => Self::Upstream(e),
            AuthError::Db(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<ServiceError> for ServerError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::DownloadNotPermitted => Self::DownloadNotPermitted,
            ServiceError::InvalidRequest(e) => Self::BadRequest(e),
            e => Self::Upstream(e.to_string()),
        }
    }
}

impl From<ClassroomError> for ServerError {
    fn from(value: ClassroomError) -> Self {
        match value {
            e @ ClassroomError::InvalidPreferences => Self::BadRequest(e.to_string()),
            ClassroomError::Db(e) => e.into(),
            ClassroomError::Service(e) => e.into(),
        }
    }
}

impl From<MultipartError> for ServerError {
    fn from(value: MultipartError) -> Self {
        Self::BadRequest(value.body_text())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_codes() {
        let not_found: ServerError = DatabaseError::NotFound {
            resource: "classroom",
            identifier: "id",
        }
        .into();

        assert_eq!(not_found.as_status_code(), StatusCode::NOT_FOUND);

        let forbidden: ServerError = ServiceError::DownloadNotPermitted.into();
        assert_eq!(forbidden.as_status_code(), StatusCode::FORBIDDEN);

        let upstream: ServerError = ServiceError::Socket("closed".into()).into();
        assert_eq!(upstream.as_status_code(), StatusCode::BAD_GATEWAY);

        let unauthorized: ServerError = AuthError::InvalidSession.into();
        assert_eq!(unauthorized.as_status_code(), StatusCode::UNAUTHORIZED);
    }
}
