//! Clients for the external services that do the heavy lifting: timetable
//! generation and chat (tutorbot), resource search, document search and
//! import, and RAG question answering.

use reqwest::{RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tutor_core::TimetableError;

mod documents;
mod rag;
mod resources;
mod tutorbot;

pub use documents::*;
pub use rag::*;
pub use resources::*;
pub use tutorbot::*;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Request to {service} failed: {source}")]
    Request {
        service: &'static str,
        source: reqwest::Error,
    },

    #[error("{service} responded with {status}")]
    Status {
        service: &'static str,
        status: StatusCode,
    },

    #[error("{service} returned an invalid response: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Download not permitted")]
    DownloadNotPermitted,

    #[error("Socket error: {0}")]
    Socket(String),

    #[error(transparent)]
    Timetable(#[from] TimetableError),
}

type Result<T> = std::result::Result<T, ServiceError>;

/// Sends a request, turning transport failures and non-success statuses into errors
async fn send(service: &'static str, request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|source| ServiceError::Request { service, source })?;

    let status = response.status();

    if !status.is_success() {
        return Err(ServiceError::Status { service, status });
    }

    Ok(response)
}

/// Reads a JSON body, reporting a body that doesn't match as an invalid response
async fn read_json<T>(service: &'static str, response: Response) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    response
        .json()
        .await
        .map_err(|e| ServiceError::InvalidResponse {
            service,
            reason: e.to_string(),
        })
}

fn join(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
