use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{join, read_json, send, Result, ServiceError};

const SERVICE: &str = "document service";

/// Client for the service that finds, imports and indexes textbooks
#[derive(Clone)]
pub struct DocumentService {
    client: Client,
    base_url: String,
    ws_url: String,
}

/// A possible textbook match, imported later by its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: String,
    /// Some catalogues have entries without a title
    #[serde(default)]
    pub title: Option<String>,
    pub source: String,
    /// Source specific reference, passed back as is on import
    #[serde(rename = "ref", default)]
    pub reference: Value,
    /// Anything else the catalogue returned (authors, thumbnails, etc)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What the import endpoint expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub candidate_id: String,
    pub title: String,
    pub source: String,
    #[serde(rename = "ref", default)]
    pub reference: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResponse {
    pub document_id: String,
    pub status: String,
}

/// The status message sent once an import has settled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportProgress {
    #[serde(rename_all = "camelCase")]
    Ready {
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        source: Option<String>,
        document_id: String,
        uri: String,
    },
    NotFound,
    Failed,
    Error,
}

impl From<&Candidate> for ImportRequest {
    fn from(candidate: &Candidate) -> Self {
        Self {
            candidate_id: candidate.candidate_id.clone(),
            title: candidate.title.clone().unwrap_or_default(),
            source: candidate.source.clone(),
            reference: candidate.reference.clone(),
        }
    }
}

impl DocumentService {
    pub fn new(client: &Client, base_url: &str, ws_url: &str) -> Self {
        Self {
            client: client.clone(),
            base_url: base_url.to_string(),
            ws_url: ws_url.trim_end_matches('/').to_string(),
        }
    }

    /// Searches every catalogue the service knows for textbooks matching `query`
    pub async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let response = send(
            SERVICE,
            self.client
                .get(join(&self.base_url, "/search"))
                .query(&[("q", query)]),
        )
        .await?;

        read_json(SERVICE, response).await
    }

    /// Starts importing a candidate. The import finishes in the background,
    /// see [DocumentService::await_import].
    pub async fn import(&self, request: &ImportRequest) -> Result<ImportResponse> {
        info!(
            "Importing \"{}\" from {}",
            request.title, request.source
        );

        let response = self
            .client
            .post(join(&self.base_url, "/import"))
            .json(request)
            .send()
            .await
            .map_err(|source| ServiceError::Request {
                service: SERVICE,
                source,
            })?;

        match response.status() {
            StatusCode::FORBIDDEN => Err(ServiceError::DownloadNotPermitted),
            status if !status.is_success() => Err(ServiceError::Status {
                service: SERVICE,
                status,
            }),
            _ => read_json(SERVICE, response).await,
        }
    }

    /// Waits for the first status message of an import and closes the socket.
    /// A socket that closes without saying anything is reported as an error.
    pub async fn await_import(&self, document_id: &str) -> Result<ImportProgress> {
        let url = format!("{}/ws/documents/{}", self.ws_url, document_id);

        let (mut socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ServiceError::Socket(e.to_string()))?;

        let mut progress = ImportProgress::Error;

        while let Some(message) = socket.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    progress = parse_progress(&text);
                    break;
                }
                Ok(Message::Binary(bytes)) => {
                    progress = parse_progress(&String::from_utf8_lossy(&bytes));
                    break;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Import socket for {} failed: {}", document_id, e);
                    break;
                }
            }
        }

        let _ = socket.close(None).await;

        Ok(progress)
    }
}

fn parse_progress(text: &str) -> ImportProgress {
    serde_json::from_str(text).unwrap_or_else(|e| {
        warn!("Unreadable import status {:?}: {}", text, e);
        ImportProgress::Error
    })
}
