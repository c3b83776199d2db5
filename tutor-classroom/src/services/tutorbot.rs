use log::info;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tutor_core::{Role, StudyPreferences, Timetable};

use crate::PrimaryKey;

use super::{join, read_json, send, Result, ServiceError};

const SERVICE: &str = "tutorbot";

/// The language answers are given in when none is requested
pub const DEFAULT_CHAT_LANGUAGE: &str = "EN";

/// Client for the tutorbot service, which generates timetables and answers questions
#[derive(Clone)]
pub struct Tutorbot {
    client: Client,
    base_url: String,
}

/// The classroom a timetable is generated for
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableRequest {
    pub id: PrimaryKey,
    pub name: String,
    pub role: Role,
    pub subject: String,
    pub grade_level: String,
    pub textbook_url: Option<String>,
    pub syllabus_url: Option<String>,
    pub study_preferences: StudyPreferences,
}

/// A file attached to a chat message
#[derive(Debug, Clone)]
pub struct ChatFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatMessage {
    pub query: String,
    pub subject: Option<String>,
    pub level: Option<String>,
    pub lang: Option<String>,
    pub file: Option<ChatFile>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

impl Tutorbot {
    pub fn new(client: &Client, base_url: &str) -> Self {
        Self {
            client: client.clone(),
            base_url: base_url.to_string(),
        }
    }

    /// Asks the generator for a timetable fitting the classroom
    pub async fn generate_timetable(&self, request: &TimetableRequest) -> Result<Timetable> {
        info!("Generating timetable for classroom {}", request.id);

        let response = send(
            SERVICE,
            self.client
                .post(join(&self.base_url, "/api/generate-timetable"))
                .json(request),
        )
        .await?;

        let payload: Value = read_json(SERVICE, response).await?;
        let timetable = Timetable::parse(&payload)?;

        info!(
            "Generated {} sessions for classroom {}",
            timetable.sessions.len(),
            request.id
        );

        Ok(timetable)
    }

    /// Sends a question, with an optional attachment, and returns the answer
    pub async fn chat(&self, message: ChatMessage) -> Result<String> {
        let mut form = multipart::Form::new()
            .text("query", message.query)
            .text("subject", message.subject.unwrap_or_default())
            .text("level", message.level.unwrap_or_default())
            .text(
                "lang",
                message
                    .lang
                    .unwrap_or_else(|| DEFAULT_CHAT_LANGUAGE.to_string()),
            );

        if let Some(file) = message.file {
            let mut part = multipart::Part::bytes(file.bytes).file_name(file.name);

            if let Some(content_type) = file.content_type {
                part = part
                    .mime_str(&content_type)
                    .map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;
            }

            form = form.part("file", part);
        }

        let response = send(
            SERVICE,
            self.client
                .post(join(&self.base_url, "/chat"))
                .multipart(form),
        )
        .await?;

        let chat: ChatResponse = read_json(SERVICE, response).await?;
        Ok(chat.response)
    }
}
