use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tutor_classroom::{ImportRequest, NoteRequest, TextbookLink};
use tutor_core::{LearningStyle, Role, StudyPreferences, StudySession, Timetable};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewClassroomSchema {
    #[validate(length(min = 2, max = 128))]
    pub name: String,
    #[schema(value_type = String, example = "student")]
    pub role: Role,
    #[validate(length(min = 1, max = 128))]
    pub subject: String,
    #[validate(length(min = 1, max = 64))]
    pub grade_level: String,
    #[validate(url)]
    pub textbook_url: Option<String>,
    #[validate(url)]
    pub syllabus_url: Option<String>,
    #[validate(nested)]
    pub study_preferences: StudyPreferencesSchema,
    /// A textbook imported while filling in the wizard
    #[validate(nested)]
    pub textbook: Option<TextbookSchema>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudyPreferencesSchema {
    #[validate(range(min = 1, max = 7))]
    pub days_per_week: u8,
    #[validate(range(min = 0.5, max = 4.0))]
    pub hours_per_session: f32,
    #[schema(value_type = String, example = "step-by-step")]
    pub learning_style: LearningStyle,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateClassroomSchema {
    #[validate(length(min = 2, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 2048))]
    pub notice: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextbookSchema {
    #[validate(length(min = 1, max = 512))]
    pub title: String,
    #[validate(length(min = 1, max = 64))]
    pub source: String,
    #[validate(length(min = 1, max = 256))]
    pub document_id: String,
    #[validate(length(min = 1, max = 1024))]
    pub uri: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimetableSchema {
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub timetable: Vec<StudySessionSchema>,
}

/// Sessions come back from the frontend as the generator produced them,
/// so unknown fields are tolerated here.
#[derive(Debug, ToSchema, Validate, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionSchema {
    #[validate(range(min = 1))]
    pub week: u32,
    #[validate(range(min = 1, max = 7))]
    pub day: u32,
    #[validate(range(min = 0.0, max = 24.0))]
    pub duration_hours: f32,
    #[validate(length(min = 1))]
    pub topic: String,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub homework: String,
}

#[derive(Debug, Default, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NoteSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 100000))]
    pub content: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub color: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(url)]
    pub image: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub grade_level: Option<String>,
    #[schema(value_type = Option<String>, example = "visual")]
    pub learning_style: Option<LearningStyle>,
}

#[derive(Debug, IntoParams, Validate, Deserialize)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// What to search the catalogues for
    #[validate(length(min = 1, max = 256))]
    pub q: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportSchema {
    #[validate(length(min = 1))]
    pub candidate_id: String,
    /// Untitled catalogue entries can be imported too
    #[serde(default)]
    #[validate(length(max = 512))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub source: String,
    /// Passed back to the document service as it was found
    #[serde(rename = "ref")]
    #[schema(value_type = Object)]
    pub reference: Map<String, Value>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RagQuerySchema {
    #[validate(length(min = 1, max = 4096))]
    pub question: String,
    #[validate(length(min = 1, max = 256))]
    pub chapter_id: String,
}

/// The multipart form accepted by the chat endpoint
#[allow(dead_code)]
#[derive(Debug, ToSchema)]
pub struct ChatForm {
    /// The question
    pub query: String,
    pub subject: Option<String>,
    pub level: Option<String>,
    /// Answer language, defaults to EN
    pub lang: Option<String>,
    /// An optional attachment, e.g. a photo of an exercise
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<Vec<u8>>,
}

impl From<StudyPreferencesSchema> for StudyPreferences {
    fn from(value: StudyPreferencesSchema) -> Self {
        Self {
            days_per_week: value.days_per_week,
            hours_per_session: value.hours_per_session,
            learning_style: value.learning_style,
        }
    }
}

impl From<TextbookSchema> for TextbookLink {
    fn from(value: TextbookSchema) -> Self {
        Self {
            title: value.title,
            source: value.source,
            document_id: value.document_id,
            uri: value.uri,
        }
    }
}

impl From<TimetableSchema> for Timetable {
    fn from(value: TimetableSchema) -> Self {
        let sessions = value
            .timetable
            .into_iter()
            .map(|s| StudySession {
                week: s.week,
                day: s.day,
                duration_hours: s.duration_hours,
                topic: s.topic,
                activities: s.activities,
                materials: s.materials,
                homework: s.homework,
            })
            .collect();

        Timetable::new(sessions)
    }
}

impl From<NoteSchema> for NoteRequest {
    fn from(value: NoteSchema) -> Self {
        Self {
            name: value.name,
            content: value.content,
            color: value.color,
        }
    }
}

impl From<ImportSchema> for ImportRequest {
    fn from(value: ImportSchema) -> Self {
        Self {
            candidate_id: value.candidate_id,
            title: value.title.unwrap_or_default(),
            source: value.source,
            reference: Value::Object(value.reference),
        }
    }
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|e| ServerError::BadRequest(format!("JSON parse failed: {}", e.body_text())))?;

        extracted_json
            .0
            .validate()
            .map_err(|e| ServerError::BadRequest(format!("Request body is invalid: {}", e)))?;

        Ok(Self(extracted_json.0))
    }
}
