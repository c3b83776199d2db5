use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tutor_core::{Role, StudyPreferences, Timetable};

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type SharedDatabase = Arc<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(DatabaseError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Represents a type that can store and fetch tutor data.
///
/// Classroom lookups always take the owning user, a classroom that belongs
/// to someone else is reported as not found.
#[async_trait]
pub trait Database: Send + Sync {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()>;

    async fn account_by_provider(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<AccountData>;
    async fn create_account(&self, new_account: NewAccount) -> Result<AccountData>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn classroom_by_id(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
    ) -> Result<ClassroomData>;
    /// Lists the classrooms of a user, newest first
    async fn list_classrooms(&self, user_id: PrimaryKey) -> Result<Vec<ClassroomData>>;
    /// Lists the classrooms of a user that have a timetable, newest first
    async fn list_scheduled_classrooms(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<ScheduledClassroomData>>;
    async fn create_classroom(&self, new_classroom: NewClassroom) -> Result<ClassroomData>;
    async fn update_classroom(&self, updated_classroom: UpdatedClassroom)
        -> Result<ClassroomData>;
    async fn delete_classroom(&self, user_id: PrimaryKey, classroom_id: PrimaryKey) -> Result<()>;

    async fn textbook_by_classroom(&self, classroom_id: PrimaryKey) -> Result<TextbookData>;
    /// Links a textbook to a classroom, replacing any previous one
    async fn upsert_textbook(&self, new_textbook: NewTextbook) -> Result<TextbookData>;

    async fn timetable_by_classroom(&self, classroom_id: PrimaryKey) -> Result<TimetableData>;
    async fn create_timetable(
        &self,
        classroom_id: PrimaryKey,
        schedule: Timetable,
    ) -> Result<TimetableData>;
    async fn update_timetable(
        &self,
        classroom_id: PrimaryKey,
        schedule: Timetable,
    ) -> Result<TimetableData>;
    /// Deletes the timetable of a classroom, if there is one
    async fn delete_timetable(&self, classroom_id: PrimaryKey) -> Result<()>;

    /// Lists the notes of a classroom, newest first
    async fn list_notes(&self, classroom_id: PrimaryKey) -> Result<Vec<NoteData>>;
    /// Lists every classroom of a user that has notes, by classroom name
    async fn list_notes_by_user(&self, user_id: PrimaryKey) -> Result<Vec<ClassroomNotesData>>;
    async fn note_by_id(&self, classroom_id: PrimaryKey, note_id: PrimaryKey) -> Result<NoteData>;
    async fn create_note(&self, new_note: NewNote) -> Result<NoteData>;
    async fn update_note(&self, updated_note: UpdatedNote) -> Result<NoteData>;
    async fn delete_note(&self, classroom_id: PrimaryKey, note_id: PrimaryKey) -> Result<()>;

    async fn list_resources(&self, classroom_id: PrimaryKey) -> Result<Vec<ResourceData>>;
    async fn create_resources(&self, new_resources: Vec<NewResource>)
        -> Result<Vec<ResourceData>>;
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatedUser {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub image: Option<String>,
    pub grade_level: Option<String>,
    pub learning_style: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: PrimaryKey,
    pub provider: String,
    pub provider_account_id: String,
    pub kind: String,
    pub access_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClassroom {
    /// The owner of the new classroom
    pub user_id: PrimaryKey,
    pub name: String,
    pub role: Role,
    pub subject: String,
    pub grade_level: String,
    pub textbook_url: Option<String>,
    pub syllabus_url: Option<String>,
    pub study_preferences: StudyPreferences,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatedClassroom {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub name: Option<String>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTextbook {
    pub classroom_id: PrimaryKey,
    pub title: String,
    pub source: String,
    pub document_id: String,
    pub uri: String,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub classroom_id: PrimaryKey,
    pub name: String,
    pub content: String,
    pub color: String,
}

/// Only the fields that are set are changed
#[derive(Debug, Clone, Default)]
pub struct UpdatedNote {
    pub id: PrimaryKey,
    pub classroom_id: PrimaryKey,
    pub name: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub classroom_id: PrimaryKey,
    pub topic: String,
    pub kind: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
}
