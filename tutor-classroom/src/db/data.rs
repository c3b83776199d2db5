use chrono::{DateTime, Utc};
use tutor_core::{Role, StudyPreferences, Timetable};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A tutor account
#[derive(Debug, Clone, PartialEq)]
pub struct UserData {
    pub id: PrimaryKey,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub grade_level: Option<String>,
    pub learning_style: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Links a user to an identity at an OAuth provider
#[derive(Debug, Clone, PartialEq)]
pub struct AccountData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    /// The provider name, e.g. google
    pub provider: String,
    /// The user's id at the provider
    pub provider_account_id: String,
    /// The account type as reported by the provider flow, e.g. oauth
    pub kind: String,
    pub access_token: Option<String>,
    /// Unix timestamp at which the access token expires
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
}

/// Login session data for authentication
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// A classroom, owned by a single user
#[derive(Debug, Clone, PartialEq)]
pub struct ClassroomData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub name: String,
    pub role: Role,
    pub subject: String,
    pub grade_level: String,
    pub textbook_url: Option<String>,
    pub syllabus_url: Option<String>,
    pub study_preferences: StudyPreferences,
    /// A free text notice shown at the top of the classroom
    pub notice: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A textbook imported through the document service
#[derive(Debug, Clone, PartialEq)]
pub struct TextbookData {
    pub id: PrimaryKey,
    pub classroom_id: PrimaryKey,
    pub title: String,
    /// Which catalogue the document came from, e.g. google or openlibrary
    pub source: String,
    /// The id of the document in the document service
    pub document_id: String,
    /// Path of the document relative to the document service
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimetableData {
    pub id: PrimaryKey,
    pub classroom_id: PrimaryKey,
    pub schedule: Timetable,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteData {
    pub id: PrimaryKey,
    pub classroom_id: PrimaryKey,
    pub name: String,
    pub content: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A study resource found for a classroom topic
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceData {
    pub id: PrimaryKey,
    pub classroom_id: PrimaryKey,
    pub topic: String,
    /// video, website, etc
    pub kind: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
}

/// A classroom and its timetable, used for the schedule overview
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledClassroomData {
    pub classroom: ClassroomData,
    pub timetable: Timetable,
}

/// A classroom and its notes, used for the notes overview
#[derive(Debug, Clone, PartialEq)]
pub struct ClassroomNotesData {
    pub classroom_id: PrimaryKey,
    pub classroom_name: String,
    pub notes: Vec<NoteData>,
}
