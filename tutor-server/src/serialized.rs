//! All schemas that are exposed from endpoints are defined here
//! along with the conversions from the domain types

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tutor_classroom::{
    Candidate as DocumentCandidate, ClassroomData, ClassroomNotesData, CreatedClassroom,
    ImportResponse, NoteData, ResourceData, ScheduledClassroomData, SessionData, TextbookData,
    TimetableData, UserData,
};
use tutor_core::{StudySession as CoreStudySession, WeekGroup as CoreWeekGroup};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    email: String,
    name: String,
    image: Option<String>,
    grade_level: Option<String>,
    learning_style: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    expires_at: DateTime<Utc>,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudyPreferences {
    days_per_week: u8,
    hours_per_session: f32,
    learning_style: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    id: i32,
    name: String,
    role: String,
    subject: String,
    grade_level: String,
    textbook_url: Option<String>,
    syllabus_url: Option<String>,
    study_preferences: StudyPreferences,
    notice: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewClassroom {
    classroom_id: i32,
    classroom: Classroom,
    timetable: Vec<StudySession>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    week: u32,
    day: u32,
    duration_hours: f32,
    topic: String,
    activities: Vec<String>,
    materials: Vec<String>,
    homework: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WeekGroup {
    week: u32,
    sessions: Vec<StudySession>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    id: i32,
    classroom_id: i32,
    timetable: Vec<StudySession>,
    /// The sessions grouped by week, in ascending week order
    weeks: Vec<WeekGroup>,
    total_hours: f32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledClassroom {
    classroom: Classroom,
    timetable: Vec<StudySession>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    id: i32,
    classroom_id: i32,
    name: String,
    content: String,
    color: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomNotes {
    classroom_id: i32,
    classroom_name: String,
    notes: Vec<Note>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    id: i32,
    topic: String,
    #[serde(rename = "type")]
    kind: String,
    url: String,
    title: String,
    description: String,
    thumbnail: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Textbook {
    id: i32,
    classroom_id: i32,
    title: String,
    source: String,
    document_id: String,
    uri: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    candidate_id: String,
    title: Option<String>,
    source: String,
    #[serde(rename = "ref")]
    #[schema(value_type = Object)]
    reference: Value,
    /// Catalogue specific fields such as authors or thumbnails
    #[schema(value_type = Object)]
    details: Map<String, Value>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    document_id: String,
    status: String,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            grade_level: self.grade_level.clone(),
            learning_style: self.learning_style.clone(),
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            expires_at: self.expires_at,
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Classroom> for ClassroomData {
    fn to_serialized(&self) -> Classroom {
        let preferences = &self.study_preferences;

        Classroom {
            id: self.id,
            name: self.name.clone(),
            role: self.role.to_string(),
            subject: self.subject.clone(),
            grade_level: self.grade_level.clone(),
            textbook_url: self.textbook_url.clone(),
            syllabus_url: self.syllabus_url.clone(),
            study_preferences: StudyPreferences {
                days_per_week: preferences.days_per_week,
                hours_per_session: preferences.hours_per_session,
                learning_style: preferences.learning_style.to_string(),
            },
            notice: self.notice.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<NewClassroom> for CreatedClassroom {
    fn to_serialized(&self) -> NewClassroom {
        NewClassroom {
            classroom_id: self.classroom.id,
            classroom: self.classroom.to_serialized(),
            timetable: self.timetable.sessions.to_serialized(),
        }
    }
}

impl ToSerialized<StudySession> for CoreStudySession {
    fn to_serialized(&self) -> StudySession {
        StudySession {
            week: self.week,
            day: self.day,
            duration_hours: self.duration_hours,
            topic: self.topic.clone(),
            activities: self.activities.clone(),
            materials: self.materials.clone(),
            homework: self.homework.clone(),
        }
    }
}

impl ToSerialized<WeekGroup> for CoreWeekGroup {
    fn to_serialized(&self) -> WeekGroup {
        WeekGroup {
            week: self.week,
            sessions: self.sessions.to_serialized(),
        }
    }
}

impl ToSerialized<Timetable> for TimetableData {
    fn to_serialized(&self) -> Timetable {
        Timetable {
            id: self.id,
            classroom_id: self.classroom_id,
            timetable: self.schedule.sessions.to_serialized(),
            weeks: self.schedule.weeks().to_serialized(),
            total_hours: self.schedule.total_hours(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<ScheduledClassroom> for ScheduledClassroomData {
    fn to_serialized(&self) -> ScheduledClassroom {
        ScheduledClassroom {
            classroom: self.classroom.to_serialized(),
            timetable: self.timetable.sessions.to_serialized(),
        }
    }
}

impl ToSerialized<Note> for NoteData {
    fn to_serialized(&self) -> Note {
        Note {
            id: self.id,
            classroom_id: self.classroom_id,
            name: self.name.clone(),
            content: self.content.clone(),
            color: self.color.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ToSerialized<ClassroomNotes> for ClassroomNotesData {
    fn to_serialized(&self) -> ClassroomNotes {
        ClassroomNotes {
            classroom_id: self.classroom_id,
            classroom_name: self.classroom_name.clone(),
            notes: self.notes.to_serialized(),
        }
    }
}

impl ToSerialized<Resource> for ResourceData {
    fn to_serialized(&self) -> Resource {
        Resource {
            id: self.id,
            topic: self.topic.clone(),
            kind: self.kind.clone(),
            url: self.url.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            thumbnail: self.thumbnail.clone(),
        }
    }
}

impl ToSerialized<Textbook> for TextbookData {
    fn to_serialized(&self) -> Textbook {
        Textbook {
            id: self.id,
            classroom_id: self.classroom_id,
            title: self.title.clone(),
            source: self.source.clone(),
            document_id: self.document_id.clone(),
            uri: self.uri.clone(),
        }
    }
}

impl ToSerialized<Candidate> for DocumentCandidate {
    fn to_serialized(&self) -> Candidate {
        Candidate {
            candidate_id: self.candidate_id.clone(),
            title: self.title.clone(),
            source: self.source.clone(),
            reference: self.reference.clone(),
            details: self.extra.clone(),
        }
    }
}

impl ToSerialized<ImportResult> for ImportResponse {
    fn to_serialized(&self) -> ImportResult {
        ImportResult {
            document_id: self.document_id.clone(),
            status: self.status.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatAnswer {
    pub response: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    pub status: String,
    pub version: String,
}
