use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::PgPoolOptions, query, query_as, types::Json, Error as SqlxError, FromRow, PgPool,
};
use tutor_core::{StudyPreferences, Timetable};

use crate::{
    AccountData, ClassroomData, ClassroomNotesData, Database, DatabaseError, DatabaseResult,
    IntoDatabaseError, NewAccount, NewClassroom, NewNote, NewResource, NewSession, NewTextbook,
    NewUser, NoteData, PrimaryKey, ResourceData, Result, ScheduledClassroomData, SessionData,
    TextbookData, TimetableData, UpdatedClassroom, UpdatedNote, UpdatedUser, UserData,
};

const CLASSROOM_COLUMNS: &str = "id, user_id, name, role, subject, grade_level, textbook_url, syllabus_url, study_preferences, notice, created_at";
const NOTE_COLUMNS: &str = "id, classroom_id, name, content, color, created_at, updated_at";
const RESOURCE_COLUMNS: &str =
    "id, classroom_id, topic, type AS kind, url, title, description, thumbnail";

/// A postgres database implementation for the tutor
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        Ok(Self { pool })
    }

    /// Applies the migrations in `migrations/`
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))
    }
}

#[derive(FromRow)]
struct UserRow {
    id: PrimaryKey,
    email: String,
    name: String,
    image: Option<String>,
    grade_level: Option<String>,
    learning_style: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AccountRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    provider: String,
    provider_account_id: String,
    kind: String,
    access_token: Option<String>,
    expires_at: Option<i64>,
    token_type: Option<String>,
    scope: Option<String>,
    id_token: Option<String>,
}

#[derive(FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    expires_at: DateTime<Utc>,
    user_id: PrimaryKey,
    email: String,
    name: String,
    image: Option<String>,
    grade_level: Option<String>,
    learning_style: Option<String>,
    user_created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ClassroomRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    name: String,
    role: String,
    subject: String,
    grade_level: String,
    textbook_url: Option<String>,
    syllabus_url: Option<String>,
    study_preferences: Json<StudyPreferences>,
    notice: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct TextbookRow {
    id: PrimaryKey,
    classroom_id: PrimaryKey,
    title: String,
    source: String,
    document_id: String,
    uri: String,
}

#[derive(FromRow)]
struct TimetableRow {
    id: PrimaryKey,
    classroom_id: PrimaryKey,
    schedule: Json<Timetable>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct NoteRow {
    id: PrimaryKey,
    classroom_id: PrimaryKey,
    name: String,
    content: String,
    color: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ResourceRow {
    id: PrimaryKey,
    classroom_id: PrimaryKey,
    topic: String,
    kind: String,
    url: String,
    title: String,
    description: String,
    thumbnail: Option<String>,
}

impl From<UserRow> for UserData {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            name: r.name,
            image: r.image,
            grade_level: r.grade_level,
            learning_style: r.learning_style,
            created_at: r.created_at,
        }
    }
}

impl From<AccountRow> for AccountData {
    fn from(r: AccountRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            provider: r.provider,
            provider_account_id: r.provider_account_id,
            kind: r.kind,
            access_token: r.access_token,
            expires_at: r.expires_at,
            token_type: r.token_type,
            scope: r.scope,
            id_token: r.id_token,
        }
    }
}

impl From<SessionRow> for SessionData {
    fn from(r: SessionRow) -> Self {
        Self {
            id: r.id,
            token: r.token,
            expires_at: r.expires_at,
            user: UserData {
                id: r.user_id,
                email: r.email,
                name: r.name,
                image: r.image,
                grade_level: r.grade_level,
                learning_style: r.learning_style,
                created_at: r.user_created_at,
            },
        }
    }
}

impl TryFrom<ClassroomRow> for ClassroomData {
    type Error = DatabaseError;

    fn try_from(r: ClassroomRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            role: r.role.parse().map_err(|e| DatabaseError::Internal(Box::new(e)))?,
            subject: r.subject,
            grade_level: r.grade_level,
            textbook_url: r.textbook_url,
            syllabus_url: r.syllabus_url,
            study_preferences: r.study_preferences.0,
            notice: r.notice,
            created_at: r.created_at,
        })
    }
}

impl From<TextbookRow> for TextbookData {
    fn from(r: TextbookRow) -> Self {
        Self {
            id: r.id,
            classroom_id: r.classroom_id,
            title: r.title,
            source: r.source,
            document_id: r.document_id,
            uri: r.uri,
        }
    }
}

impl From<TimetableRow> for TimetableData {
    fn from(r: TimetableRow) -> Self {
        Self {
            id: r.id,
            classroom_id: r.classroom_id,
            schedule: r.schedule.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<NoteRow> for NoteData {
    fn from(r: NoteRow) -> Self {
        Self {
            id: r.id,
            classroom_id: r.classroom_id,
            name: r.name,
            content: r.content,
            color: r.color,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<ResourceRow> for ResourceData {
    fn from(r: ResourceRow) -> Self {
        Self {
            id: r.id,
            classroom_id: r.classroom_id,
            topic: r.topic,
            kind: r.kind,
            url: r.url,
            title: r.title,
            description: r.description,
            thumbnail: r.thumbnail,
        }
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "email"))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        query_as::<_, UserRow>(
            "INSERT INTO users (email, name, image) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.image)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;

        query(
            "UPDATE users SET
                name = $1,
                image = $2,
                grade_level = $3,
                learning_style = $4
            WHERE id = $5",
        )
        .bind(updated_user.name.unwrap_or(user.name))
        .bind(updated_user.image.or(user.image))
        .bind(updated_user.grade_level.or(user.grade_level))
        .bind(updated_user.learning_style.or(user.learning_style))
        .bind(updated_user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_by_id(updated_user.id).await
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn account_by_provider(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<AccountData> {
        query_as::<_, AccountRow>(
            "SELECT
                id, user_id, provider, provider_account_id, type AS kind,
                access_token, expires_at, token_type, scope, id_token
            FROM accounts
            WHERE provider = $1 AND provider_account_id = $2",
        )
        .bind(provider)
        .bind(provider_account_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("account", "provider:provider_account_id"))
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<AccountData> {
        self.account_by_provider(&new_account.provider, &new_account.provider_account_id)
            .await
            .conflict_or_ok(
                "account",
                "provider:provider_account_id",
                &format!(
                    "{}:{}",
                    new_account.provider, new_account.provider_account_id
                ),
            )?;

        query_as::<_, AccountRow>(
            "INSERT INTO accounts (
                user_id, provider, provider_account_id, type,
                access_token, expires_at, token_type, scope, id_token
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING
                id, user_id, provider, provider_account_id, type AS kind,
                access_token, expires_at, token_type, scope, id_token",
        )
        .bind(new_account.user_id)
        .bind(&new_account.provider)
        .bind(&new_account.provider_account_id)
        .bind(&new_account.kind)
        .bind(&new_account.access_token)
        .bind(new_account.expires_at)
        .bind(&new_account.token_type)
        .bind(&new_account.scope)
        .bind(&new_account.id_token)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        query_as::<_, SessionRow>(
            "SELECT
                sessions.id,
                sessions.token,
                sessions.expires_at,
                sessions.user_id,
                users.email,
                users.name,
                users.image,
                users.grade_level,
                users.learning_style,
                users.created_at AS user_created_at
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = $1",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("session", "token"))
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&new_session.token)
            .bind(new_session.user_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        query("DELETE FROM sessions WHERE now() > expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn classroom_by_id(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
    ) -> Result<ClassroomData> {
        query_as::<_, ClassroomRow>(&format!(
            "SELECT {CLASSROOM_COLUMNS} FROM classrooms WHERE id = $1 AND user_id = $2"
        ))
        .bind(classroom_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("classroom", "id"))?
        .try_into()
    }

    async fn list_classrooms(&self, user_id: PrimaryKey) -> Result<Vec<ClassroomData>> {
        query_as::<_, ClassroomRow>(&format!(
            "SELECT {CLASSROOM_COLUMNS} FROM classrooms WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(TryInto::try_into)
        .collect()
    }

    async fn list_scheduled_classrooms(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<ScheduledClassroomData>> {
        let classrooms = self.list_classrooms(user_id).await?;
        let mut scheduled = vec![];

        // Users have a handful of classrooms, one lookup each is fine
        for classroom in classrooms {
            match self.timetable_by_classroom(classroom.id).await {
                Ok(timetable) => scheduled.push(ScheduledClassroomData {
                    classroom,
                    timetable: timetable.schedule,
                }),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(scheduled)
    }

    async fn create_classroom(&self, new_classroom: NewClassroom) -> Result<ClassroomData> {
        // Ensure the owner exists
        let user = self.user_by_id(new_classroom.user_id).await?;

        query_as::<_, ClassroomRow>(&format!(
            "INSERT INTO classrooms (
                user_id, name, role, subject, grade_level,
                textbook_url, syllabus_url, study_preferences
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CLASSROOM_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&new_classroom.name)
        .bind(new_classroom.role.as_str())
        .bind(&new_classroom.subject)
        .bind(&new_classroom.grade_level)
        .bind(&new_classroom.textbook_url)
        .bind(&new_classroom.syllabus_url)
        .bind(Json(&new_classroom.study_preferences))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn update_classroom(
        &self,
        updated_classroom: UpdatedClassroom,
    ) -> Result<ClassroomData> {
        let classroom = self
            .classroom_by_id(updated_classroom.user_id, updated_classroom.id)
            .await?;

        query("UPDATE classrooms SET name = $1, notice = $2 WHERE id = $3")
            .bind(updated_classroom.name.unwrap_or(classroom.name))
            .bind(updated_classroom.notice.or(classroom.notice))
            .bind(classroom.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.classroom_by_id(updated_classroom.user_id, updated_classroom.id)
            .await
    }

    async fn delete_classroom(&self, user_id: PrimaryKey, classroom_id: PrimaryKey) -> Result<()> {
        // Ensure classroom exists and belongs to the user
        let _ = self.classroom_by_id(user_id, classroom_id).await?;

        query("DELETE FROM classrooms WHERE id = $1 AND user_id = $2")
            .bind(classroom_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn textbook_by_classroom(&self, classroom_id: PrimaryKey) -> Result<TextbookData> {
        query_as::<_, TextbookRow>("SELECT * FROM textbooks WHERE classroom_id = $1")
            .bind(classroom_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("textbook", "classroom_id"))
    }

    async fn upsert_textbook(&self, new_textbook: NewTextbook) -> Result<TextbookData> {
        query_as::<_, TextbookRow>(
            "INSERT INTO textbooks (classroom_id, title, source, document_id, uri)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (classroom_id) DO UPDATE SET
                title = EXCLUDED.title,
                source = EXCLUDED.source,
                document_id = EXCLUDED.document_id,
                uri = EXCLUDED.uri
            RETURNING *",
        )
        .bind(new_textbook.classroom_id)
        .bind(&new_textbook.title)
        .bind(&new_textbook.source)
        .bind(&new_textbook.document_id)
        .bind(&new_textbook.uri)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn timetable_by_classroom(&self, classroom_id: PrimaryKey) -> Result<TimetableData> {
        query_as::<_, TimetableRow>("SELECT * FROM timetables WHERE classroom_id = $1")
            .bind(classroom_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("timetable", "classroom_id"))
    }

    async fn create_timetable(
        &self,
        classroom_id: PrimaryKey,
        schedule: Timetable,
    ) -> Result<TimetableData> {
        self.timetable_by_classroom(classroom_id).await.conflict_or_ok(
            "timetable",
            "classroom_id",
            &classroom_id.to_string(),
        )?;

        query_as::<_, TimetableRow>(
            "INSERT INTO timetables (classroom_id, schedule) VALUES ($1, $2) RETURNING *",
        )
        .bind(classroom_id)
        .bind(Json(&schedule))
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_timetable(
        &self,
        classroom_id: PrimaryKey,
        schedule: Timetable,
    ) -> Result<TimetableData> {
        query_as::<_, TimetableRow>(
            "UPDATE timetables SET schedule = $1, updated_at = now()
            WHERE classroom_id = $2
            RETURNING *",
        )
        .bind(Json(&schedule))
        .bind(classroom_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("timetable", "classroom_id"))
    }

    async fn delete_timetable(&self, classroom_id: PrimaryKey) -> Result<()> {
        query("DELETE FROM timetables WHERE classroom_id = $1")
            .bind(classroom_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn list_notes(&self, classroom_id: PrimaryKey) -> Result<Vec<NoteData>> {
        query_as::<_, NoteRow>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE classroom_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(classroom_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
        .map_err(|e| e.any())
    }

    async fn list_notes_by_user(&self, user_id: PrimaryKey) -> Result<Vec<ClassroomNotesData>> {
        let classrooms: Vec<(PrimaryKey, String)> = query_as(
            "SELECT id, name FROM classrooms
            WHERE user_id = $1 AND EXISTS (SELECT 1 FROM notes WHERE notes.classroom_id = classrooms.id)
            ORDER BY name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut result = vec![];

        for (classroom_id, classroom_name) in classrooms {
            let notes = query_as::<_, NoteRow>(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE classroom_id = $1 ORDER BY updated_at DESC, id DESC"
            ))
            .bind(classroom_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

            result.push(ClassroomNotesData {
                classroom_id,
                classroom_name,
                notes: notes.into_iter().map(Into::into).collect(),
            });
        }

        Ok(result)
    }

    async fn note_by_id(&self, classroom_id: PrimaryKey, note_id: PrimaryKey) -> Result<NoteData> {
        query_as::<_, NoteRow>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND classroom_id = $2"
        ))
        .bind(note_id)
        .bind(classroom_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("note", "id"))
    }

    async fn create_note(&self, new_note: NewNote) -> Result<NoteData> {
        query_as::<_, NoteRow>(&format!(
            "INSERT INTO notes (classroom_id, name, content, color)
            VALUES ($1, $2, $3, $4)
            RETURNING {NOTE_COLUMNS}"
        ))
        .bind(new_note.classroom_id)
        .bind(&new_note.name)
        .bind(&new_note.content)
        .bind(&new_note.color)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_note(&self, updated_note: UpdatedNote) -> Result<NoteData> {
        let note = self
            .note_by_id(updated_note.classroom_id, updated_note.id)
            .await?;

        query_as::<_, NoteRow>(&format!(
            "UPDATE notes SET
                name = $1,
                content = $2,
                color = $3,
                updated_at = now()
            WHERE id = $4
            RETURNING {NOTE_COLUMNS}"
        ))
        .bind(updated_note.name.unwrap_or(note.name))
        .bind(updated_note.content.unwrap_or(note.content))
        .bind(updated_note.color.unwrap_or(note.color))
        .bind(note.id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn delete_note(&self, classroom_id: PrimaryKey, note_id: PrimaryKey) -> Result<()> {
        // Ensure note exists
        let _ = self.note_by_id(classroom_id, note_id).await?;

        query("DELETE FROM notes WHERE id = $1")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn list_resources(&self, classroom_id: PrimaryKey) -> Result<Vec<ResourceData>> {
        query_as::<_, ResourceRow>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE classroom_id = $1 ORDER BY id"
        ))
        .bind(classroom_id)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(Into::into).collect())
        .map_err(|e| e.any())
    }

    async fn create_resources(
        &self,
        new_resources: Vec<NewResource>,
    ) -> Result<Vec<ResourceData>> {
        let mut created = Vec::with_capacity(new_resources.len());

        for resource in new_resources {
            let row = query_as::<_, ResourceRow>(&format!(
                "INSERT INTO resources (classroom_id, topic, type, url, title, description, thumbnail)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {RESOURCE_COLUMNS}"
            ))
            .bind(resource.classroom_id)
            .bind(&resource.topic)
            .bind(&resource.kind)
            .bind(&resource.url)
            .bind(&resource.title)
            .bind(&resource.description)
            .bind(&resource.thumbnail)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())?;

            created.push(row.into());
        }

        Ok(created)
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
