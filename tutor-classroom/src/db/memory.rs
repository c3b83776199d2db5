use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tutor_core::Timetable;

use crate::{
    AccountData, ClassroomData, ClassroomNotesData, Database, DatabaseError, NewAccount,
    NewClassroom, NewNote, NewResource, NewSession, NewTextbook, NewUser, NoteData, PrimaryKey,
    ResourceData, Result, ScheduledClassroomData, SessionData, TextbookData, TimetableData,
    UpdatedClassroom, UpdatedNote, UpdatedUser, UserData,
};

/// A database that lives in memory.
/// Used for tests and for running the server without postgres.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    next_id: PrimaryKey,
    users: BTreeMap<PrimaryKey, UserData>,
    accounts: BTreeMap<PrimaryKey, AccountData>,
    sessions: BTreeMap<PrimaryKey, (String, PrimaryKey, chrono::DateTime<Utc>)>,
    classrooms: BTreeMap<PrimaryKey, ClassroomData>,
    textbooks: BTreeMap<PrimaryKey, TextbookData>,
    timetables: BTreeMap<PrimaryKey, TimetableData>,
    notes: BTreeMap<PrimaryKey, NoteData>,
    resources: BTreeMap<PrimaryKey, ResourceData>,
}

impl Tables {
    fn next_id(&mut self) -> PrimaryKey {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, user_id: PrimaryKey) -> Result<&UserData> {
        self.users.get(&user_id).ok_or(DatabaseError::NotFound {
            resource: "user",
            identifier: "id",
        })
    }

    fn classroom(&self, user_id: PrimaryKey, classroom_id: PrimaryKey) -> Result<&ClassroomData> {
        self.classrooms
            .get(&classroom_id)
            .filter(|c| c.user_id == user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "classroom",
                identifier: "id",
            })
    }

    fn timetable(&self, classroom_id: PrimaryKey) -> Option<&TimetableData> {
        self.timetables
            .values()
            .find(|t| t.classroom_id == classroom_id)
    }

    fn note_id(&self, classroom_id: PrimaryKey, note_id: PrimaryKey) -> Result<PrimaryKey> {
        self.notes
            .get(&note_id)
            .filter(|n| n.classroom_id == classroom_id)
            .map(|n| n.id)
            .ok_or(DatabaseError::NotFound {
                resource: "note",
                identifier: "id",
            })
    }

    fn remove_classroom(&mut self, classroom_id: PrimaryKey) {
        self.classrooms.remove(&classroom_id);
        self.textbooks.retain(|_, t| t.classroom_id != classroom_id);
        self.timetables.retain(|_, t| t.classroom_id != classroom_id);
        self.notes.retain(|_, n| n.classroom_id != classroom_id);
        self.resources.retain(|_, r| r.classroom_id != classroom_id);
    }

    fn classrooms_of(&self, user_id: PrimaryKey) -> Vec<ClassroomData> {
        let mut classrooms: Vec<_> = self
            .classrooms
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();

        classrooms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        classrooms
    }

    fn notes_of(&self, classroom_id: PrimaryKey) -> Vec<NoteData> {
        self.notes
            .values()
            .filter(|n| n.classroom_id == classroom_id)
            .cloned()
            .collect()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        self.tables.lock().user(user_id).cloned()
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        self.tables
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "email",
            })
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut tables = self.tables.lock();

        if tables.users.values().any(|u| u.email == new_user.email) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "email",
                value: new_user.email,
            });
        }

        let user = UserData {
            id: tables.next_id(),
            email: new_user.email,
            name: new_user.name,
            image: new_user.image,
            grade_level: None,
            learning_style: None,
            created_at: Utc::now(),
        };

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let mut tables = self.tables.lock();
        let mut user = tables.user(updated_user.id)?.clone();

        if let Some(name) = updated_user.name {
            user.name = name;
        }

        user.image = updated_user.image.or(user.image);
        user.grade_level = updated_user.grade_level.or(user.grade_level);
        user.learning_style = updated_user.learning_style.or(user.learning_style);

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        let mut tables = self.tables.lock();
        tables.user(user_id)?;

        let classroom_ids: Vec<_> = tables
            .classrooms_of(user_id)
            .into_iter()
            .map(|c| c.id)
            .collect();

        for classroom_id in classroom_ids {
            tables.remove_classroom(classroom_id);
        }

        tables.accounts.retain(|_, a| a.user_id != user_id);
        tables.sessions.retain(|_, (_, owner, _)| *owner != user_id);
        tables.users.remove(&user_id);

        Ok(())
    }

    async fn account_by_provider(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<AccountData> {
        self.tables
            .lock()
            .accounts
            .values()
            .find(|a| a.provider == provider && a.provider_account_id == provider_account_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "account",
                identifier: "provider:provider_account_id",
            })
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<AccountData> {
        let mut tables = self.tables.lock();
        tables.user(new_account.user_id)?;

        let exists = tables.accounts.values().any(|a| {
            a.provider == new_account.provider
                && a.provider_account_id == new_account.provider_account_id
        });

        if exists {
            return Err(DatabaseError::Conflict {
                resource: "account",
                field: "provider:provider_account_id",
                value: format!(
                    "{}:{}",
                    new_account.provider, new_account.provider_account_id
                ),
            });
        }

        let account = AccountData {
            id: tables.next_id(),
            user_id: new_account.user_id,
            provider: new_account.provider,
            provider_account_id: new_account.provider_account_id,
            kind: new_account.kind,
            access_token: new_account.access_token,
            expires_at: new_account.expires_at,
            token_type: new_account.token_type,
            scope: new_account.scope,
            id_token: new_account.id_token,
        };

        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let tables = self.tables.lock();

        let (id, (token, user_id, expires_at)) = tables
            .sessions
            .iter()
            .find(|(_, (t, _, _))| t == token)
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        Ok(SessionData {
            id: *id,
            token: token.clone(),
            expires_at: *expires_at,
            user: tables.user(*user_id)?.clone(),
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        {
            let mut tables = self.tables.lock();
            tables.user(new_session.user_id)?;

            if tables
                .sessions
                .values()
                .any(|(t, _, _)| *t == new_session.token)
            {
                return Err(DatabaseError::Conflict {
                    resource: "session",
                    field: "token",
                    value: new_session.token,
                });
            }

            let id = tables.next_id();
            tables.sessions.insert(
                id,
                (
                    new_session.token.clone(),
                    new_session.user_id,
                    new_session.expires_at,
                ),
            );
        }

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        let mut tables = self.tables.lock();
        let before = tables.sessions.len();

        tables.sessions.retain(|_, (t, _, _)| t.as_str() != token);

        if tables.sessions.len() == before {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();

        self.tables
            .lock()
            .sessions
            .retain(|_, (_, _, expires_at)| *expires_at > now);

        Ok(())
    }

    async fn classroom_by_id(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
    ) -> Result<ClassroomData> {
        self.tables
            .lock()
            .classroom(user_id, classroom_id)
            .cloned()
    }

    async fn list_classrooms(&self, user_id: PrimaryKey) -> Result<Vec<ClassroomData>> {
        Ok(self.tables.lock().classrooms_of(user_id))
    }

    async fn list_scheduled_classrooms(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<ScheduledClassroomData>> {
        let tables = self.tables.lock();

        let scheduled = tables
            .classrooms_of(user_id)
            .into_iter()
            .filter_map(|classroom| {
                let timetable = tables.timetable(classroom.id)?.schedule.clone();
                Some(ScheduledClassroomData {
                    classroom,
                    timetable,
                })
            })
            .collect();

        Ok(scheduled)
    }

    async fn create_classroom(&self, new_classroom: NewClassroom) -> Result<ClassroomData> {
        let mut tables = self.tables.lock();
        tables.user(new_classroom.user_id)?;

        let classroom = ClassroomData {
            id: tables.next_id(),
            user_id: new_classroom.user_id,
            name: new_classroom.name,
            role: new_classroom.role,
            subject: new_classroom.subject,
            grade_level: new_classroom.grade_level,
            textbook_url: new_classroom.textbook_url,
            syllabus_url: new_classroom.syllabus_url,
            study_preferences: new_classroom.study_preferences,
            notice: None,
            created_at: Utc::now(),
        };

        tables.classrooms.insert(classroom.id, classroom.clone());
        Ok(classroom)
    }

    async fn update_classroom(
        &self,
        updated_classroom: UpdatedClassroom,
    ) -> Result<ClassroomData> {
        let mut tables = self.tables.lock();
        let mut classroom = tables
            .classroom(updated_classroom.user_id, updated_classroom.id)?
            .clone();

        if let Some(name) = updated_classroom.name {
            classroom.name = name;
        }

        classroom.notice = updated_classroom.notice.or(classroom.notice);

        tables.classrooms.insert(classroom.id, classroom.clone());
        Ok(classroom)
    }

    async fn delete_classroom(&self, user_id: PrimaryKey, classroom_id: PrimaryKey) -> Result<()> {
        let mut tables = self.tables.lock();
        tables.classroom(user_id, classroom_id)?;
        tables.remove_classroom(classroom_id);

        Ok(())
    }

    async fn textbook_by_classroom(&self, classroom_id: PrimaryKey) -> Result<TextbookData> {
        self.tables
            .lock()
            .textbooks
            .values()
            .find(|t| t.classroom_id == classroom_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "textbook",
                identifier: "classroom_id",
            })
    }

    async fn upsert_textbook(&self, new_textbook: NewTextbook) -> Result<TextbookData> {
        let mut tables = self.tables.lock();

        let existing = tables
            .textbooks
            .values()
            .find(|t| t.classroom_id == new_textbook.classroom_id)
            .map(|t| t.id);

        let id = match existing {
            Some(id) => id,
            None => tables.next_id(),
        };

        let textbook = TextbookData {
            id,
            classroom_id: new_textbook.classroom_id,
            title: new_textbook.title,
            source: new_textbook.source,
            document_id: new_textbook.document_id,
            uri: new_textbook.uri,
        };

        tables.textbooks.insert(id, textbook.clone());
        Ok(textbook)
    }

    async fn timetable_by_classroom(&self, classroom_id: PrimaryKey) -> Result<TimetableData> {
        self.tables
            .lock()
            .timetable(classroom_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "timetable",
                identifier: "classroom_id",
            })
    }

    async fn create_timetable(
        &self,
        classroom_id: PrimaryKey,
        schedule: Timetable,
    ) -> Result<TimetableData> {
        let mut tables = self.tables.lock();

        if tables.timetable(classroom_id).is_some() {
            return Err(DatabaseError::Conflict {
                resource: "timetable",
                field: "classroom_id",
                value: classroom_id.to_string(),
            });
        }

        let now = Utc::now();
        let timetable = TimetableData {
            id: tables.next_id(),
            classroom_id,
            schedule,
            created_at: now,
            updated_at: now,
        };

        tables.timetables.insert(timetable.id, timetable.clone());
        Ok(timetable)
    }

    async fn update_timetable(
        &self,
        classroom_id: PrimaryKey,
        schedule: Timetable,
    ) -> Result<TimetableData> {
        let mut tables = self.tables.lock();

        let mut timetable = tables
            .timetable(classroom_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "timetable",
                identifier: "classroom_id",
            })?;

        timetable.schedule = schedule;
        timetable.updated_at = Utc::now();

        tables.timetables.insert(timetable.id, timetable.clone());
        Ok(timetable)
    }

    async fn delete_timetable(&self, classroom_id: PrimaryKey) -> Result<()> {
        self.tables
            .lock()
            .timetables
            .retain(|_, t| t.classroom_id != classroom_id);

        Ok(())
    }

    async fn list_notes(&self, classroom_id: PrimaryKey) -> Result<Vec<NoteData>> {
        let mut notes = self.tables.lock().notes_of(classroom_id);
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(notes)
    }

    async fn list_notes_by_user(&self, user_id: PrimaryKey) -> Result<Vec<ClassroomNotesData>> {
        let tables = self.tables.lock();

        let mut result: Vec<_> = tables
            .classrooms_of(user_id)
            .into_iter()
            .filter_map(|classroom| {
                let mut notes = tables.notes_of(classroom.id);

                if notes.is_empty() {
                    return None;
                }

                notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));

                Some(ClassroomNotesData {
                    classroom_id: classroom.id,
                    classroom_name: classroom.name,
                    notes,
                })
            })
            .collect();

        result.sort_by(|a, b| a.classroom_name.cmp(&b.classroom_name));
        Ok(result)
    }

    async fn note_by_id(&self, classroom_id: PrimaryKey, note_id: PrimaryKey) -> Result<NoteData> {
        let tables = self.tables.lock();
        let id = tables.note_id(classroom_id, note_id)?;

        Ok(tables.notes[&id].clone())
    }

    async fn create_note(&self, new_note: NewNote) -> Result<NoteData> {
        let mut tables = self.tables.lock();

        let now = Utc::now();
        let note = NoteData {
            id: tables.next_id(),
            classroom_id: new_note.classroom_id,
            name: new_note.name,
            content: new_note.content,
            color: new_note.color,
            created_at: now,
            updated_at: now,
        };

        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update_note(&self, updated_note: UpdatedNote) -> Result<NoteData> {
        let mut tables = self.tables.lock();
        let id = tables.note_id(updated_note.classroom_id, updated_note.id)?;

        let mut note = tables.notes[&id].clone();

        if let Some(name) = updated_note.name {
            note.name = name;
        }

        if let Some(content) = updated_note.content {
            note.content = content;
        }

        if let Some(color) = updated_note.color {
            note.color = color;
        }

        note.updated_at = Utc::now();

        tables.notes.insert(id, note.clone());
        Ok(note)
    }

    async fn delete_note(&self, classroom_id: PrimaryKey, note_id: PrimaryKey) -> Result<()> {
        let mut tables = self.tables.lock();
        let id = tables.note_id(classroom_id, note_id)?;

        tables.notes.remove(&id);
        Ok(())
    }

    async fn list_resources(&self, classroom_id: PrimaryKey) -> Result<Vec<ResourceData>> {
        Ok(self
            .tables
            .lock()
            .resources
            .values()
            .filter(|r| r.classroom_id == classroom_id)
            .cloned()
            .collect())
    }

    async fn create_resources(
        &self,
        new_resources: Vec<NewResource>,
    ) -> Result<Vec<ResourceData>> {
        let mut tables = self.tables.lock();
        let mut created = Vec::with_capacity(new_resources.len());

        for resource in new_resources {
            let resource = ResourceData {
                id: tables.next_id(),
                classroom_id: resource.classroom_id,
                topic: resource.topic,
                kind: resource.kind,
                url: resource.url,
                title: resource.title,
                description: resource.description,
                thumbnail: resource.thumbnail,
            };

            tables.resources.insert(resource.id, resource.clone());
            created.push(resource);
        }

        Ok(created)
    }
}

#[cfg(test)]
mod test {
    use tutor_core::{Role, StudyPreferences};

    use super::*;

    async fn user_with_classroom(db: &MemoryDatabase) -> (UserData, ClassroomData) {
        let user = db
            .create_user(NewUser {
                email: "ada@example.com".into(),
                name: "Ada".into(),
                image: None,
            })
            .await
            .unwrap();

        let classroom = db
            .create_classroom(NewClassroom {
                user_id: user.id,
                name: "Algebra".into(),
                role: Role::Student,
                subject: "Math".into(),
                grade_level: "10".into(),
                textbook_url: None,
                syllabus_url: None,
                study_preferences: StudyPreferences::default(),
            })
            .await
            .unwrap();

        (user, classroom)
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let db = MemoryDatabase::new();
        let (user, _) = user_with_classroom(&db).await;

        let result = db
            .create_user(NewUser {
                email: user.email,
                name: "Someone else".into(),
                image: None,
            })
            .await;

        assert!(matches!(result, Err(DatabaseError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_classroom_is_scoped_to_owner() {
        let db = MemoryDatabase::new();
        let (user, classroom) = user_with_classroom(&db).await;

        assert!(db.classroom_by_id(user.id, classroom.id).await.is_ok());

        let other = db
            .classroom_by_id(user.id + 100, classroom.id)
            .await
            .unwrap_err();

        assert!(other.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_classroom_cascades() {
        let db = MemoryDatabase::new();
        let (user, classroom) = user_with_classroom(&db).await;

        db.create_timetable(classroom.id, Timetable::default())
            .await
            .unwrap();
        db.create_note(NewNote {
            classroom_id: classroom.id,
            name: "Note".into(),
            content: String::new(),
            color: "yellow".into(),
        })
        .await
        .unwrap();

        db.delete_classroom(user.id, classroom.id).await.unwrap();

        assert!(db.timetable_by_classroom(classroom.id).await.is_err());
        assert!(db.list_notes(classroom.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_textbook_replaces() {
        let db = MemoryDatabase::new();
        let (_, classroom) = user_with_classroom(&db).await;

        let first = db
            .upsert_textbook(NewTextbook {
                classroom_id: classroom.id,
                title: "First".into(),
                source: "google".into(),
                document_id: "a".into(),
                uri: "/documents/a".into(),
            })
            .await
            .unwrap();

        let second = db
            .upsert_textbook(NewTextbook {
                classroom_id: classroom.id,
                title: "Second".into(),
                source: "openlibrary".into(),
                document_id: "b".into(),
                uri: "/documents/b".into(),
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(
            db.textbook_by_classroom(classroom.id).await.unwrap().title,
            "Second"
        );
    }
}
