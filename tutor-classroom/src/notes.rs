use tutor_core::{DEFAULT_NOTE_COLOR, DEFAULT_NOTE_NAME};

use crate::{
    ClassroomNotesData, DatabaseError, NewNote, NoteData, PrimaryKey, SharedDatabase,
    UpdatedNote,
};

type Result<T> = std::result::Result<T, DatabaseError>;

/// A note as submitted by the user, missing fields take their defaults
#[derive(Debug, Clone, Default)]
pub struct NoteRequest {
    pub name: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
}

/// Note operations, scoped to classrooms the acting user owns
pub struct Notes {
    db: SharedDatabase,
}

impl Notes {
    pub fn new(db: &SharedDatabase) -> Self {
        Self { db: db.clone() }
    }

    /// Lists the notes of a classroom, newest first
    pub async fn list(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
    ) -> Result<Vec<NoteData>> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;
        self.db.list_notes(classroom.id).await
    }

    pub async fn create(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
        note: NoteRequest,
    ) -> Result<NoteData> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;

        self.db
            .create_note(NewNote {
                classroom_id: classroom.id,
                name: note.name.unwrap_or_else(|| DEFAULT_NOTE_NAME.to_string()),
                content: note.content.unwrap_or_default(),
                color: note.color.unwrap_or_else(|| DEFAULT_NOTE_COLOR.to_string()),
            })
            .await
    }

    pub async fn get(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
        note_id: PrimaryKey,
    ) -> Result<NoteData> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;
        self.db.note_by_id(classroom.id, note_id).await
    }

    /// Changes only the fields that are given
    pub async fn update(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
        note_id: PrimaryKey,
        note: NoteRequest,
    ) -> Result<NoteData> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;

        self.db
            .update_note(UpdatedNote {
                id: note_id,
                classroom_id: classroom.id,
                name: note.name,
                content: note.content,
                color: note.color,
            })
            .await
    }

    pub async fn delete(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
        note_id: PrimaryKey,
    ) -> Result<()> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;
        self.db.delete_note(classroom.id, note_id).await
    }

    /// Every classroom of the user that has notes, by classroom name
    pub async fn all(&self, user_id: PrimaryKey) -> Result<Vec<ClassroomNotesData>> {
        self.db.list_notes_by_user(user_id).await
    }
}
