use log::{info, warn};
use thiserror::Error;
use tutor_core::{ResourceKind, Role, StudyPreferences, Timetable};

use crate::{
    ClassroomData, DatabaseError, NewClassroom, NewResource, NewTextbook, PrimaryKey,
    ResourceData, ResourceSearcher, ScheduledClassroomData, ServiceError, SharedDatabase,
    TextbookData, TimetableData, TimetableRequest, Tutorbot, UpdatedClassroom, YouTube,
};

#[derive(Debug, Error)]
pub enum ClassroomError {
    #[error("Study preferences are out of range")]
    InvalidPreferences,
    #[error(transparent)]
    Db(#[from] DatabaseError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

type Result<T> = std::result::Result<T, ClassroomError>;

/// Everything the classroom wizard submits
#[derive(Debug, Clone)]
pub struct ClassroomRequest {
    pub name: String,
    pub role: Role,
    pub subject: String,
    pub grade_level: String,
    pub textbook_url: Option<String>,
    pub syllabus_url: Option<String>,
    pub study_preferences: StudyPreferences,
    /// A textbook imported while filling in the wizard
    pub textbook: Option<TextbookLink>,
}

/// A textbook imported through the document service
#[derive(Debug, Clone, PartialEq)]
pub struct TextbookLink {
    pub title: String,
    pub source: String,
    pub document_id: String,
    pub uri: String,
}

#[derive(Debug, Clone)]
pub struct CreatedClassroom {
    pub classroom: ClassroomData,
    pub timetable: Timetable,
}

/// Classroom operations. Every operation takes the id of the acting user,
/// classrooms of other users are reported as not found.
pub struct Classrooms {
    db: SharedDatabase,
    tutorbot: Tutorbot,
    searcher: ResourceSearcher,
    youtube: YouTube,
}

impl Classrooms {
    pub fn new(
        db: &SharedDatabase,
        tutorbot: Tutorbot,
        searcher: ResourceSearcher,
        youtube: YouTube,
    ) -> Self {
        Self {
            db: db.clone(),
            tutorbot,
            searcher,
            youtube,
        }
    }

    /// Creates a classroom and generates its timetable.
    ///
    /// The classroom is stored before the generator is called, so a failing
    /// generator leaves a classroom without a timetable behind.
    pub async fn create(
        &self,
        user_id: PrimaryKey,
        request: ClassroomRequest,
    ) -> Result<CreatedClassroom> {
        if !request.study_preferences.is_within_bounds() {
            return Err(ClassroomError::InvalidPreferences);
        }

        let classroom = self
            .db
            .create_classroom(NewClassroom {
                user_id,
                name: request.name,
                role: request.role,
                subject: request.subject,
                grade_level: request.grade_level,
                textbook_url: request.textbook_url,
                syllabus_url: request.syllabus_url,
                study_preferences: request.study_preferences,
            })
            .await?;

        info!("Created classroom {} for user {}", classroom.id, user_id);

        if let Some(textbook) = request.textbook {
            self.store_textbook(classroom.id, textbook).await?;
        }

        let timetable = self
            .tutorbot
            .generate_timetable(&TimetableRequest {
                id: classroom.id,
                name: classroom.name.clone(),
                role: classroom.role,
                subject: classroom.subject.clone(),
                grade_level: classroom.grade_level.clone(),
                textbook_url: classroom.textbook_url.clone(),
                syllabus_url: classroom.syllabus_url.clone(),
                study_preferences: classroom.study_preferences.clone(),
            })
            .await?;

        let timetable = self
            .db
            .create_timetable(classroom.id, timetable)
            .await?
            .schedule;

        Ok(CreatedClassroom {
            classroom,
            timetable,
        })
    }

    /// Lists the classrooms of a user, newest first
    pub async fn list(&self, user_id: PrimaryKey) -> Result<Vec<ClassroomData>> {
        Ok(self.db.list_classrooms(user_id).await?)
    }

    pub async fn get(&self, user_id: PrimaryKey, classroom_id: PrimaryKey) -> Result<ClassroomData> {
        Ok(self.db.classroom_by_id(user_id, classroom_id).await?)
    }

    pub async fn rename(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
        name: String,
    ) -> Result<ClassroomData> {
        self.update(UpdatedClassroom {
            id: classroom_id,
            user_id,
            name: Some(name),
            ..Default::default()
        })
        .await
    }

    pub async fn update_notice(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
        notice: String,
    ) -> Result<ClassroomData> {
        self.update(UpdatedClassroom {
            id: classroom_id,
            user_id,
            notice: Some(notice),
            ..Default::default()
        })
        .await
    }

    /// Changes the name and notice at once, only the given fields change
    pub async fn update(&self, updated: UpdatedClassroom) -> Result<ClassroomData> {
        Ok(self.db.update_classroom(updated).await?)
    }

    /// Deletes a classroom along with everything in it
    pub async fn delete(&self, user_id: PrimaryKey, classroom_id: PrimaryKey) -> Result<()> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;

        self.db.delete_timetable(classroom.id).await?;
        self.db.delete_classroom(user_id, classroom.id).await?;

        info!("Deleted classroom {} of user {}", classroom.id, user_id);
        Ok(())
    }

    pub async fn timetable(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
    ) -> Result<TimetableData> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;
        Ok(self.db.timetable_by_classroom(classroom.id).await?)
    }

    /// Stores a timetable for a classroom that has none yet
    pub async fn save_timetable(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
        timetable: Timetable,
    ) -> Result<TimetableData> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;
        Ok(self.db.create_timetable(classroom.id, timetable).await?)
    }

    /// Replaces the existing timetable of a classroom
    pub async fn replace_timetable(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
        timetable: Timetable,
    ) -> Result<TimetableData> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;
        Ok(self.db.update_timetable(classroom.id, timetable).await?)
    }

    /// Every classroom of the user that has a timetable, newest first
    pub async fn schedule(&self, user_id: PrimaryKey) -> Result<Vec<ScheduledClassroomData>> {
        Ok(self.db.list_scheduled_classrooms(user_id).await?)
    }

    /// Returns the stored resources of a classroom, searching for them the first time
    pub async fn resources(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
    ) -> Result<Vec<ResourceData>> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;
        let stored = self.db.list_resources(classroom.id).await?;

        if !stored.is_empty() {
            return Ok(stored);
        }

        let found = self.searcher.query(classroom.id).await?;
        let mut new_resources = Vec::with_capacity(found.len());

        for resource in found {
            let mut title = resource.topic.clone();
            let mut description = format!("Study resources for {}", resource.topic);
            let mut thumbnail = None;

            if ResourceKind::from(resource.kind.as_str()) == ResourceKind::Video {
                if let Some(details) = self.youtube.video_details(&resource.url).await {
                    title = details.title;
                    description = details.description;
                    thumbnail = details.thumbnail;
                }
            }

            new_resources.push(NewResource {
                classroom_id: classroom.id,
                topic: resource.topic,
                kind: resource.kind,
                url: resource.url,
                title,
                description,
                thumbnail,
            });
        }

        if new_resources.is_empty() {
            warn!("No resources found for classroom {}", classroom.id);
        }

        Ok(self.db.create_resources(new_resources).await?)
    }

    /// Links an imported textbook to a classroom, replacing any previous one
    pub async fn link_textbook(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
        textbook: TextbookLink,
    ) -> Result<TextbookData> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;
        self.store_textbook(classroom.id, textbook).await
    }

    pub async fn textbook(
        &self,
        user_id: PrimaryKey,
        classroom_id: PrimaryKey,
    ) -> Result<TextbookData> {
        let classroom = self.db.classroom_by_id(user_id, classroom_id).await?;
        Ok(self.db.textbook_by_classroom(classroom.id).await?)
    }

    async fn store_textbook(
        &self,
        classroom_id: PrimaryKey,
        textbook: TextbookLink,
    ) -> Result<TextbookData> {
        Ok(self
            .db
            .upsert_textbook(NewTextbook {
                classroom_id,
                title: textbook.title,
                source: textbook.source,
                document_id: textbook.document_id,
                uri: textbook.uri,
            })
            .await?)
    }
}
