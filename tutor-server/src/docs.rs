use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{schemas, serialized};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health,
        crate::auth::sign_in,
        crate::auth::callback,
        crate::auth::logout,
        crate::profile::profile,
        crate::profile::update_profile,
        crate::profile::delete_profile,
        crate::classrooms::list_classrooms,
        crate::classrooms::create_classroom,
        crate::classrooms::classroom,
        crate::classrooms::update_classroom,
        crate::classrooms::delete_classroom,
        crate::classrooms::timetable,
        crate::classrooms::create_timetable,
        crate::classrooms::replace_timetable,
        crate::classrooms::schedule,
        crate::classrooms::resources,
        crate::classrooms::textbook,
        crate::classrooms::link_textbook,
        crate::classrooms::notes,
        crate::classrooms::create_note,
        crate::classrooms::note,
        crate::classrooms::update_note,
        crate::classrooms::delete_note,
        crate::notes::all_notes,
        crate::documents::search,
        crate::documents::import,
        crate::documents::progress,
        crate::chat::chat,
        crate::chat::rag_query,
    ),
    components(schemas(
        schemas::NewClassroomSchema,
        schemas::StudyPreferencesSchema,
        schemas::UpdateClassroomSchema,
        schemas::TextbookSchema,
        schemas::TimetableSchema,
        schemas::StudySessionSchema,
        schemas::NoteSchema,
        schemas::ProfileSchema,
        schemas::ImportSchema,
        schemas::RagQuerySchema,
        schemas::ChatForm,
        serialized::User,
        serialized::LoginResult,
        serialized::StudyPreferences,
        serialized::Classroom,
        serialized::NewClassroom,
        serialized::StudySession,
        serialized::WeekGroup,
        serialized::Timetable,
        serialized::ScheduledClassroom,
        serialized::Note,
        serialized::ClassroomNotes,
        serialized::Resource,
        serialized::Textbook,
        serialized::Candidate,
        serialized::ImportResult,
        serialized::ChatAnswer,
        serialized::Health,
    )),
    modifiers(&Security),
    info(
        title = "ai-tutor",
        description = "Classrooms, timetables, notes and study resources for the AI tutor"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let api = ApiDoc::openapi();

        assert!(api.paths.paths.contains_key("/v1/classrooms/{id}/timetable"));
        assert!(api.paths.paths.contains_key("/v1/rag/query"));

        let components = api.components.unwrap();
        assert!(components.security_schemes.contains_key("BearerAuth"));
    }
}
