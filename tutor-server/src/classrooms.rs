use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json,
};
use tutor_classroom::{ClassroomRequest, UpdatedClassroom};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{
        NewClassroomSchema, NoteSchema, TextbookSchema, TimetableSchema, UpdateClassroomSchema,
        ValidatedJson,
    },
    serialized::{
        Classroom, NewClassroom, Note, Resource, ScheduledClassroom, Textbook, Timetable,
        ToSerialized,
    },
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/classrooms",
    tag = "classrooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Classroom>)
    )
)]
async fn list_classrooms(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Classroom>>> {
    let classrooms = context.tutor.classrooms.list(session.user().id).await?;

    Ok(Json(classrooms.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/classrooms",
    tag = "classrooms",
    request_body = NewClassroomSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = NewClassroom),
        (status = 502, description = "The timetable could not be generated, the classroom is kept")
    )
)]
async fn create_classroom(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewClassroomSchema>,
) -> ServerResult<(StatusCode, Json<NewClassroom>)> {
    let created = context
        .tutor
        .classrooms
        .create(
            session.user().id,
            ClassroomRequest {
                name: body.name,
                role: body.role,
                subject: body.subject,
                grade_level: body.grade_level,
                textbook_url: body.textbook_url,
                syllabus_url: body.syllabus_url,
                study_preferences: body.study_preferences.into(),
                textbook: body.textbook.map(Into::into),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created.to_serialized())))
}

#[utoipa::path(
    get,
    path = "/v1/classrooms/{id}",
    tag = "classrooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Classroom),
        (status = 404, description = "No such classroom")
    )
)]
async fn classroom(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
) -> ServerResult<Json<Classroom>> {
    let classroom = context.tutor.classrooms.get(session.user().id, id).await?;

    Ok(Json(classroom.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/classrooms/{id}",
    tag = "classrooms",
    request_body = UpdateClassroomSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Classroom)
    )
)]
async fn update_classroom(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateClassroomSchema>,
) -> ServerResult<Json<Classroom>> {
    let classroom = context
        .tutor
        .classrooms
        .update(UpdatedClassroom {
            id,
            user_id: session.user().id,
            name: body.name,
            notice: body.notice,
        })
        .await?;

    Ok(Json(classroom.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/classrooms/{id}",
    tag = "classrooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 204, description = "The classroom and everything in it is gone")
    )
)]
async fn delete_classroom(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
) -> ServerResult<StatusCode> {
    context.tutor.classrooms.delete(session.user().id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/classrooms/{id}/timetable",
    tag = "timetables",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Timetable)
    )
)]
async fn timetable(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
) -> ServerResult<Json<Timetable>> {
    let timetable = context.tutor.classrooms.timetable(session.user().id, id).await?;

    Ok(Json(timetable.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/classrooms/{id}/timetable",
    tag = "timetables",
    request_body = TimetableSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Timetable),
        (status = 409, description = "The classroom already has a timetable")
    )
)]
async fn create_timetable(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<TimetableSchema>,
) -> ServerResult<(StatusCode, Json<Timetable>)> {
    let timetable = context
        .tutor
        .classrooms
        .save_timetable(session.user().id, id, body.into())
        .await?;

    Ok((StatusCode::CREATED, Json(timetable.to_serialized())))
}

#[utoipa::path(
    put,
    path = "/v1/classrooms/{id}/timetable",
    tag = "timetables",
    request_body = TimetableSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Timetable)
    )
)]
async fn replace_timetable(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<TimetableSchema>,
) -> ServerResult<Json<Timetable>> {
    let timetable = context
        .tutor
        .classrooms
        .replace_timetable(session.user().id, id, body.into())
        .await?;

    Ok(Json(timetable.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/schedule",
    tag = "timetables",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<ScheduledClassroom>)
    )
)]
async fn schedule(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<ScheduledClassroom>>> {
    let schedule = context.tutor.classrooms.schedule(session.user().id).await?;

    Ok(Json(schedule.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/classrooms/{id}/resources",
    tag = "classrooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Resource>),
        (status = 502, description = "The resource search failed")
    )
)]
async fn resources(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
) -> ServerResult<Json<Vec<Resource>>> {
    let resources = context.tutor.classrooms.resources(session.user().id, id).await?;

    Ok(Json(resources.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/classrooms/{id}/textbook",
    tag = "classrooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Textbook),
        (status = 404, description = "No textbook is linked")
    )
)]
async fn textbook(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
) -> ServerResult<Json<Textbook>> {
    let textbook = context.tutor.classrooms.textbook(session.user().id, id).await?;

    Ok(Json(textbook.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/classrooms/{id}/textbook",
    tag = "classrooms",
    request_body = TextbookSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Textbook)
    )
)]
async fn link_textbook(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<TextbookSchema>,
) -> ServerResult<Json<Textbook>> {
    let textbook = context
        .tutor
        .classrooms
        .link_textbook(session.user().id, id, body.into())
        .await?;

    Ok(Json(textbook.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/classrooms/{id}/notes",
    tag = "notes",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Note>)
    )
)]
async fn notes(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
) -> ServerResult<Json<Vec<Note>>> {
    let notes = context.tutor.notes.list(session.user().id, id).await?;

    Ok(Json(notes.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/classrooms/{id}/notes",
    tag = "notes",
    request_body = NoteSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Note)
    )
)]
async fn create_note(
    session: Session,
    State(context): State<ServerContext>,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<NoteSchema>,
) -> ServerResult<(StatusCode, Json<Note>)> {
    let note = context
        .tutor
        .notes
        .create(session.user().id, id, body.into())
        .await?;

    Ok((StatusCode::CREATED, Json(note.to_serialized())))
}

#[utoipa::path(
    get,
    path = "/v1/classrooms/{id}/notes/{note_id}",
    tag = "notes",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Note)
    )
)]
async fn note(
    session: Session,
    State(context): State<ServerContext>,
    Path((id, note_id)): Path<(i32, i32)>,
) -> ServerResult<Json<Note>> {
    let note = context.tutor.notes.get(session.user().id, id, note_id).await?;

    Ok(Json(note.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/classrooms/{id}/notes/{note_id}",
    tag = "notes",
    request_body = NoteSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Note)
    )
)]
async fn update_note(
    session: Session,
    State(context): State<ServerContext>,
    Path((id, note_id)): Path<(i32, i32)>,
    ValidatedJson(body): ValidatedJson<NoteSchema>,
) -> ServerResult<Json<Note>> {
    let note = context
        .tutor
        .notes
        .update(session.user().id, id, note_id, body.into())
        .await?;

    Ok(Json(note.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/classrooms/{id}/notes/{note_id}",
    tag = "notes",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 204, description = "The note is gone")
    )
)]
async fn delete_note(
    session: Session,
    State(context): State<ServerContext>,
    Path((id, note_id)): Path<(i32, i32)>,
) -> ServerResult<StatusCode> {
    context
        .tutor
        .notes
        .delete(session.user().id, id, note_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router {
    Router::new()
        .route("/classrooms", get(list_classrooms).post(create_classroom))
        .route(
            "/classrooms/:id",
            get(classroom)
                .patch(update_classroom)
                .delete(delete_classroom),
        )
        .route(
            "/classrooms/:id/timetable",
            get(timetable)
                .post(create_timetable)
                .put(replace_timetable),
        )
        .route("/classrooms/:id/resources", get(resources))
        .route("/classrooms/:id/textbook", get(textbook).put(link_textbook))
        .route("/classrooms/:id/notes", get(notes).post(create_note))
        .route(
            "/classrooms/:id/notes/:note_id",
            get(note).patch(update_note).delete(delete_note),
        )
        .route("/schedule", get(schedule))
}
