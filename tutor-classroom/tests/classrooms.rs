use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tutor_classroom::{
    ClassroomError, ClassroomRequest, Database, MemoryDatabase, NewUser, NoteRequest,
    ServiceError, SharedDatabase, TextbookLink, Tutor, UserData, YouTube,
};
use tutor_core::{Config, LearningStyle, Role, StudyPreferences};

#[derive(Clone, Default)]
struct Calls {
    timetable: Arc<AtomicUsize>,
    resources: Arc<AtomicUsize>,
}

async fn generate_timetable(State(calls): State<Calls>, Json(body): Json<Value>) -> Json<Value> {
    calls.timetable.fetch_add(1, Ordering::SeqCst);

    assert_eq!(body["studyPreferences"]["daysPerWeek"], 3);

    // The generator likes to wrap its answer in a code fence
    Json(json!({
        "timetable": "```json\n[
            { \"week\": 2, \"day\": 1, \"durationHours\": 1.0, \"topic\": \"Quadratics\" },
            { \"week\": 1, \"day\": 1, \"durationHours\": 1.5, \"topic\": \"Linear equations\", \"activities\": [\"Drill\"] }
        ]\n```"
    }))
}

async fn query_resources(State(calls): State<Calls>) -> Json<Value> {
    calls.resources.fetch_add(1, Ordering::SeqCst);

    Json(json!({
        "resources": [
            { "topic": "Quadratics", "type": "video", "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ" },
            { "topic": "Linear equations", "type": "website", "url": "https://example.com/linear" }
        ]
    }))
}

async fn youtube_videos() -> Json<Value> {
    Json(json!({
        "items": [{
            "snippet": {
                "title": "Quadratics in 10 minutes",
                "description": "A quick tour",
                "thumbnails": {
                    "default": { "url": "https://i.ytimg.com/default.jpg" },
                    "medium": { "url": "https://i.ytimg.com/medium.jpg" }
                }
            }
        }]
    }))
}

async fn failing() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Serves a stand-in for the external services on an ephemeral port
async fn mock_services(failing_generator: bool) -> (String, Calls) {
    let calls = Calls::default();

    let generator = if failing_generator {
        post(failing)
    } else {
        post(generate_timetable)
    };

    let app = Router::new()
        .route("/api/generate-timetable", generator)
        .route("/api/query-resources", post(query_resources))
        .route("/youtube/v3/videos", axum::routing::get(youtube_videos))
        .with_state(calls.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), calls)
}

async fn setup(failing_generator: bool) -> (Tutor, UserData, Calls) {
    let (url, calls) = mock_services(failing_generator).await;

    let config = Config {
        tutorbot_url: url.clone(),
        resources_url: url.clone(),
        documents_url: url,
        youtube_api_key: None,
        ..Default::default()
    };

    let database: SharedDatabase = Arc::new(MemoryDatabase::new());
    let user = database
        .create_user(NewUser {
            email: "ada@example.com".into(),
            name: "Ada".into(),
            image: None,
        })
        .await
        .unwrap();

    (Tutor::new(config, database), user, calls)
}

fn request() -> ClassroomRequest {
    ClassroomRequest {
        name: "Algebra".into(),
        role: Role::Student,
        subject: "Math".into(),
        grade_level: "10".into(),
        textbook_url: None,
        syllabus_url: None,
        study_preferences: StudyPreferences {
            days_per_week: 3,
            hours_per_session: 1.5,
            learning_style: LearningStyle::Visual,
        },
        textbook: None,
    }
}

#[tokio::test]
async fn test_create_classroom_stores_timetable() {
    let (tutor, user, calls) = setup(false).await;

    let created = tutor.classrooms.create(user.id, request()).await.unwrap();

    assert_eq!(calls.timetable.load(Ordering::SeqCst), 1);
    assert_eq!(created.timetable.sessions.len(), 2);
    assert_eq!(created.timetable.sessions[1].activities, vec!["Drill"]);

    let stored = tutor
        .classrooms
        .timetable(user.id, created.classroom.id)
        .await
        .unwrap();

    let weeks = stored.schedule.weeks();
    assert_eq!(weeks[0].week, 1);
    assert_eq!(weeks[0].sessions[0].topic, "Linear equations");
    assert_eq!(stored.schedule.total_hours(), 2.5);

    let schedule = tutor.classrooms.schedule(user.id).await.unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].classroom.id, created.classroom.id);
}

#[tokio::test]
async fn test_create_classroom_links_textbook() {
    let (tutor, user, _) = setup(false).await;

    let mut request = request();
    request.textbook = Some(TextbookLink {
        title: "Algebra I".into(),
        source: "google".into(),
        document_id: "doc-1".into(),
        uri: "/import/textbook/doc-1".into(),
    });

    let created = tutor.classrooms.create(user.id, request).await.unwrap();
    let textbook = tutor
        .classrooms
        .textbook(user.id, created.classroom.id)
        .await
        .unwrap();

    assert_eq!(textbook.document_id, "doc-1");
}

#[tokio::test]
async fn test_failing_generator_keeps_classroom() {
    let (tutor, user, _) = setup(true).await;

    let result = tutor.classrooms.create(user.id, request()).await;

    assert!(matches!(
        result,
        Err(ClassroomError::Service(ServiceError::Status { .. }))
    ));

    let classrooms = tutor.classrooms.list(user.id).await.unwrap();
    assert_eq!(classrooms.len(), 1);

    let timetable = tutor.classrooms.timetable(user.id, classrooms[0].id).await;
    assert!(matches!(timetable, Err(ClassroomError::Db(e)) if e.is_not_found()));
}

#[tokio::test]
async fn test_invalid_preferences_are_rejected() {
    let (tutor, user, calls) = setup(false).await;

    let mut request = request();
    request.study_preferences.days_per_week = 0;

    assert!(matches!(
        tutor.classrooms.create(user.id, request).await,
        Err(ClassroomError::InvalidPreferences)
    ));
    assert_eq!(calls.timetable.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_delete_classroom_removes_timetable() {
    let (tutor, user, _) = setup(false).await;

    let created = tutor.classrooms.create(user.id, request()).await.unwrap();
    let id = created.classroom.id;

    tutor.classrooms.delete(user.id, id).await.unwrap();

    assert!(tutor.database.timetable_by_classroom(id).await.is_err());
    assert!(tutor.classrooms.list(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resources_are_searched_once() {
    let (tutor, user, calls) = setup(false).await;
    let created = tutor.classrooms.create(user.id, request()).await.unwrap();

    let resources = tutor
        .classrooms
        .resources(user.id, created.classroom.id)
        .await
        .unwrap();

    assert_eq!(resources.len(), 2);

    let website = resources.iter().find(|r| r.kind == "website").unwrap();
    assert_eq!(website.title, "Linear equations");
    assert_eq!(website.description, "Study resources for Linear equations");
    assert_eq!(website.thumbnail, None);

    let again = tutor
        .classrooms
        .resources(user.id, created.classroom.id)
        .await
        .unwrap();

    assert_eq!(again, resources);
    assert_eq!(calls.resources.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_youtube_video_details() {
    let (url, _) = mock_services(false).await;

    let youtube = YouTube::new(&reqwest::Client::new(), Some("key".into()))
        .with_api_url(&format!("{url}/youtube/v3/videos"));

    let details = youtube
        .video_details("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        .await
        .unwrap();

    assert_eq!(details.title, "Quadratics in 10 minutes");
    assert_eq!(details.description, "A quick tour...");
    assert_eq!(
        details.thumbnail.as_deref(),
        Some("https://i.ytimg.com/medium.jpg")
    );

    // Not a video link
    assert_eq!(youtube.video_details("https://example.com/linear").await, None);
}

#[tokio::test]
async fn test_notes() {
    let (tutor, user, _) = setup(false).await;
    let classroom = tutor.classrooms.create(user.id, request()).await.unwrap().classroom;

    let note = tutor
        .notes
        .create(user.id, classroom.id, NoteRequest::default())
        .await
        .unwrap();

    assert_eq!(note.name, "Note");
    assert_eq!(note.color, "yellow");

    let updated = tutor
        .notes
        .update(
            user.id,
            classroom.id,
            note.id,
            NoteRequest {
                color: Some("blue".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.color, "blue");
    assert_eq!(updated.name, "Note");

    let fetched = tutor.notes.get(user.id, classroom.id, note.id).await.unwrap();
    assert_eq!(fetched.color, "blue");

    let all = tutor.notes.all(user.id).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].classroom_name, "Algebra");

    // Someone else's classroom is invisible
    assert!(tutor
        .notes
        .list(user.id + 1000, classroom.id)
        .await
        .unwrap_err()
        .is_not_found());

    tutor.notes.delete(user.id, classroom.id, note.id).await.unwrap();
    assert!(tutor.notes.all(user.id).await.unwrap().is_empty());
}
