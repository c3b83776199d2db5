use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::Multipart,
    http::{header, Method, Request, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use tutor_classroom::{Database, MemoryDatabase, NewSession, NewUser, SharedDatabase, Tutor};
use tutor_core::Config;
use tutor_server::router;

const TOKEN: &str = "0123456789abcdef0123456789abcdef";

async fn generate_timetable() -> Json<Value> {
    Json(json!({
        "timetable": [
            { "week": 1, "day": 1, "durationHours": 1.5, "topic": "Linear equations" },
            { "week": 1, "day": 3, "durationHours": 1.5, "topic": "Inequalities" }
        ]
    }))
}

/// Answers with the names of the form fields it received
async fn echo_chat(mut multipart: Multipart) -> Json<Value> {
    let mut names = vec![];

    while let Some(field) = multipart.next_field().await.unwrap() {
        names.push(field.name().unwrap().to_string());
    }

    Json(json!({ "response": names.join(",") }))
}

async fn rag() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        "data: first\n\ndata: second\n\n",
    )
}

/// Serves stand-ins for the tutorbot and RAG services on an ephemeral port
async fn mock_generator() -> String {
    let app = Router::new()
        .route("/api/generate-timetable", post(generate_timetable))
        .route("/chat", post(echo_chat))
        .route("/rag", post(rag));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

async fn app() -> Router {
    let url = mock_generator().await;

    let config = Config {
        tutorbot_url: url.clone(),
        resources_url: url.clone(),
        rag_url: format!("{url}/rag"),
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

    database
        .create_session(NewSession {
            token: TOKEN.into(),
            user_id: user.id,
            expires_at: Utc::now() + Duration::days(1),
        })
        .await
        .unwrap();

    router(Arc::new(Tutor::new(config, database)))
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body)
}

fn new_classroom() -> Value {
    json!({
        "name": "Algebra",
        "role": "student",
        "subject": "Math",
        "gradeLevel": "10",
        "studyPreferences": {
            "daysPerWeek": 2,
            "hoursPerSession": 1.5,
            "learningStyle": "step-by-step"
        }
    })
}

async fn create_classroom(app: &Router) -> i64 {
    let (status, body) = send(
        app,
        request(Method::POST, "/v1/classrooms", Some(new_classroom())),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    body["classroomId"].as_i64().unwrap()
}

#[tokio::test]
async fn test_missing_session_is_unauthorized() {
    let app = app().await;

    let request = Request::builder()
        .uri("/v1/classrooms")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .uri("/v1/classrooms")
        .header(header::AUTHORIZATION, "Bearer not-a-session")
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_query_parameter() {
    let app = app().await;

    let request = Request::builder()
        .uri(format!("/v1/profile?token={TOKEN}"))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
}

#[tokio::test]
async fn test_create_classroom_returns_id() {
    let app = app().await;
    let id = create_classroom(&app).await;

    let (status, body) = send(&app, request(Method::GET, &format!("/v1/classrooms/{id}"), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Algebra");
    assert_eq!(body["studyPreferences"]["learningStyle"], "step-by-step");

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/v1/classrooms/{id}/timetable"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalHours"], 3.0);
    assert_eq!(body["weeks"][0]["sessions"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, request(Method::GET, "/v1/schedule", None)).await;
    assert_eq!(body[0]["classroom"]["id"], id);
}

#[tokio::test]
async fn test_note_color_update_persists() {
    let app = app().await;
    let id = create_classroom(&app).await;
    let notes = format!("/v1/classrooms/{id}/notes");

    let (status, note) = send(&app, request(Method::POST, &notes, Some(json!({})))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["color"], "yellow");

    let note_uri = format!("{notes}/{}", note["id"]);

    let (status, updated) = send(
        &app,
        request(Method::PATCH, &note_uri, Some(json!({ "color": "green" }))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["color"], "green");
    assert_eq!(updated["name"], "Note");

    let (_, fetched) = send(&app, request(Method::GET, &note_uri, None)).await;
    assert_eq!(fetched["color"], "green");

    let (_, all) = send(&app, request(Method::GET, "/v1/notes", None)).await;
    assert_eq!(all[0]["classroomName"], "Algebra");
    assert_eq!(all[0]["notes"][0]["color"], "green");
}

#[tokio::test]
async fn test_delete_classroom_removes_timetable() {
    let app = app().await;
    let id = create_classroom(&app).await;

    let (status, _) = send(&app, request(Method::DELETE, &format!("/v1/classrooms/{id}"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/v1/classrooms/{id}/timetable"), None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (_, classrooms) = send(&app, request(Method::GET, "/v1/classrooms", None)).await;
    assert_eq!(classrooms, json!([]));
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    let app = app().await;

    let mut body = new_classroom();
    body["studyPreferences"]["daysPerWeek"] = json!(12);

    let (status, response) = send(&app, request(Method::POST, "/v1/classrooms", Some(body))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].is_string());

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/v1/classrooms")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let (status, _) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = create_classroom(&app).await;
    let (status, _) = send(
        &app,
        request(
            Method::PUT,
            &format!("/v1/classrooms/{id}/timetable"),
            Some(json!({ "timetable": [] })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_docs_are_public() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Request::builder().uri("/v1/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(
        &app,
        Request::builder().uri("/api.json").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/classrooms"].is_object());
}

#[tokio::test]
async fn test_chat_drops_empty_upload() {
    let app = app().await;

    let body = "--XBOUNDARY\r\n\
        Content-Disposition: form-data; name=\"query\"\r\n\r\n\
        What is a prime?\r\n\
        --XBOUNDARY\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n\
        \r\n\
        --XBOUNDARY--\r\n";

    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/chat")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
        .body(Body::from(body))
        .unwrap();

    let (status, answer) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["response"], "query,subject,level,lang");
}

#[tokio::test]
async fn test_rag_answer_is_relayed_as_events() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/v1/rag/query",
            Some(json!({ "question": "What is a prime?", "chapterId": "ch-1" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert_eq!(text, "data: first\n\ndata: second\n\n");
}

#[tokio::test]
async fn test_import_without_reference_is_rejected() {
    let app = app().await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/v1/documents/import",
            Some(json!({ "candidateId": "c1", "title": "Algebra", "source": "google" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
