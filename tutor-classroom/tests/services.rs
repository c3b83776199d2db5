use axum::{
    extract::{Multipart, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tutor_classroom::{
    ChatFile, ChatMessage, DocumentService, ImportProgress, ImportRequest, RagService,
    ServiceError, Tutorbot,
};

async fn search(Query(query): Query<Map<String, Value>>) -> Json<Value> {
    assert_eq!(query["q"], "algebra");

    Json(json!([
        { "candidate_id": "c1", "title": "Algebra I", "source": "google", "ref": { "id": "g1" } },
        { "candidate_id": "c2", "title": null, "source": "archive", "ref": { "identifier": "a2" } }
    ]))
}

async fn refuse_import() -> StatusCode {
    StatusCode::FORBIDDEN
}

/// Answers with every form field it received, files described by name, type and size
async fn echo_chat(mut multipart: Multipart) -> Json<Value> {
    let mut fields = Map::new();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap().to_string();

        let value = match field.file_name().map(|f| f.to_string()) {
            Some(file_name) => {
                let content_type = field.content_type().map(|c| c.to_string());
                let size = field.bytes().await.unwrap().len();

                json!({ "fileName": file_name, "contentType": content_type, "size": size })
            }
            None => json!(field.text().await.unwrap()),
        };

        fields.insert(name, value);
    }

    Json(json!({ "response": Value::Object(fields).to_string() }))
}

async fn rag(Json(body): Json<Value>) -> impl IntoResponse {
    assert_eq!(body["chapterId"], "ch-3");

    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        "data: {\"answer\": \"Factor it\"}\n\n: keep-alive\n\ndata: [DONE]\n\n",
    )
}

/// Serves a stand-in for the document, chat and RAG services on an ephemeral port
async fn mock_services() -> String {
    let app = Router::new()
        .route("/search", get(search))
        .route("/import", post(refuse_import))
        .route("/chat", post(echo_chat))
        .route("/rag", post(rag));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

/// Accepts one import status socket, sends `message` if given and closes
async fn import_socket(message: Option<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

        if let Some(text) = message {
            socket.send(Message::Text(text.to_string())).await.unwrap();
        }

        let _ = socket.close(None).await;
    });

    format!("ws://{addr}")
}

#[tokio::test]
async fn test_search_keeps_untitled_candidates() {
    let url = mock_services().await;
    let documents = DocumentService::new(&reqwest::Client::new(), &url, "ws://unused");

    let candidates = documents.search("algebra").await.unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].title.as_deref(), Some("Algebra I"));
    assert_eq!(candidates[1].title, None);
}

#[tokio::test]
async fn test_refused_import_is_not_permitted() {
    let url = mock_services().await;
    let documents = DocumentService::new(&reqwest::Client::new(), &url, "ws://unused");

    let result = documents
        .import(&ImportRequest {
            candidate_id: "c2".into(),
            title: String::new(),
            source: "archive".into(),
            reference: json!({ "identifier": "a2" }),
        })
        .await;

    assert!(matches!(result, Err(ServiceError::DownloadNotPermitted)));
}

#[tokio::test]
async fn test_import_ready() {
    let ws_url = import_socket(Some(
        r#"{ "status": "READY", "id": "d1", "documentId": "d1", "uri": "/import/textbook/d1" }"#,
    ))
    .await;

    let documents = DocumentService::new(&reqwest::Client::new(), "http://unused", &ws_url);
    let progress = documents.await_import("d1").await.unwrap();

    assert_eq!(
        progress,
        ImportProgress::Ready {
            id: "d1".into(),
            title: None,
            source: None,
            document_id: "d1".into(),
            uri: "/import/textbook/d1".into(),
        }
    );
}

#[tokio::test]
async fn test_silent_import_socket_is_an_error() {
    let ws_url = import_socket(None).await;

    let documents = DocumentService::new(&reqwest::Client::new(), "http://unused", &ws_url);
    let progress = documents.await_import("d1").await.unwrap();

    assert_eq!(progress, ImportProgress::Error);
}

#[tokio::test]
async fn test_chat_sends_form_fields() {
    let url = mock_services().await;
    let tutorbot = Tutorbot::new(&reqwest::Client::new(), &url);

    let answer = tutorbot
        .chat(ChatMessage {
            query: "How do I solve x² = 4?".into(),
            subject: Some("Math".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let fields: Value = serde_json::from_str(&answer).unwrap();

    assert_eq!(fields["query"], "How do I solve x² = 4?");
    assert_eq!(fields["subject"], "Math");
    assert_eq!(fields["level"], "");
    assert_eq!(fields["lang"], "EN");
    assert!(fields.get("file").is_none());

    let answer = tutorbot
        .chat(ChatMessage {
            query: "What is on this page?".into(),
            lang: Some("VI".into()),
            file: Some(ChatFile {
                name: "page.txt".into(),
                content_type: Some("text/plain".into()),
                bytes: b"x + 1 = 2".to_vec(),
            }),
            ..Default::default()
        })
        .await
        .unwrap();

    let fields: Value = serde_json::from_str(&answer).unwrap();

    assert_eq!(fields["lang"], "VI");
    assert_eq!(fields["file"]["fileName"], "page.txt");
    assert_eq!(fields["file"]["contentType"], "text/plain");
    assert_eq!(fields["file"]["size"], 9);
}

#[tokio::test]
async fn test_rag_answer_is_streamed() {
    let url = mock_services().await;
    let rag = RagService::new(&reqwest::Client::new(), &format!("{url}/rag"));

    let events: Vec<String> = rag
        .query("How do I solve it?", "ch-3")
        .await
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(events, vec![r#"{"answer": "Factor it"}"#, "[DONE]"]);
}
