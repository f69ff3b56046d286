#![cfg(feature = "server")]

use std::collections::VecDeque;
use std::sync::Mutex;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use reqwest::Client;
use serde_json::{json, Value};

use instafy::{
    gemini::{Credentials, MetadataTokenSource},
    models::InlineImage,
    GeminiClient, GeminiConfig, ImageEditor, InstafyError,
};

#[derive(Debug, Clone)]
struct Captured {
    path: String,
    query: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Records every request and answers with the next scripted reply.
#[derive(Default)]
struct FakeUpstream {
    captured: Mutex<Vec<Captured>>,
    replies: Mutex<VecDeque<(u16, String)>>,
}

impl FakeUpstream {
    fn scripted(replies: Vec<(u16, String)>) -> web::Data<Self> {
        web::Data::new(Self {
            captured: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
        })
    }

    fn captured(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }
}

async fn record(req: HttpRequest, body: web::Bytes, state: web::Data<FakeUpstream>) -> HttpResponse {
    let headers = req
        .headers()
        .iter()
        .map(|(key, value)| {
            (
                key.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    state.captured.lock().unwrap().push(Captured {
        path: req.path().to_string(),
        query: req.query_string().to_string(),
        headers,
        body: body.to_vec(),
    });

    let (status, body) = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((500, "no scripted reply".to_string()));
    HttpResponse::build(actix_web::http::StatusCode::from_u16(status).unwrap())
        .content_type("application/json")
        .body(body)
}

async fn spawn_upstream(state: web::Data<FakeUpstream>) -> String {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .default_service(web::to(record))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

fn image_reply(data: &str) -> (u16, String) {
    let body = json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    { "text": "Here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": data } }
                ]
            },
            "finishReason": "STOP"
        }]
    });
    (200, body.to_string())
}

fn api_key_client(base: &str) -> GeminiClient {
    let config = GeminiConfig::new()
        .with_endpoint(format!("{}/v1beta", base))
        .with_model("stub-image-model")
        .with_api_key("test-key");
    GeminiClient::new(config).unwrap()
}

#[actix_web::test]
async fn test_inline_edit_wire_format() {
    let upstream = FakeUpstream::scripted(vec![image_reply("RURJVEVE")]);
    let base = spawn_upstream(upstream.clone()).await;
    let client = api_key_client(&base);

    let images = vec![
        InlineImage::png("QUFB"),
        InlineImage::new("image/jpeg", "QkJC"),
    ];
    let response = client.edit_inline("swap the background", &images).await.unwrap();
    assert_eq!(response.first_inline_image(), Some("RURJVEVE"));

    let captured = upstream.captured();
    assert_eq!(captured.len(), 1);
    let request = &captured[0];
    assert_eq!(
        request.path,
        "/v1beta/models/stub-image-model:generateContent"
    );
    assert_eq!(request.header("x-goog-api-key"), Some("test-key"));
    assert_eq!(request.header("authorization"), None);
    assert_eq!(
        request.json(),
        json!({
            "generationConfig": { "responseModalities": ["IMAGE"] },
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": "swap the background" },
                    { "inlineData": { "mimeType": "image/png", "data": "QUFB" } },
                    { "inlineData": { "mimeType": "image/jpeg", "data": "QkJC" } }
                ]
            }]
        })
    );
}

#[actix_web::test]
async fn test_file_edit_sends_files_as_png_parts_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.png");
    let second = dir.path().join("second.png");
    std::fs::write(&first, b"one").unwrap();
    std::fs::write(&second, b"two").unwrap();

    let upstream = FakeUpstream::scripted(vec![image_reply("T1VU")]);
    let base = spawn_upstream(upstream.clone()).await;
    let client = api_key_client(&base);

    client
        .edit_files("pose it", &[first, second])
        .await
        .unwrap();

    let body = upstream.captured()[0].json();
    let parts = body["contents"][0]["parts"].as_array().unwrap().clone();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[1]["inlineData"]["data"], "b25l");
    assert_eq!(parts[2]["inlineData"]["data"], "dHdv");
}

#[actix_web::test]
async fn test_non_success_status_carries_body() {
    let upstream = FakeUpstream::scripted(vec![(403, "permission denied".to_string())]);
    let base = spawn_upstream(upstream).await;
    let client = api_key_client(&base);

    let err = client
        .edit_inline("x", &[InlineImage::png("QUFB")])
        .await
        .unwrap_err();
    match &err {
        InstafyError::HttpStatus { status, body } => {
            assert_eq!(*status, 403);
            assert_eq!(body, "permission denied");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.to_string(), "HTTP 403: permission denied");
}

#[actix_web::test]
async fn test_unparseable_success_body_is_response_error() {
    let upstream = FakeUpstream::scripted(vec![(200, "<html>".to_string())]);
    let base = spawn_upstream(upstream).await;
    let client = api_key_client(&base);

    let err = client
        .edit_inline("x", &[InlineImage::png("QUFB")])
        .await
        .unwrap_err();
    assert!(matches!(err, InstafyError::ResponseError(_)));
}

#[actix_web::test]
async fn test_metadata_token_is_fetched_once_and_sent_as_bearer() {
    let token_reply = json!({ "access_token": "meta-token", "expires_in": 3600, "token_type": "Bearer" });
    let upstream = FakeUpstream::scripted(vec![
        (200, token_reply.to_string()),
        image_reply("QQ=="),
        image_reply("Qg=="),
    ]);
    let base = spawn_upstream(upstream.clone()).await;

    let http = Client::new();
    let credentials = Credentials::MetadataServer(MetadataTokenSource::with_url(
        http.clone(),
        format!("{}/token", base),
    ));
    let config = GeminiConfig::new()
        .with_endpoint(format!("{}/v1beta", base))
        .with_model("stub-image-model");
    let client = GeminiClient::with_credentials(config, http, credentials);

    client.edit_inline("a", &[InlineImage::png("QUFB")]).await.unwrap();
    client.edit_inline("b", &[InlineImage::png("QUFB")]).await.unwrap();

    let captured = upstream.captured();
    assert_eq!(captured.len(), 3);
    assert_eq!(captured[0].path, "/token");
    assert_eq!(captured[0].header("metadata-flavor"), Some("Google"));
    assert!(captured[0].query.contains("generative-language"));
    for request in &captured[1..] {
        assert_eq!(request.header("authorization"), Some("Bearer meta-token"));
    }
}

#[test]
fn test_no_explicit_credentials_falls_back_to_application_default() {
    let http = Client::new();
    let credentials = Credentials::from_config(&GeminiConfig::new(), http.clone()).unwrap();
    assert_eq!(credentials.kind(), "application-default");
    assert!(GeminiClient::new(GeminiConfig::new()).is_ok());
}
