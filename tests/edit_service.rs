#![cfg(feature = "server")]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use actix_web::{web, App, HttpResponse, HttpServer};
use async_trait::async_trait;

use instafy::{
    gateway::{server, EditGateway},
    models::{encode_base64, EditRequest, GenerateContentResponse, ImagePayload, InlineImage},
    pipeline::{COMPOSITE_PROMPT, EDIT_FALLBACK_ERROR},
    BackgroundRemover, EditService, HttpEditService, ImageEditor, InstafyError, Pipeline,
    PipelineState, Result,
};

/// Decodes the uploaded files and answers with their concatenation, so the
/// caller can tell which images arrived and in what order.
#[derive(Default)]
struct ConcatEditor {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageEditor for ConcatEditor {
    async fn edit_inline(
        &self,
        prompt: &str,
        _images: &[InlineImage],
    ) -> Result<GenerateContentResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(GenerateContentResponse::default())
    }

    async fn edit_files(
        &self,
        prompt: &str,
        paths: &[PathBuf],
    ) -> Result<GenerateContentResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut joined = Vec::new();
        for path in paths {
            joined.extend(tokio::fs::read(path).await?);
            joined.push(b'|');
        }
        Ok(GenerateContentResponse::with_image(
            encode_base64(&joined),
            "image/png",
        ))
    }
}

struct SuffixRemover;

#[async_trait]
impl BackgroundRemover for SuffixRemover {
    fn name(&self) -> &'static str {
        "suffix"
    }

    async fn remove_background(&self, image: &ImagePayload) -> Result<ImagePayload> {
        let mut bytes = image.bytes().to_vec();
        bytes.extend_from_slice(b"-cut");
        ImagePayload::png(bytes)
    }
}

async fn spawn_gateway(gateway: EditGateway) -> String {
    let gateway = web::Data::new(gateway);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(gateway.clone())
            .configure(server::configure)
            .route("/broken", web::post().to(|| async { HttpResponse::BadGateway().body("upstream down") }))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

#[actix_web::test]
async fn test_http_service_reads_success_reply() {
    let dir = tempfile::tempdir().unwrap();
    let editor = Arc::new(ConcatEditor::default());
    let base = spawn_gateway(EditGateway::new(editor.clone()).with_temp_dir(dir.path())).await;
    let service = HttpEditService::new(format!("{}{}", base, server::EDIT_ROUTE));

    let reply = service
        .submit(EditRequest::base64("pose", vec![encode_base64(b"abc")]))
        .await
        .unwrap();
    assert!(reply.success);
    assert_eq!(reply.into_image("fallback").unwrap(), encode_base64(b"abc|"));
    assert_eq!(*editor.prompts.lock().unwrap(), vec!["pose".to_string()]);
}

#[actix_web::test]
async fn test_http_service_surfaces_gateway_error_text() {
    let editor = Arc::new(ConcatEditor::default());
    let base = spawn_gateway(EditGateway::new(editor.clone())).await;
    let service = HttpEditService::new(format!("{}{}", base, server::EDIT_ROUTE));

    let reply = service
        .submit(EditRequest::base64("", vec![encode_base64(b"abc")]))
        .await
        .unwrap();
    assert!(!reply.success);
    assert_eq!(
        reply.into_image(EDIT_FALLBACK_ERROR).unwrap_err().to_string(),
        "Missing prompt"
    );
    assert!(editor.prompts.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn test_http_service_rejects_non_json_reply() {
    let base = spawn_gateway(EditGateway::new(Arc::new(ConcatEditor::default()))).await;
    let service = HttpEditService::new(format!("{}/broken", base));

    let err = service
        .submit(EditRequest::base64("x", vec![encode_base64(b"abc")]))
        .await
        .unwrap_err();
    assert!(matches!(err, InstafyError::ResponseError(_)));
}

#[actix_web::test]
async fn test_pipeline_over_http_sends_edited_then_original() {
    let dir = tempfile::tempdir().unwrap();
    let editor = Arc::new(ConcatEditor::default());
    let base = spawn_gateway(EditGateway::new(editor.clone()).with_temp_dir(dir.path())).await;
    let service = Arc::new(HttpEditService::new(format!("{}{}", base, server::EDIT_ROUTE)));

    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = states.clone();
    let mut pipeline = Pipeline::new(Arc::new(SuffixRemover), service)
        .with_observer(move |state: &PipelineState| sink.lock().unwrap().push(state.clone()));
    pipeline.select_image(ImagePayload::new(b"photo".to_vec(), "image/jpeg").unwrap());
    pipeline.select_pose("pose3").unwrap();

    let artifacts = pipeline.run().await.unwrap().clone();
    assert_eq!(artifacts.background_removed.unwrap().bytes(), b"photo-cut");
    assert_eq!(artifacts.instafied.unwrap().bytes(), b"photo-cut|");
    assert_eq!(artifacts.composite.unwrap().bytes(), b"photo-cut||photo|");
    assert_eq!(pipeline.state(), &PipelineState::CompositeDone);
    assert_eq!(states.lock().unwrap().len(), 7);

    let prompts = editor.prompts.lock().unwrap();
    assert!(prompts[0].contains("Pose Selected: pose3"));
    assert_eq!(prompts[1], COMPOSITE_PROMPT);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[actix_web::test]
async fn test_in_process_gateway_reports_failures_as_replies() {
    let gateway = EditGateway::new(Arc::new(ConcatEditor::default()));

    let reply = gateway
        .submit(EditRequest::inline("x", vec![InlineImage::png("QUFB")]))
        .await
        .unwrap();
    assert!(!reply.success);
    assert_eq!(reply.error.as_deref(), Some("No image returned from Gemini"));
}
