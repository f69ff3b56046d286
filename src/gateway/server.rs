use std::time::Instant;

use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};
use futures::StreamExt;
use uuid::Uuid;

use super::EditGateway;
use crate::{
    config::{Config, DEFAULT_BODY_LIMIT_MB},
    error::{InstafyError, Result},
    models::{EditResponse, ErrorBody, HealthResponse},
};

pub const EDIT_ROUTE: &str = "/api/gemini-edit";
pub const HEALTH_ROUTE: &str = "/health";

/// Largest accepted edit body in bytes, registered with `App::app_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimit(pub usize);

impl Default for BodyLimit {
    fn default() -> Self {
        BodyLimit(DEFAULT_BODY_LIMIT_MB * 1024 * 1024)
    }
}

/// Registers the gateway routes. The caller provides `web::Data<EditGateway>`
/// and optionally a [`BodyLimit`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(EDIT_ROUTE, web::post().to(gemini_edit))
        .route(HEALTH_ROUTE, web::get().to(health));
}

/// Collects the body, failing as soon as it grows past `limit`.
async fn read_body(mut payload: web::Payload, limit: usize) -> Result<web::BytesMut> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            InstafyError::ValidationError(format!("Could not read request body: {}", e))
        })?;
        if body.len() + chunk.len() > limit {
            return Err(InstafyError::PayloadTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

async fn gemini_edit(
    req: HttpRequest,
    gateway: web::Data<EditGateway>,
    payload: web::Payload,
) -> HttpResponse {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();
    let limit = req.app_data::<BodyLimit>().copied().unwrap_or_default();

    let outcome = match read_body(payload, limit.0).await {
        Ok(body) => {
            log::info!("[req:{}] POST {} ({} bytes)", request_id, EDIT_ROUTE, body.len());
            gateway.handle_json(&body).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(image_base64) => {
            log::info!(
                "[req:{}] 200 in {}ms",
                request_id,
                started.elapsed().as_millis()
            );
            HttpResponse::Ok().json(EditResponse { image_base64 })
        }
        Err(e) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                log::error!(
                    "[req:{}] {} in {}ms: {}",
                    request_id,
                    status.as_u16(),
                    started.elapsed().as_millis(),
                    e
                );
            } else {
                log::warn!("[req:{}] {}: {}", request_id, status.as_u16(), e);
            }
            HttpResponse::build(status).json(ErrorBody {
                error: e.to_string(),
            })
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn run_server(config: &Config, gateway: EditGateway) -> std::io::Result<()> {
    let host = config.host_or_default().to_string();
    let port = config.port_or_default();
    let body_limit = config.body_limit_bytes();
    let gateway = web::Data::new(gateway);

    log::info!("Listening on http://{}:{}{}", host, port, EDIT_ROUTE);

    HttpServer::new(move || {
        App::new()
            .app_data(gateway.clone())
            .app_data(BodyLimit(body_limit))
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
