use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use zonewatch::alert::{dispatch_alerts, AlertConfig};
use zonewatch::common::invocation_file_name;
use zonewatch::compose::encode_png;
use zonewatch::detect::DetectionOverrides;
use zonewatch::mask::{active_pixels, decode_mask};
use zonewatch::{ChangeDetector, DetectionConfig, DetectionError, DetectionSummary};

use crate::database::ZoneMaskCache;

pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            message: Some(message),
        }
    }
}

/// Shared, read-only server configuration. Nothing here changes between
/// requests.
#[derive(Clone, Debug)]
pub struct AppState {
    pub defaults: DetectionConfig,
    pub cache: Option<ZoneMaskCache>,
    pub alerts: AlertConfig,
    pub artifact_dir: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            defaults: DetectionConfig::default(),
            cache: None,
            alerts: AlertConfig::default(),
            artifact_dir: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug)]
pub enum ServiceError {
    BadRequest(String),
    NotFound(String),
    Detection(DetectionError),
    Internal(anyhow::Error),
}

impl From<DetectionError> for ServiceError {
    fn from(err: DetectionError) -> Self {
        ServiceError::Detection(err)
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Internal(err)
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServiceError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ServiceError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ServiceError::Detection(err @ DetectionError::EmptyZone) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            ServiceError::Detection(err) if err.is_caller_error() => (StatusCode::BAD_REQUEST, err.to_string()),
            ServiceError::Detection(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ServiceError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err)),
        };
        if status.is_server_error() {
            log::error!("{}", message);
        } else {
            log::warn!("{}", message);
        }
        (status, Json(ApiResponse::error(message))).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    let limit = state.max_body_bytes;
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route("/health", get(|| async { "healthy" }))
        .route("/detect", post(detect))
        .route("/zones/:zone_id/mask", post(create_zone_mask))
        .route("/zones/:zone_id", delete(delete_zone_mask))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .with_state(Arc::new(state))
}

/// Accepts plain base64 or a `data:image/...;base64,` URL.
fn decode_base64_image(field: &str, data: &str) -> Result<Vec<u8>, ServiceError> {
    let payload = match data.split_once(',') {
        Some((_, part)) => part,
        None => data,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ServiceError::BadRequest(format!("Failed to decode base64 {}: {}", field, e)))
}

#[derive(Deserialize)]
pub struct DetectRequest {
    pub base_image: String,
    pub test_image: String,
    #[serde(default)]
    pub options: DetectionOverrides,
    /// Use the cached mask of this zone instead of generating one.
    pub zone_id: Option<String>,
    /// Explicit zone mask image, base64.
    pub mask_image: Option<String>,
    #[serde(default)]
    pub notify: bool,
}

#[derive(Serialize)]
pub struct AlertOutcome {
    pub channel: String,
    pub delivered: bool,
    pub detail: String,
}

#[derive(Serialize)]
pub struct DetectResponse {
    pub result: DetectionSummary,
    pub display_percentage: String,
    pub artifact: String,
    pub artifact_path: Option<String>,
    pub alerts: Vec<AlertOutcome>,
}

async fn detect(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DetectRequest>,
) -> Result<Json<ApiResponse<DetectResponse>>, ServiceError> {
    log::info!("Processing detection request");
    let response = tokio::task::spawn_blocking(move || run_detection(&state, payload))
        .await
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Detection task failed: {}", e)))??;
    Ok(Json(ApiResponse::ok(response)))
}

fn run_detection(state: &AppState, payload: DetectRequest) -> Result<DetectResponse, ServiceError> {
    let config = payload.options.apply(&state.defaults)?;
    let detector = ChangeDetector::new(config)?;

    let base = decode_base64_image("base_image", &payload.base_image)?;
    let test = decode_base64_image("test_image", &payload.test_image)?;

    let zone = match (&payload.zone_id, &payload.mask_image) {
        (Some(zone_id), _) => {
            let cache = state
                .cache
                .as_ref()
                .ok_or_else(|| ServiceError::BadRequest("Mask cache is not enabled".to_string()))?;
            let mask = cache
                .load(zone_id)?
                .ok_or_else(|| ServiceError::NotFound(format!("No cached mask for zone {}", zone_id)))?;
            Some(mask)
        }
        (None, Some(mask)) => Some(decode_mask(&decode_base64_image("mask_image", mask)?)?),
        (None, None) => None,
    };

    let result = detector.detect_bytes(&base, &test, zone.as_ref())?;

    let artifact_path = match &state.artifact_dir {
        Some(dir) => {
            let path = dir.join(invocation_file_name("detection", "png"));
            std::fs::write(&path, &result.artifact.bytes)
                .map_err(|e| anyhow::anyhow!("Failed to write artifact to {}: {}", path.display(), e))?;
            log::info!("Saved artifact to {}", path.display());
            Some(path.display().to_string())
        }
        None => None,
    };

    let alerts = if payload.notify {
        let triggers = state.alerts.triggers();
        let outcomes = dispatch_alerts(&result, &triggers);
        triggers
            .iter()
            .zip(outcomes)
            .map(|((trigger, _), outcome)| match outcome {
                Ok(ack) => AlertOutcome {
                    channel: ack.channel,
                    delivered: true,
                    detail: ack.delivered_at,
                },
                Err(e) => AlertOutcome {
                    channel: trigger.channel().to_string(),
                    delivered: false,
                    detail: e.to_string(),
                },
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(DetectResponse {
        display_percentage: result.display_percentage(),
        artifact: result.artifact.to_data_url(),
        result: result.summary(),
        artifact_path,
        alerts,
    })
}

#[derive(Deserialize)]
pub struct ZoneMaskRequest {
    pub base_image: String,
    #[serde(default)]
    pub options: DetectionOverrides,
}

#[derive(Serialize)]
pub struct ZoneMaskResponse {
    pub zone_id: String,
    pub width: u32,
    pub height: u32,
    pub zone_pixels: u64,
    pub strategy: String,
    pub mask: String,
}

async fn create_zone_mask(
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
    Json(payload): Json<ZoneMaskRequest>,
) -> Result<Json<ApiResponse<ZoneMaskResponse>>, ServiceError> {
    log::info!("Generating mask for zone {}", zone_id);
    let response = tokio::task::spawn_blocking(move || -> Result<ZoneMaskResponse, ServiceError> {
        let cache = state
            .cache
            .as_ref()
            .ok_or_else(|| ServiceError::BadRequest("Mask cache is not enabled".to_string()))?;
        let config = payload.options.apply(&state.defaults)?;
        let detector = ChangeDetector::new(config)?;
        let base = decode_base64_image("base_image", &payload.base_image)?;
        let mask = detector.generate_mask_bytes(&base)?;
        let info = cache.store(&zone_id, &mask, &detector.config().mask_strategy.to_string())?;
        let encoded = encode_png(&image::DynamicImage::ImageLuma8(mask.clone()))?;
        Ok(ZoneMaskResponse {
            zone_id: info.zone_id,
            width: info.width,
            height: info.height,
            zone_pixels: active_pixels(&mask),
            strategy: info.strategy,
            mask: encoded.to_data_url(),
        })
    })
    .await
    .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Mask task failed: {}", e)))??;
    Ok(Json(ApiResponse::ok(response)))
}

async fn delete_zone_mask(
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Result<Json<ApiResponse<String>>, ServiceError> {
    let cache = state
        .cache
        .as_ref()
        .ok_or_else(|| ServiceError::BadRequest("Mask cache is not enabled".to_string()))?;
    if cache.remove(&zone_id)? {
        Ok(Json(ApiResponse::ok(zone_id)))
    } else {
        Err(ServiceError::NotFound(format!("No cached mask for zone {}", zone_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_accepts_data_urls() {
        let plain = decode_base64_image("x", "AQID").unwrap();
        let url = decode_base64_image("x", "data:image/png;base64,AQID").unwrap();
        assert_eq!(plain, vec![1, 2, 3]);
        assert_eq!(url, plain);
    }

    #[test]
    fn test_decode_base64_rejects_garbage() {
        assert!(matches!(
            decode_base64_image("x", "not base64!!"),
            Err(ServiceError::BadRequest(_))
        ));
    }
}
