//! HTTP surface over the standings controller.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use standings_backend::module::controller::{
    RecentNotifications, StandingsController, MSG_EXPORT_FAILED, MSG_PARSE_FAILED,
};
use standings_common::{LabelSet, LayoutVariant, Notification, TeamRecord};

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<StandingsController>>,
    pub notifications: Arc<RecentNotifications>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorBody {
            code,
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct StateView {
    pub labels: LabelSet,
    pub variant: LayoutVariant,
    pub record_count: usize,
    pub can_export: bool,
    pub records: Vec<TeamRecord>,
}

impl StateView {
    fn of(controller: &StandingsController) -> Self {
        Self {
            labels: controller.labels().clone(),
            variant: controller.variant(),
            record_count: controller.records().len(),
            can_export: controller.can_export(),
            records: controller.records().to_vec(),
        }
    }
}

/// Partial label update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct LabelUpdate {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub period_label: Option<String>,
    pub variant: Option<LayoutVariant>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/state", get(get_state))
        .route("/upload", post(upload_csv))
        .route("/labels", post(update_labels))
        .route("/preview.svg", get(preview_svg))
        .route("/export", post(export_image))
        .route("/notifications", get(drain_notifications))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn get_state(State(state): State<AppState>) -> Json<StateView> {
    let controller = state.controller.lock().await;
    Json(StateView::of(&controller))
}

/// Raw CSV body. An empty body means no file was picked.
async fn upload_csv(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    if body.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let mut controller = state.controller.lock().await;
    match controller.load_csv_bytes(&body) {
        Ok(count) => {
            tracing::info!("Uploaded standings with {} teams", count);
            Ok(Json(StateView::of(&controller)).into_response())
        }
        Err(e) => {
            tracing::warn!("Rejected upload: {}", e);
            Err(ApiError::BadRequest(MSG_PARSE_FAILED.to_string()))
        }
    }
}

async fn update_labels(
    State(state): State<AppState>,
    Json(update): Json<LabelUpdate>,
) -> Json<StateView> {
    let mut controller = state.controller.lock().await;

    if let Some(title) = update.title {
        controller.set_title(title);
    }
    if let Some(subtitle) = update.subtitle {
        controller.set_subtitle(subtitle);
    }
    if let Some(period_label) = update.period_label {
        controller.set_label(period_label);
    }
    if let Some(variant) = update.variant {
        controller.set_variant(variant);
    }

    Json(StateView::of(&controller))
}

async fn preview_svg(State(state): State<AppState>) -> impl IntoResponse {
    let card = state.controller.lock().await.render();
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        card.svg,
    )
}

async fn export_image(State(state): State<AppState>) -> Result<Response, ApiError> {
    let controller = state.controller.lock().await;

    match controller.request_export_bytes().await {
        Ok(Some(image)) => Ok((
            [
                (header::CONTENT_TYPE, "image/jpeg".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", image.file_name),
                ),
            ],
            image.bytes,
        )
            .into_response()),
        Ok(None) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => {
            tracing::warn!("Export failed: {}", e);
            Err(ApiError::Internal(MSG_EXPORT_FAILED.to_string()))
        }
    }
}

async fn drain_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.notifications.drain())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use standings_backend::module::export::{Exporter, RasterOptions, Rasterizer};
    use standings_backend::module::renderer::StandingsRenderer;
    use standings_backend::StandingsError;
    use tower::ServiceExt;

    const CSV: &str = "Rank,Team,Total,Place,Kill,Kills,Matches,Wins\n1,Alpha,50,20,30,15,5,2\n2,Beta,abc,10,10,8,5,0\n";

    struct StubRasterizer {
        fail: bool,
    }

    impl Rasterizer for StubRasterizer {
        fn rasterize(&self, _svg: &str, _options: &RasterOptions) -> standings_backend::Result<Vec<u8>> {
            if self.fail {
                Err(StandingsError::Capture("boom".to_string()))
            } else {
                Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
            }
        }
    }

    fn app(fail_export: bool) -> (Router, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let notifications = Arc::new(RecentNotifications::new(32));
        let controller = StandingsController::new(
            StandingsRenderer::default(),
            Exporter::new(
                Arc::new(StubRasterizer { fail: fail_export }),
                RasterOptions::default(),
                dir.path(),
            ),
            notifications.clone(),
            LabelSet::default(),
            LayoutVariant::SingleColumn,
        );
        let state = AppState {
            controller: Arc::new(Mutex::new(controller)),
            notifications,
        };
        (router(state), dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Body) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn json(resp: Response) -> Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let (app, _dir) = app(false);
        let resp = send(&app, "GET", "/", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, "GET", "/health", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_initial_state_uses_default_labels() {
        let (app, _dir) = app(false);
        let state = json(send(&app, "GET", "/state", Body::empty()).await).await;
        assert_eq!(state["labels"]["title"], "TOURNAMENT");
        assert_eq!(state["record_count"], 0);
        assert_eq!(state["can_export"], false);
        assert_eq!(state["variant"], "single");
    }

    #[tokio::test]
    async fn test_upload_then_state_and_notification() {
        let (app, _dir) = app(false);

        let resp = send(&app, "POST", "/upload", Body::from(CSV)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let state = json(resp).await;
        assert_eq!(state["record_count"], 2);
        assert_eq!(state["records"][1]["total_points"], 0);
        assert_eq!(state["can_export"], true);

        let notes = json(send(&app, "GET", "/notifications", Body::empty()).await).await;
        assert_eq!(notes[0]["level"], "success");
        assert_eq!(notes[0]["message"], "CSV file loaded successfully!");

        let again = json(send(&app, "GET", "/notifications", Body::empty()).await).await;
        assert_eq!(again.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_is_noop() {
        let (app, _dir) = app(false);
        let resp = send(&app, "POST", "/upload", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let notes = json(send(&app, "GET", "/notifications", Body::empty()).await).await;
        assert!(notes.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_encoded_upload_is_accepted() {
        let (app, _dir) = app(false);
        send(&app, "POST", "/upload", Body::from(CSV)).await;

        let body = &b"Rank,Team\n1,\xC9quipe,50,20,30,15,5,2\n"[..];
        let resp = send(&app, "POST", "/upload", Body::from(body)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let state = json(resp).await;
        assert_eq!(state["record_count"], 1);
        assert_eq!(state["records"][0]["team_name"], "\u{FFFD}quipe");
        assert_eq!(state["records"][0]["total_points"], 50);
    }

    #[tokio::test]
    async fn test_labels_update_and_preview() {
        let (app, _dir) = app(false);
        let body = r#"{"title":"Grand Finals","period_label":"DAY 3","variant":"two-column"}"#;
        let state = json(send(&app, "POST", "/labels", Body::from(body)).await).await;
        assert_eq!(state["labels"]["title"], "Grand Finals");
        assert_eq!(state["labels"]["subtitle"], "Season 1");
        assert_eq!(state["variant"], "two-column");

        let resp = send(&app, "GET", "/preview.svg", Body::empty()).await;
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let svg = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let svg = String::from_utf8(svg.to_vec()).unwrap();
        assert!(svg.contains("GRAND FINALS"));
        assert!(svg.contains("width=\"1800\""));
    }

    #[tokio::test]
    async fn test_export_without_records_is_noop() {
        let (app, _dir) = app(false);
        let resp = send(&app, "POST", "/export", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_export_returns_jpeg_attachment() {
        let (app, _dir) = app(false);
        send(&app, "POST", "/upload", Body::from(CSV)).await;

        let resp = send(&app, "POST", "/export", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/jpeg");
        let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("filename=\"standings-"));
        assert!(disposition.ends_with(".jpg\""));

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], &[0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[tokio::test]
    async fn test_export_failure_reports_error() {
        let (app, _dir) = app(true);
        send(&app, "POST", "/upload", Body::from(CSV)).await;
        send(&app, "GET", "/notifications", Body::empty()).await;

        let resp = send(&app, "POST", "/export", Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let notes = json(send(&app, "GET", "/notifications", Body::empty()).await).await;
        assert_eq!(notes[0]["level"], "error");
        assert_eq!(notes[0]["message"], "Failed to generate image");
    }
}
