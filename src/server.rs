//! ==============================================================================
//! server.rs - dashboard json api
//! ==============================================================================
//!
//! purpose:
//!     exposes the polling session to the dashboard ui, and the session's
//!     sensor store as the rest surface that `HttpSensorStore` consumes.
//!
//! routes:
//!     dashboard (reads the session):
//!         GET  /api/dashboard                          snapshot + loading + error
//!         POST /api/dashboard/refresh                  out-of-band fetch
//!         GET  /api/dashboard/sensors/:id              reading from the snapshot
//!         GET  /api/dashboard/sensors/:id/history      on-demand history
//!
//!     store (talks to the store directly):
//!         GET  /api/sensors
//!         GET  /api/sensors/:id
//!         GET  /api/sensors/:id/readings?limit=n
//!         PUT  /api/sensors/:id                        {"value": n}
//!
//! errors:
//!     json `{"error": "..."}` with 404 for unknown sensors, 502 when the
//!     store failed, 504 when it timed out.
//!
//! ==============================================================================

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::assessment::{progress_percent, tank_fill_percent, PhBalance, SoilMoistureLevel};
use crate::domain::{SensorHistoryEntry, SensorId, SensorReading, SensorSnapshot};
use crate::error::StoreError;
use crate::session::{FetchOutcome, PollingSession, SessionView};
use crate::store::DEFAULT_HISTORY_LIMIT;

type AppState = Arc<PollingSession>;

// ==============================================================================
// router
// ==============================================================================

pub fn router(session: Arc<PollingSession>) -> Router {
    Router::new()
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/dashboard/refresh", post(refresh_handler))
        .route("/api/dashboard/sensors/:id", get(snapshot_sensor_handler))
        .route("/api/dashboard/sensors/:id/history", get(session_history_handler))
        .route("/api/sensors", get(all_readings_handler))
        .route(
            "/api/sensors/:id",
            get(reading_handler).put(update_handler),
        )
        .route("/api/sensors/:id/readings", get(store_history_handler))
        .layer(CorsLayer::permissive())
        .with_state(session)
}

/// serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, session: Arc<PollingSession>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(session))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ==============================================================================
// errors
// ==============================================================================

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Transport(_) => StatusCode::BAD_GATEWAY,
            StoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

// ==============================================================================
// dashboard
// ==============================================================================

/// values behind the progress bars and help texts of the dashboard cards
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicators {
    pub temperature_progress: Option<f64>,
    pub humidity_progress: Option<f64>,
    pub soil_moisture: Option<SoilMoistureLevel>,
    pub soil_moisture_label: Option<&'static str>,
    #[serde(rename = "waterPH")]
    pub water_ph: Option<PhBalance>,
    #[serde(rename = "waterPHLabel")]
    pub water_ph_label: Option<&'static str>,
    pub tank_fill_percent: Option<f64>,
}

impl Indicators {
    pub fn from_snapshot(snapshot: &SensorSnapshot) -> Self {
        let soil_moisture = snapshot
            .soil_humidity
            .as_ref()
            .map(|r| SoilMoistureLevel::classify(r.value));
        let water_ph = snapshot.water_ph.as_ref().map(|r| PhBalance::classify(r.value));
        Self {
            temperature_progress: snapshot.environment.temperature.as_ref().map(progress_percent),
            humidity_progress: snapshot.environment.humidity.as_ref().map(progress_percent),
            soil_moisture,
            soil_moisture_label: soil_moisture.map(|level| level.label()),
            water_ph,
            water_ph_label: water_ph.map(|balance| balance.label()),
            tank_fill_percent: snapshot.water_level.as_ref().map(tank_fill_percent),
        }
    }
}

#[derive(Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub view: SessionView,
    pub indicators: Indicators,
}

async fn dashboard_handler(State(session): State<AppState>) -> Json<DashboardResponse> {
    let view = session.view();
    let indicators = Indicators::from_snapshot(&view.snapshot);
    Json(DashboardResponse { view, indicators })
}

#[derive(Serialize)]
struct RefreshResponse {
    outcome: FetchOutcome,
}

async fn refresh_handler(State(session): State<AppState>) -> Json<RefreshResponse> {
    Json(RefreshResponse {
        outcome: session.refresh_now().await,
    })
}

async fn snapshot_sensor_handler(
    State(session): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SensorReading>, ApiError> {
    let sensor: SensorId = id.parse()?;
    session
        .snapshot()
        .get(sensor)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Sensor {sensor} has no reading yet")))
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn session_history_handler(
    State(session): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SensorHistoryEntry>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(session.history(&id, limit).await?))
}

// ==============================================================================
// store
// ==============================================================================

async fn all_readings_handler(
    State(session): State<AppState>,
) -> Result<Json<Vec<SensorReading>>, ApiError> {
    Ok(Json(session.store().all_readings().await?))
}

async fn reading_handler(
    State(session): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SensorReading>, ApiError> {
    Ok(Json(session.store().reading(&id).await?))
}

async fn store_history_handler(
    State(session): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SensorHistoryEntry>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(session.store().history(&id, limit).await?))
}

#[derive(Deserialize)]
struct UpdateBody {
    value: f64,
}

async fn update_handler(
    State(session): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<SensorReading>, ApiError> {
    let reading = session.store().update_sensor_value(&id, body.value).await?;
    tracing::info!(sensor = %reading.sensor_id, value = reading.value, "sensor value set via api");
    Ok(Json(reading))
}
