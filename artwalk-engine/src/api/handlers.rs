//! HTTP API handlers
//!
//! Thin translation layer between HTTP and the engine. Contract errors map
//! to 4xx responses; the handlers hold no state of their own.

use crate::api::server::AppContext;
use crate::db;
use crate::error::Error;
use crate::experience::PointerSample;
use crate::render::SurfacePoint;
use crate::scan::LumaFrame;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
}

type HandlerError = (StatusCode, Json<StatusResponse>);

fn error_response(code: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        code,
        Json(StatusResponse {
            status: "error",
            message: message.into(),
        }),
    )
}

fn map_engine_error(e: Error) -> HandlerError {
    match e {
        Error::UnknownCode(_) | Error::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Error::InvalidState(_) | Error::InvalidTransition(_) => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "artwalk-engine",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---- Experience state ----------------------------------------------------

pub async fn get_state(State(ctx): State<AppContext>) -> Json<crate::experience::EngineSnapshot> {
    Json(ctx.engine.snapshot())
}

#[derive(Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub number: String,
    pub display_name: String,
    pub artist_name: String,
    pub clue_text: String,
    pub is_bonus: bool,
    pub viewed: bool,
}

pub async fn get_catalog(State(ctx): State<AppContext>) -> Json<Vec<CatalogEntry>> {
    let viewed = ctx.progress.viewed_ids().await;
    let entries = ctx
        .catalog
        .iter()
        .map(|r| CatalogEntry {
            id: r.id.clone(),
            number: r.number_label(),
            display_name: r.display_name.clone(),
            artist_name: r.artist_name.clone(),
            clue_text: r.clue_text.clone(),
            is_bonus: r.is_bonus(),
            viewed: viewed.iter().any(|id| *id == r.id),
        })
        .collect();
    Json(entries)
}

#[derive(Serialize)]
pub struct ProgressResponse {
    pub viewed: Vec<String>,
    pub viewed_count: usize,
    pub total_count: usize,
    pub complete: bool,
    pub submission_limit_reached: bool,
}

pub async fn get_progress(State(ctx): State<AppContext>) -> Json<ProgressResponse> {
    let viewed = ctx.progress.viewed_ids().await;
    let viewed_count = viewed
        .iter()
        .filter(|id| ctx.catalog.get(id).map(|r| !r.is_bonus()).unwrap_or(false))
        .count();

    Json(ProgressResponse {
        viewed,
        viewed_count,
        total_count: ctx.catalog.non_bonus_count(),
        complete: ctx.progress.is_complete().await,
        submission_limit_reached: ctx.state.submission_limit_reached(),
    })
}

// ---- Artwork control -----------------------------------------------------

#[derive(Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

pub async fn apply_code(
    State(ctx): State<AppContext>,
    Json(req): Json<CodeRequest>,
) -> Result<StatusCode, HandlerError> {
    ctx.engine.apply_code(&req.code).map_err(|e| {
        warn!("code rejected: {}", e);
        map_engine_error(e)
    })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn place_artwork(
    State(ctx): State<AppContext>,
    Path(artwork_id): Path<String>,
) -> Result<StatusCode, HandlerError> {
    ctx.engine
        .place_artwork(&artwork_id)
        .map_err(map_engine_error)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
pub struct PointRequest {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Deserialize, Default)]
pub struct CommitRequest {
    /// Absent: place at the current reticle position
    pub point: Option<PointRequest>,
}

pub async fn commit_placement(
    State(ctx): State<AppContext>,
    Json(req): Json<CommitRequest>,
) -> Result<StatusCode, HandlerError> {
    let point = req.point.map(|p| SurfacePoint::new(p.x, p.y, p.z));
    ctx.engine
        .commit_placement(point)
        .map_err(map_engine_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn reposition(State(ctx): State<AppContext>) -> Result<StatusCode, HandlerError> {
    ctx.engine.request_reposition().map_err(map_engine_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn clear_artwork(State(ctx): State<AppContext>) -> Result<StatusCode, HandlerError> {
    ctx.engine.clear_artwork().map_err(map_engine_error)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PointerRequest {
    Down { id: u32, x: f32, y: f32 },
    Move { id: u32, x: f32, y: f32 },
    Up { id: u32 },
}

pub async fn pointer(
    State(ctx): State<AppContext>,
    Json(req): Json<PointerRequest>,
) -> Result<StatusCode, HandlerError> {
    let sample = match req {
        PointerRequest::Down { id, x, y } => PointerSample::Down { id, x, y },
        PointerRequest::Move { id, x, y } => PointerSample::Move { id, x, y },
        PointerRequest::Up { id } => PointerSample::Up { id },
    };
    ctx.engine.pointer(sample).map_err(map_engine_error)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

pub async fn set_visibility(
    State(ctx): State<AppContext>,
    Json(req): Json<VisibilityRequest>,
) -> Result<StatusCode, HandlerError> {
    ctx.engine
        .set_visibility(req.visible)
        .map_err(map_engine_error)?;
    Ok(StatusCode::ACCEPTED)
}

// ---- QR frame ingestion --------------------------------------------------

#[derive(Deserialize)]
pub struct FrameParams {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize)]
pub struct FrameResponse {
    /// True when a decode was dispatched; false when the frame was dropped
    pub dispatched: bool,
}

pub async fn scan_frame(
    State(ctx): State<AppContext>,
    Query(params): Query<FrameParams>,
    body: Bytes,
) -> Result<Json<FrameResponse>, HandlerError> {
    let expected = params.width as usize * params.height as usize;
    if body.len() != expected {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("expected {} luma bytes, got {}", expected, body.len()),
        ));
    }

    let dispatched = ctx.ingest.offer_frame(LumaFrame {
        width: params.width,
        height: params.height,
        data: body.to_vec(),
    });
    Ok(Json(FrameResponse { dispatched }))
}

// ---- Recording -----------------------------------------------------------

pub async fn start_recording(State(ctx): State<AppContext>) -> Result<StatusCode, HandlerError> {
    ctx.engine.start_recording().map_err(map_engine_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn stop_recording(State(ctx): State<AppContext>) -> Result<StatusCode, HandlerError> {
    ctx.engine.stop_recording().map_err(map_engine_error)?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn clear_recording(State(ctx): State<AppContext>) -> StatusCode {
    ctx.engine.clear_recording();
    StatusCode::OK
}

#[derive(Deserialize)]
pub struct DownloadRequest {
    pub filename: String,
}

pub async fn download_recording(
    State(ctx): State<AppContext>,
    Json(req): Json<DownloadRequest>,
) -> Result<StatusCode, HandlerError> {
    ctx.engine
        .download_recording(&req.filename)
        .map_err(map_engine_error)?;
    Ok(StatusCode::OK)
}

// ---- Persisted UI flags --------------------------------------------------

#[derive(Serialize, Deserialize)]
pub struct FlagResponse {
    pub value: bool,
}

pub async fn get_onboarding(
    State(ctx): State<AppContext>,
) -> Result<Json<FlagResponse>, HandlerError> {
    let value = db::settings::get_has_viewed_onboarding(&ctx.db_pool)
        .await
        .map_err(map_engine_error)?;
    Ok(Json(FlagResponse { value }))
}

pub async fn set_onboarding(
    State(ctx): State<AppContext>,
    Json(req): Json<FlagResponse>,
) -> Result<StatusCode, HandlerError> {
    db::settings::set_has_viewed_onboarding(&ctx.db_pool, req.value)
        .await
        .map_err(map_engine_error)?;
    Ok(StatusCode::OK)
}

pub async fn get_congrats(
    State(ctx): State<AppContext>,
) -> Result<Json<FlagResponse>, HandlerError> {
    let value = db::settings::get_has_viewed_congrats(&ctx.db_pool)
        .await
        .map_err(map_engine_error)?;
    Ok(Json(FlagResponse { value }))
}

pub async fn set_congrats(
    State(ctx): State<AppContext>,
    Json(req): Json<FlagResponse>,
) -> Result<StatusCode, HandlerError> {
    db::settings::set_has_viewed_congrats(&ctx.db_pool, req.value)
        .await
        .map_err(map_engine_error)?;
    Ok(StatusCode::OK)
}
