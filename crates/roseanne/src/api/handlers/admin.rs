//! Admin handlers. Every route here sits behind the bearer guard.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::CurrentAdmin;
use crate::celebrity::{Celebrity, CelebrityUpdate, approval_flag};
use crate::maintenance::{
    self, BulkEntry, BulkUploadResults, FixResult, FixStatus, ImageFix, ImageReport, PruneReport,
};

const ID_REQUIRED: &str = "Celebrity ID is required";

/// Generic success body.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// Entries awaiting approval, newest first.
#[instrument(skip(state, admin), fields(admin = %admin.username()))]
pub async fn list_pending(
    State(state): State<AppState>,
    admin: CurrentAdmin,
) -> ApiResult<Json<Vec<Celebrity>>> {
    Ok(Json(state.store.list_pending().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub approved: Option<Value>,
}

/// Approve an entry, optionally editing it.
#[instrument(skip_all, fields(admin = %admin.username()))]
pub async fn approve_celebrity(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    body: Result<Json<ApproveRequest>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let Json(request) = body.map_err(|_| ApiError::bad_request(ID_REQUIRED))?;
    let id = request
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request(ID_REQUIRED))?;

    let update = CelebrityUpdate {
        name: request.name.filter(|n| !n.is_empty()),
        subtitle: request.subtitle,
        image_url: request.image_url.filter(|u| !u.is_empty()),
        approved: approval_flag(request.approved.as_ref()),
    };

    if !state.store.update(&id, update).await? {
        return Err(ApiError::not_found("Celebrity not found"));
    }
    info!(%id, "Celebrity approved");

    Ok(SuccessResponse::new("Celebrity approved successfully"))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub id: Option<String>,
}

/// Reject and delete an entry.
#[instrument(skip_all, fields(admin = %admin.username()))]
pub async fn reject_celebrity(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    body: Result<Json<RejectRequest>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let Json(request) = body.map_err(|_| ApiError::bad_request(ID_REQUIRED))?;
    let id = request
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request(ID_REQUIRED))?;

    if !state.store.delete(&id).await? {
        return Err(ApiError::not_found("Celebrity not found"));
    }
    info!(%id, "Celebrity rejected");

    Ok(SuccessResponse::new("Celebrity rejected and removed"))
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkUploadRequest {
    #[serde(default)]
    pub celebrities: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct BulkUploadResponse {
    pub success: bool,
    pub message: String,
    pub results: BulkUploadResults,
}

const INVALID_BULK_DATA: &str = "Invalid celebrities data";

/// Insert up to 100 entries in one request.
#[instrument(skip_all, fields(admin = %admin.username()))]
pub async fn bulk_upload(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    body: Result<Json<BulkUploadRequest>, JsonRejection>,
) -> ApiResult<Json<BulkUploadResponse>> {
    let Json(request) = body.map_err(|_| ApiError::bad_request(INVALID_BULK_DATA))?;
    let Some(Value::Array(items)) = request.celebrities else {
        return Err(ApiError::bad_request(INVALID_BULK_DATA));
    };
    maintenance::validate_batch(items.len()).map_err(ApiError::bad_request)?;

    // Entries that are not objects are kept as empty entries so they are
    // reported on their own line.
    let entries: Vec<BulkEntry> = items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect();

    let results = maintenance::bulk_upload(state.store.as_ref(), entries).await;
    Ok(Json(BulkUploadResponse {
        success: true,
        message: results.message(),
        results,
    }))
}

/// Create tables if needed and upsert the seed entries.
#[instrument(skip_all, fields(admin = %admin.username()))]
pub async fn init_db(
    State(state): State<AppState>,
    admin: CurrentAdmin,
) -> ApiResult<Json<SuccessResponse>> {
    state.store.initialize().await?;
    info!(backend = state.store.backend(), "Database initialized");
    Ok(SuccessResponse::new("Database initialized successfully"))
}

/// HEAD every stored image URL.
#[instrument(skip_all, fields(admin = %admin.username()))]
pub async fn test_images(
    State(state): State<AppState>,
    admin: CurrentAdmin,
) -> ApiResult<Json<ImageReport>> {
    let report =
        maintenance::check_images(state.store.as_ref(), &state.http, state.image_check_timeout)
            .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct FixImagesRequest {
    pub fixes: Vec<ImageFix>,
}

#[derive(Debug, Serialize)]
pub struct FixImagesResponse {
    pub success: bool,
    pub message: &'static str,
    pub results: Vec<FixResult>,
    pub updated: usize,
}

/// Replace image URLs for the listed entries.
#[instrument(skip_all, fields(admin = %admin.username()))]
pub async fn fix_image_urls(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    body: Result<Json<FixImagesRequest>, JsonRejection>,
) -> ApiResult<Json<FixImagesResponse>> {
    let Json(request) = body.map_err(|_| ApiError::bad_request("Invalid fixes data"))?;

    let results = maintenance::apply_image_fixes(state.store.as_ref(), &request.fixes).await;
    let updated = results
        .iter()
        .filter(|r| r.status == FixStatus::Updated)
        .count();

    Ok(Json(FixImagesResponse {
        success: true,
        message: "Image URLs updated",
        results,
        updated,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteCelebritiesRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteCelebritiesResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: PruneReport,
}

/// Delete the listed entries.
#[instrument(skip_all, fields(admin = %admin.username()))]
pub async fn delete_celebrities(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    body: Result<Json<DeleteCelebritiesRequest>, JsonRejection>,
) -> ApiResult<Json<DeleteCelebritiesResponse>> {
    let Json(request) = body.map_err(|_| ApiError::bad_request("Invalid ids data"))?;

    let report = maintenance::delete_celebrities(state.store.as_ref(), &request.ids).await?;
    Ok(Json(DeleteCelebritiesResponse {
        success: true,
        report,
    }))
}
