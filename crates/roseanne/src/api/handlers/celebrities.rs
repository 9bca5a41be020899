//! Public celebrity listing and submission handlers.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::celebrity::{CelebritySummary, NewCelebrity};

const NAME_AND_IMAGE_REQUIRED: &str = "Name and image URL are required";
const DEFAULT_SUBMITTER: &str = "anonymous";

#[derive(Debug, Default, Deserialize)]
pub struct CelebrityQuery {
    /// `random`, an entry id, or absent for the full list.
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CelebritiesResponse {
    One(CelebritySummary),
    Many(Vec<CelebritySummary>),
}

/// List approved entries, or fetch one by id or at random.
#[instrument(skip(state))]
pub async fn get_celebrities(
    State(state): State<AppState>,
    Query(query): Query<CelebrityQuery>,
) -> ApiResult<Json<CelebritiesResponse>> {
    match query.id.as_deref().filter(|id| !id.is_empty()) {
        Some("random") => state
            .store
            .random_approved()
            .await?
            .map(|c| Json(CelebritiesResponse::One(c)))
            .ok_or_else(|| ApiError::not_found("No celebrities found")),
        Some(id) => state
            .store
            .get_approved(id)
            .await?
            .map(|c| Json(CelebritiesResponse::One(c)))
            .ok_or_else(|| ApiError::not_found("Celebrity not found")),
        None => Ok(Json(CelebritiesResponse::Many(
            state.store.list_approved().await?,
        ))),
    }
}

/// Submission request.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub submitted_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: &'static str,
    pub id: String,
}

/// Submit an entry for admin approval.
#[instrument(skip_all)]
pub async fn submit_celebrity(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(request) = body.map_err(|_| ApiError::bad_request(NAME_AND_IMAGE_REQUIRED))?;

    let (Some(name), Some(image_url)) = (
        request.name.filter(|n| !n.is_empty()),
        request.image_url.filter(|u| !u.is_empty()),
    ) else {
        return Err(ApiError::bad_request(NAME_AND_IMAGE_REQUIRED));
    };

    let submitted_by = request
        .submitted_by
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SUBMITTER.to_string());
    let celebrity = NewCelebrity::from_name(
        name,
        request.subtitle.unwrap_or_default(),
        image_url,
        submitted_by,
        false,
    );
    let id = celebrity.id.clone();

    state.store.insert(celebrity).await?;
    info!(%id, "Celebrity submitted for approval");

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            message: "Celebrity submitted for approval!",
            id,
        }),
    ))
}
