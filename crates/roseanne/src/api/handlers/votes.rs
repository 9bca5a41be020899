//! Vote handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ClientIp;
use crate::api::state::AppState;
use crate::celebrity::{VoteTotals, VoteType};

const VOTE_FIELDS_REQUIRED: &str = "Celebrity ID and vote type are required";

#[derive(Debug, Default, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub celebrity_id: Option<String>,
    #[serde(default)]
    pub vote_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub success: bool,
    pub new_totals: VoteTotals,
}

/// Record a vote for an approved entry.
#[instrument(skip_all)]
pub async fn cast_vote(
    State(state): State<AppState>,
    client_ip: ClientIp,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<Json<VoteResponse>> {
    let Json(request) = body.map_err(|_| ApiError::bad_request(VOTE_FIELDS_REQUIRED))?;

    let (Some(celebrity_id), Some(vote_type)) = (
        request.celebrity_id.filter(|id| !id.is_empty()),
        request.vote_type.filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::bad_request(VOTE_FIELDS_REQUIRED));
    };

    let vote: VoteType = vote_type
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid vote type"))?;

    let totals = state
        .store
        .record_vote(&celebrity_id, vote, client_ip.as_str())
        .await?
        .ok_or_else(|| ApiError::not_found("Celebrity not found"))?;
    debug!(%celebrity_id, %vote, "Vote recorded");

    Ok(Json(VoteResponse {
        success: true,
        new_totals: totals,
    }))
}
