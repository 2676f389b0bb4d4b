use axum::{
    extract::{Path, State},
    Json,
};
use livepoll_core::AppState;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::extract::{AuthUser, MaybeAuthUser};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub option_order: i32,
}

/// A duplicate ballot answers `accepted: true` like a fresh one; retries
/// stay idempotent for the caller.
pub async fn cast_vote(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(poll_id): Path<i64>,
    Json(body): Json<CastVoteRequest>,
) -> Result<Json<Value>, ApiError> {
    livepoll_core::ledger::cast_vote(&state, poll_id, auth.user_id, body.option_order).await?;
    Ok(Json(json!({ "accepted": true })))
}

pub async fn get_results(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    Path(poll_id): Path<i64>,
) -> Result<Json<HashMap<String, i64>>, ApiError> {
    // Visibility gate first so private polls stay hidden from outsiders.
    livepoll_core::polls::get_poll(&state, poll_id, user_id).await?;
    let tallies = livepoll_core::ledger::get_tallies(&state, poll_id).await?;
    Ok(Json(tallies))
}
