use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use livepoll_core::polls::CreatePollInput;
use livepoll_core::AppState;
use livepoll_models::{Poll, PollOption, Visibility};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{AuthUser, MaybeAuthUser};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub question: String,
    pub duration_days: i64,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    #[serde(default = "default_max_votes")]
    pub max_votes_per_user: i32,
    #[serde(default)]
    pub invited_users: Vec<i64>,
    pub poll_options: Vec<PollOption>,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

fn default_max_votes() -> i32 {
    1
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    pub extend_days: Option<i64>,
    #[serde(default)]
    pub invited_users: Vec<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOptionsRequest {
    pub poll_options: Vec<PollOption>,
}

pub async fn create_poll(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<Poll>), ApiError> {
    let poll = livepoll_core::polls::create_poll(
        &state,
        auth.user_id,
        CreatePollInput {
            question: body.question,
            duration_days: body.duration_days,
            visibility: body.visibility,
            max_votes_per_user: body.max_votes_per_user,
            invited_users: body.invited_users,
            options: body.poll_options,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(poll)))
}

pub async fn list_polls(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
) -> Result<Json<Vec<Poll>>, ApiError> {
    let polls = livepoll_core::polls::list_polls(&state, user_id).await?;
    Ok(Json(polls))
}

pub async fn get_poll(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    Path(poll_id): Path<i64>,
) -> Result<Json<Poll>, ApiError> {
    let poll = livepoll_core::polls::get_poll(&state, poll_id, user_id).await?;
    Ok(Json(poll))
}

pub async fn update_poll(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(poll_id): Path<i64>,
    Json(body): Json<UpdatePollRequest>,
) -> Result<Json<Poll>, ApiError> {
    let poll = livepoll_core::polls::update_poll(
        &state,
        poll_id,
        auth.user_id,
        body.extend_days,
        body.invited_users,
    )
    .await?;
    Ok(Json(poll))
}

pub async fn delete_poll(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(poll_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    livepoll_core::polls::delete_poll(&state, poll_id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_options(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(poll_id): Path<i64>,
    Json(body): Json<AddOptionsRequest>,
) -> Result<Json<Poll>, ApiError> {
    let poll =
        livepoll_core::polls::add_options(&state, poll_id, auth.user_id, body.poll_options).await?;
    Ok(Json(poll))
}
