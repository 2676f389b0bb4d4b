use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use livepoll_core::AppState;
use livepoll_models::{Comment, CommentPage};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{AuthUser, MaybeAuthUser};

#[derive(Deserialize)]
pub struct PageQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepliesQuery {
    pub parent_id: i64,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct EditCommentRequest {
    pub content: String,
}

pub async fn list_top_level(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    Path(poll_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CommentPage>, ApiError> {
    livepoll_core::polls::get_poll(&state, poll_id, user_id).await?;
    let page = livepoll_core::comments::list_top_level(
        &state,
        poll_id,
        query.offset.unwrap_or(0),
        query.limit.unwrap_or(state.config.default_top_level_limit),
    )
    .await?;
    Ok(Json(page))
}

pub async fn list_replies(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    Path(poll_id): Path<i64>,
    Query(query): Query<RepliesQuery>,
) -> Result<Json<CommentPage>, ApiError> {
    livepoll_core::polls::get_poll(&state, poll_id, user_id).await?;
    let page = livepoll_core::comments::list_replies(
        &state,
        poll_id,
        query.parent_id,
        query.offset.unwrap_or(0),
        query.limit.unwrap_or(state.config.default_reply_limit),
    )
    .await?;
    Ok(Json(page))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(poll_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    livepoll_core::polls::get_poll(&state, poll_id, Some(auth.user_id)).await?;
    let comment = livepoll_core::comments::add_comment(
        &state,
        poll_id,
        auth.user_id,
        &body.content,
        body.parent_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((poll_id, comment_id)): Path<(i64, i64)>,
    Json(body): Json<EditCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let comment = livepoll_core::comments::edit_comment(
        &state,
        poll_id,
        comment_id,
        auth.user_id,
        &body.content,
    )
    .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((poll_id, comment_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    livepoll_core::comments::delete_comment(&state, poll_id, comment_id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
