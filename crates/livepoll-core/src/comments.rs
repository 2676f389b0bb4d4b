use crate::error::CoreError;
use crate::AppState;
use chrono::Utc;
use livepoll_models::{Comment, CommentPage, WsEvent};

fn clamp_page(state: &AppState, offset: i64, limit: i64) -> (i64, i64) {
    (offset.max(0), limit.clamp(1, state.config.max_page_limit))
}

/// Append a comment to the poll's forest. A reply must name a parent that
/// exists in the same poll.
pub async fn add_comment(
    state: &AppState,
    poll_id: i64,
    author_id: i64,
    content: &str,
    parent_id: Option<i64>,
) -> Result<Comment, CoreError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CoreError::BadRequest("comment content is empty".into()));
    }
    if livepoll_db::polls::get_poll(&state.db, poll_id).await?.is_none() {
        return Err(CoreError::NotFound);
    }
    if let Some(parent) = parent_id {
        if livepoll_db::comments::get_comment(&state.db, poll_id, parent)
            .await?
            .is_none()
        {
            return Err(CoreError::BadRequest(
                "parent comment not found in this poll".into(),
            ));
        }
    }

    let _guard = state.comment_locks.acquire(poll_id).await;
    let row =
        livepoll_db::comments::insert_comment(&state.db, poll_id, author_id, content, parent_id, Utc::now())
            .await?;
    let comment = Comment::from(row);

    state.event_bus.publish(WsEvent::CommentCreated {
        poll_id,
        comment: comment.clone(),
        parent_id,
    });
    Ok(comment)
}

/// Newest-first page of the poll's top-level comments.
pub async fn list_top_level(
    state: &AppState,
    poll_id: i64,
    offset: i64,
    limit: i64,
) -> Result<CommentPage, CoreError> {
    if livepoll_db::polls::get_poll(&state.db, poll_id).await?.is_none() {
        return Err(CoreError::NotFound);
    }
    let (offset, limit) = clamp_page(state, offset, limit);

    let total = livepoll_db::comments::count_top_level(&state.db, poll_id).await?;
    let rows = livepoll_db::comments::list_top_level(&state.db, poll_id, offset, limit).await?;
    let items = rows.into_iter().map(Comment::from).collect();
    Ok(CommentPage::new(items, total, offset))
}

/// One page of a node's direct replies, oldest first. Deeper levels are
/// browsed by re-calling this with a child id, so a single call's cost is
/// bounded regardless of subtree size. The parent itself may already be
/// deleted; its replies remain addressable.
pub async fn list_replies(
    state: &AppState,
    poll_id: i64,
    parent_id: i64,
    offset: i64,
    limit: i64,
) -> Result<CommentPage, CoreError> {
    if livepoll_db::polls::get_poll(&state.db, poll_id).await?.is_none() {
        return Err(CoreError::NotFound);
    }
    let (offset, limit) = clamp_page(state, offset, limit);

    let total = livepoll_db::comments::count_replies(&state.db, poll_id, parent_id).await?;
    let rows =
        livepoll_db::comments::list_replies(&state.db, poll_id, parent_id, offset, limit).await?;
    let items = rows.into_iter().map(Comment::from).collect();
    Ok(CommentPage::new(items, total, offset))
}

/// Only the author may edit.
pub async fn edit_comment(
    state: &AppState,
    poll_id: i64,
    comment_id: i64,
    editor_id: i64,
    content: &str,
) -> Result<Comment, CoreError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CoreError::BadRequest("comment content is empty".into()));
    }
    let existing = livepoll_db::comments::get_comment(&state.db, poll_id, comment_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if existing.author_id != editor_id {
        return Err(CoreError::Forbidden);
    }

    let _guard = state.comment_locks.acquire(poll_id).await;
    let row = livepoll_db::comments::update_content(&state.db, poll_id, comment_id, content, Utc::now())
        .await?
        .ok_or(CoreError::NotFound)?;
    let comment = Comment::from(row);

    state.event_bus.publish(WsEvent::CommentUpdated {
        poll_id,
        comment_id,
        content: comment.content.clone(),
    });
    Ok(comment)
}

/// The author or the poll's creator may delete. Replies are not cascaded.
pub async fn delete_comment(
    state: &AppState,
    poll_id: i64,
    comment_id: i64,
    requester_id: i64,
) -> Result<(), CoreError> {
    let existing = livepoll_db::comments::get_comment(&state.db, poll_id, comment_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let poll = livepoll_db::polls::get_poll(&state.db, poll_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if existing.author_id != requester_id && poll.creator_id != requester_id {
        return Err(CoreError::Forbidden);
    }

    let _guard = state.comment_locks.acquire(poll_id).await;
    if !livepoll_db::comments::delete_comment(&state.db, poll_id, comment_id).await? {
        return Err(CoreError::NotFound);
    }

    state.event_bus.publish(WsEvent::CommentDeleted {
        poll_id,
        comment_id,
        parent_id: existing.parent_id,
    });
    Ok(())
}
