use crate::error::CoreError;
use crate::{now_ts, AppState};
use chrono::{Duration, Utc};
use livepoll_models::{Poll, PollOption, Visibility, WsEvent};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct CreatePollInput {
    pub question: String,
    pub duration_days: i64,
    pub visibility: Visibility,
    pub max_votes_per_user: i32,
    pub invited_users: Vec<i64>,
    pub options: Vec<PollOption>,
}

/// Drop blank captions, auto-assign orders past the current max where the
/// caller left them unset (<= 0), and reject colliding explicit orders.
fn normalize_options(
    mut next_order: i32,
    taken: &HashSet<i32>,
    raw: Vec<PollOption>,
) -> Result<Vec<PollOption>, CoreError> {
    let mut taken = taken.clone();
    let mut out = Vec::with_capacity(raw.len());
    for mut option in raw {
        if option.caption.trim().is_empty() {
            continue;
        }
        option.caption = option.caption.trim().to_string();
        if option.presentation_order <= 0 {
            next_order += 1;
            option.presentation_order = next_order;
        } else {
            next_order = next_order.max(option.presentation_order);
        }
        if !taken.insert(option.presentation_order) {
            return Err(CoreError::BadRequest(format!(
                "duplicate presentation order {}",
                option.presentation_order
            )));
        }
        out.push(option);
    }
    Ok(out)
}

pub async fn create_poll(
    state: &AppState,
    creator_id: i64,
    input: CreatePollInput,
) -> Result<Poll, CoreError> {
    if input.question.trim().is_empty() {
        return Err(CoreError::BadRequest("question is empty".into()));
    }
    if input.duration_days < 1 {
        return Err(CoreError::BadRequest(
            "poll must stay open for at least one day".into(),
        ));
    }
    if input.max_votes_per_user < 1 {
        return Err(CoreError::BadRequest(
            "max votes per user must be at least 1".into(),
        ));
    }

    let options = normalize_options(0, &HashSet::new(), input.options)?;
    if options.is_empty() {
        return Err(CoreError::BadRequest("poll needs at least one option".into()));
    }

    // The creator always belongs to a private poll's invite set.
    let invited_users = match input.visibility {
        Visibility::Private => {
            let mut ids = input.invited_users;
            ids.push(creator_id);
            ids.sort_unstable();
            ids.dedup();
            ids
        }
        Visibility::Public => Vec::new(),
    };

    let now = Utc::now();
    let poll_id = livepoll_db::polls::create_poll(
        &state.db,
        &livepoll_db::polls::NewPoll {
            question: input.question.trim().to_string(),
            creator_id,
            visibility: input.visibility,
            max_votes_per_user: input.max_votes_per_user,
            published_at: now,
            valid_until: now + Duration::days(input.duration_days),
            invited_users,
            options,
        },
    )
    .await?;
    tracing::info!(poll_id, creator_id, "poll created");

    state.event_bus.publish(WsEvent::PollCreated {
        poll_id,
        ts: now_ts(),
    });

    livepoll_db::polls::load_poll(&state.db, poll_id)
        .await?
        .ok_or(CoreError::NotFound)
}

/// A private poll is indistinguishable from a missing one for outsiders.
pub async fn get_poll(
    state: &AppState,
    poll_id: i64,
    user_id: Option<i64>,
) -> Result<Poll, CoreError> {
    let poll = livepoll_db::polls::load_poll(&state.db, poll_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if !poll.is_visible_to(user_id) {
        return Err(CoreError::NotFound);
    }
    Ok(poll)
}

pub async fn list_polls(state: &AppState, user_id: Option<i64>) -> Result<Vec<Poll>, CoreError> {
    let rows = livepoll_db::polls::list_polls(&state.db).await?;
    let mut polls = Vec::with_capacity(rows.len());
    for row in rows {
        let poll_id = row.id;
        let options = livepoll_db::polls::get_options(&state.db, poll_id).await?;
        let invited = livepoll_db::polls::get_invites(&state.db, poll_id).await?;
        let poll = livepoll_db::polls::assemble(row, options, invited);
        if poll.is_visible_to(user_id) {
            polls.push(poll);
        }
    }
    Ok(polls)
}

/// Creator-only: extend the deadline and/or merge new invitees.
pub async fn update_poll(
    state: &AppState,
    poll_id: i64,
    user_id: i64,
    extend_days: Option<i64>,
    new_invites: Vec<i64>,
) -> Result<Poll, CoreError> {
    let poll = livepoll_db::polls::load_poll(&state.db, poll_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if poll.creator_id != user_id {
        return Err(CoreError::Forbidden);
    }

    if let Some(days) = extend_days {
        if days < 1 {
            return Err(CoreError::BadRequest("extension must be at least one day".into()));
        }
        livepoll_db::polls::extend_deadline(&state.db, poll_id, poll.valid_until + Duration::days(days))
            .await?;
    }
    if !new_invites.is_empty() {
        livepoll_db::polls::add_invites(&state.db, poll_id, &new_invites).await?;
    }

    state.event_bus.publish(WsEvent::PollUpdated {
        poll_id,
        ts: now_ts(),
    });

    livepoll_db::polls::load_poll(&state.db, poll_id)
        .await?
        .ok_or(CoreError::NotFound)
}

/// Creator-only. The only path that removes vote rows; comments share the
/// poll's lifetime and go with it.
pub async fn delete_poll(state: &AppState, poll_id: i64, user_id: i64) -> Result<(), CoreError> {
    let poll = livepoll_db::polls::get_poll(&state.db, poll_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if poll.creator_id != user_id {
        return Err(CoreError::Forbidden);
    }

    if !livepoll_db::polls::delete_poll(&state.db, poll_id).await? {
        return Err(CoreError::NotFound);
    }
    state.vote_locks.forget(poll_id);
    state.comment_locks.forget(poll_id);
    tracing::info!(poll_id, "poll deleted");

    state.event_bus.publish(WsEvent::PollDeleted {
        poll_id,
        ts: now_ts(),
    });
    Ok(())
}

/// Creator-only: append options after creation.
pub async fn add_options(
    state: &AppState,
    poll_id: i64,
    user_id: i64,
    options: Vec<PollOption>,
) -> Result<Poll, CoreError> {
    let poll = livepoll_db::polls::get_poll(&state.db, poll_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if poll.creator_id != user_id {
        return Err(CoreError::Forbidden);
    }

    let existing = livepoll_db::polls::get_options(&state.db, poll_id).await?;
    let taken: HashSet<i32> = existing.iter().map(|o| o.presentation_order).collect();
    let max_order = livepoll_db::polls::max_option_order(&state.db, poll_id).await?;
    let new_options = normalize_options(max_order, &taken, options)?;

    if !new_options.is_empty() {
        livepoll_db::polls::add_options(&state.db, poll_id, &new_options).await?;
        state.event_bus.publish(WsEvent::PollUpdated {
            poll_id,
            ts: now_ts(),
        });
    }

    livepoll_db::polls::load_poll(&state.db, poll_id)
        .await?
        .ok_or(CoreError::NotFound)
}
