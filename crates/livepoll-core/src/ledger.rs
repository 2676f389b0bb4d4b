use crate::error::CoreError;
use crate::{now_ts, AppState};
use chrono::Utc;
use livepoll_models::{Visibility, WsEvent};
use std::collections::HashMap;

/// A successful cast. `Duplicate` means the exact (user, option) pair was
/// already on the ledger: nothing changed and no event was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    Accepted,
    Duplicate,
}

/// Record one ballot.
///
/// Preconditions are checked against the poll store; the cap check and the
/// insert run under the poll's vote lock so concurrent casts cannot slip
/// past the cap or lose counter updates. The `vote-delta` event is
/// published before the lock is released, which keeps same-poll events in
/// mutation order.
pub async fn cast_vote(
    state: &AppState,
    poll_id: i64,
    user_id: i64,
    option_order: i32,
) -> Result<CastOutcome, CoreError> {
    let poll = livepoll_db::polls::load_poll(&state.db, poll_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    if poll.is_closed(Utc::now()) {
        return Err(CoreError::PollClosed);
    }
    if poll.option_by_order(option_order).is_none() {
        return Err(CoreError::UnknownOption);
    }
    if poll.visibility == Visibility::Private && !poll.is_visible_to(Some(user_id)) {
        return Err(CoreError::NotInvited);
    }

    let _guard = state.vote_locks.acquire(poll_id).await;

    if livepoll_db::votes::has_vote(&state.db, poll_id, user_id, option_order).await? {
        return Ok(CastOutcome::Duplicate);
    }
    let held = livepoll_db::votes::count_user_votes(&state.db, poll_id, user_id).await?;
    if held >= i64::from(poll.max_votes_per_user) {
        return Err(CoreError::VoteCapExceeded);
    }

    livepoll_db::votes::insert_vote(&state.db, poll_id, user_id, option_order, Utc::now()).await?;
    tracing::info!(poll_id, user_id, option_order, "vote accepted");

    state.event_bus.publish(WsEvent::VoteDelta {
        poll_id,
        option_order,
        voter_user_id: Some(user_id),
        ts: now_ts(),
    });

    Ok(CastOutcome::Accepted)
}

/// Caption -> count for every option of the poll, zero-filled. Reads the
/// committed rows directly and never takes the vote lock, so it reflects
/// every cast committed before the call without blocking writers.
pub async fn get_tallies(
    state: &AppState,
    poll_id: i64,
) -> Result<HashMap<String, i64>, CoreError> {
    let options = livepoll_db::polls::get_options(&state.db, poll_id).await?;
    if options.is_empty() && livepoll_db::polls::get_poll(&state.db, poll_id).await?.is_none() {
        return Err(CoreError::NotFound);
    }

    let counts = livepoll_db::votes::tally_counts(&state.db, poll_id).await?;
    let by_order: HashMap<i32, i64> = counts.into_iter().collect();

    let mut tallies: HashMap<String, i64> = HashMap::new();
    for option in options {
        let count = by_order
            .get(&option.presentation_order)
            .copied()
            .unwrap_or(0);
        // Captions may repeat; repeated captions pool their counts.
        *tallies.entry(option.caption).or_insert(0) += count;
    }
    Ok(tallies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppConfig;
    use chrono::Duration;
    use livepoll_db::polls::NewPoll;
    use livepoll_models::PollOption;

    async fn test_state() -> AppState {
        let pool = livepoll_db::create_pool("sqlite::memory:", 1)
            .await
            .expect("pool");
        livepoll_db::run_migrations(&pool).await.expect("migrations");
        AppState::new(pool, AppConfig::default())
    }

    async fn make_poll(state: &AppState, max_votes: i32, open: bool) -> i64 {
        let now = Utc::now();
        let valid_until = if open {
            now + Duration::days(1)
        } else {
            now - Duration::hours(1)
        };
        livepoll_db::polls::create_poll(
            &state.db,
            &NewPoll {
                question: "q".into(),
                creator_id: 1,
                visibility: Visibility::Public,
                max_votes_per_user: max_votes,
                published_at: now,
                valid_until,
                invited_users: vec![],
                options: vec![
                    PollOption {
                        caption: "A".into(),
                        presentation_order: 1,
                    },
                    PollOption {
                        caption: "B".into(),
                        presentation_order: 2,
                    },
                ],
            },
        )
        .await
        .expect("poll")
    }

    #[tokio::test]
    async fn cap_one_scenario_from_the_ledger_contract() {
        let state = test_state().await;
        let poll_id = make_poll(&state, 1, true).await;

        // User 7 votes A.
        let first = cast_vote(&state, poll_id, 7, 1).await.expect("cast");
        assert_eq!(first, CastOutcome::Accepted);
        let tallies = get_tallies(&state, poll_id).await.expect("tallies");
        assert_eq!(tallies["A"], 1);
        assert_eq!(tallies["B"], 0);

        // Vote B: cap already held by A.
        let second = cast_vote(&state, poll_id, 7, 2).await;
        assert!(matches!(second, Err(CoreError::VoteCapExceeded)));

        // Re-vote A: idempotent no-op, tally unchanged.
        let third = cast_vote(&state, poll_id, 7, 1).await.expect("cast");
        assert_eq!(third, CastOutcome::Duplicate);
        let tallies = get_tallies(&state, poll_id).await.expect("tallies");
        assert_eq!(tallies["A"], 1);
        assert_eq!(tallies["B"], 0);
    }

    #[tokio::test]
    async fn closed_poll_and_unknown_option_are_rejected() {
        let state = test_state().await;
        let open = make_poll(&state, 1, true).await;
        let closed = make_poll(&state, 1, false).await;

        assert!(matches!(
            cast_vote(&state, closed, 7, 1).await,
            Err(CoreError::PollClosed)
        ));
        assert!(matches!(
            cast_vote(&state, open, 7, 99).await,
            Err(CoreError::UnknownOption)
        ));
        assert!(matches!(
            cast_vote(&state, 4242, 7, 1).await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn private_poll_rejects_uninvited_voters() {
        let state = test_state().await;
        let now = Utc::now();
        let poll_id = livepoll_db::polls::create_poll(
            &state.db,
            &NewPoll {
                question: "members only".into(),
                creator_id: 1,
                visibility: Visibility::Private,
                max_votes_per_user: 1,
                published_at: now,
                valid_until: now + Duration::days(1),
                invited_users: vec![1, 20],
                options: vec![PollOption {
                    caption: "A".into(),
                    presentation_order: 1,
                }],
            },
        )
        .await
        .expect("poll");

        assert!(matches!(
            cast_vote(&state, poll_id, 99, 1).await,
            Err(CoreError::NotInvited)
        ));
        assert_eq!(
            cast_vote(&state, poll_id, 20, 1).await.expect("cast"),
            CastOutcome::Accepted
        );
    }

    #[tokio::test]
    async fn concurrent_casts_lose_no_updates() {
        let state = test_state().await;
        let poll_id = make_poll(&state, 2, true).await;

        let mut handles = Vec::new();
        for user_id in 0..20_i64 {
            for option_order in [1, 2] {
                let state = state.clone();
                handles.push(tokio::spawn(async move {
                    cast_vote(&state, poll_id, user_id, option_order).await
                }));
            }
        }

        let mut accepted = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), Ok(CastOutcome::Accepted)) {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 40);

        let tallies = get_tallies(&state, poll_id).await.expect("tallies");
        assert_eq!(tallies["A"], 20);
        assert_eq!(tallies["B"], 20);
    }

    #[tokio::test]
    async fn concurrent_casts_never_exceed_the_cap() {
        let state = test_state().await;
        let poll_id = make_poll(&state, 1, true).await;

        let mut handles = Vec::new();
        for option_order in [1, 2] {
            for _ in 0..4 {
                let state = state.clone();
                handles.push(tokio::spawn(async move {
                    cast_vote(&state, poll_id, 7, option_order).await
                }));
            }
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(CastOutcome::Accepted) => accepted += 1,
                Ok(CastOutcome::Duplicate) | Err(CoreError::VoteCapExceeded) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(accepted, 1);

        let held = livepoll_db::votes::count_user_votes(&state.db, poll_id, 7)
            .await
            .expect("count");
        assert_eq!(held, 1);
    }

    #[tokio::test]
    async fn accepted_cast_publishes_a_delta_and_duplicate_does_not() {
        let state = test_state().await;
        let poll_id = make_poll(&state, 1, true).await;
        let mut rx = state.event_bus.register_session("watcher");

        cast_vote(&state, poll_id, 7, 1).await.expect("cast");
        match rx.recv().await.unwrap() {
            WsEvent::VoteDelta {
                poll_id: p,
                option_order,
                voter_user_id,
                ..
            } => {
                assert_eq!(p, poll_id);
                assert_eq!(option_order, 1);
                assert_eq!(voter_user_id, Some(7));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        cast_vote(&state, poll_id, 7, 1).await.expect("re-cast");
        assert!(rx.try_recv().is_err());
    }
}
