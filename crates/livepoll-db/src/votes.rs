use crate::{datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use sqlx::Row;

/// Insert one ballot. Returns false when the exact (user, option) pair is
/// already recorded, in which case nothing changes.
pub async fn insert_vote(
    pool: &DbPool,
    poll_id: i64,
    user_id: i64,
    option_order: i32,
    cast_at: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO votes (poll_id, user_id, option_order, cast_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT DO NOTHING",
    )
    .bind(poll_id)
    .bind(user_id)
    .bind(option_order)
    .bind(datetime_to_db_text(cast_at))
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn has_vote(
    pool: &DbPool,
    poll_id: i64,
    user_id: i64,
    option_order: i32,
) -> Result<bool, DbError> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM votes WHERE poll_id = $1 AND user_id = $2 AND option_order = $3",
    )
    .bind(poll_id)
    .bind(user_id)
    .bind(option_order)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

/// Distinct options this user holds on the poll (rows are unique per
/// option, so a plain count is the distinct count).
pub async fn count_user_votes(pool: &DbPool, poll_id: i64, user_id: i64) -> Result<i64, DbError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE poll_id = $1 AND user_id = $2")
            .bind(poll_id)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Per-option counts for the poll; options with no votes are absent here
/// and zero-filled by the caller against the option list.
pub async fn tally_counts(pool: &DbPool, poll_id: i64) -> Result<Vec<(i32, i64)>, DbError> {
    let rows = sqlx::query(
        "SELECT option_order, COUNT(*) AS votes FROM votes
         WHERE poll_id = $1 GROUP BY option_order",
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| Ok((row.try_get("option_order")?, row.try_get("votes")?)))
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(DbError::from)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{fixture_poll, memory_pool};
    use chrono::Utc;

    #[tokio::test]
    async fn duplicate_ballot_is_a_no_op() {
        let pool = memory_pool().await;
        let poll_id = fixture_poll(&pool).await;

        assert!(super::insert_vote(&pool, poll_id, 7, 1, Utc::now())
            .await
            .expect("first"));
        assert!(!super::insert_vote(&pool, poll_id, 7, 1, Utc::now())
            .await
            .expect("second"));
        assert_eq!(
            super::count_user_votes(&pool, poll_id, 7).await.expect("count"),
            1
        );
    }

    #[tokio::test]
    async fn tally_counts_group_by_option() {
        let pool = memory_pool().await;
        let poll_id = fixture_poll(&pool).await;

        super::insert_vote(&pool, poll_id, 7, 1, Utc::now())
            .await
            .expect("vote");
        super::insert_vote(&pool, poll_id, 8, 1, Utc::now())
            .await
            .expect("vote");
        super::insert_vote(&pool, poll_id, 9, 2, Utc::now())
            .await
            .expect("vote");

        let mut counts = super::tally_counts(&pool, poll_id).await.expect("tally");
        counts.sort();
        assert_eq!(counts, vec![(1, 2), (2, 1)]);
    }
}
