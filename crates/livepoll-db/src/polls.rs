use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use livepoll_models::{Poll, PollOption, Visibility};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct PollRow {
    pub id: i64,
    pub question: String,
    pub creator_id: i64,
    pub visibility: Visibility,
    pub max_votes_per_user: i32,
    pub published_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for PollRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        let visibility_raw: String = row.try_get("visibility")?;
        let published_raw: String = row.try_get("published_at")?;
        let valid_raw: String = row.try_get("valid_until")?;
        Ok(Self {
            id: row.try_get("id")?,
            question: row.try_get("question")?,
            creator_id: row.try_get("creator_id")?,
            visibility: Visibility::parse(&visibility_raw).ok_or_else(|| {
                sqlx::Error::Decode(format!("bad visibility: {visibility_raw}").into())
            })?,
            max_votes_per_user: row.try_get("max_votes_per_user")?,
            published_at: datetime_from_db_text(&published_raw)?,
            valid_until: datetime_from_db_text(&valid_raw)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPoll {
    pub question: String,
    pub creator_id: i64,
    pub visibility: Visibility,
    pub max_votes_per_user: i32,
    pub published_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub invited_users: Vec<i64>,
    pub options: Vec<PollOption>,
}

/// Insert a poll with its options and invite set in one transaction.
/// Returns the new poll id.
pub async fn create_poll(pool: &DbPool, new: &NewPoll) -> Result<i64, DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO polls (question, creator_id, visibility, max_votes_per_user, published_at, valid_until)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&new.question)
    .bind(new.creator_id)
    .bind(new.visibility.as_str())
    .bind(new.max_votes_per_user)
    .bind(datetime_to_db_text(new.published_at))
    .bind(datetime_to_db_text(new.valid_until))
    .execute(&mut *tx)
    .await?;
    let poll_id = result.last_insert_rowid();

    for option in &new.options {
        sqlx::query(
            "INSERT INTO poll_options (poll_id, presentation_order, caption) VALUES ($1, $2, $3)",
        )
        .bind(poll_id)
        .bind(option.presentation_order)
        .bind(&option.caption)
        .execute(&mut *tx)
        .await?;
    }

    for user_id in &new.invited_users {
        sqlx::query(
            "INSERT INTO poll_invites (poll_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(poll_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(poll_id)
}

pub async fn get_poll(pool: &DbPool, poll_id: i64) -> Result<Option<PollRow>, DbError> {
    let row = sqlx::query_as::<_, PollRow>(
        "SELECT id, question, creator_id, visibility, max_votes_per_user, published_at, valid_until
         FROM polls WHERE id = $1",
    )
    .bind(poll_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_polls(pool: &DbPool) -> Result<Vec<PollRow>, DbError> {
    let rows = sqlx::query_as::<_, PollRow>(
        "SELECT id, question, creator_id, visibility, max_votes_per_user, published_at, valid_until
         FROM polls ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_options(pool: &DbPool, poll_id: i64) -> Result<Vec<PollOption>, DbError> {
    let rows = sqlx::query(
        "SELECT caption, presentation_order FROM poll_options
         WHERE poll_id = $1 ORDER BY presentation_order ASC",
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| {
            Ok(PollOption {
                caption: row.try_get("caption")?,
                presentation_order: row.try_get("presentation_order")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(DbError::from)
}

pub async fn get_invites(pool: &DbPool, poll_id: i64) -> Result<Vec<i64>, DbError> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT user_id FROM poll_invites WHERE poll_id = $1 ORDER BY user_id")
            .bind(poll_id)
            .fetch_all(pool)
            .await?;
    Ok(ids)
}

pub async fn option_exists(
    pool: &DbPool,
    poll_id: i64,
    presentation_order: i32,
) -> Result<bool, DbError> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM poll_options WHERE poll_id = $1 AND presentation_order = $2",
    )
    .bind(poll_id)
    .bind(presentation_order)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub async fn max_option_order(pool: &DbPool, poll_id: i64) -> Result<i32, DbError> {
    let max: Option<i32> = sqlx::query_scalar(
        "SELECT MAX(presentation_order) FROM poll_options WHERE poll_id = $1",
    )
    .bind(poll_id)
    .fetch_one(pool)
    .await?;
    Ok(max.unwrap_or(0))
}

pub async fn add_options(
    pool: &DbPool,
    poll_id: i64,
    options: &[PollOption],
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    for option in options {
        sqlx::query(
            "INSERT INTO poll_options (poll_id, presentation_order, caption) VALUES ($1, $2, $3)",
        )
        .bind(poll_id)
        .bind(option.presentation_order)
        .bind(&option.caption)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn extend_deadline(
    pool: &DbPool,
    poll_id: i64,
    valid_until: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query("UPDATE polls SET valid_until = $2 WHERE id = $1")
        .bind(poll_id)
        .bind(datetime_to_db_text(valid_until))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn add_invites(pool: &DbPool, poll_id: i64, user_ids: &[i64]) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    for user_id in user_ids {
        sqlx::query(
            "INSERT INTO poll_invites (poll_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(poll_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Options, invites, votes and comments go with the poll via FK cascade.
pub async fn delete_poll(pool: &DbPool, poll_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM polls WHERE id = $1")
        .bind(poll_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Assemble the full wire model from its rows.
pub async fn load_poll(pool: &DbPool, poll_id: i64) -> Result<Option<Poll>, DbError> {
    let Some(row) = get_poll(pool, poll_id).await? else {
        return Ok(None);
    };
    let options = get_options(pool, poll_id).await?;
    let invited = get_invites(pool, poll_id).await?;
    Ok(Some(assemble(row, options, invited)))
}

pub fn assemble(row: PollRow, options: Vec<PollOption>, invited_users: Vec<i64>) -> Poll {
    Poll {
        poll_id: row.id,
        question: row.question,
        creator_id: row.creator_id,
        visibility: row.visibility,
        max_votes_per_user: row.max_votes_per_user,
        published_at: row.published_at,
        valid_until: row.valid_until,
        invited_users,
        poll_options: options,
    }
}
