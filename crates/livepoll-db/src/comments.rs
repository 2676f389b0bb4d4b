use crate::{datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use livepoll_models::Comment;
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub poll_id: i64,
    pub author_id: i64,
    pub content: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for CommentRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        let created_raw: String = row.try_get("created_at")?;
        let updated_raw: String = row.try_get("updated_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            poll_id: row.try_get("poll_id")?,
            author_id: row.try_get("author_id")?,
            content: row.try_get("content")?,
            parent_id: row.try_get("parent_id")?,
            created_at: datetime_from_db_text(&created_raw)?,
            updated_at: datetime_from_db_text(&updated_raw)?,
        })
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            comment_id: row.id,
            poll_id: row.poll_id,
            author_id: row.author_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            parent_id: row.parent_id,
        }
    }
}

const SELECT_COMMENT: &str =
    "SELECT id, poll_id, author_id, content, parent_id, created_at, updated_at FROM comments";

pub async fn insert_comment(
    pool: &DbPool,
    poll_id: i64,
    author_id: i64,
    content: &str,
    parent_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<CommentRow, DbError> {
    let stamp = datetime_to_db_text(now);
    let result = sqlx::query(
        "INSERT INTO comments (poll_id, author_id, content, parent_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(poll_id)
    .bind(author_id)
    .bind(content)
    .bind(parent_id)
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await?;

    get_comment(pool, poll_id, result.last_insert_rowid())
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn get_comment(
    pool: &DbPool,
    poll_id: i64,
    comment_id: i64,
) -> Result<Option<CommentRow>, DbError> {
    let row = sqlx::query_as::<_, CommentRow>(&format!(
        "{SELECT_COMMENT} WHERE poll_id = $1 AND id = $2"
    ))
    .bind(poll_id)
    .bind(comment_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Top-level page, newest first. The id tiebreak keeps same-instant rows
/// in a stable order across pages.
pub async fn list_top_level(
    pool: &DbPool,
    poll_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<CommentRow>, DbError> {
    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "{SELECT_COMMENT} WHERE poll_id = $1 AND parent_id IS NULL
         ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(poll_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count_top_level(pool: &DbPool, poll_id: i64) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM comments WHERE poll_id = $1 AND parent_id IS NULL",
    )
    .bind(poll_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Direct replies only, oldest first; deeper levels are fetched by calling
/// this again with the child's id.
pub async fn list_replies(
    pool: &DbPool,
    poll_id: i64,
    parent_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<CommentRow>, DbError> {
    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "{SELECT_COMMENT} WHERE poll_id = $1 AND parent_id = $2
         ORDER BY created_at ASC, id ASC LIMIT $3 OFFSET $4"
    ))
    .bind(poll_id)
    .bind(parent_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count_replies(pool: &DbPool, poll_id: i64, parent_id: i64) -> Result<i64, DbError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE poll_id = $1 AND parent_id = $2")
            .bind(poll_id)
            .bind(parent_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn update_content(
    pool: &DbPool,
    poll_id: i64,
    comment_id: i64,
    content: &str,
    now: DateTime<Utc>,
) -> Result<Option<CommentRow>, DbError> {
    let result = sqlx::query(
        "UPDATE comments SET content = $3, updated_at = $4 WHERE poll_id = $1 AND id = $2",
    )
    .bind(poll_id)
    .bind(comment_id)
    .bind(content)
    .bind(datetime_to_db_text(now))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_comment(pool, poll_id, comment_id).await
}

/// Removes only the one row; replies keep their parent_id and stay
/// addressable through it.
pub async fn delete_comment(pool: &DbPool, poll_id: i64, comment_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM comments WHERE poll_id = $1 AND id = $2")
        .bind(poll_id)
        .bind(comment_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{fixture_poll, memory_pool};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn top_level_pages_are_newest_first_and_disjoint() {
        let pool = memory_pool().await;
        let poll_id = fixture_poll(&pool).await;

        let base = Utc::now();
        for i in 0..5 {
            super::insert_comment(
                &pool,
                poll_id,
                1,
                &format!("c{i}"),
                None,
                base + Duration::seconds(i),
            )
            .await
            .expect("insert");
        }

        let first = super::list_top_level(&pool, poll_id, 0, 3).await.expect("page");
        let second = super::list_top_level(&pool, poll_id, 3, 3).await.expect("page");
        let contents: Vec<_> = first
            .iter()
            .chain(second.iter())
            .map(|c| c.content.clone())
            .collect();
        assert_eq!(contents, vec!["c4", "c3", "c2", "c1", "c0"]);
        assert_eq!(super::count_top_level(&pool, poll_id).await.expect("count"), 5);
    }

    #[tokio::test]
    async fn replies_are_oldest_first_and_survive_parent_delete() {
        let pool = memory_pool().await;
        let poll_id = fixture_poll(&pool).await;

        let parent = super::insert_comment(&pool, poll_id, 1, "parent", None, Utc::now())
            .await
            .expect("parent");
        let reply = super::insert_comment(
            &pool,
            poll_id,
            2,
            "reply",
            Some(parent.id),
            Utc::now() + Duration::seconds(1),
        )
        .await
        .expect("reply");

        assert!(super::delete_comment(&pool, poll_id, parent.id)
            .await
            .expect("delete"));
        assert!(super::get_comment(&pool, poll_id, parent.id)
            .await
            .expect("get")
            .is_none());

        let orphans = super::list_replies(&pool, poll_id, parent.id, 0, 10)
            .await
            .expect("replies");
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, reply.id);
        assert_eq!(orphans[0].parent_id, Some(parent.id));
    }
}
