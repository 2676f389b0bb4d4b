pub mod comments;
pub mod polls;
pub mod votes;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;

pub type DbPool = sqlx::SqlitePool;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("not found")]
    NotFound,
}

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("migrations: applied successfully");
    Ok(())
}

pub(crate) fn datetime_to_db_text(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub(crate) fn datetime_from_db_text(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{create_pool, run_migrations, DbPool};
    use chrono::{Duration, Utc};
    use livepoll_models::{PollOption, Visibility};

    pub async fn memory_pool() -> DbPool {
        let pool = create_pool("sqlite::memory:", 1).await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        pool
    }

    /// A public two-option poll open for another day, created by user 1.
    pub async fn fixture_poll(pool: &DbPool) -> i64 {
        let now = Utc::now();
        crate::polls::create_poll(
            pool,
            &crate::polls::NewPoll {
                question: "Tea or coffee?".into(),
                creator_id: 1,
                visibility: Visibility::Public,
                max_votes_per_user: 1,
                published_at: now,
                valid_until: now + Duration::days(1),
                invited_users: vec![],
                options: vec![
                    PollOption {
                        caption: "Tea".into(),
                        presentation_order: 1,
                    },
                    PollOption {
                        caption: "Coffee".into(),
                        presentation_order: 2,
                    },
                ],
            },
        )
        .await
        .expect("fixture poll")
    }
}
