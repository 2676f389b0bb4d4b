pub mod comments;
pub mod error;
pub mod events;
pub mod ledger;
pub mod locks;
pub mod polls;

use livepoll_db::DbPool;
use std::sync::Arc;

/// Tunables consumed by the domain layer; loaded from the server's config
/// file and fixed for the process lifetime.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub default_top_level_limit: i64,
    pub default_reply_limit: i64,
    pub max_page_limit: i64,
    /// Per-session event buffer; a subscriber that falls this far behind
    /// is disconnected rather than allowed to backpressure writers.
    pub session_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_top_level_limit: 3,
            default_reply_limit: 2,
            max_page_limit: 50,
            session_buffer: 256,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub event_bus: events::EventBus,
    pub config: AppConfig,
    /// Serializes the vote write path per poll.
    pub vote_locks: Arc<locks::PollLocks>,
    /// Serializes comment mutations per poll, independently of votes.
    pub comment_locks: Arc<locks::PollLocks>,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        Self {
            db,
            event_bus: events::EventBus::new(config.session_buffer),
            config,
            vote_locks: Arc::new(locks::PollLocks::new()),
            comment_locks: Arc::new(locks::PollLocks::new()),
        }
    }
}

pub(crate) fn now_ts() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
