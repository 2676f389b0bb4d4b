use serde::{Deserialize, Serialize};

use crate::comment::Comment;

/// Domain notifications pushed to every gateway subscriber.
///
/// Each variant carries just enough identifying data for a client to patch
/// its local state without a refetch; only structural poll changes warrant
/// a reload on the client side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum WsEvent {
    PollCreated {
        poll_id: i64,
        ts: i64,
    },
    PollUpdated {
        poll_id: i64,
        ts: i64,
    },
    PollDeleted {
        poll_id: i64,
        ts: i64,
    },
    /// Carries no running total: clients increment locally, and the
    /// authoritative refresh after a reconnect corrects any drift.
    VoteDelta {
        poll_id: i64,
        option_order: i32,
        voter_user_id: Option<i64>,
        ts: i64,
    },
    CommentCreated {
        poll_id: i64,
        comment: Comment,
        parent_id: Option<i64>,
    },
    CommentUpdated {
        poll_id: i64,
        comment_id: i64,
        content: String,
    },
    CommentDeleted {
        poll_id: i64,
        comment_id: i64,
        parent_id: Option<i64>,
    },
}

impl WsEvent {
    /// The poll this event concerns. Every current variant is poll-scoped.
    pub fn poll_id(&self) -> i64 {
        match self {
            WsEvent::PollCreated { poll_id, .. }
            | WsEvent::PollUpdated { poll_id, .. }
            | WsEvent::PollDeleted { poll_id, .. }
            | WsEvent::VoteDelta { poll_id, .. }
            | WsEvent::CommentCreated { poll_id, .. }
            | WsEvent::CommentUpdated { poll_id, .. }
            | WsEvent::CommentDeleted { poll_id, .. } => *poll_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            WsEvent::PollCreated { .. } => "poll-created",
            WsEvent::PollUpdated { .. } => "poll-updated",
            WsEvent::PollDeleted { .. } => "poll-deleted",
            WsEvent::VoteDelta { .. } => "vote-delta",
            WsEvent::CommentCreated { .. } => "comment-created",
            WsEvent::CommentUpdated { .. } => "comment-updated",
            WsEvent::CommentDeleted { .. } => "comment-deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_delta_uses_the_canonical_wire_shape() {
        let event = WsEvent::VoteDelta {
            poll_id: 7,
            option_order: 2,
            voter_user_id: None,
            ts: 1234,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "vote-delta");
        assert_eq!(json["pollId"], 7);
        assert_eq!(json["optionOrder"], 2);
        assert!(json["voterUserId"].is_null());
        assert_eq!(json["ts"], 1234);
    }

    #[test]
    fn comment_events_round_trip() {
        let event = WsEvent::CommentDeleted {
            poll_id: 3,
            comment_id: 9,
            parent_id: Some(4),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"comment-deleted\""));
        assert!(json.contains("\"parentId\":4"));

        let back: WsEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.poll_id(), 3);
        assert_eq!(back.event_type(), "comment-deleted");
    }
}
