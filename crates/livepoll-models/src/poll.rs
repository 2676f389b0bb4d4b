use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PUBLIC" => Some(Visibility::Public),
            "PRIVATE" => Some(Visibility::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub poll_id: i64,
    pub question: String,
    pub creator_id: i64,
    pub visibility: Visibility,
    pub max_votes_per_user: i32,
    pub published_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// Meaningful only for private polls; empty for public ones.
    pub invited_users: Vec<i64>,
    pub poll_options: Vec<PollOption>,
}

impl Poll {
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    pub fn option_by_order(&self, presentation_order: i32) -> Option<&PollOption> {
        self.poll_options
            .iter()
            .find(|o| o.presentation_order == presentation_order)
    }

    pub fn is_visible_to(&self, user_id: Option<i64>) -> bool {
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => match user_id {
                Some(id) => id == self.creator_id || self.invited_users.contains(&id),
                None => false,
            },
        }
    }
}

/// The presentation order is the stable wire key for an option; captions may
/// repeat or be edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub caption: String,
    pub presentation_order: i32,
}
