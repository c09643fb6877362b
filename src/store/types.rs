use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Kind of user interaction. `View` and `Like` live in the feed stream,
/// `Message` in the messaging stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Like,
    Message,
}

impl Action {
    pub fn is_feed(self) -> bool {
        matches!(self, Action::View | Action::Like)
    }
}

/// One raw interaction, as stored upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub user_id: u64,
    pub time: NaiveDateTime,
    pub source: String,
    pub action: Action,
}

/// Distinct users per acquisition source over all history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceUsers {
    pub source: String,
    pub users: u64,
}

/// Lifetime feed counts of a single user (one row per user and source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFeedCounts {
    pub source: String,
    pub likes: u64,
    pub views: u64,
}

/// Lifetime sent messages of a single user (one row per user and source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessageCounts {
    pub source: String,
    pub sent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDau {
    pub date: NaiveDate,
    pub source: String,
    pub dau: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFeed {
    pub date: NaiveDate,
    pub source: String,
    pub likes: u64,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMessages {
    pub date: NaiveDate,
    pub source: String,
    pub sent: u64,
    pub senders: u64,
}

/// Status of a user relative to a pair of adjacent weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CohortStatus {
    /// Active in the previous week, absent in this one.
    Departed,
    /// Active in both weeks.
    Old,
    /// Active this week but not the previous one.
    New,
}

impl CohortStatus {
    pub const ALL: [CohortStatus; 3] = [CohortStatus::Departed, CohortStatus::Old, CohortStatus::New];

    pub fn as_str(self) -> &'static str {
        match self {
            CohortStatus::Departed => "departed",
            CohortStatus::Old => "old",
            CohortStatus::New => "new",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "departed" => Some(CohortStatus::Departed),
            "old" => Some(CohortStatus::Old),
            "new" => Some(CohortStatus::New),
            _ => None,
        }
    }
}

impl fmt::Display for CohortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Users per (this_week, previous_week, status). Departed counts are negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortTransition {
    pub this_week: NaiveDate,
    pub previous_week: NaiveDate,
    pub status: CohortStatus,
    pub users: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedTotals {
    pub date: NaiveDate,
    pub dau: u64,
    pub views: u64,
    pub likes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagingTotals {
    pub date: NaiveDate,
    pub sent: u64,
    pub dau: u64,
}

/// Messages one user sent on one date (user id omitted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDayMessages {
    pub date: NaiveDate,
    pub sent: u64,
}
