pub mod clickhouse;
pub mod memory;
pub mod types;

pub use self::clickhouse::ClickHouseStore;
pub use memory::MemoryStore;
pub use types::*;

use chrono::NaiveDate;

use crate::error::Result;

/// Read-only access to the feed and messaging activity streams.
///
/// Every `before` argument is exclusive and is normally "today", so the
/// current incomplete day never enters a report. Window bounds
/// (`start`, `end`) are inclusive. Rows come back ordered by date, then source.
#[allow(async_fn_in_trait)]
pub trait ActivityStore {
    /// Distinct users across both streams. A user active in the feed and
    /// the messenger counts once, so this is not the sum of per-stream
    /// distinct counts.
    async fn total_users(&self, before: NaiveDate) -> Result<u64>;

    /// Distinct users per source across both streams.
    async fn users_by_source(&self, before: NaiveDate) -> Result<Vec<SourceUsers>>;

    async fn feed_counts_per_user(&self, before: NaiveDate) -> Result<Vec<UserFeedCounts>>;

    async fn message_counts_per_user(&self, before: NaiveDate)
        -> Result<Vec<UserMessageCounts>>;

    /// DAU per date and source over the union of both streams.
    async fn daily_users_by_source(&self, before: NaiveDate) -> Result<Vec<SourceDau>>;

    async fn daily_feed_by_source(&self, before: NaiveDate) -> Result<Vec<SourceFeed>>;

    async fn daily_messages_by_source(&self, before: NaiveDate) -> Result<Vec<SourceMessages>>;

    /// Weekly departed/old/new users from the feed stream. Weeks start on
    /// Monday; the week containing `before` is excluded.
    async fn cohort_transitions(&self, before: NaiveDate) -> Result<Vec<CohortTransition>>;

    async fn daily_feed_totals(&self, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<FeedTotals>>;

    async fn daily_messaging_totals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MessagingTotals>>;

    /// One row per (date, user) with that user's message count.
    async fn messages_per_user_day(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UserDayMessages>>;
}
