use ::clickhouse::{Client, Row};
use chrono::NaiveDate;
use serde::Deserialize;

use super::types::*;
use super::ActivityStore;
use crate::config::StoreConfig;
use crate::date_util::{format_iso, parse_iso, week_start};
use crate::error::{Error, Result};

/// `ActivityStore` backed by ClickHouse over HTTP.
///
/// Dates are always bound as parameters so "today" is decided by the caller,
/// not by the server clock.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: Client,
    feed_table: String,
    message_table: String,
}

#[derive(Debug, Row, Deserialize)]
struct CountRow {
    users: u64,
}

#[derive(Debug, Row, Deserialize)]
struct SourceUsersRow {
    source: String,
    users: u64,
}

#[derive(Debug, Row, Deserialize)]
struct UserFeedRow {
    source: String,
    likes: u64,
    views: u64,
}

#[derive(Debug, Row, Deserialize)]
struct UserMessagesRow {
    source: String,
    sent: u64,
}

#[derive(Debug, Row, Deserialize)]
struct SourceDauRow {
    day: String,
    source: String,
    dau: u64,
}

#[derive(Debug, Row, Deserialize)]
struct SourceFeedRow {
    day: String,
    source: String,
    likes: u64,
    views: u64,
}

#[derive(Debug, Row, Deserialize)]
struct SourceMessagesRow {
    day: String,
    source: String,
    sent: u64,
    senders: u64,
}

#[derive(Debug, Row, Deserialize)]
struct CohortRow {
    this_week: String,
    previous_week: String,
    status: String,
    users: i64,
}

#[derive(Debug, Row, Deserialize)]
struct FeedTotalsRow {
    day: String,
    dau: u64,
    views: u64,
    likes: u64,
}

#[derive(Debug, Row, Deserialize)]
struct MessagingTotalsRow {
    day: String,
    sent: u64,
    dau: u64,
}

#[derive(Debug, Row, Deserialize)]
struct UserDayRow {
    day: String,
    sent: u64,
}

fn day(s: &str) -> Result<NaiveDate> {
    parse_iso(s).ok_or_else(|| Error::Store(format!("unexpected date value '{s}'")))
}

impl ClickHouseStore {
    /// Build a client from config. No network traffic happens until the
    /// first query.
    pub fn connect(config: &StoreConfig) -> Self {
        let client = Client::default()
            .with_url(&config.url)
            .with_user(&config.user)
            .with_password(&config.password)
            .with_database(&config.database);
        Self {
            client,
            feed_table: config.feed_table.clone(),
            message_table: config.message_table.clone(),
        }
    }

    /// `SELECT user_id, time, source` over both streams, before a bound date.
    fn union_before(&self) -> String {
        format!(
            "SELECT user_id, time, source FROM {feed} WHERE toDate(time) < toDate(?)
             UNION ALL
             SELECT user_id, time, source FROM {messages} WHERE toDate(time) < toDate(?)",
            feed = self.feed_table,
            messages = self.message_table,
        )
    }
}

impl ActivityStore for ClickHouseStore {
    async fn total_users(&self, before: NaiveDate) -> Result<u64> {
        let before = format_iso(before);
        let sql = format!(
            "SELECT uniqExact(user_id) AS users FROM ({})",
            self.union_before()
        );
        let row: CountRow = self
            .client
            .query(&sql)
            .bind(&before)
            .bind(&before)
            .fetch_one()
            .await?;
        Ok(row.users)
    }

    async fn users_by_source(&self, before: NaiveDate) -> Result<Vec<SourceUsers>> {
        let before = format_iso(before);
        let sql = format!(
            "SELECT source, uniqExact(user_id) AS users
             FROM ({})
             GROUP BY source
             ORDER BY source",
            self.union_before()
        );
        let rows: Vec<SourceUsersRow> = self
            .client
            .query(&sql)
            .bind(&before)
            .bind(&before)
            .fetch_all()
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| SourceUsers {
                source: r.source,
                users: r.users,
            })
            .collect())
    }

    async fn feed_counts_per_user(&self, before: NaiveDate) -> Result<Vec<UserFeedCounts>> {
        let sql = format!(
            "SELECT source,
                    countIf(action = 'like') AS likes,
                    countIf(action = 'view') AS views
             FROM {}
             WHERE toDate(time) < toDate(?)
             GROUP BY user_id, source
             ORDER BY user_id, source",
            self.feed_table
        );
        let rows: Vec<UserFeedRow> = self
            .client
            .query(&sql)
            .bind(format_iso(before))
            .fetch_all()
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| UserFeedCounts {
                source: r.source,
                likes: r.likes,
                views: r.views,
            })
            .collect())
    }

    async fn message_counts_per_user(
        &self,
        before: NaiveDate,
    ) -> Result<Vec<UserMessageCounts>> {
        let sql = format!(
            "SELECT source, count() AS sent
             FROM {}
             WHERE toDate(time) < toDate(?)
             GROUP BY user_id, source
             ORDER BY user_id, source",
            self.message_table
        );
        let rows: Vec<UserMessagesRow> = self
            .client
            .query(&sql)
            .bind(format_iso(before))
            .fetch_all()
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| UserMessageCounts {
                source: r.source,
                sent: r.sent,
            })
            .collect())
    }

    async fn daily_users_by_source(&self, before: NaiveDate) -> Result<Vec<SourceDau>> {
        let before = format_iso(before);
        let sql = format!(
            "SELECT toString(toDate(time)) AS day, source, uniqExact(user_id) AS dau
             FROM ({})
             GROUP BY day, source
             ORDER BY day, source",
            self.union_before()
        );
        let rows: Vec<SourceDauRow> = self
            .client
            .query(&sql)
            .bind(&before)
            .bind(&before)
            .fetch_all()
            .await?;
        rows.into_iter()
            .map(|r| {
                Ok(SourceDau {
                    date: day(&r.day)?,
                    source: r.source,
                    dau: r.dau,
                })
            })
            .collect()
    }

    async fn daily_feed_by_source(&self, before: NaiveDate) -> Result<Vec<SourceFeed>> {
        let sql = format!(
            "SELECT toString(toDate(time)) AS day,
                    source,
                    countIf(action = 'like') AS likes,
                    countIf(action = 'view') AS views
             FROM {}
             WHERE toDate(time) < toDate(?)
             GROUP BY day, source
             ORDER BY day, source",
            self.feed_table
        );
        let rows: Vec<SourceFeedRow> = self
            .client
            .query(&sql)
            .bind(format_iso(before))
            .fetch_all()
            .await?;
        rows.into_iter()
            .map(|r| {
                Ok(SourceFeed {
                    date: day(&r.day)?,
                    source: r.source,
                    likes: r.likes,
                    views: r.views,
                })
            })
            .collect()
    }

    async fn daily_messages_by_source(&self, before: NaiveDate) -> Result<Vec<SourceMessages>> {
        let sql = format!(
            "SELECT toString(toDate(time)) AS day,
                    source,
                    count() AS sent,
                    uniqExact(user_id) AS senders
             FROM {}
             WHERE toDate(time) < toDate(?)
             GROUP BY day, source
             ORDER BY day, source",
            self.message_table
        );
        let rows: Vec<SourceMessagesRow> = self
            .client
            .query(&sql)
            .bind(format_iso(before))
            .fetch_all()
            .await?;
        rows.into_iter()
            .map(|r| {
                Ok(SourceMessages {
                    date: day(&r.day)?,
                    source: r.source,
                    sent: r.sent,
                    senders: r.senders,
                })
            })
            .collect()
    }

    async fn cohort_transitions(&self, before: NaiveDate) -> Result<Vec<CohortTransition>> {
        let current_week = format_iso(week_start(before));
        // The second bind drops departed rows landing in the current week:
        // that week is incomplete, so a user missing from it so far is not
        // counted as departed and no bar is drawn for the current Monday.
        let sql = format!(
            "WITH weeks AS (
                 SELECT DISTINCT user_id, toMonday(time) AS week
                 FROM {feed}
                 WHERE toMonday(time) < toDate(?)
             ),
             visited AS (
                 SELECT user_id, groupArray(week) AS weeks_visited
                 FROM weeks
                 GROUP BY user_id
             )
             SELECT toString(addWeeks(w.week, 1)) AS this_week,
                    toString(w.week) AS previous_week,
                    'departed' AS status,
                    -toInt64(uniqExact(v.user_id)) AS users
             FROM visited v
             JOIN weeks w ON v.user_id = w.user_id
             WHERE has(v.weeks_visited, addWeeks(w.week, 1)) = 0
               AND addWeeks(w.week, 1) < toDate(?)
             GROUP BY this_week, previous_week, status

             UNION ALL

             SELECT toString(w.week) AS this_week,
                    toString(addWeeks(w.week, -1)) AS previous_week,
                    if(has(v.weeks_visited, addWeeks(w.week, -1)), 'old', 'new') AS status,
                    toInt64(uniqExact(v.user_id)) AS users
             FROM visited v
             JOIN weeks w ON v.user_id = w.user_id
             GROUP BY this_week, previous_week, status",
            feed = self.feed_table
        );
        let rows: Vec<CohortRow> = self
            .client
            .query(&sql)
            .bind(&current_week)
            .bind(&current_week)
            .fetch_all()
            .await?;

        let mut transitions = rows
            .into_iter()
            .map(|r| {
                let status = CohortStatus::parse(&r.status)
                    .ok_or_else(|| Error::Store(format!("unknown cohort status '{}'", r.status)))?;
                Ok(CohortTransition {
                    this_week: day(&r.this_week)?,
                    previous_week: day(&r.previous_week)?,
                    status,
                    users: r.users,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        transitions.sort_by_key(|t| (t.this_week, t.status));
        Ok(transitions)
    }

    async fn daily_feed_totals(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<FeedTotals>> {
        let sql = format!(
            "SELECT toString(toDate(time)) AS day,
                    uniqExact(user_id) AS dau,
                    countIf(action = 'view') AS views,
                    countIf(action = 'like') AS likes
             FROM {}
             WHERE toDate(time) BETWEEN toDate(?) AND toDate(?)
             GROUP BY day
             ORDER BY day",
            self.feed_table
        );
        let rows: Vec<FeedTotalsRow> = self
            .client
            .query(&sql)
            .bind(format_iso(start))
            .bind(format_iso(end))
            .fetch_all()
            .await?;
        rows.into_iter()
            .map(|r| {
                Ok(FeedTotals {
                    date: day(&r.day)?,
                    dau: r.dau,
                    views: r.views,
                    likes: r.likes,
                })
            })
            .collect()
    }

    async fn daily_messaging_totals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MessagingTotals>> {
        let sql = format!(
            "SELECT toString(toDate(time)) AS day,
                    count() AS sent,
                    uniqExact(user_id) AS dau
             FROM {}
             WHERE toDate(time) BETWEEN toDate(?) AND toDate(?)
             GROUP BY day
             ORDER BY day",
            self.message_table
        );
        let rows: Vec<MessagingTotalsRow> = self
            .client
            .query(&sql)
            .bind(format_iso(start))
            .bind(format_iso(end))
            .fetch_all()
            .await?;
        rows.into_iter()
            .map(|r| {
                Ok(MessagingTotals {
                    date: day(&r.day)?,
                    sent: r.sent,
                    dau: r.dau,
                })
            })
            .collect()
    }

    async fn messages_per_user_day(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UserDayMessages>> {
        let sql = format!(
            "SELECT toString(toDate(time)) AS day, count() AS sent
             FROM {}
             WHERE toDate(time) BETWEEN toDate(?) AND toDate(?)
             GROUP BY day, user_id
             ORDER BY day",
            self.message_table
        );
        let rows: Vec<UserDayRow> = self
            .client
            .query(&sql)
            .bind(format_iso(start))
            .bind(format_iso(end))
            .fetch_all()
            .await?;
        rows.into_iter()
            .map(|r| {
                Ok(UserDayMessages {
                    date: day(&r.day)?,
                    sent: r.sent,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_uses_configured_tables() {
        let config = StoreConfig {
            feed_table: "feed_v2".into(),
            message_table: "msg_v2".into(),
            ..StoreConfig::default()
        };
        let store = ClickHouseStore::connect(&config);
        let sql = store.union_before();
        assert!(sql.contains("FROM feed_v2"));
        assert!(sql.contains("FROM msg_v2"));
        assert_eq!(sql.matches('?').count(), 2);
    }

    #[test]
    fn test_day_parse_error_is_store_error() {
        assert!(matches!(day("yesterday"), Err(Error::Store(_))));
        assert_eq!(day("2025-07-01").unwrap(), NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }
}
