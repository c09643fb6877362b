use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

use chrono::{Duration, NaiveDate};

use super::types::*;
use super::ActivityStore;
use crate::date_util::week_start;
use crate::error::{Error, Result};

/// Evaluates every report dataset in-process over a list of raw records.
///
/// Backs the offline `preview` command and the tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ActivityRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<ActivityRecord>) -> Self {
        Self { records }
    }

    /// Load a JSON array of activity records.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Fixture(format!("cannot read {}: {e}", path.display())))?;
        let records: Vec<ActivityRecord> = serde_json::from_str(&content)?;
        log::info!("Loaded {} activity records from {}", records.len(), path.display());
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    fn before(&self, before: NaiveDate) -> impl Iterator<Item = &ActivityRecord> {
        self.records
            .iter()
            .filter(move |r| r.time.date() < before)
    }

    fn within(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = &ActivityRecord> {
        self.records.iter().filter(move |r| {
            let d = r.time.date();
            d >= start && d <= end
        })
    }
}

impl ActivityStore for MemoryStore {
    async fn total_users(&self, before: NaiveDate) -> Result<u64> {
        let users: HashSet<u64> = self.before(before).map(|r| r.user_id).collect();
        Ok(users.len() as u64)
    }

    async fn users_by_source(&self, before: NaiveDate) -> Result<Vec<SourceUsers>> {
        let mut by_source: BTreeMap<&str, HashSet<u64>> = BTreeMap::new();
        for r in self.before(before) {
            by_source.entry(r.source.as_str()).or_default().insert(r.user_id);
        }
        Ok(by_source
            .into_iter()
            .map(|(source, users)| SourceUsers {
                source: source.to_string(),
                users: users.len() as u64,
            })
            .collect())
    }

    async fn feed_counts_per_user(&self, before: NaiveDate) -> Result<Vec<UserFeedCounts>> {
        let mut counts: BTreeMap<(u64, &str), (u64, u64)> = BTreeMap::new();
        for r in self.before(before).filter(|r| r.action.is_feed()) {
            let entry = counts.entry((r.user_id, r.source.as_str())).or_default();
            match r.action {
                Action::Like => entry.0 += 1,
                Action::View => entry.1 += 1,
                Action::Message => {}
            }
        }
        Ok(counts
            .into_iter()
            .map(|((_, source), (likes, views))| UserFeedCounts {
                source: source.to_string(),
                likes,
                views,
            })
            .collect())
    }

    async fn message_counts_per_user(
        &self,
        before: NaiveDate,
    ) -> Result<Vec<UserMessageCounts>> {
        let mut counts: BTreeMap<(u64, &str), u64> = BTreeMap::new();
        for r in self.before(before).filter(|r| r.action == Action::Message) {
            *counts.entry((r.user_id, r.source.as_str())).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((_, source), sent)| UserMessageCounts {
                source: source.to_string(),
                sent,
            })
            .collect())
    }

    async fn daily_users_by_source(&self, before: NaiveDate) -> Result<Vec<SourceDau>> {
        let mut users: BTreeMap<(NaiveDate, &str), HashSet<u64>> = BTreeMap::new();
        for r in self.before(before) {
            users
                .entry((r.time.date(), r.source.as_str()))
                .or_default()
                .insert(r.user_id);
        }
        Ok(users
            .into_iter()
            .map(|((date, source), set)| SourceDau {
                date,
                source: source.to_string(),
                dau: set.len() as u64,
            })
            .collect())
    }

    async fn daily_feed_by_source(&self, before: NaiveDate) -> Result<Vec<SourceFeed>> {
        let mut counts: BTreeMap<(NaiveDate, &str), (u64, u64)> = BTreeMap::new();
        for r in self.before(before).filter(|r| r.action.is_feed()) {
            let entry = counts.entry((r.time.date(), r.source.as_str())).or_default();
            if r.action == Action::Like {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|((date, source), (likes, views))| SourceFeed {
                date,
                source: source.to_string(),
                likes,
                views,
            })
            .collect())
    }

    async fn daily_messages_by_source(&self, before: NaiveDate) -> Result<Vec<SourceMessages>> {
        let mut counts: BTreeMap<(NaiveDate, &str), (u64, HashSet<u64>)> = BTreeMap::new();
        for r in self.before(before).filter(|r| r.action == Action::Message) {
            let entry = counts.entry((r.time.date(), r.source.as_str())).or_default();
            entry.0 += 1;
            entry.1.insert(r.user_id);
        }
        Ok(counts
            .into_iter()
            .map(|((date, source), (sent, senders))| SourceMessages {
                date,
                source: source.to_string(),
                sent,
                senders: senders.len() as u64,
            })
            .collect())
    }

    async fn cohort_transitions(&self, before: NaiveDate) -> Result<Vec<CohortTransition>> {
        let current_week = week_start(before);
        let mut weeks_by_user: HashMap<u64, BTreeSet<NaiveDate>> = HashMap::new();
        for r in self.records.iter().filter(|r| r.action.is_feed()) {
            let week = week_start(r.time.date());
            if week < current_week {
                weeks_by_user.entry(r.user_id).or_default().insert(week);
            }
        }

        let one_week = Duration::weeks(1);
        let mut buckets: BTreeMap<(NaiveDate, CohortStatus), (NaiveDate, HashSet<u64>)> =
            BTreeMap::new();
        for (&user, weeks) in &weeks_by_user {
            for &week in weeks {
                let next = week + one_week;
                // no departed rows for the incomplete current week
                if !weeks.contains(&next) && next < current_week {
                    buckets
                        .entry((next, CohortStatus::Departed))
                        .or_insert_with(|| (week, HashSet::new()))
                        .1
                        .insert(user);
                }

                let prev = week - one_week;
                let status = if weeks.contains(&prev) {
                    CohortStatus::Old
                } else {
                    CohortStatus::New
                };
                buckets
                    .entry((week, status))
                    .or_insert_with(|| (prev, HashSet::new()))
                    .1
                    .insert(user);
            }
        }

        Ok(buckets
            .into_iter()
            .map(|((this_week, status), (previous_week, users))| {
                let n = users.len() as i64;
                CohortTransition {
                    this_week,
                    previous_week,
                    status,
                    users: if status == CohortStatus::Departed { -n } else { n },
                }
            })
            .collect())
    }

    async fn daily_feed_totals(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<FeedTotals>> {
        let mut days: BTreeMap<NaiveDate, (HashSet<u64>, u64, u64)> = BTreeMap::new();
        for r in self.within(start, end).filter(|r| r.action.is_feed()) {
            let entry = days.entry(r.time.date()).or_default();
            entry.0.insert(r.user_id);
            if r.action == Action::View {
                entry.1 += 1;
            } else {
                entry.2 += 1;
            }
        }
        Ok(days
            .into_iter()
            .map(|(date, (users, views, likes))| FeedTotals {
                date,
                dau: users.len() as u64,
                views,
                likes,
            })
            .collect())
    }

    async fn daily_messaging_totals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MessagingTotals>> {
        let mut days: BTreeMap<NaiveDate, (u64, HashSet<u64>)> = BTreeMap::new();
        for r in self.within(start, end).filter(|r| r.action == Action::Message) {
            let entry = days.entry(r.time.date()).or_default();
            entry.0 += 1;
            entry.1.insert(r.user_id);
        }
        Ok(days
            .into_iter()
            .map(|(date, (sent, users))| MessagingTotals {
                date,
                sent,
                dau: users.len() as u64,
            })
            .collect())
    }

    async fn messages_per_user_day(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UserDayMessages>> {
        let mut counts: BTreeMap<(NaiveDate, u64), u64> = BTreeMap::new();
        for r in self.within(start, end).filter(|r| r.action == Action::Message) {
            *counts.entry((r.time.date(), r.user_id)).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|((date, _), sent)| UserDayMessages { date, sent })
            .collect())
    }
}
