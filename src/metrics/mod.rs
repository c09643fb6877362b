pub mod types;

pub use types::*;

use std::collections::BTreeMap;

use crate::config::ReportSettings;
use crate::store::{
    FeedTotals, MessagingTotals, SourceUsers, UserDayMessages, UserFeedCounts, UserMessageCounts,
};

/// Round to `decimals` places, halves to even (`0.125` -> `0.12`).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// 50th percentile with linear interpolation between the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = (sorted.len() - 1) as f64 * 0.5;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// `(current - baseline) / baseline * 100`, rounded to 2 decimals.
pub fn relative_change(current: f64, baseline: f64) -> Deviation {
    if baseline == 0.0 || !baseline.is_finite() || !current.is_finite() {
        return Deviation::Undefined;
    }
    Deviation::Defined(round_to((current - baseline) / baseline * 100.0, 2))
}

/// Change between two percentages, `(current - baseline) / baseline`,
/// rounded to 3 decimals.
pub fn point_change(current_pct: Option<f64>, baseline_pct: Option<f64>) -> Deviation {
    match (current_pct, baseline_pct) {
        (Some(c), Some(b)) if b != 0.0 && b.is_finite() && c.is_finite() => {
            Deviation::Defined(round_to((c - b) / b, 3))
        }
        _ => Deviation::Undefined,
    }
}

/// Render a deviation the way report lines show it: `+40%`, `−3%`, `0%`,
/// `+0.125 п.п.` or `n/a`. Negative values use U+2212.
pub fn format_change(change: Deviation, unit: ChangeUnit) -> String {
    let value = match change {
        Deviation::Defined(v) => v,
        Deviation::Undefined => return "n/a".to_string(),
    };
    let sign = if value > 0.0 {
        "+"
    } else if value < 0.0 {
        "\u{2212}"
    } else {
        ""
    };
    match unit {
        ChangeUnit::Percent => format!("{sign}{:.0}%", value.abs()),
        ChangeUnit::PercentagePoints => format!("{sign}{:.3} п.п.", value.abs()),
    }
}

/// `part / total * 100` rounded to 2 decimals, `None` for an empty total.
pub fn share(part: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(round_to(part as f64 / total as f64 * 100.0, 2))
}

/// Compare yesterday's value against the truncated mean of the prior days.
pub fn compare(yesterday: f64, prior: &[f64]) -> Comparison {
    let baseline = mean(prior).map(f64::trunc);
    let change = match baseline {
        Some(b) => relative_change(yesterday, b),
        None => Deviation::Undefined,
    };
    Comparison {
        yesterday,
        baseline,
        change,
    }
}

fn median_of_source<T>(
    rows: &[T],
    source: &str,
    key: impl Fn(&T) -> (&str, u64),
) -> Option<u64> {
    let values: Vec<f64> = rows
        .iter()
        .map(&key)
        .filter(|(s, _)| *s == source)
        .map(|(_, v)| v as f64)
        .collect();
    median(&values).map(|m| m.trunc() as u64)
}

fn split<T>(
    rows: &[T],
    settings: &ReportSettings,
    key: impl Fn(&T) -> (&str, u64),
) -> SourceSplit<u64> {
    SourceSplit {
        paid: median_of_source(rows, &settings.paid_source, &key),
        organic: median_of_source(rows, &settings.organic_source, &key),
    }
}

/// Lifetime summary: user shares and per-user medians by source.
///
/// Sources are looked up by the configured names; any other source only
/// contributes to the share denominator.
pub fn summarize(
    total_users: u64,
    by_source: &[SourceUsers],
    feed: &[UserFeedCounts],
    messages: &[UserMessageCounts],
    settings: &ReportSettings,
) -> SummaryMetrics {
    let source_total: u64 = by_source.iter().map(|s| s.users).sum();
    let share_of = |name: &str| {
        by_source
            .iter()
            .find(|s| s.source == name)
            .and_then(|s| share(s.users, source_total))
    };

    SummaryMetrics {
        total_users,
        shares: SourceSplit {
            paid: share_of(&settings.paid_source),
            organic: share_of(&settings.organic_source),
        },
        likes_median: split(feed, settings, |r| (r.source.as_str(), r.likes)),
        views_median: split(feed, settings, |r| (r.source.as_str(), r.views)),
        messages_median: split(messages, settings, |r| (r.source.as_str(), r.sent)),
    }
}

/// Feed metrics for the trailing window. The last day is "yesterday", the
/// rest form the baseline. `None` when the window has no rows.
pub fn feed_digest(rows: &[FeedTotals]) -> Option<FeedDigest> {
    let mut days: Vec<FeedDay> = rows
        .iter()
        .map(|r| FeedDay {
            date: r.date,
            dau: r.dau,
            views: r.views,
            likes: r.likes,
            ctr: (r.views > 0).then(|| r.likes as f64 / r.views as f64),
        })
        .collect();
    days.sort_by_key(|d| d.date);

    let (last, prior) = days.split_last()?;
    let column = |f: fn(&FeedDay) -> u64| {
        prior.iter().map(|d| f(d) as f64).collect::<Vec<_>>()
    };

    let prior_ctr: Vec<f64> = prior.iter().filter_map(|d| d.ctr).collect();
    let yesterday_pct = last.ctr.map(|c| round_to(c * 100.0, 2));
    let baseline_pct = mean(&prior_ctr).map(|m| round_to(m * 100.0, 2));

    let dau = compare(last.dau as f64, &column(|d| d.dau));
    let views = compare(last.views as f64, &column(|d| d.views));
    let likes = compare(last.likes as f64, &column(|d| d.likes));
    let ctr = CtrComparison {
        yesterday_pct,
        baseline_pct,
        change: point_change(yesterday_pct, baseline_pct),
    };

    Some(FeedDigest {
        days,
        dau,
        views,
        likes,
        ctr,
    })
}

/// Join per-date totals with the per-(date, user) distribution.
///
/// Dates without per-user rows are dropped.
pub fn join_messaging_days(
    totals: &[MessagingTotals],
    per_user: &[UserDayMessages],
) -> Vec<MessagingDay> {
    let mut by_date: BTreeMap<_, Vec<f64>> = BTreeMap::new();
    for row in per_user {
        by_date.entry(row.date).or_default().push(row.sent as f64);
    }

    let mut days: Vec<MessagingDay> = totals
        .iter()
        .filter_map(|t| {
            let median_per_user = median(by_date.get(&t.date)?)?;
            let mean_per_user = if t.dau == 0 {
                0.0
            } else {
                round_to(t.sent as f64 / t.dau as f64, 2)
            };
            Some(MessagingDay {
                date: t.date,
                dau: t.dau,
                sent: t.sent,
                mean_per_user,
                median_per_user,
            })
        })
        .collect();
    days.sort_by_key(|d| d.date);
    days
}

/// Messaging metrics for the trailing window, `None` when there are no days.
pub fn messaging_digest(days: Vec<MessagingDay>) -> Option<MessagingDigest> {
    let (last, prior) = days.split_last()?;
    let column = |f: fn(&MessagingDay) -> f64| prior.iter().map(f).collect::<Vec<_>>();

    let dau = compare(last.dau as f64, &column(|d| d.dau as f64));
    let sent = compare(last.sent as f64, &column(|d| d.sent as f64));
    let mean_per_user = compare(last.mean_per_user, &column(|d| d.mean_per_user));
    let median_per_user = compare(last.median_per_user, &column(|d| d.median_per_user));

    Some(MessagingDigest {
        days,
        dau,
        sent,
        mean_per_user,
        median_per_user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::d;

    fn feed_rows(dau: &[u64]) -> Vec<FeedTotals> {
        dau.iter()
            .enumerate()
            .map(|(i, &dau)| FeedTotals {
                date: d(2025, 7, 1 + i as u32),
                dau,
                views: dau * 10,
                likes: dau * 2,
            })
            .collect()
    }

    #[test]
    fn test_median_interpolates() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[5.0]), Some(5.0));
        assert_eq!(median(&[7.0, 3.0]), Some(5.0));
        assert_eq!(median(&[9.0, 1.0, 5.0, 3.0, 7.0]), Some(5.0));
        assert_eq!(median(&[1.0, 2.0, 3.0, 10.0]), Some(2.5));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(40.004, 2), 40.0);
        assert_eq!(round_to(0.12345, 3), 0.123);
        assert_eq!(round_to(-2.555, 1), -2.6);
    }

    #[test]
    fn test_round_to_ties_go_to_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(-0.125, 2), -0.12);
    }

    #[test]
    fn test_relative_change_zero_baseline() {
        assert_eq!(relative_change(10.0, 0.0), Deviation::Undefined);
        assert_eq!(relative_change(10.0, f64::NAN), Deviation::Undefined);
        assert_eq!(relative_change(110.0, 100.0), Deviation::Defined(10.0));
    }

    #[test]
    fn test_format_change_signs() {
        assert_eq!(format_change(Deviation::Defined(40.0), ChangeUnit::Percent), "+40%");
        assert_eq!(
            format_change(Deviation::Defined(-3.4), ChangeUnit::Percent),
            "\u{2212}3%"
        );
        assert_eq!(format_change(Deviation::Defined(0.0), ChangeUnit::Percent), "0%");
        assert_eq!(
            format_change(Deviation::Defined(0.125), ChangeUnit::PercentagePoints),
            "+0.125 п.п."
        );
        assert_eq!(
            format_change(Deviation::Defined(-0.05), ChangeUnit::PercentagePoints),
            "\u{2212}0.050 п.п."
        );
        assert_eq!(format_change(Deviation::Undefined, ChangeUnit::Percent), "n/a");
    }

    #[test]
    fn test_dau_window_baseline_and_delta() {
        let digest = feed_digest(&feed_rows(&[100, 105, 98, 102, 97, 101, 99, 140])).unwrap();
        assert_eq!(digest.dau.yesterday, 140.0);
        assert_eq!(digest.dau.baseline, Some(100.0));
        assert_eq!(digest.dau.change, Deviation::Defined(40.0));
        assert_eq!(format_change(digest.dau.change, ChangeUnit::Percent), "+40%");
        assert_eq!(digest.first_date(), Some(d(2025, 7, 1)));
        assert_eq!(digest.last_date(), Some(d(2025, 7, 8)));
    }

    #[test]
    fn test_feed_digest_ctr() {
        let rows = vec![
            FeedTotals { date: d(2025, 7, 1), dau: 10, views: 100, likes: 20 },
            FeedTotals { date: d(2025, 7, 2), dau: 10, views: 100, likes: 10 },
            FeedTotals { date: d(2025, 7, 3), dau: 10, views: 200, likes: 30 },
        ];
        let digest = feed_digest(&rows).unwrap();
        for day in &digest.days {
            let ctr = day.ctr.unwrap();
            assert!((0.0..=1.0).contains(&ctr));
        }
        assert_eq!(digest.ctr.yesterday_pct, Some(15.0));
        assert_eq!(digest.ctr.baseline_pct, Some(15.0));
        assert_eq!(digest.ctr.change, Deviation::Defined(0.0));
    }

    #[test]
    fn test_feed_digest_ctr_without_views() {
        let rows = vec![
            FeedTotals { date: d(2025, 7, 1), dau: 3, views: 0, likes: 0 },
            FeedTotals { date: d(2025, 7, 2), dau: 4, views: 10, likes: 1 },
        ];
        let digest = feed_digest(&rows).unwrap();
        assert_eq!(digest.days[0].ctr, None);
        assert_eq!(digest.ctr.baseline_pct, None);
        assert_eq!(digest.ctr.change, Deviation::Undefined);
    }

    #[test]
    fn test_zero_baseline_gives_undefined_everywhere() {
        let rows = vec![
            FeedTotals { date: d(2025, 7, 1), dau: 0, views: 0, likes: 0 },
            FeedTotals { date: d(2025, 7, 2), dau: 5, views: 40, likes: 4 },
        ];
        let digest = feed_digest(&rows).unwrap();
        assert_eq!(digest.dau.change, Deviation::Undefined);
        assert_eq!(digest.views.change, Deviation::Undefined);
        assert_eq!(digest.likes.change, Deviation::Undefined);
        assert_eq!(digest.ctr.change, Deviation::Undefined);
    }

    #[test]
    fn test_single_day_has_no_baseline() {
        let digest = feed_digest(&feed_rows(&[50])).unwrap();
        assert_eq!(digest.dau.baseline, None);
        assert_eq!(digest.dau.change, Deviation::Undefined);
    }

    #[test]
    fn test_feed_digest_empty() {
        assert!(feed_digest(&[]).is_none());
    }

    #[test]
    fn test_join_messaging_days() {
        let totals = vec![
            MessagingTotals { date: d(2025, 7, 1), sent: 8, dau: 2 },
            MessagingTotals { date: d(2025, 7, 2), sent: 7, dau: 1 },
        ];
        let per_user = vec![
            UserDayMessages { date: d(2025, 7, 1), sent: 3 },
            UserDayMessages { date: d(2025, 7, 1), sent: 5 },
            UserDayMessages { date: d(2025, 7, 2), sent: 7 },
        ];
        let days = join_messaging_days(&totals, &per_user);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].median_per_user, 4.0);
        assert_eq!(days[0].mean_per_user, 4.0);
        assert_eq!(days[1].median_per_user, 7.0);
        assert_eq!(days[1].mean_per_user, 7.0);
    }

    #[test]
    fn test_join_drops_dates_without_distribution() {
        let totals = vec![
            MessagingTotals { date: d(2025, 7, 1), sent: 3, dau: 3 },
            MessagingTotals { date: d(2025, 7, 2), sent: 7, dau: 1 },
        ];
        let per_user = vec![UserDayMessages { date: d(2025, 7, 2), sent: 7 }];
        let days = join_messaging_days(&totals, &per_user);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, d(2025, 7, 2));
    }

    #[test]
    fn test_messaging_digest() {
        let days: Vec<MessagingDay> = [(10, 30), (10, 20), (20, 60)]
            .iter()
            .enumerate()
            .map(|(i, &(dau, sent))| MessagingDay {
                date: d(2025, 7, 1 + i as u32),
                dau,
                sent,
                mean_per_user: round_to(sent as f64 / dau as f64, 2),
                median_per_user: 2.0,
            })
            .collect();
        let digest = messaging_digest(days).unwrap();
        assert_eq!(digest.dau.baseline, Some(10.0));
        assert_eq!(digest.dau.change, Deviation::Defined(100.0));
        assert_eq!(digest.sent.baseline, Some(25.0));
        assert_eq!(digest.sent.change, Deviation::Defined(140.0));
        // mean of 3.0 and 2.0 is 2.5, truncated to 2
        assert_eq!(digest.mean_per_user.baseline, Some(2.0));
        assert_eq!(digest.mean_per_user.change, Deviation::Defined(50.0));
        assert_eq!(digest.median_per_user.change, Deviation::Defined(0.0));
        assert!(messaging_digest(Vec::new()).is_none());
    }

    #[test]
    fn test_summarize_looks_up_sources_by_name() {
        let settings = ReportSettings::default();
        let by_source = vec![
            SourceUsers { source: "organic".into(), users: 60 },
            SourceUsers { source: "ads".into(), users: 40 },
        ];
        let feed = vec![
            UserFeedCounts { source: "ads".into(), likes: 1, views: 10 },
            UserFeedCounts { source: "ads".into(), likes: 4, views: 15 },
            UserFeedCounts { source: "organic".into(), likes: 2, views: 7 },
        ];
        let messages = vec![UserMessageCounts { source: "organic".into(), sent: 9 }];

        let summary = summarize(95, &by_source, &feed, &messages, &settings);
        assert_eq!(summary.total_users, 95);
        assert_eq!(summary.shares.paid, Some(40.0));
        assert_eq!(summary.shares.organic, Some(60.0));
        // (1 + 4) / 2 = 2.5 truncated
        assert_eq!(summary.likes_median.paid, Some(2));
        assert_eq!(summary.views_median.paid, Some(12));
        assert_eq!(summary.views_median.organic, Some(7));
        assert_eq!(summary.messages_median.paid, None);
        assert_eq!(summary.messages_median.organic, Some(9));
    }

    #[test]
    fn test_summarize_missing_source() {
        let settings = ReportSettings::default();
        let by_source = vec![SourceUsers { source: "organic".into(), users: 3 }];
        let summary = summarize(3, &by_source, &[], &[], &settings);
        assert_eq!(summary.shares.paid, None);
        assert_eq!(summary.shares.organic, Some(100.0));
        assert_eq!(summary.likes_median, SourceSplit::default());
    }

    #[test]
    fn test_share_zero_total() {
        assert_eq!(share(0, 0), None);
        assert_eq!(share(1, 3), Some(33.33));
    }

    #[test]
    fn test_share_half_cent_rounds_to_even() {
        assert_eq!(share(1, 32), Some(3.12));
        assert_eq!(share(5, 32), Some(15.62));
        assert_eq!(share(3, 32), Some(9.38));
    }
}
