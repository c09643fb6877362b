use chrono::NaiveDate;
use serde::Serialize;

/// Change of a value against its baseline.
///
/// `Undefined` covers a zero, missing or non-finite baseline and renders as
/// `n/a`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Deviation {
    Defined(f64),
    Undefined,
}

impl Deviation {
    pub fn value(self) -> Option<f64> {
        match self {
            Deviation::Defined(v) => Some(v),
            Deviation::Undefined => None,
        }
    }
}

/// How a deviation is labelled in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeUnit {
    /// Relative change, `+40%`.
    Percent,
    /// Difference of two percentages, `−0.120 п.п.`.
    PercentagePoints,
}

/// A value split into the paid and organic sources. `None` when the source
/// has no data.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SourceSplit<T> {
    pub paid: Option<T>,
    pub organic: Option<T>,
}

/// Lifetime metrics behind the summary text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_users: u64,
    /// Percentage of users per source, rounded to 2 decimals.
    pub shares: SourceSplit<f64>,
    pub likes_median: SourceSplit<u64>,
    pub views_median: SourceSplit<u64>,
    pub messages_median: SourceSplit<u64>,
}

/// Yesterday's value against the trailing baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub yesterday: f64,
    /// Truncated mean of the days before yesterday.
    pub baseline: Option<f64>,
    pub change: Deviation,
}

/// CTR comparison, both sides in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CtrComparison {
    pub yesterday_pct: Option<f64>,
    pub baseline_pct: Option<f64>,
    /// Difference in percentage points.
    pub change: Deviation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedDay {
    pub date: NaiveDate,
    pub dau: u64,
    pub views: u64,
    pub likes: u64,
    /// `likes / views`; `None` when there were no views.
    pub ctr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedDigest {
    pub days: Vec<FeedDay>,
    pub dau: Comparison,
    pub views: Comparison,
    pub likes: Comparison,
    pub ctr: CtrComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagingDay {
    pub date: NaiveDate,
    pub dau: u64,
    pub sent: u64,
    pub mean_per_user: f64,
    pub median_per_user: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagingDigest {
    pub days: Vec<MessagingDay>,
    pub dau: Comparison,
    pub sent: Comparison,
    pub mean_per_user: Comparison,
    pub median_per_user: Comparison,
}

impl FeedDigest {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }
}

impl MessagingDigest {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }
}
