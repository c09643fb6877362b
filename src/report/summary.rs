use std::fmt::Write;

use super::{format_optional, Labels, ReportContext};
use crate::delivery::Channel;
use crate::error::Result;
use crate::metrics::{summarize, SourceSplit, SummaryMetrics};
use crate::render::ChartRenderer;
use crate::store::ActivityStore;

fn share(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}%"),
        None => "n/a".to_string(),
    }
}

fn split_block(out: &mut String, labels: &Labels, header: &str, split: &SourceSplit<u64>) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}  {}", labels.paid_traffic, format_optional(split.paid));
    let _ = writeln!(out, "{}  {}", labels.organic_traffic, format_optional(split.organic));
}

/// Fixed-template summary text.
pub fn format_summary(labels: &Labels, report_date: &str, metrics: &SummaryMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {report_date}", labels.summary_header);
    let _ = writeln!(out, "{}", labels.totals_header);
    let _ = writeln!(out, "{} {}", labels.unique_users, metrics.total_users);
    let _ = writeln!(out, "{}  {}", labels.paid_share, share(metrics.shares.paid));
    let _ = writeln!(out, "{}  {}", labels.organic_share, share(metrics.shares.organic));
    split_block(&mut out, labels, labels.likes_median_header, &metrics.likes_median);
    split_block(&mut out, labels, labels.views_median_header, &metrics.views_median);
    split_block(&mut out, labels, labels.messages_median_header, &metrics.messages_median);
    out
}

impl<S, C, R> ReportContext<'_, S, C, R>
where
    S: ActivityStore,
    C: Channel,
    R: ChartRenderer,
{
    pub async fn summary_metrics(&self) -> Result<SummaryMetrics> {
        let total_users = self.store.total_users(self.today).await?;
        let by_source = self.store.users_by_source(self.today).await?;
        let feed = self.store.feed_counts_per_user(self.today).await?;
        let messages = self.store.message_counts_per_user(self.today).await?;
        Ok(summarize(total_users, &by_source, &feed, &messages, self.settings))
    }

    /// Lifetime metrics as one text message.
    pub async fn summary(&self) -> Result<()> {
        log::info!("Building summary report for {}", self.today);
        let metrics = self.summary_metrics().await?;
        let text = format_summary(self.labels(), &self.report_date(), &metrics);
        self.channel.send_text(&text).await
    }
}
