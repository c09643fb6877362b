use std::fmt::Write;

use super::{format_value, Labels, ReportContext};
use crate::date_util::trailing_window;
use crate::delivery::Channel;
use crate::error::Result;
use crate::metrics::{feed_digest, format_change, ChangeUnit, Comparison, FeedDay, FeedDigest};
use crate::render::{ChartRenderer, Figure, Layout, Panel, PanelKind};
use crate::store::ActivityStore;

fn line(out: &mut String, label: &str, c: &Comparison) {
    let _ = writeln!(
        out,
        "{label} {} ({})",
        format_value(c.yesterday),
        format_change(c.change, ChangeUnit::Percent)
    );
}

pub fn format_feed(labels: &Labels, report_date: &str, digest: &FeedDigest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {report_date}", labels.feed_header);
    let _ = writeln!(out, "{}", labels.comparison_note(digest.days.len() - 1));
    line(&mut out, "- DAU:", &digest.dau);
    line(&mut out, labels.views_line, &digest.views);
    line(&mut out, labels.likes_line, &digest.likes);
    let ctr = match digest.ctr.yesterday_pct {
        Some(pct) => format!("{}%", format_value(pct)),
        None => "n/a".to_string(),
    };
    let _ = writeln!(
        out,
        "- CTR: {ctr} ({})",
        format_change(digest.ctr.change, ChangeUnit::PercentagePoints)
    );
    out
}

/// DAU and CTR as bars, likes and views as lines. Days without views plot
/// a CTR of zero.
pub fn feed_figure(labels: &Labels, digest: &FeedDigest) -> Figure {
    let points = |f: fn(&FeedDay) -> f64| {
        digest.days.iter().map(|d| (d.date, f(d))).collect::<Vec<_>>()
    };
    Figure {
        title: labels.feed_title.to_string(),
        file_name: "feed.png".to_string(),
        layout: Layout::Grid2x2,
        panels: vec![
            Panel::dated(
                labels.dau_title,
                labels.axis_date,
                labels.axis_users,
                PanelKind::Bar,
                1.8,
                &points(|d| d.dau as f64),
            ),
            Panel::dated(
                labels.likes_title,
                labels.axis_date,
                labels.axis_likes,
                PanelKind::Line,
                1.2,
                &points(|d| d.likes as f64),
            ),
            Panel::dated(
                labels.views_title,
                labels.axis_date,
                labels.axis_views,
                PanelKind::Line,
                1.2,
                &points(|d| d.views as f64),
            ),
            Panel::dated(
                labels.ctr_title,
                labels.axis_date,
                labels.ctr_title,
                PanelKind::Bar,
                1.8,
                &points(|d| d.ctr.unwrap_or(0.0)),
            ),
        ],
    }
}

impl<S, C, R> ReportContext<'_, S, C, R>
where
    S: ActivityStore,
    C: Channel,
    R: ChartRenderer,
{
    pub async fn feed_digest(&self) -> Result<Option<FeedDigest>> {
        let (start, end) = trailing_window(self.today, self.settings.window_days);
        let rows = self.store.daily_feed_totals(start, end).await?;
        Ok(feed_digest(&rows))
    }

    /// Yesterday's feed metrics against the trailing window, then the chart.
    pub async fn feed(&self) -> Result<()> {
        log::info!("Building feed report for {}", self.today);
        let Some(digest) = self.feed_digest().await? else {
            return self.send_no_data("feed").await;
        };

        let labels = self.labels();
        let text = format_feed(labels, &self.report_date(), &digest);
        self.channel.send_text(&text).await?;

        let caption = match (digest.first_date(), digest.last_date()) {
            (Some(first), Some(last)) => {
                format!("{} {}", labels.feed_caption, labels.date_range(first, last))
            }
            _ => labels.feed_caption.to_string(),
        };
        self.send_chart(&caption, &feed_figure(labels, &digest)).await
    }
}
