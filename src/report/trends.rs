use chrono::NaiveDate;

use super::{Labels, ReportContext};
use crate::date_util::format_iso;
use crate::delivery::Channel;
use crate::error::Result;
use crate::render::{pivot, ChartRenderer, Figure, Layout, Panel, PanelKind};
use crate::store::{ActivityStore, CohortStatus, CohortTransition, SourceDau, SourceFeed, SourceMessages};

const TREND_HEADROOM: f64 = 1.05;
const AUDIENCE_HEADROOM: f64 = 1.1;

fn by_source_panel(
    labels: &Labels,
    title: &str,
    y_desc: &str,
    rows: impl IntoIterator<Item = (NaiveDate, String, f64)>,
) -> Panel {
    let (dates, series) = pivot(rows);
    Panel {
        title: title.to_string(),
        x_desc: labels.axis_date.to_string(),
        y_desc: y_desc.to_string(),
        kind: PanelKind::Line,
        labels: dates.into_iter().map(format_iso).collect(),
        series,
        headroom: TREND_HEADROOM,
    }
}

/// One wide DAU panel over a grid of likes, views, messages and senders.
pub fn trends_figure(
    labels: &Labels,
    dau: &[SourceDau],
    feed: &[SourceFeed],
    messages: &[SourceMessages],
) -> Figure {
    let panels = vec![
        by_source_panel(
            labels,
            labels.dau_both_platforms,
            labels.axis_users,
            dau.iter().map(|r| (r.date, r.source.clone(), r.dau as f64)),
        ),
        by_source_panel(
            labels,
            labels.feed_likes,
            labels.axis_likes,
            feed.iter().map(|r| (r.date, r.source.clone(), r.likes as f64)),
        ),
        by_source_panel(
            labels,
            labels.feed_views,
            labels.axis_views,
            feed.iter().map(|r| (r.date, r.source.clone(), r.views as f64)),
        ),
        by_source_panel(
            labels,
            labels.messages_sent_title,
            labels.axis_messages,
            messages.iter().map(|r| (r.date, r.source.clone(), r.sent as f64)),
        ),
        by_source_panel(
            labels,
            labels.senders_title,
            labels.axis_users,
            messages.iter().map(|r| (r.date, r.source.clone(), r.senders as f64)),
        ),
    ];
    Figure {
        title: labels.trends_title.to_string(),
        file_name: "trends.png".to_string(),
        layout: Layout::WideTopGrid2x2,
        panels,
    }
}

/// Grouped bars of departed (negative), old and new users per week.
pub fn audience_figure(labels: &Labels, cohorts: &[CohortTransition]) -> Figure {
    let (weeks, mut series) = pivot(
        cohorts
            .iter()
            .map(|c| (c.this_week, c.status, c.users as f64)),
    );
    for s in &mut series {
        if let Some(status) = CohortStatus::parse(&s.name) {
            s.name = labels.cohort_status(status).to_string();
        }
    }
    Figure {
        title: labels.audience_title.to_string(),
        file_name: "audience.png".to_string(),
        layout: Layout::Single,
        panels: vec![Panel {
            title: labels.audience_title.to_string(),
            x_desc: labels.axis_week.to_string(),
            y_desc: labels.axis_users.to_string(),
            kind: PanelKind::Bar,
            labels: weeks.into_iter().map(format_iso).collect(),
            series,
            headroom: AUDIENCE_HEADROOM,
        }],
    }
}

impl<S, C, R> ReportContext<'_, S, C, R>
where
    S: ActivityStore,
    C: Channel,
    R: ChartRenderer,
{
    /// Full-history trend charts and the weekly audience chart.
    pub async fn trends(&self) -> Result<()> {
        log::info!("Building trend charts for {}", self.today);
        let dau = self.store.daily_users_by_source(self.today).await?;
        let feed = self.store.daily_feed_by_source(self.today).await?;
        let messages = self.store.daily_messages_by_source(self.today).await?;
        let cohorts = self.store.cohort_transitions(self.today).await?;

        if dau.is_empty() || feed.is_empty() || messages.is_empty() {
            return self.send_no_data("trends").await;
        }

        let labels = self.labels();
        self.send_chart(labels.trends_caption, &trends_figure(labels, &dau, &feed, &messages))
            .await?;
        self.send_chart(labels.audience_caption, &audience_figure(labels, &cohorts))
            .await?;
        Ok(())
    }
}
