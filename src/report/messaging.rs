use std::fmt::Write;

use chrono::NaiveDate;

use super::{format_value, Labels, ReportContext};
use crate::date_util::trailing_window;
use crate::delivery::Channel;
use crate::error::Result;
use crate::metrics::{
    format_change, join_messaging_days, messaging_digest, ChangeUnit, Comparison, MessagingDay,
    MessagingDigest,
};
use crate::render::{ChartRenderer, Figure, Layout, Panel, PanelKind};
use crate::store::ActivityStore;

const HEADROOM: f64 = 1.2;

fn line(out: &mut String, label: &str, c: &Comparison) {
    let _ = writeln!(
        out,
        "{label} {} ({})",
        format_value(c.yesterday),
        format_change(c.change, ChangeUnit::Percent)
    );
}

pub fn format_messaging(labels: &Labels, report_date: &str, digest: &MessagingDigest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {report_date}", labels.messaging_header);
    let _ = writeln!(out, "{}", labels.comparison_note(digest.days.len() - 1));
    line(&mut out, "- DAU:", &digest.dau);
    line(&mut out, labels.messages_line, &digest.sent);
    line(&mut out, labels.median_line, &digest.median_per_user);
    line(&mut out, labels.mean_line, &digest.mean_per_user);
    out
}

pub fn messaging_figure(labels: &Labels, digest: &MessagingDigest) -> Figure {
    let points = |f: fn(&MessagingDay) -> f64| {
        digest.days.iter().map(|d| (d.date, f(d))).collect::<Vec<_>>()
    };
    let panel = |title: &str, y_desc: &str, kind: PanelKind, values: Vec<(NaiveDate, f64)>| {
        Panel::dated(title, labels.axis_date, y_desc, kind, HEADROOM, &values)
    };
    Figure {
        title: labels.messaging_title.to_string(),
        file_name: "messaging.png".to_string(),
        layout: Layout::Grid2x2,
        panels: vec![
            panel(labels.dau_title, labels.axis_users, PanelKind::Bar, points(|d| d.dau as f64)),
            panel(
                labels.messages_title,
                labels.axis_messages,
                PanelKind::Line,
                points(|d| d.sent as f64),
            ),
            panel(
                labels.mean_title,
                labels.axis_messages,
                PanelKind::Line,
                points(|d| d.mean_per_user),
            ),
            panel(
                labels.median_title,
                labels.axis_messages,
                PanelKind::Line,
                points(|d| d.median_per_user),
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
    pub async fn messaging_digest(&self) -> Result<Option<MessagingDigest>> {
        let (start, end) = trailing_window(self.today, self.settings.window_days);
        let totals = self.store.daily_messaging_totals(start, end).await?;
        let per_user = self.store.messages_per_user_day(start, end).await?;
        Ok(messaging_digest(join_messaging_days(&totals, &per_user)))
    }

    /// Yesterday's messenger metrics against the trailing window, then the chart.
    pub async fn messaging(&self) -> Result<()> {
        log::info!("Building messaging report for {}", self.today);
        let Some(digest) = self.messaging_digest().await? else {
            return self.send_no_data("messaging").await;
        };

        let labels = self.labels();
        let text = format_messaging(labels, &self.report_date(), &digest);
        self.channel.send_text(&text).await?;

        let caption = match (digest.first_date(), digest.last_date()) {
            (Some(first), Some(last)) => format!(
                "{} {}",
                labels.messaging_caption,
                labels.date_range(first, last)
            ),
            _ => labels.messaging_caption.to_string(),
        };
        self.send_chart(&caption, &messaging_figure(labels, &digest)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Locale, ReportSettings};
    use crate::delivery::{Delivered, RecordingChannel};
    use crate::report::labels::RU;
    use crate::report::testing::StubRenderer;
    use crate::store::memory::fixtures::{d, rec};
    use crate::store::{Action, ActivityRecord, MemoryStore};

    fn messages(user_id: u64, day: u32, n: usize) -> Vec<ActivityRecord> {
        (0..n)
            .map(|i| rec(user_id, d(2025, 7, day), 9 + i as u32 % 10, "organic", Action::Message))
            .collect()
    }

    #[tokio::test]
    async fn test_messaging_report() {
        let mut records = Vec::new();
        records.extend(messages(1, 16, 3));
        records.extend(messages(2, 16, 5));
        records.extend(messages(2, 17, 6));
        // feed activity does not count
        records.push(rec(3, d(2025, 7, 17), 9, "organic", Action::View));
        let store = MemoryStore::new(records);
        let channel = RecordingChannel::new();
        let renderer = StubRenderer::default();
        let settings = ReportSettings::default();
        ReportContext::new(&store, &channel, &renderer, &settings, d(2025, 7, 18))
            .messaging()
            .await
            .unwrap();

        let sent = channel.messages();
        assert_eq!(sent.len(), 3);
        let expected = "\
Метрики в мессенджере за 17 июля 2025
(в скобках — изменение вчерашних значений по сравнению со средним значением за предыдущие 1 день):
- DAU: 1 (−50%)
- Количество отправленных сообщений: 6 (−25%)
- Медиана: 6 (+50%)
- Среднее: 6 (+50%)
";
        assert_eq!(sent[0].as_text().unwrap(), expected);
        assert_eq!(
            sent[1],
            Delivered::Text(format!("{} с 2025-07-16 по 2025-07-17", RU.messaging_caption))
        );
        assert!(sent[2].is_image());

        let figures = renderer.figures.borrow();
        let median = &figures[0].panels[3];
        assert_eq!(median.series[0].values, vec![Some(4.0), Some(6.0)]);
        assert!(figures[0].panels.iter().all(|p| p.headroom == HEADROOM));
    }

    #[tokio::test]
    async fn test_messaging_no_data() {
        let store = MemoryStore::new(vec![rec(1, d(2025, 7, 17), 9, "ads", Action::View)]);
        let channel = RecordingChannel::new();
        let renderer = StubRenderer::default();
        let settings = ReportSettings {
            locale: Locale::En,
            ..ReportSettings::default()
        };
        ReportContext::new(&store, &channel, &renderer, &settings, d(2025, 7, 18))
            .messaging()
            .await
            .unwrap();

        assert_eq!(
            channel.messages(),
            vec![Delivered::Text("No data for the report.".into())]
        );
    }
}
