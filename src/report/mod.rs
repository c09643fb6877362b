//! The four daily reports.
//!
//! Each reporter queries the store, computes its metrics, formats text,
//! optionally renders a chart, and delivers everything through the channel
//! before returning. An empty primary dataset produces a single "no data"
//! text and a normal return.

pub mod feed;
pub mod labels;
pub mod messaging;
pub mod summary;
pub mod trends;

pub use labels::Labels;

use chrono::NaiveDate;

use crate::config::ReportSettings;
use crate::date_util::{format_report_date, yesterday};
use crate::delivery::Channel;
use crate::error::Result;
use crate::metrics::round_to;
use crate::render::{ChartRenderer, Figure};
use crate::store::ActivityStore;

/// Everything one reporter run needs. `today` is the local date of the run;
/// reports describe the day before it.
pub struct ReportContext<'a, S, C, R> {
    pub store: &'a S,
    pub channel: &'a C,
    pub renderer: &'a R,
    pub settings: &'a ReportSettings,
    pub today: NaiveDate,
}

impl<'a, S, C, R> ReportContext<'a, S, C, R>
where
    S: ActivityStore,
    C: Channel,
    R: ChartRenderer,
{
    pub fn new(
        store: &'a S,
        channel: &'a C,
        renderer: &'a R,
        settings: &'a ReportSettings,
        today: NaiveDate,
    ) -> Self {
        Self {
            store,
            channel,
            renderer,
            settings,
            today,
        }
    }

    pub fn labels(&self) -> &'static Labels {
        Labels::for_locale(self.settings.locale)
    }

    /// Localized `<dd> <month> <yyyy>` for yesterday.
    pub fn report_date(&self) -> String {
        format_report_date(yesterday(self.today), self.settings.locale)
    }

    async fn send_no_data(&self, report: &str) -> Result<()> {
        log::warn!("No data for {} report (today = {})", report, self.today);
        self.channel.send_text(self.labels().no_data).await
    }

    /// Caption message first, then the rendered figure.
    async fn send_chart(&self, caption: &str, figure: &Figure) -> Result<()> {
        let image = self.renderer.render(figure)?;
        self.channel.send_text(caption).await?;
        self.channel.send_image(&image, None).await
    }
}

/// Counts print without decimals, ratios with at most two.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{}", round_to(value, 2))
    }
}

pub fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;
    use crate::render::{ChartImage, Figure};

    /// Records figures instead of rasterizing them.
    #[derive(Default)]
    pub struct StubRenderer {
        pub figures: RefCell<Vec<Figure>>,
    }

    impl ChartRenderer for StubRenderer {
        fn render(&self, figure: &Figure) -> Result<ChartImage> {
            figure.validate()?;
            self.figures.borrow_mut().push(figure.clone());
            Ok(ChartImage {
                file_name: figure.file_name.clone(),
                bytes: figure.title.as_bytes().to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(140.0), "140");
        assert_eq!(format_value(2.3456), "2.35");
        assert_eq!(format_value(3.5), "3.5");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(12)), "12");
        assert_eq!(format_optional::<u64>(None), "n/a");
    }
}
