pub mod config;
pub mod date_util;
pub mod delivery;
pub mod error;
pub mod metrics;
pub mod render;
pub mod report;
pub mod schedule;
pub mod store;

pub use config::{Config, Locale, ReportSettings};
pub use delivery::{Channel, DirectoryChannel, RecordingChannel, TelegramChannel};
pub use error::{Error, Result};
pub use render::{ChartImage, ChartRenderer, Figure, PlottersRenderer};
pub use report::ReportContext;
pub use schedule::{DailyTrigger, Job, JobStatus, RetryPolicy, RunReport};
pub use store::{ActivityStore, ClickHouseStore, MemoryStore};

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;

/// Run one report against any store, channel and renderer.
pub async fn run_report<S, C, R>(ctx: &ReportContext<'_, S, C, R>, job: Job) -> Result<()>
where
    S: ActivityStore,
    C: Channel,
    R: ChartRenderer,
{
    match job {
        Job::Summary => ctx.summary().await,
        Job::Trends => ctx.trends().await,
        Job::Feed => ctx.feed().await,
        Job::Messaging => ctx.messaging().await,
    }
}

/// Main entry point: the configured ClickHouse → Telegram pipeline.
pub struct FeedPulse {
    config: Config,
    renderer: PlottersRenderer,
}

impl FeedPulse {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            renderer: PlottersRenderer::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// One attempt of one job. Store and bot clients are created fresh.
    pub async fn run_job(&self, today: NaiveDate, job: Job) -> Result<()> {
        let store = ClickHouseStore::connect(&self.config.store);
        let channel = TelegramChannel::new(self.config.require_telegram()?)?;
        let ctx = ReportContext::new(
            &store,
            &channel,
            &self.renderer,
            &self.config.report,
            today,
        );
        run_report(&ctx, job).await
    }

    /// Run `jobs` in pipeline order with the configured retry policy.
    pub async fn run(&self, today: NaiveDate, jobs: &[Job]) -> RunReport {
        let policy = self.config.schedule.retry_policy();
        schedule::run_jobs(today, jobs, &policy, move |job| self.run_job(today, job)).await
    }

    /// Wait for each daily trigger and run the full pipeline.
    pub async fn daemon(&self) -> Result<()> {
        let trigger = self.config.schedule.trigger()?;
        self.config.require_telegram()?;
        log::info!("Scheduler started, {trigger}");
        schedule::run_forever(trigger, move |today| self.run(today, &Job::ALL)).await;
        Ok(())
    }
}

/// Render every report from a JSON fixture into numbered files under `out`.
pub async fn preview(
    fixture: &Path,
    out: &Path,
    settings: &ReportSettings,
    today: NaiveDate,
) -> Result<RunReport> {
    let store = MemoryStore::from_json_file(fixture)?;
    let channel = DirectoryChannel::create(out)?;
    let renderer = PlottersRenderer::default();
    let ctx = ReportContext::new(&store, &channel, &renderer, settings, today);
    let policy = RetryPolicy {
        retries: 0,
        delay: Duration::ZERO,
    };
    let ctx = &ctx;
    Ok(schedule::run_jobs(today, &Job::ALL, &policy, move |job| run_report(ctx, job)).await)
}
