//! Daily trigger, job ordering and retries.
//!
//! The four reports run as a linear chain once a day. A job that still fails
//! after its retries stops the chain: later jobs are reported as
//! `upstream_failed` and never started.

use std::fmt;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

static RE_DAILY_CRON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2})\s+(\d{1,2})\s+\*\s+\*\s+\*\s*$").unwrap()
});

/// Fires once a day at a fixed local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    time: NaiveTime,
}

impl DailyTrigger {
    /// Parse `"<minute> <hour> * * *"`.
    pub fn parse(expr: &str) -> Result<Self> {
        let caps = RE_DAILY_CRON.captures(expr).ok_or_else(|| {
            Error::ScheduleParse(format!(
                "'{expr}' is not a daily cron expression like \"0 11 * * *\""
            ))
        })?;
        let minute: u32 = caps[1]
            .parse()
            .map_err(|_| Error::ScheduleParse(format!("bad minute in '{expr}'")))?;
        let hour: u32 = caps[2]
            .parse()
            .map_err(|_| Error::ScheduleParse(format!("bad hour in '{expr}'")))?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            Error::ScheduleParse(format!("{hour:02}:{minute:02} is not a valid time of day"))
        })?;
        Ok(Self { time })
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// First fire time strictly after `now`. Missed runs are not caught up.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.time);
        if today > now {
            today
        } else {
            today + chrono::Duration::days(1)
        }
    }

    /// Like [`next_after`](Self::next_after) in the local zone, skipping
    /// days where the fire time falls into a DST gap.
    pub fn next_after_local(&self, now: DateTime<Local>) -> DateTime<Local> {
        let mut candidate = self.next_after(now.naive_local());
        loop {
            if let Some(t) = Local.from_local_datetime(&candidate).earliest() {
                if t > now {
                    return t;
                }
            }
            candidate += chrono::Duration::days(1);
        }
    }

    /// The next `count` fire times after `now`.
    pub fn upcoming(&self, now: NaiveDateTime, count: usize) -> Vec<NaiveDateTime> {
        let mut times = Vec::with_capacity(count);
        let mut cursor = now;
        for _ in 0..count {
            cursor = self.next_after(cursor);
            times.push(cursor);
        }
        times
    }
}

impl fmt::Display for DailyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "daily at {}", self.time.format("%H:%M"))
    }
}

/// Job-level retries with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Job {
    Summary,
    Trends,
    Feed,
    Messaging,
}

impl Job {
    /// Pipeline order.
    pub const ALL: [Job; 4] = [Job::Summary, Job::Trends, Job::Feed, Job::Messaging];

    pub fn name(self) -> &'static str {
        match self {
            Job::Summary => "summary",
            Job::Trends => "trends",
            Job::Feed => "feed",
            Job::Messaging => "messaging",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|j| j.name() == s)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failed,
    UpstreamFailed,
}

/// Outcome of one job within a run.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job: Job,
    pub status: JobStatus,
    pub attempts: u32,
    pub error: Option<String>,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub today: NaiveDate,
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.jobs.iter().all(|j| j.status == JobStatus::Success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|j| j.status != JobStatus::Success)
    }
}

/// Run `jobs` in order, retrying each per `policy`.
///
/// `attempt` is called once per try and must build its own clients.
pub async fn run_jobs<F, Fut>(
    today: NaiveDate,
    jobs: &[Job],
    policy: &RetryPolicy,
    mut attempt: F,
) -> RunReport
where
    F: FnMut(Job) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut reports = Vec::with_capacity(jobs.len());
    let mut upstream_failed = false;

    for &job in jobs {
        if upstream_failed {
            reports.push(JobReport {
                job,
                status: JobStatus::UpstreamFailed,
                attempts: 0,
                error: None,
            });
            continue;
        }

        let max_attempts = policy.retries + 1;
        let mut attempts = 0;
        let mut last_error = None;
        while attempts < max_attempts {
            attempts += 1;
            log::info!("Starting job {job} (attempt {attempts}/{max_attempts})");
            match attempt(job).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    if attempts < max_attempts {
                        log::warn!(
                            "Job {job} failed: {e}. Retrying in {}s",
                            policy.delay.as_secs()
                        );
                        tokio::time::sleep(policy.delay).await;
                    } else {
                        log::error!("Job {job} failed after {attempts} attempts: {e}");
                    }
                    last_error = Some(e.to_string());
                }
            }
        }

        let status = if last_error.is_none() {
            JobStatus::Success
        } else {
            upstream_failed = true;
            JobStatus::Failed
        };
        reports.push(JobReport {
            job,
            status,
            attempts,
            error: last_error,
        });
    }

    RunReport {
        today,
        jobs: reports,
    }
}

/// Sleep until each trigger and run the pipeline, forever.
///
/// `run` receives the local date at fire time.
pub async fn run_forever<F, Fut>(trigger: DailyTrigger, mut run: F)
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = RunReport>,
{
    loop {
        let now = Local::now();
        let next = trigger.next_after_local(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        log::info!("Next run at {} (in {}s)", next.format("%Y-%m-%d %H:%M"), wait.as_secs());
        tokio::time::sleep(wait).await;

        let report = run(Local::now().date_naive()).await;
        if report.is_success() {
            log::info!("Run for {} succeeded", report.today);
        } else {
            for job in report.failed() {
                log::error!("Run for {}: job {} {:?}", report.today, job.job, job.status);
            }
        }
    }
}
