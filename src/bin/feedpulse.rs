use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use feedpulse::{Config, FeedPulse, Job, JobStatus, RunReport};

#[derive(Parser)]
#[command(name = "feedpulse", about = "Daily feed and messenger analytics reports")]
struct Cli {
    /// Config file (default: <config dir>/feedpulse/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline now, with retries
    Run {
        /// Only run these jobs: summary, trends, feed, messaging (repeatable)
        #[arg(long = "job", value_name = "NAME", value_parser = parse_job)]
        jobs: Vec<Job>,
        /// Pretend today is this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the pipeline at every daily trigger, forever
    Daemon,
    /// Render all reports from a JSON fixture into a directory
    Preview {
        /// JSON array of activity records
        #[arg(long)]
        fixture: PathBuf,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
        /// Pretend today is this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
    },
    /// Show the next trigger times
    NextRun {
        #[arg(long, default_value = "3")]
        count: usize,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with secrets masked
    Show,
    /// Print the default config file location
    Path,
}

fn parse_job(s: &str) -> Result<Job, String> {
    Job::parse(s).ok_or_else(|| {
        format!("unknown job '{s}'. Use: summary, trends, feed, messaging")
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    feedpulse::date_util::parse_iso(s).ok_or_else(|| format!("expected YYYY-MM-DD, got '{s}'"))
}

fn print_report(report: &RunReport) {
    println!("Run for {}:", report.today);
    for job in &report.jobs {
        let status = match job.status {
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::UpstreamFailed => "upstream_failed",
        };
        match &job.error {
            Some(e) => println!("  {:<10} {status} after {} attempt(s): {e}", job.job.name(), job.attempts),
            None => println!("  {:<10} {status}", job.job.name()),
        }
    }
}

fn finish(report: &RunReport) -> anyhow::Result<()> {
    let failed = report.failed().count();
    if failed > 0 {
        anyhow::bail!("{failed} job(s) did not succeed");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run { jobs, today, json } => {
            let config = Config::load(config_path)?;
            let jobs = if jobs.is_empty() {
                Job::ALL.to_vec()
            } else {
                // keep pipeline order regardless of flag order
                Job::ALL.into_iter().filter(|j| jobs.contains(j)).collect()
            };
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let report = FeedPulse::new(config).run(today, &jobs).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            finish(&report)
        }
        Commands::Daemon => {
            let config = Config::load(config_path)?;
            FeedPulse::new(config).daemon().await?;
            Ok(())
        }
        Commands::Preview {
            fixture,
            out,
            today,
        } => {
            let config = Config::load(config_path)?;
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let report = feedpulse::preview(&fixture, &out, &config.report, today).await?;
            print_report(&report);
            println!("Output written to {}", out.display());
            finish(&report)
        }
        Commands::NextRun { count } => {
            let config = Config::load(config_path)?;
            let trigger = config.schedule.trigger()?;
            println!("Schedule: {trigger}");
            for t in trigger.upcoming(Local::now().naive_local(), count) {
                println!("  {}", t.format("%Y-%m-%d %H:%M"));
            }
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = Config::load(config_path)?;
                print!("{}", config.redacted().to_toml()?);
                Ok(())
            }
            ConfigAction::Path => {
                let path = match config_path {
                    Some(p) => p.to_path_buf(),
                    None => Config::default_path()?,
                };
                println!("{}", path.display());
                Ok(())
            }
        },
    }
}
