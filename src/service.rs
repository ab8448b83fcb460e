/// Plugin lifecycle and scheduling around the task runner
use crate::config::{Config, ConfigStore, PluginOptions, SourceKind};
use crate::error::{Result, StrmError};
use crate::sources::{HttpFetcher, PageRenderer};
use crate::task::{RunMode, RunReport, RunSettings, TaskRunner};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Host-facing plugin lifecycle
#[async_trait]
pub trait StrmPlugin: Send + Sync {
    /// Replace the plugin options; takes effect on the next activation
    fn configure(&mut self, options: PluginOptions);

    /// Register the recurring job and the pending one-shot run
    async fn activate(&mut self) -> anyhow::Result<()>;

    /// Cancel every registered job
    async fn deactivate(&mut self);

    /// Run immediately, waiting for any run in progress
    async fn run(&self, mode: RunMode) -> RunReport;

    /// Whether the recurring job is enabled
    fn get_state(&self) -> bool;
}

/// Cron schedule for the recurring job.
///
/// Accepts the 5-field crontab form used by the host as well as the
/// seconds-first form of the `cron` crate. Crontab day-of-week numbers
/// (0-7, Sunday being 0 or 7) are translated to the crate's 1-7 numbering
/// starting on Sunday.
#[derive(Debug, Clone)]
pub struct Schedule {
    expression: String,
    schedule: cron::Schedule,
}

impl Schedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let normalized = if fields.len() == 5 {
            format!(
                "0 {} {}",
                fields[..4].join(" "),
                crontab_day_of_week(fields[4])
            )
        } else {
            trimmed.to_string()
        };

        let schedule = cron::Schedule::from_str(&normalized).map_err(|source| {
            StrmError::Schedule {
                expression: expression.to_string(),
                source,
            }
        })?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next fire time strictly after `now`
    pub fn next_after(&self, now: &DateTime<Local>) -> Option<DateTime<Local>> {
        self.schedule.after(now).next()
    }
}

/// Translate a crontab day-of-week field to the `cron` crate's numbering.
///
/// Names, `*` and `?` pass through unchanged; a range ending on 7 is split
/// so Sunday lands on 1.
fn crontab_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(|part| {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (part, None),
            };
            let shifted = match range.split_once('-') {
                Some((start, end)) => match (start.parse::<u8>(), end.parse::<u8>()) {
                    (Ok(start), Ok(7)) if step.is_none() && start > 0 => {
                        format!("{}-7,1", start + 1)
                    }
                    (Ok(start), Ok(end)) => format!("{}-{}", start + 1, end.min(6) + 1),
                    _ => range.to_string(),
                },
                None => match range.parse::<u8>() {
                    Ok(day) => (day % 7 + 1).to_string(),
                    Err(_) => range.to_string(),
                },
            };
            match step {
                Some(step) => format!("{}/{}", shifted, step),
                None => shifted,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Default plugin implementation: a task runner driven by a cron job and
/// an optional one-shot run
pub struct StrmService {
    config: Config,
    fetcher: Arc<dyn HttpFetcher>,
    renderer: Option<Arc<dyn PageRenderer>>,
    store: Arc<dyn ConfigStore>,
    runner: Arc<TaskRunner>,
    run_lock: Arc<Mutex<()>>,
    jobs: Vec<JoinHandle<()>>,
}

impl StrmService {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn HttpFetcher>,
        renderer: Option<Arc<dyn PageRenderer>>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        let runner = Arc::new(TaskRunner::new(
            RunSettings::from_config(&config),
            fetcher.clone(),
            renderer.clone(),
        ));
        Self {
            config,
            fetcher,
            renderer,
            store,
            runner,
            run_lock: Arc::new(Mutex::new(())),
            jobs: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Number of registered jobs still pending or running
    pub fn active_jobs(&self) -> usize {
        self.jobs.iter().filter(|job| !job.is_finished()).count()
    }

    /// Mode used by the recurring job
    pub fn scheduled_mode(&self) -> RunMode {
        match self.config.plugin.source {
            SourceKind::Anime => RunMode::Incremental,
            SourceKind::Search => RunMode::Search,
        }
    }

    /// Mode used by the one-shot run
    pub fn one_shot_mode(&self) -> RunMode {
        match self.config.plugin.source {
            SourceKind::Search => RunMode::Search,
            SourceKind::Anime if self.config.plugin.fulladd => RunMode::Full,
            SourceKind::Anime => RunMode::Incremental,
        }
    }

    fn register_recurring(&mut self) {
        let Some(expression) = self.config.plugin.cron.clone().filter(|c| !c.trim().is_empty())
        else {
            debug!("No cron expression configured; recurring job not registered");
            return;
        };

        let schedule = match Schedule::parse(&expression) {
            Ok(schedule) => schedule,
            Err(e) => {
                error!("Recurring job not registered: {}", e);
                return;
            }
        };

        let mode = self.scheduled_mode();
        let runner = self.runner.clone();
        let lock = self.run_lock.clone();
        info!("Scheduling {} runs with '{}'", mode, schedule.expression());

        self.jobs.push(tokio::spawn(async move {
            loop {
                let now = Local::now();
                let Some(next) = schedule.next_after(&now) else {
                    warn!("Schedule '{}' has no upcoming fire time", schedule.expression());
                    break;
                };
                debug!("Next {} run at {}", mode, next);
                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                let _guard = lock.lock().await;
                runner.run(mode).await;
            }
        }));
    }

    fn register_one_shot(&mut self) {
        let mode = self.one_shot_mode();
        let delay = self.config.pacing.onlyonce_delay();
        let runner = self.runner.clone();
        let lock = self.run_lock.clone();
        info!("One-shot {} run in {:?}", mode, delay);

        self.jobs.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _guard = lock.lock().await;
            runner.run(mode).await;
        }));
    }
}

#[async_trait]
impl StrmPlugin for StrmService {
    fn configure(&mut self, options: PluginOptions) {
        self.config.plugin = options;
        self.runner = Arc::new(TaskRunner::new(
            RunSettings::from_config(&self.config),
            self.fetcher.clone(),
            self.renderer.clone(),
        ));
    }

    async fn activate(&mut self) -> anyhow::Result<()> {
        self.deactivate().await;

        if self.config.plugin.enabled {
            self.register_recurring();
        }

        if self.config.plugin.onlyonce {
            self.register_one_shot();
            self.config.plugin.onlyonce = false;
            self.config.plugin.fulladd = false;
            self.store.save(&self.config.plugin)?;
        }

        info!("Plugin active with {} registered jobs", self.jobs.len());
        Ok(())
    }

    async fn deactivate(&mut self) {
        if self.jobs.is_empty() {
            return;
        }
        for job in self.jobs.drain(..) {
            job.abort();
        }
        info!("Scheduled jobs cancelled");
    }

    async fn run(&self, mode: RunMode) -> RunReport {
        let _guard = self.run_lock.lock().await;
        self.runner.run(mode).await
    }

    fn get_state(&self) -> bool {
        self.config.plugin.enabled
    }
}
