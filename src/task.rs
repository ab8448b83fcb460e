/// Run orchestration: one pass of a listing source into descriptors
use crate::catalog::aggregate;
use crate::config::Config;
use crate::descriptor::{DescriptorWriter, WriteOutcome};
use crate::error::StrmError;
use crate::links::{normalize_feed_url, season_catalog_url, season_id};
use crate::retry::RetryPolicy;
use crate::sources::search::search_url;
use crate::sources::{
    extract_candidates, extract_stream_source, parse_feed, parse_search_results, FeedEntry,
    HttpFetcher, PageRenderer,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which listing a run draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Newly published episodes from the feed
    Incremental,
    /// Every episode of the top series in the current season catalog
    Full,
    /// Keyword searches on the configured video site
    Search,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Incremental => "incremental",
            RunMode::Full => "full",
            RunMode::Search => "search",
        };
        f.write_str(name)
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "incremental" => Ok(RunMode::Incremental),
            "full" => Ok(RunMode::Full),
            "search" => Ok(RunMode::Search),
            other => Err(format!("unknown run mode '{}'", other)),
        }
    }
}

/// Counts for a single run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: RunMode,
    /// Items the source yielded
    pub discovered: usize,
    /// Descriptors written by this run
    pub created: usize,
    /// Items with an existing descriptor or no usable name
    pub skipped: usize,
    /// Items that could not be resolved or written
    pub failed: usize,
}

impl RunReport {
    fn new(mode: RunMode) -> Self {
        Self {
            mode,
            discovered: 0,
            created: 0,
            skipped: 0,
            failed: 0,
        }
    }

    fn record(&mut self, outcome: &WriteOutcome) {
        match outcome {
            WriteOutcome::Created(_) => self.created += 1,
            WriteOutcome::Exists(_) | WriteOutcome::EmptyName => self.skipped += 1,
            WriteOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Settings fixed for the lifetime of a runner
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub storage_dir: PathBuf,
    pub feed_url: String,
    pub catalog_base_url: String,
    pub search_base_url: String,
    pub keywords: Vec<String>,
    pub item_delay: Duration,
    pub retry: RetryPolicy,
    /// Season identifier override; the current local date decides when unset
    pub season: Option<String>,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            storage_dir: config.plugin.storageplace.clone(),
            feed_url: config.sources.feed_url.clone(),
            catalog_base_url: config.sources.catalog_base_url.clone(),
            search_base_url: config.sources.search_base_url.clone(),
            keywords: config.plugin.keywords(),
            item_delay: config.pacing.item_delay(),
            retry: RetryPolicy::default(),
            season: None,
        }
    }

    fn current_season(&self) -> String {
        self.season
            .clone()
            .unwrap_or_else(|| season_id(chrono::Local::now().date_naive()))
    }
}

/// Runs one listing source end to end: fetch, extract, normalize, write
pub struct TaskRunner {
    settings: RunSettings,
    fetcher: Arc<dyn HttpFetcher>,
    renderer: Option<Arc<dyn PageRenderer>>,
    writer: DescriptorWriter,
}

impl TaskRunner {
    pub fn new(
        settings: RunSettings,
        fetcher: Arc<dyn HttpFetcher>,
        renderer: Option<Arc<dyn PageRenderer>>,
    ) -> Self {
        let writer = DescriptorWriter::new(settings.storage_dir.clone());
        Self {
            settings,
            fetcher,
            renderer,
            writer,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn writer(&self) -> &DescriptorWriter {
        &self.writer
    }

    /// Execute one run. Failures are logged and reflected in the report,
    /// never returned.
    pub async fn run(&self, mode: RunMode) -> RunReport {
        info!("Starting {} run into {}", mode, self.settings.storage_dir.display());
        let report = match mode {
            RunMode::Incremental => self.run_incremental().await,
            RunMode::Full => self.run_full().await,
            RunMode::Search => self.run_search().await,
        };
        info!(
            "Finished {} run: {} discovered, {} created, {} skipped, {} failed",
            report.mode, report.discovered, report.created, report.skipped, report.failed
        );
        report
    }

    /// Newly published episodes from the feed
    pub async fn fetch_feed(&self) -> Vec<FeedEntry> {
        let url = self.settings.feed_url.as_str();
        let entries = self
            .settings
            .retry
            .run("feed fetch", || async move {
                let xml = self.fetcher.get_text(url).await.map_err(StrmError::from)?;
                parse_feed(&xml)
            })
            .await
            .unwrap_or_default();
        info!("Feed listed {} episodes", entries.len());
        entries
    }

    /// Display names of the top series in the catalog of `season`
    pub async fn fetch_catalog(&self, season: &str) -> Vec<String> {
        let Some(renderer) = self.renderer.as_ref() else {
            warn!("No page renderer available; skipping season catalog");
            return Vec::new();
        };

        let url = format!(
            "{}/{}/",
            self.settings.catalog_base_url.trim_end_matches('/'),
            season
        );
        info!("Rendering season catalog {}", url);

        let Some(markup) = self
            .settings
            .retry
            .run("season catalog render", || renderer.render(&url))
            .await
        else {
            return Vec::new();
        };

        let names = aggregate(&extract_candidates(&markup));
        info!("Season {} lists {} episodes for the top series", season, names.len());
        names
    }

    async fn run_incremental(&self) -> RunReport {
        let mut report = RunReport::new(RunMode::Incremental);
        let entries = self.fetch_feed().await;
        report.discovered = entries.len();

        for entry in &entries {
            let url = normalize_feed_url(&entry.link);
            let outcome = self.writer.write(&entry.title, &url).await;
            report.record(&outcome);
        }
        report
    }

    async fn run_full(&self) -> RunReport {
        let mut report = RunReport::new(RunMode::Full);
        let season = self.settings.current_season();
        let names = self.fetch_catalog(&season).await;
        report.discovered = names.len();
        if names.is_empty() {
            return report;
        }

        for name in &names {
            let url = season_catalog_url(&self.settings.catalog_base_url, &season, name);
            let outcome = self.writer.write(name, &url).await;
            report.record(&outcome);
        }
        report
    }

    async fn run_search(&self) -> RunReport {
        let mut report = RunReport::new(RunMode::Search);
        let Some(renderer) = self.renderer.as_ref() else {
            warn!("No page renderer available; skipping keyword search");
            return report;
        };

        let base_url = self.settings.search_base_url.as_str();
        if base_url.is_empty() {
            warn!("No search site configured; skipping keyword search");
            return report;
        }
        if self.settings.keywords.is_empty() {
            warn!("No search keywords configured");
            return report;
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.settings.storage_dir).await {
            warn!(
                "Could not create storage directory {}: {}",
                self.settings.storage_dir.display(),
                e
            );
            return report;
        }

        for keyword in &self.settings.keywords {
            let url = search_url(base_url, keyword);
            info!("Searching '{}' at {}", keyword, url);

            let Some(markup) = self
                .settings
                .retry
                .run("search page render", || renderer.render(&url))
                .await
            else {
                continue;
            };

            let results = parse_search_results(base_url, &markup);
            info!("Keyword '{}' returned {} videos", keyword, results.len());
            report.discovered += results.len();

            for result in &results {
                match renderer.render(&result.url).await {
                    Ok(page) => match extract_stream_source(&page) {
                        Some(stream) => {
                            let outcome =
                                self.writer.write_stem(&result.descriptor_stem(), &stream).await;
                            report.record(&outcome);
                        }
                        None => {
                            warn!("No stream found for {} ({})", result.code, result.url);
                            report.failed += 1;
                        }
                    },
                    Err(e) => {
                        warn!("Failed to load {}: {}", result.url, e);
                        report.failed += 1;
                    }
                }

                debug!("Pausing {:?} before the next video", self.settings.item_delay);
                tokio::time::sleep(self.settings.item_delay).await;
            }
        }
        report
    }
}
