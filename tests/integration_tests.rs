use ani_strm::catalog::aggregate_top;
use ani_strm::links::{normalize_feed_url, rewrite_host};
use ani_strm::naming::{episode_number, normalize_name, series_key};
use ani_strm::sources::parse_feed;
use ani_strm::{
    aggregate, DescriptorWriter, FetchError, HttpFetcher, PageRenderer, RetryPolicy, RunMode,
    RunSettings, TaskRunner, WriteOutcome,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;

const FEED_URL: &str = "https://feed.test/ani-download.xml";
const CATALOG_BASE: &str = "https://catalog.test";

/// In-memory site answering fetch and render requests from canned pages
#[derive(Default)]
struct MockSite {
    pages: HashMap<String, String>,
}

impl MockSite {
    fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    fn lookup(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            status: 404,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl HttpFetcher for MockSite {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.lookup(url)
    }
}

#[async_trait]
impl PageRenderer for MockSite {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        self.lookup(url)
    }
}

fn runner_for(storage: &TempDir, site: MockSite) -> TaskRunner {
    let site = Arc::new(site);
    let settings = RunSettings {
        storage_dir: storage.path().to_path_buf(),
        feed_url: FEED_URL.to_string(),
        catalog_base_url: CATALOG_BASE.to_string(),
        search_base_url: String::new(),
        keywords: Vec::new(),
        item_delay: Duration::ZERO,
        retry: RetryPolicy::new(1, Duration::ZERO, 1.0),
        season: Some("2025-10".to_string()),
    };
    TaskRunner::new(settings, site.clone(), Some(site))
}

#[test]
fn test_release_name_series_and_episode() {
    let name = "[ANi] Example Show - 03 [1080P].mp4";
    assert_eq!(series_key(name), "Example Show");
    assert_eq!(episode_number(name), 3);
}

#[test]
fn test_feed_link_becomes_playable() {
    let link = rewrite_host("https://resources.ani.rip/show/ep01?d=mp4");
    assert_eq!(
        normalize_feed_url(&link),
        "https://openani.an-i.workers.dev/show/ep01.mp4?d=true"
    );
}

#[test]
fn test_larger_series_ranks_first() {
    let candidates = ["B - 1.mp4", "A - 2.mp4", "A - 1.mp4"];
    assert_eq!(
        aggregate_top(&candidates, 2),
        vec!["A - 1.mp4", "A - 2.mp4", "B - 1.mp4"]
    );
    assert_eq!(aggregate_top(&candidates, 1), vec!["A - 1.mp4", "A - 2.mp4"]);
}

#[test]
fn test_normalization_is_stable() {
    let inputs = [
        "https://host/2025-7/%5BANi%5D%20Show%20-%2001.mp4?a=view",
        "<b>Show - 02</b>",
        "Show%2520-%252003",
        "folder/sub/Show - 04.mp4",
    ];
    for raw in inputs {
        let once = normalize_name(raw);
        assert!(once.ends_with(".mp4"), "{once}");
        assert_eq!(normalize_name(&once), once);
    }
}

#[test]
fn test_aggregation_caps_series_count() {
    let candidates: Vec<String> = (0..20)
        .flat_map(|series| (1..=2).map(move |ep| format!("Series {series} - {ep}.mp4")))
        .collect();
    let names = aggregate(&candidates);

    let series: std::collections::HashSet<String> = names.iter().map(|n| series_key(n)).collect();
    assert_eq!(series.len(), 15);
    assert_eq!(names, aggregate(&candidates));
}

#[tokio::test]
async fn test_existing_descriptor_is_left_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let writer = DescriptorWriter::new(temp_dir.path());
    let path = temp_dir.path().join("Show - 01.mp4.strm");

    fs::write(&path, "https://old.example/Show%20-%2001.mp4?d=true").await.unwrap();

    let outcome = writer.write("Show - 01.mp4", "https://new.example/x.mp4?d=true").await;
    assert!(matches!(outcome, WriteOutcome::Exists(_)));
    assert!(!outcome.is_created());
    assert_eq!(
        fs::read_to_string(&path).await.unwrap(),
        "https://old.example/Show%20-%2001.mp4?d=true"
    );
}

#[tokio::test]
async fn test_feed_without_items_creates_nothing() {
    let xml = r#"<?xml version="1.0"?><rss><channel><title>ANi</title></channel></rss>"#;
    assert!(parse_feed(xml).unwrap().is_empty());

    let temp_dir = TempDir::new().unwrap();
    let runner = runner_for(&temp_dir, MockSite::default().page(FEED_URL, xml));

    let report = runner.run(RunMode::Incremental).await;
    assert_eq!(report.discovered, 0);
    assert_eq!(report.created, 0);
    assert_eq!(runner.writer().count_existing(), 0);
}

#[tokio::test]
async fn test_incremental_run_twice_creates_once() {
    let xml = r#"<rss><channel>
        <item>
            <title><![CDATA[[ANi] Example Show - 03 [1080P][Baha][WEB-DL].mp4]]></title>
            <link>https://resources.ani.rip/2025-10/Example%20Show%20-%2003?d=mp4</link>
        </item>
        <item>
            <title>[ANi] Other Show - 11 [1080P].mp4</title>
            <link>https://resources.ani.rip/2025-10/Other%20Show%20-%2011.mp4</link>
        </item>
    </channel></rss>"#;
    let temp_dir = TempDir::new().unwrap();
    let runner = runner_for(&temp_dir, MockSite::default().page(FEED_URL, xml));

    let first = runner.run(RunMode::Incremental).await;
    assert_eq!(first.discovered, 2);
    assert_eq!(first.created, 2);

    let second = runner.run(RunMode::Incremental).await;
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 2);

    let other = fs::read_to_string(temp_dir.path().join("[ANi] Other Show - 11 [1080P].mp4.strm"))
        .await
        .unwrap();
    assert_eq!(
        other,
        "https://openani.an-i.workers.dev/2025-10/Other%20Show%20-%2011.mp4?d=true"
    );
    assert_eq!(runner.writer().count_existing(), 2);
}

#[tokio::test]
async fn test_full_run_from_rendered_catalog() {
    let page = r#"<html><body>
        <ul>
            <li><a href="/2025-10/Big%20Show%20-%2002.mp4?a=view">Episode 2</a></li>
            <li><a href="/2025-10/Big%20Show%20-%2001.mp4?a=view">Episode 1</a></li>
            <li><a href="/2025-10/Small%20Show%20-%2001.mp4?a=view">Episode 1</a></li>
        </ul>
    </body></html>"#;
    let temp_dir = TempDir::new().unwrap();
    let runner = runner_for(
        &temp_dir,
        MockSite::default().page("https://catalog.test/2025-10/", page),
    );

    let report = runner.run(RunMode::Full).await;
    assert_eq!(report.discovered, 3);
    assert_eq!(report.created, 3);

    let content = fs::read_to_string(temp_dir.path().join("Big Show - 01.mp4.strm"))
        .await
        .unwrap();
    assert_eq!(content, "https://catalog.test/2025-10/Big%20Show%20-%2001.mp4?d=true");
}

#[tokio::test]
async fn test_full_run_with_unreachable_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let runner = runner_for(&temp_dir, MockSite::default());

    let report = runner.run(RunMode::Full).await;
    assert_eq!(report.discovered, 0);
    assert_eq!(report.failed, 0);
}
