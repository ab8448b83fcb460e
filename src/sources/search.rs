/// Keyword search over a video site: result cards and HLS stream discovery
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// Longest file name stem produced by [`sanitize_title`]
pub const MAX_STEM_CHARS: usize = 200;

static VIDEO_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([a-zA-Z0-9]+-\d+)").unwrap());

static STREAM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"https?://[^\s"'`]+\.m3u8[^\s"'`]*"#,
        r#""(https?://[^"]+\.m3u8[^"]*)""#,
        r#"'(https?://[^']+\.m3u8[^']*)'"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static SCRIPT_STREAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"']+\.m3u8[^\s"']*"#).unwrap());

static FORBIDDEN_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// A video found on a search result page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub code: String,
}

impl SearchResult {
    /// File stem for the descriptor: the code, or the sanitized title without one
    pub fn descriptor_stem(&self) -> String {
        if self.code.is_empty() {
            sanitize_title(&self.title)
        } else {
            self.code.clone()
        }
    }
}

/// Search page URL for a keyword
pub fn search_url(base_url: &str, keyword: &str) -> String {
    format!(
        "{}/en/search/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(keyword)
    )
}

/// Collect video result cards from a search page, one per code
pub fn parse_search_results(base_url: &str, markup: &str) -> Vec<SearchResult> {
    let document = Html::parse_document(markup);
    let (Ok(card_selector), Ok(title_selector)) = (
        Selector::parse(r#"a[href*="/en/"]"#),
        Selector::parse(r#"h2, .title, [class*="title"]"#),
    ) else {
        return Vec::new();
    };
    let base = Url::parse(base_url).ok();

    let mut results: Vec<SearchResult> = Vec::new();
    for card in document.select(&card_selector) {
        let Some(href) = card.value().attr("href") else {
            continue;
        };
        let Some(code) = VIDEO_CODE
            .captures(href)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_uppercase())
        else {
            continue;
        };
        if results.iter().any(|r| r.code == code) {
            continue;
        }

        let title = card
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| code.clone());

        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            match base.as_ref().and_then(|b| b.join(href).ok()) {
                Some(joined) => joined.to_string(),
                None => format!("{}{}", base_url.trim_end_matches('/'), href),
            }
        };

        debug!("Search result {} -> {}", code, url);
        results.push(SearchResult { title, url, code });
    }

    results
}

/// First HLS playlist URL referenced by a video page
pub fn extract_stream_source(markup: &str) -> Option<String> {
    for pattern in STREAM_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(markup) {
            let found = caps.get(1).or_else(|| caps.get(0))?;
            return Some(found.as_str().trim_matches(|c| c == '"' || c == '\'').to_string());
        }
    }

    let document = Html::parse_document(markup);
    let selector = Selector::parse("script").ok()?;
    document
        .select(&selector)
        .map(|script| script.text().collect::<String>())
        .find_map(|body| SCRIPT_STREAM.find(&body).map(|m| m.as_str().to_string()))
}

/// Remove characters that are invalid in file names, collapse whitespace
/// and cap the length
pub fn sanitize_title(title: &str) -> String {
    let cleaned = FORBIDDEN_CHARS.replace_all(title, "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_STEM_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://videos.example";

    #[test]
    fn test_search_url() {
        assert_eq!(search_url("https://videos.example/", "blue sky"), "https://videos.example/en/search/blue%20sky");
    }

    #[test]
    fn test_parse_search_results() {
        let html = r#"<html><body>
            <a href="/en/abc-123"><h2> First Video </h2></a>
            <a href="/en/abc-123">duplicate</a>
            <a href="https://videos.example/en/xyz-9"><span>no title</span></a>
            <a href="/en/about">About</a>
        </body></html>"#;
        let results = parse_search_results(BASE, html);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].code, "ABC-123");
        assert_eq!(results[0].title, "First Video");
        assert_eq!(results[0].url, "https://videos.example/en/abc-123");
        assert_eq!(results[1].code, "XYZ-9");
        assert_eq!(results[1].title, "XYZ-9");
        assert_eq!(results[1].url, "https://videos.example/en/xyz-9");
    }

    #[test]
    fn test_extract_stream_source_from_markup() {
        let html = r#"<div data-src="https://cdn.example/v/abc/playlist.m3u8?token=1"></div>"#;
        assert_eq!(
            extract_stream_source(html).as_deref(),
            Some("https://cdn.example/v/abc/playlist.m3u8?token=1")
        );
    }

    #[test]
    fn test_extract_stream_source_missing() {
        assert_eq!(extract_stream_source("<html><body>no stream</body></html>"), None);
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("  a <b>: c/d?  e* "), "a b cd e");
        assert_eq!(sanitize_title(&"x".repeat(300)).len(), MAX_STEM_CHARS);
    }

    #[test]
    fn test_descriptor_stem_prefers_code() {
        let with_code = SearchResult { title: "T".into(), url: "u".into(), code: "ABC-1".into() };
        let without = SearchResult { title: "A/B".into(), url: "u".into(), code: String::new() };
        assert_eq!(with_code.descriptor_stem(), "ABC-1");
        assert_eq!(without.descriptor_stem(), "AB");
    }
}
