/// Candidate file name extraction from a rendered season index page.
///
/// The page layout is not stable, so several independent strategies run in
/// order and their results are merged. Each strategy is best-effort.
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

const MEDIA_MARKER: &str = ".mp4";

/// Quoted values and key/value pairs carrying a `.mp4` file name
static MARKUP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""([^"]*\.mp4[^"]*)""#,
        r#"'([^']*\.mp4[^']*)'"#,
        r#"filename["']?\s*:\s*["']([^"']*\.mp4[^"']*)["']"#,
        r#"name["']?\s*:\s*["']([^"']*\.mp4[^"']*)["']"#,
        r#"src["']?\s*:\s*["']([^"']*\.mp4[^"']*)["']"#,
        r#"href["']?\s*:\s*["']([^"']*\.mp4[^"']*)["']"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static TEXT_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^/\s]+\.mp4\S*)").unwrap());

/// A parsed page together with its serialized markup
pub struct ListingPage<'a> {
    markup: &'a str,
    document: Html,
}

impl<'a> ListingPage<'a> {
    pub fn parse(markup: &'a str) -> Self {
        Self {
            markup,
            document: Html::parse_document(markup),
        }
    }

    pub fn markup(&self) -> &str {
        self.markup
    }

    /// Values of `attribute` on every element matching `selector`
    pub fn attribute_values(&self, selector: &str, attribute: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .filter_map(|element| element.value().attr(attribute))
            .map(str::to_string)
            .collect()
    }

    /// Text of the elements matching `selector`, text nodes separated by whitespace
    pub fn text_content(&self, selector: &str) -> String {
        let Ok(selector) = Selector::parse(selector) else {
            return String::new();
        };
        self.document
            .select(&selector)
            .flat_map(|element| element.text())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One extraction layer
pub type Strategy = fn(&ListingPage) -> Vec<String>;

/// Extraction layers in the order their results are merged
pub const STRATEGIES: [(&str, Strategy); 5] = [
    ("video sources", from_video_sources),
    ("media links", from_media_links),
    ("data-filename attributes", from_data_filenames),
    ("markup patterns", from_markup_patterns),
    ("body text", from_body_text),
];

/// Run every layer over `markup` and merge the candidates, first seen wins
pub fn extract_candidates(markup: &str) -> Vec<String> {
    let page = ListingPage::parse(markup);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for (name, strategy) in STRATEGIES {
        let found = strategy(&page);
        debug!("Layer '{}' yielded {} candidates", name, found.len());
        for candidate in found {
            if !candidate.is_empty() && seen.insert(candidate.clone()) {
                candidates.push(candidate);
            }
        }
    }

    info!("Extracted {} candidate video files from page", candidates.len());
    candidates
}

fn last_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// `<video src>` values ending in `.mp4`
pub fn from_video_sources(page: &ListingPage) -> Vec<String> {
    page.attribute_values("video", "src")
        .iter()
        .filter(|src| src.ends_with(MEDIA_MARKER))
        .map(|src| last_segment(src))
        .collect()
}

/// Anchors pointing at `.mp4` files
pub fn from_media_links(page: &ListingPage) -> Vec<String> {
    page.attribute_values(r#"a[href*=".mp4"]"#, "href")
        .iter()
        .filter(|href| href.contains(MEDIA_MARKER))
        .map(|href| last_segment(href))
        .collect()
}

/// Elements carrying a `data-filename` attribute
pub fn from_data_filenames(page: &ListingPage) -> Vec<String> {
    page.attribute_values("[data-filename]", "data-filename")
        .into_iter()
        .filter(|name| name.contains(MEDIA_MARKER))
        .collect()
}

/// Quoted `.mp4` strings anywhere in the serialized markup
pub fn from_markup_patterns(page: &ListingPage) -> Vec<String> {
    MARKUP_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(page.markup()))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// `.mp4` tokens in the visible body text
pub fn from_body_text(page: &ListingPage) -> Vec<String> {
    let text = page.text_content("body");
    TEXT_TOKEN
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_sources() {
        let html = r#"<html><body>
            <video src="https://h/2025-7/Show%20-%2001.mp4"></video>
            <video src="https://h/stream.m3u8"></video>
        </body></html>"#;
        let page = ListingPage::parse(html);
        assert_eq!(from_video_sources(&page), vec!["Show%20-%2001.mp4"]);
    }

    #[test]
    fn test_media_links() {
        let html = r#"<a href="/2025-7/A%20-%2001.mp4?a=view">A</a><a href="/about">x</a>"#;
        let page = ListingPage::parse(html);
        assert_eq!(from_media_links(&page), vec!["A%20-%2001.mp4?a=view"]);
    }

    #[test]
    fn test_data_filenames() {
        let html = r#"<div data-filename="B - 02.mp4"></div><div data-filename="readme.txt"></div>"#;
        let page = ListingPage::parse(html);
        assert_eq!(from_data_filenames(&page), vec!["B - 02.mp4"]);
    }

    #[test]
    fn test_markup_patterns_find_script_values() {
        let html = r#"<script>var files = [{filename: 'C - 03.mp4'}, {"name": "D - 04.mp4"}];</script>"#;
        let page = ListingPage::parse(html);
        let found = from_markup_patterns(&page);
        assert!(found.contains(&"C - 03.mp4".to_string()));
        assert!(found.contains(&"D - 04.mp4".to_string()));
    }

    #[test]
    fn test_body_text_tokens() {
        let html = "<body><ul><li>E-05.mp4</li><li>folder/F-06.mp4</li></ul></body>";
        let page = ListingPage::parse(html);
        assert_eq!(from_body_text(&page), vec!["E-05.mp4", "F-06.mp4"]);
    }

    #[test]
    fn test_layers_are_merged_without_duplicates() {
        let html = r#"<html><body>
            <a href="/2025-7/G.mp4">G.mp4</a>
            <div data-filename="G.mp4"></div>
        </body></html>"#;
        let candidates = extract_candidates(html);
        assert_eq!(candidates.first().map(String::as_str), Some("G.mp4"));
        let unique: HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
        assert!(candidates.contains(&"/2025-7/G.mp4".to_string()));
    }

    #[test]
    fn test_page_without_media() {
        assert!(extract_candidates("<html><body><p>nothing here</p></body></html>").is_empty());
    }
}
