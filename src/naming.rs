/// Episode file name handling: cleaning raw tokens into display names,
/// deriving series keys and episode numbers.

use regex::Regex;
use std::sync::LazyLock;

/// Extension every display name carries
pub const MEDIA_EXTENSION: &str = ".mp4";

/// Query suffix the season index appends to file links
const VIEW_QUERY_MARKER: &str = "?a=view";

/// Passes of the cleaning steps before giving up on reaching a fixpoint
const MAX_NORMALIZE_PASSES: usize = 8;

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static SOURCE_TAG_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[ANi\]\s*").unwrap());
static EPISODE_WITH_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*\d+\s*\[.*$").unwrap());
static BRACKETED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\[.*$").unwrap());
static TRAILING_EPISODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*-\s*\d+$").unwrap());
static EPISODE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\s?(\d+)").unwrap());

/// A cleaned episode entry with its grouping and ordering keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalItem {
    pub display_name: String,
    pub series_key: String,
    pub episode_number: u32,
}

impl CanonicalItem {
    /// Build an item from a raw candidate; `None` when the name cleans to nothing
    pub fn from_raw(raw: &str) -> Option<Self> {
        let display_name = normalize_name(raw);
        if display_name.is_empty() {
            return None;
        }

        Some(Self {
            series_key: series_key(&display_name),
            episode_number: episode_number(&display_name),
            display_name,
        })
    }
}

/// Clean a raw file name or title into a display name ending in `.mp4`.
///
/// Strips the `?a=view` suffix, percent-encoding, markup tags and any path
/// prefix. The cleaning steps are repeated until the value settles, so the
/// result is stable under re-normalization even for doubly encoded input.
/// Returns an empty string when nothing is left to name.
pub fn normalize_name(raw: &str) -> String {
    let mut current = clean_once(raw);
    for _ in 1..MAX_NORMALIZE_PASSES {
        let next = clean_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn clean_once(raw: &str) -> String {
    let mut name = match raw.find(VIEW_QUERY_MARKER) {
        Some(pos) => &raw[..pos],
        None => raw,
    }
    .to_string();

    if let Ok(decoded) = urlencoding::decode(&name) {
        name = decoded.into_owned();
    }

    let name = MARKUP_TAG.replace_all(&name, "");
    let name = name.rsplit('/').next().unwrap_or_default().trim();

    if name.is_empty() {
        return String::new();
    }

    if name.ends_with(MEDIA_EXTENSION) {
        name.to_string()
    } else {
        format!("{}{}", name, MEDIA_EXTENSION)
    }
}

/// Derive the series grouping key from a display name.
///
/// `[ANi] Example Show - 03 [1080P].mp4` and `Example Show - 4.mp4` both map
/// to `Example Show`.
pub fn series_key(display_name: &str) -> String {
    let name = SOURCE_TAG_PREFIX.replace(display_name, "");
    let name = EPISODE_WITH_TAGS.replace(&name, "");
    let name = BRACKETED_SUFFIX.replace(&name, "");
    let name = name.trim();
    let name = name.strip_suffix(MEDIA_EXTENSION).unwrap_or(name);
    TRAILING_EPISODE.replace(name, "").trim().to_string()
}

/// Episode number from the first `- NN` marker, 0 when there is none
pub fn episode_number(display_name: &str) -> u32 {
    EPISODE_MARKER
        .captures(display_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
