/// Playable URL normalization for descriptor content

use chrono::{Datelike, NaiveDate};

/// Host the feed announces downloads on
pub const FEED_HOST: &str = "resources.ani.rip";

/// Host that serves the same files for direct playback
pub const PLAYBACK_HOST: &str = "openani.an-i.workers.dev";

/// Suffix every playable URL must end with
pub const PLAYABLE_SUFFIX: &str = ".mp4?d=true";

const FEED_MP4_QUERY: &str = "?d=mp4";
const FORCE_DOWNLOAD_QUERY: &str = "?d=true";

/// Months a season starts in
const SEASON_START_MONTHS: [u32; 4] = [10, 7, 4, 1];

/// Season identifier (`YYYY-M`) for the quarter containing `date`
pub fn season_id(date: NaiveDate) -> String {
    let month = SEASON_START_MONTHS
        .iter()
        .copied()
        .find(|start| *start <= date.month())
        .unwrap_or(1);
    format!("{}-{}", date.year(), month)
}

/// Playable URL of an episode in a season catalog
pub fn season_catalog_url(base_url: &str, season_id: &str, display_name: &str) -> String {
    format!(
        "{}/{}/{}{}",
        base_url.trim_end_matches('/'),
        season_id,
        urlencoding::encode(display_name),
        FORCE_DOWNLOAD_QUERY
    )
}

/// Replace the feed host with the playback host
pub fn rewrite_host(url: &str) -> String {
    url.replace(FEED_HOST, PLAYBACK_HOST)
}

/// Whether a URL already has the playable form
pub fn is_playable(url: &str) -> bool {
    url.ends_with(PLAYABLE_SUFFIX)
}

/// Bring a feed link into the `.mp4?d=true` form.
///
/// The host is rewritten first. Links that already end with the playable
/// suffix are kept; `?d=mp4` becomes `.mp4?d=true`; a bare `.mp4` gets
/// `?d=true`; anything else gets the full suffix appended.
pub fn normalize_feed_url(url: &str) -> String {
    let url = rewrite_host(url);
    if is_playable(&url) {
        return url;
    }

    if url.contains(FEED_MP4_QUERY) {
        let replaced = url.replace(FEED_MP4_QUERY, PLAYABLE_SUFFIX);
        if is_playable(&replaced) {
            return replaced;
        }
        return append_suffix(replaced);
    }

    append_suffix(url)
}

fn append_suffix(url: String) -> String {
    if url.ends_with(".mp4") {
        format!("{}{}", url, FORCE_DOWNLOAD_QUERY)
    } else {
        format!("{}{}", url, PLAYABLE_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_id_quarters() {
        let cases = [
            ((2025, 1, 15), "2025-1"),
            ((2025, 3, 31), "2025-1"),
            ((2025, 4, 1), "2025-4"),
            ((2025, 8, 20), "2025-7"),
            ((2025, 12, 31), "2025-10"),
        ];
        for ((y, m, d), expected) in cases {
            let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
            assert_eq!(season_id(date), expected);
        }
    }

    #[test]
    fn test_season_catalog_url_encoding() {
        let url = season_catalog_url(
            "https://openani.an-i.workers.dev/",
            "2025-7",
            "[ANi] Example Show - 03 [1080P].mp4",
        );
        assert_eq!(
            url,
            "https://openani.an-i.workers.dev/2025-7/%5BANi%5D%20Example%20Show%20-%2003%20%5B1080P%5D.mp4?d=true"
        );
    }

    #[test]
    fn test_feed_url_query_rewrite() {
        assert_eq!(
            normalize_feed_url("https://resources.ani.rip/show/ep01?d=mp4"),
            "https://openani.an-i.workers.dev/show/ep01.mp4?d=true"
        );
    }

    #[test]
    fn test_feed_url_branches() {
        assert_eq!(
            normalize_feed_url("https://openani.an-i.workers.dev/a.mp4?d=true"),
            "https://openani.an-i.workers.dev/a.mp4?d=true"
        );
        assert_eq!(normalize_feed_url("https://h/a.mp4"), "https://h/a.mp4?d=true");
        assert_eq!(normalize_feed_url("https://h/a"), "https://h/a.mp4?d=true");
    }

    #[test]
    fn test_feed_url_suffix_is_total() {
        let inputs = [
            "",
            "?d=mp4",
            "https://h/a?d=mp4&x=1",
            "https://h/a.mp4?d=true#frag",
            "https://resources.ani.rip/",
            "not a url at all",
        ];
        for input in inputs {
            assert!(
                normalize_feed_url(input).ends_with(PLAYABLE_SUFFIX),
                "missing suffix for {input:?}"
            );
        }
    }
}
