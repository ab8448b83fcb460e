/// Season catalog aggregation: group episodes by series, keep the series
/// with the most episodes and flatten them back into an ordered name list.

use crate::naming::CanonicalItem;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Number of series kept in full catalog mode
pub const TOP_SERIES_LIMIT: usize = 15;

/// Episodes of one series, in discovery order until sorted
#[derive(Debug, Clone)]
pub struct SeriesGroup {
    pub series_key: String,
    pub episodes: Vec<CanonicalItem>,
}

impl SeriesGroup {
    fn new(series_key: String) -> Self {
        Self {
            series_key,
            episodes: Vec::new(),
        }
    }

    /// Order episodes by number; equal numbers keep discovery order
    fn sort_episodes(&mut self) {
        self.episodes.sort_by_key(|item| item.episode_number);
    }
}

/// Aggregate raw candidates into the display names of the top 15 series
pub fn aggregate<S: AsRef<str>>(candidates: &[S]) -> Vec<String> {
    aggregate_top(candidates, TOP_SERIES_LIMIT)
}

/// Aggregate raw candidates, keeping at most `limit` series.
///
/// Series are ranked by episode count, ties broken by first appearance, and
/// episodes within a series are ordered by episode number. Identical input
/// always produces identical output.
pub fn aggregate_top<S: AsRef<str>>(candidates: &[S], limit: usize) -> Vec<String> {
    let groups = ranked_groups(candidates);
    info!("Found {} distinct series", groups.len());

    let mut selected: Vec<SeriesGroup> = groups.into_iter().take(limit).collect();

    let mut names = Vec::new();
    for (rank, group) in selected.iter_mut().enumerate() {
        group.sort_episodes();
        info!("  {}. {} ({} episodes)", rank + 1, group.series_key, group.episodes.len());
        names.extend(group.episodes.iter().map(|item| item.display_name.clone()));
    }

    names
}

/// Build series groups in rank order without truncating
pub fn ranked_groups<S: AsRef<str>>(candidates: &[S]) -> Vec<SeriesGroup> {
    let mut groups: Vec<SeriesGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    for raw in candidates {
        let Some(item) = CanonicalItem::from_raw(raw.as_ref()) else {
            continue;
        };
        if item.series_key.is_empty() || !seen_names.insert(item.display_name.clone()) {
            debug!("Skipping candidate: {}", raw.as_ref());
            continue;
        }

        let slot = *index.entry(item.series_key.clone()).or_insert_with(|| {
            groups.push(SeriesGroup::new(item.series_key.clone()));
            groups.len() - 1
        });
        groups[slot].episodes.push(item);
    }

    // stable: equal counts keep first-seen order
    groups.sort_by_key(|group| Reverse(group.episodes.len()));
    groups
}
