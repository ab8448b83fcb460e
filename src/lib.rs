/// ani-strm - stream descriptor generator
///
/// Turns anime release feeds, seasonal catalog pages and keyword search
/// results into `.strm` files that a media server can play directly.

pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod links;
pub mod naming;
pub mod retry;
pub mod service;
pub mod sources;
pub mod task;

// Re-export main types for easy access
pub use crate::catalog::{aggregate, ranked_groups, SeriesGroup, TOP_SERIES_LIMIT};
pub use crate::config::{Config, ConfigBuilder, ConfigStore, FileConfigStore, PluginOptions, SourceKind};
pub use crate::descriptor::{DescriptorWriter, WriteOutcome};
pub use crate::error::{FetchError, Result, StrmError};
pub use crate::naming::{normalize_name, CanonicalItem};
pub use crate::retry::RetryPolicy;
pub use crate::service::{Schedule, StrmPlugin, StrmService};
pub use crate::sources::{HttpClient, HttpFetcher, PageRenderer};
pub use crate::task::{RunMode, RunReport, RunSettings, TaskRunner};
