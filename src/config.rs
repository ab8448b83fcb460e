use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for ani-strm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plugin switches and storage, persisted by the host
    pub plugin: PluginOptions,

    /// HTTP client settings
    pub network: NetworkConfig,

    /// Remote endpoints
    pub sources: SourceConfig,

    /// Delays between remote requests and scheduled runs
    pub pacing: PacingConfig,
}

/// Which listing the plugin draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Seasonal anime feed and catalog
    #[default]
    Anime,
    /// Keyword searches on a video site
    Search,
}

/// Flat option map as stored by the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginOptions {
    /// Enable the recurring job
    pub enabled: bool,

    /// Crontab expression for the recurring job
    pub cron: Option<String>,

    /// Run once shortly after activation, then clear
    pub onlyonce: bool,

    /// Make the one-shot run a full catalog run, then clear
    pub fulladd: bool,

    /// Directory descriptors are written to
    pub storageplace: PathBuf,

    /// Newline separated keywords for search mode
    pub search_keywords: String,

    /// Plugin variant
    pub source: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// User agent sent with every request (browser default when unset)
    pub user_agent: Option<String>,

    /// Proxy URL for all requests
    pub proxy: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Enable page rendering; full catalog and search runs are skipped without it
    pub render_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// RSS feed of newly released episodes
    pub feed_url: String,

    /// Base URL of the season catalog and playback host
    pub catalog_base_url: String,

    /// Base URL of the keyword search site
    pub search_base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause after each search result, in milliseconds
    pub item_delay_ms: u64,

    /// Delay before the one-shot run, in seconds
    pub onlyonce_delay_secs: u64,
}

impl PluginOptions {
    /// Keywords for search mode, blank lines dropped
    pub fn keywords(&self) -> Vec<String> {
        self.search_keywords
            .lines()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl PacingConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn onlyonce_delay(&self) -> Duration {
        Duration::from_secs(self.onlyonce_delay_secs)
    }
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            cron: Some("*/20 22,23,0,1 * * *".to_string()),
            onlyonce: false,
            fulladd: false,
            storageplace: PathBuf::from("/downloads/strm"),
            search_keywords: String::new(),
            source: SourceKind::Anime,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            proxy: None,
            timeout_seconds: 30,
            render_enabled: true,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            feed_url: "https://api.ani.rip/ani-download.xml".to_string(),
            catalog_base_url: "https://openani.an-i.workers.dev".to_string(),
            search_base_url: String::new(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            item_delay_ms: 2000,
            onlyonce_delay_secs: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin: PluginOptions::default(),
            network: NetworkConfig::default(),
            sources: SourceConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the first readable default location,
    /// falling back to environment variables
    pub fn load() -> Result<Self> {
        let config_paths = [
            "ani-strm.toml",
            "config/ani-strm.toml",
            "/etc/ani-strm/config.toml",
        ];

        for path in &config_paths {
            if Path::new(path).exists() {
                match Self::load_from(path) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config file {}: {}", path, e),
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific file, then apply environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let mut config: Config = toml::from_str(&config_str)?;
        config.apply_env();
        tracing::info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Default configuration with environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(storage) = std::env::var("ANI_STRM_STORAGE") {
            self.plugin.storageplace = PathBuf::from(storage);
        }

        if let Ok(cron) = std::env::var("ANI_STRM_CRON") {
            self.plugin.cron = Some(cron);
        }

        if let Ok(proxy) = std::env::var("ANI_STRM_PROXY") {
            self.network.proxy = Some(proxy);
        }

        if let Ok(user_agent) = std::env::var("ANI_STRM_USER_AGENT") {
            self.network.user_agent = Some(user_agent);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.plugin.storageplace.as_os_str().is_empty() {
            return Err(anyhow!("storageplace must be set"));
        }

        if self.network.timeout_seconds == 0 {
            return Err(anyhow!("timeout_seconds must be greater than 0"));
        }

        match self.plugin.source {
            SourceKind::Anime => {
                if self.sources.feed_url.is_empty() || self.sources.catalog_base_url.is_empty() {
                    return Err(anyhow!("feed_url and catalog_base_url are required for anime mode"));
                }
            }
            SourceKind::Search => {
                if self.sources.search_base_url.is_empty() {
                    return Err(anyhow!("search_base_url is required for search mode"));
                }
            }
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "ani-strm configuration:\n\
            - Source: {:?}\n\
            - Enabled: {}\n\
            - Cron: {}\n\
            - Storage: {}\n\
            - Proxy: {}\n\
            - Rendering: {}\n\
            - Keywords: {}",
            self.plugin.source,
            self.plugin.enabled,
            self.plugin.cron.as_deref().unwrap_or("-"),
            self.plugin.storageplace.display(),
            self.network.proxy.as_deref().unwrap_or("-"),
            self.network.render_enabled,
            self.plugin.keywords().len()
        )
    }
}

/// Persistence of the flat plugin options
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<PluginOptions>;
    fn save(&self, options: &PluginOptions) -> Result<()>;
}

/// Stores plugin options in the `[plugin]` table of a TOML config file
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_full(&self) -> Result<Config> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<PluginOptions> {
        Ok(self.read_full()?.plugin)
    }

    fn save(&self, options: &PluginOptions) -> Result<()> {
        let mut config = self.read_full()?;
        config.plugin = options.clone();
        config.save(&self.path)
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_storage(mut self, dir: PathBuf) -> Self {
        self.config.plugin.storageplace = dir;
        self
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.config.plugin.source = source;
        self
    }

    pub fn with_cron(mut self, cron: Option<String>) -> Self {
        self.config.plugin.cron = cron;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.plugin.enabled = enabled;
        self
    }

    pub fn run_once(mut self, onlyonce: bool, fulladd: bool) -> Self {
        self.config.plugin.onlyonce = onlyonce;
        self.config.plugin.fulladd = fulladd;
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.config.plugin.search_keywords = keywords.join("\n");
        self
    }

    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.config.sources.feed_url = url.into();
        self
    }

    pub fn with_catalog_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.sources.catalog_base_url = url.into();
        self
    }

    pub fn with_search_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.sources.search_base_url = url.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.config.network.proxy = proxy;
        self
    }

    pub fn enable_rendering(mut self, enable: bool) -> Self {
        self.config.network.render_enabled = enable;
        self
    }

    pub fn with_item_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.pacing.item_delay_ms = delay_ms;
        self
    }

    pub fn with_onlyonce_delay_secs(mut self, delay_secs: u64) -> Self {
        self.config.pacing.onlyonce_delay_secs = delay_secs;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
