use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::protocol::{Backend, Backends, Protocol};

/// What to do with a candidate playlist that is not a master playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonMasterPolicy {
    /// The candidate contributes no variant (it is usually a sub-playlist of a master).
    #[default]
    Skip,
    /// Use the URL as-is, provided the body is a media playlist.
    Passthrough,
}

/// HTTP client tuning (optional `[http]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Applies to playlist and slide requests; media streams are bounded by the fetch limit instead.
    pub request_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            request_timeout_secs: 300,
            user_agent: None,
        }
    }
}

/// One `[[backends]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub protocol: Protocol,
    pub origin: String,
    /// Regex matching the stable stream-URL prefix.
    pub base_prefix: String,
    pub page_signature: String,
}

fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig {
            protocol: Protocol::Matterhorn,
            origin: "https://matterhorn.dce.harvard.edu".to_string(),
            base_prefix: r"https://dvgni8clk4vbh\.cloudfront\.net/engage-player/[\w-]*/".to_string(),
            page_signature: "HUDCE Publication Listing".to_string(),
        },
        BackendConfig {
            protocol: Protocol::Panopto,
            origin: "https://harvard.hosted.panopto.com".to_string(),
            base_prefix: r"https://d2y36twrtb17ty\.cloudfront\.net/sessions/[\w-]*/[.\w-]*/"
                .to_string(),
            page_signature: "Capture, manage, and search all your video content.".to_string(),
        },
    ]
}

/// Global configuration loaded from `~/.config/lecdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LecdlConfig {
    /// Local destination root (default `~/.local/share/lecdl/videos`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_root: Option<PathBuf>,
    /// Mounted remote root used by `upload`. Must exist and be a directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_root: Option<PathBuf>,
    /// Metadata cache database (default `~/.local/state/lecdl/cache.db`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_db: Option<PathBuf>,
    /// Browser helper: program followed by fixed arguments.
    #[serde(default)]
    pub scraper_command: Vec<String>,
    /// Time allowed for login, including out-of-band two-factor confirmation.
    pub login_timeout_secs: u64,
    /// Wall-clock allowance for the whole scrape after login.
    pub scrape_timeout_secs: u64,
    /// Per-fetch cap during test runs.
    pub test_fetch_limit_secs: u64,
    /// Per-fetch hard cap during full runs.
    pub full_fetch_limit_secs: u64,
    /// Items kept from a multi-item task during test runs.
    pub test_run_items: usize,
    /// Sibling tasks run concurrently within one graph.
    pub max_parallel_fetches: usize,
    #[serde(default)]
    pub non_master_policy: NonMasterPolicy,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,
}

impl Default for LecdlConfig {
    fn default() -> Self {
        Self {
            video_root: None,
            publish_root: None,
            cache_db: None,
            scraper_command: Vec::new(),
            login_timeout_secs: 120,
            scrape_timeout_secs: 900,
            test_fetch_limit_secs: 1,
            full_fetch_limit_secs: 60 * 60,
            test_run_items: 2,
            max_parallel_fetches: 1,
            non_master_policy: NonMasterPolicy::Skip,
            http: HttpConfig::default(),
            backends: default_backends(),
        }
    }
}

impl LecdlConfig {
    /// Compile and check the `[[backends]]` table: exactly one entry per protocol.
    pub fn backends(&self) -> Result<Backends, ConfigError> {
        let mut matterhorn = None;
        let mut panopto = None;
        for entry in &self.backends {
            let base_prefix =
                Regex::new(&entry.base_prefix).map_err(|source| ConfigError::BasePrefix {
                    protocol: entry.protocol,
                    source,
                })?;
            let backend = Backend {
                protocol: entry.protocol,
                origin: entry.origin.clone(),
                base_prefix,
                page_signature: entry.page_signature.clone(),
            };
            let slot = match entry.protocol {
                Protocol::Matterhorn => &mut matterhorn,
                Protocol::Panopto => &mut panopto,
            };
            if slot.replace(backend).is_some() {
                return Err(ConfigError::DuplicateBackend(entry.protocol));
            }
        }
        Ok(Backends {
            matterhorn: matterhorn.ok_or(ConfigError::MissingBackend(Protocol::Matterhorn))?,
            panopto: panopto.ok_or(ConfigError::MissingBackend(Protocol::Panopto))?,
        })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("publish root is not configured (set publish_root or pass --publish-root)")]
    PublishRootMissing,
    #[error("publish root {0} does not exist")]
    PublishRootAbsent(PathBuf),
    #[error("publish root {0} is not a directory")]
    PublishRootNotDirectory(PathBuf),
    #[error("video root {0} exists but is not a directory")]
    VideoRootNotDirectory(PathBuf),
    #[error("scraper_command is empty; configure the browser helper program")]
    MissingScraper,
    #[error("invalid {protocol} base_prefix pattern: {source}")]
    BasePrefix {
        protocol: Protocol,
        #[source]
        source: regex::Error,
    },
    #[error("backend {0} is configured more than once")]
    DuplicateBackend(Protocol),
    #[error("backend {0} is not configured")]
    MissingBackend(Protocol),
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("xdg base directories: {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),
}

/// Which optional collaborators the invoked command needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Requirements {
    pub publish: bool,
    pub scraper: bool,
}

/// Configuration after eager validation; handed to every component.
#[derive(Debug, Clone)]
pub struct Settings {
    pub video_root: PathBuf,
    pub publish_root: Option<PathBuf>,
    pub cache_db: PathBuf,
    pub scraper_command: Vec<String>,
    pub login_timeout: Duration,
    pub scrape_timeout: Duration,
    pub test_fetch_limit: Duration,
    pub full_fetch_limit: Duration,
    pub test_run_items: usize,
    pub max_parallel_fetches: usize,
    pub non_master_policy: NonMasterPolicy,
    pub http: HttpConfig,
    pub backends: Backends,
}

impl Settings {
    /// Resolve defaults and check everything the command will touch.
    pub fn validate(cfg: &LecdlConfig, needs: Requirements) -> Result<Self, ConfigError> {
        let video_root = match &cfg.video_root {
            Some(p) => p.clone(),
            None => xdg::BaseDirectories::with_prefix("lecdl")?
                .get_data_home()
                .join("videos"),
        };
        if video_root.exists() && !video_root.is_dir() {
            return Err(ConfigError::VideoRootNotDirectory(video_root));
        }

        let publish_root = match (&cfg.publish_root, needs.publish) {
            (Some(root), true) => Some(check_publish_root(root)?),
            (None, true) => return Err(ConfigError::PublishRootMissing),
            (root, false) => root.clone(),
        };

        let cache_db = match &cfg.cache_db {
            Some(p) => p.clone(),
            None => xdg::BaseDirectories::with_prefix("lecdl")?
                .get_state_home()
                .join("cache.db"),
        };

        if needs.scraper && cfg.scraper_command.is_empty() {
            return Err(ConfigError::MissingScraper);
        }
        if cfg.test_run_items == 0 {
            return Err(ConfigError::Zero("test_run_items"));
        }
        if cfg.max_parallel_fetches == 0 {
            return Err(ConfigError::Zero("max_parallel_fetches"));
        }

        Ok(Self {
            video_root,
            publish_root,
            cache_db,
            scraper_command: cfg.scraper_command.clone(),
            login_timeout: Duration::from_secs(cfg.login_timeout_secs),
            scrape_timeout: Duration::from_secs(cfg.scrape_timeout_secs),
            test_fetch_limit: Duration::from_secs(cfg.test_fetch_limit_secs),
            full_fetch_limit: Duration::from_secs(cfg.full_fetch_limit_secs),
            test_run_items: cfg.test_run_items,
            max_parallel_fetches: cfg.max_parallel_fetches,
            non_master_policy: cfg.non_master_policy,
            http: cfg.http.clone(),
            backends: cfg.backends()?,
        })
    }

    /// Per-fetch time bound for a test or full run.
    pub fn fetch_limit(&self, test_run: bool) -> Duration {
        if test_run {
            self.test_fetch_limit
        } else {
            self.full_fetch_limit
        }
    }
}

fn check_publish_root(root: &Path) -> Result<PathBuf, ConfigError> {
    if !root.exists() {
        return Err(ConfigError::PublishRootAbsent(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ConfigError::PublishRootNotDirectory(root.to_path_buf()));
    }
    Ok(root.to_path_buf())
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("lecdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<LecdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = LecdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: LecdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
