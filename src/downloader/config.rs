//! Immutable run configuration.
//!
//! Sources (highest priority first):
//! 1. CLI flags (applied by `crate::cli`)
//! 2. Environment variables (`YT_BEST_YTDLP`, `YT_BEST_FFMPEG`, `YT_BEST_OUTDIR`)
//! 3. YAML config file (`$YT_BEST_CONFIG`, else `<config_dir>/yt-best/config.yaml`)
//! 4. Defaults
//!
//! The resolved value is built once and passed by reference; nothing reads
//! ambient state after startup.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::errors::DownloadError;
use super::identity::NegotiationIdentity;
use super::models::QualityConstraints;

pub const CONFIG_ENV: &str = "YT_BEST_CONFIG";
pub const YTDLP_ENV: &str = "YT_BEST_YTDLP";
pub const FFMPEG_ENV: &str = "YT_BEST_FFMPEG";
pub const OUTDIR_ENV: &str = "YT_BEST_OUTDIR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub identity: NegotiationIdentity,
    pub quality: QualityConstraints,
    pub network: NetworkConfig,
    pub subtitles: SubtitleConfig,
    pub playlist: PlaylistConfig,
    pub tools: ToolPaths,
    pub split: SplitConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("downloads"),
        }
    }
}

/// Network and fetch behaviour handed to yt-dlp
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,
    /// Netscape-format cookies file
    pub cookies_path: Option<PathBuf>,
    /// Keep encodings that need a PO token (may 403)
    pub include_token_gated: bool,
    /// Seconds to sleep between HTTP requests
    pub sleep_requests: f32,
    pub concurrent_fragments: u32,
    /// e.g. "5M" or a byte count
    pub http_chunk_size: Option<String>,
    /// yt-dlp --socket-timeout
    pub socket_timeout: u32,
    /// Budget for one catalog query
    pub catalog_timeout_secs: u64,
    /// Budget for the whole attempt loop of one item
    pub fetch_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            cookies_path: None,
            include_token_gated: false,
            sleep_requests: 2.0,
            concurrent_fragments: 4,
            http_chunk_size: None,
            socket_timeout: 30,
            catalog_timeout_secs: 60,
            fetch_timeout_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Language codes or ["all"]
    pub languages: Vec<String>,
    pub auto_generated: bool,
    /// Embed subtitles and thumbnail instead of sidecar files
    pub embed: bool,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            auto_generated: true,
            embed: false,
        }
    }
}

/// 1-based inclusive playlist window
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl PlaylistConfig {
    pub fn contains(&self, index: u32) -> bool {
        self.start.map_or(true, |s| index >= s) && self.end.map_or(true, |e| index <= e)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ytdlp: Option<String>,
    pub ffmpeg: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Concurrent segment extractions
    pub workers: usize,
    /// Budget for one ffmpeg invocation
    pub segment_timeout_secs: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            segment_timeout_secs: 600,
        }
    }
}

impl Config {
    /// Parse a YAML document; missing keys fall back to defaults
    pub fn from_yaml(content: &str) -> Result<Self, DownloadError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| DownloadError::Config(format!("invalid config file: {}", e)))
    }

    /// Load defaults, then the config file (if any), then the environment
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, DownloadError> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(Self::default_path);

        let mut config = match path {
            Some(ref p) if p.exists() => {
                let content = std::fs::read_to_string(p).map_err(|e| {
                    DownloadError::Config(format!("failed to read {}: {}", p.display(), e))
                })?;
                tracing::debug!("[Config] Loaded {}", p.display());
                Self::from_yaml(&content)?
            }
            Some(ref p) if explicit_path.is_some() => {
                return Err(DownloadError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/yt-best/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("yt-best").join("config.yaml"))
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(YTDLP_ENV).filter(|v| !v.is_empty()) {
            self.tools.ytdlp = Some(path);
        }
        if let Some(path) = lookup(FFMPEG_ENV).filter(|v| !v.is_empty()) {
            self.tools.ffmpeg = Some(path);
        }
        if let Some(dir) = lookup(OUTDIR_ENV).filter(|v| !v.is_empty()) {
            self.output.directory = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), DownloadError> {
        let q = &self.quality;
        if q.min_height > q.max_height {
            return Err(DownloadError::Config(format!(
                "min height {} exceeds max height {}",
                q.min_height, q.max_height
            )));
        }
        if q.ladder_depth == 0 {
            return Err(DownloadError::Config("ladder_depth must be at least 1".to_string()));
        }
        if self.split.workers == 0 {
            return Err(DownloadError::Config("split.workers must be at least 1".to_string()));
        }
        if let (Some(start), Some(end)) = (self.playlist.start, self.playlist.end) {
            if start > end {
                return Err(DownloadError::Config(format!(
                    "playlist start {} is after playlist end {}",
                    start, end
                )));
            }
        }
        Ok(())
    }
}
