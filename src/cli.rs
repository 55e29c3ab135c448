//! Command-line interface for yt-best.
//!
//! Flags override the config file and environment; the result is one
//! immutable `Config` plus a `DownloadRequest` handed to the orchestrator.

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser};
use tracing::info;

use crate::downloader::config::Config;
use crate::downloader::errors::{DownloadError, ExitStatus};
use crate::downloader::identity::NegotiationIdentity;
use crate::downloader::models::{parse_codec_preference, Mode};
use crate::downloader::orchestrator::{DownloadRequest, Downloader};
use crate::downloader::split::SplitSource;

/// yt-best - best-quality video/music/subtitle downloader (via yt-dlp)
#[derive(Parser, Debug)]
#[command(name = "yt-best")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").args(["video", "music", "subs_only"])))]
pub struct Cli {
    /// Video/playlist URLs or IDs (comma-separated values are expanded)
    pub urls: Vec<String>,

    /// Read URLs from a file (one per line, '#' or '//' comments)
    #[arg(long, value_name = "FILE")]
    pub urls_file: Option<PathBuf>,

    /// Output directory (default: downloads)
    #[arg(long, env = "YT_BEST_OUTDIR")]
    pub outdir: Option<PathBuf>,

    /// Best video + audio muxed to MKV (default)
    #[arg(long)]
    pub video: bool,

    /// Audio only (M4A) with cover and metadata
    #[arg(long)]
    pub music: bool,

    /// Captions only, no media
    #[arg(long)]
    pub subs_only: bool,

    /// Raw yt-dlp format expression; skips format resolution
    #[arg(long)]
    pub format: Option<String>,

    /// Subtitle languages, e.g. "en,ru" or "all"
    #[arg(long, value_delimiter = ',')]
    pub subs: Option<Vec<String>>,

    /// Don't download auto-generated captions
    #[arg(long)]
    pub no_auto_subs: bool,

    /// Embed subtitles and thumbnail into the video
    #[arg(long)]
    pub embed: bool,

    /// Max video height (default: 2160)
    #[arg(long)]
    pub max_res: Option<u32>,

    /// Minimum video height (default: 1080)
    #[arg(long)]
    pub min_res: Option<u32>,

    /// Accept the best below --min-res when nothing reaches it
    #[arg(long)]
    pub allow_below_min: bool,

    /// Codec preference order (default: av01,vp9,h264)
    #[arg(long)]
    pub prefer_codecs: Option<String>,

    /// YouTube player client: web_embedded, tv, web, web_safari, ios, android, mweb or auto
    #[arg(long)]
    pub player_variant: Option<NegotiationIdentity>,

    /// Keep formats that need a PO token (may 403)
    #[arg(long)]
    pub enable_missing_pot: bool,

    /// Seconds to sleep between requests (default: 2.0)
    #[arg(long)]
    pub sleep_requests: Option<f32>,

    /// Concurrent DASH/HLS fragments (default: 4)
    #[arg(long)]
    pub concurrent_fragments: Option<u32>,

    /// Max size per HTTP chunk, e.g. 5M or 5242880
    #[arg(long)]
    pub http_chunk_size: Option<String>,

    /// Netscape-format cookies file (for age/region)
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// Proxy, e.g. socks5://127.0.0.1:1080
    #[arg(long)]
    pub proxy: Option<String>,

    /// Playlist start index (1-based)
    #[arg(long)]
    pub playlist_start: Option<u32>,

    /// Playlist end index (inclusive)
    #[arg(long)]
    pub playlist_end: Option<u32>,

    /// Split spec (markers or ranges); @file reads it from a file
    #[arg(long)]
    pub split: Option<String>,

    /// Use chapters as the tracklist (music mode)
    #[arg(long)]
    pub split_from_chapters: bool,

    /// Concurrent segment extractions (default: 4)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Config file (default: <config dir>/yt-best/config.yaml)
    #[arg(long, env = "YT_BEST_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.music {
            Mode::Audio
        } else if self.subs_only {
            Mode::Subtitles
        } else {
            Mode::Video
        }
    }

    /// File, then environment, then these flags
    pub fn load_config(&self) -> Result<Config, DownloadError> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut Config) -> Result<(), DownloadError> {
        if let Some(dir) = &self.outdir {
            config.output.directory = dir.clone();
        }
        if let Some(identity) = self.player_variant {
            config.identity = identity;
        }

        let quality = &mut config.quality;
        if let Some(format) = self.format.as_ref().filter(|f| !f.trim().is_empty()) {
            quality.custom_format_override = Some(format.clone());
        }
        if let Some(max) = self.max_res {
            quality.max_height = max;
        }
        if let Some(min) = self.min_res {
            quality.min_height = min;
        }
        if self.allow_below_min {
            quality.allow_below_min = true;
        }
        if let Some(codecs) = &self.prefer_codecs {
            quality.codec_preference = parse_codec_preference(codecs)?;
        }

        let network = &mut config.network;
        if self.enable_missing_pot {
            network.include_token_gated = true;
        }
        if let Some(sleep) = self.sleep_requests {
            network.sleep_requests = sleep;
        }
        if let Some(fragments) = self.concurrent_fragments {
            network.concurrent_fragments = fragments;
        }
        if let Some(chunk) = &self.http_chunk_size {
            network.http_chunk_size = Some(chunk.clone());
        }
        if let Some(cookies) = &self.cookies {
            network.cookies_path = Some(cookies.clone());
        }
        if let Some(proxy) = &self.proxy {
            network.proxy = Some(proxy.clone());
        }

        if let Some(langs) = &self.subs {
            config.subtitles.languages = langs.clone();
        }
        if self.no_auto_subs {
            config.subtitles.auto_generated = false;
        }
        if self.embed {
            config.subtitles.embed = true;
        }

        if self.playlist_start.is_some() {
            config.playlist.start = self.playlist_start;
        }
        if self.playlist_end.is_some() {
            config.playlist.end = self.playlist_end;
        }
        if let Some(jobs) = self.jobs {
            config.split.workers = jobs;
        }
        Ok(())
    }

    /// Split files are read here so a bad directive fails before any fetch
    pub fn request(&self) -> Result<DownloadRequest, DownloadError> {
        let split = match &self.split {
            Some(arg) => Some(SplitSource::from_argument(arg)?.resolve()?),
            None => None,
        };
        Ok(DownloadRequest {
            mode: self.mode(),
            split,
            split_from_chapters: self.split_from_chapters,
        })
    }

    /// Positional URLs plus --urls-file entries, comma-expanded
    pub fn targets(&self) -> Result<Vec<String>, DownloadError> {
        let mut targets = expand_comma_separated(&self.urls);
        if let Some(path) = &self.urls_file {
            targets.extend(read_urls_from_file(path)?);
        }
        if targets.is_empty() {
            return Err(DownloadError::Usage(
                "no URLs given (pass URLs or --urls-file)".to_string(),
            ));
        }
        Ok(targets)
    }

    /// Run every target and fold the item statuses into the process status
    pub async fn execute(self) -> Result<ExitStatus, DownloadError> {
        let targets = self.targets()?;
        let request = self.request()?;
        let config = self.load_config()?;
        std::fs::create_dir_all(&config.output.directory)?;

        info!(
            "[Cli] {} target(s), mode {:?}, identity {}, output {}",
            targets.len(),
            request.mode,
            config.identity,
            config.output.directory.display()
        );

        let downloader = Downloader::from_config(config);
        let mut status = ExitStatus::Success;
        let mut delivered = 0usize;
        let mut total = 0usize;

        for target in &targets {
            for report in downloader.run(target, &request).await {
                total += 1;
                let item_status = report.status();
                if item_status == ExitStatus::Success {
                    delivered += 1;
                }
                status = status.max(item_status);
            }
        }

        info!("[Cli] Done: {}/{} item(s) succeeded", delivered, total);
        Ok(status)
    }
}

/// Split each value on ',' and drop empties
pub fn expand_comma_separated(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// URLs from a list file; blank and comment lines are skipped
pub fn read_urls_from_file(path: &Path) -> Result<Vec<String>, DownloadError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DownloadError::Usage(format!("failed to read URLs file '{}': {}", path.display(), e))
    })?;

    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("//"))
        .map(str::to_string)
        .collect();

    Ok(expand_comma_separated(&lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::Codec;
    use clap::CommandFactory;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["yt-best"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["yt-best", "--music", "--subs-only", "x"]).is_err());
        assert_eq!(parse(&["x"]).mode(), Mode::Video);
        assert_eq!(parse(&["--music", "x"]).mode(), Mode::Audio);
        assert_eq!(parse(&["--subs-only", "x"]).mode(), Mode::Subtitles);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = parse(&[
            "--min-res",
            "720",
            "--allow-below-min",
            "--prefer-codecs",
            "vp9,av01",
            "--player-variant",
            "auto",
            "--enable-missing-pot",
            "--subs",
            "en,de",
            "--no-auto-subs",
            "--playlist-start",
            "2",
            "--jobs",
            "8",
            "x",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config).unwrap();

        assert_eq!(config.quality.min_height, 720);
        assert!(config.quality.allow_below_min);
        assert_eq!(config.quality.codec_preference, vec![Codec::Vp9, Codec::Av1]);
        assert_eq!(config.identity, NegotiationIdentity::Auto);
        assert!(config.network.include_token_gated);
        assert_eq!(config.subtitles.languages, vec!["en", "de"]);
        assert!(!config.subtitles.auto_generated);
        assert_eq!(config.playlist.start, Some(2));
        assert_eq!(config.split.workers, 8);
        assert_eq!(config.quality.max_height, 2160);
    }

    #[test]
    fn test_unknown_player_variant_rejected() {
        assert!(Cli::try_parse_from(["yt-best", "--player-variant", "smart_tv", "x"]).is_err());
    }

    #[test]
    fn test_bad_codec_list_is_an_error() {
        let cli = parse(&["--prefer-codecs", "av01,theora", "x"]);
        assert!(cli.apply_overrides(&mut Config::default()).is_err());
    }

    #[test]
    fn test_format_override() {
        let cli = parse(&["--format", "bv*+ba", "x"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.quality.custom_format_override.as_deref(), Some("bv*+ba"));
    }

    #[test]
    fn test_split_directive_checked_up_front() {
        let cli = parse(&["--music", "--split", "0:00-2:00=A,1:00-3:00=B", "x"]);
        // Overlap is detected when the directive is parsed, not here
        assert!(cli.request().is_ok());

        let cli = parse(&["--music", "--split", "0:00,1:00-2:00", "x"]);
        let err = cli.request().unwrap_err();
        assert_eq!(err.exit_status(), ExitStatus::Usage);

        let cli = parse(&["--music", "--split", "@/nonexistent/tracks.txt", "x"]);
        assert_eq!(cli.request().unwrap_err().exit_status(), ExitStatus::Usage);
    }

    #[test]
    fn test_targets_expand_commas_and_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# my list").unwrap();
        writeln!(file, "https://youtu.be/aaaaaaaaaaa").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "// skipped").unwrap();
        writeln!(file, "bbbbbbbbbbb, ccccccccccc").unwrap();

        let path = file.path().display().to_string();
        let cli = parse(&["--urls-file", &path, "ddddddddddd,eeeeeeeeeee"]);
        assert_eq!(
            cli.targets().unwrap(),
            vec![
                "ddddddddddd",
                "eeeeeeeeeee",
                "https://youtu.be/aaaaaaaaaaa",
                "bbbbbbbbbbb",
                "ccccccccccc"
            ]
        );
    }

    #[test]
    fn test_no_targets_is_usage_error() {
        let cli = parse(&[]);
        assert_eq!(cli.targets().unwrap_err().exit_status(), ExitStatus::Usage);
    }

    #[test]
    fn test_missing_urls_file_is_usage_error() {
        let err = read_urls_from_file(Path::new("/nonexistent/urls.txt")).unwrap_err();
        assert_eq!(err.exit_status(), ExitStatus::Usage);
    }
}
