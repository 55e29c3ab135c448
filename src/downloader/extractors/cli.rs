// YtDlpCli - MediaExtractor backed by the native `yt-dlp` binary
//
// Every call is one yt-dlp process under a timeout. Catalog, chapter and
// item metadata come from `--dump-json`; playlists are expanded with
// `--flat-playlist -J`; fetches read the final path back via `--print`.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::progress::ProgressLog;
use super::traits::{FetchRequest, MediaExtractor};
use crate::downloader::catalog::normalize_formats;
use crate::downloader::config::{Config, NetworkConfig, PlaylistConfig, SubtitleConfig};
use crate::downloader::errors::DownloadError;
use crate::downloader::format_selector::Attempt;
use crate::downloader::identity::NegotiationIdentity;
use crate::downloader::models::{Chapter, EncodingDescriptor, FetchedItem, ItemMetadata, Mode, PlaylistEntry};
use crate::downloader::utils::{find_outputs, find_tool, run_output_with_timeout, run_streaming_with_timeout};

/// Raw output template; the orchestrator renames to the final name afterwards
const OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

const FETCH_PRINT: &str = "after_move:%(.{id,title,duration,playlist_title,playlist_index,filepath})j";

const MEDIA_EXTS: [&str; 9] = ["mkv", "mp4", "webm", "m4a", "mp3", "opus", "aac", "flac", "wav"];
const SUBTITLE_EXTS: [&str; 6] = ["vtt", "srt", "ass", "ttml", "srv3", "json3"];

pub struct YtDlpCli {
    ytdlp_path: String,
    default_identity: NegotiationIdentity,
    network: NetworkConfig,
    subtitles: SubtitleConfig,
    playlist: PlaylistConfig,
}

impl YtDlpCli {
    pub fn new(config: &Config) -> Self {
        Self {
            ytdlp_path: find_tool("yt-dlp", config.tools.ytdlp.as_deref()),
            default_identity: config.identity.concrete(),
            network: config.network.clone(),
            subtitles: config.subtitles.clone(),
            playlist: config.playlist.clone(),
        }
    }

    pub fn ytdlp_path(&self) -> &str {
        &self.ytdlp_path
    }

    /// `youtube:player_client=<identity>[;formats=missing_pot]`
    fn player_client_arg(&self, identity: NegotiationIdentity) -> String {
        let mut arg = format!("youtube:player_client={}", identity.concrete());
        if self.network.include_token_gated {
            arg.push_str(";formats=missing_pot");
        }
        arg
    }

    /// Flags shared by every invocation
    fn common_args(&self, identity: NegotiationIdentity) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.network.socket_timeout.to_string(),
            "--extractor-args".to_string(),
            self.player_client_arg(identity),
        ];

        if let Some(path) = &self.network.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.display().to_string());
        }

        if let Some(proxy) = &self.network.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args
    }

    fn subtitle_args(&self, embed: bool) -> Vec<String> {
        let mut args = vec![
            "--write-subs".to_string(),
            "--sub-langs".to_string(),
            self.subtitles.languages.join(","),
            "--sub-format".to_string(),
            "best".to_string(),
        ];
        if self.subtitles.auto_generated {
            args.push("--write-auto-subs".to_string());
        }
        if embed {
            args.push("--embed-subs".to_string());
        }
        args
    }

    pub(crate) fn build_info_args(&self, target: &str, identity: NegotiationIdentity) -> Vec<String> {
        let mut args = vec!["--dump-json".to_string(), "--no-playlist".to_string()];
        args.extend(self.common_args(identity));
        args.push(target.to_string());
        args
    }

    pub(crate) fn build_playlist_args(&self, target: &str) -> Vec<String> {
        let mut args = vec!["--flat-playlist".to_string(), "-J".to_string()];
        args.extend(self.common_args(self.default_identity));
        args.push(target.to_string());
        args
    }

    pub(crate) fn build_fetch_args(&self, target: &str, attempt: &Attempt, request: &FetchRequest) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            attempt.format.clone(),
            "--no-playlist".to_string(),
            "--continue".to_string(),
            "--no-overwrites".to_string(),
            "--retries".to_string(),
            "5".to_string(),
            "--sleep-requests".to_string(),
            self.network.sleep_requests.to_string(),
            "--concurrent-fragments".to_string(),
            self.network.concurrent_fragments.to_string(),
        ];
        args.extend(self.common_args(attempt.identity));

        if let Some(chunk) = &self.network.http_chunk_size {
            args.push("--http-chunk-size".to_string());
            args.push(chunk.clone());
        }

        match request.mode {
            Mode::Audio => {
                // Cover + tags are embedded so segmentation can copy them
                args.extend(
                    [
                        "-x",
                        "--audio-format",
                        "m4a",
                        "--audio-quality",
                        "0",
                        "--embed-metadata",
                        "--embed-thumbnail",
                    ]
                    .iter()
                    .map(|s| s.to_string()),
                );
                args.extend(self.subtitle_args(false));
            }
            _ => {
                args.push("--merge-output-format".to_string());
                args.push("mkv".to_string());
                args.extend(self.subtitle_args(self.subtitles.embed));
                if self.subtitles.embed {
                    args.push("--embed-thumbnail".to_string());
                    args.push("--embed-metadata".to_string());
                } else {
                    args.push("--write-thumbnail".to_string());
                }
            }
        }

        args.extend(self.output_args(request));
        args.push("--no-simulate".to_string());
        args.push("--print".to_string());
        args.push(FETCH_PRINT.to_string());
        // --print implies --quiet; keep progress, one update per line
        args.push("--progress".to_string());
        args.push("--newline".to_string());
        args.push(target.to_string());
        args
    }

    pub(crate) fn build_subtitle_fetch_args(
        &self,
        target: &str,
        identity: NegotiationIdentity,
        request: &FetchRequest,
    ) -> Vec<String> {
        let mut args = vec![
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
            "--sleep-requests".to_string(),
            self.network.sleep_requests.to_string(),
        ];
        args.extend(self.common_args(identity));
        args.extend(self.subtitle_args(false));
        args.extend(self.output_args(request));
        args.push("--no-simulate".to_string());
        args.push("--print".to_string());
        args.push("id".to_string());
        args.push(target.to_string());
        args
    }

    fn output_args(&self, request: &FetchRequest) -> Vec<String> {
        vec![
            "-P".to_string(),
            request.output_dir.display().to_string(),
            "-o".to_string(),
            OUTPUT_TEMPLATE.to_string(),
        ]
    }

    /// Run yt-dlp; non-zero exit becomes a classified DownloadError
    async fn run(&self, args: Vec<String>, timeout_secs: u64) -> Result<Vec<u8>, DownloadError> {
        debug!("[YtDlp] {} {}", self.ytdlp_path, args.join(" "));
        let output = run_output_with_timeout(&self.ytdlp_path, args, timeout_secs).await?;
        Self::check(output)
    }

    /// Same as `run`, reporting download progress while yt-dlp works
    async fn run_with_progress(&self, target: &str, args: Vec<String>, timeout_secs: u64) -> Result<Vec<u8>, DownloadError> {
        debug!("[YtDlp] {} {}", self.ytdlp_path, args.join(" "));
        let mut progress = ProgressLog::new(target);
        let output =
            run_streaming_with_timeout(&self.ytdlp_path, args, timeout_secs, |line| progress.observe(line)).await?;
        Self::check(output)
    }

    fn check(output: std::process::Output) -> Result<Vec<u8>, DownloadError> {
        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("yt-dlp exited with {}", output.status)
        } else {
            stderr
        };
        Err(DownloadError::from(message))
    }

    async fn dump_json(&self, target: &str, identity: NegotiationIdentity) -> Result<serde_json::Value, DownloadError> {
        let args = self.build_info_args(target, identity);
        let stdout = self.run(args, self.network.catalog_timeout_secs).await?;
        Self::parse_json(&stdout)
    }

    pub fn parse_json(stdout: &[u8]) -> Result<serde_json::Value, DownloadError> {
        let json_str = String::from_utf8_lossy(stdout);
        serde_json::from_str(json_str.trim())
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))
    }

    pub fn parse_item(json: &serde_json::Value) -> ItemMetadata {
        ItemMetadata {
            id: json["id"].as_str().unwrap_or("").to_string(),
            title: json["title"].as_str().unwrap_or("").to_string(),
            playlist_title: json["playlist_title"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            playlist_index: json["playlist_index"].as_u64().map(|i| i as u32),
            duration_seconds: json["duration"].as_f64(),
        }
    }

    /// Items of a `--flat-playlist -J` document, restricted to the playlist window
    pub fn parse_entries(json: &serde_json::Value, target: &str, window: &PlaylistConfig) -> Vec<PlaylistEntry> {
        let entries = match json["entries"].as_array() {
            Some(entries) if json["_type"].as_str() == Some("playlist") => entries,
            _ => {
                return vec![PlaylistEntry {
                    url: target.to_string(),
                    item: Self::parse_item(json),
                }]
            }
        };

        let playlist_title = json["title"].as_str().filter(|s| !s.is_empty()).map(str::to_string);

        entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let index = entry["playlist_index"].as_u64().map(|n| n as u32).unwrap_or(i as u32 + 1);
                if !window.contains(index) {
                    return None;
                }
                let mut item = Self::parse_item(entry);
                if item.id.is_empty() {
                    return None;
                }
                item.playlist_title = playlist_title.clone();
                item.playlist_index = Some(index);

                let url = entry["url"]
                    .as_str()
                    .filter(|u| u.starts_with("http"))
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", item.id));

                Some(PlaylistEntry { url, item })
            })
            .collect()
    }

    pub fn parse_chapters(json: &serde_json::Value) -> Vec<Chapter> {
        json["chapters"]
            .as_array()
            .map(|chapters| {
                chapters
                    .iter()
                    .map(|c| Chapter {
                        start_time: c["start_time"].as_f64().unwrap_or(0.0),
                        end_time: c["end_time"].as_f64(),
                        title: c["title"].as_str().map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Last JSON line printed by `--print after_move:...`
    fn parse_printed(stdout: &[u8]) -> Option<(ItemMetadata, PathBuf)> {
        let text = String::from_utf8_lossy(stdout);
        let line = text.lines().rev().map(str::trim).find(|l| l.starts_with('{'))?;
        let json: serde_json::Value = serde_json::from_str(line).ok()?;
        let path = json["filepath"].as_str().filter(|p| !p.is_empty())?;
        Some((Self::parse_item(&json), PathBuf::from(path)))
    }
}

#[async_trait]
impl MediaExtractor for YtDlpCli {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn list_entries(&self, target: &str) -> Result<Vec<PlaylistEntry>, DownloadError> {
        let args = self.build_playlist_args(target);
        let stdout = self.run(args, self.network.catalog_timeout_secs).await?;
        let json = Self::parse_json(&stdout)?;
        let entries = Self::parse_entries(&json, target, &self.playlist);
        info!("[YtDlp] {} expands to {} item(s)", target, entries.len());
        Ok(entries)
    }

    async fn list_encodings(
        &self,
        target: &str,
        identity: NegotiationIdentity,
    ) -> Result<Vec<EncodingDescriptor>, DownloadError> {
        let json = self.dump_json(target, identity).await?;
        normalize_formats(&json)
    }

    async fn fetch(
        &self,
        target: &str,
        attempt: &Attempt,
        request: &FetchRequest,
    ) -> Result<FetchedItem, DownloadError> {
        std::fs::create_dir_all(&request.output_dir)?;
        let args = self.build_fetch_args(target, attempt, request);
        let stdout = self
            .run_with_progress(target, args, self.network.fetch_timeout_secs)
            .await?;

        if let Some((item, path)) = Self::parse_printed(&stdout) {
            return Ok(FetchedItem { item, path });
        }

        // Nothing printed (e.g. file already present); look for it by id
        warn!("[YtDlp] No filepath printed for {}, scanning {}", target, request.output_dir.display());
        let json = self.dump_json(target, attempt.identity).await?;
        let item = Self::parse_item(&json);
        let path = find_outputs(&request.output_dir, &item.id, &MEDIA_EXTS)
            .into_iter()
            .next()
            .ok_or_else(|| DownloadError::ExecutionError(format!("yt-dlp produced no file for {}", target)))?;
        Ok(FetchedItem { item, path })
    }

    async fn fetch_subtitles(
        &self,
        target: &str,
        identity: NegotiationIdentity,
        request: &FetchRequest,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        std::fs::create_dir_all(&request.output_dir)?;
        let args = self.build_subtitle_fetch_args(target, identity, request);
        let stdout = self.run(args, self.network.fetch_timeout_secs).await?;

        let text = String::from_utf8_lossy(&stdout);
        let id = text
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| DownloadError::ParseError("yt-dlp printed no id".to_string()))?;

        Ok(find_outputs(&request.output_dir, id, &SUBTITLE_EXTS))
    }

    async fn list_chapters(&self, target: &str) -> Result<Vec<Chapter>, DownloadError> {
        let json = self.dump_json(target, self.default_identity).await?;
        Ok(Self::parse_chapters(&json))
    }
}
