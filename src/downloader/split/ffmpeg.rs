// ffmpeg-backed SegmentExtractor
//
// Stream copy first; if ffmpeg fails or the copy is empty, re-encode audio
// to AAC 192k. Cover art rides along as the attached-picture stream and the
// source tags are copied before title/track and overrides are written.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::pipeline::{SegmentExtractor, TrackJob};
use crate::downloader::config::Config;
use crate::downloader::errors::DownloadError;
use crate::downloader::utils::{find_tool, format_seconds, run_output_with_timeout};

/// Containers that understand `-movflags`
const MOV_FAMILY: [&str; 4] = ["m4a", "mp4", "m4b", "mov"];

pub struct FfmpegExtractor {
    ffmpeg_path: String,
    timeout_secs: u64,
}

impl FfmpegExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            ffmpeg_path: find_tool("ffmpeg", config.tools.ffmpeg.as_deref()),
            timeout_secs: config.split.segment_timeout_secs,
        }
    }

    fn input_args(job: &TrackJob) -> Vec<String> {
        let mut args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            format_seconds(job.start),
        ];
        if let Some(length) = job.length {
            args.push("-t".to_string());
            args.push(format_seconds(length));
        }
        args.push("-i".to_string());
        args.push(job.source.display().to_string());
        args.extend(
            ["-map", "0:a", "-map", "0:v?"]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }

    fn metadata_args(job: &TrackJob) -> Vec<String> {
        let mut tags = vec![
            ("title".to_string(), job.title.clone()),
            ("track".to_string(), format!("{}/{}", job.track, job.total)),
        ];
        // Overrides replace the defaults above when they share a key
        for (key, value) in &job.tags {
            tags.retain(|(k, _)| k != key);
            tags.push((key.clone(), value.clone()));
        }

        let mut args = vec!["-map_metadata".to_string(), "0".to_string()];
        for (key, value) in tags {
            args.push("-metadata".to_string());
            args.push(format!("{}={}", key, value));
        }
        args
    }

    fn output_args(job: &TrackJob) -> Vec<String> {
        let mov_family = job
            .output
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| MOV_FAMILY.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        let mut args = Vec::new();
        if mov_family {
            args.push("-movflags".to_string());
            args.push("+faststart".to_string());
        }
        args.push(job.output.display().to_string());
        args
    }

    pub(crate) fn copy_args(job: &TrackJob) -> Vec<String> {
        let mut args = Self::input_args(job);
        args.push("-c".to_string());
        args.push("copy".to_string());
        args.extend(Self::metadata_args(job));
        args.extend(Self::output_args(job));
        args
    }

    pub(crate) fn reencode_args(job: &TrackJob) -> Vec<String> {
        let mut args = Self::input_args(job);
        args.extend(
            ["-c:v", "copy", "-c:a", "aac", "-b:a", "192k"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.extend(Self::metadata_args(job));
        args.extend(Self::output_args(job));
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<(), DownloadError> {
        debug!("[ffmpeg] {} {}", self.ffmpeg_path, args.join(" "));
        let output = run_output_with_timeout(&self.ffmpeg_path, args, self.timeout_secs).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(DownloadError::ExecutionError(if stderr.is_empty() {
            format!("ffmpeg exited with {}", output.status)
        } else {
            stderr
        }))
    }

    fn produced(job: &TrackJob) -> bool {
        std::fs::metadata(&job.output)
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }
}

#[async_trait]
impl SegmentExtractor for FfmpegExtractor {
    async fn extract(&self, job: &TrackJob) -> Result<PathBuf, DownloadError> {
        match self.run(Self::copy_args(job)).await {
            Ok(()) if Self::produced(job) => return Ok(job.output.clone()),
            Ok(()) => warn!("[Split] Track {:02}: stream copy produced an empty file, re-encoding", job.track),
            Err(DownloadError::ToolNotFound(tool)) => return Err(DownloadError::ToolNotFound(tool)),
            Err(e) => warn!("[Split] Track {:02}: stream copy failed ({}), re-encoding", job.track, e),
        }

        let failed = |reason: String| DownloadError::SegmentExtractionFailed {
            track: job.track,
            title: job.title.clone(),
            reason,
        };

        self.run(Self::reencode_args(job))
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !Self::produced(job) {
            return Err(failed("re-encode produced an empty file".to_string()));
        }
        Ok(job.output.clone())
    }
}
