// Orchestrator - drives one target from catalog to named files
//
// Per item: resolve a plan, walk it attempt by attempt (first success wins,
// whole loop under the fetch timeout), rename the result to the output
// policy name, then optionally split audio into tracks.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::catalog::CatalogAdapter;
use super::config::Config;
use super::errors::{DownloadError, ExitStatus};
use super::extractors::{diagnose_error, FetchRequest, MediaExtractor, YtDlpCli};
use super::format_selector::{resolve_plan, Attempt, ResolvedPlan, SelectionMode};
use super::models::{FetchedItem, ItemMetadata, Mode, PlaylistEntry};
use super::naming::render_stem;
use super::split::{
    self, format_timecode, FfmpegExtractor, OutcomeReport, SegmentExtractor, SegmentSpec, SegmentationPipeline,
    SplitSource,
};

/// What the caller wants for one target
#[derive(Debug, Clone, Default)]
pub struct DownloadRequest {
    pub mode: Mode,
    /// Explicit markers/ranges; wins over chapters
    pub split: Option<SplitSource>,
    pub split_from_chapters: bool,
}

impl DownloadRequest {
    pub fn wants_split(&self) -> bool {
        self.split.is_some() || self.split_from_chapters
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemOutput {
    pub item: ItemMetadata,
    pub media: Option<PathBuf>,
    /// Tracks that were written, in track order
    pub tracks: Vec<PathBuf>,
    pub subtitles: Vec<PathBuf>,
    /// Attempt that produced `media`
    pub attempt: Option<Attempt>,
    /// Per-segment outcomes when the item was split
    pub segments: Option<OutcomeReport>,
}

impl ItemOutput {
    /// Summary of failed segments, if any
    pub fn segmentation_failure(&self) -> Option<DownloadError> {
        self.segments.as_ref().and_then(OutcomeReport::partial_failure)
    }
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub target: String,
    pub outcome: Result<ItemOutput, DownloadError>,
}

impl ItemReport {
    pub fn status(&self) -> ExitStatus {
        match &self.outcome {
            Ok(output) => output
                .segmentation_failure()
                .map(|e| e.exit_status())
                .unwrap_or(ExitStatus::Success),
            Err(e) => e.exit_status(),
        }
    }
}

pub struct Downloader {
    config: Config,
    extractor: Box<dyn MediaExtractor>,
    pipeline: SegmentationPipeline,
}

impl Downloader {
    pub fn new(config: Config, extractor: Box<dyn MediaExtractor>, segmenter: Box<dyn SegmentExtractor>) -> Self {
        let workers = config.split.workers;
        debug!("[Orchestrator] {} extractor, {} split worker(s)", extractor.name(), workers);
        Self {
            config,
            extractor,
            pipeline: SegmentationPipeline::new(segmenter, workers),
        }
    }

    /// yt-dlp for media, ffmpeg for segmentation
    pub fn from_config(config: Config) -> Self {
        let extractor = Box::new(YtDlpCli::new(&config));
        let segmenter = Box::new(FfmpegExtractor::new(&config));
        Self::new(config, extractor, segmenter)
    }

    /// Process every item behind `target`; one report per item
    pub async fn run(&self, target: &str, request: &DownloadRequest) -> Vec<ItemReport> {
        let failed = |e: DownloadError| {
            error!("[Orchestrator] {}: {}", target, e);
            vec![ItemReport {
                target: target.to_string(),
                outcome: Err(e),
            }]
        };

        // A malformed directive is fatal before anything is fetched
        let explicit_segments = match self.explicit_segments(request) {
            Ok(segments) => segments,
            Err(e) => return failed(e),
        };

        let entries = match self.extractor.list_entries(target).await {
            Ok(entries) => entries,
            Err(e) => return failed(e),
        };

        if entries.is_empty() {
            warn!("[Orchestrator] {} has no items in the selected range", target);
            return Vec::new();
        }

        let mut reports = Vec::with_capacity(entries.len());
        for entry in &entries {
            info!(
                "[Orchestrator] Item {}: {} ({})",
                entry.item.playlist_index.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string()),
                entry.item.title,
                entry.url
            );
            let outcome = self
                .process_item(entry, request, explicit_segments.as_deref())
                .await;
            match &outcome {
                Err(e) => error!("[Orchestrator] {}: {}", entry.url, e),
                Ok(output) => {
                    if let Some(e) = output.segmentation_failure() {
                        error!("[Orchestrator] {}: {}", entry.url, e);
                    }
                }
            }
            reports.push(ItemReport {
                target: entry.url.clone(),
                outcome,
            });
        }
        reports
    }

    fn explicit_segments(&self, request: &DownloadRequest) -> Result<Option<Vec<SegmentSpec>>, DownloadError> {
        if request.mode != Mode::Audio {
            if request.wants_split() {
                warn!("[Orchestrator] Splitting only applies in music mode; ignoring split options");
            }
            return Ok(None);
        }
        request.split.clone().map(split::parse).transpose()
    }

    async fn process_item(
        &self,
        entry: &PlaylistEntry,
        request: &DownloadRequest,
        explicit_segments: Option<&[SegmentSpec]>,
    ) -> Result<ItemOutput, DownloadError> {
        let fetch = FetchRequest {
            mode: request.mode,
            output_dir: self.config.output.directory.clone(),
        };

        let Some(selection) = SelectionMode::for_mode(request.mode) else {
            let subtitles = self
                .extractor
                .fetch_subtitles(&entry.url, self.config.identity.concrete(), &fetch)
                .await?;
            info!("[Orchestrator] {} subtitle file(s) for {}", subtitles.len(), entry.url);
            return Ok(ItemOutput {
                item: entry.item.clone(),
                subtitles,
                ..Default::default()
            });
        };

        let adapter = CatalogAdapter::new(self.extractor.as_ref(), self.config.network.include_token_gated);
        let plan = resolve_plan(
            &adapter,
            &entry.url,
            &self.config.quality,
            selection,
            self.config.identity,
        )
        .await?;

        let (attempt, fetched) = self.execute_plan(&entry.url, &plan, &fetch).await?;
        let item = merge_metadata(&entry.item, &fetched.item);
        let media = rename_with_sidecars(&fetched.path, &render_stem(&item))?;
        info!("[Orchestrator] Saved {}", media.display());

        let mut output = ItemOutput {
            item,
            media: Some(media),
            attempt: Some(attempt),
            ..Default::default()
        };

        if request.mode == Mode::Audio && request.wants_split() {
            if let Some(report) = self.split_item(&entry.url, &output, request, explicit_segments).await? {
                output.tracks = report.outputs().into_iter().cloned().collect();
                output.segments = Some(report);
            }
        }
        Ok(output)
    }

    /// Walk the plan sequentially; stop at the first success
    pub async fn execute_plan(
        &self,
        target: &str,
        plan: &ResolvedPlan,
        fetch: &FetchRequest,
    ) -> Result<(Attempt, FetchedItem), DownloadError> {
        let budget = Duration::from_secs(self.config.network.fetch_timeout_secs);

        let attempts = async {
            let mut failures = Vec::new();

            for (index, attempt) in plan.iter().enumerate() {
                let number = index + 1;
                info!(
                    "[Orchestrator] Attempt {}/{}: {} via {} ({})",
                    number,
                    plan.len(),
                    attempt.format,
                    attempt.identity,
                    self.extractor.name()
                );

                match self.extractor.fetch(target, attempt, fetch).await {
                    Ok(fetched) => {
                        info!("[Orchestrator] Attempt {} succeeded", number);
                        return Ok((attempt.clone(), fetched));
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        let blocking = diagnose_error(&reason);
                        warn!("[Orchestrator] Attempt {} failed: {}", number, reason);
                        if let Some(hint) = blocking.and_then(|b| b.suggestion()) {
                            info!("[Orchestrator] Hint: {}", hint);
                        }
                        failures.push(DownloadError::FetchAttemptFailed {
                            attempt: number,
                            identity: attempt.identity,
                            format: attempt.format.clone(),
                            reason,
                            blocking,
                        });
                    }
                }
            }

            Err(DownloadError::AllAttemptsExhausted {
                target: target.to_string(),
                failures,
            })
        };

        match tokio::time::timeout(budget, attempts).await {
            Ok(result) => result,
            Err(_) => Err(DownloadError::Timeout(format!(
                "fetch attempts for {} exceeded {}s",
                target,
                budget.as_secs()
            ))),
        }
    }

    async fn split_item(
        &self,
        target: &str,
        output: &ItemOutput,
        request: &DownloadRequest,
        explicit_segments: Option<&[SegmentSpec]>,
    ) -> Result<Option<OutcomeReport>, DownloadError> {
        let Some(media) = output.media.as_deref() else {
            return Ok(None);
        };

        let segments = match explicit_segments {
            Some(segments) => segments.to_vec(),
            None => {
                let chapters = if request.split_from_chapters {
                    Some(self.extractor.list_chapters(target).await?)
                } else {
                    None
                };
                match split::select_source(None, chapters) {
                    Some(source) => split::parse(source)?,
                    None => return Ok(None),
                }
            }
        };

        for (i, s) in segments.iter().enumerate() {
            let end = match s.end {
                split::SegmentEnd::At(end) => format_timecode(end),
                split::SegmentEnd::EndOfFile => "end".to_string(),
            };
            info!(
                "[Split] Segment {:02}: {} - {} {}",
                i + 1,
                format_timecode(s.start),
                end,
                s.label.as_deref().unwrap_or("")
            );
        }

        let duration = output
            .item
            .duration_seconds
            .filter(|d| *d > 0.0)
            .and_then(split::seconds_to_duration);

        let report = self.pipeline.segment(media, &output.item, &segments, duration).await;
        Ok(Some(report))
    }
}

/// Listing metadata carries playlist context; the fetch carries the rest
fn merge_metadata(listed: &ItemMetadata, fetched: &ItemMetadata) -> ItemMetadata {
    let pick = |a: &str, b: &str| if a.is_empty() { b.to_string() } else { a.to_string() };
    ItemMetadata {
        id: pick(&fetched.id, &listed.id),
        title: pick(&fetched.title, &listed.title),
        playlist_title: listed.playlist_title.clone().or_else(|| fetched.playlist_title.clone()),
        playlist_index: listed.playlist_index.or(fetched.playlist_index),
        duration_seconds: fetched.duration_seconds.or(listed.duration_seconds),
    }
}

/// Rename `path` to `<stem>.<ext>` and move sidecars sharing its stem
/// (`<old stem>.en.vtt`, `<old stem>.webp`, ...) along with it
fn rename_with_sidecars(path: &Path, stem: &str) -> Result<PathBuf, DownloadError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let old_stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DownloadError::Io(format!("unusable file name: {}", path.display())))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let target = if ext.is_empty() {
        dir.join(stem)
    } else {
        dir.join(format!("{}.{}", stem, ext))
    };
    if target.file_name() == path.file_name() {
        return Ok(path.to_path_buf());
    }

    let prefix = format!("{}.", old_stem);
    let sidecars: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.file_name() != path.file_name())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(&prefix))
        })
        .collect();

    std::fs::rename(path, &target)?;

    for sidecar in sidecars {
        let Some(name) = sidecar.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let renamed = dir.join(format!("{}.{}", stem, &name[prefix.len()..]));
        if let Err(e) = std::fs::rename(&sidecar, &renamed) {
            warn!("[Orchestrator] Could not rename {}: {}", sidecar.display(), e);
        }
    }

    Ok(target)
}
