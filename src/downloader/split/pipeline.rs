// Audio segmentation pipeline
//
// One exported file + ordered SegmentSpecs -> one track file per segment.
// Track numbers come from segment order and are fixed before any job is
// dispatched. Jobs run concurrently up to `workers`; a failed segment is
// recorded and never stops its siblings.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::parser::SegmentSpec;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::ItemMetadata;
use crate::downloader::naming::render_track_name;
use crate::downloader::utils::format_seconds;

/// Fully bounded extraction job for one track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackJob {
    /// 1-based, in segment order
    pub track: u32,
    pub total: u32,
    pub title: String,
    pub source: PathBuf,
    pub output: PathBuf,
    pub start: Duration,
    /// `None` reads to the end of the source
    pub length: Option<Duration>,
    pub tags: BTreeMap<String, String>,
}

/// Cuts one time slice out of a source file
#[async_trait]
pub trait SegmentExtractor: Send + Sync {
    async fn extract(&self, job: &TrackJob) -> Result<PathBuf, DownloadError>;
}

#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub track: u32,
    pub title: String,
    pub result: Result<PathBuf, DownloadError>,
}

impl SegmentOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-segment results, ordered by track number
#[derive(Debug, Clone)]
pub struct OutcomeReport {
    pub source: PathBuf,
    pub outcomes: Vec<SegmentOutcome>,
}

impl OutcomeReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(SegmentOutcome::is_success)
    }

    pub fn failed(&self) -> Vec<&SegmentOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }

    pub fn outputs(&self) -> Vec<&PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect()
    }

    pub fn completed(&self) -> usize {
        self.outcomes.len() - self.failed().len()
    }

    /// Summary error naming every failed segment, or `None` when all succeeded
    pub fn partial_failure(&self) -> Option<DownloadError> {
        let failures: Vec<DownloadError> = self
            .outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().cloned())
            .collect();
        if failures.is_empty() {
            return None;
        }
        Some(DownloadError::SegmentationPartialFailure {
            source_file: self.source.display().to_string(),
            total: self.outcomes.len(),
            completed: self.outputs().into_iter().cloned().collect(),
            failures,
        })
    }
}

pub struct SegmentationPipeline {
    extractor: Box<dyn SegmentExtractor>,
    workers: usize,
}

impl SegmentationPipeline {
    pub fn new(extractor: Box<dyn SegmentExtractor>, workers: usize) -> Self {
        Self {
            extractor,
            workers: workers.max(1),
        }
    }

    /// Build the job for segment `index`, or the failure it already is
    fn plan_job(
        source: &Path,
        item: &ItemMetadata,
        spec: &SegmentSpec,
        index: usize,
        total: usize,
        source_duration: Option<Duration>,
    ) -> Result<TrackJob, SegmentOutcome> {
        let track = index as u32 + 1;
        let title = spec
            .label
            .clone()
            .unwrap_or_else(|| format!("Track {}", track));

        let fail = |reason: String| SegmentOutcome {
            track,
            title: title.clone(),
            result: Err(DownloadError::SegmentExtractionFailed {
                track,
                title: title.clone(),
                reason,
            }),
        };

        let end = spec.end.resolve(source_duration);
        let length = match end {
            Some(end) if end <= spec.start => {
                return Err(fail(format!(
                    "empty or negative duration after clamping ({}s to {}s)",
                    format_seconds(spec.start),
                    format_seconds(end)
                )))
            }
            Some(end) => Some(end - spec.start),
            None => None,
        };

        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("m4a");
        let dir = source.parent().unwrap_or_else(|| Path::new("."));

        Ok(TrackJob {
            track,
            total: total as u32,
            title: title.clone(),
            source: source.to_path_buf(),
            output: dir.join(render_track_name(item, track, &title, ext)),
            start: spec.start,
            length,
            tags: spec.tags.clone(),
        })
    }

    pub async fn segment(
        &self,
        source: &Path,
        item: &ItemMetadata,
        specs: &[SegmentSpec],
        source_duration: Option<Duration>,
    ) -> OutcomeReport {
        let total = specs.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut jobs = Vec::with_capacity(total);

        for (index, spec) in specs.iter().enumerate() {
            match Self::plan_job(source, item, spec, index, total, source_duration) {
                Ok(job) => jobs.push(job),
                Err(outcome) => outcomes.push(outcome),
            }
        }

        info!(
            "[Split] {} segment(s) of {} with {} worker(s)",
            total,
            source.display(),
            self.workers
        );

        let extractor = self.extractor.as_ref();
        let finished: Vec<SegmentOutcome> = stream::iter(jobs)
            .map(|job| async move {
                let result = extractor.extract(&job).await.map_err(|e| match e {
                    failed @ DownloadError::SegmentExtractionFailed { .. } => failed,
                    other => DownloadError::SegmentExtractionFailed {
                        track: job.track,
                        title: job.title.clone(),
                        reason: other.to_string(),
                    },
                });
                SegmentOutcome {
                    track: job.track,
                    title: job.title,
                    result,
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        outcomes.extend(finished);
        outcomes.sort_by_key(|o| o.track);

        for outcome in &outcomes {
            match &outcome.result {
                Ok(path) => info!("[Split] Track {:02} -> {}", outcome.track, path.display()),
                Err(e) => warn!("[Split] Track {:02} failed: {}", outcome.track, e),
            }
        }

        OutcomeReport {
            source: source.to_path_buf(),
            outcomes,
        }
    }
}
