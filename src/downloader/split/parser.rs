// Split specification parser
//
// Turns markers, labeled ranges, chapter lists or a file reference into an
// ordered, non-overlapping list of SegmentSpec. Parsing is all-or-nothing:
// any malformed entry rejects the whole directive.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::timecode::{parse_timecode, seconds_to_duration};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::Chapter;
use crate::downloader::naming::safe_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentEnd {
    At(Duration),
    EndOfFile,
}

impl SegmentEnd {
    /// Concrete end given the source length; `None` means "to end of source"
    pub fn resolve(self, source_duration: Option<Duration>) -> Option<Duration> {
        match (self, source_duration) {
            (Self::At(end), Some(total)) => Some(end.min(total)),
            (Self::At(end), None) => Some(end),
            (Self::EndOfFile, total) => total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSpec {
    pub start: Duration,
    pub end: SegmentEnd,
    pub label: Option<String>,
    /// Tag overrides written over the tags copied from the source
    pub tags: BTreeMap<String, String>,
}

impl SegmentSpec {
    pub fn new(start: Duration, end: SegmentEnd, label: Option<String>) -> Self {
        Self {
            start,
            end,
            label,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeEntry {
    pub start: Duration,
    pub end: SegmentEnd,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SplitSource {
    Markers(Vec<Duration>),
    Ranges(Vec<RangeEntry>),
    Chapters(Vec<Chapter>),
    /// Resolved into Markers or Ranges before use
    FileReference(PathBuf),
}

enum Entry {
    Marker(Duration),
    Range(RangeEntry),
}

fn malformed(msg: String) -> DownloadError {
    DownloadError::SplitSpecMalformed(msg)
}

fn parse_label(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(safe_label(trimmed))
    }
}

fn parse_entry(token: &str) -> Result<Entry, DownloadError> {
    let (range_part, label) = match token.split_once('=') {
        Some((range, label)) => (range, Some(label)),
        None => (token, None),
    };

    let Some((start_s, end_s)) = range_part.split_once('-') else {
        if label.is_some() {
            return Err(malformed(format!("labeled entry '{}' is not a range", token)));
        }
        return Ok(Entry::Marker(parse_timecode(token)?));
    };

    let start_s = start_s.trim();
    let end_s = end_s.trim();

    // Omitted start clamps to the beginning
    let start = if start_s.is_empty() {
        Duration::ZERO
    } else {
        parse_timecode(start_s)?
    };
    let end = if end_s.is_empty() || end_s.eq_ignore_ascii_case("end") {
        SegmentEnd::EndOfFile
    } else {
        SegmentEnd::At(parse_timecode(end_s)?)
    };

    if let SegmentEnd::At(end) = end {
        if end <= start {
            return Err(malformed(format!("range '{}' ends before it starts", token)));
        }
    }

    Ok(Entry::Range(RangeEntry {
        start,
        end,
        label: label.and_then(parse_label),
    }))
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c == ';' || c == '\n')
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("//")
}

/// All entries must be the same shape
fn build_source(entries: Vec<Entry>, origin: &str) -> Result<SplitSource, DownloadError> {
    if entries.is_empty() {
        return Err(malformed(format!("no split entries found in {}", origin)));
    }

    let mut markers = Vec::new();
    let mut ranges = Vec::new();
    for entry in entries {
        match entry {
            Entry::Marker(m) => markers.push(m),
            Entry::Range(r) => ranges.push(r),
        }
    }

    match (markers.is_empty(), ranges.is_empty()) {
        (false, true) => Ok(SplitSource::Markers(markers)),
        (true, false) => Ok(SplitSource::Ranges(ranges)),
        _ => Err(malformed(format!("{} mixes markers and ranges", origin))),
    }
}

impl SplitSource {
    /// Parse a command-line directive; a leading '@' names a spec file
    pub fn from_argument(arg: &str) -> Result<Self, DownloadError> {
        let arg = arg.trim();
        if let Some(path) = arg.strip_prefix('@') {
            let path = path.trim();
            if path.is_empty() {
                return Err(malformed("'@' must be followed by a file path".to_string()));
            }
            return Ok(Self::FileReference(PathBuf::from(path)));
        }

        let entries = tokens(arg).map(parse_entry).collect::<Result<Vec<_>, _>>()?;
        build_source(entries, "split directive")
    }

    /// Read a spec file into Markers or Ranges
    pub fn from_file(path: &Path) -> Result<Self, DownloadError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| malformed(format!("cannot read split file {}: {}", path.display(), e)))?;

        let mut entries = Vec::new();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || is_comment(line) {
                continue;
            }
            if line.starts_with('@') {
                return Err(malformed(format!("nested file reference '{}' in {}", line, path.display())));
            }
            for token in tokens(line) {
                entries.push(parse_entry(token)?);
            }
        }

        debug!("[Split] {} entries read from {}", entries.len(), path.display());
        build_source(entries, &path.display().to_string())
    }

    /// Replace a FileReference with what it points to
    pub fn resolve(self) -> Result<Self, DownloadError> {
        match self {
            Self::FileReference(path) => Self::from_file(&path),
            other => Ok(other),
        }
    }
}

/// Explicit markers/ranges win over chapters
pub fn select_source(explicit: Option<SplitSource>, chapters: Option<Vec<Chapter>>) -> Option<SplitSource> {
    explicit.or_else(|| chapters.map(SplitSource::Chapters))
}

pub fn parse(source: SplitSource) -> Result<Vec<SegmentSpec>, DownloadError> {
    match source.resolve()? {
        SplitSource::Markers(markers) => parse_markers(&markers),
        SplitSource::Ranges(ranges) => parse_ranges(ranges),
        SplitSource::Chapters(chapters) => parse_chapters(&chapters),
        SplitSource::FileReference(path) => Err(malformed(format!(
            "unresolved file reference {}",
            path.display()
        ))),
    }
}

fn parse_markers(markers: &[Duration]) -> Result<Vec<SegmentSpec>, DownloadError> {
    if markers.is_empty() {
        return Err(malformed("marker list is empty".to_string()));
    }

    if let Some(pair) = markers.windows(2).find(|w| w[1] <= w[0]) {
        return Err(malformed(format!(
            "markers must be strictly increasing ({:?} then {:?})",
            pair[0], pair[1]
        )));
    }

    Ok(markers
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end = markers
                .get(i + 1)
                .map(|next| SegmentEnd::At(*next))
                .unwrap_or(SegmentEnd::EndOfFile);
            SegmentSpec::new(*start, end, None)
        })
        .collect())
}

fn parse_ranges(ranges: Vec<RangeEntry>) -> Result<Vec<SegmentSpec>, DownloadError> {
    if ranges.is_empty() {
        return Err(malformed("range list is empty".to_string()));
    }

    for pair in ranges.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start < prev.start {
            return Err(malformed(format!(
                "ranges must be in ascending order ({:?} after {:?})",
                next.start, prev.start
            )));
        }
        let overlaps = match prev.end {
            SegmentEnd::EndOfFile => true,
            SegmentEnd::At(end) => next.start < end,
        };
        if overlaps {
            return Err(malformed(format!(
                "range starting at {:?} overlaps the previous range",
                next.start
            )));
        }
    }

    Ok(ranges
        .into_iter()
        .map(|r| SegmentSpec::new(r.start, r.end, r.label))
        .collect())
}

/// One segment per chapter, in start order. A chapter ends at its own end or
/// the next chapter's start, whichever comes first.
fn parse_chapters(chapters: &[Chapter]) -> Result<Vec<SegmentSpec>, DownloadError> {
    if chapters.is_empty() {
        return Ok(vec![SegmentSpec::new(Duration::ZERO, SegmentEnd::EndOfFile, None)]);
    }

    let seconds = |s: f64| {
        seconds_to_duration(s)
            .ok_or_else(|| malformed(format!("chapter time {} is out of range", s)))
    };

    let mut ordered: Vec<&Chapter> = chapters.iter().collect();
    ordered.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut segments = Vec::with_capacity(ordered.len());
    for (i, chapter) in ordered.iter().enumerate() {
        let start = seconds(chapter.start_time)?;
        let own_end = chapter.end_time.map(seconds).transpose()?;
        let next_start = ordered
            .get(i + 1)
            .map(|next| seconds(next.start_time))
            .transpose()?;
        let end = match (own_end, next_start) {
            (Some(own), Some(next)) => SegmentEnd::At(own.min(next)),
            (Some(own), None) => SegmentEnd::At(own),
            (None, Some(next)) => SegmentEnd::At(next),
            (None, None) => SegmentEnd::EndOfFile,
        };
        let label = chapter.title.as_deref().and_then(parse_label);
        segments.push(SegmentSpec::new(start, end, label));
    }
    Ok(segments)
}
