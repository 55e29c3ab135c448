// Error types for the resolver, the fetch loop and the split pipeline

use std::path::PathBuf;
use thiserror::Error;

use super::extractors::BlockingReason;
use super::identity::NegotiationIdentity;

#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// Every identity tried returned an empty catalog
    #[error("no encodings listed for {target} (identities tried: {}){}", join_identities(.identities), last_error_suffix(.last_error))]
    CatalogEmpty {
        target: String,
        identities: Vec<NegotiationIdentity>,
        last_error: Option<String>,
    },

    /// Catalog was non-empty but nothing met the height floor and fallback is disallowed
    #[error("no encoding of {target} reaches {min_height}p (identities tried: {}); use --allow-below-min to relax", join_identities(.identities))]
    NoViableCandidate {
        target: String,
        min_height: u32,
        identities: Vec<NegotiationIdentity>,
    },

    /// A single ladder entry failed; the next entry is tried
    #[error("attempt {attempt} ({identity}, format '{format}') failed: {reason}{}", blocking_suffix(.blocking))]
    FetchAttemptFailed {
        attempt: usize,
        identity: NegotiationIdentity,
        format: String,
        reason: String,
        blocking: Option<BlockingReason>,
    },

    /// The whole ladder was drained without a success
    #[error("all {} fetch attempts for {target} failed; last: {}", .failures.len(), last_failure(.failures))]
    AllAttemptsExhausted {
        target: String,
        failures: Vec<DownloadError>,
    },

    /// Split directive could not be parsed; nothing is exported
    #[error("malformed split spec: {0}")]
    SplitSpecMalformed(String),

    /// One segment failed; siblings keep going
    #[error("segment {track} ({title}) failed: {reason}")]
    SegmentExtractionFailed {
        track: u32,
        title: String,
        reason: String,
    },

    /// Summary of a pipeline run where some segments failed
    #[error("{} of {total} segments failed for {source_file}: {}", .failures.len(), join_failures(.failures))]
    SegmentationPartialFailure {
        source_file: String,
        total: usize,
        /// Tracks that were written
        completed: Vec<PathBuf>,
        /// One SegmentExtractionFailed per failed segment, in track order
        failures: Vec<DownloadError>,
    },

    /// Bad invocation: no targets, unreadable URL list
    #[error("{0}")]
    Usage(String),

    /// Network timeout while connecting to YouTube
    #[error("Network timeout: YouTube is not responding")]
    NetworkTimeout,

    /// YouTube blocked the request (429, bot detection, etc.)
    #[error("YouTube is throttling requests from this IP address; wait, switch network or use a proxy")]
    BlockedByYouTube,

    /// Operation exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// yt-dlp or ffmpeg not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse tool JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Command execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// Unknown error with details
    #[error("Unknown error: {0}")]
    Unknown(String),
}

fn join_identities(identities: &[NegotiationIdentity]) -> String {
    identities
        .iter()
        .map(|i| i.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!("; last error: {}", e),
        None => String::new(),
    }
}

fn blocking_suffix(blocking: &Option<BlockingReason>) -> String {
    match blocking {
        Some(reason) => format!(" [{}]", reason.description()),
        None => String::new(),
    }
}

fn join_failures(failures: &[DownloadError]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn last_failure(failures: &[DownloadError]) -> String {
    failures
        .last()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "no attempts were made".to_string())
}

impl DownloadError {
    /// Exit status category observed by the surrounding shell layer
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::CatalogEmpty { .. } | Self::NoViableCandidate { .. } => ExitStatus::NoViableFormat,
            Self::AllAttemptsExhausted { .. } => ExitStatus::AttemptsExhausted,
            Self::SegmentationPartialFailure { .. } | Self::SegmentExtractionFailed { .. } => {
                ExitStatus::SegmentationPartial
            }
            Self::SplitSpecMalformed(_) | Self::Usage(_) => ExitStatus::Usage,
            _ => ExitStatus::Failure,
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// Classify raw tool stderr
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        // IP blocking detection (most important)
        if (s.contains("timeout") || s.contains("timed out")) && s.contains("youtube.com") {
            return Self::BlockedByYouTube;
        }

        // Generic network timeout
        if s.contains("timeout") || s.contains("timed out") {
            return Self::NetworkTimeout;
        }

        // Explicit blocks
        if s.contains("429") || s.contains("bot") || s.contains("blocked") {
            return Self::BlockedByYouTube;
        }

        if s.contains("not found") || s.contains("No such file") || s.contains("command not found") {
            return Self::ToolNotFound(s);
        }

        if s.contains("parse") || s.contains("JSON") {
            return Self::ParseError(s);
        }

        if s.contains("Invalid URL") || s.contains("Unsupported URL") {
            return Self::InvalidUrl(s);
        }

        Self::Unknown(s)
    }
}

/// Process exit categories, declared from least to most severe.
///
/// Several items in one invocation fold into the most severe status with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExitStatus {
    Success,
    /// Bad input such as a malformed split directive
    Usage,
    /// Media fetched but some segments failed
    SegmentationPartial,
    /// Resolver produced no plan (empty catalogs or floor unsatisfiable)
    NoViableFormat,
    /// Every ladder entry failed
    AttemptsExhausted,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Usage => 2,
            Self::NoViableFormat => 3,
            Self::AttemptsExhausted => 4,
            Self::SegmentationPartial => 5,
        }
    }
}
