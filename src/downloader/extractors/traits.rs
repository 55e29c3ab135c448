// MediaExtractor trait - the external media-extraction collaborator

use async_trait::async_trait;
use std::path::PathBuf;

use crate::downloader::errors::DownloadError;
use crate::downloader::format_selector::Attempt;
use crate::downloader::identity::NegotiationIdentity;
use crate::downloader::models::{Chapter, EncodingDescriptor, FetchedItem, Mode, PlaylistEntry};

/// Per-fetch parameters that vary between items
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub mode: Mode,
    pub output_dir: PathBuf,
}

/// Black box that lists, fetches and muxes media.
///
/// Implementations own network, signature and container concerns; callers
/// only see normalized catalogs and produced files.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Expand a target into items; a single video yields one entry
    async fn list_entries(&self, target: &str) -> Result<Vec<PlaylistEntry>, DownloadError>;

    /// Raw catalog visible to `identity`; empty is a valid answer
    async fn list_encodings(
        &self,
        target: &str,
        identity: NegotiationIdentity,
    ) -> Result<Vec<EncodingDescriptor>, DownloadError>;

    /// Fetch one attempt's format expression into `request.output_dir`
    async fn fetch(
        &self,
        target: &str,
        attempt: &Attempt,
        request: &FetchRequest,
    ) -> Result<FetchedItem, DownloadError>;

    /// Captions only, no media
    async fn fetch_subtitles(
        &self,
        target: &str,
        identity: NegotiationIdentity,
        request: &FetchRequest,
    ) -> Result<Vec<PathBuf>, DownloadError>;

    async fn list_chapters(&self, target: &str) -> Result<Vec<Chapter>, DownloadError>;
}
