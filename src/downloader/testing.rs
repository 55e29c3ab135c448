// In-memory MediaExtractor used by unit tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::errors::DownloadError;
use super::extractors::{FetchRequest, MediaExtractor};
use super::format_selector::Attempt;
use super::identity::NegotiationIdentity;
use super::models::{Chapter, EncodingDescriptor, FetchedItem, ItemMetadata, Mode, PlaylistEntry};

pub struct FakeExtractor {
    pub item: ItemMetadata,
    catalogs: HashMap<NegotiationIdentity, Result<Vec<EncodingDescriptor>, DownloadError>>,
    entries: Vec<PlaylistEntry>,
    chapters: Vec<Chapter>,
    failing_formats: HashSet<String>,
    pub queried: Mutex<Vec<NegotiationIdentity>>,
    fetched: Arc<Mutex<Vec<(NegotiationIdentity, String)>>>,
}

impl FakeExtractor {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            item: ItemMetadata {
                id: id.to_string(),
                title: title.to_string(),
                duration_seconds: Some(240.0),
                ..Default::default()
            },
            catalogs: HashMap::new(),
            entries: Vec::new(),
            chapters: Vec::new(),
            failing_formats: HashSet::new(),
            queried: Mutex::new(Vec::new()),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_catalog(mut self, identity: NegotiationIdentity, catalog: Vec<EncodingDescriptor>) -> Self {
        self.catalogs.insert(identity, Ok(catalog));
        self
    }

    pub fn with_catalog_error(mut self, identity: NegotiationIdentity, err: DownloadError) -> Self {
        self.catalogs.insert(identity, Err(err));
        self
    }

    pub fn with_entries(mut self, entries: Vec<PlaylistEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters;
        self
    }

    pub fn failing(mut self, format: &str) -> Self {
        self.failing_formats.insert(format.to_string());
        self
    }

    pub fn queried(&self) -> Vec<NegotiationIdentity> {
        self.queried.lock().unwrap().clone()
    }

    /// Attempts passed to `fetch`, shared so it outlives boxing the fake
    pub fn fetch_log(&self) -> Arc<Mutex<Vec<(NegotiationIdentity, String)>>> {
        Arc::clone(&self.fetched)
    }
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_entries(&self, target: &str) -> Result<Vec<PlaylistEntry>, DownloadError> {
        if self.entries.is_empty() {
            return Ok(vec![PlaylistEntry {
                url: target.to_string(),
                item: self.item.clone(),
            }]);
        }
        Ok(self.entries.clone())
    }

    async fn list_encodings(
        &self,
        _target: &str,
        identity: NegotiationIdentity,
    ) -> Result<Vec<EncodingDescriptor>, DownloadError> {
        self.queried.lock().unwrap().push(identity);
        match self.catalogs.get(&identity) {
            Some(result) => result.clone(),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch(
        &self,
        _target: &str,
        attempt: &Attempt,
        request: &FetchRequest,
    ) -> Result<FetchedItem, DownloadError> {
        self.fetched
            .lock()
            .unwrap()
            .push((attempt.identity, attempt.format.clone()));

        if self.failing_formats.contains(&attempt.format) {
            return Err(DownloadError::ExecutionError(
                "ERROR: HTTP Error 403: Forbidden".to_string(),
            ));
        }

        let ext = match request.mode {
            Mode::Audio => "m4a",
            _ => "mkv",
        };
        std::fs::create_dir_all(&request.output_dir)?;
        let path = request
            .output_dir
            .join(format!("{} [{}].{}", self.item.title, self.item.id, ext));
        std::fs::write(&path, b"media")?;
        Ok(FetchedItem {
            item: self.item.clone(),
            path,
        })
    }

    async fn fetch_subtitles(
        &self,
        _target: &str,
        _identity: NegotiationIdentity,
        request: &FetchRequest,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        std::fs::create_dir_all(&request.output_dir)?;
        let path = request
            .output_dir
            .join(format!("{} [{}].en.vtt", self.item.title, self.item.id));
        std::fs::write(&path, b"WEBVTT")?;
        Ok(vec![path])
    }

    async fn list_chapters(&self, _target: &str) -> Result<Vec<Chapter>, DownloadError> {
        Ok(self.chapters.clone())
    }
}
