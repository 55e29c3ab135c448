// Common data models for the downloader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::errors::DownloadError;

/// Codec family of an encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[serde(alias = "av01")]
    Av1,
    #[serde(alias = "vp09")]
    Vp9,
    #[serde(alias = "avc1", alias = "avc")]
    H264,
    Opus,
    #[serde(alias = "mp4a")]
    Aac,
    Other,
}

impl Codec {
    /// Map a yt-dlp codec string (e.g. "avc1.640028", "mp4a.40.2") to a family
    pub fn from_codec_string(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.starts_with("av01") || lower == "av1" {
            Self::Av1
        } else if lower.starts_with("vp9") || lower.starts_with("vp09") {
            Self::Vp9
        } else if lower.starts_with("avc") || lower.starts_with("h264") {
            Self::H264
        } else if lower.starts_with("opus") {
            Self::Opus
        } else if lower.starts_with("mp4a") || lower.starts_with("aac") {
            Self::Aac
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Av1 => "av1",
            Self::Vp9 => "vp9",
            Self::H264 => "h264",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "av1" | "av01" => Ok(Self::Av1),
            "vp9" | "vp09" => Ok(Self::Vp9),
            "h264" | "avc" | "avc1" => Ok(Self::H264),
            "opus" => Ok(Self::Opus),
            "aac" | "mp4a" => Ok(Self::Aac),
            other => Err(format!("unknown codec '{}'", other)),
        }
    }
}

/// Parse a comma-separated codec priority list such as "av01,vp9,h264"
pub fn parse_codec_preference(raw: &str) -> Result<Vec<Codec>, DownloadError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Codec>().map_err(DownloadError::Config))
        .collect()
}

/// What an encoding carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingKind {
    Video,
    Audio,
    VideoAudio,
}

impl EncodingKind {
    pub fn has_video(&self) -> bool {
        matches!(self, Self::Video | Self::VideoAudio)
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, Self::Audio | Self::VideoAudio)
    }
}

/// Normalized catalog entry.
///
/// `id` is only unique within the identity that listed it. `height` is
/// present exactly when `kind` carries video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingDescriptor {
    pub id: String,
    pub kind: EncodingKind,
    pub height: Option<u32>,
    /// Video codec for video kinds, audio codec for audio-only
    pub codec: Codec,
    /// Container extension (mp4, webm, m4a)
    pub container: String,
    /// Delivery protocol (https, m3u8_native, http_dash_segments)
    pub protocol: String,
    /// Total bitrate in kbps
    pub bitrate: Option<f32>,
    /// Needs a PO token; usually answers 403 without one
    pub requires_token: bool,
}

impl EncodingDescriptor {
    pub fn video(id: &str, height: u32, codec: Codec) -> Self {
        Self {
            id: id.to_string(),
            kind: EncodingKind::Video,
            height: Some(height),
            codec,
            container: "mp4".to_string(),
            protocol: "https".to_string(),
            bitrate: None,
            requires_token: false,
        }
    }

    pub fn audio(id: &str, codec: Codec) -> Self {
        Self {
            id: id.to_string(),
            kind: EncodingKind::Audio,
            height: None,
            codec,
            container: "m4a".to_string(),
            protocol: "https".to_string(),
            bitrate: None,
            requires_token: false,
        }
    }

    pub fn muxed(id: &str, height: u32, codec: Codec) -> Self {
        Self {
            kind: EncodingKind::VideoAudio,
            ..Self::video(id, height, codec)
        }
    }

    pub fn with_bitrate(mut self, kbps: f32) -> Self {
        self.bitrate = Some(kbps);
        self
    }

    pub fn with_token(mut self, required: bool) -> Self {
        self.requires_token = required;
        self
    }
}

/// Top-level user intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Video,
    Audio,
    Subtitles,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitles => write!(f, "subtitles"),
        }
    }
}

/// Quality bounds and codec priority for the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConstraints {
    pub min_height: u32,
    pub max_height: u32,
    pub allow_below_min: bool,
    /// Earlier entries win height ties
    pub codec_preference: Vec<Codec>,
    /// Raw yt-dlp format expression; bypasses resolution when set
    pub custom_format_override: Option<String>,
    /// Ranked candidates kept per identity before the universal fallback
    pub ladder_depth: usize,
}

impl Default for QualityConstraints {
    fn default() -> Self {
        Self {
            min_height: 1080,
            max_height: 2160,
            allow_below_min: false,
            codec_preference: vec![Codec::Av1, Codec::Vp9, Codec::H264],
            custom_format_override: None,
            ladder_depth: 4,
        }
    }
}

/// Item metadata used for naming and tagging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Stable per-item identifier (YouTube video id)
    pub id: String,
    pub title: String,
    pub playlist_title: Option<String>,
    /// 1-based position in the playlist
    pub playlist_index: Option<u32>,
    pub duration_seconds: Option<f64>,
}

/// One item of a (possibly single-entry) playlist
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub url: String,
    pub item: ItemMetadata,
}

/// Chapter as reported by the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub title: Option<String>,
}

/// Result of a successful fetch attempt
#[derive(Debug, Clone)]
pub struct FetchedItem {
    pub item: ItemMetadata,
    pub path: PathBuf,
}
