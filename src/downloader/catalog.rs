// Encoding catalog adapter
//
// Normalizes yt-dlp's heterogeneous format records into EncodingDescriptor
// and applies the token policy. An empty catalog is a normal answer meaning
// "try the next identity".

use tracing::{debug, info};

use super::errors::DownloadError;
use super::extractors::MediaExtractor;
use super::identity::NegotiationIdentity;
use super::models::{Codec, EncodingDescriptor, EncodingKind};

pub struct CatalogAdapter<'a> {
    extractor: &'a dyn MediaExtractor,
    include_token_gated: bool,
}

impl<'a> CatalogAdapter<'a> {
    pub fn new(extractor: &'a dyn MediaExtractor, include_token_gated: bool) -> Self {
        Self {
            extractor,
            include_token_gated,
        }
    }

    /// Catalog for `(target, identity)` with token-gated encodings removed
    /// unless the policy opts in
    pub async fn list_encodings(
        &self,
        target: &str,
        identity: NegotiationIdentity,
    ) -> Result<Vec<EncodingDescriptor>, DownloadError> {
        let raw = self.extractor.list_encodings(target, identity).await?;
        let total = raw.len();
        let catalog: Vec<EncodingDescriptor> = raw
            .into_iter()
            .filter(|e| self.include_token_gated || !e.requires_token)
            .collect();

        if catalog.len() < total {
            info!(
                "[Catalog] {}: dropped {} token-gated encoding(s) for {}",
                identity,
                total - catalog.len(),
                target
            );
        }
        debug!("[Catalog] {} lists {} usable encoding(s)", identity, catalog.len());
        Ok(catalog)
    }
}

fn codec_field(f: &serde_json::Value, key: &str) -> Option<String> {
    f[key]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "none")
        .map(str::to_string)
}

/// Normalize one yt-dlp format record; `None` for storyboards and records
/// that break the height-iff-video invariant
pub fn normalize_format(f: &serde_json::Value) -> Option<EncodingDescriptor> {
    let id = f["format_id"].as_str()?.to_string();
    let vcodec = codec_field(f, "vcodec");
    let acodec = codec_field(f, "acodec");

    let kind = match (&vcodec, &acodec) {
        (Some(_), Some(_)) => EncodingKind::VideoAudio,
        (Some(_), None) => EncodingKind::Video,
        (None, Some(_)) => EncodingKind::Audio,
        (None, None) => return None,
    };

    let height = if kind.has_video() {
        match f["height"].as_u64() {
            Some(h) if h > 0 => Some(h as u32),
            _ => {
                debug!("[Catalog] Skipping video format {} without height", id);
                return None;
            }
        }
    } else {
        None
    };

    let codec_raw = if kind.has_video() { vcodec } else { acodec };
    let codec = codec_raw
        .as_deref()
        .map(Codec::from_codec_string)
        .unwrap_or(Codec::Other);

    let bitrate = f["tbr"]
        .as_f64()
        .or_else(|| f["vbr"].as_f64())
        .or_else(|| f["abr"].as_f64())
        .map(|b| b as f32);

    let note = f["format_note"].as_str().unwrap_or("").to_lowercase();
    let requires_token = f["requires_pot"].as_bool().unwrap_or(false)
        || note.contains("missing pot")
        || note.contains("po token");

    Some(EncodingDescriptor {
        id,
        kind,
        height,
        codec,
        container: f["ext"].as_str().unwrap_or("").to_string(),
        protocol: f["protocol"].as_str().unwrap_or("https").to_string(),
        bitrate,
        requires_token,
    })
}

/// Normalize the `formats` array of a `--dump-json` document
pub fn normalize_formats(json: &serde_json::Value) -> Result<Vec<EncodingDescriptor>, DownloadError> {
    let formats = match json.get("formats") {
        Some(serde_json::Value::Array(items)) => items,
        Some(serde_json::Value::Null) | None => return Ok(Vec::new()),
        Some(_) => {
            return Err(DownloadError::ParseError(
                "formats field is not an array".to_string(),
            ))
        }
    };
    Ok(formats.iter().filter_map(normalize_format).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::downloader::testing::FakeExtractor;

    #[test]
    fn test_normalize_video_only() {
        let f = json!({
            "format_id": "401", "ext": "mp4", "height": 2160,
            "vcodec": "av01.0.12M.08", "acodec": "none", "tbr": 17800.5,
            "protocol": "https"
        });
        let e = normalize_format(&f).unwrap();
        assert_eq!(e.kind, EncodingKind::Video);
        assert_eq!(e.height, Some(2160));
        assert_eq!(e.codec, Codec::Av1);
        assert!(!e.requires_token);
    }

    #[test]
    fn test_normalize_audio_has_no_height() {
        let f = json!({
            "format_id": "251", "ext": "webm", "height": null,
            "vcodec": "none", "acodec": "opus", "abr": 130.2
        });
        let e = normalize_format(&f).unwrap();
        assert_eq!(e.kind, EncodingKind::Audio);
        assert_eq!(e.height, None);
        assert_eq!(e.codec, Codec::Opus);
        assert_eq!(e.bitrate, Some(130.2));
    }

    #[test]
    fn test_normalize_skips_storyboards_and_heightless_video() {
        let storyboard = json!({"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"});
        let heightless = json!({"format_id": "x", "vcodec": "avc1.4d401f", "acodec": "none"});
        assert!(normalize_format(&storyboard).is_none());
        assert!(normalize_format(&heightless).is_none());
    }

    #[test]
    fn test_normalize_marks_missing_pot() {
        let f = json!({
            "format_id": "616", "height": 1080, "vcodec": "vp09.00.40.08",
            "acodec": "none", "format_note": "Premium, missing POT"
        });
        assert!(normalize_format(&f).unwrap().requires_token);
    }

    #[test]
    fn test_normalize_formats_without_array() {
        assert!(normalize_formats(&json!({"id": "x"})).unwrap().is_empty());
        assert!(normalize_formats(&json!({"formats": "nope"})).is_err());
    }

    #[tokio::test]
    async fn test_token_gated_excluded_by_default() {
        let extractor = FakeExtractor::new("abc", "t").with_catalog(
            NegotiationIdentity::Web,
            vec![
                EncodingDescriptor::video("616", 1080, Codec::Vp9).with_token(true),
                EncodingDescriptor::video("248", 1080, Codec::Vp9),
            ],
        );

        let strict = CatalogAdapter::new(&extractor, false);
        let catalog = strict.list_encodings("abc", NegotiationIdentity::Web).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].id, "248");

        let opted_in = CatalogAdapter::new(&extractor, true);
        let catalog = opted_in.list_encodings("abc", NegotiationIdentity::Web).await.unwrap();
        assert_eq!(catalog.len(), 2);
    }
}
