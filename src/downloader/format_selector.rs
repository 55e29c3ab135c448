// FormatSelector - format/quality resolution
//
// Turns normalized catalogs plus QualityConstraints into a ResolvedPlan: an
// ordered list of (identity, yt-dlp format expression) attempts, best first.
// Per identity the ladder is:
// - in-bounds candidates (min..=max height), ranked
// - or, when nothing reaches the floor and below-min is allowed, candidates
//   up to max height with the floor relaxed to 0
// - then one universal fallback expression for the identity the plan uses
// The selector never fetches; the orchestrator walks the plan.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

use super::catalog::CatalogAdapter;
use super::errors::DownloadError;
use super::identity::NegotiationIdentity;
use super::models::{Codec, EncodingDescriptor, EncodingKind, Mode, QualityConstraints};

/// Stream kinds the resolver can select for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Video,
    Audio,
}

impl SelectionMode {
    /// Subtitles never go through the resolver
    pub fn for_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Video => Some(Self::Video),
            Mode::Audio => Some(Self::Audio),
            Mode::Subtitles => None,
        }
    }
}

/// Why an attempt is on the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttemptOrigin {
    /// Raw user expression, resolution skipped
    Override,
    WithinBounds,
    BelowMinimum,
    AudioRanked,
    UniversalFallback,
}

/// One entry of a ResolvedPlan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub identity: NegotiationIdentity,
    /// yt-dlp format expression (e.g. "401+251")
    pub format: String,
    pub height: Option<u32>,
    pub origin: AttemptOrigin,
}

/// Ordered attempts, consumed lazily by the caller until one succeeds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedPlan {
    attempts: Vec<Attempt>,
}

impl ResolvedPlan {
    pub fn single(attempt: Attempt) -> Self {
        Self {
            attempts: vec![attempt],
        }
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attempt> {
        self.attempts.iter()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn first(&self) -> Option<&Attempt> {
        self.attempts.first()
    }

    fn push_unique(&mut self, attempt: Attempt) {
        if !self
            .attempts
            .iter()
            .any(|a| a.identity == attempt.identity && a.format == attempt.format)
        {
            self.attempts.push(attempt);
        }
    }
}

impl IntoIterator for ResolvedPlan {
    type Item = Attempt;
    type IntoIter = std::vec::IntoIter<Attempt>;

    fn into_iter(self) -> Self::IntoIter {
        self.attempts.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResolvedPlan {
    type Item = &'a Attempt;
    type IntoIter = std::slice::Iter<'a, Attempt>;

    fn into_iter(self) -> Self::IntoIter {
        self.attempts.iter()
    }
}

/// Ranked selection within one identity's catalog
#[derive(Debug, Clone, PartialEq)]
pub struct LadderEntry {
    pub format: String,
    pub height: Option<u32>,
    pub codec: Codec,
    pub origin: AttemptOrigin,
}

impl LadderEntry {
    fn into_attempt(self, identity: NegotiationIdentity) -> Attempt {
        Attempt {
            identity,
            format: self.format,
            height: self.height,
            origin: self.origin,
        }
    }
}

/// A muxed encoding, or a video-only encoding paired with the best audio
struct Candidate<'a> {
    primary: &'a EncodingDescriptor,
    audio: Option<&'a EncodingDescriptor>,
    /// Catalog position, last tie-break
    order: usize,
}

impl Candidate<'_> {
    fn height(&self) -> u32 {
        self.primary.height.unwrap_or(0)
    }

    fn expression(&self) -> String {
        match self.audio {
            Some(audio) => format!("{}+{}", self.primary.id, audio.id),
            None => self.primary.id.clone(),
        }
    }

    fn into_entry(self, origin: AttemptOrigin) -> LadderEntry {
        LadderEntry {
            format: self.expression(),
            height: self.primary.height,
            codec: self.primary.codec,
            origin,
        }
    }
}

/// Default audio order when the preference list names no audio codec
const DEFAULT_AUDIO_ORDER: [Codec; 2] = [Codec::Opus, Codec::Aac];

pub struct FormatSelector;

impl FormatSelector {
    /// Ranked ladder for one identity's catalog; empty means the identity
    /// contributes nothing under these constraints
    pub fn build_ladder(
        catalog: &[EncodingDescriptor],
        constraints: &QualityConstraints,
        mode: SelectionMode,
    ) -> Vec<LadderEntry> {
        match mode {
            SelectionMode::Video => Self::video_ladder(catalog, constraints),
            SelectionMode::Audio => Self::audio_ladder(catalog, constraints),
        }
    }

    fn video_ladder(catalog: &[EncodingDescriptor], constraints: &QualityConstraints) -> Vec<LadderEntry> {
        let best_audio = Self::find_best_audio(catalog, &constraints.codec_preference);

        let candidates: Vec<Candidate> = catalog
            .iter()
            .enumerate()
            .filter_map(|(order, e)| match e.kind {
                EncodingKind::VideoAudio => Some(Candidate {
                    primary: e,
                    audio: None,
                    order,
                }),
                // Video-only is only usable when there is audio to mux with
                EncodingKind::Video => best_audio.map(|audio| Candidate {
                    primary: e,
                    audio: Some(audio),
                    order,
                }),
                EncodingKind::Audio => None,
            })
            .collect();

        let within = Self::rank_by_height(&candidates, constraints.min_height, constraints.max_height, constraints);
        if !within.is_empty() {
            return Self::into_entries(within, AttemptOrigin::WithinBounds, constraints.ladder_depth);
        }

        if constraints.allow_below_min {
            let below = Self::rank_by_height(&candidates, 0, constraints.max_height, constraints);
            return Self::into_entries(below, AttemptOrigin::BelowMinimum, constraints.ladder_depth);
        }

        Vec::new()
    }

    fn audio_ladder(catalog: &[EncodingDescriptor], constraints: &QualityConstraints) -> Vec<LadderEntry> {
        let prefs = &constraints.codec_preference;
        let mut audio: Vec<(usize, &EncodingDescriptor)> = catalog
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == EncodingKind::Audio)
            .collect();

        audio.sort_by(|(oa, a), (ob, b)| Self::compare_audio(a, *oa, b, *ob, prefs));

        audio
            .into_iter()
            .take(constraints.ladder_depth)
            .map(|(_, e)| LadderEntry {
                format: e.id.clone(),
                height: None,
                codec: e.codec,
                origin: AttemptOrigin::AudioRanked,
            })
            .collect()
    }

    fn rank_by_height<'a>(
        candidates: &[Candidate<'a>],
        min_height: u32,
        max_height: u32,
        constraints: &QualityConstraints,
    ) -> Vec<Candidate<'a>> {
        let mut ranked: Vec<Candidate<'a>> = candidates
            .iter()
            .filter(|c| c.height() >= min_height && c.height() <= max_height)
            .map(|c| Candidate {
                primary: c.primary,
                audio: c.audio,
                order: c.order,
            })
            .collect();

        ranked.sort_by(|a, b| Self::compare_video(a, b, &constraints.codec_preference));
        ranked
    }

    fn into_entries(candidates: Vec<Candidate>, origin: AttemptOrigin, depth: usize) -> Vec<LadderEntry> {
        candidates
            .into_iter()
            .take(depth)
            .map(|c| c.into_entry(origin))
            .collect()
    }

    /// Height desc, codec preference, bitrate desc, catalog order
    fn compare_video(a: &Candidate, b: &Candidate, prefs: &[Codec]) -> Ordering {
        b.height()
            .cmp(&a.height())
            .then_with(|| Self::codec_rank(a.primary.codec, prefs).cmp(&Self::codec_rank(b.primary.codec, prefs)))
            .then_with(|| Self::compare_bitrate_desc(a.primary.bitrate, b.primary.bitrate))
            .then_with(|| a.order.cmp(&b.order))
    }

    fn compare_audio(
        a: &EncodingDescriptor,
        order_a: usize,
        b: &EncodingDescriptor,
        order_b: usize,
        prefs: &[Codec],
    ) -> Ordering {
        Self::audio_rank(a.codec, prefs)
            .cmp(&Self::audio_rank(b.codec, prefs))
            .then_with(|| Self::compare_bitrate_desc(a.bitrate, b.bitrate))
            .then_with(|| order_a.cmp(&order_b))
    }

    /// Position in the preference list; unlisted codecs rank after all listed ones
    fn codec_rank(codec: Codec, prefs: &[Codec]) -> usize {
        prefs.iter().position(|p| *p == codec).unwrap_or(prefs.len())
    }

    fn audio_rank(codec: Codec, prefs: &[Codec]) -> usize {
        if let Some(pos) = prefs.iter().position(|p| *p == codec) {
            return pos;
        }
        let fallback = DEFAULT_AUDIO_ORDER
            .iter()
            .position(|p| *p == codec)
            .unwrap_or(DEFAULT_AUDIO_ORDER.len());
        prefs.len() + fallback
    }

    /// Higher bitrate first; unknown bitrate sorts last
    fn compare_bitrate_desc(a: Option<f32>, b: Option<f32>) -> Ordering {
        let a = a.unwrap_or(-1.0);
        let b = b.unwrap_or(-1.0);
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    }

    /// Best audio-only encoding to pair with video-only streams
    fn find_best_audio<'a>(catalog: &'a [EncodingDescriptor], prefs: &[Codec]) -> Option<&'a EncodingDescriptor> {
        catalog
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == EncodingKind::Audio)
            .min_by(|(oa, a), (ob, b)| Self::compare_audio(a, *oa, b, *ob, prefs))
            .map(|(_, e)| e)
    }

    /// Last-resort expression; never undercuts the floor unless below-min is allowed
    pub fn fallback_expression(constraints: &QualityConstraints, mode: SelectionMode) -> String {
        match mode {
            SelectionMode::Audio => "ba/b".to_string(),
            SelectionMode::Video if constraints.allow_below_min => "bv*+ba/b".to_string(),
            SelectionMode::Video => format!(
                "bv*[height>={0}]+ba/b[height>={0}]",
                constraints.min_height
            ),
        }
    }

    fn fallback_attempt(
        constraints: &QualityConstraints,
        mode: SelectionMode,
        identity: NegotiationIdentity,
    ) -> Attempt {
        Attempt {
            identity,
            format: Self::fallback_expression(constraints, mode),
            height: None,
            origin: AttemptOrigin::UniversalFallback,
        }
    }
}

/// Resolve the attempt plan for `target`.
///
/// Identities are queried in order (one, or the auto list) until one yields a
/// non-empty ladder. Collaborator errors for an identity count as an empty
/// catalog for that identity.
pub async fn resolve_plan(
    adapter: &CatalogAdapter<'_>,
    target: &str,
    constraints: &QualityConstraints,
    mode: SelectionMode,
    identity: NegotiationIdentity,
) -> Result<ResolvedPlan, DownloadError> {
    if let Some(expression) = constraints
        .custom_format_override
        .as_deref()
        .filter(|e| !e.trim().is_empty())
    {
        let identity = identity.concrete();
        info!("[Resolver] Custom format '{}' on {} (resolution skipped)", expression, identity);
        return Ok(ResolvedPlan::single(Attempt {
            identity,
            format: expression.to_string(),
            height: None,
            origin: AttemptOrigin::Override,
        }));
    }

    let identities = identity.expand();
    let mut last_non_empty: Option<NegotiationIdentity> = None;
    let mut last_error: Option<String> = None;

    for candidate in &identities {
        let catalog = match adapter.list_encodings(target, *candidate).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("[Resolver] {} catalog query failed: {}", candidate, e);
                last_error = Some(e.to_string());
                continue;
            }
        };

        if catalog.is_empty() {
            info!("[Resolver] {} returned an empty catalog, trying next identity", candidate);
            continue;
        }
        last_non_empty = Some(*candidate);

        let ladder = FormatSelector::build_ladder(&catalog, constraints, mode);
        if ladder.is_empty() {
            info!(
                "[Resolver] {} has {} encoding(s) but none satisfy the constraints",
                candidate,
                catalog.len()
            );
            continue;
        }

        let mut plan = ResolvedPlan::default();
        for entry in ladder {
            plan.push_unique(entry.into_attempt(*candidate));
        }
        plan.push_unique(FormatSelector::fallback_attempt(constraints, mode, *candidate));

        debug!("[Resolver] Plan for {} via {}: {:?}", target, candidate, plan);
        info!(
            "[Resolver] {} attempt(s) for {} via {} (top: {})",
            plan.len(),
            target,
            candidate,
            plan.first().map(|a| a.format.as_str()).unwrap_or("-")
        );
        return Ok(plan);
    }

    match last_non_empty {
        None => Err(DownloadError::CatalogEmpty {
            target: target.to_string(),
            identities,
            last_error,
        }),
        Some(last) if mode == SelectionMode::Audio || constraints.allow_below_min => {
            info!("[Resolver] No ranked candidate for {}; universal fallback via {}", target, last);
            Ok(ResolvedPlan::single(FormatSelector::fallback_attempt(constraints, mode, last)))
        }
        Some(_) => Err(DownloadError::NoViableCandidate {
            target: target.to_string(),
            min_height: constraints.min_height,
            identities,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::testing::FakeExtractor;
    use NegotiationIdentity::*;

    fn constraints() -> QualityConstraints {
        QualityConstraints::default()
    }

    fn dash_catalog() -> Vec<EncodingDescriptor> {
        vec![
            EncodingDescriptor::video("137", 1080, Codec::H264).with_bitrate(4400.0),
            EncodingDescriptor::video("248", 1080, Codec::Vp9).with_bitrate(2600.0),
            EncodingDescriptor::video("399", 1080, Codec::Av1).with_bitrate(2000.0),
            EncodingDescriptor::video("22", 720, Codec::H264),
            EncodingDescriptor::audio("140", Codec::Aac).with_bitrate(129.0),
            EncodingDescriptor::audio("251", Codec::Opus).with_bitrate(135.0),
        ]
    }

    #[test]
    fn test_ladder_prefers_codec_order_within_height() {
        let ladder = FormatSelector::build_ladder(&dash_catalog(), &constraints(), SelectionMode::Video);
        let formats: Vec<&str> = ladder.iter().map(|e| e.format.as_str()).collect();
        assert_eq!(formats, vec!["399+251", "248+251", "137+251"]);
        assert!(ladder.iter().all(|e| e.origin == AttemptOrigin::WithinBounds));
    }

    #[test]
    fn test_custom_preference_order_breaks_ties() {
        let mut c = constraints();
        c.codec_preference = vec![Codec::Vp9, Codec::Av1, Codec::H264];
        let catalog = vec![
            EncodingDescriptor::video("399", 1080, Codec::Av1),
            EncodingDescriptor::video("248", 1080, Codec::Vp9),
            EncodingDescriptor::audio("251", Codec::Opus),
        ];
        let ladder = FormatSelector::build_ladder(&catalog, &c, SelectionMode::Video);
        assert_eq!(ladder[0].format, "248+251");
        assert_eq!(ladder[0].codec, Codec::Vp9);
    }

    #[test]
    fn test_bitrate_breaks_codec_ties_then_catalog_order() {
        let catalog = vec![
            EncodingDescriptor::video("a", 1440, Codec::Vp9).with_bitrate(5000.0),
            EncodingDescriptor::video("b", 1440, Codec::Vp9).with_bitrate(9000.0),
            EncodingDescriptor::video("c", 1440, Codec::Vp9),
            EncodingDescriptor::video("d", 1440, Codec::Vp9),
            EncodingDescriptor::audio("251", Codec::Opus),
        ];
        let ladder = FormatSelector::build_ladder(&catalog, &constraints(), SelectionMode::Video);
        let formats: Vec<&str> = ladder.iter().map(|e| e.format.as_str()).collect();
        assert_eq!(formats, vec!["b+251", "a+251", "c+251", "d+251"]);
    }

    #[test]
    fn test_heights_above_max_are_excluded() {
        let catalog = vec![
            EncodingDescriptor::video("571", 4320, Codec::Av1),
            EncodingDescriptor::video("401", 2160, Codec::Av1),
            EncodingDescriptor::audio("251", Codec::Opus),
        ];
        let ladder = FormatSelector::build_ladder(&catalog, &constraints(), SelectionMode::Video);
        assert_eq!(ladder[0].format, "401+251");
        assert_eq!(ladder.len(), 1);
    }

    #[test]
    fn test_below_floor_without_permission_is_empty() {
        let catalog = vec![
            EncodingDescriptor::video("22", 720, Codec::H264),
            EncodingDescriptor::audio("140", Codec::Aac),
        ];
        assert!(FormatSelector::build_ladder(&catalog, &constraints(), SelectionMode::Video).is_empty());
    }

    #[test]
    fn test_below_floor_with_permission_relaxes_min() {
        let mut c = constraints();
        c.allow_below_min = true;
        let catalog = vec![
            EncodingDescriptor::video("135", 480, Codec::H264),
            EncodingDescriptor::video("22", 720, Codec::H264),
            EncodingDescriptor::audio("140", Codec::Aac),
        ];
        let ladder = FormatSelector::build_ladder(&catalog, &c, SelectionMode::Video);
        assert_eq!(ladder[0].format, "22+140");
        assert_eq!(ladder[0].origin, AttemptOrigin::BelowMinimum);
    }

    #[test]
    fn test_video_only_without_audio_is_not_muxable() {
        let catalog = vec![
            EncodingDescriptor::video("137", 1080, Codec::H264),
            EncodingDescriptor::muxed("37", 1080, Codec::H264),
        ];
        let ladder = FormatSelector::build_ladder(&catalog, &constraints(), SelectionMode::Video);
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder[0].format, "37");
    }

    #[test]
    fn test_audio_ladder_prefers_opus_by_default() {
        let ladder = FormatSelector::build_ladder(&dash_catalog(), &constraints(), SelectionMode::Audio);
        let formats: Vec<&str> = ladder.iter().map(|e| e.format.as_str()).collect();
        assert_eq!(formats, vec!["251", "140"]);
    }

    #[test]
    fn test_ladder_depth_caps_candidates() {
        let mut c = constraints();
        c.ladder_depth = 2;
        let ladder = FormatSelector::build_ladder(&dash_catalog(), &c, SelectionMode::Video);
        assert_eq!(ladder.len(), 2);
    }

    #[test]
    fn test_fallback_respects_floor() {
        let c = constraints();
        assert_eq!(
            FormatSelector::fallback_expression(&c, SelectionMode::Video),
            "bv*[height>=1080]+ba/b[height>=1080]"
        );
        let relaxed = QualityConstraints {
            allow_below_min: true,
            ..constraints()
        };
        assert_eq!(FormatSelector::fallback_expression(&relaxed, SelectionMode::Video), "bv*+ba/b");
        assert_eq!(FormatSelector::fallback_expression(&c, SelectionMode::Audio), "ba/b");
    }

    #[tokio::test]
    async fn test_override_short_circuits() {
        let extractor = FakeExtractor::new("abc", "t");
        let adapter = CatalogAdapter::new(&extractor, false);
        let c = QualityConstraints {
            custom_format_override: Some("bestvideo*+bestaudio".to_string()),
            ..constraints()
        };

        let plan = resolve_plan(&adapter, "abc", &c, SelectionMode::Video, Auto).await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.attempts()[0].identity, WebEmbedded);
        assert_eq!(plan.attempts()[0].origin, AttemptOrigin::Override);
        assert!(extractor.queried().is_empty());
    }

    #[tokio::test]
    async fn test_auto_skips_empty_identities() {
        let extractor = FakeExtractor::new("abc", "t").with_catalog(Tv, dash_catalog());
        let adapter = CatalogAdapter::new(&extractor, false);

        let plan = resolve_plan(&adapter, "abc", &constraints(), SelectionMode::Video, Auto)
            .await
            .unwrap();

        assert_eq!(extractor.queried(), vec![WebEmbedded, Tv]);
        assert!(plan.iter().all(|a| a.identity == Tv));
        assert_eq!(plan.first().unwrap().format, "399+251");
        assert_eq!(plan.attempts().last().unwrap().origin, AttemptOrigin::UniversalFallback);
    }

    #[tokio::test]
    async fn test_failed_identity_query_counts_as_empty() {
        let extractor = FakeExtractor::new("abc", "t")
            .with_catalog_error(WebEmbedded, DownloadError::ExecutionError("HTTP Error 403".to_string()))
            .with_catalog(Tv, dash_catalog());
        let adapter = CatalogAdapter::new(&extractor, false);

        let plan = resolve_plan(&adapter, "abc", &constraints(), SelectionMode::Video, Auto)
            .await
            .unwrap();
        assert_eq!(plan.first().unwrap().identity, Tv);
    }

    #[tokio::test]
    async fn test_all_empty_is_catalog_empty() {
        let extractor = FakeExtractor::new("abc", "t");
        let adapter = CatalogAdapter::new(&extractor, false);

        let err = resolve_plan(&adapter, "abc", &constraints(), SelectionMode::Video, Auto)
            .await
            .unwrap_err();
        match err {
            DownloadError::CatalogEmpty { identities, .. } => assert_eq!(identities.len(), 7),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_floor_unsatisfiable_is_no_viable_candidate() {
        let low = vec![
            EncodingDescriptor::video("22", 720, Codec::H264),
            EncodingDescriptor::audio("140", Codec::Aac),
        ];
        let extractor = FakeExtractor::new("abc", "t")
            .with_catalog(WebEmbedded, low.clone())
            .with_catalog(Ios, low);
        let adapter = CatalogAdapter::new(&extractor, false);

        let err = resolve_plan(&adapter, "abc", &constraints(), SelectionMode::Video, Auto)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::NoViableCandidate { min_height: 1080, .. }));
        assert_eq!(extractor.queried().len(), 7);
    }

    #[tokio::test]
    async fn test_floor_holds_for_top_candidate_or_no_viable() {
        let catalogs = vec![
            dash_catalog(),
            vec![
                EncodingDescriptor::video("22", 720, Codec::H264),
                EncodingDescriptor::muxed("18", 360, Codec::H264),
                EncodingDescriptor::audio("140", Codec::Aac),
            ],
            vec![
                EncodingDescriptor::muxed("18", 360, Codec::H264),
                EncodingDescriptor::video("313", 2160, Codec::Vp9),
                EncodingDescriptor::audio("251", Codec::Opus),
            ],
            vec![EncodingDescriptor::audio("251", Codec::Opus)],
        ];

        for catalog in catalogs {
            let extractor = FakeExtractor::new("abc", "t").with_catalog(Web, catalog);
            let adapter = CatalogAdapter::new(&extractor, false);
            match resolve_plan(&adapter, "abc", &constraints(), SelectionMode::Video, Web).await {
                Ok(plan) => assert!(plan.first().unwrap().height.unwrap() >= 1080),
                Err(e) => assert!(matches!(e, DownloadError::NoViableCandidate { .. })),
            }
        }
    }

    #[tokio::test]
    async fn test_allow_below_min_never_reports_no_viable() {
        let c = QualityConstraints {
            allow_below_min: true,
            ..constraints()
        };
        let catalogs = vec![
            vec![EncodingDescriptor::audio("251", Codec::Opus)],
            vec![EncodingDescriptor::video("571", 4320, Codec::Av1)],
            vec![
                EncodingDescriptor::muxed("18", 360, Codec::H264),
                EncodingDescriptor::audio("140", Codec::Aac),
            ],
        ];

        for catalog in catalogs {
            let extractor = FakeExtractor::new("abc", "t").with_catalog(Android, catalog);
            let adapter = CatalogAdapter::new(&extractor, false);
            let plan = resolve_plan(&adapter, "abc", &c, SelectionMode::Video, Auto)
                .await
                .unwrap();
            assert!(!plan.is_empty());
            assert_eq!(plan.attempts().last().unwrap().format, "bv*+ba/b");
            assert!(plan.iter().all(|a| a.identity == Android));
        }
    }

    #[tokio::test]
    async fn test_audio_mode_plan() {
        let extractor = FakeExtractor::new("abc", "t").with_catalog(WebEmbedded, dash_catalog());
        let adapter = CatalogAdapter::new(&extractor, false);

        let plan = resolve_plan(&adapter, "abc", &constraints(), SelectionMode::Audio, WebEmbedded)
            .await
            .unwrap();
        let formats: Vec<&str> = plan.iter().map(|a| a.format.as_str()).collect();
        assert_eq!(formats, vec!["251", "140", "ba/b"]);
    }
}
