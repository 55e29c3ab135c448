// Blocking diagnostics - classifies why a fetch attempt failed
//
// Each FetchAttemptFailed carries the reason so the final report says more
// than "exit status 1".

use serde::{Deserialize, Serialize};

/// Reasons why YouTube might refuse an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,

    /// SABR (Segmented Adaptive Bitrate Restreaming) protection
    SabrStreaming,

    /// PO Token (Proof of Origin) required
    PoTokenRequired,

    /// Requested format expression matched nothing
    FormatUnavailable,

    AgeRestricted,

    GeoBlocked,

    /// Network timeout (soft IP block)
    NetworkTimeout,

    /// Rate limiting (429 or similar)
    RateLimited,

    BotDetection,

    PrivateVideo,

    /// Deleted or removed
    VideoUnavailable,

    /// DRM-protected content; no attempt can succeed
    DrmProtected,

    Unknown,
}

impl BlockingReason {
    /// Check if cookies might help
    pub fn cookies_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::SabrStreaming
                | Self::PoTokenRequired
                | Self::AgeRestricted
                | Self::BotDetection
                | Self::PrivateVideo
        )
    }

    /// Check if proxy might help
    pub fn proxy_might_help(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::GeoBlocked
                | Self::NetworkTimeout
                | Self::RateLimited
                | Self::BotDetection
        )
    }

    /// No other identity or format will fix this
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::DrmProtected | Self::VideoUnavailable | Self::PrivateVideo)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::SabrStreaming => "SABR streaming protection active",
            Self::PoTokenRequired => "Proof of Origin token required",
            Self::FormatUnavailable => "Requested format is not available",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout (possible IP throttling)",
            Self::RateLimited => "Rate limited by YouTube",
            Self::BotDetection => "Bot detection triggered",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::DrmProtected => "DRM-protected content",
            Self::Unknown => "Unknown blocking reason",
        }
    }

    /// One-line hint for the final error report
    pub fn suggestion(&self) -> Option<&'static str> {
        if self.is_permanent() {
            return None;
        }
        match (self.cookies_might_help(), self.proxy_might_help()) {
            (true, true) => Some("try --cookies and/or --proxy, or another --player-variant"),
            (true, false) => Some("try --cookies from a logged-in browser session"),
            (false, true) => Some("try --proxy or wait before retrying"),
            (false, false) => Some("try --player-variant auto or relax the quality bounds"),
        }
    }
}

/// Analyze error message and return blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();

    if lower.contains("drm")
        || lower.contains("widevine")
        || lower.contains("playready")
        || lower.contains("fairplay")
        || lower.contains("requires purchase")
    {
        return Some(BlockingReason::DrmProtected);
    }

    if lower.contains("sabr") {
        return Some(BlockingReason::SabrStreaming);
    }

    if lower.contains("po token") || lower.contains("proof of origin") {
        return Some(BlockingReason::PoTokenRequired);
    }

    if lower.contains("requested format is not available") || lower.contains("format not available") {
        return Some(BlockingReason::FormatUnavailable);
    }

    if lower.contains("age-restricted") || lower.contains("sign in to confirm your age") {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("private video") || lower.contains("video is private") {
        return Some(BlockingReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("no longer available")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("not available in your country") || lower.contains("blocked in your country") {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("confirm you're not a bot")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
    {
        return Some(BlockingReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(BlockingReason::Unknown);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_403_detection() {
        let error = "ERROR: HTTP Error 403: Forbidden";
        assert_eq!(diagnose_error(error), Some(BlockingReason::Http403Forbidden));
    }

    #[test]
    fn test_sabr_detection() {
        let error = "YouTube is forcing SABR streaming for this client";
        assert_eq!(diagnose_error(error), Some(BlockingReason::SabrStreaming));
    }

    #[test]
    fn test_po_token_detection() {
        let error = "mweb client https formats require a GVS PO Token";
        assert_eq!(diagnose_error(error), Some(BlockingReason::PoTokenRequired));
    }

    #[test]
    fn test_format_unavailable_detection() {
        let error = "ERROR: [youtube] abc: Requested format is not available";
        assert_eq!(diagnose_error(error), Some(BlockingReason::FormatUnavailable));
    }

    #[test]
    fn test_timeout_detection() {
        assert_eq!(
            diagnose_error("Timed out after 30s"),
            Some(BlockingReason::NetworkTimeout)
        );
    }

    #[test]
    fn test_empty_error_has_no_reason() {
        assert_eq!(diagnose_error("  "), None);
    }

    #[test]
    fn test_permanent_reasons_have_no_suggestion() {
        assert!(BlockingReason::DrmProtected.is_permanent());
        assert!(BlockingReason::DrmProtected.suggestion().is_none());
        assert!(BlockingReason::Http403Forbidden.suggestion().is_some());
    }
}
