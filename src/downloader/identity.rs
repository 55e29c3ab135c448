// Negotiation identities (yt-dlp "player_client" values)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Synthetic client profile presented to YouTube.
///
/// `Auto` is not a client: it expands to [`AUTO_ORDER`] at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationIdentity {
    Tv,
    Web,
    /// Often bypasses SABR
    #[default]
    WebEmbedded,
    WebSafari,
    Ios,
    Android,
    Mweb,
    Auto,
}

/// Identities tried, in order, when `Auto` is requested
pub const AUTO_ORDER: [NegotiationIdentity; 7] = [
    NegotiationIdentity::WebEmbedded,
    NegotiationIdentity::Tv,
    NegotiationIdentity::WebSafari,
    NegotiationIdentity::Ios,
    NegotiationIdentity::Mweb,
    NegotiationIdentity::Android,
    NegotiationIdentity::Web,
];

impl NegotiationIdentity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tv => "tv",
            Self::Web => "web",
            Self::WebEmbedded => "web_embedded",
            Self::WebSafari => "web_safari",
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Mweb => "mweb",
            Self::Auto => "auto",
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Ordered identities to query for this request
    pub fn expand(self) -> Vec<NegotiationIdentity> {
        if self.is_auto() {
            AUTO_ORDER.to_vec()
        } else {
            vec![self]
        }
    }

    /// Concrete identity for single-shot operations (overrides, subtitles)
    pub fn concrete(self) -> NegotiationIdentity {
        if self.is_auto() {
            NegotiationIdentity::default()
        } else {
            self
        }
    }
}

impl fmt::Display for NegotiationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NegotiationIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "tv" => Ok(Self::Tv),
            "web" => Ok(Self::Web),
            "web_embedded" => Ok(Self::WebEmbedded),
            "web_safari" => Ok(Self::WebSafari),
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            "mweb" => Ok(Self::Mweb),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown player variant '{}' (expected one of tv, web, web_embedded, web_safari, ios, android, mweb, auto)",
                other
            )),
        }
    }
}
