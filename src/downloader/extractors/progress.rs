// yt-dlp progress lines -> tracing
//
// Fetches run with `--progress --newline`, so every update arrives as its own
// stdout line:
//   [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)

use regex::Regex;
use tracing::{debug, info};

lazy_static::lazy_static! {
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\S+(?:\s*\w+/s)?))?(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
    ).unwrap();
    static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
    static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
    static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchProgress {
    Started(String),
    Downloading {
        percent: f32,
        size: String,
        speed: Option<String>,
        eta: Option<String>,
        fragments: Option<(u32, u32)>,
    },
    Merging,
    AlreadyDownloaded,
}

pub fn parse_progress(line: &str) -> Option<FetchProgress> {
    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let text = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
        let fragments = match (caps.get(5), caps.get(6)) {
            (Some(current), Some(total)) => current.as_str().parse().ok().zip(total.as_str().parse().ok()),
            _ => None,
        };
        return Some(FetchProgress::Downloading {
            percent,
            size: text(2).unwrap_or_else(|| "?".to_string()),
            speed: text(3),
            eta: text(4),
            fragments,
        });
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let path = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("file");
        let name = path.rsplit('/').next().unwrap_or(path);
        return Some(FetchProgress::Started(name.to_string()));
    }

    if MERGE_RE.is_match(line) {
        return Some(FetchProgress::Merging);
    }

    if ALREADY_RE.is_match(line) {
        return Some(FetchProgress::AlreadyDownloaded);
    }

    None
}

/// Logs one fetch's progress; percentages at info level every 10%
pub struct ProgressLog {
    target: String,
    last_decile: Option<u32>,
}

impl ProgressLog {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            last_decile: None,
        }
    }

    pub fn observe(&mut self, line: &str) {
        let Some(progress) = parse_progress(line) else {
            return;
        };

        match progress {
            FetchProgress::Started(name) => {
                // Video and audio streams each start from 0%
                self.last_decile = None;
                info!("[YtDlp] Downloading {}", name);
            }
            FetchProgress::Downloading {
                percent,
                size,
                speed,
                eta,
                fragments,
            } => {
                let mut status = format!("{:.1}% of {}", percent, size);
                if let Some(speed) = speed {
                    status.push_str(&format!(" at {}", speed));
                }
                if let Some(eta) = eta {
                    status.push_str(&format!(" ETA {}", eta));
                }
                if let Some((current, total)) = fragments {
                    status.push_str(&format!(" (frag {}/{})", current, total));
                }

                let decile = (percent.clamp(0.0, 100.0) / 10.0) as u32;
                if self.last_decile.map_or(true, |last| decile > last) {
                    self.last_decile = Some(decile);
                    info!("[YtDlp] {}: {}", self.target, status);
                } else {
                    debug!("[YtDlp] {}: {}", self.target, status);
                }
            }
            FetchProgress::Merging => info!("[YtDlp] {}: merging video and audio", self.target),
            FetchProgress::AlreadyDownloaded => info!("[YtDlp] {}: already downloaded", self.target),
        }
    }
}
