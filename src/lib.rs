//! Best-quality YouTube downloader built on yt-dlp and ffmpeg.
//!
//! - `downloader::format_selector` resolves catalogs into an attempt plan
//! - `downloader::orchestrator` walks the plan and names the output
//! - `downloader::split` parses split directives and cuts audio into tracks

pub mod cli;
pub mod downloader;

pub use downloader::errors::{DownloadError, ExitStatus};
pub use downloader::orchestrator::{DownloadRequest, Downloader, ItemReport};
