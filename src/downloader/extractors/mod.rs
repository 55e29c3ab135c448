// Media extractors - the external collaborator behind a trait
//
// `YtDlpCli` drives the native yt-dlp binary. Tests substitute in-memory
// implementations of `MediaExtractor`.

mod cli;
mod diagnostics;
mod progress;
mod traits;

pub use cli::YtDlpCli;
pub use diagnostics::{diagnose_error, BlockingReason};
pub use traits::{FetchRequest, MediaExtractor};
