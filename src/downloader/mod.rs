// Downloader module - catalog, resolution, fetch loop and segmentation

pub mod catalog;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod identity;
pub mod models;
pub mod naming;
pub mod orchestrator;
pub mod split;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::CatalogAdapter;
pub use config::Config;
pub use errors::{DownloadError, ExitStatus};
pub use format_selector::{resolve_plan, Attempt, FormatSelector, ResolvedPlan, SelectionMode};
pub use identity::NegotiationIdentity;
pub use models::{EncodingDescriptor, ItemMetadata, Mode, QualityConstraints};
pub use naming::{extract_identifier, render_name};
pub use orchestrator::{DownloadRequest, Downloader, ItemReport};
