// Split parsing and audio segmentation

pub mod ffmpeg;
pub mod parser;
pub mod pipeline;
pub mod timecode;

pub use ffmpeg::FfmpegExtractor;
pub use parser::{parse, select_source, RangeEntry, SegmentEnd, SegmentSpec, SplitSource};
pub use pipeline::{OutcomeReport, SegmentExtractor, SegmentOutcome, SegmentationPipeline, TrackJob};
pub use timecode::{format_timecode, parse_timecode, seconds_to_duration};
