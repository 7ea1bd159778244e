mod artifact_cache;
mod error;
mod ffprobe_info;
mod frame_extractor;
mod path_validator;
mod process_runner;
mod retry_policy;
mod storage_speed;
mod timestamp_selector;
mod tool_locator;
mod video_scanner;

pub use artifact_cache::{ArtifactCache, ArtifactKey, DEFAULT_CACHE_DIR_NAME, slugify};
pub use error::ExtractionError;
pub use ffprobe_info::PROBE_TIMEOUT;
pub use frame_extractor::{FrameExtractionService, FrameFormat, frame_args};
pub use path_validator::{ensure_directory_exists, validate_directory_exists};
pub use process_runner::{SystemToolRunner, ToolOutput, ToolRunError, ToolRunner};
pub use retry_policy::{
    BACKOFF_BASE, RetryPolicy, Sleeper, THUMBNAIL_TIMEOUT, TIMELINE_MAX_ATTEMPTS, ThreadSleeper,
};
pub use storage_speed::{
    StorageSpeed, classify_storage_speed, frame_count_for_storage, frame_timeout,
};
pub use timestamp_selector::{
    FALLBACK_TIMELINE_FRAMES, MAX_TIMELINE_FRAMES, frame_progress, timeline_frame_count,
    timeline_timestamps,
};
pub use tool_locator::{EXTRACTOR_NAME, ExternalToolLocator, PROBER_NAME, ToolPaths};
pub use video_scanner::{VideoFileInfo, scan_video_files};
