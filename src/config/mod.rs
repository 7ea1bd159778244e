pub mod load;
pub mod save;
pub mod types;

pub use load::SETTINGS_FILE;
pub use types::{
    Config, DEFAULT_WORKER_COUNT, MAX_RECENT_PATHS, PipelineSettings, VIDEO_EXTENSIONS,
    is_video_file,
};
