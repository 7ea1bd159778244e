use crate::tools::{ArtifactCache, DEFAULT_CACHE_DIR_NAME, FrameFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAX_RECENT_PATHS: usize = 10;

/// 預設縮圖工作執行緒數量
pub const DEFAULT_WORKER_COUNT: usize = 3;

/// 可辨識的影片副檔名（小寫，不含點）
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts", "m2ts", "3gp",
    "ogv", "vob",
];

#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// 使用者設定（settings.json）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// 縮圖工作執行緒數量
    pub worker_count: usize,
    /// 快取目錄，未設定時使用系統暫存目錄
    pub cache_dir: Option<PathBuf>,
    pub thumbnail: FrameFormat,
    pub timeline_frame: FrameFormat,
    /// 解碼後顯示用的縮圖尺寸
    pub display_width: u32,
    pub display_height: u32,
    /// 已知安裝位置之外額外搜尋 ffmpeg 的目錄
    pub extra_tool_dirs: Vec<PathBuf>,
    pub recent_paths: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            cache_dir: None,
            thumbnail: FrameFormat::thumbnail(),
            timeline_frame: FrameFormat::timeline(),
            display_width: 145,
            display_height: 82,
            extra_tool_dirs: Vec::new(),
            recent_paths: Vec::new(),
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME))
    }

    pub fn open_cache(&self) -> anyhow::Result<ArtifactCache> {
        ArtifactCache::new(self.resolved_cache_dir())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: PipelineSettings,
}
