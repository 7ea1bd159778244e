//! 縮圖檔案快取
//!
//! 以確定性的檔名當作快取鍵，檔案存在本身就是命中訊號，不需要另外的索引。

use super::path_validator::ensure_directory_exists;
use anyhow::Result;
use log::{debug, info, warn};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// 預設快取目錄名稱（位於系統暫存目錄下）
pub const DEFAULT_CACHE_DIR_NAME: &str = "videomanager_thumbs";

const THUMB_SUFFIX: &str = "_thumb.jpg";
const TIMELINE_SUFFIX: &str = "_timeline";

static REGEX_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w.\-]+").expect("Invalid regex"));

/// 快取鍵
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    /// 單張縮圖
    Thumbnail(PathBuf),
    /// 時間軸第 N 張畫格
    TimelineFrame { source: PathBuf, index: usize },
}

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    /// 建立快取，目錄不存在時自動建立
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        ensure_directory_exists(&root)?;
        debug!("縮圖快取目錄: {}", root.display());
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        match key {
            ArtifactKey::Thumbnail(source) => {
                self.root.join(format!("{}{THUMB_SUFFIX}", slugify(source)))
            }
            ArtifactKey::TimelineFrame { source, index } => self
                .timeline_dir(source)
                .join(format!("frame_{index:02}.jpg")),
        }
    }

    #[must_use]
    pub fn exists(&self, key: &ArtifactKey) -> bool {
        self.path_for(key).is_file()
    }

    /// 單一影片的時間軸畫格目錄
    #[must_use]
    pub fn timeline_dir(&self, source: &Path) -> PathBuf {
        self.root.join(format!("{}{TIMELINE_SUFFIX}", slugify(source)))
    }

    /// 建立時間軸目錄並回傳畫格路徑
    pub fn prepare_timeline_frame(&self, source: &Path, index: usize) -> Result<PathBuf> {
        ensure_directory_exists(&self.timeline_dir(source))?;
        Ok(self.path_for(&ArtifactKey::TimelineFrame {
            source: source.to_path_buf(),
            index,
        }))
    }

    /// 刪除所有產生的縮圖與時間軸目錄
    ///
    /// 只清除本快取產生的檔案，錯誤只記錄不回傳。
    pub fn clear_all(&self) {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("無法讀取快取目錄 {}: {}", self.root.display(), e);
                return;
            }
        };

        let mut removed = 0usize;
        for entry in entries.filter_map(std::result::Result::ok) {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            let result = if path.is_dir() && name.ends_with(TIMELINE_SUFFIX) {
                fs::remove_dir_all(&path)
            } else if path.is_file() && name.ends_with(THUMB_SUFFIX) {
                fs::remove_file(&path)
            } else {
                continue;
            };

            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("無法刪除快取項目 {}: {}", path.display(), e),
            }
        }

        info!("已清除縮圖快取，共 {removed} 個項目");
    }
}

/// 由影片路徑產生安全的檔名片段（取主檔名）
#[must_use]
pub fn slugify(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map_or_else(|| "video".to_string(), |s| s.to_string_lossy().to_string());

    REGEX_SLUG.replace_all(&stem, "_").into_owned()
}
