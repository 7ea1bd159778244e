use crate::component::source_item::SourceItem;
use std::path::{Path, PathBuf};

/// 時間軸產生過程的通知對象（通常是 UI）
///
/// 除了快取命中時的 `on_display_frames` 以外，
/// 所有通知都經由 `UiDispatcher` 在 UI 執行緒上呼叫。
pub trait TimelineObserver: Send + Sync {
    /// 清除上一次的漸進式顯示狀態
    fn on_reset(&self, _item: &SourceItem) {}

    /// 一次顯示整組畫格（快取命中或備援流程），長度不明時為 0
    fn on_display_frames(&self, item: &SourceItem, frames: &[PathBuf], duration_seconds: f64);

    fn on_frame_ready(
        &self,
        item: &SourceItem,
        artifact: &Path,
        index: usize,
        duration_seconds: f64,
        total: usize,
    );

    fn on_progress(&self, _item: &SourceItem, _done: usize, _total: usize, _failures: usize) {}

    fn on_completed(&self, item: &SourceItem, frame_count: usize, duration_seconds: f64);

    fn on_failed(&self, item: &SourceItem, reason: &str);
}
