use crate::component::source_item::ItemId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// 一次完成的時間軸結果
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub frames: Vec<PathBuf>,
    pub duration_seconds: f64,
}

/// 本次執行期間的時間軸快取
///
/// 項目建立後不再修改；已存在的項目不論張數都直接沿用。
#[derive(Debug, Default)]
pub struct TimelineCache {
    entries: Mutex<HashMap<ItemId, Arc<TimelineEntry>>>,
}

impl TimelineCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<Arc<TimelineEntry>> {
        self.entries.lock().get(id).cloned()
    }

    /// 只在沒有舊項目時寫入，回傳快取中實際保存的項目
    pub fn insert_if_absent(&self, id: ItemId, entry: TimelineEntry) -> Arc<TimelineEntry> {
        Arc::clone(self.entries.lock().entry(id).or_insert_with(|| Arc::new(entry)))
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.lock().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
