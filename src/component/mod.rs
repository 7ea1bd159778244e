//! 功能元件模組
//!
//! 兩條有狀態的管線（縮圖載入、時間軸產生）與它們共用的 UI 轉送機制

pub mod source_item;
pub mod thumbnail_loader;
pub mod timeline_generator;
pub mod ui_dispatch;
mod worker_join;

pub use source_item::{ItemId, SourceItem, VideoRecord};
pub use thumbnail_loader::{AsyncThumbnailLoader, ThumbnailCallback, ThumbnailHandle};
pub use timeline_generator::{
    CancellationToken, TimelineEntry, TimelineGenerationPipeline, TimelineObserver,
};
pub use ui_dispatch::{ChannelDispatcher, DirectDispatcher, UiDispatcher, UiQueue, ui_channel};
