//! 非同步縮圖載入元件
//!
//! 工作執行緒池 + 去重 + 記憶體解碼快取

mod decoder;
mod main;

pub use decoder::{PLACEHOLDER_COLOR, ThumbnailHandle, decode_thumbnail};
pub use main::{AsyncThumbnailLoader, ThumbnailCallback, WORKER_JOIN_TIMEOUT};
