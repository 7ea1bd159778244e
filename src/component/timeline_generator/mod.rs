//! 時間軸產生元件
//!
//! 單一執行緒、可取消、逐張通知的多畫格產生流程，
//! 完成的結果保存在本次執行期間的記憶體快取中

mod cancellation;
mod main;
mod observer;
mod timeline_cache;

pub use cancellation::CancellationToken;
pub use main::{RUN_JOIN_TIMEOUT, TimelineGenerationPipeline};
pub use observer::TimelineObserver;
pub use timeline_cache::{TimelineCache, TimelineEntry};
