use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 擷取管線內部的錯誤分類
///
/// 這些錯誤只在元件內部流動，到了元件邊界一律轉成 `None` 或失敗回呼，
/// 不會跨越執行緒往外拋。
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("找不到外部工具: {0}")]
    ToolUnavailable(&'static str),

    #[error("無法取得影片長度 {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("擷取逾時（{timeout:?}）: {path}")]
    ExtractionTimeout { path: PathBuf, timeout: Duration },

    #[error("擷取失敗 {path}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("無法解碼縮圖 {path}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("回呼執行失敗: {0}")]
    CallbackFailed(String),
}

impl ExtractionError {
    /// 只有逾時值得重試
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ExtractionTimeout { .. })
    }
}
