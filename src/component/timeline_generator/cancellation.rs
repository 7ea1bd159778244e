use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 協作式取消旗標
///
/// 複製後共用同一個旗標；產生執行緒在每張畫格前後檢查。
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
