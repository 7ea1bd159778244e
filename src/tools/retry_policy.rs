use super::storage_speed::{NORMAL_FRAME_TIMEOUT, frame_timeout};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// 單張縮圖的固定逾時
pub const THUMBNAIL_TIMEOUT: Duration = NORMAL_FRAME_TIMEOUT;

/// 時間軸畫格的總嘗試次數
pub const TIMELINE_MAX_ATTEMPTS: u32 = 3;

/// 退避起始時間，之後每次加倍
pub const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// 擷取的重試策略
///
/// 只有逾時會重試；工具自己回報失敗時直接放棄。
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout_fn: fn(&Path) -> Duration,
}

impl RetryPolicy {
    /// 單張縮圖：一次嘗試、固定 30 秒
    #[must_use]
    pub fn single_thumbnail() -> Self {
        Self {
            max_attempts: 1,
            base_delay: BACKOFF_BASE,
            timeout_fn: fixed_thumbnail_timeout,
        }
    }

    /// 時間軸畫格：三次嘗試、依儲存裝置決定逾時
    #[must_use]
    pub fn timeline_frame() -> Self {
        Self {
            max_attempts: TIMELINE_MAX_ATTEMPTS,
            base_delay: BACKOFF_BASE,
            timeout_fn: frame_timeout,
        }
    }

    #[must_use]
    pub fn timeout_for(&self, source_path: &Path) -> Duration {
        (self.timeout_fn)(source_path)
    }

    /// 第 `attempt` 次（從 0 起算）失敗後的等待時間：1, 2, 4, ...
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

fn fixed_thumbnail_timeout(_: &Path) -> Duration {
    THUMBNAIL_TIMEOUT
}

/// 退避等待的介面，測試時換成假時鐘
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
