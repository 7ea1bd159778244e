use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 在期限內等待執行緒結束
///
/// 期限到了還沒結束就放手（執行緒繼續在背景跑完），回傳 `false`。
pub fn join_until(handle: JoinHandle<()>, deadline: Instant) -> bool {
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(JOIN_POLL_INTERVAL);
    }

    // 已結束，join 不會阻塞；panic 已在執行緒內處理
    let _ = handle.join();
    true
}

pub fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    join_until(handle, Instant::now() + timeout)
}
