//! 儲存裝置速度判斷
//!
//! 純粹依路徑字串猜測，不做任何 I/O。只用來挑選逾時與張數上限，
//! 誤判可以接受。

use std::path::Path;
use std::time::Duration;

/// 一般儲存裝置的單張擷取逾時
pub const NORMAL_FRAME_TIMEOUT: Duration = Duration::from_secs(30);

/// 外接或網路儲存裝置的單張擷取逾時
pub const SLOW_FRAME_TIMEOUT: Duration = Duration::from_secs(60);

/// 慢速裝置減半張數後的下限
pub const SLOW_STORAGE_MIN_FRAMES: usize = 3;

const SLOW_INDICATORS: &[&str] = &[
    "elements",
    "backup",
    "external",
    "portable",
    "usb",
    "removable",
    "network",
    "smb://",
    "nfs://",
    "\\\\",
    "seagate",
    "wd-",
    "western digital",
    "my passport",
    "14tb",
    "10tb",
    "8tb",
    "6tb",
    "4tb",
    "2tb",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageSpeed {
    Normal,
    Slow,
}

#[must_use]
pub fn classify_storage_speed(source_path: &Path) -> StorageSpeed {
    let path_lower = source_path.to_string_lossy().to_lowercase();

    if SLOW_INDICATORS
        .iter()
        .any(|indicator| path_lower.contains(indicator))
    {
        StorageSpeed::Slow
    } else {
        StorageSpeed::Normal
    }
}

#[must_use]
pub fn frame_timeout(source_path: &Path) -> Duration {
    match classify_storage_speed(source_path) {
        StorageSpeed::Slow => SLOW_FRAME_TIMEOUT,
        StorageSpeed::Normal => NORMAL_FRAME_TIMEOUT,
    }
}

/// 慢速裝置的張數減半（最少 3 張）
#[must_use]
pub fn frame_count_for_storage(source_path: &Path, requested: usize) -> usize {
    match classify_storage_speed(source_path) {
        StorageSpeed::Slow => (requested / 2).max(SLOW_STORAGE_MIN_FRAMES),
        StorageSpeed::Normal => requested,
    }
}
