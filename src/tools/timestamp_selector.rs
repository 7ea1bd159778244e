//! 時間軸畫格的張數與時間點
//!
//! 每分鐘一張（四捨五入到偶數），至少 1 張、最多 120 張。
//! 畫格均勻分佈在影片 5% 到 95% 之間，避開片頭片尾；只有一張時取正中間。

/// 時間軸張數上限
pub const MAX_TIMELINE_FRAMES: usize = 120;

/// 無法取得長度時的備援張數
pub const FALLBACK_TIMELINE_FRAMES: usize = 8;

const EDGE_MARGIN: f64 = 0.05;
const SPAN: f64 = 0.9;

/// 依影片長度（秒）決定時間軸張數
#[must_use]
pub fn timeline_frame_count(duration_seconds: f64) -> usize {
    let minutes = (duration_seconds / 60.0).round_ties_even();
    if minutes.is_nan() || minutes < 1.0 {
        return 1;
    }
    (minutes as usize).min(MAX_TIMELINE_FRAMES)
}

/// 第 `index` 張畫格在影片中的位置（0.0 ~ 1.0）
#[must_use]
pub fn frame_progress(index: usize, frame_count: usize) -> f64 {
    if frame_count <= 1 {
        return 0.5;
    }
    EDGE_MARGIN + (index as f64 / (frame_count - 1) as f64) * SPAN
}

/// 所有畫格的時間點（秒），依索引遞增
#[must_use]
pub fn timeline_timestamps(duration_seconds: f64, frame_count: usize) -> Vec<f64> {
    (0..frame_count)
        .map(|i| duration_seconds * frame_progress(i, frame_count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_per_minute() {
        assert_eq!(timeline_frame_count(1800.0), 30);
        assert_eq!(timeline_frame_count(60.0), 1);
        assert_eq!(timeline_frame_count(36_000.0), 120);
    }

    #[test]
    fn test_frame_count_lower_bound() {
        assert_eq!(timeline_frame_count(5.0), 1);
        assert_eq!(timeline_frame_count(0.0), 1);
        // 1.5 分鐘 -> 2（偶數）, 2.5 分鐘 -> 2
        assert_eq!(timeline_frame_count(90.0), 2);
        assert_eq!(timeline_frame_count(150.0), 2);
    }

    #[test]
    fn test_single_frame_is_centered() {
        assert_eq!(timeline_timestamps(100.0, 1), vec![50.0]);
    }

    #[test]
    fn test_timestamps_stay_inside_margins() {
        let duration = 1800.0;
        let timestamps = timeline_timestamps(duration, 30);

        assert_eq!(timestamps.len(), 30);
        assert!((timestamps[0] - duration * 0.05).abs() < 1e-9);
        assert!((timestamps[29] - duration * 0.95).abs() < 1e-9);
        for pair in timestamps.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        for t in &timestamps {
            assert!(*t >= duration * 0.05 - 1e-9 && *t <= duration * 0.95 + 1e-9);
        }
    }

    #[test]
    fn test_frame_progress_endpoints() {
        assert!((frame_progress(0, 8) - 0.05).abs() < 1e-12);
        assert!((frame_progress(7, 8) - 0.95).abs() < 1e-12);
    }
}
