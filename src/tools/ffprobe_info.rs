use super::error::ExtractionError;
use super::process_runner::{ToolRunError, ToolRunner};
use std::path::Path;
use std::time::Duration;

/// 取得影片長度的逾時（只是參考資訊，不重試）
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// 使用 ffprobe 取得影片長度（秒）
pub fn probe_duration(
    runner: &dyn ToolRunner,
    prober: &Path,
    source_path: &Path,
) -> Result<f64, ExtractionError> {
    let probe_failed = |reason: String| ExtractionError::ProbeFailed {
        path: source_path.to_path_buf(),
        reason,
    };

    let output = runner
        .run(prober, &duration_args(source_path), PROBE_TIMEOUT)
        .map_err(|e| match e {
            ToolRunError::TimedOut(timeout) => probe_failed(format!("逾時 {timeout:?}")),
            other => probe_failed(other.to_string()),
        })?;

    if !output.success {
        return Err(probe_failed(format!(
            "ffprobe 結束代碼 {:?}: {}",
            output.exit_code,
            output.stderr.trim()
        )));
    }

    parse_duration(&output.stdout)
        .ok_or_else(|| probe_failed(format!("無法解析輸出: {:?}", output.stdout.trim())))
}

fn duration_args(source_path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        source_path.to_string_lossy().to_string(),
    ]
}

/// 解析 ffprobe 輸出的單一數值（例如 "1834.120000"）
fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite())
}
