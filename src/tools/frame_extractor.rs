use super::artifact_cache::{ArtifactCache, ArtifactKey};
use super::error::ExtractionError;
use super::ffprobe_info::probe_duration;
use super::process_runner::{SystemToolRunner, ToolRunError, ToolRunner};
use super::retry_policy::{RetryPolicy, Sleeper, ThreadSleeper};
use super::storage_speed::frame_count_for_storage;
use super::timestamp_selector::timeline_timestamps;
use super::tool_locator::ExternalToolLocator;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// 無法取得影片長度時的縮圖時間點（秒）
const DEFAULT_THUMBNAIL_TIMESTAMP: f64 = 5.0;

/// 縮圖取在影片長度的 10% 處
const THUMBNAIL_POSITION: f64 = 0.1;

/// `-version` 檢查的逾時
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// 輸出畫格的尺寸與品質
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFormat {
    pub width: u32,
    pub height: u32,
    /// JPEG 品質 (1-31，數字越小品質越高)
    pub quality: u8,
}

impl FrameFormat {
    /// 清單上的單張縮圖
    #[must_use]
    pub const fn thumbnail() -> Self {
        Self {
            width: 160,
            height: 90,
            quality: 3,
        }
    }

    /// 時間軸上的小畫格
    #[must_use]
    pub const fn timeline() -> Self {
        Self {
            width: 120,
            height: 67,
            quality: 5,
        }
    }
}

/// 畫格擷取服務
///
/// 本身沒有可變狀態，可以在多個執行緒間共用（`Arc`）。
/// 所有失敗都在這一層吸收並轉成 `None`。
pub struct FrameExtractionService {
    locator: Arc<ExternalToolLocator>,
    cache: ArtifactCache,
    runner: Arc<dyn ToolRunner>,
    sleeper: Arc<dyn Sleeper>,
    thumbnail_format: FrameFormat,
    timeline_format: FrameFormat,
}

impl FrameExtractionService {
    #[must_use]
    pub fn new(locator: Arc<ExternalToolLocator>, cache: ArtifactCache) -> Self {
        Self {
            locator,
            cache,
            runner: Arc::new(SystemToolRunner),
            sleeper: Arc::new(ThreadSleeper),
            thumbnail_format: FrameFormat::thumbnail(),
            timeline_format: FrameFormat::timeline(),
        }
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub const fn with_formats(mut self, thumbnail: FrameFormat, timeline: FrameFormat) -> Self {
        self.thumbnail_format = thumbnail;
        self.timeline_format = timeline;
        self
    }

    #[must_use]
    pub const fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    #[must_use]
    pub fn locator(&self) -> &ExternalToolLocator {
        &self.locator
    }

    /// 取得影片長度（秒），任何失敗都回傳 `None`
    #[must_use]
    pub fn probe_duration(&self, source_path: &Path) -> Option<f64> {
        let Some(prober) = self.locator.prober() else {
            warn!("{}", ExtractionError::ToolUnavailable("ffprobe"));
            return None;
        };

        match probe_duration(self.runner.as_ref(), prober, source_path) {
            Ok(duration) => Some(duration),
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }

    /// 供外部呼叫的影片長度查詢
    #[must_use]
    pub fn get_video_duration(&self, source_path: &Path) -> Option<f64> {
        self.probe_duration(source_path)
    }

    /// 兩個工具都找得到且 `-version` 都能正常執行
    #[must_use]
    pub fn check_tools_available(&self) -> bool {
        let paths = self.locator.tool_paths();
        let (Some(extractor), Some(prober)) = (&paths.extractor_path, &paths.prober_path) else {
            return false;
        };

        let available = [extractor, prober].iter().all(|tool| {
            matches!(
                self.runner.run(tool, &["-version".to_string()], VERSION_CHECK_TIMEOUT),
                Ok(output) if output.success
            )
        });

        if available {
            info!("FFmpeg: {}", extractor.display());
            info!("FFprobe: {}", prober.display());
        }

        available
    }

    /// 擷取單一畫格，只有逾時會依策略重試
    ///
    /// 第 k 次逾時後等待 `base_delay * 2^k` 再試，用完 `max_attempts` 就放棄。
    /// 工具回報失敗或沒有產生檔案時直接放棄，不重試。
    pub fn extract_frame(
        &self,
        source_path: &Path,
        timestamp: f64,
        destination: &Path,
        format: &FrameFormat,
        policy: &RetryPolicy,
    ) -> Option<PathBuf> {
        let Some(extractor) = self.locator.extractor() else {
            debug!("{}", ExtractionError::ToolUnavailable("ffmpeg"));
            return None;
        };

        let max_attempts = policy.max_attempts.max(1);
        let timeout = policy.timeout_for(source_path);

        for attempt in 0..max_attempts {
            let result =
                self.extract_once(extractor, source_path, timestamp, destination, format, timeout);

            match result {
                Ok(path) => return Some(path),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let wait = policy.backoff(attempt);
                    warn!(
                        "{e}（第 {}/{} 次），{wait:?} 後重試",
                        attempt + 1,
                        max_attempts
                    );
                    self.sleeper.sleep(wait);
                }
                Err(e) if e.is_retryable() => {
                    error!("{e}（{max_attempts} 次嘗試全部逾時）");
                    return None;
                }
                Err(e) => {
                    warn!("{e}");
                    return None;
                }
            }
        }

        None
    }

    /// 產生單張縮圖
    ///
    /// 未指定輸出位置時使用快取路徑，檔案已存在就直接回傳，不呼叫 ffmpeg。
    /// 未指定時間點時取影片 10% 處，長度不明則取第 5 秒。
    /// 只嘗試一次，固定 30 秒逾時。
    pub fn generate_thumbnail(
        &self,
        source_path: &Path,
        output_path: Option<&Path>,
        timestamp: Option<f64>,
    ) -> Option<PathBuf> {
        if self.locator.extractor().is_none() {
            error!("{}", ExtractionError::ToolUnavailable("ffmpeg"));
            return None;
        }

        if !source_path.exists() {
            error!("影片檔案不存在: {}", source_path.display());
            return None;
        }

        let output_path = output_path.map_or_else(
            || {
                self.cache
                    .path_for(&ArtifactKey::Thumbnail(source_path.to_path_buf()))
            },
            Path::to_path_buf,
        );

        if output_path.exists() {
            debug!("使用快取縮圖: {}", output_path.display());
            return Some(output_path);
        }

        let timestamp = timestamp.unwrap_or_else(|| self.default_thumbnail_timestamp(source_path));

        let result = self.extract_frame(
            source_path,
            timestamp,
            &output_path,
            &self.thumbnail_format,
            &RetryPolicy::single_thumbnail(),
        );

        if let Some(path) = &result {
            info!("已產生縮圖: {}", path.display());
        }

        result
    }

    /// 產生時間軸第 `index` 張畫格（已存在就直接使用）
    pub fn generate_timeline_frame(
        &self,
        source_path: &Path,
        index: usize,
        timestamp: f64,
    ) -> Option<PathBuf> {
        if self.locator.extractor().is_none() || !source_path.exists() {
            return None;
        }

        let frame_path = match self.cache.prepare_timeline_frame(source_path, index) {
            Ok(path) => path,
            Err(e) => {
                warn!("無法建立時間軸目錄: {e:#}");
                return None;
            }
        };

        if frame_path.exists() {
            debug!("使用快取時間軸畫格: {}", frame_path.display());
            return Some(frame_path);
        }

        let result = self.extract_frame(
            source_path,
            timestamp,
            &frame_path,
            &self.timeline_format,
            &RetryPolicy::timeline_frame(),
        );

        if result.is_some() {
            debug!("已產生時間軸畫格 {index}: {}", frame_path.display());
        }

        result
    }

    /// 一次產生整組時間軸畫格（長度不明時的備援流程）
    ///
    /// 會重新取得影片長度，仍然失敗就回傳空清單。
    /// 慢速裝置的張數減半（最少 3 張）。
    pub fn generate_timeline_frames(&self, source_path: &Path, requested: usize) -> Vec<PathBuf> {
        if !self.locator.tool_paths().all_available() {
            warn!("FFmpeg 不可用，無法產生時間軸");
            return Vec::new();
        }

        if !source_path.exists() {
            error!("影片檔案不存在: {}", source_path.display());
            return Vec::new();
        }

        let Some(duration) = self.probe_duration(source_path).filter(|d| *d > 0.0) else {
            warn!("無法取得影片長度: {}", source_path.display());
            return Vec::new();
        };

        let frame_count = frame_count_for_storage(source_path, requested);
        if frame_count != requested {
            info!(
                "偵測到慢速儲存裝置 {}，張數由 {requested} 調整為 {frame_count}",
                source_path.display()
            );
        }

        let frames: Vec<PathBuf> = timeline_timestamps(duration, frame_count)
            .into_iter()
            .enumerate()
            .filter_map(|(index, timestamp)| {
                self.generate_timeline_frame(source_path, index, timestamp)
            })
            .collect();

        info!(
            "已產生 {} 張時間軸畫格: {}",
            frames.len(),
            source_path.display()
        );
        frames
    }

    fn default_thumbnail_timestamp(&self, source_path: &Path) -> f64 {
        self.probe_duration(source_path)
            .filter(|d| *d > 0.0)
            .map_or(DEFAULT_THUMBNAIL_TIMESTAMP, |d| d * THUMBNAIL_POSITION)
    }

    fn extract_once(
        &self,
        extractor: &Path,
        source_path: &Path,
        timestamp: f64,
        destination: &Path,
        format: &FrameFormat,
        timeout: Duration,
    ) -> Result<PathBuf, ExtractionError> {
        let args = frame_args(source_path, timestamp, destination, format);

        let result = match self.runner.run(extractor, &args, timeout) {
            Ok(output) if output.success && destination.exists() => {
                return Ok(destination.to_path_buf());
            }
            Ok(output) if output.success => Err(ExtractionError::ExtractionFailed {
                path: source_path.to_path_buf(),
                reason: format!("輸出檔案未建立: {}", destination.display()),
            }),
            Ok(output) => Err(ExtractionError::ExtractionFailed {
                path: source_path.to_path_buf(),
                reason: format!(
                    "ffmpeg 結束代碼 {:?}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            }),
            Err(ToolRunError::TimedOut(timeout)) => Err(ExtractionError::ExtractionTimeout {
                path: source_path.to_path_buf(),
                timeout,
            }),
            Err(e) => Err(ExtractionError::ExtractionFailed {
                path: source_path.to_path_buf(),
                reason: e.to_string(),
            }),
        };

        // 中斷或失敗留下的殘檔會被當成快取命中，必須刪除
        if destination.exists()
            && let Err(e) = fs::remove_file(destination)
        {
            warn!("無法刪除不完整的輸出檔案 {}: {}", destination.display(), e);
        }

        result
    }
}

/// 建立擷取單一畫格的 ffmpeg 參數
///
/// 關閉硬體加速，避免特定顯示卡驅動解碼失敗。
#[must_use]
pub fn frame_args(
    source_path: &Path,
    timestamp: f64,
    destination: &Path,
    format: &FrameFormat,
) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-hwaccel".to_string(),
        "none".to_string(),
        "-i".to_string(),
        source_path.to_string_lossy().to_string(),
        "-ss".to_string(),
        format!("{timestamp:.3}"),
        "-vframes".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        format!("scale={}:{}", format.width, format.height),
        "-q:v".to_string(),
        format.quality.to_string(),
        "-y".to_string(),
        destination.to_string_lossy().to_string(),
    ]
}
