//! 整合測試共用的假工具與測試資料

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use video_frame_pipeline::tools::{
    ArtifactCache, ExternalToolLocator, FrameExtractionService, Sleeper, ToolOutput, ToolPaths,
    ToolRunError, ToolRunner,
};

pub const FAKE_FFMPEG: &str = "/fake/bin/ffmpeg";
pub const FAKE_FFPROBE: &str = "/fake/bin/ffprobe";

/// 假 ffmpeg 單次呼叫的行為
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBehavior {
    /// 在輸出參數的位置寫入真正的 JPEG
    Succeed,
    /// 結束代碼 1，不產生檔案
    Fail,
    TimeOut,
}

/// 模擬 ffmpeg / ffprobe 的執行器
pub struct FakeRunner {
    duration_output: Mutex<Option<String>>,
    probe_script: Mutex<VecDeque<Option<f64>>>,
    default_behavior: Mutex<FrameBehavior>,
    script: Mutex<VecDeque<FrameBehavior>>,
    gate: Option<Receiver<()>>,
    delay: Duration,
    extract_calls: AtomicUsize,
    probe_calls: AtomicUsize,
    extracted: Mutex<Vec<PathBuf>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            duration_output: Mutex::new(Some("600.000000\n".to_string())),
            probe_script: Mutex::new(VecDeque::new()),
            default_behavior: Mutex::new(FrameBehavior::Succeed),
            script: Mutex::new(VecDeque::new()),
            gate: None,
            delay: Duration::ZERO,
            extract_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            extracted: Mutex::new(Vec::new()),
        }
    }

    /// 每次擷取前都要從 `gate` 收到一個訊號才繼續
    pub fn with_gate(mut self, gate: Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `None` 表示 ffprobe 失敗
    pub fn with_duration(self, seconds: Option<f64>) -> Self {
        *self.duration_output.lock() = seconds.map(|s| format!("{s:.6}\n"));
        self
    }

    /// 依序套用的 ffprobe 結果，用完後回到 `with_duration` 的設定
    pub fn with_probe_script(self, script: &[Option<f64>]) -> Self {
        self.probe_script.lock().extend(script.iter().copied());
        self
    }

    pub fn with_behavior(self, behavior: FrameBehavior) -> Self {
        *self.default_behavior.lock() = behavior;
        self
    }

    /// 依序套用的行為，用完後回到預設行為
    pub fn with_script(self, script: &[FrameBehavior]) -> Self {
        self.script.lock().extend(script.iter().copied());
        self
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn extracted(&self) -> Vec<PathBuf> {
        self.extracted.lock().clone()
    }

    fn probe(&self) -> Result<ToolOutput, ToolRunError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.probe_script.lock().pop_front();
        let output = match scripted {
            Some(seconds) => seconds.map(|s| format!("{s:.6}\n")),
            None => self.duration_output.lock().clone(),
        };

        Ok(match output {
            Some(stdout) => ToolOutput {
                success: true,
                exit_code: Some(0),
                stdout,
                stderr: String::new(),
            },
            None => ToolOutput {
                success: false,
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "Invalid data found when processing input".to_string(),
            },
        })
    }

    fn extract(&self, args: &[String], timeout: Duration) -> Result<ToolOutput, ToolRunError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let _ = gate.recv_timeout(Duration::from_secs(10));
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let behavior = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(*self.default_behavior.lock());

        match behavior {
            FrameBehavior::Succeed => {
                let destination = PathBuf::from(args.last().expect("destination argument"));
                write_test_jpeg(&destination);
                self.extracted.lock().push(destination);
                Ok(ToolOutput {
                    success: true,
                    exit_code: Some(0),
                    ..ToolOutput::default()
                })
            }
            FrameBehavior::Fail => Ok(ToolOutput {
                success: false,
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "Conversion failed!".to_string(),
            }),
            FrameBehavior::TimeOut => Err(ToolRunError::TimedOut(timeout)),
        }
    }
}

impl ToolRunner for FakeRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<ToolOutput, ToolRunError> {
        if args.iter().any(|arg| arg == "-version") {
            return Ok(ToolOutput {
                success: true,
                exit_code: Some(0),
                stdout: "ffmpeg version fake".to_string(),
                stderr: String::new(),
            });
        }

        if program.to_string_lossy().contains("ffprobe") {
            self.probe()
        } else {
            self.extract(args, timeout)
        }
    }
}

/// 只記錄等待時間、不真的睡眠
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

pub fn write_test_jpeg(path: &Path) {
    RgbImage::from_pixel(160, 90, Rgb([200, 40, 40]))
        .save(path)
        .expect("write test jpeg");
}

/// 建立一個存在的假影片檔
pub fn fake_video(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"not really a video").expect("write fake video");
    path
}

pub fn fake_tool_paths() -> ToolPaths {
    ToolPaths {
        extractor_path: Some(PathBuf::from(FAKE_FFMPEG)),
        prober_path: Some(PathBuf::from(FAKE_FFPROBE)),
    }
}

pub fn build_service(
    runner: &Arc<FakeRunner>,
    sleeper: &Arc<RecordingSleeper>,
    cache_dir: &Path,
) -> Arc<FrameExtractionService> {
    build_service_with_paths(runner, sleeper, cache_dir, fake_tool_paths())
}

pub fn build_service_with_paths(
    runner: &Arc<FakeRunner>,
    sleeper: &Arc<RecordingSleeper>,
    cache_dir: &Path,
    paths: ToolPaths,
) -> Arc<FrameExtractionService> {
    let locator = Arc::new(ExternalToolLocator::with_paths(paths));
    let cache = ArtifactCache::new(cache_dir).expect("create cache");
    let runner: Arc<dyn ToolRunner> = runner.clone();
    let sleeper: Arc<dyn Sleeper> = sleeper.clone();

    Arc::new(
        FrameExtractionService::new(locator, cache)
            .with_runner(runner)
            .with_sleeper(sleeper),
    )
}
