use crate::component::{SourceItem, TimelineObserver};
use crate::config::save::{add_recent_path, save_settings};
use crate::menu::session::PreviewSession;
use crate::signal::is_shutdown_requested;
use crate::tools::{scan_video_files, validate_directory_exists};
use anyhow::Result;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// 一次選取的最終結果
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineOutcome {
    /// 快取命中或備援流程的整組畫格
    Displayed { frames: Vec<PathBuf>, duration: f64 },
    Completed { frame_count: usize, duration: f64 },
    Failed(String),
}

/// 在終端機上顯示時間軸進度
///
/// 所有通知都在主執行緒（`UiQueue` 的消費端）上執行。
pub struct TerminalTimelineObserver {
    progress: Mutex<Option<ProgressBar>>,
    frames: Mutex<Vec<(usize, PathBuf)>>,
    outcome: Mutex<Option<TimelineOutcome>>,
}

impl TerminalTimelineObserver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(None),
            frames: Mutex::new(Vec::new()),
            outcome: Mutex::new(None),
        }
    }

    pub fn take_outcome(&self) -> Option<TimelineOutcome> {
        self.outcome.lock().take()
    }

    #[must_use]
    pub fn frames(&self) -> Vec<(usize, PathBuf)> {
        self.frames.lock().clone()
    }

    fn finish(&self, outcome: TimelineOutcome) {
        if let Some(progress) = self.progress.lock().take() {
            match &outcome {
                TimelineOutcome::Failed(reason) => progress.abandon_with_message(reason.clone()),
                _ => progress.finish_with_message("完成"),
            }
        }
        *self.outcome.lock() = Some(outcome);
    }
}

impl Default for TerminalTimelineObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineObserver for TerminalTimelineObserver {
    fn on_reset(&self, item: &SourceItem) {
        self.frames.lock().clear();
        *self.outcome.lock() = None;

        let progress = ProgressBar::new(0);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress.set_message(format!("取得 {} 的長度...", item.file_name()));

        if let Some(previous) = self.progress.lock().replace(progress) {
            previous.abandon_with_message("已切換");
        }
    }

    fn on_display_frames(&self, _item: &SourceItem, frames: &[PathBuf], duration_seconds: f64) {
        let mut stored = self.frames.lock();
        stored.clear();
        stored.extend(frames.iter().cloned().enumerate());
        drop(stored);

        self.finish(TimelineOutcome::Displayed {
            frames: frames.to_vec(),
            duration: duration_seconds,
        });
    }

    fn on_frame_ready(
        &self,
        _item: &SourceItem,
        artifact: &Path,
        index: usize,
        duration_seconds: f64,
        total: usize,
    ) {
        self.frames.lock().push((index, artifact.to_path_buf()));

        if let Some(progress) = self.progress.lock().as_ref() {
            progress.set_length(total as u64);
            progress.println(format!(
                "  {} {}",
                style(format_timestamp(position_of(index, total, duration_seconds))).cyan(),
                artifact.display()
            ));
        }
    }

    fn on_progress(&self, _item: &SourceItem, done: usize, total: usize, failures: usize) {
        if let Some(progress) = self.progress.lock().as_ref() {
            progress.set_length(total as u64);
            progress.set_position(done as u64);
            if failures > 0 {
                progress.set_message(format!("失敗 {failures} 張"));
            } else {
                progress.set_message("擷取中...");
            }
        }
    }

    fn on_completed(&self, _item: &SourceItem, frame_count: usize, duration_seconds: f64) {
        self.finish(TimelineOutcome::Completed {
            frame_count,
            duration: duration_seconds,
        });
    }

    fn on_failed(&self, _item: &SourceItem, reason: &str) {
        self.finish(TimelineOutcome::Failed(reason.to_string()));
    }
}

fn position_of(index: usize, total: usize, duration_seconds: f64) -> f64 {
    duration_seconds * crate::tools::frame_progress(index, total)
}

/// 秒數格式化為 HH:MM:SS
#[must_use]
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// 選擇資料夾內的影片並產生時間軸，可連續切換不同影片
pub fn run_timeline_viewer(session: &mut PreviewSession) -> Result<()> {
    println!("{}", style("=== 影片時間軸 ===").cyan().bold());

    let directory = prompt_directory(session)?;
    validate_directory_exists(&directory)?;

    let videos = scan_video_files(&directory)?;
    if videos.is_empty() {
        println!("{}", style("找不到任何影片檔案").yellow());
        return Ok(());
    }

    let mut items: Vec<String> = videos
        .iter()
        .map(|video| {
            video
                .path
                .strip_prefix(&directory)
                .unwrap_or(&video.path)
                .display()
                .to_string()
        })
        .collect();
    items.push("返回".to_string());

    let mut default_index = 0;
    loop {
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("選擇影片（ESC 返回）")
            .items(&items)
            .default(default_index)
            .interact_opt()?;

        let Some(index) = selection.filter(|&i| i < videos.len()) else {
            break;
        };
        default_index = index;

        let item = SourceItem::from_path(videos[index].path.clone());
        session.timeline.select(&item);
        wait_for_outcome(session);

        if is_shutdown_requested(&session.shutdown_signal) {
            break;
        }
    }

    session.timeline.cancel();
    Ok(())
}

/// 在主執行緒上執行背景送來的通知，直到這次選取有結果
fn wait_for_outcome(session: &PreviewSession) {
    loop {
        session.ui_queue.run_for(DRAIN_INTERVAL);

        if let Some(outcome) = session.timeline_observer.take_outcome() {
            print_outcome(&outcome);
            return;
        }

        if is_shutdown_requested(&session.shutdown_signal) {
            session.timeline.cancel();
            println!("{}", style("操作已中斷").yellow());
            return;
        }

        if !session.timeline.is_busy() && session.ui_queue.is_empty() {
            // 執行緒已結束但沒有結果：被取消或通知被丟棄
            if let Some(outcome) = session.timeline_observer.take_outcome() {
                print_outcome(&outcome);
            } else {
                warn!("時間軸執行緒已結束但沒有結果");
            }
            return;
        }
    }
}

fn print_outcome(outcome: &TimelineOutcome) {
    match outcome {
        TimelineOutcome::Displayed { frames, duration } => {
            println!(
                "{}",
                style(format!("顯示 {} 張畫格（快取或備援）", frames.len())).green()
            );
            if *duration > 0.0 {
                println!("影片長度: {}", format_timestamp(*duration));
            }
            for (index, frame) in frames.iter().enumerate() {
                println!("  [{index:02}] {}", frame.display());
            }
        }
        TimelineOutcome::Completed {
            frame_count,
            duration,
        } => {
            println!(
                "{}",
                style(format!(
                    "時間軸完成：{frame_count} 張，影片長度 {}",
                    format_timestamp(*duration)
                ))
                .green()
            );
        }
        TimelineOutcome::Failed(reason) => {
            println!("{} {}", style("時間軸產生失敗:").red().bold(), reason);
        }
    }
}

pub(crate) fn prompt_directory(session: &mut PreviewSession) -> Result<PathBuf> {
    let last = session.config.settings.recent_paths.first().cloned();

    let mut input = Input::<String>::new().with_prompt("請輸入影片資料夾路徑");
    if let Some(last) = last {
        input = input.default(last);
    }
    let path: String = input.interact_text()?;
    let path = path.trim().to_string();

    add_recent_path(&mut session.config.settings, &path);
    if let Err(e) = save_settings(&session.config.settings) {
        warn!("無法儲存設定: {e:#}");
    }

    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00");
        assert_eq!(format_timestamp(3725.4), "01:02:05");
        assert_eq!(format_timestamp(-3.0), "00:00:00");
    }

    #[test]
    fn test_observer_records_frames_and_outcome() {
        let observer = TerminalTimelineObserver::new();
        let item = SourceItem::from_path("/videos/a.mp4");

        observer.on_reset(&item);
        observer.on_frame_ready(&item, Path::new("/cache/frame_00.jpg"), 0, 600.0, 2);
        observer.on_progress(&item, 1, 2, 0);
        observer.on_completed(&item, 1, 600.0);

        assert_eq!(observer.frames().len(), 1);
        assert_eq!(
            observer.take_outcome(),
            Some(TimelineOutcome::Completed {
                frame_count: 1,
                duration: 600.0
            })
        );
        assert!(observer.take_outcome().is_none());
    }
}
