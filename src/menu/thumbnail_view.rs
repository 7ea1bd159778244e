use crate::component::{AsyncThumbnailLoader, UiDispatcher};
use crate::menu::session::PreviewSession;
use crate::menu::timeline_view::prompt_directory;
use crate::signal::is_shutdown_requested;
use crate::tools::{scan_video_files, validate_directory_exists};
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct ThumbnailSummary {
    loaded: Vec<(PathBuf, u32, u32)>,
    missing: Vec<PathBuf>,
}

/// 為資料夾內所有影片產生縮圖
///
/// 每個請求由載入器的工作執行緒處理，回呼再轉送回主執行緒更新進度。
pub fn run_thumbnail_browser(session: &mut PreviewSession) -> Result<()> {
    println!("{}", style("=== 資料夾縮圖 ===").cyan().bold());

    let directory = prompt_directory(session)?;
    validate_directory_exists(&directory)?;

    println!("{}", style("掃描影片檔案中...").dim());
    let videos = scan_video_files(&directory)?;
    if videos.is_empty() {
        println!("{}", style("找不到任何影片檔案").yellow());
        return Ok(());
    }

    println!(
        "{}",
        style(format!("找到 {} 個影片檔案", videos.len())).green()
    );

    let settings = &session.config.settings;
    let loader = AsyncThumbnailLoader::with_display_size(
        Arc::clone(&session.service),
        settings.worker_count,
        (settings.display_width, settings.display_height),
    );

    let progress = ProgressBar::new(videos.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    progress.set_message("產生縮圖中...");

    let summary = Arc::new(Mutex::new(ThumbnailSummary::default()));

    for video in &videos {
        let dispatcher = session.dispatcher.clone();
        let summary = Arc::clone(&summary);
        let progress = progress.clone();

        loader.enqueue(&video.path, move |source, handle| {
            let source = source.to_path_buf();
            let size = handle.map(|h| (h.width(), h.height()));
            dispatcher.post(Box::new(move || {
                let mut summary = summary.lock();
                match size {
                    Some((width, height)) => summary.loaded.push((source, width, height)),
                    None => summary.missing.push(source),
                }
                progress.inc(1);
            }));
        });
    }

    let mut interrupted = false;
    while progress.position() < videos.len() as u64 {
        session.ui_queue.run_for(DRAIN_INTERVAL);

        if is_shutdown_requested(&session.shutdown_signal) {
            interrupted = true;
            break;
        }

        // 沒有請求在處理、也沒有待執行的通知
        if loader.loading_count() == 0 && session.ui_queue.is_empty() {
            break;
        }
    }

    loader.shutdown();
    session.ui_queue.run_pending();

    if interrupted {
        progress.abandon_with_message("操作已中斷");
    } else {
        progress.finish_with_message("完成");
    }

    print_summary(&summary.lock(), &session.service.cache().root().display().to_string());
    Ok(())
}

fn print_summary(summary: &ThumbnailSummary, cache_root: &str) {
    println!();
    println!(
        "{} 成功 {}，失敗 {}",
        style("縮圖結果:").bold(),
        style(summary.loaded.len()).green(),
        style(summary.missing.len()).red()
    );
    println!("{} {cache_root}", style("快取目錄:").dim());

    for (path, width, height) in &summary.loaded {
        println!("  {} {} ({width}x{height})", style("✓").green(), path.display());
    }
    for path in &summary.missing {
        println!("  {} {} (使用預留圖)", style("✗").red(), path.display());
    }
}
