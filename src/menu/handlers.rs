use crate::menu::session::PreviewSession;
use crate::menu::thumbnail_view::run_thumbnail_browser;
use crate::menu::timeline_view::run_timeline_viewer;
use crate::pause;
use anyhow::Result;
use console::{Term, style};

pub fn run_thumbnails(term: &Term, session: &mut PreviewSession) -> Result<()> {
    if let Err(e) = run_thumbnail_browser(session) {
        eprintln!("{} {:#}", style("錯誤:").red().bold(), e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_timeline(term: &Term, session: &mut PreviewSession) -> Result<()> {
    if let Err(e) = run_timeline_viewer(session) {
        eprintln!("{} {:#}", style("錯誤:").red().bold(), e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_tool_check(term: &Term, session: &PreviewSession) -> Result<()> {
    println!("{}", style("=== 檢查 FFmpeg ===").cyan().bold());

    let paths = session.service.locator().tool_paths();
    let describe = |path: Option<&std::path::Path>| {
        path.map_or_else(
            || style("找不到".to_string()).red(),
            |p| style(p.display().to_string()).green(),
        )
    };
    println!("ffmpeg:  {}", describe(paths.extractor_path.as_deref()));
    println!("ffprobe: {}", describe(paths.prober_path.as_deref()));

    if session.service.check_tools_available() {
        println!("\n{}", style("工具可正常使用").green().bold());
    } else {
        println!(
            "\n{}",
            style("工具無法使用，縮圖會以預留圖顯示").yellow().bold()
        );
    }

    pause(term)?;
    Ok(())
}

pub fn run_clear_cache(term: &Term, session: &PreviewSession) -> Result<()> {
    session.timeline.cancel();
    session.timeline.clear_cache();
    session.service.cache().clear_all();

    println!(
        "{} {}",
        style("已清除快取:").green(),
        session.service.cache().root().display()
    );

    pause(term)?;
    Ok(())
}
