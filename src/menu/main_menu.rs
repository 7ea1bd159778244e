use crate::config::save::save_settings;
use crate::menu::handlers::{run_clear_cache, run_thumbnails, run_timeline, run_tool_check};
use crate::menu::session::PreviewSession;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

pub fn show_main_menu(term: &Term, session: &mut PreviewSession) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style("=== 影片縮圖與時間軸 ===").cyan().bold());
    println!("{}", style("ESC 離開").dim());

    let options = vec![
        "資料夾縮圖",
        "影片時間軸",
        "檢查 FFmpeg",
        "清除快取",
        "設定",
        "離開",
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("請選擇功能")
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_thumbnails(term, session)?;
            Ok(true)
        }
        Some(1) => {
            run_timeline(term, session)?;
            Ok(true)
        }
        Some(2) => {
            run_tool_check(term, session)?;
            Ok(true)
        }
        Some(3) => {
            run_clear_cache(term, session)?;
            Ok(true)
        }
        Some(4) => {
            show_settings_menu(term, session)?;
            Ok(true)
        }
        Some(5) | None => Ok(false),
        _ => unreachable!(),
    }
}

/// 設定選單（目前只有縮圖工作執行緒數量）
fn show_settings_menu(term: &Term, session: &mut PreviewSession) -> Result<()> {
    term.clear_screen()?;

    let settings = &mut session.config.settings;
    println!("{}", style("=== 設定 ===").cyan().bold());
    println!(
        "\n{} {}",
        style("縮圖工作執行緒:").dim(),
        settings.worker_count
    );
    println!(
        "{} {}",
        style("快取目錄:").dim(),
        settings.resolved_cache_dir().display()
    );
    println!();

    let worker_count: usize = Input::new()
        .with_prompt("縮圖工作執行緒數量")
        .default(settings.worker_count)
        .validate_with(|value: &usize| {
            if (1..=16).contains(value) {
                Ok(())
            } else {
                Err("請輸入 1 到 16")
            }
        })
        .interact_text_on(term)?;

    if worker_count != settings.worker_count {
        settings.worker_count = worker_count;
        save_settings(settings)?;
        println!("\n{} {worker_count}", style("已儲存:").green());
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}
