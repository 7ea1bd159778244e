use anyhow::Result;
use console::{Term, style};
use log::{info, warn};
use video_frame_pipeline::config::Config;
use video_frame_pipeline::init;
use video_frame_pipeline::menu::{PreviewSession, show_main_menu};
use video_frame_pipeline::signal::setup_shutdown_signal;

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal()?;

    let config = Config::new()?;
    let mut session = PreviewSession::new(config, shutdown_signal)?;

    loop {
        match show_main_menu(&term, &mut session) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style("再見！").green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                eprintln!("{} {}", style("錯誤:").red().bold(), e);
                break;
            }
        }
    }

    session.timeline.cancel();
    Ok(())
}
