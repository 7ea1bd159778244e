use crate::component::{
    ChannelDispatcher, TimelineGenerationPipeline, TimelineObserver, UiQueue, ui_channel,
};
use crate::config::Config;
use crate::menu::timeline_view::TerminalTimelineObserver;
use crate::tools::{ExternalToolLocator, FrameExtractionService};
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 整個程式共用的預覽狀態
///
/// 主執行緒扮演 UI 執行緒：背景工作的結果都送進 `ui_queue`，由選單迴圈執行。
pub struct PreviewSession {
    pub config: Config,
    pub service: Arc<FrameExtractionService>,
    pub timeline: TimelineGenerationPipeline,
    pub timeline_observer: Arc<TerminalTimelineObserver>,
    pub dispatcher: ChannelDispatcher,
    pub ui_queue: UiQueue,
    pub shutdown_signal: Arc<AtomicBool>,
}

impl PreviewSession {
    pub fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Result<Self> {
        let settings = &config.settings;
        let locator = Arc::new(ExternalToolLocator::new(&settings.extra_tool_dirs));
        let cache = settings.open_cache()?;
        let service = Arc::new(
            FrameExtractionService::new(locator, cache)
                .with_formats(settings.thumbnail, settings.timeline_frame),
        );

        let (dispatcher, ui_queue) = ui_channel();
        let timeline_observer = Arc::new(TerminalTimelineObserver::new());
        let observer: Arc<dyn TimelineObserver> = timeline_observer.clone();
        let timeline =
            TimelineGenerationPipeline::new(Arc::clone(&service), Arc::new(dispatcher.clone()), observer);

        Ok(Self {
            config,
            service,
            timeline,
            timeline_observer,
            dispatcher,
            ui_queue,
            shutdown_signal,
        })
    }
}
