use super::cancellation::CancellationToken;
use super::observer::TimelineObserver;
use super::timeline_cache::{TimelineCache, TimelineEntry};
use crate::component::source_item::{ItemId, SourceItem};
use crate::component::ui_dispatch::{UiDispatcher, panic_message, run_guarded};
use crate::component::worker_join::join_with_timeout;
use crate::tools::{
    ExtractionError, FALLBACK_TIMELINE_FRAMES, FrameExtractionService, frame_progress,
    timeline_frame_count,
};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// 切換選取時等待上一個產生執行緒結束的上限
pub const RUN_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

struct ActiveRun {
    item_id: ItemId,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// 時間軸產生管線
///
/// 同一時間只有一個產生執行緒；選取新項目時先取消並等待舊的執行緒。
/// 畫格依序逐張擷取，每完成一張就通知 UI。
/// 完成（至少一張成功）的結果以項目識別碼保存在記憶體中，本次執行期間重複使用。
pub struct TimelineGenerationPipeline {
    service: Arc<FrameExtractionService>,
    cache: Arc<TimelineCache>,
    dispatcher: Arc<dyn UiDispatcher>,
    observer: Arc<dyn TimelineObserver>,
    active: Mutex<Option<ActiveRun>>,
    join_timeout: Duration,
}

impl TimelineGenerationPipeline {
    pub fn new(
        service: Arc<FrameExtractionService>,
        dispatcher: Arc<dyn UiDispatcher>,
        observer: Arc<dyn TimelineObserver>,
    ) -> Self {
        Self {
            service,
            cache: Arc::new(TimelineCache::new()),
            dispatcher,
            observer,
            active: Mutex::new(None),
            join_timeout: RUN_JOIN_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// 選取項目
    ///
    /// 已有快取結果時直接在目前執行緒呼叫 `on_display_frames`，不建立執行緒。
    /// 否則取消上一個執行緒、清除顯示狀態，再開始新的產生流程。
    pub fn select(&self, item: &SourceItem) {
        let cached = self.cache.get(&item.id);
        if let Some(entry) = cached {
            self.cancel();
            debug!("使用快取時間軸: {}", item.path.display());
            run_guarded("timeline observer", || {
                self.observer
                    .on_display_frames(item, &entry.frames, entry.duration_seconds);
            });
            return;
        }

        self.stop_active();

        run_guarded("timeline observer", || self.observer.on_reset(item));

        let token = CancellationToken::new();
        let run = GenerationRun {
            item: item.clone(),
            token: token.clone(),
            service: Arc::clone(&self.service),
            cache: Arc::clone(&self.cache),
            dispatcher: Arc::clone(&self.dispatcher),
            observer: Arc::clone(&self.observer),
        };

        // 持有鎖直到記錄完成，讓執行緒內的 cancel() 一定找得到這次的旗標
        let mut active = self.active.lock();
        let spawned = thread::Builder::new()
            .name(format!("TimelineGenerator-{}", item.id))
            .spawn(move || run.execute());

        match spawned {
            Ok(handle) => {
                info!("開始產生時間軸: {}", item.path.display());
                *active = Some(ActiveRun {
                    item_id: item.id.clone(),
                    token,
                    handle,
                });
            }
            Err(e) => {
                drop(active);
                error!("無法建立時間軸執行緒: {e}");
                run_guarded("timeline observer", || {
                    self.observer.on_failed(item, "無法建立背景執行緒");
                });
            }
        }
    }

    /// 取消目前的產生流程，不開始新的
    pub fn cancel(&self) {
        if let Some(run) = self.active.lock().as_ref()
            && !run.token.is_cancelled()
        {
            info!("取消時間軸產生: {}", run.item_id);
            run.token.cancel();
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    /// 目前（或最後一次）產生的項目
    #[must_use]
    pub fn active_item(&self) -> Option<ItemId> {
        self.active.lock().as_ref().map(|run| run.item_id.clone())
    }

    /// 等待目前的產生執行緒結束，逾時回傳 `false`
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_busy() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(IDLE_POLL_INTERVAL);
        }
        true
    }

    #[must_use]
    pub fn cached(&self, id: &ItemId) -> Option<Arc<TimelineEntry>> {
        self.cache.get(id)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn stop_active(&self) {
        let previous = self.active.lock().take();
        if let Some(run) = previous {
            run.token.cancel();
            if !join_with_timeout(run.handle, self.join_timeout) {
                warn!(
                    "上一個時間軸執行緒未在 {:?} 內結束，改為背景結束: {}",
                    self.join_timeout, run.item_id
                );
            }
        }
    }
}

impl Drop for TimelineGenerationPipeline {
    fn drop(&mut self) {
        if let Some(run) = self.active.get_mut().take() {
            run.token.cancel();
        }
    }
}

/// 單一項目的一次產生流程（在背景執行緒上執行）
struct GenerationRun {
    item: SourceItem,
    token: CancellationToken,
    service: Arc<FrameExtractionService>,
    cache: Arc<TimelineCache>,
    dispatcher: Arc<dyn UiDispatcher>,
    observer: Arc<dyn TimelineObserver>,
}

impl GenerationRun {
    fn execute(self) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.generate())) {
            error!(
                "時間軸產生失敗 {}: {}",
                self.item.path.display(),
                panic_message(payload.as_ref())
            );
            self.post(|observer, item| observer.on_failed(item, "內部錯誤"));
        }
    }

    fn generate(&self) {
        let source = self.item.path.as_path();

        if self.service.locator().extractor().is_none() {
            let reason = ExtractionError::ToolUnavailable("ffmpeg").to_string();
            warn!("{reason}");
            self.post(move |observer, item| observer.on_failed(item, &reason));
            return;
        }

        if !source.exists() {
            warn!("影片檔案不存在: {}", source.display());
            self.post(|observer, item| observer.on_failed(item, "影片檔案不存在"));
            return;
        }

        let Some(duration) = self.service.probe_duration(source).filter(|d| *d > 0.0) else {
            self.generate_fallback();
            return;
        };

        let total = timeline_frame_count(duration);
        info!(
            "產生 {total} 張時間軸畫格（長度 {duration:.1} 秒）: {}",
            source.display()
        );

        let mut frames: Vec<PathBuf> = Vec::with_capacity(total);
        let mut failures = 0;

        for index in 0..total {
            if self.token.is_cancelled() {
                info!("時間軸產生已取消（第 {index} 張前）: {}", source.display());
                return;
            }

            let timestamp = duration * frame_progress(index, total);
            let frame = self.service.generate_timeline_frame(source, index, timestamp);

            if self.token.is_cancelled() {
                debug!("已取消，捨棄第 {index} 張畫格");
                return;
            }

            match frame {
                Some(path) => {
                    frames.push(path.clone());
                    self.post(move |observer, item| {
                        observer.on_frame_ready(item, &path, index, duration, total);
                    });
                }
                None => {
                    failures += 1;
                    warn!("第 {index} 張畫格擷取失敗 ({timestamp:.1} 秒)");
                }
            }

            let done = index + 1;
            self.post(move |observer, item| observer.on_progress(item, done, total, failures));
        }

        if frames.is_empty() {
            error!("沒有任何畫格擷取成功: {}", source.display());
            self.post(|observer, item| observer.on_failed(item, "無法產生時間軸畫格"));
            return;
        }

        let frame_count = frames.len();
        self.cache.insert_if_absent(
            self.item.id.clone(),
            TimelineEntry {
                frames,
                duration_seconds: duration,
            },
        );

        info!(
            "時間軸完成 {frame_count}/{total} 張（失敗 {failures} 張）: {}",
            source.display()
        );
        self.post(move |observer, item| observer.on_completed(item, frame_count, duration));
    }

    /// 長度不明時一次產生固定張數，不做漸進通知也不寫入快取
    fn generate_fallback(&self) {
        let source = self.item.path.as_path();
        warn!("無法取得影片長度，改用備援流程: {}", source.display());

        let frames = self
            .service
            .generate_timeline_frames(source, FALLBACK_TIMELINE_FRAMES);

        if self.token.is_cancelled() {
            return;
        }

        if frames.is_empty() {
            self.post(|observer, item| observer.on_failed(item, "無法取得影片長度"));
        } else {
            self.post(move |observer, item| observer.on_display_frames(item, &frames, 0.0));
        }
    }

    /// 把通知送到 UI 執行緒；執行前再確認這次流程沒有被取消
    fn post<F>(&self, notify: F)
    where
        F: FnOnce(&dyn TimelineObserver, &SourceItem) + Send + 'static,
    {
        let token = self.token.clone();
        let observer = Arc::clone(&self.observer);
        let item = self.item.clone();

        self.dispatcher.post(Box::new(move || {
            if token.is_cancelled() {
                return;
            }
            run_guarded("timeline observer", || notify(observer.as_ref(), &item));
        }));
    }
}
