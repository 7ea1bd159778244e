use super::decoder::{ThumbnailHandle, decode_thumbnail};
use crate::component::ui_dispatch::{panic_message, run_guarded};
use crate::component::worker_join::join_until;
use crate::config::DEFAULT_WORKER_COUNT;
use crate::tools::FrameExtractionService;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// 工作執行緒等待佇列的最長時間，逾時後檢查是否該結束
const QUEUE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// `shutdown()` 等待所有工作執行緒結束的上限
pub const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

pub type ThumbnailCallback = Box<dyn FnOnce(&Path, Option<ThumbnailHandle>) + Send + 'static>;

enum Request {
    Load {
        source: PathBuf,
        callback: ThumbnailCallback,
    },
    Stop,
}

/// 工作執行緒共用的狀態
struct LoaderShared {
    service: Arc<FrameExtractionService>,
    handles: Mutex<HashMap<PathBuf, ThumbnailHandle>>,
    loading: Mutex<HashSet<PathBuf>>,
    running: AtomicBool,
    /// `true` 表示仍可執行回呼；關閉時取寫鎖改成 `false`
    callback_gate: RwLock<bool>,
    display_size: (u32, u32),
}

/// 非同步縮圖載入器
///
/// 固定數量的工作執行緒從共用佇列取出請求，
/// 透過 [`FrameExtractionService`] 產生縮圖檔後解碼成可顯示的 [`ThumbnailHandle`]。
///
/// - 同一路徑在處理完成前重複請求會被丟棄，只有第一個請求的回呼會被呼叫
/// - 已解碼的縮圖保留在記憶體中，再次請求時在呼叫端執行緒直接回呼
/// - 回呼在工作執行緒上執行，需要更新 UI 時請透過 `UiDispatcher` 轉送
pub struct AsyncThumbnailLoader {
    shared: Arc<LoaderShared>,
    tx: Sender<Request>,
    rx: Receiver<Request>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    join_timeout: Duration,
}

impl AsyncThumbnailLoader {
    pub fn new(service: Arc<FrameExtractionService>, worker_count: usize) -> Self {
        Self::with_display_size(service, worker_count, (145, 82))
    }

    pub fn with_display_size(
        service: Arc<FrameExtractionService>,
        worker_count: usize,
        display_size: (u32, u32),
    ) -> Self {
        let worker_count = if worker_count == 0 {
            DEFAULT_WORKER_COUNT
        } else {
            worker_count
        };

        let (tx, rx) = unbounded();
        let shared = Arc::new(LoaderShared {
            service,
            handles: Mutex::new(HashMap::new()),
            loading: Mutex::new(HashSet::new()),
            running: AtomicBool::new(true),
            callback_gate: RwLock::new(true),
            display_size,
        });

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let shared = Arc::clone(&shared);
            let rx = rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("ThumbnailWorker-{index}"))
                .spawn(move || worker_loop(index, &shared, &rx));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => error!("無法建立縮圖工作執行緒 {index}: {e}"),
            }
        }

        info!("縮圖載入器已啟動，{} 個工作執行緒", workers.len());

        Self {
            shared,
            tx,
            rx,
            workers: Mutex::new(workers),
            worker_count,
            join_timeout: WORKER_JOIN_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// 請求一張縮圖
    ///
    /// 記憶體中已有解碼結果時在目前執行緒直接呼叫 `callback`。
    /// 同一路徑已在佇列或處理中時丟棄這次請求。
    pub fn enqueue<F>(&self, source_path: &Path, callback: F)
    where
        F: FnOnce(&Path, Option<ThumbnailHandle>) + Send + 'static,
    {
        if !self.shared.running.load(Ordering::SeqCst) {
            debug!("載入器已關閉，忽略請求: {}", source_path.display());
            return;
        }

        let cached = self.shared.handles.lock().get(source_path).cloned();
        if let Some(handle) = cached {
            run_guarded("thumbnail callback", || callback(source_path, Some(handle)));
            return;
        }

        if !self.shared.loading.lock().insert(source_path.to_path_buf()) {
            debug!("已在處理中，略過重複請求: {}", source_path.display());
            return;
        }

        let request = Request::Load {
            source: source_path.to_path_buf(),
            callback: Box::new(callback),
        };

        if self.tx.send(request).is_err() {
            self.shared.loading.lock().remove(source_path);
            warn!("請求佇列已關閉: {}", source_path.display());
        }
    }

    /// 停止所有工作執行緒並清除記憶體快取，可重複呼叫
    ///
    /// 回傳後不會再有任何回呼被執行。
    pub fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("正在關閉縮圖載入器...");

        // 丟棄尚未開始的請求
        let mut dropped = 0;
        while let Ok(request) = self.rx.try_recv() {
            if let Request::Load { source, .. } = request {
                self.shared.loading.lock().remove(&source);
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!("捨棄 {dropped} 個排隊中的請求");
        }

        for _ in 0..self.worker_count {
            let _ = self.tx.send(Request::Stop);
        }

        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        let deadline = Instant::now() + self.join_timeout;
        let mut detached = 0;
        for handle in workers {
            if !join_until(handle, deadline) {
                detached += 1;
            }
        }
        if detached > 0 {
            warn!("{detached} 個工作執行緒未在時限內結束，改為背景結束");
        }

        // 等待執行中的回呼結束，並阻止之後的回呼
        *self.shared.callback_gate.write() = false;

        self.clear_cache();
        info!("縮圖載入器已關閉");
    }

    /// 佇列中尚未被取出的請求數
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.tx.len()
    }

    /// 排隊中與處理中的路徑數
    #[must_use]
    pub fn loading_count(&self) -> usize {
        self.shared.loading.lock().len()
    }

    #[must_use]
    pub fn is_loading(&self, source_path: &Path) -> bool {
        self.shared.loading.lock().contains(source_path)
    }

    #[must_use]
    pub fn cached_handle(&self, source_path: &Path) -> Option<ThumbnailHandle> {
        self.shared.handles.lock().get(source_path).cloned()
    }

    /// 清除記憶體中的解碼快取（磁碟上的縮圖檔不受影響）
    pub fn clear_cache(&self) {
        self.shared.handles.lock().clear();
    }

    #[must_use]
    pub fn placeholder(&self) -> ThumbnailHandle {
        let (width, height) = self.shared.display_size;
        ThumbnailHandle::placeholder(width, height)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

impl Drop for AsyncThumbnailLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(index: usize, shared: &LoaderShared, rx: &Receiver<Request>) {
    debug!("縮圖工作執行緒 {index} 啟動");

    while shared.running.load(Ordering::SeqCst) {
        match rx.recv_timeout(QUEUE_POLL_INTERVAL) {
            Ok(Request::Load { source, callback }) => {
                if !shared.running.load(Ordering::SeqCst) {
                    shared.loading.lock().remove(&source);
                    break;
                }
                shared.process(&source, callback);
            }
            Ok(Request::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    debug!("縮圖工作執行緒 {index} 結束");
}

/// 離開作用域時把路徑移出處理中集合
struct LoadingGuard<'a> {
    loading: &'a Mutex<HashSet<PathBuf>>,
    source: &'a Path,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading.lock().remove(self.source);
    }
}

impl LoaderShared {
    fn process(&self, source: &Path, callback: ThumbnailCallback) {
        let handle = {
            let _loading = LoadingGuard {
                loading: &self.loading,
                source,
            };

            match panic::catch_unwind(AssertUnwindSafe(|| self.load(source))) {
                Ok(handle) => handle,
                Err(payload) => {
                    error!(
                        "載入縮圖時發生錯誤 {}: {}",
                        source.display(),
                        panic_message(payload.as_ref())
                    );
                    None
                }
            }
        };

        let gate = self.callback_gate.read();
        if !*gate {
            debug!("載入器已關閉，不執行回呼: {}", source.display());
            return;
        }
        run_guarded("thumbnail callback", || callback(source, handle));
    }

    fn load(&self, source: &Path) -> Option<ThumbnailHandle> {
        let Some(thumbnail_path) = self.service.generate_thumbnail(source, None, None) else {
            debug!("無法產生縮圖: {}", source.display());
            return None;
        };

        let (width, height) = self.display_size;
        match decode_thumbnail(&thumbnail_path, width, height) {
            Ok(handle) => {
                self.handles
                    .lock()
                    .insert(source.to_path_buf(), handle.clone());
                Some(handle)
            }
            Err(e) => {
                error!("{e}");
                None
            }
        }
    }
}
