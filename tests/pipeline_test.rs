//! 整合測試 - 縮圖載入器與時間軸管線的並行行為

mod common;

use common::{FakeRunner, FrameBehavior, RecordingSleeper, build_service, build_service_with_paths, fake_video};
use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use video_frame_pipeline::component::{
    AsyncThumbnailLoader, DirectDispatcher, ItemId, SourceItem, TimelineGenerationPipeline,
    TimelineObserver, ui_channel,
};
use video_frame_pipeline::tools::ToolPaths;

const WAIT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// 縮圖載入器
// ---------------------------------------------------------------------------

/// 測試 1: 同一路徑同時請求多次，只產生一次、只回呼一次
#[test]
fn test_concurrent_duplicate_requests_fire_one_callback() {
    let temp_dir = TempDir::new().unwrap();
    let video = fake_video(temp_dir.path(), "movie.mp4");
    let (release, gate) = unbounded();
    let runner = Arc::new(FakeRunner::new().with_gate(gate));
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = build_service(&runner, &sleeper, &temp_dir.path().join("cache"));
    let loader = Arc::new(AsyncThumbnailLoader::new(service, 3));

    let (results_tx, results) = unbounded();
    let callers: Vec<_> = (0..5)
        .map(|_| {
            let loader = Arc::clone(&loader);
            let video = video.clone();
            let results_tx = results_tx.clone();
            thread::spawn(move || {
                loader.enqueue(&video, move |path, handle| {
                    results_tx
                        .send((path.to_path_buf(), handle.is_some()))
                        .unwrap();
                });
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }

    assert_eq!(loader.loading_count(), 1);
    release.send(()).unwrap();

    let (path, loaded) = results.recv_timeout(WAIT).unwrap();
    assert_eq!(path, video);
    assert!(loaded);
    assert!(
        results.recv_timeout(Duration::from_millis(300)).is_err(),
        "重複的請求不應該回呼"
    );
    assert_eq!(runner.extract_calls(), 1);
    assert_eq!(loader.loading_count(), 0);

    // 記憶體快取命中時在呼叫端執行緒直接回呼
    let called = Arc::new(AtomicBool::new(false));
    let called_clone = Arc::clone(&called);
    loader.enqueue(&video, move |_, handle| {
        assert!(handle.is_some());
        called_clone.store(true, Ordering::SeqCst);
    });
    assert!(called.load(Ordering::SeqCst));
    assert_eq!(runner.extract_calls(), 1);

    println!("✓ 重複請求去重測試通過");
}

/// 測試 2: 多個路徑各回呼一次，縮圖縮放到顯示尺寸
#[test]
fn test_each_path_gets_one_display_sized_handle() {
    let temp_dir = TempDir::new().unwrap();
    let videos: Vec<PathBuf> = (0..6)
        .map(|i| fake_video(temp_dir.path(), &format!("clip{i}.mp4")))
        .collect();
    let runner = Arc::new(FakeRunner::new());
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = build_service(&runner, &sleeper, &temp_dir.path().join("cache"));
    let loader = AsyncThumbnailLoader::with_display_size(service, 2, (145, 82));

    let (results_tx, results) = unbounded();
    for video in &videos {
        let results_tx = results_tx.clone();
        loader.enqueue(video, move |path, handle| {
            let size = handle.map(|h| (h.width(), h.height()));
            results_tx.send((path.to_path_buf(), size)).unwrap();
        });
    }

    let mut delivered: Vec<(PathBuf, Option<(u32, u32)>)> = (0..videos.len())
        .map(|_| results.recv_timeout(WAIT).unwrap())
        .collect();
    delivered.sort();

    assert_eq!(delivered.len(), 6);
    for ((path, size), video) in delivered.iter().zip(&videos) {
        assert_eq!(path, video);
        assert_eq!(*size, Some((145, 82)));
    }
    assert!(loader.cached_handle(&videos[0]).is_some());

    loader.clear_cache();
    assert!(loader.cached_handle(&videos[0]).is_none());
}

/// 測試 3: 擷取失敗時回呼 None
#[test]
fn test_failed_extraction_calls_back_with_none() {
    let temp_dir = TempDir::new().unwrap();
    let video = fake_video(temp_dir.path(), "broken.mp4");
    let runner = Arc::new(FakeRunner::new().with_behavior(FrameBehavior::Fail));
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = build_service(&runner, &sleeper, &temp_dir.path().join("cache"));
    let loader = AsyncThumbnailLoader::new(service, 1);

    let (results_tx, results) = unbounded();
    loader.enqueue(&video, move |_, handle| {
        results_tx.send(handle.is_some()).unwrap();
    });

    assert!(!results.recv_timeout(WAIT).unwrap());
    assert!(loader.placeholder().width() > 0);
}

/// 測試 4: 回呼 panic 不影響工作執行緒
#[test]
fn test_panicking_callback_does_not_kill_worker() {
    let temp_dir = TempDir::new().unwrap();
    let first = fake_video(temp_dir.path(), "first.mp4");
    let second = fake_video(temp_dir.path(), "second.mp4");
    let runner = Arc::new(FakeRunner::new());
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = build_service(&runner, &sleeper, &temp_dir.path().join("cache"));
    let loader = AsyncThumbnailLoader::new(service, 1);

    loader.enqueue(&first, |_, _| panic!("widget already destroyed"));

    let (results_tx, results) = unbounded();
    loader.enqueue(&second, move |path, _| {
        results_tx.send(path.to_path_buf()).unwrap();
    });

    assert_eq!(results.recv_timeout(WAIT).unwrap(), second);
    assert!(!loader.is_loading(&first));
}

/// 測試 5: 關閉時工作執行緒卡住也會在時限內返回，之後不再回呼
#[test]
fn test_shutdown_with_queued_requests_stops_callbacks() {
    let temp_dir = TempDir::new().unwrap();
    let (release, gate) = unbounded();
    let runner = Arc::new(FakeRunner::new().with_gate(gate));
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = build_service(&runner, &sleeper, &temp_dir.path().join("cache"));
    let loader = AsyncThumbnailLoader::new(service, 1).with_join_timeout(Duration::from_millis(200));

    let callbacks = Arc::new(AtomicUsize::new(0));
    for i in 0..5 {
        let video = fake_video(temp_dir.path(), &format!("queued{i}.mp4"));
        let callbacks = Arc::clone(&callbacks);
        loader.enqueue(&video, move |_, _| {
            callbacks.fetch_add(1, Ordering::SeqCst);
        });
    }

    // 等第一個請求進入 ffmpeg（被 gate 擋住）
    let deadline = Instant::now() + WAIT;
    while runner.extract_calls() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    let started = Instant::now();
    loader.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!loader.is_running());

    let after_shutdown = callbacks.load(Ordering::SeqCst);
    for _ in 0..5 {
        let _ = release.send(());
    }
    thread::sleep(Duration::from_millis(300));

    assert_eq!(callbacks.load(Ordering::SeqCst), after_shutdown);
    assert_eq!(after_shutdown, 0);
    assert_eq!(runner.extract_calls(), 1, "排隊中的請求不應該被處理");
    assert_eq!(loader.loading_count(), 0);

    // 關閉後的請求直接忽略
    let late = fake_video(temp_dir.path(), "late.mp4");
    let late_callbacks = Arc::clone(&callbacks);
    loader.enqueue(&late, move |_, _| {
        late_callbacks.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(callbacks.load(Ordering::SeqCst), 0);

    // 可重複呼叫
    loader.shutdown();
}

// ---------------------------------------------------------------------------
// 時間軸管線
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Reset,
    Display { frames: usize, duration: f64 },
    Frame { index: usize, total: usize },
    Progress { done: usize, failures: usize },
    Completed { frames: usize, duration: f64 },
    Failed(String),
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<(ItemId, Event)>>,
    cancel_after_frame: Option<usize>,
    pipeline: OnceLock<Weak<TimelineGenerationPipeline>>,
}

impl RecordingObserver {
    fn cancelling_after(index: usize) -> Self {
        Self {
            cancel_after_frame: Some(index),
            ..Self::default()
        }
    }

    fn events_for(&self, id: &ItemId) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|(item, _)| item == id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    fn frame_indices(&self, id: &ItemId) -> Vec<usize> {
        self.events_for(id)
            .into_iter()
            .filter_map(|event| match event {
                Event::Frame { index, .. } => Some(index),
                _ => None,
            })
            .collect()
    }

    fn record(&self, item: &SourceItem, event: Event) {
        self.events.lock().push((item.id.clone(), event));
    }
}

impl TimelineObserver for RecordingObserver {
    fn on_reset(&self, item: &SourceItem) {
        self.record(item, Event::Reset);
    }

    fn on_display_frames(&self, item: &SourceItem, frames: &[PathBuf], duration_seconds: f64) {
        self.record(
            item,
            Event::Display {
                frames: frames.len(),
                duration: duration_seconds,
            },
        );
    }

    fn on_frame_ready(
        &self,
        item: &SourceItem,
        artifact: &Path,
        index: usize,
        _duration_seconds: f64,
        total: usize,
    ) {
        assert!(artifact.exists());
        self.record(item, Event::Frame { index, total });

        if self.cancel_after_frame == Some(index)
            && let Some(pipeline) = self.pipeline.get().and_then(Weak::upgrade)
        {
            pipeline.cancel();
        }
    }

    fn on_progress(&self, item: &SourceItem, done: usize, _total: usize, failures: usize) {
        self.record(item, Event::Progress { done, failures });
    }

    fn on_completed(&self, item: &SourceItem, frame_count: usize, duration_seconds: f64) {
        self.record(
            item,
            Event::Completed {
                frames: frame_count,
                duration: duration_seconds,
            },
        );
    }

    fn on_failed(&self, item: &SourceItem, reason: &str) {
        self.record(item, Event::Failed(reason.to_string()));
    }
}

fn direct_pipeline(
    runner: &Arc<FakeRunner>,
    cache_dir: &Path,
    observer: &Arc<RecordingObserver>,
) -> Arc<TimelineGenerationPipeline> {
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = build_service(runner, &sleeper, cache_dir);
    let observer_dyn: Arc<dyn TimelineObserver> = observer.clone();
    let pipeline = Arc::new(TimelineGenerationPipeline::new(
        service,
        Arc::new(DirectDispatcher),
        observer_dyn,
    ));
    let _ = observer.pipeline.set(Arc::downgrade(&pipeline));
    pipeline
}

/// 測試 6: 逐張通知、完成後寫入快取，再次選取直接使用快取
#[test]
fn test_progressive_run_then_cache_hit() {
    let temp_dir = TempDir::new().unwrap();
    let video = fake_video(temp_dir.path(), "movie.mp4");
    let runner = Arc::new(FakeRunner::new().with_duration(Some(300.0)));
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = direct_pipeline(&runner, &temp_dir.path().join("cache"), &observer);
    let item = SourceItem::new(7, video);

    pipeline.select(&item);
    assert!(pipeline.wait_idle(WAIT));

    assert_eq!(observer.frame_indices(&item.id), vec![0, 1, 2, 3, 4]);
    let events = observer.events_for(&item.id);
    assert_eq!(events.first(), Some(&Event::Reset));
    assert_eq!(
        events.last(),
        Some(&Event::Completed {
            frames: 5,
            duration: 300.0
        })
    );
    assert!(events.contains(&Event::Progress {
        done: 5,
        failures: 0
    }));
    assert!(events.contains(&Event::Frame { index: 0, total: 5 }));

    let entry = pipeline.cached(&item.id).unwrap();
    assert_eq!(entry.frames.len(), 5);
    assert_eq!(entry.duration_seconds, 300.0);

    let calls = runner.extract_calls();
    let before = observer.events_for(&item.id).len();
    pipeline.select(&item);

    // 快取命中：在 select 返回前就已通知，而且沒有新的執行緒
    let events = observer.events_for(&item.id);
    assert_eq!(events.len(), before + 1);
    assert_eq!(
        events.last(),
        Some(&Event::Display {
            frames: 5,
            duration: 300.0
        })
    );
    assert_eq!(runner.extract_calls(), calls);
    assert!(!pipeline.is_busy());

    println!("✓ 時間軸漸進產生與快取測試通過");
}

/// 測試 7: 取消後不再通知後續畫格，也不寫入快取
#[test]
fn test_cancel_stops_frames_and_skips_cache() {
    let temp_dir = TempDir::new().unwrap();
    let video = fake_video(temp_dir.path(), "movie.mp4");
    let runner = Arc::new(FakeRunner::new().with_duration(Some(300.0)));
    let observer = Arc::new(RecordingObserver::cancelling_after(1));
    let pipeline = direct_pipeline(&runner, &temp_dir.path().join("cache"), &observer);
    let item = SourceItem::new(1, video);

    pipeline.select(&item);
    assert!(pipeline.wait_idle(WAIT));

    assert_eq!(observer.frame_indices(&item.id), vec![0, 1]);
    assert!(pipeline.cached(&item.id).is_none());
    assert!(
        !observer
            .events_for(&item.id)
            .iter()
            .any(|event| matches!(event, Event::Completed { .. } | Event::Failed(_)))
    );
    assert_eq!(runner.extract_calls(), 2);
}

/// 測試 8: 選取新項目會取消上一個，尚未執行的通知也會被丟棄
#[test]
fn test_new_selection_supersedes_previous_run() {
    let temp_dir = TempDir::new().unwrap();
    let first = fake_video(temp_dir.path(), "first.mp4");
    let second = fake_video(temp_dir.path(), "second.mp4");
    let runner = Arc::new(
        FakeRunner::new()
            .with_duration(Some(1800.0))
            .with_delay(Duration::from_millis(20)),
    );
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = build_service(&runner, &sleeper, &temp_dir.path().join("cache"));
    let observer = Arc::new(RecordingObserver::default());
    let (dispatcher, queue) = ui_channel();
    let observer_dyn: Arc<dyn TimelineObserver> = observer.clone();
    let pipeline = TimelineGenerationPipeline::new(service, Arc::new(dispatcher), observer_dyn);

    let first_item = SourceItem::new(1, first);
    let second_item = SourceItem::new(2, second);

    pipeline.select(&first_item);
    let deadline = Instant::now() + WAIT;
    while runner.extract_calls() < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    // 第一個項目的通知還在佇列裡沒有執行
    pipeline.select(&second_item);
    assert!(pipeline.wait_idle(WAIT));

    let deadline = Instant::now() + WAIT;
    while pipeline.cached(&second_item.id).is_none() && Instant::now() < deadline {
        queue.run_for(Duration::from_millis(50));
    }
    queue.run_pending();

    assert_eq!(observer.events_for(&first_item.id), vec![Event::Reset]);
    assert!(pipeline.cached(&first_item.id).is_none());

    assert_eq!(observer.frame_indices(&second_item.id), (0..30).collect::<Vec<_>>());
    assert_eq!(
        observer.events_for(&second_item.id).last(),
        Some(&Event::Completed {
            frames: 30,
            duration: 1800.0
        })
    );
}

/// 測試 9: 失敗的畫格不中斷流程；全部失敗時回報失敗且不寫入快取
#[test]
fn test_failed_frames_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let video = fake_video(temp_dir.path(), "movie.mp4");
    let runner = Arc::new(
        FakeRunner::new()
            .with_duration(Some(180.0))
            .with_script(&[FrameBehavior::Succeed, FrameBehavior::Fail]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = direct_pipeline(&runner, &temp_dir.path().join("cache"), &observer);
    let item = SourceItem::new(3, video);

    pipeline.select(&item);
    assert!(pipeline.wait_idle(WAIT));

    assert_eq!(observer.frame_indices(&item.id), vec![0, 2]);
    assert!(observer.events_for(&item.id).contains(&Event::Progress {
        done: 2,
        failures: 1
    }));
    assert_eq!(pipeline.cached(&item.id).unwrap().frames.len(), 2);

    let all_fail_dir = temp_dir.path().join("other");
    std::fs::create_dir_all(&all_fail_dir).unwrap();
    let broken = fake_video(&all_fail_dir, "broken.mp4");
    let failing_runner = Arc::new(
        FakeRunner::new()
            .with_duration(Some(120.0))
            .with_behavior(FrameBehavior::Fail),
    );
    let failing_observer = Arc::new(RecordingObserver::default());
    let failing = direct_pipeline(
        &failing_runner,
        &temp_dir.path().join("cache2"),
        &failing_observer,
    );
    let broken_item = SourceItem::new(4, broken);

    failing.select(&broken_item);
    assert!(failing.wait_idle(WAIT));

    assert!(matches!(
        failing_observer.events_for(&broken_item.id).last(),
        Some(Event::Failed(_))
    ));
    assert!(failing.cached(&broken_item.id).is_none());
}

/// 測試 10: 取不到長度時改用備援流程一次顯示
#[test]
fn test_unknown_duration_uses_batch_fallback() {
    let temp_dir = TempDir::new().unwrap();
    let video = fake_video(temp_dir.path(), "movie.mp4");
    let runner = Arc::new(
        FakeRunner::new()
            .with_duration(Some(600.0))
            .with_probe_script(&[None]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = direct_pipeline(&runner, &temp_dir.path().join("cache"), &observer);
    let item = SourceItem::new(5, video);

    pipeline.select(&item);
    assert!(pipeline.wait_idle(WAIT));

    assert_eq!(
        observer.events_for(&item.id),
        vec![
            Event::Reset,
            Event::Display {
                frames: 8,
                duration: 0.0
            }
        ]
    );
    assert!(pipeline.cached(&item.id).is_none());
    assert_eq!(runner.probe_calls(), 2);
}

/// 測試 11: 找不到 ffmpeg 或影片不存在時回報失敗
#[test]
fn test_early_failures_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    let video = fake_video(temp_dir.path(), "movie.mp4");
    let runner = Arc::new(FakeRunner::new());
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = build_service_with_paths(
        &runner,
        &sleeper,
        &temp_dir.path().join("cache"),
        ToolPaths::default(),
    );
    let observer = Arc::new(RecordingObserver::default());
    let observer_dyn: Arc<dyn TimelineObserver> = observer.clone();
    let pipeline = TimelineGenerationPipeline::new(service, Arc::new(DirectDispatcher), observer_dyn);
    let item = SourceItem::new(1, video);

    pipeline.select(&item);
    assert!(pipeline.wait_idle(WAIT));
    assert!(matches!(
        observer.events_for(&item.id).last(),
        Some(Event::Failed(_))
    ));

    let working = direct_pipeline(&runner, &temp_dir.path().join("cache"), &observer);
    let missing = SourceItem::new(2, temp_dir.path().join("gone.mp4"));
    working.select(&missing);
    assert!(working.wait_idle(WAIT));
    assert!(matches!(
        observer.events_for(&missing.id).last(),
        Some(Event::Failed(_))
    ));
    assert_eq!(runner.extract_calls(), 0);
}
