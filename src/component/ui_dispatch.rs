//! 將結果送回 UI 執行緒
//!
//! 背景執行緒不直接修改 UI 狀態，而是把閉包交給 [`UiDispatcher`]，
//! 由 UI 執行緒在自己的事件迴圈中執行。

use crate::tools::ExtractionError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, error};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

pub trait UiDispatcher: Send + Sync {
    fn post(&self, task: UiTask);
}

/// 直接在呼叫端執行緒執行（無 UI 的情境或測試）
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDispatcher;

impl UiDispatcher for DirectDispatcher {
    fn post(&self, task: UiTask) {
        run_guarded("ui task", task);
    }
}

/// 透過 channel 把工作交給 UI 執行緒
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: Sender<UiTask>,
}

impl UiDispatcher for ChannelDispatcher {
    fn post(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            debug!("UI 佇列已關閉，捨棄工作");
        }
    }
}

/// UI 執行緒端的佇列
#[derive(Debug)]
pub struct UiQueue {
    rx: Receiver<UiTask>,
}

impl UiQueue {
    /// 執行目前所有待處理的工作，回傳執行數量
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.rx.try_recv() {
            run_guarded("ui task", task);
            count += 1;
        }
        count
    }

    /// 最多等待 `wait` 取得第一個工作，之後把剩下的一併執行
    pub fn run_for(&self, wait: Duration) -> usize {
        match self.rx.recv_timeout(wait) {
            Ok(task) => {
                run_guarded("ui task", task);
                1 + self.run_pending()
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[must_use]
pub fn ui_channel() -> (ChannelDispatcher, UiQueue) {
    let (tx, rx) = unbounded();
    (ChannelDispatcher { tx }, UiQueue { rx })
}

/// 執行回呼並攔截 panic，回呼失敗不能拖垮工作執行緒
pub(crate) fn run_guarded<F: FnOnce()>(label: &str, f: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let error = ExtractionError::CallbackFailed(panic_message(payload.as_ref()));
            error!("{label}: {error}");
            false
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
