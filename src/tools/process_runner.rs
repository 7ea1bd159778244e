use log::{debug, warn};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// 輪詢子程序狀態的間隔
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// 外部工具執行結果
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ToolRunError {
    #[error("執行逾時（{0:?}）")]
    TimedOut(Duration),

    #[error("無法啟動程序: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("無法檢查程序狀態: {0}")]
    Wait(#[source] std::io::Error),
}

/// 執行外部工具的介面
///
/// 正式環境使用 [`SystemToolRunner`]；測試注入假的實作來計算呼叫次數、
/// 模擬逾時或失敗。
pub trait ToolRunner: Send + Sync {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<ToolOutput, ToolRunError>;
}

/// 以子程序執行外部工具，超過時限即終止
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<ToolOutput, ToolRunError> {
        debug!("執行 {} {}", program.display(), args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ToolRunError::Spawn)?;

        // 管線要另外讀取，否則輸出塞滿緩衝區時子程序會卡住
        let stdout_reader = spawn_pipe_reader(child.stdout.take());
        let stderr_reader = spawn_pipe_reader(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolRunError::Wait(e));
                }
            }

            if Instant::now() >= deadline {
                warn!(
                    "程序執行逾時，終止程序 [{}]: {}",
                    child.id(),
                    program.display()
                );
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolRunError::TimedOut(timeout));
            }

            thread::sleep(POLL_INTERVAL);
        };

        Ok(ToolOutput {
            success: status.success(),
            exit_code: status.code(),
            stdout: collect_pipe(stdout_reader),
            stderr: collect_pipe(stderr_reader),
        })
    }
}

fn spawn_pipe_reader<R>(pipe: Option<R>) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn collect_pipe(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
