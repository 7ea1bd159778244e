use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// 擷取畫格的工具
pub const EXTRACTOR_NAME: &str = "ffmpeg";

/// 讀取影片資訊的工具
pub const PROBER_NAME: &str = "ffprobe";

/// 最後手段遞迴搜尋的深度上限
const PROFILE_SEARCH_DEPTH: usize = 6;

/// 已解析的工具路徑，解析一次後不再變動
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    pub extractor_path: Option<PathBuf>,
    pub prober_path: Option<PathBuf>,
}

impl ToolPaths {
    #[must_use]
    pub const fn all_available(&self) -> bool {
        self.extractor_path.is_some() && self.prober_path.is_some()
    }
}

/// 外部工具定位器
///
/// 搜尋順序：
/// 1. PATH
/// 2. 平台已知安裝位置（加上設定檔的額外目錄）
/// 3. 使用者資料夾下有限深度的遞迴搜尋
///
/// 找不到時回傳 `None`，呼叫端應視為「功能不可用」而不是錯誤。
#[derive(Debug)]
pub struct ExternalToolLocator {
    search_dirs: Vec<PathBuf>,
    profile_root: Option<PathBuf>,
    paths: OnceLock<ToolPaths>,
}

impl Default for ExternalToolLocator {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl ExternalToolLocator {
    /// `extra_dirs` 會接在平台已知位置之後搜尋
    #[must_use]
    pub fn new(extra_dirs: &[PathBuf]) -> Self {
        let mut search_dirs = known_install_dirs();
        search_dirs.extend(extra_dirs.iter().cloned());

        Self {
            search_dirs,
            profile_root: dirs::data_local_dir(),
            paths: OnceLock::new(),
        }
    }

    /// 使用已知路徑建立，不做任何搜尋
    #[must_use]
    pub fn with_paths(paths: ToolPaths) -> Self {
        Self {
            search_dirs: Vec::new(),
            profile_root: None,
            paths: OnceLock::from(paths),
        }
    }

    /// 取得工具路徑，第一次呼叫時才解析
    pub fn tool_paths(&self) -> &ToolPaths {
        self.paths.get_or_init(|| {
            let paths = ToolPaths {
                extractor_path: self.resolve(EXTRACTOR_NAME),
                prober_path: self.resolve(PROBER_NAME),
            };
            info!(
                "工具路徑解析完成: {EXTRACTOR_NAME}={:?}, {PROBER_NAME}={:?}",
                paths.extractor_path, paths.prober_path
            );
            paths
        })
    }

    #[must_use]
    pub fn extractor(&self) -> Option<&Path> {
        self.tool_paths().extractor_path.as_deref()
    }

    #[must_use]
    pub fn prober(&self) -> Option<&Path> {
        self.tool_paths().prober_path.as_deref()
    }

    /// 依搜尋順序尋找工具，第一個命中即回傳（不經過快取）
    #[must_use]
    pub fn resolve(&self, tool_name: &str) -> Option<PathBuf> {
        if let Ok(found) = which::which(tool_name) {
            debug!("在 PATH 找到 {tool_name}: {}", found.display());
            return Some(found);
        }

        let file_name = executable_name(tool_name);

        if let Some(found) = find_in_dirs(&self.search_dirs, &file_name) {
            debug!("在已知位置找到 {tool_name}: {}", found.display());
            return Some(found);
        }

        if let Some(found) = self
            .profile_root
            .as_deref()
            .and_then(|root| search_profile_dir(root, &file_name))
        {
            debug!("遞迴搜尋找到 {tool_name}: {}", found.display());
            return Some(found);
        }

        warn!("找不到 {tool_name}，相關功能將停用");
        None
    }
}

fn executable_name(tool_name: &str) -> String {
    if cfg!(windows) {
        format!("{tool_name}.exe")
    } else {
        tool_name.to_string()
    }
}

fn find_in_dirs(search_dirs: &[PathBuf], file_name: &str) -> Option<PathBuf> {
    search_dirs
        .iter()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}

/// 在使用者資料夾下遞迴搜尋（winget 之類的安裝方式會放在很深的位置）
///
/// 只接受路徑中帶有 ffmpeg 或 GyanD 字樣的結果，權限錯誤直接略過。
fn search_profile_dir(root: &Path, file_name: &str) -> Option<PathBuf> {
    if !root.is_dir() {
        return None;
    }

    WalkDir::new(root)
        .max_depth(PROFILE_SEARCH_DEPTH)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy() == file_name)
        .map(walkdir::DirEntry::into_path)
        .find(|path| {
            let lossy = path.to_string_lossy();
            lossy.to_lowercase().contains("ffmpeg") || lossy.contains("GyanD")
        })
}

#[cfg(windows)]
fn known_install_dirs() -> Vec<PathBuf> {
    let mut install_dirs: Vec<PathBuf> = [
        r"C:\ProgramData\chocolatey\bin",
        r"C:\ProgramData\chocolatey\lib\ffmpeg\tools\bin",
        r"C:\ffmpeg\bin",
        r"C:\Program Files\ffmpeg\bin",
        r"C:\Program Files (x86)\ffmpeg\bin",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    if let Some(home) = dirs::home_dir() {
        install_dirs.push(home.join(r"scoop\apps\ffmpeg\current\bin"));
    }
    if let Some(local) = dirs::data_local_dir() {
        install_dirs.push(local.join(r"Programs\ffmpeg\bin"));
        install_dirs.push(local.join(r"Microsoft\WinGet\Links"));
    }

    install_dirs
}

#[cfg(not(windows))]
fn known_install_dirs() -> Vec<PathBuf> {
    [
        "/usr/local/bin",
        "/usr/bin",
        "/opt/homebrew/bin",
        "/opt/local/bin",
        "/snap/bin",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}
