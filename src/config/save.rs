use crate::config::load::SETTINGS_FILE;
use crate::config::types::{MAX_RECENT_PATHS, PipelineSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn save_settings(settings: &PipelineSettings) -> Result<()> {
    save_settings_to(settings, Path::new(SETTINGS_FILE))
}

pub fn save_settings_to(settings: &PipelineSettings, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;

    Ok(())
}

/// 更新最近使用的路徑
/// 將新路徑加入最前面，去重並限制數量
pub fn add_recent_path(settings: &mut PipelineSettings, path: &str) {
    settings.recent_paths.retain(|p| p != path);
    settings.recent_paths.insert(0, path.to_string());
    settings.recent_paths.truncate(MAX_RECENT_PATHS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_recent_paths_dedup_and_limit() {
        let mut settings = PipelineSettings::default();
        for i in 0..12 {
            add_recent_path(&mut settings, &format!("/videos/{i}"));
        }
        add_recent_path(&mut settings, "/videos/5");

        assert_eq!(settings.recent_paths.len(), MAX_RECENT_PATHS);
        assert_eq!(settings.recent_paths[0], "/videos/5");
        assert_eq!(
            settings
                .recent_paths
                .iter()
                .filter(|p| p.as_str() == "/videos/5")
                .count(),
            1
        );
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let mut settings = PipelineSettings::default();
        settings.worker_count = 2;
        add_recent_path(&mut settings, "/videos");

        save_settings_to(&settings, &path).unwrap();
        let loaded = Config::load_settings(&path).unwrap();

        assert_eq!(loaded, settings);
    }
}
