use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::downloader::DownloaderSettings;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LibraryConfig {
    pub songs_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DownloaderConfig {
    /// 다운로드 스크립트를 실행할 인터프리터
    pub python: Option<String>,
    /// 다운로드 스크립트가 있는 디렉토리
    pub scripts_dir: Option<PathBuf>,
}

impl LibraryConfig {
    /// 설정값이 없으면 `<문서>/songs`.
    pub fn songs_dir(&self) -> PathBuf {
        self.songs_dir
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(default_songs_dir)
    }
}

impl DownloaderConfig {
    pub fn settings(&self) -> DownloaderSettings {
        DownloaderSettings {
            interpreter: self
                .python
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| default_interpreter().to_string()),
            scripts_dir: self
                .scripts_dir
                .clone()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(install_dir),
        }
    }
}

pub fn default_interpreter() -> &'static str {
    if cfg!(target_os = "windows") {
        "python"
    } else {
        "python3"
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_songs_dir() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| home_dir().join("Documents"))
        .join("songs")
}

/// 실행 파일이 있는 디렉토리. 스크립트와 assets의 기본 위치.
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn assets_dir() -> PathBuf {
    install_dir().join("assets")
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home_dir().join(".config"))
        .join("songdeck")
        .join("config.toml")
}

pub fn load_config() -> Config {
    let path = config_path();
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn save_config(config: &Config) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let cfg: Config = toml::from_str(
            r#"
            [downloader]
            python = "/usr/bin/python3.11"
            "#,
        )
        .unwrap();
        assert!(cfg.library.songs_dir.is_none());
        let settings = cfg.downloader.settings();
        assert_eq!(settings.interpreter, "/usr/bin/python3.11");
        assert_eq!(settings.scripts_dir, install_dir());
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.library.songs_dir().ends_with("songs"));
        assert_eq!(cfg.downloader.settings().interpreter, default_interpreter());
    }

    #[test]
    fn test_roundtrip_keeps_songs_dir() {
        let mut cfg = Config::default();
        cfg.library.songs_dir = Some(PathBuf::from("/music/songs"));
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.library.songs_dir(), PathBuf::from("/music/songs"));
    }
}
