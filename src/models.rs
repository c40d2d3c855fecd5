use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// 노래 디렉토리의 오디오 파일 하나.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    /// 확장자를 뗀 파일명
    pub display_name: String,
    pub path: PathBuf,
    /// 확장자를 포함한 원래 파일명
    pub original_name: String,
}

/// 다운로드 스크립트가 stdout에 출력하는 JSON 보고서.
/// title, artist 등 나머지 필드는 무시한다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadReport {
    pub success: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// URL 도메인으로 고르는 다운로드 소스.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    YouTube,
    SoundCloud,
}

impl Source {
    /// URL에 포함된 도메인 문자열로 소스를 판별한다.
    pub fn detect(url: &str) -> Option<Self> {
        if url.contains("youtube.com") || url.contains("youtu.be") {
            Some(Source::YouTube)
        } else if url.contains("soundcloud.com") {
            Some(Source::SoundCloud)
        } else {
            None
        }
    }

    pub fn script_name(&self) -> &'static str {
        match self {
            Source::YouTube => "youtube_downloader.py",
            Source::SoundCloud => "soundcloud_downloader.py",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::YouTube => write!(f, "YouTube"),
            Source::SoundCloud => write!(f, "SoundCloud"),
        }
    }
}

/// 성공한 다운로드. 파일이 실제로 존재하는지는 확인하지 않는다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub source: Source,
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    None,
    One,
    All,
}

impl RepeatMode {
    /// None → All → One → None
    pub fn next(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RepeatMode::None => "반복 안 함",
            RepeatMode::One => "한 곡 반복",
            RepeatMode::All => "전체 반복",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerState {
    pub current_index: Option<usize>,
    pub status: PlaybackStatus,
    pub repeat_mode: RepeatMode,
}

impl PlayerState {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artwork: Option<Artwork>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkSource {
    Embedded(Artwork),
    /// 임베디드 아트가 없을 때 쓰는 기본 이미지 경로
    Default(PathBuf),
}

/// 현재 곡 표시용 정보.
#[derive(Debug, Clone)]
pub struct NowPlaying {
    pub title: String,
    pub artwork: ArtworkSource,
}
