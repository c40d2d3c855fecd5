use std::path::Path;

use tracing::debug;

use crate::error::LibraryError;
use crate::models::Song;

/// 라이브러리로 인식하는 확장자 (소문자)
pub const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// 노래 디렉토리를 스캔하여 오디오 파일 목록을 반환한다.
/// 하위 디렉토리는 보지 않는다. 파일명 순으로 정렬한다.
pub fn scan_songs(dir: &Path) -> Result<Vec<Song>, LibraryError> {
    if !dir.is_dir() {
        return Err(LibraryError::MissingDirectory(dir.to_path_buf()));
    }

    let mut songs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_audio(&path) {
            continue;
        }
        if let Some(song) = song_from_path(&path) {
            songs.push(song);
        }
    }

    songs.sort_by(|a, b| a.original_name.cmp(&b.original_name));
    debug!(dir = %dir.display(), count = songs.len(), "scanned songs directory");
    Ok(songs)
}

/// 확장자가 .mp3 또는 .wav인지 확인한다 (대소문자 무시).
pub fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// 경로에서 Song을 만든다. 파일명이 UTF-8이 아니면 None.
pub fn song_from_path(path: &Path) -> Option<Song> {
    let original_name = path.file_name()?.to_str()?.to_string();
    let display_name = path.file_stem()?.to_str()?.to_string();
    Some(Song {
        display_name,
        path: path.to_path_buf(),
        original_name,
    })
}

/// 표시 이름에 검색어가 포함된 곡만 남긴다 (대소문자 무시).
/// 빈 검색어는 전체 목록을 돌려준다.
pub fn filter_songs<'a>(songs: &'a [Song], query: &str) -> Vec<&'a Song> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return songs.iter().collect();
    }
    songs
        .iter()
        .filter(|s| s.display_name.to_lowercase().contains(&query))
        .collect()
}

/// 노래 디렉토리가 없으면 만든다.
pub fn ensure_songs_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        debug!(dir = %dir.display(), "created songs directory");
    }
    Ok(())
}
