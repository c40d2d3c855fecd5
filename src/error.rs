use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("노래 디렉토리가 존재하지 않습니다: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("노래 디렉토리를 읽을 수 없습니다: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("유효한 URL을 입력하세요")]
    EmptyUrl,
    #[error("지원하지 않는 URL입니다. YouTube 또는 SoundCloud 링크만 사용할 수 있습니다")]
    UnsupportedUrl,
    #[error("다운로더 프로세스를 시작할 수 없습니다: {0}")]
    Spawn(#[source] std::io::Error),
    /// 종료 코드가 0이 아님. 메시지는 수집된 stderr.
    #[error("{message}")]
    ProcessFailed { code: Option<i32>, message: String },
    /// 스크립트가 `"success": false`를 보고함
    #[error("{0}")]
    Reported(String),
    #[error("다운로드 출력을 해석할 수 없습니다")]
    Unparseable,
}
