use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::scanner;

/// 선택한 오디오 파일을 노래 디렉토리로 복사한다.
/// 같은 이름의 파일이 있으면 덮어쓴다. mp3/wav가 아닌 파일은 건너뛴다.
/// 복사된 파일의 새 경로 목록을 반환한다.
pub fn import_files(paths: &[PathBuf], songs_dir: &Path) -> Result<Vec<PathBuf>> {
    scanner::ensure_songs_dir(songs_dir)
        .with_context(|| format!("노래 디렉토리를 만들 수 없습니다: {}", songs_dir.display()))?;

    let mut imported = Vec::new();
    for path in paths {
        if !scanner::is_audio(path) {
            warn!(path = %path.display(), "skipping non-audio file");
            continue;
        }
        let Some(file_name) = path.file_name() else {
            warn!(path = %path.display(), "skipping path without file name");
            continue;
        };

        let dest = songs_dir.join(file_name);
        if dest == *path {
            imported.push(dest);
            continue;
        }

        std::fs::copy(path, &dest)
            .with_context(|| format!("파일을 복사할 수 없습니다: {}", path.display()))?;
        info!(from = %path.display(), to = %dest.display(), "imported");
        imported.push(dest);
    }

    Ok(imported)
}
