use std::path::{Path, PathBuf};

use anyhow::Result;
use id3::{Tag, TagLike};
use tracing::warn;

use crate::models::{Artwork, ArtworkSource, NowPlaying, Song, TrackMetadata};

pub const DEFAULT_ARTWORK_FILE: &str = "default-album.png";

/// 파일에서 제목과 첫 번째 임베디드 이미지를 읽는다.
/// 태그가 없으면 빈 메타데이터를 반환한다.
pub fn read_metadata(path: &Path) -> Result<TrackMetadata> {
    let tag = match read_tag(path) {
        Ok(tag) => tag,
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => return Ok(TrackMetadata::default()),
        Err(e) => return Err(e.into()),
    };

    let artwork = tag.pictures().next().map(|pic| Artwork {
        mime_type: pic.mime_type.clone(),
        data: pic.data.clone(),
    });

    Ok(TrackMetadata {
        title: tag
            .title()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        artwork,
    })
}

fn read_tag(path: &Path) -> id3::Result<Tag> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        Tag::read_from_wav_path(path)
    } else {
        Tag::read_from_path(path)
    }
}

/// 재생 중 표시할 제목과 앨범 아트를 결정한다.
/// 태그를 읽지 못하면 표시 이름과 기본 이미지로 대체한다.
pub fn now_playing(song: &Song, assets_dir: &Path) -> NowPlaying {
    let meta = match read_metadata(&song.path) {
        Ok(meta) => meta,
        Err(e) => {
            warn!(path = %song.path.display(), error = %e, "failed to read metadata");
            TrackMetadata::default()
        }
    };

    NowPlaying {
        title: meta.title.unwrap_or_else(|| song.display_name.clone()),
        artwork: match meta.artwork {
            Some(art) => ArtworkSource::Embedded(art),
            None => ArtworkSource::Default(default_artwork_path(assets_dir)),
        },
    }
}

pub fn default_artwork_path(assets_dir: &Path) -> PathBuf {
    assets_dir.join(DEFAULT_ARTWORK_FILE)
}
