use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::models::{PlaybackStatus, PlayerState, RepeatMode, Song};

/// 실제 오디오 출력 장치를 추상화한다.
/// 기본 구현은 rodio 기반의 `audio::RodioElement`.
pub trait MediaElement {
    /// 파일을 열어 처음 위치에 일시정지 상태로 준비한다.
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: Duration) -> Result<()>;
    fn set_volume(&mut self, volume: f32);
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
    /// 불러온 곡의 재생이 끝까지 진행되었는지
    fn is_finished(&self) -> bool;
}

/// 재생 목록과 재생 상태를 관리하는 컨트롤러.
pub struct Player<M: MediaElement> {
    media: M,
    songs: Vec<Song>,
    state: PlayerState,
    volume: f32,
}

impl<M: MediaElement> Player<M> {
    pub fn new(media: M, songs: Vec<Song>) -> Self {
        Self {
            media,
            songs,
            state: PlayerState::default(),
            volume: 1.0,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.state.current_index.and_then(|i| self.songs.get(i))
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn position(&self) -> Duration {
        self.media.position()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.media.duration()
    }

    /// 목록을 새로 고친다. 현재 곡은 경로로 다시 찾는다.
    /// 사라졌으면 선택을 해제하고 재생을 멈춘다.
    pub fn set_songs(&mut self, songs: Vec<Song>) {
        let current_path = self.current_song().map(|s| s.path.clone());
        self.songs = songs;

        let Some(path) = current_path else {
            return;
        };
        match self.songs.iter().position(|s| s.path == path) {
            Some(index) => self.state.current_index = Some(index),
            None => {
                debug!(path = %path.display(), "current song removed from library");
                self.media.pause();
                self.state.current_index = None;
                self.state.status = PlaybackStatus::Stopped;
            }
        }
    }

    /// 인덱스의 곡을 재생한다. 범위를 벗어나면 아무것도 하지 않는다.
    pub fn play_song(&mut self, index: usize) -> Result<Option<&Song>> {
        let Some(song) = self.songs.get(index) else {
            return Ok(None);
        };

        info!(index, song = %song.display_name, "playing");
        if let Err(e) = self.media.load(&song.path) {
            self.media.pause();
            self.state.status = PlaybackStatus::Stopped;
            return Err(e);
        }
        self.media.set_volume(self.volume);
        self.media.play();
        self.state.current_index = Some(index);
        self.state.status = PlaybackStatus::Playing;
        Ok(self.songs.get(index))
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        if self.state.current_index.is_none() {
            if !self.songs.is_empty() {
                self.play_song(0)?;
            }
            return Ok(());
        }

        match self.state.status {
            PlaybackStatus::Playing => {
                self.media.pause();
                self.state.status = PlaybackStatus::Paused;
            }
            PlaybackStatus::Paused | PlaybackStatus::Stopped => {
                // 끝까지 재생된 곡은 처음부터 다시 튼다.
                if self.media.is_finished() {
                    self.media.seek(Duration::ZERO)?;
                }
                self.media.play();
                self.state.status = PlaybackStatus::Playing;
            }
        }
        Ok(())
    }

    /// 이전 곡. 첫 곡에서는 마지막 곡으로 넘어간다.
    pub fn previous(&mut self) -> Result<()> {
        if self.songs.is_empty() {
            return Ok(());
        }
        let index = match self.state.current_index {
            Some(i) if i > 0 => i - 1,
            _ => self.songs.len() - 1,
        };
        self.play_song(index)?;
        Ok(())
    }

    /// 다음 곡. 반복 모드에 따라 같은 곡 재시작, 처음으로 순환, 또는 정지.
    pub fn next(&mut self) -> Result<()> {
        if self.state.repeat_mode == RepeatMode::One {
            if self.state.current_index.is_some() {
                self.media.seek(Duration::ZERO)?;
                self.media.play();
                self.state.status = PlaybackStatus::Playing;
            }
            return Ok(());
        }

        let index = self.state.current_index.map_or(0, |i| i + 1);
        if index >= self.songs.len() {
            if self.state.repeat_mode == RepeatMode::All && !self.songs.is_empty() {
                self.play_song(0)?;
            } else {
                self.media.pause();
                self.state.status = PlaybackStatus::Stopped;
            }
            return Ok(());
        }
        self.play_song(index)?;
        Ok(())
    }

    pub fn on_track_ended(&mut self) -> Result<()> {
        debug!(index = ?self.state.current_index, "track ended");
        self.next()
    }

    /// 재생 중인 곡이 끝났으면 다음 곡 로직을 실행한다.
    /// 매 프레임 또는 입력 사이에 호출한다.
    pub fn tick(&mut self) -> Result<()> {
        if self.state.status == PlaybackStatus::Playing && self.media.is_finished() {
            self.on_track_ended()?;
        }
        Ok(())
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.state.repeat_mode = self.state.repeat_mode.next();
        self.state.repeat_mode
    }

    /// 전체 길이 대비 비율(0.0..=1.0) 위치로 이동한다.
    pub fn seek_fraction(&mut self, fraction: f32) -> Result<()> {
        if self.state.current_index.is_none() {
            return Ok(());
        }
        let Some(total) = self.media.duration() else {
            return Ok(());
        };
        let target = total.mul_f32(fraction.clamp(0.0, 1.0));
        self.media.seek(target)
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.media.set_volume(self.volume);
    }
}

/// 초를 `m:ss` 형식으로 바꾼다.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Default)]
    struct FakeMedia {
        loaded: Option<PathBuf>,
        playing: bool,
        finished: bool,
        position: Duration,
        volume: f32,
        seeks: Vec<Duration>,
        broken: Option<PathBuf>,
    }

    impl MediaElement for FakeMedia {
        fn load(&mut self, path: &Path) -> Result<()> {
            if self.broken.as_deref() == Some(path) {
                anyhow::bail!("cannot decode {}", path.display());
            }
            self.loaded = Some(path.to_path_buf());
            self.playing = false;
            self.finished = false;
            self.position = Duration::ZERO;
            Ok(())
        }
        fn play(&mut self) {
            self.playing = true;
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn seek(&mut self, position: Duration) -> Result<()> {
            self.seeks.push(position);
            self.position = position;
            self.finished = false;
            Ok(())
        }
        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }
        fn position(&self) -> Duration {
            self.position
        }
        fn duration(&self) -> Option<Duration> {
            self.loaded.as_ref().map(|_| Duration::from_secs(200))
        }
        fn is_finished(&self) -> bool {
            self.finished
        }
    }

    fn songs(names: &[&str]) -> Vec<Song> {
        names
            .iter()
            .map(|n| Song {
                display_name: n.to_string(),
                path: PathBuf::from(format!("/songs/{}.mp3", n)),
                original_name: format!("{}.mp3", n),
            })
            .collect()
    }

    fn player(names: &[&str]) -> Player<FakeMedia> {
        Player::new(FakeMedia::default(), songs(names))
    }

    #[test]
    fn test_repeat_cycle_length_is_three() {
        let mut p = player(&["a"]);
        let initial = p.state().repeat_mode;
        assert_eq!(p.cycle_repeat(), RepeatMode::All);
        assert_eq!(p.cycle_repeat(), RepeatMode::One);
        assert_eq!(p.cycle_repeat(), initial);
    }

    #[test]
    fn test_next_on_last_song_with_repeat_all_wraps() {
        let mut p = player(&["a", "b", "c"]);
        p.cycle_repeat();
        p.play_song(2).unwrap();
        p.next().unwrap();
        assert_eq!(p.state().current_index, Some(0));
        assert!(p.state().is_playing());
        assert_eq!(p.media.loaded, Some(PathBuf::from("/songs/a.mp3")));
    }

    #[test]
    fn test_next_on_last_song_without_repeat_stops() {
        let mut p = player(&["a", "b"]);
        p.play_song(1).unwrap();
        p.next().unwrap();
        assert_eq!(p.state().status, PlaybackStatus::Stopped);
        assert_eq!(p.state().current_index, Some(1));
        assert!(!p.media.playing);
    }

    #[test]
    fn test_repeat_one_restarts_current() {
        let mut p = player(&["a", "b"]);
        p.play_song(0).unwrap();
        p.cycle_repeat();
        p.cycle_repeat();
        assert_eq!(p.state().repeat_mode, RepeatMode::One);
        p.media.position = Duration::from_secs(42);

        p.next().unwrap();
        assert_eq!(p.state().current_index, Some(0));
        assert_eq!(p.media.seeks, vec![Duration::ZERO]);
        assert!(p.media.playing);
    }

    #[test]
    fn test_toggle_play_starts_first_song() {
        let mut p = player(&["a", "b"]);
        p.toggle_play().unwrap();
        assert_eq!(p.state().current_index, Some(0));
        assert!(p.state().is_playing());

        p.toggle_play().unwrap();
        assert_eq!(p.state().status, PlaybackStatus::Paused);
        assert!(!p.media.playing);

        p.toggle_play().unwrap();
        assert!(p.media.playing);
    }

    #[test]
    fn test_toggle_play_on_empty_library_is_noop() {
        let mut p = player(&[]);
        p.toggle_play().unwrap();
        assert_eq!(p.state(), PlayerState::default());
    }

    #[test]
    fn test_previous_wraps_to_last() {
        let mut p = player(&["a", "b", "c"]);
        p.play_song(0).unwrap();
        p.previous().unwrap();
        assert_eq!(p.state().current_index, Some(2));
        p.previous().unwrap();
        assert_eq!(p.state().current_index, Some(1));
    }

    #[test]
    fn test_out_of_range_play_is_noop() {
        let mut p = player(&["a"]);
        assert!(p.play_song(5).unwrap().is_none());
        assert_eq!(p.state().current_index, None);
    }

    #[test]
    fn test_tick_advances_when_track_finishes() {
        let mut p = player(&["a", "b"]);
        p.play_song(0).unwrap();
        p.tick().unwrap();
        assert_eq!(p.state().current_index, Some(0));

        p.media.finished = true;
        p.tick().unwrap();
        assert_eq!(p.state().current_index, Some(1));
    }

    #[test]
    fn test_tick_after_stop_does_not_repeat() {
        let mut p = player(&["a"]);
        p.play_song(0).unwrap();
        p.media.finished = true;
        p.tick().unwrap();
        assert_eq!(p.state().status, PlaybackStatus::Stopped);
        p.tick().unwrap();
        assert_eq!(p.state().status, PlaybackStatus::Stopped);
    }

    #[test]
    fn test_set_songs_keeps_current_by_path() {
        let mut p = player(&["b", "c"]);
        p.play_song(1).unwrap();
        p.set_songs(songs(&["a", "b", "c"]));
        assert_eq!(p.state().current_index, Some(2));
        assert_eq!(p.current_song().unwrap().display_name, "c");

        p.set_songs(songs(&["a"]));
        assert_eq!(p.state().current_index, None);
        assert_eq!(p.state().status, PlaybackStatus::Stopped);
    }

    #[test]
    fn test_seek_fraction_and_volume_clamp() {
        let mut p = player(&["a"]);
        p.seek_fraction(0.5).unwrap();
        assert!(p.media.seeks.is_empty());

        p.play_song(0).unwrap();
        p.seek_fraction(0.25).unwrap();
        p.seek_fraction(3.0).unwrap();
        assert_eq!(
            p.media.seeks,
            vec![Duration::from_secs(50), Duration::from_secs(200)]
        );

        p.set_volume(1.7);
        assert_eq!(p.volume(), 1.0);
        assert_eq!(p.media.volume, 1.0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(3600.0), "60:00");
    }

    #[test]
    fn test_failed_load_silences_previous_track() {
        let mut p = player(&["good", "bad"]);
        p.media.broken = Some(PathBuf::from("/songs/bad.mp3"));
        p.play_song(0).unwrap();
        assert!(p.media.playing);

        assert!(p.play_song(1).is_err());
        assert_eq!(p.state().status, PlaybackStatus::Stopped);
        assert!(!p.media.playing);
    }

    #[test]
    fn test_play_after_end_of_list_restarts_track() {
        let mut p = player(&["a"]);
        p.play_song(0).unwrap();
        p.media.position = Duration::from_secs(200);
        p.media.finished = true;
        p.tick().unwrap();
        assert_eq!(p.state().status, PlaybackStatus::Stopped);

        p.toggle_play().unwrap();
        assert!(p.state().is_playing());
        assert!(p.media.playing);
        assert_eq!(p.media.seeks, vec![Duration::ZERO]);

        // 다음 틱에서 다시 멈추지 않는다.
        p.tick().unwrap();
        assert!(p.state().is_playing());
    }
}
