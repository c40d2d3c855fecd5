use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::debug;

use crate::core::player::MediaElement;

/// rodio 싱크 위에서 동작하는 미디어 엘리먼트.
/// 탐색은 디코더를 다시 열고 앞부분을 건너뛰는 방식이다.
pub struct RodioElement {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Sink,
    current: Option<PathBuf>,
    duration: Option<Duration>,
    volume: f32,
    // 위치 = offset + (started_at 이후 경과 시간)
    offset: Duration,
    started_at: Option<Instant>,
}

impl RodioElement {
    pub fn new() -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().context("오디오 출력 장치를 열 수 없습니다")?;
        let sink = Sink::try_new(&handle).context("오디오 싱크를 만들 수 없습니다")?;
        Ok(Self {
            _stream: stream,
            handle,
            sink,
            current: None,
            duration: None,
            volume: 1.0,
            offset: Duration::ZERO,
            started_at: None,
        })
    }

    /// 기존 싱크를 버리고 `start` 위치부터 디코딩하는 새 싱크를 만든다.
    fn open_at(&mut self, path: &Path, start: Duration) -> Result<()> {
        let file =
            File::open(path).with_context(|| format!("파일을 열 수 없습니다: {}", path.display()))?;
        let decoder = Decoder::new(BufReader::new(file))
            .with_context(|| format!("오디오를 디코딩할 수 없습니다: {}", path.display()))?;
        let duration = decoder.total_duration();

        self.sink.stop();
        let sink = Sink::try_new(&self.handle).context("오디오 싱크를 만들 수 없습니다")?;
        sink.pause();
        sink.set_volume(self.volume);
        sink.append(decoder.skip_duration(start));

        self.sink = sink;
        self.duration = duration;
        self.offset = start;
        self.started_at = None;
        Ok(())
    }
}

impl MediaElement for RodioElement {
    fn load(&mut self, path: &Path) -> Result<()> {
        self.open_at(path, Duration::ZERO)?;
        self.current = Some(path.to_path_buf());
        debug!(path = %path.display(), duration = ?self.duration, "loaded");
        Ok(())
    }

    fn play(&mut self) {
        if self.current.is_none() {
            return;
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        self.sink.play();
    }

    fn pause(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.offset += started.elapsed();
        }
        self.sink.pause();
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let Some(path) = self.current.clone() else {
            return Ok(());
        };
        let was_playing = self.started_at.is_some();
        self.open_at(&path, position)?;
        if was_playing {
            self.play();
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.sink.set_volume(volume);
    }

    fn position(&self) -> Duration {
        let elapsed = self
            .started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();
        let position = self.offset + elapsed;
        match self.duration {
            Some(total) => position.min(total),
            None => position,
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn is_finished(&self) -> bool {
        self.current.is_some() && self.sink.empty()
    }
}
