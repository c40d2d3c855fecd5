use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::core::output;
use crate::error::DownloadError;
use crate::models::{Downloaded, Source};

/// 외부 다운로더 실행 설정.
#[derive(Debug, Clone)]
pub struct DownloaderSettings {
    /// 스크립트를 실행할 인터프리터 (예: python3)
    pub interpreter: String,
    /// youtube_downloader.py / soundcloud_downloader.py가 있는 디렉토리
    pub scripts_dir: PathBuf,
}

impl DownloaderSettings {
    pub fn script_path(&self, source: Source) -> PathBuf {
        self.scripts_dir.join(source.script_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug)]
pub enum DownloadEvent {
    Started { source: Source },
    /// 다운로더가 출력한 한 줄
    Output { stream: Stream, line: String },
    Finished(Result<Downloaded, DownloadError>),
}

/// 한 번에 하나의 다운로드만 실행한다.
/// 진행 중에 들어온 요청은 큐에 넣지 않고 무시한다.
pub struct Orchestrator {
    settings: DownloaderSettings,
    songs_dir: PathBuf,
    in_flight: Arc<AtomicBool>,
}

/// 진행 중 플래그. drop 시 해제된다.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Orchestrator {
    pub fn new(settings: DownloaderSettings, songs_dir: PathBuf) -> Self {
        Self {
            settings,
            songs_dir,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn try_acquire(&self) -> Option<InFlight> {
        match self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Some(InFlight(Arc::clone(&self.in_flight))),
            Err(_) => {
                debug!("download already in progress, ignoring request");
                None
            }
        }
    }

    /// 백그라운드 스레드에서 다운로드를 시작한다.
    /// 이미 진행 중이면 None을 반환하고 아무 일도 하지 않는다.
    pub fn start(&self, url: String, tx: Sender<DownloadEvent>) -> Option<JoinHandle<()>> {
        let guard = self.try_acquire()?;
        let settings = self.settings.clone();
        let songs_dir = self.songs_dir.clone();

        Some(thread::spawn(move || {
            let result = run_download(&settings, &songs_dir, &url, |event| {
                let _ = tx.send(event);
            });
            drop(guard);
            let _ = tx.send(DownloadEvent::Finished(result));
        }))
    }

    /// 현재 스레드에서 다운로드를 실행한다. 출력은 `on_event`로 전달된다.
    /// 이미 진행 중이면 None.
    pub fn download(
        &self,
        url: &str,
        on_event: impl FnMut(DownloadEvent),
    ) -> Option<Result<Downloaded, DownloadError>> {
        let _guard = self.try_acquire()?;
        Some(run_download(&self.settings, &self.songs_dir, url, on_event))
    }
}

fn run_download(
    settings: &DownloaderSettings,
    songs_dir: &Path,
    url: &str,
    mut on_event: impl FnMut(DownloadEvent),
) -> Result<Downloaded, DownloadError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(DownloadError::EmptyUrl);
    }
    let source = Source::detect(url).ok_or(DownloadError::UnsupportedUrl)?;
    let script = settings.script_path(source);

    info!(
        %source,
        url,
        interpreter = %settings.interpreter,
        script = %script.display(),
        output_dir = %songs_dir.display(),
        "starting downloader"
    );
    on_event(DownloadEvent::Started { source });

    let mut child = Command::new(&settings.interpreter)
        .arg(&script)
        .arg(url)
        .arg(songs_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(DownloadError::Spawn)?;

    let (line_tx, line_rx) = mpsc::channel();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, Stream::Stdout, line_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, Stream::Stderr, line_tx));
    } else {
        drop(line_tx);
    }

    let mut stdout_text = String::new();
    let mut stderr_text = String::new();
    for (stream, line) in line_rx {
        let buf = match stream {
            Stream::Stdout => {
                debug!(target: "songdeck::downloader::stdout", "{}", line);
                &mut stdout_text
            }
            Stream::Stderr => {
                debug!(target: "songdeck::downloader::stderr", "{}", line);
                &mut stderr_text
            }
        };
        buf.push_str(&line);
        buf.push('\n');
        on_event(DownloadEvent::Output { stream, line });
    }
    for reader in readers {
        let _ = reader.join();
    }

    let status = child.wait().map_err(|e| DownloadError::ProcessFailed {
        code: None,
        message: e.to_string(),
    })?;
    info!(%source, code = ?status.code(), "downloader exited");

    let filename = interpret(status.code(), &stdout_text, &stderr_text)?;
    Ok(Downloaded {
        source,
        path: songs_dir.join(&filename),
        filename,
    })
}

/// 종료 코드와 수집된 출력을 해석한다.
/// 0이 아닌 종료는 항상 stderr를 담은 오류가 된다.
pub fn interpret(code: Option<i32>, stdout: &str, stderr: &str) -> Result<String, DownloadError> {
    if code != Some(0) {
        let stderr = stderr.trim();
        let message = if !stderr.is_empty() {
            stderr.to_string()
        } else {
            match code {
                Some(c) => format!("다운로더가 코드 {}로 종료되었습니다", c),
                None => "다운로더가 시그널로 종료되었습니다".to_string(),
            }
        };
        warn!(?code, %message, "downloader failed");
        return Err(DownloadError::ProcessFailed { code, message });
    }

    output::parse_stdout(stdout).inspect_err(|e| {
        warn!(error = %e, "could not interpret downloader output");
    })
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    stream: Stream,
    tx: Sender<(Stream, String)>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(?stream, error = %e, "failed to read downloader output");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testutil::TestDir;

    fn settings(interpreter: &str, dir: &Path) -> DownloaderSettings {
        DownloaderSettings {
            interpreter: interpreter.to_string(),
            scripts_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_unsupported_url_spawns_nothing() {
        let dir = TestDir::new("dl-unsupported");
        let orch = Orchestrator::new(
            settings("songdeck-no-such-interpreter", dir.path()),
            dir.path().to_path_buf(),
        );
        let mut events = 0;
        let result = orch
            .download("https://example.com/watch?v=1", |_| events += 1)
            .unwrap();
        assert!(matches!(result, Err(DownloadError::UnsupportedUrl)));
        assert_eq!(events, 0);
    }

    #[test]
    fn test_empty_url() {
        let dir = TestDir::new("dl-empty");
        let orch = Orchestrator::new(settings("sh", dir.path()), dir.path().to_path_buf());
        let result = orch.download("   ", |_| {}).unwrap();
        assert!(matches!(result, Err(DownloadError::EmptyUrl)));
    }

    #[test]
    fn test_missing_interpreter_is_spawn_error() {
        let dir = TestDir::new("dl-spawn");
        let orch = Orchestrator::new(
            settings("songdeck-no-such-interpreter", dir.path()),
            dir.path().to_path_buf(),
        );
        let result = orch.download("https://youtu.be/abc", |_| {}).unwrap();
        assert!(matches!(result, Err(DownloadError::Spawn(_))));
    }

    #[test]
    fn test_interpret_nonzero_exit_reports_stderr() {
        let err = interpret(
            Some(1),
            r#"{"success":true,"filename":"a.mp3"}"#,
            "Traceback: boom\n",
        )
        .unwrap_err();
        match err {
            DownloadError::ProcessFailed { code, message } => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "Traceback: boom");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_interpret_nonzero_exit_without_stderr() {
        let err = interpret(Some(2), "", "").unwrap_err();
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_interpret_success_json() {
        let name = interpret(Some(0), r#"{"success":true,"filename":"a.mp3"}"#, "").unwrap();
        assert_eq!(name, "a.mp3");
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_script_and_streams_output() {
        let dir = TestDir::new("dl-run");
        dir.write(
            "youtube_downloader.py",
            b"echo \"fetching $1\"\necho 'warming up' >&2\necho '{\"success\": true, \"filename\": \"a.mp3\"}'\n",
        );
        let songs = dir.path().join("songs");
        let orch = Orchestrator::new(settings("sh", dir.path()), songs.clone());

        let mut lines = Vec::new();
        let mut started = None;
        let result = orch
            .download("https://www.youtube.com/watch?v=xyz", |event| match event {
                DownloadEvent::Started { source } => started = Some(source),
                DownloadEvent::Output { stream, line } => lines.push((stream, line)),
                DownloadEvent::Finished(_) => {}
            })
            .unwrap()
            .unwrap();

        assert_eq!(started, Some(Source::YouTube));
        assert_eq!(result.filename, "a.mp3");
        assert_eq!(result.path, songs.join("a.mp3"));
        assert!(lines.contains(&(
            Stream::Stdout,
            "fetching https://www.youtube.com/watch?v=xyz".to_string()
        )));
        assert!(lines.contains(&(Stream::Stderr, "warming up".to_string())));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_never_succeeds() {
        let dir = TestDir::new("dl-fail");
        dir.write(
            "soundcloud_downloader.py",
            b"echo '{\"success\": true, \"filename\": \"x.mp3\"}'\necho 'network down' >&2\nexit 3\n",
        );
        let orch = Orchestrator::new(settings("sh", dir.path()), dir.path().to_path_buf());
        let result = orch
            .download("https://soundcloud.com/artist/track", |_| {})
            .unwrap();
        match result {
            Err(DownloadError::ProcessFailed { code, message }) => {
                assert_eq!(code, Some(3));
                assert_eq!(message, "network down");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_concurrent_start_is_ignored() {
        let dir = TestDir::new("dl-busy");
        dir.write(
            "youtube_downloader.py",
            b"sleep 1\necho '{\"success\": true, \"filename\": \"slow.mp3\"}'\n",
        );
        let orch = Orchestrator::new(settings("sh", dir.path()), dir.path().to_path_buf());
        let (tx, rx) = mpsc::channel();

        let first = orch
            .start("https://youtu.be/one".to_string(), tx.clone())
            .expect("first download starts");
        assert!(orch.is_busy());
        assert!(orch.start("https://youtu.be/two".to_string(), tx.clone()).is_none());
        assert!(orch.download("https://youtu.be/three", |_| {}).is_none());

        first.join().unwrap();
        assert!(!orch.is_busy());

        let finished: Vec<_> = rx
            .try_iter()
            .filter_map(|event| match event {
                DownloadEvent::Finished(result) => Some(result),
                _ => None,
            })
            .collect();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].as_ref().unwrap().filename, "slow.mp3");
    }
}
