use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use dialoguer::{Input, Select};
use tracing::warn;

use crate::audio::RodioElement;
use crate::config::{self, Config};
use crate::core::downloader::{DownloadEvent, Orchestrator, Stream};
use crate::core::player::{format_time, Player};
use crate::core::{importer, metadata, scanner};
use crate::models::{ArtworkSource, Song};

#[derive(Parser)]
#[command(name = "songdeck", about = "노래 라이브러리 플레이어 겸 URL 다운로더")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// GUI 모드로 실행
    #[arg(long)]
    pub gui: bool,

    /// 노래 디렉토리 (설정 파일보다 우선)
    #[arg(long, global = true, value_name = "DIRECTORY")]
    pub songs_dir: Option<PathBuf>,

    /// 디버그 로그 출력
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 노래 목록 표시
    List {
        /// 제목에 포함된 문자열로 걸러내기
        #[arg(long)]
        filter: Option<String>,
    },
    /// 파일의 제목과 앨범 아트 정보 표시
    Info {
        /// MP3 또는 WAV 파일
        file: PathBuf,
    },
    /// 오디오 파일을 노래 디렉토리로 가져오기
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// YouTube 또는 SoundCloud URL에서 오디오 다운로드
    Download {
        url: String,
    },
    /// 대화형 플레이어 (곡이 끝나면 다음 입력 때 다음 곡으로 넘어감)
    Play,
    /// 디렉토리와 다운로더 설정
    Config,
}

pub fn run(cli: Cli) -> Result<()> {
    let cfg = config::load_config();
    let songs_dir = cli
        .songs_dir
        .clone()
        .unwrap_or_else(|| cfg.library.songs_dir());

    if let Err(e) = scanner::ensure_songs_dir(&songs_dir) {
        warn!(dir = %songs_dir.display(), error = %e, "could not create songs directory");
    }

    match cli.command {
        Some(Commands::List { filter }) => cmd_list(&songs_dir, filter.as_deref()),
        Some(Commands::Info { file }) => cmd_info(&file),
        Some(Commands::Import { files }) => cmd_import(&files, &songs_dir),
        Some(Commands::Download { url }) => cmd_download(&cfg, &songs_dir, &url),
        Some(Commands::Play) => cmd_play(&songs_dir),
        Some(Commands::Config) => cmd_config(),
        None => {
            if cli.gui {
                #[cfg(feature = "gui")]
                {
                    crate::gui::launch(songs_dir, cfg)
                }
                #[cfg(not(feature = "gui"))]
                {
                    bail!("GUI 기능이 활성화되지 않았습니다. 다시 빌드하세요: cargo build --features gui");
                }
            } else {
                println!("사용법: songdeck <명령어> 또는 songdeck --gui");
                println!("자세한 정보는 songdeck --help를 실행하세요.");
                Ok(())
            }
        }
    }
}

fn cmd_list(songs_dir: &Path, filter: Option<&str>) -> Result<()> {
    let songs = scanner::scan_songs(songs_dir)?;
    let shown = scanner::filter_songs(&songs, filter.unwrap_or_default());

    if shown.is_empty() {
        println!("{}에서 노래를 찾을 수 없습니다", songs_dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "제목", "파일"]);
    for song in &shown {
        let index = songs.iter().position(|s| s.path == song.path).unwrap_or(0);
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&song.display_name),
            Cell::new(&song.original_name),
        ]);
    }

    println!("{table}");
    println!("\n총 {}곡 (전체 {}곡)", shown.len(), songs.len());
    Ok(())
}

fn cmd_info(file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("파일을 찾을 수 없습니다: {}", file.display());
    }
    if !scanner::is_audio(file) {
        bail!("MP3/WAV 파일이 아닙니다: {}", file.display());
    }
    let song = scanner::song_from_path(file)
        .with_context(|| format!("파일명을 읽을 수 없습니다: {}", file.display()))?;

    let np = metadata::now_playing(&song, &config::assets_dir());
    println!("제목: {}", np.title);
    match np.artwork {
        ArtworkSource::Embedded(art) => {
            println!("앨범 아트: {} ({} 바이트)", art.mime_type, art.data.len())
        }
        ArtworkSource::Default(path) => println!("앨범 아트: 없음 (기본 이미지 {})", path.display()),
    }
    Ok(())
}

fn cmd_import(files: &[PathBuf], songs_dir: &Path) -> Result<()> {
    let imported = importer::import_files(files, songs_dir)?;
    if imported.is_empty() {
        println!("가져올 MP3/WAV 파일이 없습니다.");
        return Ok(());
    }
    for path in &imported {
        println!("  {}", path.display());
    }
    println!("{}개 파일을 가져왔습니다.", imported.len());
    Ok(())
}

fn cmd_download(cfg: &Config, songs_dir: &Path, url: &str) -> Result<()> {
    let orchestrator = Orchestrator::new(cfg.downloader.settings(), songs_dir.to_path_buf());

    let result = orchestrator.download(url, |event| match event {
        DownloadEvent::Started { source } => {
            println!("{}에서 오디오를 다운로드하는 중...", source)
        }
        DownloadEvent::Output { stream, line } => match stream {
            Stream::Stdout => println!("  | {}", line),
            Stream::Stderr => eprintln!("  ! {}", line),
        },
        DownloadEvent::Finished(_) => {}
    });

    let Some(result) = result else {
        bail!("이미 다운로드가 진행 중입니다");
    };
    let downloaded = result?;
    println!(
        "{} 다운로드 완료: {} ({})",
        downloaded.source,
        downloaded.filename,
        downloaded.path.display()
    );

    match scanner::scan_songs(songs_dir) {
        Ok(songs) => println!("라이브러리: {}곡", songs.len()),
        Err(e) => warn!(error = %e, "library refresh failed"),
    }
    Ok(())
}

fn cmd_play(songs_dir: &Path) -> Result<()> {
    let songs = scanner::scan_songs(songs_dir)?;
    if songs.is_empty() {
        println!("{}에서 노래를 찾을 수 없습니다", songs_dir.display());
        return Ok(());
    }

    let media = RodioElement::new()?;
    let mut player = Player::new(media, songs);
    let assets_dir = config::assets_dir();

    // 프롬프트가 입력을 기다리는 동안에는 곡 끝을 확인하지 않는다.
    loop {
        if let Err(e) = player.tick() {
            println!("재생 오류: {:#}", e);
        }
        print_status(&player, &assets_dir);

        let state = player.state();
        let toggle_label = if state.is_playing() {
            "일시정지"
        } else {
            "재생"
        };
        let repeat_label = format!("반복 모드 변경 (현재: {})", state.repeat_mode.label());
        let items = [
            toggle_label,
            "다음 곡",
            "이전 곡",
            repeat_label.as_str(),
            "곡 선택",
            "볼륨",
            "새로 고침",
            "종료",
        ];

        let choice = Select::new()
            .with_prompt("동작을 선택하세요")
            .items(&items[..])
            .default(0)
            .interact()?;

        let outcome = match choice {
            0 => player.toggle_play(),
            1 => player.next(),
            2 => player.previous(),
            3 => {
                player.cycle_repeat();
                Ok(())
            }
            4 => pick_song(&mut player),
            5 => {
                let percent: u8 = Input::new()
                    .with_prompt("볼륨 (0-100)")
                    .default((player.volume() * 100.0).round() as u8)
                    .interact_text()?;
                player.set_volume(f32::from(percent.min(100)) / 100.0);
                Ok(())
            }
            6 => refresh(&mut player, songs_dir),
            _ => break,
        };

        // 재생 실패는 목록을 계속 쓸 수 있게 메시지만 남긴다.
        if let Err(e) = outcome {
            println!("재생 오류: {:#}", e);
        }
    }

    Ok(())
}

fn print_status(player: &Player<RodioElement>, assets_dir: &Path) {
    let Some(song) = player.current_song() else {
        println!("\n[정지] 선택된 곡 없음 ({}곡)", player.songs().len());
        return;
    };
    let np = metadata::now_playing(song, assets_dir);
    let state = player.state();
    let total = player
        .duration()
        .map(|d| format_time(d.as_secs_f64()))
        .unwrap_or_else(|| "-:--".to_string());
    println!(
        "\n[{}] {}  {} / {}  ({})",
        if state.is_playing() { "재생" } else { "정지" },
        np.title,
        format_time(player.position().as_secs_f64()),
        total,
        state.repeat_mode.label(),
    );
}

fn pick_song(player: &mut Player<RodioElement>) -> Result<()> {
    let names: Vec<&str> = player
        .songs()
        .iter()
        .map(|s| s.display_name.as_str())
        .collect();
    let default = player.state().current_index.unwrap_or(0);
    let index = Select::new()
        .with_prompt("곡을 선택하세요")
        .items(&names)
        .default(default)
        .interact()?;
    player.play_song(index)?;
    Ok(())
}

fn refresh(player: &mut Player<RodioElement>, songs_dir: &Path) -> Result<()> {
    let songs: Vec<Song> = scanner::scan_songs(songs_dir)?;
    println!("라이브러리를 새로 고쳤습니다: {}곡", songs.len());
    player.set_songs(songs);
    Ok(())
}

fn cmd_config() -> Result<()> {
    let mut cfg = config::load_config();

    println!("songdeck 설정\n");

    let songs_dir: String = Input::new()
        .with_prompt("노래 디렉토리")
        .with_initial_text(cfg.library.songs_dir().display().to_string())
        .interact_text()?;

    let current_python = cfg
        .downloader
        .python
        .clone()
        .unwrap_or_else(|| config::default_interpreter().to_string());
    let python: String = Input::new()
        .with_prompt("Python 인터프리터")
        .with_initial_text(current_python)
        .interact_text()?;

    let current_scripts = cfg.downloader.settings().scripts_dir;
    let scripts_dir: String = Input::new()
        .with_prompt("다운로드 스크립트 디렉토리")
        .with_initial_text(current_scripts.display().to_string())
        .interact_text()?;

    cfg.library.songs_dir = Some(PathBuf::from(songs_dir.trim()));
    cfg.downloader.python = Some(python.trim().to_string());
    cfg.downloader.scripts_dir = Some(PathBuf::from(scripts_dir.trim()));

    config::save_config(&cfg)?;
    println!("\n설정이 저장되었습니다!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_play_help_mentions_advance_on_input() {
        let cmd = Cli::command();
        let play = cmd.find_subcommand("play").unwrap();
        let about = play.get_about().map(|a| a.to_string()).unwrap_or_default();
        assert!(about.contains("다음 입력 때"));
    }

    #[test]
    fn test_parse_download_with_global_flags() {
        let cli = Cli::try_parse_from(["songdeck", "download", "https://youtu.be/x", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Download { url }) if url == "https://youtu.be/x"));
    }
}
