use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use egui::{Color32, ColorImage, RichText, TextureHandle};
use tracing::warn;

use crate::audio::RodioElement;
use crate::config::{self, Config};
use crate::core::downloader::{DownloadEvent, Orchestrator};
use crate::core::player::{format_time, Player};
use crate::core::{importer, metadata, scanner};
use crate::models::{ArtworkSource, PlaybackStatus, RepeatMode, Song};

const MAX_LOG_LINES: usize = 200;

enum BgResult {
    ScanDone(Vec<Song>),
    Error(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Success,
    Error,
}

pub struct SongdeckApp {
    songs_dir: PathBuf,
    assets_dir: PathBuf,
    player: Player<RodioElement>,
    search_query: String,

    // Now playing
    now_playing_path: Option<PathBuf>,
    now_playing_title: String,
    album_art_texture: Option<TextureHandle>,

    // Download form
    orchestrator: Orchestrator,
    url_input: String,
    download_log: Vec<String>,
    download_tx: mpsc::Sender<DownloadEvent>,
    download_rx: mpsc::Receiver<DownloadEvent>,

    // Background tasks
    tx: mpsc::Sender<BgResult>,
    rx: mpsc::Receiver<BgResult>,
    is_loading: bool,
    // 사용자가 새로 고침을 눌렀을 때만 결과를 상태줄에 알린다.
    announce_scan: bool,
    status_msg: String,
    status_kind: StatusKind,
}

impl SongdeckApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        media: RodioElement,
        songs_dir: PathBuf,
        cfg: Config,
    ) -> Self {
        Self::setup_korean_fonts(&cc.egui_ctx);
        let (tx, rx) = mpsc::channel();
        let (download_tx, download_rx) = mpsc::channel();

        let mut app = Self {
            orchestrator: Orchestrator::new(cfg.downloader.settings(), songs_dir.clone()),
            songs_dir,
            assets_dir: config::assets_dir(),
            player: Player::new(media, Vec::new()),
            search_query: String::new(),
            now_playing_path: None,
            now_playing_title: String::new(),
            album_art_texture: None,
            url_input: String::new(),
            download_log: Vec::new(),
            download_tx,
            download_rx,
            tx,
            rx,
            is_loading: false,
            announce_scan: false,
            status_msg: String::new(),
            status_kind: StatusKind::Info,
        };
        app.start_scan();
        app
    }

    fn setup_korean_fonts(ctx: &egui::Context) {
        const FONT_PATHS: [&str; 5] = [
            "/System/Library/Fonts/AppleSDGothicNeo.ttc",
            "/System/Library/Fonts/Supplemental/AppleGothic.ttf",
            "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "C:\\Windows\\Fonts\\malgun.ttf",
        ];

        let Some(font_data) = FONT_PATHS.iter().find_map(|p| std::fs::read(p).ok()) else {
            return;
        };

        let mut fonts = egui::FontDefinitions::default();
        fonts
            .font_data
            .insert("korean".to_string(), egui::FontData::from_owned(font_data));
        for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
            if let Some(list) = fonts.families.get_mut(&family) {
                list.push("korean".to_string());
            }
        }
        ctx.set_fonts(fonts);
    }

    fn set_status(&mut self, msg: impl Into<String>, kind: StatusKind) {
        self.status_msg = msg.into();
        self.status_kind = kind;
    }

    fn start_scan(&mut self) {
        let dir = self.songs_dir.clone();
        let tx = self.tx.clone();
        self.is_loading = true;

        std::thread::spawn(move || {
            let msg = match scanner::scan_songs(&dir) {
                Ok(songs) => BgResult::ScanDone(songs),
                Err(e) => BgResult::Error(e.to_string()),
            };
            let _ = tx.send(msg);
        });
    }

    fn start_download(&mut self) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            self.set_status("유효한 URL을 입력하세요", StatusKind::Error);
            return;
        }
        if self
            .orchestrator
            .start(url, self.download_tx.clone())
            .is_some()
        {
            self.download_log.clear();
            self.set_status("URL 확인 중...", StatusKind::Info);
        }
    }

    fn import_files(&mut self) {
        let Some(files) = rfd::FileDialog::new()
            .add_filter("오디오 파일", &scanner::AUDIO_EXTENSIONS[..])
            .pick_files()
        else {
            return;
        };

        match importer::import_files(&files, &self.songs_dir) {
            Ok(imported) => {
                self.set_status(
                    format!("{}개 파일을 가져왔습니다", imported.len()),
                    StatusKind::Success,
                );
                self.start_scan();
            }
            Err(e) => self.set_status(format!("가져오기 실패: {:#}", e), StatusKind::Error),
        }
    }

    fn process_bg_results(&mut self) {
        while let Ok(result) = self.rx.try_recv() {
            match result {
                BgResult::ScanDone(songs) => {
                    self.is_loading = false;
                    if std::mem::take(&mut self.announce_scan) {
                        self.set_status(refreshed_status(songs.len()), StatusKind::Success);
                    }
                    self.player.set_songs(songs);
                }
                BgResult::Error(msg) => {
                    self.is_loading = false;
                    self.announce_scan = false;
                    self.set_status(msg, StatusKind::Error);
                }
            }
        }

        while let Ok(event) = self.download_rx.try_recv() {
            match event {
                DownloadEvent::Started { source } => {
                    self.set_status(
                        format!("{}에서 오디오를 다운로드하는 중...", source),
                        StatusKind::Info,
                    );
                }
                DownloadEvent::Output { line, .. } => {
                    self.download_log.push(line);
                    if self.download_log.len() > MAX_LOG_LINES {
                        let excess = self.download_log.len() - MAX_LOG_LINES;
                        self.download_log.drain(..excess);
                    }
                }
                DownloadEvent::Finished(Ok(downloaded)) => {
                    self.set_status(
                        format!("다운로드 완료: {}", downloaded.filename),
                        StatusKind::Success,
                    );
                    self.url_input.clear();
                    self.start_scan();
                }
                DownloadEvent::Finished(Err(e)) => {
                    self.set_status(format!("오류: {}", e), StatusKind::Error);
                }
            }
        }
    }

    fn run_player_action(
        &mut self,
        action: impl FnOnce(&mut Player<RodioElement>) -> anyhow::Result<()>,
    ) {
        if let Err(e) = action(&mut self.player) {
            warn!(error = %e, "player action failed");
            self.set_status(format!("재생 오류: {:#}", e), StatusKind::Error);
        }
    }

    /// 현재 곡이 바뀌었으면 제목과 앨범 아트를 다시 읽는다.
    fn refresh_now_playing(&mut self, ctx: &egui::Context) {
        let current = self.player.current_song().cloned();
        if current.as_ref().map(|s| &s.path) == self.now_playing_path.as_ref() {
            return;
        }
        self.now_playing_path = current.as_ref().map(|s| s.path.clone());
        self.album_art_texture = None;

        let Some(song) = current else {
            self.now_playing_title.clear();
            return;
        };

        let np = metadata::now_playing(&song, &self.assets_dir);
        self.now_playing_title = np.title;
        let bytes = match np.artwork {
            ArtworkSource::Embedded(art) => Some(art.data),
            ArtworkSource::Default(path) => std::fs::read(path).ok(),
        };
        if let Some(data) = bytes {
            if let Ok(img) = image::load_from_memory(&data) {
                let rgba = img.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                let pixels = rgba.into_raw();
                let color_image = ColorImage::from_rgba_unmultiplied(size, &pixels);
                self.album_art_texture =
                    Some(ctx.load_texture("album_art", color_image, Default::default()));
            }
        }
    }

    fn song_list(&mut self, ui: &mut egui::Ui) {
        let current = self.player.state().current_index;
        let songs = self.player.songs();
        let rows: Vec<(usize, String)> = scanner::filter_songs(songs, &self.search_query)
            .into_iter()
            .filter_map(|song| {
                let index = songs.iter().position(|s| s.path == song.path)?;
                Some((index, song.display_name.clone()))
            })
            .collect();

        if rows.is_empty() {
            ui.label("노래가 없습니다. 가져오기나 다운로드로 추가하세요.");
            return;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (index, name) in &rows {
                if ui.selectable_label(current == Some(*index), name).clicked() {
                    clicked = Some(*index);
                }
            }
        });
        if let Some(index) = clicked {
            self.run_player_action(|p| p.play_song(index).map(|_| ()));
        }
    }

    fn player_panel(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            if let Some(ref texture) = self.album_art_texture {
                let size = texture.size_vec2();
                let scale = (240.0 / size.x).min(240.0 / size.y).min(1.0);
                ui.image(egui::load::SizedTexture::new(texture.id(), size * scale));
            } else {
                ui.allocate_space(egui::vec2(240.0, 240.0));
            }

            let title = if self.now_playing_title.is_empty() {
                "재생 중인 곡 없음"
            } else {
                self.now_playing_title.as_str()
            };
            ui.heading(title);
        });

        ui.add_space(10.0);

        let position = self.player.position();
        let duration = self.player.duration();
        let mut fraction = match duration {
            Some(total) if !total.is_zero() => {
                (position.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };
        ui.horizontal(|ui| {
            ui.label(format_time(position.as_secs_f64()));
            let seek = ui.add_enabled(
                duration.is_some(),
                egui::Slider::new(&mut fraction, 0.0..=1.0).show_value(false),
            );
            ui.label(format_time(duration.map_or(0.0, |d| d.as_secs_f64())));
            if seek.drag_stopped() || (seek.changed() && !seek.dragged()) {
                self.run_player_action(|p| p.seek_fraction(fraction));
            }
        });

        let state = self.player.state();
        ui.horizontal(|ui| {
            if ui.button("⏮").clicked() {
                self.run_player_action(|p| p.previous());
            }
            let play_label = if state.status == PlaybackStatus::Playing {
                "⏸"
            } else {
                "▶"
            };
            if ui.button(play_label).clicked() {
                self.run_player_action(|p| p.toggle_play());
            }
            if ui.button("⏭").clicked() {
                self.run_player_action(|p| p.next());
            }

            let repeat_text = RichText::new(format!("🔁 {}", state.repeat_mode.label()));
            let repeat_text = if state.repeat_mode == RepeatMode::None {
                repeat_text
            } else {
                repeat_text.color(Color32::LIGHT_BLUE)
            };
            if ui.button(repeat_text).clicked() {
                self.player.cycle_repeat();
            }

            ui.separator();
            ui.label("볼륨");
            let mut volume = self.player.volume();
            if ui
                .add(egui::Slider::new(&mut volume, 0.0..=1.0).show_value(false))
                .changed()
            {
                self.player.set_volume(volume);
            }
        });
    }

    fn download_panel(&mut self, ui: &mut egui::Ui) {
        let busy = self.orchestrator.is_busy();
        ui.horizontal(|ui| {
            ui.label("URL:");
            let response = ui.add_enabled(
                !busy,
                egui::TextEdit::singleline(&mut self.url_input)
                    .hint_text("YouTube 또는 SoundCloud 링크")
                    .desired_width(500.0),
            );
            let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.add_enabled(!busy, egui::Button::new("다운로드")).clicked() || enter {
                self.start_download();
            }
            if busy {
                ui.add(egui::ProgressBar::new(0.0).animate(true).desired_width(120.0));
            }
        });

        let color = match self.status_kind {
            StatusKind::Info => ui.visuals().text_color(),
            StatusKind::Success => Color32::LIGHT_GREEN,
            StatusKind::Error => Color32::LIGHT_RED,
        };
        ui.label(RichText::new(&self.status_msg).color(color));

        if busy {
            if let Some(last) = self.download_log.last() {
                ui.label(RichText::new(last).small().weak());
            }
        }
    }
}

impl eframe::App for SongdeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_bg_results();
        self.run_player_action(|p| p.tick());
        self.refresh_now_playing(ctx);

        // Top panel: search + library actions
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("검색:");
                ui.text_edit_singleline(&mut self.search_query);
                if ui.button("가져오기").clicked() {
                    self.import_files();
                }
                if ui.button("새로 고침").clicked() && !self.is_loading {
                    self.set_status("라이브러리를 새로 고치는 중...", StatusKind::Info);
                    self.announce_scan = true;
                    self.start_scan();
                }
                if self.is_loading {
                    ui.spinner();
                }
                ui.label(
                    RichText::new(self.songs_dir.display().to_string())
                        .small()
                        .weak(),
                );
            });
        });

        // Bottom panel: download form
        egui::TopBottomPanel::bottom("download_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            self.download_panel(ui);
            ui.add_space(4.0);
        });

        // Left panel: song list
        egui::SidePanel::left("song_panel")
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.heading(format!("노래 ({})", self.player.songs().len()));
                ui.separator();
                self.song_list(ui);
            });

        // Central panel: now playing + controls
        egui::CentralPanel::default().show(ctx, |ui| {
            self.player_panel(ui);
        });

        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

fn refreshed_status(count: usize) -> String {
    format!("라이브러리를 새로 고쳤습니다: {}곡", count)
}
