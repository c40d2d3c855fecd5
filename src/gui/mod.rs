#[cfg(feature = "gui")]
mod app;

#[cfg(feature = "gui")]
pub fn launch(songs_dir: std::path::PathBuf, cfg: crate::config::Config) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1000.0, 700.0]),
        ..Default::default()
    };
    let media = crate::audio::RodioElement::new()?;

    eframe::run_native(
        "songdeck",
        options,
        Box::new(move |cc| Ok(Box::new(app::SongdeckApp::new(cc, media, songs_dir, cfg)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI를 실행할 수 없습니다: {}", e))
}
