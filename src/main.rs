use anyhow::anyhow;
use cover_tint_player::{app::App, audio::RodioEngine, config::Config};
use eframe::egui::ViewportBuilder;
use log::{info, warn};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().unwrap_or_else(|err| {
        warn!("{err:?}; using default config");
        Config::default()
    });
    match config.source.as_deref() {
        Some(path) => info!("Using config {}", path.display()),
        None => info!("No config file found; using built-in playlist"),
    }

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size([420.0, 560.0])
            .with_min_inner_size([320.0, 440.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Cover Tint Player",
        native_options,
        Box::new(
            move |_cc| -> std::result::Result<
                Box<dyn eframe::App>,
                Box<dyn std::error::Error + Send + Sync>,
            > {
                let engine = RodioEngine::open_default()?;
                Ok(Box::new(App::new(config, engine)))
            },
        ),
    )
    .map_err(|err| anyhow!("Failed to run window: {err}"))
}
