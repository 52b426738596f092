use crate::{
    config::{Config, PlaylistWatcher},
    cover::CoverSignal,
    extract::KMeansExtractor,
    media::MediaEngine,
    paint::paint_linear_gradient,
    player::{Player, PlayerView, PrecacheSchedule},
    theme::{Backdrop, Colorizer},
    track::Playlist,
};
use eframe::egui::{
    self, Align, ColorImage, CornerRadius, Key, LayerId, RichText, TextureHandle,
    TextureOptions,
};
use futures::executor::block_on;
use log::{info, warn};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

const REPAINT_INTERVAL: Duration = Duration::from_millis(250);
const COVER_SIZE: f32 = 220.0;
const PLAYBACK_PANEL_HEIGHT: f32 = 132.0;

/// What the window currently shows. Written by the player, read by the
/// render pass.
#[derive(Debug, Clone, Default)]
pub struct ScreenView {
    pub title: String,
    pub artist: String,
    pub cover: PathBuf,
    pub cover_alt: String,
    pub progress: f64,
    pub playing: bool,
    pub current_time: String,
    pub total_time: String,
    pub backdrop: Option<Backdrop>,
    pub alert: Option<String>,
}

impl PlayerView for ScreenView {
    fn show_track(&mut self, title: &str, artist: &str, cover: &Path, cover_alt: &str) {
        self.title = title.to_string();
        self.artist = artist.to_string();
        self.cover = cover.to_path_buf();
        self.cover_alt = cover_alt.to_string();
    }

    fn set_progress(&mut self, percent: f64) {
        self.progress = percent;
    }

    fn set_play_icon(&mut self, playing: bool) {
        self.playing = playing;
    }

    fn set_current_time(&mut self, text: &str) {
        self.current_time = text.to_string();
    }

    fn set_total_time(&mut self, text: &str) {
        self.total_time = text.to_string();
    }

    fn set_backdrop(&mut self, backdrop: &Backdrop) {
        self.backdrop = Some(*backdrop);
    }

    fn alert(&mut self, message: &str) {
        self.alert = Some(message.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    TogglePlayback,
    Next,
    Previous,
}

pub fn shortcut_for(key: Key) -> Option<Shortcut> {
    match key {
        Key::Space => Some(Shortcut::TogglePlayback),
        Key::ArrowRight => Some(Shortcut::Next),
        Key::ArrowLeft => Some(Shortcut::Previous),
        _ => None,
    }
}

/// Removes shortcut key events from this frame's input so focused widgets
/// do not react to the same press. Nothing is taken while a text field has
/// keyboard focus.
pub fn take_shortcuts(ctx: &egui::Context) -> Vec<Shortcut> {
    if ctx.wants_keyboard_input() {
        return Vec::new();
    }
    ctx.input_mut(|input| {
        let mut taken = Vec::new();
        input.events.retain(|event| {
            let egui::Event::Key {
                key,
                pressed,
                repeat,
                ..
            } = event
            else {
                return true;
            };
            let Some(shortcut) = shortcut_for(*key) else {
                return true;
            };
            if *pressed && !*repeat {
                taken.push(shortcut);
            }
            false
        });
        taken
    })
}

#[derive(Clone, Copy)]
enum Transport {
    Toggle,
    Next,
    Previous,
}

impl From<Shortcut> for Transport {
    fn from(value: Shortcut) -> Self {
        match value {
            Shortcut::TogglePlayback => Transport::Toggle,
            Shortcut::Next => Transport::Next,
            Shortcut::Previous => Transport::Previous,
        }
    }
}

pub struct App<E: MediaEngine> {
    player: Player<E, ScreenView>,
    cover_textures: HashMap<usize, TextureHandle>,
    precache: PrecacheSchedule,
    watcher: Option<PlaylistWatcher>,
}

impl<E: MediaEngine> App<E> {
    pub fn new(config: Config, engine: E) -> Self {
        let colorizer = Colorizer::new(
            Box::new(KMeansExtractor::default()),
            config.theme.fallback_palette.clone(),
            config.theme.fade_to,
        );
        let mut player = Player::new(
            Playlist::new(config.tracks.clone()),
            engine,
            ScreenView::default(),
            colorizer,
        );
        player.start();

        let watcher = match (&config.source, config.player.watch_config) {
            (Some(path), true) => match PlaylistWatcher::watch(path) {
                Ok(watcher) => {
                    info!("Watching {} for new tracks", path.display());
                    Some(watcher)
                }
                Err(err) => {
                    warn!("Config watch disabled: {err:?}");
                    None
                }
            },
            _ => None,
        };

        Self {
            player,
            cover_textures: HashMap::new(),
            precache: PrecacheSchedule::new(Instant::now(), config.theme.precache_delay),
            watcher,
        }
    }

    fn run(&mut self, transport: Transport) {
        match transport {
            Transport::Toggle => block_on(self.player.toggle()),
            Transport::Next => block_on(self.player.next()),
            Transport::Previous => block_on(self.player.previous()),
        }
    }

    fn pump(&mut self) {
        for signal in block_on(self.player.tick()) {
            let index = match signal {
                CoverSignal::Loaded(index) | CoverSignal::Failed(index, _) => index,
            };
            self.cover_textures.remove(&index);
        }

        if let Some(watcher) = self.watcher.as_ref() {
            let playlist = self.player.state().playlist();
            let fresh = watcher.poll_new_tracks(|src| playlist.contains_source(src));
            for track in fresh {
                self.player.add_track(track);
            }
        }

        if self.precache.is_pending() {
            self.player.poll_precache(&mut self.precache, Instant::now());
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        for shortcut in take_shortcuts(ctx) {
            self.run(shortcut.into());
        }
    }

    fn cover_texture(&mut self, ctx: &egui::Context) -> Option<TextureHandle> {
        let index = self.player.current_index();
        if let Some(texture) = self.cover_textures.get(&index) {
            return Some(texture.clone());
        }
        let pixels = self.player.covers().get(index)?.pixels()?;
        let size = [pixels.width() as usize, pixels.height() as usize];
        let image = ColorImage::from_rgba_unmultiplied(size, pixels.as_raw());
        let texture = ctx.load_texture(
            format!("cover.{index}"),
            image,
            TextureOptions::LINEAR,
        );
        self.cover_textures.insert(index, texture.clone());
        Some(texture)
    }

    fn render_now_playing(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let texture = self.cover_texture(ctx);
        let view = self.player.view();

        ui.vertical_centered(|ui| {
            ui.add_space(24.0);
            match texture {
                Some(texture) => {
                    ui.add(
                        egui::Image::new(&texture)
                            .fit_to_exact_size(egui::vec2(COVER_SIZE, COVER_SIZE))
                            .corner_radius(CornerRadius::same(12)),
                    )
                    .on_hover_text(&view.cover_alt);
                }
                None => {
                    let (rect, _) = ui.allocate_exact_size(
                        egui::vec2(COVER_SIZE, COVER_SIZE),
                        egui::Sense::hover(),
                    );
                    ui.painter()
                        .rect_filled(rect, CornerRadius::same(12), egui::Color32::from_white_alpha(24));
                }
            }
            ui.add_space(12.0);
            ui.label(RichText::new(&view.title).size(22.0).strong());
            ui.label(RichText::new(&view.artist).size(15.0));
        });
    }

    fn render_playback(&mut self, ui: &mut egui::Ui) -> Option<Transport> {
        let mut requested = None;
        let mut seek_to = None;
        {
            let view = self.player.view();
            ui.horizontal(|ui| {
                ui.label(&view.current_time);
                let mut value = view.progress;
                let width = (ui.available_width() - 48.0).max(40.0);
                ui.spacing_mut().slider_width = width;
                let response = ui.add(
                    egui::Slider::new(&mut value, 0.0..=100.0)
                        .show_value(false)
                        .trailing_fill(true),
                );
                if response.changed() {
                    seek_to = Some(value);
                }
                ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                    ui.label(&view.total_time);
                });
            });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let total = 3.0 * 48.0 + 2.0 * ui.spacing().item_spacing.x;
                ui.add_space(((ui.available_width() - total) / 2.0).max(0.0));
                if ui.add_sized([48.0, 36.0], egui::Button::new("⏮")).clicked() {
                    requested = Some(Transport::Previous);
                }
                let icon = if view.playing { "⏸" } else { "▶" };
                if ui.add_sized([48.0, 36.0], egui::Button::new(icon)).clicked() {
                    requested = Some(Transport::Toggle);
                }
                if ui.add_sized([48.0, 36.0], egui::Button::new("⏭")).clicked() {
                    requested = Some(Transport::Next);
                }
            });
        }

        if let Some(value) = seek_to {
            self.player.seek(value);
        }
        requested
    }

    fn render_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.player.view().alert.clone() else {
            return;
        };
        let modal = egui::Modal::new(egui::Id::new("media_error_alert")).show(ctx, |ui| {
            ui.label(&message);
            ui.add_space(8.0);
            ui.button("OK").clicked()
        });
        if modal.inner || modal.should_close() {
            self.player.view_mut().alert = None;
        }
    }
}

impl<E: MediaEngine> eframe::App for App<E> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump();
        self.handle_shortcuts(ctx);

        let root_rect = ctx.screen_rect();
        if let Some(backdrop) = self.player.view().backdrop {
            let painter = ctx.layer_painter(LayerId::background());
            paint_linear_gradient(&painter, root_rect, &backdrop.dynamic_bg);
        }

        let mut requested = None;

        let playback_frame = egui::Frame::new()
            .fill(egui::Color32::TRANSPARENT)
            .inner_margin(egui::Margin::symmetric(24, 16));
        egui::TopBottomPanel::bottom("playback")
            .exact_height(PLAYBACK_PANEL_HEIGHT)
            .frame(playback_frame)
            .show(ctx, |ui| {
                if let Some(backdrop) = self.player.view().backdrop {
                    let rect = ui.max_rect().expand(24.0);
                    paint_linear_gradient(ui.painter(), rect, &backdrop.playback);
                }
                requested = self.render_playback(ui);
            });

        let mut panel_frame = egui::Frame::central_panel(&ctx.style());
        panel_frame.fill = egui::Color32::TRANSPARENT;
        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| {
                self.render_now_playing(ui, ctx);
            });

        self.render_alert(ctx);

        if let Some(transport) = requested {
            self.run(transport);
        }

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}
