use crate::{
    cover::{CoverGallery, CoverSignal},
    media::{MediaEngine, MediaEvent},
    theme::{Backdrop, Colorizer, Rgb},
    track::{Playlist, Track},
};
use log::{error, info, warn};
use std::{
    path::Path,
    time::{Duration, Instant},
};

pub const MEDIA_ERROR_ALERT: &str = "Error loading audio file. Please check the file path.";

const PRECACHE_INDEX: usize = 1;

/// Output surface of the player. The player never reads state back from it.
pub trait PlayerView {
    fn show_track(&mut self, title: &str, artist: &str, cover: &Path, cover_alt: &str);

    fn set_progress(&mut self, percent: f64);

    fn set_play_icon(&mut self, playing: bool);

    fn set_current_time(&mut self, text: &str);

    fn set_total_time(&mut self, text: &str);

    fn set_backdrop(&mut self, backdrop: &Backdrop);

    fn alert(&mut self, message: &str);
}

#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    playlist: Playlist,
    current_index: usize,
    is_playing: bool,
}

impl PlayerState {
    pub fn new(playlist: Playlist) -> Self {
        Self {
            playlist,
            current_index: 0,
            is_playing: false,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }
}

/// One-shot deadline for warming the color cache of the second track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecacheSchedule {
    deadline: Option<Instant>,
}

impl PrecacheSchedule {
    pub fn new(started: Instant, delay: Duration) -> Self {
        Self {
            deadline: Some(started + delay),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

pub struct Player<E: MediaEngine, V: PlayerView> {
    state: PlayerState,
    engine: E,
    view: V,
    colorizer: Colorizer,
    covers: CoverGallery,
}

impl<E: MediaEngine, V: PlayerView> Player<E, V> {
    pub fn new(playlist: Playlist, engine: E, view: V, colorizer: Colorizer) -> Self {
        Self {
            state: PlayerState::new(playlist),
            engine,
            view,
            colorizer,
            covers: CoverGallery::new(),
        }
    }

    pub fn with_covers(mut self, covers: CoverGallery) -> Self {
        self.covers = covers;
        self
    }

    pub fn start(&mut self) {
        self.covers.preload(self.state.playlist.tracks());
        if self.state.playlist.is_empty() {
            warn!("Playlist is empty; nothing to load");
            return;
        }
        let index = self.state.current_index;
        self.load(index);
        self.apply_background(Some(index));
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn colorizer(&self) -> &Colorizer {
        &self.colorizer
    }

    pub fn covers(&self) -> &CoverGallery {
        &self.covers
    }

    pub fn covers_mut(&mut self) -> &mut CoverGallery {
        &mut self.covers
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.state.playlist.get(self.state.current_index)
    }

    pub fn all_tracks(&self) -> &[Track] {
        self.state.playlist.tracks()
    }

    pub fn add_track(&mut self, track: Track) -> usize {
        let cover = track.cover.clone();
        let index = self.state.playlist.push(track);
        self.covers.request(index, &cover);
        info!("Added track {index}");
        index
    }

    // Out-of-range indices are ignored.
    pub fn load_track(&mut self, index: usize) {
        if index >= self.state.playlist.len() {
            warn!(
                "Ignoring load of track {index}; playlist has {} tracks",
                self.state.playlist.len()
            );
            return;
        }
        self.state.current_index = index;
        self.load(index);
    }

    // Switching the source stops whatever was playing.
    fn load(&mut self, index: usize) {
        let Some(track) = self.state.playlist.get(index) else {
            return;
        };

        self.view
            .show_track(&track.title, &track.artist, &track.cover, &track.cover_alt());
        self.engine.set_source(&track.src);
        self.view.set_progress(0.0);
        self.state.is_playing = false;
        self.view.set_play_icon(false);

        info!("Loaded: {} by {}", track.title, track.artist);
    }

    /// Returns whether playback started; a rejection leaves the player paused.
    pub async fn play(&mut self) -> bool {
        let request = self.engine.play();
        match request.await {
            Ok(()) => {
                self.state.is_playing = true;
                self.view.set_play_icon(true);
                true
            }
            Err(err) => {
                error!("Error playing track: {err}");
                false
            }
        }
    }

    pub fn pause(&mut self) {
        self.engine.pause();
        self.state.is_playing = false;
        self.view.set_play_icon(false);
    }

    pub async fn toggle(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play().await;
        }
    }

    pub async fn next(&mut self) {
        if let Some(index) = self.state.playlist.next_index(self.state.current_index) {
            self.navigate(index).await;
        }
    }

    pub async fn previous(&mut self) {
        if let Some(index) = self.state.playlist.previous_index(self.state.current_index) {
            self.navigate(index).await;
        }
    }

    async fn navigate(&mut self, index: usize) {
        let was_playing = self.state.is_playing;
        self.state.current_index = index;
        // Background first so it changes even if loading the track is slow.
        self.apply_background(Some(index));
        self.load(index);
        if was_playing {
            self.play().await;
        }
    }

    // `None` when the duration is not known yet.
    pub fn seek(&mut self, input: f64) -> Option<f64> {
        let target = seek_target(input, self.engine.duration())?;
        self.engine.set_current_time(target);
        Some(target)
    }

    pub fn apply_background(&mut self, track_index: Option<usize>) -> Backdrop {
        let backdrop = self.colorizer.apply_background(track_index, &self.covers);
        self.view.set_backdrop(&backdrop);
        backdrop
    }

    pub fn precache_colors(&mut self, track_index: usize) -> Option<Rgb> {
        self.colorizer.precache(track_index, &self.covers)
    }

    /// Runs the deferred pre-cache once `now` reaches the schedule's deadline.
    /// The schedule is spent even when the playlist is too short to use it.
    pub fn poll_precache(
        &mut self,
        schedule: &mut PrecacheSchedule,
        now: Instant,
    ) -> Option<Rgb> {
        if !schedule.take_due(now) || self.state.playlist.len() <= PRECACHE_INDEX {
            return None;
        }
        let color = self.precache_colors(PRECACHE_INDEX);
        match color {
            Some(color) => info!("Pre-cached colors for track {PRECACHE_INDEX}: {color}"),
            None => info!("Could not pre-cache track colors"),
        }
        color
    }

    pub async fn handle_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate => self.update_progress(),
            MediaEvent::Ended => self.next().await,
            MediaEvent::LoadedMetadata => {
                if let Some(duration) = self.engine.duration() {
                    self.view.set_total_time(&format_time(duration));
                }
            }
            MediaEvent::Error(err) => {
                error!("Audio error: {err}");
                self.view.alert(MEDIA_ERROR_ALERT);
            }
        }
    }

    /// Drains engine events and finished cover decodes. A newly loaded cover
    /// for the current track re-themes the background unless already cached.
    pub async fn tick(&mut self) -> Vec<CoverSignal> {
        for event in self.engine.poll_events() {
            self.handle_event(event).await;
        }
        let signals = self.covers.poll();
        let current = self.state.current_index;
        let current_loaded = signals
            .iter()
            .any(|signal| matches!(signal, CoverSignal::Loaded(index) if *index == current));
        if current_loaded && self.colorizer.cached(current).is_none() {
            self.apply_background(Some(current));
        }
        signals
    }

    fn update_progress(&mut self) {
        let Some(duration) = self.engine.duration().filter(|d| *d > 0.0) else {
            return;
        };
        let current = self.engine.current_time();
        self.view.set_progress((current / duration * 100.0).clamp(0.0, 100.0));
        self.view.set_current_time(&format_time(current));
        self.view.set_total_time(&format_time(duration));
    }
}

/// `M:SS`, seconds zero-padded and minutes unbounded.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0).floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn seek_target(input: f64, duration: Option<f64>) -> Option<f64> {
    let duration = duration.filter(|d| d.is_finite() && *d > 0.0)?;
    if !input.is_finite() {
        return None;
    }
    Some(input.clamp(0.0, 100.0) / 100.0 * duration)
}
