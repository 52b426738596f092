#![allow(dead_code)]

use cover_tint_player::{
    Backdrop, ColorExtractor, Colorizer, CoverGallery, CoverImage, ExtractError, FallbackPalette,
    MediaEngine, MediaError, MediaEvent, PlayRequest, Player, PlayerView, Playlist, Rgb, Track,
};
use futures::future::{self, FutureExt};
use image::RgbaImage;
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

pub const FADE: Rgb = Rgb::new(0x0a, 0x0a, 0x0a);

#[derive(Default)]
pub struct StubEngine {
    pub sources: Vec<PathBuf>,
    pub play_results: VecDeque<Result<(), MediaError>>,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub seeks: Vec<f64>,
    pub events: Vec<MediaEvent>,
}

impl StubEngine {
    pub fn rejecting() -> Self {
        let mut engine = Self::default();
        engine
            .play_results
            .push_back(Err(MediaError::Rejected("autoplay blocked".into())));
        engine
    }
}

impl MediaEngine for StubEngine {
    fn set_source(&mut self, src: &Path) {
        self.sources.push(src.to_path_buf());
    }

    fn play(&mut self) -> PlayRequest {
        self.play_calls += 1;
        let result = self.play_results.pop_front().unwrap_or(Ok(()));
        future::ready(result).boxed()
    }

    fn pause(&mut self) {
        self.pause_calls += 1;
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.seeks.push(seconds);
        self.current_time = seconds;
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        std::mem::take(&mut self.events)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewCall {
    Track { title: String, artist: String, cover: PathBuf, alt: String },
    Progress(f64),
    PlayIcon(bool),
    CurrentTime(String),
    TotalTime(String),
    Backdrop(Backdrop),
    Alert(String),
}

#[derive(Default)]
pub struct StubView {
    pub calls: Vec<ViewCall>,
}

impl StubView {
    pub fn last_track(&self) -> Option<(&str, &str, &Path, &str)> {
        self.calls.iter().rev().find_map(|call| match call {
            ViewCall::Track {
                title,
                artist,
                cover,
                alt,
            } => Some((title.as_str(), artist.as_str(), cover.as_path(), alt.as_str())),
            _ => None,
        })
    }

    pub fn last_progress(&self) -> Option<f64> {
        self.calls.iter().rev().find_map(|call| match call {
            ViewCall::Progress(p) => Some(*p),
            _ => None,
        })
    }

    pub fn last_play_icon(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|call| match call {
            ViewCall::PlayIcon(playing) => Some(*playing),
            _ => None,
        })
    }

    pub fn last_backdrop(&self) -> Option<Backdrop> {
        self.calls.iter().rev().find_map(|call| match call {
            ViewCall::Backdrop(backdrop) => Some(*backdrop),
            _ => None,
        })
    }

    pub fn alerts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ViewCall::Alert(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl PlayerView for StubView {
    fn show_track(&mut self, title: &str, artist: &str, cover: &Path, cover_alt: &str) {
        self.calls.push(ViewCall::Track {
            title: title.into(),
            artist: artist.into(),
            cover: cover.to_path_buf(),
            alt: cover_alt.into(),
        });
    }

    fn set_progress(&mut self, percent: f64) {
        self.calls.push(ViewCall::Progress(percent));
    }

    fn set_play_icon(&mut self, playing: bool) {
        self.calls.push(ViewCall::PlayIcon(playing));
    }

    fn set_current_time(&mut self, text: &str) {
        self.calls.push(ViewCall::CurrentTime(text.into()));
    }

    fn set_total_time(&mut self, text: &str) {
        self.calls.push(ViewCall::TotalTime(text.into()));
    }

    fn set_backdrop(&mut self, backdrop: &Backdrop) {
        self.calls.push(ViewCall::Backdrop(*backdrop));
    }

    fn alert(&mut self, message: &str) {
        self.calls.push(ViewCall::Alert(message.into()));
    }
}

/// Returns a fixed color (or error) and counts invocations.
#[derive(Clone)]
pub struct CountingExtractor {
    pub calls: Arc<AtomicUsize>,
    pub result: Result<Rgb, ExtractError>,
}

impl CountingExtractor {
    pub fn returning(color: Rgb) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            result: Ok(color),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            result: Err(ExtractError::NoPixels("stub".into())),
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ColorExtractor for CountingExtractor {
    fn dominant_color(&self, _image: &CoverImage) -> Result<Rgb, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

pub fn tracks(n: usize) -> Vec<Track> {
    (0..n)
        .map(|i| {
            Track::new(
                format!("Track {i}"),
                format!("Artist {i}"),
                format!("music/{i}.mp3"),
                format!("images/{i}.jpg"),
            )
        })
        .collect()
}

/// Gallery where every listed index has a decoded 2x2 cover and the rest
/// are still pending.
pub fn gallery(len: usize, loaded: &[usize]) -> CoverGallery {
    let mut gallery = CoverGallery::new();
    for index in 0..len {
        let source = format!("images/{index}.jpg");
        let cover = if loaded.contains(&index) {
            CoverImage::loaded(source, RgbaImage::new(2, 2))
        } else {
            CoverImage::pending(source)
        };
        gallery.insert(index, cover);
    }
    gallery
}

pub fn colorizer(extractor: CountingExtractor) -> Colorizer {
    Colorizer::new(Box::new(extractor), FallbackPalette::default(), FADE)
}

pub fn player(n: usize, engine: StubEngine) -> Player<StubEngine, StubView> {
    Player::new(
        Playlist::new(tracks(n)),
        engine,
        StubView::default(),
        colorizer(CountingExtractor::returning(Rgb::new(9, 9, 9))),
    )
    .with_covers(gallery(n, &[]))
}

pub fn player_with(
    n: usize,
    extractor: CountingExtractor,
    covers: CoverGallery,
) -> Player<StubEngine, StubView> {
    Player::new(
        Playlist::new(tracks(n)),
        StubEngine::default(),
        StubView::default(),
        colorizer(extractor),
    )
    .with_covers(covers)
}
