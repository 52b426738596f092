use crate::track::Track;
use image::RgbaImage;
use log::{error, info};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread,
};

#[derive(Debug, Clone)]
pub enum CoverState {
    Pending,
    Loaded(Arc<RgbaImage>),
    Failed(String),
}

/// Pending until decoding finishes, then either loaded or broken.
#[derive(Debug, Clone)]
pub struct CoverImage {
    source: PathBuf,
    state: CoverState,
}

impl CoverImage {
    pub fn pending(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            state: CoverState::Pending,
        }
    }

    pub fn loaded(source: impl Into<PathBuf>, image: RgbaImage) -> Self {
        Self {
            source: source.into(),
            state: CoverState::Loaded(Arc::new(image)),
        }
    }

    pub fn failed(source: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            state: CoverState::Failed(reason.into()),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn state(&self) -> &CoverState {
        &self.state
    }

    pub fn is_complete(&self) -> bool {
        !matches!(self.state, CoverState::Pending)
    }

    pub fn natural_width(&self) -> u32 {
        match &self.state {
            CoverState::Loaded(image) => image.width(),
            _ => 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.is_complete() && self.natural_width() > 0
    }

    pub fn pixels(&self) -> Option<&RgbaImage> {
        match &self.state {
            CoverState::Loaded(image) => Some(image.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSignal {
    Loaded(usize),
    Failed(usize, String),
}

struct CoverMessage {
    index: usize,
    source: PathBuf,
    result: Result<RgbaImage, String>,
}

/// One cover slot per playlist index. Decoding happens on worker threads;
/// results are applied on the owning thread by [`CoverGallery::poll`].
pub struct CoverGallery {
    slots: Vec<CoverImage>,
    tx: Sender<CoverMessage>,
    rx: Receiver<CoverMessage>,
}

impl Default for CoverGallery {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            slots: Vec::new(),
            tx,
            rx,
        }
    }
}

impl CoverGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CoverImage> {
        self.slots.get(index)
    }

    pub fn preload(&mut self, tracks: &[Track]) {
        for (index, track) in tracks.iter().enumerate().skip(self.slots.len()) {
            self.request(index, &track.cover);
        }
    }

    pub fn request(&mut self, index: usize, path: &Path) {
        self.set_slot(index, CoverImage::pending(path));

        let tx = self.tx.clone();
        let source = path.to_path_buf();
        thread::spawn(move || {
            let result = fs::read(&source)
                .map_err(|err| format!("Failed to read cover {}: {err}", source.display()))
                .and_then(|bytes| decode_cover(&bytes));
            let _ = tx.send(CoverMessage {
                index,
                source,
                result,
            });
        });
    }

    pub fn insert(&mut self, index: usize, cover: CoverImage) {
        self.set_slot(index, cover);
    }

    // Results for a slot re-pointed at another source are dropped.
    pub fn poll(&mut self) -> Vec<CoverSignal> {
        let mut signals = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    let current = self.slots.get(message.index).map(|slot| slot.source());
                    if current != Some(message.source.as_path()) {
                        continue;
                    }
                    match message.result {
                        Ok(image) => {
                            info!("Cover {} loaded successfully", message.source.display());
                            self.slots[message.index] = CoverImage::loaded(message.source, image);
                            signals.push(CoverSignal::Loaded(message.index));
                        }
                        Err(err) => {
                            error!("Failed to load cover {}: {err}", message.source.display());
                            self.slots[message.index] =
                                CoverImage::failed(message.source, err.clone());
                            signals.push(CoverSignal::Failed(message.index, err));
                        }
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        signals
    }

    fn set_slot(&mut self, index: usize, cover: CoverImage) {
        if index >= self.slots.len() {
            let filler = cover.source().to_path_buf();
            self.slots
                .resize_with(index + 1, || CoverImage::failed(filler.clone(), "no cover"));
        }
        self.slots[index] = cover;
    }
}

pub fn decode_cover(bytes: &[u8]) -> Result<RgbaImage, String> {
    let image =
        image::load_from_memory(bytes).map_err(|e| format!("Failed to decode cover: {e}"))?;
    Ok(image.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn decode_cover_fails_on_garbage_input() {
        assert!(decode_cover(&[0u8, 1u8, 2u8, 3u8]).is_err());
    }

    #[test]
    fn pending_cover_is_not_ready() {
        let cover = CoverImage::pending("a.jpg");
        assert!(!cover.is_complete());
        assert_eq!(cover.natural_width(), 0);
        assert!(!cover.is_ready());
    }

    #[test]
    fn broken_cover_is_complete_but_not_ready() {
        let cover = CoverImage::failed("a.jpg", "missing");
        assert!(cover.is_complete());
        assert!(!cover.is_ready());
        assert!(cover.pixels().is_none());
    }

    #[test]
    fn loaded_cover_reports_width() {
        let cover = CoverImage::loaded("a.jpg", RgbaImage::new(4, 2));
        assert!(cover.is_ready());
        assert_eq!(cover.natural_width(), 4);
    }

    #[test]
    fn zero_width_image_is_not_ready() {
        let cover = CoverImage::loaded("a.jpg", RgbaImage::new(0, 0));
        assert!(cover.is_complete());
        assert!(!cover.is_ready());
    }

    #[test]
    fn missing_file_signals_failure() {
        let mut gallery = CoverGallery::new();
        gallery.request(0, Path::new("definitely/not/here.png"));
        assert!(!gallery.get(0).map(CoverImage::is_complete).unwrap_or(true));

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut signals = Vec::new();
        while signals.is_empty() && Instant::now() < deadline {
            signals = gallery.poll();
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(matches!(signals.as_slice(), [CoverSignal::Failed(0, _)]));
        assert!(gallery.get(0).map(CoverImage::is_complete).unwrap_or(false));
    }

    #[test]
    fn insert_beyond_end_grows_gallery() {
        let mut gallery = CoverGallery::new();
        gallery.insert(2, CoverImage::loaded("c.jpg", RgbaImage::new(1, 1)));
        assert_eq!(gallery.len(), 3);
        assert!(!gallery.get(0).map(CoverImage::is_ready).unwrap_or(true));
        assert!(gallery.get(2).map(CoverImage::is_ready).unwrap_or(false));
    }
}
