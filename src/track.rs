use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub src: PathBuf,
    pub cover: PathBuf,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        src: impl Into<PathBuf>,
        cover: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            src: src.into(),
            cover: cover.into(),
        }
    }

    pub fn cover_alt(&self) -> String {
        format!("{} album cover", self.title)
    }
}

/// Ordered, append-only list of tracks. Entries are never mutated or removed
/// once added, so an index stays valid for the lifetime of the playlist.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn push(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn contains_source(&self, src: &std::path::Path) -> bool {
        self.tracks.iter().any(|track| track.src == src)
    }

    pub fn next_index(&self, index: usize) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        Some((index + 1) % self.tracks.len())
    }

    pub fn previous_index(&self, index: usize) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        Some(if index == 0 {
            self.tracks.len() - 1
        } else {
            (index - 1).min(self.tracks.len() - 1)
        })
    }
}

pub fn builtin_tracks() -> Vec<Track> {
    vec![
        Track::new(
            "I Think They Call This Love",
            "matthew ifield",
            "assets/music/I Think They Call This Love (Cover).mp3",
            "assets/images/pic1.jpg",
        ),
        Track::new(
            "Wanna Be Yours",
            "artic monkey",
            "assets/music/song2.mp3",
            "assets/images/pic2.jpg",
        ),
    ]
}
