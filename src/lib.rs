pub mod app;
pub mod audio;
pub mod config;
pub mod cover;
pub mod extract;
pub mod media;
pub mod paint;
pub mod player;
pub mod theme;
pub mod track;

pub use crate::{
    cover::{CoverGallery, CoverImage},
    extract::{ColorExtractor, ExtractError, KMeansExtractor},
    media::{MediaEngine, MediaError, MediaEvent, PlayRequest},
    player::{format_time, Player, PlayerState, PlayerView, PrecacheSchedule},
    theme::{Backdrop, ColorSource, Colorizer, FallbackPalette, LinearGradient, Rgb},
    track::{Playlist, Track},
};
