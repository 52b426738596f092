use crate::{
    theme::{parse_color, FallbackPalette, Rgb, DEFAULT_FADE},
    track::{builtin_tracks, Track},
};
use anyhow::{anyhow, Context};
use log::{info, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub tracks: Vec<Track>,
    pub theme: ThemeConfig,
    pub player: PlayerConfig,
    /// File the config was read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracks: builtin_tracks(),
            theme: ThemeConfig::default(),
            player: PlayerConfig::default(),
            source: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        for path in candidate_paths() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Config::default())
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml(data: &str) -> anyhow::Result<Self> {
        let doc: ConfigDocument = toml::from_str(data)?;
        Ok(doc.into())
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(current_dir) = env::current_dir() {
        dirs.push(current_dir);
    }
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            dirs.push(dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| {
            [
                dir.join("config.toml"),
                dir.join("config").join("config.toml"),
                dir.join("config").join("player.toml"),
            ]
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ThemeConfig {
    pub fallback_palette: FallbackPalette,
    pub fade_to: Rgb,
    pub precache_delay: Duration,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            fallback_palette: FallbackPalette::default(),
            fade_to: DEFAULT_FADE,
            precache_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerConfig {
    pub watch_config: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    tracks: Option<Vec<Track>>,
    #[serde(default)]
    theme: ThemeSection,
    #[serde(default)]
    player: PlayerSection,
}

#[derive(Debug, Default, Deserialize)]
struct ThemeSection {
    fallback_palette: Option<Vec<Rgb>>,
    fade_to: Option<String>,
    precache_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerSection {
    watch_config: Option<bool>,
}

impl From<ConfigDocument> for Config {
    fn from(value: ConfigDocument) -> Self {
        let defaults = ThemeConfig::default();

        let fallback_palette = match value.theme.fallback_palette {
            Some(colors) => FallbackPalette::new(colors).unwrap_or_else(|| {
                warn!("theme.fallback_palette is empty; using the default palette");
                defaults.fallback_palette.clone()
            }),
            None => defaults.fallback_palette.clone(),
        };

        let fade_to = match value.theme.fade_to.as_deref() {
            Some(raw) => parse_color(raw).unwrap_or_else(|err| {
                warn!("theme.fade_to: {err}; using #0a0a0a");
                DEFAULT_FADE
            }),
            None => defaults.fade_to,
        };

        let precache_delay = value
            .theme
            .precache_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.precache_delay);

        Config {
            tracks: value.tracks.unwrap_or_else(builtin_tracks),
            theme: ThemeConfig {
                fallback_palette,
                fade_to,
                precache_delay,
            },
            player: PlayerConfig {
                watch_config: value.player.watch_config.unwrap_or(false),
            },
            source: None,
        }
    }
}

/// Watches the config file and reports tracks that appeared since the last
/// read. The playlist is append-only, so removed entries are ignored.
pub struct PlaylistWatcher {
    path: PathBuf,
    file_name: OsString,
    _watcher: RecommendedWatcher,
    changes_rx: Receiver<notify::Result<notify::Event>>,
}

impl PlaylistWatcher {
    pub fn watch(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Err(anyhow!("Config file {} does not exist", path.display()));
        }
        let file_name = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| anyhow!("Config path {} has no file name", path.display()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        // Rename-over saves replace the inode, so watch the directory.
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            _watcher: watcher,
            changes_rx: rx,
        })
    }

    fn touches_config(&self, event: &notify::Event) -> bool {
        (event.kind.is_modify() || event.kind.is_create())
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(self.file_name.as_os_str()))
    }

    /// Returns tracks in the reloaded file whose source `known` rejects.
    pub fn poll_new_tracks(&self, known: impl Fn(&Path) -> bool) -> Vec<Track> {
        let mut modified = false;
        while let Ok(event) = self.changes_rx.try_recv() {
            match event {
                Ok(evt) => modified |= self.touches_config(&evt),
                Err(err) => warn!("Config watcher error: {err}"),
            }
        }
        if !modified {
            return Vec::new();
        }

        match Config::from_file(&self.path) {
            Ok(config) => {
                info!("Reloaded config {}", self.path.display());
                new_tracks(config.tracks, known)
            }
            Err(err) => {
                warn!("Failed to reload config: {err:?}");
                Vec::new()
            }
        }
    }
}

pub fn new_tracks(tracks: Vec<Track>, known: impl Fn(&Path) -> bool) -> Vec<Track> {
    let mut seen: Vec<PathBuf> = Vec::new();
    tracks
        .into_iter()
        .filter(|track| {
            if known(&track.src) || seen.contains(&track.src) {
                return false;
            }
            seen.push(track.src.clone());
            true
        })
        .collect()
}
