use crate::media::{MediaEngine, MediaError, MediaEvent, PlayRequest};
use futures::future::{self, FutureExt};
use log::{debug, warn};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::{
    fs,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

type FileDecoder = Decoder<BufReader<fs::File>>;

/// [`MediaEngine`] backed by the default rodio output device. rodio has no
/// event stream, so signals are synthesised in [`MediaEngine::poll_events`].
pub struct RodioEngine {
    _stream: OutputStream,
    sink: Sink,
    source: Option<PathBuf>,
    duration: Option<f64>,
    tracker: PlaybackTracker,
    pending: Vec<MediaEvent>,
}

impl RodioEngine {
    pub fn open_default() -> Result<Self, MediaError> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|err| MediaError::Output(err.to_string()))?;
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        Ok(Self {
            _stream: stream,
            sink,
            source: None,
            duration: None,
            tracker: PlaybackTracker::default(),
            pending: Vec::new(),
        })
    }
}

// `Decoder::try_from(File)` records the byte length and marks the stream
// seekable; without both, backward seeks and MP3 durations are unavailable.
fn open_decoder(path: &Path) -> Result<FileDecoder, MediaError> {
    let file = fs::File::open(path).map_err(|err| MediaError::Open {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    Decoder::try_from(file).map_err(|err| MediaError::Decode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

fn known_duration(decoder: &FileDecoder) -> Option<f64> {
    decoder
        .total_duration()
        .map(|total| total.as_secs_f64())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

/// Turns sink state into time-update / end-of-track signals.
#[derive(Debug, Default)]
struct PlaybackTracker {
    ended_reported: bool,
}

impl PlaybackTracker {
    fn reset(&mut self) {
        self.ended_reported = false;
    }

    fn observe(&mut self, has_source: bool, paused: bool, drained: bool) -> Option<MediaEvent> {
        if !has_source || paused {
            return None;
        }
        if !drained {
            return Some(MediaEvent::TimeUpdate);
        }
        if self.ended_reported {
            return None;
        }
        self.ended_reported = true;
        Some(MediaEvent::Ended)
    }
}

impl MediaEngine for RodioEngine {
    fn set_source(&mut self, src: &Path) {
        self.sink.clear();
        self.sink.pause();
        self.duration = None;
        self.tracker.reset();

        match open_decoder(src) {
            Ok(decoder) => {
                self.duration = known_duration(&decoder);
                self.sink.append(decoder);
                self.source = Some(src.to_path_buf());
                debug!("Audio source set to {}", src.display());
                self.pending.push(MediaEvent::LoadedMetadata);
            }
            Err(err) => {
                self.source = None;
                self.pending.push(MediaEvent::Error(err));
            }
        }
    }

    fn play(&mut self) -> PlayRequest {
        let result = if self.source.is_none() {
            Err(MediaError::NoSource)
        } else if self.sink.empty() {
            Err(MediaError::Rejected("source already finished".to_string()))
        } else {
            self.sink.play();
            Ok(())
        };
        future::ready(result).boxed()
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn current_time(&self) -> f64 {
        self.sink.get_pos().as_secs_f64()
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_current_time(&mut self, seconds: f64) {
        let target = Duration::from_secs_f64(seconds.max(0.0));
        if let Err(err) = self.sink.try_seek(target) {
            warn!("{}", MediaError::Seek(err.to_string()));
        }
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        let mut events = std::mem::take(&mut self.pending);
        events.extend(self.tracker.observe(
            self.source.is_some(),
            self.sink.is_paused(),
            self.sink.empty(),
        ));
        events
    }
}
