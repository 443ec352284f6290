/// Tone emission - fans instrument triggers out to audio/MIDI sinks
use crate::sequencer::{INSTRUMENTS, TRACKS};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

pub mod synth;

pub use synth::{AudioOutput, SynthVoices, Voice};

#[derive(Debug, thiserror::Error)]
pub enum ToneError {
    #[error("no audio output device available")]
    DeviceUnavailable,
    #[error("unsupported sample format {0}")]
    UnsupportedFormat(String),
    #[error("audio stream error: {0}")]
    Stream(String),
    #[error(transparent)]
    Midi(#[from] crate::midi::MidiError),
}

/// Something that can sound a single tone. Emissions must not block
/// and may overlap freely.
pub trait ToneSink: Send + Sync {
    fn name(&self) -> &str;
    fn emit(&self, frequency_hz: f32, duration: Duration) -> Result<(), ToneError>;
}

/// Per-instrument "recently hit" deadlines for pad highlighting
#[derive(Debug)]
pub struct PadActivity {
    until: Mutex<[Option<Instant>; TRACKS]>,
    window: Duration,
}

impl PadActivity {
    pub fn new(window: Duration) -> Self {
        Self {
            until: Mutex::new([None; TRACKS]),
            window,
        }
    }

    pub fn mark(&self, instrument: usize, now: Instant) {
        let mut until = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = until.get_mut(instrument) {
            *slot = Some(now + self.window);
        }
    }

    pub fn is_active(&self, instrument: usize, now: Instant) -> bool {
        let until = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        until
            .get(instrument)
            .copied()
            .flatten()
            .is_some_and(|deadline| now < deadline)
    }
}

pub struct ToneEmitter {
    sinks: Mutex<Vec<Arc<dyn ToneSink>>>,
    activity: PadActivity,
    tone_duration: Duration,
}

impl ToneEmitter {
    pub fn new(tone_duration: Duration, flash_window: Duration) -> Self {
        Self {
            sinks: Mutex::new(Vec::new()),
            activity: PadActivity::new(flash_window),
            tone_duration,
        }
    }

    /// Add an output. A sink with the same name replaces the old one.
    pub fn attach(&self, sink: Arc<dyn ToneSink>) {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.retain(|s| s.name() != sink.name());
        tracing::info!(sink = sink.name(), "tone sink attached");
        sinks.push(sink);
    }

    pub fn detach(&self, name: &str) {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.retain(|s| s.name() != name);
    }

    pub fn sink_names(&self) -> Vec<String> {
        let sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Sound one instrument on every sink. Failures are logged, never returned.
    pub fn trigger(&self, instrument: usize) {
        let Some(inst) = INSTRUMENTS.get(instrument) else {
            tracing::warn!(instrument, "trigger for unknown instrument ignored");
            return;
        };
        self.activity.mark(instrument, Instant::now());

        // Clone out of the lock so a slow sink can't stall attach/detach
        let sinks: Vec<Arc<dyn ToneSink>> = self
            .sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if sinks.is_empty() {
            tracing::debug!(instrument = inst.id, "no tone sink attached");
        }
        for sink in sinks {
            if let Err(err) = sink.emit(inst.frequency_hz, self.tone_duration) {
                tracing::warn!(sink = sink.name(), instrument = inst.id, "tone emission failed: {}", err);
            }
        }
    }

    pub fn is_active(&self, instrument: usize) -> bool {
        self.activity.is_active(instrument, Instant::now())
    }

    pub fn tone_duration(&self) -> Duration {
        self.tone_duration
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Sink that records every emission
    #[derive(Default)]
    pub struct RecordingSink {
        pub emitted: Mutex<Vec<(f32, Duration)>>,
    }

    impl RecordingSink {
        pub fn frequencies(&self) -> Vec<f32> {
            self.emitted.lock().unwrap().iter().map(|(f, _)| *f).collect()
        }
    }

    impl ToneSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn emit(&self, frequency_hz: f32, duration: Duration) -> Result<(), ToneError> {
            self.emitted.lock().unwrap().push((frequency_hz, duration));
            Ok(())
        }
    }

    pub struct BrokenSink;

    impl ToneSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        fn emit(&self, _: f32, _: Duration) -> Result<(), ToneError> {
            Err(ToneError::DeviceUnavailable)
        }
    }
}
