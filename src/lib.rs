/// Shaman Rhythm - an 8x8 drum step sequencer library
///
/// This library provides the core components of the rhythm machine:
/// - Fixed 8-instrument, 8-step pattern grid with presets
/// - Transport running on its own thread with cancel-on-stop timing
/// - Tone output through cpal, with MIDI as an extra sink
/// - Key routing, config, color themes and a moon-phase almanac
/// - A guided breathing journey session

pub mod almanac;
pub mod audio;
pub mod config;
pub mod input;
pub mod journey;
pub mod midi;
pub mod rhythm;
pub mod sequencer;
pub mod theme;

// Re-export commonly used types
pub use audio::{AudioOutput, ToneEmitter, ToneError, ToneSink};
pub use config::Config;
pub use input::{InputAction, KeyPress};
pub use journey::Journey;
pub use midi::{MidiOutputDevice, MidiToneSink};
pub use rhythm::RhythmMachine;
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent};
pub use sequencer::presets::{Preset, PRESETS};
pub use sequencer::{Instrument, Pattern, Tempo, INSTRUMENTS};
pub use theme::{Theme, ThemeId};
