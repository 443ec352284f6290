/// Polyphonic sine synth on a cpal output stream
use super::{ToneError, ToneSink};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const RELEASE_FLOOR: f32 = 0.001;
const MAX_VOICES: usize = 64;

/// One decaying sine tone
#[derive(Debug, Clone)]
pub struct Voice {
    frequency: f32,
    phase: f32,
    peak: f32,
    elapsed: u32,
    length: u32,
}

impl Voice {
    pub fn new(frequency: f32, duration: Duration, peak: f32, sample_rate: f32) -> Self {
        Self {
            frequency,
            phase: 0.0,
            peak,
            elapsed: 0,
            length: (duration.as_secs_f32() * sample_rate).round().max(1.0) as u32,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.length
    }

    /// Exponential ramp from `peak` down to the release floor
    pub fn gain(&self) -> f32 {
        if self.is_finished() || self.peak <= RELEASE_FLOOR {
            return 0.0;
        }
        let t = self.elapsed as f32 / self.length as f32;
        self.peak * (RELEASE_FLOOR / self.peak).powf(t)
    }

    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        let sample = (self.phase * 2.0 * std::f32::consts::PI).sin() * self.gain();
        self.phase += self.frequency / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.elapsed += 1;
        sample
    }
}

/// Shared voice list, the handle the emitter writes into
#[derive(Clone)]
pub struct SynthVoices {
    voices: Arc<Mutex<Vec<Voice>>>,
    sample_rate: f32,
    peak: f32,
}

impl SynthVoices {
    pub fn new(sample_rate: f32, peak: f32) -> Self {
        Self {
            voices: Arc::new(Mutex::new(Vec::new())),
            sample_rate,
            peak: peak.clamp(0.0, 1.0),
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Mix all voices into an interleaved buffer and drop finished ones
    pub fn render(&self, data: &mut [f32], channels: usize) {
        let mut voices = self.voices.lock().unwrap_or_else(PoisonError::into_inner);
        for frame in data.chunks_mut(channels.max(1)) {
            let mut mixed = 0.0;
            for voice in voices.iter_mut() {
                mixed += voice.next_sample(self.sample_rate);
            }
            let mixed = mixed.clamp(-1.0, 1.0);
            for sample in frame.iter_mut() {
                *sample = mixed;
            }
        }
        voices.retain(|v| !v.is_finished());
    }
}

impl ToneSink for SynthVoices {
    fn name(&self) -> &str {
        "synth"
    }

    fn emit(&self, frequency_hz: f32, duration: Duration) -> Result<(), ToneError> {
        let mut voices = self.voices.lock().unwrap_or_else(PoisonError::into_inner);
        if voices.len() >= MAX_VOICES {
            voices.remove(0);
        }
        voices.push(Voice::new(frequency_hz, duration, self.peak, self.sample_rate));
        Ok(())
    }
}

/// Owns the cpal stream; keep it alive for as long as tones should play
pub struct AudioOutput {
    _stream: cpal::Stream,
    voices: SynthVoices,
}

impl AudioOutput {
    pub fn new(peak: f32) -> Result<Self, ToneError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(ToneError::DeviceUnavailable)?;
        let config = device
            .default_output_config()
            .map_err(|e| ToneError::Stream(e.to_string()))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let voices = SynthVoices::new(sample_rate, peak);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let render = voices.clone();
                device
                    .build_output_stream(
                        &config.into(),
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            render.render(data, channels);
                        },
                        |err| tracing::error!("Audio stream error: {}", err),
                        None,
                    )
                    .map_err(|e| ToneError::Stream(e.to_string()))?
            }
            other => return Err(ToneError::UnsupportedFormat(format!("{other:?}"))),
        };

        stream
            .play()
            .map_err(|e| ToneError::Stream(e.to_string()))?;
        tracing::info!(sample_rate, channels, "audio output ready");

        Ok(Self {
            _stream: stream,
            voices,
        })
    }

    pub fn voices(&self) -> SynthVoices {
        self.voices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_decays_to_silence() {
        let mut voice = Voice::new(440.0, Duration::from_millis(10), 0.3, 1000.0);
        assert!((voice.gain() - 0.3).abs() < 1e-6);
        for _ in 0..5 {
            voice.next_sample(1000.0);
        }
        assert!(voice.gain() < 0.3 && voice.gain() > RELEASE_FLOOR);
        for _ in 0..5 {
            voice.next_sample(1000.0);
        }
        assert!(voice.is_finished());
        assert_eq!(voice.next_sample(1000.0), 0.0);
    }

    #[test]
    fn overlapping_emissions_mix_and_expire() {
        let voices = SynthVoices::new(1000.0, 0.3);
        voices.emit(80.0, Duration::from_millis(4)).unwrap();
        voices.emit(80.0, Duration::from_millis(8)).unwrap();
        assert_eq!(voices.active_voices(), 2);

        let mut buffer = [0.0f32; 8];
        voices.render(&mut buffer, 2);
        assert_eq!(voices.active_voices(), 1);
        assert_eq!(buffer[0], buffer[1]);

        let mut buffer = [0.0f32; 8];
        voices.render(&mut buffer, 2);
        assert_eq!(voices.active_voices(), 0);
    }

    #[test]
    fn voice_limit_drops_oldest() {
        let voices = SynthVoices::new(1000.0, 0.3);
        for _ in 0..MAX_VOICES + 3 {
            voices.emit(200.0, Duration::from_secs(1)).unwrap();
        }
        assert_eq!(voices.active_voices(), MAX_VOICES);
    }
}
