/// MIDI output using midir, usable as a tone sink
use crate::audio::{ToneError, ToneSink};
use midir::{MidiOutput, MidiOutputConnection};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

const CLIENT_NAME: &str = "Shaman Rhythm MIDI Output";
/// General MIDI percussion channel (10, zero based)
pub const DRUM_CHANNEL: u8 = 9;

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("failed to create MIDI output: {0}")]
    Init(String),
    #[error("invalid MIDI port index {0}")]
    InvalidPort(usize),
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("failed to send: {0}")]
    Send(String),
}

pub struct MidiOutputDevice {
    connection: Option<MidiOutputConnection>,
    port_name: Option<String>,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self {
            connection: None,
            port_name: None,
        }
    }

    pub fn available_ports() -> Vec<String> {
        match MidiOutput::new(CLIENT_NAME) {
            Ok(midi_out) => midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect(),
            Err(err) => {
                tracing::debug!("MIDI unavailable: {}", err);
                vec![]
            }
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<(), MidiError> {
        let midi_out = MidiOutput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or(MidiError::InvalidPort(port_index))?;
        let port_name = midi_out.port_name(port).ok();

        let connection = midi_out
            .connect(port, "shaman-rhythm")
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        tracing::info!(port = ?port_name, "MIDI output connected");
        self.connection = Some(connection);
        self.port_name = port_name;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn send_note_on(&mut self, channel: u8, note: u8, velocity: u8) -> Result<(), MidiError> {
        self.send(&[0x90 | (channel & 0x0f), note & 0x7f, velocity & 0x7f])
    }

    pub fn send_note_off(&mut self, channel: u8, note: u8) -> Result<(), MidiError> {
        self.send(&[0x80 | (channel & 0x0f), note & 0x7f, 0])
    }

    fn send(&mut self, message: &[u8]) -> Result<(), MidiError> {
        if let Some(ref mut conn) = self.connection {
            conn.send(message)
                .map_err(|e| MidiError::Send(e.to_string()))?;
        }
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            let _ = conn.close();
        }
        self.port_name = None;
    }
}

impl Default for MidiOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Plays each tone as a note-on with a delayed note-off
pub struct MidiToneSink {
    device: Arc<Mutex<MidiOutputDevice>>,
    channel: u8,
    velocity: u8,
}

impl MidiToneSink {
    pub fn new(device: MidiOutputDevice, channel: u8) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            channel,
            velocity: 100,
        }
    }
}

impl ToneSink for MidiToneSink {
    fn name(&self) -> &str {
        "midi"
    }

    fn emit(&self, frequency_hz: f32, duration: Duration) -> Result<(), ToneError> {
        let note = frequency_to_midi_note(frequency_hz);
        self.device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send_note_on(self.channel, note, self.velocity)?;

        // Schedule note off
        let device = Arc::clone(&self.device);
        let channel = self.channel;
        thread::spawn(move || {
            thread::sleep(duration);
            let mut device = device.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(err) = device.send_note_off(channel, note) {
                tracing::warn!("MIDI note off failed: {}", err);
            }
        });
        Ok(())
    }
}

/// Nearest MIDI note for a frequency, clamped to 0..=127
pub fn frequency_to_midi_note(frequency_hz: f32) -> u8 {
    if frequency_hz <= 0.0 || !frequency_hz.is_finite() {
        return 0;
    }
    let note = 69.0 + 12.0 * (frequency_hz / 440.0).log2();
    note.round().clamp(0.0, 127.0) as u8
}
