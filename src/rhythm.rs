/// Rhythm machine - the UI-facing handle over engine, emitter and input
///
/// Inputs are validated here before they reach the transport thread. The
/// machine keeps a mirror of pattern and tempo so the UI can draw without
/// round trips; it is the only writer, so the mirror never drifts.
use crate::audio::ToneEmitter;
use crate::config::Config;
use crate::input::{self, InputAction, KeyPress};
use crate::sequencer::playback::{PlaybackEngine, PlaybackError, PlaybackEvent, Snapshot};
use crate::sequencer::presets::Preset;
use crate::sequencer::{Pattern, PatternError, Tempo, TempoError};
use std::sync::Arc;

pub struct RhythmMachine {
    engine: PlaybackEngine,
    emitter: Arc<ToneEmitter>,
    pattern: Pattern,
    tempo: Tempo,
    running: bool,
    current_step: usize,
}

impl RhythmMachine {
    pub fn new(config: &Config) -> Result<Self, PlaybackError> {
        let emitter = Arc::new(ToneEmitter::new(
            config.audio.tone_duration(),
            config.audio.flash_window(),
        ));
        Self::with_emitter(config.sequencer.tempo(), emitter)
    }

    pub fn with_emitter(tempo: Tempo, emitter: Arc<ToneEmitter>) -> Result<Self, PlaybackError> {
        let engine = PlaybackEngine::new(tempo, Arc::clone(&emitter))?;
        Ok(Self {
            engine,
            emitter,
            pattern: Pattern::new(),
            tempo,
            running: false,
            current_step: 0,
        })
    }

    fn log_failure<T>(result: Result<T, PlaybackError>) -> Option<T> {
        result
            .map_err(|err| tracing::error!("transport command failed: {}", err))
            .ok()
    }

    pub fn emitter(&self) -> &Arc<ToneEmitter> {
        &self.emitter
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Last step the transport sounded; 0 while stopped
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn is_active(&self, instrument: usize) -> bool {
        self.emitter.is_active(instrument)
    }

    /// Authoritative state straight from the transport thread
    pub fn snapshot(&self) -> Result<Snapshot, PlaybackError> {
        self.engine.snapshot()
    }

    /// Flip one cell, returns its new value
    pub fn toggle_cell(&mut self, instrument: usize, step: usize) -> Result<bool, PatternError> {
        let value = self.pattern.toggle(instrument, step)?;
        Self::log_failure(self.engine.toggle_cell(instrument, step));
        Ok(value)
    }

    pub fn clear(&mut self) {
        self.pattern.clear();
        Self::log_failure(self.engine.clear());
    }

    pub fn load_preset(&mut self, preset: &Preset) {
        tracing::info!(preset = preset.name, tempo = preset.tempo.bpm(), "loading preset");
        self.pattern = preset.pattern;
        self.tempo = preset.tempo;
        Self::log_failure(self.engine.load(preset.pattern, preset.tempo));
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        if tempo == self.tempo {
            return;
        }
        self.tempo = tempo;
        Self::log_failure(self.engine.set_tempo(tempo));
    }

    /// Accept typed tempo text, clamping numbers into range
    pub fn set_tempo_input(&mut self, input: &str) -> Result<Tempo, TempoError> {
        let tempo = Tempo::parse(input)?;
        self.set_tempo(tempo);
        Ok(tempo)
    }

    pub fn start(&mut self) {
        if Self::log_failure(self.engine.start()).is_some() {
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        Self::log_failure(self.engine.stop());
        self.running = false;
        self.current_step = 0;
        // Anything queued before the stop is stale now
        self.drain_events();
    }

    pub fn toggle_transport(&mut self) -> bool {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
        self.running
    }

    /// Sound an instrument right now, independent of the transport
    pub fn play(&self, instrument: usize) {
        self.emitter.trigger(instrument);
    }

    /// Route a key press. Returns true when the host should suppress the
    /// key's default action.
    pub fn handle_key(&mut self, key: KeyPress) -> bool {
        match input::route(key) {
            Some(InputAction::Play(instrument)) => {
                self.play(instrument);
                false
            }
            Some(action @ InputAction::ToggleTransport) => {
                self.toggle_transport();
                action.suppresses_default()
            }
            None => false,
        }
    }

    /// Route an auto-repeat of a held key. Instruments replay; the transport
    /// key is swallowed so holding it doesn't flap play/stop.
    pub fn handle_key_repeat(&mut self, key: KeyPress) -> bool {
        match input::route(key) {
            Some(action @ InputAction::ToggleTransport) => action.suppresses_default(),
            _ => self.handle_key(key),
        }
    }

    /// Copy the session settings worth keeping across restarts into `config`
    pub fn write_settings(&self, config: &mut Config) {
        config.sequencer.tempo = self.tempo.bpm();
    }

    /// Apply queued transport events to the mirror and hand them back
    pub fn poll(&mut self) -> Vec<PlaybackEvent> {
        let events = self.engine.poll_events();
        for event in &events {
            if let PlaybackEvent::StepAdvanced(step) = event {
                if self.running {
                    self.current_step = *step;
                }
            }
        }
        events
    }

    fn drain_events(&self) {
        let _ = self.engine.poll_events();
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::RecordingSink;
    use crate::sequencer::presets::{self, PRESETS};
    use crate::sequencer::INSTRUMENTS;
    use std::thread;
    use std::time::Duration;

    fn machine(tempo: u16) -> (RhythmMachine, Arc<RecordingSink>) {
        let emitter = Arc::new(ToneEmitter::new(
            Duration::from_millis(150),
            Duration::from_millis(100),
        ));
        let sink = Arc::new(RecordingSink::default());
        emitter.attach(sink.clone());
        let machine = RhythmMachine::with_emitter(Tempo::clamped(tempo as i64), emitter).unwrap();
        (machine, sink)
    }

    #[test]
    fn preset_load_matches_regardless_of_prior_state() {
        for preset in &PRESETS {
            let (mut machine, _) = machine(77);
            machine.toggle_cell(3, 3).unwrap();
            machine.load_preset(preset);
            let snapshot = machine.snapshot().unwrap();
            assert_eq!(snapshot.pattern, preset.pattern);
            assert_eq!(snapshot.tempo, preset.tempo);
            assert_eq!(*machine.pattern(), preset.pattern);
            assert_eq!(machine.tempo(), preset.tempo);
        }
    }

    #[test]
    fn preset_load_does_not_start_transport() {
        let (mut machine, _) = machine(120);
        machine.load_preset(presets::find("Trance").unwrap());
        assert!(!machine.is_running());
        assert!(!machine.snapshot().unwrap().running);
    }

    #[test]
    fn clear_zeroes_every_cell() {
        let (mut machine, _) = machine(120);
        machine.load_preset(presets::find("Journey").unwrap());
        machine.clear();
        let snapshot = machine.snapshot().unwrap();
        for y in 0..8 {
            for x in 0..8 {
                assert!(!snapshot.pattern.get(y, x).unwrap());
            }
        }
    }

    #[test]
    fn out_of_bounds_toggle_is_rejected() {
        let (mut machine, _) = machine(120);
        assert!(machine.toggle_cell(0, 8).is_err());
        assert_eq!(machine.snapshot().unwrap().pattern, Pattern::new());
    }

    #[test]
    fn tempo_input_is_clamped_or_rejected() {
        let (mut machine, _) = machine(120);
        assert_eq!(machine.set_tempo_input("300").unwrap().bpm(), 200);
        assert_eq!(machine.snapshot().unwrap().tempo.bpm(), 200);
        assert_eq!(machine.set_tempo_input("12").unwrap().bpm(), 40);
        assert!(machine.set_tempo_input("allegro").is_err());
        assert_eq!(machine.tempo().bpm(), 40);
        assert_eq!(machine.snapshot().unwrap().tempo.bpm(), 40);
    }

    #[test]
    fn instrument_key_fires_once_while_stopped() {
        let (mut machine, sink) = machine(120);
        assert!(!machine.handle_key(KeyPress::Char('w')));
        assert_eq!(sink.frequencies(), vec![INSTRUMENTS[1].frequency_hz]);
        assert!(machine.is_active(1));
    }

    #[test]
    fn instrument_key_fires_once_while_running() {
        // Empty pattern, so the only emission comes from the key
        let (mut machine, sink) = machine(200);
        machine.start();
        machine.handle_key(KeyPress::Char('F'));
        assert_eq!(sink.frequencies(), vec![1000.0]);
        machine.stop();
    }

    #[test]
    fn repeated_presses_each_emit() {
        let (mut machine, sink) = machine(120);
        for _ in 0..3 {
            machine.handle_key(KeyPress::Char('q'));
        }
        assert_eq!(sink.frequencies(), vec![80.0; 3]);
    }

    #[test]
    fn held_instrument_key_replays_on_repeat() {
        let (mut machine, sink) = machine(120);
        machine.handle_key(KeyPress::Char('e'));
        for _ in 0..2 {
            assert!(!machine.handle_key_repeat(KeyPress::Char('e')));
        }
        assert_eq!(sink.frequencies(), vec![150.0; 3]);
    }

    #[test]
    fn held_space_does_not_flap_transport() {
        let (mut machine, _) = machine(120);
        assert!(machine.handle_key(KeyPress::Space));
        assert!(machine.handle_key_repeat(KeyPress::Space));
        assert!(machine.handle_key_repeat(KeyPress::Space));
        assert!(machine.is_running());
        machine.stop();
    }

    #[test]
    fn settings_survive_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        let (mut machine, _) = machine(120);
        machine.load_preset(presets::find("Trance").unwrap());
        machine.write_settings(&mut config);
        crate::config::save_to(&config, &path).unwrap();
        assert_eq!(crate::config::load_from(&path).sequencer.tempo().bpm(), 180);
    }

    #[test]
    fn space_toggles_transport() {
        let (mut machine, sink) = machine(120);
        assert!(machine.handle_key(KeyPress::Space));
        assert!(machine.is_running());
        assert!(machine.snapshot().unwrap().running);
        assert!(machine.handle_key(KeyPress::Space));
        assert!(!machine.is_running());
        assert!(!machine.handle_key(KeyPress::Other));
        assert!(sink.frequencies().is_empty());
    }

    #[test]
    fn stop_resets_step() {
        let (mut machine, _) = machine(200);
        machine.start();
        thread::sleep(Duration::from_millis(400));
        machine.poll();
        assert_ne!(machine.current_step(), 0);
        machine.stop();
        assert_eq!(machine.current_step(), 0);
        assert_eq!(machine.snapshot().unwrap().current_step, 0);
    }
}
