/// Playback engine - owns transport, pattern and tempo on one worker thread
///
/// Every mutation reaches the worker as a `Command`, so a tick always sees a
/// whole pattern. The step timer is a deadline held only by the worker.
use super::transport::Transport;
use super::{Pattern, Tempo};
use crate::audio::ToneEmitter;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    Stopped,
    StepAdvanced(usize),
    Triggered(usize),
    TempoChanged(Tempo),
}

/// Consistent view of the worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub running: bool,
    pub current_step: usize,
    pub tempo: Tempo,
    pub pattern: Pattern,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("failed to spawn transport thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("transport thread is gone")]
    Disconnected,
}

enum Command {
    Start,
    Stop(Sender<()>),
    Toggle(Sender<bool>),
    SetTempo(Tempo),
    ToggleCell(usize, usize),
    Replace(Pattern),
    Clear,
    Load(Pattern, Tempo),
    Snapshot(Sender<Snapshot>),
    Shutdown,
}

pub struct PlaybackEngine {
    commands: Sender<Command>,
    events: Receiver<PlaybackEvent>,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    pub fn new(tempo: Tempo, emitter: Arc<ToneEmitter>) -> Result<Self, PlaybackError> {
        let (commands, command_rx) = unbounded();
        let (event_tx, events) = bounded(EVENT_CAPACITY);

        let worker = Worker {
            transport: Transport::new(),
            pattern: Pattern::new(),
            tempo,
            deadline: None,
            emitter,
            events: event_tx,
        };
        let handle = thread::Builder::new()
            .name("rhythm-transport".into())
            .spawn(move || worker.run(command_rx))?;

        Ok(Self {
            commands,
            events,
            worker: Some(handle),
        })
    }

    fn send(&self, command: Command) -> Result<(), PlaybackError> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::Disconnected)
    }

    /// Start ticking. A no-op while already running.
    pub fn start(&self) -> Result<(), PlaybackError> {
        self.send(Command::Start)
    }

    /// Stop and reset the cursor. Returns once the worker has cancelled its
    /// timer, so no tick fires after this call.
    pub fn stop(&self) -> Result<(), PlaybackError> {
        let (ack, done) = bounded(1);
        self.send(Command::Stop(ack))?;
        done.recv().map_err(|_| PlaybackError::Disconnected)
    }

    /// Flip between running and stopped, returns the new running state
    pub fn toggle(&self) -> Result<bool, PlaybackError> {
        let (reply, answer) = bounded(1);
        self.send(Command::Toggle(reply))?;
        answer.recv().map_err(|_| PlaybackError::Disconnected)
    }

    pub fn set_tempo(&self, tempo: Tempo) -> Result<(), PlaybackError> {
        self.send(Command::SetTempo(tempo))
    }

    /// Coordinates must already be bounds-checked by the caller
    pub fn toggle_cell(&self, instrument: usize, step: usize) -> Result<(), PlaybackError> {
        self.send(Command::ToggleCell(instrument, step))
    }

    pub fn replace_pattern(&self, pattern: Pattern) -> Result<(), PlaybackError> {
        self.send(Command::Replace(pattern))
    }

    pub fn clear(&self) -> Result<(), PlaybackError> {
        self.send(Command::Clear)
    }

    /// Swap pattern and tempo in one step without touching transport state
    pub fn load(&self, pattern: Pattern, tempo: Tempo) -> Result<(), PlaybackError> {
        self.send(Command::Load(pattern, tempo))
    }

    pub fn snapshot(&self) -> Result<Snapshot, PlaybackError> {
        let (reply, answer) = bounded(1);
        self.send(Command::Snapshot(reply))?;
        answer.recv().map_err(|_| PlaybackError::Disconnected)
    }

    pub fn events(&self) -> &Receiver<PlaybackEvent> {
        &self.events
    }

    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        self.events.try_iter().collect()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("transport thread panicked");
            }
        }
    }
}

struct Worker {
    transport: Transport,
    pattern: Pattern,
    tempo: Tempo,
    deadline: Option<Instant>,
    emitter: Arc<ToneEmitter>,
    events: Sender<PlaybackEvent>,
}

impl Worker {
    fn run(mut self, commands: Receiver<Command>) {
        loop {
            let command = match self.deadline {
                Some(deadline) => match commands.recv_deadline(deadline) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
            };

            match command {
                None => self.tick(),
                Some(Command::Shutdown) => break,
                Some(command) => self.handle(command),
            }
        }
        self.deadline = None;
        tracing::debug!("transport thread exiting");
    }

    fn publish(&self, event: PlaybackEvent) {
        // Drop events nobody is reading rather than grow without bound
        let _ = self.events.try_send(event);
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Stop(ack) => {
                self.stop();
                let _ = ack.send(());
            }
            Command::Toggle(reply) => {
                if self.transport.is_running() {
                    self.stop();
                } else {
                    self.start();
                }
                let _ = reply.send(self.transport.is_running());
            }
            Command::SetTempo(tempo) => self.set_tempo(tempo),
            Command::ToggleCell(instrument, step) => {
                if let Err(err) = self.pattern.toggle(instrument, step) {
                    tracing::warn!("{}", err);
                }
            }
            Command::Replace(pattern) => self.pattern.replace(pattern),
            Command::Clear => self.pattern.clear(),
            Command::Load(pattern, tempo) => {
                self.pattern.replace(pattern);
                self.set_tempo(tempo);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(Snapshot {
                    running: self.transport.is_running(),
                    current_step: self.transport.current_step(),
                    tempo: self.tempo,
                    pattern: self.pattern,
                });
            }
            Command::Shutdown => {}
        }
    }

    fn start(&mut self) {
        if !self.transport.start() {
            return;
        }
        // First tick lands one interval after start
        self.deadline = Some(Instant::now() + self.tempo.step_interval());
        tracing::info!(tempo = self.tempo.bpm(), "transport started");
        self.publish(PlaybackEvent::Started);
    }

    fn stop(&mut self) {
        self.deadline = None;
        if self.transport.stop() {
            tracing::info!("transport stopped");
            self.publish(PlaybackEvent::Stopped);
        }
    }

    fn set_tempo(&mut self, tempo: Tempo) {
        if tempo == self.tempo {
            return;
        }
        self.tempo = tempo;
        // Reschedule at the new rate instead of waiting out the old interval
        if self.transport.is_running() {
            self.deadline = Some(Instant::now() + tempo.step_interval());
        }
        tracing::debug!(tempo = tempo.bpm(), "tempo changed");
        self.publish(PlaybackEvent::TempoChanged(tempo));
    }

    fn tick(&mut self) {
        let Some(step) = self.transport.tick() else {
            self.deadline = None;
            return;
        };
        for instrument in self.pattern.active_at(step) {
            self.emitter.trigger(instrument);
            self.publish(PlaybackEvent::Triggered(instrument));
        }
        // Published after the step's tones have gone out
        self.publish(PlaybackEvent::StepAdvanced(step));

        let interval = self.tempo.step_interval();
        let now = Instant::now();
        let next = self.deadline.unwrap_or(now) + interval;
        // Don't burst to catch up if we fell behind
        self.deadline = Some(if next <= now { now + interval } else { next });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::RecordingSink;
    use crate::sequencer::presets;
    use std::time::Duration;

    fn engine_with_sink(tempo: Tempo) -> (PlaybackEngine, Arc<RecordingSink>) {
        let emitter = Arc::new(ToneEmitter::new(
            Duration::from_millis(150),
            Duration::from_millis(100),
        ));
        let sink = Arc::new(RecordingSink::default());
        emitter.attach(sink.clone());
        (PlaybackEngine::new(tempo, emitter).unwrap(), sink)
    }

    #[test]
    fn initial_snapshot() {
        let (engine, _) = engine_with_sink(Tempo::default());
        let snapshot = engine.snapshot().unwrap();
        assert!(!snapshot.running);
        assert_eq!(snapshot.current_step, 0);
        assert_eq!(snapshot.tempo.bpm(), 120);
        assert_eq!(snapshot.pattern, Pattern::new());
    }

    #[test]
    fn load_replaces_pattern_and_tempo() {
        let (engine, _) = engine_with_sink(Tempo::default());
        engine.toggle_cell(7, 7).unwrap();
        let journey = presets::find("Journey").unwrap();
        engine.load(journey.pattern, journey.tempo).unwrap();
        let snapshot = engine.snapshot().unwrap();
        assert_eq!(snapshot.pattern, journey.pattern);
        assert_eq!(snapshot.tempo, journey.tempo);
        assert!(!snapshot.running);
    }

    #[test]
    fn toggle_cell_and_clear() {
        let (engine, _) = engine_with_sink(Tempo::default());
        engine.toggle_cell(2, 5).unwrap();
        assert!(engine.snapshot().unwrap().pattern.get(2, 5).unwrap());
        engine.clear().unwrap();
        assert_eq!(engine.snapshot().unwrap().pattern.active_count(), 0);
    }

    #[test]
    fn out_of_range_cell_is_ignored() {
        let (engine, _) = engine_with_sink(Tempo::default());
        engine.toggle_cell(8, 8).unwrap();
        assert_eq!(engine.snapshot().unwrap().pattern, Pattern::new());
    }

    #[test]
    fn toggle_reports_running_state() {
        let (engine, _) = engine_with_sink(Tempo::clamped(40));
        assert!(engine.toggle().unwrap());
        assert!(engine.snapshot().unwrap().running);
        assert!(!engine.toggle().unwrap());
        assert!(!engine.snapshot().unwrap().running);
    }

    #[test]
    fn start_does_not_sound_step_zero_immediately() {
        let (engine, sink) = engine_with_sink(Tempo::clamped(40));
        engine.replace_pattern(Pattern::from_rows([[1; 8]; 8])).unwrap();
        engine.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(sink.frequencies().is_empty());
        engine.stop().unwrap();
    }

    #[test]
    fn drop_stops_the_worker() {
        let (engine, sink) = engine_with_sink(Tempo::clamped(200));
        engine.replace_pattern(Pattern::from_rows([[1; 8]; 8])).unwrap();
        engine.start().unwrap();
        drop(engine);
        let count = sink.frequencies().len();
        thread::sleep(Duration::from_millis(400));
        assert_eq!(sink.frequencies().len(), count);
    }
}
