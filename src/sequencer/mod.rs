/// Core sequencer logic - instruments, pattern grid and tempo
/// The grid is fixed at 8 instruments by 8 eighth-note steps
use std::fmt;
use std::time::Duration;

pub mod playback;
pub mod presets;
pub mod transport;

pub const TRACKS: usize = 8;
pub const STEPS: usize = 8;

pub const MIN_BPM: u16 = 40;
pub const MAX_BPM: u16 = 200;
pub const DEFAULT_BPM: u16 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instrument {
    pub id: &'static str,
    pub name: &'static str,
    pub key: char,
    pub color: Rgb,
    pub frequency_hz: f32,
}

pub static INSTRUMENTS: [Instrument; TRACKS] = [
    Instrument { id: "kick", name: "Bass", key: 'Q', color: Rgb(0xef, 0x44, 0x44), frequency_hz: 80.0 },
    Instrument { id: "snare", name: "Snare", key: 'W', color: Rgb(0xf9, 0x73, 0x16), frequency_hz: 200.0 },
    Instrument { id: "tom1", name: "Tom 1", key: 'E', color: Rgb(0xea, 0xb3, 0x08), frequency_hz: 150.0 },
    Instrument { id: "tom2", name: "Tom 2", key: 'R', color: Rgb(0x22, 0xc5, 0x5e), frequency_hz: 120.0 },
    Instrument { id: "hihat", name: "Hi-Hat", key: 'A', color: Rgb(0x3b, 0x82, 0xf6), frequency_hz: 800.0 },
    Instrument { id: "crash", name: "Crash", key: 'S', color: Rgb(0x8b, 0x5c, 0xf6), frequency_hz: 600.0 },
    Instrument { id: "frame", name: "Frame", key: 'D', color: Rgb(0xec, 0x48, 0x99), frequency_hz: 300.0 },
    Instrument { id: "shaker", name: "Shaker", key: 'F', color: Rgb(0x14, 0xb8, 0xa6), frequency_hz: 1000.0 },
];

/// Look up the instrument bound to a trigger key, ignoring case.
pub fn instrument_for_key(key: char) -> Option<usize> {
    let key = key.to_ascii_uppercase();
    INSTRUMENTS.iter().position(|inst| inst.key == key)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("cell ({instrument}, {step}) is outside the 8x8 grid")]
    OutOfBounds { instrument: usize, step: usize },
}

/// On/off grid indexed by instrument row then step column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pattern {
    cells: [[bool; STEPS]; TRACKS],
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pattern from 0/1 rows, any non-zero cell is on.
    pub const fn from_rows(rows: [[u8; STEPS]; TRACKS]) -> Self {
        let mut cells = [[false; STEPS]; TRACKS];
        let mut y = 0;
        while y < TRACKS {
            let mut x = 0;
            while x < STEPS {
                cells[y][x] = rows[y][x] != 0;
                x += 1;
            }
            y += 1;
        }
        Self { cells }
    }

    fn check(instrument: usize, step: usize) -> Result<(), PatternError> {
        if instrument < TRACKS && step < STEPS {
            Ok(())
        } else {
            Err(PatternError::OutOfBounds { instrument, step })
        }
    }

    pub fn get(&self, instrument: usize, step: usize) -> Result<bool, PatternError> {
        Self::check(instrument, step)?;
        Ok(self.cells[instrument][step])
    }

    pub fn set(&mut self, instrument: usize, step: usize, value: bool) -> Result<(), PatternError> {
        Self::check(instrument, step)?;
        self.cells[instrument][step] = value;
        Ok(())
    }

    /// Flip one cell and return its new value
    pub fn toggle(&mut self, instrument: usize, step: usize) -> Result<bool, PatternError> {
        Self::check(instrument, step)?;
        let cell = &mut self.cells[instrument][step];
        *cell = !*cell;
        Ok(*cell)
    }

    pub fn replace(&mut self, pattern: Pattern) {
        *self = pattern;
    }

    pub fn clear(&mut self) {
        self.cells = [[false; STEPS]; TRACKS];
    }

    pub fn row(&self, instrument: usize) -> Option<&[bool; STEPS]> {
        self.cells.get(instrument)
    }

    /// Instruments switched on in one step column, in instrument order
    pub fn active_at(&self, step: usize) -> impl Iterator<Item = usize> + '_ {
        (0..TRACKS).filter(move |&y| step < STEPS && self.cells[y][step])
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&on| on).count()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TempoError {
    #[error("tempo {0:?} is not a number")]
    NotANumber(String),
}

/// Beats per minute, always within [MIN_BPM, MAX_BPM]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tempo(u16);

impl Tempo {
    /// Clamp any integer into range
    pub fn clamped(bpm: i64) -> Self {
        Self(bpm.clamp(MIN_BPM as i64, MAX_BPM as i64) as u16)
    }

    /// Clamp a slider value, rounding to whole beats. NaN and infinities are
    /// rejected.
    pub fn from_f32(bpm: f32) -> Result<Self, TempoError> {
        if !bpm.is_finite() {
            return Err(TempoError::NotANumber(bpm.to_string()));
        }
        Ok(Self::clamped(bpm.round() as i64))
    }

    /// Parse text typed into the tempo field
    pub fn parse(input: &str) -> Result<Self, TempoError> {
        let trimmed = input.trim();
        if let Ok(bpm) = trimmed.parse::<i64>() {
            return Ok(Self::clamped(bpm));
        }
        trimmed
            .parse::<f32>()
            .map_err(|_| TempoError::NotANumber(input.to_string()))
            .and_then(Self::from_f32)
    }

    pub fn bpm(self) -> u16 {
        self.0
    }

    /// Eighth-note step duration, `60 / bpm / 2` seconds
    pub fn step_interval(self) -> Duration {
        step_interval(self)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(DEFAULT_BPM)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

pub fn step_interval(tempo: Tempo) -> Duration {
    // 30 / bpm seconds, computed in nanoseconds to stay exact for integer tempos
    Duration::from_nanos(30_000_000_000 / tempo.bpm() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_keys_are_case_insensitive() {
        assert_eq!(instrument_for_key('q'), Some(0));
        assert_eq!(instrument_for_key('Q'), Some(0));
        assert_eq!(instrument_for_key('f'), Some(7));
        assert_eq!(instrument_for_key('z'), None);
    }

    #[test]
    fn test_pattern_toggle_twice_restores() {
        let mut pattern = Pattern::new();
        for y in 0..TRACKS {
            for x in 0..STEPS {
                let before = pattern.get(y, x).unwrap();
                pattern.toggle(y, x).unwrap();
                assert_ne!(pattern.get(y, x).unwrap(), before);
                pattern.toggle(y, x).unwrap();
                assert_eq!(pattern.get(y, x).unwrap(), before);
            }
        }
    }

    #[test]
    fn test_pattern_clear() {
        let mut pattern = Pattern::from_rows([[1; STEPS]; TRACKS]);
        assert_eq!(pattern.active_count(), 64);
        pattern.clear();
        for y in 0..TRACKS {
            for x in 0..STEPS {
                assert!(!pattern.get(y, x).unwrap());
            }
        }
    }

    #[test]
    fn test_pattern_rejects_out_of_bounds() {
        let mut pattern = Pattern::new();
        assert_eq!(
            pattern.toggle(8, 0),
            Err(PatternError::OutOfBounds { instrument: 8, step: 0 })
        );
        assert!(pattern.set(0, 8, true).is_err());
        assert!(pattern.get(9, 9).is_err());
        assert_eq!(pattern, Pattern::new());
    }

    #[test]
    fn test_active_at_column() {
        let mut pattern = Pattern::new();
        pattern.set(0, 3, true).unwrap();
        pattern.set(5, 3, true).unwrap();
        pattern.set(5, 4, true).unwrap();
        assert_eq!(pattern.active_at(3).collect::<Vec<_>>(), vec![0, 5]);
        assert_eq!(pattern.active_at(8).count(), 0);
    }

    #[test]
    fn test_tempo_clamps_at_boundary() {
        assert_eq!(Tempo::clamped(10).bpm(), MIN_BPM);
        assert_eq!(Tempo::clamped(500).bpm(), MAX_BPM);
        assert_eq!(Tempo::parse(" 90 ").unwrap().bpm(), 90);
        assert_eq!(Tempo::parse("250.6").unwrap().bpm(), MAX_BPM);
        assert_eq!(Tempo::from_f32(99.6).unwrap().bpm(), 100);
        assert!(matches!(Tempo::parse("fast"), Err(TempoError::NotANumber(_))));
        assert!(Tempo::from_f32(f32::NAN).is_err());
    }

    #[test]
    fn test_tempo_rejects_infinity() {
        assert!(matches!(Tempo::parse("inf"), Err(TempoError::NotANumber(_))));
        assert!(matches!(Tempo::parse("-Infinity"), Err(TempoError::NotANumber(_))));
        assert!(Tempo::from_f32(f32::INFINITY).is_err());
    }

    #[test]
    fn test_step_interval_matches_formula() {
        for bpm in MIN_BPM..=MAX_BPM {
            let expected = 60.0 / bpm as f64 / 2.0;
            let actual = step_interval(Tempo::clamped(bpm as i64)).as_secs_f64();
            assert!((actual - expected).abs() < 1e-9, "bpm {bpm}");
        }
        assert_eq!(step_interval(Tempo::clamped(40)), Duration::from_millis(750));
        assert_eq!(step_interval(Tempo::clamped(200)), Duration::from_millis(150));
    }
}
