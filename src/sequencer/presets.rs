/// Built-in rhythm templates
use super::{Pattern, Tempo};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub tempo: Tempo,
    pub pattern: Pattern,
}

pub static PRESETS: [Preset; 3] = [
    Preset {
        name: "Heartbeat",
        description: "Grounding 60 BPM",
        tempo: Tempo(60),
        pattern: Pattern::from_rows([
            [1, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 1, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
        ]),
    },
    Preset {
        name: "Journey",
        description: "Shamanic 120 BPM",
        tempo: Tempo(120),
        pattern: Pattern::from_rows([
            [1, 0, 0, 0, 1, 0, 0, 0],
            [0, 0, 1, 0, 0, 0, 1, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [1, 1, 1, 1, 1, 1, 1, 1],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [1, 0, 1, 0, 1, 0, 1, 0],
            [0, 0, 0, 1, 0, 0, 0, 1],
        ]),
    },
    Preset {
        name: "Trance",
        description: "Deep journey 180 BPM",
        tempo: Tempo(180),
        pattern: Pattern::from_rows([
            [1, 0, 1, 0, 1, 0, 1, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0, 0],
            [1, 1, 1, 1, 1, 1, 1, 1],
            [0, 0, 0, 0, 1, 0, 0, 0],
            [1, 0, 0, 1, 0, 0, 1, 0],
            [0, 1, 0, 0, 0, 1, 0, 0],
        ]),
    },
];

/// Find a preset by name, ignoring case
pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{MAX_BPM, MIN_BPM};

    #[test]
    fn presets_have_in_range_tempos() {
        for preset in &PRESETS {
            assert!((MIN_BPM..=MAX_BPM).contains(&preset.tempo.bpm()));
        }
    }

    #[test]
    fn heartbeat_layout() {
        let heartbeat = find("heartbeat").unwrap();
        assert_eq!(heartbeat.tempo.bpm(), 60);
        assert_eq!(heartbeat.pattern.active_count(), 2);
        assert!(heartbeat.pattern.get(0, 0).unwrap());
        assert!(heartbeat.pattern.get(1, 4).unwrap());
    }

    #[test]
    fn unknown_preset() {
        assert!(find("Polka").is_none());
    }
}
