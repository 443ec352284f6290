/// Key routing for the pads and transport
use crate::sequencer::instrument_for_key;

/// Raw key press, independent of the windowing toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Char(char),
    Space,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// One-shot hit, whether or not the sequencer is running
    Play(usize),
    /// Start/stop; the host must swallow the key's default effect
    ToggleTransport,
}

impl InputAction {
    pub fn suppresses_default(self) -> bool {
        matches!(self, InputAction::ToggleTransport)
    }
}

/// Map a key press to an action. Unbound keys return None.
pub fn route(key: KeyPress) -> Option<InputAction> {
    match key {
        KeyPress::Space | KeyPress::Char(' ') => Some(InputAction::ToggleTransport),
        KeyPress::Char(c) => instrument_for_key(c).map(InputAction::Play),
        KeyPress::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::INSTRUMENTS;

    #[test]
    fn every_instrument_key_routes_in_both_cases() {
        for (i, inst) in INSTRUMENTS.iter().enumerate() {
            assert_eq!(route(KeyPress::Char(inst.key)), Some(InputAction::Play(i)));
            let lower = inst.key.to_ascii_lowercase();
            assert_eq!(route(KeyPress::Char(lower)), Some(InputAction::Play(i)));
        }
    }

    #[test]
    fn space_toggles_and_suppresses() {
        let action = route(KeyPress::Space).unwrap();
        assert_eq!(action, InputAction::ToggleTransport);
        assert!(action.suppresses_default());
        assert_eq!(route(KeyPress::Char(' ')), Some(InputAction::ToggleTransport));
        assert!(!InputAction::Play(0).suppresses_default());
    }

    #[test]
    fn other_keys_are_ignored() {
        assert_eq!(route(KeyPress::Char('z')), None);
        assert_eq!(route(KeyPress::Char('1')), None);
        assert_eq!(route(KeyPress::Other), None);
    }
}
