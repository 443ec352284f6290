/// Transport state machine - step cursor and running flag
///
/// A tick sounds the column it advances to, so the first tick after
/// `start` sounds step 1 and step 0 first sounds on the eighth tick.
use super::STEPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

#[derive(Debug, Clone)]
pub struct Transport {
    state: TransportState,
    current_step: usize,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            current_step: 0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TransportState::Running
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Returns false if the transport was already running
    pub fn start(&mut self) -> bool {
        match self.state {
            TransportState::Stopped => {
                self.state = TransportState::Running;
                true
            }
            TransportState::Running => false,
        }
    }

    /// Returns false if the transport was already stopped
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        self.state = TransportState::Stopped;
        self.current_step = 0;
        was_running
    }

    /// Advance the cursor one step. Returns the new step, or None while stopped.
    pub fn tick(&mut self) -> Option<usize> {
        match self.state {
            TransportState::Running => {
                self.current_step = (self.current_step + 1) % STEPS;
                Some(self.current_step)
            }
            TransportState::Stopped => None,
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped_at_step_zero() {
        let transport = Transport::new();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.current_step(), 0);
    }

    #[test]
    fn tick_does_nothing_while_stopped() {
        let mut transport = Transport::new();
        assert_eq!(transport.tick(), None);
        assert_eq!(transport.current_step(), 0);
    }

    #[test]
    fn cycles_through_all_steps() {
        let mut transport = Transport::new();
        transport.start();
        let steps: Vec<usize> = (0..20).filter_map(|_| transport.tick()).collect();
        assert_eq!(
            steps,
            vec![1, 2, 3, 4, 5, 6, 7, 0, 1, 2, 3, 4, 5, 6, 7, 0, 1, 2, 3, 4]
        );
        for pair in steps.windows(2) {
            assert_eq!(pair[1], (pair[0] + 1) % STEPS);
        }
    }

    #[test]
    fn second_start_is_a_no_op() {
        let mut transport = Transport::new();
        assert!(transport.start());
        transport.tick();
        assert!(!transport.start());
        assert_eq!(transport.current_step(), 1);
    }

    #[test]
    fn stop_resets_cursor() {
        let mut transport = Transport::new();
        transport.start();
        transport.tick();
        transport.tick();
        assert!(transport.stop());
        assert_eq!(transport.current_step(), 0);
        assert!(!transport.stop());
        assert_eq!(transport.tick(), None);
    }
}
