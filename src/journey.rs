/// Guided drum journey - pick an intention, settle in, then a timed session
/// paced by a four-phase breathing cycle
///
/// The state machine is pure: the host feeds it elapsed wall time through
/// `tick` and draws whatever it reports.
use crate::sequencer::Rgb;
use std::fmt;
use std::time::Duration;

/// Countdown between "Begin" and the session proper
pub const PREPARE_TIME: Duration = Duration::from_secs(3);
pub const SESSION_LENGTH: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intention {
    Healing,
    Clarity,
    Energy,
    Peace,
}

impl Intention {
    pub const ALL: [Intention; 4] = [
        Intention::Healing,
        Intention::Clarity,
        Intention::Energy,
        Intention::Peace,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Intention::Healing => "Healing",
            Intention::Clarity => "Clarity",
            Intention::Energy => "Energy",
            Intention::Peace => "Peace",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Intention::Healing => "Release what no longer serves you and invite restoration",
            Intention::Clarity => "Clear the mental fog and find your inner wisdom",
            Intention::Energy => "Awaken your vitality and ignite your inner fire",
            Intention::Peace => "Settle into stillness and embrace deep calm",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Intention::Healing => "💚",
            Intention::Clarity => "💎",
            Intention::Energy => "🔥",
            Intention::Peace => "🕊",
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            Intention::Healing => Rgb(0x22, 0xc5, 0x5e),
            Intention::Clarity => Rgb(0x3b, 0x82, 0xf6),
            Intention::Energy => Rgb(0xf9, 0x73, 0x16),
            Intention::Peace => Rgb(0xa8, 0x55, 0xf7),
        }
    }
}

impl fmt::Display for Intention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathPhase {
    In,
    Hold,
    Out,
    Rest,
}

impl BreathPhase {
    pub fn label(self) -> &'static str {
        match self {
            BreathPhase::In => "Breathe In",
            BreathPhase::Hold => "Hold",
            BreathPhase::Out => "Breathe Out",
            BreathPhase::Rest => "Rest",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            BreathPhase::In | BreathPhase::Out => Duration::from_millis(4000),
            BreathPhase::Hold | BreathPhase::Rest => Duration::from_millis(2000),
        }
    }

    pub fn next(self) -> Self {
        match self {
            BreathPhase::In => BreathPhase::Hold,
            BreathPhase::Hold => BreathPhase::Out,
            BreathPhase::Out => BreathPhase::Rest,
            BreathPhase::Rest => BreathPhase::In,
        }
    }

    /// Relative size of the breathing circle: expanded while the lungs are full
    pub fn scale(self) -> f32 {
        match self {
            BreathPhase::In | BreathPhase::Hold => 1.3,
            BreathPhase::Out | BreathPhase::Rest => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Select,
    Prepare,
    Journey,
    Complete,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JourneyError {
    #[error("choose an intention first")]
    NoIntention,
    #[error("not available while in the {0:?} stage")]
    WrongStage(Stage),
}

#[derive(Debug, Clone)]
pub struct Journey {
    stage: Stage,
    intention: Option<Intention>,
    playing: bool,
    prepare_left: Duration,
    elapsed: Duration,
    breath: BreathPhase,
    breath_elapsed: Duration,
}

impl Journey {
    pub fn new() -> Self {
        Self {
            stage: Stage::Select,
            intention: None,
            playing: false,
            prepare_left: PREPARE_TIME,
            elapsed: Duration::ZERO,
            breath: BreathPhase::In,
            breath_elapsed: Duration::ZERO,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn intention(&self) -> Option<Intention> {
        self.intention
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Session time so far, never past `SESSION_LENGTH`
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn prepare_remaining(&self) -> Duration {
        self.prepare_left
    }

    pub fn breath_phase(&self) -> BreathPhase {
        self.breath
    }

    /// Fraction of the current breath phase completed, in [0, 1]
    pub fn breath_progress(&self) -> f32 {
        let progress = self.breath_elapsed.as_secs_f32() / self.breath.duration().as_secs_f32();
        progress.clamp(0.0, 1.0)
    }

    pub fn select(&mut self, intention: Intention) -> Result<(), JourneyError> {
        if self.stage != Stage::Select {
            return Err(JourneyError::WrongStage(self.stage));
        }
        self.intention = Some(intention);
        Ok(())
    }

    /// Leave intention selection and start the settling countdown
    pub fn begin(&mut self) -> Result<(), JourneyError> {
        if self.stage != Stage::Select {
            return Err(JourneyError::WrongStage(self.stage));
        }
        let intention = self.intention.ok_or(JourneyError::NoIntention)?;
        self.stage = Stage::Prepare;
        self.prepare_left = PREPARE_TIME;
        tracing::info!(%intention, "journey beginning");
        Ok(())
    }

    /// Pause or resume the session clock, returns whether it is now running
    pub fn toggle_pause(&mut self) -> Result<bool, JourneyError> {
        if self.stage != Stage::Journey {
            return Err(JourneyError::WrongStage(self.stage));
        }
        self.playing = !self.playing;
        Ok(self.playing)
    }

    pub fn end_early(&mut self) -> Result<(), JourneyError> {
        if self.stage != Stage::Journey {
            return Err(JourneyError::WrongStage(self.stage));
        }
        self.complete();
        Ok(())
    }

    /// Back to intention selection with everything cleared
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance by `elapsed` wall time. Time left over when the countdown
    /// finishes carries into the session.
    pub fn tick(&mut self, elapsed: Duration) {
        match self.stage {
            Stage::Prepare => {
                if elapsed < self.prepare_left {
                    self.prepare_left -= elapsed;
                    return;
                }
                let carry = elapsed - self.prepare_left;
                self.prepare_left = Duration::ZERO;
                self.stage = Stage::Journey;
                self.playing = true;
                self.advance(carry);
            }
            Stage::Journey if self.playing => self.advance(elapsed),
            _ => {}
        }
    }

    fn advance(&mut self, elapsed: Duration) {
        let step = elapsed.min(SESSION_LENGTH - self.elapsed);
        self.elapsed += step;

        self.breath_elapsed += step;
        while self.breath_elapsed >= self.breath.duration() {
            self.breath_elapsed -= self.breath.duration();
            self.breath = self.breath.next();
        }

        if self.elapsed >= SESSION_LENGTH {
            self.complete();
        }
    }

    fn complete(&mut self) {
        self.playing = false;
        self.stage = Stage::Complete;
        tracing::info!(elapsed = %format_clock(self.elapsed), "journey complete");
    }
}

impl Default for Journey {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole seconds as `m:ss`
pub fn format_clock(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
