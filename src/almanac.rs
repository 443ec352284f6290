/// Moon-phase almanac
///
/// Closed-form approximation: days since a reference new moon, modulo a
/// 29.53 day synodic month, split into eight equal phases.
use chrono::{Duration, NaiveDate};
use std::f64::consts::PI;
use std::fmt;

pub const SYNODIC_MONTH_DAYS: f64 = 29.53;
/// Forward search window for `upcoming_moons`
const SEARCH_DAYS: i64 = 30;

fn reference_new_moon() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 6).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

pub const PHASES: [MoonPhase; 8] = [
    MoonPhase::NewMoon,
    MoonPhase::WaxingCrescent,
    MoonPhase::FirstQuarter,
    MoonPhase::WaxingGibbous,
    MoonPhase::FullMoon,
    MoonPhase::WaningGibbous,
    MoonPhase::LastQuarter,
    MoonPhase::WaningCrescent,
];

impl MoonPhase {
    pub fn name(self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::FullMoon => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "🌑",
            MoonPhase::WaxingCrescent => "🌒",
            MoonPhase::FirstQuarter => "🌓",
            MoonPhase::WaxingGibbous => "🌔",
            MoonPhase::FullMoon => "🌕",
            MoonPhase::WaningGibbous => "🌖",
            MoonPhase::LastQuarter => "🌗",
            MoonPhase::WaningCrescent => "🌘",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "Time for new beginnings and setting intentions",
            MoonPhase::WaxingCrescent => "Your intentions are taking root",
            MoonPhase::FirstQuarter => "Take action on your goals",
            MoonPhase::WaxingGibbous => "Refine and adjust your path",
            MoonPhase::FullMoon => "Celebrate and release what no longer serves",
            MoonPhase::WaningGibbous => "Share your wisdom and gratitude",
            MoonPhase::LastQuarter => "Let go and forgive",
            MoonPhase::WaningCrescent => "Rest and reflect before renewal",
        }
    }

    pub fn ceremony(self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "Perfect for intention-setting ceremonies",
            MoonPhase::WaxingCrescent => "Ideal for growth and manifestation work",
            MoonPhase::FirstQuarter => "Good for empowerment ceremonies",
            MoonPhase::WaxingGibbous => "Focus on refinement rituals",
            MoonPhase::FullMoon => "Powerful for release ceremonies",
            MoonPhase::WaningGibbous => "Time for gratitude practices",
            MoonPhase::LastQuarter => "Ideal for forgiveness rituals",
            MoonPhase::WaningCrescent => "Best for meditation and rest",
        }
    }
}

impl fmt::Display for MoonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonData {
    pub phase: MoonPhase,
    /// Percent lit, 0-100
    pub illumination: u8,
    /// Whole days into the cycle
    pub age_days: u32,
}

/// Fractional cycle age for a date, always in [0, SYNODIC_MONTH_DAYS)
pub fn moon_age(date: NaiveDate) -> f64 {
    let days = (date - reference_new_moon()).num_days() as f64;
    days.rem_euclid(SYNODIC_MONTH_DAYS)
}

pub fn moon_phase(date: NaiveDate) -> MoonData {
    let age = moon_age(date);
    let fraction = age / SYNODIC_MONTH_DAYS;
    let illumination = ((1.0 - (fraction * 2.0 * PI).cos()) * 50.0).round();
    let index = (fraction * 8.0).floor() as usize % PHASES.len();

    MoonData {
        phase: PHASES[index],
        illumination: illumination.clamp(0.0, 100.0) as u8,
        age_days: age.round() as u32,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingMoon {
    pub date: NaiveDate,
    pub phase: MoonPhase,
}

fn next_phase(today: NaiveDate, phase: MoonPhase) -> Option<NaiveDate> {
    (1..SEARCH_DAYS)
        .map(|offset| today + Duration::days(offset))
        .find(|&date| moon_phase(date).phase == phase)
}

/// Next New Moon and next Full Moon strictly after `today`, soonest first
pub fn upcoming_moons(today: NaiveDate) -> Vec<UpcomingMoon> {
    let mut moons: Vec<UpcomingMoon> = [MoonPhase::NewMoon, MoonPhase::FullMoon]
        .into_iter()
        .filter_map(|phase| next_phase(today, phase).map(|date| UpcomingMoon { date, phase }))
        .collect();
    moons.sort_by_key(|m| m.date);
    moons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reference_date_is_new_moon() {
        let data = moon_phase(ymd(2000, 1, 6));
        assert_eq!(data.phase, MoonPhase::NewMoon);
        assert_eq!(data.illumination, 0);
        assert_eq!(data.age_days, 0);
    }

    #[test]
    fn mid_cycle_is_full() {
        let data = moon_phase(ymd(2000, 1, 21));
        assert_eq!(data.phase, MoonPhase::FullMoon);
        assert_eq!(data.illumination, 100);
        assert_eq!(data.age_days, 15);
    }

    #[test]
    fn dates_before_reference_wrap() {
        let data = moon_phase(ymd(2000, 1, 5));
        assert_eq!(data.phase, MoonPhase::WaningCrescent);
        assert!((moon_age(ymd(2000, 1, 5)) - 28.53).abs() < 1e-9);
    }

    #[test]
    fn age_stays_in_range() {
        let mut date = ymd(1990, 1, 1);
        for _ in 0..2000 {
            let age = moon_age(date);
            assert!((0.0..SYNODIC_MONTH_DAYS).contains(&age));
            date += Duration::days(7);
        }
    }

    #[test]
    fn upcoming_from_reference() {
        let moons = upcoming_moons(ymd(2000, 1, 6));
        assert_eq!(
            moons,
            vec![
                UpcomingMoon { date: ymd(2000, 1, 7), phase: MoonPhase::NewMoon },
                UpcomingMoon { date: ymd(2000, 1, 21), phase: MoonPhase::FullMoon },
            ]
        );
    }

    #[test]
    fn upcoming_always_finds_both() {
        let mut date = ymd(2024, 1, 1);
        for _ in 0..400 {
            let moons = upcoming_moons(date);
            assert_eq!(moons.len(), 2);
            assert!(moons.iter().all(|m| m.date > date));
            assert!(moons[0].date <= moons[1].date);
            date += Duration::days(1);
        }
    }

    #[test]
    fn phase_text() {
        assert_eq!(MoonPhase::LastQuarter.to_string(), "Last Quarter");
        assert_eq!(MoonPhase::FullMoon.ceremony(), "Powerful for release ceremonies");
    }
}
