/// Configuration management (config.toml in the platform config directory)
///
/// Missing or unreadable files fall back to defaults. The selected theme is
/// stored here so it survives restarts.
use crate::sequencer::{Tempo, DEFAULT_BPM};
use crate::theme::ThemeId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config directory on this platform")]
    NoConfigDir,
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config could not be parsed: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sequencer: SequencerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub appearance: AppearanceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Starting tempo in BPM (default: 120, clamped to 40-200)
    #[serde(default = "default_tempo")]
    pub tempo: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Open the audio device at startup (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Peak gain of each tone (default: 0.3)
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Tone length in milliseconds (default: 150)
    #[serde(default = "default_tone_ms")]
    pub tone_ms: u64,
    /// Pad highlight window in milliseconds (default: 100)
    #[serde(default = "default_flash_ms")]
    pub flash_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppearanceConfig {
    #[serde(default)]
    pub theme: ThemeId,
}

fn default_tempo() -> u16 {
    DEFAULT_BPM
}
fn default_true() -> bool {
    true
}
fn default_volume() -> f32 {
    0.3
}
fn default_tone_ms() -> u64 {
    150
}
fn default_flash_ms() -> u64 {
    100
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            tempo: default_tempo(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            volume: default_volume(),
            tone_ms: default_tone_ms(),
            flash_ms: default_flash_ms(),
        }
    }
}

impl SequencerConfig {
    pub fn tempo(&self) -> Tempo {
        Tempo::clamped(self.tempo as i64)
    }
}

impl AudioConfig {
    pub fn tone_duration(&self) -> Duration {
        Duration::from_millis(self.tone_ms)
    }

    pub fn flash_window(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }
}

/// Platform config directory.
///
/// On Linux: `~/.config/shaman-rhythm`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "DrummingShaman", "shaman-rhythm")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from the platform config directory.
pub fn load() -> Config {
    match config_dir() {
        Some(dir) => load_from(&dir.join(FILE_NAME)),
        None => Config::default(),
    }
}

/// Reads a config file, falling back to defaults on any failure.
pub fn load_from(path: &Path) -> Config {
    match read(path) {
        Ok(config) => config,
        Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), "using default config: {}", err);
            Config::default()
        }
    }
}

fn read(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Saves the configuration to the platform config directory.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &dir.join(FILE_NAME))
}

pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(&dir.path().join("nope.toml"));
        assert_eq!(config, Config::default());
        assert_eq!(config.sequencer.tempo().bpm(), 120);
        assert_eq!(config.audio.tone_duration(), Duration::from_millis(150));
        assert_eq!(config.audio.flash_window(), Duration::from_millis(100));
        assert_eq!(config.appearance.theme, ThemeId::Mystical);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FILE_NAME);
        let mut config = Config::default();
        config.sequencer.tempo = 90;
        config.appearance.theme = ThemeId::Earthy;
        save_to(&config, &path).unwrap();
        assert_eq!(load_from(&path), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, "[sequencer]\ntempo = 500\n").unwrap();
        let config = load_from(&path);
        assert_eq!(config.sequencer.tempo().bpm(), 200);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert_eq!(load_from(&path), Config::default());
    }

    #[test]
    fn unknown_theme_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, "[sequencer]\ntempo = 90\n[appearance]\ntheme = \"neon\"\n").unwrap();
        let config = load_from(&path);
        assert_eq!(config.appearance.theme, ThemeId::Mystical);
        assert_eq!(config.sequencer.tempo, 90);
    }
}
