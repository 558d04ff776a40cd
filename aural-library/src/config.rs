//! Simple configuration persistence for Aural
//!
//! Stores user preferences: volume, shuffle/repeat policy, last folder and
//! the preferred device buffer size.

use crate::playlist::RepeatMode;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default master volume
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Master volume (0.0 - 1.0)
    pub volume: f32,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    /// Last folder tracks were added from
    pub last_folder: Option<PathBuf>,
    /// Requested output buffer size in frames (device default when unset)
    pub buffer_frames: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            shuffle: false,
            repeat: RepeatMode::Off,
            last_folder: None,
            buffer_frames: None,
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aural")
            .join("config.txt")
    }

    /// Parse config from simple key=value format.
    /// Malformed values keep their defaults.
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "volume" => {
                    if let Ok(v) = value.parse::<f32>() {
                        if v.is_finite() {
                            config.volume = v.clamp(0.0, 1.0);
                        }
                    }
                }
                "shuffle" => {
                    if let Ok(v) = value.parse() {
                        config.shuffle = v;
                    }
                }
                "repeat" => {
                    if let Ok(v) = value.parse() {
                        config.repeat = v;
                    }
                }
                "last_folder" => {
                    if !value.is_empty() {
                        config.last_folder = Some(PathBuf::from(value));
                    }
                }
                "buffer_frames" => {
                    config.buffer_frames = value.parse().ok().filter(|&n: &u32| n > 0);
                }
                _ => {} // Ignore unknown keys
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = vec![
            "# Aural Configuration".to_string(),
            format!("volume={}", self.volume),
            format!("shuffle={}", self.shuffle),
            format!("repeat={}", self.repeat),
        ];

        if let Some(ref folder) = self.last_folder {
            lines.push(format!("last_folder={}", folder.display()));
        }
        if let Some(frames) = self.buffer_frames {
            lines.push(format!("buffer_frames={}", frames));
        }

        lines.join("\n")
    }
}
