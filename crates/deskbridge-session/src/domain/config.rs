//! Session configuration.
//!
//! [`SessionConfig`] holds every tunable of the bridge.  It is usually loaded
//! from a TOML file owned by the embedding application:
//!
//! ```toml
//! endpoint = "unix:/tmp/umw-vnc.sock"
//! fps = 60
//! connect_timeout_ms = 10000
//! type_delay_ms = 1
//!
//! [audio]
//! sample_rate = 44100
//! channels = 2
//! bytes_per_sample = 2
//! chunk_millis = 1000
//! ```
//!
//! Every field has a serde default, so an empty file (or a missing key after
//! an upgrade) yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use deskbridge_core::AudioFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::address::RemoteAddress;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// All runtime settings for one remote desktop session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Remote-framebuffer endpoint to connect to.
    #[serde(default = "default_endpoint")]
    pub endpoint: RemoteAddress,
    /// Target incremental refresh rate.  Clamped to at least 1.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Upper bound on one connection attempt (connect + handshake).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Pause between consecutive replayed key actions.
    #[serde(default = "default_type_delay_ms")]
    pub type_delay_ms: u64,
    /// Pause between the press and release of a mouse click.
    #[serde(default = "default_click_delay_ms")]
    pub click_delay_ms: u64,
    #[serde(default)]
    pub audio: AudioConfig,
}

/// PCM layout and chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_bytes_per_sample")]
    pub bytes_per_sample: u16,
    /// Duration of audio collected before one `audio_chunk` event.
    #[serde(default = "default_chunk_millis")]
    pub chunk_millis: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_endpoint() -> RemoteAddress {
    RemoteAddress::Unix(PathBuf::from("/tmp/umw-vnc.sock"))
}
fn default_fps() -> u32 {
    60
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_type_delay_ms() -> u64 {
    1
}
fn default_click_delay_ms() -> u64 {
    1
}
fn default_sample_rate() -> u32 {
    44_100
}
fn default_channels() -> u16 {
    2
}
fn default_bytes_per_sample() -> u16 {
    2
}
fn default_chunk_millis() -> u64 {
    1_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            fps: default_fps(),
            connect_timeout_ms: default_connect_timeout_ms(),
            type_delay_ms: default_type_delay_ms(),
            click_delay_ms: default_click_delay_ms(),
            audio: AudioConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            bytes_per_sample: default_bytes_per_sample(),
            chunk_millis: default_chunk_millis(),
        }
    }
}

impl SessionConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed or a value has
    /// the wrong type (including an unparseable `endpoint`).
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a config file, returning defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors other than "not
    /// found", and [`ConfigError::Parse`] for malformed TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn type_delay(&self) -> Duration {
        Duration::from_millis(self.type_delay_ms)
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }
}

impl AudioConfig {
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bytes_per_sample: self.bytes_per_sample,
        }
    }

    pub fn chunk_duration(&self) -> Duration {
        Duration::from_millis(self.chunk_millis)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_refresh_is_60_fps() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.fps, 60);
        assert_eq!(cfg.refresh_period(), Duration::from_secs(1) / 60);
    }

    #[test]
    fn test_zero_fps_is_clamped() {
        let cfg = SessionConfig {
            fps: 0,
            ..Default::default()
        };
        assert_eq!(cfg.refresh_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_default_connect_timeout_is_10s() {
        assert_eq!(SessionConfig::default().connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_default_audio_threshold_is_one_second_of_cd_audio() {
        let audio = AudioConfig::default();
        assert_eq!(audio.format().bytes_for(audio.chunk_duration()), 176_400);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, SessionConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_keys() {
        // Arrange
        let toml = r#"
            endpoint = "localhost:5901"
            fps = 30

            [audio]
            chunk_millis = 250
        "#;

        // Act
        let cfg = SessionConfig::from_toml_str(toml).unwrap();

        // Assert
        assert_eq!(cfg.endpoint.to_string(), "localhost:5901");
        assert_eq!(cfg.fps, 30);
        assert_eq!(cfg.audio.chunk_millis, 250);
        assert_eq!(cfg.audio.sample_rate, 44_100);
        assert_eq!(cfg.type_delay_ms, 1);
    }

    #[test]
    fn test_bad_endpoint_is_a_parse_error() {
        let err = SessionConfig::from_toml_str(r#"endpoint = "nowhere""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::env::temp_dir().join("deskbridge-config-that-does-not-exist.toml");
        let cfg = SessionConfig::load(&path).unwrap();
        assert_eq!(cfg, SessionConfig::default());
    }

    #[test]
    fn test_load_reads_existing_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!(
            "deskbridge-config-{}.toml",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, "fps = 15\n").unwrap();

        // Act
        let cfg = SessionConfig::load(&path);
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(cfg.unwrap().fps, 15);
    }

    #[test]
    fn test_config_serializes_back_to_toml() {
        let cfg = SessionConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        assert!(text.contains("unix:/tmp/umw-vnc.sock"));
        assert_eq!(SessionConfig::from_toml_str(&text).unwrap(), cfg);
    }
}
