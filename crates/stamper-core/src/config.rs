//! Stamper configuration.
//!
//! Settings can be created programmatically, read from a TOML file, or
//! overridden through environment variables.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Badge diameter in logical pixels.
pub const DEFAULT_BADGE_SIZE: u32 = 20;

/// Resolution written to PNG outputs whose source carried none.
pub const DEFAULT_DPI: u32 = 72;

/// Largest accepted badge diameter in logical pixels.
pub const MAX_BADGE_SIZE: u32 = 1024;

/// Largest accepted device pixel ratio.
pub const MAX_PIXEL_RATIO: f64 = 16.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StamperConfig {
    /// Badge diameter before device pixel ratio scaling
    pub badge_size: u32,
    /// Ratio between background pixels and stamp coordinates
    pub pixel_ratio: f64,
    /// Stem suffix marking the untouched background (`name-orig.png`)
    pub original_suffix: String,
    /// Stem suffix of the tag file (`name-tags.txt`)
    pub tags_suffix: String,
    /// Stem suffix of the composited output (`name-stamped.png`)
    pub stamped_suffix: String,
    pub default_dpi: u32,
}

impl Default for StamperConfig {
    fn default() -> Self {
        Self {
            badge_size: DEFAULT_BADGE_SIZE,
            pixel_ratio: 1.0,
            original_suffix: "orig".to_owned(),
            tags_suffix: "tags".to_owned(),
            stamped_suffix: "stamped".to_owned(),
            default_dpi: DEFAULT_DPI,
        }
    }
}

impl StamperConfig {
    pub fn with_badge_size(mut self, size: u32) -> Self {
        self.badge_size = size;
        self
    }

    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    pub fn with_default_dpi(mut self, dpi: u32) -> Self {
        self.default_dpi = dpi;
        self
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `STAMPER_BADGE_SIZE`: badge diameter in pixels (default: 20)
    /// - `STAMPER_PIXEL_RATIO`: device pixel ratio (default: 1.0)
    /// - `STAMPER_DEFAULT_DPI`: resolution for outputs without one (default: 72)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env()
    }

    /// Applies any `STAMPER_*` variables that are set.
    pub fn merge_env(mut self) -> Result<Self, ConfigError> {
        if let Some(value) = env_value::<u32>("STAMPER_BADGE_SIZE")? {
            self.badge_size = value;
        }
        if let Some(value) = env_value::<f64>("STAMPER_PIXEL_RATIO")? {
            self.pixel_ratio = value;
        }
        if let Some(value) = env_value::<u32>("STAMPER_DEFAULT_DPI")? {
            self.default_dpi = value;
        }

        self.validate()
    }

    /// Loads configuration from a TOML file.
    ///
    /// ```toml
    /// badge_size = 24
    /// pixel_ratio = 2.0
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()
    }

    /// Per-user configuration file, `<config dir>/stamper/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stamper").join("config.toml"))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let toml = toml::to_string(self)?;
        fs::write(path.as_ref(), toml)?;
        Ok(())
    }

    /// Badge side length in device pixels.
    pub fn scaled_badge_size(&self) -> u32 {
        scaled_size(self.badge_size, self.pixel_ratio)
    }

    /// Badge size must lie in `1..=MAX_BADGE_SIZE` and the pixel ratio in
    /// `(0, MAX_PIXEL_RATIO]`.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.badge_size == 0 || self.badge_size > MAX_BADGE_SIZE {
            return Err(ConfigError::InvalidValue("badge_size".to_owned()));
        }
        if !(self.pixel_ratio > 0.0 && self.pixel_ratio <= MAX_PIXEL_RATIO) {
            return Err(ConfigError::InvalidValue("pixel_ratio".to_owned()));
        }
        if self.default_dpi == 0 {
            return Err(ConfigError::InvalidValue("default_dpi".to_owned()));
        }
        Ok(self)
    }
}

/// `size × ratio`, truncated, never below one pixel.
pub(crate) fn scaled_size(size: u32, ratio: f64) -> u32 {
    ((size as f64 * ratio) as u32).max(1)
}

fn env_value<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => {
            value.trim().parse::<T>().map(Some).map_err(|_| ConfigError::InvalidValue(name.to_owned()))
        }
        Err(_) => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 3] = ["STAMPER_BADGE_SIZE", "STAMPER_PIXEL_RATIO", "STAMPER_DEFAULT_DPI"];

    #[test]
    fn defaults_match_historic_tool() {
        let config = StamperConfig::default();
        assert_eq!(config.badge_size, 20);
        assert_eq!(config.pixel_ratio, 1.0);
        assert_eq!(config.original_suffix, "orig");
        assert_eq!(config.stamped_suffix, "stamped");
        assert_eq!(config.tags_suffix, "tags");
        assert_eq!(config.default_dpi, 72);
    }

    #[test]
    fn scaled_badge_size_truncates() {
        assert_eq!(StamperConfig::default().with_pixel_ratio(2.0).scaled_badge_size(), 40);
        assert_eq!(StamperConfig::default().with_pixel_ratio(1.25).scaled_badge_size(), 25);
        assert_eq!(StamperConfig::default().with_pixel_ratio(1.33).scaled_badge_size(), 26);
        assert_eq!(scaled_size(1, 0.1), 1);
    }

    #[test]
    fn from_toml_partial_keeps_defaults() {
        let config = StamperConfig::from_toml(
            r#"
            # retina screenshots
            pixel_ratio = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.pixel_ratio, 2.0);
        assert_eq!(config.badge_size, 20);
    }

    #[test]
    fn from_toml_rejects_bad_ratio() {
        let result = StamperConfig::from_toml("pixel_ratio = 0.0");
        assert!(matches!(result, Err(ConfigError::InvalidValue(key)) if key == "pixel_ratio"));

        assert!(matches!(
            StamperConfig::from_toml("badge_size = \"big\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn oversized_values_are_rejected() {
        assert!(matches!(
            StamperConfig::from_toml("badge_size = 4000000000"),
            Err(ConfigError::InvalidValue(key)) if key == "badge_size"
        ));
        assert!(matches!(
            StamperConfig::from_toml("pixel_ratio = 1e9"),
            Err(ConfigError::InvalidValue(key)) if key == "pixel_ratio"
        ));
        assert!(StamperConfig::default().with_badge_size(MAX_BADGE_SIZE).validate().is_ok());
    }

    #[test]
    fn file_save_and_load() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("stamper.toml");

        let config = StamperConfig::default().with_badge_size(32).with_pixel_ratio(1.5);
        config.save_to_file(&path).unwrap();

        assert_eq!(StamperConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn default_path_is_namespaced() {
        if let Some(path) = StamperConfig::default_path() {
            assert!(path.ends_with("stamper/config.toml"));
        }
    }

    #[test]
    #[serial]
    fn from_env_overrides_defaults() {
        let _guard = EnvGuard::new(&VARS);
        env::set_var("STAMPER_BADGE_SIZE", "24");
        env::set_var("STAMPER_PIXEL_RATIO", "2");
        env::remove_var("STAMPER_DEFAULT_DPI");

        let config = StamperConfig::from_env().unwrap();
        assert_eq!(config.badge_size, 24);
        assert_eq!(config.pixel_ratio, 2.0);
        assert_eq!(config.default_dpi, 72);
    }

    #[test]
    #[serial]
    fn from_env_invalid() {
        let _guard = EnvGuard::new(&VARS);
        env::set_var("STAMPER_PIXEL_RATIO", "wide");

        assert!(StamperConfig::from_env().is_err());
    }

    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(names: &[&str]) -> Self {
            let vars = names.iter().map(|name| (name.to_string(), env::var(name).ok())).collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }
}
