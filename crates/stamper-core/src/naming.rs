//! File naming conventions around one stamped image.
//!
//! For a base `dir/name` and extension `ext`:
//! - `dir/name-orig.ext`: untouched background (preferred)
//! - `dir/name.ext`: background fallback
//! - `dir/name-tags.txt`: tag file
//! - `dir/name-stamped.ext`: composited output
//!
//! The input may name either background form. Only an exact trailing
//! `-<original suffix>` on the stem is stripped to recover `name`.

use crate::config::StamperConfig;
use crate::error::{Result, StampError};
use std::path::{Path, PathBuf};

const DEFAULT_EXTENSION: &str = "png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampPaths {
    dir: PathBuf,
    name: String,
    extension: String,
    original_suffix: String,
    tags_suffix: String,
    stamped_suffix: String,
}

impl StampPaths {
    /// Derive the naming set from any image path using default suffixes.
    pub fn from_input(input: &Path) -> Self {
        Self::with_config(input, &StamperConfig::default())
    }

    pub fn with_config(input: &Path, config: &StamperConfig) -> Self {
        let dir = input.parent().map(Path::to_path_buf).unwrap_or_default();
        let extension = input
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_EXTENSION)
            .to_owned();
        let stem = input.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();

        let marker = format!("-{}", config.original_suffix);
        let name = match stem.strip_suffix(&marker) {
            Some(base) if !base.is_empty() => base.to_owned(),
            _ => stem,
        };

        Self {
            dir,
            name,
            extension,
            original_suffix: config.original_suffix.clone(),
            tags_suffix: config.tags_suffix.clone(),
            stamped_suffix: config.stamped_suffix.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn original(&self) -> PathBuf {
        self.suffixed(&self.original_suffix, &self.extension)
    }

    pub fn plain(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.name, self.extension))
    }

    pub fn tags(&self) -> PathBuf {
        self.suffixed(&self.tags_suffix, "txt")
    }

    pub fn stamped(&self) -> PathBuf {
        self.suffixed(&self.stamped_suffix, &self.extension)
    }

    /// Background to composite onto: the original if present, else the plain name.
    pub fn resolve_background(&self) -> Result<PathBuf> {
        let original = self.original();
        if original.is_file() {
            return Ok(original);
        }

        let plain = self.plain();
        if plain.is_file() {
            tracing::warn!(
                missing = %original.display(),
                using = %plain.display(),
                "original background not found, falling back"
            );
            return Ok(plain);
        }

        Err(StampError::NotFound { paths: vec![original, plain] })
    }

    fn suffixed(&self, suffix: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{}-{}.{}", self.name, suffix, extension))
    }
}
