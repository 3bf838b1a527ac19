//! Annotation session around one image.
//!
//! Owns the collection for the lifetime of an editing session, folds every
//! operation's [`Change`] into a dirty flag, and performs the "save" intent:
//! tag file first, then the stamped image.

use crate::badge::BadgeRenderer;
use crate::codec;
use crate::collection::StampCollection;
use crate::compositor::Compositor;
use crate::config::StamperConfig;
use crate::error::{Result, StampError};
use crate::naming::StampPaths;
use crate::stamp::Change;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StampSession {
    paths: StampPaths,
    stamps: StampCollection,
    dirty: bool,
}

/// Files produced by [`StampSession::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFiles {
    pub tags: PathBuf,
    pub image: PathBuf,
}

impl StampSession {
    /// Start a session for `input`, loading its tag file when one exists.
    pub fn open(input: &Path, config: &StamperConfig) -> Result<Self> {
        let paths = StampPaths::with_config(input, config);
        let stamps = match codec::read_tags(&paths.tags()) {
            Ok(stamps) => stamps,
            Err(StampError::NotFound { .. }) => {
                tracing::debug!(path = %paths.tags().display(), "no tag file, starting empty");
                StampCollection::new()
            }
            Err(err) => return Err(err),
        };

        Ok(Self { paths, stamps, dirty: false })
    }

    pub fn paths(&self) -> &StampPaths {
        &self.paths
    }

    pub fn stamps(&self) -> &StampCollection {
        &self.stamps
    }

    /// Whether any applied operation changed state since open or the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Run one infallible engine operation and record its outcome.
    pub fn apply<F>(&mut self, operation: F) -> Change
    where
        F: FnOnce(&mut StampCollection) -> Change,
    {
        let change = operation(&mut self.stamps);
        self.dirty |= change.is_changed();
        change
    }

    /// Like [`apply`](Self::apply) for operations that can fail or return a value.
    ///
    /// An error leaves the dirty flag untouched.
    pub fn try_apply<T, F>(&mut self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut StampCollection) -> Result<(T, Change)>,
    {
        let (value, change) = operation(&mut self.stamps)?;
        self.dirty |= change.is_changed();
        Ok(value)
    }

    /// Persist the tag file only.
    pub fn save_tags(&mut self) -> Result<PathBuf> {
        let path = self.paths.tags();
        codec::write_tags(&path, &self.stamps)?;
        self.dirty = false;
        Ok(path)
    }

    /// Write the tag file and the stamped image.
    pub fn save<R: BadgeRenderer>(&mut self, compositor: &Compositor<R>) -> Result<SavedFiles> {
        let tags = self.paths.tags();
        codec::write_tags(&tags, &self.stamps)?;
        let image = compositor.render_file(&self.paths, &self.stamps, None)?;
        self.dirty = false;

        Ok(SavedFiles { tags, image })
    }
}
