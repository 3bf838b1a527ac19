//! Stamp data model
//!
//! A stamp is a numbered marker pinned to a point in the background image's
//! pixel space. Coordinates are unbounded: stamps may sit partially or fully
//! outside the canvas.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stamp within one collection.
///
/// Ids are 0-based; the label drawn on the badge is `id + 1`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StampId(pub u32);

impl StampId {
    pub fn raw(self) -> u32 {
        self.0
    }

    /// 1-based number shown on the badge.
    pub fn label(self) -> u32 {
        self.0 + 1
    }

    /// Id one step away in `direction`, if it is representable.
    pub fn neighbor(self, direction: Direction) -> Option<StampId> {
        match direction {
            Direction::Promote => self.0.checked_add(1).map(StampId),
            Direction::Demote => self.0.checked_sub(1).map(StampId),
        }
    }
}

impl fmt::Display for StampId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StampId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Position in background image coordinates (logical pixels, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stamp {
    pub id: StampId,
    pub x: f64,
    pub y: f64,
}

impl Stamp {
    pub fn new(id: StampId, position: Point) -> Self {
        Self { id, x: position.x, y: position.y }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Which neighbour a stamp trades labels with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Swap with `id + 1`.
    Promote,
    /// Swap with `id - 1`.
    Demote,
}

/// Outcome of a mutating operation.
///
/// Callers fold these into their own "unsaved changes" state.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Change {
    Changed,
    #[default]
    Unchanged,
}

impl Change {
    pub fn is_changed(self) -> bool {
        matches!(self, Change::Changed)
    }

    pub fn or(self, other: Change) -> Change {
        if self.is_changed() || other.is_changed() {
            Change::Changed
        } else {
            Change::Unchanged
        }
    }
}

impl From<bool> for Change {
    fn from(changed: bool) -> Self {
        if changed {
            Change::Changed
        } else {
            Change::Unchanged
        }
    }
}
