//! Batch geometry over a caller-chosen subset of stamps.
//!
//! The engine has no selection state; every operation takes the ids to
//! act on. Ids that are not in the collection are skipped.

use crate::collection::StampCollection;
use crate::stamp::{Change, Point, StampId};

impl StampCollection {
    /// Put every listed stamp on the lowest baseline among them (largest `y`).
    pub fn align_bottom(&mut self, ids: &[StampId]) -> Change {
        let Some(reference) = self.fold_positions(ids, |point| point.y, f64::max) else {
            return Change::Unchanged;
        };

        for id in ids {
            if let Some(point) = self.position_mut(*id) {
                point.y = reference;
            }
        }
        tracing::debug!(count = ids.len(), y = reference, "stamps aligned to bottom");
        Change::Changed
    }

    /// Put every listed stamp on the leftmost column among them (smallest `x`).
    pub fn align_left(&mut self, ids: &[StampId]) -> Change {
        let Some(reference) = self.fold_positions(ids, |point| point.x, f64::min) else {
            return Change::Unchanged;
        };

        for id in ids {
            if let Some(point) = self.position_mut(*id) {
                point.x = reference;
            }
        }
        tracing::debug!(count = ids.len(), x = reference, "stamps aligned to left");
        Change::Changed
    }

    /// Shift every listed stamp by `(dx, dy)`.
    pub fn nudge(&mut self, ids: &[StampId], dx: f64, dy: f64) -> Change {
        if dx == 0.0 && dy == 0.0 {
            return Change::Unchanged;
        }

        let mut change = Change::Unchanged;
        for id in ids {
            if let Some(point) = self.position_mut(*id) {
                *point = point.offset(dx, dy);
                change = Change::Changed;
            }
        }
        change
    }

    fn fold_positions(
        &self,
        ids: &[StampId],
        axis: impl Fn(Point) -> f64,
        pick: impl Fn(f64, f64) -> f64,
    ) -> Option<f64> {
        ids.iter().filter_map(|id| self.get(*id)).map(|stamp| axis(stamp.position())).reduce(pick)
    }
}
