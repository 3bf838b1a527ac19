//! Stamp collection
//!
//! Owns the identity invariants: ids are unique, auto-assigned ids never
//! collide with existing ones, and `renumber` closes gaps into `0..N`.

use crate::error::{Result, StampError};
use crate::stamp::{Change, Direction, Point, Stamp, StampId};
use std::collections::BTreeMap;

/// Set of stamps keyed by id, iterated in ascending id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StampCollection {
    stamps: BTreeMap<StampId, Point>,
    /// Greater than every id in `stamps`, saturating at `u32::MAX`.
    next_id: u32,
}

impl StampCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stamp, either at `explicit_id` or at the next free counter value.
    ///
    /// An explicit id also advances the counter past it so later
    /// auto-assigned ids stay unique.
    pub fn add(
        &mut self,
        position: Point,
        explicit_id: Option<StampId>,
    ) -> Result<(StampId, Change)> {
        let id = match explicit_id {
            Some(id) if self.stamps.contains_key(&id) => {
                return Err(StampError::DuplicateId(id));
            }
            Some(id) => id,
            None if self.stamps.contains_key(&StampId(self.next_id)) => {
                return Err(StampError::IdsExhausted);
            }
            None => StampId(self.next_id),
        };

        self.stamps.insert(id, position);
        self.next_id = self.next_id.max(id.raw().saturating_add(1));
        tracing::debug!(%id, x = position.x, y = position.y, "stamp added");

        Ok((id, Change::Changed))
    }

    /// Delete a stamp. Absent ids are ignored; gaps are left in place.
    pub fn remove(&mut self, id: StampId) -> Change {
        let removed = self.stamps.remove(&id).is_some();
        if removed {
            tracing::debug!(%id, "stamp removed");
        }
        Change::from(removed)
    }

    /// Relabel stamps as `0..N` keeping their relative order.
    pub fn renumber(&mut self) -> Change {
        let previous_next = self.next_id;
        let mut moved = false;

        let stamps = std::mem::take(&mut self.stamps);
        for (index, (old_id, position)) in stamps.into_iter().enumerate() {
            let new_id = StampId(index as u32);
            moved |= new_id != old_id;
            self.stamps.insert(new_id, position);
        }
        self.next_id = self.stamps.len() as u32;

        let change = Change::from(moved || previous_next != self.next_id);
        if change.is_changed() {
            tracing::debug!(count = self.stamps.len(), "stamps renumbered");
        }
        change
    }

    /// Swap labels with the neighbouring id in `direction`.
    ///
    /// Each position stays with its stamp; only the numbers trade places.
    /// Missing stamps or neighbours make this a no-op.
    pub fn promote(&mut self, id: StampId, direction: Direction) -> Change {
        let Some(neighbor) = id.neighbor(direction) else {
            return Change::Unchanged;
        };
        if !self.stamps.contains_key(&id) || !self.stamps.contains_key(&neighbor) {
            return Change::Unchanged;
        }

        let own = self.stamps[&id];
        let other = self.stamps[&neighbor];
        self.stamps.insert(id, other);
        self.stamps.insert(neighbor, own);
        tracing::debug!(%id, %neighbor, "stamp labels swapped");

        Change::Changed
    }

    /// Relocate one stamp.
    pub fn move_to(&mut self, id: StampId, position: Point) -> Change {
        match self.stamps.get_mut(&id) {
            Some(current) if *current != position => {
                *current = position;
                Change::Changed
            }
            _ => Change::Unchanged,
        }
    }

    pub fn get(&self, id: StampId) -> Option<Stamp> {
        self.stamps.get(&id).map(|position| Stamp::new(id, *position))
    }

    /// All stamps in ascending id order.
    pub fn all(&self) -> Vec<Stamp> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Stamp> + '_ {
        self.stamps.iter().map(|(id, position)| Stamp::new(*id, *position))
    }

    pub fn contains(&self, id: StampId) -> bool {
        self.stamps.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// Id the next auto-assigned `add` will use.
    pub fn next_id(&self) -> StampId {
        StampId(self.next_id)
    }

    pub(crate) fn position_mut(&mut self, id: StampId) -> Option<&mut Point> {
        self.stamps.get_mut(&id)
    }

    /// Build a collection from decoded stamps; the counter lands past the largest id.
    pub(crate) fn from_stamps(stamps: BTreeMap<StampId, Point>) -> Self {
        let next_id = stamps.keys().next_back().map_or(0, |id| id.raw().saturating_add(1));
        Self { stamps, next_id }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn arb_stamps() -> impl Strategy<Value = BTreeMap<u32, (i32, i32)>> {
        prop::collection::btree_map(0u32..64, (-1000i32..1000, -1000i32..1000), 0..20)
    }

    fn build(stamps: &BTreeMap<u32, (i32, i32)>) -> StampCollection {
        let mut collection = StampCollection::new();
        for (&id, &(x, y)) in stamps {
            let _ = collection
                .add(Point::new(f64::from(x), f64::from(y)), Some(StampId(id)))
                .expect("map keys are unique");
        }
        collection
    }

    proptest! {
        /// Renumbering yields 0..N in the previous order and is idempotent
        #[test]
        fn renumber_is_contiguous_and_idempotent(stamps in arb_stamps()) {
            let mut collection = build(&stamps);
            let positions: Vec<Point> = collection.iter().map(|stamp| stamp.position()).collect();

            let _ = collection.renumber();
            let ids: Vec<u32> = collection.iter().map(|stamp| stamp.id.raw()).collect();
            prop_assert_eq!(ids, (0..stamps.len() as u32).collect::<Vec<_>>());
            prop_assert_eq!(
                collection.iter().map(|stamp| stamp.position()).collect::<Vec<_>>(),
                positions
            );
            prop_assert_eq!(collection.next_id(), StampId(stamps.len() as u32));

            let once = collection.clone();
            prop_assert!(!collection.renumber().is_changed());
            prop_assert_eq!(collection, once);
        }

        /// Promoting and then demoting the neighbour restores the labelling
        #[test]
        fn promote_is_undone_by_demote(stamps in arb_stamps(), pick in 0usize..64) {
            let original = build(&stamps);
            let Some(&id) = stamps.keys().nth(pick % stamps.len().max(1)) else {
                return Ok(());
            };

            let mut collection = original.clone();
            if collection.promote(StampId(id), Direction::Promote).is_changed() {
                let _ = collection.promote(StampId(id + 1), Direction::Demote);
            }
            prop_assert_eq!(collection, original);
        }

        /// Automatic ids never collide with existing ones
        #[test]
        fn auto_add_keeps_ids_unique(stamps in arb_stamps()) {
            let mut collection = build(&stamps);
            let (id, _) = collection.add(Point::default(), None).unwrap();

            prop_assert!(!stamps.contains_key(&id.raw()));
            prop_assert_eq!(collection.len(), stamps.len() + 1);
            prop_assert!(collection.next_id().raw() > id.raw());
        }

        /// Bottom alignment puts every selected stamp on the lowest baseline
        #[test]
        fn align_bottom_uses_maximum_y(stamps in arb_stamps(), mask in any::<u64>()) {
            let mut collection = build(&stamps);
            let selected: Vec<StampId> = stamps
                .keys()
                .filter(|&&id| mask & (1 << id) != 0)
                .map(|&id| StampId(id))
                .collect();
            let expected = selected
                .iter()
                .map(|id| f64::from(stamps[&id.raw()].1))
                .reduce(f64::max);

            let _ = collection.align_bottom(&selected);
            for stamp in collection.iter() {
                let before = stamps[&stamp.id.raw()];
                if selected.contains(&stamp.id) {
                    prop_assert_eq!(Some(stamp.y), expected);
                } else {
                    prop_assert_eq!(stamp.y, f64::from(before.1));
                }
                prop_assert_eq!(stamp.x, f64::from(before.0));
            }
        }
    }
}
