//! Which control handles which touch.
use std::collections::{HashMap, HashSet};

use crate::event::TouchId;

/// Maps each active touch id to the index of the control handling it.
///
/// Also remembers, per touch id, the controls the touch drifted out of, so
/// a control cannot silently pick a contact back up after cancelling it.
#[derive(Debug, Default)]
pub struct TouchOwners {
    owners: HashMap<TouchId, usize>,
    abandoned: HashMap<TouchId, HashSet<usize>>,
}

impl TouchOwners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self, touch_id: TouchId) -> Option<usize> {
        self.owners.get(&touch_id).copied()
    }

    /// Record `control` as the owner of `touch_id`, replacing any previous owner.
    pub fn claim(&mut self, touch_id: TouchId, control: usize) {
        self.owners.insert(touch_id, control);
    }

    pub fn release(&mut self, touch_id: TouchId) -> Option<usize> {
        self.owners.remove(&touch_id)
    }

    /// `control` gave up `touch_id` while the contact was still down.
    pub fn abandon(&mut self, touch_id: TouchId, control: usize) {
        self.abandoned.entry(touch_id).or_default().insert(control);
    }

    pub fn has_abandoned(&self, touch_id: TouchId, control: usize) -> bool {
        self.abandoned
            .get(&touch_id)
            .is_some_and(|set| set.contains(&control))
    }

    /// The contact ended: forget everything about `touch_id`.
    pub fn finish(&mut self, touch_id: TouchId) {
        self.owners.remove(&touch_id);
        self.abandoned.remove(&touch_id);
    }

    pub fn clear(&mut self) {
        self.owners.clear();
        self.abandoned.clear();
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// All `(touch id, control index)` pairs, sorted by touch id.
    pub fn entries(&self) -> Vec<(TouchId, usize)> {
        let mut entries: Vec<_> = self.owners.iter().map(|(&t, &c)| (t, c)).collect();
        entries.sort_unstable();
        entries
    }
}
