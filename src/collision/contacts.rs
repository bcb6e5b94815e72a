//! Contact side table.
//!
//! Remembers which unordered pairs were touching and when they were last
//! seen, so the pipeline can tell a new contact from a continuing one without
//! storing anything on the entities themselves.

use rustc_hash::FxHashMap;

use super::Handle;
use crate::events::collision::ContactKind;

/// Bookkeeping for one touching pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactRecord<H> {
    /// Frame number of the last update the pair overlapped in.
    pub last_seen: u64,
    /// Trigger side of the pair, if any, so EXIT can report it.
    pub trigger: Option<H>,
}

/// A pair that stopped touching this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndedContact<H> {
    pub a: H,
    pub b: H,
    pub trigger: Option<H>,
}

#[derive(Debug, Clone)]
pub struct ContactTracker<H: Handle> {
    frame: u64,
    contacts: FxHashMap<(H, H), ContactRecord<H>>,
}

impl<H: Handle> Default for ContactTracker<H> {
    fn default() -> Self {
        Self::new()
    }
}

fn ordered<H: Handle>(a: H, b: H) -> (H, H) {
    if a <= b { (a, b) } else { (b, a) }
}

impl<H: Handle> ContactTracker<H> {
    pub fn new() -> Self {
        Self {
            frame: 0,
            contacts: FxHashMap::default(),
        }
    }

    /// Start a new frame. Call once before recording contacts.
    pub fn begin_frame(&mut self) -> u64 {
        self.frame += 1;
        self.frame
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Record that `a` and `b` overlap this frame.
    ///
    /// Returns [`ContactKind::Enter`] if the pair was not touching in the
    /// previous frame and [`ContactKind::Stay`] otherwise. Recording the same
    /// pair twice in one frame returns `Stay` the second time.
    pub fn record(&mut self, a: H, b: H, trigger: Option<H>) -> ContactKind {
        let frame = self.frame;
        let key = ordered(a, b);
        match self.contacts.get_mut(&key) {
            Some(record) if record.last_seen + 1 >= frame => {
                record.last_seen = frame;
                record.trigger = trigger;
                ContactKind::Stay
            }
            _ => {
                self.contacts.insert(
                    key,
                    ContactRecord {
                        last_seen: frame,
                        trigger,
                    },
                );
                ContactKind::Enter
            }
        }
    }

    /// `true` if the pair overlapped in the current or previous frame.
    pub fn is_touching(&self, a: H, b: H) -> bool {
        self.contacts
            .get(&ordered(a, b))
            .is_some_and(|record| record.last_seen + 1 >= self.frame)
    }

    /// Remove every pair not recorded in the current frame and return them.
    ///
    /// Results are sorted by handle pair so EXIT events come out in a stable
    /// order.
    pub fn end_frame(&mut self) -> Vec<EndedContact<H>> {
        let frame = self.frame;
        let mut ended: Vec<EndedContact<H>> = Vec::new();
        self.contacts.retain(|&(a, b), record| {
            if record.last_seen == frame {
                true
            } else {
                ended.push(EndedContact {
                    a,
                    b,
                    trigger: record.trigger,
                });
                false
            }
        });
        ended.sort_by_key(|contact| (contact.a, contact.b));
        ended
    }

    /// Forget all contacts. The next overlap of any pair is an ENTER again.
    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}
