//! Session reconstruction
//!
//! A [`Session`] is the lifecycle of one UE-associated S1 connection: every
//! event whose correlation keys resolve to it, in chronological order.
//! Sessions are created and extended only through the [`SessionRegistry`].
//!
//! ## Timeline ordering
//!
//! Events are inserted by timestamp when one is present and appended in
//! arrival order otherwise. An event without a timestamp is a barrier: later
//! timed events never move in front of it. Equal timestamps keep arrival
//! order.

mod registry;

pub use registry::{Placement, RegistryStats, SessionRegistry, SharedRegistry};

use crate::classify::Classifier;
use crate::types::{AddressPair, CorrelationKeys, Event, SessionId, SessionStatus};

/// One reconstructed UE session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    keys: CorrelationKeys,
    timeline: Vec<Event>,
    open: bool,
    last_activity: u64,
}

impl Session {
    pub(crate) fn new(id: SessionId, event: Event) -> Self {
        Self {
            id,
            keys: event.keys,
            last_activity: event.seq,
            timeline: vec![event],
            open: true,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Resolved identity. Grows from partial to complete, never changes after.
    pub fn keys(&self) -> CorrelationKeys {
        self.keys
    }

    pub fn timeline(&self) -> &[Event] {
        &self.timeline
    }

    /// Whether the session still accepts correlation matches.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// `seq` of the most recently attached event.
    pub fn last_activity(&self) -> u64 {
        self.last_activity
    }

    /// Earliest timestamp in the timeline.
    pub fn start_ts(&self) -> Option<f64> {
        self.timestamps().reduce(f64::min)
    }

    /// Latest timestamp in the timeline.
    pub fn end_ts(&self) -> Option<f64> {
        self.timestamps().reduce(f64::max)
    }

    /// Capture frame numbers in timeline order.
    pub fn frames(&self) -> Vec<u64> {
        self.timeline.iter().filter_map(|e| e.frame).collect()
    }

    /// Addresses of the first event that carries them.
    pub fn address_pair(&self) -> Option<AddressPair> {
        self.timeline.iter().find_map(|e| e.addresses)
    }

    /// Terminal status, derived on demand.
    pub fn status(&self, classifier: &Classifier) -> SessionStatus {
        classifier.finalize(self).status
    }

    fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.timeline.iter().filter_map(|e| e.timestamp)
    }

    pub(crate) fn attach(&mut self, event: Event) {
        self.keys.fill_from(&event.keys);
        self.last_activity = self.last_activity.max(event.seq);

        let position = match event.timestamp {
            None => self.timeline.len(),
            Some(ts) => {
                let mut i = self.timeline.len();
                while i > 0 && matches!(self.timeline[i - 1].timestamp, Some(prev) if prev > ts) {
                    i -= 1;
                }
                i
            }
        };
        self.timeline.insert(position, event);
    }

    pub(crate) fn close(&mut self) {
        self.open = false;
    }
}
