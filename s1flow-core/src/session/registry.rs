//! Correlation of events into sessions.
//!
//! Open sessions are indexed by each correlation axis. An event matches an
//! open session when they agree on at least one known key and contradict on
//! none. A match on both axes beats a match on one; ties among the best
//! score are ambiguous.

use super::Session;
use crate::config::{AmbiguityPolicy, CorrelationConfig};
use crate::error::{Error, Result};
use crate::protocol::normalize_name;
use crate::types::{Diagnostic, Event, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const RELEASE_COMPLETE: &str = "uecontextreleasecomplete";
const MISSING_NAME: &str = "missing message name";

/// Where an event ended up after [`SessionRegistry::ingest_resolving`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Attached to an existing session or started a new one
    Session(SessionId),
    /// Several sessions matched; the policy picked one
    Resolved {
        session: SessionId,
        candidates: Vec<SessionId>,
    },
    /// Several sessions matched and the event was dropped
    Rejected { candidates: Vec<SessionId> },
    /// The event carries no UE identifier
    NodeLevel,
    /// The event has no message name and was dropped
    Malformed,
}

impl Placement {
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Placement::Session(id) | Placement::Resolved { session: id, .. } => Some(*id),
            Placement::Rejected { .. } | Placement::NodeLevel | Placement::Malformed => None,
        }
    }
}

/// Counters kept by the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub events_ingested: usize,
    pub node_level_skipped: usize,
    pub malformed_dropped: usize,
    pub ambiguous_resolved: usize,
    pub ambiguous_rejected: usize,
}

enum Resolution {
    New,
    Match(usize),
    Ambiguous(Vec<usize>),
}

/// Owns all sessions of one batch run.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<Session>,
    by_enb: HashMap<u32, Vec<usize>>,
    by_mme: HashMap<u32, Vec<usize>>,
    keep_open_after_release: bool,
    stats: RegistryStats,
    diagnostics: Vec<Diagnostic>,
}

impl SessionRegistry {
    /// Registry that closes sessions after `UEContextReleaseComplete`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CorrelationConfig) -> Self {
        Self {
            keep_open_after_release: !config.close_on_release,
            ..Self::default()
        }
    }

    /// Add an event to the session it belongs to, creating one if needed.
    ///
    /// Fails with [`Error::AmbiguousCorrelation`] when two or more open
    /// sessions match equally well; nothing is modified in that case. Events
    /// without a message name or without any identifier fail with
    /// [`Error::MalformedEvent`].
    pub fn ingest(&mut self, event: Event) -> Result<SessionId> {
        if event.message_name.trim().is_empty() {
            return Err(Error::MalformedEvent {
                seq: event.seq,
                reason: MISSING_NAME.to_string(),
            });
        }
        if event.keys.is_empty() {
            return Err(Error::MalformedEvent {
                seq: event.seq,
                reason: "no UE-associated identifiers".to_string(),
            });
        }

        match self.resolve(&event) {
            Resolution::New => Ok(self.create(event)),
            Resolution::Match(index) => Ok(self.attach(index, event)),
            Resolution::Ambiguous(candidates) => Err(Error::AmbiguousCorrelation {
                candidates: self.ids(&candidates),
            }),
        }
    }

    /// Like [`ingest`](Self::ingest), but settles ambiguity with `policy`.
    ///
    /// Every outcome is counted; ambiguous ones are also recorded as
    /// diagnostics.
    pub fn ingest_resolving(&mut self, event: Event, policy: AmbiguityPolicy) -> Placement {
        if event.message_name.trim().is_empty() {
            tracing::debug!(seq = event.seq, "Dropping event without message name");
            self.stats.malformed_dropped += 1;
            self.diagnostics.push(Diagnostic::Unclassifiable {
                source: "session registry".to_string(),
                seq: event.seq,
                frame: event.frame,
                reason: MISSING_NAME.to_string(),
            });
            return Placement::Malformed;
        }
        if event.keys.is_empty() {
            self.stats.node_level_skipped += 1;
            return Placement::NodeLevel;
        }

        let (seq, frame) = (event.seq, event.frame);
        match self.resolve(&event) {
            Resolution::New => Placement::Session(self.create(event)),
            Resolution::Match(index) => Placement::Session(self.attach(index, event)),
            Resolution::Ambiguous(candidates) => {
                let ids = self.ids(&candidates);
                match policy {
                    AmbiguityPolicy::MostRecent => {
                        let chosen = candidates
                            .iter()
                            .copied()
                            .max_by_key(|&i| (self.sessions[i].last_activity(), i))
                            .unwrap_or(candidates[0]);
                        let session = self.attach(chosen, event);
                        tracing::debug!(seq, %session, ?ids, "Ambiguous correlation resolved to most recent session");
                        self.stats.ambiguous_resolved += 1;
                        self.diagnostics.push(Diagnostic::AmbiguousCorrelation {
                            seq,
                            frame,
                            candidates: ids.clone(),
                            resolved_to: Some(session),
                        });
                        Placement::Resolved {
                            session,
                            candidates: ids,
                        }
                    }
                    AmbiguityPolicy::Reject => {
                        tracing::debug!(seq, ?ids, "Ambiguous correlation rejected");
                        self.stats.ambiguous_rejected += 1;
                        self.diagnostics.push(Diagnostic::AmbiguousCorrelation {
                            seq,
                            frame,
                            candidates: ids.clone(),
                            resolved_to: None,
                        });
                        Placement::Rejected { candidates: ids }
                    }
                }
            }
        }
    }

    /// Drop all sessions and counters to start a new batch run.
    pub fn clear(&mut self) {
        let keep_open_after_release = self.keep_open_after_release;
        *self = Self {
            keep_open_after_release,
            ..Self::default()
        };
    }

    pub fn get(&self, id: SessionId) -> Result<&Session> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.sessions.get(i))
            .ok_or(Error::SessionNotFound(id))
    }

    /// All sessions in creation order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the registry, returning its sessions and diagnostics.
    pub fn into_parts(self) -> (Vec<Session>, Vec<Diagnostic>) {
        (self.sessions, self.diagnostics)
    }

    fn resolve(&self, event: &Event) -> Resolution {
        let mut candidates: Vec<usize> = Vec::new();
        if let Some(enb) = event.keys.enb {
            candidates.extend(self.by_enb.get(&enb).into_iter().flatten());
        }
        if let Some(mme) = event.keys.mme {
            candidates.extend(self.by_mme.get(&mme).into_iter().flatten());
        }
        candidates.sort_unstable();
        candidates.dedup();

        let scored: Vec<(usize, u8)> = candidates
            .into_iter()
            .filter_map(|i| {
                self.sessions[i]
                    .keys()
                    .match_score(&event.keys)
                    .filter(|&s| s > 0)
                    .map(|s| (i, s))
            })
            .collect();

        let Some(best) = scored.iter().map(|(_, s)| *s).max() else {
            return Resolution::New;
        };
        let tied: Vec<usize> = scored
            .into_iter()
            .filter(|(_, s)| *s == best)
            .map(|(i, _)| i)
            .collect();

        if tied.len() == 1 {
            return Resolution::Match(tied[0]);
        }

        // A session that starts after the event cannot own it.
        if let Some(ts) = event.timestamp {
            let plausible: Vec<usize> = tied
                .iter()
                .copied()
                .filter(|&i| self.sessions[i].start_ts().map_or(true, |start| start <= ts))
                .collect();
            if plausible.len() == 1 {
                return Resolution::Match(plausible[0]);
            }
        }

        Resolution::Ambiguous(tied)
    }

    fn create(&mut self, event: Event) -> SessionId {
        let index = self.sessions.len();
        let id = SessionId(index as u64);
        let closes = self.closes_session(&event);

        tracing::trace!(session = %id, keys = %event.keys, seq = event.seq, "New session");
        self.stats.events_ingested += 1;
        self.sessions.push(Session::new(id, event));
        self.index(index);
        if closes {
            self.close(index);
        }
        id
    }

    fn attach(&mut self, index: usize, event: Event) -> SessionId {
        let closes = self.closes_session(&event);
        self.stats.events_ingested += 1;
        self.sessions[index].attach(event);
        self.index(index);
        if closes {
            self.close(index);
        }
        self.sessions[index].id()
    }

    fn closes_session(&self, event: &Event) -> bool {
        !self.keep_open_after_release && normalize_name(&event.message_name) == RELEASE_COMPLETE
    }

    fn index(&mut self, index: usize) {
        let keys = self.sessions[index].keys();
        if let Some(enb) = keys.enb {
            let slot = self.by_enb.entry(enb).or_default();
            if !slot.contains(&index) {
                slot.push(index);
            }
        }
        if let Some(mme) = keys.mme {
            let slot = self.by_mme.entry(mme).or_default();
            if !slot.contains(&index) {
                slot.push(index);
            }
        }
    }

    fn close(&mut self, index: usize) {
        let session = &mut self.sessions[index];
        session.close();
        let keys = session.keys();
        tracing::trace!(session = %session.id(), keys = %keys, "Session closed by release");

        if let Some(enb) = keys.enb {
            unindex(&mut self.by_enb, enb, index);
        }
        if let Some(mme) = keys.mme {
            unindex(&mut self.by_mme, mme, index);
        }
    }

    fn ids(&self, indices: &[usize]) -> Vec<SessionId> {
        indices.iter().map(|&i| self.sessions[i].id()).collect()
    }
}

fn unindex(map: &mut HashMap<u32, Vec<usize>>, key: u32, index: usize) {
    if let Some(slot) = map.get_mut(&key) {
        slot.retain(|&i| i != index);
        if slot.is_empty() {
            map.remove(&key);
        }
    }
}

/// Registry shared between threads.
///
/// The lookup and the create/append of one `ingest` happen under a single
/// lock acquisition, so concurrent producers never split a session.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<SessionRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    pub fn ingest(&self, event: Event) -> Result<SessionId> {
        self.lock().ingest(event)
    }

    pub fn ingest_resolving(&self, event: Event, policy: AmbiguityPolicy) -> Placement {
        self.lock().ingest_resolving(event, policy)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionRegistry) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, SessionRegistry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
