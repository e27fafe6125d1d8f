//! Session classification
//!
//! [`Classifier::finalize`] walks a session's timeline once and tracks every
//! procedure of the [`Procedure`] table through its required steps.
//!
//! For each event, in timeline order:
//!
//! 1. Every in-progress tracker checks the event: a failure marker fails it,
//!    the next required step advances it (completing it after the last step),
//!    an optional step is kept as evidence.
//! 2. A procedure whose first step matches, and that has no instance in
//!    progress, starts a new tracker. A start event that is itself a failure
//!    marker fails the new tracker at once.
//! 3. A general failure marker, or a procedure's failure step, that no
//!    tracker consumed is recorded as an unattributed failure of the session.
//!    Late events can complete a procedure ahead of its failure step in the
//!    timeline; the failure still counts.
//!
//! The session status is `failure` if any tracker failed or an unattributed
//! marker was seen, `incomplete` if any tracker is still in progress or none
//! completed, and `success` otherwise.
//!
//! Classification reads the session and nothing else, so it is deterministic
//! and idempotent.

mod procedures;

pub use procedures::{Procedure, Step};

use crate::config::ClassifierConfig;
use crate::protocol::cause::AbnormalCauses;
use crate::protocol::normalize_name;
use crate::session::Session;
use crate::types::{ClassificationResult, EvidenceItem, Event, Outcome, SessionStatus};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerState {
    InProgress { next: usize },
    Complete,
    Failed,
}

#[derive(Debug)]
struct Tracker {
    procedure: Procedure,
    state: TrackerState,
    /// Timeline positions that contributed to this tracker
    evidence: Vec<usize>,
}

/// A failure seen while walking the timeline, with its timeline position.
#[derive(Debug)]
struct FailureNote {
    position: usize,
    reason: String,
}

/// Classifies sessions against the procedure table.
#[derive(Debug, Clone)]
pub struct Classifier {
    procedures: Vec<Procedure>,
    abnormal: AbnormalCauses,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            procedures: Procedure::ALL.to_vec(),
            abnormal: AbnormalCauses::new(),
        }
    }
}

impl Classifier {
    /// Classifier with every procedure and the default abnormal causes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `[classifier]` settings: disabled procedures and extra abnormal causes.
    ///
    /// Unknown procedure names are ignored here; `Config::validate` rejects them.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let disabled: Vec<Procedure> = config
            .disabled_procedures
            .iter()
            .filter_map(|name| Procedure::from_name(name))
            .collect();
        Self {
            procedures: Procedure::ALL
                .into_iter()
                .filter(|p| !disabled.contains(p))
                .collect(),
            abnormal: AbnormalCauses::with_extra(&config.extra_abnormal_causes),
        }
    }

    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    /// Classify one session.
    pub fn finalize(&self, session: &Session) -> ClassificationResult {
        let timeline = session.timeline();
        let mut trackers: Vec<Tracker> = Vec::new();
        let mut failures: Vec<FailureNote> = Vec::new();
        let mut unattributed: Vec<usize> = Vec::new();

        for (position, event) in timeline.iter().enumerate() {
            let marker = self.failure_marker(event);
            let mut consumed = false;

            for tracker in trackers.iter_mut() {
                let TrackerState::InProgress { next } = tracker.state else {
                    continue;
                };
                let procedure = tracker.procedure;

                let why = marker.clone().or_else(|| {
                    procedure
                        .failures()
                        .iter()
                        .any(|step| step.matches(event))
                        .then(|| format!("{} failure", procedure))
                });
                if let Some(why) = why {
                    tracker.state = TrackerState::Failed;
                    tracker.evidence.push(position);
                    failures.push(FailureNote {
                        position,
                        reason: format!("{} failed at {}: {}", procedure, event.label(), why),
                    });
                    consumed = true;
                    continue;
                }

                let required = procedure.required();
                if required[next].matches(event) {
                    tracker.evidence.push(position);
                    tracker.state = if next + 1 == required.len() {
                        TrackerState::Complete
                    } else {
                        TrackerState::InProgress { next: next + 1 }
                    };
                } else if procedure.optional().iter().any(|step| step.matches(event)) {
                    tracker.evidence.push(position);
                }
            }

            for &procedure in &self.procedures {
                let running = trackers.iter().any(|t| {
                    t.procedure == procedure && matches!(t.state, TrackerState::InProgress { .. })
                });
                if running || !procedure.starts_with(event) {
                    continue;
                }

                let state = match &marker {
                    Some(why) => {
                        failures.push(FailureNote {
                            position,
                            reason: format!("{} failed at {}: {}", procedure, event.label(), why),
                        });
                        consumed = true;
                        TrackerState::Failed
                    }
                    None if procedure.required().len() == 1 => TrackerState::Complete,
                    None => TrackerState::InProgress { next: 1 },
                };
                trackers.push(Tracker {
                    procedure,
                    state,
                    evidence: vec![position],
                });
            }

            if consumed {
                continue;
            }
            if let Some(why) = marker.or_else(|| self.failure_step_of(event)) {
                unattributed.push(position);
                failures.push(FailureNote {
                    position,
                    reason: format!("{}: {}", event.label(), why),
                });
            }
        }

        self.verdict(timeline, &trackers, &failures, &unattributed)
    }

    fn verdict(
        &self,
        timeline: &[Event],
        trackers: &[Tracker],
        failures: &[FailureNote],
        unattributed: &[usize],
    ) -> ClassificationResult {
        let mut observed: Vec<String> = Vec::new();
        for tracker in trackers {
            let name = tracker.procedure.name();
            if !observed.iter().any(|n| n == name) {
                observed.push(name.to_string());
            }
        }

        let any_failed = trackers.iter().any(|t| t.state == TrackerState::Failed);
        let any_running = trackers
            .iter()
            .any(|t| matches!(t.state, TrackerState::InProgress { .. }));
        let any_complete = trackers.iter().any(|t| t.state == TrackerState::Complete);

        let status = if any_failed || !unattributed.is_empty() {
            SessionStatus::Failure
        } else if any_running || !any_complete {
            SessionStatus::Incomplete
        } else {
            SessionStatus::Success
        };

        let failure_reason = match status {
            SessionStatus::Failure => failures
                .iter()
                .min_by_key(|f| f.position)
                .map(|f| f.reason.clone()),
            _ => None,
        };

        let unknown_procedure = trackers.is_empty();
        let evidence = if unknown_procedure {
            timeline.iter().map(EvidenceItem::from_event).collect()
        } else {
            let positions: BTreeSet<usize> = trackers
                .iter()
                .flat_map(|t| t.evidence.iter().copied())
                .chain(unattributed.iter().copied())
                .collect();
            positions
                .into_iter()
                .map(|i| EvidenceItem::from_event(&timeline[i]))
                .collect()
        };

        ClassificationResult {
            status,
            observed_procedures: observed,
            failure_reason,
            evidence,
            unknown_procedure,
        }
    }

    /// The enabled procedure whose failure steps include `event`, as a reason.
    fn failure_step_of(&self, event: &Event) -> Option<String> {
        self.procedures
            .iter()
            .find(|p| p.failures().iter().any(|step| step.matches(event)))
            .map(|p| format!("{} failure", p))
    }

    /// Why `event` is a general failure marker, if it is one.
    fn failure_marker(&self, event: &Event) -> Option<String> {
        if let Some(cause) = event.cause.as_deref() {
            if self.abnormal.is_abnormal(cause) {
                return Some(format!("abnormal cause '{}'", cause));
            }
        }
        if event.outcome == Some(Outcome::Unsuccessful) {
            return Some("unsuccessful outcome".to_string());
        }
        std::iter::once(event.message_name.as_str())
            .chain(event.nas_message.as_deref())
            .find(|name| {
                let n = normalize_name(name);
                n.ends_with("reject") || n.ends_with("failure")
            })
            .map(|name| format!("{} received", name))
    }
}
