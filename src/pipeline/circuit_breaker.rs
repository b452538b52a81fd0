//! Circuit breaker for syncs that would shrink a collection.
//!
//! A run that suddenly covers far fewer documents than the store holds is
//! usually a partial scrape or a changed page layout. The breaker judges a
//! reconciliation against the snapshot it was planned from: under
//! `StalePolicy::Remove` a shrinking plan is refused before any write, under
//! `Retain` it is only reported.

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{CircuitBreakerConfig, StalePolicy};
use crate::pipeline::diff::Snapshot;
use crate::pipeline::sync::Reconciliation;

/// Distinct documents the run still vouches for: stored ones it produced
/// again plus identities it adds.
pub fn covered_after(plan: &Reconciliation, snapshot: &Snapshot) -> usize {
    let added: HashSet<&str> = plan
        .writes
        .iter()
        .map(|(id, _)| id.as_str())
        .filter(|id| !snapshot.contains_key(*id))
        .collect();
    snapshot.len().saturating_sub(plan.stale) + added.len()
}

/// How a plan measures up against the stored collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Every stored document is produced again
    NoStale,
    /// Too few stored documents to judge a drop
    BelowBaseline { stored: usize, stale: usize },
    /// Stale documents, but the covered count stays within the limit
    WithinLimit {
        stored: usize,
        stale: usize,
        covered: usize,
    },
    /// Covered count fell further than the limit allows
    Tripped {
        stored: usize,
        covered: usize,
        drop_percent: f64,
    },
    /// The run covers nothing of a populated collection
    EmptyRun { stored: usize },
}

#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config }
    }

    pub fn judge(&self, plan: &Reconciliation, snapshot: &Snapshot) -> Verdict {
        let stored = snapshot.len();
        if plan.stale == 0 {
            return Verdict::NoStale;
        }

        let covered = covered_after(plan, snapshot);
        if covered == 0 {
            return Verdict::EmptyRun { stored };
        }
        if stored < self.config.min_baseline {
            return Verdict::BelowBaseline {
                stored,
                stale: plan.stale,
            };
        }

        let drop_percent = stored.saturating_sub(covered) as f64 * 100.0 / stored as f64;
        if drop_percent > f64::from(self.config.max_drop_percent) {
            Verdict::Tripped {
                stored,
                covered,
                drop_percent,
            }
        } else {
            Verdict::WithinLimit {
                stored,
                stale: plan.stale,
                covered,
            }
        }
    }

    /// Judge `plan` and act on the verdict for `policy`.
    ///
    /// Only `Remove` turns a trip or an empty run into an error.
    pub fn enforce(
        &self,
        plan: &Reconciliation,
        snapshot: &Snapshot,
        policy: StalePolicy,
    ) -> Result<Verdict> {
        let verdict = self.judge(plan, snapshot);

        match (&verdict, policy) {
            (
                Verdict::Tripped {
                    stored,
                    covered,
                    drop_percent,
                },
                StalePolicy::Remove,
            ) => {
                log::error!(
                    "Circuit breaker: TRIGGERED, run covers {covered} of {stored} documents \
                     ({drop_percent:.1}% drop > {}% threshold)",
                    self.config.max_drop_percent
                );
                return Err(AppError::CircuitBreakerTriggered {
                    covered: *covered,
                    stored: *stored,
                    drop_percent: *drop_percent,
                    threshold_percent: self.config.max_drop_percent,
                });
            }
            (Verdict::EmptyRun { stored }, StalePolicy::Remove) => {
                log::error!("Circuit breaker: run covers none of {stored} documents");
                return Err(AppError::EmptySyncResult);
            }
            (
                Verdict::Tripped {
                    stored,
                    covered,
                    drop_percent,
                },
                StalePolicy::Retain,
            ) => {
                log::warn!(
                    "Run covers {covered} of {stored} stored documents ({drop_percent:.1}% fewer); \
                     stale documents are retained"
                );
            }
            (Verdict::EmptyRun { stored }, StalePolicy::Retain) => {
                log::warn!("Run produced no records against {stored} stored documents");
            }
            (Verdict::BelowBaseline { stored, stale }, _) => {
                log::info!(
                    "Circuit breaker: {stale} stale of {stored} documents, below baseline of {}",
                    self.config.min_baseline
                );
            }
            (
                Verdict::WithinLimit {
                    stored,
                    stale,
                    covered,
                },
                _,
            ) => {
                log::info!(
                    "Circuit breaker: {stale} stale, run covers {covered} of {stored} documents"
                );
            }
            (Verdict::NoStale, _) => {}
        }

        Ok(verdict)
    }
}
