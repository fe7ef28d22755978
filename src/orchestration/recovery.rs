//! # Structural-Failure Recovery Coordinator
//!
//! A three-state machine deciding whether a run gets its single regenerate-
//! and-retry pass.
//!
//! ```text
//! Initial ──evaluate()──▶ Recovering ──complete()──▶ Done
//!    │
//!    └──evaluate() with nothing to recover──────────▶ Done
//! ```
//!
//! Once `Done`, the coordinator refuses further transitions, which makes "at
//! most one recovery pass per run" a property of the type rather than of the
//! calling code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{PlotStatsError, Result};
use crate::orchestration::merger::MergedResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryState {
    Initial,
    Recovering,
    Done,
}

impl fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryState::Initial => write!(f, "initial"),
            RecoveryState::Recovering => write!(f, "recovering"),
            RecoveryState::Done => write!(f, "done"),
        }
    }
}

/// When a structural failure earns a strict rebuild and re-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Re-run every batch, but only when no row succeeded and at least one
    /// batch failed structurally
    #[default]
    WhenNothingSucceeded,
    /// As above; additionally, when some rows succeeded, re-run only the
    /// structurally failed batches
    StructuralSubset,
    /// Never recover
    Disabled,
}

impl fmt::Display for RecoveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryPolicy::WhenNothingSucceeded => write!(f, "when_nothing_succeeded"),
            RecoveryPolicy::StructuralSubset => write!(f, "structural_subset"),
            RecoveryPolicy::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for RecoveryPolicy {
    type Err = PlotStatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "when_nothing_succeeded" => Ok(RecoveryPolicy::WhenNothingSucceeded),
            "structural_subset" => Ok(RecoveryPolicy::StructuralSubset),
            "disabled" => Ok(RecoveryPolicy::Disabled),
            other => Err(PlotStatsError::InvalidInput(format!(
                "unknown recovery policy: {other}"
            ))),
        }
    }
}

/// What the orchestrator should do after the first pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Keep the first pass result
    Proceed,
    /// Rebuild strictly and re-run the whole record set
    RecoverAll,
    /// Rebuild strictly and re-run only these batch indices
    RecoverBatches(Vec<usize>),
}

impl RecoveryDecision {
    pub fn is_recovery(&self) -> bool {
        !matches!(self, RecoveryDecision::Proceed)
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryCoordinator {
    policy: RecoveryPolicy,
    state: RecoveryState,
}

impl RecoveryCoordinator {
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self {
            policy,
            state: RecoveryState::Initial,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn policy(&self) -> RecoveryPolicy {
        self.policy
    }

    /// Inspect the first pass and decide; only valid in `Initial`
    pub fn evaluate(&mut self, first_pass: &MergedResult) -> Result<RecoveryDecision> {
        if self.state != RecoveryState::Initial {
            return Err(self.illegal("evaluate"));
        }

        let decision = self.decide(first_pass);
        self.state = if decision.is_recovery() {
            RecoveryState::Recovering
        } else {
            RecoveryState::Done
        };

        info!(
            policy = %self.policy,
            rows = first_pass.row_count(),
            failures = first_pass.failures.len(),
            decision = ?decision,
            state = %self.state,
            "Recovery evaluated"
        );
        Ok(decision)
    }

    /// Mark the recovery pass finished, whatever its outcome; only valid in `Recovering`
    pub fn complete(&mut self) -> Result<()> {
        if self.state != RecoveryState::Recovering {
            return Err(self.illegal("complete"));
        }
        self.state = RecoveryState::Done;
        Ok(())
    }

    fn decide(&self, first_pass: &MergedResult) -> RecoveryDecision {
        if !first_pass.has_structural_failure() {
            return RecoveryDecision::Proceed;
        }

        match self.policy {
            RecoveryPolicy::Disabled => RecoveryDecision::Proceed,
            _ if first_pass.row_count() == 0 => RecoveryDecision::RecoverAll,
            RecoveryPolicy::WhenNothingSucceeded => RecoveryDecision::Proceed,
            RecoveryPolicy::StructuralSubset => RecoveryDecision::RecoverBatches(
                first_pass
                    .structural_failures()
                    .map(|failure| failure.batch_index)
                    .collect(),
            ),
        }
    }

    fn illegal(&self, event: &str) -> PlotStatsError {
        PlotStatsError::StateTransitionError(format!(
            "recovery coordinator cannot {event} from state {}",
            self.state
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchFailure, FailureKind, PlotIdRange, ResultRow};

    fn failure(batch_index: usize, kind: FailureKind) -> BatchFailure {
        let first = batch_index as u64 * 10 + 1;
        BatchFailure {
            batch_index,
            plot_ids: PlotIdRange::new(first, first + 9),
            kind,
            message: "failed".to_string(),
            attempts: 1,
        }
    }

    fn result(rows: usize, failures: Vec<BatchFailure>) -> MergedResult {
        MergedResult {
            rows: (1..=rows as u64).map(ResultRow::new).collect(),
            failures,
        }
    }

    #[test]
    fn test_all_structural_triggers_full_recovery_once() {
        let mut coordinator = RecoveryCoordinator::new(RecoveryPolicy::default());
        let first = result(
            0,
            vec![
                failure(0, FailureKind::Structural),
                failure(1, FailureKind::Structural),
            ],
        );

        assert_eq!(coordinator.evaluate(&first).unwrap(), RecoveryDecision::RecoverAll);
        assert_eq!(coordinator.state(), RecoveryState::Recovering);

        coordinator.complete().unwrap();
        assert_eq!(coordinator.state(), RecoveryState::Done);

        assert!(matches!(
            coordinator.evaluate(&first),
            Err(PlotStatsError::StateTransitionError(_))
        ));
        assert!(coordinator.complete().is_err());
    }

    #[test]
    fn test_partial_success_does_not_recover_by_default() {
        let mut coordinator = RecoveryCoordinator::new(RecoveryPolicy::WhenNothingSucceeded);
        let first = result(40, vec![failure(2, FailureKind::Structural)]);

        assert_eq!(coordinator.evaluate(&first).unwrap(), RecoveryDecision::Proceed);
        assert_eq!(coordinator.state(), RecoveryState::Done);
    }

    #[test]
    fn test_no_structural_failure_never_recovers() {
        let mut coordinator = RecoveryCoordinator::new(RecoveryPolicy::StructuralSubset);
        let first = result(0, vec![failure(0, FailureKind::Fatal)]);

        assert_eq!(coordinator.evaluate(&first).unwrap(), RecoveryDecision::Proceed);
        assert!(coordinator.complete().is_err());
    }

    #[test]
    fn test_structural_subset_reruns_only_structural_batches() {
        let mut coordinator = RecoveryCoordinator::new(RecoveryPolicy::StructuralSubset);
        let first = result(
            20,
            vec![
                failure(2, FailureKind::Structural),
                failure(3, FailureKind::Fatal),
                failure(4, FailureKind::Structural),
            ],
        );

        assert_eq!(
            coordinator.evaluate(&first).unwrap(),
            RecoveryDecision::RecoverBatches(vec![2, 4])
        );
    }

    #[test]
    fn test_disabled_policy() {
        let mut coordinator = RecoveryCoordinator::new(RecoveryPolicy::Disabled);
        let first = result(0, vec![failure(0, FailureKind::Structural)]);
        assert_eq!(coordinator.evaluate(&first).unwrap(), RecoveryDecision::Proceed);
    }

    #[test]
    fn test_policy_round_trips_through_strings() {
        for policy in [
            RecoveryPolicy::WhenNothingSucceeded,
            RecoveryPolicy::StructuralSubset,
            RecoveryPolicy::Disabled,
        ] {
            assert_eq!(policy.to_string().parse::<RecoveryPolicy>().unwrap(), policy);
        }
        assert!("sometimes".parse::<RecoveryPolicy>().is_err());
    }
}
