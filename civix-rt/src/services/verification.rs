//! # Verification State Machine
//!
//! The only code path that changes a report's `status` or
//! `verification_count`.
//!
//! Rules for a request to move report `r` to status `T` by actor `A`:
//!
//! - `r` is `Solved`: terminal, the request is ignored.
//! - `A` owns `r`: `T` applies immediately, the count is untouched. Asking for
//!   the current status is a no-op.
//! - Anyone else: the request is a vote. The count goes up by one and `T`
//!   applies once the count reaches `votes_required`. A vote for the status
//!   the report already has still counts.

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ReportResult;
use crate::models::{Report, ReportStatus, UserId};
use crate::services::access::Operation;
use crate::services::store::ReportStore;

/// What a transition request amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Requested status took effect
    Applied {
        from: ReportStatus,
        to: ReportStatus,
    },
    /// Vote counted, status unchanged
    VoteRecorded { votes: u32, required: u32 },
    /// Owner asked for the status the report already has
    Unchanged,
    /// Report is solved; nothing changes any more
    Terminal,
}

/// Result of evaluating one request against a report snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub status: ReportStatus,
    pub verification_count: u32,
    pub outcome: TransitionOutcome,
}

impl Decision {
    /// Whether the decision has anything to persist
    pub fn mutates(&self) -> bool {
        matches!(
            self.outcome,
            TransitionOutcome::Applied { .. } | TransitionOutcome::VoteRecorded { .. }
        )
    }
}

/// Crowd-corroboration policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    votes_required: u32,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self { votes_required: 2 }
    }
}

impl VerificationPolicy {
    /// `votes_required` below one is treated as one
    pub fn new(votes_required: u32) -> Self {
        Self {
            votes_required: votes_required.max(1),
        }
    }

    pub fn votes_required(&self) -> u32 {
        self.votes_required
    }

    /// Pure transition rule; no I/O
    pub fn evaluate(&self, report: &Report, target: ReportStatus, actor: &UserId) -> Decision {
        let current = Decision {
            status: report.status,
            verification_count: report.verification_count,
            outcome: TransitionOutcome::Unchanged,
        };

        if report.status.is_terminal() {
            return Decision {
                outcome: TransitionOutcome::Terminal,
                ..current
            };
        }

        if report.is_owned_by(actor) {
            if target == report.status {
                return current;
            }
            return Decision {
                status: target,
                outcome: TransitionOutcome::Applied {
                    from: report.status,
                    to: target,
                },
                ..current
            };
        }

        let votes = report.verification_count.saturating_add(1);
        if votes >= self.votes_required {
            Decision {
                status: target,
                verification_count: votes,
                outcome: TransitionOutcome::Applied {
                    from: report.status,
                    to: target,
                },
            }
        } else {
            Decision {
                status: report.status,
                verification_count: votes,
                outcome: TransitionOutcome::VoteRecorded {
                    votes,
                    required: self.votes_required,
                },
            }
        }
    }
}

/// Applies [`VerificationPolicy`] decisions to stored reports
#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationMachine {
    policy: VerificationPolicy,
}

impl VerificationMachine {
    pub fn new(policy: VerificationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// Evaluate and persist one status request under the report's lock
    pub async fn request_transition(
        &self,
        store: &ReportStore,
        id: Uuid,
        target: ReportStatus,
        actor: UserId,
    ) -> ReportResult<Report> {
        let _lock = store.lock_record(id).await;

        let report = store.get(id).await?;
        store
            .guard()
            .authorize(&report, &actor, Operation::ChangeStatus)?;

        let decision = self.policy.evaluate(&report, target, &actor);
        if !decision.mutates() {
            debug!(
                report_id = %id,
                actor = %actor,
                target = %target,
                outcome = ?decision.outcome,
                "Status request ignored"
            );
            return Ok(report);
        }

        let updated = store
            .write_verification(&report, decision.status, decision.verification_count)
            .await?;

        match decision.outcome {
            TransitionOutcome::Applied { from, to } => info!(
                report_id = %id,
                actor = %actor,
                from = %from,
                to = %to,
                verification_count = updated.verification_count,
                "Report status changed"
            ),
            TransitionOutcome::VoteRecorded { votes, required } => info!(
                report_id = %id,
                actor = %actor,
                target = %target,
                votes,
                required,
                "Verification vote recorded"
            ),
            TransitionOutcome::Unchanged | TransitionOutcome::Terminal => {}
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::models::Category;
    use chrono::Utc;

    fn report(owner: UserId, status: ReportStatus, count: u32) -> Report {
        let now = Utc::now();
        Report {
            id: Uuid::new_v4(),
            title: "Graffiti".to_string(),
            description: "Tagged bus shelter".to_string(),
            location_label: "Dundas West station".to_string(),
            category: Category::Cleanliness,
            category_label: Category::Cleanliness.label().to_string(),
            location: GeoPoint::new(-79.4527, 43.6567),
            address: None,
            status,
            verification_count: count,
            owner_id: owner,
            images: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_owner_applies_immediately_without_counting() {
        let owner = UserId::new_random();
        let r = report(owner, ReportStatus::Flagged, 0);

        let d = VerificationPolicy::default().evaluate(&r, ReportStatus::Solved, &owner);
        assert_eq!(d.status, ReportStatus::Solved);
        assert_eq!(d.verification_count, 0);
        assert!(d.mutates());
    }

    #[test]
    fn test_owner_same_status_is_noop() {
        let owner = UserId::new_random();
        let r = report(owner, ReportStatus::Verified, 1);

        let d = VerificationPolicy::default().evaluate(&r, ReportStatus::Verified, &owner);
        assert_eq!(d.outcome, TransitionOutcome::Unchanged);
        assert!(!d.mutates());
    }

    #[test]
    fn test_votes_accumulate_then_apply() {
        let policy = VerificationPolicy::default();
        let mut r = report(UserId::new_random(), ReportStatus::Flagged, 0);

        let first = policy.evaluate(&r, ReportStatus::Verified, &UserId::new_random());
        assert_eq!(
            first.outcome,
            TransitionOutcome::VoteRecorded {
                votes: 1,
                required: 2
            }
        );
        assert_eq!(first.status, ReportStatus::Flagged);

        r.verification_count = first.verification_count;
        let second = policy.evaluate(&r, ReportStatus::Verified, &UserId::new_random());
        assert_eq!(second.status, ReportStatus::Verified);
        assert_eq!(second.verification_count, 2);
    }

    #[test]
    fn test_non_owner_same_status_still_votes() {
        let r = report(UserId::new_random(), ReportStatus::Flagged, 0);
        let d = VerificationPolicy::default().evaluate(&r, ReportStatus::Flagged, &UserId::new_random());
        assert_eq!(d.verification_count, 1);
        assert!(d.mutates());
    }

    #[test]
    fn test_solved_is_terminal() {
        let owner = UserId::new_random();
        let r = report(owner, ReportStatus::Solved, 3);
        let policy = VerificationPolicy::default();

        for actor in [owner, UserId::new_random()] {
            let d = policy.evaluate(&r, ReportStatus::Flagged, &actor);
            assert_eq!(d.outcome, TransitionOutcome::Terminal);
            assert_eq!(d.status, ReportStatus::Solved);
            assert_eq!(d.verification_count, 3);
        }
    }

    #[test]
    fn test_single_vote_policy_applies_on_first_vote() {
        let r = report(UserId::new_random(), ReportStatus::Flagged, 0);
        let d = VerificationPolicy::new(0).evaluate(&r, ReportStatus::InProgress, &UserId::new_random());
        assert_eq!(d.status, ReportStatus::InProgress);
        assert_eq!(d.verification_count, 1);
    }
}
