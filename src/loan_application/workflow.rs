//! Application status transition table
//!
//! Statuses form a closed set. A move is legal only if the target appears in
//! the source's row below; REJECTED and CLOSED have no outgoing edges.
//!
//! ```text
//! DRAFT        -> SUBMITTED | UNDER_REVIEW | REJECTED
//! SUBMITTED    -> UNDER_REVIEW | APPROVED | REJECTED
//! UNDER_REVIEW -> APPROVED | REJECTED
//! APPROVED     -> DISBURSED
//! DISBURSED    -> CLOSED
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{ApplicationStatus, LoanApplication};
use crate::error::{ApiError, ApiResult};

use ApplicationStatus::*;

pub fn allowed_targets(from: ApplicationStatus) -> &'static [ApplicationStatus] {
    match from {
        Draft => &[Submitted, UnderReview, Rejected],
        Submitted => &[UnderReview, Approved, Rejected],
        UnderReview => &[Approved, Rejected],
        Approved => &[Disbursed],
        Disbursed => &[Closed],
        Rejected | Closed => &[],
    }
}

pub fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    allowed_targets(from).contains(&to)
}

pub fn is_terminal(status: ApplicationStatus) -> bool {
    allowed_targets(status).is_empty()
}

/// Statuses whose pledged collateral goes back to the customer
pub fn releases_collateral(status: ApplicationStatus) -> bool {
    matches!(status, Rejected | Closed)
}

/// Statuses in which more collateral may still be pledged
pub fn accepts_collateral(status: ApplicationStatus) -> bool {
    matches!(status, Draft | Submitted | UnderReview)
}

/// Requested move with its optional reviewer input
#[derive(Debug, Clone)]
pub struct Transition {
    pub to: ApplicationStatus,
    pub review_notes: Option<String>,
    pub approved_amount: Option<f64>,
}

/// Validate the edge and produce the updated application.
///
/// The caller persists the result with a write conditional on the original
/// status still being current.
pub fn apply(
    application: &LoanApplication,
    transition: Transition,
    actor_id: Uuid,
    now: DateTime<Utc>,
) -> ApiResult<LoanApplication> {
    let from = application.status;
    let to = transition.to;

    if !can_transition(from, to) {
        return Err(ApiError::InvalidTransition { from, to });
    }

    let mut updated = application.clone();
    updated.status = to;
    updated.reviewed_by_id = Some(actor_id);
    updated.reviewed_at = Some(now);
    updated.updated_at = now;
    if transition.review_notes.is_some() {
        updated.review_notes = transition.review_notes.clone();
    }

    match to {
        Approved => {
            if let Some(amount) = transition.approved_amount {
                if !amount.is_finite() || amount <= 0.0 {
                    return Err(ApiError::ValidationError(
                        "Approved amount must be a positive number".to_string(),
                    ));
                }
                updated.approved_amount = Some(amount);
            }
            updated.approved_by_id = Some(actor_id);
            updated.approved_at = Some(now);
        }
        Rejected => {
            updated.rejected_at = Some(now);
            updated.rejection_reason = transition.review_notes;
        }
        Disbursed => updated.disbursed_at = Some(now),
        Closed => updated.closed_at = Some(now),
        Draft | Submitted | UnderReview => {}
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(status: ApplicationStatus) -> LoanApplication {
        let now = Utc::now();
        LoanApplication {
            id: Uuid::new_v4(),
            application_number: "APP20260400001".to_string(),
            customer_id: Uuid::new_v4(),
            loan_product_id: Uuid::new_v4(),
            requested_amount: 500_000.0,
            approved_amount: None,
            tenure_months: 24,
            interest_rate: 12.0,
            purpose_of_loan: "Working capital".to_string(),
            monthly_income: Some(120_000.0),
            existing_emi: None,
            calculated_emi: 23_536.74,
            status,
            review_notes: None,
            rejection_reason: None,
            reviewed_by_id: None,
            reviewed_at: None,
            approved_by_id: None,
            approved_at: None,
            rejected_at: None,
            disbursed_at: None,
            closed_at: None,
            created_by_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn to(status: ApplicationStatus) -> Transition {
        Transition {
            to: status,
            review_notes: None,
            approved_amount: None,
        }
    }

    #[test]
    fn test_transition_table() {
        assert!(can_transition(Draft, Submitted));
        assert!(can_transition(Draft, UnderReview));
        assert!(can_transition(Submitted, Approved));
        assert!(can_transition(UnderReview, Rejected));
        assert!(can_transition(Approved, Disbursed));
        assert!(can_transition(Disbursed, Closed));

        assert!(!can_transition(Draft, Approved));
        assert!(!can_transition(Disbursed, Draft));
        assert!(!can_transition(Approved, Rejected));
        assert!(!can_transition(Closed, Disbursed));
    }

    #[test]
    fn test_no_self_transitions() {
        for status in ApplicationStatus::ALL {
            assert!(!can_transition(status, status), "{status} -> {status}");
        }
    }

    #[test]
    fn test_terminal_states_have_no_edges() {
        assert!(is_terminal(Rejected));
        assert!(is_terminal(Closed));
        for status in ApplicationStatus::ALL {
            assert!(!can_transition(Rejected, status));
            assert!(!can_transition(Closed, status));
        }
        assert!(!is_terminal(Approved));
    }

    #[test]
    fn test_every_illegal_edge_is_rejected() {
        for from in ApplicationStatus::ALL {
            for target in ApplicationStatus::ALL {
                let result = apply(&application(from), to(target), Uuid::new_v4(), Utc::now());
                if can_transition(from, target) {
                    assert!(result.is_ok(), "{from} -> {target}");
                } else {
                    assert!(
                        matches!(result, Err(ApiError::InvalidTransition { .. })),
                        "{from} -> {target}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_approve_records_approver_and_amount() {
        let actor = Uuid::new_v4();
        let now = Utc::now();
        let updated = apply(
            &application(UnderReview),
            Transition {
                to: Approved,
                review_notes: Some("Income verified".to_string()),
                approved_amount: Some(450_000.0),
            },
            actor,
            now,
        )
        .unwrap();

        assert_eq!(updated.status, Approved);
        assert_eq!(updated.approved_amount, Some(450_000.0));
        assert_eq!(updated.approved_by_id, Some(actor));
        assert_eq!(updated.approved_at, Some(now));
        assert_eq!(updated.reviewed_by_id, Some(actor));
        assert_eq!(updated.review_notes.as_deref(), Some("Income verified"));
        // EMI stays on the requested amount
        assert_eq!(updated.calculated_emi, 23_536.74);
    }

    #[test]
    fn test_approve_rejects_non_positive_amount() {
        let result = apply(
            &application(Submitted),
            Transition {
                to: Approved,
                review_notes: None,
                approved_amount: Some(0.0),
            },
            Uuid::new_v4(),
            Utc::now(),
        );
        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_approved_amount_ignored_for_other_targets() {
        let updated = apply(
            &application(Submitted),
            Transition {
                to: UnderReview,
                review_notes: None,
                approved_amount: Some(1.0),
            },
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(updated.approved_amount, None);
        assert_eq!(updated.approved_by_id, None);
    }

    #[test]
    fn test_reject_stores_reason() {
        let updated = apply(
            &application(Submitted),
            Transition {
                to: Rejected,
                review_notes: Some("Insufficient collateral".to_string()),
                approved_amount: None,
            },
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(updated.rejection_reason.as_deref(), Some("Insufficient collateral"));
        assert!(updated.rejected_at.is_some());
    }

    #[test]
    fn test_disburse_and_close_stamp_times() {
        let disbursed = apply(&application(Approved), to(Disbursed), Uuid::new_v4(), Utc::now())
            .unwrap();
        assert!(disbursed.disbursed_at.is_some());

        let closed = apply(&disbursed, to(Closed), Uuid::new_v4(), Utc::now()).unwrap();
        assert!(closed.closed_at.is_some());
        assert!(releases_collateral(closed.status));
    }
}
