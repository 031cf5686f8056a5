//! Conflict analysis and repair planning.
//!
//! Pure functions over a community plus its candidate subscription records.
//! `ConflictAnalysis` classifies drift into the four fault categories;
//! `CleanupPlan` decides the minimally-destructive repair. Both are
//! side-effect-free: the resolve handler applies plans against the stores
//! and accumulates per-record failures.
//!
//! Candidate records are fetched with the intentional
//! `community_id OR admin_id` filter (see
//! `SubscriptionRecordStore::find_reconciliation_candidates`): a record
//! carrying the right admin but the wrong community id is exactly the kind
//! of miscategorization reconciliation exists to surface.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::{Community, PaymentStatus, SubscriptionRecord};

/// Read-only classification of a community's subscription drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictAnalysis {
    /// Gateway ids of records currently in force.
    pub in_force: Vec<String>,

    /// In-force records marked active/authenticated whose period already
    /// ended.
    pub expired_active: Vec<String>,

    /// Records whose period end is missing or implausible.
    pub invalid_date: Vec<String>,

    /// The community's `subscription_id` when it references no
    /// active/authenticated record.
    pub orphaned_reference: Option<String>,

    /// The community says `paid` but no valid record backs it.
    pub status_mismatch: bool,

    /// Human-readable findings, one line per fault.
    pub findings: Vec<String>,
}

impl ConflictAnalysis {
    /// Classifies the candidate records against the community state.
    ///
    /// Read-only and safe to call arbitrarily often.
    pub fn run(community: &Community, records: &[SubscriptionRecord], now: Timestamp) -> Self {
        let mut findings = Vec::new();

        let in_force: Vec<String> = records
            .iter()
            .filter(|r| r.is_in_force())
            .map(|r| r.gateway_subscription_id.clone())
            .collect();

        if in_force.len() > 1 {
            findings.push(format!(
                "{} subscriptions are simultaneously in force; expected at most one",
                in_force.len()
            ));
        }

        let expired_active: Vec<String> = records
            .iter()
            .filter(|r| r.is_expired_stale(now))
            .map(|r| r.gateway_subscription_id.clone())
            .collect();
        for id in &expired_active {
            let end = records
                .iter()
                .find(|r| &r.gateway_subscription_id == id)
                .and_then(|r| r.current_end)
                .map(|e| e.to_rfc3339())
                .unwrap_or_default();
            findings.push(format!(
                "subscription {} is marked live but its billing period ended {}",
                id, end
            ));
        }

        let invalid_date: Vec<String> = records
            .iter()
            .filter(|r| r.has_untrusted_period_end())
            .map(|r| r.gateway_subscription_id.clone())
            .collect();
        for id in &invalid_date {
            findings.push(format!(
                "subscription {} has a missing or corrupt period end date",
                id
            ));
        }

        let orphaned_reference = community.billing.subscription_id.as_ref().and_then(|id| {
            let backed = records
                .iter()
                .any(|r| &r.gateway_subscription_id == id && r.status.is_authoritative());
            if backed {
                None
            } else {
                findings.push(format!(
                    "community references subscription {} which is not active or authenticated",
                    id
                ));
                Some(id.clone())
            }
        });

        let status_mismatch = community.billing.payment_status == PaymentStatus::Paid
            && !records.iter().any(|r| r.backs_paid_status(now));
        if status_mismatch {
            findings
                .push("community is marked paid but no valid subscription backs it".to_string());
        }

        Self {
            in_force,
            expired_active,
            invalid_date,
            orphaned_reference,
            status_mismatch,
            findings,
        }
    }

    /// Returns true if any fault category is non-empty.
    pub fn has_conflicts(&self) -> bool {
        !self.expired_active.is_empty()
            || !self.invalid_date.is_empty()
            || self.orphaned_reference.is_some()
            || self.status_mismatch
    }

    /// Total number of detected faults.
    pub fn fault_count(&self) -> usize {
        self.expired_active.len()
            + self.invalid_date.len()
            + usize::from(self.orphaned_reference.is_some())
            + usize::from(self.status_mismatch)
    }
}

/// The minimally-destructive repair for a community's drift.
///
/// Applying an empty plan is a no-op, which is what makes cleanup
/// idempotent: a second pass over repaired state plans nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPlan {
    /// In-force records whose period ended: flip to `expired`, keep the
    /// record (history is preserved).
    pub expire: Vec<String>,

    /// Records whose period end cannot be trusted: delete outright.
    pub delete: Vec<String>,

    /// Clear the community's dangling `subscription_id`.
    pub clear_subscription_id: bool,

    /// Reset the community's unbacked `paid` status to `unpaid`.
    pub reset_payment_status: bool,
}

impl CleanupPlan {
    /// Plans the repair for the given community and candidate records.
    pub fn build(community: &Community, records: &[SubscriptionRecord], now: Timestamp) -> Self {
        // Step 1: any in-force record with a trustworthy but past period
        // end gets expired. Records with untrusted ends fall to step 2.
        let expire: Vec<String> = records
            .iter()
            .filter(|r| {
                r.is_in_force()
                    && !r.has_untrusted_period_end()
                    && matches!(r.current_end, Some(end) if end.is_before(&now))
            })
            .map(|r| r.gateway_subscription_id.clone())
            .collect();

        // Step 2: untrusted period ends cannot be repaired.
        let delete: Vec<String> = records
            .iter()
            .filter(|r| r.has_untrusted_period_end())
            .map(|r| r.gateway_subscription_id.clone())
            .collect();

        // Steps 3-4 are evaluated against the post-repair record set: a
        // record this plan expires or deletes no longer backs anything.
        let survives_as_authoritative = |id: &str| {
            records.iter().any(|r| {
                r.gateway_subscription_id == id
                    && r.status.is_authoritative()
                    && !expire.iter().any(|e| e == id)
                    && !delete.iter().any(|d| d == id)
            })
        };

        let clear_subscription_id = community
            .billing
            .subscription_id
            .as_ref()
            .is_some_and(|id| !survives_as_authoritative(id));

        let reset_payment_status = community.billing.payment_status == PaymentStatus::Paid
            && !records.iter().any(|r| {
                r.backs_paid_status(now)
                    && !delete.contains(&r.gateway_subscription_id)
            });

        Self {
            expire,
            delete,
            clear_subscription_id,
            reset_payment_status,
        }
    }

    /// Returns true if the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.expire.is_empty()
            && self.delete.is_empty()
            && !self.clear_subscription_id
            && !self.reset_payment_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{RecordStatus, TrialInfo};
    use crate::domain::foundation::{CommunitySlug, UserId};

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_735_689_600) // 2025-01-01T00:00:00Z
    }

    fn admin() -> UserId {
        UserId::new("admin-1").unwrap()
    }

    fn community() -> Community {
        Community::new(CommunitySlug::new("makers").unwrap(), admin(), "a@example.com")
    }

    fn record(community: &Community, id: &str, status: RecordStatus) -> SubscriptionRecord {
        let mut r = SubscriptionRecord::new(
            id,
            "plan_monthly",
            None,
            community.admin_id.clone(),
            community.id,
            12,
        );
        r.status = status;
        r.current_start = Some(now().minus_days(40));
        r.current_end = Some(now().add_days(20));
        r
    }

    // Analysis

    #[test]
    fn clean_state_reports_no_conflicts() {
        let mut c = community();
        let r = record(&c, "sub_a", RecordStatus::Active);
        c.billing.apply_activation("sub_a", now().minus_days(10), now().add_days(20));

        let analysis = ConflictAnalysis::run(&c, &[r], now());

        assert!(!analysis.has_conflicts());
        assert_eq!(analysis.fault_count(), 0);
        assert_eq!(analysis.in_force, vec!["sub_a"]);
        assert!(analysis.findings.is_empty());
    }

    #[test]
    fn expired_but_active_record_is_detected() {
        // Spec example: record A active with period ended a year ago,
        // community still pointing at it.
        let mut c = community();
        let mut r = record(&c, "sub_a", RecordStatus::Active);
        r.current_end = Some(now().minus_days(365));
        c.billing.apply_activation("sub_a", now().minus_days(395), now().minus_days(365));

        let analysis = ConflictAnalysis::run(&c, &[r], now());

        assert_eq!(analysis.expired_active, vec!["sub_a"]);
        assert!(analysis.status_mismatch);
        assert!(analysis.has_conflicts());
    }

    #[test]
    fn missing_end_date_is_an_invalid_date_fault() {
        let c = community();
        let mut r = record(&c, "sub_b", RecordStatus::Created);
        r.current_end = None;

        let analysis = ConflictAnalysis::run(&c, &[r], now());

        assert_eq!(analysis.invalid_date, vec!["sub_b"]);
    }

    #[test]
    fn pre_1971_end_date_is_an_invalid_date_fault() {
        let c = community();
        let mut r = record(&c, "sub_b", RecordStatus::Active);
        r.current_end = Some(Timestamp::from_unix_secs(0));

        let analysis = ConflictAnalysis::run(&c, &[r], now());

        assert_eq!(analysis.invalid_date, vec!["sub_b"]);
    }

    #[test]
    fn dangling_subscription_reference_is_orphaned() {
        let mut c = community();
        c.billing.subscription_id = Some("sub_gone".to_string());

        let analysis = ConflictAnalysis::run(&c, &[], now());

        assert_eq!(analysis.orphaned_reference, Some("sub_gone".to_string()));
    }

    #[test]
    fn reference_to_cancelled_record_is_orphaned() {
        let mut c = community();
        let r = record(&c, "sub_a", RecordStatus::Cancelled);
        c.billing.subscription_id = Some("sub_a".to_string());

        let analysis = ConflictAnalysis::run(&c, &[r], now());

        assert_eq!(analysis.orphaned_reference, Some("sub_a".to_string()));
    }

    #[test]
    fn multiple_in_force_records_are_reported_in_findings() {
        let c = community();
        let a = record(&c, "sub_a", RecordStatus::Active);
        let b = record(&c, "sub_b", RecordStatus::Authenticated);

        let analysis = ConflictAnalysis::run(&c, &[a, b], now());

        assert_eq!(analysis.in_force.len(), 2);
        assert!(analysis
            .findings
            .iter()
            .any(|f| f.contains("simultaneously in force")));
    }

    #[test]
    fn analysis_is_read_only_and_repeatable() {
        let mut c = community();
        c.billing.payment_status = PaymentStatus::Paid;
        let records = vec![record(&c, "sub_a", RecordStatus::Expired)];

        let first = ConflictAnalysis::run(&c, &records, now());
        let second = ConflictAnalysis::run(&c, &records, now());

        assert_eq!(first, second);
    }

    // Cleanup planning

    #[test]
    fn plan_expires_stale_in_force_records() {
        let c = community();
        let mut r = record(&c, "sub_a", RecordStatus::Active);
        r.current_end = Some(now().minus_days(30));

        let plan = CleanupPlan::build(&c, &[r], now());

        assert_eq!(plan.expire, vec!["sub_a"]);
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn plan_expires_any_in_force_status_with_past_end() {
        let c = community();
        let mut r = record(&c, "sub_a", RecordStatus::Created);
        r.current_end = Some(now().minus_days(1));

        let plan = CleanupPlan::build(&c, &[r], now());

        assert_eq!(plan.expire, vec!["sub_a"]);
    }

    #[test]
    fn plan_deletes_untrusted_records_regardless_of_status() {
        let c = community();
        let mut live = record(&c, "sub_a", RecordStatus::Active);
        live.current_end = None;
        let mut dead = record(&c, "sub_b", RecordStatus::Expired);
        dead.current_end = Some(Timestamp::from_unix_secs(12));

        let plan = CleanupPlan::build(&c, &[live, dead], now());

        assert_eq!(plan.delete, vec!["sub_a", "sub_b"]);
        assert!(plan.expire.is_empty());
    }

    #[test]
    fn plan_clears_reference_when_backing_record_gets_expired() {
        let mut c = community();
        let mut r = record(&c, "sub_a", RecordStatus::Active);
        r.current_end = Some(now().minus_days(30));
        c.billing.subscription_id = Some("sub_a".to_string());

        let plan = CleanupPlan::build(&c, &[r], now());

        // sub_a is still authoritative on disk, but the plan expires it,
        // so the reference must go too.
        assert!(plan.clear_subscription_id);
    }

    #[test]
    fn plan_keeps_reference_to_healthy_record() {
        let mut c = community();
        let r = record(&c, "sub_a", RecordStatus::Active);
        c.billing.apply_activation("sub_a", now().minus_days(10), now().add_days(20));

        let plan = CleanupPlan::build(&c, &[r], now());

        assert!(!plan.clear_subscription_id);
        assert!(plan.is_empty());
    }

    #[test]
    fn plan_resets_unbacked_paid_status() {
        let mut c = community();
        c.billing.payment_status = PaymentStatus::Paid;

        let plan = CleanupPlan::build(&c, &[], now());

        assert!(plan.reset_payment_status);
    }

    #[test]
    fn plan_keeps_paid_status_backed_by_valid_record() {
        let mut c = community();
        c.billing.payment_status = PaymentStatus::Paid;
        let r = record(&c, "sub_a", RecordStatus::Active);

        let plan = CleanupPlan::build(&c, &[r], now());

        assert!(!plan.reset_payment_status);
    }

    #[test]
    fn plan_is_empty_after_simulated_repair() {
        // Build the spec's drift example, apply the plan by hand, and plan
        // again: the second plan must be empty (idempotence).
        let mut c = community();
        c.billing.payment_status = PaymentStatus::Paid;
        c.billing.subscription_id = Some("sub_a".to_string());
        let mut stale = record(&c, "sub_a", RecordStatus::Active);
        stale.current_end = Some(now().minus_days(365));
        let mut undated = record(&c, "sub_b", RecordStatus::Created);
        undated.current_end = None;

        let plan = CleanupPlan::build(&c, &[stale.clone(), undated], now());
        assert_eq!(plan.expire, vec!["sub_a"]);
        assert_eq!(plan.delete, vec!["sub_b"]);
        assert!(plan.clear_subscription_id);
        assert!(plan.reset_payment_status);

        // Apply.
        stale.mark_expired(now()).unwrap();
        c.billing.subscription_id = None;
        c.billing.payment_status = PaymentStatus::Unpaid;

        let second = CleanupPlan::build(&c, &[stale], now());
        assert!(second.is_empty());
    }

    #[test]
    fn plan_never_touches_trial_state() {
        // Cleanup repairs subscription drift only; the trial block is
        // force-reset territory.
        let mut c = community();
        c.billing.trial = TrialInfo {
            activated: true,
            has_used_trial: true,
            end_date: Some(now().add_days(3)),
            ..TrialInfo::default()
        };

        let plan = CleanupPlan::build(&c, &[], now());

        assert!(plan.is_empty());
    }
}
