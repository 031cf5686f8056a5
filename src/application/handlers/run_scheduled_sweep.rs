//! RunScheduledSweepHandler - Periodic trial reminders and suspensions.
//!
//! Runs over every community with an activated trial and applies the same
//! pure policy engine the caller-facing operations use; there is
//! deliberately no second code path for the background job.
//!
//! One community's failure never aborts the sweep: errors accumulate into
//! the result. Suspension is idempotent because it deactivates the trial,
//! so a re-run does not find the community again. Reminders fire when the
//! day-granular countdown equals a configured threshold, bounding
//! duplicates to one per threshold however often the sweep runs in a day.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::SweepConfig;
use crate::domain::billing::{policy, BillingError, Community, PaymentStatus};
use crate::domain::foundation::Timestamp;
use crate::ports::{CommunityStore, EmailTemplate, NotificationSender, SubscriptionRecordStore};

/// Result of one sweep run.
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    /// Communities with an activated trial that were examined.
    pub communities_checked: u32,

    /// Trial reminders sent.
    pub reminders_sent: u32,

    /// Communities suspended because their trial ended.
    pub suspensions: u32,

    /// Communities skipped because their grant data is malformed; they
    /// are never suspended on corrupt data.
    pub flagged_for_reconciliation: u32,

    /// Per-community failures.
    pub errors: Vec<String>,
}

/// Handler for the scheduled sweep.
pub struct RunScheduledSweepHandler {
    communities: Arc<dyn CommunityStore>,
    subscriptions: Arc<dyn SubscriptionRecordStore>,
    notifications: Arc<dyn NotificationSender>,
    config: SweepConfig,
}

impl RunScheduledSweepHandler {
    pub fn new(
        communities: Arc<dyn CommunityStore>,
        subscriptions: Arc<dyn SubscriptionRecordStore>,
        notifications: Arc<dyn NotificationSender>,
        config: SweepConfig,
    ) -> Self {
        Self {
            communities,
            subscriptions,
            notifications,
            config,
        }
    }

    pub async fn handle(&self) -> Result<SweepResult, BillingError> {
        let trials = self.communities.find_with_activated_trials().await?;
        let now = Timestamp::now();
        let mut result = SweepResult::default();

        for mut community in trials {
            result.communities_checked += 1;

            let decision = policy::evaluate(&community.billing, now);

            if decision.malformed_grant {
                warn!(
                    community = %community.slug,
                    "malformed trial data; flagged for reconciliation, not suspended"
                );
                result.flagged_for_reconciliation += 1;
                continue;
            }

            if community.billing.trial.is_running(now) {
                if let Err(e) = self.maybe_remind(&community, &decision, now, &mut result).await {
                    result
                        .errors
                        .push(format!("{}: reminder: {}", community.slug, e));
                }
                continue;
            }

            // Trial over. A paid community converted already; anything else
            // gets suspended.
            if community.billing.payment_status == PaymentStatus::Paid {
                continue;
            }
            if let Err(e) = self.suspend(&mut community, now, &mut result).await {
                result
                    .errors
                    .push(format!("{}: suspension: {}", community.slug, e));
            }
        }

        info!(
            checked = result.communities_checked,
            reminders = result.reminders_sent,
            suspensions = result.suspensions,
            flagged = result.flagged_for_reconciliation,
            errors = result.errors.len(),
            "scheduled sweep completed"
        );
        Ok(result)
    }

    async fn maybe_remind(
        &self,
        community: &Community,
        decision: &policy::AccessDecision,
        now: Timestamp,
        result: &mut SweepResult,
    ) -> Result<(), BillingError> {
        let Some(days) = decision.days_remaining else {
            return Ok(());
        };
        if !self.config.reminder_days.contains(&days) {
            return Ok(());
        }

        self.notifications
            .send_email(
                &community.admin_email,
                EmailTemplate::TrialReminder,
                serde_json::json!({
                    "community": community.slug.to_string(),
                    "days_remaining": days,
                }),
            )
            .await?;
        result.reminders_sent += 1;

        // When a record backs the trial, note the reminder in its history.
        // Record-less admin trials rely on the day-equality rule alone.
        let records = self
            .subscriptions
            .find_reconciliation_candidates(&community.id, &community.admin_id)
            .await?;
        if let Some(mut record) = records.into_iter().find(|r| {
            r.community_id == community.id && r.is_in_force()
        }) {
            record.record_trial_reminder(days, now);
            self.subscriptions.update(&record).await?;
        }
        Ok(())
    }

    async fn suspend(
        &self,
        community: &mut Community,
        now: Timestamp,
        result: &mut SweepResult,
    ) -> Result<(), BillingError> {
        community.billing.payment_status = PaymentStatus::Expired;
        community.billing.trial.cancel(now);
        self.communities.update(community).await?;
        result.suspensions += 1;

        // Suspension is already persisted; a failed email is reported by
        // the caller but does not undo it.
        self.notifications
            .send_email(
                &community.admin_email,
                EmailTemplate::TrialExpired,
                serde_json::json!({
                    "community": community.slug.to_string(),
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryCommunityStore, InMemorySubscriptionStore, RecordingNotificationSender,
    };
    use crate::domain::billing::{RecordStatus, SubscriptionRecord, TrialInfo};
    use crate::domain::foundation::{CommunitySlug, UserId};

    fn now() -> Timestamp {
        Timestamp::now()
    }

    fn admin(n: u32) -> UserId {
        UserId::new(format!("admin-{}", n)).unwrap()
    }

    fn trial_community(slug: &str, n: u32, days_left: i64) -> Community {
        let mut community = Community::new(
            CommunitySlug::new(slug).unwrap(),
            admin(n),
            format!("{}@example.com", slug),
        );
        // Trial activated in the past so that `days_left` days remain.
        community
            .billing
            .trial
            .activate(now().minus_days(14 - days_left), 14);
        community
    }

    fn expired_trial_community(slug: &str, n: u32) -> Community {
        let mut community = Community::new(
            CommunitySlug::new(slug).unwrap(),
            admin(n),
            format!("{}@example.com", slug),
        );
        community.billing.trial.activate(now().minus_days(30), 14);
        community
    }

    struct Fixture {
        communities: Arc<InMemoryCommunityStore>,
        subscriptions: Arc<InMemorySubscriptionStore>,
        notifications: Arc<RecordingNotificationSender>,
        handler: RunScheduledSweepHandler,
    }

    async fn fixture(members: Vec<Community>) -> Fixture {
        let communities = Arc::new(InMemoryCommunityStore::new());
        for member in members {
            communities.add(member).await;
        }
        let subscriptions = Arc::new(InMemorySubscriptionStore::new());
        let notifications = Arc::new(RecordingNotificationSender::new());
        let handler = RunScheduledSweepHandler::new(
            communities.clone(),
            subscriptions.clone(),
            notifications.clone(),
            SweepConfig::default(),
        );
        Fixture {
            communities,
            subscriptions,
            notifications,
            handler,
        }
    }

    #[tokio::test]
    async fn empty_platform_sweeps_cleanly() {
        let f = fixture(vec![]).await;

        let result = f.handler.handle().await.unwrap();

        assert_eq!(result.communities_checked, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn reminder_fires_at_configured_threshold() {
        let f = fixture(vec![trial_community("at-three", 1, 3)]).await;

        let result = f.handler.handle().await.unwrap();

        assert_eq!(result.reminders_sent, 1);
        assert_eq!(result.suspensions, 0);

        let sent = f.notifications.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].template, EmailTemplate::TrialReminder);
        assert_eq!(sent[0].to, "at-three@example.com");
        assert_eq!(sent[0].data["days_remaining"], 3);
    }

    #[tokio::test]
    async fn no_reminder_between_thresholds() {
        let f = fixture(vec![trial_community("at-five", 1, 5)]).await;

        let result = f.handler.handle().await.unwrap();

        assert_eq!(result.reminders_sent, 0);
        assert!(f.notifications.sent().await.is_empty());
    }

    #[tokio::test]
    async fn expired_trial_is_suspended_with_notification() {
        let mut c = expired_trial_community("lapsed", 1);
        let id = c.id;
        c.billing.payment_status = PaymentStatus::Unpaid;
        let f = fixture(vec![c]).await;

        let result = f.handler.handle().await.unwrap();

        assert_eq!(result.suspensions, 1);

        let stored = f.communities.get(&id).await.unwrap();
        assert_eq!(stored.billing.payment_status, PaymentStatus::Expired);
        assert!(!stored.billing.trial.activated);
        assert!(stored.billing.trial.cancelled);

        let sent = f.notifications.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].template, EmailTemplate::TrialExpired);
    }

    #[tokio::test]
    async fn suspension_is_idempotent_across_runs() {
        let c = expired_trial_community("lapsed", 1);
        let f = fixture(vec![c]).await;

        let first = f.handler.handle().await.unwrap();
        assert_eq!(first.suspensions, 1);

        // Trial is deactivated now, so the next run does not see it.
        let second = f.handler.handle().await.unwrap();
        assert_eq!(second.communities_checked, 0);
        assert_eq!(second.suspensions, 0);
    }

    #[tokio::test]
    async fn paid_community_is_never_suspended() {
        // Trial expired but the community already pays: nothing to do.
        let mut c = expired_trial_community("converted", 1);
        c.billing.payment_status = PaymentStatus::Paid;
        let id = c.id;
        let f = fixture(vec![c]).await;

        let result = f.handler.handle().await.unwrap();

        assert_eq!(result.suspensions, 0);
        let stored = f.communities.get(&id).await.unwrap();
        assert_eq!(stored.billing.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn malformed_trial_is_flagged_not_suspended() {
        let mut c = Community::new(
            CommunitySlug::new("corrupt").unwrap(),
            admin(1),
            "corrupt@example.com",
        );
        c.billing.trial = TrialInfo {
            activated: true,
            has_used_trial: true,
            ..TrialInfo::default()
        };
        let id = c.id;
        let f = fixture(vec![c]).await;

        let result = f.handler.handle().await.unwrap();

        assert_eq!(result.flagged_for_reconciliation, 1);
        assert_eq!(result.suspensions, 0);
        let stored = f.communities.get(&id).await.unwrap();
        assert_ne!(stored.billing.payment_status, PaymentStatus::Expired);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_sweep() {
        // Two expired trials; email sending fails for everyone, but both
        // communities still get examined and suspended state persisted.
        let a = expired_trial_community("alpha", 1);
        let b = expired_trial_community("beta", 2);
        let (id_a, id_b) = (a.id, b.id);
        let f = fixture(vec![a, b]).await;
        f.notifications.fail_sends();

        let result = f.handler.handle().await.unwrap();

        assert_eq!(result.communities_checked, 2);
        assert_eq!(result.suspensions, 2);
        assert_eq!(result.errors.len(), 2);
        // Suspensions persisted despite the email failures.
        assert_eq!(
            f.communities.get(&id_a).await.unwrap().billing.payment_status,
            PaymentStatus::Expired
        );
        assert_eq!(
            f.communities.get(&id_b).await.unwrap().billing.payment_status,
            PaymentStatus::Expired
        );
    }

    #[tokio::test]
    async fn reminder_is_noted_on_backing_record() {
        let c = trial_community("backed", 1, 3);
        let mut record = SubscriptionRecord::new(
            "sub_trial",
            "plan_monthly",
            None,
            c.admin_id.clone(),
            c.id,
            12,
        );
        record.status = RecordStatus::Trial;
        record.current_end = Some(now().add_days(3));
        let f = fixture(vec![c]).await;
        f.subscriptions.insert(&record).await.unwrap();

        let result = f.handler.handle().await.unwrap();

        assert_eq!(result.reminders_sent, 1);
        let stored = f.subscriptions.get("sub_trial").await.unwrap();
        assert_eq!(stored.trial_reminders_sent.len(), 1);
        assert_eq!(stored.trial_reminders_sent[0].days_before_end, 3);
    }
}
