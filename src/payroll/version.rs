//! Payroll version creation.
//!
//! Editing a payroll's schedule, consultants, or cycle never mutates the
//! current row: the manager supersedes it and inserts a new version,
//! deciding whether date regeneration anchors on "today" or on the go-live
//! date. A version cannot retroactively change dates that have already
//! occurred — a past go-live date clamps the regeneration boundary to
//! today while the requested go-live date is still recorded on the new
//! version.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::VersioningConfig;
use crate::error::{PayrunError, Result};

use crate::billing::audit::{BillingAuditEvent, BillingAuditLogger};

use super::model::{Payroll, PayrollStatus, VersionReason};
use super::storage::{Clock, DateRegenerationInfo, DateRegenerationService, PayrollStore};

/// Default working days between processing and EFT.
pub const DEFAULT_PROCESSING_DAYS_BEFORE_EFT: i32 = 4;

/// Default employee count.
pub const DEFAULT_EMPLOYEE_COUNT: i32 = 0;

/// Edits to apply when creating a new version. `None` fields inherit the
/// current version's value.
#[derive(Debug, Clone, Default)]
pub struct PayrollEdits {
    pub cycle_id: Option<Uuid>,
    pub date_type_id: Option<Uuid>,
    pub date_value: Option<i32>,
    pub primary_consultant_id: Option<Uuid>,
    pub backup_consultant_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub processing_days_before_eft: Option<i32>,
    pub employee_count: Option<i32>,
    pub status: Option<PayrollStatus>,
}

/// Result of a successful version creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResult {
    pub new_version_id: Uuid,
    /// As persisted, including applied defaults.
    pub version_number: u32,
    /// As persisted, including applied defaults.
    pub employee_count: i32,
    pub date_regeneration: DateRegenerationInfo,
}

/// Creates immutable, chained payroll versions.
pub struct PayrollVersionManager {
    store: Arc<dyn PayrollStore>,
    dates: Arc<dyn DateRegenerationService>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn BillingAuditLogger>,
    defaults: VersioningConfig,
}

impl PayrollVersionManager {
    /// Create a new version manager with the standard defaults.
    pub fn new(
        store: Arc<dyn PayrollStore>,
        dates: Arc<dyn DateRegenerationService>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn BillingAuditLogger>,
    ) -> Self {
        Self::with_config(store, dates, clock, audit, VersioningConfig::default())
    }

    /// Create a version manager whose fallback values come from
    /// configuration.
    pub fn with_config(
        store: Arc<dyn PayrollStore>,
        dates: Arc<dyn DateRegenerationService>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn BillingAuditLogger>,
        defaults: VersioningConfig,
    ) -> Self {
        Self {
            store,
            dates,
            clock,
            audit,
            defaults,
        }
    }

    /// Supersede `current` and insert a new version with `edits` applied.
    ///
    /// Ordering matters: the current version is marked superseded before
    /// the new version is inserted and dates are regenerated, because date
    /// ownership keys off the supersession boundary.
    ///
    /// # Errors
    ///
    /// Validation failures (missing client/cycle, missing user, superseding
    /// a non-current version) are rejected before any side effect. A date
    /// regeneration failure fails the operation; a note-attach failure does
    /// not.
    pub async fn create_version(
        &self,
        current: &Payroll,
        edits: PayrollEdits,
        go_live_date: NaiveDate,
        version_reason: VersionReason,
        created_by_user_id: &str,
    ) -> Result<VersionResult> {
        if current.client_id.is_empty() {
            return Err(PayrunError::bad_request(
                "payroll is missing a client reference",
            ));
        }
        if edits.cycle_id.or(current.cycle_id).is_none() {
            return Err(PayrunError::bad_request(
                "payroll is missing a cycle reference",
            ));
        }
        if created_by_user_id.is_empty() {
            return Err(PayrunError::bad_request("created_by_user_id is required"));
        }
        if !current.is_current() {
            return Err(PayrunError::conflict(format!(
                "payroll version {} is already superseded",
                current.id
            )));
        }

        let today = self.clock.today();
        // A past go-live date cannot rewrite history: the supersession and
        // regeneration boundary clamps to today, while the requested
        // go-live date is still recorded on the new version.
        let effective = if go_live_date > today {
            go_live_date
        } else {
            today
        };

        self.store.supersede(current.id, effective).await?;
        self.audit
            .log(BillingAuditEvent::VersionSuperseded {
                payroll_id: current.id.to_string(),
                superseded_date: effective.to_string(),
            })
            .await;

        let new_version = self.build_version(
            current,
            &edits,
            go_live_date,
            version_reason,
            created_by_user_id,
        );
        self.store.insert_version(&new_version).await?;

        let date_regeneration = self
            .dates
            .regenerate_from(new_version.parent_payroll_id, new_version.id, effective)
            .await?;

        let note = format!(
            "Version {} created ({}) by {}: effective {}, {} dates regenerated",
            new_version.version_number,
            version_reason,
            created_by_user_id,
            effective,
            date_regeneration.dates_generated
        );
        if let Err(err) = self.store.attach_note(new_version.id, &note).await {
            // Best effort: a failed note never fails the version operation.
            tracing::warn!(
                target: "payrun::payroll",
                payroll_id = %new_version.id,
                error = %err,
                "failed to attach processing note"
            );
        }

        self.audit
            .log(BillingAuditEvent::VersionCreated {
                parent_payroll_id: new_version.parent_payroll_id.to_string(),
                new_version_id: new_version.id.to_string(),
                version_number: new_version.version_number,
                reason: version_reason.to_string(),
                created_by: created_by_user_id.to_string(),
            })
            .await;

        tracing::info!(
            target: "payrun::payroll",
            parent_payroll_id = %new_version.parent_payroll_id,
            version_number = new_version.version_number,
            effective = %effective,
            "payroll version created"
        );

        Ok(VersionResult {
            new_version_id: new_version.id,
            version_number: new_version.version_number,
            employee_count: new_version
                .employee_count
                .unwrap_or(self.defaults.employee_count),
            date_regeneration,
        })
    }

    /// Copy every field from the current version except those present in
    /// the edits. Defaults fill in only when both the edit and the current
    /// value are absent.
    fn build_version(
        &self,
        current: &Payroll,
        edits: &PayrollEdits,
        go_live_date: NaiveDate,
        version_reason: VersionReason,
        created_by_user_id: &str,
    ) -> Payroll {
        Payroll {
            id: Uuid::new_v4(),
            parent_payroll_id: current.parent_payroll_id,
            version_number: current.version_number + 1,
            go_live_date,
            superseded_date: None,
            client_id: current.client_id.clone(),
            cycle_id: edits.cycle_id.or(current.cycle_id),
            date_type_id: edits.date_type_id.or(current.date_type_id),
            date_value: edits.date_value.or(current.date_value),
            primary_consultant_id: edits
                .primary_consultant_id
                .or(current.primary_consultant_id),
            backup_consultant_id: edits.backup_consultant_id.or(current.backup_consultant_id),
            manager_id: edits.manager_id.or(current.manager_id),
            processing_days_before_eft: edits
                .processing_days_before_eft
                .or(current.processing_days_before_eft)
                .or(Some(self.defaults.processing_days_before_eft)),
            employee_count: edits
                .employee_count
                .or(current.employee_count)
                .or(Some(self.defaults.employee_count)),
            status: edits.status.unwrap_or(current.status),
            version_reason: Some(version_reason),
            created_by_user_id: Some(created_by_user_id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::audit::NoOpAuditLogger;
    use crate::payroll::storage::test::{FixedClock, InMemoryPayrollStore};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn seed_v1(store: &InMemoryPayrollStore) -> Payroll {
        let id = Uuid::new_v4();
        let payroll = Payroll {
            id,
            parent_payroll_id: id,
            version_number: 1,
            go_live_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            superseded_date: None,
            client_id: "client-1".into(),
            cycle_id: Some(Uuid::new_v4()),
            date_type_id: None,
            date_value: Some(15),
            primary_consultant_id: None,
            backup_consultant_id: None,
            manager_id: None,
            processing_days_before_eft: Some(4),
            employee_count: Some(25),
            status: PayrollStatus::Active,
            version_reason: None,
            created_by_user_id: Some("user-0".into()),
        };
        store.seed_payroll(payroll.clone());
        payroll
    }

    fn manager(store: &InMemoryPayrollStore) -> PayrollVersionManager {
        PayrollVersionManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(FixedClock(today())),
            Arc::new(NoOpAuditLogger),
        )
    }

    #[tokio::test]
    async fn past_go_live_clamps_supersession_to_today() {
        let store = InMemoryPayrollStore::new();
        let v1 = seed_v1(&store);
        let manager = manager(&store);

        let yesterday = today().pred_opt().unwrap();
        let result = manager
            .create_version(
                &v1,
                PayrollEdits::default(),
                yesterday,
                VersionReason::Correction,
                "user-1",
            )
            .await
            .unwrap();

        let superseded = store.get_payroll(v1.id).await.unwrap().unwrap();
        assert_eq!(superseded.superseded_date, Some(today()));
        assert_eq!(result.date_regeneration.effective_from, today());

        // The requested go-live date is still recorded on the new version.
        let new = store.get_payroll(result.new_version_id).await.unwrap().unwrap();
        assert_eq!(new.go_live_date, yesterday);
    }

    #[tokio::test]
    async fn future_go_live_supersedes_at_go_live() {
        let store = InMemoryPayrollStore::new();
        let v1 = seed_v1(&store);
        let manager = manager(&store);

        let next_month = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let result = manager
            .create_version(
                &v1,
                PayrollEdits::default(),
                next_month,
                VersionReason::ScheduleChange,
                "user-1",
            )
            .await
            .unwrap();

        let superseded = store.get_payroll(v1.id).await.unwrap().unwrap();
        assert_eq!(superseded.superseded_date, Some(next_month));
        assert_eq!(result.date_regeneration.effective_from, next_month);
    }

    #[tokio::test]
    async fn chain_stays_intact_over_sequential_versions() {
        let store = InMemoryPayrollStore::new();
        let v1 = seed_v1(&store);
        let manager = manager(&store);

        let mut current = v1.clone();
        for n in 0..4 {
            let go_live = NaiveDate::from_ymd_opt(2025, 7 + n, 1).unwrap();
            let result = manager
                .create_version(
                    &current,
                    PayrollEdits::default(),
                    go_live,
                    VersionReason::ScheduleChange,
                    "user-1",
                )
                .await
                .unwrap();
            current = store
                .get_payroll(result.new_version_id)
                .await
                .unwrap()
                .unwrap();
        }

        let versions = store.list_versions(v1.id).await.unwrap();
        assert_eq!(versions.len(), 5);
        let numbers: Vec<u32> = versions.iter().map(|p| p.version_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            versions.iter().filter(|p| p.is_current()).count(),
            1,
            "exactly one current version"
        );
        assert!(versions.iter().all(|p| p.parent_payroll_id == v1.id));
    }

    #[tokio::test]
    async fn defaults_fill_only_when_both_absent() {
        let store = InMemoryPayrollStore::new();
        let mut v1 = seed_v1(&store);
        v1.processing_days_before_eft = None;
        v1.employee_count = None;
        store.seed_payroll(v1.clone());
        let manager = manager(&store);

        let result = manager
            .create_version(
                &v1,
                PayrollEdits {
                    employee_count: Some(40),
                    ..Default::default()
                },
                today(),
                VersionReason::ClientChange,
                "user-1",
            )
            .await
            .unwrap();

        assert_eq!(result.employee_count, 40);
        let new = store.get_payroll(result.new_version_id).await.unwrap().unwrap();
        assert_eq!(new.processing_days_before_eft, Some(4));
        assert_eq!(new.employee_count, Some(40));
    }

    #[tokio::test]
    async fn configured_defaults_feed_new_versions() {
        let store = InMemoryPayrollStore::new();
        let mut v1 = seed_v1(&store);
        v1.processing_days_before_eft = None;
        v1.employee_count = None;
        store.seed_payroll(v1.clone());
        let manager = PayrollVersionManager::with_config(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(FixedClock(today())),
            Arc::new(NoOpAuditLogger),
            VersioningConfig {
                processing_days_before_eft: 5,
                employee_count: 10,
            },
        );

        let result = manager
            .create_version(
                &v1,
                PayrollEdits::default(),
                today(),
                VersionReason::Correction,
                "user-1",
            )
            .await
            .unwrap();

        assert_eq!(result.employee_count, 10);
        let new = store.get_payroll(result.new_version_id).await.unwrap().unwrap();
        assert_eq!(new.processing_days_before_eft, Some(5));
        assert_eq!(new.employee_count, Some(10));
    }

    #[tokio::test]
    async fn missing_cycle_is_a_validation_error() {
        let store = InMemoryPayrollStore::new();
        let mut v1 = seed_v1(&store);
        v1.cycle_id = None;
        store.seed_payroll(v1.clone());
        let manager = manager(&store);

        let err = manager
            .create_version(
                &v1,
                PayrollEdits::default(),
                today(),
                VersionReason::Correction,
                "user-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PayrunError::BadRequest(_)));
        // No side effects on validation failure.
        let stored = store.get_payroll(v1.id).await.unwrap().unwrap();
        assert!(stored.is_current());
    }

    #[tokio::test]
    async fn superseding_a_non_current_version_is_rejected() {
        let store = InMemoryPayrollStore::new();
        let mut v1 = seed_v1(&store);
        v1.superseded_date = Some(today());
        store.seed_payroll(v1.clone());
        let manager = manager(&store);

        let err = manager
            .create_version(
                &v1,
                PayrollEdits::default(),
                today(),
                VersionReason::Correction,
                "user-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PayrunError::Conflict(_)));
    }

    #[tokio::test]
    async fn note_failure_does_not_fail_the_operation() {
        let store = InMemoryPayrollStore::new();
        let v1 = seed_v1(&store);
        store.fail_notes();
        let manager = manager(&store);

        let result = manager
            .create_version(
                &v1,
                PayrollEdits::default(),
                today(),
                VersionReason::Correction,
                "user-1",
            )
            .await;
        assert!(result.is_ok());
        assert!(store.notes().is_empty());
    }

    #[tokio::test]
    async fn edits_override_and_rest_is_copied() {
        let store = InMemoryPayrollStore::new();
        let v1 = seed_v1(&store);
        let manager = manager(&store);
        let new_cycle = Uuid::new_v4();

        let result = manager
            .create_version(
                &v1,
                PayrollEdits {
                    cycle_id: Some(new_cycle),
                    date_value: Some(28),
                    ..Default::default()
                },
                today(),
                VersionReason::ScheduleChange,
                "user-1",
            )
            .await
            .unwrap();

        let new = store.get_payroll(result.new_version_id).await.unwrap().unwrap();
        assert_eq!(new.cycle_id, Some(new_cycle));
        assert_eq!(new.date_value, Some(28));
        assert_eq!(new.client_id, v1.client_id);
        assert_eq!(new.employee_count, v1.employee_count);
        assert_eq!(new.version_reason, Some(VersionReason::ScheduleChange));
        assert_eq!(new.created_by_user_id.as_deref(), Some("user-1"));
    }
}
