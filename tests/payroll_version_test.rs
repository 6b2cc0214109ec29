//! Version chain integrity and effective-date tests.

use chrono::NaiveDate;
use payrun::billing::NoOpAuditLogger;
use payrun::payroll::storage::test::{FixedClock, InMemoryPayrollStore};
use payrun::payroll::{
    Payroll, PayrollDate, PayrollEdits, PayrollStatus, PayrollStore, PayrollVersionManager,
    VersionReason,
};
use std::sync::Arc;
use uuid::Uuid;

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
        primary_consultant_id: Some(Uuid::new_v4()),
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

fn make_manager(store: &InMemoryPayrollStore) -> PayrollVersionManager {
    PayrollVersionManager::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(FixedClock(today())),
        Arc::new(NoOpAuditLogger),
    )
}

#[tokio::test]
async fn n_sequential_versions_keep_the_chain_intact() {
    let store = InMemoryPayrollStore::new();
    let v1 = seed_v1(&store);
    let manager = make_manager(&store);

    let mut current = v1.clone();
    for offset in 1..=4u32 {
        let go_live = NaiveDate::from_ymd_opt(2025, 6 + offset, 1).unwrap();
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
        assert_eq!(result.version_number, offset + 1);
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
    assert_eq!(versions.iter().filter(|p| p.is_current()).count(), 1);
    // Every version points at version 1's id, not its immediate predecessor.
    assert!(versions.iter().all(|p| p.parent_payroll_id == v1.id));
}

#[tokio::test]
async fn go_live_yesterday_supersedes_today() {
    let store = InMemoryPayrollStore::new();
    let v1 = seed_v1(&store);
    let manager = make_manager(&store);

    let yesterday = today().pred_opt().unwrap();
    manager
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
    assert_eq!(superseded.status, PayrollStatus::Superseded);
}

#[tokio::test]
async fn go_live_next_month_supersedes_at_go_live() {
    let store = InMemoryPayrollStore::new();
    let v1 = seed_v1(&store);
    let manager = make_manager(&store);

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
async fn past_dates_stay_with_the_old_version() {
    let store = InMemoryPayrollStore::new();
    let v1 = seed_v1(&store);
    let manager = make_manager(&store);

    let past = NaiveDate::from_ymd_opt(2025, 5, 15).unwrap();
    let future = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
    for eft in [past, future] {
        store.seed_date(PayrollDate {
            id: Uuid::new_v4(),
            payroll_id: v1.id,
            original_eft_date: eft,
            adjusted_eft_date: eft,
            processing_date: eft,
            notes: None,
        });
    }

    let result = manager
        .create_version(
            &v1,
            PayrollEdits {
                date_value: Some(20),
                ..Default::default()
            },
            today(),
            VersionReason::ScheduleChange,
            "user-1",
        )
        .await
        .unwrap();

    assert_eq!(result.date_regeneration.dates_detached, 1);
    assert!(result.date_regeneration.dates_generated > 0);

    let old_dates = store.dates_for(v1.id);
    assert_eq!(old_dates.len(), 1);
    assert_eq!(old_dates[0].adjusted_eft_date, past);

    let new_dates = store.dates_for(result.new_version_id);
    assert!(!new_dates.is_empty());
    assert!(new_dates.iter().all(|d| d.adjusted_eft_date >= today()));
}

#[tokio::test]
async fn processing_note_records_the_reason() {
    let store = InMemoryPayrollStore::new();
    let v1 = seed_v1(&store);
    let manager = make_manager(&store);

    let result = manager
        .create_version(
            &v1,
            PayrollEdits::default(),
            today(),
            VersionReason::ConsultantChange,
            "user-7",
        )
        .await
        .unwrap();

    let notes = store.notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, result.new_version_id);
    assert!(notes[0].1.contains("consultant_change"));
    assert!(notes[0].1.contains("user-7"));
}

#[tokio::test]
async fn missing_created_by_is_rejected_without_side_effects() {
    let store = InMemoryPayrollStore::new();
    let v1 = seed_v1(&store);
    let manager = make_manager(&store);

    let err = manager
        .create_version(
            &v1,
            PayrollEdits::default(),
            today(),
            VersionReason::Correction,
            "",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, payrun::PayrunError::BadRequest(_)));

    let stored = store.get_payroll(v1.id).await.unwrap().unwrap();
    assert!(stored.is_current());
    assert_eq!(store.list_versions(v1.id).await.unwrap().len(), 1);
}
