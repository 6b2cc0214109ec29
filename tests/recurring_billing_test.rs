//! End-to-end tests for recurring billing generation with the standard
//! catalog and eligibility policy.

use chrono::NaiveDate;
use payrun::billing::storage::test::{InMemoryBillingStore, InMemoryClientStore};
use payrun::billing::{
    ClientActivityWindow, ClientProfile, GenerateRequest, GeneratedFrom, InMemoryServiceCatalog,
    NoOpAuditLogger, RecurringBillingGenerator, StandardEligibilityPolicy,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn month() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn make_generator(
    billing: &InMemoryBillingStore,
    clients: &InMemoryClientStore,
) -> RecurringBillingGenerator {
    RecurringBillingGenerator::new(
        Arc::new(billing.clone()),
        Arc::new(clients.clone()),
        Arc::new(InMemoryServiceCatalog::standard()),
        Arc::new(StandardEligibilityPolicy::default_rules()),
        Arc::new(NoOpAuditLogger),
    )
}

fn established_client(id: &str, name: &str) -> ClientProfile {
    ClientProfile {
        id: id.into(),
        name: name.into(),
        active: true,
        service_started_on: NaiveDate::from_ymd_opt(2023, 2, 1),
    }
}

#[tokio::test]
async fn generate_twice_is_idempotent() {
    let billing = InMemoryBillingStore::new();
    let clients = InMemoryClientStore::new();
    clients.add_client(established_client("client-1", "Acme Pty Ltd"));
    let generator = make_generator(&billing, &clients);

    let request = GenerateRequest::for_month(month());
    let first = generator.generate(&request).await.unwrap();
    assert!(first.success);
    // Established client: MONTHLY_SERVICE + SYSTEM_ACCESS, no onboarding.
    assert_eq!(first.items_created, 2);
    assert_eq!(first.total_amount, dec!(195.00));

    let second = generator.generate(&request).await.unwrap();
    assert!(second.success);
    assert_eq!(second.items_created, 0);
    assert!(second.errors.is_empty());

    let items = billing.all_items();
    assert_eq!(items.len(), 2);
    assert!(items
        .iter()
        .all(|i| i.generated_from == GeneratedFrom::RecurringSchedule && i.auto_generated));
}

#[tokio::test]
async fn dry_run_matches_real_run_exactly() {
    let billing = InMemoryBillingStore::new();
    let clients = InMemoryClientStore::new();
    clients.add_client(ClientProfile {
        id: "client-1".into(),
        name: "Mid Month Start Co".into(),
        active: true,
        service_started_on: NaiveDate::from_ymd_opt(2025, 6, 16),
    });
    clients.set_window("client-1", ClientActivityWindow::started_on(16));
    let generator = make_generator(&billing, &clients);

    let dry = generator
        .generate(&GenerateRequest::for_month(month()).dry_run())
        .await
        .unwrap();
    assert!(billing.all_items().is_empty(), "dry run must not persist");
    assert!(billing.all_log_entries().is_empty());

    let real = generator
        .generate(&GenerateRequest::for_month(month()))
        .await
        .unwrap();

    // Byte-for-byte identical computed items.
    assert_eq!(
        serde_json::to_string(&dry.items).unwrap(),
        serde_json::to_string(&real.items).unwrap()
    );

    // MONTHLY_SERVICE prorated: 150 * 15/30 = 75.00, above the 50 minimum.
    let monthly = real
        .items
        .iter()
        .find(|i| i.service_code == "MONTHLY_SERVICE")
        .unwrap();
    assert!(monthly.prorated);
    assert_eq!(monthly.amount, dec!(75.00));

    // SYSTEM_ACCESS has proration disabled: full rate despite the start day.
    let access = real
        .items
        .iter()
        .find(|i| i.service_code == "SYSTEM_ACCESS")
        .unwrap();
    assert!(!access.prorated);
    assert_eq!(access.amount, dec!(45.00));
}

#[tokio::test]
async fn one_failing_client_does_not_block_the_others() {
    let billing = InMemoryBillingStore::new();
    let clients = InMemoryClientStore::new();
    clients.add_client(established_client("client-1", "Alpha"));
    clients.add_client(established_client("client-2", "Beta"));
    clients.add_client(established_client("client-3", "Gamma"));
    clients.fail_activity_window_for("client-2");
    let generator = make_generator(&billing, &clients);

    let result = generator
        .generate(&GenerateRequest::for_month(month()))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.clients_processed, 3);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("Beta"));

    let billed_clients: Vec<String> = billing
        .all_items()
        .into_iter()
        .map(|i| i.client_id)
        .collect();
    assert!(billed_clients.contains(&"client-1".to_string()));
    assert!(billed_clients.contains(&"client-3".to_string()));
    assert!(!billed_clients.contains(&"client-2".to_string()));
}

#[tokio::test]
async fn late_start_clamps_to_minimum_charge() {
    let billing = InMemoryBillingStore::new();
    let clients = InMemoryClientStore::new();
    clients.add_client(ClientProfile {
        id: "client-1".into(),
        name: "Late Start Co".into(),
        active: true,
        service_started_on: NaiveDate::from_ymd_opt(2025, 6, 29),
    });
    clients.set_window("client-1", ClientActivityWindow::started_on(29));
    let generator = make_generator(&billing, &clients);

    let result = generator
        .generate(&GenerateRequest::for_month(month()))
        .await
        .unwrap();

    // Raw 150 * 2/30 = 10.00, clamped to the 50.00 minimum charge.
    let monthly = result
        .items
        .iter()
        .find(|i| i.service_code == "MONTHLY_SERVICE")
        .unwrap();
    assert_eq!(monthly.amount, dec!(50.00));
    assert!(monthly.reason.as_ref().unwrap().contains("minimum charge"));
}

#[tokio::test]
async fn run_summary_failure_never_fails_the_run() {
    let billing = InMemoryBillingStore::new();
    billing.fail_run_summaries();
    let clients = InMemoryClientStore::new();
    clients.add_client(established_client("client-1", "Acme"));
    let generator = make_generator(&billing, &clients);

    let result = generator
        .generate(&GenerateRequest::for_month(month()))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.items_created, 2);
    assert!(billing.all_run_summaries().is_empty());
}

#[tokio::test]
async fn new_client_is_billed_onboarding_support() {
    let billing = InMemoryBillingStore::new();
    let clients = InMemoryClientStore::new();
    clients.add_client(ClientProfile {
        id: "client-1".into(),
        name: "Fresh Co".into(),
        active: true,
        service_started_on: NaiveDate::from_ymd_opt(2025, 5, 10),
    });
    let generator = make_generator(&billing, &clients);

    let result = generator
        .generate(&GenerateRequest::for_month(month()))
        .await
        .unwrap();
    let codes: Vec<&str> = result.items.iter().map(|i| i.service_code.as_str()).collect();
    assert!(codes.contains(&"ONBOARDING_SUPPORT"));
    // ONBOARDING_SUPPORT is not auto-approved.
    let onboarding = billing
        .all_items()
        .into_iter()
        .find(|i| i.service_code == "ONBOARDING_SUPPORT")
        .unwrap();
    assert!(onboarding.requires_approval);
}
