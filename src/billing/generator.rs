//! Recurring billing generation.
//!
//! For a billing month, works out the set of (client, service) pairs that
//! should be billed, skips pairs already billed, computes each amount via
//! the proration calculator, and persists billing items.
//!
//! # Guarantees
//!
//! - **Idempotent**: re-running for the same month with the same filters
//!   never creates duplicates. The generator pre-checks existing items and
//!   the storage layer's insert-if-absent is the backstop against a
//!   concurrent second run.
//! - **Failure-isolated**: one client's failure is recorded in `errors[]`
//!   and never blocks other clients.
//! - **Dry-run safe**: `dry_run` computes the exact same items (amounts,
//!   proration flags) with zero persisted side effects.
//!
//! Clients are processed sequentially; the only await points are the store
//! round-trips. A caller can abort a long run by dropping the future
//! between clients — the idempotency guarantee makes a rerun safe.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;

use super::audit::{BillingAuditEvent, BillingAuditLogger};
use super::catalog::ServiceCatalog;
use super::eligibility::{ClientProfile, ServiceEligibilityPolicy};
use super::proration::{calculate_fee_amount, days_in_month, round_currency};
use super::storage::{
    BillingItem, BillingItemStatus, BillingStore, ClientStore, GeneratedFrom,
    GenerationRunSummary, InsertOutcome, RecurringBillingLogEntry,
};
use super::validation::{validate_billing_month, validate_client_id, validate_service_code};

/// A recurring generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// First calendar day of the month to bill.
    pub billing_month: NaiveDate,
    /// Restrict the run to these clients (None = all active clients).
    pub client_ids: Option<Vec<String>>,
    /// Restrict the run to a single service code.
    pub service_code: Option<String>,
    /// Compute everything, persist nothing.
    pub dry_run: bool,
}

impl GenerateRequest {
    /// A full run for a month.
    #[must_use]
    pub fn for_month(billing_month: NaiveDate) -> Self {
        Self {
            billing_month,
            client_ids: None,
            service_code: None,
            dry_run: false,
        }
    }

    /// Same request as a dry run.
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// One generated (or would-be-generated, under dry run) billing line.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedItem {
    pub client_id: String,
    pub client_name: String,
    pub service_code: String,
    pub service_name: String,
    pub amount: Decimal,
    pub prorated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of a generation run.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    pub billing_month: NaiveDate,
    pub items_created: usize,
    pub total_amount: Decimal,
    pub clients_processed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub items: Vec<GeneratedItem>,
}

impl GenerationResult {
    fn empty(billing_month: NaiveDate) -> Self {
        Self {
            success: true,
            billing_month,
            items_created: 0,
            total_amount: Decimal::ZERO,
            clients_processed: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            items: Vec::new(),
        }
    }
}

/// Generates monthly recurring billing items.
pub struct RecurringBillingGenerator {
    billing: Arc<dyn BillingStore>,
    clients: Arc<dyn ClientStore>,
    catalog: Arc<dyn ServiceCatalog>,
    eligibility: Arc<dyn ServiceEligibilityPolicy>,
    audit: Arc<dyn BillingAuditLogger>,
}

impl RecurringBillingGenerator {
    /// Create a new generator.
    pub fn new(
        billing: Arc<dyn BillingStore>,
        clients: Arc<dyn ClientStore>,
        catalog: Arc<dyn ServiceCatalog>,
        eligibility: Arc<dyn ServiceEligibilityPolicy>,
        audit: Arc<dyn BillingAuditLogger>,
    ) -> Self {
        Self {
            billing,
            clients,
            catalog,
            eligibility,
            audit,
        }
    }

    /// Run recurring generation for a month.
    ///
    /// # Errors
    ///
    /// Fails fast on validation errors (billing month not the 1st, bad
    /// service code filter) before any side effect. Per-client and
    /// per-service failures are accumulated in the result's `errors[]`
    /// instead.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResult> {
        validate_billing_month(request.billing_month)?;
        if let Some(code) = &request.service_code {
            validate_service_code(code)?;
        }
        if let Some(ids) = &request.client_ids {
            for id in ids {
                validate_client_id(id)?;
            }
        }

        let mut result = GenerationResult::empty(request.billing_month);

        let clients = self
            .clients
            .list_active_clients(request.client_ids.as_deref())
            .await?;

        tracing::info!(
            target: "payrun::billing",
            billing_month = %request.billing_month,
            clients = clients.len(),
            dry_run = request.dry_run,
            "starting recurring billing generation"
        );

        for client in &clients {
            result.clients_processed += 1;
            if let Err(err) = self.process_client(client, request, &mut result).await {
                result.errors.push(format!("{}: {}", client.name, err));
                tracing::warn!(
                    target: "payrun::billing",
                    client_id = %client.id,
                    error = %err,
                    "client failed during recurring generation"
                );
            }
        }

        result.success = result.errors.is_empty();

        if !request.dry_run {
            self.append_run_summary(&result).await;
        }
        self.audit
            .log(BillingAuditEvent::RecurringRunCompleted {
                billing_month: request.billing_month.to_string(),
                items_created: result.items_created,
                clients_processed: result.clients_processed,
                error_count: result.errors.len(),
                dry_run: request.dry_run,
            })
            .await;

        Ok(result)
    }

    /// Process one client. Per-service failures are pushed into the result;
    /// an error return means the whole client failed (e.g. the activity
    /// window lookup).
    async fn process_client(
        &self,
        client: &ClientProfile,
        request: &GenerateRequest,
        result: &mut GenerationResult,
    ) -> Result<()> {
        let applicable = self
            .eligibility
            .applicable_services(client, request.billing_month);

        let applicable: Vec<String> = match &request.service_code {
            Some(filter) => applicable.into_iter().filter(|c| c == filter).collect(),
            None => applicable,
        };
        if applicable.is_empty() {
            return Ok(());
        }

        // The pre-check: anything already billed for this month and source
        // is skipped without comment.
        let existing = self
            .billing
            .list_items(
                &client.id,
                request.billing_month,
                GeneratedFrom::RecurringSchedule,
            )
            .await?;
        let already_billed: HashSet<&str> =
            existing.iter().map(|i| i.service_code.as_str()).collect();

        let window = self
            .clients
            .activity_window(&client.id, request.billing_month)
            .await?;

        for service_code in &applicable {
            if already_billed.contains(service_code.as_str()) {
                continue;
            }
            if let Err(err) = self
                .process_service(client, service_code, request, &window, result)
                .await
            {
                result
                    .errors
                    .push(format!("{} - {}: {}", client.name, service_code, err));
            }
        }

        Ok(())
    }

    async fn process_service(
        &self,
        client: &ClientProfile,
        service_code: &str,
        request: &GenerateRequest,
        window: &super::proration::ClientActivityWindow,
        result: &mut GenerationResult,
    ) -> Result<()> {
        let service = self
            .catalog
            .get_service(service_code)
            .await?
            .ok_or_else(|| super::error::BillingError::ServiceNotFound {
                service_code: service_code.to_string(),
            })?;

        let custom_rate = self.clients.custom_rate(&client.id, service_code).await?;
        let fee = calculate_fee_amount(&service, request.billing_month, window, custom_rate);
        let amount = round_currency(fee.amount);

        if amount <= Decimal::ZERO {
            result.warnings.push(format!(
                "{} - {}: computed amount is zero, skipping",
                client.name, service_code
            ));
            tracing::warn!(
                target: "payrun::billing",
                client_id = %client.id,
                service_code,
                "zero amount computed, item skipped"
            );
            return Ok(());
        }

        if !request.dry_run {
            let period_end = last_day_of_month(request.billing_month);
            let item = BillingItem {
                id: Uuid::new_v4(),
                client_id: client.id.clone(),
                service_code: service.service_code.clone(),
                billing_period_start: request.billing_month,
                billing_period_end: period_end,
                total_amount: amount,
                auto_generated: true,
                generated_from: GeneratedFrom::RecurringSchedule,
                status: if service.auto_approval {
                    BillingItemStatus::Approved
                } else {
                    BillingItemStatus::Draft
                },
                requires_approval: !service.auto_approval,
                rate_justification: fee.reason.clone(),
                payroll_date_id: None,
                created_at: Utc::now(),
            };

            match self.billing.insert_item_if_absent(&item).await? {
                InsertOutcome::AlreadyBilled => {
                    // A concurrent run got there first; not an error.
                    tracing::debug!(
                        target: "payrun::billing",
                        client_id = %client.id,
                        service_code,
                        "item already billed, insert skipped"
                    );
                    return Ok(());
                }
                InsertOutcome::Inserted => {}
            }

            let entry = RecurringBillingLogEntry {
                id: Uuid::new_v4(),
                client_id: client.id.clone(),
                service_code: service.service_code.clone(),
                billing_month: request.billing_month,
                amount,
                prorated: fee.prorated,
                proration_reason: fee.reason.clone(),
                generated_by_system: true,
                created_at: Utc::now(),
            };
            if let Err(err) = self.billing.append_log_entry(&entry).await {
                // Logging failures never fail the billing operation.
                result.warnings.push(format!(
                    "{} - {}: billing log append failed: {}",
                    client.name, service_code, err
                ));
                tracing::warn!(
                    target: "payrun::billing",
                    client_id = %client.id,
                    service_code,
                    error = %err,
                    "billing log append failed"
                );
            }

            self.audit
                .log(BillingAuditEvent::ItemGenerated {
                    client_id: client.id.clone(),
                    service_code: service.service_code.clone(),
                    amount: amount.to_string(),
                    prorated: fee.prorated,
                    source: GeneratedFrom::RecurringSchedule.to_string(),
                })
                .await;
        }

        result.items_created += 1;
        result.total_amount += amount;
        result.items.push(GeneratedItem {
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            service_code: service.service_code,
            service_name: service.name,
            amount,
            prorated: fee.prorated,
            reason: fee.reason,
        });

        Ok(())
    }

    async fn append_run_summary(&self, result: &GenerationResult) {
        let summary = GenerationRunSummary {
            id: Uuid::new_v4(),
            generated_from: GeneratedFrom::RecurringSchedule,
            billing_month: Some(result.billing_month),
            items_created: result.items_created,
            total_amount: result.total_amount,
            clients_processed: result.clients_processed,
            error_count: result.errors.len(),
            warning_count: result.warnings.len(),
            created_at: Utc::now(),
        };
        if let Err(err) = self.billing.append_run_summary(&summary).await {
            tracing::warn!(
                target: "payrun::billing",
                error = %err,
                "run summary append failed"
            );
        }
    }
}

/// Last calendar day of the month containing `billing_month`.
#[must_use]
pub fn last_day_of_month(billing_month: NaiveDate) -> NaiveDate {
    billing_month + chrono::Days::new(u64::from(days_in_month(billing_month)) - 1)
}
