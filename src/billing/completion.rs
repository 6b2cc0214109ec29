//! Completion-metrics billing.
//!
//! A sibling of the recurring generator keyed by a single payroll-run
//! completion event rather than a calendar month: volume-based fees
//! (payslips processed, new starters, terminations, ...) become billing
//! items against the payroll's client.
//!
//! Items carry the `completion_metrics` source tag and the originating
//! payroll date, so regeneration on a metrics update can delete-and-recreate
//! exactly this adapter's items without ever touching recurring-schedule
//! items. The delete happens before any new insert — partial overlap of old
//! and new items is not a valid intermediate state.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::payroll::storage::PayrollStore;

use super::audit::{BillingAuditEvent, BillingAuditLogger};
use super::catalog::ServiceCatalog;
use super::error::BillingError;
use super::proration::round_currency;
use super::storage::{
    BillingItem, BillingItemStatus, BillingStore, GeneratedFrom, GenerationRunSummary,
    InsertOutcome,
};

/// Volume metrics reported when a payroll run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayrollRunMetrics {
    pub payslips_processed: u32,
    pub new_starters: u32,
    pub terminations: u32,
    pub leave_calculations: u32,
    pub bonus_payments: u32,
    pub tax_adjustments: u32,
    pub super_contributions: u32,
    pub payg_summaries: u32,
    pub fbt_calculations: u32,
}

impl PayrollRunMetrics {
    /// Whether any significant-activity count is nonzero.
    #[must_use]
    pub fn has_significant_activity(&self) -> bool {
        self.new_starters > 0
            || self.terminations > 0
            || self.leave_calculations > 0
            || self.bonus_payments > 0
            || self.tax_adjustments > 0
            || self.super_contributions > 0
            || self.payg_summaries > 0
            || self.fbt_calculations > 0
    }

    /// Whether these metrics warrant billing generation at all.
    #[must_use]
    pub fn triggers_billing(&self) -> bool {
        self.payslips_processed > 0 || self.has_significant_activity()
    }
}

/// Metric kinds the fee schedule can charge for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    PayslipsProcessed,
    NewStarters,
    Terminations,
    LeaveCalculations,
    BonusPayments,
    TaxAdjustments,
    SuperContributions,
    PaygSummaries,
    FbtCalculations,
}

impl MetricKind {
    /// The count this kind reads from the metrics.
    #[must_use]
    pub fn count(&self, metrics: &PayrollRunMetrics) -> u32 {
        match self {
            Self::PayslipsProcessed => metrics.payslips_processed,
            Self::NewStarters => metrics.new_starters,
            Self::Terminations => metrics.terminations,
            Self::LeaveCalculations => metrics.leave_calculations,
            Self::BonusPayments => metrics.bonus_payments,
            Self::TaxAdjustments => metrics.tax_adjustments,
            Self::SuperContributions => metrics.super_contributions,
            Self::PaygSummaries => metrics.payg_summaries,
            Self::FbtCalculations => metrics.fbt_calculations,
        }
    }
}

/// Maps run metrics to catalog services. The unit rate comes from the
/// catalog service's base rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionFeeSchedule {
    pub rules: Vec<CompletionFeeRule>,
}

/// One metric-to-service mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionFeeRule {
    pub metric: MetricKind,
    pub service_code: String,
}

impl Default for CompletionFeeSchedule {
    fn default() -> Self {
        Self {
            rules: vec![
                CompletionFeeRule {
                    metric: MetricKind::PayslipsProcessed,
                    service_code: "PAYSLIP_PROCESSING".into(),
                },
                CompletionFeeRule {
                    metric: MetricKind::NewStarters,
                    service_code: "NEW_STARTER_ADMIN".into(),
                },
                CompletionFeeRule {
                    metric: MetricKind::Terminations,
                    service_code: "TERMINATION_ADMIN".into(),
                },
                CompletionFeeRule {
                    metric: MetricKind::LeaveCalculations,
                    service_code: "LEAVE_CALC".into(),
                },
                CompletionFeeRule {
                    metric: MetricKind::BonusPayments,
                    service_code: "BONUS_RUN".into(),
                },
                CompletionFeeRule {
                    metric: MetricKind::TaxAdjustments,
                    service_code: "TAX_ADJUSTMENT".into(),
                },
                CompletionFeeRule {
                    metric: MetricKind::SuperContributions,
                    service_code: "SUPER_CONTRIBUTION".into(),
                },
                CompletionFeeRule {
                    metric: MetricKind::PaygSummaries,
                    service_code: "PAYG_SUMMARY".into(),
                },
                CompletionFeeRule {
                    metric: MetricKind::FbtCalculations,
                    service_code: "FBT_CALC".into(),
                },
            ],
        }
    }
}

/// Result of completion-metrics billing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionBillingResult {
    pub success: bool,
    /// False when the metrics carried no billable activity.
    pub generated: bool,
    pub items_created: usize,
    pub items_deleted: usize,
    pub total_amount: Decimal,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Generates billing items from payroll-run completion metrics.
pub struct CompletionBillingGenerator {
    billing: Arc<dyn BillingStore>,
    payrolls: Arc<dyn PayrollStore>,
    catalog: Arc<dyn ServiceCatalog>,
    schedule: CompletionFeeSchedule,
    audit: Arc<dyn BillingAuditLogger>,
}

impl CompletionBillingGenerator {
    /// Create a new completion billing generator.
    pub fn new(
        billing: Arc<dyn BillingStore>,
        payrolls: Arc<dyn PayrollStore>,
        catalog: Arc<dyn ServiceCatalog>,
        schedule: CompletionFeeSchedule,
        audit: Arc<dyn BillingAuditLogger>,
    ) -> Self {
        Self {
            billing,
            payrolls,
            catalog,
            schedule,
            audit,
        }
    }

    /// Generate billing items for a completed payroll run.
    ///
    /// Idempotent per payroll date: prior completion-tagged items for this
    /// date are deleted before regeneration, so calling again after a
    /// metrics update replaces the items wholesale.
    ///
    /// # Errors
    ///
    /// Fails when the payroll date or its payroll version cannot be
    /// resolved. Per-service failures accumulate in the result's `errors[]`.
    pub async fn generate_from_completion(
        &self,
        payroll_date_id: Uuid,
        metrics: &PayrollRunMetrics,
        completed_by_user_id: &str,
    ) -> Result<CompletionBillingResult> {
        let mut result = CompletionBillingResult {
            success: true,
            generated: false,
            items_created: 0,
            items_deleted: 0,
            total_amount: Decimal::ZERO,
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        if !metrics.triggers_billing() {
            tracing::debug!(
                target: "payrun::billing",
                payroll_date_id = %payroll_date_id,
                "no billable activity in completion metrics"
            );
            return Ok(result);
        }

        let date = self
            .payrolls
            .get_payroll_date(payroll_date_id)
            .await?
            .ok_or_else(|| BillingError::PayrollDateNotFound {
                payroll_date_id: payroll_date_id.to_string(),
            })?;
        let payroll = self
            .payrolls
            .get_payroll(date.payroll_id)
            .await?
            .ok_or_else(|| BillingError::PayrollNotFound {
                payroll_id: date.payroll_id.to_string(),
            })?;

        // Delete-then-recreate: old completion items for this run must be
        // gone before any new insert.
        result.items_deleted = self
            .billing
            .delete_items_for_payroll_date(payroll_date_id, GeneratedFrom::CompletionMetrics)
            .await?;
        result.generated = true;

        for rule in &self.schedule.rules {
            let count = rule.metric.count(metrics);
            if count == 0 {
                continue;
            }
            if let Err(err) = self
                .bill_metric(&payroll.client_id, &date, rule, count, &mut result)
                .await
            {
                result
                    .errors
                    .push(format!("{} - {}: {}", payroll.client_id, rule.service_code, err));
            }
        }

        result.success = result.errors.is_empty();

        self.append_run_summary(&result).await;
        self.audit
            .log(BillingAuditEvent::CompletionBillingGenerated {
                payroll_date_id: payroll_date_id.to_string(),
                items_created: result.items_created,
                items_deleted: result.items_deleted,
                completed_by: completed_by_user_id.to_string(),
            })
            .await;

        Ok(result)
    }

    async fn bill_metric(
        &self,
        client_id: &str,
        date: &crate::payroll::model::PayrollDate,
        rule: &CompletionFeeRule,
        count: u32,
        result: &mut CompletionBillingResult,
    ) -> Result<()> {
        let service = self
            .catalog
            .get_service(&rule.service_code)
            .await?
            .ok_or_else(|| BillingError::ServiceNotFound {
                service_code: rule.service_code.clone(),
            })?;

        let amount = round_currency(service.base_rate * Decimal::from(count));
        if amount <= Decimal::ZERO {
            result.warnings.push(format!(
                "{} - {}: computed amount is zero, skipping",
                client_id, rule.service_code
            ));
            return Ok(());
        }

        let item = BillingItem {
            id: Uuid::new_v4(),
            client_id: client_id.to_string(),
            service_code: service.service_code.clone(),
            billing_period_start: date.adjusted_eft_date,
            billing_period_end: date.adjusted_eft_date,
            total_amount: amount,
            auto_generated: true,
            generated_from: GeneratedFrom::CompletionMetrics,
            status: if service.auto_approval {
                BillingItemStatus::Approved
            } else {
                BillingItemStatus::Draft
            },
            requires_approval: !service.auto_approval,
            rate_justification: Some(format!(
                "{} x {} @ {}",
                count, service.name, service.base_rate
            )),
            payroll_date_id: Some(date.id),
            created_at: Utc::now(),
        };

        match self.billing.insert_item_if_absent(&item).await? {
            InsertOutcome::AlreadyBilled => {
                // Should not happen after the delete pass; a concurrent
                // regeneration got there first.
                tracing::debug!(
                    target: "payrun::billing",
                    client_id,
                    service_code = %rule.service_code,
                    "completion item already present, insert skipped"
                );
                return Ok(());
            }
            InsertOutcome::Inserted => {}
        }

        result.items_created += 1;
        result.total_amount += amount;

        self.audit
            .log(BillingAuditEvent::ItemGenerated {
                client_id: client_id.to_string(),
                service_code: service.service_code,
                amount: amount.to_string(),
                prorated: false,
                source: GeneratedFrom::CompletionMetrics.to_string(),
            })
            .await;

        Ok(())
    }

    async fn append_run_summary(&self, result: &CompletionBillingResult) {
        let summary = GenerationRunSummary {
            id: Uuid::new_v4(),
            generated_from: GeneratedFrom::CompletionMetrics,
            billing_month: None,
            items_created: result.items_created,
            total_amount: result.total_amount,
            clients_processed: 1,
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
