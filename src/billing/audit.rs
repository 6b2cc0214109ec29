//! Audit logging for billing and versioning operations.
//!
//! Provides a trait-based audit logging system for tracking engine events.
//! This is useful for compliance, debugging, and reconciliation.

use async_trait::async_trait;
use std::fmt;

/// Audit event types for engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingAuditEvent {
    /// A recurring generation run completed.
    RecurringRunCompleted {
        billing_month: String,
        items_created: usize,
        clients_processed: usize,
        error_count: usize,
        dry_run: bool,
    },
    /// A billing item was generated.
    ItemGenerated {
        client_id: String,
        service_code: String,
        amount: String,
        prorated: bool,
        source: String,
    },
    /// Completion-metrics billing ran for a payroll date.
    CompletionBillingGenerated {
        payroll_date_id: String,
        items_created: usize,
        items_deleted: usize,
        completed_by: String,
    },
    /// A new payroll version was created.
    VersionCreated {
        parent_payroll_id: String,
        new_version_id: String,
        version_number: u32,
        reason: String,
        created_by: String,
    },
    /// A payroll version was superseded.
    VersionSuperseded {
        payroll_id: String,
        superseded_date: String,
    },
}

impl fmt::Display for BillingAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecurringRunCompleted {
                billing_month,
                items_created,
                clients_processed,
                error_count,
                dry_run,
            } => write!(
                f,
                "Recurring run completed: month={}, items={}, clients={}, errors={}, dry_run={}",
                billing_month, items_created, clients_processed, error_count, dry_run
            ),
            Self::ItemGenerated {
                client_id,
                service_code,
                amount,
                prorated,
                source,
            } => write!(
                f,
                "Item generated: client={}, service={}, amount={}, prorated={}, source={}",
                client_id, service_code, amount, prorated, source
            ),
            Self::CompletionBillingGenerated {
                payroll_date_id,
                items_created,
                items_deleted,
                completed_by,
            } => write!(
                f,
                "Completion billing: payroll_date={}, created={}, deleted={}, by={}",
                payroll_date_id, items_created, items_deleted, completed_by
            ),
            Self::VersionCreated {
                parent_payroll_id,
                new_version_id,
                version_number,
                reason,
                created_by,
            } => write!(
                f,
                "Version created: parent={}, new={}, number={}, reason={}, by={}",
                parent_payroll_id, new_version_id, version_number, reason, created_by
            ),
            Self::VersionSuperseded {
                payroll_id,
                superseded_date,
            } => write!(
                f,
                "Version superseded: payroll={}, from={}",
                payroll_id, superseded_date
            ),
        }
    }
}

/// Trait for audit logging backends.
///
/// Implementations should handle failures gracefully (e.g., log to stderr)
/// to avoid disrupting billing operations.
#[async_trait]
pub trait BillingAuditLogger: Send + Sync {
    /// Log an audit event.
    async fn log(&self, event: BillingAuditEvent);
}

/// No-op audit logger that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

#[async_trait]
impl BillingAuditLogger for NoOpAuditLogger {
    async fn log(&self, _event: BillingAuditEvent) {
        // No-op
    }
}

/// Tracing-based audit logger.
///
/// Logs audit events using the `tracing` crate at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl BillingAuditLogger for TracingAuditLogger {
    async fn log(&self, event: BillingAuditEvent) {
        tracing::info!(
            target: "payrun::audit",
            event_type = %event_kind(&event),
            "{}", event
        );
    }
}

/// Get the event kind as a string for structured logging.
fn event_kind(event: &BillingAuditEvent) -> &'static str {
    match event {
        BillingAuditEvent::RecurringRunCompleted { .. } => "recurring_run_completed",
        BillingAuditEvent::ItemGenerated { .. } => "item_generated",
        BillingAuditEvent::CompletionBillingGenerated { .. } => "completion_billing_generated",
        BillingAuditEvent::VersionCreated { .. } => "version_created",
        BillingAuditEvent::VersionSuperseded { .. } => "version_superseded",
    }
}
