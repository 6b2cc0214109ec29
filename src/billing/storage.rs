//! Storage traits for billing data.
//!
//! Implement these traits to persist billing state to your database. The
//! in-memory implementations used by tests live in the [`test`] submodule.
//!
//! The idempotency contract lives here: [`BillingStore::insert_item_if_absent`]
//! must be atomic on `(client_id, service_code, period_start, generated_from)`.
//! The generator pre-checks existing items, but a concurrent second run for
//! the same month can slip past that read, so the storage layer is the
//! authority. Back it with a unique index and map a constraint violation to
//! [`InsertOutcome::AlreadyBilled`].

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::eligibility::ClientProfile;
use super::proration::ClientActivityWindow;

/// Which process generated an auto-generated billing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedFrom {
    /// Monthly recurring schedule generation.
    RecurringSchedule,
    /// Payroll-run completion metrics.
    CompletionMetrics,
}

impl GeneratedFrom {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecurringSchedule => "recurring_schedule",
            Self::CompletionMetrics => "completion_metrics",
        }
    }
}

impl std::fmt::Display for GeneratedFrom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Approval state of a billing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingItemStatus {
    /// Awaiting approval.
    Draft,
    /// Approved for invoicing.
    Approved,
}

impl BillingItemStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
        }
    }
}

/// A unit of invoice-able work.
///
/// Auto-generated items are insert-if-absent, never update-in-place:
/// regeneration requires explicit prior deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingItem {
    pub id: Uuid,
    pub client_id: String,
    pub service_code: String,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    /// Amount in currency units, rounded to 2 decimal places.
    pub total_amount: Decimal,
    pub auto_generated: bool,
    pub generated_from: GeneratedFrom,
    pub status: BillingItemStatus,
    pub requires_approval: bool,
    pub rate_justification: Option<String>,
    /// Set for completion-metrics items: the payroll run that produced them.
    pub payroll_date_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an insert-if-absent attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The item was inserted.
    Inserted,
    /// A non-superseded auto-generated item already exists for the
    /// idempotency key; nothing was written.
    AlreadyBilled,
}

/// Audit record of a single generation event per (client, service, month).
/// Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringBillingLogEntry {
    pub id: Uuid,
    pub client_id: String,
    pub service_code: String,
    pub billing_month: NaiveDate,
    pub amount: Decimal,
    pub prorated: bool,
    pub proration_reason: Option<String>,
    pub generated_by_system: bool,
    pub created_at: DateTime<Utc>,
}

/// One row per generation run, summarizing totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRunSummary {
    pub id: Uuid,
    pub generated_from: GeneratedFrom,
    pub billing_month: Option<NaiveDate>,
    pub items_created: usize,
    pub total_amount: Decimal,
    pub clients_processed: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Trait for storing billing items and generation logs.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// List auto-generated items for a client and billing period start,
    /// filtered by source.
    async fn list_items(
        &self,
        client_id: &str,
        billing_period_start: NaiveDate,
        generated_from: GeneratedFrom,
    ) -> Result<Vec<BillingItem>>;

    /// Insert a billing item unless one already exists for the idempotency
    /// key `(client_id, service_code, billing_period_start, generated_from)`.
    ///
    /// Implementations must make this atomic (unique index + conflict
    /// handling); the caller's pre-check is an optimization, not a
    /// guarantee.
    async fn insert_item_if_absent(&self, item: &BillingItem) -> Result<InsertOutcome>;

    /// Delete all auto-generated items for a payroll date tagged with the
    /// given source. Returns the number of items deleted.
    async fn delete_items_for_payroll_date(
        &self,
        payroll_date_id: Uuid,
        generated_from: GeneratedFrom,
    ) -> Result<usize>;

    /// Append a per-(client, service, month) generation log entry.
    async fn append_log_entry(&self, entry: &RecurringBillingLogEntry) -> Result<()>;

    /// Append a run summary row.
    async fn append_run_summary(&self, summary: &GenerationRunSummary) -> Result<()>;
}

/// Trait for reading the client roster and lifecycle-derived activity.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// List active clients, optionally restricted to the given IDs.
    async fn list_active_clients(&self, filter: Option<&[String]>) -> Result<Vec<ClientProfile>>;

    /// Look up one client.
    async fn get_client(&self, client_id: &str) -> Result<Option<ClientProfile>>;

    /// The client's activity window within a billing month, derived from
    /// lifecycle history.
    async fn activity_window(
        &self,
        client_id: &str,
        billing_month: NaiveDate,
    ) -> Result<ClientActivityWindow>;

    /// Client-specific rate override for a service, if one is agreed.
    async fn custom_rate(&self, _client_id: &str, _service_code: &str) -> Result<Option<Decimal>> {
        Ok(None)
    }
}

/// In-memory stores for testing.
#[cfg(any(test, feature = "test-stores"))]
pub mod test {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, RwLock};

    /// In-memory billing store enforcing the idempotency uniqueness key.
    ///
    /// Wraps data in Arc for cheap cloning.
    #[derive(Default, Clone)]
    pub struct InMemoryBillingStore {
        inner: Arc<InMemoryBillingStoreInner>,
    }

    #[derive(Default)]
    struct InMemoryBillingStoreInner {
        items: RwLock<Vec<BillingItem>>,
        log_entries: RwLock<Vec<RecurringBillingLogEntry>>,
        run_summaries: RwLock<Vec<GenerationRunSummary>>,
        fail_summaries: RwLock<bool>,
        fail_log_entries: RwLock<bool>,
    }

    impl InMemoryBillingStore {
        /// Create a new in-memory store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All items (for assertions).
        pub fn all_items(&self) -> Vec<BillingItem> {
            self.inner.items.read().unwrap().clone()
        }

        /// All log entries (for assertions).
        pub fn all_log_entries(&self) -> Vec<RecurringBillingLogEntry> {
            self.inner.log_entries.read().unwrap().clone()
        }

        /// All run summaries (for assertions).
        pub fn all_run_summaries(&self) -> Vec<GenerationRunSummary> {
            self.inner.run_summaries.read().unwrap().clone()
        }

        /// Make `append_run_summary` fail (for best-effort logging tests).
        pub fn fail_run_summaries(&self) {
            *self.inner.fail_summaries.write().unwrap() = true;
        }

        /// Make `append_log_entry` fail.
        pub fn fail_log_entries(&self) {
            *self.inner.fail_log_entries.write().unwrap() = true;
        }
    }

    #[async_trait]
    impl BillingStore for InMemoryBillingStore {
        async fn list_items(
            &self,
            client_id: &str,
            billing_period_start: NaiveDate,
            generated_from: GeneratedFrom,
        ) -> Result<Vec<BillingItem>> {
            Ok(self
                .inner
                .items
                .read()
                .unwrap()
                .iter()
                .filter(|i| {
                    i.client_id == client_id
                        && i.billing_period_start == billing_period_start
                        && i.generated_from == generated_from
                })
                .cloned()
                .collect())
        }

        async fn insert_item_if_absent(&self, item: &BillingItem) -> Result<InsertOutcome> {
            let mut items = self.inner.items.write().unwrap();
            let exists = items.iter().any(|i| {
                i.client_id == item.client_id
                    && i.service_code == item.service_code
                    && i.billing_period_start == item.billing_period_start
                    && i.generated_from == item.generated_from
            });
            if exists {
                return Ok(InsertOutcome::AlreadyBilled);
            }
            items.push(item.clone());
            Ok(InsertOutcome::Inserted)
        }

        async fn delete_items_for_payroll_date(
            &self,
            payroll_date_id: Uuid,
            generated_from: GeneratedFrom,
        ) -> Result<usize> {
            let mut items = self.inner.items.write().unwrap();
            let before = items.len();
            items.retain(|i| {
                !(i.payroll_date_id == Some(payroll_date_id)
                    && i.generated_from == generated_from)
            });
            Ok(before - items.len())
        }

        async fn append_log_entry(&self, entry: &RecurringBillingLogEntry) -> Result<()> {
            if *self.inner.fail_log_entries.read().unwrap() {
                return Err(crate::error::PayrunError::storage(
                    "log append failed (injected)",
                ));
            }
            self.inner.log_entries.write().unwrap().push(entry.clone());
            Ok(())
        }

        async fn append_run_summary(&self, summary: &GenerationRunSummary) -> Result<()> {
            if *self.inner.fail_summaries.read().unwrap() {
                return Err(crate::error::PayrunError::storage(
                    "summary append failed (injected)",
                ));
            }
            self.inner
                .run_summaries
                .write()
                .unwrap()
                .push(summary.clone());
            Ok(())
        }
    }

    /// In-memory client roster with seedable activity windows.
    #[derive(Default, Clone)]
    pub struct InMemoryClientStore {
        inner: Arc<InMemoryClientStoreInner>,
    }

    #[derive(Default)]
    struct InMemoryClientStoreInner {
        clients: RwLock<Vec<ClientProfile>>,
        windows: RwLock<HashMap<String, ClientActivityWindow>>,
        custom_rates: RwLock<HashMap<(String, String), Decimal>>,
        fail_window_for: RwLock<HashSet<String>>,
    }

    impl InMemoryClientStore {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a client.
        pub fn add_client(&self, client: ClientProfile) {
            self.inner.clients.write().unwrap().push(client);
        }

        /// Seed an activity window for a client (any month).
        pub fn set_window(&self, client_id: &str, window: ClientActivityWindow) {
            self.inner
                .windows
                .write()
                .unwrap()
                .insert(client_id.to_string(), window);
        }

        /// Seed a custom rate for a (client, service) pair.
        pub fn set_custom_rate(&self, client_id: &str, service_code: &str, rate: Decimal) {
            self.inner
                .custom_rates
                .write()
                .unwrap()
                .insert((client_id.to_string(), service_code.to_string()), rate);
        }

        /// Make `activity_window` fail for a client (failure-isolation tests).
        pub fn fail_activity_window_for(&self, client_id: &str) {
            self.inner
                .fail_window_for
                .write()
                .unwrap()
                .insert(client_id.to_string());
        }
    }

    #[async_trait]
    impl ClientStore for InMemoryClientStore {
        async fn list_active_clients(
            &self,
            filter: Option<&[String]>,
        ) -> Result<Vec<ClientProfile>> {
            Ok(self
                .inner
                .clients
                .read()
                .unwrap()
                .iter()
                .filter(|c| c.active)
                .filter(|c| filter.map_or(true, |ids| ids.contains(&c.id)))
                .cloned()
                .collect())
        }

        async fn get_client(&self, client_id: &str) -> Result<Option<ClientProfile>> {
            Ok(self
                .inner
                .clients
                .read()
                .unwrap()
                .iter()
                .find(|c| c.id == client_id)
                .cloned())
        }

        async fn activity_window(
            &self,
            client_id: &str,
            _billing_month: NaiveDate,
        ) -> Result<ClientActivityWindow> {
            if self.inner.fail_window_for.read().unwrap().contains(client_id) {
                return Err(crate::error::PayrunError::storage(
                    "activity window lookup failed (injected)",
                ));
            }
            Ok(self
                .inner
                .windows
                .read()
                .unwrap()
                .get(client_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn custom_rate(
            &self,
            client_id: &str,
            service_code: &str,
        ) -> Result<Option<Decimal>> {
            Ok(self
                .inner
                .custom_rates
                .read()
                .unwrap()
                .get(&(client_id.to_string(), service_code.to_string()))
                .copied())
        }
    }

}
