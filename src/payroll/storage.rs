//! Storage traits for payroll versioning.
//!
//! The original system leant on a database trigger to delete and regenerate
//! payroll dates when a version's `superseded_date` was set. Here that is an
//! explicit seam: the version manager calls [`DateRegenerationService`]
//! synchronously after supersession, inside the same logical transaction.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{Payroll, PayrollDate};

/// Trait for persisting payroll versions and their dates.
#[async_trait]
pub trait PayrollStore: Send + Sync {
    /// Look up a payroll version by id.
    async fn get_payroll(&self, id: Uuid) -> Result<Option<Payroll>>;

    /// The current (non-superseded) version of a chain.
    async fn current_version(&self, parent_payroll_id: Uuid) -> Result<Option<Payroll>>;

    /// All versions of a chain, ordered by version number.
    async fn list_versions(&self, parent_payroll_id: Uuid) -> Result<Vec<Payroll>>;

    /// Mark a version superseded from the given date.
    async fn supersede(&self, payroll_id: Uuid, superseded_date: NaiveDate) -> Result<()>;

    /// Insert a new version row.
    async fn insert_version(&self, payroll: &Payroll) -> Result<()>;

    /// Attach a human-readable processing note to a version.
    async fn attach_note(&self, payroll_id: Uuid, note: &str) -> Result<()>;

    /// Look up a payroll date (occurrence) by id.
    async fn get_payroll_date(&self, payroll_date_id: Uuid) -> Result<Option<PayrollDate>>;
}

/// Summary of a date regeneration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRegenerationInfo {
    /// Boundary from which dates were detached and regenerated.
    pub effective_from: NaiveDate,
    /// Dates detached from superseded versions.
    pub dates_detached: usize,
    /// Dates generated under the new version.
    pub dates_generated: usize,
}

/// Regenerates payroll dates after a supersession.
///
/// Dates with `adjusted_eft_date >= effective` are detached from older
/// versions of the chain and regenerated under the new version; dates
/// before the boundary are left attributed to history.
#[async_trait]
pub trait DateRegenerationService: Send + Sync {
    async fn regenerate_from(
        &self,
        parent_payroll_id: Uuid,
        new_version_id: Uuid,
        effective: NaiveDate,
    ) -> Result<DateRegenerationInfo>;
}

/// Source of "today" so effective-date clamping is deterministic in tests.
pub trait Clock: Send + Sync {
    /// Current date, time-of-day stripped.
    fn today(&self) -> NaiveDate;
}

/// Wall-clock implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// In-memory implementations for testing.
#[cfg(any(test, feature = "test-stores"))]
pub mod test {
    use super::*;
    use chrono::{Datelike, Days, Months};
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests.
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock(pub NaiveDate);

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            self.0
        }
    }

    /// In-memory payroll store. Also implements [`DateRegenerationService`]
    /// with a simple fixed day-of-month date rule, which is enough to
    /// exercise ownership-transfer semantics.
    #[derive(Default, Clone)]
    pub struct InMemoryPayrollStore {
        inner: Arc<InMemoryPayrollStoreInner>,
    }

    #[derive(Default)]
    struct InMemoryPayrollStoreInner {
        payrolls: RwLock<HashMap<Uuid, Payroll>>,
        dates: RwLock<HashMap<Uuid, PayrollDate>>,
        notes: RwLock<Vec<(Uuid, String)>>,
        fail_notes: RwLock<bool>,
        months_to_generate: RwLock<u32>,
    }

    impl InMemoryPayrollStore {
        #[must_use]
        pub fn new() -> Self {
            let store = Self::default();
            *store.inner.months_to_generate.write().unwrap() = 12;
            store
        }

        /// Seed a payroll version directly.
        pub fn seed_payroll(&self, payroll: Payroll) {
            self.inner
                .payrolls
                .write()
                .unwrap()
                .insert(payroll.id, payroll);
        }

        /// Seed a payroll date directly.
        pub fn seed_date(&self, date: PayrollDate) {
            self.inner.dates.write().unwrap().insert(date.id, date);
        }

        /// All dates currently owned by a version (for assertions).
        pub fn dates_for(&self, payroll_id: Uuid) -> Vec<PayrollDate> {
            let mut dates: Vec<PayrollDate> = self
                .inner
                .dates
                .read()
                .unwrap()
                .values()
                .filter(|d| d.payroll_id == payroll_id)
                .cloned()
                .collect();
            dates.sort_by_key(|d| d.adjusted_eft_date);
            dates
        }

        /// Notes attached so far (for assertions).
        pub fn notes(&self) -> Vec<(Uuid, String)> {
            self.inner.notes.read().unwrap().clone()
        }

        /// Make `attach_note` fail (best-effort side effect tests).
        pub fn fail_notes(&self) {
            *self.inner.fail_notes.write().unwrap() = true;
        }
    }

    #[async_trait]
    impl PayrollStore for InMemoryPayrollStore {
        async fn get_payroll(&self, id: Uuid) -> Result<Option<Payroll>> {
            Ok(self.inner.payrolls.read().unwrap().get(&id).cloned())
        }

        async fn current_version(&self, parent_payroll_id: Uuid) -> Result<Option<Payroll>> {
            Ok(self
                .inner
                .payrolls
                .read()
                .unwrap()
                .values()
                .find(|p| p.parent_payroll_id == parent_payroll_id && p.is_current())
                .cloned())
        }

        async fn list_versions(&self, parent_payroll_id: Uuid) -> Result<Vec<Payroll>> {
            let mut versions: Vec<Payroll> = self
                .inner
                .payrolls
                .read()
                .unwrap()
                .values()
                .filter(|p| p.parent_payroll_id == parent_payroll_id)
                .cloned()
                .collect();
            versions.sort_by_key(|p| p.version_number);
            Ok(versions)
        }

        async fn supersede(&self, payroll_id: Uuid, superseded_date: NaiveDate) -> Result<()> {
            let mut payrolls = self.inner.payrolls.write().unwrap();
            match payrolls.get_mut(&payroll_id) {
                Some(payroll) => {
                    payroll.superseded_date = Some(superseded_date);
                    payroll.status = super::super::model::PayrollStatus::Superseded;
                    Ok(())
                }
                None => Err(crate::error::PayrunError::not_found(format!(
                    "payroll {payroll_id}"
                ))),
            }
        }

        async fn insert_version(&self, payroll: &Payroll) -> Result<()> {
            self.inner
                .payrolls
                .write()
                .unwrap()
                .insert(payroll.id, payroll.clone());
            Ok(())
        }

        async fn attach_note(&self, payroll_id: Uuid, note: &str) -> Result<()> {
            if *self.inner.fail_notes.read().unwrap() {
                return Err(crate::error::PayrunError::storage(
                    "note append failed (injected)",
                ));
            }
            self.inner
                .notes
                .write()
                .unwrap()
                .push((payroll_id, note.to_string()));
            Ok(())
        }

        async fn get_payroll_date(&self, payroll_date_id: Uuid) -> Result<Option<PayrollDate>> {
            Ok(self
                .inner
                .dates
                .read()
                .unwrap()
                .get(&payroll_date_id)
                .cloned())
        }
    }

    #[async_trait]
    impl DateRegenerationService for InMemoryPayrollStore {
        async fn regenerate_from(
            &self,
            parent_payroll_id: Uuid,
            new_version_id: Uuid,
            effective: NaiveDate,
        ) -> Result<DateRegenerationInfo> {
            let chain: Vec<Uuid> = self
                .inner
                .payrolls
                .read()
                .unwrap()
                .values()
                .filter(|p| p.parent_payroll_id == parent_payroll_id && p.id != new_version_id)
                .map(|p| p.id)
                .collect();

            // Detach: future-dated occurrences leave the superseded versions.
            let mut dates = self.inner.dates.write().unwrap();
            let before = dates.len();
            dates.retain(|_, d| {
                !(chain.contains(&d.payroll_id) && d.adjusted_eft_date >= effective)
            });
            let detached = before - dates.len();

            let new_version = self
                .inner
                .payrolls
                .read()
                .unwrap()
                .get(&new_version_id)
                .cloned()
                .ok_or_else(|| {
                    crate::error::PayrunError::not_found(format!("payroll {new_version_id}"))
                })?;

            let day = new_version.date_value.unwrap_or(15).clamp(1, 28) as u32;
            let processing_days =
                u64::from(new_version.processing_days_before_eft.unwrap_or(4).max(0) as u32);
            let months = *self.inner.months_to_generate.read().unwrap();

            let mut generated = 0;
            let mut cursor = effective.with_day(1).unwrap_or(effective);
            for _ in 0..months {
                if let Some(eft) = cursor.with_day(day) {
                    if eft >= effective {
                        let date = PayrollDate {
                            id: Uuid::new_v4(),
                            payroll_id: new_version_id,
                            original_eft_date: eft,
                            adjusted_eft_date: eft,
                            processing_date: eft
                                .checked_sub_days(Days::new(processing_days))
                                .unwrap_or(eft),
                            notes: None,
                        };
                        dates.insert(date.id, date);
                        generated += 1;
                    }
                }
                cursor = cursor
                    .checked_add_months(Months::new(1))
                    .unwrap_or(cursor);
            }

            Ok(DateRegenerationInfo {
                effective_from: effective,
                dates_detached: detached,
                dates_generated: generated,
            })
        }
    }

}
