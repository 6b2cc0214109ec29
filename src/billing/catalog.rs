//! Recurring service catalog.
//!
//! The catalog is an external, read-only input to the billing engine: each
//! entry names a billable service with its standard rate and proration
//! eligibility flags. Implement [`ServiceCatalog`] to back it with your
//! database; an in-memory catalog with the standard payroll service set is
//! provided for tests and small deployments.

use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// How a service is counted when billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingUnit {
    /// One flat charge per billing month.
    Monthly,
    /// Charged per payslip processed.
    PerPayslip,
    /// Charged per discrete event (new starter, termination, adjustment).
    PerEvent,
}

impl BillingUnit {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::PerPayslip => "per_payslip",
            Self::PerEvent => "per_event",
        }
    }
}

impl std::fmt::Display for BillingUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A billable service definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringService {
    /// Stable service code (e.g. "MONTHLY_SERVICE").
    pub service_code: String,
    /// Display name shown on billing items.
    pub name: String,
    /// Standard rate in currency units.
    pub base_rate: Decimal,
    /// How the service is counted.
    pub billing_unit: BillingUnit,
    /// Whether a mid-month client start prorates the charge.
    pub new_client_proration: bool,
    /// Whether a mid-month client termination prorates the charge.
    pub termination_proration: bool,
    /// Floor applied to new-client prorated amounts.
    pub minimum_charge: Option<Decimal>,
    /// Whether generated items are approved without review.
    pub auto_approval: bool,
}

/// Trait for reading the service catalog.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Look up a service by code.
    async fn get_service(&self, service_code: &str) -> Result<Option<RecurringService>>;

    /// List all services.
    async fn list_services(&self) -> Result<Vec<RecurringService>>;
}

/// In-memory service catalog.
#[derive(Default)]
pub struct InMemoryServiceCatalog {
    services: RwLock<HashMap<String, RecurringService>>,
}

impl InMemoryServiceCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog seeded with the standard payroll service set.
    #[must_use]
    pub fn standard() -> Self {
        let catalog = Self::new();
        for service in standard_services() {
            catalog.upsert(service);
        }
        catalog
    }

    /// Insert or replace a service.
    pub fn upsert(&self, service: RecurringService) {
        self.services
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(service.service_code.clone(), service);
    }
}

#[async_trait]
impl ServiceCatalog for InMemoryServiceCatalog {
    async fn get_service(&self, service_code: &str) -> Result<Option<RecurringService>> {
        Ok(self
            .services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(service_code)
            .cloned())
    }

    async fn list_services(&self) -> Result<Vec<RecurringService>> {
        let services = self.services.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<RecurringService> = services.values().cloned().collect();
        all.sort_by(|a, b| a.service_code.cmp(&b.service_code));
        Ok(all)
    }
}

/// The standard payroll service set.
#[must_use]
pub fn standard_services() -> Vec<RecurringService> {
    vec![
        RecurringService {
            service_code: "MONTHLY_SERVICE".into(),
            name: "Monthly payroll servicing".into(),
            base_rate: dec!(150.00),
            billing_unit: BillingUnit::Monthly,
            new_client_proration: true,
            termination_proration: true,
            minimum_charge: Some(dec!(50.00)),
            auto_approval: true,
        },
        RecurringService {
            service_code: "SYSTEM_ACCESS".into(),
            name: "Payroll system access".into(),
            base_rate: dec!(45.00),
            billing_unit: BillingUnit::Monthly,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: true,
        },
        RecurringService {
            service_code: "ONBOARDING_SUPPORT".into(),
            name: "Onboarding support".into(),
            base_rate: dec!(85.00),
            billing_unit: BillingUnit::Monthly,
            new_client_proration: true,
            termination_proration: false,
            minimum_charge: Some(dec!(40.00)),
            auto_approval: false,
        },
        RecurringService {
            service_code: "PAYSLIP_PROCESSING".into(),
            name: "Payslip processing".into(),
            base_rate: dec!(5.50),
            billing_unit: BillingUnit::PerPayslip,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: true,
        },
        RecurringService {
            service_code: "NEW_STARTER_ADMIN".into(),
            name: "New starter administration".into(),
            base_rate: dec!(25.00),
            billing_unit: BillingUnit::PerEvent,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: true,
        },
        RecurringService {
            service_code: "TERMINATION_ADMIN".into(),
            name: "Termination administration".into(),
            base_rate: dec!(30.00),
            billing_unit: BillingUnit::PerEvent,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: true,
        },
        RecurringService {
            service_code: "LEAVE_CALC".into(),
            name: "Leave calculation".into(),
            base_rate: dec!(15.00),
            billing_unit: BillingUnit::PerEvent,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: true,
        },
        RecurringService {
            service_code: "BONUS_RUN".into(),
            name: "Bonus payment run".into(),
            base_rate: dec!(20.00),
            billing_unit: BillingUnit::PerEvent,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: true,
        },
        RecurringService {
            service_code: "TAX_ADJUSTMENT".into(),
            name: "Tax adjustment".into(),
            base_rate: dec!(18.00),
            billing_unit: BillingUnit::PerEvent,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: true,
        },
        RecurringService {
            service_code: "SUPER_CONTRIBUTION".into(),
            name: "Superannuation contribution processing".into(),
            base_rate: dec!(12.50),
            billing_unit: BillingUnit::PerEvent,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: true,
        },
        RecurringService {
            service_code: "PAYG_SUMMARY".into(),
            name: "PAYG summary preparation".into(),
            base_rate: dec!(8.00),
            billing_unit: BillingUnit::PerEvent,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: true,
        },
        RecurringService {
            service_code: "FBT_CALC".into(),
            name: "FBT calculation".into(),
            base_rate: dec!(40.00),
            billing_unit: BillingUnit::PerEvent,
            new_client_proration: false,
            termination_proration: false,
            minimum_charge: None,
            auto_approval: false,
        },
    ]
}
