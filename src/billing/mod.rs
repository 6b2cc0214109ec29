//! Billing module: recurring generation, completion-metrics billing, and
//! the proration calculator.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use payrun::billing::{
//!     GenerateRequest, RecurringBillingGenerator, InMemoryServiceCatalog,
//!     StandardEligibilityPolicy, TracingAuditLogger,
//! };
//!
//! let generator = RecurringBillingGenerator::new(
//!     billing_store,
//!     client_store,
//!     Arc::new(InMemoryServiceCatalog::standard()),
//!     Arc::new(StandardEligibilityPolicy::default_rules()),
//!     Arc::new(TracingAuditLogger),
//! );
//!
//! let result = generator
//!     .generate(&GenerateRequest::for_month(month))
//!     .await?;
//! println!("{} items, total {}", result.items_created, result.total_amount);
//! ```

pub mod audit;
pub mod catalog;
pub mod completion;
pub mod eligibility;
pub mod error;
pub mod generator;
pub mod proration;
pub mod storage;
pub mod validation;

// Error exports
pub use error::BillingError;

// Catalog exports
pub use catalog::{
    BillingUnit, InMemoryServiceCatalog, RecurringService, ServiceCatalog, standard_services,
};

// Proration exports
pub use proration::{
    ClientActivityWindow, FeeAmount, calculate_fee_amount, days_in_month, round_currency,
};

// Eligibility exports
pub use eligibility::{
    ClientProfile, EligibilityRule, FixedServicesPolicy, ServiceEligibilityPolicy,
    StandardEligibilityPolicy, TenureWindow,
};

// Storage exports
pub use storage::{
    BillingItem, BillingItemStatus, BillingStore, ClientStore, GeneratedFrom,
    GenerationRunSummary, InsertOutcome, RecurringBillingLogEntry,
};

// Generator exports
pub use generator::{
    GenerateRequest, GeneratedItem, GenerationResult, RecurringBillingGenerator,
    last_day_of_month,
};

// Completion exports
pub use completion::{
    CompletionBillingGenerator, CompletionBillingResult, CompletionFeeRule,
    CompletionFeeSchedule, MetricKind, PayrollRunMetrics,
};

// Audit exports
pub use audit::{BillingAuditEvent, BillingAuditLogger, NoOpAuditLogger, TracingAuditLogger};

// Validation exports
pub use validation::{validate_billing_month, validate_client_id, validate_service_code};
