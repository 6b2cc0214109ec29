//! Payroll versioning module.
//!
//! Payroll configurations are immutable, chained versions: an edit
//! supersedes the current version, inserts a new one, and regenerates
//! future pay dates from the effective boundary. See
//! [`version::PayrollVersionManager`].

pub mod model;
pub mod storage;
pub mod version;

pub use model::{Payroll, PayrollDate, PayrollStatus, VersionReason};
pub use storage::{
    Clock, DateRegenerationInfo, DateRegenerationService, PayrollStore, SystemClock,
};
pub use version::{
    DEFAULT_EMPLOYEE_COUNT, DEFAULT_PROCESSING_DAYS_BEFORE_EFT, PayrollEdits,
    PayrollVersionManager, VersionResult,
};
