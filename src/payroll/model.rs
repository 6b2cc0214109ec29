//! Payroll versioning data model.
//!
//! A `Payroll` is a versioned configuration, not a mutable row: editing one
//! supersedes the current version and inserts a new one. The chain is keyed
//! by `parent_payroll_id` (equal to the first version's own id) and ordered
//! by `version_number`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a new payroll version was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionReason {
    /// Schedule (cycle/date rule) changed.
    ScheduleChange,
    /// Client details changed.
    ClientChange,
    /// Consultant or manager assignment changed.
    ConsultantChange,
    /// Correcting a data-entry mistake.
    Correction,
}

impl VersionReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScheduleChange => "schedule_change",
            Self::ClientChange => "client_change",
            Self::ConsultantChange => "consultant_change",
            Self::Correction => "correction",
        }
    }

    /// Parse from a stored reason string.
    #[must_use]
    pub fn from_str_or_correction(s: &str) -> Self {
        match s {
            "schedule_change" => Self::ScheduleChange,
            "client_change" => Self::ClientChange,
            "consultant_change" => Self::ConsultantChange,
            _ => Self::Correction,
        }
    }
}

impl std::fmt::Display for VersionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a payroll configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    /// Being set up, not yet generating dates.
    Implementation,
    /// Live and generating dates.
    Active,
    /// Superseded by a later version. Immutable thereafter.
    Superseded,
    /// No longer serviced.
    Inactive,
}

impl PayrollStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Implementation => "implementation",
            Self::Active => "active",
            Self::Superseded => "superseded",
            Self::Inactive => "inactive",
        }
    }
}

/// One immutable version of a payroll configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payroll {
    /// Unique per version.
    pub id: Uuid,
    /// Stable identity across versions; equals own `id` for version 1.
    pub parent_payroll_id: Uuid,
    /// Monotonically increasing, starting at 1.
    pub version_number: u32,
    /// Date from which this version is authoritative.
    pub go_live_date: NaiveDate,
    /// Once set, this version stops governing dates from here forward.
    pub superseded_date: Option<NaiveDate>,
    pub client_id: String,
    /// Pay cycle reference. Required; inherited when not edited.
    pub cycle_id: Option<Uuid>,
    /// Date-rule type reference (e.g. fixed day-of-month).
    pub date_type_id: Option<Uuid>,
    /// Parameter for the date rule (e.g. the day of month).
    pub date_value: Option<i32>,
    pub primary_consultant_id: Option<Uuid>,
    pub backup_consultant_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    /// Working days between processing and EFT. Defaults to 4.
    pub processing_days_before_eft: Option<i32>,
    /// Defaults to 0.
    pub employee_count: Option<i32>,
    pub status: PayrollStatus,
    pub version_reason: Option<VersionReason>,
    pub created_by_user_id: Option<String>,
}

impl Payroll {
    /// Whether this version is the current (non-superseded) one.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.superseded_date.is_none()
    }
}

/// A pay occurrence owned by exactly one payroll version at a time.
///
/// A date with `adjusted_eft_date >= X` belongs to the version effective as
/// of `X`; supersession effective `X` detaches such dates from the old
/// version and regenerates them under the new one. Past dates stay with
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollDate {
    pub id: Uuid,
    /// Owning payroll version.
    pub payroll_id: Uuid,
    /// The EFT date before weekend/holiday adjustment.
    pub original_eft_date: NaiveDate,
    /// The EFT date after weekend/holiday adjustment.
    pub adjusted_eft_date: NaiveDate,
    /// Date processing must start to meet the EFT date.
    pub processing_date: NaiveDate,
    pub notes: Option<String>,
}
