//! Billing-specific error types.
//!
//! Provides granular error types for the generation engine, enabling better
//! error handling and more informative messages for API consumers.

use std::fmt;

use crate::error::PayrunError;

/// Billing-specific errors.
///
/// These errors provide more context than generic errors and can be
/// converted to `PayrunError` for HTTP responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    // Validation errors
    /// The billing month is not the first calendar day of a month.
    InvalidBillingMonth { date: String },
    /// The client ID is invalid.
    InvalidClientId { id: String, reason: String },
    /// The service code is invalid.
    InvalidServiceCode { code: String, reason: String },

    // Catalog errors
    /// The specified service was not found in the catalog.
    ServiceNotFound { service_code: String },

    // Payroll errors
    /// The payroll date was not found.
    PayrollDateNotFound { payroll_date_id: String },
    /// The payroll version was not found.
    PayrollNotFound { payroll_id: String },
}

impl fmt::Display for BillingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBillingMonth { date } => {
                write!(
                    f,
                    "Billing month must be the first day of a month, got '{}'",
                    date
                )
            }
            Self::InvalidClientId { id, reason } => {
                write!(f, "Invalid client ID '{}': {}", id, reason)
            }
            Self::InvalidServiceCode { code, reason } => {
                write!(f, "Invalid service code '{}': {}", code, reason)
            }
            Self::ServiceNotFound { service_code } => {
                write!(f, "Service '{}' not found in catalog", service_code)
            }
            Self::PayrollDateNotFound { payroll_date_id } => {
                write!(f, "Payroll date '{}' not found", payroll_date_id)
            }
            Self::PayrollNotFound { payroll_id } => {
                write!(f, "Payroll version '{}' not found", payroll_id)
            }
        }
    }
}

impl std::error::Error for BillingError {}

impl From<BillingError> for PayrunError {
    fn from(err: BillingError) -> Self {
        match &err {
            BillingError::InvalidBillingMonth { .. }
            | BillingError::InvalidClientId { .. }
            | BillingError::InvalidServiceCode { .. } => PayrunError::BadRequest(err.to_string()),
            BillingError::ServiceNotFound { .. }
            | BillingError::PayrollDateNotFound { .. }
            | BillingError::PayrollNotFound { .. } => PayrunError::NotFound(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_identifiers() {
        let err = BillingError::ServiceNotFound {
            service_code: "MONTHLY_SERVICE".to_string(),
        };
        assert!(err.to_string().contains("MONTHLY_SERVICE"));
    }

    #[test]
    fn validation_errors_map_to_bad_request() {
        let err: PayrunError = BillingError::InvalidBillingMonth {
            date: "2025-06-15".to_string(),
        }
        .into();
        assert!(matches!(err, PayrunError::BadRequest(_)));
    }

    #[test]
    fn lookup_errors_map_to_not_found() {
        let err: PayrunError = BillingError::PayrollDateNotFound {
            payroll_date_id: "d-9".to_string(),
        }
        .into();
        assert!(matches!(err, PayrunError::NotFound(_)));
    }
}
