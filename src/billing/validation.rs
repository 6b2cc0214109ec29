//! Input validation for billing operations.
//!
//! Validation failures are rejected before any side effect and map to
//! 4xx responses at the HTTP edge.

use chrono::{Datelike, NaiveDate};

use super::error::BillingError;
use crate::error::Result;

/// Maximum length for client IDs.
const MAX_CLIENT_ID_LENGTH: usize = 256;

/// Maximum length for service codes.
const MAX_SERVICE_CODE_LENGTH: usize = 64;

/// Validate that a billing month is the first calendar day of a month.
///
/// # Errors
///
/// Returns `BillingError::InvalidBillingMonth` otherwise.
pub fn validate_billing_month(billing_month: NaiveDate) -> Result<()> {
    if billing_month.day() != 1 {
        return Err(BillingError::InvalidBillingMonth {
            date: billing_month.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Validate a client ID.
///
/// Client IDs must be non-empty, at most 256 characters, and contain only
/// alphanumeric characters, underscores, and hyphens.
///
/// # Errors
///
/// Returns `BillingError::InvalidClientId` if validation fails.
pub fn validate_client_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(BillingError::InvalidClientId {
            id: id.to_string(),
            reason: "client_id cannot be empty".to_string(),
        }
        .into());
    }

    if id.len() > MAX_CLIENT_ID_LENGTH {
        return Err(BillingError::InvalidClientId {
            id: truncate_for_error(id),
            reason: format!(
                "client_id exceeds maximum length of {}",
                MAX_CLIENT_ID_LENGTH
            ),
        }
        .into());
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(BillingError::InvalidClientId {
            id: sanitize_for_error(id),
            reason: "client_id contains invalid characters (only alphanumeric, underscore, and hyphen allowed)"
                .to_string(),
        }
        .into());
    }

    Ok(())
}

/// Validate a service code.
///
/// Service codes must be non-empty, at most 64 characters, and contain only
/// uppercase alphanumeric characters and underscores.
///
/// # Errors
///
/// Returns `BillingError::InvalidServiceCode` if validation fails.
pub fn validate_service_code(code: &str) -> Result<()> {
    if code.is_empty() {
        return Err(BillingError::InvalidServiceCode {
            code: code.to_string(),
            reason: "service_code cannot be empty".to_string(),
        }
        .into());
    }

    if code.len() > MAX_SERVICE_CODE_LENGTH {
        return Err(BillingError::InvalidServiceCode {
            code: truncate_for_error(code),
            reason: format!(
                "service_code exceeds maximum length of {}",
                MAX_SERVICE_CODE_LENGTH
            ),
        }
        .into());
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(BillingError::InvalidServiceCode {
            code: sanitize_for_error(code),
            reason: "service_code contains invalid characters (only A-Z, 0-9, and underscore allowed)"
                .to_string(),
        }
        .into());
    }

    Ok(())
}

/// Truncate an overlong value for inclusion in an error message.
fn truncate_for_error(value: &str) -> String {
    let truncated: String = value.chars().take(64).collect();
    format!("{}...", truncated)
}

/// Strip non-printable characters before echoing a value back in an error.
fn sanitize_for_error(value: &str) -> String {
    value
        .chars()
        .take(64)
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect()
}
