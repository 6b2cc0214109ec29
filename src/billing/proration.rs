//! Proration calculator.
//!
//! Pure fee arithmetic: given a service, a billing month, and the client's
//! activity window within that month, compute the billable amount. All
//! arithmetic is done in `Decimal` currency units; rounding to 2 decimal
//! places happens only at the point of persistence via [`round_currency`].
//!
//! Behavior notes:
//!
//! - A mid-month start only prorates when the service opts in via
//!   `new_client_proration`; the `minimum_charge` floor applies to that
//!   branch only.
//! - A mid-month termination only prorates when `termination_proration` is
//!   set, and no floor applies on that branch. The asymmetry is deliberate
//!   observed behavior, pinned by tests.
//! - Services with proration disabled always bill the full rate regardless
//!   of when the client started or terminated.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use super::catalog::RecurringService;

/// The client's activity within a billing month, derived externally from
/// client lifecycle history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientActivityWindow {
    /// Day of month (1-based) the client started, if they started mid-month.
    pub start_day: Option<u32>,
    /// Day of month (1-based) the client terminated, if they terminated
    /// mid-month.
    pub termination_day: Option<u32>,
}

impl ClientActivityWindow {
    /// A window covering the whole month.
    #[must_use]
    pub fn full_month() -> Self {
        Self::default()
    }

    /// Client started on the given day of the month.
    #[must_use]
    pub fn started_on(day: u32) -> Self {
        Self {
            start_day: Some(day),
            termination_day: None,
        }
    }

    /// Client terminated on the given day of the month.
    #[must_use]
    pub fn terminated_on(day: u32) -> Self {
        Self {
            start_day: None,
            termination_day: Some(day),
        }
    }
}

/// The outcome of a fee calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeAmount {
    /// Unrounded billable amount. Callers round at persistence time.
    pub amount: Decimal,
    /// Whether proration was applied.
    pub prorated: bool,
    /// Human-readable justification when the amount differs from the base
    /// rate.
    pub reason: Option<String>,
}

/// Compute the billable amount for a service in a billing month.
///
/// `billing_month` is expected to be the first calendar day of a month;
/// callers validate this before invoking the calculator. `custom_rate`
/// overrides the service's base rate when a client-specific rate applies.
///
/// The returned amount is always non-negative. An amount of exactly zero
/// means "nothing chargeable": callers skip the item and log a warning
/// rather than treating it as an error.
#[must_use]
pub fn calculate_fee_amount(
    service: &RecurringService,
    billing_month: NaiveDate,
    window: &ClientActivityWindow,
    custom_rate: Option<Decimal>,
) -> FeeAmount {
    let base = custom_rate.unwrap_or(service.base_rate);
    let total_days = days_in_month(billing_month);

    if let Some(start_day) = window.start_day {
        if service.new_client_proration && start_day > 1 {
            let start_day = start_day.min(total_days);
            let days_active = total_days - start_day + 1;
            let raw = base * Decimal::from(days_active) / Decimal::from(total_days);
            let (amount, clamped) = match service.minimum_charge {
                Some(min) if raw < min => (min, true),
                _ => (raw, false),
            };
            let reason = if clamped {
                format!(
                    "Prorated for start on day {} of {} ({} days active), clamped to minimum charge",
                    start_day, total_days, days_active
                )
            } else {
                format!(
                    "Prorated for start on day {} of {} ({} days active)",
                    start_day, total_days, days_active
                )
            };
            return FeeAmount {
                amount,
                prorated: true,
                reason: Some(reason),
            };
        }
    }

    if let Some(termination_day) = window.termination_day {
        if service.termination_proration && termination_day < total_days {
            let days_active = termination_day.max(1).min(total_days);
            // No minimum-charge floor on the termination branch.
            let amount = base * Decimal::from(days_active) / Decimal::from(total_days);
            return FeeAmount {
                amount,
                prorated: true,
                reason: Some(format!(
                    "Prorated for termination on day {} of {}",
                    days_active, total_days
                )),
            };
        }
    }

    FeeAmount {
        amount: base,
        prorated: false,
        reason: None,
    }
}

/// Round a decimal amount to 2 currency decimal places.
///
/// Applied at persistence/response time only, never during intermediate
/// computation.
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Number of days in the month containing `date` (28-31).
#[must_use]
pub fn days_in_month(date: NaiveDate) -> u32 {
    let year = date.year();
    let month = date.month();
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => next.signed_duration_since(first).num_days() as u32,
        _ => 30,
    }
}
