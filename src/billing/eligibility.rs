//! Service eligibility policy.
//!
//! Which services a client should be billed for in a month is a business
//! rule that changes more often than the generator's control flow, so it is
//! injected as a strategy rather than hardcoded. The standard policy bills
//! a fixed base set plus services conditional on client tenure.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A client as seen by the billing engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Stable client identifier.
    pub id: String,
    /// Display name used in billing output and error messages.
    pub name: String,
    /// Whether the client is active (inactive clients are never billed).
    pub active: bool,
    /// Date the client's service relationship started.
    pub service_started_on: Option<NaiveDate>,
}

/// Strategy deciding which services apply to a client for a billing month.
pub trait ServiceEligibilityPolicy: Send + Sync {
    /// Service codes applicable to `client` for `billing_month`.
    fn applicable_services(&self, client: &ClientProfile, billing_month: NaiveDate) -> Vec<String>;
}

/// Tenure window qualifying a conditional service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenureWindow {
    /// Applies in every billing month.
    Always,
    /// Applies only while the client's tenure is under this many months.
    WithinFirstMonths(u32),
    /// Applies only once tenure reaches this many months.
    AfterMonths(u32),
}

/// One rule of the standard policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRule {
    /// Service code to bill when the rule matches.
    pub service_code: String,
    /// Tenure window the client must be in.
    pub window: TenureWindow,
}

/// The standard policy: a fixed base set plus tenure-conditional services.
#[derive(Debug, Clone)]
pub struct StandardEligibilityPolicy {
    rules: Vec<EligibilityRule>,
}

impl StandardEligibilityPolicy {
    /// Build a policy from explicit rules.
    #[must_use]
    pub fn new(rules: Vec<EligibilityRule>) -> Self {
        Self { rules }
    }

    /// The default payroll-services rule set.
    #[must_use]
    pub fn default_rules() -> Self {
        Self::new(vec![
            EligibilityRule {
                service_code: "MONTHLY_SERVICE".into(),
                window: TenureWindow::Always,
            },
            EligibilityRule {
                service_code: "SYSTEM_ACCESS".into(),
                window: TenureWindow::Always,
            },
            EligibilityRule {
                service_code: "ONBOARDING_SUPPORT".into(),
                window: TenureWindow::WithinFirstMonths(3),
            },
        ])
    }

    fn tenure_months(client: &ClientProfile, billing_month: NaiveDate) -> Option<u32> {
        let started = client.service_started_on?;
        let months = (billing_month.year() - started.year()) * 12
            + (billing_month.month() as i32 - started.month() as i32);
        Some(months.max(0) as u32)
    }
}

impl ServiceEligibilityPolicy for StandardEligibilityPolicy {
    fn applicable_services(&self, client: &ClientProfile, billing_month: NaiveDate) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| match rule.window {
                TenureWindow::Always => true,
                TenureWindow::WithinFirstMonths(limit) => {
                    // Unknown start date: treat as established, skip
                    // onboarding-phase services.
                    Self::tenure_months(client, billing_month).is_some_and(|t| t < limit)
                }
                TenureWindow::AfterMonths(min) => {
                    Self::tenure_months(client, billing_month).map_or(true, |t| t >= min)
                }
            })
            .map(|rule| rule.service_code.clone())
            .collect()
    }
}

/// Policy billing a fixed set of services to every client. Useful in tests
/// and for single-service generation runs.
#[derive(Debug, Clone)]
pub struct FixedServicesPolicy {
    service_codes: Vec<String>,
}

impl FixedServicesPolicy {
    #[must_use]
    pub fn new(service_codes: Vec<String>) -> Self {
        Self { service_codes }
    }
}

impl ServiceEligibilityPolicy for FixedServicesPolicy {
    fn applicable_services(&self, _client: &ClientProfile, _billing_month: NaiveDate) -> Vec<String> {
        self.service_codes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(started: Option<NaiveDate>) -> ClientProfile {
        ClientProfile {
            id: "client-1".into(),
            name: "Acme Pty Ltd".into(),
            active: true,
            service_started_on: started,
        }
    }

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn new_client_gets_onboarding_support() {
        let policy = StandardEligibilityPolicy::default_rules();
        let c = client(Some(NaiveDate::from_ymd_opt(2025, 5, 12).unwrap()));
        let services = policy.applicable_services(&c, month(2025, 6));
        assert!(services.contains(&"MONTHLY_SERVICE".to_string()));
        assert!(services.contains(&"ONBOARDING_SUPPORT".to_string()));
    }

    #[test]
    fn established_client_loses_onboarding_support() {
        let policy = StandardEligibilityPolicy::default_rules();
        let c = client(Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        let services = policy.applicable_services(&c, month(2025, 6));
        assert!(services.contains(&"MONTHLY_SERVICE".to_string()));
        assert!(!services.contains(&"ONBOARDING_SUPPORT".to_string()));
    }

    #[test]
    fn unknown_start_date_skips_tenure_limited_services() {
        let policy = StandardEligibilityPolicy::default_rules();
        let services = policy.applicable_services(&client(None), month(2025, 6));
        assert!(!services.contains(&"ONBOARDING_SUPPORT".to_string()));
        assert_eq!(services.len(), 2);
    }
}
