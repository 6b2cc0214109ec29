//! Payrun - payroll versioning and recurring billing generation engine
//!
//! Payrun is the billing core of a payroll-services SaaS: it creates
//! immutable, chained versions of payroll configurations and generates
//! monthly recurring billing items per client and service, with proration,
//! idempotency, and partial-failure isolation.
//!
//! # Features
//!
//! - **Recurring billing**: per-month generation with an injected service
//!   eligibility policy, dry-run previews, and insert-if-absent idempotency
//! - **Proration**: pure decimal fee arithmetic with new-client and
//!   termination proration
//! - **Payroll versioning**: supersede-and-insert version chains with
//!   clamped effective dates and synchronous date regeneration
//! - **Completion-metrics billing**: volume-based fees from payroll-run
//!   completion events, regenerated wholesale on metrics updates
//! - **HTTP**: axum routes exposing the generation endpoints
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use payrun::{self, http::EngineContext};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize logging
//!     payrun::init_tracing();
//!
//!     // Wire stores (your database-backed implementations) into the
//!     // generators, then serve the router.
//!     let app = payrun::http::router(context);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod billing;
mod config;
mod error;
pub mod http;
pub mod payroll;

// Re-exports for public API
pub use config::{EngineConfig, LoggingConfig, VersioningConfig};
pub use error::{ErrorResponse, PayrunError, Result};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main()
/// before wiring the engine.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "payrun=debug")
/// - `PAYRUN_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("PAYRUN_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with an explicit configuration
pub fn init_tracing_with_config(config: &LoggingConfig) {
    let env_filter = EnvFilter::new(&config.level);

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
