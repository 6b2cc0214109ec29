//! HTTP/JSON boundary for the billing engine.
//!
//! The engine itself is transport-agnostic; this module wires the
//! generators into an axum router. Handlers use `State<EngineContext>`.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::billing::completion::{CompletionBillingGenerator, PayrollRunMetrics};
use crate::billing::generator::{GenerateRequest, GenerationResult, RecurringBillingGenerator};

/// Shared state for the billing routes.
#[derive(Clone)]
pub struct EngineContext {
    pub generator: Arc<RecurringBillingGenerator>,
    pub completion: Arc<CompletionBillingGenerator>,
}

/// Build the billing router.
pub fn router(ctx: EngineContext) -> Router {
    Router::new()
        .route("/billing/recurring/generate", post(generate_recurring))
        .route(
            "/billing/completion-metrics",
            post(completion_metrics).put(completion_metrics),
        )
        .with_state(ctx)
}

/// Request body for `POST /billing/recurring/generate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBillingRequest {
    /// First calendar day of the month, `YYYY-MM-01`.
    pub billing_month: NaiveDate,
    #[serde(default)]
    pub client_ids: Option<Vec<String>>,
    #[serde(default)]
    pub service_code: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

async fn generate_recurring(
    State(ctx): State<EngineContext>,
    Json(body): Json<GenerateBillingRequest>,
) -> Response {
    let request = GenerateRequest {
        billing_month: body.billing_month,
        client_ids: body.client_ids,
        service_code: body.service_code,
        dry_run: body.dry_run,
    };

    match ctx.generator.generate(&request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            // The caller always gets the full result shape back, zeroed,
            // with a single top-level error. On a 5xx the completion state
            // is unknown; re-invoking is safe under the idempotency
            // guarantee.
            let status = err.status_code();
            let body = GenerationResult {
                success: false,
                billing_month: request.billing_month,
                items_created: 0,
                total_amount: Decimal::ZERO,
                clients_processed: 0,
                errors: vec![err.to_string()],
                warnings: Vec::new(),
                items: Vec::new(),
            };
            (status, Json(body)).into_response()
        }
    }
}

/// Request body for the completion-metrics resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionMetricsRequest {
    pub payroll_date_id: Uuid,
    pub completed_by: String,
    pub metrics: PayrollRunMetrics,
    #[serde(default)]
    pub generate_billing: bool,
}

/// Response body for the completion-metrics resource.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionMetricsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_id: Option<Uuid>,
    pub billing_generated: bool,
    pub items_created: usize,
    pub total_amount: Decimal,
    pub message: String,
}

async fn completion_metrics(
    State(ctx): State<EngineContext>,
    Json(body): Json<CompletionMetricsRequest>,
) -> Response {
    let metrics_id = Uuid::new_v4();

    if !body.generate_billing {
        let response = CompletionMetricsResponse {
            success: true,
            metrics_id: Some(metrics_id),
            billing_generated: false,
            items_created: 0,
            total_amount: Decimal::ZERO,
            message: "Completion metrics recorded".to_string(),
        };
        return (StatusCode::OK, Json(response)).into_response();
    }

    match ctx
        .completion
        .generate_from_completion(body.payroll_date_id, &body.metrics, &body.completed_by)
        .await
    {
        Ok(result) => {
            let message = if result.generated {
                format!(
                    "Completion metrics recorded; {} billing items generated",
                    result.items_created
                )
            } else {
                "Completion metrics recorded; no billable activity".to_string()
            };
            let response = CompletionMetricsResponse {
                success: result.success,
                metrics_id: Some(metrics_id),
                billing_generated: result.generated,
                items_created: result.items_created,
                total_amount: result.total_amount,
                message,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            let status = err.status_code();
            let response = CompletionMetricsResponse {
                success: false,
                metrics_id: None,
                billing_generated: false,
                items_created: 0,
                total_amount: Decimal::ZERO,
                message: err.to_string(),
            };
            (status, Json(response)).into_response()
        }
    }
}
