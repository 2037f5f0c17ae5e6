//! Printer status and control handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::super::state::{AppState, PrinterOverrides};
use super::ApiResult;
use crate::protocol::PrinterCommand;
use crate::service::PrinterService;

/// Body of `POST /printer`.
#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub action: String,
    #[serde(default)]
    pub config: PrinterOverrides,
}

/// Handle GET /printer - reachability and host status probe.
///
/// Always 200; an offline printer is reported in the body.
pub async fn status(
    State(state): State<Arc<AppState>>,
    Query(overrides): Query<PrinterOverrides>,
) -> ApiResult<Response> {
    let transport = state.transport_for(&overrides).await?;
    let outcome = PrinterService::new(transport).get_status().await;
    Ok(Json(outcome).into_response())
}

/// Handle POST /printer - run one control action.
pub async fn control(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ControlRequest>,
) -> ApiResult<Response> {
    let command: PrinterCommand = request.action.parse()?;
    let transport = state.transport_for(&request.config).await?;
    let outcome = PrinterService::new(transport).execute_reported(command).await;

    let code = match command {
        PrinterCommand::TestConnection | PrinterCommand::Status => StatusCode::OK,
        _ if outcome.success => StatusCode::OK,
        _ if outcome.unreachable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    Ok((code, Json(outcome)).into_response())
}
