//! Label printing and preview handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::super::state::{AppState, PrinterOverrides};
use super::ApiResult;
use crate::batch::{BatchOptions, BatchPrintResult, PrintOrchestrator};
use crate::epc::{self, DecodedEpc};
use crate::error::TagpressError;
use crate::label::{LabelRequest, LabelType};
use crate::printer::LabelSize;

/// Body of `POST /print`.
#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    #[serde(default)]
    pub items: Vec<LabelRequest>,
    #[serde(default)]
    pub options: BatchOptions,
    #[serde(default)]
    pub config: PrinterOverrides,
}

/// Handle POST /print - print a batch, one item at a time.
pub async fn print(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PrintRequest>,
) -> ApiResult<Json<BatchPrintResult>> {
    if request.items.is_empty() {
        return Err(TagpressError::InvalidRequest("items must not be empty".into()).into());
    }
    let transport = state.transport_for(&request.config).await?;
    let orchestrator =
        PrintOrchestrator::from_settings(&state.settings, Arc::clone(&state.builder), transport);

    let result = orchestrator.print_batch(&request.items, &request.options).await?;
    Ok(Json(result))
}

/// Query of `GET /print`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    pub number: String,
    #[serde(default)]
    pub name: String,
    pub secondary: Option<String>,
    #[serde(rename = "type")]
    pub label_type: Option<String>,
    pub barcode: Option<String>,
    pub quantity: Option<u32>,
    #[serde(default, rename = "enableRFID", alias = "enableRfid")]
    pub enable_rfid: bool,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub zpl: String,
    pub epcs: Vec<String>,
    pub decoded: Vec<DecodedEpc>,
}

/// Handle GET /print - render ZPL for one label without sending it.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<PreviewResponse>> {
    let label_type = match query.label_type.as_deref() {
        Some(t) if !t.trim().is_empty() => t.parse::<LabelType>()?,
        _ => LabelType::default(),
    };

    let mut request = LabelRequest::new(&query.number, &query.name)
        .label_type(label_type)
        .quantity(query.quantity.unwrap_or(1))
        .rfid(query.enable_rfid);
    request.secondary_name = query.secondary;
    request.barcode = query.barcode;

    let size = match (query.width, query.height) {
        (Some(w), Some(h)) => LabelSize::new(w, h)?,
        (None, None) => state.settings.label_size,
        _ => {
            return Err(TagpressError::InvalidRequest(
                "width and height must be given together".into(),
            )
            .into());
        }
    };

    let job = state.builder.build(&request, &size, Some(&state.settings.epc))?;
    let epcs = job.epcs();
    let decoded = epcs
        .iter()
        .map(|hex| epc::decode(hex))
        .collect::<Result<Vec<_>, _>>()
        .map_err(TagpressError::from)?;

    Ok(Json(PreviewResponse {
        zpl: job.to_zpl(),
        epcs,
        decoded,
    }))
}
