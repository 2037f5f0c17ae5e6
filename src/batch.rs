//! # Print Orchestrator
//!
//! Prints a batch of [`LabelRequest`]s one after another on a single
//! printer.
//!
//! ## Failure Isolation
//!
//! A build or transport error on one item is recorded in that item's
//! [`ItemResult`] and the batch moves on. `print_batch` itself only fails
//! for caller misuse, such as an empty item list.
//!
//! ## Pacing
//!
//! Printer firmware needs a quiet moment between jobs, so every send after
//! the first waits `delay_ms`. With RFID on, each copy is its own format
//! and its own send, so the delay applies between copies too.
//!
//! ## Cancellation
//!
//! A [`CancelToken`] is checked before each item. Items not started when it
//! fires are reported as failed with `"cancelled"`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::epc::EpcConfig;
use crate::error::{TagpressError, TagpressResult};
use crate::label::{LabelBuilder, LabelJob, LabelRequest, LabelType};
use crate::printer::{LabelSize, PrinterSettings};
use crate::transport::PrinterTransport;

/// Shared flag for stopping a batch between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-batch overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    /// Pause between sends; the orchestrator default when absent
    #[serde(alias = "delay")]
    pub delay_ms: Option<u64>,
    /// Turn RFID on for every item
    #[serde(rename = "enableRFID", alias = "enableRfid")]
    pub enable_rfid: bool,
    pub label_size: Option<LabelSize>,
    #[serde(skip)]
    pub cancel: Option<CancelToken>,
}

impl BatchOptions {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(delay.as_millis() as u64);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// What happened to one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub item_number: String,
    pub label_type: LabelType,
    pub success: bool,
    /// Physical labels the printer accepted
    pub labels_printed: u32,
    /// EPCs sent for programming, in copy order
    pub epcs: Vec<String>,
    pub error: Option<String>,
}

impl ItemResult {
    fn pending(request: &LabelRequest) -> Self {
        Self {
            item_number: request.number.clone(),
            label_type: request.label_type,
            success: false,
            labels_printed: 0,
            epcs: Vec::new(),
            error: None,
        }
    }

    fn fail(mut self, error: &TagpressError) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPrintResult {
    pub job_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: BatchSummary,
    pub items: Vec<ItemResult>,
    pub cancelled: bool,
}

impl BatchPrintResult {
    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }
}

/// Builds and sends labels for one printer.
pub struct PrintOrchestrator {
    builder: Arc<LabelBuilder>,
    transport: Arc<PrinterTransport>,
    epc: EpcConfig,
    label_size: LabelSize,
    delay: Duration,
}

impl PrintOrchestrator {
    pub fn new(builder: Arc<LabelBuilder>, transport: Arc<PrinterTransport>) -> Self {
        let defaults = PrinterSettings::default();
        Self {
            builder,
            transport,
            epc: defaults.epc.clone(),
            label_size: defaults.label_size,
            delay: defaults.batch_delay(),
        }
    }

    /// Orchestrator using the EPC config, label size and delay from
    /// `settings`.
    pub fn from_settings(
        settings: &PrinterSettings,
        builder: Arc<LabelBuilder>,
        transport: Arc<PrinterTransport>,
    ) -> Self {
        Self::new(builder, transport)
            .with_epc(settings.epc.clone())
            .with_label_size(settings.label_size)
            .with_delay(settings.batch_delay())
    }

    pub fn with_epc(mut self, epc: EpcConfig) -> Self {
        self.epc = epc;
        self
    }

    pub fn with_label_size(mut self, size: LabelSize) -> Self {
        self.label_size = size;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Build every item, then send them in order.
    ///
    /// Returns `Err` only for an empty batch or invalid options.
    #[instrument(skip_all, fields(items = items.len(), printer = %self.transport.config().address()))]
    pub async fn print_batch(
        &self,
        items: &[LabelRequest],
        options: &BatchOptions,
    ) -> TagpressResult<BatchPrintResult> {
        if items.is_empty() {
            return Err(TagpressError::InvalidRequest("batch contains no items".into()));
        }
        let size = options.label_size.unwrap_or(self.label_size);
        size.validate()?;
        let delay = options.delay_ms.map(Duration::from_millis).unwrap_or(self.delay);

        let job_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%job_id, "batch started");

        let _reservation = self.transport.reserve().await;
        let mut sent_any = false;
        let mut results = Vec::with_capacity(items.len());
        let mut cancelled = false;

        for item in items {
            if options.is_cancelled() {
                if !cancelled {
                    warn!(%job_id, remaining = items.len() - results.len(), "batch cancelled");
                }
                cancelled = true;
                let mut result = ItemResult::pending(item);
                result.error = Some("cancelled".to_string());
                results.push(result);
                continue;
            }

            let request = if options.enable_rfid {
                item.clone().rfid(true)
            } else {
                item.clone()
            };
            let mut result = ItemResult::pending(&request);

            let outcome = match self.builder.build(&request, &size, Some(&self.epc)) {
                Ok(job) => self.send_job(&job, delay, &mut sent_any, &mut result).await,
                Err(e) => Err(e),
            };
            result = match outcome {
                Ok(()) => {
                    result.success = true;
                    result
                }
                Err(e) => {
                    warn!(%job_id, item = %request.number, error = %e, "item failed");
                    result.fail(&e)
                }
            };
            results.push(result);
        }

        self.transport.close_all_connections().await;

        let succeeded = results.iter().filter(|r| r.success).count();
        let summary = BatchSummary {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        };
        info!(%job_id, succeeded, failed = summary.failed, "batch finished");

        Ok(BatchPrintResult {
            job_id,
            started_at,
            finished_at: Utc::now(),
            summary,
            items: results,
            cancelled,
        })
    }

    /// Print one request, returning the first error instead of recording it.
    pub async fn print_one(
        &self,
        request: &LabelRequest,
        label_size: Option<LabelSize>,
    ) -> TagpressResult<ItemResult> {
        let size = label_size.unwrap_or(self.label_size);
        let job = self.builder.build(request, &size, Some(&self.epc))?;

        let _reservation = self.transport.reserve().await;
        let mut result = ItemResult::pending(request);
        let mut sent_any = false;
        let outcome = self.send_job(&job, self.delay, &mut sent_any, &mut result).await;
        self.transport.close_all_connections().await;
        outcome?;

        result.success = true;
        Ok(result)
    }

    async fn send_job(
        &self,
        job: &LabelJob,
        delay: Duration,
        sent_any: &mut bool,
        result: &mut ItemResult,
    ) -> TagpressResult<()> {
        for document in &job.documents {
            if *sent_any && !delay.is_zero() {
                sleep(delay).await;
            }
            *sent_any = true;
            self.transport.send(document.zpl.as_bytes(), 0).await?;
            result.labels_printed += document.copies;
            if let Some(epc) = &document.epc {
                result.epcs.push(epc.clone());
            }
        }
        Ok(())
    }
}
