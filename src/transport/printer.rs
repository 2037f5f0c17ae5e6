//! Retrying, serialized sends to one printer.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Instant, sleep, timeout, timeout_at};
use tracing::{debug, info, instrument, warn};

use super::{Connection, Connector, TcpConnector, TransportConfig};
use crate::error::{TagpressError, TagpressResult};
use crate::protocol::status::FrameParser;

/// Bytes a printer sent back, plus how many tries it took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawResponse {
    pub bytes: Vec<u8>,
    pub attempts: u32,
}

impl RawResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

type Slot = Option<Box<dyn Connection>>;

/// Locks guarding one physical printer.
#[derive(Default)]
struct PrinterGate {
    slot: Mutex<Slot>,
    job: Mutex<()>,
}

/// Connection manager for a single printer.
///
/// At most one send is in flight at a time; concurrent callers queue on the
/// connection slot. Every attempt's socket is closed before the next attempt
/// starts and before `send` returns, success or not.
pub struct PrinterTransport {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    gate: Arc<PrinterGate>,
}

impl PrinterTransport {
    /// Transport over raw TCP.
    pub fn new(config: TransportConfig) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    pub fn with_connector(config: TransportConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            gate: Arc::new(PrinterGate::default()),
        }
    }

    /// Same printer, different timeout or retry policy. The two transports
    /// share their locks, so sends through either still queue together.
    pub fn reconfigured(&self, config: TransportConfig) -> Self {
        Self {
            config,
            connector: Arc::clone(&self.connector),
            gate: Arc::clone(&self.gate),
        }
    }

    /// Whether both transports guard the same printer.
    pub fn shares_printer_with(&self, other: &PrinterTransport) -> bool {
        Arc::ptr_eq(&self.gate, &other.gate)
    }

    /// Whether another transport currently holds this printer's locks.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.gate) > 1
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Send `payload` and, if `reply_frames > 0`, wait for that many
    /// STX/ETX frames.
    ///
    /// Connection and timeout failures are retried up to `retries` total
    /// attempts with doubling backoff. Protocol errors are returned at once.
    #[instrument(skip(self, payload), fields(printer = %self.config.address(), bytes = payload.len()))]
    pub async fn send(&self, payload: &[u8], reply_frames: usize) -> TagpressResult<RawResponse> {
        let mut slot = self.gate.slot.lock().await;
        // A cancelled caller can leave a socket behind.
        close_slot(&mut slot).await;

        let max_attempts = self.config.retries.max(1);
        let mut attempt = 1;
        loop {
            let result = self.attempt(&mut slot, payload, reply_frames).await;
            close_slot(&mut slot).await;

            match result {
                Ok(bytes) => {
                    debug!(attempt, reply_len = bytes.len(), "send complete");
                    return Ok(RawResponse {
                        bytes,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.backoff_for(attempt);
                    warn!(attempt, max_attempts, error = %e, ?delay, "send failed, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(attempts = attempt, error = %e, "printer unreachable, giving up");
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(
        &self,
        slot: &mut Slot,
        payload: &[u8],
        reply_frames: usize,
    ) -> TagpressResult<Vec<u8>> {
        let addr = self.config.address();
        let wait = self.config.timeout;

        let conn = timeout(wait, self.connector.connect(&self.config.host, self.config.port))
            .await
            .map_err(|_| TagpressError::Timeout(format!("connect to {} after {:?}", addr, wait)))?
            .map_err(|e| TagpressError::Connection(format!("{}: {}", addr, e)))?;
        let conn = slot.insert(conn);

        timeout(wait, conn.write_all(payload))
            .await
            .map_err(|_| TagpressError::Timeout(format!("write to {} after {:?}", addr, wait)))?
            .map_err(|e| TagpressError::Connection(format!("write to {} failed: {}", addr, e)))?;

        if reply_frames == 0 {
            return Ok(Vec::new());
        }

        let deadline = Instant::now() + wait;
        let mut parser = FrameParser::new(reply_frames);
        let mut raw = Vec::new();
        loop {
            let chunk = timeout_at(deadline, conn.read_chunk())
                .await
                .map_err(|_| {
                    TagpressError::Timeout(format!("no reply from {} after {:?}", addr, wait))
                })?
                .map_err(|e| TagpressError::Connection(format!("read from {} failed: {}", addr, e)))?;

            if chunk.is_empty() {
                return Err(TagpressError::Connection(format!(
                    "{} closed the connection before replying",
                    addr
                )));
            }
            raw.extend_from_slice(&chunk);
            if parser.feed(&chunk)? {
                return Ok(raw);
            }
        }
    }

    /// Reserve the printer for a multi-format job.
    ///
    /// Sends still queue one at a time on their own; holding this guard
    /// also keeps another job's formats from landing between ours. Control
    /// commands do not take it, so status polls still get through.
    pub async fn reserve(&self) -> MutexGuard<'_, ()> {
        self.gate.job.lock().await
    }

    /// Close any connection still held. Waits for an in-flight send to
    /// finish first. Safe to call any number of times.
    pub async fn close_all_connections(&self) {
        let mut slot = self.gate.slot.lock().await;
        if slot.is_some() {
            info!(printer = %self.config.address(), "closing leftover printer connection");
        }
        close_slot(&mut slot).await;
    }
}

async fn close_slot(slot: &mut Slot) {
    if let Some(mut conn) = slot.take() {
        if let Err(e) = conn.close().await {
            debug!(error = %e, "error while closing printer connection");
        }
    }
}
