//! # Printer Service
//!
//! Named control operations over a [`PrinterTransport`].
//!
//! Status checks ([`PrinterService::test_connection`],
//! [`PrinterService::get_status`]) never return `Err`: an offline printer is
//! an expected answer for a health check, so it comes back as an outcome
//! with `success: false`. Every other operation returns typed errors.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{TagpressError, TagpressResult};
use crate::protocol::{HostStatus, PrinterCommand};
use crate::transport::PrinterTransport;

/// Result of one control command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub success: bool,
    pub command: PrinterCommand,
    /// Raw printer reply, if the command has one
    pub response: Option<String>,
    pub status: Option<HostStatus>,
    /// Connection attempts used
    pub attempts: u32,
    pub error: Option<String>,
    /// True when the failure was connectivity rather than a bad reply
    pub unreachable: bool,
}

impl CommandOutcome {
    fn failed(command: PrinterCommand, printer: &str, error: &TagpressError) -> Self {
        let unreachable = error.is_connectivity();
        let message = if unreachable {
            format!("Printer unreachable at {}. Check power and network. ({})", printer, error)
        } else {
            error.to_string()
        };
        Self {
            success: false,
            command,
            response: None,
            status: None,
            attempts: 0,
            error: Some(message),
            unreachable,
        }
    }
}

/// Control operations for one printer.
#[derive(Clone)]
pub struct PrinterService {
    transport: Arc<PrinterTransport>,
}

impl PrinterService {
    pub fn new(transport: Arc<PrinterTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<PrinterTransport> {
        &self.transport
    }

    /// Send `command` and interpret its reply.
    #[instrument(skip(self), fields(printer = %self.transport.config().address()))]
    pub async fn execute(&self, command: PrinterCommand) -> TagpressResult<CommandOutcome> {
        let result = self
            .transport
            .send(command.wire().as_bytes(), command.reply_frames())
            .await;
        self.transport.close_all_connections().await;
        let raw = result?;

        let status = if command.reply_frames() > 0 {
            Some(HostStatus::parse(&raw.bytes)?)
        } else {
            None
        };
        info!(%command, attempts = raw.attempts, "printer command sent");

        Ok(CommandOutcome {
            success: true,
            command,
            response: (!raw.bytes.is_empty()).then(|| raw.text()),
            status,
            attempts: raw.attempts,
            error: None,
            unreachable: false,
        })
    }

    /// Like [`execute`](Self::execute), but failures become an outcome.
    pub async fn execute_reported(&self, command: PrinterCommand) -> CommandOutcome {
        match self.execute(command).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let printer = self.transport.config().address();
                warn!(%command, %printer, error = %e, "printer command failed");
                CommandOutcome::failed(command, &printer, &e)
            }
        }
    }

    /// Probe reachability with a host status request.
    pub async fn test_connection(&self) -> CommandOutcome {
        self.execute_reported(PrinterCommand::TestConnection).await
    }

    pub async fn get_status(&self) -> CommandOutcome {
        self.execute_reported(PrinterCommand::Status).await
    }

    /// Measure media length (`~JC`).
    pub async fn calibrate(&self) -> TagpressResult<CommandOutcome> {
        self.execute(PrinterCommand::Calibrate).await
    }

    pub async fn reset(&self) -> TagpressResult<CommandOutcome> {
        self.execute(PrinterCommand::Reset).await
    }

    /// Restore factory defaults, then reset.
    pub async fn full_reset(&self) -> TagpressResult<CommandOutcome> {
        self.execute(PrinterCommand::FullReset).await
    }

    /// Drop every format waiting in the printer's buffer.
    pub async fn cancel_all(&self) -> TagpressResult<CommandOutcome> {
        self.execute(PrinterCommand::CancelAll).await
    }

    pub async fn feed_label(&self) -> TagpressResult<CommandOutcome> {
        self.execute(PrinterCommand::Feed).await
    }

    pub async fn pause(&self) -> TagpressResult<CommandOutcome> {
        self.execute(PrinterCommand::Pause).await
    }

    pub async fn resume(&self) -> TagpressResult<CommandOutcome> {
        self.execute(PrinterCommand::Resume).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ScriptStep, ScriptedConnector, TransportConfig};
    use std::time::Duration;

    const READY: &[u8] = b"\x02030,0,0,1245,000,0,0,0,000,0,0,0\x03\r\n\x02001,0,0,0,1,2,6,0,00000000,1,000\x03\r\n\x021234,0\x03\r\n";
    const PAUSED_HEAD_OPEN: &[u8] = b"\x02030,0,1,1245,000,0,0,0,000,0,0,0\x03\r\n\x02001,0,1,0,1,2,6,0,00000000,1,000\x03\r\n\x021234,0\x03\r\n";

    fn service(connector: &ScriptedConnector) -> PrinterService {
        let mut config = TransportConfig::new("zebra.local", 9100);
        config.backoff = Duration::from_millis(10);
        config.timeout = Duration::from_millis(200);
        PrinterService::new(Arc::new(PrinterTransport::with_connector(
            config,
            Arc::new(connector.clone()),
        )))
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_offline_is_not_an_error() {
        let connector = ScriptedConnector::offline();
        let outcome = service(&connector).test_connection().await;

        assert!(!outcome.success);
        assert!(outcome.unreachable);
        assert!(outcome.error.unwrap().contains("zebra.local:9100"));
        assert_eq!(connector.connect_attempts(), 3);
    }

    #[tokio::test]
    async fn test_get_status_parses_reply() {
        let connector = ScriptedConnector::new([ScriptStep::reply(PAUSED_HEAD_OPEN)]);
        let outcome = service(&connector).get_status().await;

        assert!(outcome.success, "{:?}", outcome.error);
        let status = outcome.status.unwrap();
        assert!(status.paused);
        assert!(status.head_open);
        assert!(!status.is_ready());
        assert_eq!(connector.writes(), vec![b"~HS\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_status_with_garbage_reply_is_protocol_failure() {
        let connector = ScriptedConnector::new([ScriptStep::reply(b"\x02nope\x03\x02x\x03\x02y\x03")]);
        let outcome = service(&connector).get_status().await;

        assert!(!outcome.success);
        assert!(!outcome.unreachable);
        assert_eq!(connector.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_control_commands_write_expected_bytes() {
        let connector = ScriptedConnector::online();
        let service = service(&connector);

        service.calibrate().await.unwrap();
        service.full_reset().await.unwrap();
        service.cancel_all().await.unwrap();
        service.feed_label().await.unwrap();
        service.pause().await.unwrap();
        service.resume().await.unwrap();
        service.reset().await.unwrap();

        let writes: Vec<String> = connector
            .writes()
            .into_iter()
            .map(|w| String::from_utf8(w).unwrap())
            .collect();
        assert_eq!(
            writes,
            [
                "~JC\r\n",
                "^XA^JUF^XZ\r\n~JR\r\n",
                "~JA\r\n",
                "^XA^PH^XZ\r\n",
                "~PP\r\n",
                "~PS\r\n",
                "~JR\r\n"
            ]
        );
        assert_eq!(connector.opened(), connector.closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_command_offline_is_typed_error() {
        let connector = ScriptedConnector::offline();
        let err = service(&connector).pause().await.unwrap_err();
        assert!(matches!(err, TagpressError::Connection(_)));
    }

    #[tokio::test]
    async fn test_ready_status_attaches_raw_response() {
        let connector = ScriptedConnector::new([ScriptStep::reply(READY)]);
        let outcome = service(&connector).test_connection().await;
        assert!(outcome.success);
        assert!(outcome.status.unwrap().is_ready());
        assert!(outcome.response.unwrap().contains("1245"));
    }
}
