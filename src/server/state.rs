//! Server state and configuration.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{TagpressError, TagpressResult};
use crate::label::LabelBuilder;
use crate::printer::PrinterSettings;
use crate::transport::{Connector, PrinterTransport, TcpConnector, TransportConfig};

/// Registry size at which idle printers are dropped
pub const MAX_PRINTERS: usize = 32;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Defaults for every request
    pub settings: PrinterSettings,
}

/// Per-request printer config, merged onto the server defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrinterOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Milliseconds
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
}

impl PrinterOverrides {
    pub fn apply(&self, settings: &PrinterSettings) -> TagpressResult<TransportConfig> {
        let mut config = settings.transport_config();
        if let Some(host) = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            config.host = host.to_string();
        }
        if let Some(port) = self.port {
            if port == 0 {
                return Err(TagpressError::InvalidRequest("port must be non-zero".into()));
            }
            config.port = port;
        }
        if let Some(ms) = self.timeout {
            if ms == 0 {
                return Err(TagpressError::InvalidRequest("timeout must be positive".into()));
            }
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = self.retries {
            if retries == 0 {
                return Err(TagpressError::InvalidRequest("retries must be at least 1".into()));
            }
            config.retries = retries;
        }
        Ok(config)
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub settings: PrinterSettings,
    pub builder: Arc<LabelBuilder>,
    connector: Arc<dyn Connector>,
    /// One transport per physical printer
    printers: Mutex<HashMap<(String, u16), Arc<PrinterTransport>>>,
}

impl AppState {
    /// State talking to real printers over TCP.
    pub fn new(settings: PrinterSettings) -> TagpressResult<Self> {
        let builder = LabelBuilder::from_settings(&settings)?;
        Ok(Self::with_connector(settings, builder, Arc::new(TcpConnector)))
    }

    pub fn with_connector(
        settings: PrinterSettings,
        builder: LabelBuilder,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            settings,
            builder: Arc::new(builder),
            connector,
            printers: Mutex::new(HashMap::new()),
        }
    }

    /// Transport for the printer the overrides point at.
    ///
    /// Requests for the same host and port always contend for the same
    /// lock, even when their timeout or retry settings differ.
    pub async fn transport_for(
        &self,
        overrides: &PrinterOverrides,
    ) -> TagpressResult<Arc<PrinterTransport>> {
        let config = overrides.apply(&self.settings)?;
        let key = (config.host.clone(), config.port);

        let mut printers = self.printers.lock().await;
        if !printers.contains_key(&key) && printers.len() >= MAX_PRINTERS {
            // Only entries nobody holds; an in-use printer must keep its locks
            let before = printers.len();
            printers.retain(|_, t| Arc::strong_count(t) > 1 || t.is_shared());
            debug!(evicted = before - printers.len(), "dropped idle printers");
        }
        let transport = match printers.get(&key) {
            Some(existing) if existing.config() == &config => return Ok(Arc::clone(existing)),
            Some(existing) => Arc::new(existing.reconfigured(config)),
            None => Arc::new(PrinterTransport::with_connector(
                config,
                Arc::clone(&self.connector),
            )),
        };
        printers.insert(key, Arc::clone(&transport));
        Ok(transport)
    }

    /// Printers currently in the registry.
    pub async fn printer_count(&self) -> usize {
        self.printers.lock().await.len()
    }
}
