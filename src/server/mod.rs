//! # HTTP Server for Label Printing
//!
//! JSON API over the printer service and print orchestrator.
//!
//! ## Usage
//!
//! ```bash
//! tagpress serve --listen 0.0.0.0:8080 --host 192.168.1.50
//! ```
//!
//! ## Routes
//!
//! | Method | Path | Does |
//! |--------|------|------|
//! | GET | `/printer?host=&port=` | host status probe, never an error for offline |
//! | POST | `/printer` | `{action, config}` control command |
//! | POST | `/print` | `{items, options, config}` batch print |
//! | GET | `/print?number=&name=&type=&enableRFID=` | ZPL preview, no network I/O |

mod handlers;
mod state;

pub use handlers::ApiError;
pub use state::{AppState, PrinterOverrides, ServerConfig};

use axum::{
    Router,
    routing::get,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{TagpressError, TagpressResult};

/// Routes wired to `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/printer",
            get(handlers::printer::status).post(handlers::printer::control),
        )
        .route(
            "/print",
            get(handlers::print::preview).post(handlers::print::print),
        )
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use tagpress::printer::PrinterSettings;
/// use tagpress::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), tagpress::error::TagpressError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     settings: PrinterSettings::from_env()?,
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> TagpressResult<()> {
    let state = Arc::new(AppState::new(config.settings.clone())?);
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            TagpressError::InvalidConfig(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;

    info!(
        listen = %config.listen_addr,
        printer = %state.settings.transport_config().address(),
        "tagpress HTTP server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
