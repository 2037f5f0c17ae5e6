//! # Tagpress CLI
//!
//! Command-line interface for ZPL/RFID label printing.
//!
//! ## Usage
//!
//! ```bash
//! # Run the HTTP API
//! tagpress serve --listen 0.0.0.0:8080 --host 192.168.1.50
//!
//! # Print two labels for one item
//! tagpress print --number FG-001 --name "Office Desk" --quantity 2
//!
//! # Print RFID labels with Thai names
//! tagpress print --number FG-001 --name "โต๊ะทำงาน" --type thai-rfid --quantity 3
//!
//! # Show the ZPL without printing, and save the rasterized name as PNG
//! tagpress preview --number FG-001 --name "โต๊ะทำงาน" --type thai --png name.png
//!
//! # Printer status and control
//! tagpress status --host 192.168.1.50
//! tagpress control calibrate
//! ```
//!
//! Every printer flag falls back to its `TAGPRESS_*` environment variable,
//! and `.env` is read on startup.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tagpress::{
    LabelBuilder, LabelRequest, LabelType, PrinterSettings, PrinterTransport, TagpressError,
    TagpressResult,
    batch::PrintOrchestrator,
    epc,
    protocol::PrinterCommand,
    server::{self, ServerConfig},
    service::PrinterService,
};

/// Tagpress - ZPL/RFID label printer utility
#[derive(Parser, Debug)]
#[command(name = "tagpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    printer: PrinterArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Printer connection flags shared by every command.
#[derive(Args, Debug)]
struct PrinterArgs {
    /// Printer host name or IP
    #[arg(long, global = true, env = "TAGPRESS_HOST")]
    host: Option<String>,

    /// Printer raw TCP port
    #[arg(long, global = true, env = "TAGPRESS_PORT")]
    port: Option<u16>,

    /// Per-operation timeout in milliseconds
    #[arg(long, global = true, env = "TAGPRESS_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Total attempts per command
    #[arg(long, global = true, env = "TAGPRESS_RETRIES")]
    retries: Option<u32>,

    /// TrueType font for non-Latin text
    #[arg(long, global = true, env = "TAGPRESS_FONT_PATH")]
    font: Option<String>,
}

impl PrinterArgs {
    fn settings(&self) -> TagpressResult<PrinterSettings> {
        let mut settings = PrinterSettings::from_env()?;
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(timeout) = self.timeout_ms {
            settings.timeout_ms = timeout;
        }
        if let Some(retries) = self.retries {
            settings.retries = retries;
        }
        if let Some(font) = &self.font {
            settings.font_path = Some(font.clone());
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// One label request from the command line.
#[derive(Args, Debug)]
struct LabelArgs {
    /// Item number, also the default barcode payload
    #[arg(long)]
    number: String,

    /// Display name
    #[arg(long, default_value = "")]
    name: String,

    /// Secondary display name
    #[arg(long)]
    secondary: Option<String>,

    /// Label type: barcode, thai, thai-rfid, packing-slip
    #[arg(long = "type", default_value = "barcode")]
    label_type: String,

    /// Barcode payload (defaults to the item number)
    #[arg(long)]
    barcode: Option<String>,

    /// Number of labels
    #[arg(long, default_value = "1")]
    quantity: u32,

    /// Program an EPC on each label
    #[arg(long)]
    rfid: bool,
}

impl LabelArgs {
    fn request(&self) -> TagpressResult<LabelRequest> {
        let mut request = LabelRequest::new(&self.number, &self.name)
            .label_type(self.label_type.parse::<LabelType>()?)
            .quantity(self.quantity)
            .rfid(self.rfid);
        request.secondary_name = self.secondary.clone();
        request.barcode = self.barcode.clone();
        Ok(request)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080", env = "TAGPRESS_LISTEN")]
        listen: String,
    },

    /// Build and print one label request
    Print {
        #[command(flatten)]
        label: LabelArgs,
    },

    /// Show the ZPL for a label request without printing
    Preview {
        #[command(flatten)]
        label: LabelArgs,

        /// Save the rasterized display name as PNG
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
    },

    /// Query printer host status
    Status,

    /// Send a control command (test, status, calibrate, reset, fullReset,
    /// cancel, feed, pause, resume)
    Control {
        action: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagpress=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> TagpressResult<()> {
    let cli = Cli::parse();
    let settings = cli.printer.settings()?;

    match cli.command {
        Commands::Serve { listen } => {
            server::serve(ServerConfig {
                listen_addr: listen,
                settings,
            })
            .await
        }

        Commands::Print { label } => {
            let request = label.request()?;
            let builder = Arc::new(LabelBuilder::from_settings(&settings)?);
            let transport = Arc::new(PrinterTransport::new(settings.transport_config()));
            let orchestrator = PrintOrchestrator::from_settings(&settings, builder, transport);

            let result = orchestrator.print_one(&request, None).await?;
            print_json(&result);
            Ok(())
        }

        Commands::Preview { label, png } => {
            let request = label.request()?;
            let builder = LabelBuilder::from_settings(&settings)?;
            let job = builder.build(&request, &settings.label_size, Some(&settings.epc))?;

            print!("{}", job.to_zpl());
            for hex in job.epcs() {
                let decoded = epc::decode(&hex)?;
                eprintln!(
                    "EPC {} = {} {}/{}",
                    hex, decoded.scheme, decoded.sequence_index, decoded.total_count
                );
            }

            if let Some(path) = png {
                let typeface = builder.typeface().ok_or_else(|| {
                    TagpressError::InvalidConfig("PNG preview needs a font (--font)".into())
                })?;
                let layout = tagpress::label::LabelLayout::compute(
                    &settings.label_size,
                    builder.printer(),
                );
                let bitmap = typeface.rasterize(
                    request.display_name.trim(),
                    layout.name_font as f32,
                    layout.content_width(),
                )?;
                bitmap.save_png(&path)?;
                eprintln!(
                    "Saved {}x{} bitmap to {}",
                    bitmap.width,
                    bitmap.height,
                    path.display()
                );
            }
            Ok(())
        }

        Commands::Status => {
            let transport = Arc::new(PrinterTransport::new(settings.transport_config()));
            let outcome = PrinterService::new(transport).get_status().await;
            print_json(&outcome);
            if let Some(status) = &outcome.status {
                for problem in status.problems() {
                    eprintln!("warning: {}", problem);
                }
            }
            if outcome.success {
                Ok(())
            } else {
                Err(TagpressError::Connection(
                    outcome.error.unwrap_or_else(|| "status check failed".into()),
                ))
            }
        }

        Commands::Control { action } => {
            let command: PrinterCommand = action.parse()?;
            let transport = Arc::new(PrinterTransport::new(settings.transport_config()));
            let outcome = PrinterService::new(transport).execute(command).await?;
            print_json(&outcome);
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: cannot render result: {}", e),
    }
}
