//! Batch printing against a scripted printer.

use std::sync::Arc;
use std::time::Duration;

use tagpress::batch::{BatchOptions, BatchSummary, CancelToken, PrintOrchestrator};
use tagpress::epc::{self, EpcConfig, EpcScheme};
use tagpress::label::{LabelBuilder, LabelRequest, LabelType};
use tagpress::printer::PrinterConfig;
use tagpress::transport::{PrinterTransport, ScriptStep, ScriptedConnector, TransportConfig};

fn transport(connector: &ScriptedConnector) -> Arc<PrinterTransport> {
    let mut config = TransportConfig::new("zebra.local", 9100);
    config.retries = 3;
    config.backoff = Duration::from_millis(100);
    config.timeout = Duration::from_millis(500);
    Arc::new(PrinterTransport::with_connector(config, Arc::new(connector.clone())))
}

fn orchestrator(connector: &ScriptedConnector) -> PrintOrchestrator {
    // No typeface: any non-Latin name fails to build
    PrintOrchestrator::new(
        Arc::new(LabelBuilder::new(PrinterConfig::DPI_300)),
        transport(connector),
    )
    .with_delay(Duration::from_millis(200))
}

fn sent_text(connector: &ScriptedConnector) -> Vec<String> {
    connector
        .writes()
        .into_iter()
        .map(|w| String::from_utf8(w).unwrap())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn build_failure_is_isolated_to_its_item() {
    let connector = ScriptedConnector::online();
    let items = [
        LabelRequest::new("FG-001", "Office Desk"),
        LabelRequest::new("FG-002", "โต๊ะทำงาน").label_type(LabelType::Thai),
        LabelRequest::new("FG-003", "Lamp"),
    ];

    let result = orchestrator(&connector)
        .print_batch(&items, &BatchOptions::default())
        .await
        .unwrap();

    assert_eq!(
        result.summary,
        BatchSummary {
            total: 3,
            succeeded: 2,
            failed: 1
        }
    );
    assert!(result.items[0].success);
    assert!(!result.items[1].success);
    assert!(result.items[1].error.as_deref().unwrap().contains("typeface"));
    assert_eq!(result.items[1].labels_printed, 0);
    assert!(result.items[2].success);

    let sent = sent_text(&connector);
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("^FDFG-001^FS"));
    assert!(sent[1].contains("^FDFG-003^FS"));
}

#[tokio::test(start_paused = true)]
async fn offline_item_does_not_stop_the_batch() {
    // Item 1 prints, item 2 exhausts three attempts, item 3 prints
    let connector = ScriptedConnector::new([
        ScriptStep::accept(),
        ScriptStep::Refuse,
        ScriptStep::Hang,
        ScriptStep::Refuse,
        ScriptStep::accept(),
    ]);
    let items = [
        LabelRequest::new("FG-001", "Desk"),
        LabelRequest::new("FG-002", "Chair"),
        LabelRequest::new("FG-003", "Lamp"),
    ];

    let result = orchestrator(&connector)
        .print_batch(&items, &BatchOptions::default())
        .await
        .unwrap();

    assert_eq!(result.summary.failed, 1);
    assert!(result.items[1].error.as_deref().unwrap().starts_with("Printer unreachable"));
    assert_eq!(connector.connect_attempts(), 5);
    assert_eq!(connector.opened(), connector.closed());
    assert_eq!(connector.leaked(), 0);
}

#[tokio::test(start_paused = true)]
async fn rfid_batch_writes_distinct_epcs_per_copy() {
    let connector = ScriptedConnector::online();
    let config = EpcConfig {
        scheme: EpcScheme::Gid96,
        company_prefix: "951234".into(),
        ..EpcConfig::default()
    };
    let items = [
        LabelRequest::new("FG-001", "Desk").label_type(LabelType::ThaiRfid).quantity(3),
        LabelRequest::new("FG-002", "Chair").quantity(2),
    ];

    let result = orchestrator(&connector)
        .with_epc(config.clone())
        .print_batch(&items, &BatchOptions::default())
        .await
        .unwrap();

    assert!(result.all_succeeded());
    let desk = &result.items[0];
    assert_eq!(desk.labels_printed, 3);
    for (i, hex) in desk.epcs.iter().enumerate() {
        let decoded = epc::decode(hex).unwrap();
        assert_eq!(decoded.scheme, EpcScheme::Gid96);
        assert_eq!(decoded.sequence_index, i as u32 + 1);
        assert_eq!(decoded.total_count, 3);
    }

    // Non-RFID item: one format with ^PQ2
    let chair = &result.items[1];
    assert_eq!(chair.labels_printed, 2);
    assert!(chair.epcs.is_empty());

    let sent = sent_text(&connector);
    assert_eq!(sent.len(), 4);
    assert!(sent[3].contains("^PQ2\n"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_checked_between_items() {
    let connector = ScriptedConnector::online();
    let token = CancelToken::new();
    let items = [
        LabelRequest::new("FG-001", "Desk"),
        LabelRequest::new("FG-002", "Chair"),
        LabelRequest::new("FG-003", "Lamp"),
    ];

    let orchestrator = Arc::new(orchestrator(&connector));
    let options = BatchOptions::default()
        .with_delay(Duration::from_secs(10))
        .with_cancel(token.clone());

    let handle = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.print_batch(&items, &options).await }
    });

    // First label goes out at once; cancel while item 2 waits out its delay
    tokio::time::sleep(Duration::from_secs(5)).await;
    token.cancel();

    let result = handle.await.unwrap().unwrap();
    assert!(result.cancelled);
    assert!(result.items[0].success);
    assert!(result.items[1].success);
    assert_eq!(result.items[2].error.as_deref(), Some("cancelled"));
    assert_eq!(connector.writes().len(), 2);
}

#[tokio::test]
async fn print_one_sends_every_copy() {
    let connector = ScriptedConnector::online();
    let request = LabelRequest::new("FG-010", "Shelf").quantity(2).rfid(true);

    let result = orchestrator(&connector)
        .with_delay(Duration::ZERO)
        .print_one(&request, None)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.epcs.len(), 2);
    assert_ne!(result.epcs[0], result.epcs[1]);
    assert_eq!(connector.writes().len(), 2);
}
