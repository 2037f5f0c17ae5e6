//! # Golden Tests
//!
//! Full ZPL output for reference labels on 100 × 30 mm stock at 300 DPI.
//! Any change to layout, field order or escaping shows up here as a diff.

use pretty_assertions::assert_eq;
use tagpress::epc::{self, EpcConfig};
use tagpress::label::{LabelBuilder, LabelRequest, LabelType};
use tagpress::printer::{LabelSize, PrinterConfig};
use tagpress::render::raster::Typeface;

fn builder() -> LabelBuilder {
    LabelBuilder::new(PrinterConfig::DPI_300)
}

fn reference_size() -> LabelSize {
    LabelSize::new(100.0, 30.0).unwrap()
}

#[test]
fn golden_barcode_label() {
    let request = LabelRequest::new("FG-001", "Office Desk").secondary_name("Oak");
    let job = builder().build(&request, &reference_size(), None).unwrap();

    let expected = "\
^XA
^CI28
^PW1181
^LL354
^LH0,0
^FO39,22^A0N,44,44^FDFG-001^FS
^FO39,73^A0N,59,59^FDOffice Desk^FS
^FO39,139^A0N,39,39^FDOak^FS
^BY2,3,88
^FO39,185^BCN,88,Y,N,N,A^FDFG-001^FS
^PQ1
^XZ
";
    assert_eq!(job.to_zpl(), expected);
}

#[test]
fn golden_packing_slip() {
    let request = LabelRequest::new("PO-7781", "Carton")
        .label_type(LabelType::PackingSlip)
        .quantity(24);
    let job = builder().build(&request, &reference_size(), None).unwrap();

    let expected = "\
^XA
^CI28
^PW1181
^LL354
^LH0,0
^FO39,22^A0N,59,59^FDPO-7781^FS
^FO39,88^A0N,59,59^FDCarton^FS
^FO39,154^A0N,44,44^FDQTY: 24^FS
^BY2,3,88
^FO39,205^BCN,88,Y,N,N,A^FDPO-7781^FS
^PQ1
^XZ
";
    assert_eq!(job.to_zpl(), expected);
}

#[test]
fn golden_rfid_copies() {
    let config = EpcConfig::default();
    let request = LabelRequest::new("FG-001", "Desk").quantity(2).rfid(true);
    let job = builder().build(&request, &reference_size(), Some(&config)).unwrap();

    let format = |seq: u32| {
        let epc = epc::encode("FG-001", seq, 2, &config).unwrap();
        format!(
            "\
^XA
^CI28
^PW1181
^LL354
^LH0,0
^FO39,22^A0N,44,44^FDFG-001^FS
^FO39,73^A0N,59,59^FDDesk^FS
^BY2,3,88
^FO39,139^BCN,88,Y,N,N,A^FDFG-001^FS
^RS8
^RFW,H^FD{epc}^FS
^PQ1
^XZ
"
        )
    };
    assert_eq!(job.to_zpl(), format!("{}{}", format(1), format(2)));
}

#[test]
fn golden_escaped_field_data() {
    let request = LabelRequest::new("A_1", "50% ^off~");
    let job = builder().build(&request, &reference_size(), None).unwrap();
    let zpl = job.to_zpl();

    assert!(zpl.contains("^FO39,22^A0N,44,44^FH_^FDA_5F1^FS\n"));
    assert!(zpl.contains("^FO39,73^A0N,59,59^FH_^FD50% _5Eoff_7E^FS\n"));
    assert!(zpl.contains("^BCN,88,Y,N,N,A^FH_^FDA_5F1^FS\n"));
}

#[test]
fn thai_label_rasterizes_display_name() {
    let font = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/thai-test.ttf");
    let builder = builder().with_typeface(Typeface::from_file(font).unwrap());
    let request = LabelRequest::new("FG-001", "โต๊ะทำงาน").label_type(LabelType::Thai);

    let first = builder.build(&request, &reference_size(), None).unwrap().to_zpl();
    let second = builder.build(&request, &reference_size(), None).unwrap().to_zpl();

    assert_eq!(first, second);
    assert!(first.contains("^FO39,22^A0N,44,44^FDFG-001^FS\n"));
    assert!(first.contains("^GFA,"));
    assert!(!first.contains("โต๊ะ"));
    assert!(first.contains("^BCN,88,Y,N,N,A^FDFG-001^FS\n"));
}

#[test]
fn thai_label_with_latin_only_font_is_rejected() {
    let font = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/latin-test.ttf");
    let builder = builder().with_typeface(Typeface::from_file(font).unwrap());
    let request = LabelRequest::new("FG-001", "โต๊ะทำงาน").label_type(LabelType::Thai);

    let err = builder.build(&request, &reference_size(), None).unwrap_err();
    assert!(err.to_string().contains("has no glyphs"));
}
