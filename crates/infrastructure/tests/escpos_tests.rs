use domain::printer::{Alignment, PrinterCommand};
use infrastructure::printer::EscPosEncoder;

#[test] // initialize_selects_wpc1252
fn initialize_selects_wpc1252() {
    let bytes = EscPosEncoder::encode(&[PrinterCommand::Initialize]);
    assert_eq!(bytes, vec![0x1B, 0x40, 0x1B, 0x74, 16]);
}

#[test] // encodes_full_receipt_stream
fn encodes_full_receipt_stream() {
    let commands = vec![
        PrinterCommand::Align(Alignment::Center),
        PrinterCommand::text("CAFE"),
        PrinterCommand::Align(Alignment::Left),
        PrinterCommand::Bold(true),
        PrinterCommand::text("TOTAL 2.00"),
        PrinterCommand::Bold(false),
        PrinterCommand::Feed(3),
        PrinterCommand::Cut,
    ];

    let mut expected = vec![0x1B, 0x61, 0x01];
    expected.extend_from_slice(b"CAFE\n");
    expected.extend_from_slice(&[0x1B, 0x61, 0x00]);
    expected.extend_from_slice(&[0x1B, 0x45, 0x01]);
    expected.extend_from_slice(b"TOTAL 2.00\n");
    expected.extend_from_slice(&[0x1B, 0x45, 0x00]);
    expected.extend_from_slice(&[0x1B, 0x64, 3]);
    expected.extend_from_slice(&[0x1D, 0x56, 66, 0]);

    assert_eq!(EscPosEncoder::encode(&commands), expected);
}

#[test] // right_alignment_uses_two
fn right_alignment_uses_two() {
    let bytes = EscPosEncoder::new().align(Alignment::Right).build();
    assert_eq!(bytes, vec![0x1B, 0x61, 0x02]);
}

#[test] // text_outside_code_page_is_replaced
fn text_outside_code_page_is_replaced() {
    let bytes = EscPosEncoder::encode(&[PrinterCommand::text("Crème brûlée → 1")]);
    let mut expected = b"Cr".to_vec();
    expected.push(0xE8);
    expected.extend_from_slice(b"me br");
    expected.push(0xFB);
    expected.extend_from_slice(b"l");
    expected.push(0xE9);
    expected.extend_from_slice(b"e ? 1\n");
    assert_eq!(bytes, expected);
}
