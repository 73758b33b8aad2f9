//! Directory mailbox driving a full inbound phase

use std::fs;

use edi_adapter_mailbox::DirectoryMailbox;
use edi_pipeline::{CycleConfig, Integrations, Mailbox, TransferOrchestrator};
use tempfile::TempDir;

const PURCHASE_ORDER: &str = "ISA*00*          *00*          *ZZ*AMAZON         *ZZ*VENDOR123      *240315*1022*U*00400*900000014*0*P*>~
GS*PO*AMAZON*VENDOR123*20240315*1022*900000014*X*004010~
ST*850*0001~
BEG*00*NE*PO12345**20240315~
SE*3*0001~
GE*1*900000014~
IEA*1*900000014~
";

#[test]
fn test_put_then_list_same_directory() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mailbox = DirectoryMailbox::new(dir.path(), dir.path());

    mailbox.put_outbound("loop.txt", b"round trip")?;
    let docs = mailbox.list_inbound()?;

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "loop.txt");
    assert_eq!(docs[0].content, b"round trip");
    Ok(())
}

#[test]
fn test_inbound_phase_over_directories() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let download = dir.path().join("download");
    let upload = dir.path().join("upload");
    fs::create_dir_all(&download)?;
    fs::write(download.join("PO_1.edi"), PURCHASE_ORDER)?;
    fs::write(download.join("PO_2.edi"), "not an interchange")?;

    let config = CycleConfig {
        integrations: Integrations::EdiOnly,
        sender_id: "VENDOR123".to_string(),
        storage_dir: dir.path().join("output"),
        delete_after_ack: true,
        ..CycleConfig::default()
    };
    let report = TransferOrchestrator::new(config)
        .with_mailbox(DirectoryMailbox::new(&download, &upload))
        .run_cycle()?;

    assert!(!report.is_clean());

    let ack = fs::read_to_string(upload.join("PO_1.edi.997"))?;
    assert!(ack.contains("ST*997*0001~"));
    assert!(!upload.join("PO_2.edi.997").exists());

    // Acknowledged document removed, skipped one left for inspection
    assert!(!download.join("PO_1.edi").exists());
    assert!(download.join("PO_2.edi").exists());
    Ok(())
}
