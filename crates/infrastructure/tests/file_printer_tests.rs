use domain::PrintError;
use domain::printer::{DeviceCandidate, PrinterCommand, PrinterDriver};
use infrastructure::printer::FilePrinterDriver;
use tokio_test::{assert_err, assert_ok};

#[tokio::test] // appends_each_job_to_file
async fn appends_each_job_to_file() {
    let dir = std::env::temp_dir().join(format!("file-printer-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("receipts.bin");
    let _ = std::fs::remove_file(&path);

    let driver = FilePrinterDriver::new(&path);
    assert_eq!(assert_ok!(driver.discover().await).len(), 1);

    for line in ["first", "second"] {
        let candidate = assert_ok!(driver.discover().await).remove(0);
        let mut channel = assert_ok!(driver.construct(&candidate).await);
        assert_ok!(channel.open().await);
        assert_ok!(channel.send(&[PrinterCommand::text(line)]).await);
        assert_ok!(channel.close().await);
    }

    assert_eq!(std::fs::read(&path).unwrap(), b"first\nsecond\n".to_vec());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test] // missing_directory_discovers_nothing
async fn missing_directory_discovers_nothing() {
    let driver = FilePrinterDriver::new("/nonexistent/dir/receipts.bin");
    assert!(assert_ok!(driver.discover().await).is_empty());

    let candidate = DeviceCandidate {
        id: None,
        path: "/nonexistent/dir/receipts.bin".into(),
    };
    let mut channel = assert_ok!(driver.construct(&candidate).await);
    let err = assert_err!(channel.open().await);
    assert!(matches!(err, PrintError::OpenFailed(_)));
}
