use async_trait::async_trait;
use domain::printer::{DeviceCandidate, DeviceChannel, PrinterCommand, PrinterDriver};
use domain::PrintError;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use super::escpos::EscPosEncoder;

/// "Print to file": appends the encoded ESC/POS stream to a file or share.
pub struct FilePrinterDriver {
    path: PathBuf,
}

impl FilePrinterDriver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PrinterDriver for FilePrinterDriver {
    async fn discover(&self) -> Result<Vec<DeviceCandidate>, PrintError> {
        // The target counts as attached when its directory exists
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if tokio::fs::metadata(&parent).await.is_err() {
            return Ok(Vec::new());
        }
        Ok(vec![DeviceCandidate {
            id: None,
            path: self.path.clone(),
        }])
    }

    async fn construct(
        &self,
        candidate: &DeviceCandidate,
    ) -> Result<Box<dyn DeviceChannel>, PrintError> {
        Ok(Box::new(FileChannel {
            path: candidate.path.clone(),
            file: None,
        }))
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

struct FileChannel {
    path: PathBuf,
    file: Option<File>,
}

#[async_trait]
impl DeviceChannel for FileChannel {
    async fn open(&mut self) -> Result<(), PrintError> {
        if self.file.is_some() {
            return Ok(());
        }
        info!("Preparing to print to file/share: {:?}", self.path);
        let file = OpenOptions::new()
            .create(true) // Create if not exists (local files)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                error!("Failed to open printer file {:?}: {}", self.path, e);
                PrintError::OpenFailed(format!("failed to open {}: {}", self.path.display(), e))
            })?;
        self.file = Some(file);
        Ok(())
    }

    async fn send(&mut self, commands: &[PrinterCommand]) -> Result<(), PrintError> {
        let Some(file) = self.file.as_mut() else {
            return Err(PrintError::EmissionFailed(format!(
                "{} is not open",
                self.path.display()
            )));
        };

        let bytes = EscPosEncoder::encode(commands);
        file.write_all(&bytes)
            .await
            .map_err(|e| PrintError::emission("write to printer file", e))?;
        // Flush per job so the data reaches the share immediately
        file.flush()
            .await
            .map_err(|e| PrintError::emission("flush printer file", e))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PrintError> {
        if let Some(mut file) = self.file.take() {
            file.shutdown()
                .await
                .map_err(|e| PrintError::emission("close printer file", e))?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file printer at {}", self.path.display())
    }
}
