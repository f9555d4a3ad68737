use async_trait::async_trait;
use domain::printer::{DeviceCandidate, DeviceChannel, PrinterCommand, PrinterDriver, UsbId};
use domain::PrintError;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::escpos::EscPosEncoder;

const DEFAULT_SYSFS_ROOT: &str = "/sys";
const DEFAULT_DEV_ROOT: &str = "/dev/usb";

/// USB receipt printers bound to the Linux `usblp` driver.
///
/// Discovery walks `/sys/class/usbmisc/lp*`, reading the vendor and product
/// ids from the parent USB device; jobs are written to `/dev/usb/lpN`.
pub struct UsbPrinterDriver {
    sysfs_root: PathBuf,
    dev_root: PathBuf,
}

impl UsbPrinterDriver {
    pub fn new() -> Self {
        Self::with_roots(DEFAULT_SYSFS_ROOT, DEFAULT_DEV_ROOT)
    }

    /// Use alternate sysfs and device roots (containers, tests)
    pub fn with_roots(sysfs_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            dev_root: dev_root.into(),
        }
    }

    async fn read_usb_id(class_entry: &Path) -> Option<UsbId> {
        // `device` links to the USB interface; ids live on its parent
        let interface = tokio::fs::canonicalize(class_entry.join("device")).await.ok()?;
        let usb_device = interface.parent()?;
        let vendor_id = read_hex(&usb_device.join("idVendor")).await?;
        let product_id = read_hex(&usb_device.join("idProduct")).await?;
        Some(UsbId::new(vendor_id, product_id))
    }
}

impl Default for UsbPrinterDriver {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_hex(path: &Path) -> Option<u16> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    u16::from_str_radix(raw.trim(), 16).ok()
}

#[async_trait]
impl PrinterDriver for UsbPrinterDriver {
    async fn discover(&self) -> Result<Vec<DeviceCandidate>, PrintError> {
        let class_dir = self.sysfs_root.join("class").join("usbmisc");
        let mut entries = match tokio::fs::read_dir(&class_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                // No usblp module loaded means no printers, not a failure
                debug!("Cannot read {:?}: {}", class_dir, e);
                return Ok(Vec::new());
            }
        };

        let mut candidates = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error while listing {:?}: {}", class_dir, e);
                    break;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("lp") {
                continue;
            }
            let id = Self::read_usb_id(&entry.path()).await;
            candidates.push(DeviceCandidate {
                id,
                path: self.dev_root.join(&name),
            });
        }

        // read_dir order is unspecified; lp0 should win over lp1
        candidates.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(count = candidates.len(), "USB printer discovery finished");
        Ok(candidates)
    }

    async fn construct(
        &self,
        candidate: &DeviceCandidate,
    ) -> Result<Box<dyn DeviceChannel>, PrintError> {
        info!(
            device = %candidate.path.display(),
            usb_id = ?candidate.id.map(|id| id.to_string()),
            "Using USB printer"
        );
        Ok(Box::new(UsbChannel {
            candidate: candidate.clone(),
            file: None,
        }))
    }

    fn kind(&self) -> &'static str {
        "usb"
    }
}

struct UsbChannel {
    candidate: DeviceCandidate,
    file: Option<File>,
}

#[async_trait]
impl DeviceChannel for UsbChannel {
    async fn open(&mut self) -> Result<(), PrintError> {
        if self.file.is_some() {
            return Ok(());
        }
        let path = &self.candidate.path;
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .map_err(|e| PrintError::OpenFailed(format!("failed to open {}: {}", path.display(), e)))?;
        self.file = Some(file);
        Ok(())
    }

    async fn send(&mut self, commands: &[PrinterCommand]) -> Result<(), PrintError> {
        let Some(file) = self.file.as_mut() else {
            return Err(PrintError::EmissionFailed(format!(
                "{} is not open",
                self.candidate.path.display()
            )));
        };

        let bytes = EscPosEncoder::encode(commands);
        file.write_all(&bytes)
            .await
            .map_err(|e| PrintError::emission("write to USB printer", e))?;
        file.flush()
            .await
            .map_err(|e| PrintError::emission("flush USB printer", e))?;
        debug!(bytes = bytes.len(), "Sent ESC/POS stream");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PrintError> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .await
                .map_err(|e| PrintError::emission("close USB printer", e))?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match self.candidate.id {
            Some(id) => format!("USB printer {} at {}", id, self.candidate.path.display()),
            None => format!("USB printer at {}", self.candidate.path.display()),
        }
    }
}
