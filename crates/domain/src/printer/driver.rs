use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::command::PrinterCommand;
use crate::error::PrintError;

/// USB vendor/product identifier pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsbId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl UsbId {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// A printer found by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    pub id: Option<UsbId>,
    pub path: PathBuf,
}

impl DeviceCandidate {
    /// Pick the candidate matching `preferred`, or the first one when no
    /// identifier is configured. A preferred id that is not attached
    /// selects nothing.
    pub fn select(candidates: Vec<DeviceCandidate>, preferred: Option<UsbId>) -> Option<Self> {
        match preferred {
            Some(id) => candidates.into_iter().find(|c| c.id == Some(id)),
            None => candidates.into_iter().next(),
        }
    }
}

/// Device adapter contract consumed by the connection manager
#[async_trait]
pub trait PrinterDriver: Send + Sync {
    /// List attachable printers. An empty list is not an error here.
    async fn discover(&self) -> Result<Vec<DeviceCandidate>, PrintError>;

    /// Build a (closed) channel to a candidate returned by `discover`
    async fn construct(&self, candidate: &DeviceCandidate) -> Result<Box<dyn DeviceChannel>, PrintError>;

    /// Short driver name for logs
    fn kind(&self) -> &'static str;
}

/// A byte channel to one printer
#[async_trait]
pub trait DeviceChannel: Send {
    /// Open the channel. Opening an already open channel is a no-op.
    async fn open(&mut self) -> Result<(), PrintError>;

    /// Send a command sequence; the channel must be open
    async fn send(&mut self, commands: &[PrinterCommand]) -> Result<(), PrintError>;

    /// Close the channel. Closing a closed channel is a no-op.
    async fn close(&mut self) -> Result<(), PrintError>;

    /// Human readable device label for logs and health output
    fn describe(&self) -> String;
}
