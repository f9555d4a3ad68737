mod manager;

pub use manager::{ConnectionManager, DeviceHandle, DeviceSession};
