mod command;
mod driver;
mod init_state;

pub use command::{Alignment, PrinterCommand};
pub use driver::{DeviceCandidate, DeviceChannel, PrinterDriver, UsbId};
pub use init_state::InitializationState;
