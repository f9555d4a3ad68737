use serde::{Deserialize, Serialize};

/// Horizontal text alignment supported by receipt printers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Structured command stream accepted by a device channel.
///
/// Encoding into a wire protocol (ESC/POS) is the driver's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterCommand {
    /// Reset printer state and select the code page
    Initialize,
    Align(Alignment),
    Bold(bool),
    /// One line of text, terminated by a line feed on the wire
    Text(String),
    /// Print and feed n lines
    Feed(u8),
    Cut,
}

impl PrinterCommand {
    pub fn text(line: impl Into<String>) -> Self {
        Self::Text(line.into())
    }
}
