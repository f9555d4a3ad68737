use domain::printer::{Alignment, PrinterCommand};

/// ESC/POS byte stream builder for receipt printers
pub struct EscPosEncoder {
    buffer: Vec<u8>,
}

/// ESC t n: code page 16 is WPC1252 on Epson-compatible printers
const CODE_PAGE_WPC1252: u8 = 16;

impl EscPosEncoder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Encode a whole command stream
    pub fn encode(commands: &[PrinterCommand]) -> Vec<u8> {
        commands
            .iter()
            .fold(Self::new(), |encoder, command| encoder.command(command))
            .build()
    }

    pub fn command(self, command: &PrinterCommand) -> Self {
        match command {
            PrinterCommand::Initialize => self.initialize(),
            PrinterCommand::Align(alignment) => self.align(*alignment),
            PrinterCommand::Bold(on) => self.bold(*on),
            PrinterCommand::Text(line) => self.text_line(line),
            PrinterCommand::Feed(lines) => self.feed(*lines),
            PrinterCommand::Cut => self.cut(),
        }
    }

    pub fn initialize(mut self) -> Self {
        // ESC @: Initialize printer, then ESC t n to select the code page
        self.buffer.extend_from_slice(&[0x1B, 0x40]);
        self.buffer.extend_from_slice(&[0x1B, 0x74, CODE_PAGE_WPC1252]);
        self
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        // ESC a n: Align (0: Left, 1: Center, 2: Right)
        let n = match alignment {
            Alignment::Left => 0x00,
            Alignment::Center => 0x01,
            Alignment::Right => 0x02,
        };
        self.buffer.extend_from_slice(&[0x1B, 0x61, n]);
        self
    }

    pub fn bold(mut self, on: bool) -> Self {
        // ESC E n: Emphasized mode
        self.buffer.extend_from_slice(&[0x1B, 0x45, u8::from(on)]);
        self
    }

    pub fn text_line(mut self, text: &str) -> Self {
        self.buffer.extend(encode_text(text));
        self.buffer.push(0x0A); // LF
        self
    }

    pub fn feed(mut self, n: u8) -> Self {
        // ESC d n: Print and feed n lines
        self.buffer.extend_from_slice(&[0x1B, 0x64, n]);
        self
    }

    pub fn cut(mut self) -> Self {
        // GS V 66 0: Feed to cut position and cut
        self.buffer.extend_from_slice(&[0x1D, 0x56, 66, 0]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for EscPosEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert text to WPC1252. Characters the code page lacks become `?`;
/// control characters are dropped so text cannot inject commands.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c.is_control() {
            continue;
        }
        if c.is_ascii() {
            bytes.push(c as u8);
            continue;
        }
        let (cow, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if had_errors {
            bytes.push(b'?');
        } else {
            bytes.extend_from_slice(&cow);
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_maps_latin1() {
        assert_eq!(encode_text("Café"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_text("€5"), vec![0x80, b'5']);
    }

    #[test]
    fn test_encode_text_replaces_unmappable() {
        assert_eq!(encode_text("茶 ok"), b"? ok".to_vec());
    }

    #[test]
    fn test_encode_text_strips_control_characters() {
        assert_eq!(encode_text("a\x1B@b\n"), b"a@b".to_vec());
    }
}
