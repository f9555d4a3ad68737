use serde::{Deserialize, Serialize};

/// Minimum run of `=` or `-` that marks a separator line
const SEPARATOR_RUN: usize = 10;

/// Footer markers that get centered
const FOOTER_MARKERS: &[&str] = &["thank you", "thanks for"];

/// Labels that start an emphasized totals line
const TOTAL_LABELS: &[&str] = &["TOTAL", "SUBTOTAL"];

/// Per-line style derived from content shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StyleHint {
    #[default]
    Normal,
    Centered,
    Emphasized,
}

impl StyleHint {
    /// Classify a formatted line.
    ///
    /// Separators, footer lines and the store name are centered; totals lines
    /// are emphasized; everything else prints left-aligned.
    pub fn classify(line: &str, store_name: &str) -> Self {
        if has_separator_run(line) {
            return Self::Centered;
        }

        let lower = line.to_lowercase();
        if FOOTER_MARKERS.iter().any(|marker| lower.contains(marker)) {
            return Self::Centered;
        }

        let store_name = store_name.trim();
        if !store_name.is_empty() && line.contains(store_name) {
            return Self::Centered;
        }

        let upper = line.trim_start().to_uppercase();
        if TOTAL_LABELS.iter().any(|label| upper.starts_with(label)) {
            return Self::Emphasized;
        }

        Self::Normal
    }
}

fn has_separator_run(line: &str) -> bool {
    ['=', '-'].iter().any(|&sep| {
        let mut run = 0;
        for c in line.chars() {
            if c == sep {
                run += 1;
                if run >= SEPARATOR_RUN {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintLine {
    pub text: String,
    pub style: StyleHint,
}

/// Formatted receipt, ready for emission
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrintJob {
    lines: Vec<PrintLine>,
}

impl PrintJob {
    /// Build a job from raw lines, classifying each one
    pub fn from_lines<I, S>(lines: I, store_name: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = lines
            .into_iter()
            .map(|line| {
                let text = line.into();
                let style = StyleHint::classify(&text, store_name);
                PrintLine { text, style }
            })
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[PrintLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Plain text rendering, one line per row
    pub fn to_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result reported back to HTTP callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOutcome {
    pub success: bool,
    pub message: String,
}

impl PrintOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
