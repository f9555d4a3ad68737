use chrono::{DateTime, Utc};

use domain::{OrderData, PrintJob};

/// Store details and paper geometry used to lay out receipts
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLayout {
    pub store_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub footer: String,
    pub currency_symbol: String,
    /// Characters per line (48 for 80mm paper, 32 for 58mm)
    pub width: usize,
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        Self {
            store_name: "RECEIPT BRIDGE".to_string(),
            address: None,
            phone: None,
            footer: "Thank you for your order!".to_string(),
            currency_symbol: "$".to_string(),
            width: 48,
        }
    }
}

/// Narrowest paper width the layout still makes sense for
const MIN_WIDTH: usize = 16;

/// Lays out orders as plain-text lines sized to the paper width
#[derive(Debug, Clone)]
pub struct ReceiptFormatter {
    layout: ReceiptLayout,
}

impl ReceiptFormatter {
    pub fn new(mut layout: ReceiptLayout) -> Self {
        layout.width = layout.width.max(MIN_WIDTH);
        Self { layout }
    }

    pub fn layout(&self) -> &ReceiptLayout {
        &self.layout
    }

    /// Format an order. Pure: the same input always yields the same job.
    pub fn format(&self, order: &OrderData, printed_at: DateTime<Utc>) -> PrintJob {
        let width = self.layout.width;
        let mut lines = self.header();

        lines.push("=".repeat(width));
        if let Some(order_id) = order.order_id.as_deref().filter(|s| !s.trim().is_empty()) {
            lines.extend(wrap(&format!("Order: #{}", order_id.trim()), width));
        }
        let timestamp = order.created_at.unwrap_or(printed_at);
        lines.push(format!("Date: {}", timestamp.format("%Y-%m-%d %H:%M")));
        if let Some(customer) = order.customer_name.as_deref().filter(|s| !s.trim().is_empty()) {
            lines.extend(wrap(&format!("Customer: {}", customer.trim()), width));
        }
        lines.push("-".repeat(width));

        for item in &order.items {
            let left = format!("{}x {}", item.quantity, item.name.trim());
            lines.extend(self.two_column(&left, &self.money(item.line_total())));
            if let Some(notes) = item.notes.as_deref().filter(|s| !s.trim().is_empty()) {
                lines.extend(wrap(notes.trim(), width - 4).into_iter().map(|l| format!("  - {l}")));
            }
        }
        if order.items.is_empty() {
            lines.push("(no items)".to_string());
        }

        lines.push("-".repeat(width));
        lines.extend(self.two_column("SUBTOTAL", &self.money(order.effective_subtotal())));
        if order.tax.is_some() {
            lines.extend(self.two_column("TAX", &self.money(order.effective_tax())));
        }
        lines.extend(self.two_column("TOTAL", &self.money(order.effective_total())));

        if let Some(method) = order.payment_method.as_deref().filter(|s| !s.trim().is_empty()) {
            lines.extend(wrap(&format!("Payment: {}", method.trim()), width));
        }
        if let Some(notes) = order.notes.as_deref().filter(|s| !s.trim().is_empty()) {
            lines.push(String::new());
            lines.extend(wrap(&format!("Notes: {}", notes.trim()), width));
        }

        lines.push("=".repeat(width));
        lines.extend(self.footer());

        PrintJob::from_lines(lines, &self.layout.store_name)
    }

    /// Fixed page used by the test-print endpoint
    pub fn test_page(&self, printed_at: DateTime<Utc>) -> PrintJob {
        let width = self.layout.width;
        let mut lines = self.header();
        lines.push("=".repeat(width));
        lines.push("PRINTER TEST".to_string());
        lines.push(format!("Date: {}", printed_at.format("%Y-%m-%d %H:%M")));
        lines.push(format!("Paper width: {width} characters"));
        lines.push("-".repeat(width));
        lines.extend(wrap(
            "If you can read this, the printer is connected and working.",
            width,
        ));
        lines.extend(self.two_column("Sample item", &self.money(1.0)));
        lines.extend(self.two_column("TOTAL", &self.money(1.0)));
        lines.push("=".repeat(width));
        lines.extend(self.footer());

        PrintJob::from_lines(lines, &self.layout.store_name)
    }

    fn header(&self) -> Vec<String> {
        let width = self.layout.width;
        let mut lines = Vec::new();
        if !self.layout.store_name.trim().is_empty() {
            lines.push(self.layout.store_name.trim().to_string());
        }
        for extra in [&self.layout.address, &self.layout.phone].into_iter().flatten() {
            if !extra.trim().is_empty() {
                lines.extend(wrap(extra.trim(), width));
            }
        }
        lines
    }

    fn footer(&self) -> Vec<String> {
        if self.layout.footer.trim().is_empty() {
            return Vec::new();
        }
        wrap(self.layout.footer.trim(), self.layout.width)
    }

    fn money(&self, amount: f64) -> String {
        format!("{}{:.2}", self.layout.currency_symbol, amount)
    }

    /// Left text with a right-aligned amount; long text wraps and the amount
    /// stays on the first row.
    fn two_column(&self, left: &str, right: &str) -> Vec<String> {
        let width = self.layout.width;
        let right_len = right.chars().count();
        let left_width = width.saturating_sub(right_len + 1).max(1);

        let mut rows = wrap(left, left_width).into_iter();
        let first = rows.next().unwrap_or_default();
        let padding = width.saturating_sub(first.chars().count() + right_len).max(1);

        let mut lines = vec![format!("{first}{}{right}", " ".repeat(padding))];
        lines.extend(rows.map(|row| format!("  {row}")));
        lines
    }
}

/// Word-wrap to `width` characters, hard-breaking words longer than a line
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
