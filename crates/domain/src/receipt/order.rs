use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

const MAX_ITEMS: usize = 200;
const MAX_TEXT_LEN: usize = 500;
const MAX_QUANTITY: u32 = 10_000;

/// One ordered item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Unit price
    pub price: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Receipt payload accepted by the print endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderData {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl OrderData {
    /// Subtotal as sent, or the sum of the item lines
    pub fn effective_subtotal(&self) -> f64 {
        self.subtotal
            .unwrap_or_else(|| self.items.iter().map(OrderItem::line_total).sum())
    }

    pub fn effective_tax(&self) -> f64 {
        self.tax.unwrap_or(0.0)
    }

    pub fn effective_total(&self) -> f64 {
        self.total
            .unwrap_or_else(|| self.effective_subtotal() + self.effective_tax())
    }

    /// Validate the order before it reaches the printer.
    ///
    /// An order without items is valid: it still prints header and footer.
    pub fn validate(&self) -> Result<()> {
        if self.items.len() > MAX_ITEMS {
            return Err(DomainError::InvalidOrder(format!(
                "too many items: {} (max {MAX_ITEMS})",
                self.items.len()
            )));
        }

        for (index, item) in self.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(DomainError::InvalidOrder(format!(
                    "item {index} has an empty name"
                )));
            }
            if item.quantity == 0 || item.quantity > MAX_QUANTITY {
                return Err(DomainError::InvalidOrder(format!(
                    "item {index} quantity must be between 1 and {MAX_QUANTITY}"
                )));
            }
            check_amount(&format!("item {index} price"), Some(item.price))?;
            check_text(&format!("item {index} name"), Some(&item.name))?;
            check_text(&format!("item {index} notes"), item.notes.as_deref())?;
        }

        check_amount("subtotal", self.subtotal)?;
        check_amount("tax", self.tax)?;
        check_amount("total", self.total)?;
        check_text("order_id", self.order_id.as_deref())?;
        check_text("customer_name", self.customer_name.as_deref())?;
        check_text("payment_method", self.payment_method.as_deref())?;
        check_text("notes", self.notes.as_deref())?;

        Ok(())
    }
}

fn check_amount(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(DomainError::InvalidOrder(format!(
            "{field} must be a finite, non-negative number"
        ))),
        _ => Ok(()),
    }
}

fn check_text(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > MAX_TEXT_LEN => Err(DomainError::InvalidOrder(format!(
            "{field} is longer than {MAX_TEXT_LEN} characters"
        ))),
        _ => Ok(()),
    }
}
