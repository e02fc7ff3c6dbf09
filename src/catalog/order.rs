use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::CatalogEntity;
use crate::error::{Error, Result};

/// Order progress. Moves forward only, or to cancelled before dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if transitioning from self to `next` is valid.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Preparing)
                | (Preparing, OutForDelivery)
                | (OutForDelivery, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Preparing, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// A placed order as stored by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub restaurant_id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: OrderStatus,
    #[serde(with = "crate::payment::iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    /// Ledger id of the PIX payment covering this order, if any.
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl CatalogEntity for Order {
    fn table() -> &'static str {
        "orders"
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Checkout request. The service fills in id, total, status and timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub restaurant_id: String,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub delivery_address: Option<String>,
    pub payment_id: Option<String>,
}

impl NewOrder {
    pub fn new(restaurant_id: impl Into<String>, customer_id: impl Into<String>) -> Self {
        NewOrder {
            restaurant_id: restaurant_id.into(),
            customer_id: customer_id.into(),
            items: Vec::new(),
            delivery_address: None,
            payment_id: None,
        }
    }

    pub fn with_item(mut self, item: OrderItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_delivery_address(mut self, address: impl Into<String>) -> Self {
        self.delivery_address = Some(address.into());
        self
    }

    pub fn with_payment(mut self, payment_id: impl Into<String>) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    /// Reject empty carts and zero quantities.
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::ValidationError("Order has no items".to_string()));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity == 0) {
            return Err(Error::ValidationError(format!(
                "Item {} has zero quantity",
                item.product_id
            )));
        }
        Ok(())
    }
}
