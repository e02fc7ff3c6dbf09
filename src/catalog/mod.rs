//! Catalog entities served by the hosted backend.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod order;
pub mod product;
pub mod restaurant;

pub use order::{NewOrder, Order, OrderItem, OrderStatus};
pub use product::Product;
pub use restaurant::{Menu, Restaurant};

/// A row type that lives in one backend table.
///
/// # Example
///
/// ```
/// use delivery_kit::catalog::CatalogEntity;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Coupon {
///     id: String,
///     code: String,
/// }
///
/// impl CatalogEntity for Coupon {
///     fn table() -> &'static str {
///         "coupons"
///     }
///
///     fn id(&self) -> &str {
///         &self.id
///     }
/// }
/// ```
pub trait CatalogEntity: Send + Sync + Serialize + DeserializeOwned + Clone {
    /// Backend table name. Also the cache key namespace.
    fn table() -> &'static str;

    /// Primary key value of this row.
    fn id(&self) -> &str;

    /// Primary key column.
    fn primary_key() -> &'static str {
        "id"
    }

    /// Optional check run on every row decoded from the backend or cache.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
