use serde::{Deserialize, Serialize};

use super::CatalogEntity;
use crate::error::{Error, Result};

/// A menu item sold by one restaurant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl CatalogEntity for Product {
    fn table() -> &'static str {
        "products"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.price < 0.0 || !self.price.is_finite() {
            return Err(Error::ValidationError(format!(
                "Product {} has invalid price {}",
                self.id, self.price
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_from_row() {
        let row = serde_json::json!({
            "id": "p1",
            "restaurant_id": "r1",
            "name": "Pão de queijo",
            "price": 6.5
        });
        let product: Product = serde_json::from_value(row).unwrap();

        assert!(product.available);
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_negative_price_rejected() {
        let row = serde_json::json!({
            "id": "p1",
            "restaurant_id": "r1",
            "name": "Erro",
            "price": -1.0
        });
        let product: Product = serde_json::from_value(row).unwrap();

        assert!(matches!(product.validate(), Err(Error::ValidationError(_))));
    }
}
