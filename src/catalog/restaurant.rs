use serde::{Deserialize, Serialize};

use super::{CatalogEntity, Product};
use crate::error::{Error, Result};

/// A restaurant listed on the marketplace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Average rating, 0 to 5.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Free-text estimate shown to customers, e.g. "30-45 min".
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub delivery_fee: f64,
    #[serde(default = "default_open")]
    pub is_open: bool,
}

fn default_open() -> bool {
    true
}

impl CatalogEntity for Restaurant {
    fn table() -> &'static str {
        "restaurants"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(Error::ValidationError(format!(
                    "Restaurant {} has rating {} outside 0-5",
                    self.id, rating
                )));
            }
        }
        Ok(())
    }
}

/// A restaurant together with its products.
#[derive(Clone, Debug, PartialEq)]
pub struct Menu {
    pub restaurant: Restaurant,
    pub products: Vec<Product>,
}

impl Menu {
    /// Products grouped by category, categories in first-seen order.
    /// Uncategorised products go under "Outros".
    pub fn sections(&self) -> Vec<(String, Vec<&Product>)> {
        let mut sections: Vec<(String, Vec<&Product>)> = Vec::new();
        for product in &self.products {
            let category = product.category.as_deref().unwrap_or("Outros");
            match sections.iter_mut().find(|(name, _)| name == category) {
                Some((_, items)) => items.push(product),
                None => sections.push((category.to_string(), vec![product])),
            }
        }
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restaurant_defaults_from_sparse_row() {
        let row = serde_json::json!({ "id": "r1", "name": "Sabor Mineiro" });
        let restaurant: Restaurant = serde_json::from_value(row).unwrap();

        assert_eq!(restaurant.delivery_fee, 0.0);
        assert!(restaurant.is_open);
        assert!(restaurant.rating.is_none());
    }

    #[test]
    fn test_restaurant_rating_validation() {
        let mut restaurant: Restaurant =
            serde_json::from_value(serde_json::json!({ "id": "r1", "name": "X", "rating": 4.5 }))
                .unwrap();
        assert!(restaurant.validate().is_ok());

        restaurant.rating = Some(7.0);
        assert!(restaurant.validate().is_err());
    }

    #[test]
    fn test_menu_sections() {
        let product = |id: &str, category: Option<&str>| Product {
            id: id.to_string(),
            restaurant_id: "r1".to_string(),
            name: id.to_string(),
            description: None,
            price: 10.0,
            image_url: None,
            category: category.map(str::to_string),
            available: true,
        };
        let menu = Menu {
            restaurant: serde_json::from_value(serde_json::json!({ "id": "r1", "name": "X" }))
                .unwrap(),
            products: vec![
                product("a", Some("Pizzas")),
                product("b", None),
                product("c", Some("Pizzas")),
            ],
        };

        let sections = menu.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "Pizzas");
        assert_eq!(sections[0].1.len(), 2);
        assert_eq!(sections[1].0, "Outros");
    }
}
