//! Example demonstrating cached catalog reads and order placement.
//!
//! Run with: RUST_LOG=debug cargo run --example catalog_usage

use delivery_kit::{
    backend::InMemoryBackend,
    catalog::{NewOrder, OrderItem, OrderStatus},
    client::InMemoryClient,
    error::Result,
    observability::{LogMetrics, TtlPolicy},
    CatalogService, FetchStrategy,
};
use serde_json::json;
use std::time::Duration;

fn seed(client: &InMemoryClient) {
    client.seed(
        "restaurants",
        vec![
            json!({ "id": "r1", "name": "Cantina da Nonna", "category": "Italiana", "rating": 4.6,
                    "delivery_time": "30-45 min", "delivery_fee": 6.9 }),
            json!({ "id": "r2", "name": "Sushi Liberdade", "category": "Japonesa", "rating": 4.8,
                    "delivery_time": "40-50 min", "delivery_fee": 0.0 }),
        ],
    );
    client.seed(
        "products",
        vec![
            json!({ "id": "p1", "restaurant_id": "r1", "name": "Lasanha", "price": 42.0, "category": "Massas" }),
            json!({ "id": "p2", "restaurant_id": "r1", "name": "Tiramisù", "price": 19.0, "category": "Sobremesas" }),
            json!({ "id": "p3", "restaurant_id": "r2", "name": "Temaki", "price": 28.0, "category": "Temakis" }),
        ],
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .ok();

    println!("\n=== Delivery Kit - Catalog Example ===\n");

    println!("1. Initializing client and query cache...");
    let client = InMemoryClient::new();
    seed(&client);
    let catalog = CatalogService::new(client.clone(), InMemoryBackend::new())
        .with_metrics(Box::new(LogMetrics))
        .with_ttl_policy(TtlPolicy::Fixed(Duration::from_secs(300)));
    println!("   ✓ Ready\n");

    println!("2. Listing restaurants twice:");
    for _ in 0..2 {
        let restaurants = catalog.restaurants(FetchStrategy::Refresh).await?;
        println!("   {} restaurants", restaurants.len());
    }
    println!("   client selects so far: {}\n", client.select_calls());

    println!("3. Menu for r1:");
    if let Some(menu) = catalog.restaurant_menu("r1", FetchStrategy::Refresh).await? {
        println!("   {}", menu.restaurant.name);
        for (section, products) in menu.sections() {
            println!("   [{}]", section);
            for product in products {
                println!("     {:<12} R$ {:.2}", product.name, product.price);
            }
        }
    }
    println!();

    println!("4. Placing an order:");
    let order = catalog
        .place_order(
            NewOrder::new("r1", "customer-1")
                .with_item(OrderItem {
                    product_id: "p1".to_string(),
                    name: "Lasanha".to_string(),
                    quantity: 2,
                    unit_price: 42.0,
                })
                .with_delivery_address("Rua Augusta, 100"),
        )
        .await?;
    println!("   ✓ Order {} total R$ {:.2}\n", order.id, order.total);

    println!("5. Advancing order status:");
    for next in [OrderStatus::Confirmed, OrderStatus::Preparing] {
        let moved = catalog.update_order_status(&order.id, next).await?;
        println!("   → {}", moved.status);
    }
    if let Err(e) = catalog
        .update_order_status(&order.id, OrderStatus::Delivered)
        .await
    {
        println!("   ✗ {}", e);
    }
    println!();

    println!("6. Order history (cached after first read):");
    for order in catalog
        .orders_for_customer("customer-1", FetchStrategy::Refresh)
        .await?
    {
        println!("   {} {} R$ {:.2}", order.id, order.status, order.total);
    }

    catalog.backend().log_stats();
    println!("\n=== Done ===\n");
    Ok(())
}
