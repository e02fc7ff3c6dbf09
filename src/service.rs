//! Cached catalog service for restaurants, products and orders.
//!
//! Reads go through a [`CacheBackend`] keyed by the query's table and
//! fingerprint; every mutation drops all cached results of the mutated table.

use crate::backend::CacheBackend;
use crate::catalog::{CatalogEntity, Menu, NewOrder, Order, OrderStatus, Product, Restaurant};
use crate::client::QueryClient;
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::key::{CacheKeyBuilder, KeyRegistry};
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::query::Query;
use crate::serialization::{deserialize_from_cache, serialize_for_cache};
use crate::strategy::FetchStrategy;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Catalog access with a query cache in front of the hosted backend.
///
/// The client and backend use interior mutability, so one service can be
/// wrapped in `Arc` and shared between tasks.
///
/// # Example
///
/// ```
/// use delivery_kit::backend::InMemoryBackend;
/// use delivery_kit::client::InMemoryClient;
/// use delivery_kit::{CatalogService, FetchStrategy};
/// use serde_json::json;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let client = InMemoryClient::new();
/// client.seed("restaurants", vec![json!({ "id": "r1", "name": "Cantina" })]);
///
/// let catalog = CatalogService::new(client.clone(), InMemoryBackend::new());
/// let first = catalog.restaurants(FetchStrategy::Refresh).await.unwrap();
/// let second = catalog.restaurants(FetchStrategy::Refresh).await.unwrap();
///
/// assert_eq!(first, second);
/// assert_eq!(client.select_calls(), 1);
/// # });
/// ```
pub struct CatalogService<C: QueryClient, B: CacheBackend> {
    client: C,
    backend: B,
    registry: KeyRegistry,
    metrics: Box<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
    clock: Arc<dyn Clock>,
}

impl<C: QueryClient, B: CacheBackend> CatalogService<C, B> {
    pub fn new(client: C, backend: B) -> Self {
        CatalogService {
            client,
            backend,
            registry: KeyRegistry::new(),
            metrics: Box::new(NoOpMetrics),
            ttl_policy: TtlPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set custom TTL policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Clock used to stamp new orders.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Readiness of both the hosted backend and the cache.
    ///
    /// # Errors
    /// Returns `Err` if either side fails its own check
    pub async fn health_check(&self) -> Result<bool> {
        let (client, cache) =
            futures::try_join!(self.client.health_check(), self.backend.health_check())?;
        if !(client && cache) {
            warn!("Catalog not ready: client={} cache={}", client, cache);
        }
        Ok(client && cache)
    }

    /// Number of cached results currently tracked for `table`.
    pub fn cached_queries(&self, table: &str) -> usize {
        self.registry.tracked(table)
    }

    // ------------------------------------------------------------------
    // Generic access
    // ------------------------------------------------------------------

    /// Every row matching `query`, decoded as `T`.
    ///
    /// # Errors
    ///
    /// - `Error::RepositoryError`: the client failed
    /// - `Error::DeserializationError`: a row does not decode as `T`
    /// - `Error::ValidationError`: a decoded row fails `T::validate`
    /// - `Error::BackendError`: the cache backend failed
    pub async fn fetch_all<T: CatalogEntity>(
        &self,
        query: &Query,
        strategy: FetchStrategy,
    ) -> Result<Vec<T>> {
        let timer = Instant::now();
        let key = CacheKeyBuilder::build(query);

        debug!("» Catalog fetch for key: {} (strategy: {})", key, strategy);

        let result = self.execute::<T>(query, &key, strategy, timer).await;
        if let Err(e) = &result {
            self.metrics.record_error(&key, &e.to_string());
        }
        result
    }

    /// The single row matching `query`.
    ///
    /// Zero rows yield `None`; more than one is an error.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_all`](Self::fetch_all), plus `Error::RepositoryError`
    /// when several rows match.
    pub async fn fetch_one<T: CatalogEntity>(
        &self,
        query: &Query,
        strategy: FetchStrategy,
    ) -> Result<Option<T>> {
        let mut rows = self
            .fetch_all::<T>(&query.clone().limit(2), strategy)
            .await?;

        if rows.len() > 1 {
            return Err(Error::RepositoryError(format!(
                "Expected at most one row for {}:{}",
                query.table(),
                query.fingerprint()
            )));
        }
        Ok(rows.pop())
    }

    /// Insert `row` into the table of `T` and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the client rejects the row or the stored row does not
    /// decode as a valid `T`.
    pub async fn insert<T: CatalogEntity>(&self, row: Value) -> Result<T> {
        let stored = self.client.insert(T::table(), row).await?;
        self.after_mutation(T::table()).await;

        let entity: T = serde_json::from_value(stored)?;
        entity.validate()?;
        info!("Inserted {} into {}", entity.id(), T::table());
        Ok(entity)
    }

    /// Validate and insert a typed entity.
    ///
    /// # Errors
    ///
    /// Returns `Error::ValidationError` before touching the client if the
    /// entity is invalid; otherwise as [`insert`](Self::insert).
    pub async fn insert_entity<T: CatalogEntity>(&self, entity: &T) -> Result<T> {
        entity.validate()?;
        self.insert::<T>(serde_json::to_value(entity)?).await
    }

    /// Merge `patch` into every row matching `query` and return them.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the client rejects the update (an unfiltered query
    /// included) or an updated row does not decode as a valid `T`.
    pub async fn update<T: CatalogEntity>(&self, query: &Query, patch: Value) -> Result<Vec<T>> {
        let updated = self.client.update(query, patch).await?;
        self.after_mutation(query.table()).await;

        debug!("Updated {} rows in {}", updated.len(), query.table());
        decode_rows(updated)
    }

    /// Drop every cached result of `table`. Returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the cache backend fails.
    pub async fn invalidate_table(&self, table: &str) -> Result<usize> {
        let timer = Instant::now();
        let keys = self.registry.take(table);
        if keys.is_empty() {
            return Ok(0);
        }

        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.backend.mdelete(&refs).await?;
        for key in &keys {
            self.metrics.record_delete(key, timer.elapsed());
        }

        debug!("Invalidated {} cached queries for {}", keys.len(), table);
        Ok(keys.len())
    }

    // ------------------------------------------------------------------
    // Marketplace operations
    // ------------------------------------------------------------------

    /// All restaurants, by name.
    pub async fn restaurants(&self, strategy: FetchStrategy) -> Result<Vec<Restaurant>> {
        let query = Query::for_entity::<Restaurant>().order("name", true);
        self.fetch_all(&query, strategy).await
    }

    pub async fn restaurant(&self, id: &str, strategy: FetchStrategy) -> Result<Option<Restaurant>> {
        self.fetch_one(&Query::by_id::<Restaurant>(id), strategy)
            .await
    }

    /// Products of one restaurant, by name.
    pub async fn products_for_restaurant(
        &self,
        restaurant_id: &str,
        strategy: FetchStrategy,
    ) -> Result<Vec<Product>> {
        let query = Query::for_entity::<Product>()
            .eq("restaurant_id", restaurant_id)
            .order("name", true);
        self.fetch_all(&query, strategy).await
    }

    pub async fn product(&self, id: &str, strategy: FetchStrategy) -> Result<Option<Product>> {
        self.fetch_one(&Query::by_id::<Product>(id), strategy).await
    }

    /// Restaurant and its products, fetched concurrently.
    ///
    /// `None` if the restaurant does not exist.
    pub async fn restaurant_menu(
        &self,
        restaurant_id: &str,
        strategy: FetchStrategy,
    ) -> Result<Option<Menu>> {
        let (restaurant, products) = futures::try_join!(
            self.restaurant(restaurant_id, strategy),
            self.products_for_restaurant(restaurant_id, strategy)
        )?;

        Ok(restaurant.map(|restaurant| Menu {
            restaurant,
            products,
        }))
    }

    /// A customer's orders, newest first.
    pub async fn orders_for_customer(
        &self,
        customer_id: &str,
        strategy: FetchStrategy,
    ) -> Result<Vec<Order>> {
        let query = Query::for_entity::<Order>()
            .eq("customer_id", customer_id)
            .order("created_at", false);
        self.fetch_all(&query, strategy).await
    }

    /// Turn a checkout request into a pending order.
    ///
    /// # Errors
    ///
    /// Returns `Error::ValidationError` for an empty cart or a zero quantity;
    /// otherwise as [`insert`](Self::insert).
    pub async fn place_order(&self, new_order: NewOrder) -> Result<Order> {
        new_order.validate()?;

        let order = Order {
            id: uuid::Uuid::now_v7().to_string(),
            total: new_order.total(),
            status: OrderStatus::Pending,
            created_at: self.clock.now(),
            restaurant_id: new_order.restaurant_id,
            customer_id: new_order.customer_id,
            items: new_order.items,
            delivery_address: new_order.delivery_address,
            payment_id: new_order.payment_id,
        };

        let order = self.insert_entity(&order).await?;
        info!(
            "Order {} placed by {} at {} (total {:.2})",
            order.id, order.customer_id, order.restaurant_id, order.total
        );
        Ok(order)
    }

    /// Move an order to `next`, if the transition is allowed.
    ///
    /// The current status is read past the cache.
    ///
    /// # Errors
    ///
    /// - `Error::RepositoryError`: the order does not exist
    /// - `Error::ValidationError`: the transition is not allowed
    pub async fn update_order_status(&self, order_id: &str, next: OrderStatus) -> Result<Order> {
        let query = Query::by_id::<Order>(order_id);
        let current = self
            .fetch_one::<Order>(&query, FetchStrategy::Bypass)
            .await?
            .ok_or_else(|| Error::RepositoryError(format!("Order {} not found", order_id)))?;

        if !current.status.can_transition_to(next) {
            return Err(Error::ValidationError(format!(
                "Order {} cannot move from {} to {}",
                order_id, current.status, next
            )));
        }

        let updated = self
            .update::<Order>(&query, json!({ "status": next }))
            .await?
            .pop()
            .ok_or_else(|| Error::RepositoryError(format!("Order {} not found", order_id)))?;

        info!("Order {} moved from {} to {}", order_id, current.status, next);
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn execute<T: CatalogEntity>(
        &self,
        query: &Query,
        key: &str,
        strategy: FetchStrategy,
        timer: Instant,
    ) -> Result<Vec<T>> {
        match strategy {
            FetchStrategy::Fresh | FetchStrategy::Refresh => {
                if let Some(rows) = self.read_cached::<T>(key).await? {
                    debug!("✓ Cache hit ({} strategy)", strategy);
                    self.metrics.record_hit(key, timer.elapsed());
                    return Ok(rows);
                }
                self.metrics.record_miss(key, timer.elapsed());
                if strategy == FetchStrategy::Fresh {
                    debug!("✗ Cache miss (Fresh strategy) - no fallback");
                    return Ok(Vec::new());
                }
                debug!("Cache miss, falling back to client");
            }
            FetchStrategy::Invalidate => {
                self.backend.delete(key).await?;
                self.registry.forget(key);
            }
            FetchStrategy::Bypass => {}
        }

        let rows = decode_rows::<T>(self.client.select(query).await?)?;
        self.store(query.table(), key, &rows).await;

        info!(
            "✓ Catalog fetch of {} rows for {} in {:?}",
            rows.len(),
            key,
            timer.elapsed()
        );
        Ok(rows)
    }

    /// Cached rows for `key`. Unreadable entries are evicted and read as a miss.
    async fn read_cached<T: CatalogEntity>(&self, key: &str) -> Result<Option<Vec<T>>> {
        let Some(bytes) = self.backend.get(key).await? else {
            return Ok(None);
        };

        match deserialize_from_cache::<Vec<T>>(&bytes) {
            Ok(rows) => {
                for row in &rows {
                    row.validate()?;
                }
                Ok(Some(rows))
            }
            Err(e) => {
                warn!("Evicting unreadable cache entry {}: {}", key, e);
                self.metrics.record_error(key, &e.to_string());
                self.backend.delete(key).await?;
                self.registry.forget(key);
                Ok(None)
            }
        }
    }

    /// Cache `rows`. Failures are logged; the caller still gets its rows.
    async fn store<T: CatalogEntity>(&self, table: &str, key: &str, rows: &[T]) {
        let timer = Instant::now();
        let bytes = match serialize_for_cache(&rows) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                return;
            }
        };

        match self
            .backend
            .set(key, bytes, self.ttl_policy.get_ttl(table))
            .await
        {
            Ok(()) => {
                self.registry.register(key);
                self.metrics.record_set(key, timer.elapsed());
            }
            Err(e) => {
                warn!("Failed to cache {}: {}", key, e);
                self.metrics.record_error(key, &e.to_string());
            }
        }
    }

    async fn after_mutation(&self, table: &str) {
        if let Err(e) = self.invalidate_table(table).await {
            warn!("Cache invalidation for {} failed: {}", table, e);
            self.metrics.record_error(table, &e.to_string());
        }
    }
}

fn decode_rows<T: CatalogEntity>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            let entity: T = serde_json::from_value(row)?;
            entity.validate()?;
            Ok(entity)
        })
        .collect()
}
