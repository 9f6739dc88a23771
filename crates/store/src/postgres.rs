use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{
    BuyerId, CatalogSnapshot, Money, Order, OrderEvent, OrderItem, OrderParts, OrderStatus,
    Product, ProductId, ProductStatus, SellerShippingSettings, Shipment, ShipmentStatus,
    ShippingAddress, StoreId,
};
use sqlx::{Executor, PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CatalogReader, OrderRepository, OrderStatusChange, StockLedger, quantities_by_product},
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts or replaces a product.
    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, store_id, name, price, stock, weight_gram, status, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (id) DO UPDATE SET
                store_id = EXCLUDED.store_id,
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                stock = EXCLUDED.stock,
                weight_gram = EXCLUDED.weight_gram,
                status = EXCLUDED.status,
                updated_at = NOW()
            "#,
        )
        .bind(product.id.as_str())
        .bind(product.store_id.as_str())
        .bind(&product.name)
        .bind(product.price.minor_units())
        .bind(i64::from(product.stock))
        .bind(i64::from(product.weight_gram))
        .bind(product.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Saves a seller's shipping settings.
    pub async fn set_shipping_settings(&self, settings: &SellerShippingSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seller_shipping_settings (store_id, origin_postal_code, enabled_couriers)
            VALUES ($1, $2, $3)
            ON CONFLICT (store_id) DO UPDATE SET
                origin_postal_code = EXCLUDED.origin_postal_code,
                enabled_couriers = EXCLUDED.enabled_couriers
            "#,
        )
        .bind(settings.store_id.as_str())
        .bind(&settings.origin_postal_code)
        .bind(&settings.enabled_couriers)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns a product as currently stored.
    pub async fn product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, store_id, name, price, stock, weight_gram, status
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let status: String = row.try_get("status")?;
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            store_id: StoreId::new(row.try_get::<String, _>("store_id")?),
            name: row.try_get("name")?,
            price: Money::from_minor(row.try_get("price")?),
            stock: to_u32(row.try_get("stock")?, "products.stock")?,
            weight_gram: to_u32(row.try_get("weight_gram")?, "products.weight_gram")?,
            status: ProductStatus::parse(&status)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown product status {status}")))?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: to_u32(row.try_get("quantity")?, "order_items.quantity")?,
            unit_price: Money::from_minor(row.try_get("unit_price")?),
        })
    }

    fn row_to_order(row: PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let shipping_address: ShippingAddress =
            serde_json::from_value(row.try_get("shipping_address")?)?;
        let shipment_status: String = row.try_get("shipment_status")?;
        let shipment = Shipment {
            courier: shipping_address.courier.clone(),
            tracking_code: row.try_get("tracking_code")?,
            status: ShipmentStatus::parse(&shipment_status).ok_or_else(|| {
                StoreError::Corrupt(format!("unknown shipment status {shipment_status}"))
            })?,
            estimated_delivery: shipping_address.duration.clone(),
        };

        Ok(Order::from_parts(OrderParts {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            buyer_id: BuyerId::new(row.try_get::<String, _>("buyer_id")?),
            store_id: StoreId::new(row.try_get::<String, _>("store_id")?),
            status: parse_status(&row.try_get::<String, _>("status")?)?,
            items,
            total_amount: Money::from_minor(row.try_get("total_amount")?),
            discount_amount: Money::from_minor(row.try_get("discount_amount")?),
            shipping_address,
            shipment,
            last_gateway_event_id: row.try_get("last_gateway_event_id")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    fn row_to_change(row: PgRow) -> Result<OrderStatusChange> {
        let from_status: Option<String> = row.try_get("from_status")?;
        Ok(OrderStatusChange {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            event_type: row.try_get("event_type")?,
            from_status: from_status.as_deref().map(parse_status).transpose()?,
            to_status: parse_status(&row.try_get::<String, _>("to_status")?)?,
            gateway_event_id: row.try_get("gateway_event_id")?,
            tracking_code: row.try_get("tracking_code")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }

    async fn append_change(
        tx: &mut Transaction<'_, Postgres>,
        change: &OrderStatusChange,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_status_changes
                (order_id, event_type, from_status, to_status, gateway_event_id, tracking_code, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(change.order_id.as_uuid())
        .bind(&change.event_type)
        .bind(change.from_status.map(|s| s.as_str()))
        .bind(change.to_status.as_str())
        .bind(&change.gateway_event_id)
        .bind(&change.tracking_code)
        .bind(change.recorded_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Tells a lost compare-and-set apart from a missing order.
    async fn conflict_or_missing(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        expected_version: i64,
    ) -> Result<StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(order_id.as_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(if exists {
            StoreError::ConcurrencyConflict {
                order_id,
                expected_version,
            }
        } else {
            StoreError::OrderNotFound(order_id)
        })
    }
}

#[async_trait]
impl CatalogReader for PostgresStore {
    async fn snapshot(&self, product_ids: &[ProductId]) -> Result<CatalogSnapshot> {
        let ids: Vec<String> = product_ids.iter().map(|id| id.as_str().to_string()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id, store_id, name, price, stock, weight_gram, status
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let products = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<Result<Vec<_>>>()?;
        Ok(CatalogSnapshot::from_products(products))
    }

    async fn shipping_settings(
        &self,
        store_id: &StoreId,
    ) -> Result<Option<SellerShippingSettings>> {
        let row = sqlx::query(
            r#"
            SELECT store_id, origin_postal_code, enabled_couriers
            FROM seller_shipping_settings
            WHERE store_id = $1
            "#,
        )
        .bind(store_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(SellerShippingSettings {
                store_id: StoreId::new(row.try_get::<String, _>("store_id")?),
                origin_postal_code: row.try_get("origin_postal_code")?,
                enabled_couriers: row.try_get("enabled_couriers")?,
            })),
            None => Ok(None),
        }
    }
}

/// Conditional decrement: matches no row unless enough stock remains.
///
/// Runs on the pool for a standalone decrement or inside the checkout
/// transaction.
async fn take_stock<'e, E>(executor: E, product_id: &ProductId, quantity: u32) -> Result<()>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - $1, updated_at = NOW()
        WHERE id = $2 AND stock >= $1
        "#,
    )
    .bind(i64::from(quantity))
    .bind(product_id.as_str())
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        metrics::counter!("stock_decrement_rejected").increment(1);
        tracing::debug!(%product_id, quantity, "stock decrement rejected");
        return Err(StoreError::InsufficientStock {
            product_id: product_id.clone(),
            requested: quantity,
        });
    }
    Ok(())
}

#[async_trait]
impl StockLedger for PostgresStore {
    async fn decrement_stock(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        take_stock(&self.pool, product_id, quantity).await
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn place_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrements first; returning early drops the
        // transaction, which rolls everything back.
        for (product_id, quantity) in quantities_by_product(order) {
            take_stock(&mut *tx, &product_id, quantity).await?;
        }

        let shipment = order.shipment();
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, buyer_id, store_id, status, total_amount, discount_amount,
                shipping_address, tracking_code, shipment_status, last_gateway_event_id,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.buyer_id().as_str())
        .bind(order.store_id().as_str())
        .bind(order.status().as_str())
        .bind(order.total_amount().minor_units())
        .bind(order.discount_amount().minor_units())
        .bind(serde_json::to_value(order.shipping_address())?)
        .bind(&shipment.tracking_code)
        .bind(shipment.status.as_str())
        .bind(order.last_gateway_event_id())
        .bind(order.version())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, quantity, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_str())
            .bind(&item.product_name)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.minor_units())
            .bind(item.subtotal().minor_units())
            .execute(&mut *tx)
            .await?;
        }

        let change = OrderStatusChange::from_event(order.id(), None, &order.placed_event());
        Self::append_change(&mut tx, &change).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, buyer_id, store_id, status, total_amount, discount_amount,
                   shipping_address, tracking_code, shipment_status, last_gateway_event_id,
                   version, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query(
            r#"
            SELECT product_id, product_name, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Self::row_to_item)
        .collect::<Result<Vec<_>>>()?;

        Self::row_to_order(row, items).map(Some)
    }

    async fn save_transition(
        &self,
        order: &Order,
        from: OrderStatus,
        expected_version: i64,
        event: &OrderEvent,
    ) -> Result<()> {
        let order_id = order.id();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $1, tracking_code = $2, shipment_status = $3,
                last_gateway_event_id = $4, version = $5, updated_at = $6
            WHERE id = $7 AND version = $8
            "#,
        )
        .bind(order.status().as_str())
        .bind(&order.shipment().tracking_code)
        .bind(order.shipment().status.as_str())
        .bind(order.last_gateway_event_id())
        .bind(order.version())
        .bind(order.updated_at())
        .bind(order_id.as_uuid())
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::conflict_or_missing(&mut tx, order_id, expected_version).await?);
        }

        let change = OrderStatusChange::from_event(order_id, Some(from), event);
        Self::append_change(&mut tx, &change).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn record_gateway_event(
        &self,
        order_id: OrderId,
        expected_version: i64,
        gateway_event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET last_gateway_event_id = $1, updated_at = $2, version = version + 1
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(gateway_event_id)
        .bind(at)
        .bind(order_id.as_uuid())
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::conflict_or_missing(&mut tx, order_id, expected_version).await?);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, order_id: OrderId) -> Result<Vec<OrderStatusChange>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, event_type, from_status, to_status, gateway_event_id, tracking_code, recorded_at
            FROM order_status_changes
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_change).collect()
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn parse_status(value: &str) -> Result<OrderStatus> {
    OrderStatus::parse(value)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown order status {value}")))
}
