use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderStatus, ProductId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Result, StoreError,
    order::{
        CreatedOrder, NewOrder, NewOrderItem, NewProduct, OrderItemRecord, OrderRecord, OrderStore,
        validate_items_for_create,
    },
};

/// PostgreSQL-backed order store implementation.
///
/// Order creation runs as one scoped transaction: header insert, item
/// inserts, then guarded stock decrements. Any failure drops the
/// transaction without committing, rolling back every prior write.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_header(row: &PgRow) -> Result<OrderRecord> {
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status
            .parse()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        Ok(OrderRecord {
            id: OrderId::new(row.try_get("id")?),
            order_number: row.try_get("order_number")?,
            customer_id: row.try_get("customer_id")?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            customer_phone: row.try_get("customer_phone")?,
            delivery_address: row.try_get("delivery_address")?,
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            status,
            payment_evidence_url: row.try_get("payment_evidence_url")?,
            admin_note: row.try_get("admin_note")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            items: Vec::new(),
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItemRecord> {
        Ok(OrderItemRecord {
            id: row.try_get("id")?,
            product_id: row.try_get::<Option<i64>, _>("product_id")?.map(ProductId::new),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        })
    }

    async fn items_for_order(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, product_name, quantity, unit_price_cents, subtotal_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_item).collect()
    }
}

/// Guarded stock decrement. Zero rows affected means the guard refused the
/// update; a follow-up existence check tells oversell apart from a missing
/// product. Either way the error aborts the enclosing transaction.
async fn decrement_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    quantity: u32,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - $2, updated_at = now()
        WHERE id = $1 AND stock >= $2
        "#,
    )
    .bind(product_id.as_i64())
    .bind(quantity as i32)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1")
            .bind(product_id.as_i64())
            .fetch_optional(&mut **tx)
            .await?;

        return Err(match exists {
            Some(_) => StoreError::InsufficientStock {
                product_id,
                requested: quantity,
            },
            None => StoreError::ProductNotFound(product_id),
        });
    }

    Ok(())
}

fn map_header_insert_error(e: sqlx::Error, order_number: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some("orders_order_number_unique")
    {
        return StoreError::OrderNumberConflict {
            order_number: order_number.to_string(),
        };
    }
    StoreError::Database(e)
}

fn map_item_insert_error(e: sqlx::Error, product_id: Option<ProductId>) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some("order_items_product_id_fkey")
        && let Some(product_id) = product_id
    {
        return StoreError::ProductNotFound(product_id);
    }
    StoreError::Database(e)
}

#[async_trait::async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order, items), fields(order_number = %order.order_number))]
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<CreatedOrder> {
        validate_items_for_create(&items)?;

        let mut tx = self.pool.begin().await?;

        // Header first: item rows and decrements depend on its identity.
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                order_number, customer_id, customer_name, customer_email,
                customer_phone, delivery_address, total_amount_cents, status,
                payment_evidence_url, admin_note
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&order.order_number)
        .bind(order.customer_id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(&order.delivery_address)
        .bind(order.total_amount.cents())
        .bind(OrderStatus::Pending.as_str())
        .bind(&order.payment_evidence_url)
        .bind(&order.admin_note)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_header_insert_error(e, &order.order_number))?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, product_id, product_name, quantity,
                    unit_price_cents, subtotal_cents
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id)
            .bind(item.product_id.map(|p| p.as_i64()))
            .bind(&item.product_name)
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .bind(item.subtotal.cents())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_item_insert_error(e, item.product_id))?;
        }

        for item in &items {
            if let Some(product_id) = item.product_id {
                decrement_stock(&mut tx, product_id, item.quantity).await?;
            }
        }

        tx.commit().await?;

        Ok(CreatedOrder {
            id: OrderId::new(id),
            order_number: order.order_number,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_number, customer_id, customer_name, customer_email,
                   customer_phone, delivery_address, total_amount_cents, status,
                   payment_evidence_url, admin_note, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let mut record = Self::row_to_header(&row)?;
                record.items = self.items_for_order(record.id).await?;
                Ok(Some(record))
            }
        }
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, customer_id, customer_name, customer_email,
                   customer_phone, delivery_address, total_amount_cents, status,
                   payment_evidence_url, admin_note, created_at, updated_at
            FROM orders
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = Self::row_to_header(row)?;
            record.items = self.items_for_order(record.id).await?;
            records.push(record);
        }
        Ok(records)
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<ProductId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (name, price_cents, stock) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProductId::new(id))
    }

    async fn product_name(&self, id: ProductId) -> Result<Option<String>> {
        let name = sqlx::query_scalar("SELECT name FROM products WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    async fn product_stock(&self, id: ProductId) -> Result<Option<i32>> {
        let stock = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        Ok(stock)
    }
}
