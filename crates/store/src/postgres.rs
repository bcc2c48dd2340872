use async_trait::async_trait;
use common::{CartId, CartLineId, Money, OrderId, OrderLineId, ProductId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Cart, CartLine, Order, OrderLine, Product, Result, StoreError, User,
    store::{Store, same_lines},
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

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            token: row.try_get("token")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            category: row.try_get("category")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_cart(row: PgRow) -> Result<Cart> {
        Ok(Cart {
            id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_cart_line(row: PgRow) -> Result<CartLine> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::InvalidRow(format!("negative cart quantity {quantity}")))?;

        Ok(CartLine {
            id: CartLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_order_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            id: OrderLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            price: Money::from_cents(row.try_get("price_cents")?),
        })
    }
}

/// Maps unique violations to `StoreError::UniqueViolation`, everything else to `Database`.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
        && let Some(constraint) = db_err.constraint()
    {
        return StoreError::UniqueViolation {
            constraint: constraint.to_string(),
        };
    }
    StoreError::Database(e)
}

fn quantity_to_db(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::InvalidRow(format!("cart quantity {quantity} out of range")))
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, token, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.token)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, token, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, token, created_at
            FROM users
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn set_user_token(&self, user_id: UserId, token: &str) -> Result<()> {
        sqlx::query("UPDATE users SET token = $2 WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, password_hash, token, created_at
            FROM users
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, category, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, category, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn find_products(&self, product_ids: &[ProductId]) -> Result<Vec<Product>> {
        let ids: Vec<Uuid> = product_ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, category, created_at
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, category, created_at
            FROM products
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart> {
        // The unique constraint on user_id turns a concurrent create into a no-op.
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(CartId::new().as_uuid())
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        let row = sqlx::query("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_cart(row)
    }

    async fn find_cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn find_cart(&self, cart_id: CartId, user_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query(
            "SELECT id, user_id, created_at FROM carts WHERE id = $1 AND user_id = $2",
        )
        .bind(cart_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, cart_id, product_id, quantity
            FROM cart_lines
            WHERE cart_id = $1
            ORDER BY added_at ASC, id ASC
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_cart_line).collect()
    }

    async fn find_cart_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>> {
        let row = sqlx::query(
            r#"
            SELECT id, cart_id, product_id, quantity
            FROM cart_lines
            WHERE cart_id = $1 AND product_id = $2
            "#,
        )
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart_line).transpose()
    }

    async fn insert_cart_line(&self, line: &CartLine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_lines (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.cart_id.as_uuid())
        .bind(line.product_id.as_uuid())
        .bind(quantity_to_db(line.quantity)?)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn update_cart_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<()> {
        sqlx::query("UPDATE cart_lines SET quantity = $2 WHERE id = $1")
            .bind(line_id.as_uuid())
            .bind(quantity_to_db(quantity)?)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_cart_line(&self, cart_id: CartId, product_id: ProductId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id.as_uuid())
            .bind(product_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit_order(
        &self,
        order: &Order,
        lines: &[OrderLine],
        cart_id: CartId,
        consumed: &[CartLine],
    ) -> Result<()> {
        // Dropping the transaction without commit rolls everything back.
        let mut tx = self.pool.begin().await?;

        // Holding the cart row blocks new lines (their FK check needs a share
        // lock on it); holding the line rows blocks quantity updates.
        let locked = sqlx::query("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
            .bind(cart_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            tracing::warn!(%cart_id, "cart vanished before order commit, rolling back");
            return Err(StoreError::CartNotFound(cart_id));
        }

        let current = sqlx::query(
            r#"
            SELECT id, cart_id, product_id, quantity
            FROM cart_lines
            WHERE cart_id = $1
            FOR UPDATE
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Self::row_to_cart_line)
        .collect::<Result<Vec<_>>>()?;

        if !same_lines(&current, consumed) {
            tracing::warn!(%cart_id, "cart lines changed before order commit, rolling back");
            return Err(StoreError::CartChanged(cart_id));
        }

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_cents, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.total.cents())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in lines.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| StoreError::InvalidRow("too many order lines".to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO order_lines (id, order_id, product_id, price_cents, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(line.price.cents())
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, total_cents, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn find_order(&self, order_id: OrderId, user_id: UserId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, total_cents, created_at
            FROM orders
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, price_cents
            FROM order_lines
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order_line).collect()
    }
}
