use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewProduct, Product, ProductChanges};

const PRODUCT_COLUMNS: &str = "id, nombre, descripcion, precio, stock, categoria, imagen";

/// Plain CRUD over `productos`.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Product>, DatabaseError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM productos ORDER BY id");
        Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn select_404(&self, id: i64) -> Result<Product, DatabaseError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM productos WHERE id = $1");
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Product {} not found", id)))
    }

    pub async fn create(&self, product: NewProduct) -> Result<Product, DatabaseError> {
        let sql = format!(
            "INSERT INTO productos (nombre, descripcion, precio, stock, categoria, imagen) \
             VALUES ($1, $2, $3, COALESCE($4, 0), $5, $6) RETURNING {PRODUCT_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Product>(&sql)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.stock)
            .bind(&product.category)
            .bind(&product.image)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    pub async fn update(&self, id: i64, changes: ProductChanges) -> Result<Product, DatabaseError> {
        let sql = format!(
            "UPDATE productos SET \
                nombre = COALESCE($1, nombre), \
                descripcion = COALESCE($2, descripcion), \
                precio = COALESCE($3, precio), \
                stock = COALESCE($4, stock), \
                categoria = COALESCE($5, categoria), \
                imagen = COALESCE($6, imagen) \
             WHERE id = $7 RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(changes.price)
            .bind(changes.stock)
            .bind(&changes.category)
            .bind(&changes.image)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Product {} not found", id)))
    }

    pub async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM productos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Product {} not found", id)));
        }
        Ok(())
    }
}
