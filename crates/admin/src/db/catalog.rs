//! Catalog writes: products, categories and their sub-categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use bazaar_core::{
    Category, CategoryId, CategoryTree, PageRequest, Paginated, PriceLine, PricingPolicy, Product,
    ProductId, SubCategory, SubCategoryId, Totals,
};

use super::{RepositoryError, conflict_on_constraint, contains_pattern};

const PRODUCT_SLUG_TAKEN: &str = "Product slug already exists";
const CATEGORY_SLUG_TAKEN: &str = "Category or sub-category slug already exists";
const CATEGORY_IN_USE: &str = "Category has products and cannot be deleted";

/// Validated product fields for create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub slug: String,
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub brand: String,
    pub description: String,
    pub images: Vec<String>,
    pub stock: i32,
    pub price: Decimal,
    pub is_featured: bool,
    pub banner: Option<String>,
    pub discount_percentage: i32,
    pub discount_end_date: Option<DateTime<Utc>>,
}

/// A sub-category in a category form. `id` keeps an existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubCategoryInput {
    pub id: Option<SubCategoryId>,
    pub name: String,
    pub slug: String,
}

/// Validated category fields with the full sub-category set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    pub images: Vec<String>,
    pub sub_categories: Vec<SubCategoryInput>,
}

/// A row in the category listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub sub_category_count: i64,
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    category_id: Uuid,
    sub_category_id: Option<Uuid>,
    brand: String,
    description: String,
    images: Vec<String>,
    stock: i32,
    price: Decimal,
    rating: Decimal,
    num_reviews: i32,
    is_featured: bool,
    banner: Option<String>,
    discount_percentage: i32,
    discount_end_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug: row.slug,
            category_id: CategoryId::new(row.category_id),
            sub_category_id: row.sub_category_id.map(SubCategoryId::new),
            brand: row.brand,
            description: row.description,
            images: row.images,
            stock: row.stock,
            price: row.price,
            rating: row.rating,
            num_reviews: row.num_reviews,
            is_featured: row.is_featured,
            banner: row.banner,
            discount_percentage: row.discount_percentage,
            discount_end_date: row.discount_end_date,
            created_at: row.created_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, slug, category_id, sub_category_id, brand, description, \
     images, stock, price, rating, num_reviews, is_featured, banner, discount_percentage, \
     discount_end_date, created_at";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    images: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
            images: row.images,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategorySummaryRow {
    #[sqlx(flatten)]
    category: CategoryRow,
    sub_category_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SubCategoryRow {
    id: Uuid,
    category_id: Uuid,
    name: String,
    slug: String,
}

impl From<SubCategoryRow> for SubCategory {
    fn from(row: SubCategoryRow) -> Self {
        Self {
            id: SubCategoryId::new(row.id),
            category_id: CategoryId::new(row.category_id),
            name: row.name,
            slug: row.slug,
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// Product CRUD.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Products newest first, optionally filtered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Paginated<Product>, RepositoryError> {
        let pattern = query.map(contains_pattern);

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE $1::text IS NULL OR name ILIKE $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE $1::text IS NULL OR name ILIKE $1",
        )
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(Paginated::new(
            rows.into_iter().map(Product::from).collect(),
            count,
            page,
        ))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has `id`.
    pub async fn get(&self, id: ProductId) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?
        .map(Product::from)
        .ok_or(RepositoryError::NotFound)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the
    /// category does not exist.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        self.check_sub_category(input).await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (name, slug, category_id, sub_category_id, brand, description, \
                 images, stock, price, is_featured, banner, discount_percentage, discount_end_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.category_id.as_uuid())
        .bind(input.sub_category_id.map(|id| id.as_uuid()))
        .bind(&input.brand)
        .bind(&input.description)
        .bind(&input.images)
        .bind(input.stock)
        .bind(input.price)
        .bind(input.is_featured)
        .bind(input.banner.as_deref())
        .bind(input.discount_percentage)
        .bind(input.discount_end_date)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, PRODUCT_SLUG_TAKEN))?;

        Ok(row.into())
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has `id`, or
    /// `RepositoryError::Conflict` on a slug or category conflict.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        self.check_sub_category(input).await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET name = $2, slug = $3, category_id = $4, sub_category_id = $5, \
                 brand = $6, description = $7, images = $8, stock = $9, price = $10, \
                 is_featured = $11, banner = $12, discount_percentage = $13, \
                 discount_end_date = $14, updated_at = NOW() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.category_id.as_uuid())
        .bind(input.sub_category_id.map(|id| id.as_uuid()))
        .bind(&input.brand)
        .bind(&input.description)
        .bind(&input.images)
        .bind(input.stock)
        .bind(input.price)
        .bind(input.is_featured)
        .bind(input.banner.as_deref())
        .bind(input.discount_percentage)
        .bind(input.discount_end_date)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_constraint(e, PRODUCT_SLUG_TAKEN))?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a product and reprice every cart that held it.
    ///
    /// Cart lines go with the product; the carts' stored totals are
    /// recomputed under `policy` in the same transaction. Returns the number
    /// of carts repriced.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has `id`.
    pub async fn delete(
        &self,
        id: ProductId,
        policy: &PricingPolicy,
    ) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let carts: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM carts \
             WHERE id IN (SELECT cart_id FROM cart_items WHERE product_id = $1) \
             ORDER BY id FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        for &cart_id in &carts {
            reprice_cart(&mut tx, cart_id, policy).await?;
        }

        tx.commit().await?;
        Ok(carts.len())
    }

    /// A sub-category must belong to the product's category.
    async fn check_sub_category(&self, input: &ProductInput) -> Result<(), RepositoryError> {
        let Some(sub_id) = input.sub_category_id else {
            return Ok(());
        };

        let matches: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM sub_categories WHERE id = $1 AND category_id = $2)",
        )
        .bind(sub_id.as_uuid())
        .bind(input.category_id.as_uuid())
        .fetch_one(self.pool)
        .await?;

        if matches {
            Ok(())
        } else {
            Err(RepositoryError::Conflict(
                "Sub-category does not belong to the category".to_owned(),
            ))
        }
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Category CRUD. Sub-categories are written as part of their category.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories by name, with sub-category counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategorySummaryRow>(
            "SELECT c.id, c.name, c.slug, c.images, c.created_at, \
                    COUNT(s.id) AS sub_category_count \
             FROM categories c LEFT JOIN sub_categories s ON s.category_id = c.id \
             GROUP BY c.id ORDER BY c.name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CategorySummary {
                category: row.category.into(),
                sub_category_count: row.sub_category_count,
            })
            .collect())
    }

    /// A category with its sub-categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no category has `id`.
    pub async fn get(&self, id: CategoryId) -> Result<CategoryTree, RepositoryError> {
        let category = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, images, created_at FROM categories WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let subs = sqlx::query_as::<_, SubCategoryRow>(
            "SELECT id, category_id, name, slug FROM sub_categories \
             WHERE category_id = $1 ORDER BY name",
        )
        .bind(id.as_uuid())
        .fetch_all(self.pool)
        .await?;

        Ok(CategoryTree {
            category: category.into(),
            sub_categories: subs.into_iter().map(SubCategory::from).collect(),
        })
    }

    /// Insert a category and its sub-categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any slug is taken.
    pub async fn create(&self, input: &CategoryInput) -> Result<CategoryTree, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO categories (name, slug, images) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.images)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_constraint(e, CATEGORY_SLUG_TAKEN))?;

        for sub in &input.sub_categories {
            insert_sub_category(&mut tx, id, sub).await?;
        }

        tx.commit().await?;
        self.get(CategoryId::new(id)).await
    }

    /// Update a category and replace its sub-category set.
    ///
    /// Sub-categories with an `id` are updated in place; rows missing from
    /// `input` are deleted and products pointing at them lose the link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no category has `id`, or
    /// `RepositoryError::Conflict` if any slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<CategoryTree, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE categories SET name = $2, slug = $3, images = $4 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.images)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_constraint(e, CATEGORY_SLUG_TAKEN))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let kept: Vec<Uuid> = input
            .sub_categories
            .iter()
            .filter_map(|sub| sub.id.map(|id| id.as_uuid()))
            .collect();

        sqlx::query("DELETE FROM sub_categories WHERE category_id = $1 AND id <> ALL($2)")
            .bind(id.as_uuid())
            .bind(&kept)
            .execute(&mut *tx)
            .await?;

        for sub in &input.sub_categories {
            match sub.id {
                Some(sub_id) => {
                    let result = sqlx::query(
                        "UPDATE sub_categories SET name = $3, slug = $4 \
                         WHERE id = $1 AND category_id = $2",
                    )
                    .bind(sub_id.as_uuid())
                    .bind(id.as_uuid())
                    .bind(&sub.name)
                    .bind(&sub.slug)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| conflict_on_constraint(e, CATEGORY_SLUG_TAKEN))?;

                    if result.rows_affected() == 0 {
                        return Err(RepositoryError::Conflict(format!(
                            "Sub-category {sub_id} does not belong to this category"
                        )));
                    }
                }
                None => insert_sub_category(&mut tx, id.as_uuid(), sub).await?,
            }
        }

        tx.commit().await?;
        self.get(id).await
    }

    /// Delete a category and its sub-categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` while products reference the
    /// category, or `RepositoryError::NotFound` if no category has `id`.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool)
            .await
            .map_err(|e| conflict_on_constraint(e, CATEGORY_IN_USE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn insert_sub_category(
    tx: &mut Transaction<'_, Postgres>,
    category_id: Uuid,
    sub: &SubCategoryInput,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO sub_categories (category_id, name, slug) VALUES ($1, $2, $3)")
        .bind(category_id)
        .bind(&sub.name)
        .bind(&sub.slug)
        .execute(&mut **tx)
        .await
        .map_err(|e| conflict_on_constraint(e, CATEGORY_SLUG_TAKEN))?;
    Ok(())
}

/// Recompute a cart's stored totals from its remaining lines.
async fn reprice_cart(
    tx: &mut Transaction<'_, Postgres>,
    cart_id: Uuid,
    policy: &PricingPolicy,
) -> Result<(), sqlx::Error> {
    let rows: Vec<(Uuid, String, String, String, i32, Decimal)> = sqlx::query_as(
        "SELECT product_id, name, slug, image, qty, price FROM cart_items WHERE cart_id = $1",
    )
    .bind(cart_id)
    .fetch_all(&mut **tx)
    .await?;

    let lines: Vec<PriceLine> = rows
        .into_iter()
        .map(|(product_id, name, slug, image, qty, price)| PriceLine {
            product_id: ProductId::new(product_id),
            name,
            slug,
            image,
            qty,
            price,
        })
        .collect();
    let totals = Totals::compute(&lines, policy);

    sqlx::query(
        "UPDATE carts SET items_price = $2, shipping_price = $3, tax_price = $4, \
             total_price = $5, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(cart_id)
    .bind(totals.items_price)
    .bind(totals.shipping_price)
    .bind(totals.tax_price)
    .bind(totals.total_price)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
