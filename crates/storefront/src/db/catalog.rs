//! Catalog reads: product listings, product detail and category navigation.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use bazaar_core::{
    Availability, Category, CategoryId, CategoryTree, PageRequest, Paginated, Product, ProductId,
    ProductSort, SubCategory, SubCategoryId,
};

use super::RepositoryError;

/// Products shown in the "latest" strip.
pub const LATEST_LIMIT: i64 = 6;
/// Products shown in the "featured" strip.
pub const FEATURED_LIMIT: i64 = 4;
/// Related products shown on a product page.
pub const RELATED_LIMIT: i64 = 4;
/// Categories shown on the homepage.
pub const HOMEPAGE_CATEGORY_LIMIT: i64 = 6;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
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

pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.category_id, p.sub_category_id, \
     p.brand, p.description, p.images, p.stock, p.price, p.rating, p.num_reviews, \
     p.is_featured, p.banner, p.discount_percentage, p.discount_end_date, p.created_at";

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
// Filters
// =============================================================================

/// Conditions for a product listing. `None` disables a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub query: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Sub-category slug.
    pub subcategory: Option<String>,
    /// Inclusive price range.
    pub price: Option<(Decimal, Decimal)>,
    /// Minimum rating.
    pub rating: Option<Decimal>,
    pub availability: Option<Availability>,
    pub sort: ProductSort,
}

impl ProductFilter {
    /// Append `WHERE` conditions for this filter.
    ///
    /// The builder must already select from `products p` joined to
    /// `categories c` and left-joined to `sub_categories s`.
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(query) = &self.query {
            qb.push(" AND p.name ILIKE ")
                .push_bind(format!("%{}%", escape_like(query)));
        }
        if let Some(category) = &self.category {
            qb.push(" AND c.slug = ").push_bind(category.clone());
        }
        if let Some(subcategory) = &self.subcategory {
            qb.push(" AND s.slug = ").push_bind(subcategory.clone());
        }
        if let Some((min, max)) = self.price {
            qb.push(" AND p.price BETWEEN ")
                .push_bind(min)
                .push(" AND ")
                .push_bind(max);
        }
        if let Some(rating) = self.rating {
            qb.push(" AND p.rating >= ").push_bind(rating);
        }
        match self.availability {
            Some(Availability::InStock) => {
                qb.push(" AND p.stock > 0");
            }
            Some(Availability::OutOfStock) => {
                qb.push(" AND p.stock = 0");
            }
            None => {}
        }
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

const LISTING_FROM: &str = " FROM products p \
     JOIN categories c ON c.id = p.category_id \
     LEFT JOIN sub_categories s ON s.id = p.sub_category_id";

/// A product together with its category and sub-category.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Category,
    pub sub_category: Option<SubCategory>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, sorted and paginated product listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Paginated<Product>, RepositoryError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        count_qb.push(LISTING_FROM);
        filter.push_conditions(&mut count_qb);
        let count: i64 = count_qb.build_query_scalar().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(PRODUCT_COLUMNS).push(LISTING_FROM);
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(self.pool).await?;

        Ok(Paginated::new(
            rows.into_iter().map(Product::from).collect(),
            count,
            page,
        ))
    }

    /// Newest products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p ORDER BY p.created_at DESC LIMIT $1"
        ))
        .bind(LATEST_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Featured products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             WHERE p.is_featured ORDER BY p.created_at DESC LIMIT $1"
        ))
        .bind(FEATURED_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// The running deal: a discounted product whose discount has not ended.
    ///
    /// When several qualify, the one ending soonest wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn deal(&self) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             WHERE p.discount_percentage > 0 AND p.discount_end_date > NOW() \
             ORDER BY p.discount_end_date ASC, p.id LIMIT 1"
        ))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// A product with its category and sub-category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };
        let product = Product::from(row);

        let category = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, images, created_at FROM categories WHERE id = $1",
        )
        .bind(product.category_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!("product {} has no category", product.id))
        })?;

        let sub_category = match product.sub_category_id {
            Some(id) => sqlx::query_as::<_, SubCategoryRow>(
                "SELECT id, category_id, name, slug FROM sub_categories WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(SubCategory::from),
            None => None,
        };

        Ok(Some(ProductDetail {
            product,
            category: category.into(),
            sub_category,
        }))
    }

    /// Up to four other products from the same category, starting at a random
    /// offset so the strip varies between visits.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn related(&self, product: &Product) -> Result<Vec<Product>, RepositoryError> {
        let others: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE category_id = $1 AND id <> $2",
        )
        .bind(product.category_id)
        .bind(product.id)
        .fetch_one(self.pool)
        .await?;

        let max_offset = (others - RELATED_LIMIT).max(0);
        let offset = if max_offset == 0 {
            0
        } else {
            rand::rng().random_range(0..=max_offset)
        };

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             WHERE p.category_id = $1 AND p.id <> $2 \
             ORDER BY p.created_at DESC, p.id LIMIT $3 OFFSET $4"
        ))
        .bind(product.category_id)
        .bind(product.id)
        .bind(RELATED_LIMIT)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Every category with its sub-categories, both ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn category_tree(&self) -> Result<Vec<CategoryTree>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, images, created_at FROM categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        let subs = sqlx::query_as::<_, SubCategoryRow>(
            "SELECT id, category_id, name, slug FROM sub_categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(assemble_tree(categories, subs))
    }

    /// Categories for the homepage grid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn homepage_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, images, created_at FROM categories \
             WHERE cardinality(images) > 0 ORDER BY name LIMIT $1",
        )
        .bind(HOMEPAGE_CATEGORY_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// A category and its sub-categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CategoryTree>, RepositoryError> {
        let Some(category) = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, images, created_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let subs = sqlx::query_as::<_, SubCategoryRow>(
            "SELECT id, category_id, name, slug FROM sub_categories \
             WHERE category_id = $1 ORDER BY name",
        )
        .bind(category.id)
        .fetch_all(self.pool)
        .await?;

        Ok(assemble_tree(vec![category], subs).into_iter().next())
    }
}

/// Attach sub-categories to their parents, keeping both input orders.
fn assemble_tree(categories: Vec<CategoryRow>, subs: Vec<SubCategoryRow>) -> Vec<CategoryTree> {
    let subs: Vec<SubCategory> = subs.into_iter().map(SubCategory::from).collect();
    categories
        .into_iter()
        .map(|row| {
            let category = Category::from(row);
            let sub_categories = subs
                .iter()
                .filter(|s| s.category_id == category.id)
                .cloned()
                .collect();
            CategoryTree {
                category,
                sub_categories,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("kurta"), "kurta");
    }

    #[test]
    fn test_push_conditions_binds_each_filter() {
        let filter = ProductFilter {
            query: Some("lawn".to_owned()),
            category: Some("women".to_owned()),
            subcategory: None,
            price: Some((Decimal::ONE, Decimal::ONE_HUNDRED)),
            rating: Some(Decimal::from(4)),
            availability: Some(Availability::InStock),
            sort: ProductSort::PriceAsc,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        qb.push(LISTING_FROM);
        filter.push_conditions(&mut qb);
        let sql = qb.sql();
        assert!(sql.contains("p.name ILIKE $1"));
        assert!(sql.contains("c.slug = $2"));
        assert!(sql.contains("p.price BETWEEN $3 AND $4"));
        assert!(sql.contains("p.rating >= $5"));
        assert!(sql.contains("p.stock > 0"));
        assert!(!sql.contains("s.slug"));
    }

    #[test]
    fn test_assemble_tree_groups_children() {
        let parent = Uuid::new_v4();
        let other = Uuid::new_v4();
        let category = |id, name: &str| CategoryRow {
            id,
            name: name.to_owned(),
            slug: name.to_lowercase(),
            images: vec![],
            created_at: Utc::now(),
        };
        let sub = |category_id, name: &str| SubCategoryRow {
            id: Uuid::new_v4(),
            category_id,
            name: name.to_owned(),
            slug: name.to_lowercase(),
        };
        let tree = assemble_tree(
            vec![category(parent, "Men"), category(other, "Women")],
            vec![sub(parent, "Kurta"), sub(other, "Lawn"), sub(parent, "Shalwar")],
        );
        assert_eq!(tree[0].sub_categories.len(), 2);
        assert_eq!(tree[1].sub_categories[0].name, "Lawn");
    }
}
