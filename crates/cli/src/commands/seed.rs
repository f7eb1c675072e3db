//! Seed the catalog and CMS content from a YAML file.
//!
//! The file is parsed and checked before connecting to the database.
//! Categories, sub-categories, products and pages are upserted on their
//! slug; announcements are inserted once per distinct text. Running the
//! command twice leaves the database unchanged.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use bazaar_admin::services::content::{AnnouncementForm, PageForm};
use bazaar_core::{FieldErrors, parse_amount};

use super::{MissingEnvVar, database_url};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{item}: {errors}")]
    Invalid { item: String, errors: FieldErrors },

    #[error("Product {product}: unknown category {slug}")]
    UnknownCategory { product: String, slug: String },

    #[error("Product {product}: sub-category {slug} is not under its category")]
    UnknownSubCategory { product: String, slug: String },

    #[error("Duplicate slug: {0}")]
    DuplicateSlug(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub pages: Vec<SeedPage>,
    #[serde(default)]
    pub announcements: Vec<SeedAnnouncement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCategory {
    pub name: String,
    pub slug: String,
    pub images: Vec<String>,
    #[serde(default)]
    pub sub_categories: Vec<SeedSubCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedSubCategory {
    pub name: String,
    pub slug: String,
}

/// A product; `category` and `sub_category` are slugs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    pub slug: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub brand: String,
    pub description: String,
    pub images: Vec<String>,
    pub stock: i32,
    pub price: String,
    #[serde(default)]
    pub is_featured: bool,
    pub banner: Option<String>,
    #[serde(default)]
    pub discount_percentage: i32,
    pub discount_end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SeedPage {
    pub slug: String,
    #[serde(flatten)]
    pub form: PageForm,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAnnouncement {
    #[serde(flatten)]
    pub form: AnnouncementForm,
    #[serde(default = "active")]
    pub is_active: bool,
}

const fn active() -> bool {
    true
}

impl SeedFile {
    /// Parse a seed file from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not match the seed format.
    pub fn from_yaml(content: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Check every entry and every slug reference without touching the
    /// database, returning the validated product prices in file order.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn check(&self) -> Result<Vec<Decimal>, SeedError> {
        let mut slugs = HashSet::new();
        let mut subs_by_category: HashMap<&str, HashSet<&str>> = HashMap::new();

        for category in &self.categories {
            let mut errors = FieldErrors::new();
            errors.min_len("name", &category.name, 3, "Name");
            errors.min_len("slug", &category.slug, 3, "Slug");
            if category.images.is_empty() {
                errors.add("images", "At least one image is required");
            }
            invalid(&category.slug, errors)?;
            unique(&mut slugs, "category", &category.slug)?;

            let subs = subs_by_category.entry(category.slug.as_str()).or_default();
            for sub in &category.sub_categories {
                let mut errors = FieldErrors::new();
                errors.min_len("name", &sub.name, 2, "Sub-category name");
                errors.min_len("slug", &sub.slug, 2, "Sub-category slug");
                invalid(&sub.slug, errors)?;
                unique(&mut slugs, "sub-category", &sub.slug)?;
                subs.insert(sub.slug.as_str());
            }
        }

        let mut prices = Vec::with_capacity(self.products.len());
        for product in &self.products {
            let subs = subs_by_category
                .get(product.category.as_str())
                .ok_or_else(|| SeedError::UnknownCategory {
                    product: product.slug.clone(),
                    slug: product.category.clone(),
                })?;
            if let Some(sub) = &product.sub_category
                && !subs.contains(sub.as_str())
            {
                return Err(SeedError::UnknownSubCategory {
                    product: product.slug.clone(),
                    slug: sub.clone(),
                });
            }

            let mut errors = FieldErrors::new();
            errors.min_len("name", &product.name, 3, "Name");
            errors.min_len("slug", &product.slug, 3, "Slug");
            errors.min_len("brand", &product.brand, 3, "Brand");
            errors.min_len("description", &product.description, 10, "Description");
            if product.images.is_empty() {
                errors.add("images", "At least one image is required");
            }
            if product.stock < 0 {
                errors.add("stock", "Stock cannot be a negative number");
            }
            if !(0..=100).contains(&product.discount_percentage) {
                errors.add("discountPercentage", "Discount must be between 0 and 100");
            }
            let price = parse_amount(&product.price);
            if let Err(e) = &price {
                errors.add("price", e.to_string());
            }
            invalid(&product.slug, errors)?;
            unique(&mut slugs, "product", &product.slug)?;

            if let Ok(price) = price {
                prices.push(price);
            }
        }

        for page in &self.pages {
            page.form
                .validate()
                .map_err(|errors| SeedError::Invalid {
                    item: page.slug.clone(),
                    errors,
                })?;
            unique(&mut slugs, "page", &page.slug)?;
        }

        for announcement in &self.announcements {
            announcement
                .form
                .validate()
                .map_err(|errors| SeedError::Invalid {
                    item: "announcement".to_owned(),
                    errors,
                })?;
        }

        Ok(prices)
    }
}

fn invalid(item: &str, errors: FieldErrors) -> Result<(), SeedError> {
    errors.into_result().map_err(|errors| SeedError::Invalid {
        item: item.to_owned(),
        errors,
    })
}

/// Slugs are unique per table.
fn unique<'a>(
    seen: &mut HashSet<(&'static str, &'a str)>,
    kind: &'static str,
    slug: &'a str,
) -> Result<(), SeedError> {
    if seen.insert((kind, slug)) {
        Ok(())
    } else {
        Err(SeedError::DuplicateSlug(format!("{kind} {slug}")))
    }
}

/// Counts of rows written by a seed run.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub categories: usize,
    pub sub_categories: usize,
    pub products: usize,
    pub pages: usize,
    pub announcements_inserted: u64,
}

/// Seed the database from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails its checks, or if
/// any write fails. Writes happen in a single transaction.
pub async fn run(file_path: &str) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading seed file");

    let content = tokio::fs::read_to_string(path).await?;
    let seed = SeedFile::from_yaml(&content)?;
    let prices = seed.check()?;
    info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        pages = seed.pages.len(),
        announcements = seed.announcements.len(),
        "Seed file validated"
    );

    let pool = bazaar_admin::db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let summary = apply(&pool, &seed, &prices).await?;

    info!("Seeding complete!");
    info!("  Categories: {}", summary.categories);
    info!("  Sub-categories: {}", summary.sub_categories);
    info!("  Products: {}", summary.products);
    info!("  Pages: {}", summary.pages);
    info!("  Announcements inserted: {}", summary.announcements_inserted);
    Ok(())
}

/// Write a checked seed file. `prices` comes from [`SeedFile::check`].
///
/// # Errors
///
/// Returns an error if any statement fails; nothing is committed then.
pub async fn apply(
    pool: &PgPool,
    seed: &SeedFile,
    prices: &[Decimal],
) -> Result<SeedSummary, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    let mut category_ids = HashMap::new();
    let mut sub_category_ids = HashMap::new();
    for category in &seed.categories {
        let category_id = upsert_category(&mut tx, category).await?;
        category_ids.insert(category.slug.as_str(), category_id);
        summary.categories += 1;

        for sub in &category.sub_categories {
            let sub_id = upsert_sub_category(&mut tx, category_id, sub).await?;
            sub_category_ids.insert(sub.slug.as_str(), sub_id);
            summary.sub_categories += 1;
        }
    }

    for (product, price) in seed.products.iter().zip(prices) {
        let Some(&category_id) = category_ids.get(product.category.as_str()) else {
            continue;
        };
        let sub_category_id = product
            .sub_category
            .as_deref()
            .and_then(|slug| sub_category_ids.get(slug).copied());
        upsert_product(&mut tx, product, category_id, sub_category_id, *price).await?;
        summary.products += 1;
    }

    for page in &seed.pages {
        let Ok(clean) = page.form.validate() else {
            continue;
        };
        sqlx::query(
            r"
            INSERT INTO cms_pages (slug, title, content)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug)
            DO UPDATE SET title = EXCLUDED.title, content = EXCLUDED.content, updated_at = NOW()
            ",
        )
        .bind(&page.slug)
        .bind(&clean.title)
        .bind(&clean.content)
        .execute(&mut *tx)
        .await?;
        summary.pages += 1;
    }

    for announcement in &seed.announcements {
        let Ok(text) = announcement.form.validate() else {
            continue;
        };
        let result = sqlx::query(
            r"
            INSERT INTO announcements (text, is_active)
            SELECT $1, $2
            WHERE NOT EXISTS (SELECT 1 FROM announcements WHERE text = $1)
            ",
        )
        .bind(text)
        .bind(announcement.is_active)
        .execute(&mut *tx)
        .await?;
        summary.announcements_inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(summary)
}

async fn upsert_category(
    tx: &mut Transaction<'_, Postgres>,
    category: &SeedCategory,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r"
        INSERT INTO categories (name, slug, images)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug)
        DO UPDATE SET name = EXCLUDED.name, images = EXCLUDED.images
        RETURNING id
        ",
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.images)
    .fetch_one(&mut **tx)
    .await
}

async fn upsert_sub_category(
    tx: &mut Transaction<'_, Postgres>,
    category_id: Uuid,
    sub: &SeedSubCategory,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r"
        INSERT INTO sub_categories (category_id, name, slug)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug)
        DO UPDATE SET category_id = EXCLUDED.category_id, name = EXCLUDED.name
        RETURNING id
        ",
    )
    .bind(category_id)
    .bind(&sub.name)
    .bind(&sub.slug)
    .fetch_one(&mut **tx)
    .await
}

async fn upsert_product(
    tx: &mut Transaction<'_, Postgres>,
    product: &SeedProduct,
    category_id: Uuid,
    sub_category_id: Option<Uuid>,
    price: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO products (
            name, slug, category_id, sub_category_id, brand, description, images,
            stock, price, is_featured, banner, discount_percentage, discount_end_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (slug) DO UPDATE SET
            name = EXCLUDED.name,
            category_id = EXCLUDED.category_id,
            sub_category_id = EXCLUDED.sub_category_id,
            brand = EXCLUDED.brand,
            description = EXCLUDED.description,
            images = EXCLUDED.images,
            stock = EXCLUDED.stock,
            price = EXCLUDED.price,
            is_featured = EXCLUDED.is_featured,
            banner = EXCLUDED.banner,
            discount_percentage = EXCLUDED.discount_percentage,
            discount_end_date = EXCLUDED.discount_end_date,
            updated_at = NOW()
        ",
    )
    .bind(&product.name)
    .bind(&product.slug)
    .bind(category_id)
    .bind(sub_category_id)
    .bind(&product.brand)
    .bind(&product.description)
    .bind(&product.images)
    .bind(product.stock)
    .bind(price)
    .bind(product.is_featured)
    .bind(product.banner.as_deref())
    .bind(product.discount_percentage)
    .bind(product.discount_end_date)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
