//! Catalog route handlers: products and categories.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{
    Availability, Category, CategoryTree, PageRequest, Paginated, Product, ProductSort,
    SubCategory,
};

use crate::db::{CatalogRepository, ProductFilter};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Default page size for product listings.
pub const PRODUCT_PAGE_SIZE: i64 = 15;

/// Query-string value that disables a filter.
const ALL: &str = "all";

// =============================================================================
// Views
// =============================================================================

/// A product with its current selling price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// Price after any running discount.
    pub effective_price: Decimal,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            effective_price: product.price_at(Utc::now()),
            product,
        }
    }
}

/// Product page payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailView {
    pub product: ProductView,
    pub category: Category,
    pub sub_category: Option<SubCategory>,
}

// =============================================================================
// Query Types
// =============================================================================

/// Product listing query string. Every value arrives as text and is parsed
/// leniently: empty values and `all` disable a filter.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub availability: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A filter value, or `None` when absent, blank or `all`.
fn active(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

/// Parse `min-max` into an inclusive range.
fn parse_price_range(value: &str) -> Option<(Decimal, Decimal)> {
    let (min, max) = value.split_once('-')?;
    let min = Decimal::from_str(min.trim()).ok()?;
    let max = Decimal::from_str(max.trim()).ok()?;
    (min <= max).then_some((min, max))
}

impl ProductQuery {
    /// Build the repository filter and page request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for malformed price, rating or
    /// availability values.
    pub fn to_filter(&self) -> Result<(ProductFilter, PageRequest)> {
        let price = active(self.price.as_deref())
            .map(|v| {
                parse_price_range(v)
                    .ok_or_else(|| AppError::BadRequest("Invalid price range".to_owned()))
            })
            .transpose()?;

        let rating = active(self.rating.as_deref())
            .map(|v| {
                Decimal::from_str(v).map_err(|_| AppError::BadRequest("Invalid rating".to_owned()))
            })
            .transpose()?;

        let availability = active(self.availability.as_deref())
            .map(|v| Availability::from_str(v).map_err(AppError::BadRequest))
            .transpose()?;

        let sort = active(self.sort.as_deref())
            .and_then(|v| ProductSort::from_str(v).ok())
            .unwrap_or_default();

        let filter = ProductFilter {
            query: active(self.q.as_deref()).map(str::to_owned),
            category: active(self.category.as_deref()).map(str::to_owned),
            subcategory: active(self.subcategory.as_deref()).map(str::to_owned),
            price,
            rating,
            availability,
            sort,
        };

        let page = PageRequest::new(
            self.page.as_deref().and_then(|p| p.parse().ok()),
            self.limit.as_deref().and_then(|l| l.parse().ok()),
            PRODUCT_PAGE_SIZE,
        );

        Ok((filter, page))
    }
}

// =============================================================================
// Product Routes
// =============================================================================

/// Product listing.
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Paginated<ProductView>>> {
    let (filter, page) = query.to_filter()?;
    let products = CatalogRepository::new(state.pool())
        .list_products(&filter, page)
        .await?;
    Ok(Json(products.map(ProductView::from)))
}

/// Newest products.
#[instrument(skip(state))]
pub async fn latest(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let products = CatalogRepository::new(state.pool()).latest().await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// Featured products.
#[instrument(skip(state))]
pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let products = CatalogRepository::new(state.pool()).featured().await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// The running deal, or `null`.
#[instrument(skip(state))]
pub async fn deal(State(state): State<AppState>) -> Result<Json<Option<ProductView>>> {
    let product = CatalogRepository::new(state.pool()).deal().await?;
    Ok(Json(product.map(ProductView::from)))
}

/// Product page.
#[instrument(skip(state))]
pub async fn show_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetailView>> {
    let detail = CatalogRepository::new(state.pool())
        .product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_owned()))?;

    Ok(Json(ProductDetailView {
        product: detail.product.into(),
        category: detail.category,
        sub_category: detail.sub_category,
    }))
}

/// Related products for a product page.
#[instrument(skip(state))]
pub async fn related(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<ProductView>>> {
    let repo = CatalogRepository::new(state.pool());
    let detail = repo
        .product_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_owned()))?;

    let products = repo.related(&detail.product).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

// =============================================================================
// Category Routes
// =============================================================================

/// Navigation tree (cached).
#[instrument(skip(state))]
pub async fn category_tree(State(state): State<AppState>) -> Result<Json<Vec<CategoryTree>>> {
    let tree = state.cache().category_tree(state.pool()).await?;
    Ok(Json(tree))
}

/// Homepage category grid.
#[instrument(skip(state))]
pub async fn homepage_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CatalogRepository::new(state.pool())
        .homepage_categories()
        .await?;
    Ok(Json(categories))
}

/// Category page.
#[instrument(skip(state))]
pub async fn show_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryTree>> {
    let category = CatalogRepository::new(state.pool())
        .category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_owned()))?;
    Ok(Json(category))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ProductQuery {
        let map: serde_json::Map<String, serde_json::Value> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), serde_json::Value::from(*v)))
            .collect();
        serde_json::from_value(map.into()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let (filter, page) = ProductQuery::default().to_filter().unwrap();
        assert_eq!(filter, ProductFilter::default());
        assert_eq!(page.size(), PRODUCT_PAGE_SIZE);
        assert_eq!(page.number(), 1);
    }

    #[test]
    fn test_all_disables_filters() {
        let (filter, _) = query(&[
            ("category", "all"),
            ("price", "all"),
            ("rating", "ALL"),
            ("q", " "),
        ])
        .to_filter()
        .unwrap();
        assert_eq!(filter, ProductFilter::default());
    }

    #[test]
    fn test_full_filter() {
        let (filter, page) = query(&[
            ("q", "lawn"),
            ("category", "women"),
            ("subcategory", "unstitched"),
            ("price", "1000-5000"),
            ("rating", "4"),
            ("availability", "in-stock"),
            ("sort", "price-desc"),
            ("page", "3"),
            ("limit", "500"),
        ])
        .to_filter()
        .unwrap();

        assert_eq!(filter.query.as_deref(), Some("lawn"));
        assert_eq!(filter.subcategory.as_deref(), Some("unstitched"));
        assert_eq!(
            filter.price,
            Some((Decimal::from(1000), Decimal::from(5000)))
        );
        assert_eq!(filter.rating, Some(Decimal::from(4)));
        assert_eq!(filter.availability, Some(Availability::InStock));
        assert_eq!(filter.sort, ProductSort::PriceDesc);
        assert_eq!(page.number(), 3);
        assert_eq!(page.size(), bazaar_core::pagination::MAX_PAGE_SIZE);
    }

    #[test]
    fn test_unknown_sort_falls_back_to_newest() {
        let (filter, _) = query(&[("sort", "random")]).to_filter().unwrap();
        assert_eq!(filter.sort, ProductSort::Newest);
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(query(&[("price", "cheap")]).to_filter().is_err());
        assert!(query(&[("price", "500-100")]).to_filter().is_err());
        assert!(query(&[("rating", "five")]).to_filter().is_err());
        assert!(query(&[("availability", "maybe")]).to_filter().is_err());
    }
}
