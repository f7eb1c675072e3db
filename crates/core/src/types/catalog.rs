//! Catalog records: products, categories and sub-categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId, SubCategoryId};
use crate::pricing::effective_price;

/// A product as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub brand: String,
    pub description: String,
    pub images: Vec<String>,
    pub stock: i32,
    /// Original price, before any discount.
    pub price: Decimal,
    pub rating: Decimal,
    pub num_reviews: i32,
    pub is_featured: bool,
    pub banner: Option<String>,
    pub discount_percentage: i32,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Selling price at `now`.
    #[must_use]
    pub fn price_at(&self, now: DateTime<Utc>) -> Decimal {
        effective_price(
            self.price,
            self.discount_percentage,
            self.discount_end_date,
            now,
        )
    }

    /// First image, used as the cart and order line thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> &str {
        self.images.first().map_or("", String::as_str)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A top-level category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A category with its sub-categories, as used for navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTree {
    #[serde(flatten)]
    pub category: Category,
    pub sub_categories: Vec<SubCategory>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn product(discount: i32, end: Option<DateTime<Utc>>) -> Product {
        Product {
            id: ProductId::generate(),
            name: "Peshawari Chappal".to_owned(),
            slug: "peshawari-chappal".to_owned(),
            category_id: CategoryId::generate(),
            sub_category_id: None,
            brand: "Qissa".to_owned(),
            description: "Hand-stitched leather sandals".to_owned(),
            images: vec!["/images/chappal-1.jpg".to_owned()],
            stock: 4,
            price: Decimal::new(400_000, 2),
            rating: Decimal::new(45, 1),
            num_reviews: 12,
            is_featured: false,
            banner: None,
            discount_percentage: discount,
            discount_end_date: end,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_at_honours_discount_window() {
        let now = Utc::now();
        assert_eq!(product(25, None).price_at(now), Decimal::new(300_000, 2));
        let expired = product(25, Some(now - Duration::hours(1)));
        assert_eq!(expired.price_at(now), expired.price);
    }

    #[test]
    fn test_tree_flattens_category_fields() {
        let category = Category {
            id: CategoryId::generate(),
            name: "Footwear".to_owned(),
            slug: "footwear".to_owned(),
            images: vec!["/images/footwear.jpg".to_owned()],
            created_at: Utc::now(),
        };
        let tree = CategoryTree {
            category,
            sub_categories: vec![],
        };
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["slug"], "footwear");
        assert!(json["subCategories"].as_array().unwrap().is_empty());
    }
}
