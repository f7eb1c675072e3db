//! Product and category form validation.
//!
//! Forms arrive loosely typed so that every field problem can be reported at
//! once; a valid form becomes the repository input.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use bazaar_core::{CategoryId, FieldErrors, SubCategoryId, parse_amount};

use crate::db::catalog::{CategoryInput, ProductInput, SubCategoryInput};

/// Product create/update payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductForm {
    pub name: String,
    pub slug: String,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub brand: String,
    pub description: String,
    pub stock: i64,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub banner: Option<String>,
    /// Original price as a string with exactly two decimals.
    pub price: String,
    pub discount_percentage: Option<i64>,
    /// RFC 3339 timestamp, or `YYYY-MM-DD` for the end of that day (UTC).
    pub discount_end_date: Option<String>,
}

impl ProductForm {
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn validate(&self) -> Result<ProductInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        errors.min_len("name", &self.name, 3, "Name");
        errors.min_len("slug", &self.slug, 3, "Slug");
        errors.min_len("brand", &self.brand, 3, "Brand");
        errors.min_len("description", &self.description, 10, "Description");

        let category_id = match self.category_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Uuid::parse_str(id)
                .map_err(|_| errors.add("categoryId", "A valid category ID is required"))
                .ok(),
            _ => {
                errors.add("categoryId", "Category is required");
                None
            }
        };

        let sub_category_id = match self.sub_category_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Uuid::parse_str(id)
                .map_err(|_| errors.add("subCategoryId", "Invalid sub-category ID"))
                .ok(),
            _ => None,
        };

        let stock = if self.stock < 0 {
            errors.add("stock", "Stock cannot be a negative number");
            None
        } else {
            i32::try_from(self.stock)
                .map_err(|_| errors.add("stock", "Stock is too large"))
                .ok()
        };

        let images = non_blank(&self.images);
        if images.is_empty() {
            errors.add("images", "At least one image is required");
        }

        let price = parse_amount(&self.price)
            .map_err(|e| errors.add("price", capitalize(&e.to_string())))
            .ok();

        let discount = self.discount_percentage.unwrap_or(0);
        if discount < 0 {
            errors.add("discountPercentage", "Discount cannot be negative");
        } else if discount > 100 {
            errors.add("discountPercentage", "Discount cannot be more than 100%");
        }

        let discount_end_date = match self.discount_end_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let parsed = parse_end_date(raw);
                if parsed.is_none() {
                    errors.add("discountEndDate", "Invalid discount end date");
                }
                parsed
            }
            _ => None,
        };

        errors.into_result()?;

        // Every `None` above recorded an error, so these are all present.
        match (category_id, stock, price) {
            (Some(category_id), Some(stock), Some(price)) => Ok(ProductInput {
                name: self.name.trim().to_owned(),
                slug: self.slug.trim().to_owned(),
                category_id: CategoryId::new(category_id),
                sub_category_id: sub_category_id.map(SubCategoryId::new),
                brand: self.brand.trim().to_owned(),
                description: self.description.trim().to_owned(),
                images,
                stock,
                price,
                is_featured: self.is_featured,
                banner: self
                    .banner
                    .as_deref()
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .map(str::to_owned),
                discount_percentage: i32::try_from(discount).unwrap_or_default(),
                discount_end_date,
            }),
            _ => {
                let mut errors = FieldErrors::new();
                errors.add("form", "Invalid product");
                Err(errors)
            }
        }
    }
}

/// A sub-category row in a category form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubCategoryForm {
    pub id: Option<String>,
    pub name: String,
    pub slug: String,
}

/// Category create/update payload, including the full sub-category set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryForm {
    pub name: String,
    pub slug: String,
    pub images: Vec<String>,
    pub sub_categories: Vec<SubCategoryForm>,
}

impl CategoryForm {
    /// # Errors
    ///
    /// Returns every field that failed validation. Sub-category fields are
    /// reported as `subCategories.<index>.<field>`.
    pub fn validate(&self) -> Result<CategoryInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        errors.min_len("name", &self.name, 3, "Name");
        errors.min_len("slug", &self.slug, 3, "Slug");

        let images = non_blank(&self.images);
        if images.is_empty() {
            errors.add("images", "At least one image is required");
        }

        let mut sub_categories = Vec::with_capacity(self.sub_categories.len());
        for (index, sub) in self.sub_categories.iter().enumerate() {
            let mut sub_errors = FieldErrors::new();
            sub_errors.min_len("name", &sub.name, 2, "Sub-category name");
            sub_errors.min_len("slug", &sub.slug, 2, "Sub-category slug");

            let id = match sub.id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => match Uuid::parse_str(id) {
                    Ok(id) => Some(SubCategoryId::new(id)),
                    Err(_) => {
                        sub_errors.add("id", "Invalid sub-category ID");
                        None
                    }
                },
                _ => None,
            };

            errors.nest(&format!("subCategories.{index}"), sub_errors);
            sub_categories.push(SubCategoryInput {
                id,
                name: sub.name.trim().to_owned(),
                slug: sub.slug.trim().to_owned(),
            });
        }

        errors.into_result()?;

        Ok(CategoryInput {
            name: self.name.trim().to_owned(),
            slug: self.slug.trim().to_owned(),
            images,
            sub_categories,
        })
    }
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect()
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn parse_end_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)?;
    Some(date.and_time(end_of_day).and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn valid_product() -> ProductForm {
        ProductForm {
            name: "Ajrak Shawl".to_owned(),
            slug: "ajrak-shawl".to_owned(),
            category_id: Some(Uuid::new_v4().to_string()),
            sub_category_id: None,
            brand: "Sindh Looms".to_owned(),
            description: "Block-printed cotton shawl".to_owned(),
            stock: 8,
            images: vec!["/images/ajrak.jpg".to_owned()],
            is_featured: false,
            banner: Some(String::new()),
            price: "2499.00".to_owned(),
            discount_percentage: Some(10),
            discount_end_date: Some("2026-12-31".to_owned()),
        }
    }

    #[test]
    fn test_valid_product_form() {
        let input = valid_product().validate().unwrap();
        assert_eq!(input.price, Decimal::new(249_900, 2));
        assert_eq!(input.discount_percentage, 10);
        assert_eq!(input.banner, None);
        assert_eq!(
            input.discount_end_date.unwrap().to_rfc3339(),
            "2026-12-31T23:59:59+00:00"
        );
    }

    #[test]
    fn test_product_form_collects_every_error() {
        let form = ProductForm {
            name: "Aj".to_owned(),
            category_id: None,
            stock: -1,
            images: vec!["  ".to_owned()],
            price: "24.9".to_owned(),
            discount_percentage: Some(101),
            discount_end_date: Some("next week".to_owned()),
            ..valid_product()
        };
        let errors = form.validate().unwrap_err();

        assert_eq!(errors.get("name"), Some("Name must be at least 3 characters"));
        assert_eq!(errors.get("categoryId"), Some("Category is required"));
        assert_eq!(errors.get("stock"), Some("Stock cannot be a negative number"));
        assert_eq!(errors.get("images"), Some("At least one image is required"));
        assert_eq!(
            errors.get("price"),
            Some("Price must have exactly two decimal places")
        );
        assert_eq!(
            errors.get("discountPercentage"),
            Some("Discount cannot be more than 100%")
        );
        assert_eq!(errors.get("discountEndDate"), Some("Invalid discount end date"));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let form = ProductForm {
            price: "-5.00".to_owned(),
            ..valid_product()
        };
        assert_eq!(
            form.validate().unwrap_err().get("price"),
            Some("Price cannot be negative")
        );
    }

    #[test]
    fn test_category_form_reports_sub_category_index() {
        let form = CategoryForm {
            name: "Textiles".to_owned(),
            slug: "textiles".to_owned(),
            images: vec!["/images/textiles.jpg".to_owned()],
            sub_categories: vec![
                SubCategoryForm {
                    id: None,
                    name: "Shawls".to_owned(),
                    slug: "shawls".to_owned(),
                },
                SubCategoryForm {
                    id: Some("not-a-uuid".to_owned()),
                    name: "R".to_owned(),
                    slug: "rugs".to_owned(),
                },
            ],
        };
        let errors = form.validate().unwrap_err();

        assert_eq!(
            errors.get("subCategories.1.name"),
            Some("Sub-category name must be at least 2 characters")
        );
        assert_eq!(errors.get("subCategories.1.id"), Some("Invalid sub-category ID"));
        assert!(errors.get("subCategories.0.name").is_none());
    }

    #[test]
    fn test_category_form_keeps_sub_category_ids() {
        let id = Uuid::new_v4();
        let form = CategoryForm {
            name: "Textiles".to_owned(),
            slug: "textiles".to_owned(),
            images: vec!["/images/textiles.jpg".to_owned()],
            sub_categories: vec![SubCategoryForm {
                id: Some(id.to_string()),
                name: "Shawls".to_owned(),
                slug: "shawls".to_owned(),
            }],
        };
        let input = form.validate().unwrap();
        assert_eq!(input.sub_categories[0].id, Some(SubCategoryId::new(id)));
    }
}
