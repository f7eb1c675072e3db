//! Product and category management.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use bazaar_core::{CategoryId, CategoryTree, Paginated, Product, ProductId};

use crate::db::catalog::CategorySummary;
use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{Result, not_found};
use crate::extract;
use crate::middleware::RequireAdmin;
use crate::routes::{Action, ListQuery};
use crate::services::catalog::{CategoryForm, ProductForm};
use crate::state::AppState;

// =============================================================================
// Products
// =============================================================================

#[instrument(skip(state, _admin))]
pub async fn list_products(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<Product>>> {
    let products = ProductRepository::new(state.pool())
        .list(query.term(), query.page())
        .await?;
    Ok(Json(products))
}

#[instrument(skip(state, _admin))]
pub async fn show_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await
        .map_err(not_found("Product"))?;
    Ok(Json(product))
}

#[instrument(skip(state, admin, form), fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    extract::Json(form): extract::Json<ProductForm>,
) -> Result<Json<Action<Product>>> {
    let input = form.validate()?;
    let product = ProductRepository::new(state.pool()).create(&input).await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok(Json(Action::ok("Product created successfully").with_data(product)))
}

#[instrument(skip(state, admin, form), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    extract::Json(form): extract::Json<ProductForm>,
) -> Result<Json<Action<Product>>> {
    let input = form.validate()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(not_found("Product"))?;

    tracing::info!(product_id = %id, "Product updated");
    Ok(Json(Action::ok("Product updated successfully").with_data(product)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<Action>> {
    let repriced = ProductRepository::new(state.pool())
        .delete(id, &state.config().pricing)
        .await
        .map_err(not_found("Product"))?;

    tracing::info!(product_id = %id, carts_repriced = repriced, "Product deleted");
    Ok(Json(Action::ok("Product deleted successfully")))
}

// =============================================================================
// Categories
// =============================================================================

#[instrument(skip(state, _admin))]
pub async fn list_categories(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<CategorySummary>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(categories))
}

#[instrument(skip(state, _admin))]
pub async fn show_category(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<CategoryTree>> {
    let category = CategoryRepository::new(state.pool())
        .get(id)
        .await
        .map_err(not_found("Category"))?;
    Ok(Json(category))
}

#[instrument(skip(state, admin, form), fields(admin_id = %admin.id))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    extract::Json(form): extract::Json<CategoryForm>,
) -> Result<Json<Action<CategoryTree>>> {
    let input = form.validate()?;
    let category = CategoryRepository::new(state.pool()).create(&input).await?;

    tracing::info!(category_id = %category.category.id, "Category created");
    Ok(Json(
        Action::ok("Category created successfully.").with_data(category),
    ))
}

#[instrument(skip(state, admin, form), fields(admin_id = %admin.id))]
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    extract::Json(form): extract::Json<CategoryForm>,
) -> Result<Json<Action<CategoryTree>>> {
    let input = form.validate()?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &input)
        .await
        .map_err(not_found("Category"))?;

    tracing::info!(category_id = %id, "Category updated");
    Ok(Json(
        Action::ok("Category updated successfully.").with_data(category),
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<Action>> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found("Category"))?;

    tracing::info!(category_id = %id, "Category deleted");
    Ok(Json(Action::ok("Category deleted successfully.")))
}
