//! Order history route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{Order, OrderId, PageRequest, Paginated};

use crate::db::OrderRepository;
use crate::db::orders::OrderDetail;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// One of the signed-in user's orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .get_for_owner(id, user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order".to_owned()))
}

/// The signed-in user's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id, PageRequest::page(query.page))
        .await?;
    Ok(Json(orders))
}
