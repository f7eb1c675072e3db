//! Order management: listing, fulfillment toggles and deletion.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use bazaar_core::{OrderId, Paginated};

use crate::db::OrderRepository;
use crate::db::orders::{MarkedPaid, OrderDetail, OrderSummary};
use crate::error::{AppError, Result, not_found};
use crate::middleware::RequireAdmin;
use crate::routes::{Action, ListQuery};
use crate::state::AppState;

#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<OrderSummary>>> {
    let orders = OrderRepository::new(state.pool())
        .list(query.term(), query.page())
        .await?;
    Ok(Json(orders))
}

#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order".to_owned()))
}

/// Mark an order paid and e-mail the receipt on the first transition.
///
/// Mail failures are logged; the order stays paid.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn mark_paid(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Action<OrderDetail>>> {
    let MarkedPaid { order, newly_paid } =
        OrderRepository::new(state.pool()).mark_paid(id).await?;

    if newly_paid {
        tracing::info!(order_id = %id, "Order marked paid");
        send_receipt(&state, &order).await;
    } else {
        tracing::info!(order_id = %id, "Order was already paid; receipt not resent");
    }

    Ok(Json(Action::ok("Order has been marked paid").with_data(order)))
}

async fn send_receipt(state: &AppState, order: &OrderDetail) {
    let Some(email) = state.email() else {
        tracing::warn!(order_id = %order.order.id, "SMTP not configured; purchase receipt skipped");
        return;
    };

    if let Err(e) = email.send_purchase_receipt(order).await {
        let event_id = sentry::capture_error(&e);
        tracing::error!(
            order_id = %order.order.id,
            error = %e,
            sentry_event_id = %event_id,
            "Failed to send purchase receipt"
        );
    }
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn mark_delivered(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Action<OrderDetail>>> {
    let order = OrderRepository::new(state.pool())
        .mark_delivered(id)
        .await?;

    tracing::info!(order_id = %id, "Order marked delivered");
    Ok(Json(
        Action::ok("Order has been marked delivered").with_data(order),
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Action>> {
    OrderRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found("Order"))?;

    tracing::info!(order_id = %id, "Order deleted");
    Ok(Json(Action::ok("Order deleted successfully")))
}
