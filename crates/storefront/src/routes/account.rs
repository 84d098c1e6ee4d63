//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use souq_core::OrderNumber;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order, OrderSummary};
use crate::services::CheckoutService;
use crate::state::AppState;

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub user: Option<CurrentUser>,
    pub orders: Vec<OrderSummary>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order_detail.html")]
pub struct OrderDetailTemplate {
    pub user: Option<CurrentUser>,
    pub order: Order,
}

/// Display the signed-in user's order history.
#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
) -> Result<OrdersTemplate> {
    let (carts, counter, orders) = (state.carts(), state.order_counter(), state.orders());
    let orders = CheckoutService::new(&carts, &counter, &orders, &state.config().order_numbers)
        .list_orders(current_user.id)
        .await?;

    Ok(OrdersTemplate {
        user: Some(current_user),
        orders,
    })
}

/// Display one order. Orders belonging to other accounts are reported as
/// not found.
#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn order_detail(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
    Path(number): Path<String>,
) -> Result<OrderDetailTemplate> {
    let not_found = || AppError::NotFound(format!("order {number}"));
    let order_number = OrderNumber::parse(&number).ok_or_else(not_found)?;

    let (carts, counter, orders) = (state.carts(), state.order_counter(), state.orders());
    let order = CheckoutService::new(&carts, &counter, &orders, &state.config().order_numbers)
        .get_order(current_user.id, &order_number)
        .await?
        .ok_or_else(not_found)?;

    Ok(OrderDetailTemplate {
        user: Some(current_user),
        order,
    })
}
