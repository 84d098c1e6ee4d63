//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Every handler resolves the cart through [`CartService`], so a guest cart
//! left over from before login is merged on first access.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use souq_core::{CartItemId, ProductId};

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CartView, CurrentUser};
use crate::services::CartService;
use crate::state::AppState;

/// HTMX event fired after any cart change so badges refresh.
const CART_UPDATED_TRIGGER: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: CartItemId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: CartItemId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub user: Option<CurrentUser>,
    pub cart: Option<CartView>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: Option<CartView>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: i64,
}

fn items_fragment(cart: Option<CartView>) -> Response {
    (AppendHeaders([CART_UPDATED_TRIGGER]), CartItemsTemplate { cart }).into_response()
}

/// Display cart page.
#[instrument(skip(state, session, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<impl IntoResponse> {
    let carts = state.carts();
    let cart = CartService::new(&carts)
        .get_current_cart(auth.user_id(), &session)
        .await?;

    Ok(CartShowTemplate { user: auth.0, cart })
}

/// Add item to cart (HTMX).
///
/// Creates the cart on first add. Returns the count badge with an HTMX
/// trigger so other cart widgets refresh.
#[instrument(skip(state, session, auth))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let carts = state.carts();
    let cart = CartService::new(&carts)
        .add_item(
            auth.user_id(),
            &session,
            form.product_id,
            form.quantity.unwrap_or(1),
        )
        .await?;

    Ok((
        AppendHeaders([CART_UPDATED_TRIGGER]),
        CartCountTemplate {
            count: cart.item_count(),
        },
    )
        .into_response())
}

/// Update cart item quantity (HTMX). Quantity 0 removes the line.
#[instrument(skip(state, session, auth))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let carts = state.carts();
    let cart = CartService::new(&carts)
        .update_quantity(auth.user_id(), &session, form.item_id, form.quantity)
        .await?;

    Ok(items_fragment(cart))
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session, auth))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let carts = state.carts();
    let cart = CartService::new(&carts)
        .remove_item(auth.user_id(), &session, form.item_id)
        .await?;

    Ok(items_fragment(cart))
}

/// Empty the cart (HTMX).
#[instrument(skip(state, session, auth))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<Response> {
    let carts = state.carts();
    CartService::new(&carts)
        .clear_cart(auth.user_id(), &session)
        .await?;

    Ok(items_fragment(None))
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session, auth))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<impl IntoResponse> {
    let carts = state.carts();
    let count = CartService::new(&carts)
        .get_item_count(auth.user_id(), &session)
        .await?;

    Ok(CartCountTemplate { count })
}
