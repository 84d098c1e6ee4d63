//! Checkout route handlers.
//!
//! Cash-on-delivery checkout: the shopper enters delivery details, the cart
//! becomes an order, and the confirmation page shows the order number.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CartView, CurrentUser, Order, OrderDetails};
use crate::services::{CartService, CheckoutError, CheckoutService, OrderNumberSequencer};
use crate::state::AppState;

/// Checkout form data.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

impl From<&CheckoutForm> for OrderDetails {
    fn from(form: &CheckoutForm) -> Self {
        Self {
            customer_name: form.customer_name.clone(),
            phone: form.phone.clone(),
            city: form.city.clone(),
            address: form.address.clone(),
            notes: Some(form.notes.clone()),
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub user: Option<CurrentUser>,
    pub cart: CartView,
    pub next_order_number: Option<String>,
    pub form: CheckoutForm,
    pub error: Option<String>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub user: Option<CurrentUser>,
    pub order: Order,
}

/// Order number the next checkout would get, for display only.
async fn next_order_number_preview(state: &AppState) -> Option<String> {
    let counter = state.order_counter();
    match OrderNumberSequencer::new(&counter, &state.config().order_numbers)
        .get_next_order_number()
        .await
    {
        Ok(number) => Some(number.into_inner()),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read order counter for preview");
            None
        }
    }
}

/// Display the checkout form. Redirects to the cart when it is empty.
#[instrument(skip(state, session, auth))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
) -> Result<Response> {
    let carts = state.carts();
    let Some(cart) = CartService::new(&carts)
        .get_current_cart(auth.user_id(), &session)
        .await?
        .filter(|c| !c.is_empty())
    else {
        return Ok(Redirect::to("/cart").into_response());
    };

    Ok(CheckoutTemplate {
        user: auth.0,
        cart,
        next_order_number: next_order_number_preview(&state).await,
        form: CheckoutForm::default(),
        error: None,
    }
    .into_response())
}

/// Place the order.
///
/// Validation problems re-render the form with the shopper's input and an
/// Arabic message; everything else goes through `AppError`.
#[instrument(skip(state, session, auth, form))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    auth: OptionalAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let carts = state.carts();
    let counter = state.order_counter();
    let orders = state.orders();
    let checkout =
        CheckoutService::new(&carts, &counter, &orders, &state.config().order_numbers);

    match checkout
        .place_order(auth.user_id(), &session, OrderDetails::from(&form))
        .await
    {
        Ok(order) => Ok(ConfirmationTemplate {
            user: auth.0,
            order,
        }
        .into_response()),
        Err(CheckoutError::EmptyCart) => Ok(Redirect::to("/cart").into_response()),
        Err(
            err @ (CheckoutError::InvalidDetails(_)
            | CheckoutError::UnavailableItems(_)
            | CheckoutError::Conflict(_)),
        ) => {
            let message = AppError::from(err).user_message();
            let Some(cart) = CartService::new(&carts)
                .get_current_cart(auth.user_id(), &session)
                .await?
                .filter(|c| !c.is_empty())
            else {
                return Ok(Redirect::to("/cart").into_response());
            };

            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutTemplate {
                    user: auth.0,
                    cart,
                    next_order_number: next_order_number_preview(&state).await,
                    form,
                    error: Some(message),
                },
            )
                .into_response())
        }
        Err(err) => Err(err.into()),
    }
}
