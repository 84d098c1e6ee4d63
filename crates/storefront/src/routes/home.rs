//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, Product};
use crate::state::AppState;

/// Home page template: the active catalog with add-to-cart buttons.
#[derive(Template, WebTemplate)]
#[template(path = "home/index.html")]
pub struct HomeTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<Product>,
}

/// Display the home page.
#[instrument(skip(state, auth))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
) -> Result<HomeTemplate> {
    let products = ProductRepository::new(state.pool(), state.config().currency)
        .list_active()
        .await?;

    Ok(HomeTemplate {
        user: auth,
        products,
    })
}
