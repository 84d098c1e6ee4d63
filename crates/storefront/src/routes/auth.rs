//! Authentication route handlers.
//!
//! Password login and registration. Signing in folds the shopper's guest cart
//! into their account cart before the redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::{AuthError, AuthService, CartService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<&'static str>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<&'static str>,
}

/// Arabic message for an `?error=` code.
fn error_message(code: Option<&str>) -> Option<&'static str> {
    Some(match code? {
        "credentials" => "البريد الإلكتروني أو كلمة المرور غير صحيحة",
        "exists" => "يوجد حساب مسجل بهذا البريد الإلكتروني",
        "email" => "البريد الإلكتروني غير صالح",
        "weak" => "كلمة المرور يجب أن تكون 8 أحرف على الأقل",
        "mismatch" => "كلمتا المرور غير متطابقتين",
        _ => "حدث خطأ، يرجى المحاولة مرة أخرى",
    })
}

/// Sign the user into this session and merge their guest cart.
///
/// The session ID is cycled first so a pre-login session ID cannot be reused.
/// A failed merge does not fail the login: the guest cart ID stays in the
/// session and the merge is retried on the next cart access.
async fn sign_in(state: &AppState, session: &Session, user: &User) -> Result<(), Response> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
    };

    let stored = match session.cycle_id().await {
        Ok(()) => set_current_user(session, &current).await,
        Err(e) => Err(e),
    };
    if let Err(e) = stored {
        tracing::error!(error = %e, user_id = %user.id, "Failed to store user in session");
        return Err(Redirect::to("/auth/login?error=session").into_response());
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));

    let carts = state.carts();
    if let Err(e) = CartService::new(&carts)
        .resolve_cart(Some(user.id), session)
        .await
    {
        tracing::warn!(error = %e, user_id = %user.id, "Guest cart merge at login failed, will retry");
    }

    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        user,
        error: error_message(query.error.as_deref()),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
            tracing::info!("Login rejected");
            return Redirect::to("/auth/login?error=credentials").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            return Redirect::to("/auth/login?error=server").into_response();
        }
    };

    if let Err(response) = sign_in(&state, &session, &user).await {
        return response;
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Redirect::to("/cart").into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        user,
        error: error_message(query.error.as_deref()),
    }
}

/// Handle registration form submission. New accounts are signed in directly.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.password_confirm {
        return Redirect::to("/auth/register?error=mismatch").into_response();
    }

    let user = match AuthService::new(state.pool())
        .register(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            let code = match e {
                AuthError::UserAlreadyExists => "exists",
                AuthError::InvalidEmail(_) => "email",
                AuthError::WeakPassword(_) => "weak",
                other => {
                    tracing::error!(error = %other, "Registration failed");
                    "server"
                }
            };
            return Redirect::to(&format!("/auth/register?error={code}")).into_response();
        }
    };

    if let Err(response) = sign_in(&state, &session, &user).await {
        return response;
    }

    Redirect::to("/cart").into_response()
}

// =============================================================================
// Logout
// =============================================================================

/// Log out. Cart contents stay with the account.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session user");
    }
    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to cycle session id on logout");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_messages() {
        assert_eq!(error_message(None), None);
        assert_eq!(
            error_message(Some("mismatch")),
            Some("كلمتا المرور غير متطابقتين")
        );
        assert!(error_message(Some("anything-else")).is_some());
    }
}
