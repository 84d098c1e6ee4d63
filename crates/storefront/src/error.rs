//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers should return
//! `Result<T, AppError>`. Client-facing messages are Arabic.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;

const INTERNAL_MESSAGE: &str = "حدث خطأ غير متوقع، يرجى المحاولة لاحقاً";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Cart(err) => cart_status(err),
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart | CheckoutError::InvalidDetails(_) => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::UnavailableItems(_) | CheckoutError::Conflict(_) => {
                    StatusCode::CONFLICT
                }
                CheckoutError::Cart(err) => cart_status(err),
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Shopper-facing message; never exposes internal details.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cart(err) | Self::Checkout(CheckoutError::Cart(err)) => cart_message(err),
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => "سلة التسوق فارغة".to_string(),
                CheckoutError::UnavailableItems(names) => {
                    format!("بعض المنتجات لم تعد متوفرة: {}", names.join("، "))
                }
                CheckoutError::InvalidDetails(msg) => msg.clone(),
                CheckoutError::Conflict(_) => {
                    "تعذر إتمام الطلب، يرجى المحاولة مرة أخرى".to_string()
                }
                CheckoutError::Cart(_) | CheckoutError::Repository(_) => {
                    INTERNAL_MESSAGE.to_string()
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "البريد الإلكتروني أو كلمة المرور غير صحيحة".to_string()
                }
                AuthError::UserAlreadyExists => "يوجد حساب مسجل بهذا البريد الإلكتروني".to_string(),
                AuthError::WeakPassword(_) => "كلمة المرور يجب أن تكون 8 أحرف على الأقل".to_string(),
                AuthError::InvalidEmail(_) => "البريد الإلكتروني غير صالح".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => INTERNAL_MESSAGE.to_string(),
            },
            Self::NotFound(_) => "الصفحة غير موجودة".to_string(),
            Self::Unauthorized(_) => "يرجى تسجيل الدخول".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "طلبات كثيرة، يرجى الانتظار قليلاً".to_string(),
            Self::Database(_) | Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                INTERNAL_MESSAGE.to_string()
            }
        }
    }
}

const fn cart_status(err: &CartError) -> StatusCode {
    match err {
        CartError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
        CartError::ProductUnavailable(_) => StatusCode::CONFLICT,
        CartError::Session(_) | CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn cart_message(err: &CartError) -> String {
    match err {
        CartError::InvalidQuantity(_) => "الكمية يجب أن تكون بين 1 و 99".to_string(),
        CartError::ProductUnavailable(_) => "المنتج غير متوفر حالياً".to_string(),
        CartError::Session(_) | CartError::Repository(_) => INTERNAL_MESSAGE.to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, self.user_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use souq_core::{ProductId, QuantityError};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order ORD-000001".to_string());
        assert_eq!(err.to_string(), "Not found: order ORD-000001");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_cart_error_status_codes() {
        assert_eq!(
            get_status(CartError::InvalidQuantity(QuantityError::TooLarge { max: 99 }).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::ProductUnavailable(ProductId::new(1)).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_checkout_error_status_codes() {
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::Conflict("order number already exists".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CheckoutError::Repository(RepositoryError::NotFound).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection refused at 10.0.0.3".to_string());
        assert_eq!(err.user_message(), INTERNAL_MESSAGE);

        let err = AppError::Checkout(CheckoutError::InvalidDetails("رقم الجوال غير صالح".into()));
        assert_eq!(err.user_message(), "رقم الجوال غير صالح");
    }
}
