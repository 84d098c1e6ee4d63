//! Shopper account commands.
//!
//! # Usage
//!
//! ```bash
//! souq-cli users create -e shopper@example.com -p 'long password'
//! ```

use souq_storefront::services::AuthService;

use super::{CliError, connect};

/// Create a shopper account with a password.
///
/// # Errors
///
/// Returns an error if the email is invalid or taken, the password is too
/// weak, or the database is unreachable.
pub async fn create(email: &str, password: &str) -> Result<(), CliError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool).register(email, password).await?;

    tracing::info!(user_id = %user.id, email = %user.email, "User created");
    Ok(())
}
