//! Unified error handling with Sentry integration.
//!
//! Cart operations never fail; they report a
//! [`CartOutcome`](crate::cart::CartOutcome). Everything else on the
//! [`Storefront`](crate::state::Storefront) facade returns
//! [`StorefrontError`], which knows whether it is worth reporting.

use thiserror::Error;

use crate::api::{ApiError, RequestError};
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Error type for storefront operations.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input rejected before any request was sent.
    #[error("Invalid input: {0}")]
    Request(#[from] RequestError),
}

impl StorefrontError {
    /// Whether the error was caused by the user rather than the system.
    ///
    /// Bad input, wrong credentials, and unknown books are expected and are
    /// not sent to Sentry.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Api(err) => matches!(
                err,
                ApiError::Unauthorized(_)
                    | ApiError::Validation(_)
                    | ApiError::NotFound(_)
            ),
            Self::Config(_) | Self::Storage(_) => false,
        }
    }

    /// Log the error, capturing it to Sentry unless it is a user error.
    pub fn report(&self) {
        if self.is_user_error() {
            tracing::warn!(error = %self, "Operation rejected");
            return;
        }

        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Operation failed"
        );
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context after signing in.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context after signing out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a cart or auth action.
///
/// Breadcrumbs appear in Sentry reports to show what the customer did before
/// an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
