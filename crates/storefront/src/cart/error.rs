//! Errors surfaced by the cart synchronizer to presentation layers.

use thiserror::Error;

use super::gateway::{FieldError, GatewayError};
use super::store::StoreError;
use super::view::ViewError;

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a cart operation did not apply.
///
/// Every variant except [`CartError::StaleHandle`] leaves the cart view as it
/// was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Malformed caller input, rejected before any remote call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The platform refused to create a cart.
    #[error("could not create cart: {}", join_messages(.0))]
    CreateFailed(Vec<FieldError>),

    /// The platform refused an add, update or remove.
    #[error("cart update rejected: {}", join_messages(.0))]
    MutationFailed(Vec<FieldError>),

    /// Network failure, timeout, bad status or an unreadable response.
    #[error("could not reach the store: {0}")]
    Transport(String),

    /// The stored cart no longer exists upstream. The handle has been forgotten.
    #[error("cart expired; starting a new one")]
    StaleHandle,

    /// The cart handle could not be persisted or cleared.
    #[error("could not save cart: {0}")]
    Store(String),
}

impl CartError {
    /// Stable snake_case code for presentation layers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::CreateFailed(_) => "create_failed",
            Self::MutationFailed(_) => "mutation_failed",
            Self::Transport(_) => "transport",
            Self::StaleHandle => "stale_handle",
            Self::Store(_) => "store",
        }
    }

    /// Field-level rejections, if the platform reported any.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::CreateFailed(errors) | Self::MutationFailed(errors) => errors,
            _ => &[],
        }
    }

    pub(crate) fn from_create(err: GatewayError) -> Self {
        match err {
            GatewayError::Domain(errors) => Self::CreateFailed(errors),
            GatewayError::Transport(msg) => Self::Transport(msg),
            // A fresh cart has no handle to go stale
            GatewayError::NotFound => Self::CreateFailed(Vec::new()),
        }
    }

    pub(crate) fn from_mutation(err: GatewayError) -> Self {
        match err {
            GatewayError::Domain(errors) => Self::MutationFailed(errors),
            GatewayError::Transport(msg) => Self::Transport(msg),
            GatewayError::NotFound => Self::StaleHandle,
        }
    }
}

impl From<ViewError> for CartError {
    fn from(err: ViewError) -> Self {
        Self::Transport(format!("malformed cart response: {err}"))
    }
}

impl From<StoreError> for CartError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}
