//! Synchronization error types.

use common::ConnectionId;
use domain::CartError;
use thiserror::Error;

/// Errors reported back to the connection that caused them.
///
/// None of these end the connection; each becomes an error notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The cart rejected the mutation.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The connection sent a mutation before attaching.
    #[error("Connection {0} is not attached")]
    NotAttached(ConnectionId),

    /// The connection was never opened, or has already been closed.
    #[error("Connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    /// The connection sent a second attach.
    #[error("Connection {0} is already attached")]
    AlreadyAttached(ConnectionId),

    /// The frame is not a known client event.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

impl SyncError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::Cart(CartError::ProductNotFound { .. }) => "PRODUCT_NOT_FOUND",
            SyncError::Cart(CartError::ItemNotFound { .. }) => "ITEM_NOT_FOUND",
            SyncError::Cart(CartError::InvalidQuantity { .. }) => "INVALID_QUANTITY",
            SyncError::NotAttached(_) => "NOT_ATTACHED",
            SyncError::ConnectionClosed(_) => "CONNECTION_CLOSED",
            SyncError::AlreadyAttached(_) => "ALREADY_ATTACHED",
            SyncError::MalformedMessage(_) => "MALFORMED_MESSAGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;

    #[test]
    fn cart_errors_keep_their_message() {
        let err = SyncError::from(CartError::ItemNotFound {
            product_id: ProductId::new("p1"),
        });
        assert_eq!(err.to_string(), "Item not found in cart: p1");
        assert_eq!(err.code(), "ITEM_NOT_FOUND");
    }

    #[test]
    fn codes_are_distinct() {
        let id = ConnectionId::new();
        let codes = [
            SyncError::from(CartError::ProductNotFound {
                product_id: ProductId::new("x"),
            })
            .code(),
            SyncError::from(CartError::InvalidQuantity {
                value: "abc".to_string(),
            })
            .code(),
            SyncError::NotAttached(id).code(),
            SyncError::ConnectionClosed(id).code(),
            SyncError::AlreadyAttached(id).code(),
            SyncError::MalformedMessage(String::new()).code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
