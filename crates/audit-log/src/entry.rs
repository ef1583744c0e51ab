use chrono::{DateTime, Utc};
use common::{OperationKind, ProductId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Creates a new random entry ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record of one accepted cart mutation.
///
/// The product name is copied at record time and does not follow later
/// catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: EntryId,

    /// User whose mutation was accepted.
    pub user_id: UserId,

    pub operation: OperationKind,

    pub product_id: ProductId,

    pub product_name: String,

    /// When the entry was recorded (Unix milliseconds on the wire).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Creates an entry with a fresh id stamped with the current time.
    pub fn new(
        user_id: UserId,
        operation: OperationKind,
        product_id: ProductId,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            user_id,
            operation,
            product_id,
            product_name: product_name.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_ids_are_unique() {
        assert_ne!(EntryId::new(), EntryId::new());
    }

    #[test]
    fn entry_wire_shape() {
        let entry = AuditEntry::new(
            UserId::new("u1"),
            OperationKind::Add,
            ProductId::new("p1"),
            "iPhone 15 Pro",
        );
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["userId"], "u1");
        assert_eq!(json["operation"], "add");
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["productName"], "iPhone 15 Pro");
        assert_eq!(json["timestamp"], entry.timestamp.timestamp_millis());
    }
}
