//! Wire events exchanged over a connection.
//!
//! Every frame is a JSON object `{"type": ..., "payload": {...}}` with
//! camelCase fields and timestamps in Unix milliseconds.

use chrono::{DateTime, Utc};
use common::{OperationKind, ProductId, UserId};
use domain::{CartError, CartLine, CartState, Money};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::presence::PresenceEntry;

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientEvent {
    #[serde(rename = "USER_CONNECT")]
    Attach(AttachPayload),

    #[serde(rename = "ADD_TO_CART")]
    AddItem(QuantityPayload),

    #[serde(rename = "UPDATE_QUANTITY")]
    SetQuantity(QuantityPayload),

    #[serde(rename = "REMOVE_FROM_CART")]
    RemoveItem(RemovePayload),
}

impl ClientEvent {
    /// Parses a text frame.
    pub fn parse(text: &str) -> Result<Self, SyncError> {
        serde_json::from_str(text).map_err(|e| SyncError::MalformedMessage(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachPayload {
    pub user_id: String,
    pub username: String,
}

/// Payload of add and set-quantity requests.
///
/// `quantity` is kept as raw JSON so a non-integer value is reported as an
/// invalid quantity rather than a malformed frame. `user_id` is accepted for
/// compatibility and ignored: the acting user is whoever attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityPayload {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: serde_json::Value,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl QuantityPayload {
    /// Returns the quantity if it is a JSON integer.
    pub fn quantity(&self) -> Result<i64, CartError> {
        self.quantity
            .as_i64()
            .ok_or_else(|| CartError::InvalidQuantity {
                value: self.quantity.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePayload {
    pub product_id: ProductId,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// Events sent by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "CART_UPDATED")]
    StateSync(StateSync),

    #[serde(rename = "USER_STATUS_UPDATE")]
    PresenceChanged(PresenceChanged),

    #[serde(rename = "OPERATION_NOTIFY")]
    OperationNotice(OperationNotice),

    #[serde(rename = "ERROR")]
    ErrorNotice(ErrorNotice),
}

impl ServerEvent {
    /// Short name used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::StateSync(_) => "state_sync",
            ServerEvent::PresenceChanged(_) => "presence_changed",
            ServerEvent::OperationNotice(_) => "operation_notice",
            ServerEvent::ErrorNotice(_) => "error_notice",
        }
    }
}

/// Full cart contents with totals computed at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSync {
    pub lines: Vec<CartLine>,
    pub total_items: u64,
    pub total_price: Money,
    pub last_modified_by: Option<UserId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_modified_at: DateTime<Utc>,
    /// Clients drop any sync whose revision is below one already applied.
    pub revision: u64,
}

impl From<&CartState> for StateSync {
    fn from(state: &CartState) -> Self {
        Self {
            lines: state.lines().to_vec(),
            total_items: state.total_items(),
            total_price: state.total_price(),
            last_modified_by: state.last_modified_by().cloned(),
            last_modified_at: state.last_modified_at(),
            revision: state.revision(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceChanged {
    pub all_users: Vec<PresenceEntry>,
    pub count: usize,
}

impl PresenceChanged {
    pub fn new(all_users: Vec<PresenceEntry>) -> Self {
        let count = all_users.len();
        Self { all_users, count }
    }
}

/// Human-readable announcement of an accepted mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationNotice {
    pub message: String,
    pub acting_user_id: UserId,
    pub operation_kind: OperationKind,
    pub product_name: String,
}

impl OperationNotice {
    /// Builds a notice; the text is always generated here, never taken
    /// from the client. `quantity` is the line quantity after an update.
    pub fn new(
        username: &str,
        acting_user_id: UserId,
        operation_kind: OperationKind,
        product_name: impl Into<String>,
        quantity: Option<u32>,
    ) -> Self {
        let product_name = product_name.into();
        let message = match (operation_kind, quantity) {
            (OperationKind::Add, _) => format!("{username} added {product_name} to the cart"),
            (OperationKind::Update, Some(q)) => {
                format!("{username} set {product_name} quantity to {q}")
            }
            (OperationKind::Update, None) => format!("{username} updated {product_name}"),
            (OperationKind::Remove, _) => {
                format!("{username} removed {product_name} from the cart")
            }
        };
        Self {
            message,
            acting_user_id,
            operation_kind,
            product_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
    pub code: String,
}

impl From<&SyncError> for ErrorNotice {
    fn from(err: &SyncError) -> Self {
        Self {
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }
}
