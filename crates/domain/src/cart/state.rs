//! The cart aggregate.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};

use super::{CartLine, Money};

/// Point-in-time value of the shared cart.
///
/// Lines keep insertion order and hold at most one entry per product.
/// Totals are derived from the lines on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartState {
    lines: Vec<CartLine>,
    last_modified_by: Option<UserId>,
    last_modified_at: DateTime<Utc>,
    revision: u64,
}

impl CartState {
    /// Creates an empty cart stamped with the current time.
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            last_modified_by: None,
            last_modified_at: Utc::now(),
            revision: 0,
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the line for a product, if any.
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id() == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line quantities.
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity())).sum()
    }

    /// Sum of all line subtotals.
    pub fn total_price(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// User of the most recent accepted mutation; `None` until the first one.
    pub fn last_modified_by(&self) -> Option<&UserId> {
        self.last_modified_by.as_ref()
    }

    pub fn last_modified_at(&self) -> DateTime<Utc> {
        self.last_modified_at
    }

    /// Number of accepted mutations since process start.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id() == product_id)
    }

    pub(crate) fn push_line(&mut self, line: CartLine) {
        debug_assert!(self.line(line.product_id()).is_none());
        self.lines.push(line);
    }

    pub(crate) fn take_line(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id() == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Last-writer-wins stamp applied after every accepted mutation.
    pub(crate) fn touch(&mut self, actor: &UserId) {
        self.last_modified_by = Some(actor.clone());
        self.last_modified_at = Utc::now();
        self.revision += 1;
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}
