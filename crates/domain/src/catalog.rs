//! Read-only product catalog.

use std::collections::BTreeMap;

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::cart::Money;

/// A product offered in the catalog. Never mutated once listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,

    /// Display name, copied into cart lines and audit entries.
    pub name: String,

    /// Unit price.
    pub price: Money,

    /// Image reference for the presentation layer.
    pub image: String,

    pub description: String,
}

impl Product {
    /// Creates a product with an empty image and description.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image: String::new(),
            description: String::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Lookup contract the cart store consumes.
///
/// Implementations must answer from memory: lookups happen while the cart
/// store holds its write lock.
pub trait Catalog: Send + Sync + 'static {
    /// Returns the product with the given id, if listed.
    fn get(&self, id: &ProductId) -> Option<Product>;

    /// Returns every listed product, ordered by id.
    fn list(&self) -> Vec<Product>;
}

/// Fixed in-memory catalog.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    products: BTreeMap<ProductId, Product>,
}

impl StaticCatalog {
    /// Creates a catalog from the given products. A later duplicate id wins.
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|product| (product.id.clone(), product))
                .collect(),
        }
    }

    /// Creates the catalog the server ships with.
    pub fn seeded() -> Self {
        Self::new([
            Product::new("p1", "iPhone 15 Pro", Money::from_units(7999))
                .with_image("/images/iphone-15-pro.png")
                .with_description("Latest iPhone with a titanium frame"),
            Product::new("p2", "MacBook Air M3", Money::from_units(8999))
                .with_image("/images/macbook-air-m3.png")
                .with_description("Thin, light and fast laptop"),
            Product::new("p3", "AirPods Pro", Money::from_units(1999))
                .with_image("/images/airpods-pro.png")
                .with_description("Wireless earbuds with active noise cancellation"),
            Product::new("p4", "iPad Pro 12.9", Money::from_units(6999))
                .with_image("/images/ipad-pro-12-9.png")
                .with_description("Professional tablet with Apple Pencil support"),
        ])
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::seeded()
    }
}

impl Catalog for StaticCatalog {
    fn get(&self, id: &ProductId) -> Option<Product> {
        self.products.get(id).cloned()
    }

    fn list(&self) -> Vec<Product> {
        self.products.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_catalog_lists_four_products_in_id_order() {
        let catalog = StaticCatalog::seeded();
        let ids: Vec<_> = catalog
            .list()
            .into_iter()
            .map(|p| p.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p4"]);
    }

    #[test]
    fn get_returns_listed_product() {
        let catalog = StaticCatalog::seeded();
        let product = catalog.get(&ProductId::new("p3")).unwrap();
        assert_eq!(product.name, "AirPods Pro");
        assert_eq!(product.price, Money::from_units(1999));
    }

    #[test]
    fn get_unknown_product_is_none() {
        let catalog = StaticCatalog::seeded();
        assert!(catalog.get(&ProductId::new("unknown")).is_none());
    }

    #[test]
    fn duplicate_ids_keep_last_product() {
        let catalog = StaticCatalog::new([
            Product::new("x", "First", Money::from_minor(100)),
            Product::new("x", "Second", Money::from_minor(200)),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(&ProductId::new("x")).unwrap().name, "Second");
    }

    #[test]
    fn product_serializes_camel_case() {
        let product = Product::new("p9", "Cable", Money::from_minor(1250));
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["id"], "p9");
        assert_eq!(json["price"], 1250);
        assert!(json.get("description").is_some());
    }
}
