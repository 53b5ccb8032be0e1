//! Maps provider product ids to product types.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::billing_event::OrderPayload;
use super::payment::ProductType;

/// Products sold on the production and sandbox storefronts.
static KNOWN_PRODUCTS: Lazy<HashMap<&'static str, ProductType>> = Lazy::new(|| {
    HashMap::from([
        // production
        ("7a2b5d36-9363-4b56-87e4-c99d9e65816f", ProductType::Lifetime),
        ("e0cad99e-b0d0-4489-9e85-dc028af8d0eb", ProductType::FixedTerm),
        // sandbox
        ("8b37c090-f5a7-427a-b653-bc29055c0d4c", ProductType::Lifetime),
        ("b6bbf3a4-2b26-4889-9489-01a4b774faa6", ProductType::FixedTerm),
    ])
});

/// Product lookup table: built-in storefront products plus configured extras.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    extra: HashMap<String, ProductType>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers additional product ids, e.g. for a new storefront.
    pub fn with_products<I, S>(mut self, product_type: ProductType, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.extra.insert(id.into(), product_type);
        }
        self
    }

    pub fn lookup(&self, product_id: &str) -> Option<ProductType> {
        self.extra
            .get(product_id)
            .or_else(|| KNOWN_PRODUCTS.get(product_id))
            .copied()
    }

    /// Classifies an order: the checkout label wins, then the product id.
    pub fn classify(&self, order: &OrderPayload) -> Option<ProductType> {
        order
            .metadata_product_type()
            .and_then(ProductType::from_label)
            .or_else(|| order.product_id.as_deref().and_then(|id| self.lookup(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(product_id: Option<&str>, metadata: serde_json::Value) -> OrderPayload {
        OrderPayload {
            id: "ord_1".to_string(),
            product_id: product_id.map(str::to_string),
            metadata,
            ..Default::default()
        }
    }

    #[test]
    fn known_production_and_sandbox_products() {
        let catalog = ProductCatalog::new();
        assert_eq!(
            catalog.lookup("7a2b5d36-9363-4b56-87e4-c99d9e65816f"),
            Some(ProductType::Lifetime)
        );
        assert_eq!(
            catalog.lookup("b6bbf3a4-2b26-4889-9489-01a4b774faa6"),
            Some(ProductType::FixedTerm)
        );
        assert_eq!(catalog.lookup("prod_unknown"), None);
    }

    #[test]
    fn metadata_label_beats_product_id() {
        let catalog = ProductCatalog::new();
        let o = order(
            Some("7a2b5d36-9363-4b56-87e4-c99d9e65816f"),
            json!({"productType": "1-year"}),
        );
        assert_eq!(catalog.classify(&o), Some(ProductType::FixedTerm));
    }

    #[test]
    fn unrecognised_label_falls_back_to_product_id() {
        let catalog = ProductCatalog::new();
        let o = order(
            Some("e0cad99e-b0d0-4489-9e85-dc028af8d0eb"),
            json!({"productType": "monthly"}),
        );
        assert_eq!(catalog.classify(&o), Some(ProductType::FixedTerm));
    }

    #[test]
    fn unclassifiable_order() {
        let catalog = ProductCatalog::new();
        assert_eq!(catalog.classify(&order(Some("prod_x"), json!({}))), None);
        assert_eq!(catalog.classify(&order(None, serde_json::Value::Null)), None);
    }

    #[test]
    fn configured_products_are_recognised() {
        let catalog = ProductCatalog::new().with_products(ProductType::Lifetime, ["prod_new"]);
        assert_eq!(catalog.classify(&order(Some("prod_new"), json!({}))), Some(ProductType::Lifetime));
    }
}
