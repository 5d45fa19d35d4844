//! Product lookup used by entry creation and the invoice generator.
//!
//! The catalog is always passed in explicitly; nothing in this crate reads
//! products from a shared source.

use std::collections::HashMap;

use crate::types::Product;

pub trait ProductCatalog {
    fn product(&self, id: &str) -> Option<&Product>;

    /// Case-insensitive match on `Product::reference`, ignoring surrounding
    /// whitespace.
    fn product_by_reference(&self, reference: &str) -> Option<&Product>;
}

fn same_reference(product: &Product, reference: &str) -> bool {
    product.reference.trim().to_lowercase() == reference.trim().to_lowercase()
}

impl ProductCatalog for [Product] {
    fn product(&self, id: &str) -> Option<&Product> {
        self.iter().find(|p| p.id == id)
    }

    fn product_by_reference(&self, reference: &str) -> Option<&Product> {
        self.iter().find(|p| same_reference(p, reference))
    }
}

impl ProductCatalog for Vec<Product> {
    fn product(&self, id: &str) -> Option<&Product> {
        self.as_slice().product(id)
    }

    fn product_by_reference(&self, reference: &str) -> Option<&Product> {
        self.as_slice().product_by_reference(reference)
    }
}

impl ProductCatalog for HashMap<String, Product> {
    fn product(&self, id: &str) -> Option<&Product> {
        self.get(id)
    }

    fn product_by_reference(&self, reference: &str) -> Option<&Product> {
        self.values().find(|p| same_reference(p, reference))
    }
}
