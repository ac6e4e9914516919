//! Read-only views over the cached catalog.

use serde::Serialize;

use crate::models::{Category, Product, ProductSize};

pub const DEFAULT_FEATURED_COUNT: usize = 8;

/// A product as shown to shoppers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView<'a> {
    #[serde(flatten)]
    pub product: &'a Product,
    pub display_price: f64,
    pub on_sale: bool,
    pub category_name: &'a str,
    pub available_sizes: Vec<&'a ProductSize>,
}

impl<'a> ProductView<'a> {
    pub fn new(product: &'a Product, categories: &'a [Category]) -> Self {
        ProductView {
            product,
            display_price: product.display_price(),
            on_sale: product.has_discount(),
            category_name: category_name(categories, &product.category),
            available_sizes: product.available_sizes(),
        }
    }
}

pub fn category_name<'a>(categories: &'a [Category], category_id: &str) -> &'a str {
    categories
        .iter()
        .find(|c| c.id == category_id)
        .map(|c| c.name.as_str())
        .unwrap_or("Unknown category")
}

/// The first `count` products, newest first as cached.
pub fn featured(products: &[Product], count: usize) -> &[Product] {
    &products[..count.min(products.len())]
}

pub fn by_category<'a>(products: &'a [Product], category_id: &str) -> Vec<&'a Product> {
    products.iter().filter(|p| p.category == category_id).collect()
}

pub fn views<'a>(
    products: impl IntoIterator<Item = &'a Product>,
    categories: &'a [Category],
) -> Vec<ProductView<'a>> {
    products
        .into_iter()
        .map(|p| ProductView::new(p, categories))
        .collect()
}
