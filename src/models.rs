use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shoe sizes the shop stocks, in display order.
pub const SIZE_LABELS: [&str; 16] = [
    "35", "36", "37", "38", "39", "40", "41", "42", "43", "44", "45", "46", "47", "48", "49", "50",
];

/// Stock assigned to a size when it is first marked available.
pub const DEFAULT_SIZE_STOCK: u32 = 10;

pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Price after applying a percentage discount to `base`.
pub fn discounted_price(base: f64, percent: f64) -> f64 {
    round_money(base * (1.0 - percent / 100.0))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSize {
    pub size: String,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_image: Option<String>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    pub category: String,
    // material
    #[serde(default)]
    pub weight: String,
    // style
    #[serde(default, rename = "type")]
    pub kind: String,
    // included accessories
    #[serde(default)]
    pub packaging: String,
    #[serde(default)]
    pub features: Vec<String>,
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<ProductSize>,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn from_draft(id: String, draft: &ProductDraft, created_at: DateTime<Utc>) -> Self {
        let mut product = Product {
            id,
            name: String::new(),
            description: String::new(),
            description_image: None,
            price: 0.0,
            discount: None,
            original_price: None,
            category: String::new(),
            weight: String::new(),
            kind: String::new(),
            packaging: String::new(),
            features: Vec::new(),
            images: Vec::new(),
            sizes: Vec::new(),
            in_stock: true,
            created_at,
        };
        product.apply(draft);
        product
    }

    /// Overwrites every editable field from `draft`. Id and creation time are kept.
    pub fn apply(&mut self, draft: &ProductDraft) {
        self.name = draft.name.clone();
        self.description = draft.description.clone();
        match &draft.description_image {
            FieldChange::Keep => {}
            FieldChange::Set(url) => self.description_image = Some(url.clone()),
            FieldChange::Clear => self.description_image = None,
        }
        self.price = draft.price;
        self.discount = draft.discount;
        self.original_price = draft.original_price;
        self.category = draft.category.clone();
        self.weight = draft.weight.clone();
        self.kind = draft.kind.clone();
        self.packaging = draft.packaging.clone();
        self.features = draft.features.clone();
        self.images = draft.images.clone();
        self.sizes = draft.sizes.clone();
        self.in_stock = draft.in_stock;
    }

    pub fn has_discount(&self) -> bool {
        self.discount.map_or(false, |d| d > 0.0) && self.original_price.is_some()
    }

    /// The price a shopper pays. Already discounted when a discount is set.
    pub fn display_price(&self) -> f64 {
        match (self.discount, self.original_price) {
            (Some(discount), Some(original)) => discounted_price(original, discount),
            _ => self.price,
        }
    }

    pub fn available_sizes(&self) -> Vec<&ProductSize> {
        self.sizes.iter().filter(|s| s.available).collect()
    }
}

/// Three-way update for an optional stored field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange<T> {
    Keep,
    Set(T),
    Clear,
}

/// A product record as derived from the admin form, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub description_image: FieldChange<String>,
    pub price: f64,
    pub discount: Option<f64>,
    pub original_price: Option<f64>,
    pub category: String,
    pub weight: String,
    pub kind: String,
    pub packaging: String,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub sizes: Vec<ProductSize>,
    pub in_stock: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Sent,
    Received,
    Cancelled,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_price: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub product: Product,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        round_money(self.product.price * f64::from(self.quantity))
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String, // Subject (admin id)
    pub exp: usize,  // Expiration time as UTC timestamp
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn draft(name: &str, price: f64) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: format!("{name} description"),
            description_image: FieldChange::Keep,
            price,
            discount: None,
            original_price: None,
            category: "sneakers".to_string(),
            weight: "Leather".to_string(),
            kind: "Casual".to_string(),
            packaging: "Box".to_string(),
            features: vec!["Breathable".to_string()],
            images: vec![format!("https://img.example/{name}.jpg")],
            sizes: vec![ProductSize {
                size: "42".to_string(),
                available: true,
                stock: Some(10),
            }],
            in_stock: true,
        }
    }

    pub fn product(id: &str, price: f64) -> Product {
        Product::from_draft(id.to_string(), &draft(id, price), Utc::now())
    }
}
