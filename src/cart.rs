use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{round_money, CartItem, Product};

/// A shopper's pending order lines. Lives only in memory until it is folded
/// into a contact message.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub unit_price: f64,
    pub quantity: u32,
    pub line_total: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub item_count: usize,
    pub total: f64,
}

impl CartSummary {
    /// Plain-text rendering used as the body of an order message.
    pub fn render(&self) -> String {
        let mut text = format!(
            "Order of {} item{}:\n",
            self.item_count,
            if self.item_count > 1 { "s" } else { "" }
        );
        for line in &self.lines {
            let size = line
                .size
                .as_deref()
                .map(|s| format!(" (size {s})"))
                .unwrap_or_default();
            text.push_str(&format!(
                "- {}{}: {:.2} DH x {} = {:.2} DH\n",
                line.name, size, line.unit_price, line.quantity, line.line_total
            ));
        }
        text.push_str(&format!("Total: {:.2} DH", self.total));
        text
    }
}

impl Cart {
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Adds `quantity` of `product`. A line with the same product and size
    /// is topped up instead of duplicated; a top-up that would overflow the
    /// line quantity is rejected and leaves the cart unchanged.
    pub fn add(
        &mut self,
        product: Product,
        size: Option<String>,
        quantity: u32,
    ) -> Result<&CartItem, ValidationError> {
        let quantity = quantity.max(1);
        let existing = self
            .items
            .iter()
            .position(|item| item.product.id == product.id && item.selected_size == size);

        let index = match existing {
            Some(index) => {
                let line = &mut self.items[index];
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or(ValidationError::QuantityTooLarge)?;
                index
            }
            None => {
                self.items.push(CartItem {
                    id: Uuid::new_v4().to_string(),
                    product,
                    selected_size: size,
                    quantity,
                    added_at: Utc::now(),
                });
                self.items.len() - 1
            }
        };
        Ok(&self.items[index])
    }

    /// Sets a line's quantity; zero removes the line. Returns false when the
    /// item is unknown.
    pub fn set_quantity(&mut self, item_id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(item_id);
        }
        match self.items.iter_mut().find(|item| item.id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, item_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        self.items.len() != before
    }

    pub fn total(&self) -> f64 {
        round_money(
            self.items
                .iter()
                .map(|item| item.product.price * f64::from(item.quantity))
                .sum(),
        )
    }

    pub fn summary(&self) -> CartSummary {
        let lines = self
            .items
            .iter()
            .map(|item| CartLine {
                product_id: item.product.id.clone(),
                name: item.product.name.clone(),
                size: item.selected_size.clone(),
                unit_price: item.product.price,
                quantity: item.quantity,
                line_total: item.line_total(),
            })
            .collect();
        CartSummary {
            lines,
            item_count: self.items.len(),
            total: self.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn grand_total_sums_price_times_quantity() {
        let mut cart = Cart::default();
        cart.add(fixtures::product("boot", 100.0), Some("42".into()), 2).unwrap();
        cart.add(fixtures::product("sandal", 50.0), None, 1).unwrap();

        assert_eq!(cart.total(), 250.0);
        let summary = cart.summary();
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.lines[0].line_total, 200.0);
        assert_eq!(summary.total, 250.0);
    }

    #[test]
    fn same_product_and_size_merges() {
        let mut cart = Cart::default();
        let boot = fixtures::product("boot", 100.0);
        cart.add(boot.clone(), Some("42".into()), 1).unwrap();
        cart.add(boot.clone(), Some("42".into()), 2).unwrap();
        cart.add(boot, Some("43".into()), 1).unwrap();

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn top_up_past_u32_max_is_rejected() {
        let mut cart = Cart::default();
        let boot = fixtures::product("boot", 100.0);
        cart.add(boot.clone(), Some("42".into()), u32::MAX).unwrap();

        assert_eq!(
            cart.add(boot, Some("42".into()), u32::MAX).unwrap_err(),
            ValidationError::QuantityTooLarge
        );
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, u32::MAX);
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::default();
        let id = cart.add(fixtures::product("boot", 100.0), None, 1).unwrap().id.clone();

        assert!(cart.set_quantity(&id, 4));
        assert_eq!(cart.total(), 400.0);
        assert!(cart.set_quantity(&id, 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(&id, 1));
    }

    #[test]
    fn summary_renders_lines_and_total() {
        let mut cart = Cart::default();
        cart.add(fixtures::product("boot", 100.0), Some("42".into()), 2).unwrap();
        let text = cart.summary().render();

        assert!(text.starts_with("Order of 1 item:\n"));
        assert!(text.contains("- boot (size 42): 100.00 DH x 2 = 200.00 DH"));
        assert!(text.ends_with("Total: 200.00 DH"));
    }
}
