use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info};
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::PersistenceError;
use crate::models::{Category, ContactMessage, Product, ProductDraft};
use crate::store::{EntityStore, StoreError};

/// Owned application state: cached entities mirrored from the entity store,
/// plus the in-memory carts.
///
/// Mutations write through to the store first and only touch the cache once
/// the store has accepted the write, so a failed call leaves the cache as it was.
pub struct AppState {
    store: Arc<dyn EntityStore>,
    products: Vec<Product>,
    categories: Vec<Category>,
    messages: Vec<ContactMessage>,
    carts: HashMap<String, Cart>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        AppState {
            store,
            products: Vec::new(),
            categories: Vec::new(),
            messages: Vec::new(),
            carts: HashMap::new(),
        }
    }

    /// Replaces the cached products, categories and messages with the store's.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        let products = self.store.list_products().await?;
        let categories = self.store.list_categories().await?;
        let messages = self.store.list_messages().await?;
        info!(
            "Loaded {} products, {} categories, {} messages",
            products.len(),
            categories.len(),
            messages.len()
        );
        self.products = products;
        self.categories = categories;
        self.messages = messages;
        Ok(())
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn messages(&self) -> &[ContactMessage] {
        &self.messages
    }

    pub fn cart(&self, cart_id: &str) -> Option<&Cart> {
        self.carts.get(cart_id)
    }

    pub fn cart_mut(&mut self, cart_id: &str) -> &mut Cart {
        self.carts.entry(cart_id.to_string()).or_default()
    }

    /// Like `cart_mut`, but never creates the cart.
    pub fn existing_cart_mut(&mut self, cart_id: &str) -> Option<&mut Cart> {
        self.carts.get_mut(cart_id)
    }

    pub fn clear_cart(&mut self, cart_id: &str) {
        self.carts.remove(cart_id);
    }

    pub async fn add_message(&mut self, mut message: ContactMessage) -> Result<ContactMessage, PersistenceError> {
        if message.id.is_empty() {
            message.id = Uuid::new_v4().to_string();
        }
        info!("Saving message {} from {}", message.id, message.email);
        if let Err(e) = self.store.insert_message(&message).await {
            error!("Failed to save message {}: {}", message.id, e);
            return Err(PersistenceError::new("send message", e));
        }
        self.messages.insert(0, message.clone());
        Ok(message)
    }

    pub async fn add_product(&mut self, draft: &ProductDraft) -> Result<Product, PersistenceError> {
        let product = Product::from_draft(Uuid::new_v4().to_string(), draft, Utc::now());
        info!("Adding product {} ({})", product.id, product.name);
        if let Err(e) = self.store.insert_product(&product).await {
            error!("Failed to add product {}: {}", product.name, e);
            return Err(PersistenceError::new("add product", e));
        }
        self.products.insert(0, product.clone());
        Ok(product)
    }

    /// Updates a product in place. Id and creation time stay as stored.
    pub async fn update_product(&mut self, id: &str, draft: &ProductDraft) -> Result<Product, PersistenceError> {
        info!("Updating product {}", id);
        if let Err(e) = self.store.update_product(id, draft).await {
            error!("Failed to update product {}: {}", id, e);
            return Err(PersistenceError::new("update product", e));
        }
        match self.products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.apply(draft);
                Ok(product.clone())
            }
            // Written remotely but not cached yet: pull the stored record.
            None => match self.store.find_product(id).await {
                Ok(Some(product)) => {
                    self.products.insert(0, product.clone());
                    Ok(product)
                }
                Ok(None) => Err(PersistenceError::new(
                    "update product",
                    StoreError::NotFound {
                        collection: "products",
                        id: id.to_string(),
                    },
                )),
                Err(e) => Err(PersistenceError::new("update product", e)),
            },
        }
    }

    pub async fn delete_product(&mut self, id: &str) -> Result<(), PersistenceError> {
        info!("Deleting product {}", id);
        if let Err(e) = self.store.delete_product(id).await {
            error!("Failed to delete product {}: {}", id, e);
            return Err(PersistenceError::new("delete product", e));
        }
        self.products.retain(|p| p.id != id);
        Ok(())
    }
}
