use std::collections::HashMap;

use async_trait::async_trait;
use futures::lock::Mutex;
use thiserror::Error;

use crate::models::{Category, ContactMessage, Product, ProductDraft};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("could not encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("{collection} record {id} not found")]
    NotFound { collection: &'static str, id: String },

    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Create/read/update/delete access to the `products`, `categories` and
/// `messages` collections.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    async fn find_product(&self, id: &str) -> Result<Option<Product>, StoreError>;
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;
    async fn update_product(&self, id: &str, draft: &ProductDraft) -> Result<(), StoreError>;
    async fn delete_product(&self, id: &str) -> Result<(), StoreError>;

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, StoreError>;
    async fn insert_message(&self, message: &ContactMessage) -> Result<(), StoreError>;
}

/// In-process store. Backs the `memory` backend and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    products: Mutex<HashMap<String, Product>>,
    categories: Mutex<Vec<Category>>,
    messages: Mutex<Vec<ContactMessage>>,
    fail_writes: Mutex<Option<String>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(categories: Vec<Category>) -> Self {
        MemoryStore {
            categories: Mutex::new(categories),
            ..Self::default()
        }
    }

    /// Makes every following write fail with `reason` until cleared with `None`.
    pub async fn fail_writes(&self, reason: Option<&str>) {
        *self.fail_writes.lock().await = reason.map(str::to_string);
    }

    /// Number of write calls that reached the store, failed ones included.
    pub async fn write_count(&self) -> usize {
        *self.writes.lock().await
    }

    async fn begin_write(&self) -> Result<(), StoreError> {
        *self.writes.lock().await += 1;
        match self.fail_writes.lock().await.as_ref() {
            Some(reason) => Err(StoreError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = self.products.lock().await.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.products.lock().await.get(id).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        self.begin_write().await?;
        self.products
            .lock()
            .await
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn update_product(&self, id: &str, draft: &ProductDraft) -> Result<(), StoreError> {
        self.begin_write().await?;
        match self.products.lock().await.get_mut(id) {
            Some(product) => {
                product.apply(draft);
                Ok(())
            }
            None => Err(StoreError::NotFound {
                collection: "products",
                id: id.to_string(),
            }),
        }
    }

    async fn delete_product(&self, id: &str) -> Result<(), StoreError> {
        self.begin_write().await?;
        match self.products.lock().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                collection: "products",
                id: id.to_string(),
            }),
        }
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.categories.lock().await.clone())
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, StoreError> {
        Ok(self.messages.lock().await.clone())
    }

    async fn insert_message(&self, message: &ContactMessage) -> Result<(), StoreError> {
        self.begin_write().await?;
        self.messages.lock().await.push(message.clone());
        Ok(())
    }
}
