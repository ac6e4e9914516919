use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, Database};

use crate::models::{Category, ContactMessage, FieldChange, Product, ProductDraft};
use crate::store::{EntityStore, StoreError};

pub async fn connect(database_url: &str, database_name: &str) -> Result<Database, StoreError> {
    let client_options = ClientOptions::parse(database_url).await?;
    let client = Client::with_options(client_options)?;
    Ok(client.database(database_name))
}

/// Entity store backed by the `products`, `categories` and `messages` collections.
pub struct MongoStore {
    products: Collection<Product>,
    categories: Collection<Category>,
    messages: Collection<ContactMessage>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        MongoStore {
            products: db.collection("products"),
            categories: db.collection("categories"),
            messages: db.collection("messages"),
        }
    }
}

/// Builds the update for a product draft. Cleared optional fields go to
/// `$unset` so no stale value survives in the document.
fn product_update(draft: &ProductDraft) -> Result<Document, StoreError> {
    let mut set = doc! {
        "name": draft.name.as_str(),
        "description": draft.description.as_str(),
        "price": draft.price,
        "category": draft.category.as_str(),
        "weight": draft.weight.as_str(),
        "type": draft.kind.as_str(),
        "packaging": draft.packaging.as_str(),
        "features": draft.features.clone(),
        "images": draft.images.clone(),
        "sizes": bson::to_bson(&draft.sizes)?,
        "inStock": draft.in_stock,
    };
    let mut unset = Document::new();

    match &draft.description_image {
        FieldChange::Keep => {}
        FieldChange::Set(url) => {
            set.insert("descriptionImage", url.as_str());
        }
        FieldChange::Clear => {
            unset.insert("descriptionImage", "");
        }
    }
    match (draft.discount, draft.original_price) {
        (Some(discount), Some(original)) => {
            set.insert("discount", discount);
            set.insert("originalPrice", original);
        }
        _ => {
            unset.insert("discount", "");
            unset.insert("originalPrice", "");
        }
    }

    let mut update = doc! { "$set": set };
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    Ok(update)
}

#[async_trait]
impl EntityStore for MongoStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let cursor = self.products.find(None, options).await?;
        let products: Vec<Product> = cursor.try_collect().await?;
        Ok(products)
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.products.find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        self.products.insert_one(product, None).await?;
        Ok(())
    }

    async fn update_product(&self, id: &str, draft: &ProductDraft) -> Result<(), StoreError> {
        let update = product_update(draft)?;
        let result = self
            .products
            .update_one(doc! { "_id": id }, update, None)
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound {
                collection: "products",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_product(&self, id: &str) -> Result<(), StoreError> {
        let result = self.products.delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound {
                collection: "products",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let cursor = self.categories.find(None, None).await?;
        let categories: Vec<Category> = cursor.try_collect().await?;
        Ok(categories)
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let cursor = self.messages.find(None, options).await?;
        let messages: Vec<ContactMessage> = cursor.try_collect().await?;
        Ok(messages)
    }

    async fn insert_message(&self, message: &ContactMessage) -> Result<(), StoreError> {
        self.messages.insert_one(message, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn cleared_description_image_is_unset() {
        let mut draft = fixtures::draft("runner", 120.0);
        draft.description_image = FieldChange::Clear;
        let update = product_update(&draft).unwrap();

        let unset = update.get_document("$unset").unwrap();
        assert!(unset.contains_key("descriptionImage"));
        let set = update.get_document("$set").unwrap();
        assert!(!set.contains_key("descriptionImage"));
        assert_eq!(set.get_f64("price").unwrap(), 120.0);
    }

    #[test]
    fn kept_description_image_is_untouched() {
        let mut draft = fixtures::draft("runner", 150.0);
        draft.discount = Some(25.0);
        draft.original_price = Some(200.0);
        let update = product_update(&draft).unwrap();

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_f64("originalPrice").unwrap(), 200.0);
        assert!(!set.contains_key("descriptionImage"));
        assert!(update.get_document("$unset").is_err());
    }
}
