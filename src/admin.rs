use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ValidationError};
use crate::models::{
    discounted_price, round_money, FieldChange, Product, ProductDraft, ProductSize,
    DEFAULT_SIZE_STOCK, SIZE_LABELS,
};
use crate::state::AppState;

/// Working set of sizes in the product form. Only available sizes are held;
/// switching a size off drops it along with its stock.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SizeMatrix {
    entries: Vec<ProductSize>,
}

impl SizeMatrix {
    pub fn from_sizes(sizes: &[ProductSize]) -> Result<Self, ValidationError> {
        let mut matrix = SizeMatrix::default();
        for size in sizes.iter().filter(|s| s.available) {
            matrix.toggle(&size.size, true)?;
            if let Some(stock) = size.stock {
                matrix.set_stock(&size.size, stock)?;
            }
        }
        Ok(matrix)
    }

    pub fn toggle(&mut self, label: &str, available: bool) -> Result<(), ValidationError> {
        check_label(label)?;
        let existing = self.entries.iter().position(|s| s.size == label);
        match (available, existing) {
            (true, None) => self.entries.push(ProductSize {
                size: label.to_string(),
                available: true,
                stock: Some(DEFAULT_SIZE_STOCK),
            }),
            (false, Some(index)) => {
                self.entries.remove(index);
            }
            _ => {}
        }
        Ok(())
    }

    /// Ignored for sizes that are not currently available.
    pub fn set_stock(&mut self, label: &str, stock: u32) -> Result<(), ValidationError> {
        check_label(label)?;
        if let Some(entry) = self.entries.iter_mut().find(|s| s.size == label) {
            entry.stock = Some(stock);
        }
        Ok(())
    }

    /// Available sizes in label order.
    pub fn entries(&self) -> Vec<ProductSize> {
        SIZE_LABELS
            .iter()
            .filter_map(|label| self.entries.iter().find(|s| s.size == *label))
            .cloned()
            .collect()
    }
}

fn check_label(label: &str) -> Result<(), ValidationError> {
    if SIZE_LABELS.contains(&label) {
        Ok(())
    } else {
        Err(ValidationError::UnknownSize(label.to_string()))
    }
}

/// The admin product form as typed: numbers stay strings until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub discount: String,
    pub category: String,
    pub weight: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub packaging: String,
    pub features: String,
    pub images: Vec<String>,
    pub description_image: String,
    pub use_image_description: bool,
    pub in_stock: bool,
    pub sizes: Vec<ProductSize>,
}

impl Default for ProductForm {
    fn default() -> Self {
        ProductForm {
            name: String::new(),
            description: String::new(),
            price: String::new(),
            discount: String::new(),
            category: String::new(),
            weight: String::new(),
            kind: String::new(),
            packaging: String::new(),
            features: String::new(),
            images: vec![String::new()],
            description_image: String::new(),
            use_image_description: false,
            in_stock: true,
            sizes: Vec::new(),
        }
    }
}

impl ProductForm {
    /// Prefills the form from a stored product. A discounted product shows
    /// its original price so the discount can be changed or removed.
    pub fn from_product(product: &Product) -> Self {
        let base_price = match (product.discount, product.original_price) {
            (Some(_), Some(original)) => original,
            _ => product.price,
        };
        ProductForm {
            name: product.name.clone(),
            description: product.description.clone(),
            price: base_price.to_string(),
            discount: product.discount.map(|d| d.to_string()).unwrap_or_default(),
            category: product.category.clone(),
            weight: product.weight.clone(),
            kind: product.kind.clone(),
            packaging: product.packaging.clone(),
            features: product.features.join(", "),
            images: product.images.clone(),
            description_image: product.description_image.clone().unwrap_or_default(),
            use_image_description: product.description_image.is_some(),
            in_stock: product.in_stock,
            sizes: product.sizes.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.price.trim().is_empty() {
            missing.push("price");
        }
        if self.category.trim().is_empty() {
            missing.push("category");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let price = self.parse_price()?;
        if price <= 0.0 {
            return Err(ValidationError::NonPositivePrice);
        }
        self.parse_discount()?;
        if self.valid_images().is_empty() {
            return Err(ValidationError::NoImage);
        }
        SizeMatrix::from_sizes(&self.sizes)?;
        Ok(())
    }

    fn parse_price(&self) -> Result<f64, ValidationError> {
        let raw = self.price.trim();
        raw.parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| ValidationError::InvalidPrice(raw.to_string()))
    }

    fn parse_discount(&self) -> Result<Option<f64>, ValidationError> {
        let raw = self.discount.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<f64>() {
            Ok(d) if (0.0..=100.0).contains(&d) => Ok(Some(d).filter(|d| *d > 0.0)),
            _ => Err(ValidationError::InvalidDiscount(raw.to_string())),
        }
    }

    fn valid_images(&self) -> Vec<String> {
        self.images
            .iter()
            .map(|img| img.trim())
            .filter(|img| !img.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Validates and derives the record to persist. `editing` is the stored
    /// product when this form edits one.
    pub fn to_draft(&self, editing: Option<&Product>) -> Result<ProductDraft, ValidationError> {
        self.validate()?;

        let base_price = round_money(self.parse_price()?);
        let discount = self.parse_discount()?;
        let (price, original_price) = match discount {
            Some(percent) => (discounted_price(base_price, percent), Some(base_price)),
            None => (base_price, None),
        };

        let description_image = if self.use_image_description && !self.description_image.trim().is_empty() {
            FieldChange::Set(self.description_image.trim().to_string())
        } else if editing.map_or(false, |p| p.description_image.is_some()) {
            FieldChange::Clear
        } else {
            FieldChange::Keep
        };

        Ok(ProductDraft {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            description_image,
            price,
            discount,
            original_price,
            category: self.category.trim().to_string(),
            weight: self.weight.trim().to_string(),
            kind: self.kind.trim().to_string(),
            packaging: self.packaging.trim().to_string(),
            features: self
                .features
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
            images: self.valid_images(),
            sizes: SizeMatrix::from_sizes(&self.sizes)?.entries(),
            in_stock: self.in_stock,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorStage {
    Closed,
    Open,
    Editing,
    Submitting,
}

/// The product form modal: which product it edits, what it holds and
/// whether it is showing.
#[derive(Debug)]
pub struct ProductEditor {
    pub form: ProductForm,
    editing: Option<Product>,
    stage: EditorStage,
    last_error: Option<String>,
}

impl Default for ProductEditor {
    fn default() -> Self {
        ProductEditor {
            form: ProductForm::default(),
            editing: None,
            stage: EditorStage::Closed,
            last_error: None,
        }
    }
}

impl ProductEditor {
    pub fn stage(&self) -> EditorStage {
        self.stage
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn open(&mut self) {
        self.form = ProductForm::default();
        self.editing = None;
        self.stage = EditorStage::Open;
        self.last_error = None;
    }

    pub fn edit(&mut self, product: Product) {
        self.form = ProductForm::from_product(&product);
        self.editing = Some(product);
        self.stage = EditorStage::Editing;
        self.last_error = None;
    }

    pub fn close(&mut self) {
        *self = ProductEditor::default();
    }

    /// Creates or updates the product. On success the form resets and
    /// closes; on failure it stays open with the error and the typed values.
    pub async fn save(&mut self, state: &mut AppState) -> Result<Product, AppError> {
        let reopen = match self.stage {
            EditorStage::Open | EditorStage::Editing => self.stage,
            EditorStage::Closed | EditorStage::Submitting => return Err(AppError::FormNotOpen),
        };

        let draft = match self.form.to_draft(self.editing.as_ref()) {
            Ok(draft) => draft,
            Err(e) => {
                self.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };

        self.stage = EditorStage::Submitting;
        info!("Saving product {}", draft.name);
        let result = match &self.editing {
            Some(product) => state.update_product(&product.id, &draft).await,
            None => state.add_product(&draft).await,
        };

        match result {
            Ok(product) => {
                info!("Product {} saved", product.id);
                self.close();
                Ok(product)
            }
            Err(e) => {
                error!("Error while saving product: {}", e);
                self.stage = reopen;
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "productId", rename_all = "snake_case")]
pub enum DeletePrompt {
    Idle,
    ConfirmPending(String),
    Deleted(String),
    Cancelled(String),
}

impl DeletePrompt {
    pub fn request(product_id: &str) -> Self {
        DeletePrompt::ConfirmPending(product_id.to_string())
    }

    pub fn cancel(self) -> Self {
        match self {
            DeletePrompt::ConfirmPending(id) => DeletePrompt::Cancelled(id),
            other => other,
        }
    }

    /// Deletes the pending product. Anything but a pending prompt is left as is.
    pub async fn confirm(self, state: &mut AppState) -> Result<Self, AppError> {
        match self {
            DeletePrompt::ConfirmPending(id) => {
                state.delete_product(&id).await?;
                info!("Product {} deleted", id);
                Ok(DeletePrompt::Deleted(id))
            }
            other => Ok(other),
        }
    }
}
