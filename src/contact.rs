use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartSummary};
use crate::error::PersistenceError;
use crate::models::{ContactMessage, OrderStatus};
use crate::state::AppState;

/// Query string of the contact page.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContactQuery {
    pub product: Option<String>,
    pub size: Option<String>,
    /// Id of the cart being ordered. Present only for full-cart orders.
    pub cart: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("message", &self.message),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

pub fn product_message(product_name: &str, size: Option<&str>) -> String {
    match size {
        Some(size) => format!("Hello, I am interested in the product: {product_name} - Size: {size}"),
        None => format!("Hello, I am interested in the product: {product_name}"),
    }
}

/// What the contact page shows before the shopper types anything.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDraft {
    pub form: ContactForm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart: Option<CartSummary>,
}

impl ContactDraft {
    pub fn prepare(state: &AppState, query: &ContactQuery) -> Self {
        let cart = query.cart.as_deref().map(|id| {
            state
                .cart(id)
                .map(Cart::summary)
                .unwrap_or_else(|| Cart::default().summary())
        });

        let message = match (&query.message, &query.product, &cart) {
            (Some(message), _, _) => message.clone(),
            (None, Some(product_id), _) => {
                let name = state.product(product_id).map(|p| p.name.as_str()).unwrap_or("");
                product_message(name, query.size.as_deref())
            }
            (None, None, Some(summary)) if summary.item_count > 0 => summary.render(),
            _ => String::new(),
        };

        ContactDraft {
            form: ContactForm {
                message,
                ..ContactForm::default()
            },
            product_id: query.product.clone(),
            selected_size: query.size.clone(),
            cart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStage {
    Editing,
    Submitting,
    Submitted,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// A required field was empty. Nothing was sent.
    Incomplete,
    Sent(ContactMessage),
}

/// The contact/order form and where it is in its lifecycle.
#[derive(Debug)]
pub struct ContactWorkflow {
    pub form: ContactForm,
    pub product_id: Option<String>,
    pub cart_id: Option<String>,
    stage: ContactStage,
    last_error: Option<String>,
}

impl ContactWorkflow {
    pub fn new(form: ContactForm, query: &ContactQuery) -> Self {
        ContactWorkflow {
            form,
            product_id: query.product.clone(),
            cart_id: query.cart.clone(),
            stage: ContactStage::Editing,
            last_error: None,
        }
    }

    pub fn stage(&self) -> ContactStage {
        self.stage
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Sends the form as a contact message, or as an order when a cart is
    /// attached. On failure the form is left as typed.
    pub async fn submit(&mut self, state: &mut AppState) -> Result<SubmitOutcome, PersistenceError> {
        if self.stage != ContactStage::Editing || !self.form.is_complete() {
            return Ok(SubmitOutcome::Incomplete);
        }
        self.stage = ContactStage::Submitting;

        let order_total = self
            .cart_id
            .as_deref()
            .and_then(|id| state.cart(id))
            .filter(|cart| !cart.is_empty())
            .map(|cart| cart.total());

        let message = ContactMessage {
            id: String::new(),
            name: self.form.name.trim().to_string(),
            email: self.form.email.trim().to_string(),
            phone: self.form.phone.trim().to_string(),
            message: self.form.message.clone(),
            product_id: self.product_id.clone(),
            created_at: Utc::now(),
            read: false,
            order_status: order_total.map(|_| OrderStatus::Pending),
            order_price: order_total,
        };

        match state.add_message(message).await {
            Ok(sent) => {
                if let (Some(cart_id), Some(total)) = (&self.cart_id, order_total) {
                    info!("Order {} placed for {:.2} DH", sent.id, total);
                    state.clear_cart(cart_id);
                }
                self.form = ContactForm::default();
                self.stage = ContactStage::Submitted;
                self.last_error = None;
                Ok(SubmitOutcome::Sent(sent))
            }
            Err(e) => {
                error!("Error while sending message: {}", e);
                self.stage = ContactStage::Editing;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Back to a blank form after a confirmation.
    pub fn reset(&mut self) {
        self.form = ContactForm::default();
        self.stage = ContactStage::Editing;
        self.last_error = None;
    }
}
