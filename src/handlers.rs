use actix_web::{web, HttpResponse};
use futures::lock::Mutex;
use serde::Deserialize;
use serde_json::json;

use crate::admin::{DeletePrompt, ProductEditor, ProductForm};
use crate::cart::Cart;
use crate::catalog::{self, ProductView};
use crate::config::Config;
use crate::contact::{ContactDraft, ContactForm, ContactQuery, ContactWorkflow, SubmitOutcome};
use crate::error::{AppError, PersistenceError, ValidationError};
use crate::middleware::AdminAuth;
use crate::models::SIZE_LABELS;
use crate::state::AppState;

pub type SharedState = web::Data<Mutex<AppState>>;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub product_id: String,
    pub size: Option<String>,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityInput {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub confirm: Option<bool>,
}

async fn list_products(data: SharedState, query: web::Query<CatalogQuery>) -> HttpResponse {
    let state = data.lock().await;
    let products = match &query.category {
        Some(category) => catalog::by_category(state.products(), category),
        None => state.products().iter().collect(),
    };
    HttpResponse::Ok().json(catalog::views(products, state.categories()))
}

async fn featured_products(data: SharedState, config: web::Data<Config>) -> HttpResponse {
    let state = data.lock().await;
    let featured = catalog::featured(state.products(), config.featured_count);
    HttpResponse::Ok().json(catalog::views(featured, state.categories()))
}

async fn get_product(data: SharedState, id: web::Path<String>) -> Result<HttpResponse, AppError> {
    let state = data.lock().await;
    let id = id.into_inner();
    match state.product(&id) {
        Some(product) => Ok(HttpResponse::Ok().json(ProductView::new(product, state.categories()))),
        None => Err(AppError::NotFound(format!("product {id}"))),
    }
}

async fn list_categories(data: SharedState) -> HttpResponse {
    let state = data.lock().await;
    HttpResponse::Ok().json(state.categories())
}

fn cart_body(state: &AppState, cart_id: &str) -> serde_json::Value {
    match state.cart(cart_id) {
        Some(cart) => json!({ "items": cart.items(), "summary": cart.summary() }),
        None => json!({ "items": [], "summary": Cart::default().summary() }),
    }
}

async fn get_cart(data: SharedState, cart_id: web::Path<String>) -> HttpResponse {
    let state = data.lock().await;
    HttpResponse::Ok().json(cart_body(&state, &cart_id))
}

async fn add_to_cart(
    data: SharedState,
    cart_id: web::Path<String>,
    input: web::Json<AddToCartInput>,
) -> Result<HttpResponse, AppError> {
    let mut state = data.lock().await;
    let input = input.into_inner();
    if let Some(size) = &input.size {
        if !SIZE_LABELS.contains(&size.as_str()) {
            return Err(ValidationError::UnknownSize(size.clone()).into());
        }
    }
    let product = state
        .product(&input.product_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("product {}", input.product_id)))?;

    state
        .cart_mut(&cart_id)
        .add(product, input.size, input.quantity.unwrap_or(1))?;
    Ok(HttpResponse::Created().json(cart_body(&state, &cart_id)))
}

async fn update_cart_item(
    data: SharedState,
    path: web::Path<(String, String)>,
    input: web::Json<QuantityInput>,
) -> Result<HttpResponse, AppError> {
    let (cart_id, item_id) = path.into_inner();
    let mut state = data.lock().await;
    let cart = state
        .existing_cart_mut(&cart_id)
        .ok_or_else(|| AppError::NotFound(format!("cart {cart_id}")))?;
    if !cart.set_quantity(&item_id, input.quantity) {
        return Err(AppError::NotFound(format!("cart item {item_id}")));
    }
    Ok(HttpResponse::Ok().json(cart_body(&state, &cart_id)))
}

async fn remove_cart_item(data: SharedState, path: web::Path<(String, String)>) -> Result<HttpResponse, AppError> {
    let (cart_id, item_id) = path.into_inner();
    let mut state = data.lock().await;
    let cart = state
        .existing_cart_mut(&cart_id)
        .ok_or_else(|| AppError::NotFound(format!("cart {cart_id}")))?;
    if !cart.remove(&item_id) {
        return Err(AppError::NotFound(format!("cart item {item_id}")));
    }
    Ok(HttpResponse::Ok().json(cart_body(&state, &cart_id)))
}

async fn contact_draft(data: SharedState, query: web::Query<ContactQuery>) -> HttpResponse {
    let state = data.lock().await;
    HttpResponse::Ok().json(ContactDraft::prepare(&state, &query))
}

async fn submit_contact(
    data: SharedState,
    query: web::Query<ContactQuery>,
    form: web::Json<ContactForm>,
) -> Result<HttpResponse, AppError> {
    let mut state = data.lock().await;
    let mut workflow = ContactWorkflow::new(form.into_inner(), &query);
    match workflow.submit(&mut state).await? {
        SubmitOutcome::Incomplete => Ok(HttpResponse::UnprocessableEntity().json(json!({
            "stage": workflow.stage(),
            "form": workflow.form,
        }))),
        SubmitOutcome::Sent(message) => Ok(HttpResponse::Created().json(json!({
            "stage": workflow.stage(),
            "message": message,
        }))),
    }
}

async fn create_product(data: SharedState, form: web::Json<ProductForm>) -> Result<HttpResponse, AppError> {
    let mut state = data.lock().await;
    let mut editor = ProductEditor::default();
    editor.open();
    editor.form = form.into_inner();
    let product = editor.save(&mut state).await?;
    Ok(HttpResponse::Created().json(product))
}

async fn update_product(
    data: SharedState,
    id: web::Path<String>,
    form: web::Json<ProductForm>,
) -> Result<HttpResponse, AppError> {
    let mut state = data.lock().await;
    let id = id.into_inner();
    let existing = state
        .product(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let mut editor = ProductEditor::default();
    editor.edit(existing);
    editor.form = form.into_inner();
    let product = editor.save(&mut state).await?;
    Ok(HttpResponse::Ok().json(product))
}

async fn delete_product(
    data: SharedState,
    id: web::Path<String>,
    query: web::Query<DeleteQuery>,
) -> Result<HttpResponse, AppError> {
    let mut state = data.lock().await;
    let id = id.into_inner();
    if state.product(&id).is_none() {
        return Err(AppError::NotFound(format!("product {id}")));
    }

    let prompt = DeletePrompt::request(&id);
    let prompt = match query.confirm {
        None => return Err(AppError::ConfirmationRequired(format!("product {id}"))),
        Some(false) => prompt.cancel(),
        Some(true) => prompt.confirm(&mut state).await?,
    };
    Ok(HttpResponse::Ok().json(prompt))
}

async fn list_messages(data: SharedState) -> HttpResponse {
    let state = data.lock().await;
    HttpResponse::Ok().json(state.messages())
}

async fn reload(data: SharedState) -> Result<HttpResponse, AppError> {
    let mut state = data.lock().await;
    if let Err(e) = state.load().await {
        log::error!("Reload failed: {}", e);
        return Err(PersistenceError::new("reload catalog", e).into());
    }
    Ok(HttpResponse::Ok().json(json!({
        "products": state.products().len(),
        "categories": state.categories().len(),
        "messages": state.messages().len(),
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.route("/products", web::get().to(list_products))
        .route("/products/featured", web::get().to(featured_products))
        .route("/products/{id}", web::get().to(get_product))
        .route("/categories", web::get().to(list_categories))
        .route("/cart/{cart_id}", web::get().to(get_cart))
        .route("/cart/{cart_id}/items", web::post().to(add_to_cart))
        .route("/cart/{cart_id}/items/{item_id}", web::put().to(update_cart_item))
        .route("/cart/{cart_id}/items/{item_id}", web::delete().to(remove_cart_item))
        .route("/contact", web::get().to(contact_draft))
        .route("/contact", web::post().to(submit_contact))
        .service(
            web::scope("/admin")
                .wrap(AdminAuth::new(jwt_secret.to_string()))
                .route("/products", web::post().to(create_product))
                .route("/products/{id}", web::put().to(update_product))
                .route("/products/{id}", web::delete().to(delete_product))
                .route("/messages", web::get().to(list_messages))
                .route("/reload", web::post().to(reload)),
        );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::Value;

    use super::*;
    use crate::config::StoreBackend;
    use crate::models::Claims;
    use crate::store::{EntityStore, MemoryStore};

    const SECRET: &str = "handler-secret";

    fn config() -> Config {
        Config {
            backend: StoreBackend::Memory,
            database_url: None,
            database_name: "test".into(),
            jwt_secret: SECRET.into(),
            bind_addr: "127.0.0.1:0".into(),
            featured_count: 2,
        }
    }

    fn bearer() -> (&'static str, String) {
        let claims = Claims {
            sub: "admin".into(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_ref())).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    fn product_form(name: &str, price: &str) -> Value {
        json!({
            "name": name,
            "description": "Comfortable",
            "price": price,
            "category": "sneakers",
            "features": "Light, Breathable",
            "images": ["https://img.example/a.jpg"],
            "sizes": [{ "size": "42", "available": true, "stock": 4 }],
        })
    }

    macro_rules! app {
        ($store:expr) => {{
            let state: SharedState = web::Data::new(Mutex::new(AppState::new($store.clone())));
            app!($store, state)
        }};
        ($store:expr, $state:expr) => {{
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .app_data(web::Data::new(config()))
                    .configure(|cfg| configure(cfg, SECRET)),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn admin_routes_require_token() {
        let store = Arc::new(MemoryStore::new());
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/admin/products")
            .set_json(product_form("Runner", "100"))
            .to_request();
        let status = match test::try_call_service(&app, req).await {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(store.write_count().await, 0);
    }

    #[actix_web::test]
    async fn product_lifecycle_over_http() {
        let store = Arc::new(MemoryStore::new());
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/admin/products")
            .insert_header(bearer())
            .set_json(product_form("Runner", "200"))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["_id"].as_str().unwrap().to_string();
        assert_eq!(created["features"], json!(["Light", "Breathable"]));

        let mut form = product_form("Runner", "200");
        form["discount"] = json!("25");
        let req = test::TestRequest::put()
            .uri(&format!("/admin/products/{id}"))
            .insert_header(bearer())
            .set_json(form)
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["price"], 150.0);
        assert_eq!(updated["originalPrice"], 200.0);

        let req = test::TestRequest::get().uri(&format!("/products/{id}")).to_request();
        let view: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view["displayPrice"], 150.0);

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/products/{id}"))
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(store.list_products().await.unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/products/{id}?confirm=true"))
            .insert_header(bearer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(store.list_products().await.unwrap().is_empty());

        let req = test::TestRequest::get().uri(&format!("/products/{id}")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn invalid_product_form_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/admin/products")
            .insert_header(bearer())
            .set_json(product_form("Runner", "-5"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.write_count().await, 0);
    }

    #[actix_web::test]
    async fn cart_order_over_http() {
        let store = Arc::new(MemoryStore::new());
        let app = app!(store);

        for (name, price) in [("Boot", "100"), ("Sandal", "50")] {
            let req = test::TestRequest::post()
                .uri("/admin/products")
                .insert_header(bearer())
                .set_json(product_form(name, price))
                .to_request();
            let created: Value = test::call_and_read_body_json(&app, req).await;
            let quantity = if name == "Boot" { 2 } else { 1 };
            let req = test::TestRequest::post()
                .uri("/cart/c1/items")
                .set_json(json!({ "product_id": created["_id"], "size": "42", "quantity": quantity }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/cart/c1").to_request();
        let cart: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cart["summary"]["total"], 250.0);

        let incomplete = json!({ "name": "Amina", "email": "", "phone": "0600", "message": "Order" });
        let req = test::TestRequest::post()
            .uri("/contact?cart=c1")
            .set_json(incomplete)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(store.list_messages().await.unwrap().is_empty());

        let complete = json!({ "name": "Amina", "email": "a@example.com", "phone": "0600", "message": "Order" });
        let req = test::TestRequest::post()
            .uri("/contact?cart=c1")
            .set_json(complete)
            .to_request();
        let sent: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(sent["stage"], "submitted");
        assert_eq!(sent["message"]["orderPrice"], 250.0);
        assert_eq!(sent["message"]["read"], false);

        let req = test::TestRequest::get().uri("/cart/c1").to_request();
        let cart: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cart["summary"]["itemCount"], 0);
    }

    #[actix_web::test]
    async fn featured_respects_configured_count() {
        let store = Arc::new(MemoryStore::new());
        let app = app!(store);
        for name in ["A", "B", "C"] {
            let req = test::TestRequest::post()
                .uri("/admin/products")
                .insert_header(bearer())
                .set_json(product_form(name, "10"))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get().uri("/products/featured").to_request();
        let featured: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(featured.as_array().unwrap().len(), 2);
        assert_eq!(featured[0]["name"], "C");
        assert_eq!(featured[0]["categoryName"], "Unknown category");
    }


    #[actix_web::test]
    async fn quantity_overflow_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/admin/products")
            .insert_header(bearer())
            .set_json(product_form("Boot", "100"))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let line = json!({ "product_id": created["_id"], "size": "42", "quantity": u32::MAX });

        let req = test::TestRequest::post().uri("/cart/c1/items").set_json(&line).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post().uri("/cart/c1/items").set_json(&line).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/cart/c1").to_request();
        let cart: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cart["items"][0]["quantity"], u32::MAX);
    }

    #[actix_web::test]
    async fn unknown_cart_is_not_created_by_updates() {
        let store = Arc::new(MemoryStore::new());
        let state: SharedState = web::Data::new(Mutex::new(AppState::new(store.clone())));
        let app = app!(store, state);

        let req = test::TestRequest::put()
            .uri("/cart/ghost/items/i1")
            .set_json(json!({ "quantity": 2 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/cart/ghost/items/i1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        assert!(state.lock().await.cart("ghost").is_none());
    }
}
