use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use futures::lock::Mutex;
use log::{error, info};

mod admin;
mod cart;
mod catalog;
mod config;
mod contact;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod state;
mod store;

use config::{Config, StoreBackend};
use state::AppState;
use store::{EntityStore, MemoryStore};

async fn open_store(config: &Config) -> Result<Arc<dyn EntityStore>, store::StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory entity store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Mongo => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let db = db::connect(url, &config.database_name).await?;
            info!("Connected to MongoDB database {}", config.database_name);
            Ok(Arc::new(db::MongoStore::new(&db)))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let store = open_store(&config).await.map_err(|e| {
        error!("Could not open entity store: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let mut app_state = AppState::new(store);
    if let Err(e) = app_state.load().await {
        error!("Initial catalog load failed, starting empty: {}", e);
    }
    let shared = web::Data::new(Mutex::new(app_state));

    let bind_addr = config.bind_addr.clone();
    let jwt_secret = config.jwt_secret.clone();
    let config = web::Data::new(config);
    info!("Listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(shared.clone())
            .app_data(config.clone())
            .configure(|cfg| handlers::configure(cfg, &jwt_secret))
    })
    .bind(bind_addr)?
    .run()
    .await
}
