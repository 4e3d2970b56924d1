use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod store;
mod tracker;
mod utils;

use config::{Config, StoreBackend};
use store::{AttendanceStore, MemoryStore, MySqlStore, UserStore};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Mess attendance service"
}

async fn build_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn AttendanceStore>, Arc<dyn UserStore>)> {
    match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
            let pool = db::init_db(url).await?;
            if config.run_migrations {
                db::run_migrations(&pool).await?;
                info!("Database migrations applied");
            }
            let store = Arc::new(MySqlStore::new(pool));
            let attendance: Arc<dyn AttendanceStore> = store.clone();
            let users: Arc<dyn UserStore> = store;
            Ok((attendance, users))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            let attendance: Arc<dyn AttendanceStore> = store.clone();
            let users: Arc<dyn UserStore> = store;
            Ok((attendance, users))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, backend = ?config.store_backend, "Server starting...");

    let (attendance_store, user_store) = build_stores(&config).await?;

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets match
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::from(attendance_store.clone()))
            .app_data(Data::from(user_store.clone()))
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
