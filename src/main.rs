use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::sync::Arc;

use lms::config::Config;
use lms::db::init_db;
use lms::docs::ApiDoc;
use lms::engine::LeaveEngine;
use lms::notify::TracingNotifier;
use lms::policy::AccessPolicy;
use lms::routes;
use lms::store::{LeaveStore, MemoryStore, MySqlStore};

use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Leave management service"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let mut warmup_pool = None;
    let store: Arc<dyn LeaveStore> = match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await;
            warmup_pool = Some(pool.clone());
            Arc::new(MySqlStore::new(pool, config.ledger_settings()))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store (state is not persisted)");
            Arc::new(MemoryStore::new(config.ledger_settings()))
        }
    };

    let engine = Data::new(LeaveEngine::new(
        store,
        AccessPolicy::open(),
        Arc::new(TracingNotifier),
    ));

    engine
        .catalog()
        .seed_defaults()
        .await
        .expect("Failed to seed default leave types");

    if let Some(pool) = warmup_pool {
        let engine_for_warmup = engine.clone();
        actix_web::rt::spawn(async move {
            if let Err(e) = engine_for_warmup.catalog().warmup(&pool).await {
                eprintln!("Failed to warmup leave type cache: {:?}", e);
            }
        });
    }

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(engine.clone())
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
