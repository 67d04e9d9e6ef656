use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use chat_service::{
    config::Config,
    db, error, logging,
    middleware::RequestSpan,
    routes,
    state::AppState,
    store::{ChatStore, Directory, PgStore},
};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

fn cors(origins: &[String]) -> Cors {
    let base = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);
    if origins.is_empty() {
        return base.allow_any_origin();
    }
    origins
        .iter()
        .fold(base.supports_credentials(), |cors, origin| {
            cors.allowed_origin(origin)
        })
}

#[actix_web::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(Config::from_env()?);

    let pool = db::init_pool(&cfg)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;
    let store = Arc::new(PgStore::new(pool));
    let chat_store: Arc<dyn ChatStore> = store.clone();
    let directory: Arc<dyn Directory> = store;

    let state = AppState::new(cfg.clone(), chat_store, directory)?;

    let bind_addr = cfg.bind_addr();
    tracing::info!(%bind_addr, "starting chat-service");

    let origins = cfg.cors_allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(TracingLogger::<RequestSpan>::new())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("server: {e}")))
}
