use actix_web::web;

use crate::error::json_error_handler;
use crate::web::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(web::scope("/api").route("/chat", web::post().to(handlers::chat)))
        .route("/health", web::get().to(handlers::health_check))
        .route("/test", web::get().to(handlers::liveness))
        .default_service(web::to(handlers::not_found));
}
