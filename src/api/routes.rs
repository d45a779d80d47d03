// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check (no auth required)
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        // API v1 routes (all require authentication)
        .service(
            web::scope("/api/v1")
                .route("/stock", web::get().to(handlers::get_stock))
                .route("/stock/sync", web::post().to(handlers::trigger_sync))
                .route(
                    "/stock/sync-status",
                    web::get().to(handlers::get_sync_status),
                )
                .route(
                    "/stock/lookup/{registration}",
                    web::get().to(handlers::lookup_vehicle),
                )
                .route(
                    "/stock/reserve-link",
                    web::post().to(handlers::set_reserve_link),
                ),
        );
}
