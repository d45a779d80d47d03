// HTTP request handlers for API endpoints

use crate::api::models::*;
use crate::error::Error;
use crate::stock::service::StockService;
use crate::store::db::Db;
use actix_web::{web, HttpResponse, Result};
use std::time::SystemTime;

/// Health check endpoint
pub async fn health_check(db: web::Data<Db>) -> Result<HttpResponse> {
    // Quick database connectivity check
    let db_status = match sqlx::query_scalar::<_, bool>("SELECT true")
        .fetch_one(&db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let uptime = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
        uptime_seconds: uptime,
    });

    Ok(HttpResponse::Ok().json(response))
}

/// Full cached stock list with the reserve-link overlay applied
pub async fn get_stock(service: web::Data<StockService>) -> Result<HttpResponse> {
    match service.cached_stock().await {
        Ok(stock) => Ok(HttpResponse::Ok().json(ApiResponse::success(stock))),
        Err(e) => {
            tracing::error!(%e, "failed to read cached stock");
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch stock")))
        }
    }
}

/// Manually trigger a stock sync
pub async fn trigger_sync(service: web::Data<StockService>) -> Result<HttpResponse> {
    tracing::info!("manual stock sync requested");

    let outcome = service.trigger_sync().await;
    let body = ApiResponse::success(outcome.as_json());
    Ok(HttpResponse::Ok().json(body))
}

/// Last sync summary plus the fixed daily schedule
pub async fn get_sync_status(service: web::Data<StockService>) -> Result<HttpResponse> {
    match service.sync_status().await {
        Ok(status) => Ok(HttpResponse::Ok().json(ApiResponse::success(status))),
        Err(e) => {
            tracing::error!(%e, "failed to read sync status");
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch sync status")))
        }
    }
}

/// Lookup a vehicle by registration, cache first then registry fallback
pub async fn lookup_vehicle(
    path: web::Path<String>,
    service: web::Data<StockService>,
) -> Result<HttpResponse> {
    let registration = path.into_inner();

    match service.lookup(&registration).await {
        Ok(found) => Ok(HttpResponse::Ok().json(ApiResponse::success(found))),
        Err(Error::NotFound) => Ok(HttpResponse::NotFound().json(ApiResponse::<()>::error(
            "Vehicle not found in stock or external database",
        ))),
        Err(e) => {
            tracing::error!(%registration, %e, "vehicle lookup failed");
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to lookup vehicle")))
        }
    }
}

/// Store a reserve link for a registration
pub async fn set_reserve_link(
    payload: web::Json<ReserveLinkRequest>,
    service: web::Data<StockService>,
) -> Result<HttpResponse> {
    if payload.registration.trim().is_empty() {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("Registration is required")));
    }

    match service
        .set_reserve_link(&payload.registration, &payload.reserve_link)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
            "message": "Reserve link saved",
            "registration": payload.registration,
        })))),
        Err(e) => {
            tracing::error!(registration = %payload.registration, %e, "reserve link update failed");
            Ok(HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to save reserve link")))
        }
    }
}
