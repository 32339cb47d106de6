use actix_web::HttpResponse;

/// GET /health_check
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// GET /api/v1
pub async fn api_root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "API is live now",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
