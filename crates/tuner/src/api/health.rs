use actix_web::{HttpResponse, Responder, get};
use tuner_types::HealthResponse;

/// Basic health check for supervisors and scripts.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Tuner is up", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}
