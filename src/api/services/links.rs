//! Creation endpoint: `POST /api/links`.

use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::api::middleware::Principal;
use crate::errors::SnaplinkError;
use crate::services::LinkService;

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub destination: String,
    /// Defaults to the authenticated principal.
    pub owner_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateLinkResponse {
    pub code: String,
    pub short_url: String,
}

pub struct LinksService;

impl LinksService {
    pub async fn create_link(
        principal: Principal,
        body: web::Json<CreateLinkRequest>,
        service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let body = body.into_inner();
        let owner_id = body
            .owner_id
            .filter(|o| !o.trim().is_empty())
            .unwrap_or(principal.user_id);

        match service
            .create_link(&body.destination, &owner_id, body.expires_at)
            .await
        {
            Ok(created) => HttpResponse::Created().json(CreateLinkResponse {
                code: created.link.code,
                short_url: created.short_url,
            }),
            Err(e) => error_to_response(e),
        }
    }
}

/// Creation error mapping. `AlreadyExists` never reaches this function: the
/// generator consumes it internally.
pub(crate) fn error_to_response(err: SnaplinkError) -> HttpResponse {
    match &err {
        SnaplinkError::InvalidDestination(_) | SnaplinkError::Validation(_) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "code": 400,
                "data": { "error": err.to_string() }
            }))
        }
        SnaplinkError::NotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
            "code": 404,
            "data": { "error": "Not Found" }
        })),
        SnaplinkError::CapacityExhausted(_) | SnaplinkError::StoreUnavailable(_) => {
            HttpResponse::ServiceUnavailable()
                .insert_header(("Retry-After", "1"))
                .json(serde_json::json!({
                    "code": 503,
                    "data": { "error": err.to_string(), "retryable": true }
                }))
        }
        _ => {
            error!("Unexpected error in links API: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "code": 500,
                "data": { "error": "Internal Server Error" }
            }))
        }
    }
}
