//! Authentication boundary.
//!
//! This engine does not authenticate anyone. A trusted fronting layer
//! (reverse proxy / session gateway) injects `X-Auth-User` and
//! `X-Auth-Admin` after doing the real work, and we take both verbatim —
//! the admin boolean is never re-derived here.

use actix_web::middleware::Next;
use actix_web::{
    body::BoxBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    Error, FromRequest, HttpRequest, HttpResponse,
};
use futures_util::future::{ready, Ready};
use tracing::debug;

pub const USER_HEADER: &str = "X-Auth-User";
pub const ADMIN_HEADER: &str = "X-Auth-Admin";

/// Authenticated caller as asserted by the external auth collaborator.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub is_admin: bool,
}

fn extract_principal(req: &HttpRequest) -> Option<Principal> {
    let user_id = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())?
        .to_string();

    let is_admin = req
        .headers()
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    Some(Principal { user_id, is_admin })
}

impl FromRequest for Principal {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_principal(req).ok_or_else(|| {
            actix_web::error::ErrorUnauthorized("Unauthorized: missing authenticated principal")
        }))
    }
}

pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Admin scope gate: requires a principal with `is_admin`.
    pub async fn admin_auth(
        req: ServiceRequest,
        next: Next<BoxBody>,
    ) -> Result<ServiceResponse<BoxBody>, Error> {
        match extract_principal(req.request()) {
            Some(principal) if principal.is_admin => next.call(req).await,
            Some(principal) => {
                debug!(
                    "Admin API rejected non-admin principal: {}",
                    principal.user_id
                );
                Ok(req.into_response(HttpResponse::Forbidden().json(serde_json::json!({
                    "code": 403,
                    "data": { "error": "Forbidden: admin privileges required" }
                }))))
            }
            None => Ok(req.into_response(HttpResponse::Unauthorized().json(
                serde_json::json!({
                    "code": 401,
                    "data": { "error": "Unauthorized: missing authenticated principal" }
                }),
            ))),
        }
    }
}
