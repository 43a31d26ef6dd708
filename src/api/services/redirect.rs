//! Redirect hot path: `GET /{code}`.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use tracing::{debug, error, trace};

use crate::analytics::{ClickEvent, ClickRecorder};
use crate::services::{Resolution, Resolver};
use crate::utils::is_valid_code;

/// Per-app redirect behavior, fixed at startup.
#[derive(Debug, Clone)]
pub struct RedirectSettings {
    /// 302 (default) or 301
    pub status: StatusCode,
    /// Where the bare domain redirects.
    pub default_url: String,
}

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        resolver: web::Data<Arc<dyn Resolver>>,
        recorder: web::Data<Arc<ClickRecorder>>,
        settings: web::Data<RedirectSettings>,
    ) -> impl Responder {
        let code = path.into_inner();

        if !is_valid_code(&code) {
            // 非法短码直接 404，不进缓存
            trace!("Invalid short code rejected: {}", &code);
            return Self::not_found_response();
        }

        match resolver.resolve(&code).await {
            Ok(Resolution::Found(link)) => {
                // 先入队（非阻塞），再响应；记录器健康与否不影响时延
                Self::record_click(&recorder, &req, code);
                HttpResponse::build(settings.status)
                    .insert_header(("Location", link.destination))
                    .finish()
            }
            Ok(Resolution::NotFound) => {
                debug!("Redirect not found: {}", &code);
                Self::not_found_response()
            }
            Err(e) => {
                error!("Store unavailable during redirect lookup: {}", e);
                Self::unavailable_response()
            }
        }
    }

    /// `GET /` — no code, send the visitor somewhere sensible.
    pub async fn handle_default(settings: web::Data<RedirectSettings>) -> impl Responder {
        HttpResponse::TemporaryRedirect()
            .insert_header(("Location", settings.default_url.clone()))
            .finish()
    }

    fn record_click(recorder: &ClickRecorder, req: &HttpRequest, code: String) {
        let referrer = req
            .headers()
            .get("referer")
            .and_then(|h| h.to_str().ok())
            .map(String::from);
        let user_agent = req.headers().get("user-agent").and_then(|h| h.to_str().ok());

        recorder.record(ClickEvent::new(code, referrer, user_agent));
    }

    /// Uniform 404: unknown, disabled and expired codes are indistinguishable
    /// to the caller.
    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body("Not Found")
    }

    #[inline]
    fn unavailable_response() -> HttpResponse {
        HttpResponse::build(StatusCode::SERVICE_UNAVAILABLE)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Retry-After", "1"))
            .body("Service Unavailable")
    }
}
