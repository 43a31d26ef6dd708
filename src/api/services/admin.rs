//! Administrative interface, consumed by an external UI layer.
//!
//! Thin calls into `LinkService`; the admin gate itself lives in the auth
//! middleware wrapped around this scope.

use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::links::error_to_response;
use crate::services::LinkService;
use crate::storage::LinkFilter;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub owner_id: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub include_disabled: bool,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct SetExpiryRequest {
    /// `null` clears the expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct AdminService;

impl AdminService {
    pub async fn list_links(
        query: web::Query<ListQuery>,
        service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let query = query.into_inner();
        let filter = LinkFilter {
            owner_id: query.owner_id,
            include_disabled: query.include_disabled,
        };

        match service.list_links(filter, query.page, query.page_size).await {
            Ok((links, total)) => HttpResponse::Ok().json(serde_json::json!({
                "code": 200,
                "data": { "links": links, "total": total, "page": query.page }
            })),
            Err(e) => error_to_response(e),
        }
    }

    pub async fn get_link(
        path: web::Path<String>,
        service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        match service.get_link(&path.into_inner()).await {
            Ok(Some(link)) => HttpResponse::Ok().json(serde_json::json!({
                "code": 200,
                "data": { "link": link }
            })),
            Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
                "code": 404,
                "data": { "error": "Not Found" }
            })),
            Err(e) => error_to_response(e),
        }
    }

    pub async fn disable_link(
        path: web::Path<String>,
        service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        match service.disable_link(&path.into_inner()).await {
            Ok(()) => HttpResponse::Ok().json(serde_json::json!({
                "code": 200,
                "data": { "disabled": true }
            })),
            Err(e) => error_to_response(e),
        }
    }

    pub async fn set_expiry(
        path: web::Path<String>,
        body: web::Json<SetExpiryRequest>,
        service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        match service
            .set_expiry(&path.into_inner(), body.into_inner().expires_at)
            .await
        {
            Ok(()) => HttpResponse::Ok().json(serde_json::json!({
                "code": 200,
                "data": { "updated": true }
            })),
            Err(e) => error_to_response(e),
        }
    }
}

/// Admin 路由，挂在 admin_auth 中间件之后
pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/links", web::get().to(AdminService::list_links))
        .route("/links/{code}", web::get().to(AdminService::get_link))
        .route(
            "/links/{code}/disable",
            web::post().to(AdminService::disable_link),
        )
        .route(
            "/links/{code}/expiry",
            web::put().to(AdminService::set_expiry),
        );
}
