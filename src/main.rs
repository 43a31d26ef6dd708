use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpServer};
use tracing::{info, warn};

use snaplink::analytics::{ClickExporter, ClickRecorder};
use snaplink::api::middleware::AuthMiddleware;
use snaplink::api::services::{
    admin::admin_routes, AppStartTime, HealthService, LinksService, RedirectService,
    RedirectSettings,
};
use snaplink::cache::{MokaCache, NullCache, ResolutionCache};
use snaplink::config;
use snaplink::generator::CodeGenerator;
use snaplink::logging::init_logging;
use snaplink::services::{CachedResolver, DirectResolver, LinkService, Resolver};
use snaplink::storage::{LinkStore, StoreFactory};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    dotenvy::dotenv().ok();

    let app_config = match config::init_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // guard 必须存活到进程结束，否则缓冲日志丢失
    let _log_guard = init_logging(&app_config.logging);
    info!("Starting snaplink, config: {:?}", app_config.summary());

    let stores = StoreFactory::create(&app_config.database)
        .await
        .map_err(std::io::Error::other)?;

    let cache: Arc<dyn ResolutionCache> = if app_config.cache.enabled {
        Arc::new(MokaCache::new(&app_config.cache))
    } else {
        info!("Resolution cache disabled, running store-only");
        Arc::new(NullCache::new())
    };

    let resolver: Arc<dyn Resolver> = if app_config.cache.enabled {
        Arc::new(CachedResolver::new(
            cache.clone(),
            stores.links.clone(),
            app_config.cache.default_ttl_secs,
        ))
    } else {
        Arc::new(DirectResolver::new(stores.links.clone()))
    };

    let generator = CodeGenerator::new(&app_config.generator);
    if let Ok(count) = stores.links.count().await {
        if let Some(required) = generator.length_deficit(count) {
            warn!(
                "Code length {} is below the collision target at {} stored links; raise generator.code_length to {}",
                app_config.generator.code_length, count, required
            );
        }
    }

    let link_service = Arc::new(
        LinkService::new(
            stores.links.clone(),
            cache.clone(),
            generator,
            &app_config.server,
        )
        .map_err(std::io::Error::other)?,
    );

    let recorder = Arc::new(ClickRecorder::spawn(
        stores.sink.clone(),
        &app_config.clicks,
    ));

    let exporter_handle = if app_config.export.enabled {
        let exporter = ClickExporter::new(stores.clicks.clone(), app_config.export.clone());
        Some(tokio::spawn(exporter.run()))
    } else {
        None
    };

    let redirect_settings = RedirectSettings {
        status: StatusCode::from_u16(app_config.server.redirect_status)
            .unwrap_or(StatusCode::FOUND),
        default_url: app_config.server.default_url.clone(),
    };

    let bind_address = format!("{}:{}", app_config.server.host, app_config.server.port);
    info!("Starting server at http://{}", bind_address);

    let store_data: web::Data<Arc<dyn LinkStore>> = web::Data::new(stores.links.clone());
    let resolver_data = web::Data::new(resolver);
    let recorder_data = web::Data::new(recorder.clone());
    let service_data = web::Data::new(link_service);
    let settings_data = web::Data::new(redirect_settings);
    let start_data = web::Data::new(app_start_time);

    let workers = app_config.server.workers.unwrap_or_else(num_cpus::get);

    HttpServer::new(move || {
        App::new()
            .app_data(store_data.clone())
            .app_data(resolver_data.clone())
            .app_data(recorder_data.clone())
            .app_data(service_data.clone())
            .app_data(settings_data.clone())
            .app_data(start_data.clone())
            .service(
                web::scope("/api/admin")
                    .wrap(from_fn(AuthMiddleware::admin_auth))
                    .configure(admin_routes),
            )
            .route("/api/links", web::post().to(LinksService::create_link))
            .route("/healthz", web::get().to(HealthService::health_check))
            .route("/", web::get().to(RedirectService::handle_default))
            .route("/{code}", web::get().to(RedirectService::handle_redirect))
            .route("/{code}", web::head().to(RedirectService::handle_redirect))
    })
    .workers(workers)
    .bind(bind_address)?
    .run()
    .await?;

    // 尽力排空点击队列；超时即放弃，允许丢失
    recorder
        .shutdown(Duration::from_secs(app_config.clicks.shutdown_timeout_secs))
        .await;
    if recorder.dropped_count() > 0 {
        warn!(
            "{} click events were dropped during this run",
            recorder.dropped_count()
        );
    }

    if let Some(handle) = exporter_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}
