//! Actix server startup + app wiring.
//!
//! Builds the shared state, routes, request logging, and OpenAPI endpoints.

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse};
use actix_web::{App, Error, HttpServer, web};
use anyhow::{Context as _, Result};
use futures_util::future::{LocalBoxFuture, Ready, ok};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::config::TunerSettings;
use crate::openapi;
use crate::state::AppState;

/// Build state and run the HTTP server until shutdown.
pub async fn run(settings: TunerSettings) -> Result<()> {
    let bind = settings.bind;
    if !bind.ip().is_loopback() {
        tracing::warn!(bind = %bind, "binding a non-loopback address; the tuner has no authentication");
    }
    tracing::info!(
        variant = %settings.variant,
        bind = %bind,
        config_path = %settings.config_path.display(),
        unit = %settings.unit,
        mount_url = %settings.mount_url,
        restart_policy = ?settings.restart_policy,
        head_policy = ?settings.head_policy,
        timeout_ms = settings.readiness.total_timeout.as_millis() as u64,
        interval_ms = settings.readiness.poll_interval.as_millis() as u64,
        "starting radio-tuner"
    );

    let routes = settings.routes.clone();
    let quiet_paths: Vec<String> = vec![routes.status.clone(), "/health".to_string()];
    let state = web::Data::new(AppState::from_settings(settings));

    HttpServer::new(move || {
        let routes = routes.clone();
        App::new()
            .app_data(state.clone())
            .wrap(FilteredLogger::new(quiet_paths.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
            )
            .configure(move |cfg| api::configure(cfg, &routes))
    })
    .bind(bind)
    .with_context(|| format!("bind {bind}"))?
    .run()
    .await?;

    tracing::info!("radio-tuner stopped");
    Ok(())
}

/// Actix middleware that logs requests, skipping polled paths.
struct FilteredLogger {
    quiet: Rc<Vec<String>>,
}

impl FilteredLogger {
    fn new(quiet: Vec<String>) -> Self {
        Self {
            quiet: Rc::new(quiet),
        }
    }
}

impl<S, B> actix_web::dev::Transform<S, ServiceRequest> for FilteredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = FilteredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FilteredLoggerMiddleware {
            service,
            quiet: self.quiet.clone(),
        })
    }
}

/// Service wrapper that applies the logging filter.
struct FilteredLoggerMiddleware<S> {
    service: S,
    quiet: Rc<Vec<String>>,
}

impl<S, B> Service<ServiceRequest> for FilteredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let should_log = !self.quiet.iter().any(|p| *p == path);
        let method = req.method().clone();
        let query = req.query_string().to_string();
        let peer = req.connection_info().realip_remote_addr().unwrap_or("-").to_string();
        let ua = req
            .headers()
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let start = std::time::Instant::now();
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            if should_log {
                tracing::info!(
                    method = %method,
                    path = %path,
                    query = %query,
                    status = %res.status().as_u16(),
                    user_agent = %ua,
                    peer = %peer,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "http request"
                );
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::test;

    #[actix_web::test]
    async fn filtered_logger_passes_responses_through() {
        let app = test::init_service(
            App::new()
                .wrap(FilteredLogger::new(vec!["/status".to_string()]))
                .service(api::health::health),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());
        let resp = test::call_service(&app, test::TestRequest::get().uri("/status").to_request()).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
