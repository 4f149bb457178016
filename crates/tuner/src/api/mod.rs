//! HTTP API handlers.
//!
//! Tune and status live at per-variant paths, so they are registered through
//! [`configure`] rather than fixed route macros.

pub mod health;
pub mod status;
pub mod tune;

pub use status::status;
pub use tune::{tune, tune_head};

use actix_web::web;

use crate::config::RouteSettings;

/// Register the tune, status, and health routes.
pub fn configure(cfg: &mut web::ServiceConfig, routes: &RouteSettings) {
    for path in &routes.tune {
        cfg.service(
            web::resource(path.clone())
                .route(web::get().to(tune))
                .route(web::head().to(tune_head)),
        );
    }
    cfg.service(web::resource(routes.status.clone()).route(web::get().to(status)));
    cfg.service(health::health);
}
