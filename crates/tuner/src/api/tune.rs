//! Tune handlers.

use actix_web::http::header;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::config::HeadPolicy;
use crate::state::AppState;
use crate::tune::{NOT_READY_BODY, TuneOutcome, TuneParams};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TuneQuery {
    /// Frequency, written verbatim as `FREQ=`. Defaults per variant.
    pub freq: Option<String>,
    /// Program number (HD only), written verbatim as `PROG=`.
    pub prog: Option<String>,
}

#[utoipa::path(
    get,
    path = "/tune",
    params(TuneQuery),
    responses(
        (status = 302, description = "Tuned; redirect to the mount URL"),
        (status = 500, description = "Config write or strict restart failed", body = String, content_type = "text/plain"),
        (status = 503, description = "Mount not ready before the deadline", body = String, content_type = "text/plain")
    )
)]
/// Retune the receiver and redirect to the mount once it is reachable.
///
/// Served at the variant's tune paths (`/fmtune` for FM, `/tune` for HD).
pub async fn tune(state: web::Data<AppState>, query: web::Query<TuneQuery>) -> HttpResponse {
    let query = query.into_inner();
    let request = state.settings.defaults.resolve(TuneParams {
        freq: query.freq,
        prog: query.prog,
    });
    let workflow = state.workflow.clone();
    match web::block(move || workflow.run(&request)).await {
        Ok(Ok(TuneOutcome::Ready)) => HttpResponse::Found()
            .insert_header((header::LOCATION, state.settings.mount_url.as_str()))
            .finish(),
        Ok(Ok(TuneOutcome::MountUnavailable)) => HttpResponse::ServiceUnavailable()
            .content_type("text/plain; charset=utf-8")
            .body(NOT_READY_BODY),
        Ok(Err(err)) => err.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "tune worker failed");
            HttpResponse::InternalServerError()
                .content_type("text/plain; charset=utf-8")
                .body("Tuner worker failed")
        }
    }
}

#[utoipa::path(
    head,
    path = "/tune",
    responses(
        (status = 200, description = "Mount reachable (probe-mount policy)"),
        (status = 204, description = "Acknowledged (acknowledge policy)"),
        (status = 503, description = "Mount unreachable (probe-mount policy)")
    )
)]
/// Side-effect-free HEAD on the tune path; never writes config or restarts.
pub async fn tune_head(state: web::Data<AppState>) -> HttpResponse {
    match state.settings.head_policy {
        HeadPolicy::Acknowledge => HttpResponse::NoContent().finish(),
        HeadPolicy::ProbeMount => {
            let poller = state.poller.clone();
            match web::block(move || poller.probe()).await {
                Ok(true) => HttpResponse::Ok().finish(),
                Ok(false) => HttpResponse::ServiceUnavailable().finish(),
                Err(err) => {
                    tracing::warn!(error = %err, "head probe worker failed");
                    HttpResponse::ServiceUnavailable().finish()
                }
            }
        }
    }
}
