use actix_web::{HttpResponse, web};
use tuner_types::TunerStatus;

use crate::state::AppState;

/// Reported when the service manager cannot be queried.
const UNKNOWN_SERVICE_STATE: &str = "unknown";

#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Current tuner liveness", body = TunerStatus)
    )
)]
/// Report service activation state and mount reachability without side effects.
///
/// Served at the variant's status path (`/fmstatus` for FM, `/status` for HD).
/// Sub-probe failures degrade fields instead of failing the request.
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let fields = state.settings.status;
    let service = state.service.clone();
    let poller = state.poller.clone();
    let probed = web::block(move || {
        let service_state = fields.service.then(|| {
            service.query_active().unwrap_or_else(|err| {
                tracing::warn!(unit = service.unit(), error = %err, "service state query failed");
                UNKNOWN_SERVICE_STATE.to_string()
            })
        });
        (service_state, poller.probe())
    })
    .await;
    let (service_state, mount_up) = match probed {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(error = %err, "status worker failed");
            (fields.service.then(|| UNKNOWN_SERVICE_STATE.to_string()), false)
        }
    };
    HttpResponse::Ok().json(TunerStatus {
        service: service_state,
        mount_up,
        mount_url: fields.mount_url.then(|| state.settings.mount_url.clone()),
    })
}
