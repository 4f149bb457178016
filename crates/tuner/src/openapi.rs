use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::tune::tune,
        api::tune::tune_head,
        api::status::status,
        api::health::health,
    ),
    components(
        schemas(
            tuner_types::TunerStatus,
            tuner_types::HealthResponse,
        )
    ),
    tags(
        (name = "radio-tuner", description = "Receiver tune and status API")
    )
)]
pub struct ApiDoc;
