use serde::{Deserialize, Serialize};

/// Liveness snapshot returned by the tuner status endpoint.
///
/// `mount_up` is always present. The FM preset also reports the service
/// activation state and the mount URL; the HD preset reports neither, so
/// those fields are omitted from the JSON when unset.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TunerStatus {
    /// Activation state string reported by the service manager
    /// (`active`, `inactive`, `failed`, ...), verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// `true` when a single partial-content probe of the mount succeeded.
    pub mount_up: bool,
    /// Mount URL clients are redirected to after tuning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_url: Option<String>,
}

/// Basic health payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Receiver family served by a tuner instance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Analog FM receiver; frequency only.
    Fm,
    /// HD Radio receiver; frequency plus program number.
    Hd,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Fm => "fm",
            Variant::Hd => "hd",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
