//! Configuration loading and parsing.
//!
//! Each variant ships a preset; an optional TOML file overrides any preset
//! field, and CLI flags override the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub use tuner_types::Variant;

/// What a failed restart command does to the tune workflow.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Abort the tune with a server error.
    Strict,
    /// Log the failure and keep polling the mount.
    Lenient,
}

/// How a HEAD request on the tune route is answered.
///
/// HEAD never writes the config file or restarts the service.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HeadPolicy {
    /// Always 204.
    Acknowledge,
    /// 200 when one mount probe succeeds, 503 otherwise.
    ProbeMount,
}

/// Readiness poll timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadinessSettings {
    pub total_timeout: Duration,
    pub poll_interval: Duration,
    pub attempt_timeout: Duration,
}

/// Values applied when the tune request omits a parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TuneDefaults {
    pub frequency: String,
    /// `None` for variants that do not accept a program number.
    pub program: Option<String>,
}

/// Paths the tune and status handlers are mounted at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSettings {
    pub tune: Vec<String>,
    pub status: String,
}

/// Optional fields of the status response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusFields {
    pub service: bool,
    pub mount_url: bool,
}

/// Fully resolved settings for one tuner instance.
#[derive(Clone, Debug)]
pub struct TunerSettings {
    pub variant: Variant,
    pub bind: SocketAddr,
    /// Key=value file read by the receiver service.
    pub config_path: PathBuf,
    /// Service unit restarted after every tune.
    pub unit: String,
    /// Service manager executable (`systemctl`).
    pub service_manager: PathBuf,
    pub mount_url: String,
    pub restart_policy: RestartPolicy,
    pub head_policy: HeadPolicy,
    pub defaults: TuneDefaults,
    pub readiness: ReadinessSettings,
    pub routes: RouteSettings,
    pub status: StatusFields,
}

impl TunerSettings {
    /// Built-in settings for a variant.
    pub fn preset(variant: Variant) -> Self {
        match variant {
            Variant::Fm => Self {
                variant,
                bind: SocketAddr::from(([127, 0, 0, 1], 8081)),
                config_path: PathBuf::from("/etc/default/fmradio"),
                unit: "fmradio@active.service".to_string(),
                service_manager: PathBuf::from("systemctl"),
                mount_url: "http://127.0.0.1:8000/fm.mp3".to_string(),
                restart_policy: RestartPolicy::Strict,
                head_policy: HeadPolicy::Acknowledge,
                defaults: TuneDefaults {
                    frequency: "102.3".to_string(),
                    program: None,
                },
                readiness: ReadinessSettings {
                    total_timeout: Duration::from_secs(20),
                    poll_interval: Duration::from_millis(400),
                    attempt_timeout: Duration::from_secs(2),
                },
                routes: RouteSettings {
                    tune: vec!["/fmtune".to_string()],
                    status: "/fmstatus".to_string(),
                },
                status: StatusFields {
                    service: true,
                    mount_url: true,
                },
            },
            Variant::Hd => Self {
                variant,
                bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
                config_path: PathBuf::from("/etc/default/hdradio"),
                unit: "hdradio@active.service".to_string(),
                service_manager: PathBuf::from("systemctl"),
                mount_url: "http://127.0.0.1:8000/hd.mp3".to_string(),
                restart_policy: RestartPolicy::Lenient,
                head_policy: HeadPolicy::ProbeMount,
                defaults: TuneDefaults {
                    frequency: "97.1".to_string(),
                    program: Some("0".to_string()),
                },
                readiness: ReadinessSettings {
                    total_timeout: Duration::from_secs(15),
                    poll_interval: Duration::from_millis(250),
                    attempt_timeout: Duration::from_secs(1),
                },
                routes: RouteSettings {
                    tune: vec!["/tune".to_string(), "/tune/".to_string()],
                    status: "/status".to_string(),
                },
                status: StatusFields {
                    service: false,
                    mount_url: false,
                },
            },
        }
    }
}

/// Top-level tuner configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TunerConfig {
    /// Variant preset to start from (`fm` or `hd`).
    pub variant: Option<Variant>,
    /// Bind address (host:port).
    pub bind: Option<String>,
    /// Receiver config file path.
    pub config_path: Option<String>,
    /// Service unit name.
    pub unit: Option<String>,
    /// Service manager executable.
    pub service_manager: Option<String>,
    /// Mount URL probed for readiness and used as the redirect target.
    pub mount_url: Option<String>,
    pub restart_policy: Option<RestartPolicy>,
    pub head_policy: Option<HeadPolicy>,
    pub defaults: Option<DefaultsConfig>,
    pub readiness: Option<ReadinessConfig>,
    pub routes: Option<RoutesConfig>,
    pub status: Option<StatusConfig>,
}

/// `[defaults]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    pub frequency: Option<String>,
    pub program: Option<String>,
}

/// `[readiness]` table, all values in milliseconds.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadinessConfig {
    pub total_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub attempt_timeout_ms: Option<u64>,
}

/// `[routes]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutesConfig {
    pub tune: Option<Vec<String>>,
    pub status: Option<String>,
}

/// `[status]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusConfig {
    pub service: Option<bool>,
    pub mount_url: Option<bool>,
}

impl TunerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parse config {:?}", path))
    }

    /// Parse configuration from TOML text.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<TunerConfig>(raw)?)
    }
}

/// Merge CLI overrides, the config file, and the variant preset.
pub fn resolve_settings(
    cfg: &TunerConfig,
    variant: Option<Variant>,
    bind: Option<SocketAddr>,
) -> Result<TunerSettings> {
    let variant = variant.or(cfg.variant).ok_or_else(|| {
        anyhow::anyhow!("variant is required; use --variant or set `variant` in the config file")
    })?;
    let mut settings = TunerSettings::preset(variant);

    if let Some(addr) = bind {
        settings.bind = addr;
    } else if let Some(raw) = cfg.bind.as_deref() {
        settings.bind = raw.parse().with_context(|| format!("parse bind {raw}"))?;
    }
    if let Some(path) = non_empty(cfg.config_path.as_deref()) {
        settings.config_path = PathBuf::from(path);
    }
    if let Some(unit) = cfg.unit.as_deref() {
        let unit = unit.trim();
        if unit.is_empty() {
            anyhow::bail!("unit must not be empty");
        }
        settings.unit = unit.to_string();
    }
    if let Some(program) = non_empty(cfg.service_manager.as_deref()) {
        settings.service_manager = PathBuf::from(program);
    }
    if let Some(url) = cfg.mount_url.as_deref() {
        settings.mount_url = parse_mount_url(url)?;
    }
    if let Some(policy) = cfg.restart_policy {
        settings.restart_policy = policy;
    }
    if let Some(policy) = cfg.head_policy {
        settings.head_policy = policy;
    }
    if let Some(defaults) = cfg.defaults.as_ref() {
        if let Some(freq) = defaults.frequency.as_ref() {
            settings.defaults.frequency = freq.clone();
        }
        if let Some(prog) = defaults.program.as_ref() {
            settings.defaults.program = Some(prog.clone());
        }
    }
    if let Some(readiness) = cfg.readiness.as_ref() {
        apply_readiness(&mut settings.readiness, readiness)?;
    }
    if let Some(routes) = cfg.routes.as_ref() {
        if let Some(tune) = routes.tune.as_ref() {
            if tune.is_empty() {
                anyhow::bail!("routes.tune must list at least one path");
            }
            for path in tune {
                check_route(path)?;
            }
            settings.routes.tune = tune.clone();
        }
        if let Some(status) = routes.status.as_ref() {
            check_route(status)?;
            settings.routes.status = status.clone();
        }
    }
    if let Some(status) = cfg.status.as_ref() {
        if let Some(service) = status.service {
            settings.status.service = service;
        }
        if let Some(mount_url) = status.mount_url {
            settings.status.mount_url = mount_url;
        }
    }

    Ok(settings)
}

fn apply_readiness(target: &mut ReadinessSettings, cfg: &ReadinessConfig) -> Result<()> {
    if let Some(ms) = cfg.total_timeout_ms {
        target.total_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = cfg.poll_interval_ms {
        if ms == 0 {
            anyhow::bail!("readiness.poll_interval_ms must be greater than zero");
        }
        target.poll_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = cfg.attempt_timeout_ms {
        if ms == 0 {
            anyhow::bail!("readiness.attempt_timeout_ms must be greater than zero");
        }
        target.attempt_timeout = Duration::from_millis(ms);
    }
    Ok(())
}

fn parse_mount_url(raw: &str) -> Result<String> {
    let url = raw.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("mount_url must be an http(s) URL: {raw}");
    }
    Ok(url.to_string())
}

fn check_route(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        anyhow::bail!("route must start with '/': {path}");
    }
    if path == "/health" || path.starts_with("/swagger-ui") || path.starts_with("/api-doc") {
        anyhow::bail!("route collides with a built-in path: {path}");
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
