//! Shared handler state.
//!
//! Everything here is immutable after startup; the only shared mutable
//! resources are external (config file, service manager, mount).

use std::sync::Arc;

use crate::config::TunerSettings;
use crate::config_writer::ConfigWriter;
use crate::readiness::{HttpMountProbe, MountProbe, ReadinessPoller};
use crate::service::{ServiceControl, Systemctl};
use crate::tune::TuneWorkflow;

pub struct AppState {
    pub settings: TunerSettings,
    pub workflow: TuneWorkflow,
    pub service: Arc<dyn ServiceControl>,
    pub poller: ReadinessPoller,
}

impl AppState {
    /// Build state around explicit collaborators.
    pub fn new(
        settings: TunerSettings,
        service: Arc<dyn ServiceControl>,
        probe: Arc<dyn MountProbe>,
    ) -> Self {
        let poller = ReadinessPoller::new(probe, settings.readiness.attempt_timeout);
        let workflow = TuneWorkflow::new(
            ConfigWriter::new(settings.config_path.clone()),
            service.clone(),
            poller.clone(),
            settings.restart_policy,
            settings.readiness,
        );
        Self {
            settings,
            workflow,
            service,
            poller,
        }
    }

    /// Build state backed by `systemctl` and an HTTP mount probe.
    pub fn from_settings(settings: TunerSettings) -> Self {
        let service = Arc::new(Systemctl::new(
            settings.service_manager.clone(),
            settings.unit.clone(),
        ));
        let probe = Arc::new(HttpMountProbe::new(settings.mount_url.clone()));
        Self::new(settings, service, probe)
    }
}
