//! Tune workflow: write config, restart the unit, wait for the mount.
//!
//! `Idle -> ConfigWriting -> Restarting -> Polling -> Ready | Unready`.
//! A config write failure ends the run before any restart; under the strict
//! policy so does a failed restart. Concurrent runs are not serialized: each
//! one writes, restarts, and polls on its own, and the last rename wins.

use std::sync::Arc;
use std::time::Instant;

use actix_web::HttpResponse;

use crate::config::{ReadinessSettings, RestartPolicy, TuneDefaults};
use crate::config_writer::{ConfigWriteError, ConfigWriter, TuneRequest};
use crate::readiness::ReadinessPoller;
use crate::service::{ServiceControl, ServiceError};

/// Body returned when the mount does not come up in time.
pub const NOT_READY_BODY: &str = "Tuner not ready";

/// Workflow phase, used for logging transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TunePhase {
    Idle,
    ConfigWriting,
    Restarting,
    Polling,
    Ready,
    Unready,
}

impl TunePhase {
    fn as_str(self) -> &'static str {
        match self {
            TunePhase::Idle => "idle",
            TunePhase::ConfigWriting => "config_writing",
            TunePhase::Restarting => "restarting",
            TunePhase::Polling => "polling",
            TunePhase::Ready => "ready",
            TunePhase::Unready => "unready",
        }
    }
}

/// Terminal result of a run that got as far as polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TuneOutcome {
    /// The mount answered within the deadline.
    Ready,
    /// The deadline passed without a successful probe.
    MountUnavailable,
}

/// Failures that abort a run before polling.
#[derive(Debug)]
pub enum TuneError {
    ConfigWrite(ConfigWriteError),
    ServiceRestart(ServiceError),
}

impl std::fmt::Display for TuneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TuneError::ConfigWrite(e) => write!(f, "config write failed: {e}"),
            TuneError::ServiceRestart(e) => write!(f, "service restart failed: {e}"),
        }
    }
}

impl std::error::Error for TuneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TuneError::ConfigWrite(e) => Some(e),
            TuneError::ServiceRestart(e) => Some(e),
        }
    }
}

impl TuneError {
    /// Plain-text 500; callers are usually browsers following redirects.
    pub fn into_response(self) -> HttpResponse {
        let body = match &self {
            TuneError::ConfigWrite(_) => "Tuner config write failed",
            TuneError::ServiceRestart(_) => "Tuner service restart failed",
        };
        HttpResponse::InternalServerError()
            .content_type("text/plain; charset=utf-8")
            .body(body)
    }
}

/// Query parameters as received, before defaults.
#[derive(Clone, Debug, Default)]
pub struct TuneParams {
    pub freq: Option<String>,
    pub prog: Option<String>,
}

impl TuneDefaults {
    /// Apply defaults. `prog` is dropped for variants without a program.
    pub fn resolve(&self, params: TuneParams) -> TuneRequest {
        TuneRequest {
            frequency: params.freq.unwrap_or_else(|| self.frequency.clone()),
            program: self
                .program
                .as_ref()
                .map(|default| params.prog.unwrap_or_else(|| default.clone())),
        }
    }
}

/// Composes the config writer, service controller, and readiness poller.
#[derive(Clone)]
pub struct TuneWorkflow {
    writer: ConfigWriter,
    service: Arc<dyn ServiceControl>,
    poller: ReadinessPoller,
    restart_policy: RestartPolicy,
    readiness: ReadinessSettings,
}

impl TuneWorkflow {
    pub fn new(
        writer: ConfigWriter,
        service: Arc<dyn ServiceControl>,
        poller: ReadinessPoller,
        restart_policy: RestartPolicy,
        readiness: ReadinessSettings,
    ) -> Self {
        Self {
            writer,
            service,
            poller,
            restart_policy,
            readiness,
        }
    }

    /// Commit the config, then restart the unit according to the policy.
    ///
    /// No restart is attempted when the commit fails.
    pub fn write_and_apply(&self, request: &TuneRequest) -> Result<(), TuneError> {
        let unit = self.service.unit();
        transition(unit, TunePhase::Idle, TunePhase::ConfigWriting);
        if let Err(e) = self.writer.commit(request) {
            tracing::error!(unit, path = %self.writer.path().display(), error = %e, "config write failed");
            transition(unit, TunePhase::ConfigWriting, TunePhase::Unready);
            return Err(TuneError::ConfigWrite(e));
        }
        tracing::info!(
            unit,
            frequency = %request.frequency,
            program = request.program.as_deref().unwrap_or("-"),
            "config written"
        );

        transition(unit, TunePhase::ConfigWriting, TunePhase::Restarting);
        match self.service.restart() {
            Ok(()) => Ok(()),
            Err(e) => match self.restart_policy {
                RestartPolicy::Strict => {
                    tracing::error!(unit, error = %e, "restart failed; aborting tune");
                    transition(unit, TunePhase::Restarting, TunePhase::Unready);
                    Err(TuneError::ServiceRestart(e))
                }
                RestartPolicy::Lenient => {
                    tracing::warn!(unit, error = %e, "restart failed; polling anyway");
                    Ok(())
                }
            },
        }
    }

    /// Run the whole workflow. Blocks for up to the readiness deadline.
    pub fn run(&self, request: &TuneRequest) -> Result<TuneOutcome, TuneError> {
        let start = Instant::now();
        self.write_and_apply(request)?;

        let unit = self.service.unit();
        transition(unit, TunePhase::Restarting, TunePhase::Polling);
        let ready = self
            .poller
            .wait_until_ready(self.readiness.total_timeout, self.readiness.poll_interval);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if ready {
            transition(unit, TunePhase::Polling, TunePhase::Ready);
            tracing::info!(unit, elapsed_ms, "tuned; mount ready");
            Ok(TuneOutcome::Ready)
        } else {
            transition(unit, TunePhase::Polling, TunePhase::Unready);
            tracing::warn!(
                unit,
                elapsed_ms,
                timeout_ms = self.readiness.total_timeout.as_millis() as u64,
                "mount not ready before deadline"
            );
            Ok(TuneOutcome::MountUnavailable)
        }
    }
}

fn transition(unit: &str, from: TunePhase, to: TunePhase) {
    tracing::debug!(unit, from = from.as_str(), to = to.as_str(), "tune transition");
}
