//! Service unit control through the host service manager.
//!
//! Both calls run `systemctl` synchronously and block the calling thread for
//! the duration of the command.

use std::path::PathBuf;
use std::process::Command;

/// Service manager invocation failure.
#[derive(Debug)]
pub enum ServiceError {
    /// The service manager could not be started.
    Spawn { program: PathBuf, source: std::io::Error },
    /// The restart command exited unsuccessfully.
    RestartFailed { unit: String, code: Option<i32>, stderr: String },
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Spawn { program, source } => {
                write!(f, "run {}: {source}", program.display())
            }
            ServiceError::RestartFailed { unit, code, stderr } => {
                match code {
                    Some(code) => write!(f, "restart {unit} exited with {code}")?,
                    None => write!(f, "restart {unit} terminated by signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Spawn { source, .. } => Some(source),
            ServiceError::RestartFailed { .. } => None,
        }
    }
}

/// Lifecycle control for the one unit a tuner owns.
pub trait ServiceControl: Send + Sync {
    /// Unit name, for logs.
    fn unit(&self) -> &str;

    /// Issue a restart and return once the manager accepted it.
    fn restart(&self) -> Result<(), ServiceError>;

    /// Current activation state string, verbatim.
    fn query_active(&self) -> Result<String, ServiceError>;
}

/// `systemctl`-backed controller.
#[derive(Clone, Debug)]
pub struct Systemctl {
    program: PathBuf,
    unit: String,
}

impl Systemctl {
    pub fn new(program: impl Into<PathBuf>, unit: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            unit: unit.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output, ServiceError> {
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| ServiceError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

impl ServiceControl for Systemctl {
    fn unit(&self) -> &str {
        &self.unit
    }

    fn restart(&self) -> Result<(), ServiceError> {
        // --no-block: queue the restart job without waiting for the unit to settle.
        let output = self.run(&["restart", "--no-block", &self.unit])?;
        if output.status.success() {
            tracing::info!(unit = %self.unit, "restart queued");
            Ok(())
        } else {
            Err(ServiceError::RestartFailed {
                unit: self.unit.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn query_active(&self) -> Result<String, ServiceError> {
        // is-active exits non-zero for anything but "active"; stdout still has the state.
        let output = self.run(&["is-active", &self.unit])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
