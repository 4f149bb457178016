//! Atomic replacement of the receiver's key=value config file.
//!
//! The file is the only handoff to the receiver service. Every commit writes a
//! uniquely named sibling temp file, syncs it, and renames it over the target,
//! so readers see either the old or the new content and never a mix.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Tuning parameters for one request, after defaults were applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TuneRequest {
    pub frequency: String,
    pub program: Option<String>,
}

impl TuneRequest {
    /// Render the `KEY=value` body written to the config file.
    ///
    /// Values are written verbatim; the receiver rejects malformed ones.
    pub fn to_env_body(&self) -> String {
        let mut body = format!("FREQ={}\n", self.frequency);
        if let Some(prog) = self.program.as_deref() {
            body.push_str("PROG=");
            body.push_str(prog);
            body.push('\n');
        }
        body
    }
}

/// Failure while replacing the config file. The previous content is intact.
#[derive(Debug)]
pub enum ConfigWriteError {
    /// Creating, writing, or syncing the temp file failed.
    Temp { path: PathBuf, source: std::io::Error },
    /// Renaming the temp file over the target failed.
    Rename { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for ConfigWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWriteError::Temp { path, source } => {
                write!(f, "write temp config {}: {source}", path.display())
            }
            ConfigWriteError::Rename { path, source } => {
                write!(f, "replace config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigWriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigWriteError::Temp { source, .. } | ConfigWriteError::Rename { source, .. } => {
                Some(source)
            }
        }
    }
}

/// Writes tuning parameters to a fixed config path.
#[derive(Clone, Debug)]
pub struct ConfigWriter {
    path: PathBuf,
}

impl ConfigWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the config file with the request's parameters.
    pub fn commit(&self, request: &TuneRequest) -> Result<(), ConfigWriteError> {
        self.commit_body(&request.to_env_body())
    }

    /// Atomically replace the config file with `body`.
    pub fn commit_body(&self, body: &str) -> Result<(), ConfigWriteError> {
        let tmp = self.temp_path();
        if let Err(source) = write_synced(&tmp, body.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(ConfigWriteError::Temp { path: tmp, source });
        }
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(ConfigWriteError::Rename {
                path: self.path.clone(),
                source,
            });
        }
        tracing::debug!(path = %self.path.display(), bytes = body.len(), "config committed");
        Ok(())
    }

    /// Sibling temp path, unique per process and per write.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tuner".to_string());
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(".{name}.{}.{seq}.tmp", std::process::id());
        match self.path.parent() {
            Some(dir) => dir.join(tmp_name),
            None => PathBuf::from(tmp_name),
        }
    }
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "radio-tuner-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&root).expect("create temp dir");
        root
    }

    fn leftover_temps(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "tmp"))
            .collect()
    }

    #[test]
    fn env_body_has_freq_then_prog() {
        let fm = TuneRequest {
            frequency: "104.5".to_string(),
            program: None,
        };
        assert_eq!(fm.to_env_body(), "FREQ=104.5\n");
        let hd = TuneRequest {
            frequency: "96.3".to_string(),
            program: Some("2".to_string()),
        };
        assert_eq!(hd.to_env_body(), "FREQ=96.3\nPROG=2\n");
    }

    #[test]
    fn env_body_keeps_values_verbatim() {
        let req = TuneRequest {
            frequency: "not-a-number".to_string(),
            program: Some(String::new()),
        };
        assert_eq!(req.to_env_body(), "FREQ=not-a-number\nPROG=\n");
    }

    #[test]
    fn commit_replaces_previous_content() {
        let dir = temp_dir("commit");
        let path = dir.join("fmradio");
        fs::write(&path, "FREQ=1.0\nSTALE=1\n").unwrap();

        let writer = ConfigWriter::new(&path);
        writer
            .commit(&TuneRequest {
                frequency: "99.9".to_string(),
                program: None,
            })
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "FREQ=99.9\n");
        assert!(leftover_temps(&dir).is_empty());
    }

    #[test]
    fn failed_rename_keeps_old_content_and_cleans_temp() {
        let dir = temp_dir("rename-fail");
        // A non-empty directory at the target path cannot be replaced by a file.
        let path = dir.join("hdradio");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let writer = ConfigWriter::new(&path);
        let err = writer.commit_body("FREQ=97.1\nPROG=0\n").unwrap_err();
        assert!(matches!(err, ConfigWriteError::Rename { .. }));
        assert!(path.join("occupied").is_dir());
        assert!(leftover_temps(&dir).is_empty());
    }

    #[test]
    fn missing_directory_fails_on_temp_write() {
        let dir = temp_dir("missing-dir");
        let writer = ConfigWriter::new(dir.join("nope").join("fmradio"));
        let err = writer.commit_body("FREQ=1\n").unwrap_err();
        assert!(matches!(err, ConfigWriteError::Temp { .. }));
        assert!(err.to_string().contains("write temp config"));
    }

    #[test]
    fn concurrent_commits_leave_one_whole_payload() {
        let dir = temp_dir("concurrent");
        let path = dir.join("hdradio");
        let writer = ConfigWriter::new(&path);

        let payloads: Vec<String> = (0..16)
            .map(|i| format!("FREQ={}.{}\nPROG={}\n", 88 + i, i, "x".repeat(4096 + i)))
            .collect();

        let payloads = std::sync::Arc::new(payloads);

        let handles: Vec<_> = (0..payloads.len())
            .map(|i| {
                let writer = writer.clone();
                let payloads = payloads.clone();
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        writer.commit_body(&payloads[i]).unwrap();
                        let seen = fs::read_to_string(writer.path()).unwrap();
                        assert!(payloads.contains(&seen), "torn read: {} bytes", seen.len());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let final_body = fs::read_to_string(&path).unwrap();
        assert!(payloads.contains(&final_body));
        assert!(leftover_temps(&dir).is_empty());
    }
}
