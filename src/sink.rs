//! Artifact persistence: one timestamped file per device per run

use crate::runner::Transcript;
use chrono::NaiveDateTime;
use confsnap_session::DeviceTarget;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Errors persisting an artifact
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes transcripts under a single output directory
#[derive(Debug, Clone)]
pub struct OutputSink {
    dir: PathBuf,
}

impl OutputSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{device}_{YYYYMMDD_HHMMSS}.txt`, with the device identifier
    /// reduced to filesystem-safe characters
    pub fn artifact_name(device: &DeviceTarget, at: NaiveDateTime) -> String {
        let safe: String = device
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        format!("{}_{}.txt", safe, at.format("%Y%m%d_%H%M%S"))
    }

    /// Create the directory if needed and write the transcript, replacing
    /// any previous artifact with the same name.
    ///
    /// Directory creation is idempotent and safe when several workers hit
    /// a not-yet-existing directory at once.
    pub async fn persist(
        &self,
        device: &DeviceTarget,
        transcript: &Transcript,
        at: NaiveDateTime,
    ) -> Result<PathBuf, WriteError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| WriteError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.dir.join(Self::artifact_name(device, at));
        tokio::fs::write(&path, transcript.render())
            .await
            .map_err(|source| WriteError::Write {
                path: path.clone(),
                source,
            })?;

        debug!("wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn capture_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    #[test]
    fn test_artifact_name_round_trip() {
        let name = OutputSink::artifact_name(&DeviceTarget::new("10.0.0.1"), capture_time());
        assert_eq!(name, "10.0.0.1_20240102_030405.txt");
    }

    #[test]
    fn test_artifact_name_sanitizes_odd_hosts() {
        let name = OutputSink::artifact_name(&DeviceTarget::new("fe80::1%eth0"), capture_time());
        assert_eq!(name, "fe80--1-eth0_20240102_030405.txt");
    }

    #[tokio::test]
    async fn test_persist_writes_rendered_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::new(dir.path());

        let mut transcript = Transcript::default();
        transcript.push("show version", "IOS 15.2\n");

        let path = sink
            .persist(&DeviceTarget::new("10.0.0.1"), &transcript, capture_time())
            .await
            .unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "\n\n<------ show version ----->\nIOS 15.2\n");
    }

    #[tokio::test]
    async fn test_concurrent_first_use_of_output_directory() {
        let parent = tempfile::tempdir().unwrap();
        let sink = Arc::new(OutputSink::new(parent.path().join("outputs")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                let mut transcript = Transcript::default();
                transcript.push("show clock", "03:04:05\n");
                sink.persist(
                    &DeviceTarget::new(format!("10.0.0.{}", i)),
                    &transcript,
                    capture_time(),
                )
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(parent.path().join("outputs").is_dir());
    }
}
