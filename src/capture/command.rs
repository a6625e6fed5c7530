use super::surface::{CaptureArtifact, CaptureSurface};
use crate::error::{SnapError, SnapResult};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Captures frames by running an external command against a video device
///
/// The command template is run through `sh -c` with `{device}` and `{output}`
/// replaced by the device path and a fresh temp file. The command must write a
/// single JPEG frame to `{output}`.
pub struct CommandCapture {
    device: PathBuf,
    command: String,
}

impl CommandCapture {
    pub fn new(device: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            command: command.into(),
        }
    }

    fn render_command(&self, output: &std::path::Path) -> String {
        self.command
            .replace("{device}", &shell_quote(&self.device.to_string_lossy()))
            .replace("{output}", &shell_quote(&output.to_string_lossy()))
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[async_trait]
impl CaptureSurface for CommandCapture {
    async fn initialize(&self) -> SnapResult<()> {
        tokio::fs::metadata(&self.device).await.map_err(|e| {
            SnapError::technical(format!(
                "No video device available at {}: {}",
                self.device.display(),
                e
            ))
        })?;

        tracing::info!("Using capture device {}", self.device.display());
        Ok(())
    }

    async fn trigger_snapshot(&self) -> SnapResult<CaptureArtifact> {
        if !self.device.exists() {
            return Err(SnapError::technical(format!(
                "No video device available at {}",
                self.device.display()
            )));
        }

        let temp_file = tempfile::Builder::new()
            .prefix("snapodds-")
            .suffix(".jpg")
            .tempfile()?;

        let command = self.render_command(temp_file.path());
        tracing::debug!("Running capture command: {}", command);

        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SnapError::technical(format!(
                "Capture command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let data = tokio::fs::read(temp_file.path()).await?;
        if data.is_empty() {
            return Err(SnapError::technical("Capture command produced an empty frame"));
        }

        tracing::debug!("Captured frame: {} bytes", data.len());
        Ok(CaptureArtifact::jpeg(data))
    }
}
