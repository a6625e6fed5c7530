use tokio::process::Command;

/// View lifecycle events reported to telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    SnapViewOpened,
    SnapViewClosed,
}

impl TelemetryEvent {
    pub fn name(self) -> &'static str {
        match self {
            TelemetryEvent::SnapViewOpened => "snap_view_opened",
            TelemetryEvent::SnapViewClosed => "snap_view_closed",
        }
    }
}

/// Best-effort telemetry: every event is logged, and forwarded to a hook
/// command when one is configured. Never blocks and never fails the caller.
#[derive(Clone, Default)]
pub struct Telemetry {
    on_view_opened: Option<String>,
    on_view_closed: Option<String>,
}

impl Telemetry {
    pub fn new(on_view_opened: Option<String>, on_view_closed: Option<String>) -> Self {
        Self {
            on_view_opened,
            on_view_closed,
        }
    }

    pub fn snap_view_opened(&self) {
        self.emit(TelemetryEvent::SnapViewOpened);
    }

    pub fn snap_view_closed(&self) {
        self.emit(TelemetryEvent::SnapViewClosed);
    }

    fn emit(&self, event: TelemetryEvent) {
        tracing::info!(target: "snapodds::telemetry", event = event.name(), "telemetry event");

        let hook = match event {
            TelemetryEvent::SnapViewOpened => &self.on_view_opened,
            TelemetryEvent::SnapViewClosed => &self.on_view_closed,
        };

        if let Some(command) = hook {
            run_hook(event.name(), command);
        }
    }
}

fn run_hook(label: &str, command: &str) {
    let label = label.to_owned();
    let command = command.to_owned();

    tokio::task::spawn(async move {
        tracing::debug!("[{}] Running hook: {}", label, command);

        match Command::new("sh")
            .arg("-c")
            .arg(&command)
            .env("SNAPODDS_EVENT", &label)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
        {
            Ok(child) => match child.wait_with_output().await {
                Ok(output) => {
                    if !output.status.success() {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        tracing::warn!(
                            "[{}] Hook exited with {}: {}",
                            label,
                            output.status,
                            stderr.trim()
                        );
                    }
                }
                Err(e) => tracing::warn!("[{}] Failed to wait on hook: {}", label, e),
            },
            Err(e) => tracing::warn!("[{}] Failed to spawn hook: {}", label, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_hook_receives_event_name() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("events.log");
        let command = format!("echo \"$SNAPODDS_EVENT\" >> '{}'", out.display());

        let telemetry = Telemetry::new(Some(command.clone()), Some(command));
        telemetry.snap_view_opened();

        let mut contents = String::new();
        for _ in 0..50 {
            contents = std::fs::read_to_string(&out).unwrap_or_default();
            if !contents.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(contents.trim(), "snap_view_opened");
    }

    #[tokio::test]
    async fn test_failing_hook_does_not_propagate() {
        let telemetry = Telemetry::new(None, Some("exit 1".into()));
        telemetry.snap_view_closed();
        telemetry.snap_view_opened();
    }
}
