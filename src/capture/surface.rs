use crate::error::SnapResult;
use crate::messages::MediaDeviceState;
use crate::stores::MediaDeviceStateStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A single still frame handed from the capture surface to the orchestrator
#[derive(Debug, Clone)]
pub struct CaptureArtifact {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    pub captured_at: DateTime<Utc>,
}

impl CaptureArtifact {
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: "image/jpeg",
            captured_at: Utc::now(),
        }
    }
}

/// Trait for anything that can produce a still image on demand
///
/// Implementations own the capture hardware. `initialize` is called once at
/// startup; `trigger_snapshot` may be called any number of times afterwards.
#[async_trait]
pub trait CaptureSurface: Send + Sync {
    /// Check the capture hardware
    async fn initialize(&self) -> SnapResult<()>;

    /// Capture one frame. Fails if no device is available.
    async fn trigger_snapshot(&self) -> SnapResult<CaptureArtifact>;
}

/// Initialize the surface and publish the resulting device state
pub async fn start_device(surface: Arc<dyn CaptureSurface>, media_state: MediaDeviceStateStore) {
    match surface.initialize().await {
        Ok(()) => {
            tracing::info!("Capture device ready");
            media_state.dispatch(MediaDeviceState::Ready);
        }
        Err(e) => {
            tracing::warn!("Capture device unavailable: {}", e);
            media_state.dispatch(MediaDeviceState::Unavailable(e.to_string()));
        }
    }
}
