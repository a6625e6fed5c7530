pub mod http;
pub mod types;

pub use http::HttpLookup;
pub use types::{SportEventResultEntry, SportEventsResponse};

use crate::capture::CaptureArtifact;
use crate::error::SnapResult;
use crate::messages::SnapMode;
use async_trait::async_trait;

/// Maps a captured frame to the sport events recognized in it
///
/// Fails with `SnapError::NoResult` when nothing was recognized and with
/// `SnapError::Technical` for everything else.
#[async_trait]
pub trait SnapLookup: Send + Sync {
    async fn lookup(&self, artifact: CaptureArtifact, mode: SnapMode)
    -> SnapResult<SportEventsResponse>;
}
