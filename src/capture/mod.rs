pub mod command;
pub mod surface;

pub use command::CommandCapture;
pub use surface::{CaptureArtifact, CaptureSurface, start_device};
