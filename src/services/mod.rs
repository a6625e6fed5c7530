pub mod orchestrator;

pub use orchestrator::{AutoSnapConfig, Collaborators, SnapOrchestrator};
