/// Application state (observable via the app state store)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    SnapReady,
    SnapInProgress,
    SnapNoResults,
    SnapFailed,
    ShowHelp,
}

/// Readiness of the capture hardware (observable via the media device store)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaDeviceState {
    Initializing,
    Ready,
    Unavailable(String),
}

impl MediaDeviceState {
    pub fn is_ready(&self) -> bool {
        matches!(self, MediaDeviceState::Ready)
    }
}

/// Whether a lookup was triggered by the user or by the auto-snap timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapMode {
    Manual,
    Auto,
}

impl SnapMode {
    pub fn is_auto(self) -> bool {
        self == SnapMode::Auto
    }
}

/// User actions delivered by the input sources
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserAction {
    Snap,
    Help,
    Reload,
    Quit,
}
