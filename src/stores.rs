use crate::messages::{AppState, MediaDeviceState};
use tokio::sync::watch;

/// Single current value with any number of observers.
///
/// Every dispatch overwrites the value; subscribers always see the latest one.
#[derive(Clone)]
pub struct StateStore<T> {
    tx: watch::Sender<T>,
}

pub type AppStateStore = StateStore<AppState>;
pub type MediaDeviceStateStore = StateStore<MediaDeviceState>;

impl<T: Clone + PartialEq + std::fmt::Debug> StateStore<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Overwrite the current value. Succeeds with zero subscribers.
    pub fn dispatch(&self, state: T) {
        tracing::debug!("dispatch: {:?}", state);
        self.tx.send_replace(state);
    }

    pub fn get_state(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl Default for AppStateStore {
    fn default() -> Self {
        Self::new(AppState::SnapReady)
    }
}

impl Default for MediaDeviceStateStore {
    fn default() -> Self {
        Self::new(MediaDeviceState::Initializing)
    }
}
