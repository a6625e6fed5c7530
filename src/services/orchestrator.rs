use crate::capture::CaptureSurface;
use crate::config::Config;
use crate::error::{SnapError, SnapResult};
use crate::host::Host;
use crate::lookup::{SnapLookup, SportEventResultEntry};
use crate::messages::{AppState, MediaDeviceState, SnapMode};
use crate::notification::NotificationService;
use crate::stores::{AppStateStore, MediaDeviceStateStore};
use crate::telemetry::Telemetry;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct AutoSnapConfig {
    pub enabled: bool,
    pub initial_delay: Duration,
    pub retry_delay: Duration,
}

impl AutoSnapConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.auto_snap,
            initial_delay: config.auto_snap_delay(true),
            retry_delay: config.auto_snap_delay(false),
        }
    }
}

/// External services the orchestrator drives
pub struct Collaborators {
    pub capture: Arc<dyn CaptureSurface>,
    pub lookup: Arc<dyn SnapLookup>,
    pub notifier: NotificationService,
    pub telemetry: Telemetry,
    pub host: Arc<dyn Host>,
}

/// The part of the orchestrator shared with its spawned tasks
#[derive(Clone)]
struct SnapContext {
    capture: Arc<dyn CaptureSurface>,
    lookup: Arc<dyn SnapLookup>,
    app_state: AppStateStore,
    notifier: NotificationService,
    results_tx: mpsc::UnboundedSender<SportEventResultEntry>,
}

impl SnapContext {
    /// Capture and look up one frame. A response without entries is NoResult.
    async fn load_sport_events(&self, mode: SnapMode) -> SnapResult<SportEventResultEntry> {
        let artifact = self.capture.trigger_snapshot().await?;
        let response = self.lookup.lookup(artifact, mode).await?;
        response.into_top_match().ok_or(SnapError::NoResult)
    }

    fn handle_success(&self, top: SportEventResultEntry) {
        self.notifier.notify();

        tracing::info!(
            "Matched sport event {} ({})",
            top.sport_event.id,
            top.sport_event.tournament
        );
        if self.results_tx.send(top).is_err() {
            tracing::debug!("No results consumer, dropping match");
        }
    }

    fn handle_error(&self, error: &SnapError) {
        tracing::warn!("Snap failed: {}", error);
        if error.is_no_result() {
            self.app_state.dispatch(AppState::SnapNoResults);
        } else {
            self.app_state.dispatch(AppState::SnapFailed);
        }
    }
}

/// Coordinates manual and automatic snaps for one snap view
///
/// This service:
/// - Runs the auto-snap sequence (wait for device, initial delay, retry forever)
/// - Runs manual snaps, cancelling the auto-snap sequence first
/// - Maps snap outcomes onto application state
/// - Tears everything down deterministically when the view closes
///
/// At most one lookup is outstanding at any time: a manual snap waits for the
/// auto-snap task to finish before it starts, and a manual snap issued while
/// another is outstanding is ignored.
pub struct SnapOrchestrator {
    ctx: SnapContext,
    auto_snap: AutoSnapConfig,
    media_state: MediaDeviceStateStore,
    telemetry: Telemetry,
    host: Arc<dyn Host>,
    destroyed: CancellationToken,
    auto_snap_cancel: Option<CancellationToken>,
    auto_snap_task: Option<JoinHandle<()>>,
    manual_task: Option<JoinHandle<()>>,
    watchers: Vec<JoinHandle<()>>,
}

impl SnapOrchestrator {
    pub fn new(
        collaborators: Collaborators,
        app_state: AppStateStore,
        media_state: MediaDeviceStateStore,
        auto_snap: AutoSnapConfig,
        results_tx: mpsc::UnboundedSender<SportEventResultEntry>,
    ) -> Self {
        let Collaborators {
            capture,
            lookup,
            notifier,
            telemetry,
            host,
        } = collaborators;

        Self {
            ctx: SnapContext {
                capture,
                lookup,
                app_state,
                notifier,
                results_tx,
            },
            auto_snap,
            media_state,
            telemetry,
            host,
            destroyed: CancellationToken::new(),
            auto_snap_cancel: None,
            auto_snap_task: None,
            manual_task: None,
            watchers: Vec::new(),
        }
    }

    pub fn initialize(&mut self) {
        if self.auto_snap.enabled {
            self.register_auto_snap();
        }

        self.subscribe_to_state_stores();

        self.ctx.app_state.dispatch(AppState::SnapReady);
        self.telemetry.snap_view_opened();
    }

    pub fn app_state(&self) -> AppState {
        self.ctx.app_state.get_state()
    }

    pub fn media_device_state(&self) -> MediaDeviceState {
        self.media_state.get_state()
    }

    pub async fn take_snapshot(&mut self) {
        if self.destroyed.is_cancelled() {
            tracing::warn!("Snap view is closed, ignoring snapshot");
            return;
        }

        if self
            .manual_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
        {
            tracing::debug!("Snap already in progress, ignoring snapshot");
            return;
        }

        self.cancel_auto_snap().await;

        tracing::info!("Taking snapshot");
        self.ctx.app_state.dispatch(AppState::SnapInProgress);

        let ctx = self.ctx.clone();
        let cancel = self.destroyed.child_token();
        self.manual_task = Some(tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Manual snap cancelled");
                }
                result = ctx.load_sport_events(SnapMode::Manual) => match result {
                    Ok(top) => ctx.handle_success(top),
                    Err(e) => ctx.handle_error(&e),
                }
            }
        }));
    }

    pub fn show_help(&self) {
        self.ctx.app_state.dispatch(AppState::ShowHelp);
    }

    pub fn reload_page(&self) -> Result<()> {
        self.host.reload()
    }

    /// Close the view. Safe to call more than once.
    pub async fn teardown(&mut self) {
        if self.destroyed.is_cancelled() {
            return;
        }

        self.telemetry.snap_view_closed();
        self.destroyed.cancel();

        let mut tasks: Vec<JoinHandle<()>> = self.watchers.drain(..).collect();
        tasks.extend(self.auto_snap_task.take());
        tasks.extend(self.manual_task.take());
        self.auto_snap_cancel = None;

        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                tracing::warn!("Snap task ended abnormally: {}", e);
            }
        }

        tracing::debug!("Snap view torn down");
    }

    fn register_auto_snap(&mut self) {
        let cancel = self.destroyed.child_token();
        let task = tokio::spawn(run_auto_snap(
            self.ctx.clone(),
            self.media_state.subscribe(),
            self.auto_snap.clone(),
            cancel.clone(),
        ));

        self.auto_snap_cancel = Some(cancel);
        self.auto_snap_task = Some(task);
    }

    async fn cancel_auto_snap(&mut self) {
        if let Some(cancel) = self.auto_snap_cancel.take() {
            tracing::debug!("Cancelling auto-snap");
            cancel.cancel();
        }

        if let Some(task) = self.auto_snap_task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Auto-snap task ended abnormally: {}", e);
            }
        }
    }

    fn subscribe_to_state_stores(&mut self) {
        self.watchers.push(spawn_state_watcher(
            "app state",
            self.ctx.app_state.subscribe(),
            self.destroyed.clone(),
        ));
        self.watchers.push(spawn_state_watcher(
            "media device state",
            self.media_state.subscribe(),
            self.destroyed.clone(),
        ));
    }
}

/// Auto-snap sequence raced against its cancellation token.
///
/// The token is a child of the view token, so it fires on teardown as well as
/// on an explicit manual snapshot.
async fn run_auto_snap(
    ctx: SnapContext,
    mut media_rx: watch::Receiver<MediaDeviceState>,
    config: AutoSnapConfig,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!("Auto-snap cancelled");
        }
        top = auto_snap_sequence(&ctx, &mut media_rx, &config) => {
            if let Some(top) = top {
                ctx.handle_success(top);
            }
        }
    }
}

async fn auto_snap_sequence(
    ctx: &SnapContext,
    media_rx: &mut watch::Receiver<MediaDeviceState>,
    config: &AutoSnapConfig,
) -> Option<SportEventResultEntry> {
    let ready = media_rx.wait_for(MediaDeviceState::is_ready).await.is_ok();
    if !ready {
        tracing::warn!("Media device store closed before the device became ready");
        return None;
    }

    tracing::debug!("Auto-snap: device ready, first attempt in {:?}", config.initial_delay);
    tokio::time::sleep(config.initial_delay).await;

    loop {
        match ctx.load_sport_events(SnapMode::Auto).await {
            Ok(top) => return Some(top),
            Err(e) => {
                tracing::debug!(
                    "Auto-snap attempt failed ({}), retrying in {:?}",
                    e,
                    config.retry_delay
                );
                tokio::time::sleep(config.retry_delay).await;
            }
        }
    }
}

fn spawn_state_watcher<T>(
    name: &'static str,
    mut rx: watch::Receiver<T>,
    destroyed: CancellationToken,
) -> JoinHandle<()>
where
    T: Clone + std::fmt::Debug + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = destroyed.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = rx.borrow_and_update().clone();
                    tracing::info!("{} -> {:?}", name, state);
                }
            }
        }
    })
}
