use crate::capture::{self, CaptureSurface, CommandCapture};
use crate::config::Config;
use crate::host::ProcessHost;
use crate::lookup::{HttpLookup, SportEventResultEntry};
use crate::messages::{MediaDeviceState, UserAction};
use crate::notification::NotificationService;
use crate::services::{AutoSnapConfig, Collaborators, SnapOrchestrator};
use crate::shortcuts;
use crate::stores::{AppStateStore, MediaDeviceStateStore};
use crate::telemetry::Telemetry;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct App {
    orchestrator: SnapOrchestrator,
    lookup: Arc<HttpLookup>,
    action_rx: mpsc::Receiver<UserAction>,
    results_rx: mpsc::UnboundedReceiver<SportEventResultEntry>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let lookup = Arc::new(HttpLookup::new(&config)?);
        let app_state = AppStateStore::default();
        let media_state = MediaDeviceStateStore::default();
        let capture = Self::setup_capture_device(&config, &media_state);
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let orchestrator = SnapOrchestrator::new(
            Collaborators {
                capture,
                lookup: lookup.clone(),
                notifier: NotificationService::new(
                    config.notify_on_match,
                    &config.notification_sound_path,
                ),
                telemetry: Telemetry::new(
                    config.on_view_opened.clone(),
                    config.on_view_closed.clone(),
                ),
                host: Arc::new(ProcessHost),
            },
            app_state,
            media_state,
            AutoSnapConfig::from_config(&config),
            results_tx,
        );

        let action_rx = Self::setup_input(&config)?;

        tracing::info!(
            "Ready! Press {} (or type 'snap') to snap the broadcast",
            config.snap_shortcut
        );

        Ok(Self {
            orchestrator,
            lookup,
            action_rx,
            results_rx,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        self.orchestrator.initialize();

        loop {
            tracing::debug!("Main loop: waiting for event");
            tokio::select! {
                Some(action) = self.action_rx.recv() => {
                    tracing::debug!("Main loop: received {:?}", action);
                    match action {
                        UserAction::Snap => {
                            if let MediaDeviceState::Unavailable(reason) =
                                self.orchestrator.media_device_state()
                            {
                                tracing::warn!("Capture device unavailable ({}), snapping anyway", reason);
                            }
                            self.orchestrator.take_snapshot().await;
                        }
                        UserAction::Help => {
                            tracing::debug!("Showing help from {:?}", self.orchestrator.app_state());
                            tracing::info!("Help: fill the frame with the TV picture, then snap");
                            self.orchestrator.show_help();
                        }
                        UserAction::Reload => {
                            self.orchestrator.teardown().await;
                            if let Err(e) = self.orchestrator.reload_page() {
                                tracing::error!("Error reloading: {:#}", e);
                            }
                            break;
                        }
                        UserAction::Quit => break,
                    }
                }
                Some(entry) = self.results_rx.recv() => {
                    self.present_result(entry);
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.orchestrator.teardown().await;
        tracing::info!("SnapOdds shutdown complete");
        Ok(())
    }

    fn present_result(&self, entry: SportEventResultEntry) {
        let event = &entry.sport_event;
        let since = event
            .start_time()
            .map(|t| format!(" since {}", t.format("%I:%M %p")))
            .unwrap_or_default();

        tracing::info!(
            "{} | {} | {}{}",
            event.tournament,
            event.title(),
            entry.tv_channel.name,
            since
        );

        let lookup = self.lookup.clone();
        let sport_event_id = event.id;
        tokio::spawn(async move {
            match lookup.best_offers(sport_event_id).await {
                Ok(offers) if offers.is_empty() => {
                    tracing::info!("No odds on offer for event {}", sport_event_id);
                }
                Ok(offers) => {
                    for offer in offers {
                        tracing::info!("Odds: {}", offer.summary());
                    }
                }
                Err(e) => tracing::warn!("Failed to load odds: {:#}", e),
            }
        });
    }

    fn setup_capture_device(
        config: &Config,
        media_state: &MediaDeviceStateStore,
    ) -> Arc<dyn CaptureSurface> {
        let surface: Arc<dyn CaptureSurface> = Arc::new(CommandCapture::new(
            &config.capture_device,
            &config.capture_command,
        ));
        tokio::spawn(capture::start_device(surface.clone(), media_state.clone()));
        surface
    }

    fn setup_input(config: &Config) -> Result<mpsc::Receiver<UserAction>> {
        let (action_tx, action_rx) = mpsc::channel(10);

        let bindings = vec![
            (shortcuts::parse_shortcut(&config.snap_shortcut)?, UserAction::Snap),
            (shortcuts::parse_shortcut(&config.help_shortcut)?, UserAction::Help),
        ];
        if let Err(e) = shortcuts::monitor_keyboards(bindings, action_tx.clone()) {
            tracing::warn!("Keyboard shortcuts disabled: {:#}", e);
        }

        if let Err(e) = shortcuts::monitor_stdin(action_tx) {
            tracing::warn!("Command input disabled: {:#}", e);
        }

        Ok(action_rx)
    }
}
