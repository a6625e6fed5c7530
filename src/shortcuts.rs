use crate::messages::UserAction;
use anyhow::{Context, Result};
use evdev::{Device, EventStream, EventType, KeyCode};
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Parse a shortcut like "CTRL+ALT+S" into evdev key codes
pub fn parse_shortcut(shortcut: &str) -> Result<Vec<u16>> {
    let keys = shortcut
        .split('+')
        .map(|part| {
            let part = part.trim();
            key_code(&part.to_ascii_uppercase())
                .with_context(|| format!("Unknown key '{}' in shortcut '{}'", part, shortcut))
        })
        .collect::<Result<Vec<_>>>()?;

    if keys.is_empty() {
        return Err(anyhow::anyhow!("Shortcut cannot be empty"));
    }

    Ok(keys)
}

fn key_code(name: &str) -> Option<u16> {
    let code = match name {
        "CTRL" => 29,
        "SHIFT" => 42,
        "ALT" => 56,
        "SUPER" | "META" | "LOGO" => 125,
        "SPACE" => 57,
        "ENTER" => 28,
        "TAB" => 15,
        "ESC" => 1,
        "F1" => 59,
        "F2" => 60,
        "F3" => 61,
        "F4" => 62,
        "F5" => 63,
        "F6" => 64,
        "F7" => 65,
        "F8" => 66,
        "F9" => 67,
        "F10" => 68,
        "Q" => 16,
        "W" => 17,
        "E" => 18,
        "R" => 19,
        "T" => 20,
        "Y" => 21,
        "U" => 22,
        "I" => 23,
        "O" => 24,
        "P" => 25,
        "A" => 30,
        "S" => 31,
        "D" => 32,
        "F" => 33,
        "G" => 34,
        "H" => 35,
        "J" => 36,
        "K" => 37,
        "L" => 38,
        "Z" => 44,
        "X" => 45,
        "C" => 46,
        "V" => 47,
        "B" => 48,
        "N" => 49,
        "M" => 50,
        _ => return None,
    };
    Some(code)
}

/// Tracks held keys on one keyboard and reports completed combos
struct ComboTracker {
    bindings: Vec<(Vec<u16>, UserAction)>,
    held: HashSet<u16>,
    last_trigger: Option<Instant>,
}

impl ComboTracker {
    fn new(bindings: Vec<(Vec<u16>, UserAction)>) -> Self {
        Self {
            bindings,
            held: HashSet::new(),
            last_trigger: None,
        }
    }

    /// Feed one key event (value 1 = press, 0 = release, 2 = repeat)
    fn key_event(&mut self, code: u16, value: i32, now: Instant) -> Option<UserAction> {
        match value {
            1 => {
                self.held.insert(code);
            }
            0 => {
                self.held.remove(&code);
                return None;
            }
            _ => return None,
        }

        if self
            .last_trigger
            .is_some_and(|last| now.duration_since(last) < DEBOUNCE)
        {
            return None;
        }

        let action = self
            .bindings
            .iter()
            .find(|(keys, _)| keys.contains(&code) && keys.iter().all(|k| self.held.contains(k)))
            .map(|(_, action)| *action)?;

        self.last_trigger = Some(now);
        Some(action)
    }
}

/// Monitor all keyboards for the configured shortcuts.
///
/// Spawns one task per keyboard and returns once they are running. A keyboard
/// that cannot be streamed is skipped. Fails only if no keyboard could be
/// started (usually a missing `input` group membership).
pub fn monitor_keyboards(
    bindings: Vec<(Vec<u16>, UserAction)>,
    tx: mpsc::Sender<UserAction>,
) -> Result<()> {
    let devices = open_keyboard_devices();
    if devices.is_empty() {
        return Err(anyhow::anyhow!(
            "No keyboard devices found. Is the user in the 'input' group?"
        ));
    }

    let started = start_each(devices, |device| {
        let name = device.name().unwrap_or("unknown").to_string();
        let stream = device
            .into_event_stream()
            .with_context(|| format!("Failed to stream events from {}", name))?;
        spawn_keyboard_monitor(
            name,
            stream,
            ComboTracker::new(bindings.clone()),
            tx.clone(),
        );
        Ok(())
    })?;

    tracing::info!("Monitoring {} keyboard(s) for shortcuts", started);
    Ok(())
}

/// Start every device, skipping failures. Errors if none started.
fn start_each<D>(devices: Vec<D>, mut start: impl FnMut(D) -> Result<()>) -> Result<usize> {
    let mut started = 0;
    let mut last_error = None;

    for device in devices {
        match start(device) {
            Ok(()) => started += 1,
            Err(e) => {
                tracing::warn!("Skipping keyboard: {:#}", e);
                last_error = Some(e);
            }
        }
    }

    match (started, last_error) {
        (0, Some(e)) => Err(e.context("No keyboard could be monitored")),
        (0, None) => Err(anyhow::anyhow!("No keyboard could be monitored")),
        (n, _) => Ok(n),
    }
}

fn spawn_keyboard_monitor(
    name: String,
    mut stream: EventStream,
    mut tracker: ComboTracker,
    tx: mpsc::Sender<UserAction>,
) {
    tokio::spawn(async move {
        loop {
            let event = match stream.next_event().await {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Keyboard {} stopped: {}", name, e);
                    break;
                }
            };

            if event.event_type() != EventType::KEY {
                continue;
            }

            if let Some(action) = tracker.key_event(event.code(), event.value(), Instant::now()) {
                tracing::debug!("Shortcut activated: {:?}", action);
                if tx.send(action).await.is_err() {
                    break;
                }
            }
        }
    });
}

/// Open all /dev/input/event* devices that look like keyboards
fn open_keyboard_devices() -> Vec<Device> {
    let mut devices = Vec::new();
    let Ok(entries) = std::fs::read_dir("/dev/input") else {
        return devices;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_event_node = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with("event"));
        if !is_event_node {
            continue;
        }

        if let Ok(dev) = Device::open(&path) {
            let has_key_a = dev
                .supported_keys()
                .is_some_and(|keys| keys.contains(KeyCode::KEY_A));
            if has_key_a {
                tracing::debug!(
                    "Opened keyboard: {} ({})",
                    dev.name().unwrap_or("unknown"),
                    path.display()
                );
                devices.push(dev);
            }
        }
    }

    devices
}

/// Map a line typed on stdin to an action
pub fn parse_command(line: &str) -> Option<UserAction> {
    match line.trim().to_ascii_lowercase().as_str() {
        "s" | "snap" => Some(UserAction::Snap),
        "h" | "help" => Some(UserAction::Help),
        "r" | "reload" => Some(UserAction::Reload),
        "q" | "quit" | "exit" => Some(UserAction::Quit),
        _ => None,
    }
}

/// Read commands from stdin until EOF.
///
/// The read runs on its own OS thread rather than the runtime's blocking pool,
/// so a pending read never holds up runtime shutdown.
pub fn monitor_stdin(tx: mpsc::Sender<UserAction>) -> Result<()> {
    spawn_command_reader(std::io::stdin(), tx)?;
    Ok(())
}

fn spawn_command_reader<R>(reader: R, tx: mpsc::Sender<UserAction>) -> Result<thread::JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("snapodds-stdin".into())
        .spawn(move || {
            if let Err(e) = read_commands(BufReader::new(reader), &tx) {
                tracing::warn!("Command input stopped: {:#}", e);
            }
        })
        .context("Failed to spawn stdin reader")
}

/// Forward commands until EOF, `quit`, or the receiver goes away
fn read_commands(reader: impl BufRead, tx: &mpsc::Sender<UserAction>) -> Result<()> {
    for line in reader.lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Some(action) => {
                if tx.blocking_send(action).is_err() || action == UserAction::Quit {
                    return Ok(());
                }
            }
            None => tracing::warn!("Unknown command '{}' (try snap, help, reload, quit)", line.trim()),
        }
    }

    tracing::debug!("stdin closed");
    Ok(())
}
