use rodio::OutputStreamBuilder;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Success feedback for a recognized snap
///
/// Plays a short sound when enabled. A missing sound file or audio device is
/// logged and otherwise ignored.
#[derive(Clone)]
pub struct NotificationService {
    enabled: bool,
    sound_path: PathBuf,
}

impl NotificationService {
    pub fn new(enabled: bool, sound_path: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            sound_path: sound_path.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fire-and-forget; returns immediately
    pub fn notify(&self) {
        if !self.is_enabled() {
            return;
        }

        let path = self.sound_path.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = play_sound_blocking(&path) {
                tracing::warn!("Failed to play notification {}: {}", path.display(), e);
            }
        });
    }
}

fn play_sound_blocking(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(path)
        .or_else(|_| File::open(PathBuf::from("assets").join(path)))
        .or_else(|_| File::open(PathBuf::from("/usr/share/snapodds/assets").join(path)))?;

    let stream_handle = OutputStreamBuilder::open_default_stream()?;
    let sink = rodio::play(stream_handle.mixer(), BufReader::new(file))?;
    sink.sleep_until_end();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_sound_is_ignored() {
        let service = NotificationService::new(true, "/nonexistent/ping.opus");
        assert!(service.is_enabled());
        service.notify();
        assert!(play_sound_blocking(Path::new("/nonexistent/ping.opus")).is_err());
    }

    #[test]
    fn test_disabled_does_nothing() {
        // No runtime needed: a disabled service never spawns.
        NotificationService::new(false, "ping-up.opus").notify();
    }
}
