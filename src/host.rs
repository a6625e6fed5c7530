use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// The environment hosting the snap view
pub trait Host: Send + Sync {
    /// Restart the view from scratch. Does not return on success.
    fn reload(&self) -> Result<()>;
}

/// Reloads by replacing the current process image with a fresh copy of itself
pub struct ProcessHost;

impl Host for ProcessHost {
    fn reload(&self) -> Result<()> {
        let exe = std::env::current_exe().context("Failed to resolve current executable")?;
        let mut command = restart_command(&exe, std::env::args_os().skip(1));
        tracing::info!("Reloading {:?}", exe);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            let err = command.exec();
            Err(err).with_context(|| format!("Failed to re-exec {:?}", exe))
        }

        #[cfg(not(unix))]
        {
            command
                .spawn()
                .with_context(|| format!("Failed to relaunch {:?}", exe))?;
            std::process::exit(0)
        }
    }
}

/// Arguments are passed through as raw OS strings; they need not be UTF-8
fn restart_command(exe: &Path, args: impl IntoIterator<Item = OsString>) -> Command {
    let mut command = Command::new(exe);
    command.args(args);
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_command_keeps_arguments() {
        let command = restart_command(
            Path::new("/usr/bin/snapodds"),
            vec![OsString::from("--verbose"), OsString::from("tv")],
        );

        assert_eq!(command.get_program(), "/usr/bin/snapodds");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["--verbose", "tv"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_restart_command_accepts_non_utf8_arguments() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let raw = vec![b'c', b'a', b'f', 0xe9];
        let command = restart_command(
            Path::new("/usr/bin/snapodds"),
            vec![OsString::from_vec(raw.clone())],
        );

        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].as_bytes(), raw.as_slice());
    }
}
