//! Launching the user's browser at the authorization URL.
//!
//! The flow only sees the [`BrowserLauncher`] trait, so tests and the CLI's
//! `--no-browser` mode can swap in their own behavior.

use std::process::Stdio;

use tokio::process::Command;

use crate::error::{AuthError, Result};

/// Opens a URL for the user to complete authorization.
pub trait BrowserLauncher: Send + Sync {
    /// Start navigation to `url`. Returning an error is not fatal to the
    /// flow; the URL is logged for manual navigation instead.
    fn open(&self, url: &str) -> Result<()>;
}

/// Launch the platform's default browser.
///
/// The launcher's own stdout/stderr are piped and drained on a background
/// task into the log, so nothing reaches the process's standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &str) -> Command {
        #[cfg(target_os = "macos")]
        {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        }
        #[cfg(target_os = "windows")]
        {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let mut cmd = Self::command(url);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        let program = format!("{:?}", cmd.as_std().get_program());
        let child = cmd
            .spawn()
            .map_err(|e| AuthError::Launch(format!("{}: {}", program, e)))?;

        tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(output) => {
                    log_output(&program, "stdout", &output.stdout);
                    log_output(&program, "stderr", &output.stderr);
                    if !output.status.success() {
                        tracing::warn!(
                            launcher = %program,
                            status = %output.status,
                            "browser launcher exited unsuccessfully"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(launcher = %program, error = %e, "failed to wait for browser launcher");
                }
            }
        });

        Ok(())
    }
}

fn log_output(program: &str, stream: &'static str, bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if !text.is_empty() {
        tracing::info!(launcher = %program, stream, "{}", text);
    }
}

/// Never spawns anything; asks the user to open the URL themselves.
///
/// The prompt goes to stderr so stdout stays free for command output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintUrl;

impl BrowserLauncher for PrintUrl {
    fn open(&self, url: &str) -> Result<()> {
        tracing::info!(url, "browser launch disabled");
        eprintln!("Open the following URL in your browser to log in:\n\n  {}\n", url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Recording(parking_lot::Mutex<Vec<String>>);

    impl BrowserLauncher for Recording {
        fn open(&self, url: &str) -> Result<()> {
            self.0.lock().push(url.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_launcher_is_object_safe() {
        let recording = Arc::new(Recording(parking_lot::Mutex::new(Vec::new())));
        let launcher: Arc<dyn BrowserLauncher> = recording.clone();
        launcher.open("https://example.com/authorize").unwrap();
        assert_eq!(
            recording.0.lock().as_slice(),
            ["https://example.com/authorize"]
        );
    }

    #[test]
    fn test_print_url_succeeds() {
        assert!(PrintUrl.open("https://example.com/authorize").is_ok());
    }

    #[test]
    fn test_system_command_carries_url() {
        let cmd = SystemBrowser::command("https://example.com/a?b=c");
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert!(args.iter().any(|a| *a == "https://example.com/a?b=c"));
    }
}
