use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tabfloat_core::{NativeNotifier, NotifyError, WindowId};
use tabfloat_ipc::{read_message, write_message, CompanionRequest, CompanionResponse, IpcError};
use tokio::process::Command;
use tracing::debug;

/// [`NativeNotifier`] that launches the companion for every message.
///
/// Mirrors how browsers drive native messaging hosts: spawn, write one
/// framed request, read one framed response, close.
#[derive(Debug, Clone)]
pub struct CompanionNotifier {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl CompanionNotifier {
    /// How long to wait for the companion to answer.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Extra arguments passed to the companion.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn exchange(&self, request: &CompanionRequest) -> Result<CompanionResponse, NotifyError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                NotifyError::Unavailable(format!("{}: {}", self.program.display(), e))
            })?;

        let (Some(mut stdin), Some(mut stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(NotifyError::Unavailable(
                "companion stdio not captured".to_string(),
            ));
        };

        write_message(&mut stdin, request).await.map_err(protocol_error)?;
        // Closing stdin tells the companion there is nothing more to handle.
        drop(stdin);

        let response = tokio::time::timeout(self.timeout, read_message(&mut stdout))
            .await
            .map_err(|_| NotifyError::Timeout)?
            .map_err(protocol_error)?
            .ok_or_else(|| NotifyError::Protocol("companion exited without responding".to_string()))?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => debug!("Companion exited with {}", status),
            Ok(Err(e)) => debug!("Failed to wait for companion: {}", e),
            Err(_) => debug!("Companion did not exit in time, killing it"),
        }

        Ok(response)
    }
}

fn protocol_error(e: IpcError) -> NotifyError {
    NotifyError::Protocol(e.to_string())
}

impl NativeNotifier for CompanionNotifier {
    async fn notify(&self, title: &str, window_id: WindowId) -> Result<(), NotifyError> {
        let request = CompanionRequest::MakeWindowFloating {
            window_title: title.to_string(),
            window_id,
        };

        let response = self.exchange(&request).await?;
        if response.success {
            debug!("Companion accepted window {}: {}", window_id, response.detail());
            Ok(())
        } else {
            Err(NotifyError::Rejected(response.detail().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_companion_is_unavailable() {
        let notifier = CompanionNotifier::new("/nonexistent/tabfloat-companion");
        let result = notifier.notify("Video call", 7).await;
        assert!(matches!(result, Err(NotifyError::Unavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echoed_request_is_a_protocol_error() {
        // `cat` echoes the request frame, which is not a valid response.
        let notifier = CompanionNotifier::new("cat");
        let result = notifier.notify("Video call", 7).await;
        assert!(matches!(result, Err(NotifyError::Protocol(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_companion_is_a_protocol_error() {
        let notifier = CompanionNotifier::new("sh").with_args(["-c", "cat >/dev/null"]);
        let result = notifier.notify("Video call", 7).await;
        assert!(matches!(result, Err(NotifyError::Protocol(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_companion_times_out() {
        let notifier = CompanionNotifier::new("sh")
            .with_args(["-c", "sleep 5"])
            .with_timeout(Duration::from_millis(100));
        let result = notifier.notify("Video call", 7).await;
        assert!(matches!(result, Err(NotifyError::Timeout)));
    }

    // Frames below hardcode little-endian length prefixes.
    #[cfg(all(unix, target_endian = "little"))]
    #[tokio::test]
    async fn test_successful_response() {
        let script = r#"cat >/dev/null; printf '\020\000\000\000{"success":true}'"#;
        let notifier = CompanionNotifier::new("sh").with_args(["-c", script]);
        notifier.notify("Video call", 7).await.unwrap();
    }

    #[cfg(all(unix, target_endian = "little"))]
    #[tokio::test]
    async fn test_rejected_response() {
        let script = r#"cat >/dev/null; printf '\042\000\000\000{"success":false,"message":"nope"}'"#;
        let notifier = CompanionNotifier::new("sh").with_args(["-c", script]);
        let result = notifier.notify("Video call", 7).await;
        assert!(matches!(result, Err(NotifyError::Rejected(ref m)) if m == "nope"));
    }
}
