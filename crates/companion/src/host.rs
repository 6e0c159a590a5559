//! Native messaging host loop.
//!
//! The browser starts the companion with the extension's origin, then talks to
//! it over stdin/stdout until it closes the pipe.

use crate::config::TopmostConfig;
use std::time::Duration;
use tabfloat_ipc::{
    decode_body, read_frame, write_message, CompanionRequest, CompanionResponse, IpcError,
};
use tabfloat_platform_win32::{NativeWindow, Win32Error};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// How often, and how patiently, to look for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl From<&TopmostConfig> for RetryPolicy {
    fn from(config: &TopmostConfig) -> Self {
        Self {
            attempts: config.find_retries.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Serve requests until the browser closes the stream.
///
/// Undecodable requests are answered with an error response and the loop
/// continues; I/O failures end it.
pub async fn run<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    retry: RetryPolicy,
    mut make_topmost: F,
) -> Result<(), IpcError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(&str) -> Result<NativeWindow, Win32Error>,
{
    loop {
        let Some(body) = read_frame(reader).await? else {
            info!("Browser closed the connection");
            return Ok(());
        };

        let response = match decode_body::<CompanionRequest>(&body) {
            Ok(request) => handle_request(request, retry, &mut make_topmost).await,
            Err(e) => {
                warn!("Rejecting request: {}", e);
                CompanionResponse::error(e.to_string())
            }
        };

        debug!("Responding: {:?}", response);
        write_message(writer, &response).await?;
    }
}

async fn handle_request<F>(
    request: CompanionRequest,
    retry: RetryPolicy,
    make_topmost: &mut F,
) -> CompanionResponse
where
    F: FnMut(&str) -> Result<NativeWindow, Win32Error>,
{
    match request {
        CompanionRequest::MakeWindowFloating {
            window_title,
            window_id,
        } => {
            info!("Making window {} ({:?}) topmost", window_id, window_title);
            match make_topmost_with_retry(&window_title, retry, make_topmost).await {
                Ok(window) => {
                    info!("Window {} is topmost (hwnd {:#x})", window_id, window.hwnd);
                    CompanionResponse::ok(format!("Window {} is now floating", window_id))
                }
                Err(e) => {
                    warn!("Failed to make window {} topmost: {}", window_id, e);
                    CompanionResponse::failure(e.to_string())
                }
            }
        }
    }
}

/// Only a missing window is retried; other failures are final.
async fn make_topmost_with_retry<F>(
    title: &str,
    retry: RetryPolicy,
    make_topmost: &mut F,
) -> Result<NativeWindow, Win32Error>
where
    F: FnMut(&str) -> Result<NativeWindow, Win32Error>,
{
    let mut attempt = 1;
    loop {
        match make_topmost(title) {
            Err(Win32Error::WindowNotFound(_)) if attempt < retry.attempts => {
                debug!(
                    "Window {:?} not found (attempt {}/{}), retrying",
                    title, attempt, retry.attempts
                );
                tokio::time::sleep(retry.delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabfloat_ipc::{encode_frame, read_message};

    const RETRY: RetryPolicy = RetryPolicy {
        attempts: 3,
        delay: Duration::ZERO,
    };

    fn request(title: &str) -> Vec<u8> {
        encode_frame(&CompanionRequest::MakeWindowFloating {
            window_title: title.to_string(),
            window_id: 7,
        })
        .unwrap()
    }

    fn raw_frame(body: &[u8]) -> Vec<u8> {
        let mut frame = (body.len() as u32).to_ne_bytes().to_vec();
        frame.extend_from_slice(body);
        frame
    }

    async fn responses(mut wire: &[u8]) -> Vec<CompanionResponse> {
        let mut out = Vec::new();
        while let Some(response) = read_message(&mut wire).await.unwrap() {
            out.push(response);
        }
        out
    }

    fn found(title: &str) -> Result<NativeWindow, Win32Error> {
        Ok(NativeWindow {
            hwnd: 0x1234,
            title: format!("{} - Google Chrome", title),
        })
    }

    #[tokio::test]
    async fn test_request_made_topmost() {
        let wire = request("Video call");
        let mut output = Vec::new();
        let mut seen = Vec::new();

        run(&mut wire.as_slice(), &mut output, RETRY, |title| {
            seen.push(title.to_string());
            found(title)
        })
        .await
        .unwrap();

        assert_eq!(seen, vec!["Video call"]);
        assert_eq!(
            responses(&output).await,
            vec![CompanionResponse::ok("Window 7 is now floating")]
        );
    }

    #[tokio::test]
    async fn test_missing_window_is_retried() {
        let wire = request("Video call");
        let mut output = Vec::new();
        let mut calls = 0;

        run(&mut wire.as_slice(), &mut output, RETRY, |title| {
            calls += 1;
            if calls < 3 {
                Err(Win32Error::WindowNotFound(title.to_string()))
            } else {
                found(title)
            }
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert!(responses(&output).await[0].success);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let wire = request("Video call");
        let mut output = Vec::new();
        let mut calls = 0;

        run(&mut wire.as_slice(), &mut output, RETRY, |title| {
            calls += 1;
            Err(Win32Error::WindowNotFound(title.to_string()))
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        let responses = responses(&output).await;
        assert!(!responses[0].success);
        assert_eq!(
            responses[0].detail(),
            "No visible window title contains \"Video call\""
        );
    }

    #[tokio::test]
    async fn test_other_failures_are_not_retried() {
        let wire = request("Video call");
        let mut output = Vec::new();
        let mut calls = 0;

        run(&mut wire.as_slice(), &mut output, RETRY, |_| {
            calls += 1;
            Err(Win32Error::Unsupported)
        })
        .await
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(
            responses(&output).await,
            vec![CompanionResponse::failure(
                "Window styling is only supported on Windows"
            )]
        );
    }

    #[tokio::test]
    async fn test_bad_request_answered_and_loop_continues() {
        let mut wire = raw_frame(br#"{"action":"makeWindowSparkle"}"#);
        wire.extend(raw_frame(b"not json"));
        wire.extend(request("Video call"));
        let mut output = Vec::new();

        run(&mut wire.as_slice(), &mut output, RETRY, found)
            .await
            .unwrap();

        let responses = responses(&output).await;
        assert_eq!(responses.len(), 3);
        assert!(!responses[0].success && responses[0].error.is_some());
        assert!(!responses[1].success && responses[1].error.is_some());
        assert!(responses[2].success);
    }

    #[tokio::test]
    async fn test_truncated_stream_ends_loop_with_error() {
        let mut wire = request("Video call");
        wire.extend_from_slice(&[9, 0]);
        let mut output = Vec::new();

        let result = run(&mut wire.as_slice(), &mut output, RETRY, found).await;

        assert!(matches!(result, Err(IpcError::TruncatedHeader)));
        assert_eq!(responses(&output).await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let mut output = Vec::new();
        run(&mut &b""[..], &mut output, RETRY, found).await.unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = TopmostConfig {
            find_retries: 0,
            retry_delay_ms: 250,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }
}
