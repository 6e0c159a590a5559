//! tabfloat IPC Protocol
//!
//! Shared types for browser-companion communication over native messaging.
//!
//! Native messaging frames every message as a 4-byte length in native byte
//! order followed by that many bytes of UTF-8 JSON, over the host process's
//! stdin and stdout.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Name the companion is registered under with the browser.
pub const HOST_NAME: &str = "tabfloater_companion";

/// Largest frame accepted in either direction (1 MiB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Size of the length prefix in bytes.
const HEADER_LEN: usize = 4;

/// Errors that can occur while framing or parsing messages.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message of {0} bytes exceeds the 1 MiB limit")]
    MessageTooLarge(usize),

    #[error("Stream ended inside a message header")]
    TruncatedHeader,
}

/// Requests sent from the browser side to the companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CompanionRequest {
    /// Keep the OS window showing `window_title` above all other windows.
    MakeWindowFloating {
        /// Title of the floated tab; the OS window title contains it.
        #[serde(rename = "windowTitle")]
        window_title: String,
        /// Browser-side id of the popup window.
        #[serde(rename = "windowId")]
        window_id: i64,
    },
}

/// Responses from the companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionResponse {
    pub success: bool,
    /// Human-readable outcome of a handled request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Reason a request could not be handled at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompanionResponse {
    /// The request was handled successfully.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    /// The request was understood but the action failed.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            error: None,
        }
    }

    /// The request could not be processed.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Best description of what happened, for logging.
    pub fn detail(&self) -> &str {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("")
    }
}

/// Native messaging host manifest, as registered with the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostManifest {
    pub name: String,
    pub description: String,
    /// Absolute path of the host executable.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub allowed_origins: Vec<String>,
}

impl HostManifest {
    /// Manifest allowing a single extension to launch the host at `path`.
    pub fn for_extension(path: impl Into<String>, extension_id: &str) -> Self {
        Self {
            name: HOST_NAME.to_string(),
            description: "tabfloat companion application".to_string(),
            path: path.into(),
            kind: "stdio".to_string(),
            allowed_origins: vec![extension_origin(extension_id)],
        }
    }
}

/// Origin string the browser uses for an extension id.
pub fn extension_origin(extension_id: &str) -> String {
    format!("chrome-extension://{}/", extension_id.trim_matches('/'))
}

/// Serialize a message into a complete frame (length prefix included).
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, IpcError> {
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(IpcError::MessageTooLarge(body.len()));
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_ne_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Parse a frame body (without its length prefix).
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, IpcError> {
    Ok(serde_json::from_slice(body)?)
}

/// Read one frame body.
///
/// Returns `Ok(None)` if the stream ends cleanly before a new frame starts.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(IpcError::TruncatedHeader)
            };
        }
        filled += n;
    }

    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(IpcError::MessageTooLarge(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Read and parse one message. `Ok(None)` on clean end of stream.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, IpcError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(body) => decode_body(&body).map(Some),
        None => Ok(None),
    }
}

/// Frame, write and flush one message.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let req = CompanionRequest::MakeWindowFloating {
            window_title: "Video call".to_string(),
            window_id: 42,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"action\":\"makeWindowFloating\""));
        assert!(json.contains("\"windowTitle\":\"Video call\""));
        assert!(json.contains("\"windowId\":42"));

        let parsed: CompanionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, req);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result: Result<CompanionRequest, _> =
            serde_json::from_str(r#"{"action":"makeWindowSparkle"}"#);
        assert!(result.is_err());

        let result: Result<CompanionRequest, _> = serde_json::from_str("not valid json");
        assert!(result.is_err());
    }

    #[test]
    fn test_response_omits_empty_fields() {
        let json = serde_json::to_string(&CompanionResponse::ok("done")).unwrap();
        assert_eq!(json, r#"{"success":true,"message":"done"}"#);

        let json = serde_json::to_string(&CompanionResponse::error("bad input")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"bad input"}"#);
    }

    #[test]
    fn test_response_detail() {
        assert_eq!(CompanionResponse::failure("not found").detail(), "not found");
        assert_eq!(CompanionResponse::error("broken").detail(), "broken");

        let parsed: CompanionResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(parsed.detail(), "");
    }

    #[test]
    fn test_encode_frame_prefixes_length() {
        let frame = encode_frame(&CompanionResponse::ok("x")).unwrap();
        let body_len = u32::from_ne_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(body_len, frame.len() - HEADER_LEN);

        let parsed: CompanionResponse = decode_body(&frame[HEADER_LEN..]).unwrap();
        assert_eq!(parsed, CompanionResponse::ok("x"));
    }

    #[tokio::test]
    async fn test_stream_of_messages() {
        let mut wire = Vec::new();
        write_message(&mut wire, &CompanionResponse::ok("first"))
            .await
            .unwrap();
        write_message(&mut wire, &CompanionResponse::failure("second"))
            .await
            .unwrap();

        let mut reader = wire.as_slice();
        let first: Option<CompanionResponse> = read_message(&mut reader).await.unwrap();
        let second: Option<CompanionResponse> = read_message(&mut reader).await.unwrap();
        let end: Option<CompanionResponse> = read_message(&mut reader).await.unwrap();

        assert_eq!(first, Some(CompanionResponse::ok("first")));
        assert_eq!(second, Some(CompanionResponse::failure("second")));
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn test_truncated_header() {
        let mut reader: &[u8] = &[1, 0];
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(IpcError::TruncatedHeader)));
    }

    #[tokio::test]
    async fn test_truncated_body() {
        let mut wire = (10u32).to_ne_bytes().to_vec();
        wire.extend_from_slice(b"{}");
        let mut reader = wire.as_slice();
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(IpcError::Io(_))));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let wire = ((MAX_MESSAGE_SIZE + 1) as u32).to_ne_bytes();
        let mut reader = &wire[..];
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(IpcError::MessageTooLarge(n)) if n == MAX_MESSAGE_SIZE + 1));
    }

    #[test]
    fn test_host_manifest() {
        let manifest = HostManifest::for_extension(r"C:\tools\tabfloat-companion.exe", "abcdef");
        assert_eq!(manifest.name, HOST_NAME);
        assert_eq!(manifest.allowed_origins, vec!["chrome-extension://abcdef/"]);

        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"type\":\"stdio\""));
    }

    #[test]
    fn test_extension_origin_normalizes_slashes() {
        assert_eq!(extension_origin("abc/"), "chrome-extension://abc/");
    }
}
