//! tabfloat Core
//!
//! Platform-agnostic lifecycle tracking for floating browser tabs.
//!
//! A tab is "floated" by moving it into its own popup window, and later
//! "unfloated" back into an ordinary browser window. This crate implements:
//! - The data model shared with host adapters (windows, tabs, geometry)
//! - Capability traits for the host platform, storage and companion process
//! - [`WindowSettingsStore`] for remembering popup geometry
//! - [`FloatingWindowTracker`], the registry and float/unfloat transitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod capability;
pub mod events;
pub mod settings;
pub mod tracker;

pub use capability::{KeyValueStore, NativeNotifier, SettingsStore, WindowCreator};
pub use events::{BrowserEvent, TriggerCommand};
pub use settings::{MemoryStore, WindowSettingsStore, SETTINGS_KEY};
pub use tracker::{
    FloatOutcome, FloatingWindowRecord, FloatingWindowTracker, ReinsertPolicy, RestoreReport,
    RestoreTarget, TrackerOptions, UnfloatOutcome,
};

/// Identifier of a browser window, assigned by the host platform.
pub type WindowId = i64;

/// Identifier of a browser tab, assigned by the host platform.
pub type TabId = i64;

/// Raw group id the host platform reports for tabs outside any group.
pub const TAB_GROUP_ID_NONE: i64 = -1;

/// Errors reported by the host platform's window and tab primitives.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Window {0} not found")]
    WindowNotFound(WindowId),

    #[error("Tab {0} not found")]
    TabNotFound(TabId),

    #[error("Tab group {0} not found")]
    GroupNotFound(GroupId),

    #[error("Platform call failed: {0}")]
    Failed(String),
}

/// Errors from the external key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read key {key}: {message}")]
    Read { key: String, message: String },

    #[error("Failed to write key {key}: {message}")]
    Write { key: String, message: String },
}

/// Errors from the companion-process notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Companion unavailable: {0}")]
    Unavailable(String),

    #[error("Companion rejected request: {0}")]
    Rejected(String),

    #[error("Companion protocol error: {0}")]
    Protocol(String),

    #[error("Companion did not respond in time")]
    Timeout,
}

/// Identifier of a tab group that actually exists (or existed).
///
/// The host platform encodes "no group" as a negative sentinel; that case is
/// represented as `Option::<GroupId>::None` rather than a special value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(i64);

impl GroupId {
    /// Convert a raw platform group id, mapping any value `<= -1` to `None`.
    pub fn from_raw(raw: i64) -> Option<Self> {
        (raw > TAB_GROUP_ID_NONE).then_some(Self(raw))
    }

    /// The raw platform value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position and size of a window in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub width: i32,
    pub height: i32,
    pub top: i32,
    pub left: i32,
}

impl WindowGeometry {
    /// Create a new geometry.
    pub fn new(width: i32, height: i32, top: i32, left: i32) -> Self {
        Self {
            width,
            height,
            top,
            left,
        }
    }
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self::new(800, 600, 50, 50)
    }
}

/// Kind of browser window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowKind {
    /// An ordinary browser window with a tab strip.
    #[default]
    Normal,
    /// A popup window (what floating windows are created as).
    Popup,
    Panel,
    App,
    Devtools,
}

/// A browser tab as reported by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    /// Zero-based position in the window's tab strip.
    pub index: usize,
    pub pinned: bool,
    /// Raw group id; see [`Tab::group`].
    pub group_id: i64,
    pub active: bool,
    pub title: String,
}

impl Tab {
    /// The tab's group, or `None` if it is ungrouped.
    pub fn group(&self) -> Option<GroupId> {
        GroupId::from_raw(self.group_id)
    }
}

/// A browser window as reported by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub id: WindowId,
    #[serde(rename = "type")]
    pub kind: WindowKind,
    pub focused: bool,
    pub bounds: WindowGeometry,
    /// Tabs in strip order. Only filled in when requested with `populate_tabs`.
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

impl Window {
    /// Check whether this is an ordinary (tab-strip) window.
    pub fn is_normal(&self) -> bool {
        self.kind == WindowKind::Normal
    }
}

/// Filter for [`WindowCreator::query`]. Unset fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_window: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_id: Option<WindowId>,
}

impl TabQuery {
    /// The active tab of the window the user is currently interacting with.
    pub fn active_in_current_window() -> Self {
        Self {
            active: Some(true),
            current_window: Some(true),
            window_id: None,
        }
    }
}

/// Parameters for creating a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSpec {
    #[serde(rename = "type")]
    pub kind: WindowKind,
    pub focused: bool,
    /// Existing tab to move into the new window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<WindowGeometry>,
}

/// Where to insert a tab in a window's tab strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabPosition {
    /// After the last tab.
    End,
    /// At a specific zero-based index.
    Index(usize),
}

/// Destination of a tab move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTarget {
    pub window_id: WindowId,
    pub position: TabPosition,
}
