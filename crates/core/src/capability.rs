//! Capabilities the tracker consumes from its environment.
//!
//! The host platform, the storage backend and the companion process are all
//! supplied from outside. Every call is asynchronous and may fail; the tracker
//! decides per call site whether a failure aborts the operation or is only
//! logged.

use crate::{
    GroupId, MoveTarget, NotifyError, PlatformError, StorageError, Tab, TabId, TabQuery, Window,
    WindowGeometry, WindowId, WindowKind, WindowSpec,
};

/// Window and tab primitives of the host platform.
#[allow(async_fn_in_trait)]
pub trait WindowCreator {
    /// Find the first tab matching `filter`.
    async fn query(&self, filter: TabQuery) -> Result<Option<Tab>, PlatformError>;

    /// Fetch a window, optionally with its tab list filled in.
    async fn get_window(&self, id: WindowId, populate_tabs: bool) -> Result<Window, PlatformError>;

    /// List every open window.
    async fn get_all_windows(&self) -> Result<Vec<Window>, PlatformError>;

    async fn create_window(&self, spec: WindowSpec) -> Result<Window, PlatformError>;

    /// Create a focused popup window hosting `tab_id`.
    ///
    /// The platform may adjust `geometry`; the returned window carries the
    /// bounds it actually applied.
    async fn create_popup_window(
        &self,
        tab_id: TabId,
        geometry: WindowGeometry,
    ) -> Result<Window, PlatformError>;

    async fn move_tab(&self, tab_id: TabId, target: MoveTarget) -> Result<(), PlatformError>;

    async fn set_pinned(&self, tab_id: TabId, pinned: bool) -> Result<(), PlatformError>;

    async fn set_group(&self, tab_id: TabId, group_id: GroupId) -> Result<(), PlatformError>;

    async fn close_window(&self, id: WindowId) -> Result<(), PlatformError>;

    async fn focus_window(&self, id: WindowId) -> Result<(), PlatformError>;

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), PlatformError>;
}

/// Last-used geometry for new floating windows.
///
/// Neither call fails: geometry memory is a convenience, so implementations
/// swallow and log storage errors.
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    async fn get(&self) -> WindowGeometry;

    async fn save(&self, geometry: WindowGeometry);

    /// Remember the bounds of a window the user just moved or resized.
    ///
    /// Only popup windows are recorded; ordinary windows have no bearing on
    /// floating geometry.
    async fn on_bounds_changed(&self, window: &Window) {
        if window.kind == WindowKind::Popup {
            self.save(window.bounds).await;
        }
    }
}

/// Best-effort channel to the companion process that applies OS-level
/// "always on top" styling.
#[allow(async_fn_in_trait)]
pub trait NativeNotifier {
    async fn notify(&self, title: &str, window_id: WindowId) -> Result<(), NotifyError>;
}

/// Persistent key-value storage.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError>;
}
