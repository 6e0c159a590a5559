//! Floating-window lifecycle tracking.
//!
//! [`FloatingWindowTracker`] owns the registry of floating windows and drives
//! the two transitions:
//!
//! - **float**: move a tab into a new popup window and record where it came from
//! - **unfloat**: move the tab back into an ordinary window and forget the popup
//!
//! Everything recorded at float time is a snapshot. By the time the user
//! unfloats, the original window or tab group may be gone, so restoration
//! re-checks the live window list and degrades step by step instead of
//! trusting the record.

use crate::capability::{NativeNotifier, SettingsStore, WindowCreator};
use crate::{
    GroupId, MoveTarget, PlatformError, Tab, TabId, TabPosition, TabQuery, Window, WindowId,
    WindowKind, WindowSpec, TAB_GROUP_ID_NONE,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info, warn};

/// Placement of a tab before it was floated. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatingWindowRecord {
    /// The popup window hosting the tab. Registry key.
    pub floating_window_id: WindowId,
    /// Window the tab was extracted from. May no longer exist.
    pub original_window_id: WindowId,
    /// Position the tab occupied in the original window.
    pub original_tab_index: usize,
    pub was_pinned: bool,
    /// Group the tab belonged to, if any. The group may no longer exist.
    pub original_group: Option<GroupId>,
}

impl FloatingWindowRecord {
    /// The original group as a raw platform id (`-1` when ungrouped).
    pub fn original_group_id(&self) -> i64 {
        self.original_group.map_or(TAB_GROUP_ID_NONE, GroupId::get)
    }
}

/// Where an unfloated tab is inserted in its target window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReinsertPolicy {
    /// Always append after the last tab.
    #[default]
    Append,
    /// Reinsert at the recorded index when returning to the original window,
    /// clamped to its current tab count. Other targets still append.
    OriginalIndex,
}

/// Tuning knobs for [`FloatingWindowTracker`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerOptions {
    pub reinsert: ReinsertPolicy,
}

/// Result of a float request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatOutcome {
    /// A popup was created and recorded.
    Floated { window_id: WindowId },
    /// There was no active tab to float.
    NoActiveTab,
    /// The tab already lives in a floating window.
    AlreadyFloating,
}

/// How the window receiving an unfloated tab was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreTarget {
    /// The window the tab was floated from.
    Original,
    /// Some other ordinary window, because the original is gone.
    Fallback,
    /// A new window, because no ordinary window was open.
    Created,
}

/// What an unfloat actually managed to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    /// Window the tab was moved into.
    pub window_id: WindowId,
    pub target: RestoreTarget,
    pub position: TabPosition,
    /// `None` if the tab was not pinned, otherwise whether re-pinning worked.
    pub pinned: Option<bool>,
    /// `None` if the tab was ungrouped, otherwise whether regrouping worked.
    pub grouped: Option<bool>,
    /// Whether the popup is known to be closed.
    pub window_closed: bool,
}

/// Result of an unfloat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfloatOutcome {
    /// The tab was moved back; see the report for partial failures.
    Restored(RestoreReport),
    /// The window is not a tracked floating window.
    NotFloating,
    /// There was no active tab to identify the current window.
    NoActiveTab,
    /// The floating window no longer hosts a tab; its record was dropped.
    Stale,
}

/// Registry of floating windows plus the float/unfloat transitions.
///
/// Operations take `&mut self`: the host serializes event dispatch, so at most
/// one transition runs against the registry at a time.
pub struct FloatingWindowTracker<W, S, N> {
    windows: W,
    settings: S,
    notifier: N,
    options: TrackerOptions,
    registry: HashMap<WindowId, FloatingWindowRecord>,
}

impl<W, S, N> FloatingWindowTracker<W, S, N>
where
    W: WindowCreator,
    S: SettingsStore,
    N: NativeNotifier,
{
    /// Create a tracker with default options.
    pub fn new(windows: W, settings: S, notifier: N) -> Self {
        Self::with_options(windows, settings, notifier, TrackerOptions::default())
    }

    pub fn with_options(windows: W, settings: S, notifier: N, options: TrackerOptions) -> Self {
        Self {
            windows,
            settings,
            notifier,
            options,
            registry: HashMap::new(),
        }
    }

    pub fn windows(&self) -> &W {
        &self.windows
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn options(&self) -> TrackerOptions {
        self.options
    }

    /// Look up the record for a floating window.
    pub fn record(&self, window_id: WindowId) -> Option<&FloatingWindowRecord> {
        self.registry.get(&window_id)
    }

    /// Check whether a window is currently tracked as floating.
    pub fn is_floating(&self, window_id: WindowId) -> bool {
        self.registry.contains_key(&window_id)
    }

    /// All current records, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &FloatingWindowRecord> {
        self.registry.values()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Float the active tab of the current window.
    pub async fn float(&mut self) -> Result<FloatOutcome, PlatformError> {
        match self
            .windows
            .query(TabQuery::active_in_current_window())
            .await?
        {
            Some(tab) => self.float_tab(tab).await,
            None => {
                debug!("No active tab to float");
                Ok(FloatOutcome::NoActiveTab)
            }
        }
    }

    /// Move `tab` into a new popup window and record its placement.
    ///
    /// Any error before the popup exists aborts without touching the
    /// registry. Geometry persistence and the companion notification are
    /// best-effort.
    pub async fn float_tab(&mut self, tab: Tab) -> Result<FloatOutcome, PlatformError> {
        if self.is_floating(tab.window_id) {
            debug!("Tab {} is already in floating window {}", tab.id, tab.window_id);
            return Ok(FloatOutcome::AlreadyFloating);
        }

        let source = self.windows.get_window(tab.window_id, true).await?;

        // Snapshot from the populated window: it reflects the tab's state
        // right before the move, which the triggering event may not.
        let snapshot = source.tabs.iter().find(|t| t.id == tab.id).unwrap_or(&tab);
        let original_tab_index = snapshot.index;
        let was_pinned = snapshot.pinned;
        let original_group = snapshot.group();

        let geometry = self.settings.get().await;
        let popup = self.windows.create_popup_window(tab.id, geometry).await?;

        // The platform may have adjusted the requested bounds.
        self.settings.save(popup.bounds).await;

        if let Err(e) = self.notifier.notify(&tab.title, popup.id).await {
            warn!("Failed to notify companion about window {}: {}", popup.id, e);
        }

        let record = FloatingWindowRecord {
            floating_window_id: popup.id,
            original_window_id: source.id,
            original_tab_index,
            was_pinned,
            original_group,
        };
        info!(
            "Floated tab {} from window {} (index {}) into window {}",
            tab.id, source.id, original_tab_index, popup.id
        );
        self.registry.insert(popup.id, record);

        Ok(FloatOutcome::Floated { window_id: popup.id })
    }

    /// Move the tab of a floating window back into an ordinary window.
    ///
    /// `window` defaults to the window of the active tab. Unfloating an
    /// untracked window is a no-op. For a tracked window the record is
    /// removed whether or not restoration fully succeeded.
    pub async fn unfloat(
        &mut self,
        window: Option<WindowId>,
    ) -> Result<UnfloatOutcome, PlatformError> {
        let window_id = match window {
            Some(id) => id,
            None => match self
                .windows
                .query(TabQuery::active_in_current_window())
                .await?
            {
                Some(tab) => tab.window_id,
                None => {
                    debug!("No active tab, nothing to unfloat");
                    return Ok(UnfloatOutcome::NoActiveTab);
                }
            },
        };

        let Some(record) = self.registry.get(&window_id).cloned() else {
            debug!("Window {} is not floating, nothing to unfloat", window_id);
            return Ok(UnfloatOutcome::NotFloating);
        };

        let result = self.restore(&record).await;
        self.registry.remove(&window_id);
        result
    }

    async fn restore(
        &mut self,
        record: &FloatingWindowRecord,
    ) -> Result<UnfloatOutcome, PlatformError> {
        let floating_id = record.floating_window_id;

        let tab = match self.windows.get_window(floating_id, true).await {
            Ok(window) => window.tabs.into_iter().next(),
            Err(PlatformError::WindowNotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let Some(tab) = tab else {
            info!("Floating window {} has no tab left, dropping its record", floating_id);
            return Ok(UnfloatOutcome::Stale);
        };

        let (target_window, target) = self.resolve_target(record, tab.id).await?;
        let position = self.insert_position(record, &target_window, target).await;

        // A created window already hosts the tab.
        if target != RestoreTarget::Created {
            self.windows
                .move_tab(
                    tab.id,
                    MoveTarget {
                        window_id: target_window.id,
                        position,
                    },
                )
                .await?;
        }

        let pinned = if record.was_pinned {
            Some(best_effort("re-pin tab", self.windows.set_pinned(tab.id, true)).await)
        } else {
            None
        };

        let grouped = match record.original_group {
            Some(group) => {
                Some(best_effort("regroup tab", self.windows.set_group(tab.id, group)).await)
            }
            None => None,
        };

        best_effort("activate tab", self.windows.activate_tab(tab.id)).await;
        if target != RestoreTarget::Created {
            best_effort("focus window", self.windows.focus_window(target_window.id)).await;
        }

        // Browsers may close an emptied popup on their own.
        let window_closed = match self.windows.close_window(floating_id).await {
            Ok(()) => true,
            Err(PlatformError::WindowNotFound(_)) => {
                debug!("Floating window {} already closed", floating_id);
                true
            }
            Err(e) => {
                warn!("Failed to close floating window {}: {}", floating_id, e);
                false
            }
        };

        info!(
            "Unfloated tab {} from window {} into window {} ({:?})",
            tab.id, floating_id, target_window.id, target
        );

        Ok(UnfloatOutcome::Restored(RestoreReport {
            window_id: target_window.id,
            target,
            position,
            pinned,
            grouped,
            window_closed,
        }))
    }

    /// Pick the window an unfloated tab goes to.
    ///
    /// Prefers the original window, then any ordinary window that is not
    /// itself floating, and as a last resort creates an unfocused window
    /// around `tab_id`.
    ///
    /// Records of other floating windows missing from the window list are
    /// dropped along the way.
    async fn resolve_target(
        &mut self,
        record: &FloatingWindowRecord,
        tab_id: TabId,
    ) -> Result<(Window, RestoreTarget), PlatformError> {
        let open = self.windows.get_all_windows().await?;
        self.prune_closed(&open, record.floating_window_id);

        if let Some(original) = open
            .iter()
            .find(|w| w.id == record.original_window_id && !self.is_floating(w.id))
        {
            return Ok((original.clone(), RestoreTarget::Original));
        }

        if let Some(fallback) = open
            .into_iter()
            .find(|w| w.is_normal() && !self.is_floating(w.id))
        {
            debug!(
                "Original window {} is gone, restoring into window {}",
                record.original_window_id, fallback.id
            );
            return Ok((fallback, RestoreTarget::Fallback));
        }

        debug!("No ordinary window open, creating one");
        let created = self
            .windows
            .create_window(WindowSpec {
                kind: WindowKind::Normal,
                focused: false,
                tab_id: Some(tab_id),
                geometry: None,
            })
            .await?;
        Ok((created, RestoreTarget::Created))
    }

    /// Forget floating windows that were closed without being unfloated.
    fn prune_closed(&mut self, open: &[Window], keep: WindowId) {
        self.registry.retain(|&id, _| {
            let alive = id == keep || open.iter().any(|w| w.id == id);
            if !alive {
                debug!("Floating window {} was closed, dropping its record", id);
            }
            alive
        });
    }

    async fn insert_position(
        &self,
        record: &FloatingWindowRecord,
        target_window: &Window,
        target: RestoreTarget,
    ) -> TabPosition {
        if self.options.reinsert != ReinsertPolicy::OriginalIndex || target != RestoreTarget::Original
        {
            return TabPosition::End;
        }

        match self.windows.get_window(target_window.id, true).await {
            Ok(window) => TabPosition::Index(record.original_tab_index.min(window.tabs.len())),
            Err(e) => {
                warn!("Failed to inspect window {}, appending tab: {}", target_window.id, e);
                TabPosition::End
            }
        }
    }
}

/// Run one best-effort restoration step, logging instead of propagating failure.
async fn best_effort<F>(step: &str, call: F) -> bool
where
    F: Future<Output = Result<(), PlatformError>>,
{
    match call.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to {}: {}", step, e);
            false
        }
    }
}
