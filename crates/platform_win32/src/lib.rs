//! tabfloat Platform Win32
//!
//! Windows-specific window styling using Win32 APIs.
//!
//! This crate handles:
//! - Finding a browser popup's top-level window by its title
//! - Keeping that window above all others (HWND_TOPMOST)
//!
//! On other platforms every operation fails with [`Win32Error::Unsupported`].

use thiserror::Error;

/// Errors that can occur during Win32 operations.
#[derive(Debug, Error)]
pub enum Win32Error {
    #[error("Failed to enumerate windows: {0}")]
    EnumerationFailed(String),

    #[error("Failed to set window position: {0}")]
    SetPositionFailed(String),

    #[error("No visible window title contains {0:?}")]
    WindowNotFound(String),

    #[error("Window styling is only supported on Windows")]
    Unsupported,
}

/// A top-level OS window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeWindow {
    /// The window handle (HWND) as u64.
    pub hwnd: u64,
    /// Window title at the time it was found.
    pub title: String,
}

/// Check whether an OS window title contains `wanted`, ignoring case.
///
/// Browsers decorate the page title (e.g. "Page - Google Chrome"), so an exact
/// match would never succeed. An empty `wanted` matches nothing.
pub fn title_matches(window_title: &str, wanted: &str) -> bool {
    !wanted.is_empty() && window_title.to_lowercase().contains(&wanted.to_lowercase())
}

/// Find the first visible top-level window whose title contains `title`.
pub fn find_window_by_title(title: &str) -> Result<Option<NativeWindow>, Win32Error> {
    imp::find_window_by_title(title)
}

/// Find the window whose title contains `title` and make it topmost.
pub fn make_window_topmost(title: &str) -> Result<NativeWindow, Win32Error> {
    let window =
        find_window_by_title(title)?.ok_or_else(|| Win32Error::WindowNotFound(title.to_string()))?;
    imp::set_topmost(&window)?;
    tracing::debug!("Window {:#x} ({:?}) is now topmost", window.hwnd, window.title);
    Ok(window)
}

#[cfg(windows)]
mod imp {
    use super::{title_matches, NativeWindow, Win32Error};
    use std::ffi::c_void;
    use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowTextLengthW, GetWindowTextW, IsWindowVisible, SetWindowPos,
        HWND_TOPMOST, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
    };

    /// State threaded through `EnumWindows` via its LPARAM.
    struct TitleSearch<'a> {
        wanted: &'a str,
        found: Option<NativeWindow>,
    }

    unsafe extern "system" fn enum_windows_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let search = &mut *(lparam.0 as *mut TitleSearch<'_>);

        if !IsWindowVisible(hwnd).as_bool() {
            return BOOL(1);
        }

        let title = window_title(hwnd);
        if title_matches(&title, search.wanted) {
            search.found = Some(NativeWindow {
                hwnd: hwnd.0 as u64,
                title,
            });
            return BOOL(0); // Stop enumeration
        }

        BOOL(1)
    }

    fn window_title(hwnd: HWND) -> String {
        unsafe {
            let len = GetWindowTextLengthW(hwnd);
            if len <= 0 {
                return String::new();
            }
            let mut buf = vec![0u16; len as usize + 1];
            let copied = GetWindowTextW(hwnd, &mut buf).max(0) as usize;
            String::from_utf16_lossy(&buf[..copied])
        }
    }

    pub fn find_window_by_title(title: &str) -> Result<Option<NativeWindow>, Win32Error> {
        let mut search = TitleSearch {
            wanted: title,
            found: None,
        };

        let result = unsafe {
            EnumWindows(
                Some(enum_windows_proc),
                LPARAM(&mut search as *mut TitleSearch<'_> as isize),
            )
        };

        // EnumWindows reports failure whenever the callback stops it early.
        if search.found.is_none() {
            if let Err(e) = result {
                return Err(Win32Error::EnumerationFailed(e.to_string()));
            }
        }

        Ok(search.found)
    }

    pub fn set_topmost(window: &NativeWindow) -> Result<(), Win32Error> {
        let hwnd = HWND(window.hwnd as *mut c_void);
        unsafe {
            SetWindowPos(
                hwnd,
                Some(HWND_TOPMOST),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
            )
        }
        .map_err(|e| Win32Error::SetPositionFailed(e.to_string()))
    }
}

#[cfg(not(windows))]
mod imp {
    use super::{NativeWindow, Win32Error};

    pub fn find_window_by_title(_title: &str) -> Result<Option<NativeWindow>, Win32Error> {
        Err(Win32Error::Unsupported)
    }

    pub fn set_topmost(_window: &NativeWindow) -> Result<(), Win32Error> {
        Err(Win32Error::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_matches_substring_case_insensitive() {
        assert!(title_matches("Video call - Google Chrome", "video CALL"));
        assert!(title_matches("Video call - Google Chrome", "Video call - Google Chrome"));
        assert!(!title_matches("Inbox - Google Chrome", "Video call"));
    }

    #[test]
    fn test_empty_title_matches_nothing() {
        assert!(!title_matches("Anything", ""));
        assert!(!title_matches("", ""));
    }

    #[test]
    fn test_not_found_message_names_title() {
        let err = Win32Error::WindowNotFound("Video call".to_string());
        assert_eq!(err.to_string(), "No visible window title contains \"Video call\"");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_unsupported_off_windows() {
        assert!(matches!(
            make_window_topmost("Video call"),
            Err(Win32Error::Unsupported)
        ));
    }
}
