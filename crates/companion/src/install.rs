//! Registration of the companion as a native messaging host.
//!
//! Chrome and Edge find hosts through a JSON manifest. On Windows the manifest
//! can live anywhere and is located through a registry key; elsewhere it must
//! sit in the browser's per-user `NativeMessagingHosts` directory.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};
use tabfloat_ipc::{HostManifest, HOST_NAME};

/// Browsers the companion can be registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Browser {
    Chrome,
    Edge,
}

impl Browser {
    /// Registry key (under HKCU) holding this browser's host registrations.
    pub fn registry_key(self) -> &'static str {
        match self {
            Browser::Chrome => r"Software\Google\Chrome\NativeMessagingHosts",
            Browser::Edge => r"Software\Microsoft\Edge\NativeMessagingHosts",
        }
    }

    /// Per-user manifest directory, relative to the platform config directory.
    pub fn manifest_subdir(self) -> &'static str {
        match (self, cfg!(target_os = "macos")) {
            (Browser::Chrome, true) => "Google/Chrome/NativeMessagingHosts",
            (Browser::Edge, true) => "Microsoft Edge/NativeMessagingHosts",
            (Browser::Chrome, false) => "google-chrome/NativeMessagingHosts",
            (Browser::Edge, false) => "microsoft-edge/NativeMessagingHosts",
        }
    }
}

/// Chrome extension ids are 32 characters drawn from `a` to `p`.
pub fn validate_extension_id(extension_id: &str) -> Result<()> {
    let valid = extension_id.len() == 32 && extension_id.bytes().all(|b| (b'a'..=b'p').contains(&b));
    if !valid {
        bail!("Invalid extension id {:?}: expected 32 letters a-p", extension_id);
    }
    Ok(())
}

/// Write the manifest and register it with `browser`.
///
/// Returns the manifest path.
pub fn install(extension_id: &str, browser: Browser) -> Result<PathBuf> {
    validate_extension_id(extension_id)?;

    let exe = std::env::current_exe().context("Failed to locate the companion executable")?;
    let manifest = HostManifest::for_extension(exe.to_string_lossy(), extension_id);

    let path = write_manifest(&manifest_dir(browser)?, &manifest)?;
    register(browser, &path)?;
    Ok(path)
}

/// Write `manifest` as `<dir>/<HOST_NAME>.json`, creating `dir` if needed.
pub fn write_manifest(dir: &Path, manifest: &HostManifest) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let path = dir.join(format!("{}.json", HOST_NAME));
    let json = serde_json::to_string_pretty(manifest).context("Failed to serialize manifest")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write manifest: {}", path.display()))?;

    Ok(path)
}

#[cfg(windows)]
fn manifest_dir(_browser: Browser) -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "tabfloat")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("Failed to determine the data directory")
}

#[cfg(not(windows))]
fn manifest_dir(browser: Browser) -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join(browser.manifest_subdir()))
        .context("Failed to determine the config directory")
}

#[cfg(windows)]
fn register(browser: Browser, manifest_path: &Path) -> Result<()> {
    use winreg::enums::HKEY_CURRENT_USER;
    use winreg::RegKey;

    let key_path = format!(r"{}\{}", browser.registry_key(), HOST_NAME);
    let (key, _) = RegKey::predef(HKEY_CURRENT_USER)
        .create_subkey(&key_path)
        .with_context(|| format!("Failed to create registry key HKCU\\{}", key_path))?;
    key.set_value("", &manifest_path.to_string_lossy().to_string())
        .with_context(|| format!("Failed to write registry key HKCU\\{}", key_path))?;

    Ok(())
}

// The browser scans its manifest directory, nothing else to register.
#[cfg(not(windows))]
fn register(_browser: Browser, _manifest_path: &Path) -> Result<()> {
    Ok(())
}
