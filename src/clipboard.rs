//! Clipboard access
//!
//! Copies masked output to the system clipboard.

use anyhow::{Context, Result};
use arboard::Clipboard;
#[cfg(target_os = "linux")]
use arboard::SetExtLinux;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Thin wrapper over the platform clipboard
pub struct ClipboardManager;

impl ClipboardManager {
    /// Check if clipboard access is available
    pub fn is_available() -> bool {
        Clipboard::new().is_ok()
    }

    /// Get the current clipboard text
    pub fn get_text() -> Result<String> {
        let mut clipboard = Clipboard::new()
            .context("Failed to access clipboard")?;
        clipboard.get_text()
            .context("Failed to get clipboard text")
    }

    /// Set the clipboard text.
    /// On Linux this waits until a clipboard manager takes ownership, so the
    /// text survives the process exiting right after a CLI copy.
    #[cfg(target_os = "linux")]
    pub fn set_text(text: &str) -> Result<()> {
        let mut clipboard = Clipboard::new()
            .context("Failed to access clipboard")?;
        debug!("Copying {} chars to clipboard", text.len());
        clipboard.set()
            .wait()
            .text(text.to_string())
            .context("Failed to set clipboard text")
    }

    /// Set the clipboard text (non-Linux platforms)
    #[cfg(not(target_os = "linux"))]
    pub fn set_text(text: &str) -> Result<()> {
        let mut clipboard = Clipboard::new()
            .context("Failed to access clipboard")?;
        debug!("Copying {} chars to clipboard", text.len());
        clipboard.set_text(text)
            .context("Failed to set clipboard text")
    }

    /// Set the clipboard text from the GUI thread.
    /// Runs on the runtime's blocking pool so the wait for ownership
    /// handover on Linux never blocks rendering.
    pub fn set_text_background(runtime: &Handle, text: &str) -> JoinHandle<()> {
        let text = text.to_string();
        runtime.spawn_blocking(move || {
            if let Err(e) = Self::set_text(&text) {
                tracing::error!("Failed to copy to clipboard: {}", e);
            }
        })
    }
}
