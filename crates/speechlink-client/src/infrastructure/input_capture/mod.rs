//! Platform keyboard capture.
//!
//! On Windows this installs a WH_KEYBOARD_LL hook whose callback decides
//! synchronously, per event, whether the event is swallowed (consumed by
//! forwarding) or passed through to the rest of the system.  The decision
//! must be synchronous: returning non-zero from the hook procedure is the
//! only way to stop the OS from delivering the event locally.
//!
//! Other platforms have no hook; the client runs in receive-only mode and
//! the input loop just waits for the stop condition.

use thiserror::Error;

#[cfg(windows)]
pub mod windows;

/// One raw keyboard event as delivered by the OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// Virtual-key code.
    pub vk_code: u32,
    /// Hardware scan code.
    pub scan_code: u16,
    /// Extended-key flag (right-side modifiers, numpad Enter, arrows).
    pub extended: bool,
    /// `true` for key-down (including auto-repeat), `false` for key-up.
    pub pressed: bool,
}

/// The hook callback's synchronous decision for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookVerdict {
    /// Let the OS deliver the event locally.
    PassThrough,
    /// Consume the event; it was forwarded (or deliberately eaten).
    Swallow,
}

/// Errors raised by hook installation.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to install keyboard hook: {0}")]
    InstallFailed(String),
}

/// Callback invoked for every hooked keyboard event.
pub type HookCallback = Box<dyn Fn(RawKeyEvent) -> HookVerdict + Send + Sync>;

/// Runs the platform input loop until `stop` returns true.
///
/// On Windows: installs the low-level keyboard hook, pumps the Win32
/// message loop on a blocking thread, and uninstalls the hook on exit.
/// Elsewhere: sleeps in sub-second slices until stopped (receive-only).
///
/// # Errors
///
/// Returns [`CaptureError`] when the hook cannot be installed; callers fall
/// back to receive-only waiting.
#[cfg(windows)]
pub async fn run_input_loop<F>(callback: HookCallback, stop: F) -> Result<(), CaptureError>
where
    F: Fn() -> bool + Send + 'static,
{
    tokio::task::spawn_blocking(move || windows::run_hook_loop(callback, stop))
        .await
        .map_err(|e| CaptureError::InstallFailed(e.to_string()))?
}

#[cfg(not(windows))]
pub async fn run_input_loop<F>(_callback: HookCallback, stop: F) -> Result<(), CaptureError>
where
    F: Fn() -> bool + Send + 'static,
{
    tracing::info!("keyboard forwarding is not available on this platform; receive-only mode");
    while !stop() {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    Ok(())
}
