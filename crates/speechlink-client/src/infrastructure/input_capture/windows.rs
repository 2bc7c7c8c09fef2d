//! Windows low-level keyboard hook.
//!
//! Installs a WH_KEYBOARD_LL hook and pumps a Win32 message loop on the
//! calling (blocking) thread.  The hook procedure forwards each event to the
//! registered callback and returns `LRESULT(1)` when the callback swallows
//! it, which stops the OS from delivering the event to any other window.
//!
//! The callback is replaced on every install because each relay session
//! wires a fresh forwarding controller; only one hook loop runs at a time.
//!
//! # Safety
//!
//! `unsafe` is confined to Windows API FFI calls; each block carries a
//! `// SAFETY:` note.  Hook procedures must return quickly (the OS drops
//! hooks that stall), so the callback does no I/O beyond a queue push.

#![cfg(windows)]

use std::sync::Mutex;

use tracing::{debug, info};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, PeekMessageW, SetWindowsHookExW, TranslateMessage,
    UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, KBDLLHOOKSTRUCT_FLAGS,
    LLKHF_EXTENDED, MSG, PM_REMOVE, WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT,
    WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use super::{CaptureError, HookCallback, HookVerdict, RawKeyEvent};

/// Callback for the currently installed hook.  Guarded by a mutex rather
/// than set-once storage because every session installs a fresh callback.
static ACTIVE_CALLBACK: Mutex<Option<HookCallback>> = Mutex::new(None);

/// Installs the hook, pumps messages until `stop` returns true, then
/// uninstalls.  Runs on a blocking thread.
pub fn run_hook_loop<F>(callback: HookCallback, stop: F) -> Result<(), CaptureError>
where
    F: Fn() -> bool,
{
    if let Ok(mut guard) = ACTIVE_CALLBACK.lock() {
        *guard = Some(callback);
    }

    // SAFETY: WH_KEYBOARD_LL does not require a module handle; the hook
    // procedure is a plain function with the documented signature.
    let hook: HHOOK = unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0)
            .map_err(|e| CaptureError::InstallFailed(e.to_string()))?
    };
    info!("keyboard hook installed");

    let mut msg = MSG::default();
    while !stop() {
        // SAFETY: standard PeekMessage/TranslateMessage/DispatchMessage
        // pump; the struct is owned by this frame.
        let has_message = unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE) }.as_bool();
        if has_message {
            if msg.message == WM_QUIT {
                debug!("received WM_QUIT");
                break;
            }
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        } else {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    // SAFETY: `hook` is the live handle installed above.
    unsafe {
        let _ = UnhookWindowsHookEx(hook);
    }
    if let Ok(mut guard) = ACTIVE_CALLBACK.lock() {
        *guard = None;
    }
    info!("keyboard hook removed");
    Ok(())
}

/// Low-level keyboard hook procedure.
///
/// # Safety
///
/// Called by Windows on the hook thread with `l_param` pointing to a
/// `KBDLLHOOKSTRUCT` whenever `n_code == HC_ACTION`.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code != HC_ACTION as i32 {
        return CallNextHookEx(None, n_code, w_param, l_param);
    }

    // SAFETY: contract above; valid for the duration of this call.
    let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);

    let pressed = match w_param.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => true,
        WM_KEYUP | WM_SYSKEYUP => false,
        _ => return CallNextHookEx(None, n_code, w_param, l_param),
    };

    let event = RawKeyEvent {
        vk_code: kbs.vkCode,
        scan_code: kbs.scanCode as u16,
        extended: (kbs.flags & LLKHF_EXTENDED) != KBDLLHOOKSTRUCT_FLAGS(0),
        pressed,
    };

    let verdict = ACTIVE_CALLBACK
        .lock()
        .ok()
        .and_then(|guard| guard.as_ref().map(|callback| callback(event)))
        .unwrap_or(HookVerdict::PassThrough);

    match verdict {
        HookVerdict::Swallow => LRESULT(1),
        HookVerdict::PassThrough => CallNextHookEx(None, n_code, w_param, l_param),
    }
}
