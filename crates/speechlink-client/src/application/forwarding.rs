//! Keyboard forwarding state machine.
//!
//! The controller sits between the OS hook and the session: every raw key
//! event passes through [`ForwardingController::handle_event`], which
//! decides synchronously whether the event is swallowed (forwarded to the
//! remote peer or eaten as part of the toggle chord) or passed through to
//! the local system.
//!
//! # Modes
//!
//! ```text
//! Idle ── toggle chord ──▶ Activating(since) ── 500 ms, next event ──▶ Active
//!  ▲                            │                                        │
//!  │                            └── toggle chord ──┐                     │
//!  └───────────── drain releases, Releasing ◀──────┴──── toggle chord ───┘
//! ```
//!
//! The Activating grace window exists because the modifier-release edges of
//! the toggle chord arrive *after* the trigger key: forwarding them would
//! immediately stick modifiers on the remote side.  During the window every
//! key event is swallowed without being forwarded or tracked.
//!
//! Leaving `Active` — whether by toggle, session disconnect, or shutdown —
//! always emits a release frame for every member of the forwarded-held set
//! before the controller returns to `Idle`.  That drain is the no-stuck-key
//! guarantee; the release frames may be discarded by an already-dead queue,
//! but the held set is empty afterwards in every case.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use speechlink_core::protocol::messages::{ClientMessage, KeyEvent};
use speechlink_core::{KeyboardState, ShortcutSpec};

use crate::infrastructure::audio::AudioBackend;
use crate::infrastructure::input_capture::{HookVerdict, RawKeyEvent};
use crate::infrastructure::network::SessionHandle;

/// Grace window after toggling on during which events are suppressed.
pub const ACTIVATION_GRACE: Duration = Duration::from_millis(500);

/// Sound cue frequencies and length for toggling forwarding on and off.
const TOGGLE_ON_HZ: u32 = 880;
const TOGGLE_OFF_HZ: u32 = 440;
const TOGGLE_CUE_MS: u32 = 100;

/// Forwarding lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardingMode {
    /// Events pass through to the local system.
    Idle,
    /// Toggled on, but still inside the grace window.
    Activating { since: Instant },
    /// Events are forwarded to the remote peer.
    Active,
    /// Transient state while the held-key drain runs.
    Releasing,
}

/// Destination for outbound key frames.
///
/// The production sink is a [`SessionHandle`]; submitting to a destroyed or
/// disconnected session is a logged no-op, which is exactly what the drain
/// paths need.
pub trait KeyEventSink: Send {
    fn submit(&self, event: KeyEvent);
}

impl KeyEventSink for SessionHandle {
    fn submit(&self, event: KeyEvent) {
        self.enqueue(&ClientMessage::Key(event));
    }
}

/// The toggle state machine driving outbound key frames.
pub struct ForwardingController {
    mode: ForwardingMode,
    keyboard: KeyboardState,
    shortcut: ShortcutSpec,
    sink: Box<dyn KeyEventSink>,
    audio: Arc<dyn AudioBackend>,
}

impl ForwardingController {
    pub fn new(
        shortcut: ShortcutSpec,
        sink: Box<dyn KeyEventSink>,
        audio: Arc<dyn AudioBackend>,
    ) -> Self {
        Self {
            mode: ForwardingMode::Idle,
            keyboard: KeyboardState::new(),
            shortcut,
            sink,
            audio,
        }
    }

    pub fn mode(&self) -> ForwardingMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        matches!(self.mode, ForwardingMode::Active)
    }

    /// Processes one raw hook event at the current instant.
    pub fn handle_event(&mut self, event: RawKeyEvent) -> HookVerdict {
        self.handle_event_at(event, Instant::now())
    }

    /// Processes one raw hook event at an explicit instant.  Split out so
    /// the grace-window timing is testable without sleeping.
    pub fn handle_event_at(&mut self, event: RawKeyEvent, now: Instant) -> HookVerdict {
        self.keyboard.update_modifiers(event.vk_code, event.pressed);

        // The toggle chord itself is never forwarded, on press or release
        // edge; the modifier reset below takes care of the release edges.
        if event.pressed && self.keyboard.is_toggle_shortcut(&self.shortcut, event.vk_code) {
            self.toggle(now);
            return HookVerdict::Swallow;
        }

        match self.mode {
            ForwardingMode::Idle => HookVerdict::PassThrough,
            ForwardingMode::Activating { since } => {
                if now.duration_since(since) >= ACTIVATION_GRACE {
                    self.mode = ForwardingMode::Active;
                    self.forward(event)
                } else {
                    // Grace window: no forwarding, no held-set update.
                    HookVerdict::Swallow
                }
            }
            ForwardingMode::Active => self.forward(event),
            ForwardingMode::Releasing => HookVerdict::Swallow,
        }
    }

    /// Drains the held set and returns to `Idle`.  Invoked by the
    /// supervisor on session disconnect and shutdown.
    pub fn release_held(&mut self) {
        if matches!(self.mode, ForwardingMode::Idle) {
            return;
        }
        self.deactivate();
    }

    fn toggle(&mut self, now: Instant) {
        match self.mode {
            ForwardingMode::Idle => {
                self.mode = ForwardingMode::Activating { since: now };
                self.keyboard.reset_modifiers();
                self.audio.play_tone(TOGGLE_ON_HZ, TOGGLE_CUE_MS);
                info!("keyboard forwarding enabled");
            }
            ForwardingMode::Activating { .. } | ForwardingMode::Active => {
                self.deactivate();
            }
            ForwardingMode::Releasing => {}
        }
    }

    fn forward(&mut self, event: RawKeyEvent) -> HookVerdict {
        if event.pressed {
            self.keyboard.track_press(event.vk_code, event.scan_code, event.extended);
        } else {
            self.keyboard.track_release(event.vk_code);
        }
        self.sink.submit(KeyEvent {
            vk_code: event.vk_code,
            extended: event.extended,
            pressed: event.pressed,
            scan_code: event.scan_code,
        });
        HookVerdict::Swallow
    }

    fn deactivate(&mut self) {
        self.mode = ForwardingMode::Releasing;
        let held = self.keyboard.clear_pressed();
        if !held.is_empty() {
            debug!(count = held.len(), "releasing forwarded keys");
        }
        for key in held {
            self.sink.submit(KeyEvent::release(key.vk_code, key.scan_code, key.extended));
        }
        self.keyboard.reset_modifiers();
        self.mode = ForwardingMode::Idle;
        self.audio.play_tone(TOGGLE_OFF_HZ, TOGGLE_CUE_MS);
        info!("keyboard forwarding disabled");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use speechlink_core::keyboard::vk::{VK_F11, VK_LCONTROL, VK_LSHIFT, VK_LWIN};

    #[derive(Default)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<KeyEvent>>>,
    }

    impl KeyEventSink for RecordingSink {
        fn submit(&self, event: KeyEvent) {
            self.frames.lock().unwrap().push(event);
        }
    }

    #[derive(Default)]
    struct RecordingAudio {
        tones: Mutex<Vec<u32>>,
    }

    impl AudioBackend for RecordingAudio {
        fn play_tone(&self, hz: u32, _duration_ms: u32) {
            self.tones.lock().unwrap().push(hz);
        }
        fn play_wave(&self, _file_name: &str) {}
    }

    struct Fixture {
        controller: ForwardingController,
        frames: Arc<Mutex<Vec<KeyEvent>>>,
        audio: Arc<RecordingAudio>,
        start: Instant,
    }

    fn fixture(shortcut: &str) -> Fixture {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink { frames: Arc::clone(&frames) };
        let audio = Arc::new(RecordingAudio::default());
        let controller = ForwardingController::new(
            ShortcutSpec::parse(shortcut),
            Box::new(sink),
            Arc::clone(&audio) as Arc<dyn AudioBackend>,
        );
        Fixture { controller, frames, audio, start: Instant::now() }
    }

    fn down(vk: u32, scan: u16) -> RawKeyEvent {
        RawKeyEvent { vk_code: vk, scan_code: scan, extended: false, pressed: true }
    }

    fn up(vk: u32, scan: u16) -> RawKeyEvent {
        RawKeyEvent { vk_code: vk, scan_code: scan, extended: false, pressed: false }
    }

    /// Presses the default ctrl+win+f11 chord at `at` from Idle, leaving
    /// the controller in Activating.
    fn press_toggle_chord(fx: &mut Fixture, at: Instant) {
        assert_eq!(fx.controller.handle_event_at(down(VK_LCONTROL, 29), at), HookVerdict::PassThrough);
        assert_eq!(fx.controller.handle_event_at(down(VK_LWIN, 91), at), HookVerdict::PassThrough);
        assert_eq!(fx.controller.handle_event_at(down(VK_F11, 87), at), HookVerdict::Swallow);
    }

    /// Activates forwarding via the default chord and steps past the grace
    /// window.
    fn activate(fx: &mut Fixture) -> Instant {
        let at = fx.start;
        press_toggle_chord(fx, at);
        // Chord release edges inside the grace window are swallowed.
        assert_eq!(fx.controller.handle_event_at(up(VK_F11, 87), at), HookVerdict::Swallow);
        assert_eq!(fx.controller.handle_event_at(up(VK_LWIN, 91), at), HookVerdict::Swallow);
        assert_eq!(fx.controller.handle_event_at(up(VK_LCONTROL, 29), at), HookVerdict::Swallow);
        assert!(fx.frames.lock().unwrap().is_empty(), "grace window must not forward");
        at + ACTIVATION_GRACE
    }

    /// Activates a bare-F11 toggle and steps past the grace window.  Used
    /// by toggle-off tests: a modifier-free trigger can re-fire while
    /// Active without the chord modifiers joining the held set first.
    fn activate_bare_f11(fx: &mut Fixture) -> Instant {
        let at = fx.start;
        assert_eq!(fx.controller.handle_event_at(down(VK_F11, 87), at), HookVerdict::Swallow);
        assert_eq!(fx.controller.handle_event_at(up(VK_F11, 87), at), HookVerdict::Swallow);
        assert!(fx.frames.lock().unwrap().is_empty());
        at + ACTIVATION_GRACE
    }

    #[test]
    fn test_idle_events_pass_through_without_frames() {
        let mut fx = fixture("ctrl+win+f11");
        assert_eq!(fx.controller.handle_event_at(down(0x41, 30), fx.start), HookVerdict::PassThrough);
        assert_eq!(fx.controller.handle_event_at(up(0x41, 30), fx.start), HookVerdict::PassThrough);
        assert!(fx.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_on_plays_high_cue_and_enters_grace() {
        let mut fx = fixture("ctrl+win+f11");
        let start = fx.start;
        press_toggle_chord(&mut fx, start);
        assert!(matches!(fx.controller.mode(), ForwardingMode::Activating { .. }));
        assert_eq!(*fx.audio.tones.lock().unwrap(), vec![880]);
    }

    #[test]
    fn test_grace_window_swallows_without_forwarding_then_activates() {
        // At t=0 the chord is pressed; at t=100ms X is swallowed silently;
        // at t=600ms Y is forwarded.
        let mut fx = fixture("ctrl+win+f11");
        let start = fx.start;
        press_toggle_chord(&mut fx, start);

        let at_100ms = fx.start + Duration::from_millis(100);
        assert_eq!(fx.controller.handle_event_at(down(0x58, 45), at_100ms), HookVerdict::Swallow);
        assert!(fx.frames.lock().unwrap().is_empty());

        let at_600ms = fx.start + Duration::from_millis(600);
        assert_eq!(fx.controller.handle_event_at(down(0x59, 21), at_600ms), HookVerdict::Swallow);
        let frames = fx.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], KeyEvent::press(0x59, 21, false));
        assert!(fx.controller.is_active());
    }

    #[test]
    fn test_active_forwards_presses_and_releases() {
        let mut fx = fixture("ctrl+win+f11");
        let after_grace = activate(&mut fx);

        fx.controller.handle_event_at(down(0x41, 30), after_grace);
        fx.controller.handle_event_at(up(0x41, 30), after_grace);
        let frames = fx.frames.lock().unwrap();
        assert_eq!(
            *frames,
            vec![KeyEvent::press(0x41, 30, false), KeyEvent::release(0x41, 30, false)]
        );
    }

    #[test]
    fn test_toggle_off_drains_held_keys_in_insertion_order() {
        let mut fx = fixture("f11");
        let after_grace = activate_bare_f11(&mut fx);

        fx.controller.handle_event_at(down(0x41, 30), after_grace);
        fx.controller.handle_event_at(down(0x42, 48), after_grace);
        fx.frames.lock().unwrap().clear();

        // The trigger press toggles off and is itself never forwarded.
        assert_eq!(fx.controller.handle_event_at(down(VK_F11, 87), after_grace), HookVerdict::Swallow);
        let frames = fx.frames.lock().unwrap();
        assert_eq!(
            *frames,
            vec![KeyEvent::release(0x41, 30, false), KeyEvent::release(0x42, 48, false)]
        );
        drop(frames);
        assert_eq!(fx.controller.mode(), ForwardingMode::Idle);
        assert_eq!(*fx.audio.tones.lock().unwrap(), vec![880, 440]);
    }

    #[test]
    fn test_extra_modifier_disqualifies_the_chord() {
        // Configured ctrl+f11; ctrl+shift+F11 must forward, not toggle.
        let mut fx = fixture("ctrl+f11");
        let after_grace = {
            let at = fx.start;
            assert_eq!(fx.controller.handle_event_at(down(VK_LCONTROL, 29), at), HookVerdict::PassThrough);
            assert_eq!(fx.controller.handle_event_at(down(VK_F11, 87), at), HookVerdict::Swallow);
            at + ACTIVATION_GRACE
        };
        // Release the chord edges, then hold ctrl+shift and press F11.
        fx.controller.handle_event_at(up(VK_F11, 87), fx.start);
        fx.controller.handle_event_at(up(VK_LCONTROL, 29), fx.start);
        fx.frames.lock().unwrap().clear();

        fx.controller.handle_event_at(down(VK_LCONTROL, 29), after_grace);
        fx.controller.handle_event_at(down(VK_LSHIFT, 42), after_grace);
        fx.controller.handle_event_at(down(VK_F11, 87), after_grace);

        assert!(fx.controller.is_active(), "chord with extra shift must not toggle off");
        let frames = fx.frames.lock().unwrap();
        assert_eq!(frames.last().copied(), Some(KeyEvent::press(VK_F11, 87, false)));
    }

    #[test]
    fn test_release_held_on_disconnect_empties_the_set() {
        // Held set [A(65,30), LShift(160,42)]; the session drops.  Expect
        // release frames for both, in insertion order, and an empty set.
        let mut fx = fixture("ctrl+win+f11");
        let after_grace = activate(&mut fx);
        fx.controller.handle_event_at(down(0x41, 30), after_grace);
        fx.controller.handle_event_at(down(VK_LSHIFT, 42), after_grace);
        fx.frames.lock().unwrap().clear();

        fx.controller.release_held();
        assert_eq!(fx.controller.mode(), ForwardingMode::Idle);
        assert_eq!(
            *fx.frames.lock().unwrap(),
            vec![KeyEvent::release(0x41, 30, false), KeyEvent::release(160, 42, false)]
        );

        // Idempotent: a second drain emits nothing.
        fx.frames.lock().unwrap().clear();
        fx.controller.release_held();
        assert!(fx.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_during_grace_window_toggles_back_off() {
        let mut fx = fixture("ctrl+win+f11");
        let start = fx.start;
        press_toggle_chord(&mut fx, start);
        fx.controller.handle_event_at(up(VK_F11, 87), fx.start);

        // The user keeps holding ctrl+win; auto-repeat edges restore the
        // flags that the toggle reset, then the trigger lands again.
        let at_100ms = fx.start + Duration::from_millis(100);
        assert_eq!(fx.controller.handle_event_at(down(VK_LCONTROL, 29), at_100ms), HookVerdict::Swallow);
        assert_eq!(fx.controller.handle_event_at(down(VK_LWIN, 91), at_100ms), HookVerdict::Swallow);
        assert_eq!(fx.controller.handle_event_at(down(VK_F11, 87), at_100ms), HookVerdict::Swallow);

        assert_eq!(fx.controller.mode(), ForwardingMode::Idle);
        assert!(fx.frames.lock().unwrap().is_empty());
        assert_eq!(*fx.audio.tones.lock().unwrap(), vec![880, 440]);
    }

    #[test]
    fn test_key_repeat_tracks_one_held_entry() {
        let mut fx = fixture("f11");
        let after_grace = activate_bare_f11(&mut fx);
        for _ in 0..3 {
            fx.controller.handle_event_at(down(0x41, 30), after_grace);
        }
        fx.frames.lock().unwrap().clear();
        fx.controller.handle_event_at(down(VK_F11, 87), after_grace);
        // One release despite three repeats.
        assert_eq!(*fx.frames.lock().unwrap(), vec![KeyEvent::release(0x41, 30, false)]);
    }
}
