//! Semantic input callbacks emitted by the overlay controls.
//!
//! The host implements [`InputSink`] once and hands it to the overlay at
//! construction.  Every callback is invoked synchronously from inside
//! [`crate::overlay::Overlay::dispatch_touch`].

use std::collections::VecDeque;
use std::fmt;

use strum::{Display, IntoStaticStr};

/// Pressed / released state for keys and d-pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum KeyState {
    #[strum(serialize = "down")]
    Down,
    #[strum(serialize = "up")]
    Up,
}

/// Pressed / released state for mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ButtonState {
    #[strum(serialize = "down")]
    Down,
    #[strum(serialize = "up")]
    Up,
}

/// Gesture reported by a touchscreen control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ScreenGesture {
    #[strum(serialize = "move")]
    Move,
    #[strum(serialize = "tap")]
    Tap,
    #[strum(serialize = "hold")]
    Hold,
}

/// Keyboard event emitted by a key control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyBinding {
    pub symbol: i32,
    pub modifier: i32,
    pub scancode: i32,
    pub unicode: i32,
}

/// Mouse button emitted by a mouse-button control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseBinding {
    pub button: i32,
    pub mask: i32,
}

/// Receiver of the six semantic input events.
pub trait InputSink {
    fn key(&mut self, key: KeyBinding, state: KeyState);

    /// `angle` is `atan2(dy, dx)` in whole degrees from the d-pad centre,
    /// in surface coordinates (y grows downward).
    fn dpad(&mut self, angle: i32, state: KeyState);

    /// Relative motion from a touch area.
    fn touch_motion(&mut self, dx: i32, dy: i32);

    fn mouse_button(&mut self, button: MouseBinding, state: ButtonState);

    /// Quick tap on a tap-sensitive touch area.
    fn tap(&mut self);

    fn touch_screen(&mut self, x: i32, y: i32, gesture: ScreenGesture);
}

/// One recorded callback, as buffered by [`QueuedSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Key(KeyBinding, KeyState),
    DPad(i32, KeyState),
    TouchMotion(i32, i32),
    MouseButton(MouseBinding, ButtonState),
    Tap,
    TouchScreen(i32, i32, ScreenGesture),
}

/// Sink that queues every callback for hosts that poll once per frame.
#[derive(Debug, Default)]
pub struct QueuedSink {
    queue: VecDeque<InputAction>,
}

impl QueuedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<InputAction> {
        self.queue.drain(..).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &InputAction> {
        self.queue.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl InputSink for QueuedSink {
    fn key(&mut self, key: KeyBinding, state: KeyState) {
        self.queue.push_back(InputAction::Key(key, state));
    }

    fn dpad(&mut self, angle: i32, state: KeyState) {
        self.queue.push_back(InputAction::DPad(angle, state));
    }

    fn touch_motion(&mut self, dx: i32, dy: i32) {
        self.queue.push_back(InputAction::TouchMotion(dx, dy));
    }

    fn mouse_button(&mut self, button: MouseBinding, state: ButtonState) {
        self.queue.push_back(InputAction::MouseButton(button, state));
    }

    fn tap(&mut self) {
        self.queue.push_back(InputAction::Tap);
    }

    fn touch_screen(&mut self, x: i32, y: i32, gesture: ScreenGesture) {
        self.queue.push_back(InputAction::TouchScreen(x, y, gesture));
    }
}

impl fmt::Display for InputAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputAction::Key(key, state) => write!(
                f,
                "key {state} (symbol {}, modifier {}, scancode {}, unicode {})",
                key.symbol, key.modifier, key.scancode, key.unicode
            ),
            InputAction::DPad(angle, state) => write!(f, "dpad {state} at {angle}°"),
            InputAction::TouchMotion(dx, dy) => write!(f, "motion ({dx}, {dy})"),
            InputAction::MouseButton(button, state) => write!(
                f,
                "mouse button {} {state} (mask {:#x})",
                button.button, button.mask
            ),
            InputAction::Tap => write!(f, "tap"),
            InputAction::TouchScreen(x, y, gesture) => write!(f, "touchscreen {gesture} at ({x}, {y})"),
        }
    }
}
