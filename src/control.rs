//! Virtual controls and their per-touch state machines.
use std::time::Duration;

use image::Rgba;
use strum::{Display, EnumString, IntoStaticStr};

use crate::config::{GestureThresholds, OverlayError};
use crate::event::{TouchEvent, TouchId, TouchPhase};
use crate::geometry::Rect;
use crate::label::Label;
use crate::sink::{ButtonState, InputSink, KeyBinding, KeyState, MouseBinding, ScreenGesture};
use crate::surface::{Compositor, WindowId};

/// Fill colours for controls without a label, picked by creation index.
pub const PALETTE: [Rgba<u8>; 6] = [
    Rgba([0xE0, 0x40, 0x40, 0xA0]),
    Rgba([0x40, 0xC0, 0x40, 0xA0]),
    Rgba([0x40, 0x60, 0xE0, 0xA0]),
    Rgba([0xE0, 0xC0, 0x30, 0xA0]),
    Rgba([0xB0, 0x40, 0xD0, 0xA0]),
    Rgba([0x30, 0xC0, 0xC0, 0xA0]),
];

/// Control type names as they appear in layout files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ControlType {
    #[strum(serialize = "key")]
    Key,
    #[strum(serialize = "dpad")]
    DPad,
    #[strum(serialize = "toucharea")]
    TouchArea,
    #[strum(serialize = "mousebutton")]
    MouseButton,
    #[strum(serialize = "touchscreen")]
    TouchScreen,
}

/// What a control emits, with the static properties of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Key(KeyBinding),
    /// Reports the angle of the touch around the control's centre.
    DPad,
    /// Relative mouse motion; taps when `tap_sensitive`.
    TouchArea { tap_sensitive: bool },
    MouseButton(MouseBinding),
    /// Absolute pointer with tap / hold / move gestures.
    TouchScreen,
}

impl ControlKind {
    pub fn control_type(&self) -> ControlType {
        match self {
            ControlKind::Key(_) => ControlType::Key,
            ControlKind::DPad => ControlType::DPad,
            ControlKind::TouchArea { .. } => ControlType::TouchArea,
            ControlKind::MouseButton(_) => ControlType::MouseButton,
            ControlKind::TouchScreen => ControlType::TouchScreen,
        }
    }
}

impl From<ControlType> for ControlKind {
    /// Kind with zeroed bindings. Touch areas tap.
    fn from(control_type: ControlType) -> Self {
        match control_type {
            ControlType::Key => ControlKind::Key(KeyBinding::default()),
            ControlType::DPad => ControlKind::DPad,
            ControlType::TouchArea => ControlKind::TouchArea {
                tap_sensitive: true,
            },
            ControlType::MouseButton => ControlKind::MouseButton(MouseBinding::default()),
            ControlType::TouchScreen => ControlKind::TouchScreen,
        }
    }
}

/// Transient state of the gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Stateless,
    Area {
        down_time: Duration,
        last: (i32, i32),
    },
    Screen {
        start: (i32, i32),
        start_time: Duration,
        moving: bool,
        holding: bool,
    },
}

/// The touch a control currently owns, with its gesture state.
///
/// Dropping the grip is the only way to end a gesture, so no state can
/// outlive ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Grip {
    touch_id: TouchId,
    state: GestureState,
}

/// One virtual input widget.
#[derive(Debug)]
pub struct Control {
    id: i32,
    kind: ControlKind,
    rect: Rect,
    color: Rgba<u8>,
    grip: Option<Grip>,
    label: Option<Label>,
}

impl Control {
    /// `index` is the creation index within the overlay; it picks the fill colour.
    pub fn new(id: i32, kind: ControlKind, rect: Rect, index: usize) -> Self {
        Self {
            id,
            kind,
            rect,
            color: PALETTE[index % PALETTE.len()],
            grip: None,
            label: None,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    pub fn control_type(&self) -> ControlType {
        self.kind.control_type()
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn color(&self) -> Rgba<u8> {
        self.color
    }

    /// Touch id currently owned, if any.
    pub fn owner(&self) -> Option<TouchId> {
        self.grip.map(|g| g.touch_id)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.rect.contains(x, y)
    }

    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    /// Attach `label`, returning the one it replaces.
    pub fn set_label(&mut self, label: Label) -> Option<Label> {
        self.label.replace(label)
    }

    pub fn take_label(&mut self) -> Option<Label> {
        self.label.take()
    }

    /// D-pad angle of `(x, y)`: `atan2(dy, dx)` in degrees, truncated.
    pub fn dpad_angle(&self, x: i32, y: i32) -> i32 {
        let (cx, cy) = self.rect.center();
        (f64::from(y) - cy).atan2(f64::from(x) - cx).to_degrees() as i32
    }

    /// Feed one touch report; returns whether the control still owns the touch.
    ///
    /// An unowned control claims a touch or move that lands inside it.  An
    /// owning control releases on explicit release or when the contact
    /// leaves its bounds, emitting its "up" semantics either way.  Reports
    /// for other touch ids are ignored while a touch is owned.
    pub fn handle_touch<S: InputSink + ?Sized>(
        &mut self,
        event: &TouchEvent,
        thresholds: &GestureThresholds,
        sink: &mut S,
    ) -> bool {
        match self.grip {
            Some(grip) if grip.touch_id != event.touch_id => false,
            None => {
                if event.is_release() || !self.contains(event.x, event.y) {
                    return false;
                }
                let state = self.begin(event, sink);
                self.grip = Some(Grip {
                    touch_id: event.touch_id,
                    state,
                });
                true
            }
            Some(grip) => {
                if !self.contains(event.x, event.y) {
                    self.drift(event, grip.state, sink);
                    self.grip = None;
                    return false;
                }
                let state = self.sustain(event, grip.state, thresholds, sink);
                if event.is_release() {
                    self.grip = None;
                    return false;
                }
                self.grip = Some(Grip {
                    touch_id: event.touch_id,
                    state,
                });
                true
            }
        }
    }

    /// Drop the owned touch, if any, emitting the kind's "up" event.
    ///
    /// Used when the overlay stops routing touches to controls (layout
    /// editing); the contact position is unknown, so d-pads report angle 0.
    pub fn cancel<S: InputSink + ?Sized>(&mut self, sink: &mut S) {
        if self.grip.take().is_none() {
            return;
        }
        match self.kind {
            ControlKind::Key(key) => sink.key(key, KeyState::Up),
            ControlKind::DPad => sink.dpad(0, KeyState::Up),
            ControlKind::MouseButton(button) => sink.mouse_button(button, ButtonState::Up),
            ControlKind::TouchArea { .. } | ControlKind::TouchScreen => {}
        }
    }

    fn begin<S: InputSink + ?Sized>(&self, event: &TouchEvent, sink: &mut S) -> GestureState {
        match self.kind {
            ControlKind::Key(key) => sink.key(key, KeyState::Down),
            ControlKind::DPad => sink.dpad(self.dpad_angle(event.x, event.y), KeyState::Down),
            ControlKind::TouchArea { .. } => {
                return GestureState::Area {
                    down_time: event.timestamp,
                    last: (event.x, event.y),
                };
            }
            ControlKind::MouseButton(button) => sink.mouse_button(button, ButtonState::Down),
            ControlKind::TouchScreen => {
                return GestureState::Screen {
                    start: (event.x, event.y),
                    start_time: event.timestamp,
                    moving: false,
                    holding: false,
                };
            }
        }
        GestureState::Stateless
    }

    /// The contact left the control while owned.
    fn drift<S: InputSink + ?Sized>(&self, event: &TouchEvent, state: GestureState, sink: &mut S) {
        match self.kind {
            ControlKind::Key(key) => sink.key(key, KeyState::Up),
            ControlKind::DPad => sink.dpad(self.dpad_angle(event.x, event.y), KeyState::Up),
            ControlKind::TouchArea { .. } => {
                if let GestureState::Area { last, .. } = state {
                    emit_motion(sink, last, (event.x, event.y));
                }
            }
            ControlKind::MouseButton(button) => sink.mouse_button(button, ButtonState::Up),
            ControlKind::TouchScreen => {}
        }
    }

    /// In-bounds report for the owned touch.
    fn sustain<S: InputSink + ?Sized>(
        &self,
        event: &TouchEvent,
        state: GestureState,
        thresholds: &GestureThresholds,
        sink: &mut S,
    ) -> GestureState {
        let released = event.is_release();
        match (self.kind, state) {
            (ControlKind::Key(key), _) => {
                if released {
                    sink.key(key, KeyState::Up);
                }
                state
            }
            (ControlKind::DPad, _) => {
                let key_state = if released { KeyState::Up } else { KeyState::Down };
                sink.dpad(self.dpad_angle(event.x, event.y), key_state);
                state
            }
            (ControlKind::MouseButton(button), _) => {
                if released {
                    sink.mouse_button(button, ButtonState::Up);
                }
                state
            }
            (ControlKind::TouchArea { tap_sensitive }, GestureState::Area { down_time, last }) => {
                if released
                    && tap_sensitive
                    && event.timestamp.saturating_sub(down_time) < thresholds.tap
                {
                    sink.tap();
                    return state;
                }
                let down_time = if event.phase == TouchPhase::Touch {
                    event.timestamp
                } else {
                    down_time
                };
                let last = if emit_motion(sink, last, (event.x, event.y)) {
                    (event.x, event.y)
                } else {
                    last
                };
                GestureState::Area { down_time, last }
            }
            (
                ControlKind::TouchScreen,
                GestureState::Screen {
                    start,
                    start_time,
                    moving,
                    holding,
                },
            ) => {
                if holding {
                    return state;
                }
                let distance = (event.x - start.0).abs() + (event.y - start.1).abs();
                let elapsed = event.timestamp.saturating_sub(start_time);
                let is_move = event.phase == TouchPhase::Move;

                if released && elapsed < thresholds.tap && distance < thresholds.jitter {
                    sink.touch_screen(event.x, event.y, ScreenGesture::Tap);
                    state
                } else if is_move && (moving || distance > thresholds.jitter) {
                    sink.touch_screen(event.x, event.y, ScreenGesture::Move);
                    GestureState::Screen {
                        start,
                        start_time,
                        moving: true,
                        holding,
                    }
                } else if is_move && !moving && elapsed > thresholds.hold {
                    sink.touch_screen(event.x, event.y, ScreenGesture::Hold);
                    GestureState::Screen {
                        start,
                        start_time,
                        moving,
                        holding: true,
                    }
                } else {
                    state
                }
            }
            // Kind and state always come from the same `begin`.
            (_, _) => state,
        }
    }

    /// Move by `(dx, dy)`, kept inside a `max_x × max_y` surface, dragging
    /// the label window along.
    pub fn move_by<C: Compositor + ?Sized>(
        &mut self,
        dx: i32,
        dy: i32,
        max_x: i32,
        max_y: i32,
        compositor: &mut C,
    ) -> Result<(), OverlayError> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        self.rect = self.rect.translated_within(dx, dy, max_x, max_y);
        match &self.label {
            Some(label) => label.move_to(compositor, self.rect.x, self.rect.y),
            None => Ok(()),
        }
    }

    /// Show the label, if any, at the control's position on top of `parent`.
    pub fn draw_label<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        parent: WindowId,
    ) -> Result<(), OverlayError> {
        let (x, y) = (self.rect.x, self.rect.y);
        match &mut self.label {
            Some(label) => label.show_at(compositor, parent, x, y),
            None => Ok(()),
        }
    }
}

/// Emit relative motion from `last` to `now` if the point moved.
fn emit_motion<S: InputSink + ?Sized>(sink: &mut S, last: (i32, i32), now: (i32, i32)) -> bool {
    let (dx, dy) = (now.0 - last.0, now.1 - last.1);
    if dx == 0 && dy == 0 {
        return false;
    }
    sink.touch_motion(dx, dy);
    true
}

/// Index of the first control (creation order) containing `(x, y)`.
pub fn control_at(controls: &[Control], x: i32, y: i32) -> Option<usize> {
    controls.iter().position(|c| c.contains(x, y))
}
