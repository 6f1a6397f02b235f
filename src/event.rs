//! Touch event types and processing - no I/O, no hardware, fully testable.
//!
//! This module contains the deterministic front half of the overlay
//! pipeline: the event vocabulary the overlay consumes, classification of raw
//! `evdev` events, multi-touch (protocol B) frame assembly, and detection of
//! the top-edge swipe-down that toggles layout editing.

use std::time::{Duration, SystemTime};

/// Identifier of one finger for the lifetime of its contact.
pub type TouchId = i32;

// -- Overlay event vocabulary ---------------------------------

/// Phase of a single touch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Touch,
    Move,
    Release,
}

/// One touch report in overlay-surface coordinates.
///
/// `timestamp` is measured from an arbitrary, monotonic epoch; only
/// differences between timestamps of the same contact are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub touch_id: TouchId,
    pub x: i32,
    pub y: i32,
    pub timestamp: Duration,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, touch_id: TouchId, x: i32, y: i32, timestamp: Duration) -> Self {
        Self {
            phase,
            touch_id,
            x,
            y,
            timestamp,
        }
    }

    pub fn is_release(&self) -> bool {
        self.phase == TouchPhase::Release
    }
}

/// Everything the host may forward to [`crate::overlay::Overlay::handle_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    Touch(TouchEvent),
    /// Swipe down from the top edge: toggles layout editing.
    SwipeDown,
    /// Application is exiting.
    Exit,
    /// Host window closed.
    Close,
    /// No new input; flushes pending drag motion while editing.
    Idle,
}

/// Outcome of a successful dispatch.  Failures are reported as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// Nothing in the overlay wanted the event; the host may use it.
    Unhandled,
}

impl Dispatch {
    pub fn from_handled(handled: bool) -> Self {
        if handled {
            Dispatch::Handled
        } else {
            Dispatch::Unhandled
        }
    }
}

// -- Raw multi-touch events -----------------------------------

/// Intermediate representation of a relevant evdev multi-touch event,
/// decoupled from `evdev` types for testability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtEvent {
    Slot(i32),
    /// A tracking id of `-1` ends the contact in the current slot.
    TrackingId(i32),
    PositionX(i32),
    PositionY(i32),
    SynReport(Duration),
}

/// Classify a single `evdev::InputEvent` into one of the multi-touch
/// categories the assembler cares about.  Returns `None` for irrelevant events.
pub fn classify_event(event: &evdev::InputEvent) -> Option<MtEvent> {
    use evdev::{AbsoluteAxisType, InputEventKind};

    match event.kind() {
        InputEventKind::AbsAxis(axis) => match axis {
            AbsoluteAxisType::ABS_MT_SLOT => Some(MtEvent::Slot(event.value())),
            AbsoluteAxisType::ABS_MT_TRACKING_ID => Some(MtEvent::TrackingId(event.value())),
            AbsoluteAxisType::ABS_MT_POSITION_X => Some(MtEvent::PositionX(event.value())),
            AbsoluteAxisType::ABS_MT_POSITION_Y => Some(MtEvent::PositionY(event.value())),
            _ => None,
        },
        InputEventKind::Synchronization(evdev::Synchronization::SYN_REPORT) => {
            let timestamp = event
                .timestamp()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            Some(MtEvent::SynReport(timestamp))
        }
        _ => None,
    }
}

// -- Frame assembly -------------------------------------------

/// Number of protocol-B slots tracked; higher slots are folded into the last one.
pub const MAX_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    x: i32,
    y: i32,
    active: bool,
    starting: bool,
    lifting: bool,
    moved: bool,
}

/// Turns a stream of [`MtEvent`]s into per-frame [`TouchEvent`]s.
///
/// The slot index is used as the touch id, so the first finger down is
/// touch 0 on practically every controller. Positions are reported
/// relative to the axis minima given as `origin`.
#[derive(Debug, Default)]
pub struct TouchFrameAssembler {
    slots: [Slot; MAX_SLOTS],
    current: usize,
    origin: (i32, i32),
}

impl TouchFrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembler for a device whose axes start at `(min_x, min_y)`.
    pub fn with_origin(min_x: i32, min_y: i32) -> Self {
        Self {
            origin: (min_x, min_y),
            ..Self::default()
        }
    }

    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    /// Feed one event; a `SynReport` flushes the frame and returns the
    /// touch events it produced, in slot order.
    pub fn feed(&mut self, event: MtEvent) -> Vec<TouchEvent> {
        match event {
            MtEvent::Slot(n) => {
                self.current = usize::try_from(n).unwrap_or(0).min(MAX_SLOTS - 1);
            }
            MtEvent::TrackingId(id) => {
                let slot = &mut self.slots[self.current];
                if id < 0 {
                    slot.lifting = true;
                } else {
                    slot.starting = true;
                }
            }
            MtEvent::PositionX(x) => {
                let slot = &mut self.slots[self.current];
                slot.x = x;
                slot.moved = true;
            }
            MtEvent::PositionY(y) => {
                let slot = &mut self.slots[self.current];
                slot.y = y;
                slot.moved = true;
            }
            MtEvent::SynReport(timestamp) => return self.flush(timestamp),
        }
        Vec::new()
    }

    fn flush(&mut self, timestamp: Duration) -> Vec<TouchEvent> {
        let mut frame = Vec::new();
        let (min_x, min_y) = self.origin;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let touch_id = index as TouchId;
            let (x, y) = (slot.x.saturating_sub(min_x), slot.y.saturating_sub(min_y));
            let at = move |phase| TouchEvent::new(phase, touch_id, x, y, timestamp);

            if slot.lifting && slot.active {
                frame.push(at(TouchPhase::Release));
                slot.active = false;
            }
            if slot.starting && !slot.active {
                frame.push(at(TouchPhase::Touch));
                slot.active = true;
            } else if slot.moved && slot.active && !slot.lifting {
                frame.push(at(TouchPhase::Move));
            }

            slot.starting = false;
            slot.lifting = false;
            slot.moved = false;
        }
        frame
    }

    /// Number of contacts currently down.
    pub fn active_contacts(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }
}

// -- Edge swipe detection -------------------------------------

/// What the host should do with a touch event after edge-swipe inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeVerdict {
    /// Not part of an edge gesture; dispatch normally.
    Forward,
    /// Part of an edge gesture; do not dispatch.
    Consume,
    /// The edge gesture completed; emit [`OverlayEvent::SwipeDown`].
    SwipeDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeState {
    Idle,
    Tracking { start_y: i32, start_time: Duration },
    /// Gesture decided; swallow the rest of the contact.
    Draining,
}

/// Recognises a downward swipe of touch 0 starting in the top edge band.
///
/// Contacts that start inside the band belong to the detector until they
/// are released, so controls under the top edge never see them.
#[derive(Debug, Clone)]
pub struct EdgeSwipeDetector {
    band: i32,
    distance: i32,
    max_time: Duration,
    state: EdgeState,
}

impl EdgeSwipeDetector {
    pub fn new(band: i32, distance: i32, max_time: Duration) -> Self {
        Self {
            band,
            distance,
            max_time,
            state: EdgeState::Idle,
        }
    }

    pub fn inspect(&mut self, event: &TouchEvent) -> EdgeVerdict {
        if event.touch_id != 0 {
            return EdgeVerdict::Forward;
        }

        match (self.state, event.phase) {
            (EdgeState::Idle, TouchPhase::Touch) if event.y <= self.band => {
                self.state = EdgeState::Tracking {
                    start_y: event.y,
                    start_time: event.timestamp,
                };
                EdgeVerdict::Consume
            }
            (EdgeState::Idle, _) => EdgeVerdict::Forward,
            (EdgeState::Tracking { start_y, start_time }, phase) => {
                let travelled = event.y - start_y;
                let elapsed = event.timestamp.saturating_sub(start_time);
                let fired = travelled >= self.distance && elapsed <= self.max_time;

                self.state = match phase {
                    TouchPhase::Release => EdgeState::Idle,
                    _ if fired => EdgeState::Draining,
                    _ if elapsed > self.max_time => EdgeState::Draining,
                    _ => self.state,
                };

                if fired {
                    EdgeVerdict::SwipeDown
                } else {
                    EdgeVerdict::Consume
                }
            }
            (EdgeState::Draining, phase) => {
                if phase == TouchPhase::Release {
                    self.state = EdgeState::Idle;
                }
                EdgeVerdict::Consume
            }
        }
    }
}
