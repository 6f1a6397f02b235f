//! tco – touch-control overlay for emulators and games on touchscreens.
//!
//! Virtual keys, d-pads, touch areas, mouse buttons and touchscreen surfaces
//! are laid out from a JSON layout file, fed raw multi-touch reports and
//! turned into semantic input callbacks.  A swipe down from the top edge
//! toggles a drag-to-reposition editing mode whose result is saved back to
//! the layout file.

pub mod config;
pub mod control;
pub mod event;
pub mod geometry;
pub mod host;
pub mod label;
pub mod layout;
pub mod overlay;
pub mod ownership;
pub mod png;
pub mod session;
pub mod sink;
pub mod surface;
