//! The overlay: a session's controls, touch routing and layout editing.
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::config::{OverlayConfig, OverlayError};
use crate::control::{Control, ControlKind, control_at};
use crate::event::{Dispatch, OverlayEvent, TouchEvent};
use crate::geometry::Rect;
use crate::label::Label;
use crate::layout::{ControlDefinition, resolve_layout, write_layout};
use crate::ownership::TouchOwners;
use crate::session::ConfigSession;
use crate::sink::InputSink;
use crate::surface::{Compositor, WindowId};

/// Virtual controls layered over a host window.
///
/// All calls must come from one logical thread; the overlay is driven once
/// per input event and once per frame.
pub struct Overlay<C: Compositor, S: InputSink> {
    config: OverlayConfig,
    compositor: C,
    sink: S,
    controls: Vec<Control>,
    owners: TouchOwners,
    session: Option<ConfigSession>,
    user_layout: Option<PathBuf>,
}

impl<C: Compositor, S: InputSink> Overlay<C, S> {
    pub fn new(config: OverlayConfig, compositor: C, sink: S) -> Self {
        debug!(
            "Overlay initialized (max {} controls)",
            config.max_controls
        );
        Self {
            config,
            compositor,
            sink,
            controls: Vec::new(),
            owners: TouchOwners::new(),
            session: None,
            user_layout: None,
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.compositor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Controls in creation order.
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn owners(&self) -> &TouchOwners {
        &self.owners
    }

    pub fn session(&self) -> Option<&ConfigSession> {
        self.session.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.session.is_some()
    }

    /// Path layouts are saved to by default.
    pub fn user_layout_path(&self) -> Option<&Path> {
        self.user_layout.as_deref()
    }

    // -- Controls ---------------------------------------------

    /// Append a control; returns its index.
    pub fn create_control(
        &mut self,
        id: i32,
        kind: ControlKind,
        rect: Rect,
    ) -> Result<usize, OverlayError> {
        if self.controls.len() >= self.config.max_controls {
            return Err(OverlayError::CapacityExceeded {
                max: self.config.max_controls,
            });
        }
        let index = self.controls.len();
        self.controls.push(Control::new(id, kind, rect, index));
        debug!(
            "Created {} control {id} at {:?}",
            kind.control_type(),
            rect
        );
        Ok(index)
    }

    /// First control (creation order) whose rectangle contains `(x, y)`.
    pub fn control_at(&self, x: i32, y: i32) -> Option<&Control> {
        control_at(&self.controls, x, y).map(|i| &self.controls[i])
    }

    /// Destroy every control and its label.
    pub fn clear_controls(&mut self) {
        if let Some(session) = self.session.take() {
            session.close(&mut self.compositor, &self.controls);
        }
        for mut control in self.controls.drain(..) {
            if let Some(label) = control.take_label() {
                label.destroy(&mut self.compositor);
            }
        }
        self.owners.clear();
    }

    // -- Touch routing ----------------------------------------

    /// Route one touch report to the control owning it, or to the first
    /// control willing to claim it.  Returns whether any control handled it.
    pub fn dispatch_touch(&mut self, event: &TouchEvent) -> bool {
        let thresholds = self.config.thresholds;
        let touch_id = event.touch_id;
        let previous = self.owners.owner(touch_id);

        if let Some(index) = previous {
            if self.controls[index].handle_touch(event, &thresholds, &mut self.sink) {
                return true;
            }
            self.owners.release(touch_id);
            if !event.is_release() {
                self.owners.abandon(touch_id, index);
            }
        }

        let mut handled = false;
        for (index, control) in self.controls.iter_mut().enumerate() {
            if previous == Some(index) || self.owners.has_abandoned(touch_id, index) {
                continue;
            }
            if control.handle_touch(event, &thresholds, &mut self.sink) {
                self.owners.claim(touch_id, index);
                handled = true;
                break;
            }
        }

        if event.is_release() {
            self.owners.finish(touch_id);
        }
        handled
    }

    /// Drop every owned touch, emitting the controls' "up" events.
    fn cancel_touches(&mut self) {
        for control in &mut self.controls {
            control.cancel(&mut self.sink);
        }
        self.owners.clear();
    }

    // -- Drawing ----------------------------------------------

    /// Show every control label on top of `host`.
    pub fn draw(&mut self, host: WindowId) -> Result<(), OverlayError> {
        for control in &mut self.controls {
            control.draw_label(&mut self.compositor, host)?;
        }
        Ok(())
    }

    // -- Events -----------------------------------------------

    /// Route a host event.  `host` is the window the overlay sits on.
    pub fn handle_event(
        &mut self,
        host: WindowId,
        event: &OverlayEvent,
    ) -> Result<Dispatch, OverlayError> {
        if self.is_editing() {
            return match event {
                OverlayEvent::Touch(touch) => self.feed_session(Some(touch)),
                OverlayEvent::Idle => self.feed_session(None),
                OverlayEvent::SwipeDown => {
                    self.exit_editing(true)?;
                    Ok(Dispatch::Handled)
                }
                OverlayEvent::Exit => {
                    self.exit_editing(true)?;
                    Ok(Dispatch::Unhandled)
                }
                OverlayEvent::Close => {
                    self.exit_editing(false)?;
                    Ok(Dispatch::Unhandled)
                }
            };
        }

        match event {
            OverlayEvent::Touch(touch) => Ok(Dispatch::from_handled(self.dispatch_touch(touch))),
            OverlayEvent::SwipeDown => {
                self.enter_editing(host)?;
                Ok(Dispatch::Handled)
            }
            OverlayEvent::Idle => Ok(Dispatch::Handled),
            OverlayEvent::Exit | OverlayEvent::Close => Ok(Dispatch::Unhandled),
        }
    }

    fn feed_session(&mut self, touch: Option<&TouchEvent>) -> Result<Dispatch, OverlayError> {
        match &mut self.session {
            Some(session) => session.handle(touch, &mut self.controls, &mut self.compositor),
            None => Ok(Dispatch::Unhandled),
        }
    }

    /// Start layout editing over `host`.  Does nothing if already editing.
    pub fn enter_editing(&mut self, host: WindowId) -> Result<(), OverlayError> {
        if self.session.is_some() {
            return Ok(());
        }
        self.cancel_touches();
        match ConfigSession::open(&mut self.compositor, host, &self.controls) {
            Ok(session) => {
                info!("Entered layout editing");
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                error!("Could not start layout editing: {e}");
                Err(e)
            }
        }
    }

    /// Stop layout editing, optionally saving the layout to the user path.
    pub fn exit_editing(&mut self, save: bool) -> Result<(), OverlayError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        session.close(&mut self.compositor, &self.controls);
        info!("Left layout editing");
        if save {
            let path = self.user_layout.clone();
            self.save_controls(path.as_deref())?;
        }
        Ok(())
    }

    // -- Persistence ------------------------------------------

    /// Replace all controls with those of the user layout, or of the
    /// default layout if the user one is missing or invalid.
    ///
    /// `user` becomes the default save target even if it does not exist yet.
    /// Returns the number of controls created.  On failure no controls remain.
    pub fn load_controls(
        &mut self,
        default: Option<&Path>,
        user: Option<&Path>,
    ) -> Result<usize, OverlayError> {
        self.clear_controls();
        self.user_layout = user.map(Path::to_path_buf);

        let (definitions, source) = resolve_layout(default, user)?;
        for definition in definitions {
            if let Err(e) = self.apply_definition(definition) {
                if matches!(e, OverlayError::CapacityExceeded { .. }) {
                    warn!("{e}; ignoring remaining entry");
                    continue;
                }
                error!("Failed to build layout from {}: {e}", source.display());
                self.clear_controls();
                return Err(e);
            }
        }
        Ok(self.controls.len())
    }

    fn apply_definition(&mut self, definition: ControlDefinition) -> Result<(), OverlayError> {
        let index = self.create_control(definition.id, definition.kind, definition.rect)?;
        if let Some(spec) = definition.label {
            let label = Label::create(&mut self.compositor, spec)?;
            self.controls[index].set_label(label);
        }
        Ok(())
    }

    /// Write the current layout to `path`, or to the user layout path.
    /// Having no path at all is not an error.
    pub fn save_controls(&self, path: Option<&Path>) -> Result<(), OverlayError> {
        match path.or(self.user_layout.as_deref()) {
            Some(path) => write_layout(path, &self.controls),
            None => {
                debug!("No layout path to save to");
                Ok(())
            }
        }
    }

    /// Tear everything down.  Equivalent to dropping the overlay.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl<C: Compositor, S: InputSink> Drop for Overlay<C, S> {
    fn drop(&mut self) {
        self.clear_controls();
    }
}
