//! Layout editing: drag controls around on a checkerboard backdrop.
//!
//! Only touch id 0 drives the session.  Touching a control selects it,
//! moving drags it (clamped to the surface) and releasing drops it.
use image::{Rgba, RgbaImage};
use log::{debug, warn};

use crate::config::OverlayError;
use crate::control::{Control, control_at};
use crate::event::{Dispatch, TouchEvent, TouchPhase};
use crate::geometry::Rect;
use crate::surface::{Compositor, WindowId};

/// Stacking order of the backdrop, above every label.
pub const CONFIG_Z_ORDER: i32 = 10;

const CELL_SIZE: u32 = 16;
const BACKDROP_ALPHA: u8 = 0x90;
const CELL_LIGHT: u8 = 0xA0;
const CELL_DARK: u8 = 0x80;

/// Whether a control is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Dragging { control: usize },
}

/// An active layout-editing session.
#[derive(Debug)]
pub struct ConfigSession {
    window: WindowId,
    surface: (i32, i32),
    selected: Option<usize>,
    start: (i32, i32),
    current: (i32, i32),
}

impl ConfigSession {
    /// Open the backdrop over `parent` and show every label at full alpha.
    pub fn open<C: Compositor + ?Sized>(
        compositor: &mut C,
        parent: WindowId,
        controls: &[Control],
    ) -> Result<Self, OverlayError> {
        let surface = compositor.geometry(parent)?.buffer_size;
        let window = compositor.create_window(surface.0, surface.1, u8::MAX)?;
        let session = Self {
            window,
            surface,
            selected: None,
            start: (0, 0),
            current: (0, 0),
        };

        let setup = compositor
            .join_group(window, parent)
            .and_then(|()| compositor.set_z_order(window, CONFIG_Z_ORDER))
            .and_then(|()| compositor.set_touch_sensitive(window, true))
            .and_then(|()| compositor.set_visible(window, true))
            .and_then(|()| session.draw_backdrop(compositor, controls))
            .and_then(|()| render_labels(compositor, controls, Some(u8::MAX)));
        if let Err(e) = setup {
            let _ = compositor.destroy_window(window);
            return Err(e);
        }

        debug!(
            "Layout editing started ({}x{} surface)",
            surface.0, surface.1
        );
        Ok(session)
    }

    /// Tear down the backdrop and restore the labels' configured alpha.
    pub fn close<C: Compositor + ?Sized>(self, compositor: &mut C, controls: &[Control]) {
        if let Err(e) = render_labels(compositor, controls, None) {
            warn!("Could not restore labels: {e}");
        }
        let _ = compositor.leave_group(self.window);
        if let Err(e) = compositor.destroy_window(self.window) {
            warn!("Could not destroy configuration window: {e}");
        }
        debug!("Layout editing finished");
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Size of the surface controls are clamped to.
    pub fn surface_size(&self) -> (i32, i32) {
        self.surface
    }

    pub fn state(&self) -> SessionState {
        match self.selected {
            Some(control) => SessionState::Dragging { control },
            None => SessionState::Idle,
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Feed one touch report, or `None` to flush pending motion.
    ///
    /// Reports for touch ids other than 0 are swallowed.
    pub fn handle<C: Compositor + ?Sized>(
        &mut self,
        event: Option<&TouchEvent>,
        controls: &mut [Control],
        compositor: &mut C,
    ) -> Result<Dispatch, OverlayError> {
        let mut released = false;

        if let Some(event) = event.filter(|e| e.touch_id == 0) {
            let position = (event.x, event.y);
            match event.phase {
                TouchPhase::Touch if self.selected.is_none() => {
                    self.selected = control_at(controls, event.x, event.y);
                    let anchor = if self.selected.is_some() {
                        position
                    } else {
                        (0, 0)
                    };
                    self.start = anchor;
                    self.current = anchor;
                }
                TouchPhase::Move if self.selected.is_some() => self.current = position,
                TouchPhase::Release if self.selected.is_some() => {
                    self.current = position;
                    released = true;
                }
                _ => {}
            }
        }

        if let Some(index) = self.selected {
            let dx = self.current.0 - self.start.0;
            let dy = self.current.1 - self.start.1;
            if dx.abs().max(dy.abs()) > 0 {
                self.start = self.current;
                if let Some(control) = controls.get_mut(index) {
                    control.move_by(dx, dy, self.surface.0, self.surface.1, compositor)?;
                }
                self.draw_backdrop(compositor, controls)?;
            }
        }

        if released {
            self.selected = None;
            self.start = (0, 0);
            self.current = (0, 0);
        }

        Ok(Dispatch::Handled)
    }

    fn draw_backdrop<C: Compositor + ?Sized>(
        &self,
        compositor: &mut C,
        controls: &[Control],
    ) -> Result<(), OverlayError> {
        let frame = backdrop(self.surface, controls);
        compositor.post(self.window, &frame)
    }
}

/// Checkerboard with every undecorated control filled in its colour.
pub fn backdrop(surface: (i32, i32), controls: &[Control]) -> RgbaImage {
    let (width, height) = (surface.0.max(1) as u32, surface.1.max(1) as u32);
    let mut frame = RgbaImage::from_fn(width, height, |x, y| {
        let c = if (x & CELL_SIZE) ^ (y & CELL_SIZE) != 0 {
            CELL_LIGHT
        } else {
            CELL_DARK
        };
        Rgba([c, c, c, BACKDROP_ALPHA])
    });

    for control in controls.iter().filter(|c| c.label().is_none()) {
        fill_rect(&mut frame, control.rect(), control.color());
    }
    frame
}

/// Fill `rect` (clipped to the frame) with a solid colour.
pub fn fill_rect(frame: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let clip = |pos: i32, max: u32| pos.clamp(0, max as i32) as u32;
    let (x0, x1) = (
        clip(rect.x, frame.width()),
        clip(rect.x.saturating_add(rect.width), frame.width()),
    );
    let (y0, y1) = (
        clip(rect.y, frame.height()),
        clip(rect.y.saturating_add(rect.height), frame.height()),
    );
    for y in y0..y1 {
        for x in x0..x1 {
            frame.put_pixel(x, y, color);
        }
    }
}

fn render_labels<C: Compositor + ?Sized>(
    compositor: &mut C,
    controls: &[Control],
    alpha: Option<u8>,
) -> Result<(), OverlayError> {
    controls
        .iter()
        .filter_map(Control::label)
        .try_for_each(|label| label.render(compositor, alpha))
}
