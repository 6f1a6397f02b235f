//! Compositor seam: the windowing operations the overlay consumes.
//!
//! The overlay never talks to a native windowing system directly.  It asks a
//! [`Compositor`] for child windows, positions and stacks them, and posts
//! whole RGBA buffers into them.  [`HeadlessCompositor`] is a complete
//! in-memory implementation that keeps every window's properties and last
//! posted frame, for hosts without a native compositor and for tests.

use std::collections::HashMap;
use std::fmt;

use image::RgbaImage;
use log::trace;

use crate::config::OverlayError;

/// Opaque handle of a compositor window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Placement of a window as seen by the compositor.
///
/// `size` is the on-screen size, `buffer_size` the size of the pixel buffer
/// the window's content is rendered into; they differ when the compositor
/// scales the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub position: (i32, i32),
    pub size: (i32, i32),
    pub buffer_size: (i32, i32),
}

/// Window operations the overlay relies on.
pub trait Compositor {
    /// Create a child window with an RGBA buffer of `width × height`.
    fn create_window(&mut self, width: i32, height: i32, alpha: u8)
    -> Result<WindowId, OverlayError>;

    fn destroy_window(&mut self, window: WindowId) -> Result<(), OverlayError>;

    fn geometry(&self, window: WindowId) -> Result<WindowGeometry, OverlayError>;

    /// Change the on-screen size; the buffer keeps its size.
    fn set_size(&mut self, window: WindowId, width: i32, height: i32) -> Result<(), OverlayError>;

    fn set_position(&mut self, window: WindowId, x: i32, y: i32) -> Result<(), OverlayError>;

    fn set_z_order(&mut self, window: WindowId, z: i32) -> Result<(), OverlayError>;

    /// Whether the window receives touches or lets them fall through.
    fn set_touch_sensitive(&mut self, window: WindowId, sensitive: bool)
    -> Result<(), OverlayError>;

    fn set_visible(&mut self, window: WindowId, visible: bool) -> Result<(), OverlayError>;

    /// Join the window group of `parent` so the window stacks with it.
    fn join_group(&mut self, window: WindowId, parent: WindowId) -> Result<(), OverlayError>;

    fn leave_group(&mut self, window: WindowId) -> Result<(), OverlayError>;

    /// Present `pixels` as the window's content.
    fn post(&mut self, window: WindowId, pixels: &RgbaImage) -> Result<(), OverlayError>;
}

// -- Headless compositor --------------------------------------

/// State of one window kept by [`HeadlessCompositor`].
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    pub geometry: WindowGeometry,
    pub alpha: u8,
    pub z_order: i32,
    pub touch_sensitive: bool,
    pub visible: bool,
    pub group: Option<WindowId>,
    pub frame: Option<RgbaImage>,
    pub posts: usize,
}

/// In-memory compositor.
#[derive(Debug, Default)]
pub struct HeadlessCompositor {
    windows: HashMap<WindowId, HeadlessWindow>,
    next_id: u32,
}

impl HeadlessCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a top-level host window whose buffer is `buffer_size` and
    /// which is displayed at `position` with on-screen `size`.
    pub fn create_host_window(
        &mut self,
        position: (i32, i32),
        size: (i32, i32),
        buffer_size: (i32, i32),
    ) -> WindowId {
        let id = self.allocate_id();
        self.windows.insert(
            id,
            HeadlessWindow {
                geometry: WindowGeometry {
                    position,
                    size,
                    buffer_size,
                },
                alpha: 0xFF,
                z_order: 0,
                touch_sensitive: true,
                visible: true,
                group: None,
                frame: None,
                posts: 0,
            },
        );
        id
    }

    pub fn window(&self, id: WindowId) -> Option<&HeadlessWindow> {
        self.windows.get(&id)
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Ids of all live windows, in creation order.
    pub fn window_ids(&self) -> Vec<WindowId> {
        let mut ids: Vec<WindowId> = self.windows.keys().copied().collect();
        ids.sort();
        ids
    }

    fn allocate_id(&mut self) -> WindowId {
        self.next_id += 1;
        WindowId(self.next_id)
    }

    fn window_mut(&mut self, id: WindowId) -> Result<&mut HeadlessWindow, OverlayError> {
        self.windows
            .get_mut(&id)
            .ok_or_else(|| OverlayError::Surface(format!("unknown {id}")))
    }
}

impl Compositor for HeadlessCompositor {
    fn create_window(
        &mut self,
        width: i32,
        height: i32,
        alpha: u8,
    ) -> Result<WindowId, OverlayError> {
        if width <= 0 || height <= 0 {
            return Err(OverlayError::Surface(format!(
                "invalid window size {width}x{height}"
            )));
        }
        let id = self.allocate_id();
        self.windows.insert(
            id,
            HeadlessWindow {
                geometry: WindowGeometry {
                    position: (0, 0),
                    size: (width, height),
                    buffer_size: (width, height),
                },
                alpha,
                z_order: 0,
                touch_sensitive: true,
                visible: false,
                group: None,
                frame: None,
                posts: 0,
            },
        );
        trace!("created {id} ({width}x{height}, alpha {alpha})");
        Ok(id)
    }

    fn destroy_window(&mut self, window: WindowId) -> Result<(), OverlayError> {
        self.windows
            .remove(&window)
            .map(|_| trace!("destroyed {window}"))
            .ok_or_else(|| OverlayError::Surface(format!("unknown {window}")))
    }

    fn geometry(&self, window: WindowId) -> Result<WindowGeometry, OverlayError> {
        self.windows
            .get(&window)
            .map(|w| w.geometry)
            .ok_or_else(|| OverlayError::Surface(format!("unknown {window}")))
    }

    fn set_size(&mut self, window: WindowId, width: i32, height: i32) -> Result<(), OverlayError> {
        self.window_mut(window)?.geometry.size = (width, height);
        Ok(())
    }

    fn set_position(&mut self, window: WindowId, x: i32, y: i32) -> Result<(), OverlayError> {
        self.window_mut(window)?.geometry.position = (x, y);
        Ok(())
    }

    fn set_z_order(&mut self, window: WindowId, z: i32) -> Result<(), OverlayError> {
        self.window_mut(window)?.z_order = z;
        Ok(())
    }

    fn set_touch_sensitive(
        &mut self,
        window: WindowId,
        sensitive: bool,
    ) -> Result<(), OverlayError> {
        self.window_mut(window)?.touch_sensitive = sensitive;
        Ok(())
    }

    fn set_visible(&mut self, window: WindowId, visible: bool) -> Result<(), OverlayError> {
        self.window_mut(window)?.visible = visible;
        Ok(())
    }

    fn join_group(&mut self, window: WindowId, parent: WindowId) -> Result<(), OverlayError> {
        if !self.windows.contains_key(&parent) {
            return Err(OverlayError::Surface(format!("unknown parent {parent}")));
        }
        self.window_mut(window)?.group = Some(parent);
        Ok(())
    }

    fn leave_group(&mut self, window: WindowId) -> Result<(), OverlayError> {
        self.window_mut(window)?.group = None;
        Ok(())
    }

    fn post(&mut self, window: WindowId, pixels: &RgbaImage) -> Result<(), OverlayError> {
        let target = self.window_mut(window)?;
        let (bw, bh) = target.geometry.buffer_size;
        if pixels.width() as i32 != bw || pixels.height() as i32 != bh {
            return Err(OverlayError::Surface(format!(
                "posted {}x{} buffer into {window} of {bw}x{bh}",
                pixels.width(),
                pixels.height()
            )));
        }
        target.frame = Some(pixels.clone());
        target.posts += 1;
        Ok(())
    }
}
