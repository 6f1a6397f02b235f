//! Decorative image windows attached to controls.
use std::path::{Path, PathBuf};

use image::RgbaImage;
use image::imageops::{self, FilterType};
use log::{debug, warn};

use crate::config::OverlayError;
use crate::geometry::Rect;
use crate::png::decode_label_image;
use crate::surface::{Compositor, WindowId};

/// Stacking order of label windows, below the configuration backdrop.
pub const LABEL_Z_ORDER: i32 = 6;

/// Persistent description of a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    /// Offset from the owning control's origin, plus the label's size.
    pub rect: Rect,
    pub alpha: u8,
    pub image: Option<PathBuf>,
}

/// A label window and the mapping from overlay to parent-window coordinates.
#[derive(Debug)]
pub struct Label {
    spec: LabelSpec,
    image: Option<RgbaImage>,
    window: WindowId,
    parent: Option<WindowId>,
    offset: (i32, i32),
    scale: (f32, f32),
}

impl Label {
    /// Create the label window, decode its image and render it once.
    ///
    /// A missing or undecodable image is not an error: the label stays blank.
    pub fn create<C: Compositor + ?Sized>(
        compositor: &mut C,
        spec: LabelSpec,
    ) -> Result<Self, OverlayError> {
        let window = compositor.create_window(spec.rect.width, spec.rect.height, spec.alpha)?;
        let setup = compositor
            .set_z_order(window, LABEL_Z_ORDER)
            .and_then(|()| compositor.set_touch_sensitive(window, false));
        if let Err(e) = setup {
            let _ = compositor.destroy_window(window);
            return Err(e);
        }

        let image = spec
            .image
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .and_then(|path| match decode_label_image(path) {
                Ok(img) => Some(img),
                Err(e) => {
                    warn!("{e}");
                    None
                }
            });

        let label = Self {
            spec,
            image,
            window,
            parent: None,
            offset: (0, 0),
            scale: (1.0, 1.0),
        };
        if let Err(e) = label.render(compositor, None) {
            warn!("Could not render label into {window}: {e}");
        }
        Ok(label)
    }

    pub fn spec(&self) -> &LabelSpec {
        &self.spec
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.spec.image.as_deref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Redraw the image with `alpha`, or the configured alpha if `None`.
    pub fn render<C: Compositor + ?Sized>(
        &self,
        compositor: &mut C,
        alpha: Option<u8>,
    ) -> Result<(), OverlayError> {
        let Some(image) = &self.image else {
            return Ok(());
        };
        let (width, height) = compositor.geometry(self.window)?.buffer_size;
        let (width, height) = (width.max(1) as u32, height.max(1) as u32);

        let mut frame = imageops::resize(image, width, height, FilterType::Lanczos3);
        apply_global_alpha(&mut frame, alpha.unwrap_or(self.spec.alpha));
        compositor.post(self.window, &frame)
    }

    /// Show the label for a control at `(x, y)` on top of `parent`.
    ///
    /// The first time a new parent is seen the label adopts its position and
    /// its on-screen/buffer scale, so overlay coordinates line up with the
    /// parent's content however the compositor scales it.
    pub fn show_at<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        parent: WindowId,
        x: i32,
        y: i32,
    ) -> Result<(), OverlayError> {
        if self.parent != Some(parent) {
            let geometry = compositor.geometry(parent)?;
            self.offset = geometry.position;
            self.scale = (
                geometry.size.0 as f32 / geometry.buffer_size.0.max(1) as f32,
                geometry.size.1 as f32 / geometry.buffer_size.1.max(1) as f32,
            );
            compositor.set_size(
                self.window,
                (self.spec.rect.width as f32 * self.scale.0) as i32,
                (self.spec.rect.height as f32 * self.scale.1) as i32,
            )?;
            compositor.join_group(self.window, parent)?;
            self.parent = Some(parent);
            debug!(
                "{} joined {parent} (offset {:?}, scale {:?})",
                self.window, self.offset, self.scale
            );
        }

        self.move_to(compositor, x, y)?;
        compositor.set_visible(self.window, true)
    }

    /// Reposition the label for a control whose origin is now `(x, y)`.
    pub fn move_to<C: Compositor + ?Sized>(
        &self,
        compositor: &mut C,
        x: i32,
        y: i32,
    ) -> Result<(), OverlayError> {
        let (sx, sy) = self.screen_position(x, y);
        compositor.set_position(self.window, sx, sy)
    }

    /// Parent-window position for a control origin of `(x, y)`.
    pub fn screen_position(&self, x: i32, y: i32) -> (i32, i32) {
        let lx = x.saturating_add(self.spec.rect.x);
        let ly = y.saturating_add(self.spec.rect.y);
        (
            (self.offset.0 as f32 + lx as f32 * self.scale.0) as i32,
            (self.offset.1 as f32 + ly as f32 * self.scale.1) as i32,
        )
    }

    pub fn destroy<C: Compositor + ?Sized>(self, compositor: &mut C) {
        if self.parent.is_some() {
            let _ = compositor.leave_group(self.window);
        }
        if let Err(e) = compositor.destroy_window(self.window) {
            warn!("Could not destroy label window: {e}");
        }
    }
}

/// Scale every pixel's alpha by `alpha / 255`.
fn apply_global_alpha(frame: &mut RgbaImage, alpha: u8) {
    if alpha == u8::MAX {
        return;
    }
    for pixel in frame.pixels_mut() {
        pixel.0[3] = (u16::from(pixel.0[3]) * u16::from(alpha) / 255) as u8;
    }
}
