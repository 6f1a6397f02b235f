//! Layout files: JSON description of the controls and their labels.
//!
//! ```json
//! {
//!   "version": 1,
//!   "controls": [
//!     { "type": "key", "id": 1, "x": 10, "y": 400, "width": 80, "height": 80,
//!       "symbol": 32, "modifier": 0, "scancode": 57, "unicode": 32,
//!       "label": { "x": 0, "y": 0, "width": 80, "height": 80,
//!                  "alpha": 128, "image": "space.png" } }
//!   ]
//! }
//! ```
//!
//! A whole document is validated before anything is applied, so a bad file
//! never leaves a half-built overlay behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::OverlayError;
use crate::control::{Control, ControlKind, ControlType};
use crate::geometry::Rect;
use crate::label::LabelSpec;
use crate::sink::{KeyBinding, MouseBinding};

/// The only layout file version understood.
pub const LAYOUT_VERSION: i64 = 1;

/// Root of a layout file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    #[serde(default)]
    pub version: i64,
    pub controls: Vec<ControlDoc>,
}

/// One control entry.  Numeric fields missing from the file read as 0.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlDoc {
    #[serde(rename = "type")]
    pub control_type: String,
    pub id: i32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scancode: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unicode: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tap_sensitive: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelDoc>,
}

/// Label block of a control entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelDoc {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub alpha: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A validated control entry, ready to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlDefinition {
    pub id: i32,
    pub kind: ControlKind,
    pub rect: Rect,
    pub label: Option<LabelSpec>,
}

impl ControlDoc {
    pub fn to_definition(&self) -> Result<ControlDefinition, String> {
        let control_type = ControlType::from_str(&self.control_type)
            .map_err(|_| format!("unknown control type '{}'", self.control_type))?;

        let get = |field: Option<i32>| field.unwrap_or(0);
        let kind = match control_type {
            ControlType::Key => ControlKind::Key(KeyBinding {
                symbol: get(self.symbol),
                modifier: get(self.modifier),
                scancode: get(self.scancode),
                unicode: get(self.unicode),
            }),
            ControlType::DPad => ControlKind::DPad,
            ControlType::TouchArea => ControlKind::TouchArea {
                tap_sensitive: self.tap_sensitive.is_none_or(|flag| flag != 0),
            },
            ControlType::MouseButton => ControlKind::MouseButton(MouseBinding {
                button: get(self.button),
                mask: get(self.mask),
            }),
            ControlType::TouchScreen => ControlKind::TouchScreen,
        };

        let label = match &self.label {
            Some(doc) if doc.width <= 0 || doc.height <= 0 => {
                return Err(format!(
                    "label of control {} has invalid size {}x{}",
                    self.id, doc.width, doc.height
                ));
            }
            doc => doc.as_ref().map(LabelDoc::to_spec),
        };

        Ok(ControlDefinition {
            id: self.id,
            kind,
            rect: Rect::new(self.x, self.y, self.width, self.height),
            label,
        })
    }

    pub fn from_control(control: &Control) -> Self {
        let rect = control.rect();
        let mut doc = ControlDoc {
            control_type: control.control_type().to_string(),
            id: control.id(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            label: control.label().map(|l| LabelDoc::from_spec(l.spec())),
            ..Default::default()
        };
        match *control.kind() {
            ControlKind::Key(key) => {
                doc.symbol = Some(key.symbol);
                doc.modifier = Some(key.modifier);
                doc.scancode = Some(key.scancode);
                doc.unicode = Some(key.unicode);
            }
            ControlKind::MouseButton(button) => {
                doc.button = Some(button.button);
                doc.mask = Some(button.mask);
            }
            ControlKind::TouchArea { tap_sensitive } => {
                doc.tap_sensitive = Some(i32::from(tap_sensitive));
            }
            ControlKind::DPad | ControlKind::TouchScreen => {}
        }
        doc
    }
}

impl LabelDoc {
    pub fn to_spec(&self) -> LabelSpec {
        LabelSpec {
            rect: Rect::new(self.x, self.y, self.width, self.height),
            alpha: self.alpha.clamp(0, 255) as u8,
            image: self
                .image
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn from_spec(spec: &LabelSpec) -> Self {
        LabelDoc {
            x: spec.rect.x,
            y: spec.rect.y,
            width: spec.rect.width,
            height: spec.rect.height,
            alpha: i32::from(spec.alpha),
            image: spec.image.as_ref().map(|p| p.display().to_string()),
        }
    }
}

/// Parse and validate the layout at `path`.
pub fn read_layout(path: &Path) -> Result<Vec<ControlDefinition>, OverlayError> {
    let text = fs::read_to_string(path).map_err(|e| OverlayError::LayoutRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_layout(&text).map_err(|e| match e {
        OverlayError::LayoutParse { message, .. } => OverlayError::LayoutParse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Parse and validate layout text.  Parse errors carry an empty path.
pub fn parse_layout(text: &str) -> Result<Vec<ControlDefinition>, OverlayError> {
    let parse_error = |message: String| OverlayError::LayoutParse {
        path: PathBuf::new(),
        message,
    };

    let doc: LayoutDocument = serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?;
    if doc.version != LAYOUT_VERSION {
        return Err(OverlayError::VersionMismatch {
            found: doc.version,
            expected: LAYOUT_VERSION,
        });
    }

    doc.controls
        .iter()
        .map(|c| c.to_definition().map_err(parse_error))
        .collect()
}

/// Load the user layout if it is readable and valid, otherwise the default one.
///
/// Returns the definitions and the path they came from.
pub fn resolve_layout(
    default: Option<&Path>,
    user: Option<&Path>,
) -> Result<(Vec<ControlDefinition>, PathBuf), OverlayError> {
    let mut last_error = OverlayError::NoLayout;
    for path in [user, default].into_iter().flatten() {
        match read_layout(path) {
            Ok(definitions) => {
                info!(
                    "Loaded {} control(s) from {}",
                    definitions.len(),
                    path.display()
                );
                return Ok((definitions, path.to_path_buf()));
            }
            Err(e) => {
                debug!("Skipping layout {}: {e}", path.display());
                last_error = e;
            }
        }
    }
    warn!("Failed to load any layout file: {last_error}");
    Err(last_error)
}

/// Build the document describing `controls` in their current state.
pub fn document_for(controls: &[Control]) -> LayoutDocument {
    LayoutDocument {
        version: LAYOUT_VERSION,
        controls: controls.iter().map(ControlDoc::from_control).collect(),
    }
}

/// Rewrite `path` with the current state of `controls`.
pub fn write_layout(path: &Path, controls: &[Control]) -> Result<(), OverlayError> {
    let write_error = |source: std::io::Error| OverlayError::LayoutWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let json = serde_json::to_string_pretty(&document_for(controls))
        .map_err(|e| write_error(std::io::Error::other(e)))?;
    fs::write(path, json).map_err(write_error)?;
    info!("Saved {} control(s) to {}", controls.len(), path.display());
    Ok(())
}
