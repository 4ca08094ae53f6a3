use super::GeometryError;
use crate::models::{ImageNode, Positioning};
use strum::{Display, EnumString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ResizeHandle {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::N,
        ResizeHandle::NE,
        ResizeHandle::E,
        ResizeHandle::SE,
        ResizeHandle::S,
        ResizeHandle::SW,
        ResizeHandle::W,
        ResizeHandle::NW,
    ];

    /// Direction in which a positive pointer delta grows the image.
    fn signs(self) -> (f64, f64) {
        match self {
            ResizeHandle::N => (0.0, -1.0),
            ResizeHandle::NE => (1.0, -1.0),
            ResizeHandle::E => (1.0, 0.0),
            ResizeHandle::SE => (1.0, 1.0),
            ResizeHandle::S => (0.0, 1.0),
            ResizeHandle::SW => (-1.0, 1.0),
            ResizeHandle::W => (-1.0, 0.0),
            ResizeHandle::NW => (-1.0, -1.0),
        }
    }
}

/// Live resize from a handle. Sizes are computed from the gesture start so
/// rounding never accumulates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeGesture {
    pub handle: ResizeHandle,
    pub start_width: u32,
    pub start_height: u32,
    pub keep_ratio: bool,
    pub min: u32,
}

impl ResizeGesture {
    pub fn size_for(&self, dx: f64, dy: f64) -> (u32, u32) {
        let (sx, sy) = self.handle.signs();
        let w0 = self.start_width.max(1) as f64;
        let h0 = self.start_height.max(1) as f64;
        let min = self.min as f64;

        let mut w = w0 + sx * dx;
        let mut h = h0 + sy * dy;

        if self.keep_ratio {
            // Clamp the driving side first so the derived side never drops below the minimum.
            let ratio = w0 / h0;
            if sx != 0.0 {
                w = w.max(min).max(min * ratio);
                h = w / ratio;
            } else {
                h = h.max(min).max(min / ratio);
                w = h * ratio;
            }
        }

        (w.max(min).round() as u32, h.max(min).round() as u32)
    }
}

/// Switch positioning mode. Offsets only survive for `Absolute`, starting at `at`.
pub fn set_positioning(img: &mut ImageNode, mode: Positioning, at: (i32, i32)) {
    img.positioning = mode;
    (img.offset_x, img.offset_y) = match mode {
        Positioning::Absolute => at,
        _ => (0, 0),
    };
}

/// Offset of a dragged image, kept inside its container.
pub fn clamp_drag(offset: (i32, i32), size: (u32, u32), container: (u32, u32)) -> (i32, i32) {
    let max_x = (container.0 as i32 - size.0 as i32).max(0);
    let max_y = (container.1 as i32 - size.1 as i32).max(0);
    (offset.0.clamp(0, max_x), offset.1.clamp(0, max_y))
}

pub const ROTATION_SNAP_DEG: f64 = 15.0;

/// Angle of `point` around `center`, in degrees.
pub fn pointer_angle(center: (f64, f64), point: (f64, f64)) -> f64 {
    (point.1 - center.1).atan2(point.0 - center.0).to_degrees()
}

/// Fold any angle into `(-180, 180]`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let mut d = deg % 360.0;
    if d <= -180.0 {
        d += 360.0;
    } else if d > 180.0 {
        d -= 360.0;
    }
    d
}

pub fn snap_degrees(deg: f64, step: f64) -> f64 {
    (deg / step).round() * step
}

/// Rotation driven by the rotate handle around the image centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotateGesture {
    pub center: (f64, f64),
    start_angle: f64,
    base_deg: f64,
}

impl RotateGesture {
    pub fn start(center: (f64, f64), pointer: (f64, f64), base_deg: f64) -> Self {
        Self {
            center,
            start_angle: pointer_angle(center, pointer),
            base_deg,
        }
    }

    pub fn angle_for(&self, pointer: (f64, f64), snap: bool) -> f64 {
        let delta = pointer_angle(self.center, pointer) - self.start_angle;
        let deg = normalize_degrees(self.base_deg + delta);
        if snap {
            normalize_degrees(snap_degrees(deg, ROTATION_SNAP_DEG))
        } else {
            deg
        }
    }
}

/// Crop selection in displayed pixels, relative to the image's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Corner handle of the crop overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CropCorner {
    NW,
    NE,
    SW,
    SE,
}

/// Natural-pixel rectangle handed to the raster layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Initial overlay: centred, 80% of the displayed image.
    pub fn initial(displayed: (u32, u32)) -> Self {
        let (w, h) = (displayed.0 as f64, displayed.1 as f64);
        Self {
            x: (w * 0.1).round(),
            y: (h * 0.1).round(),
            width: (w * 0.8).round(),
            height: (h * 0.8).round(),
        }
    }

    /// Keep the rectangle inside `bounds`, shrinking it if needed.
    pub fn constrain(self, bounds: (u32, u32)) -> Self {
        let (bw, bh) = (bounds.0 as f64, bounds.1 as f64);
        let width = self.width.clamp(0.0, bw);
        let height = self.height.clamp(0.0, bh);
        Self {
            x: self.x.clamp(0.0, bw - width),
            y: self.y.clamp(0.0, bh - height),
            width,
            height,
        }
    }

    /// Move the whole rectangle.
    pub fn dragged(self, dx: f64, dy: f64, bounds: (u32, u32)) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
        .constrain(bounds)
    }

    /// Move one corner; the opposite corner stays put. Can collapse to zero area.
    pub fn corner_dragged(self, corner: CropCorner, dx: f64, dy: f64, bounds: (u32, u32)) -> Self {
        let c = self.constrain(bounds);
        let (bw, bh) = (bounds.0 as f64, bounds.1 as f64);
        let (mut left, mut top) = (c.x, c.y);
        let (mut right, mut bottom) = (c.x + c.width, c.y + c.height);

        match corner {
            CropCorner::NW => {
                left = (left + dx).clamp(0.0, right);
                top = (top + dy).clamp(0.0, bottom);
            }
            CropCorner::NE => {
                right = (right + dx).clamp(left, bw);
                top = (top + dy).clamp(0.0, bottom);
            }
            CropCorner::SW => {
                left = (left + dx).clamp(0.0, right);
                bottom = (bottom + dy).clamp(top, bh);
            }
            CropCorner::SE => {
                right = (right + dx).clamp(left, bw);
                bottom = (bottom + dy).clamp(top, bh);
            }
        }

        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Scale to natural pixels. A rectangle that rounds to zero area is rejected.
    pub fn to_natural(
        self,
        displayed: (u32, u32),
        natural: (u32, u32),
    ) -> Result<PixelRect, GeometryError> {
        if displayed.0 == 0 || displayed.1 == 0 {
            return Err(GeometryError::EmptyImage);
        }
        let sx = natural.0 as f64 / displayed.0 as f64;
        let sy = natural.1 as f64 / displayed.1 as f64;

        let x = (self.x * sx).round().max(0.0) as u32;
        let y = (self.y * sy).round().max(0.0) as u32;
        let width = ((self.width * sx).round().max(0.0) as u32).min(natural.0.saturating_sub(x));
        let height = ((self.height * sy).round().max(0.0) as u32).min(natural.1.saturating_sub(y));

        if width == 0 || height == 0 {
            return Err(GeometryError::EmptyCrop);
        }
        Ok(PixelRect {
            x,
            y,
            width,
            height,
        })
    }
}

/// Remember the source before the first pixel edit.
pub fn remember_original(img: &mut ImageNode) {
    if img.original_src.is_none() {
        img.original_src = Some(img.src.clone());
    }
}

/// Go back to the source captured at first edit. Returns false when never edited.
pub fn reset_to_original(img: &mut ImageNode, natural: (u32, u32)) -> bool {
    let Some(original) = img.original_src.take() else {
        return false;
    };
    img.src = original;
    img.natural_width = natural.0;
    img.natural_height = natural.1;
    img.width = None;
    img.height = None;
    img.rotation_deg = 0.0;
    true
}
