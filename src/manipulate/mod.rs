//! Direct manipulation of images, tables, sections and videos.
//!
//! Everything here works on model values; the pointer plumbing that feeds the
//! deltas lives in the editor surface.

pub mod image;
pub mod section;
pub mod table;
pub mod video;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("crop area is empty")]
    EmptyCrop,
    #[error("image has no displayed size")]
    EmptyImage,
}

/// Structural edits the editor refuses to perform.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum RefusedEdit {
    #[error("a table keeps at least one row")]
    LastRow,
    #[error("a table keeps at least one column")]
    LastColumn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Clamp a percentage coming from a toolbar input. `None` means automatic.
pub(crate) fn clamp_pct(pct: Option<u8>) -> Option<u8> {
    pct.map(|p| p.clamp(10, 100))
}
