//! Where the next inserted block lands.
//!
//! File pickers and prompt dialogs clear the live text selection, so the last
//! caret position and pointer location are remembered here and resolved to a
//! block-level insertion point when an insertion finally happens.

use crate::models::{BlockId, Document};

/// A caret captured inside the surface, already mapped to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaretPosition {
    pub block: BlockId,
    /// Character offset inside the block. Informational: insertions are block-level.
    pub offset: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionPoint {
    Before(BlockId),
    After(BlockId),
    End,
}

impl InsertionPoint {
    /// Index in `doc.blocks` where a new block goes. Vanished anchors fall back to the end.
    pub fn index_in(&self, doc: &Document) -> usize {
        match *self {
            InsertionPoint::Before(id) => doc.index_of(id).unwrap_or(doc.len()),
            InsertionPoint::After(id) => doc.index_of(id).map(|i| i + 1).unwrap_or(doc.len()),
            InsertionPoint::End => doc.len(),
        }
    }
}

/// Vertical extent of a top-level block, in viewport coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockRect {
    pub id: BlockId,
    pub top: f64,
    pub bottom: f64,
}

impl BlockRect {
    fn mid(&self) -> f64 {
        self.top + (self.bottom - self.top) / 2.0
    }

    fn distance(&self, y: f64) -> f64 {
        if y < self.top {
            self.top - y
        } else if y > self.bottom {
            y - self.bottom
        } else {
            0.0
        }
    }
}

/// Bounding box of the editable surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl SurfaceRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// Current geometry of the surface, read by the caller at event time.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceLayout {
    pub surface: SurfaceRect,
    pub blocks: Vec<BlockRect>,
}

/// Snap a pointer position to "before"/"after" the top-level block under it.
///
/// Returns `None` when the pointer is outside the surface.
pub fn snap_pointer(x: f64, y: f64, layout: &SurfaceLayout) -> Option<InsertionPoint> {
    if !layout.surface.contains(x, y) {
        return None;
    }

    let hit = layout
        .blocks
        .iter()
        .find(|b| b.distance(y) == 0.0)
        .or_else(|| {
            // Pointer in a gap between blocks: use the closest one.
            layout.blocks.iter().min_by(|a, b| {
                a.distance(y)
                    .partial_cmp(&b.distance(y))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });

    Some(match hit {
        Some(b) if y > b.mid() => InsertionPoint::After(b.id),
        Some(b) => InsertionPoint::Before(b.id),
        None => InsertionPoint::End,
    })
}

#[derive(Clone, Debug, Default)]
pub struct SelectionTracker {
    range: Option<CaretPosition>,
    snapped: Option<InsertionPoint>,
    last_pointer: Option<(f64, f64)>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a caret captured on pointer-up / key-up / click.
    ///
    /// `None` means the browser selection resolved outside the surface; the
    /// previously captured range is kept.
    pub fn capture_range(&mut self, range: Option<CaretPosition>) -> bool {
        match range {
            Some(r) => {
                self.range = Some(r);
                true
            }
            None => false,
        }
    }

    pub fn track_pointer(&mut self, x: f64, y: f64, layout: &SurfaceLayout) {
        match snap_pointer(x, y, layout) {
            Some(point) => {
                self.snapped = Some(point);
                self.last_pointer = Some((x, y));
            }
            None => self.snapped = None,
        }
    }

    pub fn last_range(&self) -> Option<CaretPosition> {
        self.range
    }

    pub fn last_pointer(&self) -> Option<(f64, f64)> {
        self.last_pointer
    }

    /// Best insertion point without consuming anything.
    ///
    /// Order: snapped pointer point, last caret inside the editor, last pointer
    /// coordinates re-resolved against `layout`, end of content.
    pub fn resolve(&self, doc: &Document, layout: Option<&SurfaceLayout>) -> InsertionPoint {
        let alive = |p: &InsertionPoint| match p {
            InsertionPoint::Before(id) | InsertionPoint::After(id) => doc.index_of(*id).is_some(),
            InsertionPoint::End => true,
        };

        if let Some(p) = self.snapped.filter(alive) {
            return p;
        }
        if let Some(r) = self.range {
            if doc.index_of(r.block).is_some() {
                return InsertionPoint::After(r.block);
            }
        }
        if let (Some((x, y)), Some(layout)) = (self.last_pointer, layout) {
            if let Some(p) = snap_pointer(x, y, layout).filter(alive) {
                return p;
            }
        }
        InsertionPoint::End
    }

    /// Resolve and forget the stored caret and snapped point.
    pub fn take(&mut self, doc: &Document, layout: Option<&SurfaceLayout>) -> InsertionPoint {
        let point = self.resolve(doc, layout);
        self.range = None;
        self.snapped = None;
        point
    }
}
