use crate::manipulate::image::CropRect;
use crate::manipulate::Direction;
use crate::models::{Alignment, BlockId, Positioning, Region, SectionKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Everything the toolbars and the surface can ask the session to do.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// Markup typed into a sub-region of a block.
    EditRegion {
        block: BlockId,
        region: Region,
        html: String,
    },
    FocusRegion {
        block: BlockId,
        region: Region,
    },
    BlurRegion {
        block: BlockId,
        region: Region,
    },
    /// New empty paragraph after `after` (or at the end).
    InsertParagraph {
        after: Option<BlockId>,
    },
    RemoveEmptyParagraph {
        block: BlockId,
    },

    InsertImage {
        data_url: String,
    },
    InsertVideoUrl,
    InsertVideoFile {
        object_url: String,
        name: String,
    },
    InsertTable,
    InsertSection {
        kind: SectionKind,
    },
    AddGalleryImages {
        block: BlockId,
        data_urls: Vec<String>,
    },
    MoveGalleryItem {
        block: BlockId,
        from: usize,
        to: usize,
    },
    RemoveGalleryItem {
        block: BlockId,
        index: usize,
    },
    DropColumnImage {
        block: BlockId,
        data_url: String,
    },

    SetPositioning {
        block: BlockId,
        mode: Positioning,
        at: (i32, i32),
    },
    MoveImage {
        block: BlockId,
        offset: (i32, i32),
        container: (u32, u32),
    },
    ResizeImage {
        block: BlockId,
        width: u32,
        height: u32,
    },
    RotateImage {
        block: BlockId,
        degrees: f64,
    },
    FlipImage {
        block: BlockId,
        axis: FlipAxis,
    },
    /// `displayed` is the measured on-screen size; `None` falls back to the model's size.
    StartCrop {
        block: BlockId,
        displayed: Option<(u32, u32)>,
    },
    UpdateCrop {
        rect: CropRect,
    },
    CancelCrop,
    ApplyCrop {
        block: BlockId,
    },
    ResetImage {
        block: BlockId,
    },
    DeleteImage {
        block: BlockId,
    },

    InsertRow {
        block: BlockId,
    },
    DeleteRow {
        block: BlockId,
    },
    InsertColumn {
        block: BlockId,
    },
    DeleteColumn {
        block: BlockId,
    },
    CellBackground {
        color: Option<String>,
    },

    MoveSection {
        block: BlockId,
        direction: Direction,
    },
    SectionWidth {
        block: BlockId,
        pct: Option<u8>,
    },
    SectionAlignment {
        block: BlockId,
        alignment: Option<Alignment>,
    },
    SectionBackground {
        block: BlockId,
        color: Option<String>,
    },
    DeleteSection {
        block: BlockId,
    },

    VideoWidth {
        block: BlockId,
        pct: Option<u8>,
    },
    VideoAlignment {
        block: BlockId,
        alignment: Alignment,
    },
    DeleteVideo {
        block: BlockId,
    },

    ClearAll,
    Import {
        html: String,
    },
}

impl Operation {
    /// Consecutive operations with the same key share one undo step.
    pub(crate) fn coalesce_key(&self) -> Option<(BlockId, Region)> {
        match self {
            Operation::EditRegion { block, region, .. }
            | Operation::FocusRegion { block, region } => Some((*block, *region)),
            _ => None,
        }
    }
}
