//! Which contextual toolbar a pointer event brings up.
//!
//! The surface resolves the event target to a block id (and an optional
//! sub-region) once per event; the kind of toolbar comes from the model node,
//! looked up in a single table.

use crate::manipulate::table::CellRef;
use crate::models::{BlockId, Document, Node, Region};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Image,
    Section,
    Table,
    Video,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolbarAction {
    Show { kind: TargetKind, block: BlockId },
    HideAll,
}

/// Kinds that own a toolbar. Anything else hides every toolbar.
const TOOLBARS: [TargetKind; 4] = [
    TargetKind::Image,
    TargetKind::Section,
    TargetKind::Table,
    TargetKind::Video,
];

fn kind_of(node: &Node) -> TargetKind {
    match node {
        Node::Image(_) => TargetKind::Image,
        Node::Section(_) => TargetKind::Section,
        Node::Table(_) => TargetKind::Table,
        Node::Video(_) => TargetKind::Video,
        Node::Paragraph { .. } | Node::Heading { .. } => TargetKind::None,
    }
}

/// Resolved target of one pointer event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub kind: TargetKind,
    pub block: Option<BlockId>,
    pub region: Option<Region>,
}

impl Hit {
    pub fn none() -> Self {
        Self {
            kind: TargetKind::None,
            block: None,
            region: None,
        }
    }

    /// Classify from the model. Unknown ids resolve to nothing.
    pub fn resolve(doc: &Document, block: Option<BlockId>, region: Option<Region>) -> Self {
        let Some(found) = block.and_then(|id| doc.get(id)) else {
            return Self::none();
        };
        Self {
            kind: kind_of(&found.node),
            block: Some(found.id),
            region,
        }
    }

    pub fn cell(&self) -> Option<CellRef> {
        match (self.kind, self.block, self.region) {
            (TargetKind::Table, Some(block), Some(Region::Cell(row, col))) => {
                Some(CellRef { block, row, col })
            }
            _ => None,
        }
    }

    pub fn toolbar(&self) -> ToolbarAction {
        match self.block {
            Some(block) if TOOLBARS.contains(&self.kind) => ToolbarAction::Show {
                kind: self.kind,
                block,
            },
            _ => ToolbarAction::HideAll,
        }
    }
}
