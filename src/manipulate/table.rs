use super::RefusedEdit;
use crate::models::{BlockId, Cell, TableNode};

/// Insert a body row after `after`, or at the end when no row is targeted.
/// Returns the index of the new row.
pub fn insert_row(t: &mut TableNode, after: Option<usize>) -> usize {
    let cols = t.column_count().max(1);
    let at = after
        .map(|r| (r + 1).min(t.row_count()))
        .unwrap_or(t.row_count());
    t.rows.insert(at, vec![Cell::body(); cols]);
    at
}

/// Delete `target`, or the last row. The only remaining row is never deleted.
pub fn delete_row(t: &mut TableNode, target: Option<usize>) -> Result<usize, RefusedEdit> {
    if t.row_count() <= 1 {
        return Err(RefusedEdit::LastRow);
    }
    let at = target
        .filter(|r| *r < t.row_count())
        .unwrap_or(t.row_count() - 1);
    t.rows.remove(at);
    Ok(at)
}

/// Insert a column after `after` (or at the end) in every row.
pub fn insert_column(t: &mut TableNode, after: Option<usize>) -> usize {
    let cols = t.column_count();
    let at = after.map(|c| (c + 1).min(cols)).unwrap_or(cols);
    for row in &mut t.rows {
        let header = row.first().map(|c| c.header).unwrap_or(false);
        let cell = if header { Cell::header() } else { Cell::body() };
        let at = at.min(row.len());
        row.insert(at, cell);
    }
    at
}

pub fn delete_column(t: &mut TableNode, target: Option<usize>) -> Result<usize, RefusedEdit> {
    let cols = t.column_count();
    if cols <= 1 {
        return Err(RefusedEdit::LastColumn);
    }
    let at = target.filter(|c| *c < cols).unwrap_or(cols - 1);
    for row in &mut t.rows {
        if at < row.len() {
            row.remove(at);
        }
    }
    Ok(at)
}

pub fn set_cell_background(t: &mut TableNode, row: usize, col: usize, color: Option<String>) -> bool {
    match t.cell_mut(row, col) {
        Some(cell) => {
            cell.background = color;
            true
        }
        None => false,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRef {
    pub block: BlockId,
    pub row: usize,
    pub col: usize,
}

/// Remembers which cell the user last interacted with, by several channels.
///
/// Under fast interaction the hovered cell can be stale; the priority order is
/// kept as-is.
#[derive(Clone, Debug, Default)]
pub struct CellTracker {
    pub last_clicked: Option<CellRef>,
    pub last_hovered: Option<CellRef>,
    pub pointer_cell: Option<CellRef>,
    pub selection_cell: Option<CellRef>,
}

impl CellTracker {
    /// Cell a background colour applies to: clicked, hovered, under pointer, under selection.
    pub fn background_target(&self) -> Option<CellRef> {
        self.last_clicked
            .or(self.last_hovered)
            .or(self.pointer_cell)
            .or(self.selection_cell)
    }

    /// Cell row/column edits are relative to, within `block`.
    pub fn structural_target(&self, block: BlockId) -> Option<CellRef> {
        [self.selection_cell, self.last_clicked]
            .into_iter()
            .flatten()
            .find(|c| c.block == block)
    }

    /// Forget references into a table that went away.
    pub fn forget(&mut self, block: BlockId) {
        for slot in [
            &mut self.last_clicked,
            &mut self.last_hovered,
            &mut self.pointer_cell,
            &mut self.selection_cell,
        ] {
            if slot.map(|c| c.block == block).unwrap_or(false) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert::table_node;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_row_after_target_or_at_end() {
        let mut t = table_node(2, 3);
        assert_eq!(insert_row(&mut t, Some(0)), 1);
        assert_eq!(insert_row(&mut t, None), 3);
        assert_eq!(t.row_count(), 4);
        assert!(t.rows[1].iter().all(|c| !c.header));
    }

    #[test]
    fn test_insert_column_keeps_header_row() {
        let mut t = table_node(2, 2);
        assert_eq!(insert_column(&mut t, Some(0)), 1);
        assert_eq!(t.column_count(), 3);
        assert!(t.rows[0][1].header);
        assert!(!t.rows[1][1].header);
    }

    #[test]
    fn test_last_row_and_column_are_kept() {
        let mut t = table_node(1, 1);
        assert_eq!(delete_row(&mut t, None), Err(RefusedEdit::LastRow));
        assert_eq!(delete_column(&mut t, Some(0)), Err(RefusedEdit::LastColumn));
        assert_eq!((t.row_count(), t.column_count()), (1, 1));
    }

    #[test]
    fn test_delete_targets_or_defaults_to_last() {
        let mut t = table_node(3, 3);
        t.rows[1][0].html = "keep?".to_string();
        assert_eq!(delete_row(&mut t, Some(1)), Ok(1));
        assert!(t.rows.iter().all(|r| r[0].html != "keep?"));
        assert_eq!(delete_column(&mut t, None), Ok(2));
        assert_eq!(t.column_count(), 2);
    }

    #[test]
    fn test_background_target_priority() {
        let cell = |row| CellRef {
            block: BlockId(1),
            row,
            col: 0,
        };
        let mut tracker = CellTracker {
            selection_cell: Some(cell(3)),
            pointer_cell: Some(cell(2)),
            ..CellTracker::default()
        };
        assert_eq!(tracker.background_target(), Some(cell(2)));
        tracker.last_hovered = Some(cell(1));
        assert_eq!(tracker.background_target(), Some(cell(1)));
        tracker.last_clicked = Some(cell(0));
        assert_eq!(tracker.background_target(), Some(cell(0)));

        tracker.forget(BlockId(1));
        assert_eq!(tracker.background_target(), None);
    }
}
