//! The editing session.
//!
//! One [`EditorSession`] owns the document, its undo history, the tracked
//! insertion point and the transient editing view. Every mutation goes through
//! [`EditorSession::apply`], which asks for confirmation where needed, pushes a
//! history entry, mirrors the content to the autosave slot and notifies
//! subscribers.

mod operation;

pub use operation::{FlipAxis, Operation};

use crate::config::EditorConfig;
use crate::dispatch::{Hit, TargetKind, ToolbarAction};
use crate::drafts::DraftBridge;
use crate::history::ContentHistory;
use crate::insert::{self, splice};
use crate::manipulate::image::{
    clamp_drag, normalize_degrees, remember_original, reset_to_original, set_positioning,
    CropRect,
};
use crate::manipulate::table::{CellRef, CellTracker};
use crate::manipulate::{self, GeometryError, RefusedEdit};
use crate::messages;
use crate::models::{BlockId, Document, ImageNode, ImageRef, Node, Positioning, Region};
use crate::preview::PreviewMessage;
use crate::raster::{self, RasterError, RasterOp};
use crate::render::{
    export_html, import_html, render_document, strip_tags, EditingView, ExportError, RenderMode,
};
use crate::selection::{CaretPosition, SelectionTracker, SurfaceLayout};
use crate::snapshots::{name_from_html, PersistOutcome, SnapshotRecord, SnapshotStore};
use crate::storage::{KeyValueStore, StorageError};
use crate::util::{display_date, now_ms, slugify};

/// Confirmation, prompt and alert dialogs.
pub trait Prompter {
    fn confirm(&self, message: &str) -> bool;
    /// `None` when the dialog was dismissed.
    fn prompt(&self, message: &str, default: &str) -> Option<String>;
    fn alert(&self, message: &str);
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("block {0} is missing or has another kind")]
    MissingTarget(BlockId),
    #[error("refused: {0}")]
    Refused(#[from] RefusedEdit),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("import failed: {0}")]
    Import(#[from] ExportError),
    #[error("content serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cancelled by the user")]
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    ContentChanged,
    HistoryMoved,
    Restored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub revision: u64,
}

pub type ChangeListener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// What an operation did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    /// The document changed and a history entry was recorded.
    pub changed: bool,
    /// Only the editing view changed (crop overlay, active image).
    pub rerender: bool,
}

impl Outcome {
    fn changed(changed: bool) -> Self {
        Self {
            changed,
            rerender: changed,
        }
    }

    fn view() -> Self {
        Self {
            changed: false,
            rerender: true,
        }
    }
}

/// A downloadable export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub html: String,
}

fn is_quarter_turn(degrees: f64) -> bool {
    (normalize_degrees(degrees).abs() - 90.0).abs() < 1e-6
}

fn image_ref(baked: raster::Baked) -> ImageRef {
    ImageRef {
        src: baked.data_url,
        width: baked.width,
        height: baked.height,
    }
}

pub struct EditorSession<L: KeyValueStore + Clone, T: KeyValueStore> {
    config: EditorConfig,
    document: Document,
    history: ContentHistory,
    selection: SelectionTracker,
    cells: CellTracker,
    view: EditingView,
    drafts: DraftBridge<L, T>,
    snapshots: SnapshotStore<L>,
    revision: u64,
    listeners: Vec<ChangeListener>,
    layout: Option<SurfaceLayout>,
    caret: Option<BlockId>,
    last_edit: Option<(BlockId, Region)>,
}

impl<L: KeyValueStore + Clone, T: KeyValueStore> EditorSession<L, T> {
    /// Open a session on `local` (drafts and snapshots) with `session` as the
    /// autosave fallback. A matching draft is restored, otherwise the document
    /// starts with one empty paragraph.
    pub fn new(config: EditorConfig, local: L, session: T) -> Self {
        let drafts = DraftBridge::new(local.clone(), session, config.schema_version.clone());
        let snapshots = SnapshotStore::new(local, &config);

        let document = drafts
            .restore()
            .and_then(|json| match Document::from_json(&json) {
                Ok(doc) => {
                    log::info!("restored autosaved draft ({} blocks)", doc.len());
                    Some(doc)
                }
                Err(e) => {
                    log::warn!("autosaved draft is unreadable: {e}");
                    None
                }
            })
            .unwrap_or_else(|| Document::from_nodes([Node::empty_paragraph()]));

        let mut history = ContentHistory::new(config.history_limit);
        match document.to_json() {
            Ok(json) => history.reset(json),
            Err(e) => log::error!("initial content could not be serialized: {e}"),
        }

        Self {
            config,
            document,
            history,
            selection: SelectionTracker::new(),
            cells: CellTracker::default(),
            view: EditingView::default(),
            drafts,
            snapshots,
            revision: 0,
            listeners: vec![],
            layout: None,
            caret: None,
            last_edit: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Serialized document, the form stored in history, drafts and snapshots.
    pub fn content(&self) -> Result<String, EditorError> {
        Ok(self.document.to_json()?)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn view(&self) -> &EditingView {
        &self.view
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn render_editing(&self) -> String {
        render_document(&self.document, RenderMode::Editing(&self.view))
    }

    pub fn subscribe(&mut self, listener: impl Fn(&ChangeEvent) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, kind: ChangeKind) {
        self.revision += 1;
        let event = ChangeEvent {
            kind,
            revision: self.revision,
        };
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// Paragraph the caret should move to after the last insertion.
    pub fn take_caret(&mut self) -> Option<BlockId> {
        self.caret.take()
    }

    // ---- pointer and caret tracking -------------------------------------

    /// A click on the surface. Activates the clicked image (deactivating any
    /// other) and tells which toolbar to show.
    pub fn click(&mut self, hit: Hit) -> ToolbarAction {
        if let Some(cell) = hit.cell() {
            self.cells.last_clicked = Some(cell);
        }
        let active = match hit.kind {
            TargetKind::Image => hit.block,
            _ => None,
        };
        if self.view.active_image != active {
            self.view.active_image = active;
            self.view.crop = None;
        }
        hit.toolbar()
    }

    pub fn hover(&mut self, hit: Hit) {
        if let Some(cell) = hit.cell() {
            self.cells.last_hovered = Some(cell);
        }
    }

    /// Caret read after pointer-up, key-up or click. `None` means it was outside
    /// the surface and nothing is recorded.
    pub fn capture_caret(&mut self, caret: Option<CaretPosition>, cell: Option<CellRef>) {
        if self.selection.capture_range(caret) {
            self.cells.selection_cell = cell;
        }
    }

    pub fn track_pointer(&mut self, x: f64, y: f64, layout: SurfaceLayout, cell: Option<CellRef>) {
        self.selection.track_pointer(x, y, &layout);
        self.layout = Some(layout);
        if cell.is_some() {
            self.cells.pointer_cell = cell;
        }
    }

    // ---- operations -----------------------------------------------------

    /// Run `op`. Failures are reported through `ui` (alert or log) and
    /// returned; a dismissed dialog is a silent no-op.
    pub fn apply(&mut self, op: Operation, ui: &dyn Prompter) -> Result<Outcome, EditorError> {
        let key = op.coalesce_key();
        match self.run(op, ui) {
            Ok(outcome) => {
                if outcome.changed {
                    self.commit(key)?;
                }
                Ok(outcome)
            }
            Err(EditorError::Cancelled) => {
                log::debug!("operation cancelled");
                Ok(Outcome::default())
            }
            Err(e) => {
                self.report(&e, ui);
                Err(e)
            }
        }
    }

    fn commit(&mut self, key: Option<(BlockId, Region)>) -> Result<(), EditorError> {
        let json = self.document.to_json()?;
        match key {
            Some(k) if self.last_edit == Some(k) => self.history.replace_current(json.clone()),
            _ => self.history.push(json.clone()),
        }
        self.last_edit = key;
        self.drafts.write(&json);
        self.emit(ChangeKind::ContentChanged);
        Ok(())
    }

    fn report(&mut self, err: &EditorError, ui: &dyn Prompter) {
        log::warn!("operation failed: {err}");
        match err {
            EditorError::Refused(RefusedEdit::LastRow) => ui.alert(messages::ALERT_LAST_ROW),
            EditorError::Refused(RefusedEdit::LastColumn) => {
                ui.alert(messages::ALERT_LAST_COLUMN)
            }
            EditorError::Geometry(_) => {
                self.view.crop = None;
                ui.alert(messages::ALERT_INVALID_CROP);
            }
            EditorError::Raster(_) => {
                self.view.crop = None;
                ui.alert(messages::ALERT_IMAGE_PROCESSING);
            }
            EditorError::Import(_) => ui.alert(messages::ALERT_IMPORT_FAILED),
            _ => {}
        }
    }

    fn confirm(ui: &dyn Prompter, message: &str) -> Result<(), EditorError> {
        if ui.confirm(message) {
            Ok(())
        } else {
            Err(EditorError::Cancelled)
        }
    }

    fn run(&mut self, op: Operation, ui: &dyn Prompter) -> Result<Outcome, EditorError> {
        match op {
            Operation::EditRegion {
                block,
                region,
                html,
            } => {
                let node = self
                    .document
                    .node_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                let before = node.clone();
                if !node.set_region_html(region, html) {
                    return Err(EditorError::MissingTarget(block));
                }
                Ok(Outcome::changed(*node != before))
            }
            Operation::FocusRegion { block, region } => {
                let changed = self
                    .document
                    .section_mut(block)
                    .map(|s| insert::focus_region(s, region))
                    .unwrap_or(false);
                Ok(Outcome::changed(changed))
            }
            Operation::BlurRegion { block, region } => {
                let changed = match (self.document.section_mut(block), region) {
                    (Some(s), Region::Caption(i)) => insert::blur_caption(s, i),
                    _ => false,
                };
                Ok(Outcome::changed(changed))
            }
            Operation::InsertParagraph { after } => {
                let index = after
                    .and_then(|id| self.document.index_of(id))
                    .map(|i| i + 1)
                    .unwrap_or(self.document.len());
                let id = self.document.insert(index, Node::empty_paragraph());
                self.caret = Some(id);
                Ok(Outcome::changed(true))
            }
            Operation::RemoveEmptyParagraph { block } => {
                let empty = matches!(
                    self.document.get(block).map(|b| &b.node),
                    Some(Node::Paragraph { html }) if strip_tags(html).trim().is_empty()
                );
                if !empty || self.document.len() <= 1 {
                    return Ok(Outcome::default());
                }
                self.document.remove(block);
                Ok(Outcome::changed(true))
            }

            Operation::InsertImage { data_url } => {
                let baked = raster::prepare_upload(&data_url, &self.config)?;
                let node = ImageNode::new(baked.data_url, baked.width, baked.height);
                self.insert_block(Node::Image(node))
            }
            Operation::InsertVideoUrl => {
                let url = ui
                    .prompt(messages::PROMPT_VIDEO_URL, "")
                    .ok_or(EditorError::Cancelled)?;
                let video = insert::video_from_url(&url).ok_or(EditorError::Cancelled)?;
                self.insert_block(Node::Video(video))
            }
            Operation::InsertVideoFile { object_url, name } => {
                self.insert_block(Node::Video(insert::video_from_file(object_url, name)))
            }
            Operation::InsertTable => {
                let default = insert::DEFAULT_TABLE_SIZE.to_string();
                let rows = insert::parse_dimension(
                    ui.prompt(messages::PROMPT_TABLE_ROWS, &default).as_deref(),
                )
                .ok_or(EditorError::Cancelled)?;
                let cols = insert::parse_dimension(
                    ui.prompt(messages::PROMPT_TABLE_COLUMNS, &default).as_deref(),
                )
                .ok_or(EditorError::Cancelled)?;
                self.insert_block(Node::Table(insert::table_node(rows, cols)))
            }
            Operation::InsertSection { kind } => {
                self.insert_block(Node::Section(insert::section_node(kind)))
            }
            Operation::AddGalleryImages { block, data_urls } => {
                let images = data_urls
                    .iter()
                    .map(|url| raster::prepare_upload(url, &self.config).map(image_ref))
                    .collect::<Result<Vec<_>, _>>()?;
                let section = self
                    .document
                    .section_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                Ok(Outcome::changed(
                    insert::add_gallery_images(section, images) > 0,
                ))
            }
            Operation::MoveGalleryItem { block, from, to } => {
                let section = self
                    .document
                    .section_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                Ok(Outcome::changed(insert::move_gallery_item(section, from, to)))
            }
            Operation::RemoveGalleryItem { block, index } => {
                if self.document.section_mut(block).is_none() {
                    return Err(EditorError::MissingTarget(block));
                }
                Self::confirm(ui, messages::CONFIRM_DELETE_GALLERY_IMAGE)?;
                let removed = self
                    .document
                    .section_mut(block)
                    .and_then(|s| insert::remove_gallery_item(s, index));
                Ok(Outcome::changed(removed.is_some()))
            }
            Operation::DropColumnImage { block, data_url } => {
                let image = image_ref(raster::prepare_upload(&data_url, &self.config)?);
                let section = self
                    .document
                    .section_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                Ok(Outcome::changed(insert::populate_two_column(section, image)))
            }

            Operation::SetPositioning { block, mode, at } => {
                let img = self.image_mut(block)?;
                let before = (img.positioning, img.offset_x, img.offset_y);
                set_positioning(img, mode, at);
                Ok(Outcome::changed(
                    before != (img.positioning, img.offset_x, img.offset_y),
                ))
            }
            Operation::MoveImage {
                block,
                offset,
                container,
            } => {
                let img = self.image_mut(block)?;
                if img.positioning != Positioning::Absolute {
                    return Ok(Outcome::default());
                }
                let (x, y) = clamp_drag(offset, img.displayed_size(), container);
                let changed = (img.offset_x, img.offset_y) != (x, y);
                img.offset_x = x;
                img.offset_y = y;
                Ok(Outcome::changed(changed))
            }
            Operation::ResizeImage {
                block,
                width,
                height,
            } => {
                let min = self.config.min_image_dimension;
                let img = self.image_mut(block)?;
                let size = (width.max(min), height.max(min));
                if img.displayed_size() == size {
                    return Ok(Outcome::default());
                }
                (img.width, img.height) = (Some(size.0), Some(size.1));
                Ok(Outcome::changed(true))
            }
            Operation::RotateImage { block, degrees } => {
                let degrees = normalize_degrees(degrees);
                if degrees.abs() < 1e-6 {
                    let img = self.image_mut(block)?;
                    img.rotation_deg = 0.0;
                    return Ok(Outcome::view());
                }
                self.bake_image(block, &[RasterOp::Rotate { degrees }], None)
            }
            Operation::FlipImage { block, axis } => {
                let op = match axis {
                    FlipAxis::Horizontal => RasterOp::FlipHorizontal,
                    FlipAxis::Vertical => RasterOp::FlipVertical,
                };
                self.bake_image(block, &[op], None)
            }
            Operation::StartCrop { block, displayed } => {
                let img = self
                    .document
                    .image(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                let bounds = displayed
                    .filter(|&(w, h)| w > 0 && h > 0)
                    .unwrap_or_else(|| img.displayed_size());
                self.view.crop = Some(CropRect::initial(bounds));
                self.view.crop_bounds = bounds;
                self.view.active_image = Some(block);
                Ok(Outcome::view())
            }
            Operation::UpdateCrop { rect } => {
                let active = self
                    .view
                    .active_image
                    .is_some_and(|id| self.document.image(id).is_some());
                if !active || self.view.crop.is_none() {
                    return Ok(Outcome::default());
                }
                self.view.crop = Some(rect.constrain(self.view.crop_bounds));
                Ok(Outcome::view())
            }
            Operation::CancelCrop => {
                self.view.crop = None;
                Ok(Outcome::view())
            }
            Operation::ApplyCrop { block } => {
                let rect = self
                    .view
                    .crop
                    .take()
                    .ok_or(EditorError::MissingTarget(block))?;
                let img = self
                    .document
                    .image(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                let px = rect.to_natural(
                    self.view.crop_bounds,
                    (img.natural_width, img.natural_height),
                )?;
                let displayed = (
                    rect.width.round().max(1.0) as u32,
                    rect.height.round().max(1.0) as u32,
                );
                self.bake_image(block, &[RasterOp::Crop(px)], Some(displayed))
            }
            Operation::ResetImage { block } => {
                let original = self.image_mut(block)?.original_src.clone();
                let Some(original) = original else {
                    return Ok(Outcome::default());
                };
                Self::confirm(ui, messages::CONFIRM_RESET_IMAGE)?;
                let img = self.image_mut(block)?;
                let natural = match raster::decode(&original) {
                    Ok((_, decoded)) => (decoded.width(), decoded.height()),
                    Err(e) => {
                        log::warn!("original image not decodable, keeping current size: {e}");
                        (img.natural_width, img.natural_height)
                    }
                };
                Ok(Outcome::changed(reset_to_original(img, natural)))
            }
            Operation::DeleteImage { block } => {
                self.image_mut(block)?;
                Self::confirm(ui, messages::CONFIRM_DELETE_IMAGE)?;
                self.document.remove(block);
                if self.view.active_image == Some(block) {
                    self.view = EditingView::default();
                }
                Ok(Outcome::changed(true))
            }

            Operation::InsertRow { block } => {
                let after = self.cells.structural_target(block).map(|c| c.row);
                let table = self
                    .document
                    .table_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                manipulate::table::insert_row(table, after);
                Ok(Outcome::changed(true))
            }
            Operation::DeleteRow { block } => {
                let target = self.cells.structural_target(block).map(|c| c.row);
                let rows = self
                    .document
                    .table_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?
                    .row_count();
                if rows <= 1 {
                    return Err(RefusedEdit::LastRow.into());
                }
                Self::confirm(ui, messages::CONFIRM_DELETE_ROW)?;
                let table = self
                    .document
                    .table_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                manipulate::table::delete_row(table, target)?;
                self.cells.forget(block);
                Ok(Outcome::changed(true))
            }
            Operation::InsertColumn { block } => {
                let after = self.cells.structural_target(block).map(|c| c.col);
                let table = self
                    .document
                    .table_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                manipulate::table::insert_column(table, after);
                Ok(Outcome::changed(true))
            }
            Operation::DeleteColumn { block } => {
                let target = self.cells.structural_target(block).map(|c| c.col);
                let cols = self
                    .document
                    .table_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?
                    .column_count();
                if cols <= 1 {
                    return Err(RefusedEdit::LastColumn.into());
                }
                Self::confirm(ui, messages::CONFIRM_DELETE_COLUMN)?;
                let table = self
                    .document
                    .table_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                manipulate::table::delete_column(table, target)?;
                self.cells.forget(block);
                Ok(Outcome::changed(true))
            }
            Operation::CellBackground { color } => {
                let Some(cell) = self.cells.background_target() else {
                    log::debug!("no table cell to colour");
                    return Ok(Outcome::default());
                };
                let color = color.filter(|c| !c.trim().is_empty());
                let changed = self
                    .document
                    .table_mut(cell.block)
                    .map(|t| manipulate::table::set_cell_background(t, cell.row, cell.col, color))
                    .unwrap_or(false);
                Ok(Outcome::changed(changed))
            }

            Operation::MoveSection { block, direction } => Ok(Outcome::changed(
                manipulate::section::move_section(&mut self.document, block, direction),
            )),
            Operation::SectionWidth { block, pct } => {
                let section = self
                    .document
                    .section_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                let before = section.style.clone();
                manipulate::section::set_width(section, pct);
                Ok(Outcome::changed(section.style != before))
            }
            Operation::SectionAlignment { block, alignment } => {
                let section = self
                    .document
                    .section_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                let before = section.style.clone();
                manipulate::section::set_alignment(section, alignment);
                Ok(Outcome::changed(section.style != before))
            }
            Operation::SectionBackground { block, color } => {
                let section = self
                    .document
                    .section_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                let before = section.style.clone();
                manipulate::section::set_background(section, color);
                Ok(Outcome::changed(section.style != before))
            }
            Operation::DeleteSection { block } => {
                if self.document.section_mut(block).is_none() {
                    return Err(EditorError::MissingTarget(block));
                }
                Self::confirm(ui, messages::CONFIRM_DELETE_SECTION)?;
                self.document.remove(block);
                Ok(Outcome::changed(true))
            }

            Operation::VideoWidth { block, pct } => {
                let video = self
                    .document
                    .video_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                let before = video.width_pct;
                manipulate::video::set_width(video, pct);
                Ok(Outcome::changed(video.width_pct != before))
            }
            Operation::VideoAlignment { block, alignment } => {
                let video = self
                    .document
                    .video_mut(block)
                    .ok_or(EditorError::MissingTarget(block))?;
                let before = video.alignment;
                manipulate::video::set_alignment(video, alignment);
                Ok(Outcome::changed(video.alignment != before))
            }
            Operation::DeleteVideo { block } => {
                if self.document.video_mut(block).is_none() {
                    return Err(EditorError::MissingTarget(block));
                }
                Self::confirm(ui, messages::CONFIRM_DELETE_VIDEO)?;
                self.document.remove(block);
                Ok(Outcome::changed(true))
            }

            Operation::ClearAll => {
                Self::confirm(ui, messages::CONFIRM_CLEAR_ALL)?;
                self.replace_document(Document::from_nodes([Node::empty_paragraph()]));
                Ok(Outcome::changed(true))
            }
            Operation::Import { html } => {
                let doc = import_html(&html)?;
                Self::confirm(ui, messages::CONFIRM_IMPORT)?;
                self.replace_document(doc);
                Ok(Outcome::changed(true))
            }
        }
    }

    fn image_mut(&mut self, block: BlockId) -> Result<&mut ImageNode, EditorError> {
        self.document
            .image_mut(block)
            .ok_or(EditorError::MissingTarget(block))
    }

    /// Splice at the tracked insertion point and put the caret in the
    /// paragraph that follows.
    fn insert_block(&mut self, node: Node) -> Result<Outcome, EditorError> {
        let point = self.selection.take(&self.document, self.layout.as_ref());
        log::debug!("inserting at {point:?}");
        let spliced = splice(&mut self.document, point, node);
        self.caret = Some(spliced.caret);
        self.selection.capture_range(Some(CaretPosition {
            block: spliced.caret,
            offset: 0,
        }));
        Ok(Outcome::changed(true))
    }

    /// Write `ops` into new pixel data.
    ///
    /// The displayed size follows the new pixels at the previous scale (axes
    /// swapped for quarter turns) unless `displayed` overrides it. The live
    /// rotation goes back to zero.
    fn bake_image(
        &mut self,
        block: BlockId,
        ops: &[RasterOp],
        displayed: Option<(u32, u32)>,
    ) -> Result<Outcome, EditorError> {
        let quality = self.config.image_quality;
        let img = self.image_mut(block)?;
        let baked = raster::bake(&img.src, ops, quality)?;

        let (dw, dh) = img.displayed_size();
        let mut sx = dw as f64 / img.natural_width.max(1) as f64;
        let mut sy = dh as f64 / img.natural_height.max(1) as f64;
        let quarter = ops.iter().any(|op| match op {
            RasterOp::Rotate { degrees } => is_quarter_turn(*degrees),
            _ => false,
        });
        if quarter {
            std::mem::swap(&mut sx, &mut sy);
        }
        let sized = img.width.is_some() || img.height.is_some();

        remember_original(img);
        img.src = baked.data_url;
        img.natural_width = baked.width;
        img.natural_height = baked.height;
        img.rotation_deg = 0.0;
        (img.width, img.height) = match displayed {
            Some((w, h)) => (Some(w), Some(h)),
            None if sized => (
                Some((baked.width as f64 * sx).round() as u32),
                Some((baked.height as f64 * sy).round() as u32),
            ),
            None => (None, None),
        };
        Ok(Outcome::changed(true))
    }

    fn replace_document(&mut self, doc: Document) {
        self.document = doc;
        self.view = EditingView::default();
        self.cells = CellTracker::default();
        self.selection = SelectionTracker::new();
        self.caret = None;
    }

    /// Show `json` without recording a new history entry.
    fn load_content(&mut self, json: &str, kind: ChangeKind) -> Result<(), EditorError> {
        let doc = Document::from_json(json)?;
        self.replace_document(doc);
        self.last_edit = None;
        self.drafts.write(json);
        self.emit(kind);
        Ok(())
    }

    // ---- undo / redo ----------------------------------------------------

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let Some(json) = self.history.undo().map(|e| e.content.clone()) else {
            return Ok(false);
        };
        self.load_content(&json, ChangeKind::HistoryMoved)?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let Some(json) = self.history.redo().map(|e| e.content.clone()) else {
            return Ok(false);
        };
        self.load_content(&json, ChangeKind::HistoryMoved)?;
        Ok(true)
    }

    // ---- snapshots ------------------------------------------------------

    pub fn list_snapshots(&self) -> Vec<SnapshotRecord> {
        self.snapshots.list()
    }

    pub fn save_snapshot(
        &self,
        name: Option<&str>,
        action: &str,
    ) -> Result<(SnapshotRecord, PersistOutcome), EditorError> {
        let content = self.content()?;
        let (record, outcome) = self.snapshots.save(name, &content, action);
        log::info!("snapshot `{}` saved: {outcome:?}", record.name);
        Ok((record, outcome))
    }

    /// Ctrl+S: snapshot under the derived title.
    pub fn manual_save(&self) -> Result<(SnapshotRecord, PersistOutcome), EditorError> {
        self.save_snapshot(None, messages::ACTION_MANUAL_SAVE)
    }

    /// Snapshot under a name typed by the user. `None` when the prompt was dismissed.
    pub fn save_named_snapshot(
        &self,
        ui: &dyn Prompter,
    ) -> Result<Option<SnapshotRecord>, EditorError> {
        let Some(name) = ui.prompt(messages::PROMPT_SNAPSHOT_NAME, &self.title()) else {
            return Ok(None);
        };
        let (record, _) = self.save_snapshot(Some(&name), messages::ACTION_SNAPSHOT)?;
        Ok(Some(record))
    }

    /// Put a snapshot back into the editor after confirmation. Non-empty
    /// current content is saved first so the restore can be reverted.
    pub fn restore_snapshot(&mut self, id: &str, ui: &dyn Prompter) -> Result<bool, EditorError> {
        let Some(content) = self.snapshots.restore(id) else {
            log::warn!("snapshot {id} not found");
            return Ok(false);
        };
        if !ui.confirm(messages::CONFIRM_RESTORE_SNAPSHOT) {
            return Ok(false);
        }
        let doc = Document::from_json(&content)?;

        let has_content = self.document.blocks.iter().any(|b| match &b.node {
            Node::Paragraph { html } => !strip_tags(html).trim().is_empty(),
            _ => true,
        });
        if has_content {
            self.save_snapshot(None, messages::ACTION_AUTOSAVE)?;
        }

        let json = doc.to_json()?;
        self.history.push(json.clone());
        self.load_content(&json, ChangeKind::Restored)?;
        Ok(true)
    }

    pub fn delete_snapshots(&self, ids: &[String], ui: &dyn Prompter) -> usize {
        if ids.is_empty() || !ui.confirm(messages::CONFIRM_DELETE_SNAPSHOTS) {
            return 0;
        }
        self.snapshots.delete(ids)
    }

    pub fn clear_snapshots(&self, ui: &dyn Prompter) -> bool {
        if !ui.confirm(messages::CONFIRM_CLEAR_SNAPSHOTS) {
            return false;
        }
        self.snapshots.delete_all();
        true
    }

    pub fn migrate_titles(&self) -> usize {
        self.snapshots.migrate_titles()
    }

    // ---- export / preview -----------------------------------------------

    pub fn title(&self) -> String {
        name_from_html(
            &render_document(&self.document, RenderMode::Export),
            self.config.name_fallback_chars,
        )
    }

    pub fn export(&self) -> Result<ExportFile, EditorError> {
        let title = self.title();
        let html = export_html(&self.document, &title)?;
        Ok(ExportFile {
            filename: format!("newsletter-{}.html", slugify(&title)),
            html,
        })
    }

    pub fn preview_message(&self) -> PreviewMessage {
        PreviewMessage::new(
            render_document(&self.document, RenderMode::Export),
            self.title(),
            display_date(now_ms()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert::table_node;
    use crate::manipulate::Direction;
    use crate::models::SectionKind;
    use crate::raster::{encode, encode_data_url, OutputFormat};
    use crate::storage::{MemoryStorage, CONTENT_KEY, VERSION_KEY};
    use image::{DynamicImage, RgbaImage};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct ScriptedPrompter {
        confirms: RefCell<VecDeque<bool>>,
        prompts: RefCell<VecDeque<Option<String>>>,
        alerts: RefCell<Vec<String>>,
    }

    impl ScriptedPrompter {
        fn confirming(answers: &[bool]) -> Self {
            let p = Self::default();
            p.confirms.borrow_mut().extend(answers.iter().copied());
            p
        }

        fn answering(answers: &[Option<&str>]) -> Self {
            let p = Self::default();
            p.prompts
                .borrow_mut()
                .extend(answers.iter().map(|a| a.map(str::to_string)));
            p
        }

        fn alerts(&self) -> Vec<String> {
            self.alerts.borrow().clone()
        }
    }

    impl Prompter for ScriptedPrompter {
        fn confirm(&self, _message: &str) -> bool {
            self.confirms.borrow_mut().pop_front().unwrap_or(false)
        }

        fn prompt(&self, _message: &str, _default: &str) -> Option<String> {
            self.prompts.borrow_mut().pop_front().flatten()
        }

        fn alert(&self, message: &str) {
            self.alerts.borrow_mut().push(message.to_string());
        }
    }

    type Session = EditorSession<MemoryStorage, MemoryStorage>;

    fn session_with(nodes: Vec<Node>) -> Session {
        let mut s = EditorSession::new(
            EditorConfig::default(),
            MemoryStorage::new(),
            MemoryStorage::new(),
        );
        s.document = Document::from_nodes(nodes);
        s.history.reset(s.document.to_json().expect("json"));
        s
    }

    fn png(w: u32, h: u32) -> String {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, image::Rgba([200, 0, 0, 255])));
        encode_data_url("image/png", &encode(&img, OutputFormat::Png).expect("png"))
    }

    fn ids(s: &Session) -> Vec<BlockId> {
        s.document.blocks.iter().map(|b| b.id).collect()
    }

    #[test]
    fn test_fresh_session_has_one_empty_paragraph() {
        let s = EditorSession::new(
            EditorConfig::default(),
            MemoryStorage::new(),
            MemoryStorage::new(),
        );
        assert_eq!(s.document().blocks.len(), 1);
        assert_eq!(s.history_len(), 1);
        assert!(!s.can_undo());
    }

    #[test]
    fn test_image_inserted_at_tracked_point_between_paragraphs() {
        let mut s = session_with(vec![Node::paragraph("a"), Node::paragraph("b")]);
        let [a, b] = [ids(&s)[0], ids(&s)[1]];
        s.capture_caret(Some(CaretPosition { block: a, offset: 1 }), None);

        let before = s.history_len();
        let out = s
            .apply(
                Operation::InsertImage {
                    data_url: png(4, 2),
                },
                &ScriptedPrompter::default(),
            )
            .expect("insert");

        assert!(out.changed);
        assert_eq!(s.history_len(), before + 1);
        let caret = s.take_caret();
        let blocks = &s.document().blocks;
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].id, a);
        assert!(matches!(blocks[1].node, Node::Image(_)));
        assert_eq!(blocks[2].node, Node::empty_paragraph());
        assert_eq!(blocks[3].id, b);
        assert_eq!(caret, Some(blocks[2].id));
    }

    #[test]
    fn test_declined_delete_changes_nothing() {
        let mut s = session_with(vec![
            Node::paragraph("a"),
            Node::Image(ImageNode::new(png(2, 2), 2, 2)),
        ]);
        let img = ids(&s)[1];
        let before = s.document().clone();
        let len = s.history_len();

        let out = s
            .apply(
                Operation::DeleteImage { block: img },
                &ScriptedPrompter::confirming(&[false]),
            )
            .expect("declined is not an error");

        assert_eq!(out, Outcome::default());
        assert_eq!(s.document(), &before);
        assert_eq!(s.history_len(), len);
    }

    #[rstest]
    #[case::row(|ids: &[BlockId]| Operation::DeleteRow { block: ids[0] })]
    #[case::column(|ids: &[BlockId]| Operation::DeleteColumn { block: ids[0] })]
    #[case::section(|ids: &[BlockId]| Operation::DeleteSection { block: ids[1] })]
    #[case::video(|ids: &[BlockId]| Operation::DeleteVideo { block: ids[2] })]
    #[case::clear_all(|_: &[BlockId]| Operation::ClearAll)]
    fn test_declined_structural_delete_changes_nothing(#[case] op: fn(&[BlockId]) -> Operation) {
        let mut s = session_with(vec![
            Node::Table(table_node(2, 2)),
            Node::Section(insert::section_node(SectionKind::Article)),
            Node::Video(insert::video_from_file("blob:clip", "clip.mp4")),
        ]);
        let before = s.document().clone();
        let len = s.history_len();
        let ui = ScriptedPrompter::confirming(&[false]);

        let op = op(&ids(&s));
        let out = s.apply(op, &ui).expect("declined is not an error");

        assert_eq!(out, Outcome::default());
        assert_eq!(s.document(), &before);
        assert_eq!(s.history_len(), len);
        assert_eq!(ui.confirms.borrow().len(), 0);
    }

    #[test]
    fn test_confirmed_section_delete() {
        let mut s = session_with(vec![Node::Section(insert::section_node(SectionKind::Quote))]);
        let id = ids(&s)[0];
        s.apply(
            Operation::DeleteSection { block: id },
            &ScriptedPrompter::confirming(&[true]),
        )
        .expect("delete");
        assert!(s.document().is_empty());
        assert!(s.can_undo());
    }

    #[test]
    fn test_last_row_is_refused_with_alert() {
        let mut s = session_with(vec![Node::Table(table_node(1, 2))]);
        let id = ids(&s)[0];
        let ui = ScriptedPrompter::confirming(&[true]);

        let err = s
            .apply(Operation::DeleteRow { block: id }, &ui)
            .expect_err("refused");

        assert!(matches!(err, EditorError::Refused(RefusedEdit::LastRow)));
        assert_eq!(ui.alerts(), vec![messages::ALERT_LAST_ROW.to_string()]);
        match &s.document().blocks[0].node {
            Node::Table(t) => assert_eq!((t.row_count(), t.column_count()), (1, 2)),
            other => panic!("unexpected {other:?}"),
        }
        // The confirmation was never asked.
        assert_eq!(ui.confirms.borrow().len(), 1);
    }

    #[test]
    fn test_row_insert_follows_selected_cell() {
        let mut s = session_with(vec![Node::Table(table_node(3, 2))]);
        let id = ids(&s)[0];
        s.capture_caret(
            Some(CaretPosition { block: id, offset: 0 }),
            Some(CellRef {
                block: id,
                row: 0,
                col: 1,
            }),
        );
        s.apply(Operation::InsertRow { block: id }, &ScriptedPrompter::default())
            .expect("row");
        match &s.document().blocks[0].node {
            Node::Table(t) => {
                assert_eq!(t.row_count(), 4);
                assert!(!t.rows[1][0].header);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cell_background_prefers_clicked_cell() {
        let mut s = session_with(vec![Node::Table(table_node(2, 2))]);
        let id = ids(&s)[0];
        let doc = s.document().clone();
        s.hover(Hit::resolve(&doc, Some(id), Some(Region::Cell(0, 0))));
        s.click(Hit::resolve(&doc, Some(id), Some(Region::Cell(1, 1))));
        s.apply(
            Operation::CellBackground {
                color: Some("#ffeecc".to_string()),
            },
            &ScriptedPrompter::default(),
        )
        .expect("colour");
        match &s.document().blocks[0].node {
            Node::Table(t) => {
                assert_eq!(t.rows[1][1].background.as_deref(), Some("#ffeecc"));
                assert_eq!(t.rows[0][0].background, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_quarter_turn_swaps_dimensions_and_resets_rotation() {
        let mut img = ImageNode::new(png(4, 2), 4, 2);
        img.width = Some(40);
        img.height = Some(20);
        img.rotation_deg = 90.0;
        let mut s = session_with(vec![Node::Image(img)]);
        let id = ids(&s)[0];

        s.apply(
            Operation::RotateImage {
                block: id,
                degrees: 90.0,
            },
            &ScriptedPrompter::default(),
        )
        .expect("rotate");

        let img = s.document().image(id).expect("image");
        assert_eq!((img.natural_width, img.natural_height), (2, 4));
        assert_eq!((img.width, img.height), (Some(20), Some(40)));
        assert_eq!(img.rotation_deg, 0.0);
        assert!(img.original_src.is_some());
    }

    #[test]
    fn test_reset_goes_back_to_original_pixels() {
        let mut s = session_with(vec![Node::Image(ImageNode::new(png(4, 2), 4, 2))]);
        let id = ids(&s)[0];
        s.apply(
            Operation::FlipImage {
                block: id,
                axis: FlipAxis::Horizontal,
            },
            &ScriptedPrompter::default(),
        )
        .expect("flip");
        s.apply(
            Operation::RotateImage {
                block: id,
                degrees: 90.0,
            },
            &ScriptedPrompter::default(),
        )
        .expect("rotate");

        s.apply(
            Operation::ResetImage { block: id },
            &ScriptedPrompter::confirming(&[true]),
        )
        .expect("reset");
        let img = s.document().image(id).expect("image");
        assert_eq!(img.src, png(4, 2));
        assert_eq!((img.natural_width, img.natural_height), (4, 2));
        assert_eq!(img.original_src, None);
    }

    #[test]
    fn test_invalid_crop_alerts_and_clears_overlay() {
        let mut s = session_with(vec![Node::Image(ImageNode::new(png(4, 2), 4, 2))]);
        let id = ids(&s)[0];
        let ui = ScriptedPrompter::default();
        s.apply(Operation::StartCrop { block: id, displayed: None }, &ui)
            .expect("start");
        assert!(s.view().crop.is_some());
        s.apply(
            Operation::UpdateCrop {
                rect: CropRect {
                    x: 1.0,
                    y: 1.0,
                    width: 0.0,
                    height: 0.0,
                },
            },
            &ui,
        )
        .expect("update");

        let err = s
            .apply(Operation::ApplyCrop { block: id }, &ui)
            .expect_err("empty crop");
        assert!(matches!(err, EditorError::Geometry(GeometryError::EmptyCrop)));
        assert_eq!(ui.alerts(), vec![messages::ALERT_INVALID_CROP.to_string()]);
        assert_eq!(s.view().crop, None);
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn test_crop_bakes_selected_area() {
        let mut s = session_with(vec![Node::Image(ImageNode::new(png(4, 2), 4, 2))]);
        let id = ids(&s)[0];
        let ui = ScriptedPrompter::default();
        s.apply(Operation::StartCrop { block: id, displayed: None }, &ui)
            .expect("start");
        s.apply(
            Operation::UpdateCrop {
                rect: CropRect {
                    x: 0.0,
                    y: 0.0,
                    width: 2.0,
                    height: 2.0,
                },
            },
            &ui,
        )
        .expect("update");
        s.apply(Operation::ApplyCrop { block: id }, &ui).expect("crop");

        let img = s.document().image(id).expect("image");
        assert_eq!((img.natural_width, img.natural_height), (2, 2));
        assert_eq!((img.width, img.height), (Some(2), Some(2)));
        assert_eq!(s.view().crop, None);
    }

    #[test]
    fn test_resize_respects_minimum() {
        let mut s = session_with(vec![Node::Image(ImageNode::new(png(4, 2), 400, 200))]);
        let id = ids(&s)[0];
        s.apply(
            Operation::ResizeImage {
                block: id,
                width: 5,
                height: 300,
            },
            &ScriptedPrompter::default(),
        )
        .expect("resize");
        let img = s.document().image(id).expect("image");
        assert_eq!((img.width, img.height), (Some(20), Some(300)));
    }

    #[test]
    fn test_handle_click_without_drag_keeps_auto_size() {
        let mut s = session_with(vec![Node::Image(ImageNode::new(png(4, 2), 400, 200))]);
        let id = ids(&s)[0];
        let out = s
            .apply(
                Operation::ResizeImage {
                    block: id,
                    width: 400,
                    height: 200,
                },
                &ScriptedPrompter::default(),
            )
            .expect("resize");

        assert_eq!(out, Outcome::default());
        let img = s.document().image(id).expect("image");
        assert_eq!((img.width, img.height), (None, None));
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn test_crop_follows_measured_size_not_natural_size() {
        // 8x4 pixels shown at 4x2 on screen.
        let mut s = session_with(vec![Node::Image(ImageNode::new(png(8, 4), 8, 4))]);
        let id = ids(&s)[0];
        let ui = ScriptedPrompter::default();
        s.apply(
            Operation::StartCrop {
                block: id,
                displayed: Some((4, 2)),
            },
            &ui,
        )
        .expect("start");
        assert_eq!(s.view().crop, Some(CropRect::initial((4, 2))));

        s.apply(
            Operation::UpdateCrop {
                rect: CropRect {
                    x: 2.0,
                    y: 0.0,
                    width: 6.0,
                    height: 2.0,
                },
            },
            &ui,
        )
        .expect("update");
        let rect = s.view().crop.expect("crop");
        assert_eq!((rect.x + rect.width, rect.height), (4.0, 2.0));

        s.apply(
            Operation::UpdateCrop {
                rect: CropRect {
                    x: 0.0,
                    y: 0.0,
                    width: 2.0,
                    height: 2.0,
                },
            },
            &ui,
        )
        .expect("update");
        s.apply(Operation::ApplyCrop { block: id }, &ui).expect("crop");

        let img = s.document().image(id).expect("image");
        assert_eq!((img.natural_width, img.natural_height), (4, 4));
        assert_eq!((img.width, img.height), (Some(2), Some(2)));
    }

    #[test]
    fn test_same_section_background_is_not_a_new_step() {
        let mut s = session_with(vec![Node::Section(insert::section_node(SectionKind::Quote))]);
        let id = ids(&s)[0];
        let ui = ScriptedPrompter::default();
        let paint = || Operation::SectionBackground {
            block: id,
            color: Some("#fde68a".to_string()),
        };

        assert!(s.apply(paint(), &ui).expect("first").changed);
        let len = s.history_len();
        let out = s.apply(paint(), &ui).expect("again");

        assert!(!out.changed);
        assert_eq!(s.history_len(), len);
    }

    #[test]
    fn test_dismissed_table_prompt_is_silent() {
        let mut s = session_with(vec![Node::paragraph("a")]);
        let ui = ScriptedPrompter::answering(&[None]);
        let out = s.apply(Operation::InsertTable, &ui).expect("cancel");
        assert!(!out.changed);
        assert_eq!(s.document().len(), 1);
        assert!(ui.alerts().is_empty());
    }

    #[test]
    fn test_table_prompt_values() {
        let mut s = session_with(vec![Node::paragraph("a")]);
        let ui = ScriptedPrompter::answering(&[Some("2"), Some("abc")]);
        s.apply(Operation::InsertTable, &ui).expect("table");
        match &s.document().blocks[1].node {
            Node::Table(t) => assert_eq!((t.row_count(), t.column_count()), (2, 3)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_typing_in_one_region_is_one_undo_step() {
        let mut s = session_with(vec![Node::paragraph("")]);
        let id = ids(&s)[0];
        let ui = ScriptedPrompter::default();
        for html in ["B", "Bo", "Bon"] {
            s.apply(
                Operation::EditRegion {
                    block: id,
                    region: Region::Body,
                    html: html.to_string(),
                },
                &ui,
            )
            .expect("edit");
        }
        assert_eq!(s.history_len(), 2);

        assert!(s.undo().expect("undo"));
        assert_eq!(s.document().blocks[0].node, Node::paragraph(""));
        assert!(s.redo().expect("redo"));
        assert_eq!(s.document().blocks[0].node, Node::paragraph("Bon"));
    }

    #[test]
    fn test_undo_then_new_edit_drops_redo() {
        let mut s = session_with(vec![Node::paragraph("a")]);
        let ui = ScriptedPrompter::default();
        s.apply(Operation::InsertParagraph { after: None }, &ui).expect("p");
        s.apply(Operation::InsertParagraph { after: None }, &ui).expect("p");
        s.undo().expect("undo");
        s.apply(
            Operation::InsertSection {
                kind: SectionKind::Article,
            },
            &ui,
        )
        .expect("section");
        assert!(!s.can_redo());
        assert!(!s.redo().expect("redo"));
    }

    #[test]
    fn test_move_section_skips_paragraphs() {
        let mut s = session_with(vec![
            Node::Section(insert::section_node(SectionKind::Article)),
            Node::paragraph("between"),
            Node::Section(insert::section_node(SectionKind::Quote)),
        ]);
        let [first, _, last] = [ids(&s)[0], ids(&s)[1], ids(&s)[2]];
        s.apply(
            Operation::MoveSection {
                block: last,
                direction: Direction::Up,
            },
            &ScriptedPrompter::default(),
        )
        .expect("move");
        assert_eq!(s.document().index_of(last), Some(0));
        assert_eq!(s.document().index_of(first), Some(2));
    }

    #[test]
    fn test_subscribers_see_every_change() {
        let mut s = session_with(vec![Node::paragraph("a")]);
        let seen = Arc::new(Mutex::new(vec![]));
        let sink = seen.clone();
        s.subscribe(move |e| {
            if let Ok(mut v) = sink.lock() {
                v.push(*e);
            }
        });

        let ui = ScriptedPrompter::default();
        s.apply(Operation::InsertParagraph { after: None }, &ui).expect("p");
        s.apply(Operation::CancelCrop, &ui).expect("view only");
        s.undo().expect("undo");

        let kinds: Vec<_> = seen.lock().expect("lock").iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::ContentChanged, ChangeKind::HistoryMoved]);
        assert_eq!(s.revision(), 2);
    }

    #[test]
    fn test_changes_are_autosaved_and_restored() {
        let local = MemoryStorage::new();
        let tab = MemoryStorage::new();
        let mut s = EditorSession::new(EditorConfig::default(), local.clone(), tab.clone());
        let id = ids(&s)[0];
        s.apply(
            Operation::EditRegion {
                block: id,
                region: Region::Body,
                html: "brouillon".to_string(),
            },
            &ScriptedPrompter::default(),
        )
        .expect("edit");

        let reopened = EditorSession::new(EditorConfig::default(), local, tab);
        assert_eq!(reopened.document().blocks[0].node, Node::paragraph("brouillon"));
    }

    #[test]
    fn test_schema_change_discards_draft() {
        let local = MemoryStorage::new();
        let tab = MemoryStorage::new();
        let mut s = EditorSession::new(EditorConfig::default(), local.clone(), tab.clone());
        s.apply(
            Operation::InsertSection {
                kind: SectionKind::Contact,
            },
            &ScriptedPrompter::default(),
        )
        .expect("insert");
        assert!(local.get(CONTENT_KEY).is_some());

        let cfg = EditorConfig {
            schema_version: "4".to_string(),
            ..EditorConfig::default()
        };
        let reopened = EditorSession::new(cfg, local.clone(), tab);
        assert_eq!(reopened.document().blocks.len(), 1);
        assert_eq!(reopened.document().blocks[0].node, Node::empty_paragraph());
        assert_eq!(local.get(CONTENT_KEY), None);
        assert_eq!(local.get(VERSION_KEY), None);
    }

    #[test]
    fn test_restore_snapshot_backs_up_current_content() {
        let mut s = session_with(vec![Node::heading(2, "Actus")]);
        let (saved, _) = s.manual_save().expect("save");
        let id = ids(&s)[0];
        s.apply(
            Operation::EditRegion {
                block: id,
                region: Region::Body,
                html: "Brouillon".to_string(),
            },
            &ScriptedPrompter::default(),
        )
        .expect("edit");

        let restored = s
            .restore_snapshot(&saved.id, &ScriptedPrompter::confirming(&[true]))
            .expect("restore");

        assert!(restored);
        assert_eq!(s.document().blocks[0].node, Node::heading(2, "Actus"));
        let names: Vec<_> = s.list_snapshots().into_iter().map(|r| r.last_action).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&messages::ACTION_AUTOSAVE.to_string()));
        assert!(s.can_undo());
    }

    #[test]
    fn test_declined_restore_keeps_document() {
        let mut s = session_with(vec![Node::heading(2, "Actus")]);
        let (saved, _) = s.manual_save().expect("save");
        s.apply(Operation::InsertParagraph { after: None }, &ScriptedPrompter::default())
            .expect("p");
        let before = s.document().clone();
        assert!(!s
            .restore_snapshot(&saved.id, &ScriptedPrompter::confirming(&[false]))
            .expect("declined"));
        assert_eq!(s.document(), &before);
    }

    #[test]
    fn test_export_file_name_and_reimport() {
        let mut s = session_with(vec![Node::heading(2, "Actus"), Node::paragraph("Texte")]);
        let file = s.export().expect("export");
        assert_eq!(file.filename, "newsletter-actus.html");

        let ui = ScriptedPrompter::confirming(&[true, true]);
        s.apply(Operation::ClearAll, &ui).expect("clear");
        assert_eq!(s.document().len(), 1);
        s.apply(Operation::Import { html: file.html }, &ui)
            .expect("import");
        assert_eq!(s.document().len(), 2);
    }

    #[test]
    fn test_import_without_data_keeps_document() {
        let mut s = session_with(vec![Node::paragraph("garde")]);
        let ui = ScriptedPrompter::confirming(&[true]);
        let err = s
            .apply(
                Operation::Import {
                    html: "<html><body>rien</body></html>".to_string(),
                },
                &ui,
            )
            .expect_err("no data island");
        assert!(matches!(err, EditorError::Import(ExportError::MissingData)));
        assert_eq!(ui.alerts(), vec![messages::ALERT_IMPORT_FAILED.to_string()]);
        assert_eq!(s.document().blocks[0].node, Node::paragraph("garde"));
    }

    #[test]
    fn test_click_activates_one_image_at_a_time() {
        let mut s = session_with(vec![
            Node::Image(ImageNode::new("a.png", 1, 1)),
            Node::Image(ImageNode::new("b.png", 1, 1)),
            Node::paragraph("p"),
        ]);
        let [a, b, p] = [ids(&s)[0], ids(&s)[1], ids(&s)[2]];
        let doc = s.document().clone();

        s.click(Hit::resolve(&doc, Some(a), None));
        assert_eq!(s.view().active_image, Some(a));
        let action = s.click(Hit::resolve(&doc, Some(b), None));
        assert_eq!(s.view().active_image, Some(b));
        assert_eq!(
            action,
            ToolbarAction::Show {
                kind: TargetKind::Image,
                block: b
            }
        );
        assert_eq!(s.click(Hit::resolve(&doc, Some(p), None)), ToolbarAction::HideAll);
        assert_eq!(s.view().active_image, None);
    }

    #[test]
    fn test_preview_message_carries_title() {
        let s = session_with(vec![Node::heading(1, "Lettre de juin")]);
        let msg = s.preview_message();
        assert_eq!(msg.title, "Lettre de juin");
        assert!(msg.content.contains("Lettre de juin"));
        assert!(!msg.content.contains("data-block-id"));
    }
}
