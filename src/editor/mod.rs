//! The editing surface and its toolbars.
//!
//! The surface is plain markup produced by the session (`inner_html`), with
//! delegated handlers reading `data-block-id` / `data-region` hooks. Text typed
//! into the surface is mirrored into the model without re-rendering; every other
//! change re-renders the markup and puts the caret back where the session says.

use crate::components::ui::{Button, ButtonSize, ButtonVariant, Label};
use crate::config::EditorConfig;
use crate::dispatch::{TargetKind, ToolbarAction};
use crate::dom::{self, WebPrompter};
use crate::manipulate::image::{CropCorner, CropRect, ResizeGesture, ResizeHandle, RotateGesture};
use crate::manipulate::Direction;
use crate::messages;
use crate::models::{Alignment, BlockId, Node, Positioning, Region, SectionKind};
use crate::session::{EditorError, EditorSession, FlipAxis, Operation, Prompter};
use crate::snapshots::{PersistOutcome, SnapshotRecord};
use crate::storage::WebStorage;
use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use leptos_dom::helpers::{request_animation_frame, window_event_listener};
use strum::IntoEnumIterator;
use wasm_bindgen::JsCast;

pub type WebSession = EditorSession<WebStorage, WebStorage>;

/// Shared handle on the editing session for the surface, the toolbars and the
/// history panel.
#[derive(Clone, Copy)]
pub(crate) struct EditorContext {
    pub session: StoredValue<WebSession>,
    /// Markup currently mounted in the surface.
    pub html: RwSignal<String>,
    pub toolbar: RwSignal<ToolbarAction>,
    /// Bumped by the session on every content change.
    pub revision: RwSignal<u64>,
    pub snapshots: RwSignal<Vec<SnapshotRecord>>,
    pub keep_ratio: RwSignal<bool>,
    pub surface: NodeRef<html::Div>,
}

impl EditorContext {
    pub fn new() -> Self {
        let mut session = WebSession::new(
            EditorConfig::from_env(),
            WebStorage::local(),
            WebStorage::session(),
        );
        let revision = RwSignal::new(session.revision());
        session.subscribe(move |e| revision.set(e.revision));

        Self {
            html: RwSignal::new(session.render_editing()),
            snapshots: RwSignal::new(session.list_snapshots()),
            session: StoredValue::new(session),
            toolbar: RwSignal::new(ToolbarAction::HideAll),
            revision,
            keep_ratio: RwSignal::new(true),
            surface: NodeRef::new(),
        }
    }

    pub fn apply(&self, op: Operation) {
        self.apply_focused(op, None)
    }

    /// Run `op`; after a re-render, focus `focus` unless the session placed the caret itself.
    pub fn apply_focused(&self, op: Operation, focus: Option<(BlockId, Option<Region>)>) {
        // Typed text is already in the DOM.
        let live_text = matches!(op, Operation::EditRegion { .. });
        match self.session.try_update_value(|s| s.apply(op, &WebPrompter)) {
            Some(Ok(outcome)) if outcome.rerender && !live_text => self.refresh_with(focus),
            Some(Ok(_)) => {}
            Some(Err(_)) => self.refresh_with(None),
            None => log::error!("editor session was disposed"),
        }
    }

    pub fn refresh(&self) {
        self.refresh_with(None)
    }

    fn refresh_with(&self, focus: Option<(BlockId, Option<Region>)>) {
        let Some((markup, caret)) = self
            .session
            .try_update_value(|s| (s.render_editing(), s.take_caret()))
        else {
            return;
        };
        if let ToolbarAction::Show { block, .. } = self.toolbar.get_untracked() {
            if self.session.with_value(|s| s.document().get(block).is_none()) {
                self.toolbar.set(ToolbarAction::HideAll);
            }
        }
        self.html.set(markup);

        let Some((block, region)) = caret.map(|b| (b, None)).or(focus) else {
            return;
        };
        let surface = self.surface;
        request_animation_frame(move || {
            if let Some(el) = surface
                .get_untracked()
                .and_then(|s| dom::find_block(&s, block, region))
            {
                dom::place_caret(&el);
            }
        });
    }

    fn step(&self, f: impl FnOnce(&mut WebSession) -> Result<bool, EditorError>) {
        match self.session.try_update_value(f) {
            Some(Ok(true)) => self.refresh(),
            Some(Ok(false)) => {}
            Some(Err(e)) => log::warn!("history step failed: {e}"),
            None => {}
        }
    }

    pub fn undo(&self) {
        self.step(|s| s.undo())
    }

    pub fn redo(&self) {
        self.step(|s| s.redo())
    }

    pub fn reload_snapshots(&self) {
        self.snapshots
            .set(self.session.with_value(|s| s.list_snapshots()));
    }

    fn stored(&self, saved: Result<(SnapshotRecord, PersistOutcome), EditorError>) {
        match saved {
            Ok((_, PersistOutcome::NotPersisted)) => {
                WebPrompter.alert(messages::ALERT_SNAPSHOT_NOT_STORED)
            }
            Ok(_) => {}
            Err(e) => log::warn!("snapshot failed: {e}"),
        }
        self.reload_snapshots();
    }

    pub fn manual_save(&self) {
        self.stored(self.session.with_value(|s| s.manual_save()))
    }

    pub fn save_named(&self) {
        match self.session.with_value(|s| s.save_named_snapshot(&WebPrompter)) {
            Ok(Some(_)) => self.reload_snapshots(),
            Ok(None) => {}
            Err(e) => log::warn!("snapshot failed: {e}"),
        }
    }

    pub fn restore(&self, id: &str) {
        match self
            .session
            .try_update_value(|s| s.restore_snapshot(id, &WebPrompter))
        {
            Some(Ok(true)) => {
                self.toolbar.set(ToolbarAction::HideAll);
                self.refresh();
                self.reload_snapshots();
            }
            Some(Ok(false)) | None => {}
            Some(Err(e)) => log::warn!("restore failed: {e}"),
        }
    }

    pub fn export(&self) {
        let file = match self.session.with_value(|s| s.export()) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("export failed: {e}");
                WebPrompter.alert(messages::ALERT_SAVE_FAILED);
                return;
            }
        };
        if let Err(e) = dom::download(&file.filename, &file.html) {
            log::warn!("download failed: {e:?}");
            WebPrompter.alert(messages::ALERT_SAVE_FAILED);
        }
    }

    pub fn preview(&self) {
        dom::open_preview(&self.session.with_value(|s| s.preview_message()));
    }

    /// Record the browser caret, if it lies inside the surface.
    fn capture_caret(&self) {
        let Some(surface) = self.surface.get_untracked() else {
            return;
        };
        self.session.update_value(|s| {
            let (caret, cell) = dom::caret_in(&surface, s.document());
            s.capture_caret(caret, cell);
        });
    }

    /// On-screen size of an image, falling back to the model when it is not laid out.
    fn displayed_size(&self, block: BlockId) -> Option<(u32, u32)> {
        self.measured_size(block).or_else(|| {
            self.session
                .with_value(|s| s.document().image(block).map(|img| img.displayed_size()))
        })
    }

    fn measured_size(&self, block: BlockId) -> Option<(u32, u32)> {
        let surface = self.surface.get_untracked()?;
        dom::image_size(&surface, block)
    }
}

/// Pointer gesture on an active image, live in the DOM until release.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    Resize {
        block: BlockId,
        resize: ResizeGesture,
        start: (f64, f64),
        size: (u32, u32),
    },
    Rotate {
        block: BlockId,
        rotate: RotateGesture,
        degrees: f64,
    },
    Drag {
        block: BlockId,
        start: (f64, f64),
        origin: (i32, i32),
        container: (u32, u32),
        offset: (i32, i32),
    },
    Crop {
        block: BlockId,
        corner: Option<CropCorner>,
        start: (f64, f64),
        origin: CropRect,
        bounds: (u32, u32),
        rect: CropRect,
    },
}

impl Gesture {
    fn block(&self) -> BlockId {
        match self {
            Gesture::Resize { block, .. }
            | Gesture::Rotate { block, .. }
            | Gesture::Drag { block, .. }
            | Gesture::Crop { block, .. } => *block,
        }
    }

    /// Same gesture with the pointer now at `pointer`.
    fn moved(self, pointer: (f64, f64), snap: bool) -> Self {
        match self {
            Gesture::Resize {
                block,
                resize,
                start,
                ..
            } => Gesture::Resize {
                block,
                resize,
                start,
                size: resize.size_for(pointer.0 - start.0, pointer.1 - start.1),
            },
            Gesture::Rotate { block, rotate, .. } => Gesture::Rotate {
                block,
                rotate,
                degrees: rotate.angle_for(pointer, snap),
            },
            Gesture::Drag {
                block,
                start,
                origin,
                container,
                ..
            } => Gesture::Drag {
                block,
                start,
                origin,
                container,
                offset: (
                    origin.0 + (pointer.0 - start.0).round() as i32,
                    origin.1 + (pointer.1 - start.1).round() as i32,
                ),
            },
            Gesture::Crop {
                block,
                corner,
                start,
                origin,
                bounds,
                ..
            } => {
                let (dx, dy) = (pointer.0 - start.0, pointer.1 - start.1);
                let rect = match corner {
                    Some(c) => origin.corner_dragged(c, dx, dy, bounds),
                    None => origin.dragged(dx, dy, bounds),
                };
                Gesture::Crop {
                    block,
                    corner,
                    start,
                    origin,
                    bounds,
                    rect,
                }
            }
        }
    }

    /// The single operation committed on release. A handle clicked without
    /// moving commits nothing.
    fn finish(self) -> Option<Operation> {
        let op = match self {
            Gesture::Resize {
                block,
                resize,
                size,
                ..
            } => {
                if size == (resize.start_width, resize.start_height) {
                    return None;
                }
                Operation::ResizeImage {
                    block,
                    width: size.0,
                    height: size.1,
                }
            }
            Gesture::Rotate { block, degrees, .. } => Operation::RotateImage { block, degrees },
            Gesture::Drag {
                block,
                offset,
                container,
                ..
            } => Operation::MoveImage {
                block,
                offset,
                container,
            },
            Gesture::Crop { rect, .. } => Operation::UpdateCrop { rect },
        };
        Some(op)
    }

    /// Mirror the gesture onto the mounted image without touching the model.
    fn paint(&self, surface: &web_sys::Element) {
        let Some(wrapper) = dom::find_block(surface, self.block(), None) else {
            return;
        };
        let pick = |selector: &str| {
            wrapper
                .query_selector(selector)
                .ok()
                .flatten()
                .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok())
        };
        let set = |el: &web_sys::HtmlElement, props: &[(&str, String)]| {
            let style = el.style();
            for (name, value) in props {
                let _ = style.set_property(name, value);
            }
        };

        match self {
            Gesture::Resize { size, .. } => {
                if let Some(img) = pick("img") {
                    set(
                        &img,
                        &[("width", format!("{}px", size.0)), ("height", format!("{}px", size.1))],
                    );
                }
            }
            Gesture::Rotate { degrees, .. } => {
                if let Some(img) = pick("img") {
                    set(&img, &[("transform", format!("rotate({degrees}deg)"))]);
                }
            }
            Gesture::Drag { offset, .. } => set(
                &wrapper,
                &[("left", format!("{}px", offset.0)), ("top", format!("{}px", offset.1))],
            ),
            Gesture::Crop { rect, .. } => {
                if let Some(overlay) = pick(".crop-overlay") {
                    set(
                        &overlay,
                        &[
                            ("left", format!("{}px", rect.x)),
                            ("top", format!("{}px", rect.y)),
                            ("width", format!("{}px", rect.width)),
                            ("height", format!("{}px", rect.height)),
                        ],
                    );
                }
            }
        }
    }
}

fn begin_gesture(ctx: EditorContext, ev: &web_sys::MouseEvent) -> Option<Gesture> {
    let target = ev.target();
    let (block, _) = dom::target_ids(target.clone());
    let block = block?;
    let pointer = (ev.client_x() as f64, ev.client_y() as f64);

    if let Some(handle) = dom::closest_attr(target.clone(), "data-handle") {
        let (width, height) = ctx.displayed_size(block)?;
        if handle == "rotate" {
            let surface = ctx.surface.get_untracked()?;
            let wrapper = dom::find_block(&surface, block, None)?;
            let r = wrapper.get_bounding_client_rect();
            let center = (r.left() + r.width() / 2.0, r.top() + r.height() / 2.0);
            return Some(Gesture::Rotate {
                block,
                rotate: RotateGesture::start(center, pointer, 0.0),
                degrees: 0.0,
            });
        }
        let handle = handle.parse::<ResizeHandle>().ok()?;
        let min = ctx.session.with_value(|s| s.config().min_image_dimension);
        return Some(Gesture::Resize {
            block,
            resize: ResizeGesture {
                handle,
                start_width: width,
                start_height: height,
                keep_ratio: ctx.keep_ratio.get_untracked(),
                min,
            },
            start: pointer,
            size: (width, height),
        });
    }

    if let Some(part) = dom::closest_attr(target, "data-crop") {
        let (origin, bounds) = ctx
            .session
            .with_value(|s| s.view().crop.map(|c| (c, s.view().crop_bounds)))?;
        return Some(Gesture::Crop {
            block,
            corner: part.parse::<CropCorner>().ok(),
            start: pointer,
            origin,
            bounds,
            rect: origin,
        });
    }

    let origin = ctx.session.with_value(|s| {
        s.document()
            .image(block)
            .filter(|img| img.positioning == Positioning::Absolute)
            .map(|img| (img.offset_x, img.offset_y))
    })?;
    let surface = ctx.surface.get_untracked()?;
    Some(Gesture::Drag {
        block,
        start: pointer,
        origin,
        container: (surface.client_width().max(0) as u32, surface.client_height().max(0) as u32),
        offset: origin,
    })
}

fn is_image_file(file: &web_sys::File) -> bool {
    file.type_().starts_with("image/")
}

fn input_value(ev: &web_sys::Event) -> String {
    event_target_value(ev)
}

fn parse_pct(value: &str) -> Option<u8> {
    value.trim().parse::<u8>().ok()
}

fn section_label(kind: SectionKind) -> &'static str {
    match kind {
        SectionKind::Article => "Article",
        SectionKind::Gallery => "Galerie",
        SectionKind::Quote => "Citation",
        SectionKind::CallToAction => "Appel à l'action",
        SectionKind::Contact => "Contact",
        SectionKind::TwoColumn => "Deux colonnes",
    }
}

#[component]
pub fn NewsletterEditor(history_open: RwSignal<bool>) -> impl IntoView {
    let ctx = expect_context::<EditorContext>();
    let gesture: StoredValue<Option<Gesture>> = StoredValue::new(None);
    let gallery_drag: StoredValue<Option<(BlockId, usize)>> = StoredValue::new(None);
    let gallery_target: StoredValue<Option<BlockId>> = StoredValue::new(None);
    let gallery_input: NodeRef<html::Input> = NodeRef::new();

    // Undo/redo and save apply anywhere on the page; the surface's own
    // contenteditable undo is replaced by the session history.
    let key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        let is_meta = ev.meta_key() || ev.ctrl_key();
        if !is_meta {
            return;
        }
        let key = ev.key().to_lowercase();

        let target_tag = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
            .map(|el| el.tag_name().to_lowercase());
        if matches!(target_tag.as_deref(), Some("input") | Some("textarea")) {
            return;
        }

        match key.as_str() {
            "z" if ev.shift_key() => {
                ev.prevent_default();
                ctx.redo();
            }
            "z" => {
                ev.prevent_default();
                ctx.undo();
            }
            "y" => {
                ev.prevent_default();
                ctx.redo();
            }
            "s" => {
                ev.prevent_default();
                ctx.manual_save();
            }
            _ => {}
        }
    });

    let move_handle = window_event_listener(ev::mousemove, move |ev: web_sys::MouseEvent| {
        let Some(g) = gesture.get_value() else {
            return;
        };
        let next = g.moved((ev.client_x() as f64, ev.client_y() as f64), ev.shift_key());
        if let Some(surface) = ctx.surface.get_untracked() {
            next.paint(&surface);
        }
        gesture.set_value(Some(next));
    });

    let up_handle = window_event_listener(ev::mouseup, move |_ev: web_sys::MouseEvent| {
        let Some(g) = gesture.get_value() else {
            return;
        };
        gesture.set_value(None);
        if let Some(op) = g.finish() {
            ctx.apply(op);
        }
    });

    on_cleanup(move || {
        key_handle.remove();
        move_handle.remove();
        up_handle.remove();
    });

    let on_input = move |ev: web_sys::Event| {
        let target = ev.target();
        let Some(el) = target
            .clone()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        else {
            return;
        };
        let (block, region) = dom::target_ids(target);
        let Some(block) = block else {
            return;
        };
        ctx.apply(Operation::EditRegion {
            block,
            region: region.unwrap_or(Region::Body),
            html: el.inner_html(),
        });
    };

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        let target = ev.target();
        let (block, region) = dom::target_ids(target.clone());
        let Some(block) = block else {
            return;
        };
        if region.is_some() {
            return;
        }
        let (is_text, prev) = ctx.session.with_value(|s| {
            let doc = s.document();
            let is_text = matches!(
                doc.get(block).map(|b| &b.node),
                Some(Node::Paragraph { .. }) | Some(Node::Heading { .. })
            );
            let prev = doc
                .index_of(block)
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| doc.blocks.get(i))
                .map(|b| b.id);
            (is_text, prev)
        });
        if !is_text {
            return;
        }

        match ev.key().as_str() {
            "Enter" if !ev.shift_key() => {
                ev.prevent_default();
                ctx.apply(Operation::InsertParagraph { after: Some(block) });
            }
            "Backspace" => {
                let empty = target
                    .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
                    .and_then(|n| n.text_content())
                    .map(|t| t.trim().is_empty())
                    .unwrap_or(false);
                if empty {
                    ev.prevent_default();
                    ctx.apply_focused(
                        Operation::RemoveEmptyParagraph { block },
                        prev.map(|p| (p, None)),
                    );
                }
            }
            _ => {}
        }
    };

    let on_click = move |ev: web_sys::MouseEvent| {
        let target = ev.target();
        if let Some(action) = dom::closest_attr(target.clone(), "data-action") {
            let (block, _) = dom::target_ids(target.clone());
            let Some(block) = block else {
                return;
            };
            let index = dom::closest_attr(target, "data-gallery-index")
                .and_then(|v| v.parse::<usize>().ok());
            match (action.as_str(), index) {
                ("delete-image", _) => ctx.apply(Operation::DeleteImage { block }),
                ("gallery-remove", Some(index)) => {
                    ctx.apply(Operation::RemoveGalleryItem { block, index })
                }
                ("gallery-add", _) => {
                    gallery_target.set_value(Some(block));
                    if let Some(input) = gallery_input.get_untracked() {
                        input.click();
                    }
                }
                _ => log::debug!("unhandled surface action `{action}`"),
            }
            return;
        }

        let hit = ctx
            .session
            .with_value(|s| dom::hit_at(s.document(), target));
        let Some((action, active_changed)) = ctx.session.try_update_value(|s| {
            let before = s.view().active_image;
            let action = s.click(hit);
            (action, before != s.view().active_image)
        }) else {
            return;
        };
        ctx.toolbar.set(action);
        if active_changed {
            ctx.refresh();
        }
        ctx.capture_caret();
    };

    let on_mousemove = move |ev: web_sys::MouseEvent| {
        let Some(surface) = ctx.surface.get_untracked() else {
            return;
        };
        let layout = dom::layout_of(&surface);
        let target = ev.target();
        ctx.session.update_value(|s| {
            let hit = dom::hit_at(s.document(), target);
            s.track_pointer(ev.client_x() as f64, ev.client_y() as f64, layout, hit.cell());
            s.hover(hit);
        });
    };

    let on_mousedown = move |ev: web_sys::MouseEvent| {
        if ev.button() != 0 {
            return;
        }
        if let Some(g) = begin_gesture(ctx, &ev) {
            ev.prevent_default();
            gesture.set_value(Some(g));
        }
    };

    let on_focusin = move |ev: web_sys::FocusEvent| {
        if let (Some(block), Some(region)) = dom::target_ids(ev.target()) {
            ctx.apply_focused(
                Operation::FocusRegion { block, region },
                Some((block, Some(region))),
            );
        }
    };

    let on_focusout = move |ev: web_sys::FocusEvent| {
        // A re-render detaches the focused element; that is not a user blur.
        let attached = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
            .map(|n| n.is_connected())
            .unwrap_or(false);
        if !attached {
            return;
        }
        if let (Some(block), Some(region)) = dom::target_ids(ev.target()) {
            ctx.apply(Operation::BlurRegion { block, region });
        }
    };

    let on_dragstart = move |ev: web_sys::DragEvent| {
        let target = ev.target();
        let Some(index) = dom::closest_attr(target.clone(), "data-gallery-index")
            .and_then(|v| v.parse::<usize>().ok())
        else {
            return;
        };
        let (block, _) = dom::target_ids(target);
        if let Some(block) = block {
            gallery_drag.set_value(Some((block, index)));
            if let Some(dt) = ev.data_transfer() {
                let _ = dt.set_data("text/plain", &index.to_string());
            }
        }
    };

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        let target = ev.target();

        if let Some((block, from)) = gallery_drag.get_value() {
            gallery_drag.set_value(None);
            let to = dom::closest_attr(target, "data-gallery-index")
                .and_then(|v| v.parse::<usize>().ok());
            if let Some(to) = to {
                ctx.apply(Operation::MoveGalleryItem { block, from, to });
            }
            return;
        }

        let files: Vec<_> = dom::dropped_files(&ev)
            .into_iter()
            .filter(is_image_file)
            .collect();
        if files.is_empty() {
            return;
        }

        let column = dom::closest_attr(target.clone(), "data-drop")
            .filter(|v| v == "two-column")
            .and_then(|_| dom::target_ids(target).0);
        if let Some(block) = column {
            dom::read_data_url(&files[0], move |r| match r {
                Ok(data_url) => ctx.apply(Operation::DropColumnImage { block, data_url }),
                Err(e) => log::warn!("dropped image unreadable: {e}"),
            });
            return;
        }

        if let Some(surface) = ctx.surface.get_untracked() {
            let layout = dom::layout_of(&surface);
            ctx.session.update_value(|s| {
                s.track_pointer(ev.client_x() as f64, ev.client_y() as f64, layout, None)
            });
        }
        for file in files {
            dom::read_data_url(&file, move |r| match r {
                Ok(data_url) => ctx.apply(Operation::InsertImage { data_url }),
                Err(e) => log::warn!("dropped image unreadable: {e}"),
            });
        }
    };

    let on_gallery_files = move |ev: web_sys::Event| {
        let Some(block) = gallery_target.get_value() else {
            return;
        };
        for file in dom::picked_files(&ev).into_iter().filter(is_image_file) {
            dom::read_data_url(&file, move |r| match r {
                Ok(url) => ctx.apply(Operation::AddGalleryImages {
                    block,
                    data_urls: vec![url],
                }),
                Err(e) => log::warn!("gallery image unreadable: {e}"),
            });
        }
        if let Some(input) = gallery_input.get_untracked() {
            input.set_value("");
        }
    };

    view! {
        <div class="flex flex-col gap-3">
            <MainToolbar history_open=history_open />
            <ContextToolbar />
            <input
                type="file"
                accept="image/*"
                multiple=true
                class="hidden"
                node_ref=gallery_input
                on:change=on_gallery_files
            />
            <div
                node_ref=ctx.surface
                class="newsletter-surface relative min-h-[60vh] rounded-md border bg-white p-6 shadow-xs"
                inner_html=move || ctx.html.get()
                on:input=on_input
                on:keydown=on_keydown
                on:keyup=move |_| ctx.capture_caret()
                on:mouseup=move |_| ctx.capture_caret()
                on:click=on_click
                on:mousemove=on_mousemove
                on:mousedown=on_mousedown
                on:focusin=on_focusin
                on:focusout=on_focusout
                on:dragstart=on_dragstart
                on:dragover=move |ev: web_sys::DragEvent| ev.prevent_default()
                on:drop=on_drop
            ></div>
        </div>
    }
}

#[component]
fn MainToolbar(history_open: RwSignal<bool>) -> impl IntoView {
    let ctx = expect_context::<EditorContext>();
    let image_input: NodeRef<html::Input> = NodeRef::new();
    let video_input: NodeRef<html::Input> = NodeRef::new();
    let import_input: NodeRef<html::Input> = NodeRef::new();

    let can_undo = move || {
        ctx.revision.track();
        ctx.session.with_value(|s| s.can_undo())
    };
    let can_redo = move || {
        ctx.revision.track();
        ctx.session.with_value(|s| s.can_redo())
    };

    let open = move |input: NodeRef<html::Input>| {
        if let Some(el) = input.get_untracked() {
            el.click();
        }
    };

    let on_images = move |ev: web_sys::Event| {
        for file in dom::picked_files(&ev).into_iter().filter(is_image_file) {
            dom::read_data_url(&file, move |r| match r {
                Ok(data_url) => ctx.apply(Operation::InsertImage { data_url }),
                Err(e) => log::warn!("image unreadable: {e}"),
            });
        }
        if let Some(el) = image_input.get_untracked() {
            el.set_value("");
        }
    };

    let on_video_file = move |ev: web_sys::Event| {
        for file in dom::picked_files(&ev) {
            match dom::object_url(&file) {
                Some(object_url) => ctx.apply(Operation::InsertVideoFile {
                    object_url,
                    name: file.name(),
                }),
                None => log::warn!("no object url for {}", file.name()),
            }
        }
        if let Some(el) = video_input.get_untracked() {
            el.set_value("");
        }
    };

    let on_import = move |ev: web_sys::Event| {
        if let Some(file) = dom::picked_files(&ev).into_iter().next() {
            dom::read_text(&file, move |r| match r {
                Ok(html) => {
                    ctx.toolbar.set(ToolbarAction::HideAll);
                    ctx.apply(Operation::Import { html });
                }
                Err(e) => {
                    log::warn!("import unreadable: {e}");
                    WebPrompter.alert(messages::ALERT_IMPORT_FAILED);
                }
            });
        }
        if let Some(el) = import_input.get_untracked() {
            el.set_value("");
        }
    };

    view! {
        <div class="sticky top-0 z-20 flex flex-wrap items-center gap-1.5 rounded-md border bg-background/95 p-2 backdrop-blur">
            <input type="file" accept="image/*" multiple=true class="hidden" node_ref=image_input on:change=on_images />
            <input type="file" accept="video/*" class="hidden" node_ref=video_input on:change=on_video_file />
            <input type="file" accept=".html,text/html" class="hidden" node_ref=import_input on:change=on_import />

            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| open(image_input)>
                "Image"
            </Button>
            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::InsertVideoUrl)>
                "Vidéo (lien)"
            </Button>
            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| open(video_input)>
                "Vidéo (fichier)"
            </Button>
            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::InsertTable)>
                "Tableau"
            </Button>
            <select
                class="h-8 rounded-md border bg-transparent px-2 text-sm"
                on:change=move |ev| {
                    let value = input_value(&ev);
                    if let Ok(kind) = value.parse::<SectionKind>() {
                        ctx.apply(Operation::InsertSection { kind });
                    }
                    if let Some(select) = ev
                        .target()
                        .and_then(|t| t.dyn_into::<web_sys::HtmlSelectElement>().ok())
                    {
                        select.set_value("");
                    }
                }
            >
                <option value="">"+ Section"</option>
                {SectionKind::iter()
                    .map(|kind| view! { <option value=kind.to_string()>{section_label(kind)}</option> })
                    .collect_view()}
            </select>

            <span class=DIVIDER_CLASS></span>

            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                attr:title="Annuler (Ctrl+Z)"
                attr:disabled=move || !can_undo()
                on:click=move |_| ctx.undo()
            >
                "↶"
            </Button>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                attr:title="Rétablir (Ctrl+Y)"
                attr:disabled=move || !can_redo()
                on:click=move |_| ctx.redo()
            >
                "↷"
            </Button>

            <span class=DIVIDER_CLASS></span>

            <Button variant=ButtonVariant::Default size=ButtonSize::Sm attr:title="Ctrl+S" on:click=move |_| ctx.manual_save()>
                "Sauvegarder"
            </Button>
            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| ctx.save_named()>
                "Version nommée"
            </Button>
            <Button
                variant=ButtonVariant::Outline
                size=ButtonSize::Sm
                on:click=move |_| history_open.update(|v| *v = !*v)
            >
                "Historique"
            </Button>

            <span class=DIVIDER_CLASS></span>

            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| ctx.preview()>
                "Aperçu"
            </Button>
            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| ctx.export()>
                "Exporter"
            </Button>
            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| open(import_input)>
                "Importer"
            </Button>
            <Button
                variant=ButtonVariant::Destructive
                size=ButtonSize::Sm
                on:click=move |_| {
                    ctx.toolbar.set(ToolbarAction::HideAll);
                    ctx.apply(Operation::ClearAll);
                }
            >
                "Tout effacer"
            </Button>
        </div>
    }
}

#[component]
fn ContextToolbar() -> impl IntoView {
    let ctx = expect_context::<EditorContext>();

    move || match ctx.toolbar.get() {
        ToolbarAction::Show {
            kind: TargetKind::Image,
            block,
        } => view! { <ImageToolbar block=block /> }.into_any(),
        ToolbarAction::Show {
            kind: TargetKind::Table,
            block,
        } => view! { <TableToolbar block=block /> }.into_any(),
        ToolbarAction::Show {
            kind: TargetKind::Section,
            block,
        } => view! { <SectionToolbar block=block /> }.into_any(),
        ToolbarAction::Show {
            kind: TargetKind::Video,
            block,
        } => view! { <VideoToolbar block=block /> }.into_any(),
        _ => ().into_any(),
    }
}

const DIVIDER_CLASS: &str = "mx-1 h-6 w-px shrink-0 bg-border";

const BAR_CLASS: &str = "flex flex-wrap items-center gap-1.5 rounded-md border bg-muted/40 px-2 py-1.5 text-sm";

#[component]
fn ImageToolbar(block: BlockId) -> impl IntoView {
    let ctx = expect_context::<EditorContext>();

    let cropping = move || {
        ctx.html.track();
        ctx.session.with_value(|s| s.view().crop.is_some())
    };

    let position = move |mode: Positioning| {
        let at = ctx
            .surface
            .get_untracked()
            .and_then(|s| dom::find_block(&s, block, None))
            .map(|el| (el.offset_left(), el.offset_top()))
            .unwrap_or((0, 0));
        ctx.apply(Operation::SetPositioning { block, mode, at });
    };

    view! {
        <div class=BAR_CLASS>
            <span class="text-xs text-muted-foreground">"Image"</span>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| position(Positioning::Inline)>
                "Centrée"
            </Button>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| position(Positioning::FloatLeft)>
                "À gauche"
            </Button>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| position(Positioning::FloatRight)>
                "À droite"
            </Button>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| position(Positioning::Absolute)>
                "Libre"
            </Button>

            <span class=DIVIDER_CLASS></span>

            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                on:click=move |_| ctx.apply(Operation::RotateImage { block, degrees: -90.0 })
            >
                "⟲ 90°"
            </Button>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                on:click=move |_| ctx.apply(Operation::RotateImage { block, degrees: 90.0 })
            >
                "⟳ 90°"
            </Button>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                on:click=move |_| ctx.apply(Operation::FlipImage { block, axis: FlipAxis::Horizontal })
            >
                "⇆"
            </Button>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                on:click=move |_| ctx.apply(Operation::FlipImage { block, axis: FlipAxis::Vertical })
            >
                "⇅"
            </Button>

            <span class=DIVIDER_CLASS></span>

            <Show
                when=cropping
                fallback=move || view! {
                    <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::StartCrop { block, displayed: ctx.measured_size(block) })>
                        "Recadrer"
                    </Button>
                }
            >
                <Button variant=ButtonVariant::Default size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::ApplyCrop { block })>
                    "Appliquer"
                </Button>
                <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::CancelCrop)>
                    "Annuler"
                </Button>
            </Show>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::ResetImage { block })>
                "Réinitialiser"
            </Button>

            <Label class="ml-2 text-xs">
                <input
                    type="checkbox"
                    prop:checked=move || ctx.keep_ratio.get()
                    on:change=move |ev| ctx.keep_ratio.set(event_target_checked(&ev))
                />
                "Conserver les proportions"
            </Label>

            <Button
                variant=ButtonVariant::Destructive
                size=ButtonSize::Sm
                class="ml-auto"
                on:click=move |_| ctx.apply(Operation::DeleteImage { block })
            >
                "Supprimer"
            </Button>
        </div>
    }
}

#[component]
fn TableToolbar(block: BlockId) -> impl IntoView {
    let ctx = expect_context::<EditorContext>();

    view! {
        <div class=BAR_CLASS>
            <span class="text-xs text-muted-foreground">"Tableau"</span>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::InsertRow { block })>
                "+ Ligne"
            </Button>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::DeleteRow { block })>
                "− Ligne"
            </Button>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::InsertColumn { block })>
                "+ Colonne"
            </Button>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::DeleteColumn { block })>
                "− Colonne"
            </Button>

            <span class=DIVIDER_CLASS></span>

            <Label class="text-xs">
                "Fond de cellule"
                <input
                    type="color"
                    class="h-7 w-9 cursor-pointer"
                    on:change=move |ev| ctx.apply(Operation::CellBackground { color: Some(input_value(&ev)) })
                />
            </Label>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::CellBackground { color: None })>
                "Sans fond"
            </Button>
        </div>
    }
}

#[component]
fn WidthSelect(on_pick: impl Fn(Option<u8>) + 'static) -> impl IntoView {
    view! {
        <select
            class="h-8 rounded-md border bg-transparent px-2 text-sm"
            on:change=move |ev| on_pick(parse_pct(&input_value(&ev)))
        >
            <option value="">"Largeur auto"</option>
            {[25u8, 50, 75, 100]
                .into_iter()
                .map(|pct| view! { <option value=pct.to_string()>{format!("{pct} %")}</option> })
                .collect_view()}
        </select>
    }
}

fn alignment_label(a: Alignment) -> &'static str {
    match a {
        Alignment::Left => "Gauche",
        Alignment::Center => "Centre",
        Alignment::Right => "Droite",
    }
}

#[component]
fn SectionToolbar(block: BlockId) -> impl IntoView {
    let ctx = expect_context::<EditorContext>();

    view! {
        <div class=BAR_CLASS>
            <span class="text-xs text-muted-foreground">"Section"</span>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                on:click=move |_| ctx.apply(Operation::MoveSection { block, direction: Direction::Up })
            >
                "↑"
            </Button>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                on:click=move |_| ctx.apply(Operation::MoveSection { block, direction: Direction::Down })
            >
                "↓"
            </Button>

            <WidthSelect on_pick=move |pct| ctx.apply(Operation::SectionWidth { block, pct }) />

            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::SectionAlignment { block, alignment: None })>
                "Auto"
            </Button>
            {Alignment::iter()
                .map(|a| view! {
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Sm
                        on:click=move |_| ctx.apply(Operation::SectionAlignment { block, alignment: Some(a) })
                    >
                        {alignment_label(a)}
                    </Button>
                })
                .collect_view()}

            <Label class="text-xs">
                "Fond"
                <input
                    type="color"
                    class="h-7 w-9 cursor-pointer"
                    on:change=move |ev| ctx.apply(Operation::SectionBackground { block, color: Some(input_value(&ev)) })
                />
            </Label>
            <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| ctx.apply(Operation::SectionBackground { block, color: None })>
                "Sans fond"
            </Button>

            <Button
                variant=ButtonVariant::Destructive
                size=ButtonSize::Sm
                class="ml-auto"
                on:click=move |_| ctx.apply(Operation::DeleteSection { block })
            >
                "Supprimer"
            </Button>
        </div>
    }
}

#[component]
fn VideoToolbar(block: BlockId) -> impl IntoView {
    let ctx = expect_context::<EditorContext>();

    view! {
        <div class=BAR_CLASS>
            <span class="text-xs text-muted-foreground">"Vidéo"</span>
            <WidthSelect on_pick=move |pct| ctx.apply(Operation::VideoWidth { block, pct }) />
            {Alignment::iter()
                .map(|alignment| view! {
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Sm
                        on:click=move |_| ctx.apply(Operation::VideoAlignment { block, alignment })
                    >
                        {alignment_label(alignment)}
                    </Button>
                })
                .collect_view()}
            <Button
                variant=ButtonVariant::Destructive
                size=ButtonSize::Sm
                class="ml-auto"
                on:click=move |_| ctx.apply(Operation::DeleteVideo { block })
            >
                "Supprimer"
            </Button>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn resize(keep_ratio: bool) -> Gesture {
        Gesture::Resize {
            block: BlockId(4),
            resize: ResizeGesture {
                handle: ResizeHandle::SE,
                start_width: 200,
                start_height: 100,
                keep_ratio,
                min: 20,
            },
            start: (10.0, 10.0),
            size: (200, 100),
        }
    }

    #[test]
    fn test_resize_release_commits_final_size() {
        let g = resize(false).moved((60.0, 30.0), false).moved((110.0, 40.0), false);
        assert_eq!(
            g.finish(),
            Some(Operation::ResizeImage {
                block: BlockId(4),
                width: 300,
                height: 130
            })
        );
    }

    #[test]
    fn test_resize_keeps_ratio() {
        let g = resize(true).moved((210.0, 10.0), false);
        assert_eq!(
            g.finish(),
            Some(Operation::ResizeImage {
                block: BlockId(4),
                width: 400,
                height: 200
            })
        );
    }

    #[test]
    fn test_handle_released_in_place_commits_nothing() {
        let g = resize(false).moved((10.0, 10.0), false);
        assert_eq!(g.finish(), None);
    }

    #[test]
    fn test_drag_offsets_from_origin() {
        let g = Gesture::Drag {
            block: BlockId(1),
            start: (100.0, 100.0),
            origin: (20, 30),
            container: (600, 800),
            offset: (20, 30),
        }
        .moved((150.4, 90.0), false);
        assert_eq!(
            g.finish(),
            Some(Operation::MoveImage {
                block: BlockId(1),
                offset: (70, 20),
                container: (600, 800)
            })
        );
    }

    #[rstest]
    #[case((10.0, 10.0), false, 45.0)]
    #[case((10.0, 12.0), true, 45.0)]
    #[case((0.0, 10.0), false, 90.0)]
    fn test_rotate_follows_pointer(
        #[case] pointer: (f64, f64),
        #[case] snap: bool,
        #[case] expected: f64,
    ) {
        let g = Gesture::Rotate {
            block: BlockId(2),
            rotate: RotateGesture::start((0.0, 0.0), (10.0, 0.0), 0.0),
            degrees: 0.0,
        }
        .moved(pointer, snap);
        match g.finish() {
            Some(Operation::RotateImage { degrees, .. }) => {
                assert!((degrees - expected).abs() < 1e-9)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_crop_body_drag_stays_inside_image() {
        let origin = CropRect {
            x: 10.0,
            y: 10.0,
            width: 80.0,
            height: 80.0,
        };
        let g = Gesture::Crop {
            block: BlockId(3),
            corner: None,
            start: (0.0, 0.0),
            origin,
            bounds: (100, 100),
            rect: origin,
        }
        .moved((500.0, 500.0), false);
        assert_eq!(
            g.finish(),
            Some(Operation::UpdateCrop {
                rect: CropRect {
                    x: 20.0,
                    y: 20.0,
                    width: 80.0,
                    height: 80.0
                }
            })
        );
    }

    #[rstest]
    #[case("50", Some(50))]
    #[case("", None)]
    #[case("auto", None)]
    fn test_parse_pct(#[case] input: &str, #[case] expected: Option<u8>) {
        assert_eq!(parse_pct(input), expected);
    }
}
