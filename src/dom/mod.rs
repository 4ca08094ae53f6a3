//! Browser glue for the editor surface: dialogs, reading picked files, caret
//! and block geometry, downloads and the preview window.

use crate::dispatch::Hit;
use crate::manipulate::table::CellRef;
use crate::models::{BlockId, Document, Region};
use crate::preview::PreviewMessage;
use crate::selection::{BlockRect, CaretPosition, SurfaceLayout, SurfaceRect};
use crate::session::Prompter;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

/// `window.confirm` / `window.prompt` / `window.alert`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebPrompter;

impl Prompter for WebPrompter {
    fn confirm(&self, message: &str) -> bool {
        web_sys::window()
            .and_then(|w| w.confirm_with_message(message).ok())
            .unwrap_or(false)
    }

    fn prompt(&self, message: &str, default: &str) -> Option<String> {
        web_sys::window()
            .and_then(|w| w.prompt_with_message_and_default(message, default).ok())
            .flatten()
    }

    fn alert(&self, message: &str) {
        if let Some(w) = web_sys::window() {
            let _ = w.alert_with_message(message);
        }
    }
}

fn element_of(target: Option<web_sys::EventTarget>) -> Option<web_sys::Element> {
    let node = target?.dyn_into::<web_sys::Node>().ok()?;
    match node.dyn_ref::<web_sys::Element>() {
        Some(el) => Some(el.clone()),
        None => node.parent_element(),
    }
}

fn block_id_of(el: &web_sys::Element) -> Option<BlockId> {
    el.closest("[data-block-id]")
        .ok()
        .flatten()?
        .get_attribute("data-block-id")?
        .parse::<u64>()
        .ok()
        .map(BlockId)
}

fn region_of(el: &web_sys::Element) -> Option<Region> {
    el.closest("[data-region]")
        .ok()
        .flatten()?
        .get_attribute("data-region")?
        .parse()
        .ok()
}

/// Block id and region under an event target.
pub fn target_ids(target: Option<web_sys::EventTarget>) -> (Option<BlockId>, Option<Region>) {
    match element_of(target) {
        Some(el) => (block_id_of(&el), region_of(&el)),
        None => (None, None),
    }
}

/// Classify an event target against the model.
pub fn hit_at(doc: &Document, target: Option<web_sys::EventTarget>) -> Hit {
    let (block, region) = target_ids(target);
    Hit::resolve(doc, block, region)
}

/// Closest element carrying `attr`, with its value.
pub fn closest_attr(target: Option<web_sys::EventTarget>, attr: &str) -> Option<String> {
    element_of(target)?
        .closest(&format!("[{attr}]"))
        .ok()
        .flatten()?
        .get_attribute(attr)
}

/// Caret of the current browser selection, when it lies inside `surface`.
pub fn caret_in(surface: &web_sys::Element, doc: &Document) -> (Option<CaretPosition>, Option<CellRef>) {
    let range = web_sys::window()
        .and_then(|w| w.get_selection().ok().flatten())
        .filter(|sel| sel.range_count() > 0)
        .and_then(|sel| sel.get_range_at(0).ok());
    let Some(range) = range else {
        return (None, None);
    };
    let Ok(container) = range.start_container() else {
        return (None, None);
    };
    if !surface.contains(Some(&container)) {
        return (None, None);
    }

    let hit = hit_at(doc, Some(container.unchecked_into()));
    let caret = hit.block.map(|block| CaretPosition {
        block,
        offset: range.start_offset().unwrap_or(0),
    });
    (caret, hit.cell())
}

/// Bounding box of the surface and of each top-level block.
pub fn layout_of(surface: &web_sys::Element) -> SurfaceLayout {
    let r = surface.get_bounding_client_rect();
    let children = surface.children();
    let mut blocks = Vec::with_capacity(children.length() as usize);
    for i in 0..children.length() {
        let Some(child) = children.item(i) else {
            continue;
        };
        let Some(id) = child
            .get_attribute("data-block-id")
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        let cr = child.get_bounding_client_rect();
        blocks.push(BlockRect {
            id: BlockId(id),
            top: cr.top(),
            bottom: cr.bottom(),
        });
    }
    SurfaceLayout {
        surface: SurfaceRect {
            left: r.left(),
            top: r.top(),
            right: r.right(),
            bottom: r.bottom(),
        },
        blocks,
    }
}

/// Element of a block (or of one of its regions) inside `surface`.
pub fn find_block(
    surface: &web_sys::Element,
    block: BlockId,
    region: Option<Region>,
) -> Option<web_sys::HtmlElement> {
    let selector = match region {
        Some(r) => format!(r#"[data-block-id="{block}"] [data-region="{r}"]"#),
        None => format!(r#"[data-block-id="{block}"]"#),
    };
    surface
        .query_selector(&selector)
        .ok()
        .flatten()?
        .dyn_into::<web_sys::HtmlElement>()
        .ok()
}

/// Laid-out size of a block's `<img>`, which CSS may shrink below the model's size.
pub fn image_size(surface: &web_sys::Element, block: BlockId) -> Option<(u32, u32)> {
    let img = find_block(surface, block, None)?
        .query_selector("img")
        .ok()
        .flatten()?
        .dyn_into::<web_sys::HtmlElement>()
        .ok()?;
    let (w, h) = (img.offset_width(), img.offset_height());
    (w > 0 && h > 0).then_some((w as u32, h as u32))
}

/// Focus an element and put the caret at its start.
pub fn place_caret(el: &web_sys::HtmlElement) {
    let _ = el.focus();
    let Some(sel) = web_sys::window().and_then(|w| w.get_selection().ok().flatten()) else {
        return;
    };
    if let Some(range) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.create_range().ok())
    {
        if range.select_node_contents(el).is_ok() {
            range.collapse_with_to_start(true);
            let _ = sel.remove_all_ranges();
            let _ = sel.add_range(&range);
        }
    }
}

/// Read a picked file as a `data:` URL and hand it to `done`.
pub fn read_data_url(file: &web_sys::File, done: impl FnOnce(Result<String, String>) + 'static) {
    read_file(file, true, done)
}

/// Read a picked file as text.
pub fn read_text(file: &web_sys::File, done: impl FnOnce(Result<String, String>) + 'static) {
    read_file(file, false, done)
}

fn read_file(
    file: &web_sys::File,
    as_data_url: bool,
    done: impl FnOnce(Result<String, String>) + 'static,
) {
    let reader = match web_sys::FileReader::new() {
        Ok(r) => r,
        Err(e) => return done(Err(format!("{e:?}"))),
    };
    let r = reader.clone();
    let onload = Closure::once_into_js(move || {
        let result = r
            .result()
            .ok()
            .and_then(|v| v.as_string())
            .ok_or_else(|| "file reader returned no text".to_string());
        done(result);
    });
    reader.set_onload(Some(onload.unchecked_ref()));
    let started = if as_data_url {
        reader.read_as_data_url(file)
    } else {
        reader.read_as_text(file)
    };
    if let Err(e) = started {
        log::warn!("file could not be read: {e:?}");
    }
}

/// Files of a `<input type="file">` change event.
pub fn picked_files(ev: &web_sys::Event) -> Vec<web_sys::File> {
    let Some(list) = ev
        .target()
        .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        .and_then(|input| input.files())
    else {
        return vec![];
    };
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

/// Files carried by a drop event.
pub fn dropped_files(ev: &web_sys::DragEvent) -> Vec<web_sys::File> {
    let Some(list) = ev.data_transfer().and_then(|dt| dt.files()) else {
        return vec![];
    };
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

/// Ephemeral URL for a local file, valid for this page only.
pub fn object_url(file: &web_sys::File) -> Option<String> {
    web_sys::Url::create_object_url_with_blob(file).ok()
}

/// Offer `html` as a file download through a temporary link.
pub fn download(filename: &str, html: &str) -> Result<(), JsValue> {
    let parts = js_sys::Array::of1(&JsValue::from_str(html));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type("text/html;charset=utf-8");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let a = document
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()?;
    a.set_href(&url);
    a.set_download(filename);
    a.click();
    web_sys::Url::revoke_object_url(&url)?;
    Ok(())
}

/// Open the preview route and post the content to it once it had time to load.
pub fn open_preview(message: &PreviewMessage) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let target = match window.open_with_url_and_target("/preview", "_blank") {
        Ok(Some(w)) => w,
        Ok(None) => {
            log::warn!("preview window was blocked");
            return;
        }
        Err(e) => {
            log::warn!("preview window failed to open: {e:?}");
            return;
        }
    };
    let payload = match serde_json::to_string(message)
        .ok()
        .and_then(|json| js_sys::JSON::parse(&json).ok())
    {
        Some(p) => p,
        None => return,
    };

    let post = Closure::once_into_js(move || {
        if let Err(e) = target.post_message(&payload, "*") {
            log::warn!("preview message not delivered: {e:?}");
        }
    });
    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(post.unchecked_ref(), 500);
}

/// Parse a `message` event into a preview message.
pub fn preview_from_event(ev: &web_sys::MessageEvent) -> Option<PreviewMessage> {
    let json = js_sys::JSON::stringify(&ev.data()).ok()?.as_string()?;
    PreviewMessage::from_json(&json)
}
