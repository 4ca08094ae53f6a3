//! Browser newsletter editor: a block document edited on a contenteditable
//! surface, with undo history, autosave, named snapshots, image editing,
//! preview and standalone HTML export.

mod app;
mod components;
pub mod config;
pub mod dispatch;
mod dom;
pub mod drafts;
mod editor;
pub mod history;
pub mod insert;
mod logging;
pub mod manipulate;
mod messages;
pub mod models;
mod pages;
pub mod preview;
pub mod raster;
pub mod render;
pub mod selection;
pub mod session;
pub mod snapshots;
pub mod storage;
mod util;

use crate::app::App;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;


// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    logging::init();
    mount_to_body(App);
}
