//! Browser overlay: a full-viewport canvas on top of the page that drives the
//! shared interaction engine from DOM events.

mod app;
mod config;
mod dom;
mod metrics;
mod net;
mod notify;
mod prompt;
mod render;
mod storage;

use wasm_bindgen::prelude::*;

pub use app::{
    apply_style, is_active, request_delete, set_style_panel_open, set_tool, share, toggle,
};
pub use config::OverlayConfig;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let debug = web_sys::window()
        .map(|window| config::debug_requested(&window))
        .unwrap_or(false);
    let level = if debug {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    if console_log::init_with_level(level).is_err() {
        web_sys::console::warn_1(&"pagemark: logger already installed".into());
    }
    log::debug!("pagemark overlay module loaded");
}
