use serde::Deserialize;
use wasm_bindgen::JsValue;
use web_sys::Window;

use pagemark_shared::{Style, StylePatch, DEFAULT_STORAGE_PREFIX};

pub const CONFIG_GLOBAL: &str = "__PAGEMARK_CONFIG__";
pub const DEFAULT_SHARE_ENDPOINT: &str = "http://localhost:3000/api/share";

/// Optional page-provided settings, read from `window.__PAGEMARK_CONFIG__`.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    pub storage_prefix: String,
    pub share_endpoint: String,
    pub debug: bool,
    pub default_style: Option<StylePatch>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            share_endpoint: DEFAULT_SHARE_ENDPOINT.to_string(),
            debug: false,
            default_style: None,
        }
    }
}

impl OverlayConfig {
    pub fn from_window(window: &Window) -> Self {
        let Ok(value) = js_sys::Reflect::get(window.as_ref(), &JsValue::from_str(CONFIG_GLOBAL))
        else {
            return Self::default();
        };
        if value.is_undefined() || value.is_null() {
            return Self::default();
        }
        match serde_wasm_bindgen::from_value::<OverlayConfig>(value) {
            Ok(config) => config.sanitized(),
            Err(err) => {
                log::warn!("ignoring malformed {CONFIG_GLOBAL}: {err}");
                Self::default()
            }
        }
    }

    fn sanitized(mut self) -> Self {
        if self.share_endpoint.trim().is_empty() {
            self.share_endpoint = DEFAULT_SHARE_ENDPOINT.to_string();
        }
        self
    }

    pub fn initial_style(&self) -> Style {
        let mut style = Style::default();
        if let Some(patch) = &self.default_style {
            style.apply(patch);
        }
        style
    }
}

/// `pagemark_debug=1` (or `=true`) in the query string turns on debug logs.
pub fn debug_in_query(search: &str) -> bool {
    search
        .trim_start_matches('?')
        .split('&')
        .any(|pair| matches!(pair, "pagemark_debug=1" | "pagemark_debug=true"))
}

pub fn debug_requested(window: &Window) -> bool {
    let search = window.location().search().unwrap_or_default();
    debug_in_query(&search) || OverlayConfig::from_window(window).debug
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemark_shared::TextAlign;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: OverlayConfig =
            serde_json::from_str(r#"{"shareEndpoint":"https://share.example/api/share"}"#)
                .unwrap();
        assert_eq!(config.storage_prefix, DEFAULT_STORAGE_PREFIX);
        assert_eq!(config.share_endpoint, "https://share.example/api/share");
        assert!(!config.debug);
    }

    #[test]
    fn default_style_patch_is_applied() {
        let config: OverlayConfig = serde_json::from_str(
            r##"{"defaultStyle":{"color":"#00f","lineWidth":6,"textAlign":"right"}}"##,
        )
        .unwrap();
        let style = config.initial_style();
        assert_eq!(style.color, "#00f");
        assert_eq!(style.line_width, 6.0);
        assert_eq!(style.text_align, TextAlign::Right);
    }

    #[test]
    fn blank_endpoint_falls_back() {
        let config = OverlayConfig {
            share_endpoint: "  ".into(),
            ..OverlayConfig::default()
        }
        .sanitized();
        assert_eq!(config.share_endpoint, DEFAULT_SHARE_ENDPOINT);
    }

    #[test]
    fn debug_flag_is_read_from_query() {
        assert!(debug_in_query("?a=1&pagemark_debug=1"));
        assert!(debug_in_query("pagemark_debug=true"));
        assert!(!debug_in_query("?pagemark_debug=0"));
        assert!(!debug_in_query(""));
    }
}
