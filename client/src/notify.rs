use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement, HtmlInputElement, Window};

use crate::dom::{append_to_body, create, set_styles};

pub const TOAST_MS: i32 = 3_500;
const FALLBACK_TOAST_MS: i32 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

/// Shows a transient notification in the bottom right corner. When
/// `manual_copy` is given, a pre-selected read-only field holding that text is
/// added so the user can copy it by hand.
pub fn toast(
    window: &Window,
    document: &Document,
    kind: ToastKind,
    message: &str,
    manual_copy: Option<&str>,
) -> Result<(), JsValue> {
    let toast: HtmlElement = create(document, "div")?;
    toast.set_attribute("role", "status")?;
    toast.set_attribute("data-pagemark", "toast")?;
    let background = match kind {
        ToastKind::Info => "#263238",
        ToastKind::Error => "#b71c1c",
    };
    set_styles(
        &toast,
        &[
            ("position", "fixed"),
            ("right", "16px"),
            ("bottom", "16px"),
            ("z-index", "2147483647"),
            ("max-width", "360px"),
            ("padding", "10px 14px"),
            ("border-radius", "6px"),
            ("font", "13px/1.4 system-ui, sans-serif"),
            ("color", "#ffffff"),
            ("background", background),
            ("box-shadow", "0 2px 10px rgba(0, 0, 0, 0.3)"),
        ],
    )?;
    toast.set_text_content(Some(message));

    let mut field = None;
    if let Some(text) = manual_copy {
        let input: HtmlInputElement = create(document, "input")?;
        input.set_read_only(true);
        input.set_value(text);
        set_styles(
            &input,
            &[
                ("display", "block"),
                ("width", "100%"),
                ("margin-top", "6px"),
                ("box-sizing", "border-box"),
                ("font", "12px monospace"),
            ],
        )?;
        toast.append_child(&input)?;
        field = Some(input);
    }

    append_to_body(document, &toast)?;
    if let Some(input) = field {
        let _ = input.focus();
        input.select();
    }

    let lifetime = if manual_copy.is_some() {
        FALLBACK_TOAST_MS
    } else {
        TOAST_MS
    };
    let remove = Closure::once_into_js(move || toast.remove());
    window.set_timeout_with_callback_and_timeout_and_arguments_0(
        remove.unchecked_ref(),
        lifetime,
    )?;
    Ok(())
}

/// Logs instead of failing when the toast itself cannot be shown.
pub fn show(kind: ToastKind, message: &str, manual_copy: Option<&str>) {
    let shown = crate::dom::window().and_then(|window| {
        let document = crate::dom::document(&window)?;
        toast(&window, &document, kind, message, manual_copy)
    });
    if let Err(err) = shown {
        log::warn!("could not show notification {message:?}: {err:?}");
    }
}
