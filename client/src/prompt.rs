use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::JsValue;
use web_sys::{Document, Event, HtmlTextAreaElement, KeyboardEvent};

use pagemark_shared::{DocPoint, Style, ViewportPoint};

use crate::dom::{append_to_body, create, set_styles, Listeners};

/// Floating text field opened by the text tool. Enter or losing focus
/// submits, Escape cancels, Shift+Enter inserts a line break.
pub struct TextPrompt {
    element: HtmlTextAreaElement,
    at: DocPoint,
    closed: Rc<Cell<bool>>,
    listeners: Listeners,
}

impl TextPrompt {
    pub fn open(
        document: &Document,
        at: DocPoint,
        position: ViewportPoint,
        style: &Style,
        on_submit: impl Fn(String) + 'static,
        on_cancel: impl Fn() + 'static,
    ) -> Result<Self, JsValue> {
        let element: HtmlTextAreaElement = create(document, "textarea")?;
        element.set_attribute("data-pagemark", "text-prompt")?;
        element.set_rows(1);
        let font = format!("{}px {}", style.font_size, style.font_family);
        set_styles(
            &element,
            &[
                ("position", "fixed"),
                ("left", format!("{}px", position.x).as_str()),
                ("top", format!("{}px", position.y).as_str()),
                ("z-index", "2147483647"),
                ("min-width", "160px"),
                ("margin", "0"),
                ("padding", "2px 4px"),
                ("border", "1px dashed rgba(33, 150, 243, 0.9)"),
                ("background", "rgba(255, 255, 255, 0.92)"),
                ("color", style.color.as_str()),
                ("font", font.as_str()),
                ("line-height", "1.4"),
                ("resize", "both"),
                ("outline", "none"),
            ],
        )?;
        append_to_body(document, &element)?;

        let closed = Rc::new(Cell::new(false));
        let on_submit = Rc::new(on_submit);
        let mut listeners = Listeners::new();
        {
            let closed = closed.clone();
            let on_submit = on_submit.clone();
            let field = element.clone();
            listeners.add(&element, "keydown", false, move |event: KeyboardEvent| {
                // Keys typed here never reach the page or the overlay shortcuts.
                event.stop_propagation();
                match event.key().as_str() {
                    "Enter" if !event.shift_key() => {
                        event.prevent_default();
                        if !closed.replace(true) {
                            on_submit(field.value());
                        }
                    }
                    "Escape" => {
                        event.prevent_default();
                        if !closed.replace(true) {
                            on_cancel();
                        }
                    }
                    _ => {}
                }
            })?;
        }
        {
            let closed = closed.clone();
            let field = element.clone();
            listeners.add(&element, "blur", false, move |_: Event| {
                if !closed.replace(true) {
                    on_submit(field.value());
                }
            })?;
        }

        let _ = element.focus();
        Ok(Self {
            element,
            at,
            closed,
            listeners,
        })
    }

    pub fn at(&self) -> DocPoint {
        self.at
    }

    pub fn value(&self) -> String {
        self.element.value()
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for TextPrompt {
    /// Silences the field's own handlers before detaching it, so the blur
    /// caused by removal does not submit a second time.
    fn drop(&mut self) {
        self.closed.set(true);
        self.listeners.remove_all();
        self.element.remove();
    }
}
