use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, EventTarget, HtmlElement, Window};

pub fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))
}

pub fn document(window: &Window) -> Result<Document, JsValue> {
    window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))
}

pub fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T, JsValue> {
    document
        .create_element(tag)?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {tag}")))
}

pub fn set_styles(element: &HtmlElement, properties: &[(&str, &str)]) -> Result<(), JsValue> {
    let style = element.style();
    for (name, value) in properties {
        style.set_property(name, value)?;
    }
    Ok(())
}

pub fn append_to_body(document: &Document, element: &Element) -> Result<(), JsValue> {
    let parent: Element = match document.body() {
        Some(body) => body.into(),
        None => document
            .document_element()
            .ok_or_else(|| JsValue::from_str("Missing document element"))?,
    };
    parent.append_child(element)?;
    Ok(())
}

/// True when the keyboard event target is something the user types into.
pub fn is_editable_target(target: Option<EventTarget>) -> bool {
    let Some(element) = target.and_then(|target| target.dyn_into::<HtmlElement>().ok()) else {
        return false;
    };
    if element.is_content_editable() {
        return true;
    }
    matches!(
        element.tag_name().to_ascii_lowercase().as_str(),
        "input" | "textarea" | "select"
    )
}

struct Registration {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
    capture: bool,
}

/// Event listeners owned by one overlay instance. Everything registered here
/// is detached again by [`Listeners::remove_all`] or on drop.
#[derive(Default)]
pub struct Listeners {
    registered: Vec<Registration>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<E, F>(
        &mut self,
        target: &EventTarget,
        kind: &'static str,
        capture: bool,
        mut handler: F,
    ) -> Result<(), JsValue>
    where
        E: JsCast,
        F: FnMut(E) + 'static,
    {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            if let Ok(event) = event.dyn_into::<E>() {
                handler(event);
            }
        });
        target.add_event_listener_with_callback_and_bool(
            kind,
            callback.as_ref().unchecked_ref(),
            capture,
        )?;
        self.registered.push(Registration {
            target: target.clone(),
            kind,
            callback,
            capture,
        });
        Ok(())
    }

    pub fn remove_all(&mut self) {
        for registration in self.registered.drain(..) {
            let _ = registration.target.remove_event_listener_with_callback_and_bool(
                registration.kind,
                registration.callback.as_ref().unchecked_ref(),
                registration.capture,
            );
        }
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }
}

impl Drop for Listeners {
    fn drop(&mut self) {
        self.remove_all();
    }
}
