use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    CanvasRenderingContext2d, CustomEvent, CustomEventInit, Document, Event, HtmlCanvasElement,
    KeyboardEvent, PointerEvent, Window,
};

use pagemark_shared::{
    storage_key, ConfirmChoice, ConfirmRequest, CoordinateMapper, DocPoint, Effect,
    FrameCoalescer, InputEvent, PersistenceAdapter, Session, ShareRequest, ShareResponse,
    StylePatch, Tool, ViewportMeta, ViewportPoint,
};

use crate::config::OverlayConfig;
use crate::dom::{append_to_body, create, is_editable_target, set_styles, Listeners};
use crate::metrics::CanvasTextMetrics;
use crate::net::{copy_to_clipboard, notify_deactivated, post_share};
use crate::notify::{self, ToastKind};
use crate::prompt::TextPrompt;
use crate::render::{repaint, Surface};
use crate::storage::BrowserStore;

pub const TOOL_CHANGE_EVENT: &str = "pagemark:toolchange";
pub const STYLE_PANEL_CLOSE_EVENT: &str = "pagemark:stylepanelclose";

thread_local! {
    static OVERLAY: RefCell<Option<Overlay>> = const { RefCell::new(None) };
}

type Shared = Rc<RefCell<Runtime>>;

/// Everything one activation owns. Built fresh on activation and dropped on
/// deactivation.
struct Runtime {
    window: Window,
    document: Document,
    config: OverlayConfig,
    session: Session,
    mapper: CoordinateMapper,
    surface: Surface,
    metrics: CanvasTextMetrics,
    frames: FrameCoalescer<DocPoint>,
    prompt: Option<TextPrompt>,
    persistence: Option<PersistenceAdapter<BrowserStore>>,
    active_pointer: Option<i32>,
}

struct Overlay {
    runtime: Shared,
    listeners: Listeners,
}

fn scroll_offset(window: &Window) -> (f64, f64) {
    (
        window.scroll_x().unwrap_or(0.0),
        window.scroll_y().unwrap_or(0.0),
    )
}

impl Runtime {
    fn sync_scroll(&mut self) {
        let (x, y) = scroll_offset(&self.window);
        self.mapper.set_scroll(x, y);
    }

    fn to_document(&mut self, event: &PointerEvent) -> DocPoint {
        self.sync_scroll();
        self.mapper.to_document(ViewportPoint::new(
            event.client_x() as f64,
            event.client_y() as f64,
        ))
    }

    fn repaint(&self) {
        repaint(&self.surface, &self.session, &self.mapper, &self.metrics);
    }

    fn resize(&mut self) {
        let (left, top) = self.surface.resize(&self.window);
        self.mapper.set_surface_offset(left, top);
        self.sync_scroll();
    }

    fn set_cursor(&self, css: &str) {
        if let Err(err) = self.surface.canvas.style().set_property("cursor", css) {
            log::debug!("could not set cursor {css}: {err:?}");
        }
    }

    /// Fire-and-forget write of the current scene.
    fn persist(&self) {
        let Some(adapter) = self.persistence.clone() else {
            return;
        };
        let annotations = self.session.scene().to_vec();
        spawn_local(async move {
            if let Err(err) = adapter.save(&annotations).await {
                log::warn!("could not save annotations: {err}");
            }
        });
    }

    fn share_request(&self) -> ShareRequest {
        let (scroll_x, scroll_y) = scroll_offset(&self.window);
        ShareRequest {
            scene: self.session.scene().to_vec(),
            viewport: ViewportMeta {
                width: self.surface.width,
                height: self.surface.height,
                scroll_x,
                scroll_y,
            },
        }
    }
}

/// Feeds `event` to the session and carries out the effects, including any
/// follow-up events they produce. Repaints at most once per call.
fn dispatch(runtime: &Shared, event: InputEvent) {
    let mut queue = VecDeque::from([event]);
    let mut needs_repaint = false;
    while let Some(event) = queue.pop_front() {
        let effects = {
            let mut guard = runtime.borrow_mut();
            let rt = &mut *guard;
            rt.session.handle(event, &rt.metrics)
        };
        for effect in effects {
            match effect {
                Effect::Repaint => needs_repaint = true,
                other => apply_effect(runtime, other, &mut queue),
            }
        }
    }
    if needs_repaint {
        runtime.borrow().repaint();
    }
}

fn apply_effect(runtime: &Shared, effect: Effect, queue: &mut VecDeque<InputEvent>) {
    match effect {
        Effect::Repaint => runtime.borrow().repaint(),
        Effect::Persist => runtime.borrow().persist(),
        Effect::SetCursor(cursor) => runtime.borrow().set_cursor(cursor.css()),
        Effect::OpenTextPrompt { at } => {
            if let Err(err) = open_prompt(runtime, at) {
                log::warn!("could not open text prompt: {err:?}");
                queue.push_back(InputEvent::TextPromptDismissed);
            }
        }
        Effect::CloseTextPrompt { commit } => {
            let prompt = runtime.borrow_mut().prompt.take();
            if let Some(prompt) = prompt {
                let (at, text) = (prompt.at(), prompt.value());
                prompt.close();
                if commit {
                    queue.push_back(InputEvent::TextCommitted { at, text });
                }
            }
        }
        Effect::CloseStylePanel => {
            let window = runtime.borrow().window.clone();
            announce(&window, STYLE_PANEL_CLOSE_EVENT, None);
        }
        Effect::RequestConfirm(request) => {
            let window = runtime.borrow().window.clone();
            queue.push_back(confirm(&window, request));
        }
        Effect::ToolChanged(tool) => {
            let window = runtime.borrow().window.clone();
            announce(&window, TOOL_CHANGE_EVENT, Some(tool.name()));
        }
        // Deferred so that no listener is torn down while it is running.
        Effect::Deactivate => spawn_local(async {
            deactivate();
        }),
    }
}

fn confirm(window: &Window, request: ConfirmRequest) -> InputEvent {
    let ask = |message: &str| window.confirm_with_message(message).unwrap_or(false);
    let choice = match request {
        ConfirmRequest::ClearAll => {
            ask("Clear all annotations on this page?").then_some(ConfirmChoice::ClearAll)
        }
        ConfirmRequest::DeleteSelectedOrClearAll => {
            if ask("Delete the selected annotation?") {
                Some(ConfirmChoice::DeleteSelected)
            } else {
                ask("Clear all annotations on this page instead?")
                    .then_some(ConfirmChoice::ClearAll)
            }
        }
    };
    match choice {
        Some(choice) => InputEvent::Confirmed(choice),
        None => InputEvent::ConfirmCancelled,
    }
}

fn announce(window: &Window, name: &str, detail: Option<&str>) {
    let init = CustomEventInit::new();
    if let Some(detail) = detail {
        init.set_detail(&JsValue::from_str(detail));
    }
    match CustomEvent::new_with_event_init_dict(name, &init) {
        Ok(event) => {
            let _ = window.dispatch_event(&event);
        }
        Err(err) => log::warn!("could not announce {name}: {err:?}"),
    }
}

fn open_prompt(runtime: &Shared, at: DocPoint) -> Result<(), JsValue> {
    let (document, position, style) = {
        let rt = runtime.borrow();
        (
            rt.document.clone(),
            rt.mapper.to_viewport(at),
            rt.session.style().clone(),
        )
    };
    let submit_target = Rc::downgrade(runtime);
    let cancel_target = Rc::downgrade(runtime);
    let prompt = TextPrompt::open(
        &document,
        at,
        position,
        &style,
        move |text| {
            let target = submit_target.clone();
            spawn_local(async move {
                let Some(runtime) = target.upgrade() else {
                    return;
                };
                let prompt = runtime.borrow_mut().prompt.take();
                drop(prompt);
                dispatch(&runtime, InputEvent::TextCommitted { at, text });
            });
        },
        move || {
            let target = cancel_target.clone();
            spawn_local(async move {
                if let Some(runtime) = target.upgrade() {
                    dispatch(&runtime, InputEvent::Cancel);
                }
            });
        },
    )?;
    runtime.borrow_mut().prompt = Some(prompt);
    Ok(())
}

fn flush_pending_move(runtime: &Shared) {
    let pending = runtime.borrow_mut().frames.flush();
    if let Some(point) = pending {
        dispatch(runtime, InputEvent::PointerMove(point));
    }
}

fn schedule_frame(runtime: &Shared) {
    let target = Rc::downgrade(runtime);
    let callback = Closure::once_into_js(move |_: f64| {
        let Some(runtime) = target.upgrade() else {
            return;
        };
        let pending = runtime.borrow_mut().frames.take();
        if let Some(point) = pending {
            dispatch(&runtime, InputEvent::PointerMove(point));
        }
    });
    let window = runtime.borrow().window.clone();
    if let Err(err) = window.request_animation_frame(callback.unchecked_ref()) {
        log::warn!("requestAnimationFrame failed: {err:?}");
        runtime.borrow_mut().frames.reset();
    }
}

fn on_pointer_down(runtime: &Shared, event: &PointerEvent) {
    if event.button() != 0 {
        return;
    }
    event.prevent_default();
    let (point, canvas) = {
        let mut rt = runtime.borrow_mut();
        rt.active_pointer = Some(event.pointer_id());
        (rt.to_document(event), rt.surface.canvas.clone())
    };
    let _ = canvas.set_pointer_capture(event.pointer_id());
    flush_pending_move(runtime);
    dispatch(runtime, InputEvent::PointerDown(point));
}

fn on_pointer_move(runtime: &Shared, event: &PointerEvent) {
    let needs_frame = {
        let mut rt = runtime.borrow_mut();
        let point = rt.to_document(event);
        rt.frames.push(point)
    };
    if needs_frame {
        schedule_frame(runtime);
    }
}

fn on_pointer_up(runtime: &Shared, event: &PointerEvent) {
    let (point, canvas) = {
        let mut rt = runtime.borrow_mut();
        if rt.active_pointer != Some(event.pointer_id()) {
            return;
        }
        rt.active_pointer = None;
        (rt.to_document(event), rt.surface.canvas.clone())
    };
    let _ = canvas.release_pointer_capture(event.pointer_id());
    flush_pending_move(runtime);
    dispatch(runtime, InputEvent::PointerUp(point));
}

fn on_pointer_cancel(runtime: &Shared, event: &PointerEvent) {
    let in_gesture = {
        let mut rt = runtime.borrow_mut();
        if rt.active_pointer != Some(event.pointer_id()) {
            return;
        }
        rt.active_pointer = None;
        rt.frames.reset();
        !rt.session.gesture().is_idle()
    };
    if in_gesture {
        dispatch(runtime, InputEvent::Cancel);
    }
}

fn on_key_down(runtime: &Shared, event: &KeyboardEvent) {
    match event.key().as_str() {
        "Escape" => {
            event.prevent_default();
            dispatch(runtime, InputEvent::Cancel);
        }
        "Delete" | "Backspace" if !is_editable_target(event.target()) => {
            event.prevent_default();
            dispatch(runtime, InputEvent::Delete);
        }
        _ => {}
    }
}

fn create_surface(document: &Document) -> Result<Surface, JsValue> {
    let canvas: HtmlCanvasElement = create(document, "canvas")?;
    canvas.set_attribute("data-pagemark", "surface")?;
    set_styles(
        &canvas,
        &[
            ("position", "fixed"),
            ("left", "0"),
            ("top", "0"),
            ("width", "100vw"),
            ("height", "100vh"),
            ("margin", "0"),
            ("z-index", "2147483646"),
            ("touch-action", "none"),
            ("cursor", "default"),
        ],
    )?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    append_to_body(document, &canvas)?;
    Ok(Surface {
        canvas,
        ctx,
        width: 0.0,
        height: 0.0,
    })
}

fn open_persistence(
    window: &Window,
    config: &OverlayConfig,
) -> Option<PersistenceAdapter<BrowserStore>> {
    let location = window.location();
    let origin = location.origin().unwrap_or_default();
    let path = location.pathname().unwrap_or_default();
    match BrowserStore::detect(window) {
        Ok(store) => {
            let key = storage_key(&config.storage_prefix, &origin, &path);
            log::debug!("annotations stored under {key}");
            Some(PersistenceAdapter::new(store, key))
        }
        Err(err) => {
            log::warn!("annotations will not be saved: {err}");
            None
        }
    }
}

fn install_listeners(runtime: &Shared) -> Result<Listeners, JsValue> {
    let (window, canvas) = {
        let rt = runtime.borrow();
        (rt.window.clone(), rt.surface.canvas.clone())
    };
    let mut listeners = Listeners::new();

    let rt = runtime.clone();
    listeners.add(&canvas, "pointerdown", false, move |event: PointerEvent| {
        on_pointer_down(&rt, &event)
    })?;
    let rt = runtime.clone();
    listeners.add(&canvas, "pointermove", false, move |event: PointerEvent| {
        on_pointer_move(&rt, &event)
    })?;
    let rt = runtime.clone();
    listeners.add(&canvas, "pointerup", false, move |event: PointerEvent| {
        on_pointer_up(&rt, &event)
    })?;
    let rt = runtime.clone();
    listeners.add(&canvas, "pointercancel", false, move |event: PointerEvent| {
        on_pointer_cancel(&rt, &event)
    })?;
    let rt = runtime.clone();
    listeners.add(&window, "keydown", false, move |event: KeyboardEvent| {
        on_key_down(&rt, &event)
    })?;
    let rt = runtime.clone();
    listeners.add(&window, "scroll", false, move |_: Event| {
        let mut runtime = rt.borrow_mut();
        runtime.sync_scroll();
        runtime.repaint();
    })?;
    let rt = runtime.clone();
    listeners.add(&window, "resize", false, move |_: Event| {
        let mut runtime = rt.borrow_mut();
        runtime.resize();
        runtime.repaint();
    })?;
    Ok(listeners)
}

fn load_saved(runtime: &Shared) {
    let adapter = runtime.borrow().persistence.clone();
    let Some(adapter) = adapter else {
        return;
    };
    let target = Rc::downgrade(runtime);
    spawn_local(async move {
        match adapter.load().await {
            Ok(annotations) => {
                if let Some(runtime) = target.upgrade() {
                    log::debug!("loaded {} annotations", annotations.len());
                    dispatch(&runtime, InputEvent::Loaded(annotations));
                }
            }
            Err(err) => log::warn!("could not load annotations: {err}"),
        }
    });
}

fn activate() -> Result<(), JsValue> {
    let window = crate::dom::window()?;
    let document = crate::dom::document(&window)?;
    let config = OverlayConfig::from_window(&window);
    let surface = create_surface(&document)?;
    let canvas = surface.canvas.clone();

    let built = (|| -> Result<Overlay, JsValue> {
        let metrics = CanvasTextMetrics::new(surface.ctx.clone());
        let persistence = open_persistence(&window, &config);
        let session = Session::new(config.initial_style());
        let runtime = Rc::new(RefCell::new(Runtime {
            window: window.clone(),
            document: document.clone(),
            config,
            session,
            mapper: CoordinateMapper::default(),
            surface,
            metrics,
            frames: FrameCoalescer::new(),
            prompt: None,
            persistence,
            active_pointer: None,
        }));
        {
            let mut rt = runtime.borrow_mut();
            rt.resize();
            rt.repaint();
        }
        let listeners = install_listeners(&runtime)?;
        log::debug!("overlay listening with {} handlers", listeners.len());
        load_saved(&runtime);
        Ok(Overlay { runtime, listeners })
    })();

    match built {
        Ok(overlay) => {
            OVERLAY.with(|cell| *cell.borrow_mut() = Some(overlay));
            log::info!("overlay activated");
            Ok(())
        }
        Err(err) => {
            canvas.remove();
            Err(err)
        }
    }
}

impl Overlay {
    fn teardown(mut self) {
        self.listeners.remove_all();
        let (prompt, canvas, window) = {
            let mut rt = self.runtime.borrow_mut();
            rt.frames.reset();
            (
                rt.prompt.take(),
                rt.surface.canvas.clone(),
                rt.window.clone(),
            )
        };
        drop(prompt);
        canvas.remove();
        spawn_local(async move {
            if let Err(err) = notify_deactivated(&window).await {
                log::warn!("deactivation notice was not delivered: {err:?}");
            }
        });
        log::info!("overlay deactivated");
    }
}

fn deactivate() -> bool {
    let overlay = OVERLAY.with(|cell| cell.borrow_mut().take());
    match overlay {
        Some(overlay) => {
            overlay.teardown();
            true
        }
        None => false,
    }
}

fn current_runtime() -> Option<Shared> {
    OVERLAY.with(|cell| {
        cell.borrow()
            .as_ref()
            .map(|overlay| overlay.runtime.clone())
    })
}

fn with_runtime(event: InputEvent) -> Result<(), JsValue> {
    let runtime =
        current_runtime().ok_or_else(|| JsValue::from_str("Pagemark overlay is not active"))?;
    dispatch(&runtime, event);
    Ok(())
}

/// Switches the overlay on or off and reports whether it is now active.
#[wasm_bindgen]
pub fn toggle() -> bool {
    if deactivate() {
        return false;
    }
    match activate() {
        Ok(()) => true,
        Err(err) => {
            log::error!("overlay activation failed: {err:?}");
            false
        }
    }
}

#[wasm_bindgen(js_name = isActive)]
pub fn is_active() -> bool {
    OVERLAY.with(|cell| cell.borrow().is_some())
}

#[wasm_bindgen(js_name = setTool)]
pub fn set_tool(name: &str) -> Result<(), JsValue> {
    let tool: Tool = name.parse().map_err(|err: String| JsValue::from_str(&err))?;
    with_runtime(InputEvent::SetTool(tool))
}

#[wasm_bindgen(js_name = applyStyle)]
pub fn apply_style(patch: JsValue) -> Result<(), JsValue> {
    let patch: StylePatch = serde_wasm_bindgen::from_value(patch)?;
    with_runtime(InputEvent::ApplyStyle(patch))
}

#[wasm_bindgen(js_name = setStylePanelOpen)]
pub fn set_style_panel_open(open: bool) -> Result<(), JsValue> {
    with_runtime(if open {
        InputEvent::StylePanelOpened
    } else {
        InputEvent::StylePanelClosed
    })
}

#[wasm_bindgen(js_name = requestDelete)]
pub fn request_delete() -> Result<(), JsValue> {
    with_runtime(InputEvent::Delete)
}

/// Uploads the current scene to the share service and copies the link.
#[wasm_bindgen]
pub fn share() {
    let Some(runtime) = current_runtime() else {
        notify::show(ToastKind::Error, "Pagemark is not active on this page", None);
        return;
    };
    let (window, endpoint, request) = {
        let rt = runtime.borrow();
        (
            rt.window.clone(),
            rt.config.share_endpoint.clone(),
            rt.share_request(),
        )
    };
    spawn_local(async move {
        share_scene(&window, &endpoint, &request).await;
    });
}

async fn share_scene(window: &Window, endpoint: &str, request: &ShareRequest) {
    match post_share(window, endpoint, request).await {
        Ok(ShareResponse::Success { image_url, note }) => {
            match copy_to_clipboard(window, &image_url).await {
                Ok(()) => {
                    let message = match note {
                        Some(note) => format!("Share link copied to clipboard. {note}"),
                        None => "Share link copied to clipboard.".to_string(),
                    };
                    notify::show(ToastKind::Info, &message, None);
                }
                Err(err) => {
                    log::warn!("clipboard write failed: {err:?}");
                    notify::show(
                        ToastKind::Error,
                        "Could not copy the share link. Copy it from here:",
                        Some(&image_url),
                    );
                }
            }
        }
        Ok(ShareResponse::Failure { error }) => {
            log::warn!("share rejected: {error}");
            notify::show(ToastKind::Error, &format!("Share failed: {error}"), None);
        }
        Err(err) => {
            log::warn!("share request failed: {err:?}");
            notify::show(
                ToastKind::Error,
                "Share failed: the share service could not be reached.",
                None,
            );
        }
    }
}
