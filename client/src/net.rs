use js_sys::{Function, Object, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response, Window};

use pagemark_shared::{ShareRequest, ShareResponse};

pub const DEACTIVATED_MESSAGE: &str = "pagemark:deactivated";

/// Posts the share request and decodes whatever the service answered. Error
/// statuses still carry a `{ error }` body, so only transport failures and
/// unreadable bodies become `Err`.
pub async fn post_share(
    window: &Window,
    endpoint: &str,
    request: &ShareRequest,
) -> Result<ShareResponse, JsValue> {
    let body = serde_json::to_string(request)
        .map_err(|err| JsValue::from_str(&format!("Could not encode share request: {err}")))?;
    let init = RequestInit::new();
    init.set_method("POST");
    init.set_mode(RequestMode::Cors);
    init.set_body(&JsValue::from_str(&body));
    let request = Request::new_with_str_and_init(endpoint, &init)?;
    request.headers().set("Content-Type", "application/json")?;

    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await?
        .dyn_into()?;
    let status = response.status();
    let text = JsFuture::from(response.text()?).await?;
    let text = text.as_string().unwrap_or_default();
    serde_json::from_str::<ShareResponse>(&text).map_err(|_| {
        JsValue::from_str(&format!("Share service replied with HTTP {status}"))
    })
}

/// Tells the extension background that the overlay went away. Outside an
/// extension there is nobody to tell and this is a no-op.
pub async fn notify_deactivated(window: &Window) -> Result<(), JsValue> {
    let chrome = Reflect::get(window.as_ref(), &JsValue::from_str("chrome"))?;
    if chrome.is_undefined() {
        return Ok(());
    }
    let runtime = Reflect::get(&chrome, &JsValue::from_str("runtime"))?;
    if runtime.is_undefined() {
        return Ok(());
    }
    let Ok(send) = Reflect::get(&runtime, &JsValue::from_str("sendMessage"))?.dyn_into::<Function>()
    else {
        return Ok(());
    };
    let message = Object::new();
    Reflect::set(
        &message,
        &JsValue::from_str("type"),
        &JsValue::from_str(DEACTIVATED_MESSAGE),
    )?;
    let result = send.call1(&runtime, &message)?;
    if let Ok(promise) = result.dyn_into::<Promise>() {
        JsFuture::from(promise).await?;
    }
    Ok(())
}

pub async fn copy_to_clipboard(window: &Window, text: &str) -> Result<(), JsValue> {
    let clipboard = window.navigator().clipboard();
    JsFuture::from(clipboard.write_text(text)).await?;
    Ok(())
}
