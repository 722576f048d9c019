use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Window;

use pagemark_shared::{KeyValueStore, StorageError};

/// The page's persistent string store: the extension storage area when the
/// overlay runs as a content script, `localStorage` otherwise.
#[derive(Clone, Debug)]
pub enum BrowserStore {
    Extension(JsValue),
    Local(web_sys::Storage),
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

fn extension_area(window: &Window) -> Option<JsValue> {
    let chrome = Reflect::get(window.as_ref(), &JsValue::from_str("chrome")).ok()?;
    let storage = Reflect::get(&chrome, &JsValue::from_str("storage")).ok()?;
    let local = Reflect::get(&storage, &JsValue::from_str("local")).ok()?;
    (!local.is_undefined() && !local.is_null()).then_some(local)
}

fn method(target: &JsValue, name: &str) -> Result<Function, JsValue> {
    Reflect::get(target, &JsValue::from_str(name))?
        .dyn_into::<Function>()
        .map_err(|_| JsValue::from_str(&format!("storage.{name} is not callable")))
}

async fn call_async(target: &JsValue, name: &str, arg: &JsValue) -> Result<JsValue, JsValue> {
    let promise: Promise = method(target, name)?.call1(target, arg)?.dyn_into()?;
    JsFuture::from(promise).await
}

impl BrowserStore {
    pub fn detect(window: &Window) -> Result<Self, StorageError> {
        if let Some(area) = extension_area(window) {
            log::debug!("using extension storage");
            return Ok(BrowserStore::Extension(area));
        }
        match window.local_storage() {
            Ok(Some(storage)) => Ok(BrowserStore::Local(storage)),
            Ok(None) => Err(StorageError::Unavailable("no localStorage".into())),
            Err(err) => Err(StorageError::Unavailable(describe(&err))),
        }
    }
}

#[async_trait(?Send)]
impl KeyValueStore for BrowserStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            BrowserStore::Extension(area) => {
                let items = call_async(area, "get", &JsValue::from_str(key))
                    .await
                    .map_err(|err| StorageError::Read(describe(&err)))?;
                let value = Reflect::get(&items, &JsValue::from_str(key))
                    .map_err(|err| StorageError::Read(describe(&err)))?;
                Ok(value.as_string())
            }
            BrowserStore::Local(storage) => storage
                .get_item(key)
                .map_err(|err| StorageError::Read(describe(&err))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            BrowserStore::Extension(area) => {
                let items = Object::new();
                Reflect::set(&items, &JsValue::from_str(key), &JsValue::from_str(value))
                    .map_err(|err| StorageError::Write(describe(&err)))?;
                call_async(area, "set", &items)
                    .await
                    .map_err(|err| StorageError::Write(describe(&err)))?;
                Ok(())
            }
            BrowserStore::Local(storage) => storage
                .set_item(key, value)
                .map_err(|err| StorageError::Write(describe(&err))),
        }
    }
}
