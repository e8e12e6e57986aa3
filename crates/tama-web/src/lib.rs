//! Browser platform for the Tamagotchi P1 harness.
//!
//! Supplies the clock, durable store, vibrator, renderer and logger a
//! [`Session`] needs when running as WebAssembly in a page.

use tama_harness::{
    CpuCore, DurableStore, HarnessConfig, PlatformButton, Session, StoreError,
    SNAPSHOT_KEY_COUNT,
};
use wasm_bindgen::prelude::*;

pub mod clock;
pub mod logger;
pub mod platform;
pub mod storage;

pub use clock::{timestamp_from_millis, WebClock};
pub use logger::ConsoleLogger;
pub use platform::{CallbackRenderer, Frame, NavigatorVibrator};
pub use storage::{LocalStorageStore, DEFAULT_PREFIX};

/// Session wired to browser collaborators.
pub type WebSession<K> =
    Session<K, WebClock, NavigatorVibrator, LocalStorageStore, CallbackRenderer>;

/// Builds a session for `core` that persists under `prefix` and sends
/// frames to `on_frame`.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] when local storage cannot be opened.
pub fn web_session<K: CpuCore>(
    core: K,
    config: HarnessConfig,
    prefix: &str,
    on_frame: js_sys::Function,
) -> Result<WebSession<K>, StoreError> {
    let store = LocalStorageStore::open(prefix)?;
    Ok(Session::new(
        config,
        core,
        WebClock,
        NavigatorVibrator,
        store,
        CallbackRenderer::new(on_frame),
    ))
}

/// Reads a [`HarnessConfig`] from a page object; missing input yields the
/// defaults.
///
/// # Errors
///
/// Returns the deserialization error when the object has the wrong shape.
pub fn parse_config(value: JsValue) -> Result<HarnessConfig, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(HarnessConfig::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(Into::into)
}

/// Maps a page button name to a watch button.
#[must_use]
pub fn platform_button(name: &str) -> Option<PlatformButton> {
    match name {
        "up" => Some(PlatformButton::Up),
        "select" => Some(PlatformButton::Select),
        "down" => Some(PlatformButton::Down),
        "back" => Some(PlatformButton::Back),
        _ => None,
    }
}

/// Installs the panic hook and console logger.
#[wasm_bindgen]
pub fn init(level: Option<String>) {
    console_error_panic_hook::set_once();
    logger::install(logger::parse_level(level.as_deref()));
}

/// Returns the default harness configuration as a plain object.
///
/// # Errors
///
/// Returns the serialization error, which should not happen.
#[wasm_bindgen(js_name = defaultConfig)]
pub fn default_config() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&HarnessConfig::default()).map_err(Into::into)
}

/// Returns `true` when a snapshot version entry exists under `prefix`.
///
/// # Errors
///
/// Returns an error string when local storage cannot be opened.
#[wasm_bindgen(js_name = hasSnapshot)]
pub fn has_snapshot(prefix: Option<String>) -> Result<bool, JsValue> {
    let store = open_store(prefix)?;
    Ok(store.exists(tama_harness::VERSION_KEY))
}

/// Deletes every snapshot entry under `prefix`.
///
/// # Errors
///
/// Returns an error string when local storage cannot be opened or written.
#[wasm_bindgen(js_name = clearSnapshot)]
pub fn clear_snapshot(prefix: Option<String>) -> Result<(), JsValue> {
    let mut store = open_store(prefix)?;
    for key in 0..SNAPSHOT_KEY_COUNT {
        store.delete(key).map_err(to_js_error)?;
    }
    log::info!("snapshot cleared");
    Ok(())
}

fn open_store(prefix: Option<String>) -> Result<LocalStorageStore, JsValue> {
    LocalStorageStore::open(prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_owned())).map_err(to_js_error)
}

#[allow(clippy::needless_pass_by_value)]
fn to_js_error(error: StoreError) -> JsValue {
    JsValue::from_str(&error.to_string())
}
