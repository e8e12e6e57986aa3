use serde::{Deserialize, Serialize};
use tama_harness::{DisplaySurface, Icon, Renderer, VibePattern, Vibrator, LCD_HEIGHT};
use wasm_bindgen::JsValue;

/// Frame handed to the page once per refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// One word per matrix row, bit 31 being the leftmost pixel.
    pub rows: [u32; LCD_HEIGHT],
    /// Icons currently lit, in index order.
    pub icons: Vec<Icon>,
}

impl Frame {
    #[must_use]
    pub fn capture(surface: &DisplaySurface) -> Self {
        Self {
            rows: surface.packed_rows(),
            icons: surface.lit_icons().collect(),
        }
    }
}

/// Renderer that calls a page-supplied function with each [`Frame`].
#[derive(Debug, Clone)]
pub struct CallbackRenderer {
    callback: js_sys::Function,
    last: Option<Frame>,
}

impl CallbackRenderer {
    #[must_use]
    pub const fn new(callback: js_sys::Function) -> Self {
        Self {
            callback,
            last: None,
        }
    }
}

impl Renderer for CallbackRenderer {
    fn render(&mut self, surface: &DisplaySurface) {
        let frame = Frame::capture(surface);
        if self.last.as_ref() == Some(&frame) {
            return;
        }
        match serde_wasm_bindgen::to_value(&frame) {
            Ok(value) => {
                if let Err(error) = self.callback.call1(&JsValue::NULL, &value) {
                    log::warn!("frame callback threw: {error:?}");
                }
            }
            Err(error) => log::warn!("frame could not be serialized: {error}"),
        }
        self.last = Some(frame);
    }
}

/// Vibrator driving `navigator.vibrate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigatorVibrator;

impl NavigatorVibrator {
    fn navigator() -> Option<web_sys::Navigator> {
        web_sys::window().map(|window| window.navigator())
    }
}

impl Vibrator for NavigatorVibrator {
    fn enqueue(&mut self, pattern: &VibePattern) {
        let Some(navigator) = Self::navigator() else {
            return;
        };
        let segments: js_sys::Array = pattern
            .segments_ms()
            .iter()
            .map(|ms| JsValue::from(*ms))
            .collect();
        if !navigator.vibrate_with_pattern(&segments) {
            log::debug!("vibration pattern rejected by the browser");
        }
    }

    fn cancel(&mut self) {
        if let Some(navigator) = Self::navigator() {
            navigator.vibrate_with_duration(0);
        }
    }
}
