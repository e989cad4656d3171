//! wasm 边界的小工具（浏览器控制台日志等）。

use wasm_bindgen::JsValue;
use web_sys::console;

/// 向浏览器控制台输出一行日志。
pub fn console_log(message: &str) {
    console::log_1(&JsValue::from_str(message));
}
