pub mod config;
pub mod error;
pub mod geo;
pub mod grid;
pub mod model;
pub mod secs;
pub mod sphere;
pub mod svd;
pub mod t_df;


pub use config::{GridConfig, InterpolationConfig};
pub use error::{Result, SecsError};
pub use geo::{SphericalPoint, R_EARTH};
pub use model::{
    fit, fit_with_truncation, predict, BasisSet, FitResult, ObservationSet, PredictionSet,
    SecsModel,
};
pub use secs::{secs_interpolate, ObservationVector, PredictionVector};
pub use svd::Truncation;
pub use t_df::TransferMatrix;

use wasm_bindgen::prelude::*;

/// Interpolates the observations on the default grids.
#[wasm_bindgen]
pub fn infer(js_obs: JsValue) -> std::result::Result<JsValue, JsValue> {
    infer_with_config(js_obs, JsValue::UNDEFINED)
}

/// Interpolates the observations, `js_config` being a partial [`InterpolationConfig`] or
/// `undefined`.
#[wasm_bindgen]
pub fn infer_with_config(
    js_obs: JsValue,
    js_config: JsValue,
) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let observations: Vec<ObservationVector> =
        serde_wasm_bindgen::from_value(js_obs).map_err(report)?;
    let config: InterpolationConfig = if js_config.is_undefined() || js_config.is_null() {
        InterpolationConfig::default()
    } else {
        serde_wasm_bindgen::from_value(js_config).map_err(report)?
    };

    let pred = secs_interpolate(&observations, &config).map_err(report)?;

    serde_wasm_bindgen::to_value(&pred).map_err(report)
}

/// Logs the error to the browser console and hands it back to JS as a string.
fn report(error: impl std::fmt::Display) -> JsValue {
    let message = JsValue::from_str(&error.to_string());
    web_sys::console::error_1(&message);
    message
}
