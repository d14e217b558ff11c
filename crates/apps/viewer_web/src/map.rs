//! `RenderSurface` over a Mapbox GL JS map object.

use layers::layer::{PaintProperty, SourceSpec, VisualLayerSpec};
use layers::surface::{RenderSurface, SurfaceError};
use serde_json::Value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// A `mapboxgl.Map` handed over from JavaScript.
    #[wasm_bindgen(typescript_type = "mapboxgl.Map")]
    pub type MapHandle;

    #[wasm_bindgen(method, js_name = isStyleLoaded)]
    fn is_style_loaded(this: &MapHandle) -> bool;

    #[wasm_bindgen(method, js_name = getSource)]
    fn get_source(this: &MapHandle, id: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = getLayer)]
    fn get_layer(this: &MapHandle, id: &str) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = addSource)]
    fn add_source(this: &MapHandle, id: &str, source: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = removeSource)]
    fn remove_source(this: &MapHandle, id: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = addLayer)]
    fn add_layer(this: &MapHandle, layer: &JsValue, before: Option<String>) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = removeLayer)]
    fn remove_layer(this: &MapHandle, id: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setPaintProperty)]
    fn set_paint_property(this: &MapHandle, layer: &str, name: &str, value: f64) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setStyle)]
    fn set_style(this: &MapHandle, url: &str) -> Result<(), JsValue>;
}

/// `isStyleLoaded()` turns false whenever any source is still fetching, so
/// readiness is tracked as "a style is attached" instead: set on the first
/// full load or by [`MapboxSurface::mark_style_loaded`], cleared by
/// `setStyle`.
pub struct MapboxSurface {
    map: MapHandle,
    style_attached: bool,
}

impl MapboxSurface {
    pub fn new(map: MapHandle) -> Self {
        let style_attached = map.is_style_loaded();
        Self { map, style_attached }
    }

    /// Called from the map's `style.load` event.
    pub fn mark_style_loaded(&mut self) {
        self.style_attached = true;
    }
}

fn to_js(value: &Value) -> Result<JsValue, SurfaceError> {
    js_sys::JSON::parse(&value.to_string()).map_err(backend)
}

fn backend(err: JsValue) -> SurfaceError {
    let msg = err
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(&err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{err:?}"));
    SurfaceError::Backend(msg)
}

fn present(v: &JsValue) -> bool {
    !v.is_undefined() && !v.is_null()
}

impl RenderSurface for MapboxSurface {
    fn is_ready(&self) -> bool {
        self.style_attached
    }

    fn has_source(&self, id: &str) -> bool {
        present(&self.map.get_source(id))
    }

    fn has_layer(&self, id: &str) -> bool {
        present(&self.map.get_layer(id))
    }

    fn add_source(&mut self, source: &SourceSpec) -> Result<(), SurfaceError> {
        if self.has_source(&source.id) {
            return Err(SurfaceError::DuplicateSource(source.id.clone()));
        }
        let spec = to_js(&source.to_style_json())?;
        self.map.add_source(&source.id, &spec).map_err(backend)
    }

    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError> {
        if !self.has_source(id) {
            return Err(SurfaceError::SourceNotFound(id.to_string()));
        }
        self.map.remove_source(id).map_err(backend)
    }

    fn add_layer(
        &mut self,
        layer: &VisualLayerSpec,
        before: Option<&str>,
    ) -> Result<(), SurfaceError> {
        if self.has_layer(&layer.id) {
            return Err(SurfaceError::DuplicateLayer(layer.id.clone()));
        }
        if let Some(anchor) = before
            && !self.has_layer(anchor)
        {
            return Err(SurfaceError::LayerNotFound(anchor.to_string()));
        }
        let spec = to_js(&layer.to_style_json())?;
        self.map
            .add_layer(&spec, before.map(str::to_string))
            .map_err(backend)
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        if !self.has_layer(id) {
            return Err(SurfaceError::LayerNotFound(id.to_string()));
        }
        self.map.remove_layer(id).map_err(backend)
    }

    fn set_paint_property(
        &mut self,
        layer: &str,
        property: PaintProperty,
        value: f64,
    ) -> Result<(), SurfaceError> {
        if !self.has_layer(layer) {
            return Err(SurfaceError::LayerNotFound(layer.to_string()));
        }
        self.map
            .set_paint_property(layer, property.key(), value)
            .map_err(backend)
    }

    fn load_style(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.map.set_style(url).map_err(backend)?;
        self.style_attached = false;
        Ok(())
    }
}
