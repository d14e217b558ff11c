use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use formats::observations::{Observation, parse_observations, realm_observations_url};
use foundation::bounds::BoundingBox;
use foundation::polygon::BoundaryPolygon;
use layers::boundary::BoundarySource;
use layers::surface::SharedSurface;
use overlay::{MapOverlay, OverlayConfig, OverlayError, ReattachStatus, SessionState};

mod map;
mod scheduler;
use map::{MapHandle, MapboxSurface};
use scheduler::BrowserScheduler;

thread_local! {
    static CONFIG: RefCell<OverlayConfig> = RefCell::new(OverlayConfig::default());
    static OVERLAY: RefCell<Option<MapOverlay>> = const { RefCell::new(None) };
    static SURFACE: RefCell<Option<Rc<RefCell<MapboxSurface>>>> = const { RefCell::new(None) };
}

fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

fn to_js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn session_name(state: SessionState) -> String {
    match state {
        SessionState::Absent => "absent".to_string(),
        SessionState::Active => "active".to_string(),
    }
}

fn status_name(status: ReattachStatus) -> String {
    match status {
        ReattachStatus::Idle => "idle".to_string(),
        ReattachStatus::Waiting { attempt } => format!("waiting:{attempt}"),
        ReattachStatus::Attached => "attached".to_string(),
        ReattachStatus::Failed { attempts } => format!("failed:{attempts}"),
    }
}

/// Runs `f` on the attached overlay. The handle is cloned out first so
/// callbacks fired during `f` can reach the overlay too.
fn with_overlay<T>(f: impl FnOnce(&MapOverlay) -> Result<T, OverlayError>) -> Result<T, JsValue> {
    let overlay = OVERLAY
        .with(|o| o.borrow().clone())
        .ok_or_else(|| JsValue::from_str("no map attached; call attach_map first"))?;
    f(&overlay).map_err(to_js_err)
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Replaces the overlay configuration with a JSON document. Takes effect on
/// the next `attach_map`.
#[wasm_bindgen]
pub fn configure(json: &str) -> Result<(), JsValue> {
    let config = OverlayConfig::from_json_str(json).map_err(to_js_err)?;
    CONFIG.with(|c| *c.borrow_mut() = config);
    Ok(())
}

/// Binds the overlay to a `mapboxgl.Map`. Call `on_style_loaded` from the
/// map's `style.load` event.
#[wasm_bindgen]
pub fn attach_map(map: JsValue) -> Result<(), JsValue> {
    let mapbox = Rc::new(RefCell::new(MapboxSurface::new(map.unchecked_into::<MapHandle>())));
    let surface: SharedSurface = mapbox.clone();
    let config = CONFIG.with(|c| c.borrow().clone());
    let overlay = MapOverlay::new(surface, Rc::new(BrowserScheduler::new()), config).map_err(to_js_err)?;
    SURFACE.with(|s| *s.borrow_mut() = Some(mapbox));
    let previous = OVERLAY.with(|o| o.borrow_mut().replace(overlay));
    if let Some(previous) = previous {
        previous.hide_boundary();
    }
    Ok(())
}

#[wasm_bindgen]
pub fn show_bounds(west: f64, south: f64, east: f64, north: f64) -> Result<String, JsValue> {
    let bounds = BoundingBox::from_corners([[west, south], [east, north]])
        .ok_or_else(|| JsValue::from_str("bounds must be finite"))?;
    with_overlay(|o| o.show_boundary(BoundarySource::Bounds(bounds))).map(session_name)
}

/// `ring` is a JSON array of `[lon, lat]` pairs.
#[wasm_bindgen]
pub fn show_polygon(ring: &str) -> Result<String, JsValue> {
    let polygon: BoundaryPolygon = serde_json::from_str(ring).map_err(to_js_err)?;
    with_overlay(|o| o.show_boundary(BoundarySource::Polygon(polygon))).map(session_name)
}

#[wasm_bindgen]
pub fn hide_boundary() -> Result<(), JsValue> {
    with_overlay(|o| {
        o.hide_boundary();
        Ok(())
    })
}

#[wasm_bindgen]
pub fn switch_basemap(name: &str) -> Result<(), JsValue> {
    with_overlay(|o| o.switch_basemap(name))
}

/// Returns the reattach status: `attached`, `waiting:N` or `failed:N`.
#[wasm_bindgen]
pub fn on_style_loaded() -> Result<String, JsValue> {
    SURFACE.with(|s| {
        if let Some(surface) = s.borrow().as_ref() {
            surface.borrow_mut().mark_style_loaded();
        }
    });
    with_overlay(|o| Ok(o.on_style_loaded())).map(status_name)
}

#[wasm_bindgen]
pub fn reattach_status() -> Result<String, JsValue> {
    with_overlay(|o| Ok(o.reattach_status())).map(status_name)
}

/// Fetches a realm's observations, then shows markers and their boundary.
#[wasm_bindgen]
pub fn load_realm(realm: String) {
    spawn_local(async move {
        let observations = match fetch_realm(&realm).await {
            Ok(o) => o,
            Err(err) => {
                log(&format!("Failed to fetch realm {realm}: {err:?}"));
                return;
            }
        };
        match with_overlay(|o| o.set_observations(&observations)) {
            Ok(state) => log(&format!(
                "realm {realm}: {} observations, boundary {}",
                observations.len(),
                session_name(state)
            )),
            Err(err) => log(&format!("Failed to show realm {realm}: {err:?}")),
        }
    });
}

async fn fetch_realm(realm: &str) -> Result<Vec<Observation>, JsValue> {
    let settings = CONFIG.with(|c| c.borrow().observations.clone());
    if settings.api_base.is_empty() {
        return Err(JsValue::from_str("observations.api_base is not configured"));
    }
    let url = realm_observations_url(&settings.api_base, realm, settings.per_page).map_err(to_js_err)?;
    let resp = Request::get(&url).send().await.map_err(to_js_err)?;
    if !resp.ok() {
        return Err(JsValue::from_str(&format!("{url} returned {}", resp.status())));
    }
    let text = resp.text().await.map_err(to_js_err)?;
    parse_observations(&text).map_err(to_js_err)
}
