// src/openlayers.rs
//
// Bindings to the OpenLayers build the host page loads as the global `ol`.
// Only the handful of classes needed for a tile map with one marker.

use crate::exif_data::GpsCoordinate;
use crate::location::MapBackend;
use crate::viewer_config::MapSettings;
use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["ol", "proj"], js_name = fromLonLat, catch)]
    fn from_lon_lat(coordinate: &Array) -> Result<Array, JsValue>;

    #[wasm_bindgen(js_namespace = ol, js_name = Map)]
    pub type OlMap;

    #[wasm_bindgen(constructor, js_namespace = ol, js_class = "Map", catch)]
    fn new(options: &Object) -> Result<OlMap, JsValue>;

    #[wasm_bindgen(method, js_name = setTarget)]
    fn set_target(this: &OlMap, target: &JsValue);

    #[wasm_bindgen(js_namespace = ol, js_name = View)]
    type OlView;

    #[wasm_bindgen(constructor, js_namespace = ol, js_class = "View", catch)]
    fn new(options: &Object) -> Result<OlView, JsValue>;

    #[wasm_bindgen(js_namespace = ol, js_name = Feature)]
    type OlFeature;

    #[wasm_bindgen(constructor, js_namespace = ol, js_class = "Feature", catch)]
    fn new(options: &Object) -> Result<OlFeature, JsValue>;

    #[wasm_bindgen(method, js_name = setStyle)]
    fn set_style(this: &OlFeature, style: &OlStyle);
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["ol", "geom"], js_name = Point)]
    type OlPoint;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "geom"], js_class = "Point", catch)]
    fn new(coordinates: &Array) -> Result<OlPoint, JsValue>;
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["ol", "layer"], js_name = Tile)]
    type OlTileLayer;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "layer"], js_class = "Tile", catch)]
    fn new(options: &Object) -> Result<OlTileLayer, JsValue>;

    #[wasm_bindgen(js_namespace = ["ol", "layer"], js_name = Vector)]
    type OlVectorLayer;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "layer"], js_class = "Vector", catch)]
    fn new(options: &Object) -> Result<OlVectorLayer, JsValue>;
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["ol", "source"], js_name = XYZ)]
    type OlXyzSource;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "source"], js_class = "XYZ", catch)]
    fn new(options: &Object) -> Result<OlXyzSource, JsValue>;

    #[wasm_bindgen(js_namespace = ["ol", "source"], js_name = Vector)]
    type OlVectorSource;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "source"], js_class = "Vector", catch)]
    fn new(options: &Object) -> Result<OlVectorSource, JsValue>;
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["ol", "style"], js_name = Style)]
    type OlStyle;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "style"], js_class = "Style", catch)]
    fn new(options: &Object) -> Result<OlStyle, JsValue>;

    #[wasm_bindgen(js_namespace = ["ol", "style"], js_name = Icon)]
    type OlIcon;

    #[wasm_bindgen(constructor, js_namespace = ["ol", "style"], js_class = "Icon", catch)]
    fn new(options: &Object) -> Result<OlIcon, JsValue>;
}

fn options<const N: usize>(entries: [(&str, JsValue); N]) -> Result<Object, JsValue> {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &JsValue::from_str(key), &value)?;
    }
    Ok(object)
}

/// Tile layer plus a one-feature marker layer, centered on the projected
/// coordinate.
fn build_map(
    target: &HtmlElement,
    coordinate: GpsCoordinate,
    settings: &MapSettings,
) -> Result<OlMap, JsValue> {
    let center = from_lon_lat(&Array::of2(
        &JsValue::from(coordinate.longitude),
        &JsValue::from(coordinate.latitude),
    ))?;

    let icon = OlIcon::new(&options([
        ("src", JsValue::from(settings.marker_icon_url())),
        (
            "anchor",
            JsValue::from(Array::of2(
                &JsValue::from(settings.marker_anchor[0]),
                &JsValue::from(settings.marker_anchor[1]),
            )),
        ),
    ])?)?;
    let style = OlStyle::new(&options([("image", JsValue::from(icon))])?)?;

    let point = OlPoint::new(&center)?;
    let marker = OlFeature::new(&options([("geometry", JsValue::from(point))])?)?;
    marker.set_style(&style);

    let marker_source = OlVectorSource::new(&options([(
        "features",
        JsValue::from(Array::of1(&JsValue::from(marker))),
    )])?)?;
    let marker_layer = OlVectorLayer::new(&options([("source", JsValue::from(marker_source))])?)?;

    let tile_source = OlXyzSource::new(&options([(
        "url",
        JsValue::from(settings.tile_url.as_str()),
    )])?)?;
    let tile_layer = OlTileLayer::new(&options([("source", JsValue::from(tile_source))])?)?;

    let view = OlView::new(&options([
        ("center", JsValue::from(center)),
        ("zoom", JsValue::from(settings.zoom)),
    ])?)?;

    OlMap::new(&options([
        ("target", JsValue::from(target.clone())),
        (
            "layers",
            JsValue::from(Array::of2(
                &JsValue::from(tile_layer),
                &JsValue::from(marker_layer),
            )),
        ),
        ("view", JsValue::from(view)),
    ])?)
}

/// `MapBackend` over OpenLayers, bound to a container element.
pub struct OlBackend;

impl MapBackend for OlBackend {
    type Target = HtmlElement;
    type Map = OlMap;

    fn create(
        &self,
        target: &HtmlElement,
        coordinate: GpsCoordinate,
        settings: &MapSettings,
    ) -> Option<OlMap> {
        match build_map(target, coordinate, settings) {
            Ok(map) => {
                log::info!("Map created at {}", coordinate);
                Some(map)
            }
            Err(e) => {
                log::error!("Failed to create map: {:?}", e);
                None
            }
        }
    }

    fn release(&self, map: OlMap) {
        map.set_target(&JsValue::UNDEFINED);
    }
}
