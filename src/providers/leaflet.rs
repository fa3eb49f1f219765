//! Browser provider backed by the global Leaflet `L` namespace.
//!
//! Leaflet and its stylesheet must already be loaded on the page. Callbacks
//! from Leaflet and from the geolocation API are queued as [`MapEvent`]s;
//! the host drains them with [`LeafletProvider::drain_events`] and feeds them
//! to the map.

use crate::{
    core::{geo::LatLng, viewport::Viewport},
    input::events::{GeolocationError, MapEvent, PositionSample},
    layers::tile::TileLayerOptions,
    prelude::HashMap,
    traits::{
        CircleOptions, FeatureId, ListenerId, MapId, MapProvider, MarkerIcon, MarkerOptions,
        PopupId, WatchId,
    },
    ui::popup::PopupContent,
    MapError, Result,
};
use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};
use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    type LMap;

    #[wasm_bindgen(catch, js_namespace = L, js_name = map)]
    fn l_map(container: &str, options: &JsValue) -> std::result::Result<LMap, JsValue>;

    #[wasm_bindgen(method, js_name = getCenter)]
    fn get_center(this: &LMap) -> JsValue;

    #[wasm_bindgen(method, js_name = getZoom)]
    fn get_zoom(this: &LMap) -> f64;

    #[wasm_bindgen(method, js_name = setView)]
    fn set_view(this: &LMap, center: &JsValue, zoom: f64);

    #[wasm_bindgen(method)]
    fn on(this: &LMap, event: &str, handler: &Function);

    #[wasm_bindgen(method)]
    fn off(this: &LMap, event: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = whenReady)]
    fn when_ready(this: &LMap, callback: &Function);

    #[wasm_bindgen(method, js_name = remove)]
    fn remove_map(this: &LMap);

    type LLayer;

    #[wasm_bindgen(catch, js_namespace = L, js_name = tileLayer)]
    fn l_tile_layer(url: &str, options: &JsValue) -> std::result::Result<LLayer, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L, js_name = marker)]
    fn l_marker(position: &JsValue, options: &JsValue) -> std::result::Result<LLayer, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L, js_name = circleMarker)]
    fn l_circle_marker(position: &JsValue, options: &JsValue)
        -> std::result::Result<LLayer, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L, js_name = circle)]
    fn l_circle(position: &JsValue, options: &JsValue) -> std::result::Result<LLayer, JsValue>;

    #[wasm_bindgen(catch, js_namespace = L, js_name = popup)]
    fn l_popup(options: &JsValue) -> std::result::Result<LLayer, JsValue>;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_to(this: &LLayer, map: &LMap) -> LLayer;

    #[wasm_bindgen(method, js_name = remove)]
    fn remove_layer(this: &LLayer);

    #[wasm_bindgen(method, js_name = setLatLng)]
    fn set_lat_lng(this: &LLayer, position: &JsValue);

    #[wasm_bindgen(method, js_name = setRadius)]
    fn set_radius(this: &LLayer, radius: f64);

    #[wasm_bindgen(method, js_name = bindPopup)]
    fn bind_popup(this: &LLayer, html: &str);

    #[wasm_bindgen(method, js_name = bindTooltip)]
    fn bind_tooltip(this: &LLayer, text: &str);

    #[wasm_bindgen(method, js_name = setContent)]
    fn set_content(this: &LLayer, html: &str);

    #[wasm_bindgen(method, js_name = openOn)]
    fn open_on(this: &LLayer, map: &LMap);
}

type Callback = Closure<dyn FnMut(JsValue)>;

struct MapEntry {
    map: LMap,
    // keeps the moveend handler alive for the lifetime of the map
    _view_handler: Callback,
}

struct WatchEntry {
    browser_id: i32,
    _on_position: Callback,
    _on_error: Callback,
}

/// [`MapProvider`] for the browser using Leaflet
pub struct LeafletProvider {
    next_handle: u64,
    events: Rc<RefCell<VecDeque<MapEvent>>>,
    maps: HashMap<MapId, MapEntry>,
    layers: HashMap<FeatureId, (MapId, LLayer)>,
    popups: HashMap<PopupId, (MapId, LLayer)>,
    listeners: HashMap<ListenerId, (MapId, Callback)>,
    watches: HashMap<WatchId, WatchEntry>,
}

impl Default for LeafletProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LeafletProvider {
    pub fn new() -> Self {
        #[cfg(target_arch = "wasm32")]
        console_error_panic_hook::set_once();

        Self {
            next_handle: 1,
            events: Rc::new(RefCell::new(VecDeque::new())),
            maps: HashMap::default(),
            layers: HashMap::default(),
            popups: HashMap::default(),
            listeners: HashMap::default(),
            watches: HashMap::default(),
        }
    }

    /// Takes every callback queued since the last call, oldest first
    pub fn drain_events(&self) -> Vec<MapEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    fn next_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn map(&self, map: MapId) -> Result<&LMap> {
        self.maps
            .get(&map)
            .map(|entry| &entry.map)
            .ok_or_else(|| MapError::Provider(format!("{} does not exist", map)))
    }

    fn layer(&self, feature: FeatureId) -> Result<&LLayer> {
        self.layers
            .get(&feature)
            .map(|(_, layer)| layer)
            .ok_or_else(|| MapError::Provider(format!("{} does not exist", feature)))
    }

    fn add_layer(&mut self, map: MapId, layer: LLayer) -> Result<FeatureId> {
        layer.add_to(self.map(map)?);
        let feature = FeatureId(self.next_handle());
        self.layers.insert(feature, (map, layer));
        Ok(feature)
    }
}

fn js_error(context: &str, error: JsValue) -> MapError {
    MapError::Provider(format!("{}: {:?}", context, error))
}

fn js_lat_lng(position: LatLng) -> JsValue {
    Array::of2(&position.lat.into(), &position.lng.into()).into()
}

fn js_options(entries: &[(&str, JsValue)]) -> Result<JsValue> {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &JsValue::from_str(key), value)
            .map_err(|e| js_error("building options", e))?;
    }
    Ok(object.into())
}

fn js_number(target: &JsValue, path: &[&str]) -> Option<f64> {
    let mut value = target.clone();
    for key in path {
        value = Reflect::get(&value, &JsValue::from_str(key)).ok()?;
    }
    value.as_f64()
}

fn read_lat_lng(target: &JsValue) -> Option<LatLng> {
    Some(LatLng::new(
        js_number(target, &["lat"])?,
        js_number(target, &["lng"])?,
    ))
}

fn read_viewport(map: &LMap) -> Option<Viewport> {
    let center = read_lat_lng(&map.get_center())?;
    Some(Viewport::new(center, map.get_zoom().round().clamp(0.0, 255.0) as u8))
}

#[async_trait(?Send)]
impl MapProvider for LeafletProvider {
    fn name(&self) -> &str {
        "leaflet"
    }

    async fn create_map(&mut self, container: &str, viewport: Viewport) -> Result<MapId> {
        let options = js_options(&[
            ("center", js_lat_lng(viewport.center)),
            ("zoom", JsValue::from(viewport.zoom)),
        ])?;
        let map = l_map(container, &options).map_err(|e| js_error("L.map", e))?;

        let ready = Promise::new(&mut |resolve, _reject| map.when_ready(&resolve));
        JsFuture::from(ready)
            .await
            .map_err(|e| js_error("waiting for the map", e))?;

        let id = MapId(self.next_handle());
        let events = Rc::clone(&self.events);
        let source = map.clone();
        let view_handler = Closure::wrap(Box::new(move |_event: JsValue| {
            if let Some(viewport) = read_viewport(&source) {
                events
                    .borrow_mut()
                    .push_back(MapEvent::ViewChanged { map: id, viewport });
            }
        }) as Box<dyn FnMut(JsValue)>);
        map.on("moveend", view_handler.as_ref().unchecked_ref());

        self.maps.insert(
            id,
            MapEntry {
                map,
                _view_handler: view_handler,
            },
        );
        Ok(id)
    }

    fn destroy_map(&mut self, map: MapId) {
        let Some(entry) = self.maps.remove(&map) else {
            return;
        };
        self.layers.retain(|_, (owner, _)| *owner != map);
        self.popups.retain(|_, (owner, _)| *owner != map);
        self.listeners.retain(|_, (owner, _)| *owner != map);
        // removes every layer and handler still attached to it
        entry.map.remove_map();
    }

    fn add_tile_layer(&mut self, map: MapId, options: &TileLayerOptions) -> Result<FeatureId> {
        let js = js_options(&[
            ("minZoom", JsValue::from(options.min_zoom)),
            ("maxZoom", JsValue::from(options.max_zoom)),
            ("attribution", JsValue::from_str(&options.attribution)),
        ])?;
        let layer =
            l_tile_layer(&options.url_template, &js).map_err(|e| js_error("L.tileLayer", e))?;
        self.add_layer(map, layer)
    }

    fn viewport(&self, map: MapId) -> Result<Viewport> {
        read_viewport(self.map(map)?)
            .ok_or_else(|| MapError::Provider(format!("{} has no center", map)))
    }

    fn set_viewport(&mut self, map: MapId, viewport: Viewport) -> Result<()> {
        self.map(map)?
            .set_view(&js_lat_lng(viewport.center), f64::from(viewport.zoom));
        Ok(())
    }

    fn create_marker(&mut self, map: MapId, options: MarkerOptions) -> Result<FeatureId> {
        let position = js_lat_lng(options.position);
        let layer = match options.icon {
            MarkerIcon::Facility => l_marker(&position, &js_options(&[])?),
            MarkerIcon::Pending => l_marker(&position, &js_options(&[("opacity", JsValue::from_f64(0.7))])?),
            MarkerIcon::Position => l_circle_marker(
                &position,
                &js_options(&[
                    ("radius", JsValue::from_f64(8.0)),
                    ("color", JsValue::from_str("#ffffff")),
                    ("weight", JsValue::from_f64(2.0)),
                    ("fillColor", JsValue::from_str("#3388ff")),
                    ("fillOpacity", JsValue::from_f64(1.0)),
                ])?,
            ),
        }
        .map_err(|e| js_error("L.marker", e))?;

        if let Some(tooltip) = &options.tooltip {
            layer.bind_tooltip(tooltip);
        }
        if let Some(popup) = &options.popup {
            layer.bind_popup(&popup.to_html());
        }
        self.add_layer(map, layer)
    }

    fn create_circle(&mut self, map: MapId, options: CircleOptions) -> Result<FeatureId> {
        let js = js_options(&[
            ("radius", JsValue::from_f64(options.radius_meters)),
            ("color", JsValue::from_str(&options.color)),
            ("fillOpacity", JsValue::from_f64(f64::from(options.fill_opacity))),
            ("weight", JsValue::from_f64(1.0)),
        ])?;
        let layer = l_circle(&js_lat_lng(options.center), &js).map_err(|e| js_error("L.circle", e))?;
        self.add_layer(map, layer)
    }

    fn move_feature(&mut self, feature: FeatureId, position: LatLng) -> Result<()> {
        self.layer(feature)?.set_lat_lng(&js_lat_lng(position));
        Ok(())
    }

    fn set_circle_radius(&mut self, feature: FeatureId, radius_meters: f64) -> Result<()> {
        self.layer(feature)?.set_radius(radius_meters.max(0.0));
        Ok(())
    }

    fn remove_feature(&mut self, feature: FeatureId) {
        if let Some((_, layer)) = self.layers.remove(&feature) {
            layer.remove_layer();
        }
    }

    fn create_popup(
        &mut self,
        map: MapId,
        position: LatLng,
        content: PopupContent,
    ) -> Result<PopupId> {
        let layer = l_popup(&js_options(&[("closeOnClick", JsValue::FALSE)])?)
            .map_err(|e| js_error("L.popup", e))?;
        layer.set_lat_lng(&js_lat_lng(position));
        layer.set_content(&content.to_html());
        layer.open_on(self.map(map)?);

        let popup = PopupId(self.next_handle());
        self.popups.insert(popup, (map, layer));
        Ok(popup)
    }

    fn update_popup(
        &mut self,
        popup: PopupId,
        position: LatLng,
        content: PopupContent,
    ) -> Result<()> {
        let (map, layer) = self
            .popups
            .get(&popup)
            .ok_or_else(|| MapError::Provider(format!("{} does not exist", popup)))?;
        layer.set_lat_lng(&js_lat_lng(position));
        layer.set_content(&content.to_html());
        layer.open_on(self.map(*map)?);
        Ok(())
    }

    fn close_popup(&mut self, popup: PopupId) {
        if let Some((_, layer)) = self.popups.remove(&popup) {
            layer.remove_layer();
        }
    }

    fn listen_clicks(&mut self, map: MapId) -> Result<ListenerId> {
        let listener = ListenerId(self.next_handle());
        let events = Rc::clone(&self.events);
        let handler = Closure::wrap(Box::new(move |event: JsValue| {
            let latlng = Reflect::get(&event, &JsValue::from_str("latlng")).ok();
            if let Some(lat_lng) = latlng.as_ref().and_then(read_lat_lng) {
                events
                    .borrow_mut()
                    .push_back(MapEvent::Click { listener, lat_lng });
            }
        }) as Box<dyn FnMut(JsValue)>);

        self.map(map)?
            .on("click", handler.as_ref().unchecked_ref());
        self.listeners.insert(listener, (map, handler));
        Ok(listener)
    }

    fn unlisten(&mut self, listener: ListenerId) {
        if let Some((map, handler)) = self.listeners.remove(&listener) {
            if let Some(entry) = self.maps.get(&map) {
                entry.map.off("click", handler.as_ref().unchecked_ref());
            }
        }
    }

    fn watch_position(&mut self) -> std::result::Result<WatchId, GeolocationError> {
        let geolocation = web_sys::window()
            .and_then(|window| window.navigator().geolocation().ok())
            .ok_or(GeolocationError::Unsupported)?;

        let watch = WatchId(self.next_handle());

        let events = Rc::clone(&self.events);
        let on_position = Closure::wrap(Box::new(move |position: JsValue| {
            let lat = js_number(&position, &["coords", "latitude"]);
            let lng = js_number(&position, &["coords", "longitude"]);
            let (Some(lat), Some(lng)) = (lat, lng) else {
                return;
            };
            let accuracy = js_number(&position, &["coords", "accuracy"]).unwrap_or(0.0);
            let timestamp = js_number(&position, &["timestamp"]).unwrap_or(0.0);
            let sample = PositionSample::new(LatLng::new(lat, lng), accuracy, timestamp as u64);
            events
                .borrow_mut()
                .push_back(MapEvent::Position { watch, sample });
        }) as Box<dyn FnMut(JsValue)>);

        let events = Rc::clone(&self.events);
        let on_error = Closure::wrap(Box::new(move |error: JsValue| {
            let code = js_number(&error, &["code"]).unwrap_or(0.0) as u16;
            events.borrow_mut().push_back(MapEvent::PositionError {
                watch,
                error: GeolocationError::from_code(code),
            });
        }) as Box<dyn FnMut(JsValue)>);

        let browser_id = geolocation
            .watch_position_with_error_callback(
                on_position.as_ref().unchecked_ref(),
                Some(on_error.as_ref().unchecked_ref()),
            )
            .map_err(|e| {
                log::warn!("watchPosition failed: {:?}", e);
                GeolocationError::Unsupported
            })?;

        self.watches.insert(
            watch,
            WatchEntry {
                browser_id,
                _on_position: on_position,
                _on_error: on_error,
            },
        );
        Ok(watch)
    }

    fn clear_watch(&mut self, watch: WatchId) {
        let Some(entry) = self.watches.remove(&watch) else {
            return;
        };
        if let Some(geolocation) =
            web_sys::window().and_then(|window| window.navigator().geolocation().ok())
        {
            geolocation.clear_watch(entry.browser_id);
        }
    }
}
