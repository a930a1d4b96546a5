//! Map capability that writes Leaflet JavaScript instead of drawing. Running
//! the components over it yields the script baked into the generated page.

use serde::Serialize;
use serde_json::json;

use crate::bundle::{TileSource, ZoomControlPosition};
use crate::constants::{POPUP_MAX_WIDTH, POPUP_VIEWPORT_MARGIN};
use crate::geo::{LatLng, LatLngBounds};
use crate::map::{IconDescriptor, Listener, MapCapability, MapOptions, MarkerHandle, PopupOptions};

pub struct LeafletScript {
    lines: Vec<String>,
    marker_count: usize,
    viewport_width: u32,
    uses_providers_plugin: bool,
}

/// JSON literal safe to inline inside a `<script>` element. Angle brackets
/// only occur inside JSON strings, where the `\u` escapes decode to the same
/// text, so no markup the HTML parser reacts to survives.
fn js<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

fn icon(descriptor: &IconDescriptor) -> String {
    format!("L.icon({})", js(descriptor))
}

impl LeafletScript {
    /// `viewport_width` is the generation-time guess; the page re-runs the
    /// resize handler once loaded.
    pub fn new(viewport_width: u32) -> Self {
        Self {
            lines: Vec::new(),
            marker_count: 0,
            viewport_width,
            uses_providers_plugin: false,
        }
    }

    pub fn uses_providers_plugin(&self) -> bool {
        self.uses_providers_plugin
    }

    pub fn marker_count(&self) -> usize {
        self.marker_count
    }

    pub fn into_script(mut self) -> String {
        self.lines.push("selection.resize();".to_string());
        self.lines.join("\n")
    }

    fn push(&mut self, line: String) {
        self.lines.push(line);
    }
}

impl MapCapability for LeafletScript {
    fn set_document_title(&mut self, title: &str) {
        self.push(format!("document.title = {};", js(title)));
    }

    fn create_map(&mut self, options: &MapOptions) {
        let mut map_options = json!({
            "maxBounds": options.max_bounds,
            "maxBoundsViscosity": options.max_bounds_viscosity,
            "zoomControl": options.zoom_control,
        });
        if let Some(center) = options.center {
            map_options["center"] = json!(center);
        }
        if let Some(zoom) = options.zoom {
            map_options["zoom"] = json!(zoom);
        }
        self.push(format!("const map = L.map(\"map\", {});", js(&map_options)));

        let zooms = json!({
            "minZoom": options.tile_layer.min_zoom,
            "maxZoom": options.tile_layer.max_zoom,
        });
        let layer = match &options.tile_layer.source {
            TileSource::Template { url, attribution } => {
                let mut layer_options = zooms;
                layer_options["attribution"] = json!(attribution);
                format!("L.tileLayer({}, {}).addTo(map);", js(url), js(&layer_options))
            }
            TileSource::Provider { id, attribution } => {
                self.uses_providers_plugin = true;
                let mut layer_options = zooms;
                if let Some(attribution) = attribution {
                    layer_options["attribution"] = json!(attribution);
                }
                format!("L.tileLayer.provider({}, {}).addTo(map);", js(id), js(&layer_options))
            }
        };
        self.push(layer);

        self.push("const markers = [];".to_string());
        self.push(format!(
            "const selection = mapgen.selection(map, markers, {});",
            js(&json!({ "margin": POPUP_VIEWPORT_MARGIN, "max": POPUP_MAX_WIDTH }))
        ));
    }

    fn add_zoom_control(&mut self, position: ZoomControlPosition) {
        self.push(format!(
            "L.control.zoom({}).addTo(map);",
            js(&json!({ "position": position.as_str() }))
        ));
    }

    fn add_marker(&mut self, at: LatLng, descriptor: &IconDescriptor) -> MarkerHandle {
        let handle = MarkerHandle(self.marker_count);
        self.marker_count += 1;
        self.push(format!(
            "markers.push(L.marker({}, {{ icon: {} }}).addTo(map));",
            js(&at),
            icon(descriptor)
        ));
        handle
    }

    fn attach_icons(&mut self, marker: MarkerHandle, normal: &IconDescriptor, selected: &IconDescriptor) {
        self.push(format!(
            "mapgen.attachIcons(markers[{}], {}, {});",
            marker.0,
            icon(normal),
            icon(selected)
        ));
    }

    fn set_marker_icon(&mut self, marker: MarkerHandle, descriptor: &IconDescriptor) {
        self.push(format!("markers[{}].setIcon({});", marker.0, icon(descriptor)));
    }

    fn bind_popup(&mut self, marker: MarkerHandle, contents: &str, options: &PopupOptions) {
        self.push(format!(
            "markers[{}].bindPopup({}, {});",
            marker.0,
            js(contents),
            js(options)
        ));
    }

    fn set_popup_max_width(&mut self, marker: MarkerHandle, max_width: u32) {
        self.push(format!("markers[{}].getPopup().options.maxWidth = {};", marker.0, max_width));
    }

    fn update_popup(&mut self, marker: MarkerHandle) {
        self.push(format!("markers[{}].getPopup().update();", marker.0));
    }

    fn fit_bounds(&mut self, bounds: LatLngBounds) {
        self.push(format!("map.fitBounds({});", js(&bounds)));
    }

    fn listen(&mut self, listener: Listener) {
        let line = match listener {
            Listener::WindowResize => {
                "window.addEventListener(\"resize\", () => selection.resize());".to_string()
            }
            Listener::MapClick => "map.on(\"click\", () => selection.backgroundClick());".to_string(),
            Listener::MarkerClick(m) => format!(
                "markers[{0}].on(\"click\", (event) => selection.markerClick(markers[{0}], event));",
                m.0
            ),
        };
        self.push(line);
    }

    fn viewport_width(&self) -> u32 {
        self.viewport_width
    }
}
