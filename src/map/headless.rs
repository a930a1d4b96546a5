//! In-memory map capability. Records every primitive call and mimics the
//! engine's popup handling so the controller can be driven without a browser.

use super::init::MapOptions;
use super::markers::{IconDescriptor, PopupOptions};
use super::{Listener, MapCapability, MarkerHandle};
use crate::bundle::ZoomControlPosition;
use crate::geo::{LatLng, LatLngBounds};

#[derive(Debug, Clone)]
struct HeadlessPopup {
    contents: String,
    options: PopupOptions,
    open: bool,
    /// Width applied by the last re-layout of an open popup.
    laid_out_width: Option<u32>,
}

#[derive(Debug, Clone)]
struct HeadlessMarker {
    at: LatLng,
    icon: IconDescriptor,
    variants: Option<(IconDescriptor, IconDescriptor)>,
    popup: Option<HeadlessPopup>,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessMap {
    viewport_width: u32,
    title: Option<String>,
    options: Option<MapOptions>,
    zoom_control: Option<ZoomControlPosition>,
    markers: Vec<HeadlessMarker>,
    fitted: Option<LatLngBounds>,
    listeners: Vec<Listener>,
    icon_changes: Vec<MarkerHandle>,
}

impl HeadlessMap {
    pub fn new(viewport_width: u32) -> Self {
        Self {
            viewport_width,
            ..Default::default()
        }
    }

    pub fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[cfg(test)]
    pub fn options(&self) -> Option<&MapOptions> {
        self.options.as_ref()
    }

    pub fn zoom_control(&self) -> Option<ZoomControlPosition> {
        self.zoom_control
    }

    pub fn fitted_bounds(&self) -> Option<LatLngBounds> {
        self.fitted
    }

    /// Center of the current view: the fitted box if any, else the initial center.
    pub fn view_center(&self) -> Option<LatLng> {
        match self.fitted {
            Some(bounds) => Some(bounds.center()),
            None => self.options.as_ref().and_then(|o| o.center),
        }
    }

    /// Only known for the initial view, a fitted zoom depends on projection.
    pub fn view_zoom(&self) -> Option<u8> {
        match self.fitted {
            Some(_) => None,
            None => self.options.as_ref().and_then(|o| o.zoom),
        }
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// Markers whose icon was switched, in call order.
    pub fn icon_changes(&self) -> &[MarkerHandle] {
        &self.icon_changes
    }

    pub fn marker_position(&self, marker: MarkerHandle) -> Option<LatLng> {
        self.markers.get(marker.0).map(|m| m.at)
    }

    pub fn marker_icon(&self, marker: MarkerHandle) -> Option<&IconDescriptor> {
        self.markers.get(marker.0).map(|m| &m.icon)
    }

    /// Icon variants attached for state switching, `(normal, selected)`.
    pub fn attached_icons(&self, marker: MarkerHandle) -> Option<(&IconDescriptor, &IconDescriptor)> {
        self.markers
            .get(marker.0)
            .and_then(|m| m.variants.as_ref())
            .map(|(normal, selected)| (normal, selected))
    }

    #[cfg(test)]
    pub fn has_popup(&self, marker: MarkerHandle) -> bool {
        self.popup(marker).is_some()
    }

    pub fn popup_contents(&self, marker: MarkerHandle) -> Option<&str> {
        self.popup(marker).map(|p| p.contents.as_str())
    }

    pub fn popup_max_width(&self, marker: MarkerHandle) -> Option<u32> {
        self.popup(marker).map(|p| p.options.max_width)
    }

    pub fn popup_laid_out_width(&self, marker: MarkerHandle) -> Option<u32> {
        self.popup(marker).and_then(|p| p.laid_out_width)
    }

    pub fn is_popup_open(&self, marker: MarkerHandle) -> bool {
        self.popup(marker).is_some_and(|p| p.open)
    }

    pub fn open_popups(&self) -> Vec<MarkerHandle> {
        self.markers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.popup.as_ref().is_some_and(|p| p.open))
            .map(|(i, _)| MarkerHandle(i))
            .collect()
    }

    /// What the engine does on a marker press before the click handler runs:
    /// any other open popup closes and the marker's own popup toggles.
    pub fn press_marker(&mut self, marker: MarkerHandle) {
        let was_open = self.is_popup_open(marker);
        self.close_popups();
        if !was_open {
            self.open_popup(marker);
        }
    }

    /// A press on the map background closes the open popup.
    pub fn press_background(&mut self) {
        self.close_popups();
    }

    fn open_popup(&mut self, marker: MarkerHandle) {
        if let Some(popup) = self.popup_mut(marker) {
            popup.open = true;
            popup.laid_out_width = Some(popup.options.max_width);
        }
    }

    fn close_popups(&mut self) {
        for popup in self.markers.iter_mut().filter_map(|m| m.popup.as_mut()) {
            popup.open = false;
        }
    }

    fn popup(&self, marker: MarkerHandle) -> Option<&HeadlessPopup> {
        self.markers.get(marker.0).and_then(|m| m.popup.as_ref())
    }

    fn popup_mut(&mut self, marker: MarkerHandle) -> Option<&mut HeadlessPopup> {
        self.markers.get_mut(marker.0).and_then(|m| m.popup.as_mut())
    }
}

impl MapCapability for HeadlessMap {
    fn set_document_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    fn create_map(&mut self, options: &MapOptions) {
        self.options = Some(options.clone());
    }

    fn add_zoom_control(&mut self, position: ZoomControlPosition) {
        self.zoom_control = Some(position);
    }

    fn add_marker(&mut self, at: LatLng, icon: &IconDescriptor) -> MarkerHandle {
        self.markers.push(HeadlessMarker {
            at,
            icon: icon.clone(),
            variants: None,
            popup: None,
        });
        MarkerHandle(self.markers.len() - 1)
    }

    fn attach_icons(&mut self, marker: MarkerHandle, normal: &IconDescriptor, selected: &IconDescriptor) {
        if let Some(m) = self.markers.get_mut(marker.0) {
            m.variants = Some((normal.clone(), selected.clone()));
        }
    }

    fn set_marker_icon(&mut self, marker: MarkerHandle, icon: &IconDescriptor) {
        if let Some(m) = self.markers.get_mut(marker.0) {
            m.icon = icon.clone();
            self.icon_changes.push(marker);
        }
    }

    fn bind_popup(&mut self, marker: MarkerHandle, contents: &str, options: &PopupOptions) {
        if let Some(m) = self.markers.get_mut(marker.0) {
            m.popup = Some(HeadlessPopup {
                contents: contents.to_string(),
                options: *options,
                open: false,
                laid_out_width: None,
            });
        }
    }

    fn set_popup_max_width(&mut self, marker: MarkerHandle, max_width: u32) {
        if let Some(popup) = self.popup_mut(marker) {
            popup.options.max_width = max_width;
        }
    }

    fn update_popup(&mut self, marker: MarkerHandle) {
        if let Some(popup) = self.popup_mut(marker) {
            if popup.open {
                popup.laid_out_width = Some(popup.options.max_width);
            }
        }
    }

    fn fit_bounds(&mut self, bounds: LatLngBounds) {
        self.fitted = Some(bounds);
    }

    fn listen(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    fn viewport_width(&self) -> u32 {
        self.viewport_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::IconAsset;
    use crate::geo::Size;

    fn icon() -> IconDescriptor {
        IconDescriptor::new(&IconAsset("data:,a".into()), Size::new(20, 30), 30)
    }

    fn map_with_popups(n: usize) -> HeadlessMap {
        let mut map = HeadlessMap::new(1024);
        for i in 0..n {
            let h = map.add_marker(LatLng::new(i as f64, 0.0), &icon());
            map.bind_popup(h, "hi", &PopupOptions::default());
        }
        map
    }

    #[test]
    fn pressing_marker_toggles_its_popup() {
        let mut map = map_with_popups(2);
        map.press_marker(MarkerHandle(0));
        assert_eq!(map.open_popups(), [MarkerHandle(0)]);
        map.press_marker(MarkerHandle(0));
        assert!(map.open_popups().is_empty());
    }

    #[test]
    fn opening_a_popup_closes_the_other() {
        let mut map = map_with_popups(2);
        map.press_marker(MarkerHandle(0));
        map.press_marker(MarkerHandle(1));
        assert_eq!(map.open_popups(), [MarkerHandle(1)]);

        map.press_background();
        assert!(map.open_popups().is_empty());
    }

    #[test]
    fn pressing_marker_without_popup_closes_open_one() {
        let mut map = map_with_popups(1);
        let bare = map.add_marker(LatLng::new(5.0, 5.0), &icon());
        map.press_marker(MarkerHandle(0));
        map.press_marker(bare);
        assert!(map.open_popups().is_empty());
        assert!(!map.is_popup_open(bare));
    }

    #[test]
    fn update_relays_out_open_popups_only() {
        let mut map = map_with_popups(2);
        map.press_marker(MarkerHandle(1));
        for i in 0..2 {
            map.set_popup_max_width(MarkerHandle(i), 284);
            map.update_popup(MarkerHandle(i));
        }
        assert_eq!(map.popup_laid_out_width(MarkerHandle(0)), None);
        assert_eq!(map.popup_laid_out_width(MarkerHandle(1)), Some(284));
    }
}
