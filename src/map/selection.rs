use tracing::{debug, warn};

use super::markers::{DrawnMarker, IconState};
use super::{ClickEvent, Listener, MapCapability, MarkerHandle};
use crate::constants::{POPUP_MAX_WIDTH, POPUP_VIEWPORT_MARGIN};

/// Widest a popup may grow for a given viewport width.
pub fn popup_max_width(viewport_width: u32) -> u32 {
    viewport_width
        .saturating_sub(POPUP_VIEWPORT_MARGIN)
        .min(POPUP_MAX_WIDTH)
}

/// Owns the drawn markers and which one of them, if any, is selected.
///
/// Selection is an independent click toggle: it does not follow the popup's
/// open state, the rendering engine opens and closes popups on its own.
#[derive(Debug, Default)]
pub struct SelectionController {
    markers: Vec<DrawnMarker>,
    selected: Option<MarkerHandle>,
}

impl SelectionController {
    pub fn new(markers: Vec<DrawnMarker>) -> Self {
        Self {
            markers,
            selected: None,
        }
    }

    pub fn markers(&self) -> &[DrawnMarker] {
        &self.markers
    }

    pub fn selected(&self) -> Option<MarkerHandle> {
        self.selected
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&DrawnMarker> {
        self.markers.iter().find(|m| m.handle == handle)
    }

    fn marker_mut(&mut self, handle: MarkerHandle) -> Option<&mut DrawnMarker> {
        self.markers.iter_mut().find(|m| m.handle == handle)
    }

    /// Wires the handlers into the map and sizes popups for the current viewport.
    pub fn install<M: MapCapability>(&mut self, map: &mut M) {
        map.listen(Listener::WindowResize);
        map.listen(Listener::MapClick);
        for marker in &self.markers {
            map.listen(Listener::MarkerClick(marker.handle));
        }
        self.on_resize(map);
    }

    /// Puts the selected marker, if any, back to its normal icon.
    pub fn deselect<M: MapCapability>(&mut self, map: &mut M) {
        let Some(handle) = self.selected.take() else {
            return;
        };
        if let Some(marker) = self.marker_mut(handle) {
            marker.set_state(IconState::Normal, map);
            debug!("deselected marker {}", handle.0);
        }
    }

    pub fn on_marker_click<M: MapCapability>(
        &mut self,
        handle: MarkerHandle,
        event: &mut ClickEvent,
        map: &mut M,
    ) {
        event.stop_propagation();

        if self.marker(handle).is_none() {
            warn!("click on unknown marker {}", handle.0);
            return;
        }

        let was_selected = self.selected == Some(handle);
        self.deselect(map);

        if !was_selected {
            if let Some(marker) = self.marker_mut(handle) {
                marker.set_state(IconState::Selected, map);
            }
            self.selected = Some(handle);
            debug!("selected marker {}", handle.0);
        }

        debug_assert!(self.selected_count() <= 1);
    }

    pub fn on_map_click<M: MapCapability>(&mut self, map: &mut M) {
        self.deselect(map);
    }

    /// Re-fits every popup to the viewport. Closed popups are updated too so
    /// they open at the right width.
    pub fn on_resize<M: MapCapability>(&mut self, map: &mut M) {
        let max_width = popup_max_width(map.viewport_width());
        for marker in &mut self.markers {
            if let Some(popup) = marker.popup.as_mut() {
                popup.options.max_width = max_width;
                map.set_popup_max_width(marker.handle, max_width);
                map.update_popup(marker.handle);
            }
        }
        debug!("popup max width set to {}", max_width);
    }

    pub fn selected_count(&self) -> usize {
        self.markers
            .iter()
            .filter(|m| m.state() == IconState::Selected)
            .count()
    }
}
