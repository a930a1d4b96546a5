use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use super::{MapCapability, MarkerHandle};
use crate::bundle::{IconAsset, MarkerRecord};
use crate::constants::{POPUP_ANCHOR_GAP, POPUP_MAX_WIDTH};
use crate::geo::{LatLng, LatLngBounds, Point, Size};

/// Size and anchoring for one of a marker's two images.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IconDescriptor {
    #[serde(rename = "iconUrl")]
    pub url: String,
    #[serde(rename = "iconSize")]
    pub size: Size,
    #[serde(rename = "iconAnchor")]
    pub anchor: Point,
    pub popup_anchor: Point,
}

impl IconDescriptor {
    /// Bottom-center anchored so the icon's tip sits on the coordinate. The
    /// popup clears the selected icon whichever variant is showing.
    pub fn new(asset: &IconAsset, size: Size, selected_height: u32) -> Self {
        Self {
            url: asset.uri().to_string(),
            size,
            anchor: Point::new(size.width as f64 / 2.0, size.height as f64),
            popup_anchor: Point::new(0.0, -(selected_height as f64 + POPUP_ANCHOR_GAP as f64)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconState {
    #[default]
    Normal,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupOptions {
    pub max_width: u32,
    pub auto_pan: bool,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            max_width: POPUP_MAX_WIDTH,
            auto_pan: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub contents: String,
    pub options: PopupOptions,
}

/// A marker as placed on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnMarker {
    pub handle: MarkerHandle,
    pub coordinates: LatLng,
    pub normal_icon: IconDescriptor,
    pub selected_icon: IconDescriptor,
    pub popup: Option<Popup>,
    state: IconState,
}

impl DrawnMarker {
    pub fn state(&self) -> IconState {
        self.state
    }

    pub fn current_icon(&self) -> &IconDescriptor {
        match self.state {
            IconState::Normal => &self.normal_icon,
            IconState::Selected => &self.selected_icon,
        }
    }

    /// Switches the visual state and pushes the matching icon to the map.
    pub fn set_state<M: MapCapability>(&mut self, state: IconState, map: &mut M) {
        self.state = state;
        map.set_marker_icon(self.handle, self.current_icon());
    }
}

fn icon_at<'a>(icons: &'a [IconAsset], index: usize, marker: usize) -> Result<&'a IconAsset> {
    icons
        .get(index)
        .with_context(|| format!("marker {} references icon {} of {}", marker, index, icons.len()))
}

/// Draws every record in input order, then fits the view around them.
pub fn render_markers<M: MapCapability>(
    records: &[MarkerRecord],
    icons: &[IconAsset],
    map: &mut M,
) -> Result<Vec<DrawnMarker>> {
    let mut drawn = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let selected_height = record.selected_icon_dimensions.height;
        let normal_icon = IconDescriptor::new(
            icon_at(icons, record.normal_icon_index, i)?,
            record.normal_icon_dimensions,
            selected_height,
        );
        let selected_icon = IconDescriptor::new(
            icon_at(icons, record.selected_icon_index, i)?,
            record.selected_icon_dimensions,
            selected_height,
        );

        let handle = map.add_marker(record.coordinates, &normal_icon);
        map.attach_icons(handle, &normal_icon, &selected_icon);

        let popup = record.popup_contents.as_ref().map(|contents| {
            let popup = Popup {
                contents: contents.clone(),
                options: PopupOptions::default(),
            };
            map.bind_popup(handle, &popup.contents, &popup.options);
            popup
        });

        debug!(
            "marker {} at [{}, {}] popup={}",
            i,
            record.coordinates.lat,
            record.coordinates.lng,
            popup.is_some()
        );

        drawn.push(DrawnMarker {
            handle,
            coordinates: record.coordinates,
            normal_icon,
            selected_icon,
            popup,
            state: IconState::Normal,
        });
    }

    if let Some(bounds) = LatLngBounds::from_points(drawn.iter().map(|m| m.coordinates)) {
        map.fit_bounds(bounds);
        debug!("fitted view to {:?}", bounds);
    }

    info!("rendered {} markers", drawn.len());
    Ok(drawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::tests::sample_bundle;
    use crate::map::headless::HeadlessMap;

    #[test]
    fn anchors_are_bottom_center() {
        let asset = IconAsset("data:,x".into());
        let icon = IconDescriptor::new(&asset, Size::new(25, 41), 50);
        assert_eq!(icon.anchor, Point::new(12.5, 41.0));
        assert_eq!(icon.popup_anchor, Point::new(0.0, -52.0));
    }

    #[test]
    fn oversized_selected_icon_renders() {
        let mut bundle = sample_bundle();
        bundle.markers[0].selected_icon_dimensions = Size::new(32, u32::MAX);
        bundle.validate().unwrap();
        let mut map = HeadlessMap::new(1024);
        let drawn = render_markers(&bundle.markers, &bundle.icons, &mut map).unwrap();

        let expected = -(u32::MAX as f64 + 2.0);
        assert_eq!(drawn[0].normal_icon.popup_anchor, Point::new(0.0, expected));
        assert_eq!(drawn[0].selected_icon.anchor, Point::new(16.0, u32::MAX as f64));
    }

    #[test]
    fn both_variants_share_popup_anchor() {
        let bundle = sample_bundle();
        let mut map = HeadlessMap::new(1024);
        let drawn = render_markers(&bundle.markers, &bundle.icons, &mut map).unwrap();

        for marker in &drawn {
            assert_eq!(marker.normal_icon.popup_anchor, marker.selected_icon.popup_anchor);
        }
        assert_eq!(drawn[0].normal_icon.popup_anchor, Point::new(0.0, -50.0));
        assert_eq!(drawn[2].selected_icon.popup_anchor, Point::new(0.0, -42.0));
    }

    #[test]
    fn renders_in_input_order_with_normal_icons() {
        let bundle = sample_bundle();
        let mut map = HeadlessMap::new(1024);
        let drawn = render_markers(&bundle.markers, &bundle.icons, &mut map).unwrap();

        assert_eq!(drawn.len(), 3);
        for (record, marker) in bundle.markers.iter().zip(&drawn) {
            assert_eq!(marker.coordinates, record.coordinates);
            assert_eq!(map.marker_position(marker.handle), Some(record.coordinates));
            assert_eq!(marker.state(), IconState::Normal);
            assert_eq!(map.marker_icon(marker.handle), Some(&marker.normal_icon));
            assert_eq!(
                map.attached_icons(marker.handle),
                Some((&marker.normal_icon, &marker.selected_icon))
            );
        }
        assert_eq!(drawn[0].normal_icon.url, "data:image/png;base64,AAAA");
        assert_eq!(drawn[0].selected_icon.url, "data:image/png;base64,BBBB");
    }

    #[test]
    fn popups_bound_only_when_present() {
        let bundle = sample_bundle();
        let mut map = HeadlessMap::new(1024);
        let drawn = render_markers(&bundle.markers, &bundle.icons, &mut map).unwrap();

        assert_eq!(map.popup_contents(drawn[0].handle), Some("<b>Stockholm</b>"));
        assert!(!map.has_popup(drawn[1].handle));
        assert!(map.has_popup(drawn[2].handle));
        assert!(drawn[0].popup.as_ref().unwrap().options.auto_pan);
    }

    #[test]
    fn fits_tight_bounds() {
        let bundle = sample_bundle();
        let mut map = HeadlessMap::new(1024);
        render_markers(&bundle.markers, &bundle.icons, &mut map).unwrap();

        assert_eq!(
            map.fitted_bounds(),
            Some(LatLngBounds::from([[55.68, 12.57], [60.17, 24.94]]))
        );
    }

    #[test]
    fn no_markers_no_fit() {
        let bundle = sample_bundle();
        let mut map = HeadlessMap::new(1024);
        let drawn = render_markers(&[], &bundle.icons, &mut map).unwrap();

        assert!(drawn.is_empty());
        assert_eq!(map.fitted_bounds(), None);
    }

    #[test]
    fn unknown_icon_index_fails() {
        let mut bundle = sample_bundle();
        bundle.markers[1].normal_icon_index = 9;
        let mut map = HeadlessMap::new(1024);
        let err = render_markers(&bundle.markers, &bundle.icons, &mut map).unwrap_err();
        assert!(err.to_string().contains("marker 1 references icon 9 of 2"), "{}", err);
    }

    #[test]
    fn state_switch_updates_map_icon() {
        let bundle = sample_bundle();
        let mut map = HeadlessMap::new(1024);
        let mut drawn = render_markers(&bundle.markers, &bundle.icons, &mut map).unwrap();

        drawn[1].set_state(IconState::Selected, &mut map);
        assert_eq!(drawn[1].current_icon(), &drawn[1].selected_icon);
        assert_eq!(map.marker_icon(drawn[1].handle), Some(&drawn[1].selected_icon));
        assert_eq!(drawn[1].current_icon().anchor, Point::new(16.0, 48.0));
    }
}
