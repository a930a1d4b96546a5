//! Map model: the rendering capability seam plus the three components driven
//! over it (initializer, marker renderer, selection controller).

use crate::bundle::{MapBundle, ZoomControlPosition};
use crate::geo::{LatLng, LatLngBounds};

pub mod headless;
pub mod init;
pub mod markers;
pub mod selection;

pub use self::init::{initialize_map, MapOptions};
pub use self::markers::{render_markers, IconDescriptor, IconState, PopupOptions};
pub use self::selection::SelectionController;

/// Identifies a marker inside the capability that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub usize);

/// Event listeners the controller asks the capability to wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    WindowResize,
    MapClick,
    MarkerClick(MarkerHandle),
}

/// Click delivered to a marker; stopping it keeps the map-level handler from
/// seeing the same click.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    propagation_stopped: bool,
}

impl ClickEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Primitives the underlying map/tile engine has to provide.
pub trait MapCapability {
    fn set_document_title(&mut self, title: &str);

    /// Creates the map with its base layer, max bounds and optional initial view.
    fn create_map(&mut self, options: &MapOptions);

    fn add_zoom_control(&mut self, position: ZoomControlPosition);

    fn add_marker(&mut self, at: LatLng, icon: &IconDescriptor) -> MarkerHandle;

    /// Keeps both icon variants next to the marker for later state switching.
    fn attach_icons(&mut self, marker: MarkerHandle, normal: &IconDescriptor, selected: &IconDescriptor);

    fn set_marker_icon(&mut self, marker: MarkerHandle, icon: &IconDescriptor);

    fn bind_popup(&mut self, marker: MarkerHandle, contents: &str, options: &PopupOptions);

    fn set_popup_max_width(&mut self, marker: MarkerHandle, max_width: u32);

    /// Re-lays out the marker's popup after its options changed.
    fn update_popup(&mut self, marker: MarkerHandle);

    fn fit_bounds(&mut self, bounds: LatLngBounds);

    fn listen(&mut self, listener: Listener);

    fn viewport_width(&self) -> u32;
}

/// Initializes the map, draws every marker and installs the selection handlers.
pub fn render<M: MapCapability>(bundle: &MapBundle, map: &mut M) -> anyhow::Result<SelectionController> {
    initialize_map(&bundle.settings, bundle.markers.len(), map)?;
    let drawn = render_markers(&bundle.markers, &bundle.icons, map)?;
    let mut controller = SelectionController::new(drawn);
    controller.install(map);
    Ok(controller)
}
