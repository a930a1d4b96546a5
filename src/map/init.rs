use tracing::{debug, info};

use super::MapCapability;
use crate::bundle::{MapSettings, TileSource};
use crate::constants::*;
use crate::geo::{LatLng, LatLngBounds};

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerOptions {
    pub source: TileSource,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

/// Everything needed to construct the map view.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub tile_layer: TileLayerOptions,
    pub max_bounds: LatLngBounds,
    pub max_bounds_viscosity: f64,
    /// Unset whenever markers exist; the bounds fit decides the view then.
    pub center: Option<LatLng>,
    pub zoom: Option<u8>,
    /// The built-in zoom UI. Always off, a positioned control is added separately.
    pub zoom_control: bool,
}

impl MapOptions {
    /// Settings are validated at bundle load, so a missing tile setting here
    /// is a broken build.
    pub fn new(settings: &MapSettings, marker_count: usize) -> anyhow::Result<Self> {
        let (center, zoom) = if marker_count == 0 {
            (Some(LatLng::from(DEFAULT_CENTER)), Some(DEFAULT_ZOOM))
        } else {
            (None, None)
        };

        Ok(Self {
            tile_layer: TileLayerOptions {
                source: settings.tile_source()?,
                min_zoom: MIN_ZOOM,
                max_zoom: MAX_ZOOM,
            },
            max_bounds: LatLngBounds::from(WORLD_BOUNDS),
            max_bounds_viscosity: MAX_BOUNDS_VISCOSITY,
            center,
            zoom,
            zoom_control: false,
        })
    }
}

/// Builds the map view and sets the document title.
pub fn initialize_map<M: MapCapability>(
    settings: &MapSettings,
    marker_count: usize,
    map: &mut M,
) -> anyhow::Result<MapOptions> {
    map.set_document_title(&settings.title);

    let options = MapOptions::new(settings, marker_count)?;
    map.create_map(&options);
    debug!("map created: {:?}", options);

    if settings.show_zoom_control {
        map.add_zoom_control(settings.zoom_control_position);
        debug!("zoom control at {}", settings.zoom_control_position);
    }

    info!("map \"{}\" initialized for {} markers", settings.title, marker_count);
    Ok(options)
}
