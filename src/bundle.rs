use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::*;
use crate::geo::{LatLng, Size};

/// Corner a zoom control can be docked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomControlPosition {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ZoomControlPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomControlPosition::TopLeft => "topleft",
            ZoomControlPosition::TopRight => "topright",
            ZoomControlPosition::BottomLeft => "bottomleft",
            ZoomControlPosition::BottomRight => "bottomright",
        }
    }
}

impl fmt::Display for ZoomControlPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The generator writes "yes"/"no"; anything other than "yes" means off.
mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *value { "yes" } else { "no" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(raw == "yes")
    }
}

/// User-defined map settings, loaded once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSettings {
    pub title: String,
    #[serde(rename = "tile provider", default, skip_serializing_if = "Option::is_none")]
    pub tile_provider: Option<String>,
    #[serde(rename = "tile template", default, skip_serializing_if = "Option::is_none")]
    pub tile_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(rename = "show zoom control", default, with = "yes_no")]
    pub show_zoom_control: bool,
    #[serde(rename = "zoom control position", default)]
    pub zoom_control_position: ZoomControlPosition,
}

/// Where base tiles come from once settings are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum TileSource {
    Template { url: String, attribution: String },
    /// Named provider unknown to the built-in table, resolved by the
    /// leaflet-providers plugin in the browser.
    Provider { id: String, attribution: Option<String> },
}

// (provider id, url template, attribution)
const KNOWN_PROVIDERS: &[(&str, &str, &str)] = &[
    ("OpenStreetMap.Mapnik", "https://tile.openstreetmap.org/{z}/{x}/{y}.png", OSM_ATTRIBUTION),
    ("OpenStreetMap.DE", "https://tile.openstreetmap.de/{z}/{x}/{y}.png", OSM_ATTRIBUTION),
    (
        "CartoDB.Positron",
        "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
        "&copy; <a href='https://www.openstreetmap.org/copyright'>OpenStreetMap</a> contributors &copy; <a href='https://carto.com/attributions'>CARTO</a>",
    ),
    (
        "Wikimedia",
        "https://maps.wikimedia.org/osm-intl/{z}/{x}/{y}{r}.png",
        WIKIMEDIA_ATTRIBUTION,
    ),
];

impl MapSettings {
    /// Resolves the configured provider or template into a concrete tile source.
    pub fn tile_source(&self) -> Result<TileSource> {
        if let Some(id) = &self.tile_provider {
            if let Some((_, url, attribution)) = KNOWN_PROVIDERS.iter().find(|(name, _, _)| *name == id.as_str()) {
                return Ok(TileSource::Template {
                    url: url.to_string(),
                    attribution: self.attribution.clone().unwrap_or_else(|| attribution.to_string()),
                });
            }
            return Ok(TileSource::Provider {
                id: id.clone(),
                attribution: self.attribution.clone(),
            });
        }

        let template = self.tile_template.as_deref().unwrap_or(WIKIMEDIA_TEMPLATE);
        let url = if template.contains("{lang}") {
            let Some(language) = self.language.as_deref() else {
                bail!("missing required setting \"language\" for tile template {}", template);
            };
            template.replace("{lang}", language)
        } else {
            template.to_string()
        };

        let attribution = match &self.attribution {
            Some(a) => a.clone(),
            None if self.tile_template.is_none() => WIKIMEDIA_ATTRIBUTION.to_string(),
            None => OSM_ATTRIBUTION.to_string(),
        };

        Ok(TileSource::Template { url, attribution })
    }
}

/// Opaque image reference, usually a data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconAsset(pub String);

impl IconAsset {
    pub fn uri(&self) -> &str {
        &self.0
    }
}

/// One generated marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub coordinates: LatLng,
    #[serde(rename = "normal icon index")]
    pub normal_icon_index: usize,
    #[serde(rename = "selected icon index")]
    pub selected_icon_index: usize,
    #[serde(rename = "normal icon dimensions")]
    pub normal_icon_dimensions: Size,
    #[serde(rename = "selected icon dimensions")]
    pub selected_icon_dimensions: Size,
    #[serde(rename = "popup contents", default, skip_serializing_if = "Option::is_none")]
    pub popup_contents: Option<String>,
}

/// Everything the generation step bakes into a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapBundle {
    pub settings: MapSettings,
    #[serde(default)]
    pub icons: Vec<IconAsset>,
    #[serde(default)]
    pub markers: Vec<MarkerRecord>,
}

impl MapBundle {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bundle {}", path.display()))?;
        let bundle = Self::from_json(&content)
            .with_context(|| format!("Invalid bundle {}", path.display()))?;
        info!(
            "loaded bundle {} ({} icons, {} markers)",
            path.display(),
            bundle.icons.len(),
            bundle.markers.len()
        );
        Ok(bundle)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let bundle: MapBundle = serde_json::from_str(content).context("Failed to parse bundle JSON")?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Checks the generator's preconditions once so rendering can rely on them.
    pub fn validate(&self) -> Result<()> {
        if self.settings.title.trim().is_empty() {
            bail!("missing required setting \"title\"");
        }
        self.settings.tile_source()?;

        for (i, marker) in self.markers.iter().enumerate() {
            if !marker.coordinates.is_valid() {
                bail!("marker {} has malformed coordinates {:?}", i, marker.coordinates);
            }
            for (kind, index) in [
                ("normal", marker.normal_icon_index),
                ("selected", marker.selected_icon_index),
            ] {
                if index >= self.icons.len() {
                    bail!(
                        "marker {} references {} icon {} but only {} icons exist",
                        i,
                        kind,
                        index,
                        self.icons.len()
                    );
                }
            }
            for (kind, size) in [
                ("normal", marker.normal_icon_dimensions),
                ("selected", marker.selected_icon_dimensions),
            ] {
                if size.width == 0 || size.height == 0 {
                    bail!("marker {} has empty {} icon dimensions", i, kind);
                }
            }
        }

        debug!("bundle validated");
        Ok(())
    }
}
