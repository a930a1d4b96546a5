// Server configuration
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_OUTPUT: &str = "map.html";
pub const CONFIG_FILE_NAME: &str = "mapgen.toml";
pub const LEAFLET_VERSION: &str = "1.9.4";

// World overview used when there is nothing to fit the view to
pub const DEFAULT_CENTER: [f64; 2] = [18.0, 0.0];
pub const DEFAULT_ZOOM: u8 = 3;

// Tile layer zoom range
pub const MIN_ZOOM: u8 = 2;
pub const MAX_ZOOM: u8 = 19;

// Max bounds cover the whole projected world with some slack so edges stay reachable
pub const WORLD_BOUNDS: [[f64; 2]; 2] = [[-120.0, -225.0], [120.0, 225.0]];
pub const MAX_BOUNDS_VISCOSITY: f64 = 1.0;

// Popup sizing
pub const POPUP_MAX_WIDTH: u32 = 640;
pub const POPUP_VIEWPORT_MARGIN: u32 = 16;
pub const POPUP_ANCHOR_GAP: u32 = 2;

// Viewport assumed while baking popup widths into a generated page
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

// Default tile server, `{lang}` is replaced with the configured language
pub const WIKIMEDIA_TEMPLATE: &str = "https://maps.wikimedia.org/osm-intl/{z}/{x}/{y}.png?lang={lang}";
pub const WIKIMEDIA_ATTRIBUTION: &str = "&copy; <a href='https://wikimediafoundation.org/wiki/Maps_Terms_of_Use'>Wikimedia</a> &copy; <a href='https://www.openstreetmap.org/copyright'>OpenStreetMap</a>";
pub const OSM_ATTRIBUTION: &str = "&copy; <a href='https://www.openstreetmap.org/copyright'>OpenStreetMap</a> contributors";
