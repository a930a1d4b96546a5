use anyhow::{Context, Result};
use rust_embed::RustEmbed;
use tracing::debug;

use crate::bundle::MapBundle;
use crate::leaflet::LeafletScript;
use crate::map::render;
use crate::settings::Settings;

#[derive(RustEmbed)]
#[folder = "frontend/"]
pub struct Asset;

const PROVIDERS_PLUGIN: &str =
    r#"<script src="https://unpkg.com/leaflet-providers@2.0.0/leaflet-providers.js"></script>"#;

pub fn asset_text(name: &str) -> Result<String> {
    let file = Asset::get(name).with_context(|| format!("Missing embedded asset {}", name))?;
    let text = std::str::from_utf8(&file.data)
        .with_context(|| format!("Embedded asset {} is not UTF-8", name))?;
    Ok(text.to_string())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders the bundle into a self-contained HTML page.
pub fn get_map_html(bundle: &MapBundle, settings: &Settings) -> Result<String> {
    let mut script = LeafletScript::new(settings.viewport_width);
    render(bundle, &mut script)?;

    let providers = if script.uses_providers_plugin() { PROVIDERS_PLUGIN } else { "" };
    let marker_count = script.marker_count();

    let html = asset_text("index.html")?
        .replace("{{TITLE}}", &escape_html(&bundle.settings.title))
        .replace("{{LEAFLET_VERSION}}", &settings.leaflet_version)
        .replace("<!-- PROVIDERS_PLUGIN -->", providers)
        .replace("{{RUNTIME}}", &asset_text("runtime.js")?)
        .replace("{{SCRIPT}}", &script.into_script());

    debug!("generated page with {} markers ({} bytes)", marker_count, html.len());
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::tests::sample_bundle;
    use crate::constants::{POPUP_MAX_WIDTH, POPUP_VIEWPORT_MARGIN};
    use crate::map::selection::popup_max_width;

    /// Body of `name(...) {` up to the matching closing brace.
    fn js_block<'a>(source: &'a str, header: &str) -> &'a str {
        let start = source.find(header).unwrap_or_else(|| panic!("{} not found", header));
        let body = &source[start..];
        let mut depth = 0;
        for (i, c) in body.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return &body[..=i];
                    }
                }
                _ => {}
            }
        }
        panic!("{} is not closed", header)
    }

    #[test]
    fn page_contains_runtime_and_script() {
        let html = get_map_html(&sample_bundle(), &Settings::default()).unwrap();

        assert!(html.contains("<title>Lighthouses</title>"));
        assert!(html.contains("https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"));
        assert!(html.contains("const mapgen = "));
        assert!(html.contains("const map = L.map(\"map\""));
        assert!(!html.contains("{{"));
        assert!(!html.contains("leaflet-providers"));
    }

    #[test]
    fn title_is_escaped() {
        let mut bundle = sample_bundle();
        bundle.settings.title = "Fish & <Chips>".into();
        let html = get_map_html(&bundle, &Settings::default()).unwrap();
        assert!(html.contains("<title>Fish &amp; &lt;Chips&gt;</title>"));
    }

    #[test]
    fn baked_popup_width_uses_configured_viewport() {
        let settings = Settings {
            viewport_width: 375,
            ..Settings::default()
        };
        let html = get_map_html(&sample_bundle(), &settings).unwrap();
        assert!(html.contains("markers[0].getPopup().options.maxWidth = 359;"));
    }

    #[test]
    fn commented_script_tag_in_popup_stays_inert() {
        let mut bundle = sample_bundle();
        bundle.markers[0].popup_contents = Some("<!--<script>".into());
        let html = get_map_html(&bundle, &Settings::default()).unwrap();

        assert!(!html.contains("<!--<script>"));
        assert_eq!(html.matches("</script>").count(), html.matches("<script").count());
    }

    #[test]
    fn embedded_assets_decode_as_text() {
        assert!(asset_text("runtime.js").unwrap().starts_with("// Browser half"));
        assert!(asset_text("index.html").unwrap().contains("{{SCRIPT}}"));
        let err = asset_text("missing.js").unwrap_err();
        assert!(err.to_string().contains("Missing embedded asset missing.js"));
    }

    #[test]
    fn runtime_click_toggles_like_controller() {
        let runtime = asset_text("runtime.js").unwrap();
        let click = js_block(&runtime, "markerClick(marker, event) {");

        let stop = click.find("L.DomEvent.stopPropagation(event);").unwrap();
        let was_selected = click.find("const wasSelected = selected === marker;").unwrap();
        let deselect = click.find("deselect();").unwrap();
        let select = click.find("if (!wasSelected) {").unwrap();
        assert!(stop < was_selected && was_selected < deselect && deselect < select);

        let background = js_block(&runtime, "backgroundClick() {");
        assert!(background.contains("deselect();"));
        assert!(!background.contains("setIcon"));
    }

    #[test]
    fn runtime_popup_width_clamps_like_controller() {
        let runtime = asset_text("runtime.js").unwrap();
        let clamp = js_block(&runtime, "function popupMaxWidth(viewportWidth, limits) {");
        assert!(clamp.contains("Math.max(0, Math.min(viewportWidth - limits.margin, limits.max))"));

        // Same clamp over the limits the page hands to the runtime.
        let html = get_map_html(&sample_bundle(), &Settings::default()).unwrap();
        assert!(html.contains(r#"mapgen.selection(map, markers, {"margin":16,"max":640});"#));
        for width in [0u32, 10, 16, 300, 656, 657, 800, 4000] {
            let js_width = (width as i64 - POPUP_VIEWPORT_MARGIN as i64)
                .min(POPUP_MAX_WIDTH as i64)
                .max(0);
            assert_eq!(popup_max_width(width) as i64, js_width, "viewport {}", width);
        }

        let resize = js_block(&runtime, "resize() {");
        assert!(resize.contains("popup.options.maxWidth = width;"));
        assert!(resize.contains("popup.update();"));
    }
}
