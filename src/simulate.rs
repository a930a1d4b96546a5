use anyhow::{bail, Context, Result};
use std::str::FromStr;
use tracing::{debug, info};

use crate::bundle::MapBundle;
use crate::map::headless::HeadlessMap;
use crate::map::{render, ClickEvent, IconState, MarkerHandle, SelectionController};

/// User input replayed against a headless map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// Click on the marker at this render index.
    Click(usize),
    Background,
    Resize(u32),
}

impl FromStr for SimEvent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };
        match (kind, arg) {
            ("click", Some(i)) => Ok(SimEvent::Click(
                i.parse().with_context(|| format!("Invalid marker index in {:?}", s))?,
            )),
            ("background", None) => Ok(SimEvent::Background),
            ("resize", Some(w)) => Ok(SimEvent::Resize(
                w.parse().with_context(|| format!("Invalid viewport width in {:?}", s))?,
            )),
            _ => bail!("Unknown event {:?}, expected click:<index>, background or resize:<width>", s),
        }
    }
}

/// A rendered bundle plus its controller, dispatching events the way the
/// browser does.
pub struct Simulation {
    pub map: HeadlessMap,
    pub controller: SelectionController,
}

impl Simulation {
    pub fn new(bundle: &MapBundle, viewport_width: u32) -> Result<Self> {
        let mut map = HeadlessMap::new(viewport_width);
        let controller = render(bundle, &mut map)?;
        let sim = Self { map, controller };
        sim.log_setup();
        Ok(sim)
    }

    fn log_setup(&self) {
        info!(
            "map {:?}: zoom_control={:?} center={:?} zoom={:?} fitted={:?} listeners={}",
            self.map.title().unwrap_or_default(),
            self.map.zoom_control(),
            self.map.view_center(),
            self.map.view_zoom(),
            self.map.fitted_bounds(),
            self.map.listeners().len()
        );
        for (i, marker) in self.controller.markers().iter().enumerate() {
            let handle = marker.handle;
            debug!(
                "marker {} at {:?} icon={:?} selected_icon={:?} popup={:?}",
                i,
                self.map.marker_position(handle),
                self.map.marker_icon(handle).map(|icon| &icon.url),
                self.map.attached_icons(handle).map(|(_, selected)| &selected.url),
                self.map.popup_contents(handle)
            );
        }
    }

    pub fn apply(&mut self, event: SimEvent) -> Result<()> {
        match event {
            SimEvent::Click(index) => {
                if index >= self.controller.markers().len() {
                    bail!("No marker {} (map has {})", index, self.controller.markers().len());
                }
                let handle = self.controller.markers()[index].handle;
                // The engine toggles the popup before the click handler runs.
                self.map.press_marker(handle);
                let mut click = ClickEvent::new();
                self.controller.on_marker_click(handle, &mut click, &mut self.map);
                if !click.is_propagation_stopped() {
                    self.controller.on_map_click(&mut self.map);
                }
            }
            SimEvent::Background => {
                self.map.press_background();
                self.controller.on_map_click(&mut self.map);
            }
            SimEvent::Resize(width) => {
                self.map.set_viewport_width(width);
                self.controller.on_resize(&mut self.map);
            }
        }
        Ok(())
    }

    /// Render index of the selected marker.
    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.controller.selected()?;
        self.controller.markers().iter().position(|m| m.handle == selected)
    }

    pub fn open_popup_indices(&self) -> Vec<usize> {
        let open: Vec<MarkerHandle> = self.map.open_popups();
        self.controller
            .markers()
            .iter()
            .enumerate()
            .filter(|(_, m)| open.contains(&m.handle))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn log_state(&self, event: SimEvent) {
        let selected = self
            .selected_index()
            .map_or_else(|| "none".to_string(), |i| i.to_string());
        let markers = self.controller.markers();
        let popup_width = markers.iter().find_map(|m| self.map.popup_max_width(m.handle));
        let laid_out: Vec<Option<u32>> = markers
            .iter()
            .map(|m| self.map.popup_laid_out_width(m.handle))
            .collect();
        info!(
            "{:?}: selected={} open_popups={:?} popup_max_width={:?} icon_changes={}",
            event,
            selected,
            self.open_popup_indices(),
            popup_width,
            self.map.icon_changes().len()
        );
        debug!("icons={:?} laid_out_widths={:?}", self.icon_states(), laid_out);
    }

    pub fn icon_states(&self) -> Vec<IconState> {
        self.controller.markers().iter().map(|m| m.state()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::tests::sample_bundle;

    fn run(events: &[&str]) -> Simulation {
        let mut sim = Simulation::new(&sample_bundle(), 1024).unwrap();
        for raw in events {
            sim.apply(raw.parse().unwrap()).unwrap();
        }
        sim
    }

    #[test]
    fn parses_events() {
        assert_eq!("click:4".parse::<SimEvent>().unwrap(), SimEvent::Click(4));
        assert_eq!("background".parse::<SimEvent>().unwrap(), SimEvent::Background);
        assert_eq!("resize:300".parse::<SimEvent>().unwrap(), SimEvent::Resize(300));
        assert!("click".parse::<SimEvent>().is_err());
        assert!("resize:wide".parse::<SimEvent>().is_err());
        assert!("hover:1".parse::<SimEvent>().is_err());
    }

    #[test]
    fn marker_click_does_not_reach_background_handler() {
        let sim = run(&["click:0"]);
        assert_eq!(sim.selected_index(), Some(0));
        assert_eq!(sim.open_popup_indices(), [0]);
    }

    #[test]
    fn selection_and_popups_move_together_on_marker_clicks() {
        let sim = run(&["click:0", "click:2"]);
        assert_eq!(sim.selected_index(), Some(2));
        assert_eq!(sim.open_popup_indices(), [2]);
        assert_eq!(sim.icon_states(), [IconState::Normal, IconState::Normal, IconState::Selected]);
    }

    #[test]
    fn toggle_off_closes_both() {
        let sim = run(&["click:2", "click:2"]);
        assert_eq!(sim.selected_index(), None);
        assert!(sim.open_popup_indices().is_empty());
    }

    #[test]
    fn marker_without_popup_is_still_selectable() {
        let sim = run(&["click:0", "click:1"]);
        assert_eq!(sim.selected_index(), Some(1));
        assert!(sim.open_popup_indices().is_empty());
    }

    #[test]
    fn background_clears_everything() {
        let sim = run(&["click:2", "background"]);
        assert_eq!(sim.selected_index(), None);
        assert!(sim.open_popup_indices().is_empty());
        assert_eq!(sim.icon_states(), [IconState::Normal; 3]);
    }

    #[test]
    fn resize_relays_out_open_popup() {
        let sim = run(&["click:0", "resize:300"]);
        let handle = sim.controller.markers()[0].handle;
        assert_eq!(sim.map.popup_laid_out_width(handle), Some(284));

        let closed = sim.controller.markers()[2].handle;
        assert_eq!(sim.map.popup_max_width(closed), Some(284));
        assert_eq!(sim.map.popup_laid_out_width(closed), None);
    }

    #[test]
    fn logging_reads_recorded_map_state() {
        let mut sim = run(&[]);
        for raw in ["click:2", "resize:300", "background"] {
            let event: SimEvent = raw.parse().unwrap();
            sim.apply(event).unwrap();
            sim.log_state(event);
        }
        assert_eq!(sim.map.title(), Some("Lighthouses"));
        assert_eq!(sim.map.icon_changes().len(), 2);
    }

    #[test]
    fn out_of_range_click_is_an_error() {
        let mut sim = Simulation::new(&sample_bundle(), 1024).unwrap();
        assert!(sim.apply(SimEvent::Click(3)).is_err());
    }
}
