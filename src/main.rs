use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod bundle;
mod constants;
mod geo;
mod html_template;
mod leaflet;
mod map;
mod server;
mod settings;
mod simulate;

use bundle::MapBundle;
use html_template::get_map_html;
use server::{start_server, AppState};
use settings::Settings;
use simulate::{SimEvent, Simulation};

#[derive(Parser, Debug)]
#[command(author, version, about = "Renders generated map markers into an interactive page.", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/mapgen/mapgen.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the map page to a file
    Build {
        bundle: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Serve the map page over HTTP
    Serve {
        bundle: PathBuf,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Replay clicks and resizes against a headless map
    Simulate {
        bundle: PathBuf,
        #[arg(long, value_name = "PIXELS")]
        viewport: Option<u32>,
        /// click:<index>, background or resize:<width>
        events: Vec<SimEvent>,
    },
}

fn build(bundle: &MapBundle, settings: &Settings, output: PathBuf) -> Result<()> {
    let html = get_map_html(bundle, settings)?;
    std::fs::write(&output, html).with_context(|| format!("Failed to write {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(())
}

async fn serve(bundle: MapBundle, settings: &Settings, port: u16) -> Result<()> {
    let page = get_map_html(&bundle, settings)?;
    let ip: IpAddr = settings
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {:?}", settings.bind))?;
    start_server(AppState::new(page, bundle), SocketAddr::new(ip, port)).await
}

fn simulate(bundle: &MapBundle, viewport: u32, events: &[SimEvent]) -> Result<()> {
    let mut sim = Simulation::new(bundle, viewport)?;
    for &event in events {
        sim.apply(event)?;
        sim.log_state(event);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Build { bundle, output } => {
            let bundle = MapBundle::load(&bundle)?;
            build(&bundle, &settings, output.unwrap_or_else(|| settings.output.clone()))
        }
        Command::Serve { bundle, port } => {
            let bundle = MapBundle::load(&bundle)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(serve(bundle, &settings, port.unwrap_or(settings.port)))
        }
        Command::Simulate { bundle, viewport, events } => {
            let bundle = MapBundle::load(&bundle)?;
            simulate(&bundle, viewport.unwrap_or(settings.viewport_width), &events)
        }
    }
}
