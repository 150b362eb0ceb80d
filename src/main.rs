pub mod classify;
pub mod config;
pub mod data;
pub mod error;
pub mod join;
pub mod projection;
pub mod render;
pub mod server;
pub mod state;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the data sources, classify regions and write the scene model
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the scene with live hover queries
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            app_config.validate()?;

            let (features, records) = data::load_sources(&app_config).await?;
            let projection = projection::Projection::fit(
                &features,
                (app_config.viewport.width, app_config.viewport.height),
            )?;
            let enriched = join::join(&features, records, &projection);
            let scene = render::build_scene(&app_config, &features, &enriched, &projection)?;
            render::write_scene(&app_config.output.scene_path, &scene)?;

            info!(
                regions = scene.regions.len(),
                markers = scene.markers.len(),
                "Scene written to {:?}",
                app_config.output.scene_path
            );
        }
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            app_config.validate()?;

            let (features, records) = data::load_sources(&app_config).await?;
            let projection = projection::Projection::fit(
                &features,
                (app_config.viewport.width, app_config.viewport.height),
            )?;
            let enriched = join::join(&features, records, &projection);
            let scene = render::build_scene(&app_config, &features, &enriched, &projection)?;

            server::start_server(app_config, features, enriched, projection, scene).await?;
        }
    }

    Ok(())
}
