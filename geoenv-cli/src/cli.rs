use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use geoenv_core::{Config, EnvironmentService};
use inquire::{Password, Text};

use crate::report;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "geoenv",
    version,
    about = "Weather and environmental parameters for a coordinate",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true,
    allow_negative_numbers = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Latitude in degrees, -90 to 90.
    #[arg(required = true)]
    pub latitude: Option<f64>,

    /// Longitude in degrees, -180 to 180.
    #[arg(required = true)]
    pub longitude: Option<f64>,

    /// Days to look back for satellite observations, 1 to 365.
    pub days_back: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the Earth Engine project and access token in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Command::Configure) => configure(),
            None => {
                let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
                    bail!("Both latitude and longitude are required, e.g. `geoenv 39.9042 116.4074`");
                };
                query(latitude, longitude, self.days_back).await
            }
        }
    }
}

async fn query(latitude: f64, longitude: f64, days_back: Option<i64>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let service = EnvironmentService::from_config(&config)?;
    let window = service.window(Some(latitude), Some(longitude), days_back)?;

    let response = service
        .all(&window)
        .await
        .context("Failed to collect environmental parameters")?;

    print!("{}", report::render(&response, &window, Utc::now())?);
    Ok(())
}

/// Only file values are edited so environment overrides never get persisted.
fn configure() -> anyhow::Result<()> {
    let mut config = Config::load_file()?;

    let project = Text::new("Earth Engine project id:")
        .with_initial_value(config.earth_engine.project.as_deref().unwrap_or_default())
        .prompt()?;
    let access_token = Password::new("Earth Engine access token:")
        .without_confirmation()
        .prompt()?;

    if project.trim().is_empty() || access_token.trim().is_empty() {
        bail!("Project id and access token must both be non-empty");
    }

    config.set_earth_engine_credentials(project.trim().to_string(), access_token.trim().to_string());
    config.save()?;

    println!("Saved credentials to {}", Config::config_file_path()?.display());
    Ok(())
}
