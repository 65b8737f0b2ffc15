//! Core library for `geoenv`.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The Open-Meteo weather provider and its placeholder fallback
//! - Earth Engine remote-sensing queries and the vegetation aggregator
//! - Derived parameters and the response shapes built from them
//!
//! It is used by `geoenv-cli` and `geoenv-server`.

pub mod compose;
pub mod config;
pub mod derived;
pub mod error;
pub mod model;
pub mod parameter;
pub mod sensing;
pub mod service;
pub mod vegetation;
pub mod weather;

pub use compose::{
    AllResponse, EnvironmentalResponse, EnvironmentalSummary, TargetParameter, TargetValue,
    VegetationResponse, WeatherResponse,
};
pub use config::Config;
pub use error::GeoEnvError;
pub use model::{Coordinate, QueryWindow};
pub use parameter::{ParameterId, ParameterReading};
pub use sensing::{RemoteSensing, Sample, SampleRequest, SensingError};
pub use service::{EnvironmentService, StatusResponse};
pub use vegetation::{VegetationAggregator, VegetationReport};
pub use weather::{WeatherProvider, WeatherReport};
