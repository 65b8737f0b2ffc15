use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::warn;

use crate::model::Coordinate;

pub mod openmeteo;

pub use openmeteo::OpenMeteoProvider;

/// Current conditions at a coordinate, in fixed units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    /// hPa, sea level
    pub pressure: f64,
    pub description: String,
    /// m/s
    pub wind_speed: f64,
    /// degrees
    pub wind_direction: f64,
    pub weather_code: u16,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherLocation {
    pub name: String,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    pub location: WeatherLocation,
    /// Set when the provider failed and `current` holds demo values.
    pub is_placeholder: bool,
}

impl WeatherReport {
    /// Demo record returned when the provider cannot be reached.
    pub fn placeholder(coordinate: Coordinate, reason: &str) -> Self {
        Self {
            current: CurrentConditions {
                temperature: 20.0,
                humidity: 60.0,
                pressure: 1013.2,
                description: format!("Demo data: weather provider unavailable ({reason})"),
                wind_speed: 3.0,
                wind_direction: 180.0,
                weather_code: 0,
                note: "Placeholder values, not an observation".to_string(),
            },
            location: WeatherLocation {
                name: location_name(coordinate),
                timezone: "UTC".to_string(),
            },
            is_placeholder: true,
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, coordinate: Coordinate) -> anyhow::Result<WeatherReport>;
}

/// Wraps a provider with the degrade-to-demo-data policy.
#[derive(Debug)]
pub struct WeatherFetcher {
    provider: Box<dyn WeatherProvider>,
}

impl WeatherFetcher {
    pub fn new(provider: Box<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Never fails: provider errors yield a flagged placeholder.
    pub async fn fetch(&self, coordinate: Coordinate) -> WeatherReport {
        match self.provider.current(coordinate).await {
            Ok(report) => report,
            Err(err) => {
                warn!(%coordinate, "Weather provider failed, using placeholder: {err:#}");
                WeatherReport::placeholder(coordinate, &err.to_string())
            }
        }
    }
}

/// WMO weather interpretation code → description.
pub fn describe_weather_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snowfall",
        73 => "Moderate snowfall",
        75 => "Heavy snowfall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown weather",
    }
}

pub(crate) fn location_name(coordinate: Coordinate) -> String {
    format!("Point ({coordinate})")
}
