use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::model::Coordinate;

use super::{CurrentConditions, WeatherLocation, WeatherProvider, WeatherReport};

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,pressure_msl,wind_speed_10m,wind_direction_10m,weather_code";

/// Open-Meteo forecast API. No key required.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("geoenv/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build Open-Meteo HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch_current(&self, coordinate: Coordinate) -> Result<WeatherReport> {
        let url = format!("{}/forecast", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("wind_speed_unit", "ms".to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Open-Meteo response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_current(&body, coordinate)
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    pressure_msl: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
    weather_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    timezone: Option<String>,
    current: OmCurrent,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn current(&self, coordinate: Coordinate) -> Result<WeatherReport> {
        self.fetch_current(coordinate).await
    }
}

fn parse_current(body: &str, coordinate: Coordinate) -> Result<WeatherReport> {
    let parsed: OmResponse =
        serde_json::from_str(body).context("Failed to parse Open-Meteo current JSON")?;
    let current = parsed.current;

    let weather_code = current.weather_code.unwrap_or(0);

    Ok(WeatherReport {
        current: CurrentConditions {
            temperature: round1(current.temperature_2m.unwrap_or(0.0)),
            humidity: current.relative_humidity_2m.unwrap_or(0.0),
            pressure: round1(current.pressure_msl.unwrap_or(0.0)),
            description: super::describe_weather_code(weather_code).to_string(),
            wind_speed: round1(current.wind_speed_10m.unwrap_or(0.0)),
            wind_direction: current.wind_direction_10m.unwrap_or(0.0),
            weather_code,
            note: "Source: Open-Meteo".to_string(),
        },
        location: WeatherLocation {
            name: super::location_name(coordinate),
            timezone: parsed.timezone.unwrap_or_else(|| "UTC".to_string()),
        },
        is_placeholder: false,
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherFetcher;

    const SAMPLE: &str = r#"{
        "latitude": 39.9,
        "longitude": 116.4,
        "timezone": "Asia/Shanghai",
        "current": {
            "time": "2024-05-01T12:00",
            "temperature_2m": 24.36,
            "relative_humidity_2m": 41,
            "pressure_msl": 1008.44,
            "wind_speed_10m": 3.27,
            "wind_direction_10m": 200,
            "weather_code": 2
        }
    }"#;

    #[test]
    fn maps_open_meteo_fields() {
        let coord = Coordinate::new(39.9042, 116.4074).unwrap();
        let report = parse_current(SAMPLE, coord).expect("sample must parse");

        assert!(!report.is_placeholder);
        assert_eq!(report.current.temperature, 24.4);
        assert_eq!(report.current.humidity, 41.0);
        assert_eq!(report.current.pressure, 1008.4);
        assert_eq!(report.current.wind_speed, 3.3);
        assert_eq!(report.current.wind_direction, 200.0);
        assert_eq!(report.current.description, "Partly cloudy");
        assert_eq!(report.location.timezone, "Asia/Shanghai");
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let coord = Coordinate::new(0.0, 0.0).unwrap();
        let report = parse_current(r#"{"current": {}}"#, coord).unwrap();

        assert_eq!(report.current.weather_code, 0);
        assert_eq!(report.current.temperature, 0.0);
        assert_eq!(report.location.timezone, "UTC");
    }

    #[test]
    fn rejects_body_without_current_block() {
        let coord = Coordinate::new(0.0, 0.0).unwrap();
        let err = parse_current(r#"{"error": true}"#, coord).unwrap_err();
        assert!(err.to_string().contains("Open-Meteo"));
    }

    #[test]
    fn truncates_long_bodies_on_char_boundary() {
        let body = "é".repeat(300);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
    }

    /// Serves one canned HTTP response on a local port and returns its base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn server_error_falls_back_to_placeholder() {
        let base_url = serve_once("500 Internal Server Error", r#"{"reason":"upstream down"}"#).await;
        let provider = OpenMeteoProvider::new(base_url, Duration::from_secs(5)).unwrap();
        let coord = Coordinate::new(39.9042, 116.4074).unwrap();

        let report = WeatherFetcher::new(Box::new(provider)).fetch(coord).await;

        assert!(report.is_placeholder);
        assert!(report.current.description.starts_with("Demo data"));
        assert!(report.current.description.contains("500"));
    }

    #[tokio::test]
    async fn placeholder_description_carries_status() {
        let base_url = serve_once("503 Service Unavailable", "busy").await;
        let provider = OpenMeteoProvider::new(base_url, Duration::from_secs(5)).unwrap();
        let coord = Coordinate::new(1.0, 2.0).unwrap();

        let report = WeatherFetcher::new(Box::new(provider)).fetch(coord).await;

        assert!(report.is_placeholder);
        assert!(report.current.description.contains("503"));
    }

    #[tokio::test]
    async fn refused_connection_falls_back_to_placeholder() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider =
            OpenMeteoProvider::new(format!("http://{addr}/v1"), Duration::from_secs(5)).unwrap();
        let coord = Coordinate::new(1.0, 2.0).unwrap();

        let report = WeatherFetcher::new(Box::new(provider)).fetch(coord).await;

        assert!(report.is_placeholder);
        assert!(report.current.description.contains("Failed to send request to Open-Meteo"));
    }

    #[tokio::test]
    async fn successful_response_is_parsed() {
        let base_url = serve_once("200 OK", SAMPLE).await;
        let provider = OpenMeteoProvider::new(base_url, Duration::from_secs(5)).unwrap();
        let coord = Coordinate::new(39.9042, 116.4074).unwrap();

        let report = WeatherFetcher::new(Box::new(provider)).fetch(coord).await;

        assert!(!report.is_placeholder);
        assert_eq!(report.current.temperature, 24.4);
    }
}
