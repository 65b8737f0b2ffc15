use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::{
    compose::{
        self, AllResponse, EnvironmentalResponse, VegetationResponse, WeatherResponse,
    },
    config::Config,
    error::GeoEnvError,
    model::{Coordinate, QueryWindow},
    sensing::{EarthEngineClient, RemoteSensing},
    vegetation::VegetationAggregator,
    weather::{OpenMeteoProvider, WeatherFetcher, WeatherProvider},
};

pub const ENDPOINTS: &[&str] = &[
    "POST /api/all",
    "POST /api/environmental_parameters",
    "POST /api/weather",
    "POST /api/vegetation",
    "GET /api/simple",
    "GET /api/status",
    "GET /health",
];

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStates {
    pub earth_engine: String,
    pub weather_api: &'static str,
    pub vegetation_analysis: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub services: ServiceStates,
    pub available_endpoints: &'static [&'static str],
    pub timestamp: String,
}

/// Weather, vegetation, and composition behind one request-level API.
#[derive(Debug)]
pub struct EnvironmentService {
    weather: WeatherFetcher,
    sensing: Arc<dyn RemoteSensing>,
    vegetation: VegetationAggregator,
    default_days_back: u32,
}

impl EnvironmentService {
    pub fn new(
        weather: Box<dyn WeatherProvider>,
        sensing: Arc<dyn RemoteSensing>,
        config: &Config,
    ) -> Self {
        Self {
            weather: WeatherFetcher::new(weather),
            vegetation: VegetationAggregator::new(sensing.clone(), config.layer_timeout()),
            sensing,
            default_days_back: config.default_days_back,
        }
    }

    /// Build the production providers from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        if !config.is_earth_engine_configured() {
            warn!(
                "Earth Engine project or access token not configured; vegetation requests will fail"
            );
        }

        let weather = OpenMeteoProvider::new(&config.weather.base_url, config.request_timeout())?;
        let sensing = EarthEngineClient::new(&config.earth_engine, config.layer_timeout())?;

        Ok(Self::new(Box::new(weather), Arc::new(sensing), config))
    }

    pub fn default_days_back(&self) -> u32 {
        self.default_days_back
    }

    /// Validate raw request values. Latitude is checked first, then
    /// longitude, then the day count.
    pub fn window(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
        days_back: Option<i64>,
    ) -> Result<QueryWindow, GeoEnvError> {
        let coordinate = coordinate(latitude, longitude)?;
        let days_back = days_back.unwrap_or_else(|| i64::from(self.default_days_back));
        QueryWindow::ending_today(coordinate, days_back)
    }

    pub async fn weather(&self, coordinate: Coordinate) -> WeatherResponse {
        let report = self.weather.fetch(coordinate).await;
        compose::weather_response(coordinate, report, Utc::now())
    }

    pub async fn vegetation(&self, window: &QueryWindow) -> Result<VegetationResponse, GeoEnvError> {
        let report = self.vegetation.aggregate(window).await?;
        Ok(compose::vegetation_response(report, Utc::now()))
    }

    pub async fn all(&self, window: &QueryWindow) -> Result<AllResponse, GeoEnvError> {
        let weather = self.weather.fetch(window.coordinate).await;
        let vegetation = self.vegetation.aggregate(window).await?;
        Ok(compose::all_response(weather, vegetation, Utc::now()))
    }

    pub async fn environmental_parameters(
        &self,
        window: &QueryWindow,
    ) -> Result<EnvironmentalResponse, GeoEnvError> {
        let report = self.vegetation.aggregate(window).await?;
        Ok(compose::environmental_response(report, Utc::now()))
    }

    /// Never fails; a failed probe is reported as `degraded`.
    pub async fn status(&self) -> StatusResponse {
        let (status, earth_engine) = match self.sensing.ping().await {
            Ok(()) => ("operational", "connected".to_string()),
            Err(err) => {
                warn!("Earth Engine probe failed: {err}");
                ("degraded", format!("error: {err}"))
            }
        };

        StatusResponse {
            status,
            services: ServiceStates {
                earth_engine,
                weather_api: "operational",
                vegetation_analysis: "operational",
            },
            available_endpoints: ENDPOINTS,
            timestamp: compose::format_query_time(Utc::now()),
        }
    }
}

pub fn coordinate(latitude: Option<f64>, longitude: Option<f64>) -> Result<Coordinate, GeoEnvError> {
    let latitude = latitude.ok_or(GeoEnvError::MissingField("latitude"))?;
    let longitude = longitude.ok_or(GeoEnvError::MissingField("longitude"))?;
    Coordinate::new(latitude, longitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sensing::{Sample, SampleRequest, SensingError},
        weather::WeatherReport,
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingSensing {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteSensing for CountingSensing {
        async fn sample(&self, _request: &SampleRequest) -> Result<Sample, SensingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SensingError::Rejected("no image".into()))
        }

        async fn ping(&self) -> Result<(), SensingError> {
            Err(SensingError::MissingCredentials("Earth Engine access token"))
        }
    }

    #[derive(Debug)]
    struct OfflineWeather;

    #[async_trait]
    impl WeatherProvider for OfflineWeather {
        async fn current(&self, _coordinate: Coordinate) -> anyhow::Result<WeatherReport> {
            Err(anyhow!("dns error"))
        }
    }

    fn service() -> (EnvironmentService, Arc<CountingSensing>) {
        let sensing = Arc::new(CountingSensing::default());
        let service = EnvironmentService::new(Box::new(OfflineWeather), sensing.clone(), &Config::default());
        (service, sensing)
    }

    #[test]
    fn window_validates_latitude_before_longitude() {
        let (service, _) = service();

        let err = service.window(Some(-91.0), Some(200.0), None).unwrap_err();
        assert_eq!(err.field(), Some("latitude"));

        let err = service.window(Some(10.0), None, None).unwrap_err();
        assert_eq!(err.field(), Some("longitude"));

        let window = service.window(Some(10.0), Some(10.0), None).unwrap();
        assert_eq!(window.days_back, 30);
    }

    #[tokio::test]
    async fn weather_failure_still_returns_success_shape() {
        let (service, _) = service();
        let coord = Coordinate::new(1.0, 2.0).unwrap();

        let response = service.weather(coord).await;

        assert_eq!(response.status, "success");
        assert!(response.weather.is_placeholder);
    }

    #[tokio::test]
    async fn all_queries_every_layer_once() {
        let (service, sensing) = service();
        let window = service.window(Some(1.0), Some(2.0), Some(7)).unwrap();

        let response = service.all(&window).await.unwrap();

        assert_eq!(sensing.calls.load(Ordering::SeqCst), 8);
        assert_eq!(response.summary.total_parameters, 14);
        assert_eq!(response.summary.available_parameters, 0);
        assert!(response.weather.is_placeholder);
    }

    #[tokio::test]
    async fn status_reports_degraded_probe() {
        let (service, _) = service();

        let status = service.status().await;

        assert_eq!(status.status, "degraded");
        assert!(status.services.earth_engine.contains("access token"));
        assert!(status.available_endpoints.contains(&"GET /health"));
    }
}
