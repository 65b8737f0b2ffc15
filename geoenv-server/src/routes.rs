use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use chrono::Utc;
use geoenv_core::{
    AllResponse, EnvironmentService, EnvironmentalResponse, StatusResponse, VegetationResponse,
    WeatherResponse, service,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::ApiError;

/// Default point for `/api/simple` (Beijing).
const SIMPLE_DEFAULT_LAT: f64 = 39.9042;
const SIMPLE_DEFAULT_LON: f64 = 116.4074;

#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<EnvironmentService>,
}

#[derive(Debug, Deserialize)]
pub struct LocationBody {
    latitude: Option<f64>,
    longitude: Option<f64>,
    days_back: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SimpleQuery {
    lat: Option<f64>,
    lon: Option<f64>,
    days: Option<i64>,
}

pub fn router(service: Arc<EnvironmentService>) -> Router {
    Router::new()
        .route("/api/environmental_parameters", post(environmental_parameters))
        .route("/api/all", post(all))
        .route("/api/weather", post(weather))
        .route("/api/vegetation", post(vegetation))
        .route("/api/simple", get(simple))
        .route("/api/status", get(status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(AppState { service })
}

async fn environmental_parameters(
    State(state): State<AppState>,
    body: Result<Json<LocationBody>, JsonRejection>,
) -> Result<Json<EnvironmentalResponse>, ApiError> {
    let Json(body) = body?;
    let window = state
        .service
        .window(body.latitude, body.longitude, body.days_back)?;
    Ok(Json(state.service.environmental_parameters(&window).await?))
}

async fn all(
    State(state): State<AppState>,
    body: Result<Json<LocationBody>, JsonRejection>,
) -> Result<Json<AllResponse>, ApiError> {
    let Json(body) = body?;
    let window = state
        .service
        .window(body.latitude, body.longitude, body.days_back)?;
    Ok(Json(state.service.all(&window).await?))
}

async fn weather(
    State(state): State<AppState>,
    body: Result<Json<LocationBody>, JsonRejection>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let Json(body) = body?;
    let coordinate = service::coordinate(body.latitude, body.longitude)?;
    Ok(Json(state.service.weather(coordinate).await))
}

async fn vegetation(
    State(state): State<AppState>,
    body: Result<Json<LocationBody>, JsonRejection>,
) -> Result<Json<VegetationResponse>, ApiError> {
    let Json(body) = body?;
    let window = state
        .service
        .window(body.latitude, body.longitude, body.days_back)?;
    Ok(Json(state.service.vegetation(&window).await?))
}

async fn simple(
    State(state): State<AppState>,
    query: Result<Query<SimpleQuery>, QueryRejection>,
) -> Result<Json<AllResponse>, ApiError> {
    let Query(query) = query?;
    let window = state.service.window(
        Some(query.lat.unwrap_or(SIMPLE_DEFAULT_LAT)),
        Some(query.lon.unwrap_or(SIMPLE_DEFAULT_LON)),
        query.days,
    )?;
    Ok(Json(state.service.all(&window).await?))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.service.status().await)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use chrono::NaiveDate;
    use geoenv_core::{
        Config, Coordinate, RemoteSensing, Sample, SampleRequest, SensingError, WeatherProvider,
        WeatherReport,
        weather::{CurrentConditions, WeatherLocation},
    };
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };
    use tower::ServiceExt;

    /// Canned band means keyed by collection; anything else is "no image".
    #[derive(Debug, Default)]
    struct FakeSensing {
        samples: HashMap<&'static str, Vec<(&'static str, f64)>>,
        unauthorized: bool,
        calls: AtomicUsize,
    }

    impl FakeSensing {
        fn land() -> Self {
            let samples = HashMap::from([
                (
                    "COPERNICUS/S2_SR_HARMONIZED",
                    vec![("B2", 450.0), ("B4", 700.0), ("B8", 3100.0)],
                ),
                ("MODIS/061/MCD15A3H", vec![("Lai", 21.0), ("Fpar", 55.0)]),
                ("MODIS/061/MCD43A3", vec![("Albedo_WSA_shortwave", 162.0)]),
                (
                    "MODIS/061/MOD11A1",
                    vec![("LST_Day_1km", 15100.0), ("LST_Night_1km", 14400.0)],
                ),
                ("MODIS/061/MOD16A2", vec![("ET", 182.0)]),
                ("MODIS/061/MOD17A2H", vec![("Gpp", 412.0)]),
                ("MODIS/061/MOD10A1", vec![("NDSI_Snow_Cover", 0.0)]),
                (
                    "ECMWF/ERA5_LAND/DAILY_AGGR",
                    vec![("surface_solar_radiation_downwards_sum", 19_500_000.0)],
                ),
            ]);
            Self {
                samples,
                ..Self::default()
            }
        }

        fn ocean() -> Self {
            let samples = HashMap::from([
                ("MODIS/061/MOD10A1", vec![("NDSI_Snow_Cover", 239.0)]),
                (
                    "ECMWF/ERA5_LAND/DAILY_AGGR",
                    vec![("surface_solar_radiation_downwards_sum", 21_000_000.0)],
                ),
            ]);
            Self {
                samples,
                ..Self::default()
            }
        }

        fn unauthorized() -> Self {
            Self {
                unauthorized: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl RemoteSensing for FakeSensing {
        async fn sample(&self, request: &SampleRequest) -> Result<Sample, SensingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unauthorized {
                return Err(SensingError::Unauthorized {
                    status: 401,
                    message: "Request had invalid authentication credentials.".into(),
                });
            }

            let bands = self
                .samples
                .get(request.collection)
                .ok_or_else(|| SensingError::Rejected("no image in range".into()))?;

            Ok(Sample {
                bands: bands
                    .iter()
                    .map(|(name, value)| (name.to_string(), Some(*value)))
                    .collect(),
                observed_on: NaiveDate::from_ymd_opt(2024, 4, 27),
            })
        }

        async fn ping(&self) -> Result<(), SensingError> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FixedWeather {
        online: bool,
    }

    #[async_trait]
    impl WeatherProvider for FixedWeather {
        async fn current(&self, _coordinate: Coordinate) -> anyhow::Result<WeatherReport> {
            if !self.online {
                return Err(anyhow!("Failed to send request to Open-Meteo"));
            }
            Ok(WeatherReport {
                current: CurrentConditions {
                    temperature: 24.1,
                    humidity: 38.0,
                    pressure: 1009.3,
                    description: "Partly cloudy".into(),
                    wind_speed: 2.7,
                    wind_direction: 190.0,
                    weather_code: 2,
                    note: "Source: Open-Meteo".into(),
                },
                location: WeatherLocation {
                    name: "Point (39.9042, 116.4074)".into(),
                    timezone: "Asia/Shanghai".into(),
                },
                is_placeholder: false,
            })
        }
    }

    fn app(sensing: Arc<FakeSensing>, weather_online: bool) -> Router {
        let service = EnvironmentService::new(
            Box::new(FixedWeather {
                online: weather_online,
            }),
            sensing,
            &Config::default(),
        );
        router(Arc::new(service))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(app, request).await
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn beijing_summary_has_twelve_of_fourteen() {
        let (status, json) = post_json(
            app(Arc::new(FakeSensing::land()), true),
            "/api/environmental_parameters",
            json!({"latitude": 39.9042, "longitude": 116.4074, "days_back": 30}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"]["total_parameters"], 14);
        assert_eq!(json["summary"]["available_parameters"], 12);
        assert_eq!(json["summary"]["success_rate"], "85.7%");
        assert_eq!(json["summary"]["missing_parameters"], json!(["LWNR", "NR"]));
        assert!(json["target_parameters"]["LWNR"].is_null());
        assert!(json["target_parameters"]["NR"].is_null());
        assert_eq!(json["target_parameters"]["LAI"], 2.1);
    }

    #[tokio::test]
    async fn ocean_point_keeps_weather_but_drops_reflectance() {
        let (status, json) = post_json(
            app(Arc::new(FakeSensing::ocean()), true),
            "/api/all",
            json!({"latitude": -30.0, "longitude": -140.0}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        for name in ["NDVI", "EVI", "SAVI", "FVC", "AGB"] {
            assert!(json["vegetation"]["parameters"][name]["value"].is_null(), "{name}");
        }
        assert_eq!(json["weather"]["current"]["temperature"], 24.1);
        assert_eq!(json["weather"]["is_placeholder"], false);
    }

    #[tokio::test]
    async fn weather_outage_returns_flagged_placeholder() {
        let (status, json) = post_json(
            app(Arc::new(FakeSensing::land()), false),
            "/api/all",
            json!({"latitude": 39.9042, "longitude": 116.4074}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["weather"]["is_placeholder"], true);
        assert!(
            json["weather"]["current"]["description"]
                .as_str()
                .unwrap()
                .starts_with("Demo data")
        );
        assert_eq!(json["summary"]["available_parameters"], 12);
    }

    #[tokio::test]
    async fn invalid_latitude_is_rejected_before_any_query() {
        let sensing = Arc::new(FakeSensing::land());
        let (status, json) = post_json(
            app(sensing.clone(), true),
            "/api/environmental_parameters",
            json!({"latitude": 95.0, "longitude": 116.4}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["field"], "latitude");
        assert_eq!(sensing.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_longitude_names_the_field() {
        let (status, json) = post_json(
            app(Arc::new(FakeSensing::land()), true),
            "/api/weather",
            json!({"latitude": 10.0, "longitude": -200.0}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["field"], "longitude");
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let (status, json) = post_json(
            app(Arc::new(FakeSensing::land()), true),
            "/api/vegetation",
            json!({"latitude": "north", "longitude": 1.0}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("invalid request body"));
    }

    #[tokio::test]
    async fn out_of_range_days_back_is_rejected() {
        let (status, json) = post_json(
            app(Arc::new(FakeSensing::land()), true),
            "/api/vegetation",
            json!({"latitude": 1.0, "longitude": 1.0, "days_back": 0}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["field"], "days_back");
    }

    #[tokio::test]
    async fn provider_outage_is_a_server_error() {
        let (status, json) = post_json(
            app(Arc::new(FakeSensing::unauthorized()), true),
            "/api/environmental_parameters",
            json!({"latitude": 39.9042, "longitude": 116.4074}),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .contains("invalid authentication credentials")
        );
    }

    #[tokio::test]
    async fn simple_defaults_to_beijing() {
        let (status, json) = get_json(app(Arc::new(FakeSensing::land()), true), "/api/simple").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["location"]["latitude"], 39.9042);
        assert_eq!(json["vegetation"]["date_range"].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn simple_honours_query_parameters() {
        let (status, json) = get_json(
            app(Arc::new(FakeSensing::land()), true),
            "/api/simple?lat=31.2304&lon=121.4737&days=7",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["location"]["longitude"], 121.4737);
    }

    #[tokio::test]
    async fn health_and_status_respond() {
        let (status, json) = get_json(app(Arc::new(FakeSensing::land()), true), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");

        let (status, json) = get_json(app(Arc::new(FakeSensing::land()), true), "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "operational");
        assert_eq!(json["services"]["earth_engine"], "connected");
    }
}
