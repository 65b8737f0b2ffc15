use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{collections::HashMap, time::Duration};
use tracing::debug;

use crate::config::EarthEngineConfig;

use super::{
    RemoteSensing, Sample, SampleRequest, SensingError,
    expr::{self, TIME_START_KEY},
};

const PROBE_COLLECTION: &str = "COPERNICUS/S2_SR_HARMONIZED";

/// Earth Engine REST client (`projects/*/value:compute`).
#[derive(Debug, Clone)]
pub struct EarthEngineClient {
    base_url: String,
    project: Option<String>,
    access_token: Option<String>,
    http: Client,
}

impl EarthEngineClient {
    pub fn new(config: &EarthEngineConfig, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("geoenv/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build Earth Engine HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project: config.project.clone(),
            access_token: config.access_token.clone(),
            http,
        })
    }

    async fn compute(&self, expression: Value) -> Result<Value, SensingError> {
        let project = self
            .project
            .as_deref()
            .ok_or(SensingError::MissingCredentials("Earth Engine project"))?;
        let token = self
            .access_token
            .as_deref()
            .ok_or(SensingError::MissingCredentials("Earth Engine access token"))?;

        let url = format!("{}/v1/projects/{}/value:compute", self.base_url, project);

        let res = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "expression": expression }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        let body = res.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: ComputeResponse = serde_json::from_str(&body)
            .map_err(|err| SensingError::Malformed(format!("compute response: {err}")))?;

        Ok(parsed.result)
    }
}

#[derive(Debug, Deserialize)]
struct ComputeResponse {
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl RemoteSensing for EarthEngineClient {
    async fn sample(&self, request: &SampleRequest) -> Result<Sample, SensingError> {
        debug!(collection = request.collection, "Querying Earth Engine");
        let result = self.compute(expr::latest_band_means(request)).await?;
        parse_sample(result, request.bands)
    }

    async fn ping(&self) -> Result<(), SensingError> {
        let result = self.compute(expr::collection_probe(PROBE_COLLECTION)).await?;
        match result.as_u64() {
            Some(_) => Ok(()),
            None => Err(SensingError::Malformed(format!("probe returned {result}"))),
        }
    }
}

fn parse_sample(result: Value, bands: &[&str]) -> Result<Sample, SensingError> {
    let Value::Object(map) = result else {
        return Err(SensingError::Malformed(format!(
            "expected a dictionary, got {result}"
        )));
    };

    let observed_on = map
        .get(TIME_START_KEY)
        .and_then(Value::as_i64)
        .and_then(millis_to_date);

    let bands: HashMap<String, Option<f64>> = bands
        .iter()
        .map(|band| (band.to_string(), map.get(*band).and_then(Value::as_f64)))
        .collect();

    Ok(Sample { bands, observed_on })
}

fn millis_to_date(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}

fn transport_error(err: reqwest::Error) -> SensingError {
    if err.is_timeout() {
        SensingError::Timeout
    } else {
        SensingError::Unreachable(err.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> SensingError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SensingError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => SensingError::Rejected(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => SensingError::Timeout,
        _ => SensingError::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}
