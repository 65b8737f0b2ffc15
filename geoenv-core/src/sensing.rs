//! Remote-sensing access.
//!
//! [`RemoteSensing`] answers one question: "what is the mean of these bands
//! around this point in the most recent image of this collection within this
//! date range?". The Earth Engine REST client is the production
//! implementation; tests substitute their own.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::{collections::HashMap, fmt::Debug};
use thiserror::Error;

use crate::model::Coordinate;

pub mod earthengine;
pub mod expr;

pub use earthengine::EarthEngineClient;

/// A single "latest image, buffered mean" query.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    pub collection: &'static str,
    pub bands: &'static [&'static str],
    pub point: Coordinate,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Reduction scale in meters.
    pub scale_m: f64,
    /// Radius of the neighborhood averaged around the point, in meters.
    pub buffer_m: f64,
    /// Upper bound on `CLOUDY_PIXEL_PERCENTAGE`, for optical collections.
    pub max_cloud_pct: Option<f64>,
}

/// Band means of the selected image. Masked bands come back as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    pub bands: HashMap<String, Option<f64>>,
    pub observed_on: Option<NaiveDate>,
}

impl Sample {
    pub fn band(&self, name: &str) -> Option<f64> {
        self.bands.get(name).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.values().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Error)]
pub enum SensingError {
    #[error("remote sensing credentials missing: {0}")]
    MissingCredentials(&'static str),

    #[error("remote sensing request unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("remote sensing provider unreachable: {0}")]
    Unreachable(String),

    #[error("remote sensing request timed out")]
    Timeout,

    /// The provider evaluated the query and refused it, most often because
    /// the collection had no image in range.
    #[error("no usable image: {0}")]
    Rejected(String),

    #[error("remote sensing provider error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("unexpected remote sensing response: {0}")]
    Malformed(String),
}

impl SensingError {
    /// Errors that would fail every query the same way, as opposed to
    /// failures specific to one collection or location.
    pub fn is_outage(&self) -> bool {
        matches!(
            self,
            SensingError::MissingCredentials(_)
                | SensingError::Unauthorized { .. }
                | SensingError::Unreachable(_)
        )
    }
}

#[async_trait]
pub trait RemoteSensing: Send + Sync + Debug {
    async fn sample(&self, request: &SampleRequest) -> Result<Sample, SensingError>;

    /// Cheap connectivity check used by the status endpoint.
    async fn ping(&self) -> Result<(), SensingError>;
}
