use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    derived,
    error::GeoEnvError,
    model::{Coordinate, DateRange, QueryWindow},
    parameter::{ParameterId, ParameterReading},
    sensing::{RemoteSensing, Sample, SensingError},
};

pub mod layer;

pub use layer::Layer;

/// Outcome of one layer query, kept for provenance in the full report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStatus {
    pub layer: Layer,
    pub collection: &'static str,
    pub resolution_m: f64,
    pub available: bool,
    pub observed_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VegetationReport {
    pub coordinates: Coordinate,
    pub date_range: DateRange,
    pub parameters: BTreeMap<ParameterId, ParameterReading>,
    pub layers: Vec<LayerStatus>,
}

impl VegetationReport {
    pub fn value(&self, id: ParameterId) -> Option<f64> {
        self.parameters.get(&id).and_then(ParameterReading::value)
    }

    pub fn reading(&self, id: ParameterId) -> Option<&ParameterReading> {
        self.parameters.get(&id)
    }
}

/// Queries every [`Layer`] for a window and folds the results into a report.
#[derive(Debug, Clone)]
pub struct VegetationAggregator {
    sensing: Arc<dyn RemoteSensing>,
    layer_timeout: Duration,
}

impl VegetationAggregator {
    pub fn new(sensing: Arc<dyn RemoteSensing>, layer_timeout: Duration) -> Self {
        Self {
            sensing,
            layer_timeout,
        }
    }

    /// Fails only when every layer hit a provider outage.
    pub async fn aggregate(&self, window: &QueryWindow) -> Result<VegetationReport, GeoEnvError> {
        let range = window.date_range();
        info!(
            coordinate = %window.coordinate,
            start = %range.start,
            end = %range.end,
            "Collecting vegetation parameters"
        );

        let outcomes = join_all(Layer::ALL.iter().map(|layer| self.query(*layer, window))).await;

        let all_outages = outcomes
            .iter()
            .all(|(_, outcome)| matches!(outcome, Err(err) if err.is_outage()));
        if all_outages {
            if let Some((_, Err(err))) = outcomes.first() {
                warn!("Every vegetation layer failed: {err}");
                return Err(GeoEnvError::ProviderUnavailable(err.to_string()));
            }
        }

        let mut parameters = BTreeMap::new();
        let mut layers = Vec::with_capacity(outcomes.len());

        for (layer, outcome) in outcomes {
            let status = match outcome {
                Ok(sample) => {
                    for reading in layer.readings(&sample) {
                        parameters.insert(reading.id, reading);
                    }
                    layer_status(layer, Some(&sample), None)
                }
                Err(err) => {
                    warn!(layer = ?layer, collection = layer.collection(), "Layer unavailable: {err}");
                    for id in layer.parameters() {
                        parameters.insert(*id, ParameterReading::unavailable(*id, err.to_string()));
                    }
                    layer_status(layer, None, Some(err.to_string()))
                }
            };
            layers.push(status);
        }

        for reading in derived::derive(&parameters) {
            parameters.insert(reading.id, reading);
        }

        let resolved = parameters.values().filter(|r| r.value().is_some()).count();
        info!(resolved, total = parameters.len(), "Vegetation parameters collected");

        Ok(VegetationReport {
            coordinates: window.coordinate,
            date_range: range,
            parameters,
            layers,
        })
    }

    async fn query(&self, layer: Layer, window: &QueryWindow) -> (Layer, Result<Sample, SensingError>) {
        let request = layer.request(window);

        let outcome = match tokio::time::timeout(self.layer_timeout, self.sensing.sample(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(SensingError::Timeout),
        };

        debug!(layer = ?layer, ok = outcome.is_ok(), "Layer query finished");
        (layer, outcome)
    }
}

fn layer_status(layer: Layer, sample: Option<&Sample>, reason: Option<String>) -> LayerStatus {
    let available = sample.is_some_and(|s| !s.is_empty());
    let reason = match (sample, reason) {
        (_, Some(reason)) => Some(reason),
        (Some(_), None) if !available => Some("all bands masked".to_string()),
        _ => None,
    };

    LayerStatus {
        layer,
        collection: layer.collection(),
        resolution_m: layer.scale_m(),
        available,
        observed_on: sample.and_then(|s| s.observed_on),
        reason,
    }
}
