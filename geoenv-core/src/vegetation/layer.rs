use serde::Serialize;

use crate::{
    model::QueryWindow,
    parameter::{ParameterId, ParameterReading, Provenance},
    sensing::{Sample, SampleRequest},
};

/// Sentinel-2 L2A reflectance is stored as DN × 10000.
const S2_REFLECTANCE_SCALE: f64 = 10_000.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const KELVIN_OFFSET: f64 = 273.15;

const MASKED: &str = "no valid pixel at this location (masked or fill value)";

/// One independent remote-sensing query per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Reflectance,
    LeafArea,
    Albedo,
    SurfaceTemperature,
    Evapotranspiration,
    Productivity,
    SnowCover,
    Shortwave,
}

impl Layer {
    pub const ALL: [Layer; 8] = [
        Layer::Reflectance,
        Layer::LeafArea,
        Layer::Albedo,
        Layer::SurfaceTemperature,
        Layer::Evapotranspiration,
        Layer::Productivity,
        Layer::SnowCover,
        Layer::Shortwave,
    ];

    pub fn collection(&self) -> &'static str {
        match self {
            Layer::Reflectance => "COPERNICUS/S2_SR_HARMONIZED",
            Layer::LeafArea => "MODIS/061/MCD15A3H",
            Layer::Albedo => "MODIS/061/MCD43A3",
            Layer::SurfaceTemperature => "MODIS/061/MOD11A1",
            Layer::Evapotranspiration => "MODIS/061/MOD16A2",
            Layer::Productivity => "MODIS/061/MOD17A2H",
            Layer::SnowCover => "MODIS/061/MOD10A1",
            Layer::Shortwave => "ECMWF/ERA5_LAND/DAILY_AGGR",
        }
    }

    pub fn bands(&self) -> &'static [&'static str] {
        match self {
            Layer::Reflectance => &["B2", "B4", "B8"],
            Layer::LeafArea => &["Lai", "Fpar"],
            Layer::Albedo => &["Albedo_WSA_shortwave"],
            Layer::SurfaceTemperature => &["LST_Day_1km", "LST_Night_1km"],
            Layer::Evapotranspiration => &["ET"],
            Layer::Productivity => &["Gpp"],
            Layer::SnowCover => &["NDSI_Snow_Cover"],
            Layer::Shortwave => &["surface_solar_radiation_downwards_sum"],
        }
    }

    /// Native resolution, used as the reduction scale.
    pub fn scale_m(&self) -> f64 {
        match self {
            Layer::Reflectance => 10.0,
            Layer::SurfaceTemperature => 1000.0,
            Layer::Shortwave => 11_132.0,
            _ => 500.0,
        }
    }

    fn buffer_m(&self) -> f64 {
        match self {
            Layer::Reflectance => 10.0,
            Layer::SurfaceTemperature => 500.0,
            Layer::Shortwave => 5000.0,
            _ => 250.0,
        }
    }

    fn max_cloud_pct(&self) -> Option<f64> {
        match self {
            Layer::Reflectance => Some(20.0),
            _ => None,
        }
    }

    /// Parameters this layer resolves, all set missing when the query fails.
    pub fn parameters(&self) -> &'static [ParameterId] {
        match self {
            Layer::Reflectance => &[ParameterId::Ndvi, ParameterId::Evi, ParameterId::Savi],
            Layer::LeafArea => &[ParameterId::Lai, ParameterId::Fapar],
            Layer::Albedo => &[ParameterId::Albedo],
            Layer::SurfaceTemperature => &[ParameterId::LstDay, ParameterId::LstNight],
            Layer::Evapotranspiration => &[ParameterId::Et],
            Layer::Productivity => &[ParameterId::Gpp],
            Layer::SnowCover => &[ParameterId::Sce],
            Layer::Shortwave => &[ParameterId::Dsr],
        }
    }

    pub fn request(&self, window: &QueryWindow) -> SampleRequest {
        SampleRequest {
            collection: self.collection(),
            bands: self.bands(),
            point: window.coordinate,
            start: window.start(),
            end: window.end,
            scale_m: self.scale_m(),
            buffer_m: self.buffer_m(),
            max_cloud_pct: self.max_cloud_pct(),
        }
    }

    /// Converts raw band means into physical parameter values.
    pub fn values(&self, sample: &Sample) -> Vec<(ParameterId, Option<f64>)> {
        match self {
            Layer::Reflectance => {
                let blue = sample.band("B2").map(|v| v / S2_REFLECTANCE_SCALE);
                let red = sample.band("B4").map(|v| v / S2_REFLECTANCE_SCALE);
                let nir = sample.band("B8").map(|v| v / S2_REFLECTANCE_SCALE);
                vec![
                    (ParameterId::Ndvi, ndvi(nir, red)),
                    (ParameterId::Evi, evi(nir, red, blue)),
                    (ParameterId::Savi, savi(nir, red)),
                ]
            }
            Layer::LeafArea => vec![
                (ParameterId::Lai, retrieved(sample.band("Lai")).map(|v| v / 10.0)),
                (ParameterId::Fapar, retrieved(sample.band("Fpar")).map(|v| v / 100.0)),
            ],
            Layer::Albedo => vec![(
                ParameterId::Albedo,
                sample.band("Albedo_WSA_shortwave").map(|v| v / 1000.0),
            )],
            Layer::SurfaceTemperature => vec![
                (
                    ParameterId::LstDay,
                    sample.band("LST_Day_1km").map(kelvin_to_celsius),
                ),
                (
                    ParameterId::LstNight,
                    sample.band("LST_Night_1km").map(kelvin_to_celsius),
                ),
            ],
            Layer::Evapotranspiration => {
                vec![(ParameterId::Et, sample.band("ET").map(|v| v / 10.0))]
            }
            Layer::Productivity => {
                vec![(ParameterId::Gpp, sample.band("Gpp").map(|v| v / 10_000.0))]
            }
            Layer::SnowCover => vec![(
                ParameterId::Sce,
                // Valid NDSI cover is 0-100; anything above is a class code.
                sample
                    .band("NDSI_Snow_Cover")
                    .filter(|v| (0.0..=100.0).contains(v)),
            )],
            Layer::Shortwave => vec![(
                ParameterId::Dsr,
                sample
                    .band("surface_solar_radiation_downwards_sum")
                    .map(|joules| joules / SECONDS_PER_DAY),
            )],
        }
    }

    /// Readings for a successfully queried layer.
    pub fn readings(&self, sample: &Sample) -> Vec<ParameterReading> {
        let provenance = Provenance {
            source: self.collection().to_string(),
            resolution_m: Some(self.scale_m()),
            observed_on: sample.observed_on,
        };

        self.values(sample)
            .into_iter()
            .map(|(id, value)| match value.filter(|v| v.is_finite()) {
                Some(value) => ParameterReading::resolved(id, value, provenance.clone()),
                None => ParameterReading::unavailable(id, MASKED),
            })
            .collect()
    }
}

/// MCD15A3H stores LAI and FPAR as 1..=100. Zero is no retrieval and
/// 248-255 are fill codes; a mean that drifts above 100 has fill mixed in.
fn retrieved(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0 && *v <= 100.0)
}

fn kelvin_to_celsius(raw: f64) -> f64 {
    raw * 0.02 - KELVIN_OFFSET
}

fn ndvi(nir: Option<f64>, red: Option<f64>) -> Option<f64> {
    let (nir, red) = (nir?, red?);
    let denom = nir + red;
    (denom != 0.0).then(|| (nir - red) / denom)
}

fn evi(nir: Option<f64>, red: Option<f64>, blue: Option<f64>) -> Option<f64> {
    let (nir, red, blue) = (nir?, red?, blue?);
    let denom = nir + 6.0 * red - 7.5 * blue + 1.0;
    (denom != 0.0).then(|| 2.5 * (nir - red) / denom)
}

fn savi(nir: Option<f64>, red: Option<f64>) -> Option<f64> {
    let (nir, red) = (nir?, red?);
    let denom = nir + red + 0.5;
    (denom != 0.0).then(|| 1.5 * (nir - red) / denom)
}
