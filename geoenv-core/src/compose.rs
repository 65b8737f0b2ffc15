//! Response shapes returned by the HTTP API and rendered by the CLI.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::collections::BTreeMap;

use crate::{
    model::Coordinate,
    parameter::ParameterId,
    vegetation::VegetationReport,
    weather::WeatherReport,
};

pub const TOTAL_PARAMETERS: usize = 14;

const STATUS_SUCCESS: &str = "success";

/// The fixed set of environmental parameters reported by the summary endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetParameter {
    Lai,
    Fapar,
    Fvc,
    Albedo,
    Bbe,
    Dsr,
    Par,
    Lst,
    Et,
    Gpp,
    Sce,
    Agb,
    Lwnr,
    Nr,
}

impl TargetParameter {
    pub const ALL: [TargetParameter; TOTAL_PARAMETERS] = [
        TargetParameter::Lai,
        TargetParameter::Fapar,
        TargetParameter::Fvc,
        TargetParameter::Albedo,
        TargetParameter::Bbe,
        TargetParameter::Dsr,
        TargetParameter::Par,
        TargetParameter::Lst,
        TargetParameter::Et,
        TargetParameter::Gpp,
        TargetParameter::Sce,
        TargetParameter::Agb,
        TargetParameter::Lwnr,
        TargetParameter::Nr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TargetParameter::Lai => "LAI",
            TargetParameter::Fapar => "FAPAR",
            TargetParameter::Fvc => "FVC",
            TargetParameter::Albedo => "Albedo",
            TargetParameter::Bbe => "BBE",
            TargetParameter::Dsr => "DSR",
            TargetParameter::Par => "PAR",
            TargetParameter::Lst => "LST",
            TargetParameter::Et => "ET",
            TargetParameter::Gpp => "GPP",
            TargetParameter::Sce => "SCE",
            TargetParameter::Agb => "AGB",
            TargetParameter::Lwnr => "LWNR",
            TargetParameter::Nr => "NR",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TargetParameter::Lai => "Leaf area index",
            TargetParameter::Fapar => "Fraction of absorbed photosynthetically active radiation",
            TargetParameter::Fvc => "Fractional vegetation cover",
            TargetParameter::Albedo => "Broadband albedo",
            TargetParameter::Bbe => "Broadband emissivity",
            TargetParameter::Dsr => "Downward shortwave radiation",
            TargetParameter::Par => "Photosynthetically active radiation",
            TargetParameter::Lst => "Land surface temperature",
            TargetParameter::Et => "Evapotranspiration",
            TargetParameter::Gpp => "Gross primary production",
            TargetParameter::Sce => "Snow cover extent",
            TargetParameter::Agb => "Aboveground biomass (estimate)",
            TargetParameter::Lwnr => "Net longwave radiation",
            TargetParameter::Nr => "Net radiation",
        }
    }

    /// The observed or derived parameter(s) behind this target.
    fn source(&self) -> Source {
        match self {
            TargetParameter::Lai => Source::Single(ParameterId::Lai),
            TargetParameter::Fapar => Source::Single(ParameterId::Fapar),
            TargetParameter::Fvc => Source::Single(ParameterId::Fvc),
            TargetParameter::Albedo => Source::Single(ParameterId::Albedo),
            TargetParameter::Bbe => Source::Single(ParameterId::Bbe),
            TargetParameter::Dsr => Source::Single(ParameterId::Dsr),
            TargetParameter::Par => Source::Single(ParameterId::Par),
            TargetParameter::Lst => Source::DayNight(ParameterId::LstDay, ParameterId::LstNight),
            TargetParameter::Et => Source::Single(ParameterId::Et),
            TargetParameter::Gpp => Source::Single(ParameterId::Gpp),
            TargetParameter::Sce => Source::Single(ParameterId::Sce),
            TargetParameter::Agb => Source::Single(ParameterId::Agb),
            TargetParameter::Lwnr => Source::Single(ParameterId::Lwnr),
            TargetParameter::Nr => Source::Single(ParameterId::Nr),
        }
    }

    pub fn unit(&self) -> &'static str {
        match self.source() {
            Source::Single(id) | Source::DayNight(id, _) => id.unit(),
        }
    }

    pub fn resolve(&self, report: &VegetationReport) -> TargetValue {
        match self.source() {
            Source::Single(id) => TargetValue::Scalar(report.value(id)),
            Source::DayNight(day, night) => TargetValue::DayNight {
                day: report.value(day),
                night: report.value(night),
            },
        }
    }
}

enum Source {
    Single(ParameterId),
    DayNight(ParameterId, ParameterId),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TargetValue {
    Scalar(Option<f64>),
    DayNight { day: Option<f64>, night: Option<f64> },
}

impl TargetValue {
    /// Day/night values count as available when either pass is present.
    pub fn is_available(&self) -> bool {
        match self {
            TargetValue::Scalar(value) => value.is_some(),
            TargetValue::DayNight { day, night } => day.is_some() || night.is_some(),
        }
    }
}

/// The fourteen targets in fixed order, serialized as an ordered JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetParameters(pub Vec<(TargetParameter, TargetValue)>);

impl TargetParameters {
    pub fn from_report(report: &VegetationReport) -> Self {
        Self(
            TargetParameter::ALL
                .iter()
                .map(|target| (*target, target.resolve(report)))
                .collect(),
        )
    }

    pub fn get(&self, target: TargetParameter) -> Option<TargetValue> {
        self.0.iter().find(|(t, _)| *t == target).map(|(_, v)| *v)
    }
}

impl Serialize for TargetParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (target, value) in &self.0 {
            map.serialize_entry(target.name(), value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentalSummary {
    pub total_parameters: usize,
    pub available_parameters: usize,
    pub success_rate: String,
    pub missing_parameters: Vec<String>,
}

impl EnvironmentalSummary {
    pub fn from_targets(targets: &TargetParameters) -> Self {
        let (available, missing) = targets.0.iter().fold(
            (0, Vec::new()),
            |(available, mut missing), (target, value)| {
                if value.is_available() {
                    (available + 1, missing)
                } else {
                    missing.push(target.name().to_string());
                    (available, missing)
                }
            },
        );

        Self {
            total_parameters: TOTAL_PARAMETERS,
            available_parameters: available,
            success_rate: success_rate(available),
            missing_parameters: missing,
        }
    }
}

pub fn success_rate(available: usize) -> String {
    format!("{:.1}%", available as f64 / TOTAL_PARAMETERS as f64 * 100.0)
}

pub fn format_query_time(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherResponse {
    pub status: &'static str,
    pub location: Coordinate,
    pub weather: WeatherReport,
    pub query_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VegetationResponse {
    pub status: &'static str,
    pub location: Coordinate,
    pub summary: EnvironmentalSummary,
    pub vegetation: VegetationReport,
    pub query_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllResponse {
    pub status: &'static str,
    pub location: Coordinate,
    pub weather: WeatherReport,
    pub summary: EnvironmentalSummary,
    pub vegetation: VegetationReport,
    pub query_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentalResponse {
    pub status: &'static str,
    pub location: Coordinate,
    pub summary: EnvironmentalSummary,
    pub target_parameters: TargetParameters,
    pub parameter_descriptions: BTreeMap<&'static str, String>,
    pub data_sources: BTreeMap<&'static str, &'static str>,
    pub raw_data: VegetationReport,
    pub query_time: String,
}

pub fn weather_response(
    location: Coordinate,
    weather: WeatherReport,
    now: DateTime<Utc>,
) -> WeatherResponse {
    WeatherResponse {
        status: STATUS_SUCCESS,
        location,
        weather,
        query_time: format_query_time(now),
    }
}

pub fn vegetation_response(vegetation: VegetationReport, now: DateTime<Utc>) -> VegetationResponse {
    let summary = EnvironmentalSummary::from_targets(&TargetParameters::from_report(&vegetation));
    VegetationResponse {
        status: STATUS_SUCCESS,
        location: vegetation.coordinates,
        summary,
        vegetation,
        query_time: format_query_time(now),
    }
}

pub fn all_response(
    weather: WeatherReport,
    vegetation: VegetationReport,
    now: DateTime<Utc>,
) -> AllResponse {
    let summary = EnvironmentalSummary::from_targets(&TargetParameters::from_report(&vegetation));
    AllResponse {
        status: STATUS_SUCCESS,
        location: vegetation.coordinates,
        weather,
        summary,
        vegetation,
        query_time: format_query_time(now),
    }
}

pub fn environmental_response(vegetation: VegetationReport, now: DateTime<Utc>) -> EnvironmentalResponse {
    let targets = TargetParameters::from_report(&vegetation);
    let summary = EnvironmentalSummary::from_targets(&targets);

    let parameter_descriptions = TargetParameter::ALL
        .iter()
        .map(|t| (t.name(), format!("{} ({})", t.title(), t.unit())))
        .collect();

    EnvironmentalResponse {
        status: STATUS_SUCCESS,
        location: vegetation.coordinates,
        summary,
        target_parameters: targets,
        parameter_descriptions,
        data_sources: data_sources(),
        raw_data: vegetation,
        query_time: format_query_time(now),
    }
}

fn data_sources() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("sentinel2", "Sentinel-2 surface reflectance, 10 m"),
        ("modis", "MODIS land products, 500 m - 1 km"),
        ("era5_land", "ERA5-Land daily reanalysis, ~11 km"),
        ("estimated", "Derived from observed parameters"),
    ])
}
