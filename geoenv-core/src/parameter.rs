use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Every value the vegetation report can carry, observed or derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ParameterId {
    #[serde(rename = "NDVI")]
    Ndvi,
    #[serde(rename = "EVI")]
    Evi,
    #[serde(rename = "SAVI")]
    Savi,
    #[serde(rename = "LAI")]
    Lai,
    #[serde(rename = "FAPAR")]
    Fapar,
    #[serde(rename = "FVC")]
    Fvc,
    #[serde(rename = "Albedo")]
    Albedo,
    #[serde(rename = "BBE")]
    Bbe,
    #[serde(rename = "DSR")]
    Dsr,
    #[serde(rename = "PAR")]
    Par,
    #[serde(rename = "LST_Day")]
    LstDay,
    #[serde(rename = "LST_Night")]
    LstNight,
    #[serde(rename = "ET")]
    Et,
    #[serde(rename = "GPP")]
    Gpp,
    #[serde(rename = "SCE")]
    Sce,
    #[serde(rename = "AGB")]
    Agb,
    #[serde(rename = "LWNR")]
    Lwnr,
    #[serde(rename = "NR")]
    Nr,
}

impl ParameterId {
    pub fn name(&self) -> &'static str {
        match self {
            ParameterId::Ndvi => "NDVI",
            ParameterId::Evi => "EVI",
            ParameterId::Savi => "SAVI",
            ParameterId::Lai => "LAI",
            ParameterId::Fapar => "FAPAR",
            ParameterId::Fvc => "FVC",
            ParameterId::Albedo => "Albedo",
            ParameterId::Bbe => "BBE",
            ParameterId::Dsr => "DSR",
            ParameterId::Par => "PAR",
            ParameterId::LstDay => "LST_Day",
            ParameterId::LstNight => "LST_Night",
            ParameterId::Et => "ET",
            ParameterId::Gpp => "GPP",
            ParameterId::Sce => "SCE",
            ParameterId::Agb => "AGB",
            ParameterId::Lwnr => "LWNR",
            ParameterId::Nr => "NR",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ParameterId::Ndvi | ParameterId::Evi | ParameterId::Savi => "-1 to 1",
            ParameterId::Lai => "m²/m²",
            ParameterId::Fapar
            | ParameterId::Fvc
            | ParameterId::Albedo
            | ParameterId::Bbe => "0-1",
            ParameterId::Dsr | ParameterId::Par | ParameterId::Lwnr | ParameterId::Nr => "W/m²",
            ParameterId::LstDay | ParameterId::LstNight => "°C",
            ParameterId::Et => "kg/m²/8day",
            ParameterId::Gpp => "kg C/m²/8day",
            ParameterId::Sce => "%",
            ParameterId::Agb => "g/m²",
        }
    }

    fn decimals(&self) -> i32 {
        match self {
            ParameterId::Sce => 0,
            ParameterId::Lai | ParameterId::Fapar => 3,
            ParameterId::Dsr
            | ParameterId::Par
            | ParameterId::LstDay
            | ParameterId::LstNight
            | ParameterId::Et
            | ParameterId::Agb
            | ParameterId::Lwnr
            | ParameterId::Nr => 2,
            _ => 4,
        }
    }

    /// Rounds to the precision reported for this parameter.
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.decimals());
        (value * factor).round() / factor
    }
}

impl std::fmt::Display for ParameterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    /// Collection id, or a `derived:` label for computed values.
    pub source: String,
    pub resolution_m: Option<f64>,
    pub observed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { value: f64, provenance: Provenance },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterReading {
    pub id: ParameterId,
    pub resolution: Resolution,
}

impl ParameterReading {
    pub fn resolved(id: ParameterId, value: f64, provenance: Provenance) -> Self {
        Self {
            id,
            resolution: Resolution::Resolved {
                value: id.round(value),
                provenance,
            },
        }
    }

    pub fn unavailable(id: ParameterId, reason: impl Into<String>) -> Self {
        Self {
            id,
            resolution: Resolution::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn value(&self) -> Option<f64> {
        match &self.resolution {
            Resolution::Resolved { value, .. } => Some(*value),
            Resolution::Unavailable { .. } => None,
        }
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match &self.resolution {
            Resolution::Resolved { provenance, .. } => Some(provenance),
            Resolution::Unavailable { .. } => None,
        }
    }

    pub fn missing_reason(&self) -> Option<&str> {
        match &self.resolution {
            Resolution::Resolved { .. } => None,
            Resolution::Unavailable { reason } => Some(reason),
        }
    }
}

#[derive(Serialize)]
struct ReadingView<'a> {
    value: Option<f64>,
    unit: &'static str,
    source: Option<&'a str>,
    resolution_m: Option<f64>,
    observed_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_reason: Option<&'a str>,
}

impl Serialize for ParameterReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let provenance = self.provenance();
        ReadingView {
            value: self.value(),
            unit: self.id.unit(),
            source: provenance.map(|p| p.source.as_str()),
            resolution_m: provenance.and_then(|p| p.resolution_m),
            observed_on: provenance.and_then(|p| p.observed_on),
            missing_reason: self.missing_reason(),
        }
        .serialize(serializer)
    }
}
