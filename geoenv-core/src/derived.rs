//! Secondary parameters computed from already-resolved observations.
//!
//! Every formula takes `Option` inputs and returns `None` when a required
//! input is missing.

use std::collections::BTreeMap;

use crate::parameter::{ParameterId, ParameterReading, Provenance};

/// Share of downward shortwave radiation in the 400–700 nm band.
pub const PAR_FRACTION: f64 = 0.45;

const NDVI_SOIL: f64 = 0.05;
const NDVI_VEGETATION: f64 = 0.95;
const EMISSIVITY_MIN: f64 = 0.90;
const EMISSIVITY_MAX: f64 = 1.0;

const ENERGY_BALANCE: &str = "not computed: requires a surface energy-balance model";

/// Fractional vegetation cover, scaled-NDVI squared.
pub fn fractional_cover(ndvi: Option<f64>) -> Option<f64> {
    let scaled = (ndvi? - NDVI_SOIL) / (NDVI_VEGETATION - NDVI_SOIL);
    Some(scaled.clamp(0.0, 1.0).powi(2))
}

/// Broadband emissivity. Vegetated pixels (NDVI > 0.2) follow the NDVI
/// threshold method, bare soil is 0.95; canopy LAI adds a small cavity term.
pub fn broadband_emissivity(ndvi: Option<f64>, lai: Option<f64>) -> Option<f64> {
    let ndvi = ndvi?;
    let base = if ndvi > 0.2 { 0.986 + 0.004 * ndvi } else { 0.95 };
    let canopy = lai.map_or(0.0, |lai| 0.002 * lai.clamp(0.0, 6.0));
    Some((base + canopy).clamp(EMISSIVITY_MIN, EMISSIVITY_MAX))
}

pub fn photosynthetic_radiation(dsr: Option<f64>) -> Option<f64> {
    dsr.map(|dsr| dsr * PAR_FRACTION)
}

/// Rough aboveground biomass in g/m²; indicative only.
pub fn aboveground_biomass(ndvi: Option<f64>, lai: Option<f64>) -> Option<f64> {
    let (ndvi, lai) = (ndvi?, lai?);
    Some(((lai * 2.5 + ndvi * 10.0) * 1000.0).max(0.0))
}

/// Computes FVC, BBE, PAR, AGB, LWNR and NR from observed readings.
pub fn derive(observed: &BTreeMap<ParameterId, ParameterReading>) -> Vec<ParameterReading> {
    let value = |id| observed.get(&id).and_then(ParameterReading::value);
    let date = |id| {
        observed
            .get(&id)
            .and_then(ParameterReading::provenance)
            .and_then(|p| p.observed_on)
    };

    let ndvi = value(ParameterId::Ndvi);
    let lai = value(ParameterId::Lai);
    let dsr = value(ParameterId::Dsr);

    let reading = |id: ParameterId, computed: Option<f64>, inputs: &str, from: ParameterId| {
        match computed {
            Some(v) => ParameterReading::resolved(
                id,
                v,
                Provenance {
                    source: format!("derived:{inputs}"),
                    resolution_m: None,
                    observed_on: date(from),
                },
            ),
            None => ParameterReading::unavailable(id, format!("requires {inputs}")),
        }
    };

    // LAI only refines BBE; NDVI alone is enough.
    let bbe_inputs = if ndvi.is_some() && lai.is_some() {
        "NDVI,LAI"
    } else {
        "NDVI"
    };

    vec![
        reading(ParameterId::Fvc, fractional_cover(ndvi), "NDVI", ParameterId::Ndvi),
        reading(
            ParameterId::Bbe,
            broadband_emissivity(ndvi, lai),
            bbe_inputs,
            ParameterId::Ndvi,
        ),
        reading(ParameterId::Par, photosynthetic_radiation(dsr), "DSR", ParameterId::Dsr),
        reading(
            ParameterId::Agb,
            aboveground_biomass(ndvi, lai),
            "NDVI,LAI",
            ParameterId::Ndvi,
        ),
        ParameterReading::unavailable(ParameterId::Lwnr, ENERGY_BALANCE),
        ParameterReading::unavailable(ParameterId::Nr, ENERGY_BALANCE),
    ]
}
