//! Human-readable rendering of an `/api/all`-shaped response.

use chrono::{DateTime, Utc};
use geoenv_core::{
    AllResponse, ParameterId, QueryWindow, TargetParameter, TargetValue,
    compose::{TargetParameters, format_query_time},
    vegetation::{Layer, LayerStatus},
};
use std::fmt::{self, Write};

const WIDE_RULE: &str =
    "================================================================================";
const RULE: &str = "----------------------------------------";

const QUALITY_LEVELS: [&str; 4] = ["insufficient", "fair", "good", "excellent"];

pub fn render(
    response: &AllResponse,
    window: &QueryWindow,
    now: DateTime<Utc>,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let targets = TargetParameters::from_report(&response.vegetation);

    header(&mut out, window, now)?;
    weather(&mut out, response)?;
    indices(&mut out, response)?;
    layers(&mut out, response)?;
    target_parameters(&mut out, response, &targets)?;
    analysis(&mut out, response)?;

    Ok(out)
}

fn header(out: &mut String, window: &QueryWindow, now: DateTime<Utc>) -> fmt::Result {
    let range = window.date_range();
    writeln!(out, "{WIDE_RULE}")?;
    writeln!(out, "geoenv: weather and environmental parameters")?;
    writeln!(out, "{WIDE_RULE}")?;
    writeln!(out, "Coordinate:  ({})", window.coordinate)?;
    writeln!(
        out,
        "Look-back:   {} days ({} to {})",
        window.days_back, range.start, range.end
    )?;
    writeln!(out, "Query time:  {}", format_query_time(now))?;
    writeln!(out, "{WIDE_RULE}")
}

fn weather(out: &mut String, response: &AllResponse) -> fmt::Result {
    let report = &response.weather;
    let current = &report.current;

    writeln!(out, "\nWeather")?;
    writeln!(out, "{RULE}")?;
    if report.is_placeholder {
        writeln!(out, "!! Demo values: the weather provider could not be reached")?;
    }
    writeln!(out, "Temperature:    {} °C", current.temperature)?;
    writeln!(out, "Humidity:       {} %", current.humidity)?;
    writeln!(out, "Pressure:       {} hPa", current.pressure)?;
    writeln!(out, "Wind speed:     {} m/s", current.wind_speed)?;
    writeln!(out, "Wind direction: {}°", current.wind_direction)?;
    writeln!(out, "Conditions:     {}", current.description)?;
    writeln!(out, "Note:           {}", current.note)?;
    writeln!(
        out,
        "Location:       {} ({})",
        report.location.name, report.location.timezone
    )
}

fn indices(out: &mut String, response: &AllResponse) -> fmt::Result {
    writeln!(out, "\nReflectance indices (Sentinel-2)")?;
    writeln!(out, "{RULE}")?;
    for id in [ParameterId::Ndvi, ParameterId::Evi, ParameterId::Savi] {
        reading_line(out, response, id)?;
    }
    Ok(())
}

fn layers(out: &mut String, response: &AllResponse) -> fmt::Result {
    writeln!(out, "\nSatellite and reanalysis layers")?;
    writeln!(out, "{RULE}")?;

    for status in &response.vegetation.layers {
        if status.layer == Layer::Reflectance {
            continue;
        }
        writeln!(out, "{}", layer_heading(status))?;
        for id in status.layer.parameters() {
            reading_line(out, response, *id)?;
        }
    }
    Ok(())
}

fn layer_heading(status: &LayerStatus) -> String {
    let label = match status.layer {
        Layer::Reflectance => "Surface reflectance",
        Layer::LeafArea => "Leaf area",
        Layer::Albedo => "Albedo",
        Layer::SurfaceTemperature => "Land surface temperature",
        Layer::Evapotranspiration => "Evapotranspiration",
        Layer::Productivity => "Gross primary production",
        Layer::SnowCover => "Snow cover",
        Layer::Shortwave => "Shortwave radiation",
    };

    match (&status.observed_on, &status.reason) {
        (Some(date), _) => format!("{label} [{}, {date}]", status.collection),
        (None, Some(reason)) => format!("{label} [{}] unavailable: {reason}", status.collection),
        (None, None) => format!("{label} [{}]", status.collection),
    }
}

fn reading_line(out: &mut String, response: &AllResponse, id: ParameterId) -> fmt::Result {
    let Some(reading) = response.vegetation.reading(id) else {
        return writeln!(out, "   {:<10} no data", id.name());
    };

    match (reading.value(), reading.missing_reason()) {
        (Some(value), _) => writeln!(out, "   {:<10} {value} {}", id.name(), id.unit()),
        (None, Some(reason)) => writeln!(out, "   {:<10} no data ({reason})", id.name()),
        (None, None) => writeln!(out, "   {:<10} no data", id.name()),
    }
}

fn target_parameters(
    out: &mut String,
    response: &AllResponse,
    targets: &TargetParameters,
) -> fmt::Result {
    let summary = &response.summary;

    writeln!(out, "\nEnvironmental parameters")?;
    writeln!(out, "{WIDE_RULE}")?;
    writeln!(
        out,
        "Available: {}/{} ({})",
        summary.available_parameters, summary.total_parameters, summary.success_rate
    )?;
    writeln!(out, "{RULE}")?;

    for (i, (target, value)) in targets.0.iter().enumerate() {
        writeln!(out, "{:2}. {} - {}", i + 1, target.name(), target.title())?;
        writeln!(out, "    Unit: {}", target.unit())?;
        target_value(out, *target, value)?;
    }
    Ok(())
}

fn target_value(out: &mut String, target: TargetParameter, value: &TargetValue) -> fmt::Result {
    let unit = target.unit();
    match value {
        TargetValue::DayNight { day, night } => {
            for (label, value) in [("Day", day), ("Night", night)] {
                match value {
                    Some(v) => writeln!(out, "    {label}: {v:.2} {unit}")?,
                    None => writeln!(out, "    {label}: no data")?,
                }
            }
            Ok(())
        }
        TargetValue::Scalar(Some(v)) => writeln!(out, "    Value: {v:.4}"),
        TargetValue::Scalar(None) => writeln!(out, "    Value: no data for this location"),
    }
}

fn analysis(out: &mut String, response: &AllResponse) -> fmt::Result {
    let current = &response.weather.current;

    writeln!(out, "\nSummary")?;
    writeln!(out, "{WIDE_RULE}")?;
    writeln!(
        out,
        "Weather:     {}, {} °C, humidity {} %{}",
        current.description,
        current.temperature,
        current.humidity,
        if response.weather.is_placeholder { " (demo)" } else { "" }
    )?;

    if let Some(ndvi) = response.vegetation.value(ParameterId::Ndvi) {
        writeln!(out, "Vegetation:  {} (NDVI {ndvi:.3})", vegetation_health(ndvi))?;
    }

    writeln!(
        out,
        "Parameters:  {}/{} available ({})",
        response.summary.available_parameters,
        response.summary.total_parameters,
        response.summary.success_rate
    )?;
    writeln!(out, "Data quality: {}", QUALITY_LEVELS[quality_score(response)])?;
    writeln!(out, "{WIDE_RULE}")
}

fn vegetation_health(ndvi: f64) -> &'static str {
    if ndvi > 0.6 {
        "excellent (dense vegetation)"
    } else if ndvi > 0.3 {
        "good (moderate vegetation)"
    } else if ndvi > 0.1 {
        "fair (sparse vegetation)"
    } else {
        "poor (bare ground or no vegetation)"
    }
}

/// One point each for live weather, more than half the layers answering,
/// and more than eight of the fourteen targets present.
fn quality_score(response: &AllResponse) -> usize {
    let layers = &response.vegetation.layers;
    let answered = layers.iter().filter(|l| l.available).count();

    [
        !response.weather.is_placeholder,
        answered * 2 > layers.len(),
        response.summary.available_parameters > 8,
    ]
    .into_iter()
    .filter(|point| *point)
    .count()
}
